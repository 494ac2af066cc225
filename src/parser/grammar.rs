//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse a box-facts sheet into an AST
pub fn parse(input: &str) -> Result<Document, Vec<crate::ParseError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Document, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let string_literal = select! {
        Token::String(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let kind = select! {
        Token::Box => BoxKind::Box,
        Token::Text => BoxKind::Text,
        Token::Image => BoxKind::Image,
        Token::Input => BoxKind::Input,
        Token::Br => BoxKind::Br,
    }
    .map_with(|k, e| Spanned::new(k, span_range(&e.span())));

    // Numbers (including negative via Minus token), optionally followed by '%'
    let numeric = just(Token::Minus)
        .or_not()
        .then(select! { Token::Number(n) => n })
        .then(just(Token::Percent).or_not())
        .map(|((neg, n), percent)| {
            let value = if neg.is_some() { -n } else { n };
            if percent.is_some() {
                Value::Percent(value)
            } else {
                Value::Number(value)
            }
        });

    let value = choice((
        numeric,
        select! {
            Token::Ident(s) => Value::Keyword(s),
            Token::String(s) => Value::String(s),
            // Node-kind keywords are also valid values (e.g. `display: text`)
            Token::Box => Value::Keyword("box".to_string()),
            Token::Text => Value::Keyword("text".to_string()),
        },
    ))
    .map_with(|v, e| Spanned::new(v, span_range(&e.span())));

    let property = identifier
        .clone()
        .then_ignore(just(Token::Colon))
        .then(value)
        .map_with(|(key, value), e| Spanned::new(Property { key, value }, span_range(&e.span())));

    let property_block = property
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

    let box_decl = recursive(|decl| {
        kind.then(identifier.or_not())
            .then(string_literal.or_not())
            .then(property_block.or_not())
            .then(
                decl.repeated()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
                    .or_not(),
            )
            .map_with(|((((kind, name), text), properties), children), e| {
                Spanned::new(
                    BoxDecl {
                        kind,
                        name,
                        text,
                        properties: properties.unwrap_or_default(),
                        children: children.unwrap_or_default(),
                    },
                    span_range(&e.span()),
                )
            })
            .boxed()
    });

    box_decl
        .repeated()
        .collect()
        .then_ignore(end())
        .map(|boxes| Document { boxes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_box() {
        let doc = parse("box root").expect("Should parse");
        assert_eq!(doc.boxes.len(), 1);
        let decl = &doc.boxes[0].node;
        assert_eq!(decl.kind.node, BoxKind::Box);
        assert_eq!(decl.name.as_ref().map(|n| n.node.as_str()), Some("root"));
        assert!(decl.children.is_empty());
    }

    #[test]
    fn test_parse_properties() {
        let doc = parse("box a [width: 100, margin_left: -4, css_width: 50%, float: left,]")
            .expect("Should parse");
        let props = &doc.boxes[0].node.properties;
        assert_eq!(props.len(), 4);
        assert_eq!(props[0].node.key.node, "width");
        assert_eq!(props[0].node.value.node, Value::Number(100.0));
        assert_eq!(props[1].node.value.node, Value::Number(-4.0));
        assert_eq!(props[2].node.value.node, Value::Percent(50.0));
        assert_eq!(props[3].node.value.node, Value::Keyword("left".to_string()));
    }

    #[test]
    fn test_parse_text_content() {
        let doc = parse(r#"text label "Hello" [width: 40]"#).expect("Should parse");
        let decl = &doc.boxes[0].node;
        assert_eq!(decl.kind.node, BoxKind::Text);
        assert_eq!(decl.text.as_ref().map(|t| t.node.as_str()), Some("Hello"));
    }

    #[test]
    fn test_parse_nested_children() {
        let input = r#"
            box root [width: 400] {
                box a
                box b {
                    text t "x"
                }
                br
            }
        "#;
        let doc = parse(input).expect("Should parse");
        let root = &doc.boxes[0].node;
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[1].node.children.len(), 1);
        assert_eq!(root.children[2].node.kind.node, BoxKind::Br);
    }

    #[test]
    fn test_parse_anonymous_box() {
        let doc = parse("box { box }").expect("Should parse");
        assert!(doc.boxes[0].node.name.is_none());
        assert_eq!(doc.boxes[0].node.children.len(), 1);
    }

    #[test]
    fn test_parse_spans_cover_source() {
        let input = "box a [x: 1]";
        let doc = parse(input).expect("Should parse");
        assert_eq!(doc.boxes[0].span, 0..input.len());
        let key = &doc.boxes[0].node.properties[0].node.key;
        assert_eq!(&input[key.span.clone()], "x");
    }

    #[test]
    fn test_parse_error_missing_value() {
        let errs = parse("box a [width: ]").unwrap_err();
        assert!(!errs.is_empty());
    }

    #[test]
    fn test_parse_error_unclosed_brace() {
        assert!(parse("box a { box b").is_err());
    }
}
