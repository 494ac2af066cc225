//! Abstract syntax tree for box-facts sheets

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Root AST node - one or more top-level boxes
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub boxes: Vec<Spanned<BoxDecl>>,
}

/// Declared kind of a box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    Box,
    Text,
    Image,
    Input,
    Br,
}

impl std::fmt::Display for BoxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoxKind::Box => write!(f, "box"),
            BoxKind::Text => write!(f, "text"),
            BoxKind::Image => write!(f, "image"),
            BoxKind::Input => write!(f, "input"),
            BoxKind::Br => write!(f, "br"),
        }
    }
}

/// `kind [name] ["text"] [key: value, ...] { children }`
#[derive(Debug, Clone, PartialEq)]
pub struct BoxDecl {
    pub kind: Spanned<BoxKind>,
    pub name: Option<Spanned<String>>,
    pub text: Option<Spanned<String>>,
    pub properties: Vec<Spanned<Property>>,
    pub children: Vec<Spanned<BoxDecl>>,
}

/// `key: value`
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: Spanned<String>,
    pub value: Spanned<Value>,
}

/// Property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    /// Percentage as written (50% is 50.0)
    Percent(f64),
    Keyword(String),
    String(String),
}

impl Value {
    /// Short description used in type errors
    pub fn describe(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Percent(_) => "percentage",
            Value::Keyword(_) => "keyword",
            Value::String(_) => "string",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Percent(p) => write!(f, "{}%", p),
            Value::Keyword(k) => write!(f, "{}", k),
            Value::String(s) => write!(f, "\"{}\"", s),
        }
    }
}
