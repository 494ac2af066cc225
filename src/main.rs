//! Anchor Layout CLI
//!
//! Usage:
//!   anchor-layout [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>  Layout and report settings (TOML format)
//!   -d, --debug          Log classification and synthesis decisions
//!   --verify             Solve the emitted anchors and report drift
//!   --format             Show the box-facts sheet reference
//!   -h, --help           Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;

use anchor_layout::{resolve_source, LayoutConfig, ReportConfig};

#[derive(Parser)]
#[command(name = "anchor-layout")]
#[command(about = "Resolve measured box trees into anchor-based containers")]
struct Cli {
    /// Input sheet (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Layout and report settings (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log classification and synthesis decisions to stderr
    #[arg(short, long)]
    debug: bool,

    /// Solve the emitted anchors and report nodes that drift from their boxes
    #[arg(long)]
    verify: bool,

    /// Show the box-facts sheet reference
    #[arg(long)]
    format: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    if cli.format {
        print_format();
        return;
    }

    // If no input file and stdin is a terminal (interactive), show intro help
    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    let (layout_config, report_config) = match &cli.config {
        Some(path) => {
            let loaded = LayoutConfig::from_file(path)
                .and_then(|layout| ReportConfig::from_file(path).map(|report| (layout, report)));
            match loaded {
                Ok(configs) => configs,
                Err(e) => {
                    eprintln!("Error loading config '{}': {}", path.display(), e);
                    std::process::exit(1);
                }
            }
        }
        None => (LayoutConfig::default(), ReportConfig::default()),
    };

    // Read input
    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let resolution = match resolve_source(&source, &layout_config) {
        Ok(resolution) => resolution,
        Err(e) => {
            eprintln!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
    };

    for diagnostic in &resolution.outcome.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
    print!("{}", resolution.report(&report_config));

    if cli.verify {
        match resolution.verify(&layout_config) {
            Ok(report) if report.is_consistent() => {
                eprintln!("verify: {} node axes match their boxes", report.checked);
            }
            Ok(report) => {
                for mismatch in &report.mismatches {
                    eprintln!("verify: {}", mismatch);
                }
                eprintln!(
                    "verify: {} of {} node axes drift",
                    report.mismatches.len(),
                    report.checked
                );
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn print_intro() {
    println!(
        r#"Anchor Layout - resolve measured box trees into anchor-based containers

USAGE:
    anchor-layout [OPTIONS] [FILE]
    echo '<sheet>' | anchor-layout

OPTIONS:
    -c, --config <FILE>  Layout and report settings (TOML file)
    -d, --debug          Log classification and synthesis decisions
    --verify             Solve the emitted anchors and report drift
    --format             Show the box-facts sheet reference
    -h, --help           Print help

QUICK START:
    echo 'box root [width: 200, height: 20] {{ box a [width: 80, height: 20] }}' | anchor-layout

This prints the container kind and emitted attributes of every box.
Run --format for the sheet syntax."#
    );
}

fn print_format() {
    println!(
        r#"BOX-FACTS SHEET REFERENCE
=========================

A sheet describes one measured box tree. Every box records the geometry a
browser engine computed for it along with the CSS facts that produced it.

BOXES
-----
box [name] [facts] {{ children }}      Element box
text [name] "content" [facts]         Text run
image [name] [facts]                  Replaced image
input [name] [facts]                  Form control
br [facts]                            Line break

Names are optional; unnamed boxes are numbered in source order. A sheet has
exactly one top-level box.

GEOMETRY
--------
x, y, width, height                   Border box in absolute pixels
margin, padding, border               Uniform edges (or margin_top, ...)
baseline_offset                       First baseline below the top edge
natural_width, natural_height         Intrinsic size of replaced content

CSS FACTS
---------
display: block | inline | inline-block | flex | inline-flex | grid
         | table | list-item
position: static | relative | absolute | fixed
top, right, bottom, left: <px> | <pct>% | auto
float: left | right | none            clear: left | right | both | none
css_width, css_height: <px> | <pct>% | auto      max_width: <px>
text_align: left | center | right | justify      dir: ltr | rtl
vertical_align: baseline | top | middle | bottom | text-top | text-bottom
                | sub | super | <px>
font_size, line_height, text_indent: <px>
baseline: true | false                Box may carry a row baseline
text_source: <name>                   Source node of a text fragment

FLEX
----
flex: row | column                    Flex container direction
wrap: wrap | nowrap
justify: start | center | end | space-between | space-around | space-evenly
align_items, align_self: start | center | end | stretch | baseline
row_gap, column_gap: <px>
grow, shrink: <number>                basis: <px> | <pct>% | auto

CONFIG FILE
-----------
[layout]
float_precision = 3                   Digits kept in weights and biases
edge_tolerance = 0.5                  Edges closer than this are aligned
percent_guidelines = false            Percent instead of pixel guidelines
image_baseline = true                 Tall images drive the row baseline
verify_tolerance = 1.0                Allowed drift for --verify

[report]
indent = 2
show_geometry = true
show_helpers = true"#
    );
}
