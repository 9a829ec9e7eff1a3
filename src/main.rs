// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::process;

const HELP: &str = "\
vellum is a scene converter: it reads an SVG or a binary scene
and writes it back in either format.

USAGE:
    vellum [OPTIONS] <in.svg|in.paper> <out.svg|out.paper|->

OPTIONS:
    -h, --help                  Prints this help
        --dpi DPI               Sets the resolution for unit conversion [default: 72]
        --indent INDENT         Sets the XML indention: none, or 0..4 spaces [default: 4]
        --no-shape-matching     Always writes paths, never circle/ellipse/rect

ARGS:
    <in.svg|in.paper>           An input file
    <out.svg|out.paper|->       An output file, or - for SVG on stdout
";

#[derive(Debug)]
struct Args {
    dpi: u32,
    indent: xmlwriter::Indent,
    no_shape_matching: bool,
    input: String,
    output: String,
}

fn collect_args() -> Result<Args, pico_args::Error> {
    let mut input = pico_args::Arguments::from_env();

    if input.contains(["-h", "--help"]) {
        print!("{}", HELP);
        process::exit(0);
    }

    let dpi = input.opt_value_from_str("--dpi")?.unwrap_or(72);
    let indent = input
        .opt_value_from_fn("--indent", parse_indent)?
        .unwrap_or(xmlwriter::Indent::Spaces(4));
    let no_shape_matching = input.contains("--no-shape-matching");

    let rest = input.finish();
    if rest.len() != 2 {
        eprint!("{}", HELP);
        process::exit(1);
    }

    Ok(Args {
        dpi,
        indent,
        no_shape_matching,
        input: rest[0].to_string_lossy().into_owned(),
        output: rest[1].to_string_lossy().into_owned(),
    })
}

fn parse_indent(s: &str) -> Result<xmlwriter::Indent, String> {
    match s {
        "none" => Ok(xmlwriter::Indent::None),
        "0" => Ok(xmlwriter::Indent::Spaces(0)),
        "1" => Ok(xmlwriter::Indent::Spaces(1)),
        "2" => Ok(xmlwriter::Indent::Spaces(2)),
        "3" => Ok(xmlwriter::Indent::Spaces(3)),
        "4" => Ok(xmlwriter::Indent::Spaces(4)),
        _ => Err("invalid INDENT value".to_string()),
    }
}

fn main() {
    let args = match collect_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}.", e);
            process::exit(1);
        }
    };

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Warn);
    } else {
        eprintln!("Warning: failed to initialize the logger.");
    }

    if let Err(e) = process(&args) {
        eprintln!("Error: {}.", e);
        process::exit(1);
    }
}

fn process(args: &Args) -> Result<(), String> {
    let data = std::fs::read(&args.input).map_err(|e| format!("failed to read the input file: {}", e))?;

    let mut doc = vellum::Document::new();
    if data.starts_with(b"paper") {
        vellum::binfmt::parse(&mut doc, &data).map_err(|e| e.to_string())?;
    } else {
        let text = std::str::from_utf8(&data).map_err(|_| "the input is not valid UTF-8".to_string())?;
        let result = doc.parse_svg(text, args.dpi as f32).map_err(|e| e.to_string())?;
        if let (Some(w), Some(h)) = (result.width, result.height) {
            doc.set_size(w, h);
        }
    }

    if args.output.ends_with(".paper") {
        let bytes = vellum::binfmt::write(&doc, doc.root()).map_err(|e| e.to_string())?;
        std::fs::write(&args.output, bytes)
            .map_err(|e| format!("failed to write the output file: {}", e))?;
        return Ok(());
    }

    let opt = vellum::svg::XmlOptions {
        match_shapes: !args.no_shape_matching,
        writer_opts: xmlwriter::Options {
            indent: args.indent,
            ..xmlwriter::Options::default()
        },
    };
    let svg = doc.to_svg_string(&opt);

    if args.output == "-" {
        println!("{}", svg);
    } else {
        std::fs::write(&args.output, svg)
            .map_err(|e| format!("failed to write the output file: {}", e))?;
    }

    Ok(())
}

// A simple stderr logger, so library warnings are visible.
static LOGGER: SimpleLogger = SimpleLogger;
struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::LevelFilter::Warn
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let line = record.line().unwrap_or(0);
            eprintln!(
                "{} (in {}:{}): {}",
                record.level(),
                record.target(),
                line,
                record.args()
            );
        }
    }

    fn flush(&self) {}
}
