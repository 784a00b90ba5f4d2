//! hyperdoc - inspect and normalize hypertext markup

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use hyperdoc::access::file_address;
use hyperdoc::markup::{self, ReadOptions, WriteOptions};
use hyperdoc::{Anchor, Diagnostic, DocState, Document, Error, Format, StyleSheet};

#[derive(Parser)]
#[command(name = "hyperdoc")]
#[command(version, about = "Inspect and normalize hypertext markup", long_about = None)]
#[command(after_help = "EXAMPLES:
    hyperdoc dump page.html               Show runs and anchors
    hyperdoc dump --json page.html        The same, as JSON
    hyperdoc normalize page.html -o out.html
    hyperdoc styles --styles my.styles    Check and print a style sheet")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Suppress diagnostics
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show the runs and anchors of a markup file
    Dump {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Style sheet file (default: the standard sheet)
        #[arg(long, value_name = "FILE")]
        styles: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Read a markup file and write it back out in canonical form
    Normalize {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (default: standard output)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Address that link targets are written relative to
        #[arg(long, value_name = "ADDR")]
        base: Option<String>,

        /// Style sheet file (default: the standard sheet)
        #[arg(long, value_name = "FILE")]
        styles: Option<PathBuf>,

        /// Fail on any recovered markup problem
        #[arg(long)]
        strict: bool,
    },

    /// Print a style sheet in style definition format
    Styles {
        /// Style sheet file (default: the standard sheet)
        #[arg(long, value_name = "FILE")]
        styles: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Dump {
            input,
            styles,
            json,
        } => dump(&input, styles.as_deref(), json, cli.quiet),
        Command::Normalize {
            input,
            output,
            base,
            styles,
            strict,
        } => normalize(
            &input,
            output.as_deref(),
            base.as_deref(),
            styles.as_deref(),
            strict,
            cli.quiet,
        ),
        Command::Styles { styles } => print_styles(styles.as_deref(), cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_sheet(path: Option<&Path>, quiet: bool) -> Result<StyleSheet, String> {
    let Some(path) = path else {
        return Ok(StyleSheet::standard());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let (sheet, diagnostics) = StyleSheet::read(&text);
    report(path, &diagnostics, quiet);
    Ok(sheet)
}

fn read_document(
    path: &Path,
    sheet: &StyleSheet,
    strict: bool,
    quiet: bool,
) -> Result<(Document, Vec<Diagnostic>), String> {
    let bytes = fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let options = ReadOptions {
        strict,
        address: file_address(path).ok(),
    };
    match markup::read_bytes(&bytes, sheet, &options) {
        Ok(outcome) => {
            report(path, &outcome.diagnostics, quiet);
            Ok((outcome.document, outcome.diagnostics))
        }
        Err(Error::ParseFailure { diagnostics, .. }) => {
            report(path, &diagnostics, quiet);
            Err(format!(
                "{}: {} markup problems in strict mode",
                path.display(),
                diagnostics.len()
            ))
        }
        Err(e) => Err(e.to_string()),
    }
}

fn report(path: &Path, diagnostics: &[Diagnostic], quiet: bool) {
    if quiet {
        return;
    }
    for diagnostic in diagnostics {
        eprintln!("{}: {diagnostic}", path.display());
    }
}

#[derive(Serialize)]
struct DumpView<'a> {
    title: Option<&'a str>,
    address: Option<&'a str>,
    format: Format,
    state: DocState,
    is_index: bool,
    next_anchor: u32,
    runs: Vec<RunView<'a>>,
    anchors: Vec<&'a Anchor>,
    diagnostics: &'a [Diagnostic],
}

#[derive(Serialize)]
struct RunView<'a> {
    start: usize,
    end: usize,
    style: Option<&'a str>,
    anchor: Option<String>,
    text: &'a str,
}

fn dump(input: &Path, styles: Option<&Path>, json: bool, quiet: bool) -> Result<(), String> {
    let sheet = load_sheet(styles, quiet)?;
    let (doc, diagnostics) = read_document(input, &sheet, false, quiet)?;

    if !json {
        print!("{}", doc.dump().map_err(|e| e.to_string())?);
        return Ok(());
    }

    let runs = doc
        .runs()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|run| RunView {
            start: run.range.start,
            end: run.range.end,
            style: doc.style(run.style).and_then(|s| s.name.as_deref()),
            anchor: run
                .anchor
                .and_then(|id| doc.anchor(id).ok())
                .map(|a| a.name().into_owned()),
            text: doc.slice(run.range),
        })
        .collect();
    let view = DumpView {
        title: doc.title(),
        address: doc.address(),
        format: doc.format(),
        state: doc.state(),
        is_index: doc.is_index(),
        next_anchor: doc.next_anchor_number(),
        runs,
        anchors: doc.anchors().collect(),
        diagnostics: &diagnostics,
    };
    let out = serde_json::to_string_pretty(&view).map_err(|e| e.to_string())?;
    println!("{out}");
    Ok(())
}

fn normalize(
    input: &Path,
    output: Option<&Path>,
    base: Option<&str>,
    styles: Option<&Path>,
    strict: bool,
    quiet: bool,
) -> Result<(), String> {
    let sheet = load_sheet(styles, quiet)?;
    let (doc, _) = read_document(input, &sheet, strict, quiet)?;
    let options = WriteOptions {
        base: base.map(str::to_string),
    };
    let out = markup::write(&doc, &sheet, &options).map_err(|e| e.to_string())?;

    match output {
        Some(path) => {
            fs::write(path, &out).map_err(|e| format!("{}: {e}", path.display()))?;
            if !quiet {
                eprintln!("{} -> {}", input.display(), path.display());
            }
        }
        None => print!("{out}"),
    }
    Ok(())
}

fn print_styles(styles: Option<&Path>, quiet: bool) -> Result<(), String> {
    let sheet = load_sheet(styles, quiet)?;
    print!("{}", sheet.write());
    Ok(())
}
