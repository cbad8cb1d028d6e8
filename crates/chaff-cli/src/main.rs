use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chaff_core::{fold_additions, marker, optimize_function, parse, print, Node, Visit};
use clap::Parser;

/// Post-pass optimizer for machine-generated JavaScript.
///
/// Reads a source file, eliminates substitutable temporaries and folds
/// additive constant chains in every function named by the
/// `EMSCRIPTEN_GENERATED_FUNCTIONS` marker, and prints the result.
#[derive(Parser)]
#[command(name = "chaff")]
struct Cli {
    /// Input source file.
    input: PathBuf,
    /// Write output here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Report per-function elimination counts on stderr.
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;

    let output = run(&source, cli.verbose)?;

    match &cli.output {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{output}"),
    }
    Ok(())
}

fn run(source: &str, verbose: bool) -> Result<String> {
    let generated = marker::find(source)?;
    let mut ast = parse(source)?;

    if let Some(names) = &generated {
        let names: HashSet<&str> = names.iter().map(String::as_str).collect();
        optimize_generated(&mut ast, &names, verbose);
    } else if verbose {
        eprintln!("no generated-functions marker; nothing to optimize");
    }

    // Serialize each top-level statement on its own rather than the whole
    // program at once; generated files routinely run to megabytes.
    let mut text = String::new();
    if let Node::Toplevel(stmts) = &ast {
        for stmt in stmts {
            text.push_str(&print(stmt));
        }
    }
    let mut out = collapse_blank_lines(&text);
    if let Some(names) = &generated {
        out.push_str(&marker::format(names));
        out.push('\n');
    }
    Ok(out)
}

fn optimize_generated(ast: &mut Node, generated: &HashSet<&str>, verbose: bool) {
    chaff_core::walk(ast, &mut |node| {
        let (name, body) = match node {
            Node::Defun { name, body, .. } if generated.contains(name.as_str()) => {
                (name.clone(), body)
            }
            Node::Function {
                name: Some(name),
                body,
                ..
            } if generated.contains(name.as_str()) => (name.clone(), body),
            _ => return Visit::Descend,
        };
        let eliminated = optimize_function(body);
        for stmt in body.iter_mut() {
            fold_additions(stmt);
        }
        if verbose {
            eprintln!("{name}: eliminated {eliminated} bindings");
        }
        Visit::Descend
    });
}

/// Squash every run of blank lines down to a single one.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::new();
    let mut previous_blank = false;
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        if blank {
            out.push('\n');
        } else {
            out.push_str(line);
            out.push('\n');
        }
        previous_blank = blank;
    }
    out
}
