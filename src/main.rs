use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use brace::{ast, ParseError, Template};

#[derive(Parser)]
#[command(name = "brace", version, about = "Render Handlebars-style templates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template against JSON context data
    Render {
        /// Template file to render
        template: Option<PathBuf>,
        /// JSON file holding the rendering context
        #[arg(long)]
        data: Option<PathBuf>,
        /// Directory of .hbs partials, registered under their file stems
        #[arg(long)]
        partials: Option<PathBuf>,
        /// Read the template from standard input instead of a file
        #[arg(long)]
        stdin: bool,
    },
    /// Parse a template and report errors without rendering
    Check {
        template: PathBuf,
        /// Print the compiled tree
        #[arg(long)]
        ast: bool,
        /// Print the compiled tree as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Render { template, data, partials, stdin } => {
            run_render(template.as_deref(), data.as_deref(), partials.as_deref(), stdin)
        }
        Command::Check { template, ast, json } => run_check(&template, ast, json),
    }
}

fn run_render(
    template: Option<&Path>,
    data: Option<&Path>,
    partials: Option<&Path>,
    stdin: bool,
) -> ExitCode {
    let (source, name) = match (template, stdin) {
        (Some(path), false) => match fs::read_to_string(path) {
            Ok(source) => (source, path.display().to_string()),
            Err(err) => {
                eprintln!("error: cannot read {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        _ => {
            let mut buffer = String::new();
            if let Err(err) = io::stdin().read_to_string(&mut buffer) {
                eprintln!("error: cannot read standard input: {}", err);
                return ExitCode::FAILURE;
            }
            (buffer, "<stdin>".to_string())
        }
    };

    let compiled = match Template::parse(&source) {
        Ok(compiled) => compiled,
        Err(err) => {
            report_parse_error(&err, &source, &name);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = partials {
        if let Err(code) = register_partials(&compiled, dir) {
            return code;
        }
    }

    let ctx = match data {
        Some(path) => {
            let raw = match fs::read_to_string(path) {
                Ok(raw) => raw,
                Err(err) => {
                    eprintln!("error: cannot read {}: {}", path.display(), err);
                    return ExitCode::FAILURE;
                }
            };
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(ctx) => ctx,
                Err(err) => {
                    eprintln!("error: {} is not valid JSON: {}", path.display(), err);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => serde_json::Value::Null,
    };

    match compiled.render(&ctx) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Registers every `.hbs` file under `dir` as a partial named by its stem.
fn register_partials(template: &Template, dir: &Path) -> Result<(), ExitCode> {
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("hbs") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("error: cannot read {}: {}", path.display(), err);
                return Err(ExitCode::FAILURE);
            }
        };
        if let Err(err) = template.register_partial(stem, &source) {
            eprintln!("error: {}", err);
            return Err(ExitCode::FAILURE);
        }
        tracing::debug!(partial = stem, path = %path.display(), "registered partial");
    }
    Ok(())
}

fn run_check(template: &Path, ast: bool, json: bool) -> ExitCode {
    let source = match fs::read_to_string(template) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {}", template.display(), err);
            return ExitCode::FAILURE;
        }
    };
    let name = template.display().to_string();

    let compiled = match Template::parse(&source) {
        Ok(compiled) => compiled,
        Err(err) => {
            report_parse_error(&err, &source, &name);
            return ExitCode::FAILURE;
        }
    };

    if json {
        match serde_json::to_string_pretty(compiled.program()) {
            Ok(dump) => println!("{}", dump),
            Err(err) => {
                eprintln!("error: cannot serialize tree: {}", err);
                return ExitCode::FAILURE;
            }
        }
    } else if ast {
        print!("{}", ast::dump(compiled.program()));
    } else {
        println!("{}: ok", name);
    }
    ExitCode::SUCCESS
}

fn report_parse_error(err: &ParseError, source: &str, name: &str) {
    if io::stderr().is_terminal() {
        eprint!("{}", err.render_color(source, name));
    } else {
        eprint!("{}", err.render(source, name));
    }
}
