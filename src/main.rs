use clap::Parser;
use minilisp::config::{self, HistoryConfig};
use minilisp::runtime::Runtime;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::{Path, PathBuf};

/// An embeddable Lisp interpreter with a mark-and-sweep heap
#[derive(Parser, Debug)]
#[command(name = "minilisp")]
#[command(version = config::VERSION)]
#[command(about = "A Lisp interpreter with a cons-cell heap and mark-sweep collector")]
struct CliArgs {
    /// Script file to execute (if omitted, starts the REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let mut rt = Runtime::new();
    let scope = rt.default_scope();

    if let Some(path) = args.script {
        return run_script(&mut rt, scope, &path);
    }

    run_repl(&mut rt, scope)
}

fn run_script(rt: &mut Runtime, scope: minilisp::value::Value, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if rt.load_file(scope, path).is_none() {
        rt.print_error();
        rt.clear_error();
        return Err(format!("failed to run {}", path.display()).into());
    }
    Ok(())
}

fn run_repl(rt: &mut Runtime, scope: minilisp::value::Value) -> Result<(), Box<dyn std::error::Error>> {
    let history = HistoryConfig::default();
    let editor_config = Config::builder().max_history_size(history.max_entries)?.build();
    let mut rl = DefaultEditor::with_config(editor_config)?;
    let _ = rl.load_history(&history.file);

    println!("{}", config::WELCOME_MESSAGE);
    println!("{}", config::WELCOME_SUBTITLE);

    loop {
        match rl.readline("minilisp> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);
                if trimmed == "(quit)" || trimmed == "(exit)" {
                    break;
                }

                if let Some(form) = rt.parse_progn(trimmed) {
                    match rt.eval(scope, form) {
                        Some(result) => println!("=> {}", result.to_display_string(rt.nil())),
                        None => {
                            rt.print_error();
                            rt.clear_error();
                        }
                    }
                } else {
                    rt.print_error();
                    rt.clear_error();
                }

                // Collect between interactions (§5): the default scope is the
                // sole root we care about preserving across top-level forms.
                rt.mark(scope);
                rt.sweep();
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("readline error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&history.file);
    Ok(())
}
