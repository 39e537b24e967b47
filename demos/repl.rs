use std::io::{self, BufRead, Write};
use std::panic;
use std::process;

use logoxp::Interpreter;
use logoxp::host::{HeadlessTurtle, Stream};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Console stream over the process's stdin and stdout
struct Console {
    color: String,
    font: String,
    size: f64,
}

impl Default for Console {
    fn default() -> Self {
        Console {
            color: "black".into(),
            font: "monospace".into(),
            size: 13.0,
        }
    }
}

impl Stream for Console {
    fn write(&mut self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
    }

    fn read(&mut self, prompt: Option<&str>) -> Option<String> {
        if let Some(prompt) = prompt {
            print!("{prompt} ");
            let _ = io::stdout().flush();
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
        }
    }

    fn clear(&mut self) {
        print!("\x1b[2J\x1b[H");
        let _ = io::stdout().flush();
    }

    fn color(&self) -> String {
        self.color.clone()
    }

    fn set_color(&mut self, color: String) {
        self.color = color;
    }

    fn font(&self) -> String {
        self.font.clone()
    }

    fn set_font(&mut self, font: String) {
        self.font = font;
    }

    fn text_size(&self) -> f64 {
        self.size
    }

    fn set_text_size(&mut self, size: f64) {
        self.size = size;
    }
}

fn main() {
    env_logger::init();

    let result = panic::catch_unwind(run_repl);

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

/// Paths given with `--load`, in order
fn files_to_load() -> Vec<String> {
    let mut files = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--load" | "-l" => match args.next() {
                Some(path) => files.push(path),
                None => eprintln!("--load needs a file name"),
            },
            other => eprintln!("Ignoring argument {other}"),
        }
    }
    files
}

/// Whether `line` opens a procedure definition
fn starts_definition(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("to"))
}

fn ends_definition(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("end")
}

fn evaluate(interp: &mut Interpreter, source: &str) {
    match interp.evaluate(source) {
        Ok(Some(value)) => println!("{value}"),
        Ok(None) => {}
        Err(err) => println!("{err}"),
    }
}

fn run_repl() {
    println!("LogoXP interactive Logo");
    println!("Procedures may span lines: to ... end.");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut interp = Interpreter::new(
        Box::new(HeadlessTurtle::default()),
        Box::new(Console::default()),
    );

    for path in files_to_load() {
        match std::fs::read_to_string(&path) {
            Ok(source) => {
                if let Err(err) = interp.run(&source) {
                    println!("{path}: {err}");
                }
            }
            Err(err) => println!("{path}: {err}"),
        }
    }

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() { "? " } else { "> " };
        match rl.readline(prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                if pending.is_empty() {
                    match line.trim() {
                        "" => continue,
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":procedures" => {
                            evaluate(&mut interp, "pot procedures");
                            continue;
                        }
                        ":quit" | ":exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        _ => {}
                    }
                    if starts_definition(&line) && !line.split_whitespace().any(|w| w.eq_ignore_ascii_case("end")) {
                        pending = line;
                        continue;
                    }
                    evaluate(&mut interp, &line);
                } else {
                    pending.push('\n');
                    pending.push_str(&line);
                    if ends_definition(&line) {
                        let source = std::mem::take(&mut pending);
                        evaluate(&mut interp, &source);
                    }
                }
            }

            Err(ReadlineError::Interrupted) if !pending.is_empty() => {
                pending.clear();
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  :help       - Show this help message");
    println!("  :procedures - List the title lines of defined procedures");
    println!("  :quit       - Exit the interpreter");
    println!("  :exit       - Exit the interpreter");
    println!("  Ctrl+C      - Abandon a definition in progress, or exit");
    println!();
    println!("Start with --load FILE to run a file of definitions first.");
    println!();
    println!("Examples:");
    println!("  print sum 2 3");
    println!("  to square :n");
    println!("    repeat 4 [forward :n right 90]");
    println!("  end");
    println!("  square 50 show pos");
    println!("  show map [? * ?] [1 2 3]");
    println!();
}
