use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use tbasic::{needs_more_input, Config, Executer};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_env("TBASIC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::from_env();
    let startup_script = config.startup_script.clone();
    let history_path = config.history_path.clone();

    let mut exec = Executer::with_config(config);
    exec.load_standard_library();

    if let Some(path) = startup_script {
        if let Err(e) = exec.execute_file(&path) {
            eprintln!("tbasic: error in startup script '{}':\n{}", path.display(), e.report());
        }
        exec.reset();
    }

    // Run a script file if one was given, otherwise start the prompt
    let args: Vec<String> = env::args().collect();
    if let Some(script_path) = args.get(1) {
        if let Err(e) = exec.execute_file(Path::new(script_path)) {
            eprintln!("tbasic: error executing script '{}':\n{}", script_path, e.report());
            process::exit(1);
        }
    } else if let Err(e) = run_interactive(exec, history_path) {
        eprintln!("tbasic: a critical error occurred: {}", e);
    }
}

/// Runs the interactive prompt. Input is buffered until it forms complete
/// statements, then executed against the same global context.
fn run_interactive(mut exec: Executer, history_path: Option<PathBuf>) -> rustyline::Result<()> {
    let mut rl = DefaultEditor::new()?;
    if let Some(ref path) = history_path {
        if path.exists() {
            let _ = rl.load_history(path);
        }
    }

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "tbasic> " } else { "  ...> " };
        match rl.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() && line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);
                if needs_more_input(&buffer) {
                    continue;
                }

                let source = std::mem::take(&mut buffer);
                match exec.execute(&source) {
                    Ok(value) if !value.is_null() => println!("{}", value),
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("{}", e.report());
                        exec.reset();
                    }
                }
                if exec.exit_requested() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C drops a half-typed block
                println!("^C");
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("tbasic: readline error: {}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }
    Ok(())
}
