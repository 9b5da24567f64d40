use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use clap::Parser;
use timetools_app_shell::{load_config, AppShell};
use timetools_core::Action;
use timetools_programs::{builtin_registry, JsonFileStorage, TodoList};
use timetools_runtime_std::StdRuntime;

#[derive(Parser, Debug)]
#[command(
    name = "timetools",
    about = "Stopwatch, countdown timer, world clock and todo list in one shell"
)]
struct Args {
    /// Config file; defaults to ./timetools.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Program to open at startup.
    #[arg(long)]
    program: Option<String>,
    /// Where todo items are stored.
    #[arg(long)]
    todo_path: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Open(String),
    Close,
    Search(String),
    Status,
    List,
    Help,
    Quit,
    Program(Action),
}

fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };
    let command = match head.to_lowercase().as_str() {
        "" => return None,
        "open" if !rest.is_empty() => Command::Open(rest.to_string()),
        "close" => Command::Close,
        "search" => Command::Search(rest.to_string()),
        "status" => Command::Status,
        "list" => Command::List,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Program(Action::parse(trimmed)?),
    };
    Some(command)
}

const HELP: &str = "\
commands:
  open <id>        show a program (worldclock, timer, stopwatch, todo)
  close            hide the current program
  search <query>   find programs by name or keyword
  status           print the current view
  list             list programs with activity badges
  help             this text
  quit             leave
anything else is sent to the open program, e.g. `start`, `lap`, `set 90`,
`preset 5`, `add buy milk`, `toggle #1`";

fn print_view(shell: &AppShell) {
    match shell.view() {
        Some(view) => print!("{view}"),
        None => println!("(no program open)"),
    }
}

fn print_list(shell: &AppShell) {
    for entry in shell.sidebar() {
        let selected = if entry.selected { ">" } else { " " };
        let badge = if entry.active { "*" } else { " " };
        println!("{selected}{badge} {:<11} {}", entry.id, entry.name);
    }
}

/// Returns false when the shell should exit.
fn handle_line(shell: &mut AppShell, line: &str) -> bool {
    let Some(command) = parse_command(line) else {
        return true;
    };
    match command {
        Command::Open(id) => match shell.activate(&id) {
            Ok(()) => print_view(shell),
            Err(err) => println!("{err}"),
        },
        Command::Close => {
            if shell.deactivate().is_none() {
                println!("(no program open)");
            }
        }
        Command::Search(query) => {
            let hits = shell.search(&query);
            if hits.is_empty() {
                println!("no matches");
            }
            for program in hits {
                println!("  {:<11} {}", program.id(), program.description_text());
            }
        }
        Command::Status => {
            shell.update();
            print_view(shell);
        }
        Command::List => print_list(shell),
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Program(action) => match shell.dispatch(&action) {
            Ok(()) => {
                shell.update();
                print_view(shell);
            }
            Err(err) => println!("{err}"),
        },
    }
    true
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("timetools: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(program) = args.program {
        config.initial_program = Some(program);
    }
    if let Some(path) = args.todo_path {
        config.todo_storage_path = path;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    let runtime = StdRuntime::new();
    let todos = TodoList::open(JsonFileStorage::new(&config.todo_storage_path));
    let registry = builtin_registry(&todos);
    let idle = Duration::from_millis(config.idle_poll_millis.max(1));
    let mut shell = AppShell::new(runtime.runtime(), registry, config);
    let _badges = shell.subscribe_active_set(|set| {
        let ids: Vec<&str> = set.iter().collect();
        log::info!("active programs: {ids:?}");
    });

    if let Err(err) = shell.launch() {
        eprintln!("timetools: {err}");
        return ExitCode::FAILURE;
    }
    println!("Time Tools. Type `help` for commands.");
    if shell.active_program().is_some() {
        print_view(&shell);
    }
    prompt();

    let (lines_tx, lines_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        let timeout = runtime
            .time_until_next_timer()
            .map(|due| due.min(idle))
            .unwrap_or(idle);
        match lines_rx.recv_timeout(timeout) {
            Ok(line) => {
                if !handle_line(&mut shell, &line) {
                    break;
                }
                prompt();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        runtime.take_tick_request();
        if shell.should_update() {
            shell.update();
        }
    }

    shell.deactivate();
    ExitCode::SUCCESS
}
