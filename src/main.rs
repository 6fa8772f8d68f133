//!
//! vecdesk CLI
//! -----------
//! Headless front-end for the vector database console API. Keeps the session
//! credential in a file so `login` in one run carries over to the next.

use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use rustyline::error::ReadlineError;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use vecdesk::cli::{render_identity, render_navigation, render_session};
use vecdesk::config::ClientConfig;
use vecdesk::identity::{Navigator, NewUser};
use vecdesk::navigation::{ConsoleNavigator, RouteTable};
use vecdesk::storage::FileStorage;
use vecdesk::ConsoleClient;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--credential-file <path>] <command> [args]\n  {program} [--api <url>] [--credential-file <path>] --repl\n\nCommands:\n  login <user> <password>                      sign in and store the credential\n  logout                                       forget the stored credential\n  whoami                                       restore the session and show it\n  check                                        restore the session; exit 1 if it is not valid\n  navigate <path>                              run the view guard for <path>\n  register <user> <password> [email] [name]    create an account (admin only)\n  status                                       show the current session without contacting the server\n  help                                         show this help\n  quit | exit                                  leave the REPL\n\nEnvironment:\n  VECDESK_API_URL, VECDESK_TIMEOUT_MS, VECDESK_REDIRECT_DELAY_MS, VECDESK_CREDENTIAL_FILE\n  RUST_LOG (default: info)"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    let mut cfg = ClientConfig::from_env();
    let mut repl = false;
    let mut command: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                let Some(v) = args.get(i + 1) else {
                    eprintln!("--api requires a URL");
                    print_usage(&program);
                    std::process::exit(2);
                };
                cfg.base_url = v.clone();
                i += 2;
            }
            "--credential-file" => {
                let Some(v) = args.get(i + 1) else {
                    eprintln!("--credential-file requires a path");
                    print_usage(&program);
                    std::process::exit(2);
                };
                cfg.credential_file = v.into();
                i += 2;
            }
            "--repl" => {
                repl = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            _ => {
                command = args[i..].to_vec();
                break;
            }
        }
    }

    info!(
        target: "vecdesk",
        "vecdesk starting: api='{}', credential_file='{}'",
        cfg.base_url,
        cfg.credential_file.display()
    );
    let storage = Arc::new(FileStorage::new(&cfg.credential_file));
    let navigator = Arc::new(ConsoleNavigator::new(RouteTable::console(cfg.app_title.clone()), "/"));
    let console = ConsoleClient::connect(&cfg, storage, navigator).context("building API client")?;

    if repl {
        return run_repl(&console, &program).await;
    }
    if command.is_empty() {
        print_usage(&program);
        std::process::exit(2);
    }
    let words: Vec<&str> = command.iter().map(String::as_str).collect();
    if !run_command(&console, &words, &program).await? {
        std::process::exit(1);
    }
    Ok(())
}

/// Returns Ok(false) when the command ran but did not succeed.
async fn run_command(console: &ConsoleClient, words: &[&str], program: &str) -> Result<bool> {
    let session = console.session();
    match words {
        ["login", user, password] => {
            if session.login(user, password).await {
                println!("{}", render_identity(&session.identity()));
                Ok(true)
            } else {
                eprintln!("login failed: {}", session.last_error());
                Ok(false)
            }
        }
        ["logout"] => {
            session.logout();
            println!("logged out");
            Ok(true)
        }
        ["whoami"] => {
            let ok = session.check_auth().await;
            println!("{}", render_session(&session.snapshot()));
            Ok(ok)
        }
        ["check"] => {
            let ok = session.check_auth().await;
            println!("{}", if ok { "session valid" } else { "not logged in" });
            Ok(ok)
        }
        ["navigate", path] => {
            session.check_auth().await;
            let nav = console.navigate(path);
            println!("{}", render_navigation(path, &nav));
            println!("now at: {}", console.navigator().current_path());
            Ok(true)
        }
        ["register", user, password, rest @ ..] if rest.len() <= 2 => {
            if !session.check_auth().await {
                return Err(anyhow!("register requires a valid admin session; run `login` first"));
            }
            let new_user = NewUser {
                username: user.to_string(),
                password: password.to_string(),
                email: rest.first().map(|s| s.to_string()),
                full_name: rest.get(1).map(|s| s.to_string()),
            };
            let created = console.register_user(&new_user).await.context("register failed")?;
            println!("{}", render_identity(&created));
            Ok(true)
        }
        ["status"] => {
            println!("{}", render_session(&session.snapshot()));
            Ok(true)
        }
        ["help"] => {
            print_usage(program);
            Ok(true)
        }
        _ => {
            eprintln!("unrecognised command: {}", words.join(" "));
            print_usage(program);
            Ok(false)
        }
    }
}

async fn run_repl(console: &ConsoleClient, program: &str) -> Result<()> {
    let mut rl = rustyline::DefaultEditor::new().context("starting line editor")?;
    if console.session().check_auth().await {
        println!("restored session for {}", console.session().identity().username);
    }
    println!("vecdesk interpreter. Type 'help' for commands.");
    loop {
        let prompt = format!("{}> ", console.navigator().current_path());
        let line = match rl.readline(&prompt) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);
        let words: Vec<&str> = line.split_whitespace().collect();
        if matches!(words[0], "quit" | "exit") {
            break;
        }
        if let Err(e) = run_command(console, &words, program).await {
            eprintln!("error: {:#}", e);
        }
    }
    Ok(())
}
