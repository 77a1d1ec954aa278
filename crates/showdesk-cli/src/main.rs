//! Showdesk - a line-oriented front end for the show screen.
//!
//! Reads one command per line from stdin, runs it against the configured
//! identity service and GraphQL endpoint, and prints what the screen shows.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use showdesk_core::{Config, LoginForm, Screen};

// ============================================================================
// Constants
// ============================================================================

/// Show loaded by `load` without an argument
const DEFAULT_SHOW_ID: &str = "3";

/// Show deleted by `delete` without an argument
const DEFAULT_DELETE_ID: i64 = 3;

const HELP: &str = "\
commands:
  signin            sign in with the configured username and password
  signout           end the session
  whoami            show the signed-in user
  load [id]         load a show
  delete [id]       delete a show
  query <doc>       run a GraphQL query
  mutate <doc>      run a GraphQL mutation
  help              this text
  quit              exit";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=showdesk_core=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("Showdesk starting");

    let config = Arc::new(Config::load().context("Failed to load configuration")?);
    info!(mode = %config.authorization_mode, endpoint = %config.graphql_endpoint, "Configuration loaded");

    // One buffered reader for the whole session, so a prompt never eats command lines
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let login = login_form(&mut lines).await?;
    let mut screen = Screen::from_config(config, login)?;

    println!("{}", HELP);
    let result = run(&mut screen, &mut lines).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Showdesk shutting down");
    Ok(())
}

/// Username and password from the environment, prompting for what is missing.
async fn login_form<R>(lines: &mut Lines<R>) -> Result<LoginForm>
where
    R: AsyncBufRead + Unpin,
{
    let username = match std::env::var("SHOWDESK_USERNAME") {
        Ok(username) => username,
        Err(_) => {
            eprint!("Username: ");
            read_username(lines).await?
        }
    };
    let password = match std::env::var("SHOWDESK_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };
    Ok(LoginForm { username, password })
}

async fn read_username<R>(lines: &mut Lines<R>) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string())
        .context("No username given")
}

async fn run<R>(screen: &mut Screen, lines: &mut Lines<R>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let handle = match command {
            "signin" => screen.sign_in(),
            "signout" => screen.sign_out(),
            "whoami" => screen.who_am_i(),
            "load" => {
                let id = if rest.is_empty() { DEFAULT_SHOW_ID } else { rest };
                screen.load_show(id)
            }
            "delete" => {
                let id = if rest.is_empty() {
                    DEFAULT_DELETE_ID
                } else {
                    match rest.parse() {
                        Ok(id) => id,
                        Err(_) => {
                            println!("delete expects a numeric show id");
                            continue;
                        }
                    }
                };
                screen.delete_show(id)
            }
            "query" | "mutate" if rest.is_empty() => {
                println!("{} expects a GraphQL document", command);
                continue;
            }
            "query" => screen.run_query(rest, Map::<String, Value>::new()),
            "mutate" => screen.run_mutation(rest, Map::<String, Value>::new()),
            "help" => {
                println!("{}", HELP);
                continue;
            }
            "quit" | "exit" => break,
            other => {
                println!("unknown command: {} (try help)", other);
                continue;
            }
        };

        handle.await.context("Action task panicked")?;
        screen.check_background_tasks();
        println!("{}", screen.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_username_prompt_leaves_commands_unread() {
        let input: &[u8] = b"  test@test.de \nsignin\nload 3\n";
        let mut lines = BufReader::new(input).lines();

        assert_eq!(read_username(&mut lines).await.unwrap(), "test@test.de");
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("signin"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("load 3"));
    }

    #[tokio::test]
    async fn test_missing_username_is_an_error() {
        let input: &[u8] = b"";
        let mut lines = BufReader::new(input).lines();
        assert!(read_username(&mut lines).await.is_err());
    }
}
