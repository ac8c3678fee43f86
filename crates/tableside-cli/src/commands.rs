//! CLI subcommands.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::warn;

use tableside_core::auth::validate_password;
use tableside_core::models::RegisterRequest;
use tableside_core::utils::format_remaining;
use tableside_core::{ApiClient, Config};

/// Maximum length for username input, matching the server's column size.
const MAX_USERNAME_LENGTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(Option<String>),
    Logout,
    Whoami,
    Status,
    Refresh,
    Register,
}

impl Command {
    pub fn parse(args: &[String]) -> Option<Self> {
        let name = args.first()?;
        let command = match name.as_str() {
            "login" => Command::Login(args.get(1).cloned()),
            "logout" => Command::Logout,
            "whoami" | "me" => Command::Whoami,
            "status" => Command::Status,
            "refresh" => Command::Refresh,
            "register" => Command::Register,
            _ => return None,
        };
        Some(command)
    }
}

pub async fn run(command: Command, client: &ApiClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login(username) => login(client, config, username).await,
        Command::Logout => {
            client.logout()?;
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => whoami(client).await,
        Command::Status => {
            status(client, config);
            Ok(())
        }
        Command::Refresh => refresh(client).await,
        Command::Register => register(client).await,
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

fn prompt_username(label: &str) -> Result<String> {
    let username = prompt(label)?;
    if username.is_empty() || username.len() > MAX_USERNAME_LENGTH {
        anyhow::bail!("Username must be 1-{} characters", MAX_USERNAME_LENGTH);
    }
    Ok(username)
}

async fn login(client: &ApiClient, config: &mut Config, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(name) => name,
        None => prompt_username("Username: ")?,
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", username))?;

    client.login(&username, &password).await?;

    config.last_username = Some(username.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    match client.session().token_info() {
        Some(info) => println!(
            "Logged in as {} (session expires in {})",
            username,
            format_remaining(info.remaining_seconds)
        ),
        None => println!("Logged in as {}", username),
    }
    Ok(())
}

async fn whoami(client: &ApiClient) -> Result<()> {
    let user = client.me().await?;
    println!("{}", user.summary());
    println!("  email: {}", user.email);
    if user.role.is_staff() {
        let on_shift = if user.is_currently_working { "yes" } else { "no" };
        println!("  on shift: {}", on_shift);
    }
    Ok(())
}

/// Report token state from local claims only.
fn status(client: &ApiClient, config: &Config) {
    let session = client.session();
    println!("Server: {}", session.base_url());

    let Some(info) = session.token_info() else {
        if session.get_token().is_some() {
            println!("Stored token is unreadable - please log in again");
        } else {
            println!("Not logged in");
        }
        return;
    };

    println!("User: {}", info.subject.as_deref().unwrap_or("(unknown)"));
    println!("Expires: {}", info.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if info.is_expired {
        println!("Status: expired - please log in again");
    } else if info.needs_refresh(config.refresh_threshold()) {
        println!(
            "Status: valid, {} left (server will rotate on next request)",
            format_remaining(info.remaining_seconds)
        );
    } else {
        println!("Status: valid, {} left", format_remaining(info.remaining_seconds));
    }
}

async fn refresh(client: &ApiClient) -> Result<()> {
    let session = client.session();
    let before = session.get_token();
    let after = session.refresh().await?;

    if before.as_deref() == Some(after.as_str()) {
        println!("Session still valid; server did not rotate the token");
    } else {
        println!("Session token rotated");
    }
    if let Some(info) = session.token_info() {
        println!("Expires in {}", format_remaining(info.remaining_seconds));
    }
    Ok(())
}

async fn register(client: &ApiClient) -> Result<()> {
    let username = prompt_username("Username: ")?;
    let email = prompt("Email: ")?;
    let age: i32 = prompt("Age: ")?.parse().context("Age must be a number")?;

    let password = rpassword::prompt_password("Password: ")?;
    validate_password(&password)?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }

    let created = client
        .register(&RegisterRequest {
            username,
            email,
            password,
            age,
            gender: None,
        })
        .await?;

    println!("Registered {} <{}>", created.username, created.email);
    println!("Run `tableside login {}` to start a session", created.username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&args(&["login"])), Some(Command::Login(None)));
        assert_eq!(
            Command::parse(&args(&["login", "waiter1"])),
            Some(Command::Login(Some("waiter1".to_string())))
        );
        assert_eq!(Command::parse(&args(&["me"])), Some(Command::Whoami));
        assert_eq!(Command::parse(&args(&["status"])), Some(Command::Status));
        assert_eq!(Command::parse(&args(&["refresh"])), Some(Command::Refresh));
    }

    #[test]
    fn test_parse_unknown_or_empty() {
        assert_eq!(Command::parse(&args(&[])), None);
        assert_eq!(Command::parse(&args(&["orders"])), None);
    }
}
