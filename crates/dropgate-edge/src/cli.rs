//! Terminal commands that act as a browser session.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use dropgate_core::auth::document_store::COOKIE_JAR_FILE;
use dropgate_core::auth::{CredentialStore, DocumentCookieStore, ExecutionContext};
use dropgate_core::{AlertKind, ApiClient, AppContext, Config};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Optional email; falls back to the last one used, then a prompt.
    SignIn(Option<String>),
    WhoAmI,
    SignOut,
}

impl Command {
    pub fn parse(args: &[String]) -> Option<Self> {
        match args.first().map(String::as_str)? {
            "--sign-in" => Some(Self::SignIn(args.get(1).cloned())),
            "--whoami" => Some(Self::WhoAmI),
            "--sign-out" => Some(Self::SignOut),
            _ => None,
        }
    }
}

pub async fn run(command: Command, mut config: Config) -> Result<()> {
    let jar_path = config.cache_dir()?.join(COOKIE_JAR_FILE);
    let jar = Arc::new(DocumentCookieStore::persistent(
        jar_path,
        config.pages_origin_is_https(),
    )?);
    let api = ApiClient::new(config.api_base_url.clone(), ExecutionContext::Browser, jar.clone())?;
    let ctx = AppContext::new(None);

    match command {
        Command::SignIn(email) => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password = rpassword::prompt_password(format!("Password for {}: ", email))
                .context("Failed to read password")?;

            match api.sign_in(&email, &password).await {
                Ok(message) => {
                    ctx.show_alert(message, AlertKind::Success);
                    config.last_email = Some(email);
                    if let Err(e) = config.save() {
                        tracing::warn!(error = %e, "Failed to save config");
                    }
                }
                Err(e) => {
                    ctx.show_alert(e.to_string(), AlertKind::Error);
                    for (field, message) in e.field_errors() {
                        eprintln!("  {}: {}", field, message);
                    }
                }
            }
        }
        Command::WhoAmI => match api.current_identity().await {
            Ok(identity) => {
                let role = if identity.is_vendor {
                    "vendor"
                } else if identity.is_agent {
                    "agent"
                } else {
                    "no role"
                };
                ctx.show_alert(format!("{} ({})", identity.display_name(), role), AlertKind::Success);
                ctx.set_identity(Some(identity));
            }
            Err(e) if e.is_unauthorized() => {
                ctx.show_alert("Not signed in", AlertKind::Warning);
            }
            Err(e) => ctx.show_alert(e.to_string(), AlertKind::Error),
        },
        Command::SignOut => {
            jar.clear();
            ctx.show_alert("Signed out", AlertKind::Success);
        }
    }

    report(&ctx)
}

/// Print the command's alert. An error alert becomes the command's error.
fn report(ctx: &AppContext) -> Result<()> {
    let alert = ctx.alert();
    if !alert.show {
        return Ok(());
    }
    match alert.kind {
        AlertKind::Success => println!("{}", alert.message),
        AlertKind::Warning => eprintln!("Warning: {}", alert.message),
        AlertKind::Error => anyhow::bail!("{}", alert.message),
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        anyhow::bail!("An email address is required");
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&args(&["--whoami"])), Some(Command::WhoAmI));
        assert_eq!(Command::parse(&args(&["--sign-out"])), Some(Command::SignOut));
        assert_eq!(
            Command::parse(&args(&["--sign-in", "ada@shop.ng"])),
            Some(Command::SignIn(Some("ada@shop.ng".into())))
        );
        assert_eq!(Command::parse(&args(&["--sign-in"])), Some(Command::SignIn(None)));
    }

    #[test]
    fn test_error_alert_fails_the_command() {
        let ctx = AppContext::new(None);
        ctx.show_alert("Invalid email or password", AlertKind::Error);
        let err = report(&ctx).unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[test]
    fn test_success_and_warning_alerts_are_ok() {
        let ctx = AppContext::new(None);
        assert!(report(&ctx).is_ok());

        ctx.show_alert("Signed out", AlertKind::Success);
        assert!(report(&ctx).is_ok());

        ctx.show_alert("Not signed in", AlertKind::Warning);
        assert!(report(&ctx).is_ok());
    }

    #[test]
    fn test_no_command_means_serve() {
        assert_eq!(Command::parse(&args(&[])), None);
        assert_eq!(Command::parse(&args(&["--verbose"])), None);
    }
}
