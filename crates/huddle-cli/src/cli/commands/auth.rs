//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use huddle_core::Api;
use huddle_core::token_store::mask_token;
use huddle_types::{Credentials, Registration};

use crate::cli::user_error;

pub async fn login(api: &Api, email: &str, password: Option<String>) -> Result<()> {
    let credentials = Credentials {
        email: email.trim().to_string(),
        password: resolve_password(password)?,
    };

    let pair = api.login(&credentials).await.map_err(user_error)?;
    println!(
        "Logged in as {} (token: {})",
        credentials.email,
        mask_token(&pair.access_token)
    );
    Ok(())
}

pub async fn register(api: &Api, name: &str, email: &str, password: Option<String>) -> Result<()> {
    let registration = Registration {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
        password: resolve_password(password)?,
    };

    let user = api.register(&registration).await.map_err(user_error)?;
    println!("Registered {} <{}>", user.name, user.email);
    println!("Run `huddle login --email {}` to sign in.", user.email);
    Ok(())
}

pub async fn logout(api: &Api) -> Result<()> {
    match api.logout().await {
        Ok(()) => {
            println!("Logged out.");
            Ok(())
        }
        // the session was already torn down by the request layer
        Err(err) if err.is_session_ended() => {
            println!("Logged out.");
            Ok(())
        }
        Err(err) => Err(user_error(err)),
    }
}

pub async fn whoami(api: &Api) -> Result<()> {
    let user = api.me().await.map_err(user_error)?;
    println!("{} <{}>", user.name, user.email);
    println!("id:   {}", user.id);
    println!("role: {}", user.role);
    if let Some(image) = user.image_url.as_deref() {
        println!("image: {image}");
    }
    Ok(())
}

/// Uses the flag value, or reads one line from stdin.
pub(crate) fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    if io::stdin().is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("read password from stdin")?;

    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }
    Ok(password)
}
