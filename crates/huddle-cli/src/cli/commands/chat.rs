//! Interactive chat loop.
//!
//! Rendering goes through a [`FaultBoundary`]: a failed load or send shows a
//! fallback until the user types `/retry`.

use anyhow::{Context, Result};
use huddle_core::boundary::{FAULT_TITLE, FaultBoundary};
use huddle_core::endpoints::Endpoint;
use huddle_core::{Api, ApiError};
use huddle_types::OutgoingMessage;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::messages::print_messages;
use crate::cli::user_error;

const RETRY_COMMAND: &str = "/retry";
const QUIT_COMMAND: &str = "/quit";

pub async fn run(api: &Api, group_id: &str) -> Result<()> {
    let me = match api.me().await {
        Ok(user) => Some(user.id),
        Err(err) if err.is_session_ended() => return Err(user_error(err)),
        Err(err) => {
            tracing::warn!(error = %err, "could not load profile");
            None
        }
    };

    let mut boundary = FaultBoundary::new();
    render(api, group_id, me.as_deref(), &mut boundary).await?;
    println!("Type a message and press Enter. {RETRY_COMMAND} after an error, {QUIT_COMMAND} exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        match line.trim() {
            QUIT_COMMAND => break,
            RETRY_COMMAND => {
                boundary.retry();
                api.invalidate(Endpoint::GroupMessages);
                render(api, group_id, me.as_deref(), &mut boundary).await?;
                continue;
            }
            _ if boundary.has_fault() => {
                print_fallback(&boundary);
                continue;
            }
            _ => {}
        }

        let sent = api
            .send_message(&OutgoingMessage {
                group_id: group_id.to_string(),
                content: line,
            })
            .await;

        match sent {
            Ok(_) => render(api, group_id, me.as_deref(), &mut boundary).await?,
            Err(ApiError::InvalidInput(message)) => eprintln!("{message}"),
            Err(err) if err.is_session_ended() => return Err(user_error(err)),
            Err(err) => {
                boundary.guard::<(), _>(Err(err.user_message()));
                print_fallback(&boundary);
            }
        }
    }

    Ok(())
}

/// Shows the group's messages, or the fallback when loading fails.
async fn render(
    api: &Api,
    group_id: &str,
    me: Option<&str>,
    boundary: &mut FaultBoundary,
) -> Result<()> {
    let loaded = api.group_messages(group_id).await;
    if let Err(err) = &loaded
        && err.is_session_ended()
    {
        anyhow::bail!("{}", err.user_message());
    }

    match boundary.guard(loaded.map_err(|err| err.user_message())) {
        Some(messages) => print_messages(&messages, me),
        None => print_fallback(boundary),
    }
    Ok(())
}

fn print_fallback(boundary: &FaultBoundary) {
    eprintln!("{FAULT_TITLE}");
    eprintln!("{}", boundary.fault_message());
    eprintln!("Type {RETRY_COMMAND} to try again.");
}
