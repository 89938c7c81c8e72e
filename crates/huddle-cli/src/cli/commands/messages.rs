//! Message command handlers.

use anyhow::Result;
use huddle_core::Api;
use huddle_types::{Message, OutgoingMessage};

use crate::cli::user_error;

pub async fn list(api: &Api, group_id: &str) -> Result<()> {
    let messages = api.group_messages(group_id).await.map_err(user_error)?;
    let me = api.session().user().map(|u| u.id);
    print_messages(&messages, me.as_deref());
    Ok(())
}

pub async fn send(api: &Api, group_id: &str, content: &str) -> Result<()> {
    api.send_message(&OutgoingMessage {
        group_id: group_id.to_string(),
        content: content.to_string(),
    })
    .await
    .map_err(user_error)?;
    println!("Sent.");
    Ok(())
}

pub(crate) fn print_messages(messages: &[Message], me: Option<&str>) {
    if messages.is_empty() {
        println!("No messages yet.");
        return;
    }
    for message in messages {
        println!("{}", format_message(message, me));
    }
}

fn format_message(message: &Message, me: Option<&str>) -> String {
    let sender = if me == Some(message.sender_id.as_str()) {
        "you"
    } else {
        message.sender_id.as_str()
    };
    match message.created_at {
        Some(at) => format!("[{}] {sender}: {}", at.format("%Y-%m-%d %H:%M"), message.content),
        None => format!("{sender}: {}", message.content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, content: &str) -> Message {
        Message {
            content: content.to_string(),
            sender_id: sender.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_own_messages_are_marked() {
        assert_eq!(format_message(&message("u1", "hi"), Some("u1")), "you: hi");
        assert_eq!(format_message(&message("u2", "yo"), Some("u1")), "u2: yo");
        assert_eq!(format_message(&message("u2", "yo"), None), "u2: yo");
    }
}
