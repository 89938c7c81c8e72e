//! Group command handlers.

use anyhow::Result;
use huddle_core::Api;
use huddle_types::{Group, GroupType, NewGroup};

use crate::cli::user_error;

pub async fn list(api: &Api) -> Result<()> {
    let groups = api.user_groups().await.map_err(user_error)?;
    if groups.is_empty() {
        println!("You are not in any groups yet.");
    } else {
        print_groups(&groups);
    }
    Ok(())
}

pub async fn public(api: &Api) -> Result<()> {
    let groups = api.public_groups().await.map_err(user_error)?;
    if groups.is_empty() {
        println!("No public groups.");
    } else {
        print_groups(&groups);
    }
    Ok(())
}

pub async fn create(api: &Api, name: &str, private: bool) -> Result<()> {
    let group = NewGroup {
        name: name.trim().to_string(),
        kind: if private {
            GroupType::Private
        } else {
            GroupType::Public
        },
    };
    api.create_group(&group).await.map_err(user_error)?;
    println!("Created {} group '{}'", group.kind, group.name);
    Ok(())
}

pub async fn join(api: &Api, id: &str) -> Result<()> {
    api.join_group(id).await.map_err(user_error)?;
    println!("Joined group {id}");
    Ok(())
}

pub async fn show(api: &Api, id: &str) -> Result<()> {
    let group = api.group_analytics(id).await.map_err(user_error)?;

    println!("{} ({})", group.name, group.kind);
    if let Some(admin) = &group.admin {
        println!("admin: {}", admin.display_name());
    }
    println!("members ({}):", group.members.len());
    for member in &group.members {
        println!("  {}", member.display_name());
    }
    Ok(())
}

fn print_groups(groups: &[Group]) {
    for group in groups {
        println!(
            "{}  {}  ({}, {} members)",
            group.id,
            group.name,
            group.kind,
            group.members.len()
        );
    }
}
