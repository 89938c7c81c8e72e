//! Wire and domain types shared by the huddle client crates.
//!
//! Field names follow the backend's JSON (`_id`, camelCase timestamps); the
//! Rust side uses snake_case throughout.

mod auth;
mod envelope;
mod group;
mod message;
mod user;

pub use auth::{Credentials, RefreshRequest, Registration, TokenPair};
pub use envelope::Envelope;
pub use group::{
    Group, GroupAnalytics, GroupMember, GroupType, MemberProfile, NewGroup, UserGroups,
};
pub use message::{Message, MessageQuery, OutgoingMessage};
pub use user::{ProfileUpdate, Role, User};
