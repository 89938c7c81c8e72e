//! Catalog of backend operations.
//!
//! Each [`Endpoint`] declares its HTTP method, path template, whether it is a
//! cacheable read, whether it carries bearer auth, and which cached reads it
//! makes stale.

use std::fmt;

use reqwest::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Me,
    Login,
    Register,
    UpdateUser,
    Logout,
    UploadImage,
    RefreshToken,
    UserGroups,
    PublicGroups,
    GroupAnalytics,
    CreateGroup,
    JoinGroup,
    GroupMessages,
    SendMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Read; results may be cached.
    Query,
    /// Write; invalidates related queries.
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Sent with the session's bearer token and the refresh protocol.
    Bearer,
    /// Token-issuing calls: no bearer token, no refresh handling.
    Public,
}

impl Endpoint {
    pub const ALL: [Endpoint; 14] = [
        Endpoint::Me,
        Endpoint::Login,
        Endpoint::Register,
        Endpoint::UpdateUser,
        Endpoint::Logout,
        Endpoint::UploadImage,
        Endpoint::RefreshToken,
        Endpoint::UserGroups,
        Endpoint::PublicGroups,
        Endpoint::GroupAnalytics,
        Endpoint::CreateGroup,
        Endpoint::JoinGroup,
        Endpoint::GroupMessages,
        Endpoint::SendMessage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Me => "me",
            Endpoint::Login => "login",
            Endpoint::Register => "register",
            Endpoint::UpdateUser => "updateUser",
            Endpoint::Logout => "logout",
            Endpoint::UploadImage => "uploadImage",
            Endpoint::RefreshToken => "refreshToken",
            Endpoint::UserGroups => "getUserGroups",
            Endpoint::PublicGroups => "getPublicGroups",
            Endpoint::GroupAnalytics => "getGroupAnalytics",
            Endpoint::CreateGroup => "createGroup",
            Endpoint::JoinGroup => "joinPublicGroup",
            Endpoint::GroupMessages => "getGroupMsgs",
            Endpoint::SendMessage => "sendMsg",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::Me
            | Endpoint::UserGroups
            | Endpoint::PublicGroups
            | Endpoint::GroupAnalytics => Method::GET,
            Endpoint::UpdateUser => Method::PUT,
            Endpoint::Login
            | Endpoint::Register
            | Endpoint::Logout
            | Endpoint::UploadImage
            | Endpoint::RefreshToken
            | Endpoint::CreateGroup
            | Endpoint::JoinGroup
            | Endpoint::GroupMessages
            | Endpoint::SendMessage => Method::POST,
        }
    }

    /// Path template; `{id}` is the only parameter.
    pub fn path_template(self) -> &'static str {
        match self {
            Endpoint::Me => "/users/me",
            Endpoint::Login => "/users/login",
            Endpoint::Register => "/users/",
            Endpoint::UpdateUser => "/users/{id}",
            Endpoint::Logout => "/users/logout",
            Endpoint::UploadImage => "/users/upload-image",
            Endpoint::RefreshToken => "/users/refresh-token",
            Endpoint::UserGroups => "/users/get-user-groups",
            Endpoint::PublicGroups => "/group/public",
            Endpoint::GroupAnalytics => "/group/group-data/{id}",
            Endpoint::CreateGroup => "/group/",
            Endpoint::JoinGroup => "/group/{id}/join",
            Endpoint::GroupMessages => "/message/get-all",
            Endpoint::SendMessage => "/message/send",
        }
    }

    pub fn kind(self) -> EndpointKind {
        match self {
            // get-all is a POST on the wire but only reads.
            Endpoint::Me
            | Endpoint::UserGroups
            | Endpoint::PublicGroups
            | Endpoint::GroupAnalytics
            | Endpoint::GroupMessages => EndpointKind::Query,
            _ => EndpointKind::Mutation,
        }
    }

    pub fn auth(self) -> AuthMode {
        match self {
            Endpoint::Login | Endpoint::Register | Endpoint::RefreshToken => AuthMode::Public,
            _ => AuthMode::Bearer,
        }
    }

    /// Cached queries made stale by a successful call to this endpoint.
    ///
    /// Group-specific invalidations (analytics, messages of one group) are
    /// keyed by arguments and handled by the caller.
    pub fn invalidates(self) -> &'static [Endpoint] {
        match self {
            Endpoint::UpdateUser | Endpoint::UploadImage => &[Endpoint::Me],
            Endpoint::CreateGroup | Endpoint::JoinGroup => {
                &[Endpoint::UserGroups, Endpoint::PublicGroups]
            }
            _ => &[],
        }
    }

    /// Substitutes `{id}` in the path template, percent-encoding the value.
    pub fn path(self, id: Option<&str>) -> String {
        let template = self.path_template();
        match id {
            Some(id) if template.contains("{id}") => {
                template.replace("{id}", &encode_segment(id))
            }
            _ => template.to_string(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
