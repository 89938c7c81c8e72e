//! Session, token refresh and request caching for the huddle chat backend.

pub mod api;
pub mod boundary;
pub mod cache;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod guards;
pub mod logging;
pub mod navigation;
pub mod session;
pub mod token_store;

pub use api::Api;
pub use client::{ApiClient, ApiRequest, ImageUpload, RefreshPolicy};
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use guards::{Guard, GuardOutcome, Route};
pub use navigation::{Navigator, RecordingNavigator};
pub use session::{Session, SessionHandle};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
