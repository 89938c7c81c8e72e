//! Authenticated request layer.
//!
//! Every bearer-authenticated call goes through [`ApiClient::execute`], which
//! attaches the session's access token and recovers from exactly one kind of
//! failure: the backend answering `Unauthorized`. Recovery is one refresh
//! exchange followed by one retry; the retry's outcome is final.

use std::sync::Arc;
use std::time::Duration;

use huddle_types::{Envelope, RefreshRequest, TokenPair};
use reqwest::header::{AUTHORIZATION, USER_AGENT as USER_AGENT_HEADER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::RequestCache;
use crate::config::Config;
use crate::endpoints::{AuthMode, Endpoint};
use crate::error::{ApiError, ApiResult};
use crate::guards::Route;
use crate::navigation::{Navigator, RecordingNavigator};
use crate::session::SessionHandle;
use crate::token_store::{MemoryTokenStore, TokenStore, mask_token};

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("huddle/", env!("CARGO_PKG_VERSION"));

/// Body the backend sends when an access token is missing, invalid or expired.
const UNAUTHORIZED_BODY: &str = "Unauthorized";

/// How concurrent authorization failures share refresh exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Exchanges are serialized; a request whose stale token was already
    /// replaced retries with the new one instead of refreshing again.
    #[default]
    SingleFlight,
    /// Every failing request refreshes on its own. Last write wins.
    Independent,
}

/// Image sent to `/users/upload-image`.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Multipart field name the backend reads the file from.
const UPLOAD_FIELD: &str = "image";

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Rebuilt into a fresh multipart form on every attempt.
    Upload(ImageUpload),
}

/// A described HTTP operation.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub path: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            path: endpoint.path(None),
            body: RequestBody::Empty,
        }
    }

    /// Substitutes the `{id}` path parameter.
    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.path = self.endpoint.path(Some(id));
        self
    }

    pub fn with_json(mut self, body: &impl Serialize) -> ApiResult<Self> {
        let value = serde_json::to_value(body).map_err(|source| ApiError::Decode {
            endpoint: self.endpoint.name(),
            source,
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    #[must_use]
    pub fn with_upload(mut self, upload: ImageUpload) -> Self {
        self.body = RequestBody::Upload(upload);
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub endpoint: Endpoint,
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Decodes the `{ data, message, success }` envelope.
    pub fn envelope<T: DeserializeOwned>(&self) -> ApiResult<Envelope<T>> {
        serde_json::from_str(&self.body).map_err(|source| ApiError::Decode {
            endpoint: self.endpoint.name(),
            source,
        })
    }
}

/// Outcome of a single network attempt.
enum Attempt {
    Done(ApiResponse),
    AuthorizationExpired { status: u16, body: String },
}

/// Returns true for the backend's authorization-failure body: the literal
/// string `Unauthorized`, raw or as a JSON string.
pub fn is_authorization_failure(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed == UNAUTHORIZED_BODY
        || serde_json::from_str::<String>(trimmed).is_ok_and(|s| s == UNAUTHORIZED_BODY)
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    cache: RequestCache,
    policy: RefreshPolicy,
    refresh_lock: tokio::sync::Mutex<()>,
}

pub struct ApiClientBuilder {
    base_url: String,
    session: SessionHandle,
    store: Option<Arc<dyn TokenStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    policy: RefreshPolicy,
    cache_ttl: Option<Duration>,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    #[must_use]
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    #[must_use]
    pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Applies transport, cache and refresh settings from config.
    #[must_use]
    pub fn config(self, config: &Config) -> Self {
        self.refresh_policy(config.refresh_policy)
            .cache_ttl(config.cache_ttl())
            .timeout(config.request_timeout())
    }

    pub fn build(self) -> ApiResult<ApiClient> {
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        Ok(ApiClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            session: self.session,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()) as Arc<dyn TokenStore>),
            navigator: self
                .navigator
                .unwrap_or_else(|| Arc::new(RecordingNavigator::new()) as Arc<dyn Navigator>),
            cache: RequestCache::new(self.cache_ttl),
            policy: self.policy,
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>, session: SessionHandle) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            session,
            store: None,
            navigator: None,
            policy: RefreshPolicy::default(),
            cache_ttl: None,
            timeout: None,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn token_store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// Executes a request. Bearer endpoints get the refresh protocol;
    /// public ones are sent once, as-is.
    pub async fn execute(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        match request.endpoint.auth() {
            AuthMode::Public => match self.attempt(request, None).await? {
                Attempt::Done(response) => Ok(response),
                Attempt::AuthorizationExpired { status, body } => {
                    Err(ApiError::from_response(status, &body))
                }
            },
            AuthMode::Bearer => Box::pin(self.execute_authenticated(request)).await,
        }
    }

    async fn execute_authenticated(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let token = self.session.access_token();
        let body = match self.attempt(request, Some(&token)).await? {
            Attempt::Done(response) => return Ok(response),
            Attempt::AuthorizationExpired { body, .. } => body,
        };

        tracing::debug!(endpoint = %request.endpoint, "access token rejected");

        match self.policy {
            RefreshPolicy::Independent => self.refresh_and_retry(request, body).await,
            RefreshPolicy::SingleFlight => {
                let _guard = self.refresh_lock.lock().await;
                let current = self.session.access_token();
                if !current.is_empty() && current != token {
                    tracing::debug!(
                        endpoint = %request.endpoint,
                        "token already refreshed by a concurrent request"
                    );
                    return self.retry(request, &current).await;
                }
                self.refresh_and_retry(request, body).await
            }
        }
    }

    async fn refresh_and_retry(
        &self,
        request: &ApiRequest,
        original_body: String,
    ) -> ApiResult<ApiResponse> {
        let refresh_token = self.session.refresh_token();
        if refresh_token.is_empty() {
            tracing::warn!(endpoint = %request.endpoint, "unauthorized and no refresh token");
            self.end_session();
            return Err(ApiError::Unauthorized {
                message: original_body.trim().trim_matches('"').to_string(),
            });
        }

        let pair = match self.exchange_refresh_token(&refresh_token).await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                self.end_session();
                return Err(ApiError::RefreshFailed {
                    message: err.user_message(),
                });
            }
        };

        tracing::info!(access = %mask_token(&pair.access_token), "access token refreshed");
        if let Err(err) = self.store.save(&pair) {
            tracing::warn!(error = %format!("{err:#}"), "failed to persist refreshed tokens");
        }
        let access = pair.access_token.clone();
        self.session.set_tokens(pair);

        self.retry(request, &access).await
    }

    /// The single retry. An authorization failure here is final.
    async fn retry(&self, request: &ApiRequest, token: &str) -> ApiResult<ApiResponse> {
        match self.attempt(request, Some(token)).await? {
            Attempt::Done(response) => Ok(response),
            Attempt::AuthorizationExpired { body, .. } => {
                tracing::warn!(endpoint = %request.endpoint, "retry rejected after refresh");
                Err(ApiError::Unauthorized {
                    message: body.trim().trim_matches('"').to_string(),
                })
            }
        }
    }

    /// Exchanges a refresh token for a new pair. Never refreshes recursively.
    pub async fn exchange_refresh_token(&self, refresh_token: &str) -> ApiResult<TokenPair> {
        let request = ApiRequest::new(Endpoint::RefreshToken).with_json(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        })?;
        let response = self.execute(&request).await?;
        let pair = response.envelope::<TokenPair>()?.data;
        if pair.access_token.is_empty() {
            return Err(ApiError::Http {
                status: response.status,
                message: "Refresh response carried no access token".to_string(),
            });
        }
        Ok(pair)
    }

    /// Clears session, cache and persisted tokens, then sends the user to
    /// the login route.
    pub fn end_session(&self) {
        if let Err(err) = self.clear_local_session() {
            tracing::warn!(error = %format!("{err:#}"), "failed to clear persisted tokens");
        }
        self.navigator.redirect(Route::UNAUTHENTICATED_ENTRY);
    }

    /// Forgets tokens, user and cached queries without navigating.
    pub fn clear_local_session(&self) -> anyhow::Result<()> {
        self.session.reset_tokens();
        self.session.set_user(None);
        self.cache.clear();
        self.store.clear()
    }

    async fn attempt(&self, request: &ApiRequest, token: Option<&str>) -> ApiResult<Attempt> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.endpoint.method(), &url)
            .header(USER_AGENT_HEADER, USER_AGENT);

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            builder = builder.header(AUTHORIZATION, format!("bearer {token}"));
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Upload(upload) => {
                let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
                    .file_name(upload.file_name.clone())
                    .mime_str(&upload.mime_type)?;
                builder.multipart(reqwest::multipart::Form::new().part(UPLOAD_FIELD, part))
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(
            endpoint = %request.endpoint,
            method = %request.endpoint.method(),
            path = %request.path,
            status = status.as_u16(),
            "request finished"
        );

        if status.is_success() {
            Ok(Attempt::Done(ApiResponse {
                endpoint: request.endpoint,
                status: status.as_u16(),
                body,
            }))
        } else if is_authorization_failure(&body) {
            Ok(Attempt::AuthorizationExpired {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ApiError::from_response(status.as_u16(), &body))
        }
    }
}
