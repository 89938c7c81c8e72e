//! Typed backend operations.
//!
//! Queries go through the [`RequestCache`](crate::cache::RequestCache);
//! mutations invalidate the queries they make stale.

use huddle_types::{
    Credentials, Envelope, Group, GroupAnalytics, Message, MessageQuery, NewGroup,
    OutgoingMessage, ProfileUpdate, Registration, TokenPair, User, UserGroups,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::CacheKey;
use crate::client::{ApiClient, ApiRequest, ImageUpload};
use crate::endpoints::Endpoint;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionHandle;

pub const EMPTY_MESSAGE: &str = "Please enter a message.";
pub const NO_GROUP_SELECTED: &str = "Select a group to send a message.";

pub struct Api {
    client: ApiClient,
}

impl Api {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &SessionHandle {
        self.client.session()
    }

    /// Drops cached results for `endpoint` so the next call refetches.
    pub fn invalidate(&self, endpoint: Endpoint) {
        self.client.cache().invalidate(endpoint);
    }

    pub async fn me(&self) -> ApiResult<User> {
        let user: User = self
            .query(ApiRequest::new(Endpoint::Me), CacheKey::bare(Endpoint::Me))
            .await?;
        self.session().set_user(Some(user.clone()));
        Ok(user)
    }

    /// Logs in and installs the issued tokens. A rejected login clears any
    /// tokens the session still held.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<TokenPair> {
        let result = async {
            let request = ApiRequest::new(Endpoint::Login).with_json(credentials)?;
            self.client.execute(&request).await?.envelope::<TokenPair>()
        }
        .await;

        let pair = match result {
            Ok(envelope) => envelope.data,
            Err(err) => {
                tracing::debug!(error = %err, "login rejected");
                self.session().reset_tokens();
                return Err(err);
            }
        };

        self.client
            .token_store()
            .save(&pair)
            .map_err(ApiError::Storage)?;
        self.session().set_tokens(pair.clone());
        self.client.cache().clear();
        tracing::info!("logged in");
        Ok(pair)
    }

    pub async fn register(&self, registration: &Registration) -> ApiResult<User> {
        let request = ApiRequest::new(Endpoint::Register).with_json(registration)?;
        self.mutate(request).await
    }

    pub async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> ApiResult<User> {
        require(user_id, "User id is required.")?;
        let request = ApiRequest::new(Endpoint::UpdateUser)
            .with_id(user_id)
            .with_json(update)?;
        self.mutate(request).await
    }

    /// Ends the session server-side, then forgets it locally.
    pub async fn logout(&self) -> ApiResult<()> {
        self.client
            .execute(&ApiRequest::new(Endpoint::Logout))
            .await?;
        self.client
            .clear_local_session()
            .map_err(ApiError::Storage)?;
        tracing::info!("logged out");
        Ok(())
    }

    pub async fn upload_image(&self, upload: ImageUpload) -> ApiResult<User> {
        let request = ApiRequest::new(Endpoint::UploadImage).with_upload(upload);
        self.mutate(request).await
    }

    pub async fn user_groups(&self) -> ApiResult<Vec<Group>> {
        let groups: UserGroups = self
            .query(
                ApiRequest::new(Endpoint::UserGroups),
                CacheKey::bare(Endpoint::UserGroups),
            )
            .await?;
        Ok(groups.groups)
    }

    pub async fn public_groups(&self) -> ApiResult<Vec<Group>> {
        self.query(
            ApiRequest::new(Endpoint::PublicGroups),
            CacheKey::bare(Endpoint::PublicGroups),
        )
        .await
    }

    pub async fn group_analytics(&self, group_id: &str) -> ApiResult<Group> {
        require(group_id, "Group id is required.")?;
        let analytics: GroupAnalytics = self
            .query(
                ApiRequest::new(Endpoint::GroupAnalytics).with_id(group_id),
                analytics_key(group_id),
            )
            .await?;
        Ok(analytics.group)
    }

    pub async fn create_group(&self, group: &NewGroup) -> ApiResult<Value> {
        require(&group.name, "Group name is required.")?;
        let request = ApiRequest::new(Endpoint::CreateGroup).with_json(group)?;
        self.mutate(request).await
    }

    pub async fn join_group(&self, group_id: &str) -> ApiResult<Value> {
        require(group_id, "Group id is required.")?;
        let request = ApiRequest::new(Endpoint::JoinGroup).with_id(group_id);
        let joined = self.mutate(request).await?;
        self.client.cache().invalidate_key(&analytics_key(group_id));
        Ok(joined)
    }

    pub async fn group_messages(&self, group_id: &str) -> ApiResult<Vec<Message>> {
        require(group_id, "Group id is required.")?;
        let query = MessageQuery {
            group_id: group_id.to_string(),
        };
        let request = ApiRequest::new(Endpoint::GroupMessages).with_json(&query)?;
        self.query(request, CacheKey::with_args(Endpoint::GroupMessages, &query))
            .await
    }

    pub async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<Value> {
        if message.content.trim().is_empty() {
            return Err(ApiError::InvalidInput(EMPTY_MESSAGE.to_string()));
        }
        if message.group_id.trim().is_empty() {
            return Err(ApiError::InvalidInput(NO_GROUP_SELECTED.to_string()));
        }

        let request = ApiRequest::new(Endpoint::SendMessage).with_json(message)?;
        let sent = self.mutate(request).await?;
        self.client.cache().invalidate_key(&CacheKey::with_args(
            Endpoint::GroupMessages,
            &MessageQuery {
                group_id: message.group_id.clone(),
            },
        ));
        Ok(sent)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        key: CacheKey,
    ) -> ApiResult<T> {
        let endpoint = request.endpoint;
        if let Some(cached) = self.client.cache().get(&key) {
            tracing::debug!(endpoint = %endpoint, "cache hit");
            return decode(endpoint, cached);
        }

        let data = self.execute_for_data(&request).await?;
        let decoded = decode(endpoint, data.clone())?;
        self.client.cache().insert(key, data);
        Ok(decoded)
    }

    async fn mutate<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let endpoint = request.endpoint;
        let data = self.execute_for_data(&request).await?;
        for stale in endpoint.invalidates() {
            self.client.cache().invalidate(*stale);
        }
        decode(endpoint, data)
    }

    /// Executes and unwraps the envelope. A missing `data` field reads as null.
    async fn execute_for_data(&self, request: &ApiRequest) -> ApiResult<Value> {
        let envelope: Envelope<Option<Value>> = self.client.execute(request).await?.envelope()?;
        Ok(envelope.data.unwrap_or(Value::Null))
    }
}

fn analytics_key(group_id: &str) -> CacheKey {
    CacheKey::with_args(Endpoint::GroupAnalytics, &group_id)
}

fn require(value: &str, message: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        Err(ApiError::InvalidInput(message.to_string()))
    } else {
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|source| ApiError::Decode {
        endpoint: endpoint.name(),
        source,
    })
}
