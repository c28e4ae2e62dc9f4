use crate::core::{CompatibilityError, PersonalityScorer, ProfileStore, Result};
use crate::models::{MessageRecord, ProfileRecord, TraitScores};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with Supabase
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<SupabaseError> for CompatibilityError {
    fn from(e: SupabaseError) -> Self {
        match e {
            SupabaseError::NotFound(id) => CompatibilityError::ProfileNotFound(id),
            other => CompatibilityError::Store(other.to_string()),
        }
    }
}

/// Supabase REST (PostgREST) client
///
/// Read-only access to the profile/interaction tables the feature extractor
/// needs, plus the `trait_compatibility` RPC for the personality subroutine.
pub struct SupabaseClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SupabaseClient {
    /// Create a new Supabase client
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            client,
        }
    }

    fn rest_url(&self, table_and_query: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            table_and_query
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Fetch a single profile row by user id
    pub async fn fetch_profile(
        &self,
        user_id: &str,
    ) -> std::result::Result<ProfileRecord, SupabaseError> {
        let url = self.rest_url(&format!(
            "profiles?select=id,age,latitude,longitude,interests&id=eq.{}",
            urlencoding::encode(user_id)
        ));

        tracing::debug!("Fetching profile for user: {}", user_id);

        let response = self.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(SupabaseError::ApiError(format!(
                "Failed to fetch profile: {}",
                response.status()
            )));
        }

        let rows: Vec<ProfileRecord> = response.json().await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(user_id.to_string()))
    }

    /// Count rows matching a PostgREST filter via `Prefer: count=exact`
    ///
    /// Uses a HEAD request and parses the `Content-Range` header, so no row
    /// bodies cross the wire.
    async fn fetch_count(&self, table_and_query: &str) -> std::result::Result<u32, SupabaseError> {
        let url = self.rest_url(table_and_query);

        let response = self
            .client
            .head(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SupabaseError::ApiError(format!(
                "Failed to count rows: {}",
                response.status()
            )));
        }

        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| SupabaseError::InvalidResponse("Missing Content-Range".into()))?;

        parse_content_range_total(content_range)
            .ok_or_else(|| SupabaseError::InvalidResponse(format!(
                "Unparseable Content-Range: {}",
                content_range
            )))
    }

    /// Fetch messages sent by either user, ordered by send time
    pub async fn fetch_messages(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> std::result::Result<Vec<MessageRecord>, SupabaseError> {
        let url = self.rest_url(&format!(
            "messages?select=senderId:sender_id,conversationId:conversation_id,sentAt:sent_at\
             &sender_id=in.({},{})&order=sent_at.asc",
            urlencoding::encode(user_a),
            urlencoding::encode(user_b)
        ));

        let response = self.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(SupabaseError::ApiError(format!(
                "Failed to fetch messages: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ProfileStore for SupabaseClient {
    async fn get_profile(&self, user_id: &str) -> Result<ProfileRecord> {
        Ok(self.fetch_profile(user_id).await?)
    }

    async fn count_likes(&self, from: &str, to: &str) -> Result<u32> {
        let query = format!(
            "likes?select=id&sender_id=eq.{}&receiver_id=eq.{}",
            urlencoding::encode(from),
            urlencoding::encode(to)
        );
        Ok(self.fetch_count(&query).await?)
    }

    async fn count_comments(&self, user_ids: &[&str]) -> Result<u32> {
        let ids = user_ids
            .iter()
            .map(|id| urlencoding::encode(id).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let query = format!("comments?select=id&user_id=in.({})", ids);
        Ok(self.fetch_count(&query).await?)
    }

    async fn messages_between(&self, user_a: &str, user_b: &str) -> Result<Vec<MessageRecord>> {
        Ok(self.fetch_messages(user_a, user_b).await?)
    }
}

#[async_trait]
impl PersonalityScorer for SupabaseClient {
    /// Delegate to the `trait_compatibility` database function.
    async fn trait_compatibility(&self, user_a: &str, user_b: &str) -> Result<TraitScores> {
        let url = self.rest_url("rpc/trait_compatibility");

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "user_a": user_a, "user_b": user_b }))
            .send()
            .await
            .map_err(SupabaseError::from)?;

        if !response.status().is_success() {
            return Err(CompatibilityError::Store(format!(
                "trait_compatibility RPC failed: {}",
                response.status()
            )));
        }

        let scores: TraitScores = response.json().await.map_err(SupabaseError::from)?;
        Ok(scores.clamped())
    }
}

/// Parse the total from a PostgREST `Content-Range` value (`0-9/57`, `*/0`).
fn parse_content_range_total(value: &str) -> Option<u32> {
    value.rsplit('/').next()?.parse().ok()
}
