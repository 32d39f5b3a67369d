//! API client for communicating with the recommendation REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the hierarchy, percentage, import and phone brand
//! endpoints. Reads are answered from the shared `ResponseCache` while
//! fresh; every write invalidates the cache entries under its scope.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::cache::{keys, ResponseCache};
use crate::models::{
    AuthResponse, CategoryItem, DetailItem, ImportResponse, PhoneBrand, PhoneBrandDraft,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the hosted recommendation API
pub const DEFAULT_API_BASE_URL: &str = "https://renew-packages-be.onrender.com/api";

/// HTTP request timeout in seconds.
/// The hosted backend cold-starts slowly, so this is generous.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum concurrent detail requests when loading a whole B2 branch.
const MAX_CONCURRENT_REQUESTS: usize = 6;

/// API client for the recommendation service.
/// Clone is cheap - the reqwest client, cache and session are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    cache: Arc<ResponseCache>,
    session: Arc<Session>,
    initial_backoff_ms: u64,
}

impl ApiClient {
    /// Create a new API client against `base_url` (e.g. `https://host/api`).
    pub fn new(
        base_url: &str,
        cache: Arc<ResponseCache>,
        session: Arc<Session>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            session,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    /// Override the first rate-limit backoff delay.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Forget the identity and everything read under it.
    fn handle_auth_failure(&self) {
        self.session.handle_unauthorized();
        self.cache.clear();
    }

    /// Send a request; a 401/403 ends the current session.
    async fn send<F>(&self, url: &str, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let result = self.send_with_retry(url, build).await;
        if let Err(ref error) = result {
            if error.is_auth_failure() {
                self.handle_auth_failure();
            }
        }
        result
    }

    /// Send a request, retrying on 429 with exponential backoff.
    /// `build` is called once per attempt since request builders are single-use.
    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = self.initial_backoff_ms;

        loop {
            let mut request = build();
            if let Some(token) = self.session.token() {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self
            .send(&url, || self.client.get(&url).query(query))
            .await?;
        Self::decode(response, &url).await
    }

    /// Serve a read from the cache, or fetch it and cache the result.
    async fn cached_get<T>(
        &self,
        key: &str,
        ttl: Duration,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
    {
        if let Some(hit) = self.cache.get::<T>(key) {
            return Ok(hit);
        }
        let value: T = self.get_json(path, query).await?;
        self.cache.set_with_ttl(key, &value, ttl);
        Ok(value)
    }

    async fn put_json<B: Serialize>(&self, path: &str, body: &B) -> Result<Response, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "PUT");
        self.send(&url, || self.client.put(&url).json(body)).await
    }

    // ===== Authentication =====

    /// Log in and start a new session. All cached reads are dropped since
    /// they belonged to the previous identity.
    ///
    /// Rejected credentials leave the current session and cache untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let url = self.url("/auth/login");
        let body = json!({ "username": username, "password": password });
        let response = self
            .send_with_retry(&url, || self.client.post(&url).json(&body))
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => ApiError::InvalidCredentials,
                other => other,
            })?;
        let auth: AuthResponse = Self::decode(response, &url).await?;

        self.cache.clear();
        if let Err(e) = self
            .session
            .set_session(auth.token.clone(), auth.user.clone())
        {
            warn!(error = %e, "Logged in but failed to persist session");
        }
        info!(username = %auth.user.username, role = ?auth.user.role, "Logged in");
        Ok(auth)
    }

    pub fn logout(&self) {
        if let Err(e) = self.session.clear_session() {
            warn!(error = %e, "Failed to remove saved session");
        }
        self.cache.clear();
        info!("Logged out");
    }

    /// Check the stored token against the server.
    /// A missing validation endpoint (404) is taken to mean the token is fine.
    pub async fn validate_session(&self) -> Result<bool, ApiError> {
        if self.session.token().is_none() {
            return Ok(false);
        }
        let url = self.url("/auth/validate");
        match self.send(&url, || self.client.get(&url)).await {
            Ok(_) => Ok(true),
            Err(ApiError::NotFound(_)) => {
                debug!("Validation endpoint not found, assuming token is valid");
                Ok(true)
            }
            Err(e) if e.is_auth_failure() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ===== Hierarchy Reads =====

    /// Fetch all distinct B1 values
    pub async fn b1_values(&self) -> Result<Vec<String>, ApiError> {
        let ttl = self.cache.ttl_policy().b1_values;
        self.cached_get(keys::B1_VALUES, ttl, "/data/b1", &[]).await
    }

    /// Fetch the B2 sibling set under `b1` with percentages
    pub async fn b2_data(&self, b1: &str) -> Result<Vec<CategoryItem>, ApiError> {
        let ttl = self.cache.ttl_policy().default;
        self.cached_get(&keys::b2_data(b1), ttl, "/data/b2", &[("b1", b1)])
            .await
    }

    /// Fetch the B3 sibling set under (`b1`, `b2`) with percentages
    pub async fn b3_data(&self, b1: &str, b2: &str) -> Result<Vec<CategoryItem>, ApiError> {
        let ttl = self.cache.ttl_policy().default;
        self.cached_get(
            &keys::b3_data(b1, b2),
            ttl,
            "/data/b3",
            &[("b1", b1), ("b2", b2)],
        )
        .await
    }

    /// Fetch the grouped detail breakdown for one (`b1`, `b2`, `b3`) path
    pub async fn b3_details(
        &self,
        b1: &str,
        b2: &str,
        b3: &str,
    ) -> Result<Vec<DetailItem>, ApiError> {
        let ttl = self.cache.ttl_policy().details;
        self.cached_get(
            &keys::b3_details(b1, b2, b3),
            ttl,
            "/data/b3/details",
            &[("b1", b1), ("b2", b2), ("b3", b3)],
        )
        .await
    }

    /// Fetch details for every B3 under (`b1`, `b2`), in B3 order.
    pub async fn details_for_b2(
        &self,
        b1: &str,
        b2: &str,
    ) -> Result<Vec<(String, Vec<DetailItem>)>, ApiError> {
        let b3_values = self.b3_data(b1, b2).await?;
        stream::iter(b3_values)
            .map(|b3| async move {
                let details = self.b3_details(b1, b2, &b3.value).await?;
                Ok::<_, ApiError>((b3.value, details))
            })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await
    }

    // ===== Percentage Overrides =====

    pub async fn update_b2_percentage(
        &self,
        b1: &str,
        value: &str,
        percentage: u32,
    ) -> Result<(), ApiError> {
        let body = json!({ "b1": b1, "value": value, "percentage": percentage });
        self.put_json("/data/b2/percentage", &body).await?;
        self.cache.clear_by_prefix(&keys::b2_data(b1));
        Ok(())
    }

    pub async fn update_b3_percentage(
        &self,
        b1: &str,
        b2: &str,
        value: &str,
        percentage: u32,
    ) -> Result<(), ApiError> {
        let body = json!({ "b1": b1, "b2": b2, "value": value, "percentage": percentage });
        self.put_json("/data/b3/percentage", &body).await?;
        self.cache.clear_by_prefix(&keys::b3_data(b1, b2));
        Ok(())
    }

    pub async fn update_detail_percentage(
        &self,
        b1: &str,
        b2: &str,
        b3: &str,
        detail: &str,
        percentage: u32,
    ) -> Result<(), ApiError> {
        let body = json!({
            "b1": b1,
            "b2": b2,
            "b3": b3,
            "detail": detail,
            "percentage": percentage,
        });
        self.put_json("/data/b3/detail/percentage", &body).await?;
        self.cache.clear_by_prefix(&keys::b3_details(b1, b2, b3));
        Ok(())
    }

    fn invalidate_percentage_data(&self) {
        self.cache.clear_by_prefix(keys::B2_DATA_PREFIX);
        self.cache.clear_by_prefix(keys::B3_DATA_PREFIX);
        self.cache.clear_by_prefix(keys::B3_DETAILS_PREFIX);
    }

    /// Remove every admin override, reverting to natural percentages.
    pub async fn clear_all_configurations(&self) -> Result<(), ApiError> {
        let url = self.url("/data/configurations");
        self.send(&url, || self.client.delete(&url)).await?;
        self.invalidate_percentage_data();
        info!("Cleared all percentage configurations");
        Ok(())
    }

    /// Ask the server to migrate stored overrides to its current schema.
    pub async fn migrate_percentage_configs(&self) -> Result<(), ApiError> {
        let url = self.url("/data/migrate-percentage-configs");
        self.send(&url, || self.client.post(&url)).await?;
        self.invalidate_percentage_data();
        Ok(())
    }

    // ===== Import =====

    /// Upload a spreadsheet for server-side parsing. Replaces the hierarchy,
    /// so the whole cache is dropped afterwards.
    pub async fn import_spreadsheet(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<ImportResponse, ApiError> {
        let url = self.url("/data/import");
        let response = self
            .send(&url, || {
                let part = multipart::Part::bytes(contents.clone()).file_name(file_name.to_string());
                let form = multipart::Form::new().part("file", part);
                self.client.post(&url).multipart(form)
            })
            .await?;
        let result: ImportResponse = Self::decode(response, &url).await?;
        self.cache.clear();
        info!(count = result.count, "Imported spreadsheet");
        Ok(result)
    }

    // ===== Phone Brands =====

    pub async fn phone_brands(&self) -> Result<Vec<PhoneBrand>, ApiError> {
        let ttl = self.cache.ttl_policy().default;
        self.cached_get(keys::PHONE_BRANDS, ttl, "/phone-brands", &[])
            .await
    }

    pub async fn create_phone_brand(&self, draft: &PhoneBrandDraft) -> Result<PhoneBrand, ApiError> {
        let url = self.url("/phone-brands");
        let response = self
            .send(&url, || self.client.post(&url).json(draft))
            .await?;
        let brand = Self::decode(response, &url).await?;
        self.cache.clear_by_prefix(keys::PHONE_BRANDS);
        Ok(brand)
    }

    pub async fn update_phone_brand(
        &self,
        id: &str,
        draft: &PhoneBrandDraft,
    ) -> Result<PhoneBrand, ApiError> {
        let path = format!("/phone-brands/{}", id);
        let response = self.put_json(&path, draft).await?;
        let brand = Self::decode(response, &self.url(&path)).await?;
        self.cache.clear_by_prefix(keys::PHONE_BRANDS);
        Ok(brand)
    }

    pub async fn delete_phone_brand(&self, id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/phone-brands/{}", id));
        self.send(&url, || self.client.delete(&url)).await?;
        self.cache.clear_by_prefix(keys::PHONE_BRANDS);
        Ok(())
    }
}
