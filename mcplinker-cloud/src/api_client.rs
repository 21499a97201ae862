//! HTTP client for the MCP Linker config API.
//!
//! Handles bearer authentication, token refresh on 401, and the
//! `/user-server-configs` endpoints. Uses reqwest with JSON serialization.

use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::remote::RemoteConfigClient;
use crate::types::{AuthTokens, EncryptedRecord, NewRecord, RecordList};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

const CONFIGS_PATH: &str = "/user-server-configs";

/// State shared across API client clones.
struct AuthState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Bumped on every successful refresh so waiters can tell a concurrent
    /// refresh already rotated the tokens.
    refresh_generation: u64,
}

/// HTTP client for the cloud config store.
#[derive(Clone)]
pub struct CloudApiClient {
    client: Client,
    config: CloudConfig,
    auth: Arc<RwLock<AuthState>>,
    /// Serializes refreshes; the server rotates the refresh token on use.
    refresh_lock: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl CloudApiClient {
    pub fn new(config: CloudConfig) -> CloudResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CloudError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            auth: Arc::new(RwLock::new(AuthState {
                access_token: None,
                refresh_token: None,
                refresh_generation: 0,
            })),
            refresh_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Sets auth tokens directly (for restoring a saved session).
    pub async fn set_tokens(&self, tokens: AuthTokens) {
        let mut auth = self.auth.write().await;
        auth.access_token = Some(tokens.access_token);
        auth.refresh_token = tokens.refresh_token;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.auth.read().await.access_token.is_some()
    }

    pub async fn logout(&self) {
        let mut auth = self.auth.write().await;
        auth.access_token = None;
        auth.refresh_token = None;
    }

    /// Returns current auth tokens for persistence.
    pub async fn current_tokens(&self) -> Option<AuthTokens> {
        let auth = self.auth.read().await;
        Some(AuthTokens {
            access_token: auth.access_token.clone()?,
            refresh_token: auth.refresh_token.clone(),
        })
    }

    // ── Auth ──

    pub async fn refresh_access_token(&self) -> CloudResult<String> {
        let pre_gen = self.auth.read().await.refresh_generation;

        let _guard = self.refresh_lock.lock().await;

        // A refresh that finished while we waited already rotated the tokens.
        {
            let auth = self.auth.read().await;
            if auth.refresh_generation > pre_gen {
                return auth.access_token.clone().ok_or(CloudError::AuthRequired);
            }
        }

        let refresh_token = {
            let auth = self.auth.read().await;
            auth.refresh_token.clone().ok_or(CloudError::AuthRequired)?
        };

        let url = format!("{}/auth/refresh", self.config.base_url());
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
            self.logout().await;
            return Err(CloudError::AuthFailed(
                "token refresh failed: session expired, sign in again".to_string(),
            ));
        }

        let resp: RefreshResponse = resp
            .error_for_status()
            .map_err(|e| CloudError::AuthFailed(format!("token refresh failed: {e}")))?
            .json()
            .await?;

        let mut auth = self.auth.write().await;
        auth.access_token = Some(resp.access_token.clone());
        if let Some(rotated) = resp.refresh_token {
            auth.refresh_token = Some(rotated);
        }
        auth.refresh_generation += 1;

        Ok(resp.access_token)
    }

    async fn get_token(&self) -> CloudResult<String> {
        self.auth
            .read()
            .await
            .access_token
            .clone()
            .ok_or(CloudError::AuthRequired)
    }

    fn build(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        token: &str,
    ) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method.clone(), url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            req = req.json(body);
        }
        req
    }

    /// Makes an authenticated request, retrying once after a refresh on 401.
    async fn auth_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> CloudResult<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url(), path);
        let token = self.get_token().await?;

        let resp = self.build(&method, &url, query, body, &token).send().await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            debug!("401 on {method} {path}, refreshing token");
            let new_token = self.refresh_access_token().await?;
            let retried = self.build(&method, &url, query, body, &new_token).send().await?;
            if retried.status() == StatusCode::UNAUTHORIZED {
                return Err(CloudError::AuthFailed(format!(
                    "{method} {path} rejected after token refresh"
                )));
            }
            return Ok(retried);
        }

        Ok(resp)
    }
}

/// Maps error statuses not handled by the caller to `Api`.
fn check(resp: reqwest::Response) -> CloudResult<reqwest::Response> {
    resp.error_for_status()
        .map_err(|e| CloudError::Api(e.to_string()))
}

#[async_trait]
impl RemoteConfigClient for CloudApiClient {
    async fn create(&self, record: &NewRecord) -> CloudResult<()> {
        let body = serde_json::to_value(record)?;
        let resp = self
            .auth_request(Method::POST, &format!("{CONFIGS_PATH}/"), &[], Some(&body))
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            return Err(CloudError::Conflict(format!(
                "{} ({})",
                record.server_name, record.client_name
            )));
        }
        check(resp)?;
        Ok(())
    }

    async fn update(&self, id: &str, cipher_text: &str) -> CloudResult<()> {
        let body = serde_json::json!({ "encryptConfigData": cipher_text });
        let resp = self
            .auth_request(Method::PUT, &format!("{CONFIGS_PATH}/{id}"), &[], Some(&body))
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(CloudError::NotFound(format!("config {id}")));
        }
        check(resp)?;
        Ok(())
    }

    async fn list_by_client(&self, client_name: &str) -> CloudResult<Vec<EncryptedRecord>> {
        let resp = self
            .auth_request(
                Method::GET,
                &format!("{CONFIGS_PATH}/"),
                &[("clientName", client_name.to_string())],
                None,
            )
            .await?;
        let list: RecordList = check(resp)?.json().await?;
        Ok(list.into_records())
    }

    async fn find_by_name(
        &self,
        server_name: &str,
        client_name: &str,
    ) -> CloudResult<Option<EncryptedRecord>> {
        let resp = self
            .auth_request(
                Method::GET,
                &format!("{CONFIGS_PATH}/by-server-name/"),
                &[
                    ("serverName", server_name.to_string()),
                    ("clientName", client_name.to_string()),
                ],
                None,
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(resp)?.json().await?))
    }

    async fn delete_by_id(&self, id: &str) -> CloudResult<()> {
        let resp = self
            .auth_request(Method::DELETE, &format!("{CONFIGS_PATH}/{id}"), &[], None)
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(CloudError::NotFound(format!("config {id}")));
        }
        check(resp)?;
        Ok(())
    }

    async fn batch_upsert(
        &self,
        client_name: &str,
        records: &[NewRecord],
        override_existing: bool,
    ) -> CloudResult<()> {
        let body = serde_json::to_value(records)?;
        let resp = self
            .auth_request(
                Method::POST,
                &format!("{CONFIGS_PATH}/batch-sync"),
                &[
                    ("override_existing", override_existing.to_string()),
                    ("clientName", client_name.to_string()),
                ],
                Some(&body),
            )
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND
            | StatusCode::METHOD_NOT_ALLOWED
            | StatusCode::NOT_IMPLEMENTED => Err(CloudError::BatchUnavailable(format!(
                "batch endpoint returned {}",
                resp.status()
            ))),
            _ => {
                check(resp)?;
                Ok(())
            }
        }
    }
}
