//! Backend access for the grant matrix
//!
//! [`MatrixBackend`] is the seam between the editor and the REST backend.
//! [`HttpBackend`] is the production implementation over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::bridge::GroupUpdate;
use crate::error::{MatrixError, Result};
use crate::types::{CatalogPayload, GroupDetail};

/// Operations the editor needs from the backend
#[async_trait]
pub trait MatrixBackend: Send + Sync {
    /// `GET /auth/page`
    async fn fetch_catalog(&self) -> Result<CatalogPayload>;

    /// `GET /auth/group/{id}`
    async fn fetch_group(&self, group_id: i64) -> Result<GroupDetail>;

    /// `PUT /auth/group/{id}`
    async fn update_group(&self, group_id: i64, body: &GroupUpdate) -> Result<()>;

    /// `POST /auth/group`
    async fn create_group(&self, body: &GroupUpdate) -> Result<()>;
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    /// Bearer token; acquiring it is the caller's business
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read `GRANT_MATRIX_BASE_URL`, `GRANT_MATRIX_TOKEN` and
    /// `GRANT_MATRIX_TIMEOUT_SECS`. Returns `None` without a base URL.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BackendConfig::from_env`] over an arbitrary variable source.
    /// An unparsable timeout falls back to the default.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("GRANT_MATRIX_BASE_URL").filter(|u| !u.trim().is_empty())?;
        let token = lookup("GRANT_MATRIX_TOKEN").filter(|t| !t.is_empty());
        let timeout_secs = match lookup("GRANT_MATRIX_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Ignoring GRANT_MATRIX_TIMEOUT_SECS={:?}, using {}s",
                    raw,
                    DEFAULT_TIMEOUT_SECS
                );
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Some(Self {
            base_url,
            token,
            timeout_secs,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(MatrixError::Config("base URL is empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(MatrixError::Config(format!(
                "base URL must start with http:// or https://, got '{}'",
                url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(MatrixError::Config("timeout must be at least 1 second".into()));
        }
        Ok(())
    }
}

/// Group detail may come bare or wrapped in `{ "group": ... }`
#[derive(Deserialize)]
#[serde(untagged)]
enum GroupEnvelope {
    Wrapped { group: GroupDetail },
    Bare(GroupDetail),
}

impl GroupEnvelope {
    fn into_detail(self) -> GroupDetail {
        match self {
            GroupEnvelope::Wrapped { group } => group,
            GroupEnvelope::Bare(detail) => detail,
        }
    }
}

/// REST backend client
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!("{} failed with {}: {}", what, status, body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(MatrixError::Unauthorized(format!("{} ({})", what, status)))
            }
            StatusCode::NOT_FOUND => Err(MatrixError::NotFound(what.to_string())),
            _ => Err(MatrixError::Api {
                status: status.as_u16(),
                message: body,
            }),
        }
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl MatrixBackend for HttpBackend {
    async fn fetch_catalog(&self) -> Result<CatalogPayload> {
        let response = self
            .send(self.request(reqwest::Method::GET, "/auth/page"), "catalog")
            .await?;
        Self::json(response).await
    }

    async fn fetch_group(&self, group_id: i64) -> Result<GroupDetail> {
        let path = format!("/auth/group/{}", group_id);
        let what = format!("group {}", group_id);
        let response = self
            .send(self.request(reqwest::Method::GET, &path), &what)
            .await?;
        let envelope: GroupEnvelope = Self::json(response).await?;
        Ok(envelope.into_detail())
    }

    async fn update_group(&self, group_id: i64, body: &GroupUpdate) -> Result<()> {
        let path = format!("/auth/group/{}", group_id);
        let what = format!("group {}", group_id);
        self.send(self.request(reqwest::Method::PUT, &path).json(body), &what)
            .await?;
        Ok(())
    }

    async fn create_group(&self, body: &GroupUpdate) -> Result<()> {
        self.send(
            self.request(reqwest::Method::POST, "/auth/group").json(body),
            "new group",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_validation() {
        assert!(BackendConfig::new("http://localhost:8080").validate().is_ok());
        assert!(BackendConfig::new("https://api.example.edu/").validate().is_ok());
        assert!(matches!(
            BackendConfig::new("").validate(),
            Err(MatrixError::Config(_))
        ));
        assert!(matches!(
            BackendConfig::new("ftp://host").validate(),
            Err(MatrixError::Config(_))
        ));

        let mut config = BackendConfig::new("http://localhost");
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_from_lookup() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("GRANT_MATRIX_BASE_URL", "https://api.example.edu"),
            ("GRANT_MATRIX_TOKEN", "abc"),
            ("GRANT_MATRIX_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.edu");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        assert!(BackendConfig::from_lookup(lookup(&[])).is_none());
        assert!(BackendConfig::from_lookup(lookup(&[("GRANT_MATRIX_BASE_URL", " ")])).is_none());

        let config = BackendConfig::from_lookup(lookup(&[
            ("GRANT_MATRIX_BASE_URL", "http://localhost"),
            ("GRANT_MATRIX_TOKEN", ""),
            ("GRANT_MATRIX_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap();

        assert_eq!(config.token, None);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new(BackendConfig::new("http://localhost:9000/")).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:9000");
    }

    #[test]
    fn test_group_envelope_accepts_both_shapes() {
        let wrapped: GroupEnvelope =
            serde_json::from_str(r#"{"group": {"groupId": 3, "groupName": "Staff"}}"#).unwrap();
        assert_eq!(wrapped.into_detail().group_id, 3);

        let bare: GroupEnvelope =
            serde_json::from_str(r#"{"groupId": 4, "groupName": "Admins"}"#).unwrap();
        assert_eq!(bare.into_detail().group_name, "Admins");
    }

    #[test]
    fn test_token_not_serialized() {
        let config = BackendConfig::new("http://localhost").with_token("secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
