//! REST collaborator used by the store to load and mutate notifications.
//!
//! [`NotificationApi`] is the seam the store talks to; [`RestNotificationApi`]
//! is the reqwest-backed implementation for the portal backend.

use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, Method};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    auth::Session,
    error::{NotifyError, NotifyResult},
    notification::{Notification, NotificationId},
    sse::config::expand_path,
};

/// Path segment replaced by the (percent-encoded) notification id.
pub const ID_PLACEHOLDER: &str = "{id}";

/// One page of notifications as returned by the backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NotificationPage {
    /// Notifications in server order.
    pub items: Vec<Notification>,
    /// Total number of notifications, when the backend reports it.
    pub total: Option<u64>,
}

/// Backend operations the store depends on.
#[async_trait]
pub trait NotificationApi: Send + Sync + 'static {
    /// Fetch `size` notifications starting at page `offset`.
    async fn fetch_page(&self, offset: u32, size: u32) -> NotifyResult<NotificationPage>;

    /// Server-side count of unread notifications.
    async fn unread_count(&self) -> NotifyResult<u64>;

    /// Mark one notification as read.
    async fn mark_read(&self, id: &NotificationId) -> NotifyResult<()>;

    /// Mark every notification of the user as read.
    async fn mark_all_read(&self) -> NotifyResult<()>;

    /// Delete one notification.
    async fn delete(&self, id: &NotificationId) -> NotifyResult<()>;
}

/// Configuration for [`RestNotificationApi`].
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Backend origin, e.g. `https://portal.example.com`.
    pub base_url: String,
    /// Paged listing; `page` and `size` are sent as query parameters.
    pub list_path: String,
    /// Unread total, either a bare number or `{"count": n}`.
    pub unread_count_path: String,
    /// `{id}` is substituted.
    pub mark_read_path: String,
    /// Bulk read, sent as `PUT`.
    pub mark_all_read_path: String,
    /// `{id}` is substituted.
    pub delete_path: String,
    /// Extra headers for every request.
    pub headers: HeaderMap,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Page size used by the first load and by refreshes.
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            list_path: "/api/notifications".to_string(),
            unread_count_path: "/api/notifications/unread-count".to_string(),
            mark_read_path: format!("/api/notifications/{ID_PLACEHOLDER}/read"),
            mark_all_read_path: "/api/notifications/read-all".to_string(),
            delete_path: format!("/api/notifications/{ID_PLACEHOLDER}"),
            headers: HeaderMap::new(),
            timeout: Duration::from_secs(30),
            page_size: 20,
        }
    }
}

impl ApiConfig {
    /// Create a configuration for the given backend origin.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the listing path.
    #[must_use]
    pub fn list_path(mut self, path: impl Into<String>) -> Self {
        self.list_path = path.into();
        self
    }

    /// Set the unread-count path.
    #[must_use]
    pub fn unread_count_path(mut self, path: impl Into<String>) -> Self {
        self.unread_count_path = path.into();
        self
    }

    /// Set the mark-as-read path template.
    #[must_use]
    pub fn mark_read_path(mut self, path: impl Into<String>) -> Self {
        self.mark_read_path = path.into();
        self
    }

    /// Set the mark-all-as-read path.
    #[must_use]
    pub fn mark_all_read_path(mut self, path: impl Into<String>) -> Self {
        self.mark_all_read_path = path.into();
        self
    }

    /// Set the delete path template.
    #[must_use]
    pub fn delete_path(mut self, path: impl Into<String>) -> Self {
        self.delete_path = path.into();
        self
    }

    /// Set additional HTTP headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }
        url::Url::parse(&self.base_url).map_err(|e| format!("Invalid base URL: {e}"))?;

        for path in [
            &self.list_path,
            &self.unread_count_path,
            &self.mark_read_path,
            &self.mark_all_read_path,
            &self.delete_path,
        ] {
            if !path.starts_with('/') {
                return Err(format!("Path must start with '/': {path}"));
            }
        }
        if self.timeout.is_zero() {
            return Err("Timeout cannot be zero".to_string());
        }
        if self.page_size == 0 {
            return Err("Page size must be > 0".to_string());
        }
        Ok(())
    }

    fn url(&self, path: &str, id: Option<&NotificationId>) -> NotifyResult<url::Url> {
        expand_path(
            &self.base_url,
            path,
            ID_PLACEHOLDER,
            id.map(NotificationId::as_str),
        )
        .map_err(NotifyError::config)
    }
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum PageBody {
    Bare(Vec<Notification>),
    Paged {
        content: Vec<Notification>,
        #[serde(rename = "totalElements")]
        total_elements: Option<u64>,
    },
    Listed {
        #[serde(alias = "notifications")]
        items: Vec<Notification>,
        total: Option<u64>,
    },
}

impl From<PageBody> for NotificationPage {
    fn from(body: PageBody) -> Self {
        match body {
            PageBody::Bare(items) => Self { items, total: None },
            PageBody::Paged {
                content,
                total_elements,
            } => Self {
                items: content,
                total: total_elements,
            },
            PageBody::Listed { items, total } => Self { items, total },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountBody {
    Bare(u64),
    Wrapped {
        #[serde(alias = "unreadCount")]
        count: u64,
    },
}

impl From<CountBody> for u64 {
    fn from(body: CountBody) -> Self {
        match body {
            CountBody::Bare(count) | CountBody::Wrapped { count } => count,
        }
    }
}

// ---------------------------------------------------------------------------
// RestNotificationApi
// ---------------------------------------------------------------------------

/// [`NotificationApi`] over the portal's REST endpoints, authenticated with
/// the session's bearer token.
#[derive(Debug, Clone)]
pub struct RestNotificationApi {
    config: ApiConfig,
    client: reqwest::Client,
    headers: HeaderMap,
    authenticated: bool,
}

impl RestNotificationApi {
    /// Create a client for `session`.
    ///
    /// A session without credentials is accepted; every call on it then
    /// fails with an auth error without touching the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the token is not a
    /// valid header value, or the HTTP client cannot be built.
    pub fn new(config: ApiConfig, session: &Session) -> NotifyResult<Self> {
        config.validate().map_err(NotifyError::config)?;

        let mut headers = config.headers.clone();
        let authenticated = session.is_authenticated();
        if authenticated {
            session.authenticate(&mut headers)?;
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            headers,
            authenticated,
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn send(
        &self,
        method: Method,
        url: url::Url,
        query: Option<&[(&str, u32)]>,
    ) -> NotifyResult<bytes::Bytes> {
        if !self.authenticated {
            return Err(NotifyError::auth("no authenticated session"));
        }
        debug!(%method, %url, "Notification API request");

        let mut request = self
            .client
            .request(method, url)
            .headers(self.headers.clone());
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                NotifyError::timeout(self.config.timeout)
            } else {
                NotifyError::Http(e)
            }
        })?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(NotifyError::api(
                status,
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        url: url::Url,
        query: Option<&[(&str, u32)]>,
    ) -> NotifyResult<T> {
        let body = self.send(Method::GET, url, query).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl NotificationApi for RestNotificationApi {
    async fn fetch_page(&self, offset: u32, size: u32) -> NotifyResult<NotificationPage> {
        let url = self.config.url(&self.config.list_path, None)?;
        let body: PageBody = self
            .send_json(url, Some(&[("page", offset), ("size", size)]))
            .await?;
        Ok(body.into())
    }

    async fn unread_count(&self) -> NotifyResult<u64> {
        let url = self.config.url(&self.config.unread_count_path, None)?;
        let body: CountBody = self.send_json(url, None).await?;
        Ok(body.into())
    }

    async fn mark_read(&self, id: &NotificationId) -> NotifyResult<()> {
        let url = self.config.url(&self.config.mark_read_path, Some(id))?;
        self.send(Method::PUT, url, None).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> NotifyResult<()> {
        let url = self.config.url(&self.config.mark_all_read_path, None)?;
        self.send(Method::PUT, url, None).await?;
        Ok(())
    }

    async fn delete(&self, id: &NotificationId) -> NotifyResult<()> {
        let url = self.config.url(&self.config.delete_path, Some(id))?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.list_path, "/api/notifications");
        assert_eq!(config.unread_count_path, "/api/notifications/unread-count");
        assert_eq!(config.mark_read_path, "/api/notifications/{id}/read");
        assert_eq!(config.mark_all_read_path, "/api/notifications/read-all");
        assert_eq!(config.delete_path, "/api/notifications/{id}");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            ApiConfig::default().validate().expect_err("should fail"),
            "Base URL cannot be empty"
        );
        assert!(
            ApiConfig::new("https://example.com")
                .delete_path("api/x")
                .validate()
                .expect_err("should fail")
                .starts_with("Path must start with '/'")
        );
        assert_eq!(
            ApiConfig::new("https://example.com")
                .page_size(0)
                .validate()
                .expect_err("should fail"),
            "Page size must be > 0"
        );
        assert!(ApiConfig::new("https://example.com").validate().is_ok());
    }

    #[test]
    fn test_url_substitutes_encoded_id() {
        let config = ApiConfig::new("https://portal.example.com");
        let url = config
            .url(&config.mark_read_path, Some(&NotificationId::from("a/b")))
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://portal.example.com/api/notifications/a%2Fb/read"
        );
    }

    #[test]
    fn test_page_shapes() {
        let bare: PageBody = serde_json::from_str(r#"[{"id":1},{"id":"2"}]"#).expect("bare");
        let page = NotificationPage::from(bare);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, None);

        let paged: PageBody =
            serde_json::from_str(r#"{"content":[{"id":1}],"totalElements":9}"#).expect("paged");
        let page = NotificationPage::from(paged);
        assert_eq!(page.items[0].id.as_str(), "1");
        assert_eq!(page.total, Some(9));

        let listed: PageBody =
            serde_json::from_str(r#"{"notifications":[{"id":3}],"total":4}"#).expect("listed");
        let page = NotificationPage::from(listed);
        assert_eq!(page.items[0].id.as_str(), "3");
        assert_eq!(page.total, Some(4));
    }

    #[test]
    fn test_count_shapes() {
        for raw in ["7", r#"{"count":7}"#, r#"{"unreadCount":7}"#] {
            let body: CountBody = serde_json::from_str(raw).expect(raw);
            assert_eq!(u64::from(body), 7, "{raw}");
        }
    }

    #[tokio::test]
    async fn test_signed_out_session_fails_fast() {
        let api = RestNotificationApi::new(
            ApiConfig::new("http://127.0.0.1:9"),
            &Session::new("42", " "),
        )
        .expect("client");

        let err = api.unread_count().await.expect_err("no credentials");
        assert!(err.is_unauthorized());
        assert!(matches!(
            api.mark_read(&NotificationId::from("1")).await,
            Err(NotifyError::Auth { .. })
        ));
    }
}
