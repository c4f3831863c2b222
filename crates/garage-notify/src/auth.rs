//! Session credentials used to authenticate the stream and REST calls.

use std::fmt;

use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};

use crate::error::{NotifyError, NotifyResult};

/// An authenticated portal session: the user identity plus its bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
    token: String,
}

impl Session {
    /// Create a session from a user id and a bearer token.
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }

    /// The user this session belongs to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The raw bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Both the user id and the token are present.
    pub fn is_authenticated(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.token.trim().is_empty()
    }

    /// Build the `Authorization: Bearer …` header value.
    ///
    /// # Errors
    ///
    /// Returns an auth error when the session is incomplete or the token
    /// contains bytes that are not valid in a header.
    pub fn bearer_header(&self) -> NotifyResult<HeaderValue> {
        if !self.is_authenticated() {
            return Err(NotifyError::auth("session has no user or token"));
        }
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token.trim()))
            .map_err(|e| NotifyError::auth(format!("invalid bearer token: {e}")))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Insert the bearer header into `headers`.
    ///
    /// # Errors
    ///
    /// See [`bearer_header`](Self::bearer_header).
    pub fn authenticate(&self, headers: &mut HeaderMap) -> NotifyResult<()> {
        headers.insert(AUTHORIZATION, self.bearer_header()?);
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}
