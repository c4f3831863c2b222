//! Notification data model shared by the stream decoder, the REST client and
//! the store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned notification identifier.
///
/// The backend sends either a JSON string or a JSON number; both are kept in
/// their string form so `"5"` and `5` name the same notification.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Create an id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NotificationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for NotificationId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for NotificationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Unsigned(n) => Self(n.to_string()),
            RawId::Signed(n) => Self(n.to_string()),
        })
    }
}

/// Category tag carried in the `type` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Appointment,
    ProjectUpdate,
    TaskAssigned,
    System,
    /// Anything the portal does not know about yet.
    #[default]
    #[serde(other)]
    Generic,
}

impl NotificationKind {
    /// Wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appointment => "APPOINTMENT",
            Self::ProjectUpdate => "PROJECT_UPDATE",
            Self::TaskAssigned => "TASK_ASSIGNED",
            Self::System => "SYSTEM",
            Self::Generic => "GENERIC",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single portal notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique key; the store de-duplicates on it.
    pub id: NotificationId,
    /// Short headline.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Body text; also accepted as `body`.
    #[serde(default, alias = "body", deserialize_with = "null_as_default")]
    pub message: String,
    /// Category, sent as `type`.
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: NotificationKind,
    /// Whether the user has seen it; also accepted as `isRead`.
    #[serde(default, alias = "isRead", deserialize_with = "null_as_default")]
    pub read: bool,
    /// Server-side creation time; receive time when the payload omits it.
    #[serde(default = "Utc::now", alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create an unread notification stamped with the current time.
    pub fn new(
        id: impl Into<NotificationId>,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            kind,
            read: false,
            created_at: Utc::now(),
        }
    }

    /// Set the creation timestamp.
    #[must_use]
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Set the read flag.
    #[must_use]
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Relative age of the notification as shown next to it in the UI.
    pub fn time_ago(&self, now: DateTime<Utc>) -> String {
        let elapsed = now.signed_duration_since(self.created_at);

        let minutes = elapsed.num_minutes();
        if minutes < 1 {
            return "just now".to_string();
        }
        if minutes < 60 {
            return plural(minutes, "minute");
        }

        let hours = elapsed.num_hours();
        if hours < 24 {
            return plural(hours, "hour");
        }

        let days = elapsed.num_days();
        if days < 30 {
            return plural(days, "day");
        }

        self.created_at.format("%Y-%m-%d").to_string()
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
