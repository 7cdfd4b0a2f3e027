//! Newtype wrappers for identifiers to ensure type safety.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the inner string reference.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_id!(
    /// Unique identifier for a Task.
    TaskId
);

string_id!(
    /// Unique identifier for a Session.
    ///
    /// Generated ids carry a human-legible `{platform}_{role}_` prefix.
    SessionId
);

string_id!(
    /// Unique identifier for an audit-log Action.
    ActionId
);

string_id!(
    /// Identity of a worker process. Defaults to the hostname.
    WorkerId
);

impl TaskId {
    /// Generate a new random TaskId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ActionId {
    /// Generate a new random ActionId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl SessionId {
    /// Generate a session id of the form `{platform}_{role}_{YYYYMMDD_HHMMSS}_{8 hex}`.
    pub fn generate(platform: &str, role: &str) -> Self {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}_{}_{}_{}",
            sanitize_tag(platform),
            sanitize_tag(role),
            stamp,
            &suffix[..8]
        ))
    }
}

impl WorkerId {
    /// Worker identity derived from the machine hostname.
    ///
    /// Shaped `{host}-{pid}-{4 hex}` so that several worker processes on one
    /// host never share an id.
    pub fn from_hostname() -> Self {
        let host = gethostname::gethostname().to_string_lossy().into_owned();
        let host = sanitize_tag(host.split('.').next().unwrap_or_default());
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}-{}", host, std::process::id(), &suffix[..4]))
    }
}

/// Lowercase a free-form tag and replace anything outside `[a-z0-9_-]`.
fn sanitize_tag(tag: &str) -> String {
    let cleaned: String = tag
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
