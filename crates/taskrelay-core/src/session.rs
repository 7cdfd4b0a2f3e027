//! Agent session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{SessionId, SessionStatus};

/// One agent's unit of engagement.
///
/// Sessions are never deleted; `parent_session_id` links form the delegation forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// Platform tag, e.g. "claude_code" or "openai".
    pub agent_platform: String,

    /// Role tag, e.g. "planner" or "executor".
    pub agent_role: String,

    /// Delegating session, if any. Soft reference.
    pub parent_session_id: Option<SessionId>,

    /// Snapshot captured at creation. Never updated.
    pub landing_context: Value,

    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    /// Create a new active session.
    pub fn new(
        platform: impl Into<String>,
        role: impl Into<String>,
        parent_session_id: Option<SessionId>,
        landing_context: Value,
    ) -> Self {
        let platform = platform.into();
        let role = role.into();
        let now = Utc::now();
        Self {
            id: SessionId::generate(&platform, &role),
            agent_platform: platform,
            agent_role: role,
            parent_session_id,
            landing_context,
            status: SessionStatus::Active,
            created_at: now,
            last_active: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}
