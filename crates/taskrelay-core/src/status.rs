//! Status enums for Tasks and Sessions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Status of a Task in the queue.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created but not yet claimed by a worker.
    #[default]
    Pending,
    /// Task claimed by exactly one worker.
    Running,
    /// Task completed successfully.
    Completed,
    /// Task failed (executor error, timeout or expired lease).
    Failed,
    /// Task was cancelled while still pending.
    Cancelled,
    /// Task was rejected during audit.
    Blocked,
}

impl TaskStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [TaskStatus; 6] = [
        Self::Pending,
        Self::Running,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
        Self::Blocked,
    ];

    /// Returns true if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Blocked
        )
    }

    /// Statuses from which an explicit status update may move a task into `self`.
    ///
    /// `Pending -> Running` is absent: only the claim performs it.
    /// `Running -> Running` is a progress update.
    pub fn allowed_sources(&self) -> &'static [TaskStatus] {
        match self {
            Self::Pending => &[],
            Self::Running => &[Self::Running],
            Self::Completed | Self::Failed | Self::Blocked => &[Self::Pending, Self::Running],
            Self::Cancelled => &[Self::Pending],
        }
    }

    /// Check whether an explicit status update from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        next.allowed_sources().contains(self)
    }

    /// Wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown task status '{s}'")))
    }
}

/// Status of an agent Session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is live and may delegate work.
    #[default]
    Active,
    /// Session ended normally.
    Completed,
    /// Session was abandoned by its agent.
    Abandoned,
}

impl SessionStatus {
    /// Wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            other => Err(CoreError::InvalidInput(format!(
                "unknown session status '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_accept_no_transition() {
        for from in TaskStatus::ALL.into_iter().filter(TaskStatus::is_terminal) {
            for to in TaskStatus::ALL {
                assert!(
                    !from.can_transition_to(to),
                    "{from} -> {to} must be rejected"
                );
            }
        }
    }

    #[test]
    fn test_pending_cannot_be_moved_to_running_by_update() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Running));
    }

    #[test]
    fn test_cancel_only_from_pending() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Cancelled));
    }

    #[test]
    fn test_nothing_returns_to_pending() {
        for from in TaskStatus::ALL {
            assert!(!from.can_transition_to(TaskStatus::Pending));
        }
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }
}
