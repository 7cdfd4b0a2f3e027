//! Landing context snapshots for new sessions.
//!
//! A snapshot is a JSON object with the sections `format_landing_brief`
//! renders: `nodes`, `services`, `knowledge_sources`, `metrics`,
//! `recent_tasks` and `generated_at`. Sections that cannot be produced are
//! left out and described in `errors` instead.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::warn;

use taskrelay_core::TaskFilter;
use taskrelay_store::Store;

/// Number of recent tasks included in a snapshot.
pub const RECENT_TASKS: u32 = 10;

/// Inventory sections copied verbatim from the inventory file.
const INVENTORY_SECTIONS: [&str; 3] = ["nodes", "services", "knowledge_sources"];

/// Source of the context captured when a session starts.
///
/// `snapshot` never fails; partial failures are reported inside the
/// returned value.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn snapshot(&self) -> Value;
}

/// Provider that always returns the same value.
#[derive(Debug, Clone, Default)]
pub struct StaticContext(pub Value);

#[async_trait]
impl ContextProvider for StaticContext {
    async fn snapshot(&self) -> Value {
        self.0.clone()
    }
}

/// Provider built from store statistics and an optional inventory file.
pub struct StoreContextProvider {
    store: Arc<dyn Store>,
    inventory_path: Option<PathBuf>,
}

impl StoreContextProvider {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            inventory_path: None,
        }
    }

    /// Read nodes, services and knowledge sources from a JSON file.
    pub fn with_inventory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventory_path = Some(path.into());
        self
    }

    async fn inventory(&self) -> Result<Option<Map<String, Value>>, String> {
        let Some(path) = &self.inventory_path else {
            return Ok(None);
        };
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("inventory {}: {e}", path.display()))?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(format!("inventory {}: not a JSON object", path.display())),
            Err(e) => Err(format!("inventory {}: {e}", path.display())),
        }
    }

    async fn metrics(&self) -> Result<Value, String> {
        let counts = self
            .store
            .counts()
            .await
            .map_err(|e| format!("metrics: {e}"))?;
        let by_status = self
            .store
            .task_counts_by_status()
            .await
            .map_err(|e| format!("metrics: {e}"))?;

        let tasks_by_status: Map<String, Value> = by_status
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(status, n)| (status.as_str().to_string(), json!(n)))
            .collect();

        Ok(json!({
            "sessions": counts.sessions,
            "tasks": counts.tasks,
            "actions": counts.actions,
            "tasks_by_status": tasks_by_status,
        }))
    }

    async fn recent_tasks(&self) -> Result<Value, String> {
        let filter = TaskFilter {
            limit: Some(RECENT_TASKS),
            ..TaskFilter::default()
        };
        let tasks = self
            .store
            .list_tasks(&filter)
            .await
            .map_err(|e| format!("recent tasks: {e}"))?;

        Ok(tasks
            .into_iter()
            .map(|t| {
                json!({
                    "task_id": t.id,
                    "task_type": t.task_type,
                    "status": t.status,
                    "description": t.description,
                    "created_at": t.created_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ContextProvider for StoreContextProvider {
    async fn snapshot(&self) -> Value {
        let mut snapshot = Map::new();
        let mut errors = Vec::new();

        match self.inventory().await {
            Ok(Some(mut inventory)) => {
                for section in INVENTORY_SECTIONS {
                    if let Some(value) = inventory.remove(section) {
                        snapshot.insert(section.to_string(), value);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => errors.push(e),
        }

        match self.metrics().await {
            Ok(metrics) => {
                snapshot.insert("metrics".to_string(), metrics);
            }
            Err(e) => errors.push(e),
        }

        match self.recent_tasks().await {
            Ok(tasks) => {
                snapshot.insert("recent_tasks".to_string(), tasks);
            }
            Err(e) => errors.push(e),
        }

        snapshot.insert("generated_at".to_string(), json!(Utc::now()));

        if !errors.is_empty() {
            warn!(errors = ?errors, "Landing context is incomplete");
            snapshot.insert("errors".to_string(), json!(errors));
        }
        Value::Object(snapshot)
    }
}
