//! Landing brief rendering.
//!
//! A context snapshot is a JSON object whose known sections are rendered
//! independently. A section that is absent, empty or not shaped the way we
//! expect is left out of the brief; rendering itself never fails.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Snapshot key for the infrastructure node inventory.
pub const NODES: &str = "nodes";
/// Snapshot key for running services.
pub const SERVICES: &str = "services";
/// Snapshot key for the knowledge-source index.
pub const KNOWLEDGE_SOURCES: &str = "knowledge_sources";
/// Snapshot key for aggregate counters.
pub const METRICS: &str = "metrics";
/// Snapshot key for the recent task digest.
pub const RECENT_TASKS: &str = "recent_tasks";
/// Snapshot key for the collection timestamp.
pub const GENERATED_AT: &str = "generated_at";
/// Snapshot key for per-section collection errors.
pub const ERRORS: &str = "errors";

const MAX_KNOWLEDGE_SOURCES: usize = 10;
const MAX_RECENT_TASKS: usize = 5;
const DESCRIPTION_WIDTH: usize = 60;

#[derive(Debug, Deserialize)]
struct NodeEntry {
    name: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct KnowledgeEntry {
    name: String,
    #[serde(default)]
    entries: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MetricsSection {
    #[serde(default)]
    sessions: Option<u64>,
    #[serde(default)]
    tasks: Option<u64>,
    #[serde(default)]
    actions: Option<u64>,
    #[serde(default)]
    tasks_by_status: BTreeMap<String, u64>,
}

impl MetricsSection {
    fn is_empty(&self) -> bool {
        self.sessions.is_none()
            && self.tasks.is_none()
            && self.actions.is_none()
            && self.tasks_by_status.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct TaskDigest {
    #[serde(default)]
    task_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    description: String,
}

/// Decode one section, treating any shape mismatch as absence.
fn section<T: DeserializeOwned>(snapshot: &Value, key: &str) -> Option<T> {
    let value = snapshot.get(key)?;
    if value.is_null() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

fn non_empty<T>(items: Option<Vec<T>>) -> Option<Vec<T>> {
    items.filter(|items| !items.is_empty())
}

fn truncate(text: &str, width: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= width {
        single_line
    } else {
        let cut: String = single_line.chars().take(width).collect();
        format!("{cut}...")
    }
}

/// Render a context snapshot as a human-readable brief.
pub fn format_landing_brief(snapshot: &Value) -> String {
    let mut out = String::from("=== LANDING BRIEF ===\n");

    if let Some(nodes) = non_empty(section::<Vec<NodeEntry>>(snapshot, NODES)) {
        out.push_str("\nINFRASTRUCTURE:\n");
        for node in nodes {
            write!(out, "  - {}", node.name).ok();
            if let Some(role) = node.role {
                write!(out, " ({role})").ok();
            }
            if let Some(address) = node.address {
                write!(out, " @ {address}").ok();
            }
            if let Some(status) = node.status {
                write!(out, " [{status}]").ok();
            }
            out.push('\n');
        }
    }

    if let Some(services) = non_empty(section::<Vec<ServiceEntry>>(snapshot, SERVICES)) {
        out.push_str("\nACTIVE SERVICES:\n");
        for service in services {
            write!(out, "  - {}", service.name).ok();
            if let Some(port) = service.port {
                write!(out, ":{port}").ok();
            }
            writeln!(out, " {}", service.status.as_deref().unwrap_or("unknown")).ok();
        }
    }

    if let Some(sources) = non_empty(section::<Vec<KnowledgeEntry>>(snapshot, KNOWLEDGE_SOURCES))
    {
        out.push_str("\nKNOWLEDGE BASE:\n");
        for source in sources.iter().take(MAX_KNOWLEDGE_SOURCES) {
            match source.entries {
                Some(n) => {
                    writeln!(out, "  - {}: {n} entries", source.name).ok();
                }
                None => {
                    writeln!(out, "  - {}", source.name).ok();
                }
            }
        }
        if sources.len() > MAX_KNOWLEDGE_SOURCES {
            writeln!(
                out,
                "  ... and {} more",
                sources.len() - MAX_KNOWLEDGE_SOURCES
            )
            .ok();
        }
    }

    if let Some(metrics) = section::<MetricsSection>(snapshot, METRICS).filter(|m| !m.is_empty()) {
        out.push_str("\nMETRICS:\n");
        if let Some(n) = metrics.sessions {
            writeln!(out, "  Sessions: {n}").ok();
        }
        if let Some(n) = metrics.tasks {
            writeln!(out, "  Tasks: {n}").ok();
        }
        if let Some(n) = metrics.actions {
            writeln!(out, "  Actions: {n}").ok();
        }
        if !metrics.tasks_by_status.is_empty() {
            let counts = metrics
                .tasks_by_status
                .iter()
                .map(|(status, n)| format!("{status}={n}"))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out, "  By status: {counts}").ok();
        }
    }

    if let Some(tasks) = non_empty(section::<Vec<TaskDigest>>(snapshot, RECENT_TASKS)) {
        out.push_str("\nRECENT TASKS:\n");
        for task in tasks.iter().take(MAX_RECENT_TASKS) {
            writeln!(
                out,
                "  - [{}] {}: {}",
                task.status.as_deref().unwrap_or("?"),
                task.task_type.as_deref().unwrap_or("task"),
                truncate(&task.description, DESCRIPTION_WIDTH)
            )
            .ok();
        }
    }

    if let Some(generated) = snapshot.get(GENERATED_AT).and_then(Value::as_str) {
        writeln!(out, "\nGenerated: {generated}").ok();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_snapshot() -> Value {
        json!({
            "nodes": [{"name": "alpha", "role": "orchestrator", "address": "10.0.0.1", "status": "online"}],
            "services": [{"name": "postgres", "port": 5432, "status": "running"}],
            "knowledge_sources": [{"name": "docs", "entries": 42}],
            "metrics": {"sessions": 3, "tasks": 7, "actions": 12, "tasks_by_status": {"pending": 2}},
            "recent_tasks": [{"task_type": "review", "status": "pending", "description": "Check the thing"}],
            "generated_at": "2026-01-01T00:00:00Z"
        })
    }

    #[test]
    fn test_renders_all_sections() {
        let brief = format_landing_brief(&full_snapshot());
        assert!(brief.contains("INFRASTRUCTURE:"));
        assert!(brief.contains("alpha (orchestrator) @ 10.0.0.1 [online]"));
        assert!(brief.contains("ACTIVE SERVICES:"));
        assert!(brief.contains("postgres:5432 running"));
        assert!(brief.contains("KNOWLEDGE BASE:"));
        assert!(brief.contains("docs: 42 entries"));
        assert!(brief.contains("METRICS:"));
        assert!(brief.contains("By status: pending=2"));
        assert!(brief.contains("RECENT TASKS:"));
        assert!(brief.contains("[pending] review: Check the thing"));
        assert!(brief.contains("Generated: 2026-01-01T00:00:00Z"));
    }

    #[test]
    fn test_only_present_section_is_rendered() {
        let snapshot = json!({
            "services": [{"name": "redis", "status": "running"}]
        });
        let brief = format_landing_brief(&snapshot);
        assert!(brief.contains("ACTIVE SERVICES:"));
        assert!(brief.contains("redis running"));
        assert!(!brief.contains("INFRASTRUCTURE:"));
        assert!(!brief.contains("KNOWLEDGE BASE:"));
        assert!(!brief.contains("METRICS:"));
        assert!(!brief.contains("RECENT TASKS:"));
    }

    #[test]
    fn test_malformed_and_empty_sections_are_omitted() {
        let snapshot = json!({
            "nodes": "collection failed",
            "services": [],
            "knowledge_sources": null,
            "metrics": {},
            "recent_tasks": [{"description": "ok"}],
        });
        let brief = format_landing_brief(&snapshot);
        assert!(!brief.contains("INFRASTRUCTURE:"));
        assert!(!brief.contains("ACTIVE SERVICES:"));
        assert!(!brief.contains("KNOWLEDGE BASE:"));
        assert!(!brief.contains("METRICS:"));
        assert!(brief.contains("[?] task: ok"));
    }

    #[test]
    fn test_non_object_snapshot_still_renders() {
        let brief = format_landing_brief(&json!(null));
        assert!(brief.starts_with("=== LANDING BRIEF ==="));
        let brief = format_landing_brief(&json!([1, 2, 3]));
        assert!(brief.starts_with("=== LANDING BRIEF ==="));
    }

    #[test]
    fn test_recent_task_descriptions_are_truncated() {
        let long = "x".repeat(200);
        let snapshot = json!({
            "recent_tasks": [{"task_type": "t", "status": "running", "description": long}]
        });
        let brief = format_landing_brief(&snapshot);
        let expected = format!("{}...", "x".repeat(60));
        assert!(brief.contains(&expected));
        assert!(!brief.contains(&"x".repeat(61)));
    }

    #[test]
    fn test_lists_are_capped() {
        let sources: Vec<Value> = (0..15)
            .map(|i| json!({"name": format!("src{i}"), "entries": i}))
            .collect();
        let tasks: Vec<Value> = (0..8)
            .map(|i| json!({"task_type": "t", "status": "pending", "description": format!("task{i}")}))
            .collect();
        let brief = format_landing_brief(&json!({
            "knowledge_sources": sources,
            "recent_tasks": tasks,
        }));
        assert!(brief.contains("src9"));
        assert!(!brief.contains("src10"));
        assert!(brief.contains("... and 5 more"));
        assert!(brief.contains("task4"));
        assert!(!brief.contains("task5"));
    }
}
