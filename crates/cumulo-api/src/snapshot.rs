//! Snapshots: point-in-time captures of a stack's desired state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot taken of a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot identifier.
    pub uid: String,
    /// What triggered the snapshot (manual, git push, ...).
    #[serde(default)]
    pub action: String,
    /// Who or what triggered the snapshot.
    #[serde(default)]
    pub triggered_by: String,
    /// When the snapshot was triggered.
    pub triggered_at: DateTime<Utc>,
    /// Git reference captured by the snapshot, when applicable.
    #[serde(default)]
    pub gitref: Option<String>,
}

/// Sort snapshots newest first.
pub fn sort_newest_first(snapshots: &mut [Snapshot]) {
    snapshots.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(uid: &str, triggered_at: &str) -> Snapshot {
        serde_json::from_str(&format!(
            r#"{{"uid":"{uid}","triggered_at":"{triggered_at}"}}"#
        ))
        .expect("valid snapshot")
    }

    #[test]
    fn sorts_newest_first() {
        let mut snapshots = vec![
            snapshot("sn-old", "2026-01-01T00:00:00Z"),
            snapshot("sn-new", "2026-03-01T00:00:00Z"),
            snapshot("sn-mid", "2026-02-01T00:00:00Z"),
        ];
        sort_newest_first(&mut snapshots);
        let order: Vec<&str> = snapshots.iter().map(|s| s.uid.as_str()).collect();
        assert_eq!(order, ["sn-new", "sn-mid", "sn-old"]);
    }
}
