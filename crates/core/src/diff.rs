//! Flat-map comparison: classify every drifted path as Added, Removed or
//! Modified.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::taskdef::FlatMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
    Added,
    Removed,
    Modified,
}

/// One drifted path. `Removed` carries only `current`, `Added` only
/// `target`, `Modified` both. This shape is the contract every transport
/// binding preserves verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub kind: DiffKind,
}

/// Per-kind counts; the primary signal consumed upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffSummary {
    pub fn of(entries: &[DiffEntry]) -> Self {
        let mut s = Self::default();
        for e in entries {
            match e.kind {
                DiffKind::Added => s.added += 1,
                DiffKind::Removed => s.removed += 1,
                DiffKind::Modified => s.modified += 1,
            }
        }
        s
    }

    pub fn total(&self) -> usize {
        self.added + self.removed + self.modified
    }
}

/// Compare two flattened maps. Removals first in `current` order, then
/// additions and modifications in `target` order; both maps iterate
/// lexicographically, so output order is deterministic.
pub fn diff_maps(current: &FlatMap, target: &FlatMap) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    for (path, value) in current {
        if !target.contains_key(path) {
            out.push(DiffEntry {
                path: path.clone(),
                current: Some(value.clone()),
                target: None,
                kind: DiffKind::Removed,
            });
        }
    }
    for (path, value) in target {
        match current.get(path) {
            None => out.push(DiffEntry {
                path: path.clone(),
                current: None,
                target: Some(value.clone()),
                kind: DiffKind::Added,
            }),
            Some(cur) if cur != value => out.push(DiffEntry {
                path: path.clone(),
                current: Some(cur.clone()),
                target: Some(value.clone()),
                kind: DiffKind::Modified,
            }),
            Some(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taskdef::{flatten, normalize};
    use serde_json::json;

    fn flat(pairs: &[(&str, &str)]) -> FlatMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn identical_maps_produce_no_entries() {
        let m = flat(&[("family", "web"), ("cpu", "256")]);
        assert!(diff_maps(&m, &m).is_empty());
    }

    #[test]
    fn self_diff_of_a_full_task_definition_is_empty() {
        let td = json!({
            "family": "web",
            "cpu": "256",
            "memory": "512",
            "revision": 7,
            "containerDefinitions": [{
                "name": "web",
                "image": "nginx:1.25",
                "portMappings": [{"containerPort": 80, "protocol": "tcp"}],
                "environment": [{"name": "PORT", "value": "8080"}]
            }]
        });
        let m = flatten(&normalize(&td));
        assert!(diff_maps(&m, &m).is_empty());
    }

    #[test]
    fn modified_value_yields_exactly_one_entry() {
        let current = flat(&[("cpu", "256"), ("family", "web")]);
        let target = flat(&[("cpu", "512"), ("family", "web")]);
        let diffs = diff_maps(&current, &target);
        assert_eq!(
            diffs,
            vec![DiffEntry {
                path: "cpu".to_string(),
                current: Some("256".to_string()),
                target: Some("512".to_string()),
                kind: DiffKind::Modified,
            }]
        );
    }

    #[test]
    fn removed_container_is_one_identity_keyed_removal() {
        let current = flatten(&json!({"containerDefinitions": [
            {"name": "web", "image": "nginx:1.25"},
            {"name": "worker", "image": "worker:3"}
        ]}));
        let target = flatten(&json!({"containerDefinitions": [
            {"name": "worker", "image": "worker:3"}
        ]}));
        let diffs = diff_maps(&current, &target);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, DiffKind::Removed);
        assert_eq!(diffs[0].path, "containerDefinitions[web].image");
        assert_eq!(diffs[0].current.as_deref(), Some("nginx:1.25"));
        assert_eq!(diffs[0].target, None);
    }

    #[test]
    fn added_environment_variable_is_one_addition() {
        let current = flatten(&json!({"containerDefinitions": [{
            "name": "web",
            "environment": [{"name": "PORT", "value": "8080"}]
        }]}));
        let target = flatten(&json!({"containerDefinitions": [{
            "name": "web",
            "environment": [
                {"name": "PORT", "value": "8080"},
                {"name": "NEW_VAR", "value": "val"}
            ]
        }]}));
        let diffs = diff_maps(&current, &target);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, DiffKind::Added);
        assert_eq!(
            diffs[0].path,
            "containerDefinitions[web].environment[NEW_VAR]"
        );
        assert_eq!(diffs[0].current, None);
        assert_eq!(diffs[0].target.as_deref(), Some("val"));
    }

    #[test]
    fn swapping_sides_mirrors_every_classification() {
        let a = flat(&[("only_a", "1"), ("both", "x")]);
        let b = flat(&[("only_b", "2"), ("both", "y")]);
        let forward = diff_maps(&a, &b);
        let reverse = diff_maps(&b, &a);
        assert_eq!(forward.len(), reverse.len());
        for f in &forward {
            let r = reverse.iter().find(|r| r.path == f.path).unwrap();
            match f.kind {
                DiffKind::Added => assert_eq!(r.kind, DiffKind::Removed),
                DiffKind::Removed => assert_eq!(r.kind, DiffKind::Added),
                DiffKind::Modified => {
                    assert_eq!(r.kind, DiffKind::Modified);
                    assert_eq!(r.current, f.target);
                    assert_eq!(r.target, f.current);
                }
            }
        }
    }

    #[test]
    fn summary_counts_per_kind() {
        let current = flat(&[("gone", "1"), ("changed", "a")]);
        let target = flat(&[("changed", "b"), ("new", "2")]);
        let diffs = diff_maps(&current, &target);
        let s = DiffSummary::of(&diffs);
        assert_eq!(s.added, 1);
        assert_eq!(s.removed, 1);
        assert_eq!(s.modified, 1);
        assert_eq!(s.total(), 3);
    }

    #[test]
    fn serialized_entries_omit_absent_sides() {
        let entry = DiffEntry {
            path: "cpu".to_string(),
            current: None,
            target: Some("512".to_string()),
            kind: DiffKind::Added,
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            v,
            json!({"path": "cpu", "target": "512", "kind": "Added"})
        );
    }
}
