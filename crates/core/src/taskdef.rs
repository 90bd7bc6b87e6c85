//! Task-definition normalization and path flattening.
//!
//! A task definition is a deeply nested JSON document. Drift is computed by
//! flattening both versions into `path -> rendered value` maps and comparing
//! those. The flattening resolves list identity through a central catalog so
//! that reordering a named list is not drift and a renamed entry reads as
//! remove+add rather than a positional rewrite.

#![forbid(unsafe_code)]

use serde_json::Value as Json;
use std::collections::BTreeMap;

/// Flattened view of one task definition. `BTreeMap` keeps iteration
/// deterministic, which keeps diff ordering deterministic.
pub type FlatMap = BTreeMap<String, String>;

/// Fields AWS attaches when a task definition is registered. They can never
/// appear in the declared file, so comparing them would only produce noise.
const GENERATED_FIELDS: &[&str] = &[
    "revision",
    "taskDefinitionArn",
    "registeredAt",
    "registeredBy",
    "status",
    "requiresAttributes",
    "compatibilities",
];

/// Identity catalog: which property names a record inside a list, keyed by
/// the field that introduces the list. Adding a list field is a one-line
/// change here plus a test below.
const IDENTITY_KEYS: &[(&str, &str)] = &[
    ("containerDefinitions", "name"),
    ("environment", "name"),
    ("secrets", "name"),
    ("tags", "key"),
    ("portMappings", "containerPort"),
    ("mountPoints", "sourceVolume"),
    ("volumesFrom", "sourceContainer"),
    ("volumes", "name"),
    ("ulimits", "name"),
    ("systemControls", "namespace"),
    ("dependsOn", "containerName"),
    ("placementConstraints", "type"),
];

/// Properties that collapse a `{identity, value-like}` record into a single
/// leaf: environment variables and secret references.
const VALUE_KEYS: &[&str] = &["value", "valueFrom"];

fn identity_key(field: &str) -> Option<&'static str> {
    IDENTITY_KEYS
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, key)| *key)
}

/// Strip AWS-generated registration fields. Must run on both sides before
/// flattening. Pure; non-object input passes through untouched.
pub fn normalize(taskdef: &Json) -> Json {
    match taskdef {
        Json::Object(map) => {
            let mut out = map.clone();
            for field in GENERATED_FIELDS {
                out.remove(*field);
            }
            Json::Object(out)
        }
        other => other.clone(),
    }
}

/// Flatten a task definition into `path -> value`.
///
/// Paths join record fields with `.` and address list entries as
/// `field[identity]` (catalog hit) or `field[index]` (no rule). Numbers and
/// booleans render as literal text so `256` and `"256"` compare equal; the
/// declared file is plain JSON where that distinction is not meaningful.
pub fn flatten(taskdef: &Json) -> FlatMap {
    let mut out = FlatMap::new();
    flatten_value(taskdef, None, "", &mut out);
    out
}

fn render_scalar(v: &Json) -> Option<String> {
    match v {
        Json::Null => Some("null".to_string()),
        Json::Bool(b) => Some(b.to_string()),
        Json::Number(n) => Some(n.to_string()),
        Json::String(s) => Some(s.clone()),
        Json::Array(_) | Json::Object(_) => None,
    }
}

fn flatten_value(v: &Json, field: Option<&str>, prefix: &str, out: &mut FlatMap) {
    match v {
        Json::Null => {
            out.insert(prefix.to_string(), "null".to_string());
        }
        Json::Bool(_) | Json::Number(_) | Json::String(_) => {
            if let Some(s) = render_scalar(v) {
                out.insert(prefix.to_string(), s);
            }
        }
        Json::Array(items) => flatten_list(items, field, prefix, out),
        Json::Object(map) => {
            for (key, child) in map {
                let child_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_value(child, Some(key.as_str()), &child_prefix, out);
            }
        }
    }
}

fn flatten_list(items: &[Json], field: Option<&str>, prefix: &str, out: &mut FlatMap) {
    // Empty lists read the same as absent fields.
    if items.is_empty() {
        return;
    }

    // Scalar lists (command, dnsServers, ...) compare as one unit: a single
    // Modified entry instead of an index-keyed cascade when one element shifts.
    if items.iter().all(|i| !matches!(i, Json::Array(_) | Json::Object(_))) {
        let joined: Vec<String> = items.iter().filter_map(render_scalar).collect();
        out.insert(prefix.to_string(), joined.join(","));
        return;
    }

    if let Some(id_key) = field.and_then(identity_key) {
        for item in items {
            let Some(obj) = item.as_object() else { continue };
            // Records missing their identity property are skipped.
            let Some(ident) = obj.get(id_key).and_then(render_scalar) else {
                continue;
            };
            let item_prefix = format!("{prefix}[{ident}]");
            let rest: Vec<(&String, &Json)> =
                obj.iter().filter(|(k, _)| k.as_str() != id_key).collect();
            match rest.as_slice() {
                // name/value-shaped record: the identity addresses the value
                // directly (environment variables, secret references).
                [(key, value)] if VALUE_KEYS.contains(&key.as_str()) => {
                    match render_scalar(value) {
                        Some(s) => {
                            out.insert(item_prefix, s);
                        }
                        None => flatten_value(
                            value,
                            Some(key.as_str()),
                            &format!("{item_prefix}.{key}"),
                            out,
                        ),
                    }
                }
                _ => {
                    for (key, value) in rest {
                        flatten_value(
                            value,
                            Some(key.as_str()),
                            &format!("{item_prefix}.{key}"),
                            out,
                        );
                    }
                }
            }
        }
        return;
    }

    // No identity rule: position is part of the path.
    for (idx, item) in items.iter().enumerate() {
        flatten_value(item, None, &format!("{prefix}[{idx}]"), out);
    }
}
