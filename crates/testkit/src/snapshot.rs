//! Golden-file snapshots of game state and outcomes.
//!
//! Values are stored as pretty JSON with object keys sorted, so the files
//! diff cleanly across serde field reorders. Set `GROVE_UPDATE_SNAPSHOTS=1`
//! to rewrite them.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Environment variable that enables snapshot updates.
pub const UPDATE_SNAPSHOTS_ENV: &str = "GROVE_UPDATE_SNAPSHOTS";

/// Compare `value` with the snapshot at `path`, or rewrite it when updates
/// are enabled.
pub fn assert_json_snapshot<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let rendered = to_canonical_json(value)?;

    if updates_enabled() {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating snapshot dir {}", dir.display()))?;
        }
        fs::write(path, &rendered)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        return Ok(());
    }

    let stored = fs::read_to_string(path).with_context(|| {
        format!(
            "no snapshot at {}; set {UPDATE_SNAPSHOTS_ENV}=1 to record it",
            path.display()
        )
    })?;
    if let Some(line) = first_difference(&stored, &rendered) {
        bail!(
            "snapshot {} differs at line {line}; set {UPDATE_SNAPSHOTS_ENV}=1 to accept",
            path.display()
        );
    }
    Ok(())
}

/// Render `value` the way snapshots store it.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("serializing snapshot value")?;
    let mut text = serde_json::to_string_pretty(&sorted(value))?;
    text.push('\n');
    Ok(text)
}

fn updates_enabled() -> bool {
    std::env::var(UPDATE_SNAPSHOTS_ENV)
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<_> = map.into_iter().collect();
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(fields.into_iter().map(|(k, v)| (k, sorted(v))).collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        leaf => leaf,
    }
}

/// 1-based line of the first difference, if any.
fn first_difference(stored: &str, rendered: &str) -> Option<usize> {
    if stored == rendered {
        return None;
    }
    let mut stored_lines = stored.lines();
    let mut rendered_lines = rendered.lines();
    let mut line = 1;
    loop {
        match (stored_lines.next(), rendered_lines.next()) {
            (Some(a), Some(b)) if a == b => line += 1,
            _ => return Some(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_recursively() {
        let text = to_canonical_json(&json!({"b": 1, "a": {"d": 2, "c": [ {"z": 0, "y": 1} ]}})).unwrap();
        let pos = |key: &str| text.find(&format!("\"{key}\"")).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("c") < pos("d"));
        assert!(pos("y") < pos("z"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn difference_reports_first_changed_line() {
        assert_eq!(first_difference("a\nb\n", "a\nb\n"), None);
        assert_eq!(first_difference("a\nb\n", "a\nc\n"), Some(2));
        assert_eq!(first_difference("a\n", "a\nb\n"), Some(2));
    }

    #[test]
    fn matching_snapshot_passes_and_mismatch_fails() {
        if updates_enabled() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, to_canonical_json(&json!({"leaves": 10, "dew": 0})).unwrap()).unwrap();
        assert_json_snapshot(&path, &json!({"dew": 0, "leaves": 10})).unwrap();
        let err = assert_json_snapshot(&path, &json!({"dew": 0, "leaves": 11})).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }
}
