//! Hierarchical overlay merge: base ← environment ← region.
//!
//! The merge is a deep table merge over `toml::Value`. Overlay keys must
//! already exist in the base document, except inside designated *open
//! tables* (the per-rule override maps), where new entries are the point.
//! Merging the same overlay twice is a no-op — the operation is idempotent.

use crate::ConfigError;
use toml::Value;
use toml::value::Table;

/// Dotted paths whose tables accept keys the base does not declare.
const OPEN_TABLES: &[&str] = &["thresholds.rule_confidence", "sla.rule_hours"];

/// Deep-merge `overlay` into `base` in place.
pub fn merge_layers(base: &mut Value, overlay: &Value) -> Result<(), ConfigError> {
    merge_tables(base, overlay, "")
}

fn merge_tables(base: &mut Value, overlay: &Value, path: &str) -> Result<(), ConfigError> {
    match (base, overlay) {
        (Value::Table(base_table), Value::Table(overlay_table)) => {
            let open = OPEN_TABLES.contains(&path);
            for (key, overlay_value) in overlay_table {
                let child_path = join(path, key);
                match base_table.get_mut(key) {
                    Some(base_value) => merge_tables(base_value, overlay_value, &child_path)?,
                    None if open => {
                        base_table.insert(key.clone(), overlay_value.clone());
                    }
                    None => {
                        return Err(ConfigError::UnknownKey { path: child_path });
                    }
                }
            }
            Ok(())
        }
        (base, overlay) => {
            // Scalar or array: the overlay value replaces the base value,
            // but both sides must agree on shape.
            if is_table(base) != is_table(overlay) {
                return Err(ConfigError::ShapeMismatch { path: path.into() });
            }
            *base = overlay.clone();
            Ok(())
        }
    }
}

fn is_table(v: &Value) -> bool {
    matches!(v, Value::Table(_))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Parse a TOML string into a table value.
pub(crate) fn parse_table(
    content: &str,
    path: &std::path::Path,
) -> Result<Value, ConfigError> {
    let table: Table = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Value::Table(table))
}
