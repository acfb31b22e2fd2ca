//! Merge Field Bindings
//!
//! `{{ FIELD }}` placeholders in string values of a clip configuration are
//! substituted from the document's merge list at load time. Each substituted
//! value is recorded against its JSON pointer so the placeholder can be put
//! back when the edit is saved, as long as the value was not edited since.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::{
    timeline::{ClipConfig, MergeField},
    CoreError, CoreResult,
};

/// Placeholder recorded for one substituted value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBinding {
    /// Authored text, placeholders included
    pub placeholder: String,
    /// Text after substitution
    pub resolved_value: String,
}

/// Bindings keyed by JSON pointer into the clip configuration
pub type FieldBindings = BTreeMap<String, FieldBinding>;

static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();

fn placeholder_regex() -> CoreResult<&'static Regex> {
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_\-]+)\s*\}\}").ok())
        .as_ref()
        .ok_or_else(|| CoreError::Internal("merge field pattern failed to compile".to_string()))
}

fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn substitute_strings(
    value: &mut Value,
    pointer: &str,
    pattern: &Regex,
    fields: &HashMap<&str, &str>,
    bindings: &mut FieldBindings,
) {
    match value {
        Value::String(text) => {
            if !pattern.is_match(text) {
                return;
            }
            let replaced = pattern.replace_all(text, |caps: &regex::Captures<'_>| {
                match fields.get(&caps[1]) {
                    Some(replacement) => (*replacement).to_string(),
                    None => caps[0].to_string(),
                }
            });
            if replaced != text.as_str() {
                let resolved = replaced.into_owned();
                bindings.insert(
                    pointer.to_string(),
                    FieldBinding {
                        placeholder: text.clone(),
                        resolved_value: resolved.clone(),
                    },
                );
                *text = resolved;
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                let child = format!("{pointer}/{index}");
                substitute_strings(item, &child, pattern, fields, bindings);
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                let child = format!("{pointer}/{}", escape_pointer_token(key));
                substitute_strings(item, &child, pattern, fields, bindings);
            }
        }
        _ => {}
    }
}

/// Substitutes merge fields into `config`, returning the merged
/// configuration and the bindings it produced.
///
/// Placeholders without a matching field are left as authored.
pub fn apply_merge_fields(
    config: &ClipConfig,
    fields: &[MergeField],
) -> CoreResult<(ClipConfig, FieldBindings)> {
    let mut bindings = FieldBindings::new();
    if fields.is_empty() {
        return Ok((config.clone(), bindings));
    }

    let pattern = placeholder_regex()?;
    let lookup: HashMap<&str, &str> = fields
        .iter()
        .map(|f| (f.find.as_str(), f.replace.as_str()))
        .collect();

    let mut value = serde_json::to_value(config)?;
    substitute_strings(&mut value, "", pattern, &lookup, &mut bindings);
    if bindings.is_empty() {
        return Ok((config.clone(), bindings));
    }

    debug!(count = bindings.len(), "Applied merge fields");
    let merged = serde_json::from_value(value).map_err(|e| {
        CoreError::ValidationError(format!("clip invalid after merge field substitution: {e}"))
    })?;
    Ok((merged, bindings))
}

/// Serializes `config`, putting placeholders back wherever the bound value
/// is still unchanged
pub fn restore_placeholders(config: &ClipConfig, bindings: &FieldBindings) -> CoreResult<Value> {
    let mut value = serde_json::to_value(config)?;
    for (pointer, binding) in bindings {
        if let Some(Value::String(current)) = value.pointer_mut(pointer) {
            if *current == binding.resolved_value {
                *current = binding.placeholder.clone();
            }
        }
    }
    Ok(value)
}
