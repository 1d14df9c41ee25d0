//! Field schema for form input: which names exist, what they coerce to, where they go.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::stop;
use crate::error::SettingsError;

pub const FIELD_PROMPT: &str = "prompt";
pub const FIELD_SELECTED_MODEL: &str = "selected_model";
pub const FIELD_SELECTED_PROMPT: &str = "selected_prompt";
pub const FIELD_LOGITS_ALL: &str = "logits_all";
pub const FIELD_LOGPROBS: &str = "logprobs";
pub const FIELD_STOP_STRINGS: &str = "stop_strings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Text,
    /// Comma-separated list, see [`stop::split_form`].
    List,
    Bool,
}

impl FieldKind {
    fn expected(self) -> &'static str {
        match self {
            FieldKind::Int => "a non-negative integer",
            FieldKind::Float => "a finite number",
            FieldKind::Text => "text",
            FieldKind::List => "a comma-separated list",
            FieldKind::Bool => "one of on/off, true/false, yes/no, 1/0",
        }
    }
}

/// Where a field ends up after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Part of `GenerationSettings`.
    Generation,
    /// Part of `RuntimeSelection`; never coerced.
    Routing,
    /// Coerced, then handed to the backend as a load-time parameter.
    ModelFlag,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub role: FieldRole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(u32),
    Float(f32),
    Text(String),
    List(Vec<String>),
    Bool(bool),
}

static SCHEMA: Lazy<HashMap<&'static str, FieldSpec>> = Lazy::new(|| {
    use FieldKind::*;
    use FieldRole::*;
    [
        (FIELD_PROMPT, Text, Routing),
        (FIELD_SELECTED_MODEL, Text, Routing),
        (FIELD_SELECTED_PROMPT, Text, Routing),
        ("max_tokens", Int, Generation),
        ("top_k", Int, Generation),
        ("top_p", Float, Generation),
        ("temperature", Float, Generation),
        ("repeat_penalty", Float, Generation),
        (FIELD_LOGPROBS, Int, Generation),
        (FIELD_STOP_STRINGS, List, Generation),
        ("debug", Bool, Generation),
        (FIELD_LOGITS_ALL, Bool, ModelFlag),
    ]
    .into_iter()
    .map(|(name, kind, role)| (name, FieldSpec { name, kind, role }))
    .collect()
});

pub fn lookup(name: &str) -> Option<&'static FieldSpec> {
    SCHEMA.get(name)
}

impl FieldSpec {
    /// Coerce a non-empty raw value. Surrounding whitespace is ignored for scalars.
    pub fn coerce(&self, raw: &str) -> Result<FieldValue, SettingsError> {
        let invalid = || SettingsError::Configuration {
            field: self.name.to_string(),
            value: raw.to_string(),
            expected: self.kind.expected(),
        };

        match self.kind {
            FieldKind::Int => raw.trim().parse::<u32>().map(FieldValue::Int).map_err(|_| invalid()),
            FieldKind::Float => raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(FieldValue::Float)
                .ok_or_else(invalid),
            FieldKind::Bool => parse_bool(raw).map(FieldValue::Bool).ok_or_else(invalid),
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::List => Ok(FieldValue::List(stop::split_form(raw))),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_generation_field_is_known() {
        for name in [
            "max_tokens",
            "top_k",
            "top_p",
            "temperature",
            "repeat_penalty",
            "logprobs",
            "stop_strings",
            "debug",
        ] {
            let spec = lookup(name).unwrap_or_else(|| panic!("{name} missing"));
            assert_eq!(spec.role, FieldRole::Generation);
        }
        assert_eq!(lookup("logits_all").unwrap().role, FieldRole::ModelFlag);
        assert!(lookup("n_gpu_layers").is_none());
    }

    #[test]
    fn scalars_coerce_with_surrounding_whitespace() {
        assert_eq!(lookup("top_k").unwrap().coerce(" 40 "), Ok(FieldValue::Int(40)));
        assert_eq!(lookup("top_p").unwrap().coerce("0.9"), Ok(FieldValue::Float(0.9)));
        assert_eq!(lookup("debug").unwrap().coerce("on"), Ok(FieldValue::Bool(true)));
        assert_eq!(lookup("debug").unwrap().coerce("False"), Ok(FieldValue::Bool(false)));
    }

    #[test]
    fn uncastable_values_name_the_field() {
        let err = lookup("top_p").unwrap().coerce("lots").unwrap_err();
        assert_eq!(
            err,
            SettingsError::Configuration {
                field: "top_p".into(),
                value: "lots".into(),
                expected: "a finite number",
            }
        );
        assert!(lookup("temperature").unwrap().coerce("NaN").is_err());
        assert!(lookup("max_tokens").unwrap().coerce("-1").is_err());
        assert!(lookup("max_tokens").unwrap().coerce("12.5").is_err());
        assert!(lookup("debug").unwrap().coerce("maybe").is_err());
    }
}
