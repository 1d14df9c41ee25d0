use super::schema::{self, FIELD_LOGITS_ALL, FIELD_LOGPROBS, FieldRole, FieldValue};
use super::{GenerationSettings, RuntimeSelection};
use crate::error::SettingsError;
use crate::patterns::PatternStore;

/// Untyped request fields in submission order. The first value of a repeated name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pairs: Vec<(String, String)>,
}

impl RawFields {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut out: Vec<(String, String)> = Vec::new();
        for (k, v) in pairs {
            let k = k.into();
            if !out.iter().any(|(seen, _)| *seen == k) {
                out.push((k, v.into()));
            }
        }
        Self { pairs: out }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Turn raw form fields into generation settings plus routing selection.
///
/// - `prompt`, `selected_model` and `selected_prompt` go to the selection, never to settings.
/// - Empty values are dropped ("unset"), not coerced to a zero value.
/// - `logprobs` is dropped unless `logits_all` is set and true.
/// - Missing `stop_strings` are filled from the selected pattern's defaults.
pub fn resolve(
    raw: &RawFields,
    selected_pattern_name: Option<&str>,
    patterns: &PatternStore,
) -> Result<(GenerationSettings, RuntimeSelection), SettingsError> {
    let mut selection = RuntimeSelection {
        selected_model_path: non_empty(raw.get(schema::FIELD_SELECTED_MODEL)),
        selected_pattern_name: non_empty(selected_pattern_name),
        logits_all: false,
        prompt: raw.get(schema::FIELD_PROMPT).unwrap_or_default().to_string(),
        stops_from_pattern: false,
    };

    if let Some(value) = raw.get(FIELD_LOGITS_ALL).filter(|v| !v.is_empty()) {
        if let Some(spec) = schema::lookup(FIELD_LOGITS_ALL) {
            selection.logits_all = matches!(spec.coerce(value)?, FieldValue::Bool(true));
        }
    }

    let mut settings = GenerationSettings::default();
    for (name, value) in raw.iter() {
        let spec = schema::lookup(name).ok_or_else(|| SettingsError::UnknownField {
            field: name.to_string(),
        })?;
        if spec.role != FieldRole::Generation || value.is_empty() {
            continue;
        }
        if name == FIELD_LOGPROBS && !selection.logits_all {
            tracing::debug!("[settings] dropping `logprobs`: `logits_all` not set");
            continue;
        }
        apply(&mut settings, name, spec.coerce(value)?);
    }

    if settings.stop_strings.as_ref().is_none_or(|s| s.is_empty()) {
        let name = selection.selected_pattern_name.as_deref().unwrap_or_default();
        let pattern = patterns
            .get(name)
            .ok_or_else(|| SettingsError::UnknownPattern {
                name: name.to_string(),
            })?;
        settings.stop_strings = Some(pattern.default_stop_strings.clone());
        selection.stops_from_pattern = true;
    }

    Ok((settings, selection))
}

fn non_empty(v: Option<&str>) -> Option<String> {
    v.filter(|s| !s.is_empty()).map(str::to_string)
}

fn apply(settings: &mut GenerationSettings, name: &str, value: FieldValue) {
    match (name, value) {
        ("max_tokens", FieldValue::Int(v)) => settings.max_tokens = Some(v),
        ("top_k", FieldValue::Int(v)) => settings.top_k = Some(v),
        ("top_p", FieldValue::Float(v)) => settings.top_p = Some(v),
        ("temperature", FieldValue::Float(v)) => settings.temperature = Some(v),
        ("repeat_penalty", FieldValue::Float(v)) => settings.repeat_penalty = Some(v),
        ("logprobs", FieldValue::Int(v)) => settings.logprobs = Some(v),
        ("stop_strings", FieldValue::List(v)) => settings.stop_strings = Some(v),
        ("debug", FieldValue::Bool(v)) => settings.debug = Some(v),
        (other, v) => tracing::warn!("[settings] no slot for `{other}` = {v:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PromptPattern;

    fn store() -> PatternStore {
        PatternStore::from_patterns([
            PromptPattern {
                name: "chat".into(),
                template: "<PROMPT><RESPONSE>".into(),
                default_stop_strings: vec!["\n".into()],
            },
            PromptPattern {
                name: "alpaca".into(),
                template: "### Instruction:\n<PROMPT>\n### Response:\n<RESPONSE>".into(),
                default_stop_strings: vec!["###".into(), "\n\n".into()],
            },
        ])
        .unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> RawFields {
        RawFields::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn routing_fields_are_split_off() {
        let raw = fields(&[
            ("prompt", "hi"),
            ("selected_model", "m"),
            ("selected_prompt", "chat"),
        ]);
        let (settings, selection) = resolve(&raw, raw.get("selected_prompt"), &store()).unwrap();

        assert_eq!(selection.prompt, "hi");
        assert_eq!(selection.selected_model_path.as_deref(), Some("m"));
        assert_eq!(selection.selected_pattern_name.as_deref(), Some("chat"));
        assert_eq!(
            settings,
            GenerationSettings {
                stop_strings: Some(vec!["\n".into()]),
                ..Default::default()
            }
        );
    }

    #[test]
    fn values_are_coerced_per_field() {
        let raw = fields(&[
            ("max_tokens", "64"),
            ("top_k", "40"),
            ("top_p", "0.9"),
            ("temperature", "0.7"),
            ("repeat_penalty", "1.1"),
            ("debug", "on"),
            ("stop_strings", r"###,\n"),
        ]);
        let (s, _) = resolve(&raw, Some("chat"), &store()).unwrap();

        assert_eq!(s.max_tokens, Some(64));
        assert_eq!(s.top_k, Some(40));
        assert_eq!(s.top_p, Some(0.9));
        assert_eq!(s.temperature, Some(0.7));
        assert_eq!(s.repeat_penalty, Some(1.1));
        assert_eq!(s.debug, Some(true));
        assert_eq!(s.stop_strings, Some(vec!["###".to_string(), "\n".to_string()]));
    }

    #[test]
    fn empty_values_are_unset_not_zero() {
        let raw = fields(&[("top_p", ""), ("max_tokens", ""), ("debug", "")]);
        let (s, _) = resolve(&raw, Some("chat"), &store()).unwrap();
        assert_eq!(s.top_p, None);
        assert_eq!(s.max_tokens, None);
        assert_eq!(s.debug, None);
    }

    #[test]
    fn logprobs_requires_logits_all() {
        let raw = fields(&[("logprobs", "5")]);
        let (s, sel) = resolve(&raw, Some("chat"), &store()).unwrap();
        assert_eq!(s.logprobs, None);
        assert!(!sel.logits_all);

        let raw = fields(&[("logprobs", "5"), ("logits_all", "")]);
        assert_eq!(resolve(&raw, Some("chat"), &store()).unwrap().0.logprobs, None);

        let raw = fields(&[("logprobs", "5"), ("logits_all", "off")]);
        assert_eq!(resolve(&raw, Some("chat"), &store()).unwrap().0.logprobs, None);

        let raw = fields(&[("logprobs", "5"), ("logits_all", "on")]);
        let (s, sel) = resolve(&raw, Some("chat"), &store()).unwrap();
        assert_eq!(s.logprobs, Some(5));
        assert!(sel.logits_all);
    }

    #[test]
    fn caller_stop_strings_win_over_pattern_defaults() {
        let raw = fields(&[("stop_strings", "END")]);
        let (s, sel) = resolve(&raw, Some("alpaca"), &store()).unwrap();
        assert_eq!(s.stop_strings, Some(vec!["END".to_string()]));
        assert!(!sel.stops_from_pattern);
    }

    #[test]
    fn defaults_keep_pattern_order() {
        let (s, sel) = resolve(&RawFields::default(), Some("alpaca"), &store()).unwrap();
        assert_eq!(s.stop_strings(), ["###", "\n\n"]);
        assert!(sel.stops_from_pattern);
    }

    #[test]
    fn uncastable_value_is_a_configuration_error() {
        let raw = fields(&[("top_p", "high")]);
        let err = resolve(&raw, Some("chat"), &store()).unwrap_err();
        assert!(matches!(err, SettingsError::Configuration { ref field, .. } if field == "top_p"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let raw = fields(&[("n_threads", "8")]);
        let err = resolve(&raw, Some("chat"), &store()).unwrap_err();
        assert_eq!(
            err,
            SettingsError::UnknownField {
                field: "n_threads".into()
            }
        );
    }

    #[test]
    fn unknown_pattern_is_surfaced_when_default_needed() {
        let err = resolve(&RawFields::default(), Some("missing"), &store()).unwrap_err();
        assert_eq!(
            err,
            SettingsError::UnknownPattern {
                name: "missing".into()
            }
        );

        // Not needed when the caller brings their own stop strings.
        let raw = fields(&[("stop_strings", "x")]);
        assert!(resolve(&raw, Some("missing"), &store()).is_ok());
    }

    #[test]
    fn first_value_of_repeated_field_wins() {
        let raw = fields(&[("top_k", "10"), ("top_k", "20")]);
        let (s, _) = resolve(&raw, Some("chat"), &store()).unwrap();
        assert_eq!(s.top_k, Some(10));
    }
}
