//! Engine settings loaded from TOML.
//!
//! - `DEFAULT_SETTINGS_TOML` is embedded via `include_str!`
//! - `load_settings(base, overrides)` parses a base document, applies
//!   `section.key=value` overrides to the TOML tree, then deserializes
//! - the resulting `Settings` is a plain value handed to whoever needs it

use serde::Deserialize;

use crate::assemble::UnkReplacement;
use crate::text::TokenizerKind;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("malformed override {raw:?}: {reason}")]
    MalformedOverride { raw: String, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub search: SearchSettings,
    pub interaction: InteractionSettings,
    pub sampling: SamplingSettings,
    pub training: TrainingSettings,
    pub text: TextSettings,
    pub model: ModelSettings,
}

impl Default for Settings {
    fn default() -> Self {
        parse_settings_toml(DEFAULT_SETTINGS_TOML).expect("embedded settings TOML must be valid")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSettings {
    pub beam_size: usize,
    pub max_extra_words: usize,
    pub length_normalization: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    Prefix,
    Segment,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InteractionSettings {
    pub mode: InteractionMode,
    pub unk_replacement: UnkReplacement,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingSettings {
    pub ngram_order: usize,
    /// N-grams seen fewer times than this count as under-trained.
    pub ngram_threshold: u64,
    pub qe_confidence: f32,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateFrequency {
    Sentence,
    Block,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingSettings {
    pub online: bool,
    pub update: UpdateFrequency,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextSettings {
    pub tokenizer: TokenizerKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSettings {
    pub lm_weight: f32,
    pub lm_smoothing: f32,
    pub lex_smoothing: f32,
    pub attention_width: f32,
    pub min_count: u32,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    load_settings::<&str>(Some(toml_str), &[])
}

/// Parse `base` (or the embedded defaults) and apply `key=value` overrides.
pub fn load_settings<S: AsRef<str>>(
    base: Option<&str>,
    overrides: &[S],
) -> Result<Settings, SettingsError> {
    let text = base.unwrap_or(DEFAULT_SETTINGS_TOML);
    let mut table: toml::Table =
        toml::from_str(text).map_err(|e| SettingsError::Parse(e.to_string()))?;
    for raw in overrides {
        apply_override(&mut table, raw.as_ref())?;
    }
    let s: Settings = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn apply_override(table: &mut toml::Table, raw: &str) -> Result<(), SettingsError> {
    let malformed = |reason: &str| SettingsError::MalformedOverride {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| malformed("expected key=value"))?;
    let path: Vec<&str> = key.trim().split('.').collect();
    if path.iter().any(|seg| seg.is_empty()) {
        return Err(malformed("empty key segment"));
    }
    let value = parse_override_value(value.trim());

    let (last, parents) = path
        .split_last()
        .ok_or_else(|| malformed("empty key"))?;
    let mut cursor = table;
    for seg in parents {
        let entry = cursor
            .entry(seg.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        cursor = match entry {
            toml::Value::Table(t) => t,
            _ => return Err(malformed("key path crosses a non-table value")),
        };
    }
    cursor.insert(last.to_string(), value);
    Ok(())
}

/// TOML literal if it parses as one, otherwise a bare string.
fn parse_override_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("v = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }
    macro_rules! check_unit_interval {
        ($section:ident . $field:ident) => {
            if !(0.0..=1.0).contains(&s.$section.$field) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be within [0, 1]".to_string(),
                });
            }
        };
    }
    macro_rules! check_positive_float {
        ($section:ident . $field:ident) => {
            if !(s.$section.$field > 0.0) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }

    check_positive!(search.beam_size);
    check_positive!(search.max_extra_words);

    check_positive!(sampling.ngram_order);
    check_unit_interval!(sampling.qe_confidence);

    check_unit_interval!(model.lm_weight);
    check_positive_float!(model.lm_smoothing);
    check_positive_float!(model.lex_smoothing);
    check_positive_float!(model.attention_width);
    check_positive!(model.min_count);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s.search.beam_size, 6);
        assert_eq!(s.search.max_extra_words, 12);
        assert!(s.search.length_normalization);
        assert_eq!(s.interaction.mode, InteractionMode::Prefix);
        assert_eq!(s.interaction.unk_replacement, UnkReplacement::Attention);
        assert_eq!(s.sampling.ngram_order, 3);
        assert_eq!(s.sampling.ngram_threshold, 1);
        assert_eq!(s.sampling.seed, 1234);
        assert!(!s.training.online);
        assert_eq!(s.training.update, UpdateFrequency::Sentence);
        assert_eq!(s.text.tokenizer, TokenizerKind::Whitespace);
        assert!((s.model.lm_weight - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn overrides_replace_values() {
        let s = load_settings(
            None,
            &[
                "search.beam_size=2",
                "interaction.mode=segment",
                "training.online = true",
                "model.lm_weight=0.9",
            ],
        )
        .unwrap();
        assert_eq!(s.search.beam_size, 2);
        assert_eq!(s.interaction.mode, InteractionMode::Segment);
        assert!(s.training.online);
        assert!((s.model.lm_weight - 0.9).abs() < 1e-6);
    }

    #[test]
    fn override_without_equals_is_malformed() {
        let err = load_settings(None, &["search.beam_size"]).unwrap_err();
        assert!(matches!(err, SettingsError::MalformedOverride { .. }));
    }

    #[test]
    fn override_with_empty_segment_is_malformed() {
        let err = load_settings(None, &["search..beam_size=3"]).unwrap_err();
        assert!(matches!(err, SettingsError::MalformedOverride { .. }));
    }

    #[test]
    fn override_through_scalar_is_malformed() {
        let err = load_settings(None, &["search.beam_size.x=3"]).unwrap_err();
        assert!(matches!(err, SettingsError::MalformedOverride { .. }));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = load_settings(None, &["search.beam_width=3"]).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn error_zero_beam() {
        let err = load_settings(None, &["search.beam_size=0"]).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(err.to_string().contains("search.beam_size"));
    }

    #[test]
    fn error_lm_weight_out_of_range() {
        let err = load_settings(None, &["model.lm_weight=1.5"]).unwrap_err();
        assert!(err.to_string().contains("model.lm_weight"));
    }

    #[test]
    fn error_unknown_tokenizer() {
        let err = load_settings(None, &["text.tokenizer=bpe"]).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn parse_valid_custom_toml() {
        let toml = r#"
[search]
beam_size = 3
max_extra_words = 5
length_normalization = false

[interaction]
mode = "prefix"
unk_replacement = "none"

[sampling]
ngram_order = 2
ngram_threshold = 4
qe_confidence = 0.3
seed = 7

[training]
online = true
update = "block"

[text]
tokenizer = "punctuation"

[model]
lm_weight = 0.5
lm_smoothing = 2.0
lex_smoothing = 0.5
attention_width = 0.5
min_count = 2
"#;
        let s = parse_settings_toml(toml).unwrap();
        assert_eq!(s.search.beam_size, 3);
        assert_eq!(s.interaction.unk_replacement, UnkReplacement::Marker);
        assert_eq!(s.training.update, UpdateFrequency::Block);
        assert_eq!(s.text.tokenizer, TokenizerKind::Punctuation);
    }
}
