//! Protocol configuration types
//!
//! All lookup tables the pipeline needs (trial-type vocabulary, expected
//! durations, repetition counts, predecessor rules, block layout) live here.
//! `ProtocolConfig::default()` describes the breath-holding / QCT protocol
//! the converter was written for; a TOML file can override any section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete configuration for one experiment protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub parser: ParserConfig,
    pub normalizer: NormalizerConfig,
    pub validator: ValidatorConfig,
}

impl ProtocolConfig {
    /// Create a configuration for the default protocol
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: replace the parser section
    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// Builder method: replace the normalizer section
    pub fn with_normalizer(mut self, normalizer: NormalizerConfig) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Builder method: replace the validator section
    pub fn with_validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }
}

/// Settings for the log parser and the event reconstructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Token searched in the level column to find the first trigger
    pub anchor_level: String,

    /// Internal stimulus names recognised in `<name>: autoDraw = <flag>` lines
    pub trial_types: Vec<String>,

    /// Attribute names that carry the visibility flag
    pub visibility_attributes: Vec<String>,

    /// Trial type assigned to lines carrying a hand label
    pub motor_trial_type: String,

    /// Trial type assigned to "New trial" lines carrying fixation coordinates
    pub fixation_trial_type: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            anchor_level: "DATA".to_string(),
            trial_types: default_vocabulary().into_keys().collect(),
            visibility_attributes: vec!["autoDraw".to_string(), "visible".to_string()],
            motor_trial_type: "ft_hand".to_string(),
            fixation_trial_type: "eye_movement_fixation".to_string(),
        }
    }
}

impl ParserConfig {
    /// Builder method: set the anchor level token
    pub fn with_anchor_level(mut self, token: impl Into<String>) -> Self {
        self.anchor_level = token.into();
        self
    }

    /// Builder method: replace the recognised trial types
    pub fn with_trial_types<I, S>(mut self, trial_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trial_types = trial_types.into_iter().map(Into::into).collect();
        self
    }
}

/// Settings for vocabulary mapping and the mock block rewrite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Internal token -> public trial type
    pub vocabulary: BTreeMap<String, String>,

    /// Public trial type marking the end of the mock block
    pub end_message: String,

    /// Relabeling applied to rows up to and including the end message
    pub mock_vocabulary: BTreeMap<String, String>,

    /// Value written to every mock row
    pub mock_value: String,

    /// Event rows produced by one repetition block
    pub rows_per_block: usize,

    /// Number of real blocks after the mock block
    pub block_count: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            vocabulary: default_vocabulary(),
            end_message: "end-message".to_string(),
            mock_vocabulary: table(&[
                ("in", "green"),
                ("out", "yellow"),
                ("in-last", "light-green"),
                ("out-last", "gold"),
            ]),
            mock_value: "mock".to_string(),
            rows_per_block: 13,
            block_count: 6,
        }
    }
}

impl NormalizerConfig {
    /// Builder method: set the block layout after the mock block
    pub fn with_blocks(mut self, rows_per_block: usize, block_count: usize) -> Self {
        self.rows_per_block = rows_per_block;
        self.block_count = block_count;
        self
    }

    /// Total number of rows the block labels can cover
    pub fn block_capacity(&self) -> usize {
        self.rows_per_block.saturating_mul(self.block_count)
    }
}

/// Expected onset for a trial type that occurs once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedOnset {
    pub trial_type: String,
    pub onset: f64,
    pub tolerance: f64,
}

impl Default for FixedOnset {
    fn default() -> Self {
        Self {
            trial_type: "movie".to_string(),
            onset: 0.6,
            tolerance: 0.1,
        }
    }
}

/// Protocol tables used by the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Allowed absolute deviation from the expected duration (seconds)
    pub duration_tolerance: f64,

    /// Public trial type -> expected duration in seconds
    pub expected_durations: BTreeMap<String, f64>,

    /// Public trial type -> number of consecutive repetitions per block
    pub repetitions: BTreeMap<String, usize>,

    /// Public trial type -> trial type that must immediately precede it
    pub predecessors: BTreeMap<String, String>,

    /// Trial type pinned to a fixed onset, if any
    pub fixed_onset: Option<FixedOnset>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        let expected_durations = [
            ("blank", 3.0),
            ("breath_in", 2.7),
            ("breath_in_last", 2.7),
            ("breath_out", 2.3),
            ("breath_out_last", 2.3),
            ("cog", 0.5),
            ("hold", 13.0),
            ("hold_end", 2.0),
            ("hold_test", 13.0),
            ("hold_test_end", 2.0),
            ("mot", 5.0),
            ("movie", 1200.0),
            ("vis", 3.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let repetitions = [("cog", 6), ("mot", 2)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        Self {
            duration_tolerance: 0.2,
            expected_durations,
            repetitions,
            predecessors: table(&[
                ("end_message", "lightred"),
                ("gold", "light-green"),
                ("hold", "out-last"),
                ("hold_warning", "hold"),
                ("in-last", "out"),
                ("light-green", "yellow"),
                ("lightred", "red"),
                ("out", "in"),
                ("out_last", "in-last"),
                ("red", "gold"),
                ("refractory", "hold-warning"),
                ("yellow", "green"),
            ]),
            fixed_onset: Some(FixedOnset::default()),
        }
    }
}

impl ValidatorConfig {
    /// A validator with empty tables (every check passes trivially)
    pub fn empty() -> Self {
        Self {
            duration_tolerance: 0.2,
            expected_durations: BTreeMap::new(),
            repetitions: BTreeMap::new(),
            predecessors: BTreeMap::new(),
            fixed_onset: None,
        }
    }

    /// Builder method: expect a duration for a trial type
    pub fn expect_duration(mut self, trial_type: impl Into<String>, seconds: f64) -> Self {
        self.expected_durations.insert(trial_type.into(), seconds);
        self
    }

    /// Builder method: expect a trial type to repeat in multiples of `count`
    pub fn expect_repetitions(mut self, trial_type: impl Into<String>, count: usize) -> Self {
        self.repetitions.insert(trial_type.into(), count);
        self
    }

    /// Builder method: require `predecessor` immediately before `trial_type`
    pub fn expect_predecessor(
        mut self,
        trial_type: impl Into<String>,
        predecessor: impl Into<String>,
    ) -> Self {
        self.predecessors.insert(trial_type.into(), predecessor.into());
        self
    }

    /// Builder method: pin a trial type to a fixed onset
    pub fn with_fixed_onset(mut self, trial_type: impl Into<String>, onset: f64, tolerance: f64) -> Self {
        self.fixed_onset = Some(FixedOnset {
            trial_type: trial_type.into(),
            onset,
            tolerance,
        });
        self
    }
}

fn default_vocabulary() -> BTreeMap<String, String> {
    table(&[
        ("eye_movement_fixation", "cog"),
        ("ft_hand", "mot"),
        ("fixation", "blank"),
        ("grating", "vis"),
        ("movie", "movie"),
        ("bh_body", "red"),
        ("bh_end", "lightred"),
        ("end_trial_msg", "end-message"),
        ("polygon_4", "in"),
        ("polygon1", "out"),
        ("polygon_6", "in-last"),
        ("polygon_8", "out-last"),
        ("bh_body_2", "hold"),
        ("bh_end_2", "hold-warning"),
        ("bh_end_3", "refractory"),
        // Older task versions
        ("polygon_5", "out"),
        ("polygon_7", "out-last"),
    ])
}

fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_protocol_tables() {
        let config = ProtocolConfig::new();

        assert_eq!(config.parser.anchor_level, "DATA");
        assert_eq!(config.parser.trial_types.len(), 17);
        assert_eq!(config.normalizer.vocabulary["polygon_4"], "in");
        assert_eq!(config.normalizer.block_capacity(), 78);
        assert_eq!(
            NormalizerConfig::default().with_blocks(usize::MAX, 2).block_capacity(),
            usize::MAX
        );
        assert_eq!(config.validator.expected_durations["vis"], 3.0);
        assert_eq!(config.validator.repetitions["cog"], 6);
        assert_eq!(config.validator.predecessors["out"], "in");
    }

    #[test]
    fn test_validator_builder() {
        let config = ValidatorConfig::empty()
            .expect_duration("vis", 3.0)
            .expect_repetitions("cog", 6)
            .expect_predecessor("out", "in")
            .with_fixed_onset("movie", 0.6, 0.1);

        assert_eq!(config.expected_durations.len(), 1);
        assert_eq!(config.repetitions["cog"], 6);
        assert_eq!(config.predecessors["out"], "in");
        assert_eq!(config.fixed_onset.map(|f| f.onset), Some(0.6));
    }

    #[test]
    fn test_vocabulary_values_are_not_keys() {
        // Mapping twice must equal mapping once
        let config = NormalizerConfig::default();
        for public in config.vocabulary.values() {
            if let Some(again) = config.vocabulary.get(public) {
                assert_eq!(again, public);
            }
        }
    }
}
