//! Log line parser
//!
//! Turns raw PsychoPy log lines into [`Candidate`] rows. Three independent
//! matchers are tried on every description, in a fixed order:
//!
//! 1. visibility marker: `<trial_type>: autoDraw = True|False`
//! 2. hand label: `ft_hand: text = 'RIGHT'|'LEFT'`
//! 3. fixation coordinates: `New trial (rep=.., index=..): OrderedDict([('xpos', X), ('ypos', Y)])`
//!
//! Later matchers override the trial type set by earlier ones. Lines that match
//! nothing are kept with every optional field empty.

use crate::config::ParserConfig;
use crate::types::{Candidate, ConversionError, MarkerState, RawLogLine, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn coordinates_re() -> &'static Regex {
    static COORDINATES_RE: OnceLock<Regex> = OnceLock::new();
    COORDINATES_RE.get_or_init(|| {
        Regex::new(
            r"New trial \(rep=\d+, index=\d+\): OrderedDict\(\[\('xpos', (-?\d+\.\d+)\), \('ypos', (-?\d+\.\d+)\)\]\)",
        )
        .expect("valid coordinates regex")
    })
}

/// Parser for one protocol's log vocabulary
pub struct LogParser {
    config: ParserConfig,
    /// None when the configuration lists no trial types
    marker_re: Option<Regex>,
    hand_re: Regex,
}

impl LogParser {
    /// Compile the matchers for the given configuration
    pub fn new(config: ParserConfig) -> Result<Self> {
        let marker_re = if config.trial_types.is_empty() || config.visibility_attributes.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"({}):\s+(?:{})\s*=\s*(\w+)",
                alternation(&config.trial_types),
                alternation(&config.visibility_attributes),
            ))?)
        };

        let hand_re = Regex::new(&format!(
            r"{}:\s*text\s*=\s*'(RIGHT|LEFT)'",
            regex::escape(&config.motor_trial_type)
        ))?;

        Ok(Self {
            config,
            marker_re,
            hand_re,
        })
    }

    /// Parse a complete log into candidate rows
    ///
    /// Onsets are shifted so that the first line whose level contains the
    /// anchor token sits at zero. Exact duplicate lines are dropped, as is the
    /// anchor line itself when it carries no recognisable event.
    pub fn parse(&self, lines: &[RawLogLine]) -> Result<Vec<Candidate>> {
        let anchor_index = lines
            .iter()
            .position(|line| line.level.contains(&self.config.anchor_level))
            .ok_or_else(|| ConversionError::DataAnchor(self.config.anchor_level.clone()))?;
        let anchor_onset = lines[anchor_index].onset;

        log::debug!(
            "Anchoring onsets to line {} (t = {:.5}s)",
            anchor_index,
            anchor_onset
        );

        let mut seen: HashSet<(u64, &str, &str)> = HashSet::new();
        let mut candidates = Vec::with_capacity(lines.len());
        let mut duplicates = 0usize;

        for (index, line) in lines.iter().enumerate() {
            if !seen.insert((line.onset.to_bits(), line.level.as_str(), line.description.as_str())) {
                duplicates += 1;
                continue;
            }

            let candidate = self.parse_line(line, anchor_onset);
            if index == anchor_index && candidate.is_unmatched() {
                continue;
            }
            if candidate.is_unmatched() {
                log::trace!("Unmatched line {}: {}", index, line.description);
            }
            candidates.push(candidate);
        }

        log::info!(
            "Parsed {} candidates from {} log lines ({} duplicates dropped)",
            candidates.len(),
            lines.len(),
            duplicates
        );

        Ok(candidates)
    }

    /// Run every matcher over a single line
    pub fn parse_line(&self, line: &RawLogLine, anchor_onset: f64) -> Candidate {
        let mut candidate = Candidate::unmatched(line.onset - anchor_onset);
        let description = line.description.as_str();

        if let Some((trial_type, marker)) = self.match_marker(description) {
            candidate.trial_type = Some(trial_type);
            candidate.marker = marker;
        }

        if let Some(hand) = self.match_hand(description) {
            candidate.trial_type = Some(self.config.motor_trial_type.clone());
            candidate.hand = Some(hand);
        }

        if let Some((x, y)) = match_coordinates(description) {
            candidate.trial_type = Some(self.config.fixation_trial_type.clone());
            candidate.x = Some(x);
            candidate.y = Some(y);
        }

        candidate
    }

    /// Match `<trial_type>: autoDraw = <flag>`
    ///
    /// The marker is `None` when the flag is neither true nor false.
    pub fn match_marker(&self, description: &str) -> Option<(String, Option<MarkerState>)> {
        let caps = self.marker_re.as_ref()?.captures(description)?;
        let trial_type = caps.get(1)?.as_str().to_string();
        let marker = caps.get(2).and_then(|flag| MarkerState::from_flag(flag.as_str()));
        Some((trial_type, marker))
    }

    /// Match a motor-task hand label and normalise it to "R"/"L"
    pub fn match_hand(&self, description: &str) -> Option<String> {
        let caps = self.hand_re.captures(description)?;
        match caps.get(1)?.as_str() {
            "RIGHT" => Some("R".to_string()),
            "LEFT" => Some("L".to_string()),
            _ => None,
        }
    }
}

/// Match a "New trial" line and extract its fixation coordinates
pub fn match_coordinates(description: &str) -> Option<(f64, f64)> {
    let caps = coordinates_re().captures(description)?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let y = caps.get(2)?.as_str().parse().ok()?;
    Some((x, y))
}

fn alternation(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> LogParser {
        LogParser::new(ParserConfig::default()).unwrap()
    }

    fn line(onset: f64, level: &str, description: &str) -> RawLogLine {
        RawLogLine::new(onset, level, description)
    }

    #[test]
    fn test_match_marker() {
        let p = parser();
        assert_eq!(
            p.match_marker("grating: autoDraw = True"),
            Some(("grating".to_string(), Some(MarkerState::Visible)))
        );
        assert_eq!(
            p.match_marker("bh_body_2: autoDraw = False"),
            Some(("bh_body_2".to_string(), Some(MarkerState::Hidden)))
        );
        assert_eq!(
            p.match_marker("polygon_4: visible = true"),
            Some(("polygon_4".to_string(), Some(MarkerState::Visible)))
        );
        assert_eq!(p.match_marker("unknown_stim: autoDraw = True"), None);
        assert_eq!(p.match_marker("grating: opacity = 1.0"), None);
    }

    #[test]
    fn test_match_hand() {
        let p = parser();
        assert_eq!(p.match_hand("ft_hand: text = 'RIGHT'"), Some("R".to_string()));
        assert_eq!(p.match_hand("ft_hand: text = 'LEFT'"), Some("L".to_string()));
        assert_eq!(p.match_hand("ft_hand: text = 'BOTH'"), None);
    }

    #[test]
    fn test_match_coordinates() {
        let desc = "New trial (rep=0, index=3): OrderedDict([('xpos', -0.25), ('ypos', 0.5)])";
        assert_eq!(match_coordinates(desc), Some((-0.25, 0.5)));
        assert_eq!(match_coordinates("New trial (rep=0, index=3): {}"), None);
    }

    #[test]
    fn test_parse_anchors_onsets_to_first_data_line() {
        let lines = vec![
            line(10.0, "EXP", "Created window"),
            line(12.5, "DATA", "Keypress: s"),
            line(13.0, "EXP", "grating: autoDraw = True"),
            line(14.0, "DATA", "Keypress: s"),
        ];

        let candidates = parser().parse(&lines).unwrap();

        // The first DATA line carries no event and is dropped
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].onset, -2.5);
        assert_eq!(candidates[1].onset, 0.5);
        assert_eq!(candidates[1].trial_type.as_deref(), Some("grating"));
        assert_eq!(candidates[2].onset, 1.5);
        assert!(candidates[2].is_unmatched());
    }

    #[test]
    fn test_parse_keeps_anchor_line_when_it_matches() {
        let lines = vec![
            line(5.0, "DATA", "grating: autoDraw = True"),
            line(8.0, "EXP", "grating: autoDraw = False"),
        ];

        let candidates = parser().parse(&lines).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].onset, 0.0);
        assert_eq!(candidates[1].onset, 3.0);
    }

    #[test]
    fn test_parse_missing_anchor() {
        let lines = vec![line(1.0, "EXP", "grating: autoDraw = True")];
        let result = parser().parse(&lines);
        assert!(matches!(result, Err(ConversionError::DataAnchor(ref t)) if t == "DATA"));
    }

    #[test]
    fn test_parse_drops_exact_duplicates() {
        let lines = vec![
            line(0.0, "DATA", "Keypress: s"),
            line(4.0, "EXP", "bh_end: autoDraw = False"),
            line(4.0, "EXP", "bh_end: autoDraw = False"),
            line(4.0, "WARNING", "bh_end: autoDraw = False"),
        ];

        let candidates = parser().parse(&lines).unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_hand_and_coordinates_override_trial_type() {
        let p = parser();

        let hand = p.parse_line(&line(3.0, "EXP", "ft_hand: text = 'LEFT'"), 1.0);
        assert_eq!(hand.trial_type.as_deref(), Some("ft_hand"));
        assert_eq!(hand.hand.as_deref(), Some("L"));
        assert_eq!(hand.marker, None);
        assert_eq!(hand.onset, 2.0);

        let fixation = p.parse_line(
            &line(
                3.0,
                "EXP",
                "New trial (rep=1, index=0): OrderedDict([('xpos', 0.0), ('ypos', -0.3)])",
            ),
            0.0,
        );
        assert_eq!(fixation.trial_type.as_deref(), Some("eye_movement_fixation"));
        assert_eq!(fixation.x, Some(0.0));
        assert_eq!(fixation.y, Some(-0.3));
    }

    #[test]
    fn test_custom_trial_types() {
        let config = ParserConfig::default().with_trial_types(["stim", "cue.2"]);
        let p = LogParser::new(config).unwrap();

        assert_eq!(
            p.match_marker("stim: autoDraw = True"),
            Some(("stim".to_string(), Some(MarkerState::Visible)))
        );
        assert_eq!(
            p.match_marker("cue.2: autoDraw = False"),
            Some(("cue.2".to_string(), Some(MarkerState::Hidden)))
        );
        // Names are matched literally, and the built-in names are gone
        assert_eq!(p.match_marker("cuex2: autoDraw = False"), None);
        assert_eq!(p.match_marker("grating: autoDraw = True"), None);
    }

    #[test]
    fn test_custom_anchor_level() {
        let p = LogParser::new(ParserConfig::default().with_anchor_level("TRIGGER")).unwrap();
        let lines = vec![
            line(1.0, "DATA", "Keypress: space"),
            line(4.0, "TRIGGER", "Keypress: s"),
            line(5.0, "EXP", "grating: autoDraw = True"),
        ];

        let candidates = p.parse(&lines).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].onset, -3.0);
        assert_eq!(candidates[1].onset, 1.0);
    }
}
