//! Core types for the PsychoPy event conversion library
//!
//! Every pipeline stage has its own row type. A stage borrows the previous
//! stage's rows and returns a fresh `Vec`, so no table is ever modified after
//! the stage that produced it has finished.

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConversionError>;

/// One line of a PsychoPy log, split into its three tab-separated fields
#[derive(Debug, Clone, PartialEq)]
pub struct RawLogLine {
    /// Timestamp on the log's own clock (seconds)
    pub onset: f64,
    /// Log level column (e.g. "DATA", "EXP", "WARNING")
    pub level: String,
    /// Free-text message
    pub description: String,
}

impl RawLogLine {
    pub fn new(onset: f64, level: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            onset,
            level: level.into(),
            description: description.into(),
        }
    }
}

/// Visibility state carried by an `autoDraw`/`visible` log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerState {
    /// Stimulus started being drawn (interval start)
    Visible,
    /// Stimulus stopped being drawn (interval end)
    Hidden,
}

impl MarkerState {
    /// Interpret the right-hand side of `autoDraw = <flag>`
    pub fn from_flag(flag: &str) -> Option<Self> {
        if flag.eq_ignore_ascii_case("true") {
            Some(MarkerState::Visible)
        } else if flag.eq_ignore_ascii_case("false") {
            Some(MarkerState::Hidden)
        } else {
            None
        }
    }
}

/// A parsed log line: every field the matchers could extract
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Onset relative to the first DATA line
    pub onset: f64,
    /// Internal trial-type token (None if no matcher recognised the line)
    pub trial_type: Option<String>,
    /// Visibility marker, if the line toggled a stimulus
    pub marker: Option<MarkerState>,
    /// Normalised hand code ("R"/"L") for motor trials
    pub hand: Option<String>,
    /// Horizontal fixation coordinate
    pub x: Option<f64>,
    /// Vertical fixation coordinate
    pub y: Option<f64>,
}

impl Candidate {
    /// A candidate with only an onset (the line matched nothing)
    pub fn unmatched(onset: f64) -> Self {
        Self {
            onset,
            trial_type: None,
            marker: None,
            hand: None,
            x: None,
            y: None,
        }
    }

    /// True if no matcher recognised anything on this line
    pub fn is_unmatched(&self) -> bool {
        self.trial_type.is_none()
            && self.marker.is_none()
            && self.hand.is_none()
            && self.x.is_none()
            && self.y.is_none()
    }

    /// A markerless row carrying a fixation coordinate pair
    pub fn is_coordinate_row(&self) -> bool {
        self.marker.is_none() && self.x.is_some()
    }

    /// A markerless row carrying a hand label
    pub fn is_hand_row(&self) -> bool {
        self.marker.is_none() && self.hand.is_some()
    }
}

/// A reconstructed stimulus occurrence, before vocabulary normalisation
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub onset: f64,
    /// Seconds between the visible and the paired hidden marker
    pub duration: Option<f64>,
    /// Internal trial-type token
    pub trial_type: String,
    /// Ancillary value (fixation coordinates or hand code)
    pub value: Option<String>,
    pub marker: Option<MarkerState>,
    pub hand: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Final BIDS event row
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub onset: f64,
    /// Missing for single-point events; written as `n/a`
    pub duration: Option<f64>,
    pub trial_type: String,
    pub value: String,
}

/// Canonical missing-value marker in BIDS tables
pub const MISSING_VALUE: &str = "n/a";

/// Errors that can occur while converting a log
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("No line with a level containing '{0}' found; cannot anchor onsets")]
    DataAnchor(String),

    #[error("Failed to parse log line {line}: {reason}")]
    LogParse { line: usize, reason: String },

    #[error(
        "Trial type '{trial_type}' has {starts} visible markers but {ends} hidden markers \
         after duplicate removal"
    )]
    UnpairedMarkers {
        trial_type: String,
        starts: usize,
        ends: usize,
    },

    #[error("Trial type '{trial_type}' has {starts} occurrences but {values} ancillary values")]
    AncillaryMismatch {
        trial_type: String,
        starts: usize,
        values: usize,
    },

    #[error("{remaining} events follow the mock block but only {capacity} block slots exist")]
    BlockOverflow { remaining: usize, capacity: usize },

    #[error("Invalid trial-type pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Protocol violations found in a finished event table
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "The duration {} of the task '{trial_type}' (row {index}) does not match its \
         expected duration of {expected}s",
        fmt_seconds(.actual)
    )]
    DurationMismatch {
        trial_type: String,
        index: usize,
        actual: Option<f64>,
        expected: f64,
    },

    #[error(
        "The stimulus '{trial_type}' was expected to repeat in multiples of {expected} \
         but was repeated {observed_runs:?} times instead"
    )]
    RepetitionMismatch {
        trial_type: String,
        observed_runs: Vec<usize>,
        expected: usize,
    },

    #[error(
        "The stimulus '{actual_predecessor}' preceded the stimulus '{trial_type}' (row {index}) \
         but '{expected_predecessor}' was expected"
    )]
    SequenceMismatch {
        trial_type: String,
        expected_predecessor: String,
        actual_predecessor: String,
        index: usize,
    },

    #[error("The '{trial_type}' should start at {expected_onset}s but starts at {actual_onset}s")]
    OnsetMismatch {
        trial_type: String,
        actual_onset: f64,
        expected_onset: f64,
    },
}

fn fmt_seconds(value: &Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}s"),
        None => MISSING_VALUE.to_string(),
    }
}
