//! PsychoPy Events Library
//!
//! A stateless library that turns PsychoPy experiment logs into BIDS-style
//! event tables (`onset`, `duration`, `trial_type`, `value`) and checks them
//! against the experiment protocol.
//!
//! # Architecture
//!
//! The conversion is a one-shot batch pipeline; every stage returns a new table:
//! - `parser`: log lines → candidate rows (visibility markers, hand labels,
//!   fixation coordinates), onsets relative to the first trigger
//! - `reconstruct`: visible/hidden marker pairs → intervals with durations
//!   and per-trial values
//! - `normalize`: internal stimulus names → public trial types, mock block
//!   relabeling and block numbering
//! - `validate`: duration, repetition, sequence and fixed-onset checks
//!
//! All protocol tables come from [`ProtocolConfig`].
//!
//! The library does NOT:
//! - Parse command-line arguments
//! - Set up logging (it only emits `log` records)
//!
//! # Example Usage
//!
//! ```no_run
//! use psychopy_events::{BidsEventsWriter, EventConverter, ProtocolConfig};
//! use std::path::Path;
//!
//! let converter = EventConverter::new(ProtocolConfig::default()).unwrap();
//! let events = converter.convert_file(Path::new("sub-001_task-bht.log")).unwrap();
//! BidsEventsWriter::write(Path::new("sub-001_task-bht_events.tsv"), &events).unwrap();
//! ```

// Public modules
pub mod config;
pub mod converter;
pub mod formats;
pub mod normalize;
pub mod parser;
pub mod reconstruct;
pub mod types;
pub mod validate;

// Re-export main types for convenience
pub use config::{FixedOnset, NormalizerConfig, ParserConfig, ProtocolConfig, ValidatorConfig};
pub use converter::EventConverter;
pub use formats::{BidsEventsWriter, PsychopyLogReader};
pub use normalize::Normalizer;
pub use parser::LogParser;
pub use reconstruct::EventReconstructor;
pub use types::{
    Candidate, ConversionError, Event, Interval, MarkerState, RawLogLine, Result,
    ValidationError, MISSING_VALUE,
};
pub use validate::Validator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
