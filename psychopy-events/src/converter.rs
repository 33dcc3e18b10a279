//! Main conversion API
//!
//! `EventConverter` is the entry point of the library. It owns the compiled
//! parser and the protocol tables and runs the stages in order:
//! parse → reconstruct → normalize → validate.

use crate::config::ProtocolConfig;
use crate::formats::PsychopyLogReader;
use crate::normalize::Normalizer;
use crate::parser::LogParser;
use crate::reconstruct::EventReconstructor;
use crate::types::{Event, RawLogLine, Result};
use crate::validate::Validator;
use std::path::Path;

/// Converts PsychoPy logs into validated BIDS events
pub struct EventConverter {
    parser: LogParser,
    reconstructor: EventReconstructor,
    normalizer: Normalizer,
    validator: Validator,
}

impl EventConverter {
    /// Create a converter for the given protocol
    ///
    /// # Example
    /// ```
    /// use psychopy_events::{EventConverter, ProtocolConfig};
    ///
    /// let converter = EventConverter::new(ProtocolConfig::default()).unwrap();
    /// let log = "0.0\tDATA\tKeypress: s\n\
    ///            0.6\tEXP\tmovie: autoDraw = True\n\
    ///            1200.6\tEXP\tmovie: autoDraw = False\n";
    /// let events = converter.convert_str(log).unwrap();
    /// assert_eq!(events.len(), 1);
    /// assert_eq!(events[0].trial_type, "movie");
    /// ```
    pub fn new(config: ProtocolConfig) -> Result<Self> {
        let ProtocolConfig {
            parser,
            normalizer,
            validator,
        } = config;

        Ok(Self {
            reconstructor: EventReconstructor::new(&parser),
            parser: LogParser::new(parser)?,
            normalizer: Normalizer::new(normalizer),
            validator: Validator::new(validator),
        })
    }

    /// Convert and validate a log file
    pub fn convert_file(&self, path: &Path) -> Result<Vec<Event>> {
        let lines = PsychopyLogReader::parse(path)?;
        self.convert_lines(&lines)
    }

    /// Convert and validate an in-memory log
    pub fn convert_str(&self, input: &str) -> Result<Vec<Event>> {
        let lines = PsychopyLogReader::parse_str(input)?;
        self.convert_lines(&lines)
    }

    /// Convert and validate already split log lines
    pub fn convert_lines(&self, lines: &[RawLogLine]) -> Result<Vec<Event>> {
        let events = self.convert_unchecked(lines)?;
        self.validator.validate(&events)?;
        Ok(events)
    }

    /// Convert without running the protocol checks
    pub fn convert_unchecked(&self, lines: &[RawLogLine]) -> Result<Vec<Event>> {
        let candidates = self.parser.parse(lines)?;
        let intervals = self.reconstructor.reconstruct(&candidates)?;
        let events = self.normalizer.normalize(&intervals)?;
        log::info!("Converted {} log lines into {} events", lines.len(), events.len());
        Ok(events)
    }

    /// The validator used by `convert_*`
    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}
