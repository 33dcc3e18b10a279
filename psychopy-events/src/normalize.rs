//! Vocabulary normalisation and mock-block rewriting
//!
//! Maps internal PsychoPy stimulus names to the public trial-type vocabulary
//! and, for the breath-holding task, relabels the warm-up ("mock") block that
//! precedes the end message. Events after the end message are tagged with
//! their repetition block (`block1`, `block2`, ...).

use crate::config::NormalizerConfig;
use crate::types::{ConversionError, Event, Interval, Result, MISSING_VALUE};

/// Turns reconstructed intervals into BIDS events
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Public name for an internal trial type; unknown names pass through
    pub fn map_trial_type<'a>(&'a self, trial_type: &'a str) -> &'a str {
        self.config
            .vocabulary
            .get(trial_type)
            .map(String::as_str)
            .unwrap_or(trial_type)
    }

    /// Normalise intervals into the final event table
    pub fn normalize(&self, intervals: &[Interval]) -> Result<Vec<Event>> {
        let events: Vec<Event> = intervals
            .iter()
            .map(|interval| Event {
                onset: interval.onset,
                duration: interval.duration,
                trial_type: self.map_trial_type(&interval.trial_type).to_string(),
                value: interval
                    .value
                    .clone()
                    .unwrap_or_else(|| MISSING_VALUE.to_string()),
            })
            .collect();

        match events
            .iter()
            .position(|e| e.trial_type == self.config.end_message)
        {
            Some(end_index) => self.rewrite_mock_block(events, end_index),
            None => Ok(events),
        }
    }

    /// Relabel rows up to `end_index` as mock and the rest with block numbers
    fn rewrite_mock_block(&self, events: Vec<Event>, end_index: usize) -> Result<Vec<Event>> {
        let remaining = events.len() - end_index - 1;
        let capacity = self.config.block_capacity();
        if remaining > capacity {
            return Err(ConversionError::BlockOverflow { remaining, capacity });
        }

        log::debug!(
            "Mock block ends at row {}; labelling {} rows in blocks of {}",
            end_index,
            remaining,
            self.config.rows_per_block
        );

        let rows_per_block = self.config.rows_per_block;
        Ok(events
            .into_iter()
            .enumerate()
            .map(|(index, event)| {
                if index <= end_index {
                    let trial_type = self
                        .config
                        .mock_vocabulary
                        .get(&event.trial_type)
                        .cloned()
                        .unwrap_or(event.trial_type);
                    Event {
                        trial_type,
                        value: self.config.mock_value.clone(),
                        ..event
                    }
                } else {
                    let block = (index - end_index - 1) / rows_per_block + 1;
                    Event {
                        value: format!("block{block}"),
                        ..event
                    }
                }
            })
            .collect())
    }
}
