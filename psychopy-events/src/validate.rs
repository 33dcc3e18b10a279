//! Protocol checks over a finished event table
//!
//! Each check is independent and stops at the first violation it finds.

use crate::config::ValidatorConfig;
use crate::types::{Event, ValidationError};

/// Checks an event table against a protocol description
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Run every check: durations, repetitions, sequence, fixed onset
    pub fn validate(&self, events: &[Event]) -> Result<(), ValidationError> {
        self.check_durations(events)?;
        self.check_repetitions(events)?;
        self.check_sequence(events)?;
        self.check_fixed_onset(events)?;
        log::info!("All protocol checks passed for {} events", events.len());
        Ok(())
    }

    /// Every event with an expected duration must be within tolerance of it
    pub fn check_durations(&self, events: &[Event]) -> Result<(), ValidationError> {
        let tolerance = self.config.duration_tolerance;
        for (trial_type, &expected) in &self.config.expected_durations {
            for (index, event) in indexed(events, trial_type) {
                let within = event
                    .duration
                    .is_some_and(|actual| (actual - expected).abs() < tolerance);
                if !within {
                    return Err(ValidationError::DurationMismatch {
                        trial_type: trial_type.clone(),
                        index,
                        actual: event.duration,
                        expected,
                    });
                }
            }
        }
        Ok(())
    }

    /// Runs of consecutive events must be multiples of the block size
    pub fn check_repetitions(&self, events: &[Event]) -> Result<(), ValidationError> {
        for (trial_type, &expected) in &self.config.repetitions {
            let runs = run_lengths(events, trial_type);
            if expected == 0 || runs.iter().any(|run| run % expected != 0) {
                return Err(ValidationError::RepetitionMismatch {
                    trial_type: trial_type.clone(),
                    observed_runs: runs,
                    expected,
                });
            }
        }
        Ok(())
    }

    /// Events must be immediately preceded by their required predecessor
    pub fn check_sequence(&self, events: &[Event]) -> Result<(), ValidationError> {
        for (trial_type, expected) in &self.config.predecessors {
            for (index, _) in indexed(events, trial_type).filter(|(index, _)| *index > 0) {
                let preceding = &events[index - 1].trial_type;
                if preceding != expected {
                    return Err(ValidationError::SequenceMismatch {
                        trial_type: trial_type.clone(),
                        expected_predecessor: expected.clone(),
                        actual_predecessor: preceding.clone(),
                        index,
                    });
                }
            }
        }
        Ok(())
    }

    /// The pinned trial type must start at its expected onset
    pub fn check_fixed_onset(&self, events: &[Event]) -> Result<(), ValidationError> {
        let Some(fixed) = &self.config.fixed_onset else {
            return Ok(());
        };
        for (_, event) in indexed(events, &fixed.trial_type) {
            if (event.onset - fixed.onset).abs() >= fixed.tolerance {
                return Err(ValidationError::OnsetMismatch {
                    trial_type: fixed.trial_type.clone(),
                    actual_onset: event.onset,
                    expected_onset: fixed.onset,
                });
            }
        }
        Ok(())
    }
}

fn indexed<'a>(
    events: &'a [Event],
    trial_type: &'a str,
) -> impl Iterator<Item = (usize, &'a Event)> + 'a {
    events
        .iter()
        .enumerate()
        .filter(move |(_, e)| e.trial_type == trial_type)
}

/// Lengths of the maximal runs of consecutive `trial_type` rows
fn run_lengths(events: &[Event], trial_type: &str) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = 0usize;
    for event in events {
        if event.trial_type == trial_type {
            current += 1;
        } else if current > 0 {
            runs.push(current);
            current = 0;
        }
    }
    if current > 0 {
        runs.push(current);
    }
    runs
}
