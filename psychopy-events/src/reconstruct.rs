//! Event reconstruction
//!
//! Pairs the visible/hidden markers of each trial type into intervals and
//! attaches the per-trial values that PsychoPy logs on separate lines
//! (fixation coordinates, motor hand). Only the row that opened an
//! occurrence survives; the rows that closed it or carried its value are
//! consumed.
//!
//! PsychoPy emits two `autoDraw = False` lines for a stimulus that ends before
//! its routine: one when the stimulus stops and one when the routine ends.
//! When the start and end counts of a trial type differ, every second end
//! marker is taken (positions 0, 2, 4, ...) before pairing.

use crate::config::ParserConfig;
use crate::types::{Candidate, ConversionError, Interval, MarkerState, Result};
use std::collections::HashMap;

/// Duration and value computed for one candidate row
#[derive(Debug, Clone, Default)]
struct Annotation {
    duration: Option<f64>,
    value: Option<String>,
}

/// Rebuilds intervals from candidate rows
pub struct EventReconstructor {
    motor_trial_type: String,
    fixation_trial_type: String,
}

impl EventReconstructor {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            motor_trial_type: config.motor_trial_type.clone(),
            fixation_trial_type: config.fixation_trial_type.clone(),
        }
    }

    /// Reconstruct one interval per logical stimulus occurrence
    ///
    /// Candidates without a trial type are ignored. Output rows keep the
    /// order of the input.
    pub fn reconstruct(&self, candidates: &[Candidate]) -> Result<Vec<Interval>> {
        let typed: Vec<(&Candidate, &str)> = candidates
            .iter()
            .filter_map(|c| c.trial_type.as_deref().map(|t| (c, t)))
            .collect();

        // Group row positions by trial type, in order of first appearance
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
        for (position, (_, trial_type)) in typed.iter().enumerate() {
            groups
                .entry(*trial_type)
                .or_insert_with(|| {
                    order.push(*trial_type);
                    Vec::new()
                })
                .push(position);
        }

        let mut annotations = vec![Annotation::default(); typed.len()];

        for trial_type in order {
            let rows = &groups[trial_type];
            if rows.len() < 2 {
                continue;
            }

            let starts: Vec<usize> = rows
                .iter()
                .copied()
                .filter(|&i| typed[i].0.marker == Some(MarkerState::Visible))
                .collect();
            let ends: Vec<usize> = rows
                .iter()
                .copied()
                .filter(|&i| typed[i].0.marker == Some(MarkerState::Hidden))
                .collect();

            let ends = select_end_markers(trial_type, &starts, ends)?;
            for (&start, &end) in starts.iter().zip(&ends) {
                annotations[start].duration = Some(typed[end].0.onset - typed[start].0.onset);
            }

            if let Some(values) = self.ancillary_values(trial_type, rows, &typed) {
                if values.len() != starts.len() {
                    return Err(ConversionError::AncillaryMismatch {
                        trial_type: trial_type.to_string(),
                        starts: starts.len(),
                        values: values.len(),
                    });
                }
                for (&start, value) in starts.iter().zip(values) {
                    annotations[start].value = Some(value);
                }
            }
        }

        let intervals: Vec<Interval> = typed
            .iter()
            .zip(annotations)
            .filter(|((candidate, _), _)| is_primary_row(candidate))
            .map(|((candidate, trial_type), annotation)| Interval {
                onset: candidate.onset,
                duration: annotation.duration,
                trial_type: trial_type.to_string(),
                value: annotation.value,
                marker: candidate.marker,
                hand: candidate.hand.clone(),
                x: candidate.x,
                y: candidate.y,
            })
            .collect();

        log::info!(
            "Reconstructed {} intervals from {} typed candidates",
            intervals.len(),
            typed.len()
        );

        Ok(intervals)
    }

    /// Values carried on markerless rows, for trial types that have them
    fn ancillary_values(
        &self,
        trial_type: &str,
        rows: &[usize],
        typed: &[(&Candidate, &str)],
    ) -> Option<Vec<String>> {
        if trial_type == self.fixation_trial_type {
            Some(
                rows.iter()
                    .map(|&i| typed[i].0)
                    .filter(|c| c.is_coordinate_row())
                    .filter_map(|c| Some(format_coordinates(c.x?, c.y?)))
                    .collect(),
            )
        } else if trial_type == self.motor_trial_type {
            Some(
                rows.iter()
                    .map(|&i| typed[i].0)
                    .filter(|c| c.is_hand_row())
                    .filter_map(|c| c.hand.clone())
                    .collect(),
            )
        } else {
            None
        }
    }
}

/// Pick the end markers that close each start, applying the stride-2 rule
/// when the counts differ
fn select_end_markers(trial_type: &str, starts: &[usize], ends: Vec<usize>) -> Result<Vec<usize>> {
    if starts.len() == ends.len() {
        return Ok(ends);
    }

    let strided: Vec<usize> = ends.iter().copied().step_by(2).collect();
    log::debug!(
        "Trial type '{}': {} starts vs {} ends, keeping every second end marker",
        trial_type,
        starts.len(),
        ends.len()
    );

    if strided.len() != starts.len() {
        return Err(ConversionError::UnpairedMarkers {
            trial_type: trial_type.to_string(),
            starts: starts.len(),
            ends: ends.len(),
        });
    }
    Ok(strided)
}

/// Rows that only closed an interval or carried a value are dropped
fn is_primary_row(candidate: &Candidate) -> bool {
    candidate.marker != Some(MarkerState::Hidden)
        && !candidate.is_coordinate_row()
        && !candidate.is_hand_row()
}

/// Render a coordinate pair the way the experiment logs it, e.g. "(0.0, -0.5)"
fn format_coordinates(x: f64, y: f64) -> String {
    format!("({}, {})", format_float(x), format_float(y))
}

fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}
