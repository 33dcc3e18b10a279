//! BIDS `events.tsv` writer
//!
//! Columns are `onset`, `duration`, `trial_type`, `value`. Floating-point
//! columns use five decimals and missing values are written as `n/a`.

use crate::types::{Event, Result, MISSING_VALUE};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADER: [&str; 4] = ["onset", "duration", "trial_type", "value"];

/// Writer for BIDS event tables
pub struct BidsEventsWriter;

impl BidsEventsWriter {
    /// Write the events to a new file, replacing any existing one
    pub fn write(path: &Path, events: &[Event]) -> Result<()> {
        log::info!("Writing {} events to {:?}", events.len(), path);

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::to_writer(&mut writer, events)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the table (header included) to any writer
    pub fn to_writer<W: Write>(writer: &mut W, events: &[Event]) -> Result<()> {
        writeln!(writer, "{}", HEADER.join("\t"))?;
        for event in events {
            writeln!(
                writer,
                "{:.5}\t{}\t{}\t{}",
                event.onset,
                format_duration(event.duration),
                event.trial_type,
                event.value
            )?;
        }
        Ok(())
    }

    /// Render the table as a string
    pub fn render(events: &[Event]) -> Result<String> {
        let mut buffer = Vec::new();
        Self::to_writer(&mut buffer, events)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn format_duration(duration: Option<f64>) -> String {
    match duration {
        Some(d) if d.is_finite() => format!("{d:.5}"),
        _ => MISSING_VALUE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> Vec<Event> {
        vec![
            Event {
                onset: 0.6,
                duration: Some(1200.012341),
                trial_type: "movie".to_string(),
                value: "n/a".to_string(),
            },
            Event {
                onset: 1201.5,
                duration: None,
                trial_type: "end-message".to_string(),
                value: "mock".to_string(),
            },
        ]
    }

    #[test]
    fn test_render() {
        let text = BidsEventsWriter::render(&events()).unwrap();
        let expected = "onset\tduration\ttrial_type\tvalue\n\
                        0.60000\t1200.01234\tmovie\tn/a\n\
                        1201.50000\tn/a\tend-message\tmock\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub-001_task-bht_events.tsv");

        BidsEventsWriter::write(&path, &events()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 3);
        assert!(written.starts_with("onset\tduration\ttrial_type\tvalue\n"));
    }

    #[test]
    fn test_empty_table_has_header() {
        let text = BidsEventsWriter::render(&[]).unwrap();
        assert_eq!(text, "onset\tduration\ttrial_type\tvalue\n");
    }
}
