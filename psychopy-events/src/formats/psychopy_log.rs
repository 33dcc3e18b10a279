//! PsychoPy `.log` reader
//!
//! Each line is `onset<TAB>level<TAB>description`, without a header. Missing
//! trailing columns are read as empty strings; an onset that is not a number
//! is a fatal parse error.

use crate::types::{ConversionError, RawLogLine, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reader for PsychoPy log files
pub struct PsychopyLogReader;

impl PsychopyLogReader {
    /// Read every line of a log file
    pub fn parse(path: &Path) -> Result<Vec<RawLogLine>> {
        log::info!("Reading PsychoPy log: {:?}", path);

        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read every line from a buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Vec<RawLogLine>> {
        let mut lines = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(parsed) = parse_line(&line, index + 1)? {
                lines.push(parsed);
            }
        }
        log::debug!("Read {} log lines", lines.len());
        Ok(lines)
    }

    /// Read every line of an in-memory log
    pub fn parse_str(input: &str) -> Result<Vec<RawLogLine>> {
        input
            .lines()
            .enumerate()
            .filter_map(|(index, line)| parse_line(line, index + 1).transpose())
            .collect()
    }
}

/// Split one line into its three fields; blank lines yield `None`
fn parse_line(line: &str, line_number: usize) -> Result<Option<RawLogLine>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let mut fields = line.splitn(3, '\t');
    let onset_field = fields.next().unwrap_or_default().trim();
    let onset = onset_field
        .parse::<f64>()
        .map_err(|_| ConversionError::LogParse {
            line: line_number,
            reason: format!("onset '{}' is not a number", onset_field),
        })?;

    let level = fields.next().unwrap_or_default().trim();
    let description = fields.next().unwrap_or_default().trim();

    Ok(Some(RawLogLine::new(onset, level, description)))
}
