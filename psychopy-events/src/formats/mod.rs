//! File formats at the edges of the pipeline
//!
//! - `psychopy_log`: the three-column tab-separated log PsychoPy writes
//! - `bids_tsv`: the BIDS `events.tsv` table the converter produces

pub mod bids_tsv;
pub mod psychopy_log;

pub use bids_tsv::BidsEventsWriter;
pub use psychopy_log::PsychopyLogReader;
