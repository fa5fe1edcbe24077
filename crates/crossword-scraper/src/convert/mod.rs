//! Conversion of raw payloads into normalized puzzles.
//!
//! The orchestrator treats conversion as opaque: any [`PuzzleConverter`] may be plugged in.
//! [`FormatConverter`] handles the open formats and the simpler publisher formats directly.

mod crosshare;
mod guardian;
mod ipuz;
mod jpz;
mod puz;
mod uclick;
mod wall_street_journal;
mod xd;

use crate::error::{ConvertError, ConvertResult};
use crate::types::{NormalizedPuzzle, RawPayload};

pub use crosshare::parse_crosshare;
pub use guardian::parse_guardian;
pub use ipuz::parse_ipuz;
pub use jpz::{parse_jpz, parse_jpz_bytes};
pub use puz::parse_puz;
pub use uclick::parse_uclick_xml;
pub use wall_street_journal::parse_wall_street_journal;
pub use xd::parse_xd;

/// Converts a raw payload into a normalized puzzle, or fails.
pub trait PuzzleConverter: Send + Sync {
    fn convert(&self, payload: &RawPayload) -> ConvertResult<NormalizedPuzzle>;
}

/// Built-in converter for Across Lite, iPuz, JPZ, Uclick, xd, Guardian, Crosshare and WSJ payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatConverter;

impl PuzzleConverter for FormatConverter {
    fn convert(&self, payload: &RawPayload) -> ConvertResult<NormalizedPuzzle> {
        match payload {
            RawPayload::AcrossLite(data) => parse_puz(data),
            RawPayload::Ipuz(json) => parse_ipuz(json),
            RawPayload::Jpz(data) => parse_jpz_bytes(data),
            RawPayload::Xd(text) => parse_xd(text),
            RawPayload::UclickXml { xml, date } => {
                let mut puzzle = parse_uclick_xml(xml)?;
                puzzle.date = Some(*date);
                Ok(puzzle)
            }
            RawPayload::UclickJpz { xml, date } => {
                let mut puzzle = parse_jpz(xml)?;
                puzzle.date = Some(*date);
                Ok(puzzle)
            }
            RawPayload::Guardian(json) => parse_guardian(json),
            RawPayload::Crosshare(json) => parse_crosshare(json),
            RawPayload::WallStreetJournal(json) => parse_wall_street_journal(json),
            other => Err(ConvertError::Unsupported(other.kind())),
        }
    }
}

/// Whether a metadata string carries HTML markup.
pub(crate) fn looks_like_html(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    ["<b>", "<i>", "<em>", "<strong>", "<br", "<span", "<sup>", "<sub>", "&amp;", "&nbsp;"]
        .iter()
        .any(|tag| lower.contains(tag))
}
