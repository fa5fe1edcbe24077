//! Crosshare Next.js page data reader.
//!
//! Accepts both the page's `__NEXT_DATA__` (`props.pageProps.puzzle`) and the data route
//! response (`pageProps.puzzle`).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::looks_like_html;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{Cell, Grid, NormalizedPuzzle};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Puzzle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    guest_constructor: Option<String>,
    #[serde(default)]
    constructor_notes: Option<String>,
    #[serde(default)]
    publish_time: Option<i64>,
    size: Size,
    grid: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Size {
    rows: usize,
    cols: usize,
}

fn malformed(message: impl Into<String>) -> ConvertError {
    ConvertError::malformed("Crosshare", message)
}

pub fn parse_crosshare(json: &str) -> ConvertResult<NormalizedPuzzle> {
    let doc: Value = serde_json::from_str(json)?;
    let puzzle = doc
        .pointer("/props/pageProps/puzzle")
        .or_else(|| doc.pointer("/pageProps/puzzle"))
        .ok_or_else(|| malformed("no puzzle in page data"))?;
    let puzzle: Puzzle = serde_json::from_value(puzzle.clone())?;

    let Size { rows, cols } = puzzle.size;
    if puzzle.grid.len() != rows * cols {
        return Err(malformed(format!(
            "grid has {} cells, expected {rows}x{cols}",
            puzzle.grid.len()
        )));
    }
    let cells: Vec<Vec<Cell>> = puzzle
        .grid
        .chunks(cols.max(1))
        .map(|row| {
            row.iter()
                .map(|value| match value.as_str() {
                    "." => Cell::block(),
                    letter => Cell::letter(letter),
                })
                .collect()
        })
        .collect();
    let grid = Grid::from_rows(cells).ok_or_else(|| malformed("grid is not rectangular"))?;

    let creator = puzzle
        .guest_constructor
        .filter(|name| !name.is_empty())
        .unwrap_or(puzzle.author_name);
    let mut result = NormalizedPuzzle::crossword(grid)
        .with_title(puzzle.title)
        .with_creator(creator);
    result.description = puzzle.constructor_notes.unwrap_or_default();
    result.date = puzzle
        .publish_time
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.date_naive());
    result.has_html_clues = looks_like_html(&result.title) || looks_like_html(&result.creator);
    Ok(result)
}
