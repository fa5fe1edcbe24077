//! iPuz JSON reader.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use super::looks_like_html;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{Cell, Grid, NormalizedPuzzle, PuzzleType};

#[derive(Debug, Deserialize)]
struct Ipuz {
    #[serde(default)]
    kind: Vec<String>,
    dimensions: Dimensions,
    #[serde(default)]
    solution: Vec<Vec<Value>>,
    #[serde(default)]
    puzzle: Vec<Vec<Value>>,
    #[serde(default = "default_block")]
    block: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    copyright: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
struct Dimensions {
    width: usize,
    height: usize,
}

fn default_block() -> String {
    "#".to_string()
}

fn malformed(message: impl Into<String>) -> ConvertError {
    ConvertError::malformed("iPuz", message)
}

/// Text value of a cell entry, which may be a string, a number or an object with a `value` or
/// `cell` field.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("cell"))
            .and_then(cell_text),
        _ => None,
    }
}

/// Parse an iPuz document. A JSONP wrapper (`ipuz({...})`) is tolerated.
pub fn parse_ipuz(json: &str) -> ConvertResult<NormalizedPuzzle> {
    let trimmed = json.trim();
    let body = match (trimmed.find('('), trimmed.ends_with(')')) {
        (Some(open), true) if !trimmed.starts_with('{') => &trimmed[open + 1..trimmed.len() - 1],
        _ => trimmed,
    };
    let doc: Ipuz = serde_json::from_str(body)?;
    let Dimensions { width, height } = doc.dimensions;

    if doc.solution.len() != height || doc.solution.iter().any(|row| row.len() != width) {
        return Err(malformed(format!(
            "solution does not match dimensions {width}x{height}"
        )));
    }

    let rows = (0..height)
        .map(|y| {
            (0..width)
                .map(|x| {
                    let layout_block = doc
                        .puzzle
                        .get(y)
                        .and_then(|row| row.get(x))
                        .is_some_and(|v| v.is_null() || cell_text(v).as_deref() == Some(doc.block.as_str()));
                    match cell_text(&doc.solution[y][x]) {
                        _ if layout_block => Cell::block(),
                        None => Cell::block(),
                        Some(text) if text == doc.block => Cell::block(),
                        Some(text) => Cell::letter(text.to_uppercase()),
                    }
                })
                .collect()
        })
        .collect();
    let grid = Grid::from_rows(rows).ok_or_else(|| malformed("grid is not rectangular"))?;

    let puzzle_type = if doc.kind.iter().any(|k| k.contains("acrostic")) {
        PuzzleType::Acrostic
    } else {
        PuzzleType::Crossword
    };

    Ok(NormalizedPuzzle {
        has_html_clues: [&doc.title, &doc.author, &doc.notes]
            .iter()
            .any(|s| looks_like_html(s)),
        title: doc.title,
        creator: doc.author,
        copyright: doc.copyright,
        description: doc.notes,
        date: NaiveDate::parse_from_str(&doc.date, "%m/%d/%Y").ok(),
        grid,
        puzzle_type,
    })
}
