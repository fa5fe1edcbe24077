//! xd text format reader.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Cell, Grid, NormalizedPuzzle};

fn malformed(message: impl Into<String>) -> ConvertError {
    ConvertError::malformed("xd", message)
}

/// Parse an xd document: a metadata block, then the grid, each separated by blank lines.
pub fn parse_xd(text: &str) -> ConvertResult<NormalizedPuzzle> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.starts_with("## ") {
            continue;
        }
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    let mut blocks = blocks.into_iter();
    let metadata_lines = blocks.next().ok_or_else(|| malformed("empty document"))?;
    let grid_lines = blocks.next().ok_or_else(|| malformed("no grid section"))?;

    let metadata: HashMap<String, String> = metadata_lines
        .iter()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let rebus: HashMap<char, String> = metadata
        .get("rebus")
        .map(|value| {
            value
                .split_whitespace()
                .filter_map(|entry| {
                    let (key, value) = entry.split_once('=')?;
                    let mut chars = key.chars();
                    match (chars.next(), chars.next()) {
                        (Some(ch), None) => Some((ch, value.to_string())),
                        _ => None,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let rows = grid_lines
        .iter()
        .map(|line| {
            line.trim()
                .chars()
                .map(|ch| match ch {
                    '#' | '_' => Cell::block(),
                    _ => match rebus.get(&ch) {
                        Some(value) => Cell::letter(value.clone()),
                        None => Cell::letter(ch.to_uppercase().to_string()),
                    },
                })
                .collect()
        })
        .collect();
    let grid = Grid::from_rows(rows).ok_or_else(|| malformed("grid rows differ in length"))?;

    let get = |key: &str| metadata.get(key).cloned().unwrap_or_default();
    let mut puzzle = NormalizedPuzzle::crossword(grid)
        .with_title(get("title"))
        .with_creator(get("author"));
    puzzle.copyright = get("copyright");
    puzzle.description = get("notes");
    puzzle.date = metadata
        .get("date")
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    Ok(puzzle)
}
