//! Guardian crossword JSON reader (the `data` prop of the crossword island).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Cell, Grid, NormalizedPuzzle};

#[derive(Debug, Deserialize)]
struct GuardianPuzzle {
    #[serde(default)]
    name: String,
    #[serde(default)]
    creator: Option<Creator>,
    #[serde(default)]
    date: Option<i64>,
    dimensions: Dimensions,
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Creator {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Dimensions {
    cols: usize,
    rows: usize,
}

#[derive(Debug, Deserialize)]
struct Entry {
    position: Position,
    direction: String,
    length: usize,
    #[serde(default)]
    solution: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Position {
    x: usize,
    y: usize,
}

fn malformed(message: impl Into<String>) -> ConvertError {
    ConvertError::malformed("Guardian", message)
}

/// Parse Guardian crossword JSON. Entries without solutions yield empty non-black cells.
pub fn parse_guardian(json: &str) -> ConvertResult<NormalizedPuzzle> {
    let doc: GuardianPuzzle = serde_json::from_str(json)?;
    let Dimensions { cols, rows } = doc.dimensions;
    let mut cells = vec![vec![Cell::block(); cols]; rows];

    for entry in &doc.entries {
        let (dx, dy) = match entry.direction.as_str() {
            "across" => (1, 0),
            "down" => (0, 1),
            other => return Err(malformed(format!("unknown direction {other}"))),
        };
        let letters: Vec<char> = entry
            .solution
            .as_deref()
            .unwrap_or_default()
            .chars()
            .collect();
        for i in 0..entry.length {
            let (x, y) = (entry.position.x + dx * i, entry.position.y + dy * i);
            let cell = cells
                .get_mut(y)
                .and_then(|row| row.get_mut(x))
                .ok_or_else(|| malformed(format!("entry runs outside grid at ({x}, {y})")))?;
            let letter = letters.get(i).map(|c| c.to_string()).unwrap_or_default();
            if cell.black || cell.solution.is_empty() {
                *cell = Cell::letter(letter);
            }
        }
    }

    let grid = Grid::from_rows(cells).ok_or_else(|| malformed("grid is not rectangular"))?;
    let mut puzzle = NormalizedPuzzle::crossword(grid)
        .with_title(doc.name)
        .with_creator(doc.creator.map(|c| c.name).unwrap_or_default());
    puzzle.date = doc
        .date
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.date_naive());
    puzzle.copyright = "Guardian News & Media Limited".to_string();
    Ok(puzzle)
}
