//! Wall Street Journal crossword applet JSON reader.

use serde::Deserialize;
use serde_json::Value;

use super::looks_like_html;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{Cell, Grid, NormalizedPuzzle};

#[derive(Debug, Deserialize)]
struct Document {
    data: Data,
}

#[derive(Debug, Deserialize)]
struct Data {
    #[serde(default)]
    copy: CopyText,
    grid: Vec<Vec<GridCell>>,
}

#[derive(Debug, Default, Deserialize)]
struct CopyText {
    #[serde(default)]
    title: String,
    #[serde(default)]
    byline: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct GridCell {
    #[serde(rename = "Letter", default)]
    letter: String,
    #[serde(rename = "Blank", default)]
    blank: Value,
}

impl GridCell {
    fn is_black(&self) -> bool {
        let blank = match &self.blank {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            _ => true,
        };
        blank || self.letter.is_empty()
    }
}

pub fn parse_wall_street_journal(json: &str) -> ConvertResult<NormalizedPuzzle> {
    let doc: Document = serde_json::from_str(json)?;
    let cells = doc
        .data
        .grid
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| {
                    if cell.is_black() {
                        Cell::block()
                    } else {
                        Cell::letter(cell.letter.as_str())
                    }
                })
                .collect()
        })
        .collect();
    let grid = Grid::from_rows(cells)
        .ok_or_else(|| ConvertError::malformed("Wall Street Journal", "grid is not rectangular"))?;

    let copy = doc.data.copy;
    let creator = copy.byline.trim_start_matches("By ").to_string();
    let mut puzzle = NormalizedPuzzle::crossword(grid)
        .with_title(copy.title)
        .with_creator(creator);
    puzzle.copyright = copy.publisher;
    puzzle.description = copy.description;
    puzzle.has_html_clues = looks_like_html(&puzzle.title) || looks_like_html(&puzzle.description);
    Ok(puzzle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wall_street_journal() {
        let json = r#"{"data": {
            "copy": {"title": "Turning Point", "byline": "By Mike Shenk", "publisher": "The Wall Street Journal"},
            "meta": {"type": "crossword"},
            "grid": [
                [{"Letter": "A", "Blank": ""}, {"Letter": "", "Blank": "blank"}],
                [{"Letter": "B", "Blank": ""}, {"Letter": "C"}]
            ]
        }}"#;
        let puzzle = parse_wall_street_journal(json).unwrap();
        assert_eq!(puzzle.title, "Turning Point");
        assert_eq!(puzzle.creator, "Mike Shenk");
        assert_eq!(puzzle.copyright, "The Wall Street Journal");
        assert_eq!(puzzle.grid, Grid::from_text(&["A#", "BC"]).unwrap());
    }

    #[test]
    fn test_ragged_grid() {
        let json = r#"{"data": {"grid": [[{"Letter": "A"}], [{"Letter": "B"}, {"Letter": "C"}]]}}"#;
        assert!(parse_wall_street_journal(json).is_err());
    }
}
