//! Universal Uclick XML reader.
//!
//! Values live in `v` attributes of top-level elements and are often percent-encoded.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Cell, Grid, NormalizedPuzzle};

fn malformed(message: impl Into<String>) -> ConvertError {
    ConvertError::malformed("Uclick XML", message)
}

fn decode(value: &str) -> String {
    if !value.contains('%') || value.contains('&') {
        return value.to_string();
    }
    url::form_urlencoded::parse(value.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

pub fn parse_uclick_xml(xml: &str) -> ConvertResult<NormalizedPuzzle> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut fields: Vec<(String, String)> = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                for a in e.attributes() {
                    let a = a.map_err(quick_xml::Error::from)?;
                    if a.key.local_name().as_ref() == b"v" {
                        let value = a.unescape_value().map_err(quick_xml::Error::from)?;
                        fields.push((name.clone(), decode(&value)));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let field = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim().to_string())
    };
    let dimension = |name: &str| -> ConvertResult<usize> {
        field(name)
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .ok_or_else(|| malformed(format!("missing {name}")))
    };

    let width = dimension("Width")?;
    let height = dimension("Height")?;
    let answer: Vec<char> = field("AllAnswer")
        .ok_or_else(|| malformed("missing AllAnswer"))?
        .chars()
        .collect();
    if answer.len() != width * height {
        return Err(malformed(format!(
            "AllAnswer has {} cells, expected {}",
            answer.len(),
            width * height
        )));
    }

    let rows = answer
        .chunks(width)
        .map(|row| {
            row.iter()
                .map(|ch| match ch {
                    '-' | '#' => Cell::block(),
                    other => Cell::letter(other.to_uppercase().to_string()),
                })
                .collect()
        })
        .collect();
    let grid = Grid::from_rows(rows).ok_or_else(|| malformed("grid is not rectangular"))?;

    let mut puzzle = NormalizedPuzzle::crossword(grid)
        .with_title(field("Title").unwrap_or_default())
        .with_creator(field("Author").unwrap_or_default());
    puzzle.copyright = field("Copyright").unwrap_or_default();
    Ok(puzzle)
}
