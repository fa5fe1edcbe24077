//! JPZ (Crossword Compiler XML) reader, plain or zipped.

use std::io::Read;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::looks_like_html;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{Cell, Grid, NormalizedPuzzle, PuzzleType};

fn malformed(message: impl Into<String>) -> ConvertError {
    ConvertError::malformed("JPZ", message)
}

/// Parse JPZ bytes, unzipping first if the data is a zip archive.
pub fn parse_jpz_bytes(data: &[u8]) -> ConvertResult<NormalizedPuzzle> {
    if data.starts_with(b"PK") {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))?;
        if archive.is_empty() {
            return Err(malformed("empty archive"));
        }
        let mut file = archive.by_index(0)?;
        let mut xml = String::new();
        file.read_to_string(&mut xml)?;
        return parse_jpz(&xml);
    }
    let xml = String::from_utf8_lossy(data);
    parse_jpz(&xml)
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> ConvertResult<Option<String>> {
    for a in e.attributes() {
        let a = a.map_err(quick_xml::Error::from)?;
        if a.key.local_name().as_ref() == name {
            return Ok(Some(
                a.unescape_value()
                    .map_err(quick_xml::Error::from)?
                    .into_owned(),
            ));
        }
    }
    Ok(None)
}

struct JpzCell {
    x: usize,
    y: usize,
    cell: Cell,
}

fn read_cell(e: &BytesStart<'_>) -> ConvertResult<JpzCell> {
    let coord = |name: &[u8]| -> ConvertResult<usize> {
        attr(e, name)?
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v >= 1)
            .ok_or_else(|| malformed("cell without valid coordinates"))
    };
    let x = coord(b"x")?;
    let y = coord(b"y")?;
    let kind = attr(e, b"type")?;
    let cell = match kind.as_deref() {
        Some("block") | Some("void") => Cell::block(),
        _ => Cell::letter(attr(e, b"solution")?.unwrap_or_default()),
    };
    Ok(JpzCell {
        x: x - 1,
        y: y - 1,
        cell,
    })
}

/// Parse a JPZ XML document.
pub fn parse_jpz(xml: &str) -> ConvertResult<NormalizedPuzzle> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut title = String::new();
    let mut creator = String::new();
    let mut copyright = String::new();
    let mut description = String::new();
    let mut puzzle_type = PuzzleType::Crossword;
    let mut dimensions: Option<(usize, usize)> = None;
    let mut cells: Vec<JpzCell> = Vec::new();
    let mut in_metadata = false;
    let mut current_tag = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "metadata" => in_metadata = true,
                    "acrostic" => puzzle_type = PuzzleType::Acrostic,
                    "coded" => puzzle_type = PuzzleType::Coded,
                    "grid" => {
                        let width = attr(&e, b"width")?.and_then(|v| v.parse().ok());
                        let height = attr(&e, b"height")?.and_then(|v| v.parse().ok());
                        match (width, height) {
                            (Some(w), Some(h)) => dimensions = Some((w, h)),
                            _ => return Err(malformed("grid without dimensions")),
                        }
                    }
                    "cell" if dimensions.is_some() => cells.push(read_cell(&e)?),
                    _ => {}
                }
                current_tag = name;
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"metadata" {
                    in_metadata = false;
                }
                current_tag.clear();
            }
            Event::Text(e) if in_metadata => {
                let text = e
                    .unescape()
                    .map_err(quick_xml::Error::from)?
                    .trim()
                    .to_string();
                match current_tag.as_str() {
                    "title" => title.push_str(&text),
                    "creator" => creator.push_str(&text),
                    "copyright" => copyright.push_str(&text),
                    "description" => description.push_str(&text),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let (width, height) = dimensions.ok_or_else(|| malformed("no grid element"))?;
    let mut rows = vec![vec![Cell::block(); width]; height];
    for JpzCell { x, y, cell } in cells {
        let slot = rows
            .get_mut(y)
            .and_then(|row| row.get_mut(x))
            .ok_or_else(|| malformed(format!("cell ({}, {}) outside grid", x + 1, y + 1)))?;
        *slot = cell;
    }
    let grid = Grid::from_rows(rows).ok_or_else(|| malformed("grid is not rectangular"))?;

    Ok(NormalizedPuzzle {
        has_html_clues: [&title, &creator, &description]
            .iter()
            .any(|s| looks_like_html(s)),
        title,
        creator,
        copyright,
        description,
        date: None,
        grid,
        puzzle_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<crossword-compiler-applet xmlns="http://crossword.info/xml/crossword-compiler">
  <rectangular-puzzle xmlns="http://crossword.info/xml/rectangular-puzzle">
    <metadata>
      <title>Weekend &amp; More</title>
      <creator>Sam Solver</creator>
      <copyright>2024 Example</copyright>
    </metadata>
    <crossword>
      <grid width="2" height="2">
        <cell x="1" y="1" solution="A" number="1"/>
        <cell x="2" y="1" solution="B" number="2"/>
        <cell x="1" y="2" type="block"/>
        <cell x="2" y="2" solution="C"/>
      </grid>
    </crossword>
  </rectangular-puzzle>
</crossword-compiler-applet>"#;

    #[test]
    fn test_parse_jpz() {
        let puzzle = parse_jpz(SAMPLE).unwrap();
        assert_eq!(puzzle.title, "Weekend & More");
        assert_eq!(puzzle.creator, "Sam Solver");
        assert_eq!(puzzle.copyright, "2024 Example");
        assert_eq!(puzzle.grid, Grid::from_text(&["AB", "#C"]).unwrap());
        assert_eq!(puzzle.puzzle_type, PuzzleType::Crossword);
    }

    #[test]
    fn test_parse_zipped_jpz() {
        let mut zipped = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut zipped));
            writer
                .start_file("puzzle.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(SAMPLE.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        let puzzle = parse_jpz_bytes(&zipped).unwrap();
        assert_eq!(puzzle.creator, "Sam Solver");
    }

    #[test]
    fn test_cell_outside_grid() {
        let xml = r#"<rectangular-puzzle><crossword><grid width="1" height="1"><cell x="2" y="1" solution="A"/></grid></crossword></rectangular-puzzle>"#;
        assert!(matches!(
            parse_jpz(xml).unwrap_err(),
            ConvertError::Malformed { .. }
        ));
    }
}
