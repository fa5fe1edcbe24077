//! Across Lite `.puz` reader.

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Cell, Grid, NormalizedPuzzle};

const MAGIC: &[u8] = b"ACROSS&DOWN\0";
const MAGIC_OFFSET: usize = 0x02;
const WIDTH_OFFSET: usize = 0x2C;
const HEIGHT_OFFSET: usize = 0x2D;
const CLUE_COUNT_OFFSET: usize = 0x2E;
const SCRAMBLED_OFFSET: usize = 0x32;
const GRID_OFFSET: usize = 0x34;

fn malformed(message: impl Into<String>) -> ConvertError {
    ConvertError::malformed("Across Lite", message)
}

/// Byte cursor over the variable-length tail of the file.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> ConvertResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| malformed("unexpected end of file"))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// A NUL-terminated ISO-8859-1 string.
    fn string(&mut self) -> ConvertResult<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| malformed("unterminated string"))?;
        let text = latin1(&rest[..len]);
        self.pos += len + 1;
        Ok(text)
    }

    fn u16(&mut self) -> ConvertResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

/// Parse an Across Lite binary, including rebus squares from the GRBS/RTBL sections.
pub fn parse_puz(data: &[u8]) -> ConvertResult<NormalizedPuzzle> {
    if data.len() < GRID_OFFSET || &data[MAGIC_OFFSET..MAGIC_OFFSET + MAGIC.len()] != MAGIC {
        return Err(malformed("missing ACROSS&DOWN header"));
    }
    let width = data[WIDTH_OFFSET] as usize;
    let height = data[HEIGHT_OFFSET] as usize;
    let clue_count = u16::from_le_bytes([data[CLUE_COUNT_OFFSET], data[CLUE_COUNT_OFFSET + 1]]);
    let scrambled = u16::from_le_bytes([data[SCRAMBLED_OFFSET], data[SCRAMBLED_OFFSET + 1]]);
    if scrambled != 0 {
        return Err(malformed("scrambled puzzles are not supported"));
    }

    let mut cursor = Cursor {
        data,
        pos: GRID_OFFSET,
    };
    let solution = cursor.take(width * height)?;
    cursor.take(width * height)?; // player state

    let title = cursor.string()?;
    let creator = cursor.string()?;
    let copyright = cursor.string()?;
    for _ in 0..clue_count {
        cursor.string()?;
    }
    let description = cursor.string().unwrap_or_default();

    let rebus = read_rebus(&mut cursor, width * height);

    let rows = solution
        .chunks(width.max(1))
        .enumerate()
        .map(|(y, row)| {
            row.iter()
                .enumerate()
                .map(|(x, byte)| match byte {
                    b'.' | b':' => Cell::block(),
                    _ => match rebus.as_ref().and_then(|r| r[y * width + x].clone()) {
                        Some(value) => Cell::letter(value),
                        None => Cell::letter(char::from(*byte).to_string()),
                    },
                })
                .collect()
        })
        .collect();
    let grid = Grid::from_rows(rows).ok_or_else(|| malformed("grid is not rectangular"))?;

    let mut puzzle = NormalizedPuzzle::crossword(grid)
        .with_title(title)
        .with_creator(creator);
    puzzle.copyright = copyright;
    puzzle.description = description;
    Ok(puzzle)
}

/// Per-cell rebus solutions, if both GRBS and RTBL sections are present and well formed.
fn read_rebus(cursor: &mut Cursor<'_>, cells: usize) -> Option<Vec<Option<String>>> {
    let mut grbs: Option<&[u8]> = None;
    let mut rtbl: Option<String> = None;

    while cursor.remaining() >= 8 {
        let name = cursor.take(4).ok()?;
        let len = cursor.u16().ok()? as usize;
        cursor.u16().ok()?; // checksum
        let body = cursor.take(len).ok()?;
        cursor.take(1).ok()?;
        match name {
            b"GRBS" => grbs = Some(body),
            b"RTBL" => rtbl = Some(latin1(body)),
            _ => {}
        }
    }

    let grbs = grbs.filter(|g| g.len() == cells)?;
    let table: Vec<(u8, String)> = rtbl?
        .split(';')
        .filter_map(|entry| {
            let (key, value) = entry.split_once(':')?;
            Some((key.trim().parse().ok()?, value.to_string()))
        })
        .collect();

    Some(
        grbs.iter()
            .map(|marker| {
                if *marker == 0 {
                    return None;
                }
                table
                    .iter()
                    .find(|(key, _)| *key == marker - 1)
                    .map(|(_, value)| value.clone())
            })
            .collect(),
    )
}
