//! Core data types for frames, raw payloads, normalized puzzles and processed results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Browser tab identifier.
pub type TabId = i64;

/// Frame identifier, scoped to a tab.
pub type FrameId = i64;

/// Parent id carried by the top-level frame of a tab.
pub const TOP_LEVEL_PARENT: FrameId = -1;

/// One browsing context within a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub frame_id: FrameId,
    pub parent_frame_id: FrameId,
    pub url: String,
}

impl Frame {
    pub fn new(frame_id: FrameId, parent_frame_id: FrameId, url: impl Into<String>) -> Self {
        Self {
            frame_id,
            parent_frame_id,
            url: url.into(),
        }
    }

    /// A frame with no parent.
    pub fn top_level(frame_id: FrameId, url: impl Into<String>) -> Self {
        Self::new(frame_id, TOP_LEVEL_PARENT, url)
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_frame_id == TOP_LEVEL_PARENT
    }
}

/// Publisher-specific puzzle data as extracted, prior to normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    /// Across Lite `.puz` binary.
    AcrossLite(Vec<u8>),
    /// iPuz JSON.
    Ipuz(String),
    /// JPZ XML, plain or zipped.
    Jpz(Vec<u8>),
    /// xd text.
    Xd(String),
    /// PuzzleMe `rawc` blob plus the loader script needed to decode it.
    PuzzleMe { rawc: String, loader_script: String },
    UclickJson(String),
    UclickXml { xml: String, date: NaiveDate },
    UclickJpz { xml: String, date: NaiveDate },
    /// Page HTML of the Boston Globe solver.
    BostonGlobe(String),
    Cnn(String),
    /// Next.js page data.
    Crosshare(String),
    /// GraphQL response.
    Crosswordr(String),
    DailyPrincetonian {
        crossword: String,
        authors: String,
        clues: String,
    },
    Guardian(String),
    /// Puzzle API JSON together with the puzzle stream (`daily`, `mini`, ...).
    NewYorkTimes { json: String, stream: String },
    NewYorkTimesPluribus(String),
    NewYorkTimesAcrostic(String),
    Pzzl(String),
    WallStreetJournal(String),
    WallStreetJournalAcrostic(String),
    WashingtonPost(String),
    WorldOfCrosswords { html: String, year: i32 },
    XWordInfo(String),
    XWordInfoAcrostic { json: String, author: String },
}

impl RawPayload {
    /// Short format name used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawPayload::AcrossLite(_) => "Across Lite",
            RawPayload::Ipuz(_) => "iPuz",
            RawPayload::Jpz(_) => "JPZ",
            RawPayload::Xd(_) => "xd",
            RawPayload::PuzzleMe { .. } => "PuzzleMe",
            RawPayload::UclickJson(_) => "Uclick JSON",
            RawPayload::UclickXml { .. } => "Uclick XML",
            RawPayload::UclickJpz { .. } => "Uclick JPZ",
            RawPayload::BostonGlobe(_) => "Boston Globe",
            RawPayload::Cnn(_) => "CNN",
            RawPayload::Crosshare(_) => "Crosshare",
            RawPayload::Crosswordr(_) => "Crosswordr",
            RawPayload::DailyPrincetonian { .. } => "Daily Princetonian",
            RawPayload::Guardian(_) => "Guardian",
            RawPayload::NewYorkTimes { .. } => "New York Times",
            RawPayload::NewYorkTimesPluribus(_) => "New York Times pluribus",
            RawPayload::NewYorkTimesAcrostic(_) => "New York Times acrostic",
            RawPayload::Pzzl(_) => "PZZL",
            RawPayload::WallStreetJournal(_) => "Wall Street Journal",
            RawPayload::WallStreetJournalAcrostic(_) => "Wall Street Journal acrostic",
            RawPayload::WashingtonPost(_) => "Washington Post",
            RawPayload::WorldOfCrosswords { .. } => "World of Crosswords",
            RawPayload::XWordInfo(_) => "XWord Info",
            RawPayload::XWordInfoAcrostic { .. } => "XWord Info acrostic",
        }
    }

    /// File extension used when saving the payload as-is.
    pub fn extension(&self) -> &'static str {
        match self {
            RawPayload::AcrossLite(_) => "puz",
            RawPayload::Ipuz(_) => "ipuz",
            RawPayload::Jpz(_) => "jpz",
            RawPayload::Xd(_) => "xd",
            RawPayload::UclickXml { .. } | RawPayload::UclickJpz { .. } => "xml",
            RawPayload::BostonGlobe(_) | RawPayload::WorldOfCrosswords { .. } => "html",
            RawPayload::Pzzl(_) => "txt",
            _ => "json",
        }
    }

    /// Raw bytes of the payload. Multi-part payloads are bundled into one JSON object.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RawPayload::AcrossLite(data) | RawPayload::Jpz(data) => data.clone(),
            RawPayload::Ipuz(text)
            | RawPayload::Xd(text)
            | RawPayload::UclickJson(text)
            | RawPayload::BostonGlobe(text)
            | RawPayload::Cnn(text)
            | RawPayload::Crosshare(text)
            | RawPayload::Crosswordr(text)
            | RawPayload::Guardian(text)
            | RawPayload::NewYorkTimesPluribus(text)
            | RawPayload::NewYorkTimesAcrostic(text)
            | RawPayload::Pzzl(text)
            | RawPayload::WallStreetJournal(text)
            | RawPayload::WallStreetJournalAcrostic(text)
            | RawPayload::WashingtonPost(text)
            | RawPayload::XWordInfo(text) => text.as_bytes().to_vec(),
            RawPayload::UclickXml { xml, .. } | RawPayload::UclickJpz { xml, .. } => {
                xml.as_bytes().to_vec()
            }
            RawPayload::WorldOfCrosswords { html, .. } => html.as_bytes().to_vec(),
            RawPayload::PuzzleMe {
                rawc,
                loader_script,
            } => serde_json::json!({ "rawc": rawc, "loaderScript": loader_script })
                .to_string()
                .into_bytes(),
            RawPayload::DailyPrincetonian {
                crossword,
                authors,
                clues,
            } => serde_json::json!({
                "crossword": crossword,
                "authors": authors,
                "clues": clues,
            })
            .to_string()
            .into_bytes(),
            RawPayload::NewYorkTimes { json, stream } => {
                serde_json::json!({ "stream": stream, "puzzle": json })
                    .to_string()
                    .into_bytes()
            }
            RawPayload::XWordInfoAcrostic { json, author } => {
                serde_json::json!({ "author": author, "puzzle": json })
                    .to_string()
                    .into_bytes()
            }
        }
    }
}

/// One grid cell. Black cells carry an empty solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub black: bool,
    pub solution: String,
}

impl Cell {
    pub fn block() -> Self {
        Self {
            black: true,
            solution: String::new(),
        }
    }

    pub fn letter(solution: impl Into<String>) -> Self {
        Self {
            black: false,
            solution: solution.into(),
        }
    }
}

/// A rectangular grid of cells, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    /// Build a grid from rows. Returns `None` if the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Option<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        Some(Self { rows })
    }

    /// Build a grid from one string per row, where `#` and `.` are black cells.
    pub fn from_text(rows: &[&str]) -> Option<Self> {
        Self::from_rows(
            rows.iter()
                .map(|row| {
                    row.chars()
                        .map(|ch| match ch {
                            '#' | '.' => Cell::block(),
                            _ => Cell::letter(ch.to_string()),
                        })
                        .collect()
                })
                .collect(),
        )
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.rows.get(y).and_then(|row| row.get(x))
    }

    pub fn same_dimensions(&self, other: &Grid) -> bool {
        self.width() == other.width() && self.height() == other.height()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleType {
    Crossword,
    Acrostic,
    Coded,
}

/// Output file formats a normalized puzzle may be downloaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Puz,
    Jpz,
    Ipuz,
    Pdf,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Puz,
        OutputFormat::Jpz,
        OutputFormat::Ipuz,
        OutputFormat::Pdf,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Puz => "puz",
            OutputFormat::Jpz => "jpz",
            OutputFormat::Ipuz => "ipuz",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn supports(self, puzzle: &NormalizedPuzzle) -> bool {
        match self {
            OutputFormat::Puz => {
                puzzle.puzzle_type == PuzzleType::Crossword
                    && puzzle.grid.width() <= u8::MAX as usize
                    && puzzle.grid.height() <= u8::MAX as usize
            }
            OutputFormat::Ipuz => puzzle.puzzle_type != PuzzleType::Acrostic,
            OutputFormat::Jpz | OutputFormat::Pdf => true,
        }
    }
}

/// Format-independent puzzle model used for deduplication and presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPuzzle {
    pub title: String,
    pub creator: String,
    pub copyright: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub grid: Grid,
    pub puzzle_type: PuzzleType,
    /// Whether title, creator or clues contain HTML markup.
    pub has_html_clues: bool,
}

impl NormalizedPuzzle {
    /// A plain crossword with empty metadata.
    pub fn crossword(grid: Grid) -> Self {
        Self {
            title: String::new(),
            creator: String::new(),
            copyright: String::new(),
            description: String::new(),
            date: None,
            grid,
            puzzle_type: PuzzleType::Crossword,
            has_html_clues: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    pub fn supported_formats(&self) -> Vec<OutputFormat> {
        OutputFormat::ALL
            .into_iter()
            .filter(|format| format.supports(self))
            .collect()
    }
}

/// A successfully converted puzzle along with the payload it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPuzzle {
    pub source: String,
    pub puzzle: NormalizedPuzzle,
    pub payload: RawPayload,
}

impl ScrapedPuzzle {
    /// Title for display: title, then creator, then source name.
    pub fn display_title(&self) -> &str {
        [&self.puzzle.title, &self.puzzle.creator]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or(&self.source)
    }

    /// File name stem: `Creator-Title` in capitalized words with non-alphanumerics removed.
    pub fn base_filename(&self) -> String {
        let parts: Vec<String> = [&self.puzzle.creator, &self.puzzle.title]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(|part| {
                let text = if self.puzzle.has_html_clues {
                    strip_html(part)
                } else {
                    part.clone()
                };
                text.split_whitespace()
                    .map(|word| capitalize(&word.replace(|c: char| !c.is_ascii_alphanumeric(), "")))
                    .collect::<String>()
            })
            .collect();
        if parts.is_empty() {
            self.source.clone()
        } else {
            parts.join("-")
        }
    }
}

fn strip_html(fragment: &str) -> String {
    scraper::Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One classified entry of a processed result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessedResult {
    Success(ScrapedPuzzle),
    NeedPermissions {
        source: String,
        permissions: Vec<String>,
        prompt: String,
    },
    Error {
        source: String,
    },
}

impl ProcessedResult {
    pub fn source(&self) -> &str {
        match self {
            ProcessedResult::Success(scraped) => &scraped.source,
            ProcessedResult::NeedPermissions { source, .. } | ProcessedResult::Error { source } => {
                source
            }
        }
    }
}

/// The deduplicated, classified results of one extraction run.
///
/// Has set semantics: inserting an entry equal to an existing one is a no-op, and two sets
/// compare equal regardless of insertion order.
#[derive(Debug, Clone, Default)]
pub struct ProcessedResultSet {
    entries: Vec<ProcessedResult>,
}

impl ProcessedResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Returns false if an equal entry was already present.
    pub fn insert(&mut self, entry: ProcessedResult) -> bool {
        if self.entries.contains(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, entry: &ProcessedResult) -> bool {
        self.entries.contains(entry)
    }

    /// Whether a permission request for the same set of patterns (in any order) is present.
    pub fn has_permission_request(&self, permissions: &[String]) -> bool {
        self.entries.iter().any(|entry| match entry {
            ProcessedResult::NeedPermissions {
                permissions: existing,
                ..
            } => same_set(existing, permissions),
            _ => false,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessedResult> {
        self.entries.iter()
    }

    pub fn successes(&self) -> impl Iterator<Item = &ScrapedPuzzle> {
        self.entries.iter().filter_map(|entry| match entry {
            ProcessedResult::Success(scraped) => Some(scraped),
            _ => None,
        })
    }

    pub fn permission_requests(&self) -> impl Iterator<Item = (&str, &[String], &str)> {
        self.entries.iter().filter_map(|entry| match entry {
            ProcessedResult::NeedPermissions {
                source,
                permissions,
                prompt,
            } => Some((source.as_str(), permissions.as_slice(), prompt.as_str())),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            ProcessedResult::Error { source } => Some(source.as_str()),
            _ => None,
        })
    }
}

impl PartialEq for ProcessedResultSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|entry| other.entries.contains(entry))
    }
}

impl Eq for ProcessedResultSet {}

impl IntoIterator for ProcessedResultSet {
    type Item = ProcessedResult;
    type IntoIter = std::vec::IntoIter<ProcessedResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Unordered comparison of two permission lists. Repeated entries do not count.
pub fn same_set(a: &[String], b: &[String]) -> bool {
    a.iter().all(|p| b.contains(p)) && b.iter().all(|p| a.contains(p))
}
