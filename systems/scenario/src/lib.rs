#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scenario loading for the Crystals vs Trucks viewer.
//!
//! Scenario files are line oriented. Every line is first classified into a
//! [`ScenarioLine`] and the classified lines are then folded by a small state
//! machine that tracks whether a grid block is open. Header and grid problems
//! are fatal; lines that are neither headers, grid rows nor commands are
//! recorded as [`Event::LineIgnored`] and skipped.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use crystals_vs_trucks_core::{CommandKind, Event, GridDimensions, ScenarioCommand};
use crystals_vs_trucks_world::InitialGrid;
use thiserror::Error;

const GRID_START_MARKER: &str = "### Grid ###";
const GRID_END_MARKER: &str = "### End Grid ###";

/// Header fields recognised at the top level of a scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    /// Number of trucks taking part in the scenario.
    Trucks,
    /// Number of grid columns.
    Width,
    /// Number of grid rows.
    Height,
}

impl HeaderKind {
    const ALL: [HeaderKind; 3] = [Self::Trucks, Self::Width, Self::Height];

    /// Line prefix that introduces the header.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Trucks => "trucks: ",
            Self::Width => "width: ",
            Self::Height => "height: ",
        }
    }

    fn from_line(line: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| line.starts_with(kind.prefix()))
    }
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end())
    }
}

/// Classification of a single scenario line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScenarioLine {
    /// Header assigning a numeric value.
    Header {
        /// Header being assigned.
        kind: HeaderKind,
        /// Value carried by the header.
        value: u32,
    },
    /// Marker opening a grid block.
    GridStart,
    /// Marker closing a grid block.
    GridEnd,
    /// Row of crystal counts inside a grid block.
    GridRow(Vec<u32>),
    /// Timestamped command with its raw tokens.
    Command(ScenarioCommand),
    /// Line that carries no meaning for the viewer.
    Ignored,
}

/// Fatal problems encountered while parsing a scenario.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    /// A header value is not a non-negative integer.
    #[error("line {line}: `{header}` expects a non-negative integer, found `{value}`")]
    InvalidHeaderValue {
        /// One-based line number.
        line: usize,
        /// Header that failed to parse.
        header: HeaderKind,
        /// Token found in place of the value.
        value: String,
    },
    /// A grid dimension was declared as zero.
    #[error("line {line}: `{header}` must be at least 1")]
    ZeroDimension {
        /// One-based line number.
        line: usize,
        /// Dimension header carrying the zero.
        header: HeaderKind,
    },
    /// A grid row contains a character that is neither a space nor a digit.
    #[error("line {line}, column {column}: grid cell `{character}` is not a digit")]
    InvalidGridCell {
        /// One-based line number.
        line: usize,
        /// One-based column of the offending character.
        column: usize,
        /// Offending character.
        character: char,
    },
    /// A required header never appeared.
    #[error("scenario is missing the `{0}` header")]
    MissingHeader(HeaderKind),
}

/// Errors raised when loading a scenario from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The scenario file could not be read.
    #[error("failed to read scenario at {}", .path.display())]
    Read {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The scenario text is malformed.
    #[error(transparent)]
    Parse(#[from] ScenarioError),
}

/// Immutable scenario produced by the parser.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    nb_trucks: u32,
    initial_grid: InitialGrid,
    commands: Vec<ScenarioCommand>,
    diagnostics: Vec<Event>,
}

impl Scenario {
    /// Reads and parses the scenario stored at the provided path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(parse(&text)?)
    }

    /// Dimensions declared by the `width:` and `height:` headers.
    #[must_use]
    pub fn dimensions(&self) -> GridDimensions {
        self.initial_grid.dimensions()
    }

    /// Number of trucks declared by the `trucks:` header.
    #[must_use]
    pub const fn nb_trucks(&self) -> u32 {
        self.nb_trucks
    }

    /// Grid captured from the scenario's grid blocks.
    #[must_use]
    pub fn initial_grid(&self) -> &InitialGrid {
        &self.initial_grid
    }

    /// Commands in file order.
    #[must_use]
    pub fn commands(&self) -> &[ScenarioCommand] {
        &self.commands
    }

    /// Lines skipped while parsing, in file order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Event] {
        &self.diagnostics
    }
}

/// Classifies a single line given whether a grid block is currently open.
///
/// `line_number` is one-based and only used for diagnostics and errors.
pub fn classify(line: &str, line_number: usize, in_grid: bool) -> Result<ScenarioLine, ScenarioError> {
    if line.starts_with(GRID_END_MARKER) {
        return Ok(ScenarioLine::GridEnd);
    }

    if in_grid {
        return parse_grid_row(line, line_number).map(ScenarioLine::GridRow);
    }

    if let Some(kind) = HeaderKind::from_line(line) {
        let value = parse_header_value(line, line_number, kind)?;
        return Ok(ScenarioLine::Header { kind, value });
    }

    if line.starts_with(GRID_START_MARKER) {
        return Ok(ScenarioLine::GridStart);
    }

    let mut tokens = line.split_whitespace();
    let (Some(timestamp), Some(keyword)) = (tokens.next(), tokens.next()) else {
        return Ok(ScenarioLine::Ignored);
    };
    let Some(kind) = CommandKind::from_keyword(keyword) else {
        return Ok(ScenarioLine::Ignored);
    };

    let args = tokens.map(str::to_owned).collect();
    Ok(ScenarioLine::Command(ScenarioCommand::new(
        line_number,
        timestamp,
        kind,
        args,
    )))
}

fn parse_header_value(line: &str, line_number: usize, kind: HeaderKind) -> Result<u32, ScenarioError> {
    let token = line.split_whitespace().last().unwrap_or_default();
    let value = token
        .parse::<u32>()
        .map_err(|_| ScenarioError::InvalidHeaderValue {
            line: line_number,
            header: kind,
            value: token.to_owned(),
        })?;

    if value == 0 && kind != HeaderKind::Trucks {
        return Err(ScenarioError::ZeroDimension {
            line: line_number,
            header: kind,
        });
    }

    Ok(value)
}

/// Maps each character of the trimmed row to a cell: a space is empty, a digit is its count.
fn parse_grid_row(line: &str, line_number: usize) -> Result<Vec<u32>, ScenarioError> {
    let leading = line.chars().take_while(|character| character.is_whitespace()).count();
    line.trim()
        .chars()
        .enumerate()
        .map(|(index, character)| match character {
            ' ' => Ok(0),
            _ => character
                .to_digit(10)
                .ok_or(ScenarioError::InvalidGridCell {
                    line: line_number,
                    column: leading + index + 1,
                    character,
                }),
        })
        .collect()
}

#[derive(Debug, Default)]
struct ParserState {
    in_grid: bool,
    nb_trucks: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    rows: Vec<Vec<u32>>,
    commands: Vec<ScenarioCommand>,
    diagnostics: Vec<Event>,
}

impl ParserState {
    fn consume(&mut self, classified: ScenarioLine, line: &str, line_number: usize) {
        match classified {
            ScenarioLine::Header { kind, value } => {
                let slot = match kind {
                    HeaderKind::Trucks => &mut self.nb_trucks,
                    HeaderKind::Width => &mut self.width,
                    HeaderKind::Height => &mut self.height,
                };
                *slot = Some(value);
            }
            ScenarioLine::GridStart => self.in_grid = true,
            ScenarioLine::GridEnd => self.in_grid = false,
            ScenarioLine::GridRow(row) => self.rows.push(row),
            ScenarioLine::Command(command) => self.commands.push(command),
            ScenarioLine::Ignored => {
                if line.trim().is_empty() {
                    log::debug!("ignore blank line {line_number}");
                } else {
                    log::warn!("ignore line {line_number}: {line}");
                }
                self.diagnostics.push(Event::LineIgnored {
                    line: line_number,
                    text: line.to_owned(),
                });
            }
        }
    }

    fn finish(self) -> Result<Scenario, ScenarioError> {
        let nb_trucks = self
            .nb_trucks
            .ok_or(ScenarioError::MissingHeader(HeaderKind::Trucks))?;
        let width = self
            .width
            .ok_or(ScenarioError::MissingHeader(HeaderKind::Width))?;
        let height = self
            .height
            .ok_or(ScenarioError::MissingHeader(HeaderKind::Height))?;

        let initial_grid = InitialGrid::from_rows(GridDimensions::new(width, height), self.rows);
        log::info!(
            "loaded scenario: {width}x{height} grid, {nb_trucks} truck(s), {} command(s), {} ignored line(s)",
            self.commands.len(),
            self.diagnostics.len()
        );

        Ok(Scenario {
            nb_trucks,
            initial_grid,
            commands: self.commands,
            diagnostics: self.diagnostics,
        })
    }
}

/// Parses scenario text into an immutable [`Scenario`].
pub fn parse(text: &str) -> Result<Scenario, ScenarioError> {
    let mut state = ParserState::default();
    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let classified = classify(line, line_number, state.in_grid)?;
        state.consume(classified, line, line_number);
    }
    state.finish()
}
