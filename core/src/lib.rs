#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Crystals vs Trucks replay viewer.
//!
//! This crate defines the vocabulary that connects the scenario parser, the
//! authoritative simulation state, and the replay system. The parser produces
//! [`ScenarioCommand`] values holding the raw tokens of each command line, the
//! world interprets those commands through its `apply` entry point, and every
//! outcome worth reporting is recorded as an [`Event`] so adapters and tests
//! can inspect what happened without scraping log output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical title shown by adapters when the viewer boots.
pub const WINDOW_TITLE: &str = "Crystals VS Trucks";

/// Unique identifier assigned to a truck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TruckId(u32);

impl TruckId {
    /// Creates a new truck identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell, the `x` of the scenario format.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell, the `y` of the scenario format.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Dimensions of the crystal grid measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    width: u32,
    height: u32,
}

impl GridDimensions {
    /// Creates a new dimension descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Kinds of commands understood by the viewer.
///
/// Variants are declared in the lexicographic order of their scenario
/// keywords so that the derived ordering matches comparing the keywords as
/// strings (`DIG < MOVE < WAIT`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommandKind {
    /// Removes one crystal from the cell under a truck.
    Dig,
    /// Teleports a truck to a cell.
    Move,
    /// Does nothing; keeps a truck idle.
    Wait,
}

impl CommandKind {
    /// Every recognised command kind in keyword order.
    pub const ALL: [CommandKind; 3] = [Self::Dig, Self::Move, Self::Wait];

    /// Resolves a scenario keyword into a command kind.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.keyword() == keyword)
    }

    /// Keyword used for the command in scenario files.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Dig => "DIG",
            Self::Move => "MOVE",
            Self::Wait => "WAIT",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Command line captured from a scenario file.
///
/// The timestamp and arguments are kept as the raw tokens found in the file;
/// interpreting them is deferred until replay.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioCommand {
    line: usize,
    timestamp: String,
    kind: CommandKind,
    args: Vec<String>,
}

impl ScenarioCommand {
    /// Creates a new command from its raw tokens.
    #[must_use]
    pub fn new(line: usize, timestamp: impl Into<String>, kind: CommandKind, args: Vec<String>) -> Self {
        Self {
            line,
            timestamp: timestamp.into(),
            kind,
            args,
        }
    }

    /// One-based line number the command was read from.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Raw timestamp token.
    #[must_use]
    pub fn timestamp_token(&self) -> &str {
        &self.timestamp
    }

    /// Timestamp in seconds, if the raw token is a finite number.
    #[must_use]
    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
            .parse::<f64>()
            .ok()
            .filter(|seconds| seconds.is_finite())
    }

    /// Kind of the command.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Raw argument tokens that followed the keyword.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ScenarioCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp, self.kind)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Records emitted while loading a scenario or replaying its commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Reports a scenario line that is neither a header, grid row nor command.
    LineIgnored {
        /// One-based line number within the scenario text.
        line: usize,
        /// Content of the line without its terminator.
        text: String,
    },
    /// Confirms that a truck moved to a new cell.
    TruckMoved {
        /// Truck that moved.
        truck: TruckId,
        /// Cell occupied before the move.
        from: CellCoord,
        /// Cell occupied after the move.
        to: CellCoord,
    },
    /// Confirms that a truck dug into the cell it occupies.
    CellDug {
        /// Truck that performed the dig.
        truck: TruckId,
        /// Cell that was dug.
        cell: CellCoord,
        /// Crystal count left in the cell after the dig.
        remaining: u32,
    },
    /// Reports that a command was treated as a no-op.
    CommandRejected {
        /// Command that failed validation.
        command: ScenarioCommand,
        /// Specific reason the command was rejected.
        reason: RejectionReason,
    },
}

impl Event {
    /// Reports whether the event describes a problem rather than a state change.
    #[must_use]
    pub const fn is_diagnostic(&self) -> bool {
        matches!(self, Self::LineIgnored { .. } | Self::CommandRejected { .. })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineIgnored { line, text } => write!(f, "ignore line {line}: {text}"),
            Self::TruckMoved { truck, from, to } => {
                write!(f, "truck {} moved from {from} to {to}", truck.get())
            }
            Self::CellDug {
                truck,
                cell,
                remaining,
            } => write!(
                f,
                "truck {} dug {cell}, {remaining} crystal(s) left",
                truck.get()
            ),
            Self::CommandRejected { command, reason } => {
                let verb = match command.kind() {
                    CommandKind::Dig => "dig",
                    CommandKind::Move => "move",
                    CommandKind::Wait => "wait",
                };
                write!(
                    f,
                    "invalid {verb} command (line {}), {reason}: {command}",
                    command.line()
                )
            }
        }
    }
}

/// Reasons a command may be rejected during replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The timestamp token is not a finite number.
    InvalidTimestamp,
    /// The command carries the wrong number of arguments.
    WrongArgumentCount {
        /// Number of arguments the command kind requires.
        expected: usize,
        /// Number of arguments found on the line.
        received: usize,
    },
    /// An argument is not an integer.
    NonIntegerArgument {
        /// Zero-based index of the offending argument.
        index: usize,
    },
    /// The truck identifier is outside `[0, nb_trucks)`.
    InvalidTruckId,
    /// The `x` coordinate is outside `[0, width)`.
    InvalidX,
    /// The `y` coordinate is outside `[0, height)`.
    InvalidY,
    /// A dig targeted a cell other than the one the truck occupies.
    NotAtTruckPosition {
        /// Cell the truck occupied when the dig was attempted.
        truck_cell: CellCoord,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimestamp => f.write_str("invalid timestamp"),
            Self::WrongArgumentCount { expected, received } => write!(
                f,
                "must have {expected} arguments (received {received})"
            ),
            Self::NonIntegerArgument { index } => {
                write!(f, "argument {index} is not an integer")
            }
            Self::InvalidTruckId => f.write_str("invalid truck id"),
            Self::InvalidX => f.write_str("invalid x"),
            Self::InvalidY => f.write_str("invalid y"),
            Self::NotAtTruckPosition { truck_cell } => write!(
                f,
                "cannot dig on non current position (truck at {truck_cell})"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CellCoord, CommandKind, Event, RejectionReason, ScenarioCommand};
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn command_kind_order_matches_keyword_order() {
        let mut keywords: Vec<&str> = CommandKind::ALL.iter().map(|kind| kind.keyword()).collect();
        keywords.sort_unstable();
        let by_kind: Vec<&str> = {
            let mut kinds = CommandKind::ALL.to_vec();
            kinds.sort();
            kinds.into_iter().map(CommandKind::keyword).collect()
        };
        assert_eq!(keywords, by_kind);
        assert!(CommandKind::Dig < CommandKind::Move);
        assert!(CommandKind::Move < CommandKind::Wait);
    }

    #[test]
    fn command_kind_rejects_unknown_and_lowercase_keywords() {
        assert_eq!(CommandKind::from_keyword("MOVE"), Some(CommandKind::Move));
        assert_eq!(CommandKind::from_keyword("move"), None);
        assert_eq!(CommandKind::from_keyword("JUMP"), None);
    }

    #[test]
    fn timestamp_parses_lazily_from_raw_token() {
        let valid = ScenarioCommand::new(3, "1.25", CommandKind::Wait, Vec::new());
        let garbage = ScenarioCommand::new(4, "soon", CommandKind::Wait, Vec::new());
        let infinite = ScenarioCommand::new(5, "inf", CommandKind::Wait, Vec::new());

        assert_eq!(valid.timestamp(), Some(1.25));
        assert_eq!(garbage.timestamp(), None);
        assert_eq!(infinite.timestamp(), None);
        assert_eq!(garbage.timestamp_token(), "soon");
    }

    #[test]
    fn command_display_reproduces_scenario_line() {
        let command = ScenarioCommand::new(7, "0.5", CommandKind::Dig, tokens(&["0", "1", "2"]));
        assert_eq!(command.to_string(), "0.5 DIG 0 1 2");
    }

    #[test]
    fn rejection_display_names_command_and_reason() {
        let event = Event::CommandRejected {
            command: ScenarioCommand::new(9, "1.0", CommandKind::Move, tokens(&["4", "0", "0"])),
            reason: RejectionReason::InvalidTruckId,
        };
        assert_eq!(
            event.to_string(),
            "invalid move command (line 9), invalid truck id: 1.0 MOVE 4 0 0"
        );
        assert!(event.is_diagnostic());
    }

    #[test]
    fn rejected_command_event_round_trips_through_bincode() {
        assert_round_trip(&Event::CommandRejected {
            command: ScenarioCommand::new(2, "3.5", CommandKind::Dig, tokens(&["0", "2", "2"])),
            reason: RejectionReason::NotAtTruckPosition {
                truck_cell: CellCoord::new(0, 0),
            },
        });
    }
}
