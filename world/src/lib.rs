#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulation state for the Crystals vs Trucks viewer.
//!
//! The world owns the crystal grid and the truck positions of a single replay
//! pass. A pass always starts from [`reset`], which clones the immutable
//! [`InitialGrid`], and then feeds scenario commands through [`apply`]. Invalid
//! commands never abort a pass; they are reported as
//! [`Event::CommandRejected`] and leave the state untouched.

use crystals_vs_trucks_core::{
    CellCoord, CommandKind, Event, GridDimensions, RejectionReason, ScenarioCommand, TruckId,
};

const POSITIONAL_ARGUMENT_COUNT: usize = 3;

/// Grid of crystal counts stored row by row.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Grid {
    rows: Vec<Vec<u32>>,
}

impl Grid {
    /// Rows of the grid, top to bottom.
    #[must_use]
    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    /// Crystal count stored at the provided cell, if the cell exists.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<u32> {
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        self.rows.get(row)?.get(column).copied()
    }

    /// Iterates over every cell holding at least one crystal in row-major order.
    pub fn crystals(&self) -> impl Iterator<Item = (CellCoord, u32)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, count)| **count > 0)
                .map(move |(column, count)| {
                    (CellCoord::new(column as u32, row as u32), *count)
                })
        })
    }

    fn dig(&mut self, cell: CellCoord) -> Option<u32> {
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let slot = self.rows.get_mut(row)?.get_mut(column)?;
        *slot = slot.saturating_sub(1);
        Some(*slot)
    }
}

/// Immutable grid snapshot captured when the scenario is loaded.
///
/// Rows are right-padded with empty cells up to the configured width and
/// missing rows are filled with empty cells up to the configured height, so
/// every in-bounds coordinate addresses an existing cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitialGrid {
    dimensions: GridDimensions,
    grid: Grid,
}

impl InitialGrid {
    /// Captures a snapshot from parsed rows, padding them to the dimensions.
    #[must_use]
    pub fn from_rows(dimensions: GridDimensions, mut rows: Vec<Vec<u32>>) -> Self {
        let width = dimensions.width() as usize;
        let height = dimensions.height() as usize;
        for row in &mut rows {
            if row.len() < width {
                row.resize(width, 0);
            }
        }
        if rows.len() < height {
            rows.resize(height, vec![0; width]);
        }

        Self {
            dimensions,
            grid: Grid { rows },
        }
    }

    /// Dimensions declared by the scenario.
    #[must_use]
    pub const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// Read-only access to the captured grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

/// Simulated truck and the cell it occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Truck {
    id: TruckId,
    cell: CellCoord,
}

impl Truck {
    /// Identifier of the truck.
    #[must_use]
    pub const fn id(&self) -> TruckId {
        self.id
    }

    /// Cell currently occupied by the truck.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }
}

/// Grid and truck positions produced by one replay pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationState {
    dimensions: GridDimensions,
    grid: Grid,
    trucks: Vec<Truck>,
}

impl SimulationState {
    fn truck(&self, id: i64) -> Option<&Truck> {
        usize::try_from(id).ok().and_then(|index| self.trucks.get(index))
    }

    fn truck_mut(&mut self, id: TruckId) -> Option<&mut Truck> {
        self.trucks.get_mut(id.get() as usize)
    }
}

/// Rebuilds the state a replay pass starts from.
///
/// Each truck starts at its identifier-derived cell `(0, id)` rather than a
/// spawn point read from the scenario.
#[must_use]
pub fn reset(initial: &InitialGrid, nb_trucks: u32) -> SimulationState {
    let trucks = (0..nb_trucks)
        .map(|id| Truck {
            id: TruckId::new(id),
            cell: default_truck_cell(TruckId::new(id)),
        })
        .collect();

    SimulationState {
        dimensions: initial.dimensions,
        grid: initial.grid.clone(),
        trucks,
    }
}

/// Cell a truck occupies at the start of every replay pass.
#[must_use]
pub const fn default_truck_cell(id: TruckId) -> CellCoord {
    CellCoord::new(0, id.get())
}

/// Applies the provided command to the state, enforcing the game rules.
///
/// Rejected commands leave the state unchanged and push a
/// [`Event::CommandRejected`] describing the first failed check.
pub fn apply(state: &mut SimulationState, command: &ScenarioCommand, out_events: &mut Vec<Event>) {
    let outcome = match command.kind() {
        CommandKind::Move => move_truck(state, command, out_events),
        CommandKind::Dig => dig(state, command, out_events),
        CommandKind::Wait => Ok(()),
    };

    if let Err(reason) = outcome {
        out_events.push(Event::CommandRejected {
            command: command.clone(),
            reason,
        });
    }
}

fn move_truck(
    state: &mut SimulationState,
    command: &ScenarioCommand,
    out_events: &mut Vec<Event>,
) -> Result<(), RejectionReason> {
    let (truck, destination) = validate_positional(state, command)?;
    let Some(truck) = state.truck_mut(truck) else {
        return Err(RejectionReason::InvalidTruckId);
    };

    let from = truck.cell;
    truck.cell = destination;
    out_events.push(Event::TruckMoved {
        truck: truck.id,
        from,
        to: destination,
    });
    Ok(())
}

fn dig(
    state: &mut SimulationState,
    command: &ScenarioCommand,
    out_events: &mut Vec<Event>,
) -> Result<(), RejectionReason> {
    let (truck, target) = validate_positional(state, command)?;
    let truck_cell = state
        .truck_mut(truck)
        .map(|truck| truck.cell)
        .ok_or(RejectionReason::InvalidTruckId)?;
    if truck_cell != target {
        return Err(RejectionReason::NotAtTruckPosition { truck_cell });
    }

    let remaining = state
        .grid
        .dig(target)
        .ok_or(RejectionReason::InvalidX)?;
    out_events.push(Event::CellDug {
        truck,
        cell: target,
        remaining,
    });
    Ok(())
}

/// Checks the `truck_id x y` arguments shared by MOVE and DIG.
fn validate_positional(
    state: &SimulationState,
    command: &ScenarioCommand,
) -> Result<(TruckId, CellCoord), RejectionReason> {
    let args = command.args();
    if args.len() != POSITIONAL_ARGUMENT_COUNT {
        return Err(RejectionReason::WrongArgumentCount {
            expected: POSITIONAL_ARGUMENT_COUNT,
            received: args.len(),
        });
    }

    let mut values = [0_i64; POSITIONAL_ARGUMENT_COUNT];
    for (index, (slot, token)) in values.iter_mut().zip(args).enumerate() {
        *slot = token
            .parse::<i64>()
            .map_err(|_| RejectionReason::NonIntegerArgument { index })?;
    }
    let [truck, x, y] = values;

    let truck = state
        .truck(truck)
        .map(Truck::id)
        .ok_or(RejectionReason::InvalidTruckId)?;
    let x = coordinate_within(x, state.dimensions.width()).ok_or(RejectionReason::InvalidX)?;
    let y = coordinate_within(y, state.dimensions.height()).ok_or(RejectionReason::InvalidY)?;

    Ok((truck, CellCoord::new(x, y)))
}

fn coordinate_within(value: i64, bound: u32) -> Option<u32> {
    u32::try_from(value).ok().filter(|value| *value < bound)
}

/// Query functions that provide read-only access to the simulation state.
pub mod query {
    use super::{Grid, SimulationState, Truck};
    use crystals_vs_trucks_core::{CellCoord, GridDimensions, TruckId};

    /// Dimensions declared by the scenario.
    #[must_use]
    pub fn dimensions(state: &SimulationState) -> GridDimensions {
        state.dimensions
    }

    /// Provides read-only access to the crystal grid.
    #[must_use]
    pub fn grid(state: &SimulationState) -> &Grid {
        &state.grid
    }

    /// Crystal count at the provided cell, if it exists.
    #[must_use]
    pub fn crystals_at(state: &SimulationState, cell: CellCoord) -> Option<u32> {
        state.grid.cell(cell)
    }

    /// Trucks ordered by identifier.
    #[must_use]
    pub fn trucks(state: &SimulationState) -> &[Truck] {
        &state.trucks
    }

    /// Cell occupied by the provided truck, if it exists.
    #[must_use]
    pub fn truck_cell(state: &SimulationState, truck: TruckId) -> Option<CellCoord> {
        state
            .trucks
            .get(truck.get() as usize)
            .map(|truck| truck.cell())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(kind: CommandKind, args: &[&str]) -> ScenarioCommand {
        ScenarioCommand::new(
            1,
            "0.0",
            kind,
            args.iter().map(|arg| (*arg).to_owned()).collect(),
        )
    }

    fn initial() -> InitialGrid {
        InitialGrid::from_rows(
            GridDimensions::new(4, 3),
            vec![vec![2, 0, 1], vec![1, 1, 1, 1], vec![]],
        )
    }

    fn rejection(events: &[Event]) -> Option<RejectionReason> {
        events.iter().find_map(|event| match event {
            Event::CommandRejected { reason, .. } => Some(*reason),
            _ => None,
        })
    }

    #[test]
    fn initial_grid_pads_rows_and_missing_rows() {
        let initial = InitialGrid::from_rows(GridDimensions::new(3, 3), vec![vec![1]]);

        assert_eq!(
            initial.grid().rows(),
            &[vec![1, 0, 0], vec![0, 0, 0], vec![0, 0, 0]]
        );
    }

    #[test]
    fn initial_grid_keeps_rows_longer_than_width() {
        let initial = InitialGrid::from_rows(GridDimensions::new(2, 1), vec![vec![1, 0, 3]]);

        assert_eq!(initial.grid().rows(), &[vec![1, 0, 3]]);
    }

    #[test]
    fn reset_places_trucks_on_first_column() {
        let state = reset(&initial(), 3);

        let cells: Vec<CellCoord> = query::trucks(&state).iter().map(Truck::cell).collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(0, 1),
                CellCoord::new(0, 2)
            ]
        );
    }

    #[test]
    fn reset_produces_independent_copies() {
        let initial = initial();
        let mut first = reset(&initial, 1);
        let second = reset(&initial, 1);
        assert_eq!(first, second);

        let mut events = Vec::new();
        apply(&mut first, &command(CommandKind::Dig, &["0", "0", "0"]), &mut events);

        assert_eq!(query::crystals_at(&first, CellCoord::new(0, 0)), Some(1));
        assert_eq!(query::crystals_at(&second, CellCoord::new(0, 0)), Some(2));
        assert_eq!(initial.grid().cell(CellCoord::new(0, 0)), Some(2));
    }

    #[test]
    fn move_teleports_truck_without_adjacency_check() {
        let mut state = reset(&initial(), 2);
        let mut events = Vec::new();

        apply(&mut state, &command(CommandKind::Move, &["1", "3", "2"]), &mut events);

        assert_eq!(
            query::truck_cell(&state, TruckId::new(1)),
            Some(CellCoord::new(3, 2))
        );
        assert_eq!(
            events,
            vec![Event::TruckMoved {
                truck: TruckId::new(1),
                from: CellCoord::new(0, 1),
                to: CellCoord::new(3, 2),
            }]
        );
    }

    #[test]
    fn dig_never_drops_below_zero() {
        let mut state = reset(&initial(), 1);
        let mut events = Vec::new();
        let dig = command(CommandKind::Dig, &["0", "0", "0"]);

        for _ in 0..5 {
            apply(&mut state, &dig, &mut events);
        }

        assert_eq!(query::crystals_at(&state, CellCoord::new(0, 0)), Some(0));
        assert!(rejection(&events).is_none());
        assert_eq!(
            events.last(),
            Some(&Event::CellDug {
                truck: TruckId::new(0),
                cell: CellCoord::new(0, 0),
                remaining: 0,
            })
        );
    }

    #[test]
    fn dig_rejected_away_from_truck() {
        let mut state = reset(&initial(), 1);
        let before = state.clone();
        let mut events = Vec::new();

        apply(&mut state, &command(CommandKind::Dig, &["0", "2", "0"]), &mut events);

        assert_eq!(state, before);
        assert_eq!(
            rejection(&events),
            Some(RejectionReason::NotAtTruckPosition {
                truck_cell: CellCoord::new(0, 0)
            })
        );
    }

    #[test]
    fn out_of_bounds_arguments_are_rejected_in_order() {
        let cases = [
            (&["2", "9", "9"][..], RejectionReason::InvalidTruckId),
            (&["-1", "0", "0"][..], RejectionReason::InvalidTruckId),
            (&["0", "4", "9"][..], RejectionReason::InvalidX),
            (&["0", "-1", "0"][..], RejectionReason::InvalidX),
            (&["0", "3", "3"][..], RejectionReason::InvalidY),
        ];

        for kind in [CommandKind::Move, CommandKind::Dig] {
            for (args, expected) in cases {
                let mut state = reset(&initial(), 2);
                let before = state.clone();
                let mut events = Vec::new();

                apply(&mut state, &command(kind, args), &mut events);

                assert_eq!(state, before, "{kind} {args:?} must not mutate state");
                assert_eq!(rejection(&events), Some(expected), "{kind} {args:?}");
            }
        }
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        let mut state = reset(&initial(), 1);
        let before = state.clone();
        let mut events = Vec::new();

        apply(&mut state, &command(CommandKind::Move, &["0", "1"]), &mut events);
        apply(&mut state, &command(CommandKind::Dig, &["0", "x", "0"]), &mut events);

        assert_eq!(state, before);
        let reasons: Vec<RejectionReason> = events
            .iter()
            .filter_map(|event| match event {
                Event::CommandRejected { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                RejectionReason::WrongArgumentCount {
                    expected: 3,
                    received: 2
                },
                RejectionReason::NonIntegerArgument { index: 1 },
            ]
        );
    }

    #[test]
    fn wait_accepts_any_arguments_without_effect() {
        let mut state = reset(&initial(), 1);
        let before = state.clone();
        let mut events = Vec::new();

        apply(&mut state, &command(CommandKind::Wait, &["anything", "at", "all", "!"]), &mut events);

        assert_eq!(state, before);
        assert!(events.is_empty());
    }

    #[test]
    fn crystals_iterates_non_empty_cells() {
        let state = reset(&initial(), 0);
        let crystals: Vec<(CellCoord, u32)> = query::grid(&state).crystals().collect();

        assert_eq!(crystals.first(), Some(&(CellCoord::new(0, 0), 2)));
        assert_eq!(crystals.len(), 6);
    }
}
