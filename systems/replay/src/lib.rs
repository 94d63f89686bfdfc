#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Time-driven replay of scenario commands.
//!
//! Every frame the visible state is rebuilt from scratch: the world is reset
//! from the scenario's initial grid, the commands whose timestamp lies strictly
//! before the clock are sorted, and each is applied in turn. The resulting
//! state is therefore a pure function of the scenario and the clock value.
//!
//! The clock is kept as a [`Duration`] so that accumulating frame deltas is
//! exact; reaching the same clock through different delta sequences always
//! selects the same commands.

use std::{cmp::Ordering, time::Duration};

use crystals_vs_trucks_core::{Event, RejectionReason, ScenarioCommand};
use crystals_vs_trucks_system_scenario::Scenario;
use crystals_vs_trucks_world::{self as world, SimulationState};

/// Owns the clock and the state produced by the most recent replay pass.
#[derive(Clone, Debug)]
pub struct SimulationContext {
    scenario: Scenario,
    clock: Duration,
    state: SimulationState,
    events: Vec<Event>,
}

impl SimulationContext {
    /// Creates a context positioned at clock zero.
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        let mut events = Vec::new();
        let state = replay(&scenario, Duration::ZERO, &mut events);
        Self {
            scenario,
            clock: Duration::ZERO,
            state,
            events,
        }
    }

    /// Advances the clock and rebuilds the state for the new clock value.
    pub fn advance(&mut self, delta: Duration) -> &SimulationState {
        self.clock = self.clock.saturating_add(delta);
        log::trace!("new frame at {:.3}s", self.clock.as_secs_f64());

        self.events.clear();
        self.state = replay(&self.scenario, self.clock, &mut self.events);
        for event in self.events.iter().filter(|event| event.is_diagnostic()) {
            log::debug!("{event}");
        }
        &self.state
    }

    /// Current simulation clock.
    #[must_use]
    pub const fn clock(&self) -> Duration {
        self.clock
    }

    /// State produced by the most recent replay pass.
    #[must_use]
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Scenario being replayed.
    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Events recorded during the most recent replay pass, in application order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Rejections recorded during the most recent replay pass.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|event| event.is_diagnostic())
    }
}

/// Rebuilds the state a scenario reaches at the provided clock value.
pub fn replay(scenario: &Scenario, clock: Duration, out_events: &mut Vec<Event>) -> SimulationState {
    let mut state = world::reset(scenario.initial_grid(), scenario.nb_trucks());
    for command in due_commands(scenario.commands(), clock, out_events) {
        world::apply(&mut state, command, out_events);
    }
    state
}

/// Selects the commands due strictly before `clock` in replay order.
///
/// Due-ness uses the numeric timestamp, but replay order compares the raw
/// tokens: the timestamp string, then the command keyword, then the argument
/// strings. `"10.0"` therefore runs before `"2.0"`, and a `DIG` always runs
/// before a `MOVE` sharing its timestamp token. Commands whose timestamp
/// cannot be parsed are reported as rejected and skipped.
pub fn due_commands<'a>(
    commands: &'a [ScenarioCommand],
    clock: Duration,
    out_events: &mut Vec<Event>,
) -> Vec<&'a ScenarioCommand> {
    let now = clock.as_secs_f64();
    let mut due: Vec<&ScenarioCommand> = Vec::new();
    for command in commands {
        match command.timestamp() {
            Some(timestamp) if timestamp < now => due.push(command),
            Some(_) => {}
            None => out_events.push(Event::CommandRejected {
                command: command.clone(),
                reason: RejectionReason::InvalidTimestamp,
            }),
        }
    }

    due.sort_by(|left, right| replay_order(left, right));
    due
}

fn replay_order(left: &ScenarioCommand, right: &ScenarioCommand) -> Ordering {
    left.timestamp_token()
        .cmp(right.timestamp_token())
        .then_with(|| left.kind().cmp(&right.kind()))
        .then_with(|| left.args().cmp(right.args()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crystals_vs_trucks_core::CommandKind;

    fn command(line: usize, timestamp: &str, kind: CommandKind, args: &[&str]) -> ScenarioCommand {
        ScenarioCommand::new(
            line,
            timestamp,
            kind,
            args.iter().map(|arg| (*arg).to_owned()).collect(),
        )
    }

    fn lines(commands: &[&ScenarioCommand]) -> Vec<usize> {
        commands.iter().map(|command| command.line()).collect()
    }

    #[test]
    fn due_commands_use_strict_comparison() {
        let commands = vec![
            command(1, "1.0", CommandKind::Wait, &[]),
            command(2, "0.999", CommandKind::Wait, &[]),
        ];
        let mut events = Vec::new();

        let due = due_commands(&commands, Duration::from_secs(1), &mut events);

        assert_eq!(lines(&due), vec![2]);
        assert!(events.is_empty());
    }

    #[test]
    fn due_commands_sort_by_raw_tokens() {
        let commands = vec![
            command(1, "2.0", CommandKind::Dig, &["0", "0", "0"]),
            command(2, "1.0", CommandKind::Wait, &[]),
            command(3, "1.0", CommandKind::Move, &["1", "0", "0"]),
            command(4, "1.0", CommandKind::Move, &["0", "5", "0"]),
            command(5, "1.0", CommandKind::Dig, &["0", "2", "2"]),
            command(6, "10", CommandKind::Move, &["0", "1", "1"]),
        ];
        let mut events = Vec::new();

        let due = due_commands(&commands, Duration::from_secs(20), &mut events);

        assert_eq!(lines(&due), vec![5, 4, 3, 2, 6, 1]);
    }

    #[test]
    fn argument_tokens_compare_as_strings() {
        let commands = vec![
            command(1, "1.0", CommandKind::Move, &["0", "9", "0"]),
            command(2, "1.0", CommandKind::Move, &["0", "10", "0"]),
        ];
        let mut events = Vec::new();

        let due = due_commands(&commands, Duration::from_secs(2), &mut events);

        assert_eq!(lines(&due), vec![2, 1]);
    }

    #[test]
    fn timestamps_compare_as_strings_once_due() {
        let commands = vec![
            command(1, "2.0", CommandKind::Wait, &[]),
            command(2, "10.0", CommandKind::Wait, &[]),
            command(3, "9.5", CommandKind::Wait, &[]),
        ];
        let mut events = Vec::new();

        assert_eq!(
            lines(&due_commands(&commands, Duration::from_secs(5), &mut events)),
            vec![1]
        );
        assert_eq!(
            lines(&due_commands(&commands, Duration::from_secs(11), &mut events)),
            vec![2, 1, 3]
        );
    }

    #[test]
    fn unparsable_timestamps_are_rejected_every_pass() {
        let commands = vec![command(1, "later", CommandKind::Wait, &[])];
        let mut events = Vec::new();

        let due = due_commands(&commands, Duration::ZERO, &mut events);

        assert!(due.is_empty());
        assert!(matches!(
            events.as_slice(),
            [Event::CommandRejected {
                reason: RejectionReason::InvalidTimestamp,
                ..
            }]
        ));
    }

    #[test]
    fn negative_timestamps_are_due_at_clock_zero() {
        let commands = vec![command(1, "-0.5", CommandKind::Wait, &[])];
        let mut events = Vec::new();

        let due = due_commands(&commands, Duration::ZERO, &mut events);

        assert_eq!(lines(&due), vec![1]);
    }
}
