//! Aggregate execution semantics (pure, deterministic).

/// Decide/apply split shared by desk aggregates.
///
/// - **Decision logic**: `handle(&self, cmd)` validates every rule and returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Because all validation happens in `handle`, a rejected command never leaves
/// partially-mutated state behind. Aggregates must not perform IO.
pub trait Aggregate {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Number of events applied so far (+1 per applied event).
    fn version(&self) -> u64;

    /// Evolve in-memory state from a single event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
