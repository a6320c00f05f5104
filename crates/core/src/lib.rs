//! `radiodesk-core`: foundation building blocks for the equipment desk.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error taxonomy, override tokens, identifiers and the handle/apply traits
//! every desk aggregate follows.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;
pub mod overrides;

pub use aggregate::Aggregate;
pub use error::{DeskError, DeskResult, PolicyViolation, ViolationKind};
pub use event::Event;
pub use id::RadioId;
pub use overrides::{OverrideSet, OverrideToken, UnknownOverrideToken};
