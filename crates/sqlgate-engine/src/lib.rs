//! SQLGate validation engine.
//!
//! Wires the lexer, parser, policy checks and bounding into one call:
//!
//! ```text
//! candidate text -> tokens -> statement -> checked statement -> bounded canonical SQL
//! ```
//!
//! [`validate`] is pure and synchronous: identical inputs always give identical
//! verdicts. [`Gate`] adds the long-lived parts around it, a hot-swappable catalog
//! and an audit recorder.

pub mod bound;
pub mod candidate;
pub mod error;
pub mod gate;
pub mod validate;
pub mod verdict;

pub use bound::{BoundedStatement, bound};
pub use candidate::GeneratedCandidate;
pub use error::{GateError, ValidationError};
pub use gate::Gate;
pub use validate::{validate, validate_with_timeout};
pub use verdict::ValidationVerdict;
