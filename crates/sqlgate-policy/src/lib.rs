//! SQLGate Policy Enforcement
//!
//! Positive allow-listing of parsed statements against a versioned schema catalog.
//! A statement passes only if every table, column, join and function it uses is
//! declared in the catalog; everything else is rejected with a specific code.
//!
//! - [`SchemaCatalog`] - immutable catalog built from configuration
//! - [`CatalogStore`] - current snapshot, swapped atomically on reload
//! - [`check`] - the ordered policy checks, producing a [`CheckedStatement`]

pub mod catalog;
pub mod checker;
pub mod error;
pub mod store;
pub mod system;

pub use catalog::{Column, ForeignKeyEdge, SchemaCatalog, Table};
pub use checker::{CheckedStatement, PolicyChecker, check};
pub use error::{CatalogError, PolicyViolation, ViolationKind};
pub use store::CatalogStore;
pub use system::is_system_name;
