//! SQLGate Audit Recording
//!
//! Every validation request produces exactly one [`AuditRecord`]: the outcome, the
//! rejection code or the applied bounds, the latency, and a SHA-256 hash of the
//! canonical SQL (or of the raw candidate for rejections).
//!
//! ## Record Format
//!
//! ```text
//! [timestamp] [outcome - correlation_id - hash] code | rows/timeout (latency)
//! ```
//!
//! ## Sinks
//!
//! - [`NullSink`] - discards records
//! - [`ConsoleSink`] - JSON line per record on stdout
//! - [`FileSink`] - JSON Lines appended to a file
//! - [`MemorySink`] - in-memory, for tests and inspection
//! - [`DualSink`] - file and console
//!
//! A failing sink is logged and ignored; it never changes the verdict.

pub mod error;
pub mod record;
pub mod recorder;
pub mod sink;

pub use error::AuditError;
pub use record::{AuditOutcome, AuditRecord, AuditRecordBuilder, sql_hash};
pub use recorder::AuditRecorder;
pub use sink::{AuditSink, ConsoleSink, DualSink, FileSink, MemorySink, NullSink, create_sink};
