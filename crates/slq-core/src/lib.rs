//! Record types and parsing for SLURM job-completion logs.
//!
//! A completion log holds one line per finished job, with a fixed
//! positional sequence of `key=value` tokens. This crate turns one
//! such line into a [`LogRecord`] and provides the time arithmetic
//! shared by query evaluation and output formatting.

pub mod record;
pub mod time;

pub use record::{display_or_na, LogRecord, RecordError, FIELD_COUNT};
pub use time::{format_days_hms, parse_log_timestamp};
