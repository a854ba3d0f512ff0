//! Parsing of single completion-log lines into records.

use crate::time::elapsed_between;
use thiserror::Error;

/// Number of space-delimited tokens a well-formed log line carries.
pub const FIELD_COUNT: usize = 13;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Expected {FIELD_COUNT} fields, got {got}: {line}")]
    Malformed { got: usize, line: String },
}

/// One parsed completion-log line.
///
/// Field order is fixed and positional. Values are the substring after
/// the first `=` in each token, truncated at the first `(` (the log
/// annotates some fields with parenthetical detail, e.g.
/// `UserId=u0123456(1001)`). A token without `=` yields an empty
/// value; placeholder substitution is strictly an output concern, see
/// [`display_or_na`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub job_id: String,
    pub user: String,
    pub group: String,
    pub job_name: String,
    pub state: String,
    pub partition: String,
    /// Requested time limit, in minutes.
    pub time_limit: String,
    pub start_time: String,
    pub end_time: String,
    /// Allocated nodes in compact syntax (e.g. `kp[001-003]`), or empty
    /// if the job never ran on a node.
    pub node_list: String,
    pub node_count: String,
    pub process_count: String,
    pub working_directory: String,
    /// The unmodified line, kept for duplicate suppression and raw
    /// output.
    pub raw: String,
}

impl LogRecord {
    /// Parse one log line.
    ///
    /// Lines with fewer than [`FIELD_COUNT`] tokens are malformed; the
    /// caller is expected to skip them rather than abort.
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let tokens: Vec<&str> = line.split(' ').collect();
        if tokens.len() < FIELD_COUNT {
            return Err(RecordError::Malformed {
                got: tokens.len(),
                line: line.to_string(),
            });
        }

        Ok(Self {
            job_id: field_value(tokens[0]),
            user: field_value(tokens[1]),
            group: field_value(tokens[2]),
            job_name: field_value(tokens[3]),
            state: field_value(tokens[4]),
            partition: field_value(tokens[5]),
            time_limit: field_value(tokens[6]),
            start_time: field_value(tokens[7]),
            end_time: field_value(tokens[8]),
            node_list: field_value(tokens[9]),
            node_count: field_value(tokens[10]),
            process_count: field_value(tokens[11]),
            working_directory: field_value(tokens[12]),
            raw: line.to_string(),
        })
    }

    /// Elapsed run time in whole seconds, if both timestamps parse.
    pub fn runtime_seconds(&self) -> Option<u64> {
        elapsed_between(&self.start_time, &self.end_time).map(|d| d.as_secs())
    }

    /// Elapsed run time in minutes.
    pub fn runtime_minutes(&self) -> Option<f64> {
        self.runtime_seconds().map(|s| s as f64 / 60.0)
    }

    /// Requested time limit in whole seconds.
    pub fn time_limit_seconds(&self) -> Option<u64> {
        self.time_limit.parse::<u64>().ok().map(|m| m * 60)
    }

    /// Run time as a percentage of the requested limit.
    pub fn time_percentage(&self) -> Option<f64> {
        let limit = self.time_limit_seconds()?;
        if limit == 0 {
            return None;
        }
        let elapsed = self.runtime_seconds()?;
        Some(elapsed as f64 / limit as f64 * 100.0)
    }
}

/// Extract the value of a `key=value` token.
///
/// Everything after the first `=`, cropped at the first `(`. Tokens
/// without `=` extract to an empty value.
fn field_value(token: &str) -> String {
    let value = token.split_once('=').map(|(_, v)| v).unwrap_or("");
    match value.find('(') {
        Some(idx) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Substitute the display placeholder for empty values.
///
/// Output formatting only; query evaluation always sees the raw
/// extracted value.
pub fn display_or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}
