//! Block orchestrator for tail-scanning job-log queries.
//!
//! A block is one configuration-and-run unit: a requested result
//! count, one or more log locations, and the compiled per-field
//! predicates. [`run_block`] scans each location newest-to-oldest,
//! keeps records that satisfy every active predicate, and stops as
//! soon as enough matches exist. All per-record failures are soft;
//! the worst a bad line can do is be skipped.

pub mod diag;

pub use diag::{Diagnostic, DiagnosticKind};

use camino::Utf8PathBuf;
use slq_core::LogRecord;
use slq_query::FieldQuery;
use slq_scan::ReverseLines;

/// How many matches a block wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Show {
    Count(usize),
    /// Scan every location to exhaustion.
    All,
}

impl Show {
    /// The accumulation limit, if any.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Show::Count(n) => Some(*n),
            Show::All => None,
        }
    }
}

impl Default for Show {
    fn default() -> Self {
        Show::Count(5)
    }
}

/// Everything one block needs to run, passed in by value rather than
/// read from shared state.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub show: Show,
    /// Scan locations, processed in declaration order.
    pub locations: Vec<Utf8PathBuf>,
    /// Active predicates; a record must satisfy every one of them.
    pub queries: Vec<FieldQuery>,
}

/// What a block produced: accepted records in accumulation order plus
/// any soft diagnostics raised while scanning.
#[derive(Debug, Clone, Default)]
pub struct BlockOutcome {
    pub records: Vec<LogRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Mutable scan state for one block.
///
/// Created fresh at block start; the accumulation buffer never leaks
/// between blocks or runs.
struct RunState {
    block: usize,
    records: Vec<LogRecord>,
    diagnostics: Vec<Diagnostic>,
    /// Evaluation failures are reported once per block, not once per
    /// record, to keep a noisy log file from flooding the report.
    evaluation_reported: bool,
}

impl RunState {
    fn new(block: usize) -> Self {
        Self {
            block,
            records: Vec::new(),
            diagnostics: Vec::new(),
            evaluation_reported: false,
        }
    }

    fn report(&mut self, kind: DiagnosticKind) {
        self.diagnostics.push(Diagnostic::new(self.block, kind));
    }

    fn report_evaluation_failure(&mut self) {
        if !self.evaluation_reported {
            self.evaluation_reported = true;
            self.report(DiagnosticKind::Evaluation);
        }
    }

    fn full(&self, show: Show) -> bool {
        show.limit().is_some_and(|limit| self.records.len() >= limit)
    }
}

/// Run one block against its configured locations.
///
/// Locations are scanned to completion (or early termination) in
/// declaration order; results from later locations concatenate after
/// earlier ones without re-sorting. The same raw line is never
/// accumulated twice within a block, even across locations.
pub fn run_block(config: &SearchConfig, block: usize) -> BlockOutcome {
    let mut state = RunState::new(block);

    'locations: for path in &config.locations {
        let reader = match ReverseLines::open(path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(%path, error = %e, "skipping unopenable location");
                state.report(DiagnosticKind::OpenFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        for line in reader {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(%path, error = %e, "read failed mid-scan");
                    state.report(DiagnosticKind::ReadFailed {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    break;
                }
            };

            if let Some(record) = evaluate_line(&line, config, &mut state) {
                if state.records.iter().any(|r| r.raw == record.raw) {
                    continue;
                }
                state.records.push(record);
                if state.full(config.show) {
                    break 'locations;
                }
            }
        }
    }

    if let Some(requested) = config.show.limit() {
        if state.records.len() < requested {
            let found = state.records.len();
            state.report(DiagnosticKind::Shortfall { found, requested });
        }
    }

    BlockOutcome {
        records: state.records,
        diagnostics: state.diagnostics,
    }
}

/// Parse one line and test it against every active predicate.
///
/// Returns the record only if all predicates hold. Malformed lines are
/// skipped silently; evaluation failures count as non-matching and
/// raise the per-block diagnostic.
fn evaluate_line(line: &str, config: &SearchConfig, state: &mut RunState) -> Option<LogRecord> {
    let record = match LogRecord::parse(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed line");
            return None;
        }
    };

    for query in &config.queries {
        match query.matches(&record) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::debug!(field = query.field.key(), error = %e, "predicate not judgeable");
                state.report_evaluation_failure();
                return None;
            }
        }
    }

    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use slq_query::QueryField;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn log_line(job_id: u32, user: &str, state: &str, nodes: &str) -> String {
        format!(
            "JobId={job_id} UserId={user}(1001) GroupId=chem JobName=sim \
             JobState={state} Partition=kingspeak TimeLimit=60 \
             StartTime=2024-01-15T10:00:00 EndTime=2024-01-15T10:30:00 \
             NodeList={nodes} NodeCnt=2 ProcCnt=32 WorkDir=/scratch/sim"
        )
    }

    fn write_log(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn config_for(file: &NamedTempFile, show: Show, queries: Vec<FieldQuery>) -> SearchConfig {
        SearchConfig {
            show,
            locations: vec![Utf8Path::from_path(file.path()).unwrap().to_path_buf()],
            queries,
        }
    }

    fn query(field: QueryField, raw: &str) -> FieldQuery {
        FieldQuery::compile(field, raw).unwrap()
    }

    #[test]
    fn test_newest_records_first() {
        let file = write_log(&[
            log_line(1, "u1", "COMPLETED", "kp001"),
            log_line(2, "u1", "COMPLETED", "kp001"),
            log_line(3, "u1", "COMPLETED", "kp001"),
        ]);
        let outcome = run_block(&config_for(&file, Show::All, vec![]), 1);
        let ids: Vec<&str> = outcome.records.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_early_termination_at_requested_count() {
        let lines: Vec<String> = (1..=5)
            .map(|i| log_line(i, "u1", "COMPLETED", "kp001"))
            .collect();
        let file = write_log(&lines);
        let outcome = run_block(&config_for(&file, Show::Count(2), vec![]), 1);
        let ids: Vec<&str> = outcome.records.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, vec!["5", "4"]);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_conjunction_across_fields() {
        let file = write_log(&[
            log_line(1, "u1", "COMPLETED", "kp001"),
            log_line(2, "u1", "CANCELLED", "kp001"),
        ]);

        // user matches both, state only the cancelled one
        let config = config_for(
            &file,
            Show::All,
            vec![
                query(QueryField::User, "u1"),
                query(QueryField::State, "cancelled"),
            ],
        );
        let outcome = run_block(&config, 1);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].job_id, "2");

        // user alone accepts both
        let config = config_for(&file, Show::All, vec![query(QueryField::User, "u1")]);
        assert_eq!(run_block(&config, 1).records.len(), 2);
    }

    #[test]
    fn test_node_query_filters_records() {
        let file = write_log(&[
            log_line(1, "u1", "COMPLETED", "kp[001-003]"),
            log_line(2, "u1", "COMPLETED", "kp[010-012]"),
        ]);
        let config = config_for(&file, Show::All, vec![query(QueryField::Nodes, "2")]);
        let outcome = run_block(&config, 1);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].job_id, "1");
    }

    #[test]
    fn test_shortfall_diagnostic() {
        let file = write_log(&[
            log_line(1, "u1", "COMPLETED", "kp001"),
            log_line(2, "u2", "COMPLETED", "kp001"),
            log_line(3, "u1", "COMPLETED", "kp001"),
        ]);
        let config = config_for(
            &file,
            Show::Count(5),
            vec![query(QueryField::User, "u1")],
        );
        let outcome = run_block(&config, 3);
        assert_eq!(outcome.records.len(), 2);
        let shortfalls: Vec<_> = outcome
            .diagnostics
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::Shortfall { found: 2, requested: 5 }))
            .collect();
        assert_eq!(shortfalls.len(), 1);
        assert_eq!(shortfalls[0].block, 3);
    }

    #[test]
    fn test_duplicate_lines_accumulate_once() {
        let repeated = log_line(7, "u1", "COMPLETED", "kp001");
        let file = write_log(&[repeated.clone(), repeated.clone()]);
        let outcome = run_block(&config_for(&file, Show::All, vec![]), 1);
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn test_duplicate_suppression_spans_locations() {
        let repeated = log_line(7, "u1", "COMPLETED", "kp001");
        let first = write_log(&[repeated.clone()]);
        let second = write_log(&[repeated.clone()]);
        let config = SearchConfig {
            show: Show::All,
            locations: vec![
                Utf8Path::from_path(first.path()).unwrap().to_path_buf(),
                Utf8Path::from_path(second.path()).unwrap().to_path_buf(),
            ],
            queries: vec![],
        };
        assert_eq!(run_block(&config, 1).records.len(), 1);
    }

    #[test]
    fn test_multiple_locations_concatenate_in_order() {
        let first = write_log(&[
            log_line(1, "u1", "COMPLETED", "kp001"),
            log_line(2, "u1", "COMPLETED", "kp001"),
        ]);
        let second = write_log(&[log_line(3, "u1", "COMPLETED", "kp001")]);
        let config = SearchConfig {
            show: Show::All,
            locations: vec![
                Utf8Path::from_path(first.path()).unwrap().to_path_buf(),
                Utf8Path::from_path(second.path()).unwrap().to_path_buf(),
            ],
            queries: vec![],
        };
        let ids: Vec<String> = run_block(&config, 1)
            .records
            .into_iter()
            .map(|r| r.job_id)
            .collect();
        // Newest-first within each location, locations in declaration order
        assert_eq!(ids, vec!["2", "1", "3"]);
    }

    #[test]
    fn test_malformed_lines_are_skipped_silently() {
        let file = write_log(&[
            "not a log line at all".to_string(),
            log_line(1, "u1", "COMPLETED", "kp001"),
        ]);
        let outcome = run_block(&config_for(&file, Show::All, vec![]), 1);
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_evaluation_failure_reported_once() {
        // Two records with unusable timestamps against a runtime query
        let broken = log_line(1, "u1", "COMPLETED", "kp001")
            .replace("EndTime=2024-01-15T10:30:00", "EndTime=Unknown");
        let broken2 = broken.replace("JobId=1", "JobId=2");
        let file = write_log(&[broken, broken2]);
        let config = config_for(&file, Show::All, vec![query(QueryField::Runtime, ">=10")]);
        let outcome = run_block(&config, 1);
        assert!(outcome.records.is_empty());
        let evals = outcome
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Evaluation)
            .count();
        assert_eq!(evals, 1);
    }

    #[test]
    fn test_unopenable_location_is_soft() {
        let real = write_log(&[log_line(1, "u1", "COMPLETED", "kp001")]);
        let config = SearchConfig {
            show: Show::All,
            locations: vec![
                Utf8PathBuf::from("/no/such/slurm.job.log"),
                Utf8Path::from_path(real.path()).unwrap().to_path_buf(),
            ],
            queries: vec![],
        };
        let outcome = run_block(&config, 1);
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::OpenFailed { .. })));
    }
}
