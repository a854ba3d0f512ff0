//! Per-field predicate evaluation.
//!
//! A [`FieldQuery`] binds one compiled expression to one record
//! field. Scalar terms are exact string equality (with a stripped
//! redundant leading `=`) or numeric comparisons written `<N`, `>N`,
//! `<=N`, `>=N`; the `node` field instead goes through set membership
//! in [`crate::nodes`].

use crate::expr::{Expr, ExprError};
use crate::nodes;
use slq_core::LogRecord;
use thiserror::Error;

/// Record fields a query can target.
///
/// `Runtime` and `TimePercentage` are derived per record from the
/// start/end timestamps and the requested limit; the rest read a
/// stored field directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    User,
    Group,
    Partition,
    State,
    Job,
    TimeLimit,
    Runtime,
    TimePercentage,
    NodeCount,
    ProcessCount,
    Nodes,
}

impl QueryField {
    /// Option key the field is addressed by on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            QueryField::User => "user",
            QueryField::Group => "group",
            QueryField::Partition => "partition",
            QueryField::State => "state",
            QueryField::Job => "job",
            QueryField::TimeLimit => "timelimit",
            QueryField::Runtime => "runtime",
            QueryField::TimePercentage => "timepercentage",
            QueryField::NodeCount => "nnode",
            QueryField::ProcessCount => "nprocess",
            QueryField::Nodes => "node",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Value {value:?} is not numeric (required by {term:?})")]
    NonNumericValue { value: String, term: String },
    #[error("Comparison {term:?} has no numeric operand")]
    NonNumericOperand { term: String },
    #[error("Record timestamps are unusable for run-time derivation")]
    UnusableTiming,
    #[error("Record time limit is unusable for percentage derivation")]
    UnusableLimit,
}

/// One active predicate: a field and the expression compiled for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldQuery {
    pub field: QueryField,
    pub raw: String,
    expr: Expr,
}

impl FieldQuery {
    /// Compile a user expression for a field.
    ///
    /// Parsing happens once here; evaluation against records reuses
    /// the AST.
    pub fn compile(field: QueryField, raw: &str) -> Result<Self, ExprError> {
        let expr = Expr::parse(raw)?;
        Ok(Self {
            field,
            raw: raw.to_string(),
            expr,
        })
    }

    /// Decide whether a record satisfies this predicate.
    ///
    /// Errors mean the record could not be judged (non-numeric value
    /// in a numeric comparison, underivable run time); callers treat
    /// that as non-matching and report it as a soft diagnostic.
    pub fn matches(&self, record: &LogRecord) -> Result<bool, EvalError> {
        if self.field == QueryField::Nodes {
            return nodes::matches(&record.node_list, &self.expr);
        }
        let value = self.value_for(record)?;
        let case_insensitive = self.field == QueryField::State;
        self.expr
            .eval(&mut |term| scalar_term(&value, term, case_insensitive))
    }

    fn value_for(&self, record: &LogRecord) -> Result<String, EvalError> {
        let value = match self.field {
            QueryField::User => record.user.clone(),
            QueryField::Group => record.group.clone(),
            QueryField::Partition => record.partition.clone(),
            QueryField::State => record.state.clone(),
            QueryField::Job => record.job_id.clone(),
            QueryField::TimeLimit => record.time_limit.clone(),
            QueryField::NodeCount => record.node_count.clone(),
            QueryField::ProcessCount => record.process_count.clone(),
            QueryField::Runtime => {
                let minutes = record.runtime_minutes().ok_or(EvalError::UnusableTiming)?;
                minutes.to_string()
            }
            QueryField::TimePercentage => {
                let percent = record
                    .time_percentage()
                    .ok_or(EvalError::UnusableLimit)?;
                percent.to_string()
            }
            QueryField::Nodes => unreachable!("node queries evaluate via nodes::matches"),
        };
        Ok(value)
    }
}

/// Evaluate one scalar term against a field value.
fn scalar_term(value: &str, term: &str, case_insensitive: bool) -> Result<bool, EvalError> {
    // Two-character operators before one-character ones
    if let Some(operand) = term.strip_prefix(">=") {
        return compare(value, term, operand, |v, n| v >= n);
    }
    if let Some(operand) = term.strip_prefix("<=") {
        return compare(value, term, operand, |v, n| v <= n);
    }
    if let Some(operand) = term.strip_prefix('>') {
        return compare(value, term, operand, |v, n| v > n);
    }
    if let Some(operand) = term.strip_prefix('<') {
        return compare(value, term, operand, |v, n| v < n);
    }

    // A redundant leading "=" is allowed: job="=12345"
    let want = term.strip_prefix('=').unwrap_or(term);
    if case_insensitive {
        Ok(value.eq_ignore_ascii_case(want))
    } else {
        Ok(value == want)
    }
}

fn compare(
    value: &str,
    term: &str,
    operand: &str,
    op: impl Fn(f64, f64) -> bool,
) -> Result<bool, EvalError> {
    let number: f64 = operand
        .parse()
        .map_err(|_| EvalError::NonNumericOperand {
            term: term.to_string(),
        })?;
    let value: f64 = value.parse().map_err(|_| EvalError::NonNumericValue {
        value: value.to_string(),
        term: term.to_string(),
    })?;
    Ok(op(value, number))
}
