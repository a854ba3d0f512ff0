//! Option settings accumulated across blocks.
//!
//! Each block applies its tokens on top of the settings left by the
//! previous block, then compiles the active field expressions into a
//! [`SearchConfig`]. Bad tokens raise diagnostics and leave the
//! affected option at its previous value.

use camino::Utf8PathBuf;
use slq_engine::{Diagnostic, DiagnosticKind, SearchConfig, Show};
use slq_query::{FieldQuery, QueryField};

/// Where the completion log lives when no location is given.
pub const DEFAULT_LOCATION: &str = "/uufs/$UUFSCELL/sys/var/slurm/log/slurm.job.log";

/// How results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Human-readable paragraphs.
    #[default]
    Simple,
    /// Pipe-delimited table with computed columns.
    Neat,
    /// The raw fields, pipe-joined.
    Format,
}

/// All options a block can set.
///
/// Values persist forward: blocks inherit and override, never reset.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub show: Show,
    pub display: DisplayMode,
    /// Raw location strings as given; resolved and defaulted when a
    /// block's config is built.
    pub locations: Vec<String>,
    pub real_name: bool,
    field_exprs: Vec<(QueryField, String)>,
}

/// Fields addressable from the command line, in evaluation order.
const QUERY_FIELDS: [QueryField; 11] = [
    QueryField::User,
    QueryField::Group,
    QueryField::Partition,
    QueryField::State,
    QueryField::Job,
    QueryField::TimeLimit,
    QueryField::Runtime,
    QueryField::TimePercentage,
    QueryField::NodeCount,
    QueryField::ProcessCount,
    QueryField::Nodes,
];

impl Settings {
    /// Apply one token, recording a diagnostic if it is unusable.
    pub fn apply(&mut self, token: &str, block: usize, diagnostics: &mut Vec<Diagnostic>) {
        // Stand-alone tokens first
        match token {
            "realname" => {
                self.real_name = true;
                return;
            }
            // Kept for compatibility with older invocations; help is
            // now clap's job, so there is nothing to suppress.
            "strict" => return,
            _ => {}
        }

        let Some((key, value)) = token.split_once('=') else {
            diagnostics.push(Diagnostic::new(
                block,
                DiagnosticKind::UnknownOption { key: token.to_string() },
            ));
            return;
        };

        match key {
            "show" => match value {
                "all" => self.show = Show::All,
                _ => match value.parse::<usize>() {
                    Ok(n) => self.show = Show::Count(n),
                    Err(_) => diagnostics.push(Diagnostic::new(
                        block,
                        DiagnosticKind::InvalidOption { key: key.to_string() },
                    )),
                },
            },
            "location" => {
                self.locations
                    .extend(value.split(',').map(str::to_string));
            }
            "short" => {
                self.locations.extend(
                    value
                        .split(',')
                        .map(|cell| format!("/uufs/{cell}/sys/var/slurm/log/slurm.job.log")),
                );
            }
            "display" => match value {
                "simple" => self.display = DisplayMode::Simple,
                "neat" => self.display = DisplayMode::Neat,
                "format" => self.display = DisplayMode::Format,
                _ => diagnostics.push(Diagnostic::new(
                    block,
                    DiagnosticKind::InvalidOption { key: key.to_string() },
                )),
            },
            _ => {
                let Some(field) = QUERY_FIELDS.iter().find(|f| f.key() == key) else {
                    diagnostics.push(Diagnostic::new(
                        block,
                        DiagnosticKind::UnknownOption { key: key.to_string() },
                    ));
                    return;
                };
                self.set_field(*field, value);
            }
        }
    }

    fn set_field(&mut self, field: QueryField, expr: &str) {
        if let Some(slot) = self.field_exprs.iter_mut().find(|(f, _)| *f == field) {
            slot.1 = expr.to_string();
        } else {
            self.field_exprs.push((field, expr.to_string()));
        }
    }

    /// The raw expression currently set for a field, if any.
    pub fn field_expr(&self, field: QueryField) -> Option<&str> {
        self.field_exprs
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, e)| e.as_str())
    }

    /// Build the search configuration for one block.
    ///
    /// Compiles every active expression (an uncompilable one raises a
    /// diagnostic and deactivates that field for this block) and
    /// resolves locations, falling back to [`DEFAULT_LOCATION`] when
    /// none were given.
    pub fn to_config(&self, block: usize, diagnostics: &mut Vec<Diagnostic>) -> SearchConfig {
        let mut queries = Vec::new();
        for (field, raw) in &self.field_exprs {
            match FieldQuery::compile(*field, raw) {
                Ok(query) => queries.push(query),
                Err(e) => diagnostics.push(Diagnostic::new(
                    block,
                    DiagnosticKind::BadExpression {
                        field: field.key().to_string(),
                        reason: e.to_string(),
                    },
                )),
            }
        }

        let locations: Vec<Utf8PathBuf> = if self.locations.is_empty() {
            vec![resolve_location(DEFAULT_LOCATION)]
        } else {
            self.locations.iter().map(|l| resolve_location(l)).collect()
        };

        SearchConfig {
            show: self.show,
            locations,
            queries,
        }
    }
}

/// Resolve `$UUFSCELL` in a location from the environment.
///
/// An unset variable substitutes as empty, matching the shell
/// behavior the location shorthand was written for.
pub fn resolve_location(raw: &str) -> Utf8PathBuf {
    let cell = std::env::var("UUFSCELL").unwrap_or_default();
    Utf8PathBuf::from(raw.replace("$UUFSCELL", cell.trim()))
}
