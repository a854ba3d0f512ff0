//! Output rendering for accepted records.
//!
//! Three modes: `simple` prints numbered human-readable paragraphs,
//! `neat` prints a pipe-delimited table with computed trailing
//! columns, and `format` emits the raw log tokens pipe-joined for
//! downstream parsing.

use slq_cli::{DisplayMode, Settings};
use slq_core::{display_or_na, format_days_hms, LogRecord, FIELD_COUNT};
use slq_engine::{Diagnostic, DiagnosticKind};
use std::process::Command;

const NEAT_HEADER: &str = "Job|User|Group|Name|State|Partition|Time Limit (min)|Start Time|End Time|Node List|Number of Nodes|Number of Processes|Directory|Real Name|Run-time|Time Limit (formatted)|Percentage of Time Used";

/// Renders block outcomes, keeping the little state the table mode
/// needs (its header prints once per process, not once per block).
pub struct Renderer {
    titles_shown: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self { titles_shown: false }
    }

    /// Echo the block's own tokens above its results.
    pub fn echo_parameters(&self, tokens: &[String]) {
        let list: Vec<String> = tokens.iter().map(|t| format!("\"{t}\"")).collect();
        println!("Add parameters: {}\n", list.join(" "));
    }

    /// Render one block's accepted records.
    pub fn present(
        &mut self,
        records: &[LogRecord],
        settings: &Settings,
        block: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // Debounced per block, like evaluation failures
        let mut name_failed = false;
        let mut print_failed = false;

        for (index, record) in records.iter().enumerate() {
            let real_name = if settings.real_name && settings.display != DisplayMode::Format {
                match lookup_real_name(&record.user) {
                    Some(name) => Some(name),
                    None => {
                        if !name_failed {
                            name_failed = true;
                            diagnostics.push(Diagnostic::new(block, DiagnosticKind::RealName));
                        }
                        None
                    }
                }
            } else {
                None
            };

            let rendered = match settings.display {
                DisplayMode::Simple => render_simple(record, index + 1, real_name.as_deref()),
                DisplayMode::Neat => {
                    render_neat(record, real_name.as_deref()).map(|row| {
                        if self.titles_shown {
                            row
                        } else {
                            self.titles_shown = true;
                            format!("{NEAT_HEADER}\n{row}")
                        }
                    })
                }
                DisplayMode::Format => Some(render_raw(record)),
            };

            match rendered {
                Some(text) => println!("{text}"),
                None => {
                    if !print_failed {
                        print_failed = true;
                        diagnostics.push(Diagnostic::new(block, DiagnosticKind::Print));
                    }
                }
            }
        }
    }
}

/// One numbered human-readable paragraph.
///
/// Returns None when the record's timing cannot be derived; the
/// caller reports that once per block.
fn render_simple(record: &LogRecord, number: usize, real_name: Option<&str>) -> Option<String> {
    let timing = Timing::derive(record)?;
    let indent = " ".repeat(10);

    let ran_on = if record.node_list.is_empty() {
        " did not run on any nodes ".to_string()
    } else {
        format!(" ran on {} ", record.node_list)
    };
    let node_word = if record.node_count == "1" { "node" } else { "nodes" };
    let proc_word = if record.process_count == "1" { "process" } else { "processes" };
    let name_part = real_name.map(|n| format!(" ({n})")).unwrap_or_default();

    Some(format!(
        "{number:<9}Job {job}{ran_on}({nodes} {node_word}, {procs} {proc_word}) and has state \"{state}\"\n\
         {indent}Submitted by {user}{name_part} of group \"{group}\" to partition \"{partition}\"\n\
         {indent}Started at {start} and finished at {end}\n\
         {indent}Run-time: {elapsed} ({limit} requested; {percent:.2}% used)\n",
        number = format!("{number}."),
        job = record.job_id,
        nodes = record.node_count,
        procs = record.process_count,
        state = record.state.to_lowercase(),
        user = record.user,
        group = record.group,
        partition = record.partition,
        start = record.start_time.replace('T', " "),
        end = record.end_time.replace('T', " "),
        elapsed = timing.elapsed,
        limit = timing.limit,
        percent = timing.percent,
    ))
}

/// One pipe-delimited table row with the computed trailing columns.
fn render_neat(record: &LogRecord, real_name: Option<&str>) -> Option<String> {
    let timing = Timing::derive(record)?;

    let start = record.start_time.replace('T', " ");
    let end = record.end_time.replace('T', " ");
    let columns = [
        &record.job_id,
        &record.user,
        &record.group,
        &record.job_name,
        &record.state,
        &record.partition,
        &record.time_limit,
        &start,
        &end,
        &record.node_list,
        &record.node_count,
        &record.process_count,
        &record.working_directory,
    ];

    let mut row: Vec<String> = columns
        .iter()
        .map(|value| display_or_na(value).to_string())
        .collect();
    row.push(display_or_na(real_name.unwrap_or("")).to_string());
    row.push(timing.elapsed);
    row.push(timing.limit);
    row.push(format!("{:.2}", timing.percent));

    Some(row.join("|"))
}

/// The raw log tokens, pipe-joined for parsing.
fn render_raw(record: &LogRecord) -> String {
    record
        .raw
        .split(' ')
        .take(FIELD_COUNT)
        .collect::<Vec<_>>()
        .join("|")
}

/// Derived timing columns shared by the simple and neat modes.
struct Timing {
    elapsed: String,
    limit: String,
    percent: f64,
}

impl Timing {
    fn derive(record: &LogRecord) -> Option<Self> {
        let elapsed_secs = record.runtime_seconds()?;
        let limit_secs = record.time_limit_seconds()?;
        let percent = record.time_percentage()?;
        Some(Self {
            elapsed: format_days_hms(elapsed_secs),
            limit: format_days_hms(limit_secs),
            percent,
        })
    }
}

/// Look up a user's real name with finger.
///
/// The first output line ends in "Name: <real name>". Any failure is
/// a soft diagnostic upstream.
fn lookup_real_name(user: &str) -> Option<String> {
    let output = Command::new("finger").arg(user).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next()?;
    let name = first.split("Name: ").nth(1)?.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// End-of-run report of aggregated non-critical problems.
pub fn report_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        println!("No known errors were encountered during execution.\n");
        return;
    }
    let was_were = if diagnostics.len() == 1 { "was" } else { "were" };
    let noun = if diagnostics.len() == 1 { "error" } else { "errors" };
    println!(
        "{} non-critical {noun} {was_were} encountered.",
        diagnostics.len()
    );
    for diagnostic in diagnostics {
        println!("{diagnostic}");
    }
    println!();
}
