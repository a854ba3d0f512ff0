//! CLI argument handling for slq.
//!
//! Arguments are `key=value` tokens rather than flags, with `+`
//! separating sequential blocks:
//!
//! ```text
//! slq show=5 user=u0123456 state="cancelled or completed"
//! slq show=5 short=kingspeak.peaks + short=lonepeak.peaks
//! ```
//!
//! Settings persist forward across blocks: a later block inherits
//! everything set in earlier blocks unless it overrides it.

pub mod settings;

pub use settings::{resolve_location, DisplayMode, Settings, DEFAULT_LOCATION};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "slq")]
#[command(about = "Search SLURM job-completion logs from the newest entry backward")]
#[command(after_help = "\
Tokens are key=value pairs; quote values containing spaces.
Fields accepting expressions: user, group, partition, state, job,
timelimit, runtime, timepercentage, nnode, nprocess, node.
Expressions combine values with `and`, `or`, `not` and parentheses;
numeric fields also accept <N, >N, <=N, >=N.

Other tokens:
  show=N|all          number of results per block (default 5)
  location=PATH[,..]  log file(s) to scan
  short=CELL[,..]     shorthand for /uufs/CELL/sys/var/slurm/log/slurm.job.log
  display=MODE        simple (default), neat, or format
  realname            look up users' real names with finger
  +                   start the next block, inheriting prior settings

Examples:
  slq show=4 short=ember.arches node=\"5 or 20\"
  slq job=\">=123456\" display=neat timepercentage=\">=50\"
  slq show=5 short=kingspeak.peaks + short=lonepeak.peaks")]
pub struct Args {
    /// Query tokens; `+` starts a new block
    #[arg(trailing_var_arg = true)]
    pub tokens: Vec<String>,
}

/// Split the raw token list into blocks at `+` separators.
///
/// A trailing `+` yields an empty final block, which re-runs the
/// inherited settings unchanged.
pub fn split_blocks(tokens: &[String]) -> Vec<Vec<String>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if token == "+" {
            blocks.push(std::mem::take(&mut current));
        } else {
            current.push(token.clone());
        }
    }
    blocks.push(current);
    blocks
}
