//! slq - search SLURM job-completion logs from the newest entry backward.

mod render;

use clap::{CommandFactory, Parser};
use miette::{IntoDiagnostic, Result};
use render::Renderer;
use slq_cli::{split_blocks, Args, DisplayMode, Settings};
use slq_engine::run_block;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.tokens.is_empty() {
        Args::command().print_help().into_diagnostic()?;
        return Ok(());
    }

    let mut settings = Settings::default();
    let mut diagnostics = Vec::new();
    let mut renderer = Renderer::new();

    for (index, tokens) in split_blocks(&args.tokens).into_iter().enumerate() {
        let block = index + 1;
        for token in &tokens {
            settings.apply(token, block, &mut diagnostics);
        }
        if settings.display == DisplayMode::Simple {
            renderer.echo_parameters(&tokens);
        }

        let config = settings.to_config(block, &mut diagnostics);
        let outcome = run_block(&config, block);
        diagnostics.extend(outcome.diagnostics);
        renderer.present(&outcome.records, &settings, block, &mut diagnostics);
    }

    // The end-of-run report belongs to human-readable output only;
    // parseable modes stay clean for piping.
    if settings.display == DisplayMode::Simple {
        render::report_diagnostics(&diagnostics);
    }

    Ok(())
}
