// lints
#![warn(clippy::pedantic)]

use std::io::{self, BufWriter, Read, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;
use universe::{Pos, StepMode, Universe};

/// Advance a Life pattern by a number of generations.
///
/// Reads whitespace-separated `x y` coordinate pairs (one live cell each)
/// from stdin and writes the live cells after the run to stdout in the same
/// format, sorted by row then column.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Number of generations to advance
    generations: u64,

    /// Take power-of-two macro-steps instead of single generations.
    ///
    /// Runs the smallest number of macro-steps covering at least the
    /// requested generation count; the final generation is reported.
    #[arg(long)]
    accelerated: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mode = if args.accelerated {
        StepMode::Accelerated
    } else {
        StepMode::Single
    };
    let mut universe = Universe::with_mode(mode);

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("reading pattern from stdin")?;
    read_cells(&mut universe, &input)?;
    debug!(
        population = universe.population(),
        nodes = universe.node_count(),
        "pattern loaded"
    );

    universe.advance(args.generations)?;

    write_cells(&universe)?;
    let stats = universe.cache_stats();
    eprintln!(
        "{} cells alive at generation {} ({} nodes, {} cached steps, {} cache hits)",
        universe.population(),
        universe.generation(),
        universe.node_count(),
        stats.misses,
        stats.hits,
    );
    Ok(())
}

fn read_cells(universe: &mut Universe, input: &str) -> Result<()> {
    let mut tokens = input.split_whitespace();
    while let Some(token) = tokens.next() {
        let x: i64 = token
            .parse()
            .with_context(|| format!("invalid x coordinate {token:?}"))?;
        let Some(token) = tokens.next() else {
            bail!("missing y coordinate after x = {x}");
        };
        let y: i64 = token
            .parse()
            .with_context(|| format!("invalid y coordinate {token:?}"))?;
        universe.set(Pos { x, y }, true)?;
    }
    Ok(())
}

fn write_cells(universe: &Universe) -> Result<()> {
    let mut cells = universe.live_cells();
    cells.sort_unstable_by_key(|pos| (pos.y, pos.x));

    let stdout = io::stdout().lock();
    let mut out = BufWriter::new(stdout);
    for Pos { x, y } in cells {
        writeln!(out, "{x} {y}")?;
    }
    out.flush().context("writing cells to stdout")?;
    Ok(())
}
