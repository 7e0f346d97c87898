use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;

use pgbdd::bdd::ManagerConfig;
use pgbdd::cnf::Cnf;
use pgbdd::permute::Permuter;
use pgbdd::prover::{ProofFormat, ProofMode, Prover};
use pgbdd::solver::{Schedule, Solver};

#[derive(Debug, Copy, Clone, ValueEnum)]
enum FormatArg {
    Trace,
    Lrat,
    Qrat,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ScheduleArg {
    Linear,
    Bucket,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ModeArg {
    None,
    Refutation,
    Satisfaction,
    Dual,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Input formula in DIMACS CNF. Without it, a pigeonhole formula is used.
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Number of holes of the generated pigeonhole formula.
    #[clap(long, value_name = "INT", default_value = "4")]
    holes: usize,

    /// Variable order file (one permutation of 1..=n).
    #[clap(long, value_name = "FILE")]
    order: Option<PathBuf>,

    /// Where to write the proof.
    #[clap(long, value_name = "FILE")]
    proof: Option<PathBuf>,

    #[clap(long, value_enum, default_value = "lrat")]
    format: FormatArg,

    /// Write the proof in binary encoding.
    #[clap(long)]
    binary: bool,

    /// Emit comments describing each proof step.
    #[clap(long)]
    comments: bool,

    #[clap(long, value_enum, default_value = "linear")]
    schedule: ScheduleArg,

    #[clap(long, value_enum, default_value = "refutation")]
    mode: ModeArg,

    /// Quantified variables between garbage collections.
    #[clap(long, value_name = "INT", default_value = "4")]
    gc_threshold: usize,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    info!("args = {:?}", args);

    let cnf = match &args.input {
        Some(path) => Cnf::parse(BufReader::new(File::open(path)?))?,
        None => Cnf::pigeonhole(args.holes),
    };
    let permuter = match &args.order {
        Some(path) => Permuter::read(BufReader::new(File::open(path)?))?,
        None => Permuter::identity(cnf.num_vars),
    };

    let out: Box<dyn Write> = match &args.proof {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::sink()),
    };
    let format = match args.format {
        FormatArg::Trace => ProofFormat::Trace,
        FormatArg::Lrat => ProofFormat::Lrat,
        FormatArg::Qrat => ProofFormat::Qrat,
    };
    let mode = match (args.mode, &args.proof) {
        (_, None) | (ModeArg::None, _) => ProofMode::None,
        (ModeArg::Refutation, _) => ProofMode::Refutation,
        (ModeArg::Satisfaction, _) => ProofMode::Satisfaction,
        (ModeArg::Dual, _) => ProofMode::Dual,
    };
    let prover = Prover::new(out, format, mode)
        .with_binary(args.binary)
        .with_comments(args.comments);

    let config = ManagerConfig {
        gc_threshold: args.gc_threshold,
        ..ManagerConfig::default()
    };
    let mut solver = Solver::with_config(&cnf, &permuter, prover, config)?;
    let schedule = match args.schedule {
        ScheduleArg::Linear => Schedule::Linear,
        ScheduleArg::Bucket => Schedule::Bucket,
    };
    let outcome = solver.run(schedule)?;
    println!("s {:?}", outcome);

    if let Some(term) = solver.terms().first() {
        let manager = solver.manager();
        info!(
            "Final BDD has {} nodes and {} models",
            manager.size(term.root),
            manager.satisfy_count(term.root)
        );
    }
    solver.finish()?;

    let time_total = time_total.elapsed();
    info!("All done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
