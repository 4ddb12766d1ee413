#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use pqc_bench::core::{PrimitiveKind, SECURITY_LEVELS};
use pqc_bench::pipeline::FailurePolicy;
use pqc_bench::run_cmd::RunOptions;
use pqc_bench::{list_cmd, run_cmd};

#[derive(Parser, Debug)]
#[command(name = "pqc-bench")]
#[command(about = "Benchmark post-quantum KEM and signature families by security level", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set PQC_BENCH_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve families, benchmark every variant and write results
    Run {
        /// KEM families to evaluate (e.g. mlkem, kyber)
        #[arg(long, num_args = 1..)]
        kem: Vec<String>,
        /// Signature families to evaluate (e.g. mldsa, falcon)
        #[arg(long, num_args = 1..)]
        sig: Vec<String>,
        /// Include the ECDSA baseline
        #[arg(long)]
        ecdsa: bool,
        /// Claimed security levels to keep
        #[arg(long, num_args = 1.., default_values_t = SECURITY_LEVELS)]
        levels: Vec<u8>,
        /// Number of measured iterations per variant
        #[arg(short = 'n', long, default_value_t = 1, allow_negative_numbers = true)]
        number: i64,
        /// Number of unrecorded warm-up iterations per variant
        #[arg(short = 'w', long = "warm-up", default_value_t = 0, allow_negative_numbers = true)]
        warm_up: i64,
        /// Output directory for CSV tables
        #[arg(long, default_value = "results")]
        out: PathBuf,
        /// Rule table to use instead of the built-in one (TOML)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// What to do when a variant fails: abort or skip
        #[arg(long = "on-error", default_value = "abort")]
        on_error: FailurePolicy,
        /// Do not write CSV tables
        #[arg(long)]
        no_csv: bool,
        /// Append a run record to this JSONL history file
        #[arg(long)]
        history: Option<PathBuf>,
        /// Write an HTML chart report to this file
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// List mechanisms enabled in the built-in provider
    List {
        /// Only this primitive kind: kem, sig or ecdsa
        #[arg(long, value_parser = parse_kind)]
        kind: Option<PrimitiveKind>,
        /// Rule table used for classification (TOML)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Print the loaded family rule table
    Rules {
        /// Rule table to print instead of the built-in one (TOML)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

fn parse_kind(s: &str) -> Result<PrimitiveKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "kem" => Ok(PrimitiveKind::Kem),
        "sig" => Ok(PrimitiveKind::Sig),
        "ecdsa" => Ok(PrimitiveKind::Ecdsa),
        other => Err(format!("unknown kind `{other}` (expected kem, sig or ecdsa)")),
    }
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("PQC_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "pqc_bench=debug".to_string() } else { "pqc_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { kem, sig, ecdsa, levels, number, warm_up, out, rules, on_error, no_csv, history, html } => {
            run_cmd::run(RunOptions {
                kem,
                sig,
                ecdsa,
                levels,
                measured_runs: number,
                warmup_runs: warm_up,
                out_dir: out,
                rules,
                on_error,
                csv: !no_csv,
                history,
                html,
            })
        }
        Commands::List { kind, rules } => list_cmd::list(kind, rules),
        Commands::Rules { rules } => list_cmd::rules(rules),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
