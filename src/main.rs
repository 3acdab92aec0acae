use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use decoder_conformance::cases::catalog;
use decoder_conformance::fixture;
use decoder_conformance::harness::DEFAULT_TIMEOUT;
use decoder_conformance::locate::locate;
use decoder_conformance::report::Reporter;
use decoder_conformance::runner::{run_suite, RunConfig};
use decoder_conformance::{Capabilities, Format, HarnessError};
use owo_colors::OwoColorize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "dumpasn1/dumpcbor conformance harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the conformance suite (default)
    Run(RunArgs),
    /// Print the case catalog without running anything
    List {
        /// Only list cases whose name contains this filter
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Write the encoded fixtures to a directory for manual inspection
    Fixtures {
        /// Output directory (defaults to fixtures)
        #[arg(short, long, default_value = "fixtures")]
        output: PathBuf,
        /// Only write cases whose name contains this filter
        #[arg(short, long)]
        filter: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Only run cases whose name contains this filter
    #[arg(short, long)]
    filter: Option<String>,
    /// Announce each case and log every decoder invocation
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
    /// Seconds a decoder may run before it is killed [default: 5]
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=86_400))]
    timeout: Option<u64>,
    /// Directory the build outputs are searched under (defaults to cwd)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Explicit dumpasn1 path; requires --cbor-bin
    #[arg(long)]
    asn1_bin: Option<PathBuf>,
    /// Explicit dumpcbor path; requires --asn1-bin
    #[arg(long)]
    cbor_bin: Option<PathBuf>,
    /// Skip every case of this format
    #[arg(long, value_enum)]
    skip: Vec<Format>,
    /// Disable colored status tags
    #[arg(long, default_value_t = false)]
    no_color: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Run(RunArgs::default()));

    match command {
        Commands::Run(args) => {
            init_tracing(args.verbose);
            run(args)
        }
        Commands::List { filter } => {
            init_tracing(false);
            list(filter.as_deref())
        }
        Commands::Fixtures { output, filter } => {
            init_tracing(false);
            write_fixtures(&output, filter.as_deref())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

// --------------------- Suite run -------------------------------------------
fn run(args: RunArgs) -> Result<()> {
    let color = !args.no_color;
    let red = |text: &str| if color { text.red().to_string() } else { text.to_owned() };
    let yellow = |text: &str| if color { text.yellow().to_string() } else { text.to_owned() };

    println!("ASN.1/CBOR Tools Test Suite");
    println!("{}", "=".repeat(50));

    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir().context("reading current directory")?,
    };
    let binaries = match locate(&root, args.asn1_bin, args.cbor_bin) {
        Ok(binaries) => binaries,
        Err(err @ HarnessError::BinariesNotFound { .. }) => {
            println!("{}", red("Error: Could not find binaries."));
            println!("Please run 'cargo build' first.");
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };
    println!("Using binaries:");
    println!("  ASN.1: {}", binaries.asn1.display());
    println!("  CBOR:  {}", binaries.cbor.display());

    let capabilities = args
        .skip
        .iter()
        .fold(Capabilities::detect(), |caps, format| caps.without(*format));
    for format in Format::ALL {
        if !capabilities.supports(format) {
            let warning = format!("Warning: {} not available", format.encoder_name());
            println!("\n{}: {format} cases will be skipped", yellow(&warning));
        }
    }
    if !capabilities.any() {
        println!("\n{}", red("Error: No test dependencies available."));
        println!("Rebuild with the asn1 and cbor features enabled.");
        return Err(HarnessError::NoCapabilities.into());
    }

    let config = RunConfig {
        binaries,
        capabilities,
        timeout: args.timeout.map_or(DEFAULT_TIMEOUT, Duration::from_secs),
        filter: args.filter,
    };
    let mut reporter = Reporter::new(io::stdout().lock(), color, args.verbose);
    let summary = run_suite(&catalog(), &config, &mut reporter)?;
    if !summary.success() {
        bail!("{} of {} cases failed", summary.failed, summary.total());
    }
    Ok(())
}

// --------------------- Catalog tools ---------------------------------------
fn list(filter: Option<&str>) -> Result<()> {
    for case in catalog().iter().filter(|case| case.matches(filter)) {
        println!(
            "{:<6} {:<32} {:?}",
            case.format().to_string(),
            case.name,
            case.expected
        );
    }
    Ok(())
}

fn write_fixtures(output: &Path, filter: Option<&str>) -> Result<()> {
    let capabilities = Capabilities::detect();
    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;
    for case in catalog().iter().filter(|case| case.matches(filter)) {
        let format = case.format();
        if !capabilities.supports(format) {
            println!("Skipped: {} ({} not available)", case.name, format.encoder_name());
            continue;
        }
        let bytes = fixture::encode(&case.fixture)
            .with_context(|| format!("encoding {}", case.name))?;
        let dest = output.join(format!("{}{}", case.slug(), format.suffix()));
        fs::write(&dest, &bytes).with_context(|| format!("writing {}", dest.display()))?;
        println!("Wrote: {} ({}B)", dest.display(), bytes.len());
    }
    Ok(())
}
