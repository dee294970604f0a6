//! specstest - runtime conformance runner
//!
//! Runs the built-in test suites against a container runtime and prints
//! one verdict per case.
//!
//! ## Usage
//!
//! ```sh
//! specstest list
//! specstest run [--suite <name> [--case <name>]] [--json]
//! specstest --runtime crun --rootfs /srv/rootfs run
//! ```
//!
//! ## Runtime Selection
//!
//! The runtime is picked by name (`runc`, `crun`, `youki`) from, in
//! increasing precedence, `--config`, `OCT_RUNTIME` and `--runtime`.

use clap::{Parser, Subcommand};
use oct::{HarnessConfig, Manager, RunReport, RuntimeRegistry, TestContext};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

// =============================================================================
// CLI Parsing
// =============================================================================

#[derive(Parser, Debug)]
#[command(version, about = "Conformance tests for OCI container runtimes")]
struct Opts {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Runtime under test (runc, crun, youki)
    #[arg(short, long, global = true)]
    runtime: Option<String>,

    /// Path to the runtime executable
    #[arg(long, global = true)]
    runtime_path: Option<PathBuf>,

    /// Prepared root filesystem used by every bundle
    #[arg(long, global = true)]
    rootfs: Option<PathBuf>,

    /// Directory bundles are created in
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Keep bundles after each case
    #[arg(long, global = true)]
    keep_bundles: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// List available runtimes and registered suites with their cases
    List,

    /// Run all suites, one suite, or one case
    Run {
        /// Suite to run
        #[arg(short, long)]
        suite: Option<String>,

        /// Case within the suite to run
        #[arg(short, long, requires = "suite")]
        case: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

// =============================================================================
// Commands
// =============================================================================

fn load_config(opts: &Opts) -> oct::Result<HarnessConfig> {
    let base = match &opts.config {
        Some(path) => HarnessConfig::load_from_file(path)?,
        None => HarnessConfig::default(),
    };
    let mut config = base.with_env(|key| std::env::var(key).ok())?;

    if let Some(runtime) = &opts.runtime {
        config.runtime = runtime.clone();
    }
    if let Some(path) = &opts.runtime_path {
        config.runtime_path = Some(path.clone());
    }
    if let Some(rootfs) = &opts.rootfs {
        config.rootfs = Some(rootfs.clone());
    }
    if let Some(dir) = &opts.work_dir {
        config.work_dir = dir.clone();
    }
    config.keep_bundles |= opts.keep_bundles;
    Ok(config)
}

fn cmd_list(manager: &Manager, registry: &RuntimeRegistry) -> String {
    let mut out = format!("Runtimes: {}\n", registry.names().join(", "));
    for suite in manager.suites() {
        out.push_str(suite.name());
        out.push('\n');
        for case in suite.cases() {
            out.push_str("  ");
            out.push_str(case.name());
            out.push('\n');
        }
    }
    out
}

fn cmd_run(
    manager: &Manager,
    config: &HarnessConfig,
    suite: Option<&str>,
    case: Option<&str>,
    json: bool,
) -> oct::Result<(String, bool)> {
    let runtime = RuntimeRegistry::new().resolve(config)?;
    let builder = config.bundle_builder()?;
    let ctx = TestContext::new(runtime.as_ref(), &builder).keep_bundles(config.keep_bundles);

    if let (Some(suite), Some(case)) = (suite, case) {
        let result = manager.run_case(suite, case, &ctx)?;
        let passed = result.verdict == oct::Verdict::Passed;
        let text = if json {
            serde_json::to_string_pretty(&result)?
        } else {
            match &result.message {
                Some(message) => format!(
                    "{}.{}  {}  {}",
                    result.suite,
                    result.case,
                    result.verdict,
                    message.trim()
                ),
                None => format!("{}.{}  {}", result.suite, result.case, result.verdict),
            }
        };
        return Ok((text, passed));
    }

    let report: RunReport = match suite {
        Some(name) => manager.run_suite(name, &ctx)?,
        None => manager.run_all(&ctx),
    };
    let text = if json {
        serde_json::to_string_pretty(&report)?
    } else {
        report.to_string()
    };
    Ok((text, report.all_passed()))
}

fn emit(output: Option<&PathBuf>, content: &str) -> oct::Result<()> {
    match output {
        Some(path) => std::fs::write(path, format!("{}\n", content))?,
        None => println!("{}", content),
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber may already be installed by an embedding process.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

// =============================================================================
// Main
// =============================================================================

fn run(opts: &Opts) -> oct::Result<bool> {
    let mut manager = Manager::new();
    oct::suites::register_all(&mut manager);

    match &opts.command {
        SubCommand::List => {
            emit(
                opts.output.as_ref(),
                cmd_list(&manager, &RuntimeRegistry::new()).trim_end(),
            )?;
            Ok(true)
        }
        SubCommand::Run { suite, case, json } => {
            let config = load_config(opts)?;
            let (text, passed) =
                cmd_run(&manager, &config, suite.as_deref(), case.as_deref(), *json)?;
            emit(opts.output.as_ref(), &text)?;
            Ok(passed)
        }
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    init_tracing(opts.debug);

    match run(&opts) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
