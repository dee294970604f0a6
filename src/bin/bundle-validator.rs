//! bundle-validator - static bundle checks and demo bundle generation
//!
//! Validates a bundle, or one of its documents, without running a
//! container runtime, and generates demo documents.
//!
//! ## Usage
//!
//! ```sh
//! bundle-validator valbundle <bundle>          # vb
//! bundle-validator valconfig <config.json>     # vc
//! bundle-validator valruntime <runtime.json> [os]  # vr, os defaults to linux
//! bundle-validator genconfig                   # gc
//! bundle-validator genruntime                  # gr
//! bundle-validator generate --outpath <dir> [--rootfs <path>] [--read-only false]  # gen
//! bundle-validator -o report.txt valbundle <bundle>
//! ```

use clap::{ArgAction, Parser, Subcommand};
use oct::{SpecDocument, Validation};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "bundle-validator",
    version,
    about = "Validate that a bundle is a standard container bundle"
)]
struct Opts {
    /// Redirect the output to a file
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
    /// Validate config.json, runtime.json and the rootfs of a bundle
    #[command(name = "valbundle", visible_alias = "vb")]
    ValBundle { bundle: PathBuf },

    /// Validate config.json only
    #[command(name = "valconfig", visible_alias = "vc")]
    ValConfig { path: PathBuf },

    /// Validate runtime.json only, for a target OS (default linux)
    #[command(name = "valruntime", visible_alias = "vr")]
    ValRuntime { path: PathBuf, os: Option<String> },

    /// Print a demo config.json
    #[command(name = "genconfig", visible_alias = "gc")]
    GenConfig,

    /// Print a demo runtime.json
    #[command(name = "genruntime", visible_alias = "gr")]
    GenRuntime,

    /// Write a demo bundle's config.json and runtime.json
    #[command(name = "generate", visible_alias = "gen")]
    Generate {
        /// Directory to write the documents to
        #[arg(long, default_value = ".")]
        outpath: PathBuf,

        /// Root filesystem path to put in config.json
        #[arg(long)]
        rootfs: Option<String>,

        /// Make the container's rootfs read-only
        #[arg(long = "read-only", default_value_t = true, action = ArgAction::Set)]
        read_only: bool,

        /// gid for the process
        #[arg(long)]
        gid: Option<u32>,

        /// Supplementary groups for the process
        #[arg(long, value_delimiter = ',')]
        groups: Vec<u32>,
    },
}

// =============================================================================
// Output
// =============================================================================

fn output_info(opts: &Opts, content: &str) -> oct::Result<()> {
    match &opts.output {
        Some(path) => std::fs::write(path, content)?,
        None => println!("{}", content),
    }
    Ok(())
}

/// Prints a diagnostic report; files get the bare diagnostics.
fn print_errors(opts: &Opts, diagnostics: &[String]) -> oct::Result<()> {
    match &opts.output {
        Some(path) => {
            let mut content = diagnostics.join("\n");
            content.push('\n');
            std::fs::write(path, content)?;
        }
        None => {
            println!("{} errors found:", diagnostics.len());
            for diagnostic in diagnostics {
                println!("{}", diagnostic);
            }
        }
    }
    Ok(())
}

fn report(opts: &Opts, validation: Validation, success: &str) -> oct::Result<bool> {
    let (valid, diagnostics) = validation.into_parts();
    if valid {
        output_info(opts, success)?;
    } else {
        print_errors(opts, &diagnostics)?;
    }
    Ok(valid)
}

/// Demo document for `generate`, with its flags applied.
fn generated_spec(command: &SubCommand) -> SpecDocument {
    let mut spec = SpecDocument::new();
    if let SubCommand::Generate {
        rootfs,
        read_only,
        gid,
        groups,
        ..
    } = command
    {
        if let Some(rootfs) = rootfs {
            spec.set_root_path(rootfs.as_str());
        }
        spec.config.root.readonly = *read_only;
        let user = &spec.config.process.user;
        let (uid, current_gid) = (user.uid, user.gid);
        spec.set_user(uid, gid.unwrap_or(current_gid), groups.clone());
    }
    spec
}

// =============================================================================
// Main
// =============================================================================

fn run(opts: &Opts) -> oct::Result<bool> {
    match &opts.command {
        SubCommand::ValBundle { bundle } => report(
            opts,
            oct::bundle_valid(bundle),
            "Valid : config.json, runtime.json and rootfs are all accessible in the bundle",
        ),
        SubCommand::ValConfig { path } => {
            report(opts, oct::config_valid(path), "Valid : config.json")
        }
        SubCommand::ValRuntime { path, os } => report(
            opts,
            oct::runtime_valid(path, os.as_deref().unwrap_or_default()),
            "Valid : runtime.json",
        ),
        SubCommand::GenConfig => {
            output_info(opts, &SpecDocument::new().config_json()?)?;
            Ok(true)
        }
        SubCommand::GenRuntime => {
            output_info(opts, &SpecDocument::new().runtime_json()?)?;
            Ok(true)
        }
        SubCommand::Generate { outpath, .. } => {
            let spec = generated_spec(&opts.command);
            std::fs::create_dir_all(outpath)?;
            spec.write_to(outpath)?;
            info!("Generated bundle documents in {}", outpath.display());
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();

    let level = if opts.debug { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match run(&opts) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
