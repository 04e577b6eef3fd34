use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;
use suivm_core::{Arch, Environment, Platform, SuivmError};

mod completion;
mod config;
mod dispatch;
mod logging;
mod prompt;
mod render;

use dispatch::run_cli;
use render::{current_output_style, render_status_line};

const LONG_ABOUT: &str = "\
Install, update and switch between releases of the sui binary.

Every installed release is kept as a backup under the suivm prefix so that
`suivm switch` can reactivate it without downloading again. `suivm clean`
removes old backups while keeping the latest release of each environment
and the active one.

suivm takes no lock: run one suivm command at a time.";

#[derive(Parser, Debug)]
#[command(name = "suivm")]
#[command(about = "Version manager for the sui binary", long_about = LONG_ABOUT)]
struct Cli {
    /// Root directory for installs, backups and scratch space.
    #[arg(long, global = true, value_name = "DIR")]
    prefix: Option<PathBuf>,
    /// Configuration file (defaults to <prefix>/config.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log more; repeat for debug and trace output.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
struct ReleaseSelector {
    /// Release environment: mainnet, testnet or devnet.
    #[arg(short, long)]
    env: Option<Environment>,
    /// Release version, e.g. 1.40.1, v1.40.1 or testnet-v1.40.1.
    #[arg(short = 'V', long)]
    version: Option<String>,
    /// Target platform: ubuntu, macos or windows (defaults to the host).
    #[arg(long)]
    platform: Option<Platform>,
    /// Target architecture: x86_64, aarch64 or arm64 (defaults to the host).
    #[arg(long)]
    arch: Option<Arch>,
    /// Print the available release tags instead of installing.
    #[arg(short = 'l', long)]
    list_versions: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download and activate a release.
    Install {
        #[command(flatten)]
        selector: ReleaseSelector,
        /// Show what would be installed without changing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Install the latest release of the active environment.
    Update {
        #[command(flatten)]
        selector: ReleaseSelector,
        /// Show what would be installed without changing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove the active installation; backups are kept.
    Uninstall {
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Activate a backed-up release, downloading it again if needed.
    Switch {
        /// Backup name, tag or <env>-<version>; prompts when omitted.
        target: Option<String>,
        /// Platform for targets that do not name one (defaults to the host).
        #[arg(long)]
        platform: Option<Platform>,
        /// Architecture for targets that do not name one (defaults to the host).
        #[arg(long)]
        arch: Option<Arch>,
        /// Download a missing release without asking.
        #[arg(short, long)]
        yes: bool,
    },
    /// List backed-up releases, or the releases available upstream.
    List {
        /// List release tags from the release listing instead of backups.
        #[arg(long)]
        available: bool,
        /// Only this environment.
        #[arg(short, long)]
        env: Option<Environment>,
    },
    /// Delete old backups, keeping the latest and the active release.
    Clean {
        /// Only clean backups of this environment.
        #[arg(short, long)]
        env: Option<Environment>,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
        /// Show what would be deleted without deleting.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the active release and activation link.
    Status,
    /// Print a shell completion script.
    Completions {
        /// Shell to generate the script for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let style = current_output_style();
            eprintln!("{}", render_status_line(style, "error", &format!("{err:#}")));
            if let Some(hint) = failure_hint(&err) {
                eprintln!("{}", render_status_line(style, "hint", &hint));
            }
            ExitCode::FAILURE
        }
    }
}

fn failure_hint(err: &anyhow::Error) -> Option<String> {
    match err.downcast_ref::<SuivmError>()? {
        SuivmError::ActivationFailedAfterBackup { key, .. } => Some(format!(
            "the release was backed up; run `suivm switch {key}` to retry activation"
        )),
        SuivmError::NoReleasesFound { environment } => Some(format!(
            "check the release listing or pass an explicit --version for {environment}"
        )),
        SuivmError::UnresolvableBackupReference { .. } => {
            Some("run `suivm list` to see the available backups".to_string())
        }
        _ => None,
    }
}
