use std::path::Path;

use anyhow::{anyhow, Result};
use suivm_core::{Arch, Environment, Platform, SuivmError};
use suivm_installer::{
    default_link_path, primary_executable_name, BackupListing, HttpDownloader, InstallEngine,
    InstallOutcome, InstallPlan, InstallRequest, InstallationStatus, InstallationStore,
    RetentionPlan, SwitchOutcome, SwitchPlan, UninstallOutcome, VersionRecord,
};
use suivm_registry::GithubReleases;
use suivm_resolver::{ArtifactLocator, ReleaseResolver};
use tracing::debug;

use crate::completion::write_completions_script;
use crate::config::{resolve_config_path, resolve_prefix, SuivmConfig, CONFIG_ENV, HOME_ENV};
use crate::prompt::{choose, confirm};
use crate::render::TerminalRenderer;
use crate::{Cli, Commands, ReleaseSelector};

pub(crate) const DEFAULT_ENVIRONMENT: Environment = Environment::Testnet;

/// Everything one invocation needs, built from flags, environment and config.
struct Session {
    store: InstallationStore,
    resolver: ReleaseResolver<GithubReleases>,
    locator: ArtifactLocator,
    downloader: HttpDownloader,
}

impl Session {
    fn open(prefix_flag: Option<&Path>, config_flag: Option<&Path>) -> Result<Self> {
        let home_env = std::env::var(HOME_ENV).ok();
        let prefix = resolve_prefix(prefix_flag, home_env.as_deref())?;
        let config_env = std::env::var(CONFIG_ENV).ok();
        let config_path = resolve_config_path(config_flag, config_env.as_deref());
        let config = SuivmConfig::discover(config_path.as_deref(), &prefix)?;

        let default_link = match default_link_path() {
            Ok(path) => Some(path),
            Err(err) => {
                debug!("falling back to a link under the prefix: {err:#}");
                None
            }
        };
        let store = config.store(&prefix, default_link);
        let source_config = config.source_config();
        let downloader = HttpDownloader::new(&source_config.user_agent)?;
        let resolver = ReleaseResolver::new(GithubReleases::new(source_config)?);
        debug!(
            prefix = %prefix.display(),
            install_dir = %store.install_dir().display(),
            link = %store.link_path().display(),
            "session opened"
        );

        Ok(Self {
            store,
            resolver,
            locator: config.locator(),
            downloader,
        })
    }

    fn engine(&self) -> InstallEngine<'_, GithubReleases, HttpDownloader> {
        InstallEngine::new(&self.store, &self.resolver, &self.locator, &self.downloader)
    }
}

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let renderer = TerminalRenderer::current();
    let session = || Session::open(cli.prefix.as_deref(), cli.config.as_deref());

    match &cli.command {
        Commands::Install { selector, dry_run } => {
            let session = session()?;
            let environment = selector.env.unwrap_or(DEFAULT_ENVIRONMENT);
            run_install(&session, renderer, selector, environment, *dry_run)
        }
        Commands::Update { selector, dry_run } => {
            let session = session()?;
            let active = session.engine().status()?.record;
            let environment = update_environment(selector, active.as_ref());
            run_install(&session, renderer, selector, environment, *dry_run)
        }
        Commands::Uninstall { yes } => run_uninstall(&session()?, renderer, *yes),
        Commands::Switch {
            target,
            platform,
            arch,
            yes,
        } => {
            let platform = platform.map_or_else(host_platform, Ok)?;
            let arch = arch.map_or_else(host_arch, Ok)?;
            run_switch(
                &session()?,
                renderer,
                target.as_deref(),
                platform,
                arch,
                *yes,
            )
        }
        Commands::List { available, env } => {
            let session = session()?;
            if *available {
                run_list_available(&session, renderer, *env)
            } else {
                run_list_backups(&session, renderer, *env)
            }
        }
        Commands::Clean { env, yes, dry_run } => {
            run_clean(&session()?, renderer, *env, *yes, *dry_run)
        }
        Commands::Status => {
            let status = session()?.engine().status()?;
            renderer.print_lines(&format_status_lines(&status));
            Ok(())
        }
        Commands::Completions { shell } => {
            write_completions_script(*shell, &mut std::io::stdout().lock())
        }
    }
}

fn run_install(
    session: &Session,
    renderer: TerminalRenderer,
    selector: &ReleaseSelector,
    environment: Environment,
    dry_run: bool,
) -> Result<()> {
    if selector.list_versions {
        return print_available(session, renderer, environment);
    }

    let request = install_request(selector, environment)?;
    let engine = session.engine();
    let plan = engine.plan_install(&request)?;
    if dry_run {
        renderer.print_lines(&format_install_plan_lines(&plan));
        return Ok(());
    }

    if engine.is_active(&plan.key)? {
        renderer.print_status("ok", &format!("{} is already active", plan.key));
        return Ok(());
    }

    let mut progress = renderer.start_download("download");
    let result = engine.apply_install(&plan, &mut |done, total| progress.update(done, total));
    match result {
        Ok(outcome) => {
            progress.finish_success();
            renderer.print_status("ok", &format!("installed sui {}", outcome.key.tag));
            renderer.print_lines(&format_install_outcome_lines(&outcome));
            Ok(())
        }
        Err(err) => {
            progress.finish_abandon();
            Err(err)
        }
    }
}

fn run_uninstall(session: &Session, renderer: TerminalRenderer, yes: bool) -> Result<()> {
    let engine = session.engine();
    let status = engine.status()?;
    if !status.install_dir.exists() && status.link_target.is_none() {
        renderer.print_status("ok", "sui is not installed");
        return Ok(());
    }

    let question = format!(
        "Remove {} and the activation link {}?",
        status.install_dir.display(),
        status.link_path.display()
    );
    if !confirm(&question, yes)? {
        renderer.print_status("warn", "uninstall aborted");
        return Ok(());
    }

    let outcome = engine.uninstall()?;
    renderer.print_status("ok", "uninstalled sui");
    renderer.print_lines(&format_uninstall_lines(&outcome, &session.store));
    Ok(())
}

fn run_switch(
    session: &Session,
    renderer: TerminalRenderer,
    target: Option<&str>,
    platform: Platform,
    arch: Arch,
    yes: bool,
) -> Result<()> {
    let engine = session.engine();
    let target = match target {
        Some(target) => target.to_string(),
        None => match pick_backup(session, renderer)? {
            Some(target) => target,
            None => {
                renderer.print_status("warn", "switch aborted");
                return Ok(());
            }
        },
    };

    let plan = engine.plan_switch(&target, platform, arch)?;
    if let SwitchPlan::Reinstall(request) = &plan {
        let version = request.version.as_deref().unwrap_or("latest");
        renderer.print_status("warn", &format!("no backup matches {target}"));
        let question = format!(
            "Download and install {version} for {}-{}?",
            request.platform, request.arch
        );
        if !confirm(&question, yes)? {
            renderer.print_status("warn", "switch aborted");
            return Ok(());
        }
    }

    let mut progress = renderer.start_download("download");
    let result = engine.apply_switch(&plan, &mut |done, total| progress.update(done, total));
    let outcome = match result {
        Ok(outcome) => {
            progress.finish_success();
            outcome
        }
        Err(err) => {
            progress.finish_abandon();
            return Err(err);
        }
    };

    renderer.print_status("ok", &format!("switched to sui {}", outcome.key().tag));
    if let SwitchOutcome::Reinstalled(install) = &outcome {
        renderer.print_lines(&format_install_outcome_lines(install));
    }
    Ok(())
}

fn pick_backup(session: &Session, renderer: TerminalRenderer) -> Result<Option<String>> {
    let engine = session.engine();
    let listing = engine.backups().list()?;
    if listing.entries.is_empty() {
        return Err(anyhow!(
            "no backups to switch to under {}; run `suivm install` first",
            session.store.backup_dir().display()
        ));
    }

    let active = engine.status()?.record;
    let options = listing
        .entries
        .iter()
        .map(|entry| {
            if active.as_ref().is_some_and(|record| record.matches(&entry.key)) {
                format!("{} (active)", entry.name())
            } else {
                entry.name()
            }
        })
        .collect::<Vec<_>>();

    renderer.print_section("backups");
    Ok(choose("Switch to which release?", &options)?
        .map(|index| listing.entries[index].name()))
}

fn run_list_available(
    session: &Session,
    renderer: TerminalRenderer,
    environment: Option<Environment>,
) -> Result<()> {
    match environment {
        Some(environment) => print_available(session, renderer, environment),
        None => {
            for environment in Environment::ALL {
                match print_available(session, renderer, environment) {
                    Ok(()) => {}
                    Err(err)
                        if matches!(
                            err.downcast_ref::<SuivmError>(),
                            Some(SuivmError::NoReleasesFound { .. })
                        ) =>
                    {
                        renderer.print_status("warn", &format!("{err}"));
                    }
                    Err(err) => return Err(err),
                }
            }
            Ok(())
        }
    }
}

fn print_available(
    session: &Session,
    renderer: TerminalRenderer,
    environment: Environment,
) -> Result<()> {
    let tags = session.resolver.list_versions(environment)?;
    let active = session.engine().status()?.record;

    renderer.print_section(&format!("{environment} releases"));
    let lines = tags
        .iter()
        .map(|tag| {
            let is_active = active.as_ref().is_some_and(|record| &record.tag() == tag);
            if is_active {
                format!("{tag} (active)")
            } else {
                tag.to_string()
            }
        })
        .collect::<Vec<_>>();
    renderer.print_lines(&lines);
    Ok(())
}

fn run_list_backups(
    session: &Session,
    renderer: TerminalRenderer,
    environment: Option<Environment>,
) -> Result<()> {
    let engine = session.engine();
    let listing = engine.backups().list()?;
    let active = engine.status()?.record;
    let lines = format_backup_listing_lines(&listing, active.as_ref(), environment);
    if lines.is_empty() {
        renderer.print_status("ok", "no backups");
        return Ok(());
    }
    renderer.print_lines(&lines);
    Ok(())
}

fn run_clean(
    session: &Session,
    renderer: TerminalRenderer,
    environment: Option<Environment>,
    yes: bool,
    dry_run: bool,
) -> Result<()> {
    let engine = session.engine();
    let backups = engine.backups();
    let active = engine.status()?.record;
    let plans = backups
        .retention_plans(active.as_ref())?
        .into_iter()
        .filter(|plan| environment.map_or(true, |environment| plan.environment == environment))
        .collect::<Vec<_>>();

    let doomed = plans.iter().map(|plan| plan.delete.len()).sum::<usize>();
    if doomed == 0 {
        renderer.print_status("ok", "nothing to clean");
        return Ok(());
    }

    renderer.print_lines(&format_retention_plan_lines(&plans));
    if dry_run {
        return Ok(());
    }
    if !confirm(&format!("Delete {doomed} backup(s)?"), yes)? {
        renderer.print_status("warn", "clean aborted");
        return Ok(());
    }

    for plan in &plans {
        for entry in backups.apply(plan)? {
            renderer.print_status("ok", &format!("removed {}", entry.name()));
        }
    }
    Ok(())
}

pub(crate) fn update_environment(
    selector: &ReleaseSelector,
    active: Option<&VersionRecord>,
) -> Environment {
    selector
        .env
        .or_else(|| active.map(|record| record.environment))
        .unwrap_or(DEFAULT_ENVIRONMENT)
}

pub(crate) fn install_request(
    selector: &ReleaseSelector,
    environment: Environment,
) -> Result<InstallRequest> {
    Ok(InstallRequest {
        environment,
        version: selector.version.clone(),
        platform: selector.platform.map_or_else(host_platform, Ok)?,
        arch: selector.arch.map_or_else(host_arch, Ok)?,
    })
}

fn host_platform() -> Result<Platform> {
    Platform::host().ok_or_else(|| {
        anyhow!(
            "no sui releases for host OS '{}'; pass --platform",
            std::env::consts::OS
        )
    })
}

fn host_arch() -> Result<Arch> {
    Arch::host().ok_or_else(|| {
        anyhow!(
            "no sui releases for host architecture '{}'; pass --arch",
            std::env::consts::ARCH
        )
    })
}

pub(crate) fn format_install_plan_lines(plan: &InstallPlan) -> Vec<String> {
    let mut lines = vec![
        format!("release: {}", plan.key.tag),
        format!("artifact: {}", plan.file_name),
        format!("url: {}", plan.url),
    ];
    lines.push(match &plan.current {
        Some(current) => format!("active: {}", current.tag()),
        None => "active: none".to_string(),
    });
    if plan.replaces_backup {
        lines.push(format!("backup: replaces {}", plan.key));
    } else {
        lines.push(format!("backup: new {}", plan.key));
    }
    lines
}

pub(crate) fn format_install_outcome_lines(outcome: &InstallOutcome) -> Vec<String> {
    let mut lines = vec![
        format!("artifact: {} ({} bytes)", outcome.key, outcome.downloaded_bytes),
        format!("sha256: {}", outcome.sha256),
        format!("backup: {}", outcome.backup_path.display()),
        format!("executables: {}", outcome.executables.join(", ")),
        format!(
            "link: {} -> {}",
            outcome.link_path.display(),
            outcome.install_dir.join(primary_executable_name()).display()
        ),
    ];
    if let Some(previous) = outcome
        .previous
        .as_ref()
        .filter(|previous| !previous.matches(&outcome.key))
    {
        lines.push(format!("previous: {}", previous.tag()));
    }
    lines
}

pub(crate) fn format_uninstall_lines(
    outcome: &UninstallOutcome,
    store: &InstallationStore,
) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(if outcome.removed_install_dir {
        format!("removed {}", outcome.install_dir.display())
    } else {
        format!("{} was already absent", outcome.install_dir.display())
    });
    lines.push(if outcome.removed_link {
        format!("removed {}", outcome.link_path.display())
    } else {
        format!("no activation link at {}", outcome.link_path.display())
    });
    lines.push(format!("backups kept in {}", store.backup_dir().display()));
    lines
}

pub(crate) fn format_backup_listing_lines(
    listing: &BackupListing,
    active: Option<&VersionRecord>,
    environment: Option<Environment>,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (group, entries) in listing.by_environment() {
        if environment.is_some_and(|environment| environment != group) {
            continue;
        }
        lines.push(format!("{group}:"));
        for entry in entries {
            let marker = if active.is_some_and(|record| record.matches(&entry.key)) {
                "*"
            } else {
                " "
            };
            lines.push(format!("  {marker} {}", entry.name()));
        }
    }
    if environment.is_none() && !listing.unrecognized.is_empty() {
        lines.push("unrecognized:".to_string());
        for name in &listing.unrecognized {
            lines.push(format!("    {name}"));
        }
    }
    lines
}

pub(crate) fn format_retention_plan_lines(plans: &[RetentionPlan]) -> Vec<String> {
    let mut lines = Vec::new();
    for plan in plans {
        if plan.keep.is_empty() && plan.delete.is_empty() {
            continue;
        }
        lines.push(format!("{}:", plan.environment));
        for entry in &plan.keep {
            lines.push(format!("  keep   {}", entry.name()));
        }
        for entry in &plan.delete {
            lines.push(format!("  delete {}", entry.name()));
        }
    }
    lines
}

pub(crate) fn format_status_lines(status: &InstallationStatus) -> Vec<String> {
    let active = match &status.record {
        Some(record) => format!("active: {}", record.tag()),
        None => "active: none".to_string(),
    };
    let primary = if status.primary_present {
        "sui present"
    } else {
        "sui missing"
    };
    let link = match &status.link_target {
        Some(target) => format!(
            "activation link: {} -> {}",
            status.link_path.display(),
            target.display()
        ),
        None => format!("activation link: {} (missing)", status.link_path.display()),
    };
    vec![
        active,
        format!("install location: {} ({primary})", status.install_dir.display()),
        link,
    ]
}
