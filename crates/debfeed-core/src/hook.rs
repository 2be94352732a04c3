//! Post-install hook: link the packaged configuration into place, validate it and restart the
//! service.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use debfeed_config::{error::ConfigError, hook::HookConfig};
use debfeed_utils::fs::{ensure_dir_exists, force_symlink};
use tracing::{debug, info, warn};

use crate::{
    command::{CommandRunner, Invocation},
    error::{DebfeedError, ErrorContext},
    utils::{backup_path, best_effort},
    DebfeedResult,
};

/// Whether the maintainer-script `action` asks for configuration.
///
/// dpkg calls `postinst configure <version>` on install and upgrade; the remaining actions
/// (`abort-upgrade`, `abort-remove`, ...) roll back and must not touch the configuration.
/// Without an action the hook always runs.
pub fn should_run(action: Option<&str>) -> bool {
    matches!(action, None | Some("configure"))
}

#[derive(Debug)]
pub struct PostInstallReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub backup: Option<PathBuf>,
    pub restarted: bool,
}

/// Copies a regular file at `destination` to `<destination>.bak`, overwriting an older backup.
///
/// Symlinks and missing destinations are left alone.
pub fn backup_existing(destination: &Path) -> DebfeedResult<Option<PathBuf>> {
    let metadata = match fs::symlink_metadata(destination) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(DebfeedError::IoError {
                action: format!("inspecting {}", destination.display()),
                source: err,
            })
        }
    };

    if !metadata.file_type().is_file() {
        return Ok(None);
    }

    let backup = backup_path(destination);
    fs::copy(destination, &backup).with_context(|| {
        format!(
            "backing up {} to {}",
            destination.display(),
            backup.display()
        )
    })?;

    info!("Saved existing {} as {}", destination.display(), backup.display());
    Ok(Some(backup))
}

/// Replaces `destination` with a symlink to `source`, creating the parent directory.
pub fn link_config(source: &Path, destination: &Path) -> DebfeedResult<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir_exists(parent)?;
    }
    force_symlink(source, destination)?;

    info!("Linked {} -> {}", destination.display(), source.display());
    Ok(())
}

fn invocation(argv: &[String], name: &'static str) -> DebfeedResult<Invocation> {
    Invocation::from_argv(argv).ok_or_else(|| ConfigError::EmptyCommand(name).into())
}

/// Runs the validator against the linked configuration.
pub fn validate_config<R: CommandRunner + ?Sized>(
    hook: &HookConfig,
    destination: &Path,
    runner: &R,
) -> DebfeedResult<()> {
    let argv = hook.validator_command(&destination.to_string_lossy());
    let invocation = invocation(&argv, "validator")?;
    let rejected = |reason: String| {
        DebfeedError::ConfigValidation {
            path: destination.to_path_buf(),
            reason,
        }
    };

    let output = runner
        .run(&invocation)
        .map_err(|err| rejected(format!("could not run '{invocation}': {err}")))?;
    if !output.success() {
        return Err(rejected(output.failure_reason()));
    }

    debug!("validator output: {}", output.stdout_lossy().trim());
    info!("Configuration {} is valid", destination.display());
    Ok(())
}

pub fn restart_service<R: CommandRunner + ?Sized>(
    hook: &HookConfig,
    runner: &R,
) -> DebfeedResult<()> {
    let invocation = invocation(&hook.restart, "restart")?;
    let failed = |reason: String| {
        DebfeedError::Command {
            command: invocation.to_string(),
            reason,
        }
    };

    let output = runner
        .run(&invocation)
        .map_err(|err| failed(err.to_string()))?;
    if !output.success() {
        return Err(failed(output.failure_reason()));
    }

    info!("Restarted service ({})", invocation);
    Ok(())
}

/// Backs up, links, validates and restarts, in that order.
///
/// The link is created before validation, so a rejected configuration stays linked in place
/// and the error says so. Restart failures are logged and do not fail the hook.
pub fn run_post_install<R: CommandRunner + ?Sized>(
    hook: &HookConfig,
    runner: &R,
) -> DebfeedResult<PostInstallReport> {
    let source = hook.get_source()?;
    let destination = hook.get_destination()?;

    if !source.exists() {
        warn!(
            "{} does not exist; {} will be a dangling link",
            source.display(),
            destination.display()
        );
    }

    let backup = backup_existing(&destination)?;
    link_config(&source, &destination)?;
    validate_config(hook, &destination, runner)?;
    let restarted = best_effort("Service restart", restart_service(hook, runner)).is_some();

    Ok(PostInstallReport {
        source,
        destination,
        backup,
        restarted,
    })
}
