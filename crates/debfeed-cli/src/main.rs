use std::{fs, io::ErrorKind, path::Path};

use bootstrap::bootstrap;
use clap::Parser;
use cli::{Args, Commands};
use debfeed_config::config::{config_path, generate_default_config, Config};
use debfeed_core::{
    auth::Credentials,
    bootstrap::BootstrapOptions,
    error::{DebfeedError, ErrorContext},
    DebfeedResult,
};
use debfeed_dl::http_client::configure_http_client;
use detect::detect;
use logging::{open_log_file, setup_logging, REPORT_TARGET};
use post_install::post_install;
use tracing::{debug, error, warn};
use ureq::Proxy;
use utils::set_color;

mod bootstrap;
mod cli;
mod detect;
mod logging;
mod post_install;
mod utils;

/// Parses the command line. Usage errors exit with 1; `--help` and `--version` exit with 0.
fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}

/// Sets up console logging plus the log file, warning when no log file can be opened.
fn setup_file_logging(args: &Args, config: &Config) -> DebfeedResult<()> {
    let primary = config.get_log_file()?;
    match open_log_file(&primary, &config.fallback_log_file()) {
        Ok(log_file) => {
            let path = log_file.path.clone();
            setup_logging(args, Some(log_file));
            debug!("logging to {}", path.display());
        }
        Err(failures) => {
            setup_logging(args, None);
            warn!(
                "File logging disabled, no log file could be opened ({})",
                failures.join("; ")
            );
        }
    }
    Ok(())
}

fn configure_http(args: &Args, config: &Config) -> DebfeedResult<()> {
    let proxy = args
        .proxy
        .as_deref()
        .map(Proxy::new)
        .transpose()
        .map_err(|err| DebfeedError::InvalidArguments(format!("invalid proxy: {err}")))?;
    let timeout = config.http_timeout();

    configure_http_client(|http| {
        if proxy.is_some() {
            http.proxy = proxy;
        }
        http.timeout = timeout;
    });
    Ok(())
}

fn print_config(path: &Path) -> DebfeedResult<()> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Config::default_config().to_annotated_document()?.to_string()
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading {}", path.display()));
        }
    };
    print!("{content}");
    Ok(())
}

fn handle_cli() -> DebfeedResult<()> {
    let args = parse_args();
    if args.no_color {
        set_color(false);
    }

    // credentials are checked before anything touches the filesystem, log file included
    let credentials = match &args.command {
        Commands::Bootstrap {
            access_user,
            access_token,
            ..
        } => Some(Credentials::new(access_user, access_token)?),
        _ => None,
    };

    let config_path = config_path(args.config.as_deref())?;

    match &args.command {
        Commands::Bootstrap {
            package,
            skip_install,
            ..
        } => {
            let config = Config::load(&config_path)?;
            setup_file_logging(&args, &config)?;
            configure_http(&args, &config)?;

            let credentials = credentials.ok_or_else(|| {
                DebfeedError::InvalidArguments("missing access credentials".to_string())
            })?;
            let options = BootstrapOptions {
                package: package.clone(),
                skip_install: *skip_install,
            };
            bootstrap(&config, &credentials, &options)?;
        }
        Commands::PostInstall {
            action,
            args: script_args,
        } => {
            let config = Config::load(&config_path)?;
            setup_file_logging(&args, &config)?;
            post_install(&config, action.as_deref(), script_args)?;
        }
        Commands::Detect => {
            setup_logging(&args, None);
            let config = Config::load(&config_path)?;
            detect(&config, args.json)?;
        }
        Commands::Config => print_config(&config_path)?,
        Commands::DefConfig => {
            setup_logging(&args, None);
            generate_default_config(&config_path)?;
        }
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        let cause = err.root_cause();
        if cause == err.message() {
            error!(target: REPORT_TARGET, "{}", cause);
        } else {
            error!(target: REPORT_TARGET, "{}: {}", err.message(), cause);
        }
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
