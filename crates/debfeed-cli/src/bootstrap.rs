use debfeed_config::config::Config;
use debfeed_core::{
    auth::Credentials,
    bootstrap::{BootstrapContext, BootstrapOptions},
    command::SystemCommandRunner,
    keyring::HttpKeySource,
    DebfeedResult,
};
use nu_ansi_term::Color::{Blue, Cyan, Green};
use tracing::info;

use crate::utils::{Colored, Icons};

pub fn bootstrap(
    config: &Config,
    credentials: &Credentials,
    options: &BootstrapOptions,
) -> DebfeedResult<()> {
    let runner = SystemCommandRunner;
    let keys = HttpKeySource;

    let report = BootstrapContext::new(config, &runner, &keys).run(credentials, options)?;

    for feed in &report.feeds {
        info!(
            "{} {} {} {}",
            Colored(Green, Icons::CHECK),
            Colored(Cyan, &feed.name),
            Icons::ARROW,
            feed.source.display()
        );
    }

    match report.installed {
        Some(package) => info!("Installed {}", Colored(Blue, package)),
        None => info!("Feeds configured for {}", report.identity),
    }

    Ok(())
}
