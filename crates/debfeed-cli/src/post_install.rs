use debfeed_config::config::Config;
use debfeed_core::{
    command::SystemCommandRunner,
    hook::{run_post_install, should_run},
    DebfeedResult,
};
use nu_ansi_term::Color::{Green, Yellow};
use tracing::{debug, info};

use crate::utils::{Colored, Icons};

pub fn post_install(config: &Config, action: Option<&str>, args: &[String]) -> DebfeedResult<()> {
    debug!("post-install action {:?} with {:?}", action, args);

    if !should_run(action) {
        info!(
            "Nothing to do for '{}'",
            action.unwrap_or_default()
        );
        return Ok(());
    }

    let report = run_post_install(&config.hook, &SystemCommandRunner)?;

    info!(
        "{} {} {} {}",
        Colored(Green, Icons::CHECK),
        report.destination.display(),
        Icons::ARROW,
        report.source.display()
    );
    if !report.restarted {
        info!(
            "{}",
            Colored(Yellow, "Service was not restarted; restart it manually")
        );
    }

    Ok(())
}
