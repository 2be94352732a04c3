use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Set proxy for key downloads
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trust and enable the package feeds, then install the package
    #[command(arg_required_else_help = true)]
    Bootstrap {
        /// User for the authenticated feed
        access_user: String,

        /// Token for the authenticated feed
        access_token: String,

        /// Install this package instead of the configured one
        #[arg(required = false, long)]
        package: Option<String>,

        /// Configure the feeds and refresh the index without installing
        #[arg(required = false, long)]
        skip_install: bool,
    },

    /// Link, validate and activate the packaged configuration
    ///
    /// Meant to be called from the package's postinst script with its arguments.
    #[clap(name = "post-install")]
    PostInstall {
        /// Maintainer script action (e.g. configure, abort-upgrade)
        action: Option<String>,

        /// Remaining maintainer script arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the detected distribution and APT source format
    Detect,

    /// Print the configuration file to stdout
    Config,

    /// Generate default config
    #[clap(name = "defconfig")]
    DefConfig,
}
