use clap::Parser;

/// Command-line arguments for the sync service.
#[derive(Debug, Parser)]
#[command(
    name = "gchat-bridge-discourse",
    about = "Keeps Google Chat spaces and Discourse categories in sync",
    version
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.yaml", env = "CONFIG_PATH")]
    pub config: String,

    /// Exit the process on the first sync error instead of continuing with
    /// the next space or event.
    #[arg(short = 'E', long)]
    pub exit_on_error: bool,
}
