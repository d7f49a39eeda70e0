use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/app.db)
  PORT        (default: 5151 or config.listen_port)

Without a subcommand, runs the HTTP server.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "chorepoints-server",
    version,
    about = "ChorePoints family points server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Optional subcommand. Without one, runs the server.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recompute goal progress and correct drifted goal statuses
    Reconcile {
        /// Compute and report without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Reconcile a single goal instead of all
        #[arg(long)]
        goal_id: Option<i32>,
    },
}
