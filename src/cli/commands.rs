use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `Unfurler` - safe link previews for chat and team apps.
#[derive(Parser, Debug)]
#[command(name = "unfurler")]
#[command(version = "0.1.0")]
#[command(about = "Fetch a URL safely and extract a link preview.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.unfurler/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Unfurl one URL and print the outcome as JSON
    Fetch {
        /// URL to unfurl
        url: String,

        /// End-to-end deadline in milliseconds (default: unfurl.deadline_secs)
        #[arg(long)]
        deadline_ms: Option<u64>,
    },

    /// Serve `POST /link/unfurl` over HTTP
    Serve {
        /// Port to listen on (default: gateway.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (default: gateway.host)
        #[arg(long)]
        host: Option<String>,
    },
}
