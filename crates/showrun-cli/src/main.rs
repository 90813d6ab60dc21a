mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    artist::ArtistSubcommand, broadcast::BroadcastSubcommand, event::EventSubcommand,
    order::OrderSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "showrun",
    about = "Live show running order, emergency broadcasts and dashboard sync",
    version,
    propagate_version = true
)]
struct Cli {
    /// Show root (default: nearest directory containing .showrun/)
    #[arg(long, global = true, env = "SHOWRUN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize .showrun/ in the current directory
    Init {
        /// Show name recorded in config.yaml
        #[arg(long)]
        name: Option<String>,
    },

    /// Manage events
    Event {
        #[command(subcommand)]
        subcommand: EventSubcommand,
    },

    /// Register and update artists
    Artist {
        #[command(subcommand)]
        subcommand: ArtistSubcommand,
    },

    /// Inspect and drive a running order
    Order {
        #[command(subcommand)]
        subcommand: OrderSubcommand,
    },

    /// Raise and clear emergency broadcasts
    Broadcast {
        #[command(subcommand)]
        subcommand: BroadcastSubcommand,
    },

    /// Validate the show configuration
    Config,

    /// Start the command and sync server
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Follow a lineup live from a running server, polling while disconnected
    Watch {
        event_id: String,
        /// Performance date (YYYY-MM-DD)
        date: String,
        /// Server base URL (default: http://localhost:<server.port>)
        #[arg(long)]
        url: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } | Commands::Watch { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref()),
        Commands::Event { subcommand } => cmd::event::run(&root, subcommand, cli.json),
        Commands::Artist { subcommand } => cmd::artist::run(&root, subcommand, cli.json),
        Commands::Order { subcommand } => cmd::order::run(&root, subcommand, cli.json),
        Commands::Broadcast { subcommand } => cmd::broadcast::run(&root, subcommand, cli.json),
        Commands::Config => cmd::config::run(&root, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Watch {
            event_id,
            date,
            url,
        } => cmd::watch::run(&root, &event_id, &date, url, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
