mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use sitecopy_storage::{ItemId, TenantId};
use tracing_subscriber::EnvFilter;

use commands::SiteArg;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Copy content items between the sites of a multi-site installation.
#[derive(Parser)]
#[command(
    name = "sitecopy",
    version,
    about = "Copy content items between the sites of a multi-site installation"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Installation snapshot (JSON)
    #[arg(long, global = true, default_value = "sitecopy.json")]
    state: PathBuf,

    /// Settings file (TOML)
    #[arg(long, global = true, default_value = "sitecopy.toml")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an installation snapshot and activate the settings file
    Init {
        /// Upload directory, relative to the snapshot's directory
        #[arg(long, default_value = "uploads")]
        uploads: PathBuf,
        /// A site as <id>,<name>,<home url>; repeat for every site
        #[arg(long = "site", required = true)]
        sites: Vec<SiteArg>,
        /// Overwrite an existing snapshot
        #[arg(long)]
        force: bool,
    },

    /// List the bulk clone actions offered on a site
    Actions {
        /// Site whose item list shows the menu
        #[arg(long)]
        site: TenantId,
        /// Content type of the list
        #[arg(long, default_value = "post")]
        post_type: String,
    },

    /// Clone items from one site into another
    Clone {
        /// Source site
        #[arg(long)]
        from: TenantId,
        /// Destination site
        #[arg(long)]
        to: TenantId,
        /// Admin list URL the notice arguments are added to
        #[arg(long, default_value = "edit.php")]
        redirect: String,
        /// Ids of the items to clone, in the source site
        #[arg(required = true)]
        items: Vec<ItemId>,
    },

    /// Check the notice carried by a bulk-action redirect URL
    Verify {
        /// Redirect URL returned by `clone`
        url: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let ctx = commands::Context {
        state: &cli.state,
        settings: &cli.settings,
        output: cli.output,
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Init {
            uploads,
            sites,
            force,
        } => commands::cmd_init(&ctx, uploads, sites, *force),
        Commands::Actions { site, post_type } => commands::cmd_actions(&ctx, *site, post_type),
        Commands::Clone {
            from,
            to,
            redirect,
            items,
        } => commands::cmd_clone(&ctx, *from, *to, redirect, items),
        Commands::Verify { url } => commands::cmd_verify(&ctx, url),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`, `error` with
/// `--quiet`).
fn init_logging(quiet: bool) {
    let default = if quiet { "error" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}

/// Unwrap `result` or report the error and exit 1.
pub(crate) fn or_exit<T, E: std::fmt::Display>(
    result: Result<T, E>,
    output: OutputFormat,
    quiet: bool,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
