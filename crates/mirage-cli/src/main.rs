use clap::{Parser, Subcommand};
use mirage_core::HttpMethod;
use mirage_core::config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "mirage",
    version,
    about = "Serve HTTP endpoints that a language model implements at request time"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, short = 'c', global = true, env = "MIRAGE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log filter (overrides RUST_LOG), e.g. "debug" or "mirage_gateway=debug"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server for the configured endpoints.
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the first port to try
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },

    /// Manage endpoint definitions.
    Endpoints {
        #[command(subcommand)]
        cmd: EndpointsCommand,
    },

    /// Schema snapshot management.
    Schema {
        #[command(subcommand)]
        cmd: SchemaCommand,
    },

    /// Print the Markdown documentation served at /docs.
    Docs,
}

#[derive(Subcommand, Debug)]
enum EndpointsCommand {
    /// List configured endpoints in match order.
    List,

    /// Add an endpoint.
    Add {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        #[arg(long, short = 'm')]
        method: HttpMethod,

        /// Path pattern, e.g. /items/{id}
        #[arg(long)]
        path: String,

        /// What the endpoint does
        #[arg(long, short = 'd')]
        description: String,

        /// How to implement it (steps, response shape, error handling)
        #[arg(long, default_value = "")]
        implementation: String,

        /// Endpoint name (derived from the path when omitted)
        #[arg(long)]
        name: Option<String>,
    },

    /// Change fields of an existing endpoint.
    Update {
        /// Endpoint name
        name: String,

        /// New HTTP method
        #[arg(long, short = 'm')]
        method: Option<HttpMethod>,

        /// New path pattern
        #[arg(long)]
        path: Option<String>,

        /// New description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// New implementation notes
        #[arg(long)]
        implementation: Option<String>,
    },

    /// Remove an endpoint by name.
    Remove { name: String },
}

#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Introspect the configured store and save the snapshot into the config.
    Refresh,

    /// Print the saved snapshot as JSON.
    Show,
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.cmd {
        Command::Serve { host, port } => commands::serve::run(&cli.config, host, port).await?,

        Command::Endpoints { cmd } => match cmd {
            EndpointsCommand::List => commands::endpoints::list(&cli.config)?,
            EndpointsCommand::Add {
                method,
                path,
                description,
                implementation,
                name,
            } => commands::endpoints::add(
                &cli.config,
                commands::endpoints::NewEndpoint {
                    name,
                    method,
                    path,
                    description,
                    implementation,
                },
            )?,
            EndpointsCommand::Update {
                name,
                method,
                path,
                description,
                implementation,
            } => commands::endpoints::update(
                &cli.config,
                &name,
                commands::endpoints::EndpointChanges {
                    method,
                    path,
                    description,
                    implementation,
                },
            )?,
            EndpointsCommand::Remove { name } => commands::endpoints::remove(&cli.config, &name)?,
        },

        Command::Schema { cmd } => match cmd {
            SchemaCommand::Refresh => commands::schema::refresh(&cli.config).await?,
            SchemaCommand::Show => commands::schema::show(&cli.config)?,
        },

        Command::Docs => commands::docs::print(&cli.config)?,
    }

    Ok(())
}
