//! Dirauth - directory authentication admin tool
//!
//! Tests LDAP configuration, looks up users and groups, and verifies
//! credentials against a configured directory server.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use dirauth_core::DirauthConfig;
use dirauth_ldap::LdapClient;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirauth")]
#[command(author = "Dirauth Team")]
#[command(version = dirauth_core::VERSION)]
#[command(about = "Directory authentication admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DIRAUTH_CONFIG")]
    config: Option<String>,

    /// LDAP server URL
    #[arg(long, global = true, env = "DIRAUTH_LDAP_URL")]
    url: Option<String>,

    /// Search base DN
    #[arg(long, global = true, env = "DIRAUTH_LDAP_BASE_DN")]
    base_dn: Option<String>,

    /// DN used for searching
    #[arg(long, global = true, env = "DIRAUTH_LDAP_SEARCH_DN")]
    search_dn: Option<String>,

    /// Skip certificate verification for ldaps
    #[arg(long, global = true)]
    insecure: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DIRAUTH_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Apply command-line flags on top of the loaded configuration
    fn apply_overrides(&self, config: &mut DirauthConfig) {
        if let Some(url) = &self.url {
            config.ldap.url = url.clone();
        }
        if let Some(base_dn) = &self.base_dn {
            config.ldap.base_dn = base_dn.clone();
        }
        if let Some(search_dn) = &self.search_dn {
            config.ldap.search_dn = search_dn.clone();
        }
        if self.insecure {
            config.ldap.verify_cert = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Test connectivity and the search identity's credential
    Ping,

    /// Search users by name; an empty name matches everyone
    Search {
        #[arg(default_value = "")]
        username: String,
    },

    /// Authenticate a user
    Auth {
        username: String,

        /// User password
        #[arg(long, env = "DIRAUTH_AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Look up groups by name, or a single group by DN
    Group {
        #[arg(default_value = "")]
        name: String,

        /// Treat the argument as a group DN
        #[arg(long)]
        dn: bool,
    },

    /// Show the effective configuration
    Config,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load or create config
    let mut config = if let Some(config_path) = &cli.config {
        DirauthConfig::from_file(config_path)?
    } else {
        DirauthConfig::from_env()
    };

    cli.apply_overrides(&mut config);

    init_logging(&config);
    debug!("Effective configuration: {:?}", config.ldap);

    if !matches!(cli.command, Commands::Version | Commands::Config) {
        config.validate()?;
    }

    let ctx = CommandContext {
        client: Arc::new(LdapClient::with_ldap3(config.mapping.clone())),
        config,
        output_format: cli.output,
    };

    match cli.command {
        Commands::Ping => commands::ping::execute(&ctx).await,
        Commands::Search { username } => commands::search::execute(&ctx, &username).await,
        Commands::Auth { username, password } => {
            commands::auth::execute(&ctx, &username, &password).await
        }
        Commands::Group { name, dn } => commands::group::execute(&ctx, &name, dn).await,
        Commands::Config => commands::show_config(&ctx),
        Commands::Version => {
            println!("dirauth {}", dirauth_core::VERSION);
            Ok(())
        }
    }
}

fn init_logging(config: &DirauthConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
