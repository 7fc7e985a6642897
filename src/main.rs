#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io::Write;
use supportbot::{agent, gateway, providers, Config};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// `supportbot` - customer support bot behind a single HTTP endpoint.
#[derive(Parser, Debug)]
#[command(name = "supportbot")]
#[command(version)]
#[command(about = "Support bot gateway with a deterministic mock fallback.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    #[command(long_about = "\
Start the HTTP gateway.

Serves POST /ask and GET /health. Without an API key the bot answers \
from its built-in support replies (mock mode).

Examples:
  supportbot serve                  # use config defaults
  supportbot serve -p 8080          # listen on port 8080
  supportbot serve --host 0.0.0.0   # bind to all interfaces")]
    Serve {
        /// Port to listen on (use 0 for random available port); defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Answer a single message and exit
    #[command(long_about = "\
Answer a single message and print the reply.

Examples:
  supportbot ask -m \"How do I reset my password?\"")]
    Ask {
        /// Message to answer
        #[arg(short, long)]
        message: String,
    },

    /// Show configuration and responder mode
    Status,

    /// List supported model providers
    Providers,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completion script to stdout
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("SUPPORTBOT_CONFIG_DIR", config_dir);
    }

    // Completions must remain stdout-only and should not load config or initialize logging.
    if let Commands::Completions { shell } = &cli.command {
        let mut stdout = std::io::stdout().lock();
        write_shell_completion(*shell, &mut stdout)?;
        return Ok(());
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Config {
        config_command: ConfigCommands::Schema,
    } = &cli.command
    {
        let schema = schemars::schema_for!(Config);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let config = Config::load_or_init().await?;

    match cli.command {
        Commands::Completions { .. } | Commands::Config { .. } => unreachable!(),

        Commands::Serve { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            info!("Starting supportbot gateway on {host}:{port}");
            gateway::run_gateway(&host, port, config).await
        }

        Commands::Ask { message } => {
            let reply = agent::run_once(&config, &message).await?;
            println!("{reply}");
            Ok(())
        }

        Commands::Status => {
            println!("🤖 supportbot Status");
            println!();
            println!("Version:   {}", env!("CARGO_PKG_VERSION"));
            println!("Config:    {}", config.config_path.display());
            println!();
            println!(
                "Mode:      {}",
                if config.has_credential() { "live" } else { "mock" }
            );
            println!("Provider:  {}", config.agent.provider);
            println!("Model:     {}", config.agent.model);
            println!("Temp:      {}", config.agent.temperature);
            println!(
                "API URL:   {}",
                config.api_url.as_deref().unwrap_or("(default)")
            );
            println!();
            println!(
                "Gateway:   {}:{}",
                config.gateway.host, config.gateway.port
            );
            Ok(())
        }

        Commands::Providers => {
            let providers = providers::list_providers();
            println!("Supported providers ({} total):\n", providers.len());
            println!("  ID (use in config)  DESCRIPTION");
            for p in &providers {
                let marker = if p.name.eq_ignore_ascii_case(config.agent.provider.trim()) {
                    " (active)"
                } else {
                    ""
                };
                println!(
                    "  {:<19} {} [{}]{}",
                    p.name, p.display_name, p.credential_env, marker
                );
            }
            Ok(())
        }
    }
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name.clone(), writer),
        CompletionShell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, bin_name.clone(), writer);
        }
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}
