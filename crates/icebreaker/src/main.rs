//! Icebreaker CLI: serve the API, run a batch from the terminal, or write a
//! starter configuration file.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use icebreaker_api::run_server;
use icebreaker_kernel::{BatchRequest, LeadPipeline};
use icebreaker_types::{IcebreakerConfig, Provider};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "icebreaker", version)]
#[command(about = "Personalized LinkedIn outreach drafts from profile URLs", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.icebreaker/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API for the browser UI
    Serve {
        /// Address to bind, overriding the config file
        #[arg(long)]
        listen: Option<String>,
    },
    /// Draft outreach for profile URLs and print the results as JSON
    Run {
        #[arg(long, default_value = "openai")]
        provider: Provider,
        /// What you are offering; leave empty for a pure networking message
        #[arg(long, default_value = "")]
        offer: String,
        /// Extra instructions appended to the prompt
        #[arg(long)]
        instructions: Option<String>,
        /// File with one profile URL per line
        #[arg(long)]
        file: Option<PathBuf>,
        /// Profile URLs
        urls: Vec<String>,
    },
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config_path = cli.config.unwrap_or_else(IcebreakerConfig::default_path);

    match cli.command {
        Commands::Serve { listen } => {
            let config = load_config(&config_path)?;
            let listen = listen.unwrap_or_else(|| config.listen_addr.clone());
            run_server(config, &listen)
                .await
                .with_context(|| format!("API server failed on {listen}"))?;
        }
        Commands::Run {
            provider,
            offer,
            instructions,
            file,
            urls,
        } => {
            let config = load_config(&config_path)?;
            let leads = match file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            // Credentials come from the environment variables named in the config.
            let batch = BatchRequest {
                scraper_token: String::new(),
                api_key: String::new(),
                provider,
                profile_urls: urls,
                leads,
                custom_prompt: instructions,
                my_offer: Some(offer),
            };
            if batch.urls().is_empty() {
                bail!("No profile URLs given; pass them as arguments or with --file");
            }

            let pipeline = LeadPipeline::new(config);
            let results = pipeline.process_batch(&batch).await;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Init { force } => {
            if config_path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    config_path.display()
                );
            }
            IcebreakerConfig::default().save(&config_path)?;
            info!(path = %config_path.display(), "Wrote default config");
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<IcebreakerConfig> {
    let config = IcebreakerConfig::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_parses_provider_and_urls() {
        let cli = Cli::parse_from([
            "icebreaker",
            "run",
            "--provider",
            "Gemini",
            "https://linkedin.com/in/a",
            "https://linkedin.com/in/b",
        ]);
        match cli.command {
            Commands::Run { provider, urls, .. } => {
                assert_eq!(provider, Provider::Gemini);
                assert_eq!(urls.len(), 2);
            }
            _ => panic!("expected run"),
        }
    }
}
