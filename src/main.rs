use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use wx_core::Config;
use wx_proxy::DevServer;

#[derive(Debug, Parser)]
#[command(name = "wx", version, about = "Frontend dev server with a geocoding backend")]
struct Cli {
    /// Config file (defaults to ./wx.toml, then the user config directory)
    #[arg(long, short, global = true, env = "WX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the development server (plugins and proxy rules)
    Dev {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the geocoding backend
    Backend {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    wx_core::init()?;

    let path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    match cli.command {
        Command::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default().save_to(&path)?;
            println!("Wrote {}", path.display());
        }
        Command::Show => {
            let resolved = Config::load_resolved(&path)?;
            let rendered =
                toml::to_string_pretty(&resolved.to_config()).context("Failed to render config")?;
            print!("{}", rendered);
        }
        Command::Dev { port } => {
            let mut config = Config::load_from(&path)?;
            if let Some(port) = port {
                config.server.port = port;
            }
            let resolved = wx_core::define_config(config)?;
            DevServer::new(resolved)?.serve().await?;
        }
        Command::Backend { port } => {
            let mut config = Config::load_from(&path)?;
            if let Some(port) = port {
                config.backend.port = port;
            }
            let resolved = wx_core::define_config(config)?;
            wx_geocode::serve(resolved.backend()).await?;
        }
    }

    Ok(())
}
