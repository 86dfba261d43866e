use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use periovox::app::run_chart_command;
use periovox::cli::{Cli, Commands, ConfigAction};
use periovox::config::Config;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            run_chart_command(config, &cli).await?;
        }
        Some(Commands::Devices) => {
            list_audio_devices()?;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
    }

    Ok(())
}

fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    Config::default_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = config_path(explicit)?;
    let config = if explicit.is_some() {
        // An explicitly named config file must exist
        Config::load(&path)?
    } else {
        Config::load_or_default(&path)?
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn list_audio_devices() -> Result<()> {
    #[cfg(feature = "cpal-audio")]
    {
        let devices = periovox::audio::capture::list_devices()?;
        if devices.is_empty() {
            println!("No audio input devices found.");
        } else {
            println!("Available audio input devices:");
            for device in devices {
                println!("  {}", device);
            }
        }
        Ok(())
    }
    #[cfg(not(feature = "cpal-audio"))]
    {
        anyhow::bail!("built without microphone support")
    }
}

fn handle_config_command(action: &ConfigAction, explicit: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(explicit)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init => {
            let path = config_path(explicit)?;
            if path.exists() {
                println!("Config already exists at {}", path.display());
                return Ok(());
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, Config::default().to_toml()?)?;
            println!("{} wrote {}", "created:".green(), path.display());
        }
    }
    Ok(())
}
