//! Ambient Mixer CLI
//!
//! Command-line interface for the ambient sound mixer.

use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use ambient_mixer::cli::{commands, session, Cli, Commands};
use ambient_mixer::{Config, MixerError};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("Ambient Mixer v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        if let Some(hint) = e.recovery_suggestion() {
            eprintln!("hint: {}", hint);
        }
        return Err(e.into());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), MixerError> {
    let Some(command) = cli.command else {
        println!("Ambient Mixer v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for available commands");
        return Ok(());
    };

    let config_path = cli.config.as_deref();
    let load = || -> Result<Config, MixerError> {
        let config = Config::load(config_path)?;
        info!("Presets stored in {}", config.data_dir.display());
        Ok(config)
    };

    match command {
        Commands::Tracks { check_sources } => commands::list_tracks(&load()?, check_sources),
        Commands::Presets => commands::list_presets(&load()?),
        Commands::SavePreset { name, mix } => commands::save_preset(&load()?, &name, &mix),
        Commands::DeletePreset { id } => commands::delete_preset(&load()?, &id),
        Commands::Session { check_sources } => session::run(&load()?, check_sources),
        Commands::InitConfig { force } => commands::init_config(config_path, force),
    }
}
