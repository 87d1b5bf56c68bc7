//! CLI Module
//!
//! Command-line interface for the ambient mixer.

pub mod commands;
pub mod session;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ambient Mixer - layer looping nature sounds into a mix
#[derive(Parser, Debug)]
#[command(name = "ambient-mixer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the user config path)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the track catalog and whether each track loads
    #[command(name = "tracks")]
    Tracks {
        /// Check that every track source exists and is readable
        #[arg(long)]
        check_sources: bool,
    },

    /// List built-in and custom presets
    #[command(name = "presets")]
    Presets,

    /// Save a mix as a custom preset without playing it
    #[command(name = "save-preset")]
    SavePreset {
        /// Preset name
        name: String,

        /// Track volumes, e.g. `rain=60,wind=25`
        #[arg(short, long, value_delimiter = ',', required = true)]
        mix: Vec<String>,
    },

    /// Delete a custom preset
    #[command(name = "delete-preset")]
    DeletePreset {
        /// Preset id (`custom_...`)
        id: String,
    },

    /// Run an interactive mixing session
    #[command(name = "session")]
    Session {
        /// Check that every track source exists and is readable
        #[arg(long)]
        check_sources: bool,
    },

    /// Write the default configuration to the user config path
    #[command(name = "init-config")]
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
