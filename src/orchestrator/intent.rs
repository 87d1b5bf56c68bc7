//! User intents
//!
//! One variant per thing a user can ask the mixer to do. Text commands from
//! the interactive shell parse into the same enum, so the dispatch table in
//! [`AmbientMixer::dispatch`](super::AmbientMixer::dispatch) is the only
//! place intents are interpreted.

use clap::{Parser, Subcommand};

use crate::engine::{ToggleAllReport, ToggleOutcome, Volume};
use crate::error::{MixerError, Result};
use crate::presets::PresetId;
use crate::tracks::{StartTicket, TrackId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ToggleTrack(String),
    SetTrackVolume { track: String, volume: Volume },
    SetMasterVolume(Volume),
    ToggleAll,
    ResetAll,
    LoadPreset { key: String, custom: bool },
    SavePreset(String),
    DeletePreset(String),
    StartTimer(i64),
    StopTimer,
}

/// What a dispatched intent did.
#[derive(Debug)]
pub enum Outcome {
    Track(ToggleOutcome),
    All(ToggleAllReport),
    PresetLoaded(PresetLoadReport),
    PresetSaved(PresetId),
    PresetDeleted(bool),
    Done,
}

/// Per-entry results of loading a preset. Entries that failed stay at their
/// preset volume but paused.
#[derive(Debug, Default)]
pub struct PresetLoadReport {
    pub started: Vec<TrackId>,
    pub pending: Vec<StartTicket>,
    pub failed: Vec<(TrackId, MixerError)>,
}

impl PresetLoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true, disable_help_subcommand = true)]
struct CommandLine {
    #[command(subcommand)]
    command: TextCommand,
}

#[derive(Subcommand, Debug)]
enum TextCommand {
    /// Play or pause a track
    Toggle { track: String },

    /// Set a track's volume (0-100)
    Volume { track: String, volume: String },

    /// Set the master volume (0-100)
    Master { volume: String },

    /// Play everything, or pause everything if something plays
    All,

    /// Stop everything and clear the mix
    Reset,

    /// Load a preset
    Preset {
        key: String,

        /// Load from the custom presets
        #[arg(short, long)]
        custom: bool,
    },

    /// Save the current mix as a custom preset
    Save {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Delete a custom preset
    Delete { id: String },

    /// Start a countdown in minutes, 0 to cancel
    Timer {
        #[arg(allow_negative_numbers = true)]
        minutes: i64,
    },

    /// Cancel the countdown
    #[command(name = "stop-timer")]
    StopTimer,
}

impl Intent {
    /// Parse one shell line (`volume rain 60`, `preset --custom custom_1`, ...).
    pub fn parse_line(line: &str) -> Result<Self> {
        let words = line.split_whitespace();
        let parsed = CommandLine::try_parse_from(words).map_err(|e| MixerError::InvalidCommand {
            input: line.trim().to_string(),
            reason: e.kind().as_str().unwrap_or("unrecognized command").to_string(),
        })?;

        Ok(match parsed.command {
            TextCommand::Toggle { track } => Intent::ToggleTrack(track),
            TextCommand::Volume { track, volume } => Intent::SetTrackVolume {
                track,
                volume: volume.parse()?,
            },
            TextCommand::Master { volume } => Intent::SetMasterVolume(volume.parse()?),
            TextCommand::All => Intent::ToggleAll,
            TextCommand::Reset => Intent::ResetAll,
            TextCommand::Preset { key, custom } => Intent::LoadPreset { key, custom },
            TextCommand::Save { name } => Intent::SavePreset(name.join(" ")),
            TextCommand::Delete { id } => Intent::DeletePreset(id),
            TextCommand::Timer { minutes } => Intent::StartTimer(minutes),
            TextCommand::StopTimer => Intent::StopTimer,
        })
    }

    /// One line per text command, for the shell's help output.
    pub fn usage() -> &'static str {
        "toggle <track>            play or pause a track\n\
         volume <track> <0-100>    set a track's volume\n\
         master <0-100>            set the master volume\n\
         all                       play all, or pause all if something plays\n\
         reset                     stop everything and clear the mix\n\
         preset [--custom] <key>   load a preset\n\
         save <name>               save the current mix\n\
         delete <id>               delete a custom preset\n\
         timer <minutes>           start a countdown, 0 cancels\n\
         stop-timer                cancel the countdown"
    }
}
