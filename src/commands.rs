//! Console commands
//!
//! ```text
//! controller list                 connected devices, in connection order
//! controller info <index>         channels, hats and buttons of one device
//! acm dbupdate check              fetch the controller mapping database now
//! acm dbupdate enable|disable     toggle the automatic fetch at start-up
//! ```
//!
//! Commands only read device state and the mapping database settings; anything
//! that needs the running loop is returned as a [`ConsoleAction`].

use clap::{Parser, Subcommand};
use std::fmt::Write;
use tracing::{debug, info};

use crate::controller::backend::{HAT_DOWN, HAT_LEFT, HAT_RIGHT, HAT_UP};
use crate::controller::device_sampler::{DeviceSampler, DeviceState};
use crate::controller::mapping_db::MappingDbSettings;

#[derive(Parser, Debug)]
#[command(name = "console", no_binary_name = true, disable_version_flag = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect connected devices
    Controller {
        #[command(subcommand)]
        action: ControllerAction,
    },
    /// Configure the controls subsystem
    Acm {
        #[command(subcommand)]
        action: AcmAction,
    },
}

#[derive(Subcommand, Debug)]
enum ControllerAction {
    /// List all connected devices
    List,
    /// Show info of the device at index
    Info { index: usize },
}

#[derive(Subcommand, Debug)]
enum AcmAction {
    /// Controller mapping database updates
    Dbupdate {
        #[command(subcommand)]
        action: DbUpdateAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum DbUpdateAction {
    /// Check for a controller database update now
    Check,
    /// Enable automatic controller database updates
    Enable,
    /// Disable automatic controller database updates
    Disable,
}

// Command errors
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("{0}")]
    Parse(String),

    #[error("No device at index {0}")]
    NoDevice(usize),
}

/// Follow-up work for the running loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    CheckMappingDb,
    SaveConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub message: String,
    pub action: Option<ConsoleAction>,
}

impl CommandOutcome {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            action: None,
        }
    }

    fn with_action(message: impl Into<String>, action: ConsoleAction) -> Self {
        Self {
            message: message.into(),
            action: Some(action),
        }
    }
}

/// Parses and runs one console line
pub fn execute(
    line: &str,
    sampler: &DeviceSampler,
    mapping_db: &mut MappingDbSettings,
) -> Result<CommandOutcome, CommandError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Err(CommandError::Empty);
    }
    debug!("Console command: {:?}", words);
    let parsed =
        ConsoleLine::try_parse_from(words).map_err(|e| CommandError::Parse(e.to_string()))?;

    match parsed.command {
        Command::Controller {
            action: ControllerAction::List,
        } => Ok(CommandOutcome::message(list_devices(sampler))),
        Command::Controller {
            action: ControllerAction::Info { index },
        } => sampler
            .device_at(index)
            .map(|device| CommandOutcome::message(describe_device(index, device)))
            .ok_or(CommandError::NoDevice(index)),
        Command::Acm {
            action: AcmAction::Dbupdate { action },
        } => Ok(db_update(action, mapping_db)),
    }
}

fn list_devices(sampler: &DeviceSampler) -> String {
    if sampler.device_count() == 0 {
        return "No devices connected.".to_string();
    }
    let mut result = String::from("Controller list:\n");
    for (index, device) in sampler.devices().enumerate() {
        let info = device.info();
        let _ = writeln!(result, "{}: {} ({})", index, info.name, info.kind);
        let _ = writeln!(result, "\tGuid: {}", info.guid);
    }
    result
}

fn hat_directions(value: u8) -> String {
    let names: Vec<&str> = [
        (HAT_UP, "up"),
        (HAT_RIGHT, "right"),
        (HAT_DOWN, "down"),
        (HAT_LEFT, "left"),
    ]
    .into_iter()
    .filter(|(bit, _)| value & bit != 0)
    .map(|(_, name)| name)
    .collect();
    if names.is_empty() {
        "centered".to_string()
    } else {
        names.join("+")
    }
}

fn describe_device(index: usize, device: &DeviceState) -> String {
    let info = device.info();
    let mut result = format!("{}: {} ({})\n", index, info.name, info.kind);
    let _ = writeln!(result, "\tGuid: {}", info.guid);
    let _ = writeln!(
        result,
        "\tConnected: {}",
        device.connected_at().format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(result, "\tChannels: {}", device.channel_count());
    for channel in 0..device.channel_count() {
        if let Some(name) = device.channel_name(channel) {
            let _ = writeln!(result, "\t  {}: {}", channel, name);
        }
    }
    let _ = writeln!(result, "\tHats: {}", info.num_hats);
    for hat in 0..info.num_hats {
        let value = device.hat(hat).unwrap_or_default();
        let _ = writeln!(result, "\t  {}: {}", hat, hat_directions(value));
    }
    let pressed: Vec<String> = (0..info.num_buttons)
        .filter(|button| device.button(*button).unwrap_or(false))
        .map(|button| button.to_string())
        .collect();
    let _ = writeln!(
        result,
        "\tButtons: {} (pressed: {})",
        info.num_buttons,
        if pressed.is_empty() {
            "none".to_string()
        } else {
            pressed.join(", ")
        }
    );
    result
}

fn db_update(action: DbUpdateAction, settings: &mut MappingDbSettings) -> CommandOutcome {
    match action {
        DbUpdateAction::Check => CommandOutcome::with_action(
            "Checking for controller DB updates ...",
            ConsoleAction::CheckMappingDb,
        ),
        DbUpdateAction::Enable => {
            settings.enabled = true;
            info!("Controller DB update checker enabled");
            CommandOutcome::with_action(
                "Controller DB update checker enabled.",
                ConsoleAction::SaveConfig,
            )
        }
        DbUpdateAction::Disable => {
            settings.enabled = false;
            info!("Controller DB update checker disabled");
            CommandOutcome::with_action(
                "Controller DB update checker disabled.",
                ConsoleAction::SaveConfig,
            )
        }
    }
}
