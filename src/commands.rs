//! User commands
//! This module maps the lines typed on the terminal to presence
//! controller calls, the way a tap on a button would on the original
//! surface.

use crate::core::presence::PresenceHandle;

/// Outcome of running one command line
pub enum CommandOutcome {
    Handled,
    Quit,
    Unknown(String),
}

const HELP: &str = "\
commands:
  scan              start a fresh scan for umbrellas
  devices           list discovered umbrellas, strongest signal first
  connect <n|id>    connect to list entry n or to a device id
  disconnect        disconnect (also silences a lost umbrella)
  forget            forget the bonded umbrella
  status            show the current phase
  help              show this help
  quit              exit";

/// Runs a single command line against the controller.
pub async fn run_command(handle: &PresenceHandle, line: &str) -> CommandOutcome {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return CommandOutcome::Handled;
    };

    match command {
        "scan" => handle.scan().await,
        "devices" => {
            let devices = handle.devices().await;
            if devices.is_empty() {
                println!("no umbrellas discovered");
            }
            for (index, device) in devices.iter().enumerate() {
                println!(
                    "{:>3}. {} [{}] {} dBm",
                    index + 1,
                    device.display_name,
                    device.id,
                    device.signal_strength
                );
            }
        }
        "connect" => match parts.next() {
            Some(argument) => match resolve_target(handle, argument).await {
                Some(device_id) => handle.connect(device_id).await,
                None => println!("no such device: {}", argument),
            },
            None => println!("usage: connect <n|id>"),
        },
        "disconnect" => handle.disconnect().await,
        "forget" => handle.forget().await,
        "status" => {
            if let Some(report) = handle.status().await {
                println!("{}", report.describe());
            }
        }
        "help" => println!("{}", HELP),
        "quit" | "exit" => return CommandOutcome::Quit,
        other => return CommandOutcome::Unknown(other.to_string()),
    }
    CommandOutcome::Handled
}

/// A numeric argument selects from the sorted discovered list (1-based);
/// anything else is taken as a raw device id.
async fn resolve_target(handle: &PresenceHandle, argument: &str) -> Option<String> {
    if let Ok(index) = argument.parse::<usize>() {
        let devices = handle.devices().await;
        return devices.get(index.checked_sub(1)?).map(|d| d.id.clone());
    }
    Some(argument.to_string())
}
