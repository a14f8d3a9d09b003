use anyhow::Result;
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

use brolly::commands::{run_command, CommandOutcome};
use brolly::events::UiEvent;
use brolly::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    brolly::logging::init();

    let AppState { handle, mut events } = AppState::new().await?;

    // Render controller events as they arrive.
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => render(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    error!("Dropped {} events; terminal is falling behind", missed);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("brolly ready; type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match run_command(&handle, line.trim()).await {
            CommandOutcome::Handled => {}
            CommandOutcome::Unknown(command) => {
                println!("unknown command: {} (try 'help')", command)
            }
            CommandOutcome::Quit => break,
        }
    }

    info!("Shutting down");
    handle.shutdown().await;
    printer.abort();
    Ok(())
}

fn render(event: &UiEvent) {
    match event {
        UiEvent::ScanStarted => println!("scanning..."),
        UiEvent::DeviceFound(device) => println!(
            "found {} [{}] {} dBm",
            device.display_name, device.id, device.signal_strength
        ),
        UiEvent::ScanFinished { discovered: 0 } => println!("scan finished: no umbrellas found"),
        UiEvent::ScanFinished { discovered } => println!(
            "scan finished: {} umbrella(s) found; 'connect <n>' to connect",
            discovered
        ),
        UiEvent::Connecting { device_id } => println!("connecting to {}...", device_id),
        UiEvent::Connected { device_id } => println!("connected to {}", device_id),
        UiEvent::ConnectFailed { reason } => println!("connection failed: {}", reason),
        UiEvent::LinkLost => println!("UMBRELLA LOST - alerting until it is back in range"),
        UiEvent::Disconnected => println!("disconnected"),
        UiEvent::BondForgotten => println!("bonded umbrella forgotten"),
        UiEvent::PermissionDenied(capability) => {
            println!("required capability denied: {:?}", capability)
        }
        UiEvent::Busy => println!("busy: another connect attempt is in progress"),
    }
}
