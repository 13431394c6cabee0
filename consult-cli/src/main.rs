use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use consult_core::{ConnectionState, ParticipantId, RoomId};
use consult_rtc::{
    CallConfig, CallSnapshot, ConnectionController, SyntheticMediaSource, TransportConfig,
    WsRelay,
};
use dialoguer::Select;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "consult-call")]
#[command(about = "Join a consultation call through a signaling relay")]
struct Args {
    /// Relay server root.
    #[arg(long, env = "CONSULT_RELAY_URL", default_value = "ws://127.0.0.1:8787")]
    relay: String,

    /// Appointment whose consultation room to join.
    #[arg(long, conflicts_with = "room", required_unless_present = "room")]
    appointment: Option<String>,

    /// Join a room by its raw id instead.
    #[arg(long)]
    room: Option<String>,

    #[arg(long)]
    no_video: bool,

    #[arg(long)]
    no_audio: bool,

    /// Fixed identity; a fresh one is generated otherwise.
    #[arg(long)]
    participant: Option<String>,
}

impl Args {
    fn call_config(&self) -> CallConfig {
        let room = match (&self.room, &self.appointment) {
            (Some(room), _) => RoomId::new(room.as_str()),
            (None, Some(appointment)) => RoomId::for_appointment(appointment),
            (None, None) => RoomId::new(""),
        };

        let mut config = CallConfig::new(room);
        config.with_video = !self.no_video;
        config.with_audio = !self.no_audio;
        config.participant = self.participant.as_deref().map(ParticipantId::from);
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.call_config();
    let room = config.room.clone();

    let (controller, handle) = ConnectionController::with_webrtc(
        config,
        Arc::new(WsRelay::new(args.relay.as_str())),
        TransportConfig::default(),
        Arc::new(SyntheticMediaSource::default()),
    );
    tokio::spawn(controller.run());

    println!("{}", format!("📞 Joining room {room}...").cyan());
    handle
        .start_call()
        .await
        .with_context(|| format!("Failed to start call in {room}"))?;
    println!("{}", "✅ Waiting for the other participant".green());

    tokio::spawn(report_changes(handle.subscribe()));

    loop {
        let snapshot = handle.snapshot();
        let items = vec![
            format!(
                "Turn microphone {}",
                if snapshot.audio_enabled { "off" } else { "on" }
            ),
            format!(
                "Turn camera {}",
                if snapshot.video_enabled { "off" } else { "on" }
            ),
            "End call".to_owned(),
        ];

        let choice = tokio::task::spawn_blocking(move || {
            Select::new()
                .with_prompt("Call controls")
                .items(&items)
                .default(0)
                .interact()
        })
        .await
        .context("Menu task panicked")?;

        match choice {
            Ok(0) => {
                let on = handle.toggle_audio().await;
                println!("🎙  Microphone {}", on_off(on));
            }
            Ok(1) => {
                let on = handle.toggle_video().await;
                println!("📷 Camera {}", on_off(on));
            }
            Ok(_) | Err(_) => break,
        }
    }

    handle.end_call().await;
    println!("{}", "👋 Call ended".green().bold());
    Ok(())
}

async fn report_changes(mut rx: watch::Receiver<CallSnapshot>) {
    let (mut state, mut peer_present, mut last_error) = {
        let snapshot = rx.borrow();
        (
            snapshot.connection_state,
            snapshot.peer_present,
            snapshot.last_error.clone(),
        )
    };

    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();

        if snapshot.peer_present != peer_present {
            peer_present = snapshot.peer_present;
            if peer_present {
                println!("{}", "👤 Participant joined".cyan());
            } else {
                println!("{}", "👤 Participant left".yellow());
            }
        }

        if snapshot.connection_state != state {
            state = snapshot.connection_state;
            println!("● {}", paint(state));
        }

        if snapshot.last_error != last_error {
            last_error = snapshot.last_error;
            if let Some(err) = &last_error {
                println!("{}", format!("❌ {err}").red());
            }
        }
    }
}

fn paint(state: ConnectionState) -> ColoredString {
    let label = state.to_string();
    match state {
        ConnectionState::Connected => label.green().bold(),
        ConnectionState::Connecting => label.yellow(),
        ConnectionState::Failed => label.red().bold(),
        ConnectionState::Disconnected | ConnectionState::Closed => label.red(),
        ConnectionState::Idle => label.normal(),
    }
}

fn on_off(on: bool) -> ColoredString {
    if on { "on".green() } else { "off".red() }
}
