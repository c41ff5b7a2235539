//! Connects to a server and routes every normalized message by its `type`.
//!
//! ```text
//! cargo run -p tether-client --example listen -- [path/to/tether.toml]
//! ```
//!
//! Settings can also come from the environment, e.g.
//! `TETHER__SESSION__URL=ws://127.0.0.1:3000`.

use serde::Deserialize;
use std::path::PathBuf;
use tether_client::{Bus, BusEvent, Dispatcher, launch, load_config};
use tokio::sync::broadcast::error::RecvError;

/// Messages this listener understands. Envelopes always lead with `type`,
/// so serde can pick the variant from it.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Start {
        #[serde(rename = "exerciseId")]
        exercise_id: String,
    },
    Weather {
        rain: bool,
    },
}

fn route(envelope_json: &str) {
    match serde_json::from_str::<ServerMessage>(envelope_json) {
        Ok(ServerMessage::Start { exercise_id }) => println!("start exercise {exercise_id}"),
        Ok(ServerMessage::Weather { rain }) => {
            println!("weather: {}", if rain { "rain" } else { "dry" })
        }
        Err(_) => println!("unhandled: {envelope_json}"),
    }
}

#[actix_rt::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(path.as_deref())?;

    let bus = Bus::default();
    let mut events = bus.subscribe();
    let dispatcher = Dispatcher::dedicated();
    let mut supervisor = launch(Some(config), bus, dispatcher.clone())?;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(BusEvent::ConnectivityChanged { session, state }) => {
                    println!("session {session}: {state:?}");
                }
                Ok(BusEvent::MessageReceived { envelope_json }) => route(&envelope_json),
                Err(RecvError::Lagged(skipped)) => eprintln!("skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    supervisor.stop().await;
    dispatcher.stop();
    Ok(())
}
