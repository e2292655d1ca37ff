//! Hardware MIDI input: every port the system reports is opened and fed into
//! the session's event collector, alongside UDP.

use midir::{Ignore, MidiInput, MidiInputConnection};
use rtrb::Producer;
use tracing::{debug, info, warn};

use super::collector::{forward_message, EventCollector, Forwarded, EVENT_QUEUE_CAPACITY};
use crate::{error::Result, io::NoteEvent};

const CLIENT_NAME: &str = "saavy-host";
const CONNECTION_NAME: &str = "saavy-host-input";

/// Runs on midir's input thread, once per incoming message.
fn on_message(_timestamp: u64, message: &[u8], producer: &mut Producer<NoteEvent>) {
    if forward_message(message, producer) == Forwarded::QueueFull {
        debug!("Event queue full, dropping hardware MIDI message");
    }
}

/// Open connections to hardware MIDI inputs. Dropping closes them.
pub struct HardwareMidiInputs {
    connections: Vec<(String, MidiInputConnection<Producer<NoteEvent>>)>,
}

impl HardwareMidiInputs {
    /// Connect to every available input port. Each port gets its own ring in
    /// `collector`. A port that fails to open is skipped with a warning.
    pub fn connect_all(collector: &mut EventCollector) -> Result<Self> {
        let listing = MidiInput::new(CLIENT_NAME)?;
        let ports = listing.ports();

        info!("Available MIDI inputs:");
        if ports.is_empty() {
            info!("  (none found)");
        }

        let mut connections = Vec::with_capacity(ports.len());
        for port in &ports {
            let name = listing
                .port_name(port)
                .unwrap_or_else(|_| "<unknown>".to_string());
            info!("  - {name}");

            // connect() consumes the client, so each port gets its own
            let mut input = MidiInput::new(CLIENT_NAME)?;
            input.ignore(Ignore::All);

            let producer = collector.add_input(EVENT_QUEUE_CAPACITY);
            match input.connect(port, CONNECTION_NAME, on_message, producer) {
                Ok(connection) => connections.push((name, connection)),
                Err(e) => warn!("Could not open MIDI input {name}: {e}"),
            }
        }

        Ok(Self { connections })
    }

    pub fn port_names(&self) -> impl Iterator<Item = &str> {
        self.connections.iter().map(|(name, _)| name.as_str())
    }

    /// Close every connection. After this returns no callback will push again.
    pub fn close(&mut self) {
        for (name, connection) in self.connections.drain(..) {
            connection.close();
            debug!("Closed MIDI input {name}");
        }
    }
}

impl Drop for HardwareMidiInputs {
    fn drop(&mut self) {
        self.close();
    }
}
