//! Realtime playback: UDP and hardware MIDI in, audio device out.
//!
//! # Example
//!
//! ```ignore
//! use saavy_host::{config::HostConfig, runtime::RealtimeSession, synth::MonoSynth};
//!
//! fn main() -> saavy_host::Result<()> {
//!     let session = RealtimeSession::start(&HostConfig::default(), Box::new(MonoSynth::new()))?;
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     session.shutdown()
//! }
//! ```

pub mod collector;
pub mod hardware;
pub mod receiver;
pub mod session;

pub use collector::{
    event_queue, forward_message, EventCollector, EventReceiver, EventSink, Forwarded,
    EVENT_QUEUE_CAPACITY,
};
pub use hardware::HardwareMidiInputs;
pub use receiver::{receive_loop, DatagramSource, ReceiveStats, UdpMidiReceiver};
pub use session::{CallbackRenderer, RealtimeSession};
