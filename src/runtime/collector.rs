//! Lock-free hand-off of decoded events from input threads to the audio
//! callback.
//!
//! Every input (the UDP receiver, each hardware MIDI port) gets its own
//! single-producer ring. The callback drains the rings one after another, so
//! each input keeps its own arrival order.

use rtrb::{Consumer, Producer, RingBuffer};
use tracing::trace;

use crate::io::{midi, NoteEvent};

pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Producer side: input threads push decoded events here.
pub trait EventSink: Send {
    /// Returns `false` if the event was dropped (queue full).
    fn push(&mut self, event: NoteEvent) -> bool;
}

/// Consumer side: the audio callback drains events once per buffer.
pub trait EventReceiver {
    fn pop(&mut self) -> Option<NoteEvent>;

    /// Move everything queued into `out`, in arrival order.
    fn drain_into(&mut self, out: &mut Vec<NoteEvent>) -> usize {
        let mut count = 0;
        while let Some(event) = self.pop() {
            out.push(event);
            count += 1;
        }
        count
    }
}

impl EventSink for Producer<NoteEvent> {
    fn push(&mut self, event: NoteEvent) -> bool {
        Producer::push(self, event).is_ok()
    }
}

impl EventReceiver for Consumer<NoteEvent> {
    fn pop(&mut self) -> Option<NoteEvent> {
        Consumer::pop(self).ok()
    }
}

pub fn event_queue(capacity: usize) -> (Producer<NoteEvent>, Consumer<NoteEvent>) {
    RingBuffer::new(capacity)
}

/// Several input rings read as one.
#[derive(Default)]
pub struct EventCollector {
    rings: Vec<Consumer<NoteEvent>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new input and return the producer it should push into.
    pub fn add_input(&mut self, capacity: usize) -> Producer<NoteEvent> {
        let (producer, consumer) = event_queue(capacity);
        self.rings.push(consumer);
        producer
    }

    pub fn inputs(&self) -> usize {
        self.rings.len()
    }
}

impl EventReceiver for EventCollector {
    fn pop(&mut self) -> Option<NoteEvent> {
        self.rings.iter_mut().find_map(|ring| ring.pop().ok())
    }
}

/// What happened to one raw message handed to [`forward_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    Queued,
    QueueFull,
    /// Undecodable, or a message that carries no note event.
    Ignored,
}

/// Decode one short message and push the event into `sink`.
///
/// Program Change and Channel Pressure decode fine but are not forwarded.
pub fn forward_message<S: EventSink + ?Sized>(bytes: &[u8], sink: &mut S) -> Forwarded {
    match midi::decode(bytes) {
        Ok(NoteEvent::Unsupported { status }) => {
            trace!("Ignoring unsupported status {status:#04x}");
            Forwarded::Ignored
        }
        Ok(event) => {
            if sink.push(event) {
                Forwarded::Queued
            } else {
                Forwarded::QueueFull
            }
        }
        Err(e) => {
            trace!("Ignoring malformed message: {e}");
            Forwarded::Ignored
        }
    }
}
