//! UDP MIDI input for the realtime session.
//!
//! Each datagram carries exactly one 3-byte MIDI message. Anything else is
//! dropped. The receiver thread decodes and forwards into an [`EventSink`];
//! it never touches the synth.

use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::collector::{forward_message, EventSink, Forwarded};
use crate::error::Result;

pub const MESSAGE_LEN: usize = 3;
const READ_TIMEOUT: Duration = Duration::from_millis(100);
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Something that yields datagrams. Implemented for [`UdpSocket`]; tests
/// script it.
pub trait DatagramSource {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl DatagramSource for UdpSocket {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv_from(buf).map(|(len, _)| len)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    pub datagrams: u64,
    pub events: u64,
    pub dropped: u64,
}

/// Receive until `stop` is set. Timeouts just re-check the flag; other
/// errors back off briefly and retry.
pub fn receive_loop<D, S>(source: &mut D, sink: &mut S, stop: &AtomicBool) -> ReceiveStats
where
    D: DatagramSource + ?Sized,
    S: EventSink + ?Sized,
{
    let mut stats = ReceiveStats::default();
    // Larger than a message so oversized datagrams are seen as such
    let mut buf = [0u8; 64];

    while !stop.load(Ordering::Acquire) {
        match source.recv_datagram(&mut buf) {
            Ok(len) => {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                stats.datagrams += 1;
                if len != MESSAGE_LEN {
                    trace!("Dropping {len}-byte datagram");
                    stats.dropped += 1;
                    continue;
                }
                match forward_message(&buf[..MESSAGE_LEN], sink) {
                    Forwarded::Queued => stats.events += 1,
                    Forwarded::QueueFull => {
                        debug!("Event queue full, dropping datagram");
                        stats.dropped += 1;
                    }
                    Forwarded::Ignored => stats.dropped += 1,
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                debug!("UDP receive error: {e}");
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    stats
}

/// Owns the `udp-midi-rx` thread and the socket it reads.
pub struct UdpMidiReceiver {
    local_addr: SocketAddr,
    waker: UdpSocket,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<ReceiveStats>>,
}

impl UdpMidiReceiver {
    /// Bind `addr` and start forwarding decoded events into `sink`.
    pub fn start<S: EventSink + 'static>(addr: SocketAddr, mut sink: S) -> Result<Self> {
        let mut socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let local_addr = socket.local_addr()?;
        let waker = socket.try_clone()?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("udp-midi-rx".to_string())
            .spawn(move || receive_loop(&mut socket, &mut sink, &stop_clone))?;

        info!("Listening for MIDI on udp://{local_addr}");

        Ok(Self {
            local_addr,
            waker,
            stop,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop and join the receiver thread. Returns `None` if already stopped.
    pub fn stop(&mut self) -> Option<ReceiveStats> {
        let handle = self.handle.take()?;
        self.stop.store(true, Ordering::Release);

        // Unblock the pending read; the read timeout covers a lost wake-up
        if let Err(e) = self.waker.send_to(&[], wake_addr(self.local_addr)) {
            debug!("Wake datagram failed, waiting for read timeout: {e}");
        }

        match handle.join() {
            Ok(stats) => {
                debug!(
                    "UDP receiver stopped: {} datagrams, {} events, {} dropped",
                    stats.datagrams, stats.events, stats.dropped
                );
                Some(stats)
            }
            Err(_) => {
                warn!("UDP receiver thread panicked");
                None
            }
        }
    }
}

impl Drop for UdpMidiReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A wildcard bind address is not a valid destination everywhere.
fn wake_addr(local: SocketAddr) -> SocketAddr {
    match local {
        SocketAddr::V4(a) if a.ip().is_unspecified() => {
            SocketAddr::from((Ipv4Addr::LOCALHOST, a.port()))
        }
        SocketAddr::V6(a) if a.ip().is_unspecified() => {
            SocketAddr::from((Ipv6Addr::LOCALHOST, a.port()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::time::Instant;

    use proptest::prelude::*;

    use super::*;
    use crate::io::{AudioBlock, NoteEvent};
    use crate::runtime::collector::{event_queue, EventReceiver, EVENT_QUEUE_CAPACITY};
    use crate::runtime::session::CallbackRenderer;
    use crate::synth::Synthesizer;

    /// Plays back scripted datagrams, then raises the stop flag.
    struct Scripted<'a> {
        datagrams: VecDeque<Vec<u8>>,
        stop: &'a AtomicBool,
    }

    impl DatagramSource for Scripted<'_> {
        fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.datagrams.pop_front() {
                Some(d) => {
                    buf[..d.len()].copy_from_slice(&d);
                    Ok(d.len())
                }
                None => {
                    self.stop.store(true, Ordering::Release);
                    Err(io::Error::new(ErrorKind::WouldBlock, "drained"))
                }
            }
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<NoteEvent>);

    impl EventSink for Recorder {
        fn push(&mut self, event: NoteEvent) -> bool {
            self.0.push(event);
            true
        }
    }

    fn run_script(datagrams: Vec<Vec<u8>>) -> (Vec<NoteEvent>, ReceiveStats) {
        let stop = AtomicBool::new(false);
        let mut source = Scripted {
            datagrams: datagrams.into(),
            stop: &stop,
        };
        let mut sink = Recorder::default();
        let stats = receive_loop(&mut source, &mut sink, &stop);
        (sink.0, stats)
    }

    #[test]
    fn only_three_byte_datagrams_are_decoded() {
        let (events, stats) = run_script(vec![
            vec![0x90, 60, 100],
            vec![],
            vec![0x90, 60],
            vec![0x90, 60, 100, 0],
            vec![0x80, 60, 0],
        ]);

        assert_eq!(events.len(), 2);
        assert!(events[0].is_note_on());
        assert!(events[1].is_note_off());
        assert_eq!(stats.datagrams, 5);
        assert_eq!(stats.dropped, 3);
    }

    #[test]
    fn program_change_datagram_is_not_forwarded() {
        let (events, stats) = run_script(vec![vec![0xC0, 5, 0], vec![0xD0, 40, 0]]);
        assert!(events.is_empty());
        assert_eq!(stats.datagrams, 2);
        assert_eq!(stats.events, 0);
        assert_eq!(stats.dropped, 2);
    }

    #[test]
    fn undecodable_messages_are_dropped() {
        let (events, stats) = run_script(vec![vec![0x10, 0, 0], vec![0xB0, 7, 100]]);
        assert_eq!(events.len(), 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let stop = AtomicBool::new(false);
        let mut source = Scripted {
            datagrams: vec![vec![0x90, 60, 100]; 4].into(),
            stop: &stop,
        };
        let (mut tx, mut rx) = event_queue(2);
        let stats = receive_loop(&mut source, &mut tx, &stop);

        assert_eq!(stats.events, 2);
        assert_eq!(stats.dropped, 2);
        let mut out = Vec::new();
        assert_eq!(rx.drain_into(&mut out), 2);
    }

    #[test]
    fn wildcard_wake_goes_to_loopback() {
        let addr: SocketAddr = "0.0.0.0:9999".parse().unwrap();
        assert_eq!(wake_addr(addr), "127.0.0.1:9999".parse().unwrap());
        let addr: SocketAddr = "10.0.0.2:9999".parse().unwrap();
        assert_eq!(wake_addr(addr), addr);
    }

    #[test]
    fn loopback_delivery_and_prompt_shutdown() {
        let (tx, mut rx) = event_queue(16);
        let mut receiver =
            UdpMidiReceiver::start("127.0.0.1:0".parse().unwrap(), tx).unwrap();
        let target = receiver.local_addr();

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(&[0x90, 64, 127], target).unwrap();
        client.send_to(&[0x80, 64, 0], target).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut events = Vec::new();
        while events.len() < 2 && Instant::now() < deadline {
            rx.drain_into(&mut events);
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].note(), Some(64));
        assert!(events[1].is_note_off());

        let started = Instant::now();
        let stats = receiver.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(stats.events, 2);
        assert!(receiver.stop().is_none());
    }

    #[test]
    fn bind_conflict_is_an_error() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let (tx, _rx) = event_queue(4);
        assert!(UdpMidiReceiver::start(taken.local_addr().unwrap(), tx).is_err());
    }

    proptest! {
        #[test]
        fn events_arrive_in_send_order(notes in prop::collection::vec((0u8..128, 1u8..128), 0..64)) {
            let datagrams = notes.iter().map(|&(n, v)| vec![0x90, n, v]).collect();
            let (events, stats) = run_script(datagrams);

            prop_assert_eq!(stats.dropped, 0);
            let got: Vec<u8> = events.iter().filter_map(NoteEvent::note).collect();
            let want: Vec<u8> = notes.iter().map(|&(n, _)| n).collect();
            prop_assert_eq!(got, want);
        }
    }

    /// Datagrams handed over from another thread, like a socket would.
    struct ChannelSource(mpsc::Receiver<Vec<u8>>);

    impl DatagramSource for ChannelSource {
        fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.recv_timeout(Duration::from_millis(5)) {
                Ok(d) => {
                    buf[..d.len()].copy_from_slice(&d);
                    Ok(d.len())
                }
                Err(RecvTimeoutError::Timeout) => {
                    Err(io::Error::new(ErrorKind::WouldBlock, "idle"))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    thread::sleep(Duration::from_millis(1));
                    Err(io::Error::new(ErrorKind::WouldBlock, "sender gone"))
                }
            }
        }
    }

    /// Records every event the callback delivers, in delivery order.
    #[derive(Default)]
    struct EventLog(Vec<NoteEvent>);

    impl Synthesizer for EventLog {
        fn configure(&mut self, _sample_rate: f32, _block_size: usize) -> Result<()> {
            Ok(())
        }

        fn set_parameter(&mut self, _name: &str, _value: f32) -> bool {
            false
        }

        fn render(&mut self, events: &[NoteEvent], _block: &mut AudioBlock) {
            self.0.extend_from_slice(events);
        }

        fn release(&mut self) {}
    }

    /// Send `notes` from one thread, receive on a second and drain through
    /// the audio callback on a third. Returns what the callback saw.
    fn ingest_concurrently(notes: &[u8]) -> Vec<NoteEvent> {
        let (datagram_tx, datagram_rx) = mpsc::channel::<Vec<u8>>();
        let (event_tx, event_rx) = event_queue(EVENT_QUEUE_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));

        let receiver = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut source = ChannelSource(datagram_rx);
                let mut sink = event_tx;
                receive_loop(&mut source, &mut sink, &stop)
            })
        };

        let expected = notes.len();
        let callback = thread::spawn(move || {
            let mut renderer = CallbackRenderer::new(EventLog::default(), event_rx, 2, 64);
            let mut data = vec![0.0f32; 64 * 2];
            let deadline = Instant::now() + Duration::from_secs(10);
            while renderer.synth_mut().0.len() < expected && Instant::now() < deadline {
                renderer.process(&mut data);
                thread::yield_now();
            }
            // A few more callbacks must not turn up anything new
            for _ in 0..8 {
                renderer.process(&mut data);
            }
            renderer.into_synth().0
        });

        for &note in notes {
            datagram_tx.send(vec![0x90, note, 100]).unwrap();
        }

        let seen = callback.join().unwrap();
        stop.store(true, Ordering::Release);
        let stats = receiver.join().unwrap();
        assert_eq!(stats.events, expected as u64);
        seen
    }

    #[test]
    fn five_hundred_datagrams_reach_the_callback_in_order() {
        let notes: Vec<u8> = (0..500).map(|i| (i % 128) as u8).collect();
        let seen = ingest_concurrently(&notes);

        assert_eq!(seen.len(), notes.len());
        assert!(seen.iter().all(NoteEvent::is_note_on));
        let got: Vec<u8> = seen.iter().filter_map(NoteEvent::note).collect();
        assert_eq!(got, notes);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn concurrent_ingestion_loses_and_duplicates_nothing(
            notes in prop::collection::vec(0u8..128, 1..500)
        ) {
            let seen = ingest_concurrently(&notes);
            let got: Vec<u8> = seen.iter().filter_map(NoteEvent::note).collect();
            prop_assert_eq!(got, notes);
        }
    }
}
