use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::decoder::{GameEvent, StreamDecoder};

/// Unified event type consumed by the coordinator loop.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Game(GameEvent),
    Tick,
}

/// Source of game events.
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source: decodes the diagnostic stream on a dedicated
/// thread. Emits ProcessStarted before the first line and ProcessExited at
/// end of stream; nothing is shared with the timing core except the events.
pub struct LineEventSource {
    rx: Receiver<AppEvent>,
}

impl LineEventSource {
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let mut decoder = StreamDecoder::new();
            if tx.send(AppEvent::Game(GameEvent::ProcessStarted)).is_err() {
                return;
            }
            for line in BufReader::new(reader).lines() {
                let Ok(line) = line else { break };
                if let Some(event) = decoder.feed_line(&line) {
                    if tx.send(AppEvent::Game(event)).is_err() {
                        return;
                    }
                }
            }
            let _ = tx.send(AppEvent::Game(GameEvent::ProcessExited));
        });

        Self { rx }
    }
}

impl GameEventSource for LineEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the coordinator one event/tick at a time
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}
