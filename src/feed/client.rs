use crate::error::FeedError;
use crate::events::ConnectionStatus;
use crate::feed::protocol::{FeedEvent, FeedFrame, PING, PONG};
use log::{debug, error, info, warn};
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long a read may block before the loop checks for shutdown and liveness
const READ_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Granularity of interruptible sleeps between reconnect attempts
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Longest line accepted from the feed before it is discarded
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Timing and size limits of the feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    /// Interval between liveness pings while connected
    pub ping_interval: Duration,
    /// First delay before reconnecting after a failure
    pub initial_reconnect_delay: Duration,
    /// Ceiling for the exponential reconnect backoff
    pub max_reconnect_delay: Duration,
    /// How long a write (ping or pong) may block before the connection is dropped
    pub write_timeout: Duration,
    /// Pending bytes without a newline beyond which the line is discarded
    pub max_line_bytes: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            write_timeout: Duration::from_secs(5),
            max_line_bytes: MAX_LINE_BYTES,
        }
    }
}

/// Write side of the current feed connection, shareable across threads
#[derive(Debug, Clone, Default)]
pub struct FeedHandle {
    writer: Arc<Mutex<Option<TcpStream>>>,
}

impl FeedHandle {
    /// Send a liveness ping; fails with [`FeedError::NotConnected`] when no
    /// connection is open
    pub fn send_ping(&self) -> Result<(), FeedError> {
        self.send_line(PING)
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    fn send_line(&self, line: &str) -> Result<(), FeedError> {
        let mut guard = self.lock();
        let stream = guard.as_mut().ok_or(FeedError::NotConnected)?;
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;
        Ok(())
    }

    fn attach(&self, stream: TcpStream) {
        *self.lock() = Some(stream);
    }

    fn detach(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<TcpStream>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// How one connection ended
enum StreamEnd {
    PeerClosed,
    Shutdown,
    ConsumerGone,
}

/// Client for the log feed
///
/// Keeps a TCP connection to the feed open on a background thread, decodes
/// each line and forwards the result as a [`FeedEvent`]. The thread reconnects
/// with exponential backoff and reports every connection state change.
pub struct FeedClient {
    /// Feed address as `host:port`
    address: String,
    settings: FeedSettings,
    /// Channel receiving decoded feed events
    output_channel: Sender<FeedEvent>,
    /// Handle to the background thread
    thread_handle: Option<JoinHandle<()>>,
    /// Shared flag controlling the background thread
    running: Arc<Mutex<bool>>,
    handle: FeedHandle,
}

impl FeedClient {
    /// Create a client for the feed at `address`
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::sync::mpsc;
    /// use logpulse::feed::{FeedClient, FeedSettings};
    ///
    /// let (tx, rx) = mpsc::channel();
    /// let mut client = FeedClient::new("127.0.0.1:9400".to_string(), FeedSettings::default(), tx);
    /// client.start();
    /// ```
    pub fn new(address: String, settings: FeedSettings, channel: Sender<FeedEvent>) -> Self {
        Self {
            address,
            settings,
            output_channel: channel,
            thread_handle: None,
            running: Arc::new(Mutex::new(false)),
            handle: FeedHandle::default(),
        }
    }

    /// Start the background connection thread
    ///
    /// Connection failures are not errors here; they are reported as status
    /// events and retried.
    pub fn start(&mut self) {
        {
            let mut running = lock_flag(&self.running);
            if *running {
                return;
            }
            *running = true;
        }

        let address = self.address.clone();
        let settings = self.settings;
        let channel = self.output_channel.clone();
        let running = Arc::clone(&self.running);
        let handle = self.handle.clone();

        self.thread_handle = Some(thread::spawn(move || {
            Self::feed_thread(address, settings, channel, running, handle);
        }));
        info!("FeedClient started for {}", self.address);
    }

    /// Stop the background thread and close the connection
    pub fn stop(&mut self) -> Result<(), FeedError> {
        *lock_flag(&self.running) = false;

        if let Some(handle) = self.thread_handle.take() {
            handle.join().map_err(|_| FeedError::ThreadPanicked)?;
        }

        info!("FeedClient stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *lock_flag(&self.running)
    }

    /// Send a liveness ping over the current connection
    pub fn send_ping(&self) -> Result<(), FeedError> {
        self.handle.send_ping()
    }

    /// Shareable handle to the write side of the connection
    pub fn handle(&self) -> FeedHandle {
        self.handle.clone()
    }

    fn feed_thread(
        address: String,
        settings: FeedSettings,
        channel: Sender<FeedEvent>,
        running: Arc<Mutex<bool>>,
        handle: FeedHandle,
    ) {
        let mut reconnect_delay = settings.initial_reconnect_delay;

        while *lock_flag(&running) {
            if channel.send(FeedEvent::Status(ConnectionStatus::Connecting)).is_err() {
                break;
            }

            match Self::connect(&address) {
                Ok(stream) => {
                    info!("Connected to feed at {}", address);
                    reconnect_delay = settings.initial_reconnect_delay;

                    let end = match Self::prepare(&stream, &handle, &settings) {
                        Ok(()) => {
                            if channel.send(FeedEvent::Status(ConnectionStatus::Connected)).is_err() {
                                Ok(StreamEnd::ConsumerGone)
                            } else {
                                Self::process_stream(stream, &channel, &running, &handle, &settings)
                            }
                        }
                        Err(e) => Err(e),
                    };
                    handle.detach();

                    match end {
                        Ok(StreamEnd::PeerClosed) => {
                            warn!("{}", FeedError::Disconnected);
                            if channel
                                .send(FeedEvent::Status(ConnectionStatus::Disconnected))
                                .is_err()
                            {
                                break;
                            }
                        }
                        Ok(StreamEnd::Shutdown) => break,
                        Ok(StreamEnd::ConsumerGone) => {
                            debug!("Feed consumer dropped, stopping");
                            break;
                        }
                        Err(e) => {
                            error!("Feed connection failed: {}", e);
                            if channel.send(FeedEvent::Status(ConnectionStatus::Error)).is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("{}", e);
                    if channel.send(FeedEvent::Status(ConnectionStatus::Error)).is_err() {
                        break;
                    }
                }
            }

            if !*lock_flag(&running) {
                break;
            }

            warn!("Reconnecting to feed in {:?}", reconnect_delay);
            sleep_while_running(reconnect_delay, &running);
            reconnect_delay = std::cmp::min(reconnect_delay * 2, settings.max_reconnect_delay);
        }

        handle.detach();
        let _ = channel.send(FeedEvent::Status(ConnectionStatus::Disconnected));
        *lock_flag(&running) = false;
        info!("Feed thread finished");
    }

    fn connect(address: &str) -> Result<TcpStream, FeedError> {
        debug!("Connecting to feed at {}", address);
        TcpStream::connect(address).map_err(|source| FeedError::Connect {
            address: address.to_string(),
            source,
        })
    }

    fn prepare(stream: &TcpStream, handle: &FeedHandle, settings: &FeedSettings) -> Result<(), FeedError> {
        stream.set_read_timeout(Some(READ_POLL_INTERVAL))?;
        stream.set_write_timeout(Some(settings.write_timeout))?;
        handle.attach(stream.try_clone()?);
        Ok(())
    }

    /// Read lines from one connection until it ends
    ///
    /// Malformed lines are logged and dropped; later lines are unaffected. A
    /// line longer than `max_line_bytes` is dropped up to its newline.
    fn process_stream(
        mut stream: TcpStream,
        channel: &Sender<FeedEvent>,
        running: &Arc<Mutex<bool>>,
        handle: &FeedHandle,
        settings: &FeedSettings,
    ) -> Result<StreamEnd, FeedError> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut temp_buf = [0u8; 8192];
        let mut last_ping = Instant::now();
        // Set while skipping the rest of an oversized line
        let mut discarding = false;

        loop {
            if !*lock_flag(running) {
                debug!("Stopping feed processing due to shutdown signal");
                return Ok(StreamEnd::Shutdown);
            }

            if last_ping.elapsed() >= settings.ping_interval {
                handle.send_ping()?;
                debug!("Sent liveness ping");
                last_ping = Instant::now();
            }

            match stream.read(&mut temp_buf) {
                Ok(0) => return Ok(StreamEnd::PeerClosed),
                Ok(n) => {
                    let mut chunk = &temp_buf[..n];
                    if discarding {
                        match chunk.iter().position(|b| *b == b'\n') {
                            Some(newline_pos) => {
                                discarding = false;
                                chunk = &chunk[newline_pos + 1..];
                            }
                            None => continue,
                        }
                    }
                    buffer.extend_from_slice(chunk);

                    while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
                        let raw: Vec<u8> = buffer.drain(..=newline_pos).collect();
                        let line = String::from_utf8_lossy(&raw[..newline_pos]);
                        if line.trim().is_empty() {
                            continue;
                        }

                        let event = match FeedFrame::parse(&line) {
                            Ok(FeedFrame::Ping) => {
                                handle.send_line(PONG)?;
                                continue;
                            }
                            Ok(FeedFrame::Pong) => FeedEvent::Pong,
                            Ok(FeedFrame::Message(message)) => {
                                debug!("Received feed message: {}", message.kind());
                                FeedEvent::Message(message)
                            }
                            Err(e) => {
                                warn!("Discarding feed line: {}", e);
                                continue;
                            }
                        };

                        if channel.send(event).is_err() {
                            return Ok(StreamEnd::ConsumerGone);
                        }
                    }

                    if buffer.len() > settings.max_line_bytes {
                        let e = FeedError::MalformedPayload(format!(
                            "line exceeds {} bytes",
                            settings.max_line_bytes
                        ));
                        warn!("Discarding feed line: {}", e);
                        buffer.clear();
                        discarding = true;
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(FeedError::IoError(e)),
            }
        }
    }
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

fn lock_flag(flag: &Mutex<bool>) -> std::sync::MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(PoisonError::into_inner)
}

fn sleep_while_running(duration: Duration, running: &Mutex<bool>) {
    let mut remaining = duration;
    while remaining > Duration::ZERO && *lock_flag(running) {
        let slice = std::cmp::min(remaining, SLEEP_SLICE);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}
