//! Decoder builder and driver loop.
//!
//! The [`DecoderBuilder`] provides a fluent API for configuring options,
//! listeners and the transport. The [`MjpegDecoder`] manages the lifecycle:
//! 1. Arm the header watchdog and open the stream
//! 2. Validate the response content type
//! 3. Feed body chunks into the session
//! 4. Release the transport once the session aborts
//!
//! The session lives behind a mutex shared by the handle and a spawned
//! driver task. The driver only locks it to feed events in; `stop()`
//! cancels the shared token and aborts the session on the caller's thread,
//! so no notification fires once it returns.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use mjpeg_decoder::MjpegDecoder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut decoder = MjpegDecoder::builder("http://127.0.0.1:8000/?action=stream")
//!         .interval(Duration::from_secs(3))
//!         .on_frame(|frame, seq| {
//!             std::fs::write(format!("results/{}.jpg", seq), frame)?;
//!             Ok(())
//!         })
//!         .on_abort(|reason, err| {
//!             println!("decoder aborted for {} {:?}", reason, err);
//!             Ok(())
//!         })
//!         .build()?;
//!
//!     decoder.start()?;
//!     decoder.wait_for_abort().await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::DecoderOptions;
use crate::error::{DecoderError, Result};
use crate::listener::{DecoderEvent, ListenerRegistry, ListenerResult};
use crate::protocol::Frame;
use crate::session::{AbortReason, DecoderState, Session};
use crate::transport::{HttpTransport, Transport};

/// Builder for configuring and creating an M-JPEG decoder.
///
/// Register listeners and options, then call `build()`.
pub struct DecoderBuilder {
    url: String,
    options: DecoderOptions,
    transport: Option<Arc<dyn Transport>>,
    listeners: ListenerRegistry,
}

impl DecoderBuilder {
    /// Create a new builder for the stream at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: DecoderOptions::default(),
            transport: None,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Replace all options at once.
    pub fn options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }

    /// Minimum spacing between frames delivered to listeners.
    ///
    /// Default: 0 (every frame)
    pub fn interval(mut self, interval: Duration) -> Self {
        self.options.interval = interval;
        self
    }

    /// Stop after this many delivered frames.
    ///
    /// Default: 0 (unlimited)
    pub fn max_frames(mut self, max_frames: u64) -> Self {
        self.options.max_frames = max_frames;
        self
    }

    /// Abort if response headers do not arrive in time.
    ///
    /// Default: 10 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Ceiling for buffered bytes while looking for a frame.
    ///
    /// Default: 256MB
    pub fn max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.options.max_buffer_size = max_buffer_size;
        self
    }

    /// Preset for a single snapshot (`interval = 0`, `max_frames = 1`).
    pub fn snapshot(mut self) -> Self {
        self.options = self.options.snapshot();
        self
    }

    /// Use a custom transport instead of the default HTTP client.
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use a transport shared with other decoders.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register a frame listener, called with `(frame, sequence)`.
    pub fn on_frame<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&Frame, u64) -> ListenerResult + Send + 'static,
    {
        self.listeners.on_frame(listener);
        self
    }

    /// Register an abort listener, called once with `(reason, error)`.
    pub fn on_abort<F>(mut self, listener: F) -> Self
    where
        F: FnMut(AbortReason, Option<&DecoderError>) -> ListenerResult + Send + 'static,
    {
        self.listeners.on_abort(listener);
        self
    }

    /// Validate options and create the decoder (state `Idle`).
    pub fn build(self) -> Result<MjpegDecoder> {
        self.options.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };

        let (state_tx, state_rx) = watch::channel(DecoderState::Idle);
        let cancel = CancellationToken::new();
        let session = Session::new(&self.options, self.listeners, state_tx, cancel.clone());

        Ok(MjpegDecoder {
            url: self.url,
            options: self.options,
            transport,
            session: Arc::new(Mutex::new(session)),
            cancel,
            state: state_rx,
            driver: None,
        })
    }
}

/// An M-JPEG stream decoder.
///
/// Use listeners or `subscribe()` for continuous frames, `capture_once()`
/// for a single frame. A decoder runs at most once; create a new one to
/// retry after it aborted. Dropping a running decoder stops it.
pub struct MjpegDecoder {
    url: String,
    options: DecoderOptions,
    transport: Arc<dyn Transport>,
    session: Arc<Mutex<Session>>,
    cancel: CancellationToken,
    /// Session state published by the session.
    state: watch::Receiver<DecoderState>,
    /// Set once `start()` spawned the driver task.
    driver: Option<JoinHandle<()>>,
}

impl MjpegDecoder {
    /// Create a new decoder builder.
    pub fn builder(url: impl Into<String>) -> DecoderBuilder {
        DecoderBuilder::new(url)
    }

    /// Create a decoder with default options and the HTTP transport.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        DecoderBuilder::new(url).build()
    }

    /// Create a decoder with the given options and the HTTP transport.
    pub fn with_options(url: impl Into<String>, options: DecoderOptions) -> Result<Self> {
        DecoderBuilder::new(url).options(options).build()
    }

    /// Create a decoder for a single snapshot.
    ///
    /// The first extracted frame resolves `capture_once()` and ends the
    /// session with [`AbortReason::End`].
    pub fn for_snapshot(url: impl Into<String>, options: DecoderOptions) -> Result<Self> {
        DecoderBuilder::new(url).options(options.snapshot()).build()
    }

    /// Source URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Options this decoder was built with.
    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Current state.
    pub fn state(&self) -> DecoderState {
        *self.state.borrow()
    }

    /// Check if `start()` has been called (explicitly or by a capture).
    pub fn is_started(&self) -> bool {
        self.driver.is_some()
    }

    /// Subscribe to frame and abort events.
    ///
    /// The channel yields every delivered frame and closes after the
    /// `Aborted` event. Subscribing to a decoder that already aborted
    /// yields a closed channel.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<DecoderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.session.lock().subscribe(tx);
        rx
    }

    /// Start consuming the stream.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`DecoderError::AlreadyStarted`] on a second call,
    /// [`DecoderError::NoRuntime`] outside a runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.is_started() {
            return Err(DecoderError::AlreadyStarted);
        }
        let runtime = current_runtime()?;
        self.spawn_driver(runtime);
        Ok(())
    }

    fn spawn_driver(&mut self, runtime: Handle) {
        tracing::info!("Starting M-JPEG decoder for {}", self.url);
        self.session.lock().begin_connecting();

        let driver = Driver {
            session: self.session.clone(),
            transport: self.transport.clone(),
            url: self.url.clone(),
            timeout: self.options.timeout,
            cancel: self.cancel.clone(),
        };
        self.driver = Some(runtime.spawn(driver.run()));
    }

    /// Stop consuming the stream.
    ///
    /// Aborts with [`AbortReason::Stop`] if a request is active; no-op
    /// before `start()` and after the session ended. When this returns the
    /// state is terminal and no listener will be called again.
    pub fn stop(&self) {
        if !self.is_started() {
            return;
        }
        // Cut into a chunk the driver may be delivering, then wait for it
        self.cancel.cancel();
        self.session.lock().stop();
    }

    /// Capture the next frame from the stream.
    ///
    /// Starts the decoder if needed. Resolves with the next extracted frame,
    /// even one withheld from listeners by the interval.
    ///
    /// # Errors
    ///
    /// The stream error for `InvalidStream`, `HttpError` and
    /// `BufferOverflow`; [`DecoderError::SessionEnded`] if the session ends
    /// any other way before a frame arrives. [`DecoderError::NoRuntime`]
    /// if the decoder must be started outside a runtime.
    pub async fn capture_once(&mut self) -> Result<Frame> {
        // Fail before queueing anything if the decoder cannot run
        let runtime = if self.is_started() {
            None
        } else {
            Some(current_runtime()?)
        };

        let (tx, rx) = oneshot::channel();
        self.session.lock().enqueue_capture(tx);
        if let Some(runtime) = runtime {
            self.spawn_driver(runtime);
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(self.ended()),
        }
    }

    /// Wait until the session ends and return why.
    ///
    /// The returned future does not borrow the decoder.
    ///
    /// # Errors
    ///
    /// [`DecoderError::NotStarted`] if the decoder was never started.
    pub fn wait_for_abort(&self) -> impl Future<Output = Result<AbortReason>> + Send + 'static {
        let started = self.is_started();
        let mut state = self.state.clone();

        async move {
            if !started {
                return Err(DecoderError::NotStarted);
            }

            loop {
                let current = *state.borrow_and_update();
                if let Some(reason) = current.abort_reason() {
                    return Ok(reason);
                }
                // Session dropped without publishing a terminal state
                if state.changed().await.is_err() {
                    return Ok(AbortReason::Stop);
                }
            }
        }
    }

    fn ended(&self) -> DecoderError {
        DecoderError::SessionEnded(self.state().abort_reason().unwrap_or(AbortReason::Stop))
    }
}

impl Drop for MjpegDecoder {
    fn drop(&mut self) {
        // Nobody can stop the driver once the handle is gone
        self.cancel.cancel();
    }
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|_| DecoderError::NoRuntime)
}

/// Driver task pumping transport events into the session.
struct Driver {
    session: Arc<Mutex<Session>>,
    transport: Arc<dyn Transport>,
    url: String,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(self) {
        let Driver {
            session,
            transport,
            url,
            timeout,
            cancel,
        } = self;

        // Connecting: race the request against the watchdog
        let open = transport.open(&url);
        tokio::pin!(open);
        let watchdog = tokio::time::sleep(timeout);
        tokio::pin!(watchdog);

        let mut body = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => session.lock().stop(),
                _ = &mut watchdog => session.lock().on_timeout(),
                result = &mut open => {
                    let mut session = session.lock();
                    match result {
                        Ok(response) => {
                            if session.on_headers(response.status, response.content_type.as_deref()) {
                                break response.body;
                            }
                        }
                        Err(err) => session.on_transport_error(err),
                    }
                }
            }

            if session.lock().is_aborted() {
                tracing::debug!("Request cancelled before streaming");
                return;
            }
        };

        // Streaming
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => session.lock().stop(),
                chunk = body.next() => {
                    let mut session = session.lock();
                    match chunk {
                        Some(Ok(bytes)) => session.on_data(&bytes, Instant::now()),
                        Some(Err(err)) => session.on_transport_error(err),
                        None => session.on_end_of_stream(),
                    }
                }
            }

            if session.lock().is_aborted() {
                break;
            }
        }

        drop(body);
        tracing::debug!("Transport released for {}", url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn test_builder_configuration() {
        let (transport, _feed) = MemoryTransport::mjpeg();
        let decoder = MjpegDecoder::builder("http://camera/stream")
            .interval(Duration::from_millis(3000))
            .max_frames(5)
            .timeout(Duration::from_secs(2))
            .max_buffer_size(1024)
            .transport(transport)
            .build()
            .unwrap();

        assert_eq!(decoder.url(), "http://camera/stream");
        assert_eq!(decoder.options().interval, Duration::from_secs(3));
        assert_eq!(decoder.options().max_frames, 5);
        assert_eq!(decoder.options().timeout, Duration::from_secs(2));
        assert_eq!(decoder.options().max_buffer_size, 1024);
        assert_eq!(decoder.state(), DecoderState::Idle);
        assert!(!decoder.is_started());
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let (transport, _feed) = MemoryTransport::mjpeg();
        let result = MjpegDecoder::builder("http://camera/stream")
            .timeout(Duration::ZERO)
            .transport(transport)
            .build();

        assert!(matches!(result, Err(DecoderError::Config(_))));
    }

    #[test]
    fn test_snapshot_factory_presets() {
        let options = DecoderOptions {
            interval: Duration::from_secs(1),
            max_frames: 10,
            ..Default::default()
        };
        let decoder = MjpegDecoder::for_snapshot("http://camera/stream", options).unwrap();

        assert_eq!(decoder.options().interval, Duration::ZERO);
        assert_eq!(decoder.options().max_frames, 1);
    }

    #[test]
    fn test_start_requires_runtime() {
        let (transport, _feed) = MemoryTransport::mjpeg();
        let mut decoder = MjpegDecoder::builder("mem://")
            .transport(transport)
            .build()
            .unwrap();

        assert!(matches!(decoder.start(), Err(DecoderError::NoRuntime)));
        assert!(!decoder.is_started());
    }

    #[test]
    fn test_capture_without_runtime_queues_nothing() {
        let (transport, _feed) = MemoryTransport::mjpeg();
        let mut decoder = MjpegDecoder::builder("mem://")
            .transport(transport)
            .build()
            .unwrap();

        let result = futures::executor::block_on(decoder.capture_once());

        assert!(matches!(result, Err(DecoderError::NoRuntime)));
        assert!(!decoder.is_started());
        assert_eq!(decoder.session.lock().pending_len(), 0);
    }

    #[test]
    fn test_stop_before_start_is_noop() {
        let (transport, _feed) = MemoryTransport::mjpeg();
        let decoder = MjpegDecoder::builder("mem://")
            .transport(transport)
            .build()
            .unwrap();

        decoder.stop();
        decoder.stop();
        assert_eq!(decoder.state(), DecoderState::Idle);
    }

    #[tokio::test]
    async fn test_second_start_fails() {
        let (transport, _feed) = MemoryTransport::mjpeg();
        let mut decoder = MjpegDecoder::builder("mem://")
            .transport(transport)
            .build()
            .unwrap();

        decoder.start().unwrap();
        assert!(matches!(decoder.start(), Err(DecoderError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_stop_is_immediate() {
        let (transport, _feed) = MemoryTransport::unresponsive();
        let mut decoder = MjpegDecoder::builder("mem://")
            .transport(transport)
            .build()
            .unwrap();

        decoder.start().unwrap();
        assert_eq!(decoder.state(), DecoderState::Connecting);

        decoder.stop();
        assert_eq!(decoder.state(), DecoderState::Aborted(AbortReason::Stop));
        assert!(matches!(
            decoder.capture_once().await,
            Err(DecoderError::SessionEnded(AbortReason::Stop))
        ));
    }

    #[tokio::test]
    async fn test_wait_for_abort_requires_start() {
        let (transport, _feed) = MemoryTransport::mjpeg();
        let decoder = MjpegDecoder::builder("mem://")
            .transport(transport)
            .build()
            .unwrap();

        assert!(matches!(
            decoder.wait_for_abort().await,
            Err(DecoderError::NotStarted)
        ));
    }
}
