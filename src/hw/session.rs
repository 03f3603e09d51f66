use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use bon::Builder;
use tracing::instrument;

use super::transport::Transport;
use crate::error::ProtocolError;
use crate::handlers::{Address, CapabilityMask, FrameCodec, ResponseError, SignSelector};
use crate::utils::format_wire;

/// How long a read waits for a complete response frame.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause between empty transport reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Options fixed for the lifetime of a [`SignSession`].
#[derive(Debug, Clone, Builder)]
pub struct SessionConfig {
    /// Bus address of the target sign; `None` broadcasts.
    address: Option<Address>,
    #[builder(default)]
    capabilities: CapabilityMask,
    #[builder(default = DEFAULT_READ_TIMEOUT)]
    read_timeout: Duration,
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Connection to one sign (or every sign) on the bus.
///
/// The session owns its transport exclusively; every operation takes
/// `&mut self`.
pub struct SignSession {
    transport: Box<dyn Transport>,
    address: Option<Address>,
    capabilities: CapabilityMask,
    read_timeout: Duration,
    poll_interval: Duration,
}

impl fmt::Debug for SignSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignSession")
            .field("address", &self.address)
            .field("capabilities", &self.capabilities)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl SignSession {
    /// Binds `transport` to the sign described by `config`.
    ///
    /// ```
    /// use ledsign::{Address, CapabilityMask, FakeTransport, SessionConfig, SignSession};
    ///
    /// let config = SessionConfig::builder()
    ///     .address(Address::new(1)?)
    ///     .capabilities(CapabilityMask::FLASH | CapabilityMask::COLOR)
    ///     .build();
    /// let session = SignSession::open(Box::new(FakeTransport::builder().build()), config);
    /// assert_eq!(Some(Address::new(1)?), session.address());
    /// # Ok::<(), ledsign::LabelError>(())
    /// ```
    #[must_use]
    pub fn open(transport: Box<dyn Transport>, config: SessionConfig) -> Self {
        let SessionConfig {
            address,
            capabilities,
            read_timeout,
            poll_interval,
        } = config;
        Self {
            transport,
            address,
            capabilities,
            read_timeout,
            poll_interval,
        }
    }

    /// Returns the bound sign address, `None` when broadcasting.
    #[must_use]
    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// Returns the features the sign was declared to support.
    #[must_use]
    pub fn capabilities(&self) -> CapabilityMask {
        self.capabilities
    }

    /// Returns the response deadline applied by read operations.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Frames `payload` for every sign model and writes it.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport write fails.
    pub fn send_command(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        self.send_command_with_selector(payload, SignSelector::AllSigns)
    }

    /// Frames `payload` for the sign models matched by `selector` and writes it.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport write fails.
    #[instrument(
        skip(self, payload),
        level = "debug",
        fields(address = ?self.address, payload_len = payload.len())
    )]
    pub fn send_command_with_selector(
        &mut self,
        payload: &[u8],
        selector: SignSelector,
    ) -> Result<(), ProtocolError> {
        let frame = FrameCodec::encode_request(selector, self.address, payload);
        tracing::trace!(frame = %format_wire(&frame), "writing request frame");
        self.transport.write_all(&frame)?;
        Ok(())
    }

    /// Waits for a complete response frame and returns the content that
    /// follows `expected_tag` in its body.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport read fails, no complete frame
    /// arrives before the read timeout, or the body does not start with
    /// `expected_tag`.
    #[instrument(
        skip(self, expected_tag),
        level = "debug",
        fields(address = ?self.address, expected_tag = %format_wire(expected_tag))
    )]
    pub fn read_response(&mut self, expected_tag: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let deadline = Instant::now() + self.read_timeout();
        let mut buffer = Vec::new();

        loop {
            let chunk = self.transport.read_available()?;
            if !chunk.is_empty() {
                buffer.extend_from_slice(&chunk);
                if let Some(frame) = FrameCodec::decode_response(&buffer) {
                    tracing::trace!(frame = %format_wire(&buffer), "received response frame");
                    let content = frame.strip_tag(expected_tag)?;
                    return Ok(content.to_vec());
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::debug!(
                    buffered = %format_wire(&buffer),
                    "gave up waiting for response frame"
                );
                return Err(ResponseError::ReadTimeout {
                    timeout_ms: u64::try_from(self.read_timeout().as_millis()).unwrap_or(u64::MAX),
                }
                .into());
            }
            if chunk.is_empty() {
                thread::sleep(self.poll_interval.min(remaining));
            }
        }
    }

    pub(crate) fn rebind_address(&mut self, address: Address) {
        self.address = Some(address);
    }
}
