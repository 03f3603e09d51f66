use tracing::instrument;

use crate::error::ProtocolError;
use crate::hw::SignSession;
use crate::protocol::CommandCode;

use super::format::{self, FormatError};
use super::frame_codec::ResponseError;
use super::label::Label;

/// Handler for string page writes and reads.
pub struct StringPageHandler;

impl StringPageHandler {
    pub(crate) fn write_payload(label: Label, text: &str) -> Result<Vec<u8>, FormatError> {
        if text.is_empty() {
            return Err(FormatError::EmptyText);
        }
        let mut payload = vec![CommandCode::WriteString.tag(), label.value()];
        payload.extend_from_slice(&format::ascii_bytes(text)?);
        Ok(payload)
    }

    pub(crate) fn read_query(label: Label) -> [u8; 2] {
        [CommandCode::ReadString.tag(), label.value()]
    }

    /// Tag a sign echoes in front of the contents of string page `label`.
    pub(crate) fn response_tag(label: Label) -> [u8; 2] {
        [CommandCode::WriteString.tag(), label.value()]
    }

    /// Writes text to a page configured as a string.
    ///
    /// ```
    /// # fn demo(session: &mut ledsign::SignSession) -> Result<(), ledsign::ProtocolError> {
    /// use ledsign::{Label, StringPageHandler};
    ///
    /// StringPageHandler::write_string(session, Label::new('B')?, ":3")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error for empty or non-ASCII text, or when the transport
    /// write fails.
    #[instrument(skip(session, text), level = "debug", fields(%label, text_len = text.len()))]
    pub fn write_string(
        session: &mut SignSession,
        label: Label,
        text: &str,
    ) -> Result<(), ProtocolError> {
        let payload = Self::write_payload(label, text)?;
        session.send_command(&payload)
    }

    /// Reads the current contents of a string page.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport fails, no complete response
    /// arrives before the read timeout, the response echoes a different tag,
    /// or the contents are not ASCII.
    #[instrument(skip(session), level = "debug", fields(%label))]
    pub fn read_string(session: &mut SignSession, label: Label) -> Result<String, ProtocolError> {
        session.send_command(&Self::read_query(label))?;
        let content = session.read_response(&Self::response_tag(label))?;
        if !content.is_ascii() {
            return Err(ResponseError::NonAsciiResponse.into());
        }
        String::from_utf8(content).map_err(|_error| ResponseError::NonAsciiResponse.into())
    }
}
