use tracing::instrument;

use crate::error::ProtocolError;
use crate::hw::SignSession;
use crate::protocol::{
    AnimationMode, CR, CommandCode, ESC, POSITION_BOTTOM_LINE, POSITION_FILL, POSITION_TOP_LINE,
};

use super::format::{self, CapabilityMask, FormatError, FormatNode};
use super::label::Label;

/// Formatted text write request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FormatRequest {
    label: Label,
    nodes: Vec<FormatNode>,
    mode: AnimationMode,
    split_lines: bool,
}

impl FormatRequest {
    /// Creates a request with the default animation and no line splitting.
    ///
    /// ```
    /// use ledsign::{FormatNode, FormatRequest, Label};
    ///
    /// let request = FormatRequest::new(Label::new('A')?, vec![FormatNode::text("Hi")]);
    /// let _ = request;
    /// # Ok::<(), ledsign::LabelError>(())
    /// ```
    #[must_use]
    pub fn new(label: Label, nodes: Vec<FormatNode>) -> Self {
        Self {
            label,
            nodes,
            mode: AnimationMode::default(),
            split_lines: false,
        }
    }

    /// Overrides the animation mode.
    #[must_use]
    pub fn with_mode(mut self, mode: AnimationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Drives the top and bottom display lines independently when the
    /// rendered text contains carriage returns.
    ///
    /// The first half of the lines goes to the top line, the rest to the
    /// bottom line.
    #[must_use]
    pub fn with_line_split(mut self, split_lines: bool) -> Self {
        self.split_lines = split_lines;
        self
    }
}

/// Handler for text page writes.
pub struct TextWriteHandler;

impl TextWriteHandler {
    pub(crate) fn text_payload(
        label: Label,
        text: &str,
        mode: AnimationMode,
    ) -> Result<Vec<u8>, FormatError> {
        if text.is_empty() {
            return Err(FormatError::EmptyText);
        }
        let body = format::ascii_bytes(text)?;
        Ok(Self::page_payload(label, mode, &[POSITION_FILL], &[body.as_slice()]))
    }

    pub(crate) fn format_payload(
        request: &FormatRequest,
        mask: CapabilityMask,
    ) -> Result<Vec<u8>, FormatError> {
        if request.nodes.is_empty() {
            return Err(FormatError::EmptyFormat);
        }
        let rendered = format::render_all(&request.nodes, mask)?;
        let segments: Vec<&[u8]> = rendered.split(|byte| *byte == CR).collect();

        if !request.split_lines || segments.len() < 2 {
            return Ok(Self::page_payload(
                request.label,
                request.mode,
                &[POSITION_FILL],
                &[rendered.as_slice()],
            ));
        }

        let (top, bottom) = segments.split_at(segments.len() / 2);
        Ok(Self::page_payload(
            request.label,
            request.mode,
            &[POSITION_TOP_LINE, POSITION_BOTTOM_LINE],
            &[top.join(&CR).as_slice(), bottom.join(&CR).as_slice()],
        ))
    }

    fn page_payload(
        label: Label,
        mode: AnimationMode,
        positions: &[u8],
        blocks: &[&[u8]],
    ) -> Vec<u8> {
        let mut payload = vec![CommandCode::WriteText.tag(), label.value()];
        for (position, block) in positions.iter().zip(blocks) {
            payload.extend_from_slice(&[ESC, *position]);
            payload.extend_from_slice(mode.code());
            payload.extend_from_slice(block);
        }
        payload
    }

    /// Writes plain text to a page configured as text.
    ///
    /// ```
    /// # fn demo(session: &mut ledsign::SignSession) -> Result<(), ledsign::ProtocolError> {
    /// use ledsign::{AnimationMode, Label, TextWriteHandler};
    ///
    /// TextWriteHandler::write_text(session, Label::new('A')?, "Hello", AnimationMode::Scroll)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error for empty or non-ASCII text, or when the transport
    /// write fails.
    #[instrument(skip(session, text), level = "debug", fields(%label, %mode, text_len = text.len()))]
    pub fn write_text(
        session: &mut SignSession,
        label: Label,
        text: &str,
        mode: AnimationMode,
    ) -> Result<(), ProtocolError> {
        let payload = Self::text_payload(label, text, mode)?;
        session.send_command(&payload)
    }

    /// Writes formatted text to a page configured as text, rendered for the
    /// session's capability mask.
    ///
    /// ```
    /// # fn demo(session: &mut ledsign::SignSession) -> Result<(), ledsign::ProtocolError> {
    /// use ledsign::{FormatNode, FormatRequest, Label, TextWriteHandler};
    ///
    /// let request = FormatRequest::new(
    ///     Label::new('A')?,
    ///     vec![FormatNode::red(vec![FormatNode::text("ALERT")])],
    /// );
    /// TextWriteHandler::write_format(session, &request)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error for an empty node list or non-ASCII text, or when the
    /// transport write fails.
    #[instrument(
        skip(session, request),
        level = "debug",
        fields(label = %request.label, mode = %request.mode, split_lines = request.split_lines)
    )]
    pub fn write_format(
        session: &mut SignSession,
        request: &FormatRequest,
    ) -> Result<(), ProtocolError> {
        let payload = Self::format_payload(request, session.capabilities())?;
        session.send_command(&payload)
    }
}
