use thiserror::Error;

use crate::protocol::{EOT, ETX, PREAMBLE, SOH, STX};

use super::label::{Address, SignSelector};

/// Width of the address field in the frame header.
const ADDRESS_HEX_WIDTH: usize = 2;
const BROADCAST_ADDRESS: u32 = 0;
/// Preamble followed by the start-of-header byte.
const START_OF_FRAME: [u8; 6] = [PREAMBLE[0], PREAMBLE[1], PREAMBLE[2], PREAMBLE[3], PREAMBLE[4], SOH];

/// Errors returned while interpreting a response frame.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ResponseError {
    /// No complete frame was assembled before the read deadline.
    #[error("no complete response frame arrived within {timeout_ms}ms")]
    ReadTimeout { timeout_ms: u64 },
    /// The response body did not echo the tag of the request.
    #[error("response body `{received}` does not start with expected tag `{expected}`")]
    UnexpectedResponse { expected: String, received: String },
    /// The response content was expected to be ASCII text.
    #[error("response content is not ASCII text")]
    NonAsciiResponse,
    /// The response carried a tag but no content after it.
    #[error("response to `{expected}` carried no content after the tag")]
    EmptyResponse { expected: String },
}

/// Renders `value` as lowercase hexadecimal left-padded with `0` to `width`.
///
/// Values wider than `width` are emitted at their natural width.
///
/// ```
/// use ledsign::encode_hex;
///
/// assert_eq!("ff", encode_hex(255, 2));
/// assert_eq!("01", encode_hex(1, 2));
/// assert_eq!("0040", encode_hex(64, 4));
/// ```
#[must_use]
pub fn encode_hex(value: u32, width: usize) -> String {
    let rendered = format!("{value:0width$x}");
    if rendered.len() > width {
        tracing::warn!(
            value,
            width,
            rendered_len = rendered.len(),
            "hex field is wider than its protocol column"
        );
    }
    rendered
}

/// A response frame split into its header and body.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResponseFrame {
    echoed_address: Vec<u8>,
    body: Vec<u8>,
}

impl ResponseFrame {
    /// Returns the selector and address bytes echoed by the sign.
    #[must_use]
    pub fn echoed_address(&self) -> &[u8] {
        &self.echoed_address
    }

    /// Returns the response body with any checksum trailer removed.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Checks the echoed request tag and returns the content after it.
    ///
    /// # Errors
    ///
    /// Returns an error when the body does not begin with `expected_tag`.
    pub fn strip_tag(&self, expected_tag: &[u8]) -> Result<&[u8], ResponseError> {
        self.body
            .strip_prefix(expected_tag)
            .ok_or_else(|| ResponseError::UnexpectedResponse {
                expected: String::from_utf8_lossy(expected_tag).into_owned(),
                received: String::from_utf8_lossy(&self.body).into_owned(),
            })
    }
}

/// Encodes request frames and decodes response frames.
pub struct FrameCodec;

impl FrameCodec {
    /// Wraps `payload` in the request envelope.
    ///
    /// `address` of `None` broadcasts to every sign (`00`).
    ///
    /// ```
    /// use ledsign::{Address, FrameCodec, SignSelector};
    ///
    /// let frame = FrameCodec::encode_request(SignSelector::AllSigns, Some(Address::new(1)?), b"E$");
    /// assert_eq!(b"\x00\x00\x00\x00\x00\x01Z01\x02E$\x04".to_vec(), frame);
    /// # Ok::<(), ledsign::LabelError>(())
    /// ```
    #[must_use]
    pub fn encode_request(
        selector: SignSelector,
        address: Option<Address>,
        payload: &[u8],
    ) -> Vec<u8> {
        let address = address.map_or(BROADCAST_ADDRESS, |value| u32::from(value.value()));
        let address_field = encode_hex(address, ADDRESS_HEX_WIDTH);

        let mut frame =
            Vec::with_capacity(START_OF_FRAME.len() + 1 + address_field.len() + payload.len() + 2);
        frame.extend_from_slice(&START_OF_FRAME);
        frame.push(selector.byte());
        frame.extend_from_slice(address_field.as_bytes());
        frame.push(STX);
        frame.extend_from_slice(payload);
        frame.push(EOT);
        frame
    }

    /// Extracts the first complete response frame from `buffer`.
    ///
    /// Returns `None` until the buffer holds a start-of-frame sequence
    /// followed by an end-of-transmission byte.
    #[must_use]
    pub fn decode_response(buffer: &[u8]) -> Option<ResponseFrame> {
        let start = find(buffer, &START_OF_FRAME)? + START_OF_FRAME.len();
        let end = start + buffer[start..].iter().position(|byte| *byte == EOT)?;
        let interior = &buffer[start..end];

        let (echoed_address, body) = match interior.iter().position(|byte| *byte == STX) {
            Some(split) => (&interior[..split], &interior[split + 1..]),
            None => (interior, &interior[interior.len()..]),
        };
        let body = match body.iter().position(|byte| *byte == ETX) {
            Some(trailer) => &body[..trailer],
            None => body,
        };

        Some(ResponseFrame {
            echoed_address: echoed_address.to_vec(),
            body: body.to_vec(),
        })
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(255, 2, "ff")]
    #[case(1, 2, "01")]
    #[case(0, 2, "00")]
    #[case(64, 4, "0040")]
    #[case(0xABC, 4, "0abc")]
    fn encode_hex_pads_lowercase(#[case] value: u32, #[case] width: usize, #[case] expected: &str) {
        assert_eq!(expected, encode_hex(value, width));
    }

    #[test]
    fn encode_hex_does_not_truncate_wide_values() {
        assert_eq!("100", encode_hex(256, 2));
    }

    #[test]
    fn broadcast_request_encodes_zero_address() {
        let frame = FrameCodec::encode_request(SignSelector::AllSigns, None, b"F-");
        assert_eq!(b"\x00\x00\x00\x00\x00\x01Z00\x02F-\x04".to_vec(), frame);
    }

    #[test]
    fn request_carries_model_selector_and_address() {
        let address = Address::new(0xA5).expect("test address should be valid");
        let selector = SignSelector::model('V').expect("test selector should be valid");
        let frame = FrameCodec::encode_request(selector, Some(address), b"E702");
        assert_eq!(b"\x00\x00\x00\x00\x00\x01Va5\x02E702\x04".to_vec(), frame);
    }

    #[test]
    fn decode_response_waits_for_both_markers() {
        assert_eq!(None, FrameCodec::decode_response(b""));
        assert_eq!(
            None,
            FrameCodec::decode_response(b"\x00\x00\x00\x00\x00\x01000\x02GBhi")
        );
        assert_eq!(None, FrameCodec::decode_response(b"\x02GBhi\x04"));
    }

    #[test]
    fn decode_response_ignores_end_marker_before_start() {
        let buffer = b"\x04noise\x00\x00\x00\x00\x00\x01000\x02GBhi";
        assert_eq!(None, FrameCodec::decode_response(buffer));
    }

    #[test]
    fn decode_response_splits_address_and_drops_trailer() {
        let buffer = b"\xff\x00\x00\x00\x00\x00\x00\x01000\x02GBhello\x0301A4\x04junk";
        let frame = FrameCodec::decode_response(buffer).expect("frame should be complete");
        assert_eq!(b"000", frame.echoed_address());
        assert_eq!(b"GBhello", frame.body());
        assert_eq!(
            b"hello".as_slice(),
            frame.strip_tag(b"GB").expect("tag should match")
        );
    }

    #[test]
    fn decode_response_without_trailer_keeps_whole_body() {
        let buffer = b"\x00\x00\x00\x00\x00\x01000\x02E-V\x04";
        let frame = FrameCodec::decode_response(buffer).expect("frame should be complete");
        assert_eq!(b"E-V", frame.body());
    }

    #[test]
    fn strip_tag_rejects_mismatched_echo() {
        let buffer = b"\x00\x00\x00\x00\x00\x01000\x02GChello\x04";
        let frame = FrameCodec::decode_response(buffer).expect("frame should be complete");
        assert_matches!(
            frame.strip_tag(b"GB"),
            Err(ResponseError::UnexpectedResponse { expected, received })
                if expected == "GB" && received == "GChello"
        );
    }

    #[test]
    fn frame_without_payload_marker_has_empty_body() {
        let buffer = b"\x00\x00\x00\x00\x00\x01000\x04";
        let frame = FrameCodec::decode_response(buffer).expect("frame should be complete");
        assert_eq!(b"000", frame.echoed_address());
        assert!(frame.body().is_empty());
    }
}
