use thiserror::Error;
use tracing::instrument;

use crate::error::ProtocolError;
use crate::hw::SignSession;
use crate::protocol::{CommandCode, special};

use super::frame_codec::encode_hex;
use super::label::{Label, LabelError};
use super::picture::{MAX_PICTURE_HEIGHT, MAX_PICTURE_WIDTH};

const MAX_STRING_SIZE: u16 = 125;
const PAGE_LOCKED: u8 = b'L';
const TEXT_PAGE_KIND: u8 = b'A';
const STRING_PAGE_KIND: u8 = b'B';
const PICTURE_PAGE_KIND: u8 = b'D';
/// Start time "always" and stop time "never".
const TEXT_RUN_TIMES: &[u8; 4] = b"FF00";
const STRING_PADDING: &[u8; 4] = b"0000";

/// Errors returned while building page configuration descriptors.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ConfigurationError {
    #[error(transparent)]
    Label(#[from] LabelError),
    /// The label cannot hold this kind of page.
    #[error("label `{label}` is reserved and cannot be configured as a {kind} page")]
    ReservedLabel { label: Label, kind: PageKind },
    /// String pages are capped at 125 bytes.
    #[error("string pages hold at most {max} bytes, requested {size}")]
    StringTooLong { size: u16, max: u16 },
    /// Picture pages are capped at 255x31.
    #[error("picture pages must be at most {max_width}x{max_height}, requested {width}x{height}")]
    PictureTooLarge {
        width: u16,
        height: u16,
        max_width: usize,
        max_height: usize,
    },
    /// Picture colour depth must be 1, 3 or 8.
    #[error("picture colour depth must be 1, 3 or 8, requested {colors}")]
    UnsupportedColorDepth { colors: u8 },
}

/// Kinds of page a label can be configured as.
#[derive(Debug, Clone, Copy, Eq, PartialEq, derive_more::Display)]
pub enum PageKind {
    #[display("text")]
    Text,
    #[display("string")]
    String,
    #[display("picture")]
    Picture,
}

/// Colour depths accepted by picture pages.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ColorDepth {
    Monochrome,
    Tricolor,
    Octocolor,
}

impl ColorDepth {
    fn size_code(self) -> &'static [u8; 4] {
        match self {
            Self::Monochrome => b"1000",
            Self::Tricolor | Self::Octocolor => b"4000",
        }
    }
}

impl TryFrom<u8> for ColorDepth {
    type Error = ConfigurationError;

    fn try_from(colors: u8) -> Result<Self, Self::Error> {
        match colors {
            1 => Ok(Self::Monochrome),
            3 => Ok(Self::Tricolor),
            8 => Ok(Self::Octocolor),
            _ => Err(ConfigurationError::UnsupportedColorDepth { colors }),
        }
    }
}

/// One validated page definition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PageConfig {
    Text {
        label: Label,
        size: u16,
    },
    String {
        label: Label,
        size: u16,
    },
    Picture {
        label: Label,
        width: u8,
        height: u8,
        depth: ColorDepth,
    },
}

impl PageConfig {
    /// Defines a text page of up to `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error for the priority label.
    pub fn text(label: Label, size: u16) -> Result<Self, ConfigurationError> {
        reject_priority(label, PageKind::Text)?;
        Ok(Self::Text { label, size })
    }

    /// Defines a string page of up to `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error for the priority or reserved label, or sizes above 125.
    pub fn string(label: Label, size: u16) -> Result<Self, ConfigurationError> {
        reject_priority(label, PageKind::String)?;
        if label == Label::RESERVED_STRING {
            return Err(ConfigurationError::ReservedLabel {
                label,
                kind: PageKind::String,
            });
        }
        if size > MAX_STRING_SIZE {
            return Err(ConfigurationError::StringTooLong {
                size,
                max: MAX_STRING_SIZE,
            });
        }
        Ok(Self::String { label, size })
    }

    /// Defines a picture page.
    ///
    /// # Errors
    ///
    /// Returns an error for the priority label, sizes above 255x31, or colour
    /// depths other than 1, 3 and 8.
    ///
    /// ```
    /// use ledsign::{Label, PageConfig};
    ///
    /// let page = PageConfig::picture(Label::new('C')?, 6, 6, 3)?;
    /// assert_eq!(b"CDL06064000".to_vec(), page.descriptor());
    /// # Ok::<(), ledsign::ConfigurationError>(())
    /// ```
    pub fn picture(
        label: Label,
        width: u16,
        height: u16,
        colors: u8,
    ) -> Result<Self, ConfigurationError> {
        reject_priority(label, PageKind::Picture)?;
        let too_large = || ConfigurationError::PictureTooLarge {
            width,
            height,
            max_width: MAX_PICTURE_WIDTH,
            max_height: MAX_PICTURE_HEIGHT,
        };
        if usize::from(width) > MAX_PICTURE_WIDTH || usize::from(height) > MAX_PICTURE_HEIGHT {
            return Err(too_large());
        }
        let depth = ColorDepth::try_from(colors)?;
        Ok(Self::Picture {
            label,
            width: u8::try_from(width).map_err(|_error| too_large())?,
            height: u8::try_from(height).map_err(|_error| too_large())?,
            depth,
        })
    }

    /// Returns the page label.
    #[must_use]
    pub fn label(&self) -> Label {
        match self {
            Self::Text { label, .. } | Self::String { label, .. } | Self::Picture { label, .. } => {
                *label
            }
        }
    }

    /// Encodes the fixed-layout memory descriptor for this page.
    #[must_use]
    pub fn descriptor(&self) -> Vec<u8> {
        let mut descriptor = vec![self.label().value()];
        match self {
            Self::Text { size, .. } => {
                descriptor.extend_from_slice(&[TEXT_PAGE_KIND, PAGE_LOCKED]);
                descriptor.extend_from_slice(encode_hex(u32::from(*size), 4).as_bytes());
                descriptor.extend_from_slice(TEXT_RUN_TIMES);
            }
            Self::String { size, .. } => {
                descriptor.extend_from_slice(&[STRING_PAGE_KIND, PAGE_LOCKED]);
                descriptor.extend_from_slice(encode_hex(u32::from(*size), 4).as_bytes());
                descriptor.extend_from_slice(STRING_PADDING);
            }
            Self::Picture {
                width,
                height,
                depth,
                ..
            } => {
                descriptor.extend_from_slice(&[PICTURE_PAGE_KIND, PAGE_LOCKED]);
                descriptor.extend_from_slice(encode_hex(u32::from(*height), 2).as_bytes());
                descriptor.extend_from_slice(encode_hex(u32::from(*width), 2).as_bytes());
                descriptor.extend_from_slice(depth.size_code());
            }
        }
        descriptor
    }
}

fn reject_priority(label: Label, kind: PageKind) -> Result<(), ConfigurationError> {
    if label.is_priority() {
        return Err(ConfigurationError::ReservedLabel { label, kind });
    }
    Ok(())
}

/// Accumulates page definitions and sends them as one memory configuration.
///
/// Nothing reaches the sign until [`ConfigurationTransaction::commit`] is
/// called; dropping an uncommitted transaction leaves the sign untouched.
#[derive(Debug)]
pub struct ConfigurationTransaction<'a> {
    session: &'a mut SignSession,
    pages: Vec<PageConfig>,
}

impl<'a> ConfigurationTransaction<'a> {
    /// Starts an empty transaction bound to `session`.
    #[must_use]
    pub fn new(session: &'a mut SignSession) -> Self {
        Self {
            session,
            pages: Vec::new(),
        }
    }

    /// Configures `label` as a text page.
    ///
    /// # Errors
    ///
    /// Returns an error for the priority label.
    pub fn set_text(&mut self, label: Label, size: u16) -> Result<(), ConfigurationError> {
        self.insert(PageConfig::text(label, size)?);
        Ok(())
    }

    /// Configures `label` as a string page.
    ///
    /// # Errors
    ///
    /// Returns an error for the priority or reserved label, or sizes above 125.
    pub fn set_string(&mut self, label: Label, size: u16) -> Result<(), ConfigurationError> {
        self.insert(PageConfig::string(label, size)?);
        Ok(())
    }

    /// Configures `label` as a picture page.
    ///
    /// # Errors
    ///
    /// Returns an error for the priority label, sizes above 255x31, or colour
    /// depths other than 1, 3 and 8.
    pub fn set_picture(
        &mut self,
        label: Label,
        width: u16,
        height: u16,
        colors: u8,
    ) -> Result<(), ConfigurationError> {
        self.insert(PageConfig::picture(label, width, height, colors)?);
        Ok(())
    }

    /// Returns the pages accumulated so far, in commit order.
    #[must_use]
    pub fn pages(&self) -> &[PageConfig] {
        &self.pages
    }

    /// Returns the payload `commit` would send.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = vec![CommandCode::WriteSpecial.tag(), special::CONFIGURE_MEMORY];
        for page in &self.pages {
            payload.extend_from_slice(&page.descriptor());
        }
        payload
    }

    /// Sends the accumulated pages as one configuration command.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport write fails.
    #[instrument(skip(self), level = "debug", fields(page_count = self.pages.len()))]
    pub fn commit(mut self) -> Result<(), ProtocolError> {
        let payload = self.payload();
        tracing::debug!(page_count = self.pages().len(), "committing page configuration");
        self.pages.clear();
        self.session.send_command(&payload)
    }

    fn insert(&mut self, page: PageConfig) {
        let label = page.label();
        match self.pages.iter_mut().find(|existing| existing.label() == label) {
            Some(existing) => *existing = page,
            None => self.pages.push(page),
        }
    }
}

impl Drop for ConfigurationTransaction<'_> {
    fn drop(&mut self) {
        if !self.pages.is_empty() {
            tracing::debug!(
                page_count = self.pages.len(),
                "abandoning uncommitted page configuration"
            );
        }
    }
}

/// Handler for sign memory configuration.
pub struct ConfigurationHandler;

impl ConfigurationHandler {
    /// Runs `build` against a fresh transaction and commits it only when
    /// `build` succeeds.
    ///
    /// ```
    /// # fn demo(session: &mut ledsign::SignSession) -> Result<(), ledsign::ProtocolError> {
    /// use ledsign::{ConfigurationHandler, Label, ProtocolError};
    ///
    /// ConfigurationHandler::configure(session, |config| -> Result<(), ProtocolError> {
    ///     config.set_text(Label::new('A')?, 64)?;
    ///     config.set_string(Label::new('B')?, 64)?;
    ///     config.set_picture(Label::new('C')?, 6, 6, 3)?;
    ///     Ok(())
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the error raised by `build`, in which case nothing is sent, or
    /// the transport error raised by the commit.
    pub fn configure<F, E>(session: &mut SignSession, build: F) -> Result<(), E>
    where
        F: FnOnce(&mut ConfigurationTransaction<'_>) -> Result<(), E>,
        E: From<ProtocolError>,
    {
        let mut transaction = ConfigurationTransaction::new(session);
        build(&mut transaction)?;
        transaction.commit().map_err(E::from)
    }

    /// Wipes every page definition on the sign.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport write fails.
    #[instrument(skip(session), level = "debug")]
    pub fn clear_configuration(session: &mut SignSession) -> Result<(), ProtocolError> {
        session.send_command(&[CommandCode::WriteSpecial.tag(), special::CONFIGURE_MEMORY])
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn label(value: char) -> Label {
        Label::new(value).expect("test label should be valid")
    }

    #[test]
    fn text_descriptor_matches_protocol() {
        let page = PageConfig::text(label('A'), 64).expect("text page should be valid");
        assert_eq!(b"AAL0040FF00".to_vec(), page.descriptor());
    }

    #[test]
    fn string_descriptor_matches_protocol() {
        let page = PageConfig::string(label('B'), 64).expect("string page should be valid");
        assert_eq!(b"BBL00400000".to_vec(), page.descriptor());
    }

    #[rstest]
    #[case(1, b"CDL061f1000")]
    #[case(3, b"CDL061f4000")]
    #[case(8, b"CDL061f4000")]
    fn picture_descriptor_encodes_height_width_and_depth(
        #[case] colors: u8,
        #[case] expected: &[u8],
    ) {
        let page = PageConfig::picture(label('C'), 31, 6, colors).expect("picture should be valid");
        assert_eq!(expected.to_vec(), page.descriptor());
    }

    #[rstest]
    #[case(0)]
    #[case(2)]
    #[case(4)]
    #[case(16)]
    fn picture_rejects_unsupported_depth(#[case] colors: u8) {
        assert_matches!(
            PageConfig::picture(label('C'), 6, 6, colors),
            Err(ConfigurationError::UnsupportedColorDepth { colors: rejected }) if rejected == colors
        );
    }

    #[rstest]
    #[case(256, 1)]
    #[case(1, 32)]
    fn picture_rejects_oversized_pages(#[case] width: u16, #[case] height: u16) {
        assert_matches!(
            PageConfig::picture(label('C'), width, height, 1),
            Err(ConfigurationError::PictureTooLarge { .. })
        );
    }

    #[test]
    fn picture_accepts_limits() {
        let page = PageConfig::picture(label('C'), 255, 31, 1).expect("limits should be valid");
        assert_eq!(b"CDL1fff1000".to_vec(), page.descriptor());
    }

    #[test]
    fn string_rejects_more_than_125_bytes() {
        assert!(PageConfig::string(label('B'), 125).is_ok());
        assert_matches!(
            PageConfig::string(label('B'), 126),
            Err(ConfigurationError::StringTooLong { size: 126, max: 125 })
        );
    }

    #[test]
    fn reserved_label_rules_follow_page_kind() {
        for byte in 0x20..=0x7E_u8 {
            let label = Label::try_from(byte).expect("printable byte should be a label");
            let is_priority = byte == b'0';

            assert_eq!(!is_priority, PageConfig::text(label, 10).is_ok());
            assert_eq!(!is_priority, PageConfig::picture(label, 1, 1, 1).is_ok());
            assert_eq!(
                !is_priority && byte != b'?',
                PageConfig::string(label, 10).is_ok()
            );
        }
    }
}
