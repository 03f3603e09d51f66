use std::collections::HashMap;
use std::sync::LazyLock;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::handlers::FormatError;

/// Five NUL bytes that let every sign on the bus lock onto the baud rate.
pub(crate) const PREAMBLE: [u8; 5] = [0x00; 5];
/// Start of header.
pub(crate) const SOH: u8 = 0x01;
/// Start of payload.
pub(crate) const STX: u8 = 0x02;
/// End of payload in response frames; a checksum trailer follows it.
pub(crate) const ETX: u8 = 0x03;
/// End of transmission.
pub(crate) const EOT: u8 = 0x04;
pub(crate) const ESC: u8 = 0x1B;
pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';

/// Selector byte addressing every sign model on the bus.
pub(crate) const ALL_SIGNS_SELECTOR: u8 = b'Z';

/// Display position: fill all lines, centred vertically.
pub(crate) const POSITION_FILL: u8 = b'0';
/// Display position: top line only.
pub(crate) const POSITION_TOP_LINE: u8 = b'"';
/// Display position: bottom line only.
pub(crate) const POSITION_BOTTOM_LINE: u8 = b'&';

/// Wire-level command codes that open every payload.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter)]
pub enum CommandCode {
    /// Write a text page.
    WriteText,
    /// Write a string page.
    WriteString,
    /// Read a string page back.
    ReadString,
    /// Write a picture page.
    WritePicture,
    /// Write a special function (configuration, addressing).
    WriteSpecial,
    /// Read a special function (sign type).
    ReadSpecial,
}

impl CommandCode {
    /// Returns the ASCII tag byte that identifies this command on the wire.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::WriteText => b'A',
            Self::WriteString => b'G',
            Self::ReadString => b'H',
            Self::WritePicture => b'I',
            Self::WriteSpecial => b'E',
            Self::ReadSpecial => b'F',
        }
    }
}

/// Special-function labels carried after a [`CommandCode::WriteSpecial`] or
/// [`CommandCode::ReadSpecial`] tag.
pub(crate) mod special {
    /// Clear memory and (optionally) load a new page table.
    pub(crate) const CONFIGURE_MEMORY: u8 = b'$';
    /// Assign a new serial address.
    pub(crate) const SET_ADDRESS: u8 = b'7';
    /// Query the sign model.
    pub(crate) const SIGN_TYPE: u8 = b'-';
}

/// Animation used when a text page is displayed.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, EnumIter, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum AnimationMode {
    Rotate,
    Hold,
    Flash,
    RollUp,
    RollDown,
    RollLeft,
    RollRight,
    WipeUp,
    WipeDown,
    WipeLeft,
    WipeRight,
    Scroll,
    /// Let the sign pick a mode for each display cycle.
    #[default]
    Automode,
    RollIn,
    RollOut,
    WipeIn,
    WipeOut,
    CompressedRotate,
    Explode,
    Clock,
    Twinkle,
    Sparkle,
    Snow,
    Interlock,
    Switch,
    Slide,
    Spray,
    Starburst,
    Welcome,
    SlotMachine,
}

impl AnimationMode {
    /// Returns the mode bytes as sent after the position byte.
    ///
    /// Special modes are two bytes long (`n` followed by a digit).
    ///
    /// ```
    /// use ledsign::AnimationMode;
    ///
    /// assert_eq!(b"o", AnimationMode::Automode.code());
    /// assert_eq!(b"n9", AnimationMode::SlotMachine.code());
    /// ```
    #[must_use]
    pub const fn code(self) -> &'static [u8] {
        match self {
            Self::Rotate => b"a",
            Self::Hold => b"b",
            Self::Flash => b"c",
            Self::RollUp => b"e",
            Self::RollDown => b"f",
            Self::RollLeft => b"g",
            Self::RollRight => b"h",
            Self::WipeUp => b"i",
            Self::WipeDown => b"j",
            Self::WipeLeft => b"k",
            Self::WipeRight => b"l",
            Self::Scroll => b"m",
            Self::Automode => b"o",
            Self::RollIn => b"p",
            Self::RollOut => b"q",
            Self::WipeIn => b"r",
            Self::WipeOut => b"s",
            Self::CompressedRotate => b"t",
            Self::Explode => b"u",
            Self::Clock => b"v",
            Self::Twinkle => b"n0",
            Self::Sparkle => b"n1",
            Self::Snow => b"n2",
            Self::Interlock => b"n3",
            Self::Switch => b"n4",
            Self::Slide => b"n5",
            Self::Spray => b"n6",
            Self::Starburst => b"n7",
            Self::Welcome => b"n8",
            Self::SlotMachine => b"n9",
        }
    }

    /// Looks up a mode from its raw wire bytes.
    ///
    /// ```
    /// use ledsign::AnimationMode;
    ///
    /// assert_eq!(Some(AnimationMode::Scroll), AnimationMode::from_code(b"m"));
    /// assert_eq!(None, AnimationMode::from_code(b"d"));
    /// ```
    #[must_use]
    pub fn from_code(code: &[u8]) -> Option<Self> {
        ANIMATION_MODES_BY_CODE.get(code).copied()
    }
}

impl TryFrom<&[u8]> for AnimationMode {
    type Error = FormatError;

    fn try_from(code: &[u8]) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| FormatError::InvalidMode {
            code: String::from_utf8_lossy(code).into_owned(),
        })
    }
}

/// Every legal animation mode keyed by its wire bytes.
static ANIMATION_MODES_BY_CODE: LazyLock<HashMap<&'static [u8], AnimationMode>> =
    LazyLock::new(|| {
        AnimationMode::iter()
            .map(|mode| (mode.code(), mode))
            .collect()
    });
