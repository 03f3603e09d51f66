use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::protocol::ALL_SIGNS_SELECTOR;

const MIN_PRINTABLE: u8 = 0x20;
const MAX_PRINTABLE: u8 = 0x7E;
const MIN_ADDRESS: u16 = 1;
const MAX_ADDRESS: u16 = 255;

/// Errors returned by label, address and selector validation.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum LabelError {
    /// The label was not exactly one printable ASCII character.
    #[error("label `{label}` must be exactly one printable ASCII character (0x20..=0x7e)")]
    InvalidLabel { label: String },
    /// The numeric sign address was outside `1..=255`.
    #[error("address {value} is out of range ({min}..={max})")]
    InvalidAddress { value: u16, min: u16, max: u16 },
    /// The address could not be parsed as a number.
    #[error("address `{value}` is not a decimal number")]
    UnparsableAddress { value: String },
    /// The sign-model selector byte was not printable ASCII.
    #[error("sign selector `{selector}` must be one printable ASCII character")]
    InvalidSelector { selector: String },
}

/// A validated page label: one printable ASCII byte.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::Into)]
pub struct Label(u8);

impl Label {
    /// The always-on priority page.
    pub const PRIORITY: Self = Self(b'0');

    /// Label reserved by the sign firmware for string pages.
    pub const RESERVED_STRING: Self = Self(b'?');

    /// Creates a label from a character.
    ///
    /// # Errors
    ///
    /// Returns an error unless `value` is in `0x20..=0x7e`.
    ///
    /// ```
    /// use ledsign::Label;
    ///
    /// let label = Label::new('A')?;
    /// assert_eq!(b'A', label.value());
    /// assert!(Label::new('\u{7f}').is_err());
    /// # Ok::<(), ledsign::LabelError>(())
    /// ```
    pub fn new(value: char) -> Result<Self, LabelError> {
        u8::try_from(value)
            .ok()
            .filter(|byte| is_printable(*byte))
            .map(Self)
            .ok_or_else(|| LabelError::InvalidLabel {
                label: value.to_string(),
            })
    }

    /// Returns the label byte.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns whether this is the priority page label.
    #[must_use]
    pub fn is_priority(self) -> bool {
        self == Self::PRIORITY
    }
}

impl TryFrom<u8> for Label {
    type Error = LabelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(char::from(value))
    }
}

impl FromStr for Label {
    type Err = LabelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(single), None) => Self::new(single),
            _ => Err(LabelError::InvalidLabel {
                label: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.0))
    }
}

/// A validated sign bus address in `1..=255`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::Display, derive_more::Into)]
#[display("{_0}")]
pub struct Address(u8);

impl Address {
    /// Creates a validated address.
    ///
    /// # Errors
    ///
    /// Returns an error when `value` is outside `1..=255`.
    ///
    /// ```
    /// use ledsign::Address;
    ///
    /// assert_eq!(7, Address::new(7)?.value());
    /// assert!(Address::new(0).is_err());
    /// assert!(Address::new(256).is_err());
    /// # Ok::<(), ledsign::LabelError>(())
    /// ```
    pub fn new(value: u16) -> Result<Self, LabelError> {
        if !(MIN_ADDRESS..=MAX_ADDRESS).contains(&value) {
            return Err(LabelError::InvalidAddress {
                value,
                min: MIN_ADDRESS,
                max: MAX_ADDRESS,
            });
        }

        u8::try_from(value)
            .map(Self)
            .map_err(|_error| LabelError::InvalidAddress {
                value,
                min: MIN_ADDRESS,
                max: MAX_ADDRESS,
            })
    }

    /// Returns the numeric address.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl FromStr for Address {
    type Err = LabelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<u16>()
            .map_err(|_error| LabelError::UnparsableAddress {
                value: value.to_string(),
            })?;
        Self::new(parsed)
    }
}

/// Which sign models on the bus a frame is meant for.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum SignSelector {
    /// Every sign model (`Z`).
    #[default]
    AllSigns,
    /// One sign-model filter byte, used while commissioning mixed buses.
    Model(u8),
}

impl SignSelector {
    /// Creates a model-filter selector.
    ///
    /// # Errors
    ///
    /// Returns an error unless `value` is printable ASCII.
    pub fn model(value: char) -> Result<Self, LabelError> {
        u8::try_from(value)
            .ok()
            .filter(|byte| is_printable(*byte))
            .map(Self::Model)
            .ok_or_else(|| LabelError::InvalidSelector {
                selector: value.to_string(),
            })
    }

    /// Returns the selector byte written after the start-of-header marker.
    #[must_use]
    pub const fn byte(self) -> u8 {
        match self {
            Self::AllSigns => ALL_SIGNS_SELECTOR,
            Self::Model(value) => value,
        }
    }
}

fn is_printable(byte: u8) -> bool {
    (MIN_PRINTABLE..=MAX_PRINTABLE).contains(&byte)
}
