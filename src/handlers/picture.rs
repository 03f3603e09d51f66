use thiserror::Error;
use tracing::instrument;

use crate::error::ProtocolError;
use crate::hw::SignSession;
use crate::protocol::{CR, CommandCode, LF};

use super::frame_codec::encode_hex;
use super::label::Label;

pub(crate) const MAX_PICTURE_WIDTH: usize = 255;
pub(crate) const MAX_PICTURE_HEIGHT: usize = 31;
const DIMENSION_HEX_WIDTH: usize = 2;

/// Errors returned while building picture payloads.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum PictureError {
    /// The grid is empty or its rows differ in length.
    #[error("picture rows must be non-empty and share one width: {reason}")]
    MalformedGrid { reason: String },
    /// The grid exceeds the picture page limits.
    #[error("picture is {width}x{height} but must be at most {max_width}x{max_height}")]
    SizeLimitExceeded {
        width: usize,
        height: usize,
        max_width: usize,
        max_height: usize,
    },
    /// A cell holds a symbol outside the colour table.
    #[error("illegal colour symbol `{symbol}` at row {row}, column {column}")]
    InvalidColorSymbol {
        symbol: char,
        row: usize,
        column: usize,
    },
}

/// One picture cell colour.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PixelColor {
    Off,
    Red,
    Green,
    Amber,
    DimRed,
    DimGreen,
    DimAmber,
}

impl PixelColor {
    /// Returns the byte sent for this colour.
    #[must_use]
    pub const fn byte(self) -> u8 {
        match self {
            Self::Off => 0x30,
            Self::Red => 0x31,
            Self::Green => 0x32,
            Self::Amber => 0x33,
            Self::DimRed => 0x34,
            Self::DimGreen => 0x35,
            Self::DimAmber => 0x36,
        }
    }

    /// Maps a grid symbol to a colour.
    ///
    /// Upper case is bright, lower case is dim, `-` is off.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '-' => Some(Self::Off),
            'R' => Some(Self::Red),
            'G' => Some(Self::Green),
            'A' => Some(Self::Amber),
            'r' => Some(Self::DimRed),
            'g' => Some(Self::DimGreen),
            'a' => Some(Self::DimAmber),
            _ => None,
        }
    }
}

/// A validated rectangular picture.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PictureGrid {
    width: usize,
    rows: Vec<Vec<PixelColor>>,
}

impl PictureGrid {
    /// Parses rows of colour symbols.
    ///
    /// # Errors
    ///
    /// Returns an error for ragged or empty grids, grids larger than 255x31,
    /// or unknown symbols.
    ///
    /// ```
    /// use ledsign::PictureGrid;
    ///
    /// let grid = PictureGrid::from_rows(["-R", "Ag"])?;
    /// assert_eq!((2, 2), (grid.width(), grid.height()));
    /// # Ok::<(), ledsign::PictureError>(())
    /// ```
    pub fn from_rows<I, S>(rows: I) -> Result<Self, PictureError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols: Vec<Vec<char>> = rows
            .into_iter()
            .map(|row| row.as_ref().chars().collect())
            .collect();

        let Some(first) = symbols.first() else {
            return Err(PictureError::MalformedGrid {
                reason: "grid has no rows".to_string(),
            });
        };
        let width = first.len();
        if width == 0 {
            return Err(PictureError::MalformedGrid {
                reason: "rows have no cells".to_string(),
            });
        }
        if let Some(index) = symbols.iter().position(|row| row.len() != width) {
            return Err(PictureError::MalformedGrid {
                reason: format!(
                    "row {index} has {} cells, expected {width}",
                    symbols[index].len()
                ),
            });
        }

        let height = symbols.len();
        if width > MAX_PICTURE_WIDTH || height > MAX_PICTURE_HEIGHT {
            return Err(PictureError::SizeLimitExceeded {
                width,
                height,
                max_width: MAX_PICTURE_WIDTH,
                max_height: MAX_PICTURE_HEIGHT,
            });
        }

        let rows = symbols
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .map(|(column, symbol)| {
                        PixelColor::from_symbol(*symbol).ok_or(PictureError::InvalidColorSymbol {
                            symbol: *symbol,
                            row,
                            column,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { width, rows })
    }

    /// Number of pixels in each row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Handler for picture page writes.
pub struct PictureHandler;

impl PictureHandler {
    pub(crate) fn payload_for(label: Label, grid: &PictureGrid) -> Vec<u8> {
        let mut payload = Vec::with_capacity(6 + grid.height() * (grid.width() + 2));
        payload.push(CommandCode::WritePicture.tag());
        payload.push(label.value());
        payload.extend_from_slice(dimension_hex(grid.height()).as_bytes());
        payload.extend_from_slice(dimension_hex(grid.width()).as_bytes());
        for row in &grid.rows {
            payload.extend(row.iter().map(|color| color.byte()));
            payload.extend_from_slice(&[CR, LF]);
        }
        payload
    }

    /// Writes a picture to a page configured as a picture.
    ///
    /// ```
    /// # fn demo(session: &mut ledsign::SignSession) -> Result<(), ledsign::ProtocolError> {
    /// use ledsign::{Label, PictureGrid, PictureHandler};
    ///
    /// let grid = PictureGrid::from_rows(["R-R", "-G-"])?;
    /// PictureHandler::write_picture(session, Label::new('C')?, &grid)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the transport write fails.
    #[instrument(
        skip(session, grid),
        level = "debug",
        fields(%label, width = grid.width(), height = grid.height())
    )]
    pub fn write_picture(
        session: &mut SignSession,
        label: Label,
        grid: &PictureGrid,
    ) -> Result<(), ProtocolError> {
        session.send_command(&Self::payload_for(label, grid))
    }
}

fn dimension_hex(value: usize) -> String {
    // Grid limits keep both dimensions within one byte.
    encode_hex(u32::try_from(value).unwrap_or(u32::MAX), DIMENSION_HEX_WIDTH)
}
