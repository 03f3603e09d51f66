mod configuration;
mod format;
mod frame_codec;
mod label;
mod picture;
mod sign_admin;
mod string_page;
mod text_write;

pub use self::configuration::{
    ColorDepth, ConfigurationError, ConfigurationHandler, ConfigurationTransaction, PageConfig,
    PageKind,
};
pub use self::format::{
    CapabilityMask, ColorCode, FormatError, FormatNode, GroupKind, render_all,
};
pub use self::frame_codec::{FrameCodec, ResponseError, ResponseFrame, encode_hex};
pub use self::label::{Address, Label, LabelError, SignSelector};
pub use self::picture::{PictureError, PictureGrid, PictureHandler, PixelColor};
pub use self::sign_admin::{SignAdminHandler, SignType};
pub use self::string_page::StringPageHandler;
pub use self::text_write::{FormatRequest, TextWriteHandler};
