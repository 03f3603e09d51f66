pub(crate) mod command;
pub(crate) mod painter;
pub(crate) mod sign;

pub use self::command::{
    Args, ChangeAddressArgs, Command, ConfigureArgs, FakeArgs, LogLevel, OutputFormat,
    ReadStringArgs, SerialArgs, TransportArgs, WritePictureArgs, WriteStringArgs, WriteTextArgs,
};
