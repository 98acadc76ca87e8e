use std::io::{self, Read, Write};

/// Byte link to a device that can be torn down and opened again.
pub trait DeviceLink: Read + Write + Send {
    fn reconnect(&mut self) -> io::Result<()>;
}
