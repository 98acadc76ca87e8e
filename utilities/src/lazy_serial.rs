use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, warn};

use crate::device_link::DeviceLink;

/// Serial port that is opened on first use and reopened when the device
/// disappears underneath it (e.g. a USB adapter being replugged).
pub struct LazySerialPort {
    path: String,
    baud_rate: u32,
    timeout: Duration,
    max_retries: u32,
    port: Option<Box<dyn SerialPort>>,
}

impl LazySerialPort {
    pub fn new(path: impl Into<String>, baud_rate: u32, timeout: Duration, max_retries: u32) -> Self {
        LazySerialPort {
            path: path.into(),
            baud_rate,
            timeout,
            max_retries,
            port: None,
        }
    }

    pub fn open(&mut self) -> io::Result<()> {
        for attempt in 0..=self.max_retries {
            match serialport::new(&self.path, self.baud_rate)
                .timeout(self.timeout)
                .open()
            {
                Ok(port) => {
                    debug!("Opened serial port {} at {} baud", self.path, self.baud_rate);
                    self.port = Some(port);
                    return Ok(());
                }
                Err(e) if attempt == self.max_retries => return Err(e.into()),
                Err(e) => warn!("Failed to open {} (attempt {}): {}", self.path, attempt + 1, e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::Other,
            "Max connection retries reached",
        ))
    }

    pub fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed serial port {}", self.path);
        }
    }

    pub fn reopen(&mut self) -> io::Result<()> {
        self.close();
        self.open()
    }

    fn ensure_open(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        if self.port.is_none() {
            self.open()?;
        }
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Serial port not open"))
    }
}

impl DeviceLink for LazySerialPort {
    fn reconnect(&mut self) -> io::Result<()> {
        self.reopen()
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof
    )
}

impl Read for LazySerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.ensure_open()?.read(buf) {
            Err(e) if is_disconnect(&e) => {
                warn!("Serial port {} lost ({}), reopening", self.path, e);
                self.reopen()?;
                self.ensure_open()?.read(buf)
            }
            result => result,
        }
    }
}

impl Write for LazySerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.ensure_open()?.write(buf) {
            Err(e) if is_disconnect(&e) => {
                warn!("Serial port {} lost ({}), reopening", self.path, e);
                self.reopen()?;
                self.ensure_open()?.write(buf)
            }
            result => result,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ensure_open()?.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_fails_to_open_and_stays_closed() {
        let mut port = LazySerialPort::new(
            "/dev/this-serial-port-does-not-exist",
            9600,
            Duration::from_millis(10),
            1,
        );

        assert!(port.open().is_err());
        assert!(port.port.is_none());
    }

    #[test]
    fn reconnect_to_missing_device_fails() {
        let mut port = LazySerialPort::new(
            "/dev/this-serial-port-does-not-exist",
            9600,
            Duration::from_millis(10),
            0,
        );

        assert!(port.reconnect().is_err());
        assert!(port.port.is_none());
    }

    #[test]
    fn write_to_missing_device_reports_error() {
        let mut port = LazySerialPort::new(
            "/dev/this-serial-port-does-not-exist",
            9600,
            Duration::from_millis(10),
            0,
        );

        assert!(port.write_all(b"*IDN?\n").is_err());
        assert!(port.port.is_none());
    }
}
