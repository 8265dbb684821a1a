// Serial transport seam
//
// The rig only needs two things from the serial layer: a list of ports and a
// way to open one. Keeping that behind a trait lets the record be built and
// tested without hardware attached.

use serialport::SerialPort;
use std::time::Duration;
use tracing::debug;

use crate::config::DEFAULT_TIMEOUT_MS;

/// Port enumeration and opening
pub trait SerialTransport {
    /// Handle owned by the rig once a port is open
    type Handle;

    /// Paths of the ports currently present, in system order
    fn available_ports(&self) -> Result<Vec<String>, serialport::Error>;

    /// Open `path` at `baud_rate`
    fn open(&self, path: &str, baud_rate: u32) -> Result<Self::Handle, serialport::Error>;
}

/// The host's serial ports, via the `serialport` crate
#[derive(Debug, Clone)]
pub struct SystemSerial {
    timeout: Duration,
}

impl SystemSerial {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// Use a custom read/write timeout for opened ports
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialTransport for SystemSerial {
    type Handle = Box<dyn SerialPort>;

    fn available_ports(&self) -> Result<Vec<String>, serialport::Error> {
        let ports = serialport::available_ports()?;
        debug!("Found {} serial port(s)", ports.len());
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, path: &str, baud_rate: u32) -> Result<Self::Handle, serialport::Error> {
        serialport::new(path, baud_rate)
            .timeout(self.timeout)
            .open()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::RefCell;

    /// Handle returned by [`MockSerial`]; remembers what it was opened with
    #[derive(Debug, Clone, PartialEq)]
    pub struct MockPort {
        pub path: String,
        pub baud_rate: u32,
    }

    /// In-memory transport for tests
    #[derive(Debug, Default)]
    pub struct MockSerial {
        pub ports: Vec<String>,
        pub fail_listing: bool,
        pub fail_open: bool,
        pub opened: RefCell<Vec<(String, u32)>>,
        pub listed: RefCell<usize>,
    }

    impl MockSerial {
        pub fn with_ports(ports: &[&str]) -> Self {
            Self {
                ports: ports.iter().map(|p| p.to_string()).collect(),
                ..Self::default()
            }
        }
    }

    impl SerialTransport for MockSerial {
        type Handle = MockPort;

        fn available_ports(&self) -> Result<Vec<String>, serialport::Error> {
            *self.listed.borrow_mut() += 1;
            if self.fail_listing {
                return Err(serialport::Error::new(
                    serialport::ErrorKind::Unknown,
                    "enumeration failed",
                ));
            }
            Ok(self.ports.clone())
        }

        fn open(&self, path: &str, baud_rate: u32) -> Result<MockPort, serialport::Error> {
            self.opened.borrow_mut().push((path.to_string(), baud_rate));
            if self.fail_open {
                return Err(serialport::Error::new(
                    serialport::ErrorKind::NoDevice,
                    format!("{} is gone", path),
                ));
            }
            Ok(MockPort {
                path: path.to_string(),
                baud_rate,
            })
        }
    }
}
