//! Serial port adapter for the solar microcontroller.
//!
//! Wraps a `serialport` handle behind the [`SerialLink`] port. Port
//! discovery opens every available port in turn, sends `?` and waits for a
//! reply naming the device tag.

use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app::ports::SerialLink;
use crate::error::LinkFault;

/// Open serial connection to the microcontroller.
pub struct SerialPortLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SerialPortLink {
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<Self, LinkFault> {
        let port = serialport::new(path, baud)
            .timeout(read_timeout)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| LinkFault::OpenFailed {
                port: path.to_string(),
                reason: e.to_string(),
            })?;
        debug!("Opened {path} at {baud} baud");
        Ok(Self {
            port,
            name: path.to_string(),
        })
    }
}

impl SerialLink for SerialPortLink {
    type Error = io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), io::Error> {
        Write::write_all(&mut self.port, data)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        Write::flush(&mut self.port)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One entry of [`list_ports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    pub name: String,
    pub kind: &'static str,
    pub description: Option<String>,
}

fn port_type_name(port_type: &serialport::SerialPortType) -> &'static str {
    match port_type {
        serialport::SerialPortType::UsbPort(_) => "USB",
        serialport::SerialPortType::BluetoothPort => "Bluetooth",
        serialport::SerialPortType::PciPort => "PCI",
        serialport::SerialPortType::Unknown => "Unknown",
    }
}

/// Every serial port the OS reports.
pub fn list_ports() -> Result<Vec<PortSummary>, LinkFault> {
    let ports = serialport::available_ports().map_err(|e| LinkFault::OpenFailed {
        port: "<enumerate>".to_string(),
        reason: e.to_string(),
    })?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match &p.port_type {
                serialport::SerialPortType::UsbPort(info) => info
                    .product
                    .clone()
                    .or_else(|| info.manufacturer.clone()),
                _ => None,
            };
            PortSummary {
                kind: port_type_name(&p.port_type),
                name: p.port_name,
                description,
            }
        })
        .collect())
}

/// Ask whatever is on `link` to identify itself; `true` when the reply
/// contains `tag` within `timeout`.
pub fn probe<L: SerialLink>(link: &mut L, tag: &str, timeout: Duration) -> bool {
    if let Err(e) = link.write_all(b"?").and_then(|()| link.flush()) {
        debug!("Probe write to {} failed: {e}", link.name());
        return false;
    }

    let deadline = Instant::now() + timeout;
    let mut reply = Vec::new();
    let mut buf = [0u8; 64];
    while Instant::now() < deadline {
        match link.read(&mut buf) {
            Ok(0) => thread::sleep(Duration::from_millis(20)),
            Ok(n) => {
                reply.extend_from_slice(&buf[..n]);
                if String::from_utf8_lossy(&reply).contains(tag) {
                    return true;
                }
            }
            Err(e) => {
                debug!("Probe read from {} failed: {e}", link.name());
                return false;
            }
        }
    }
    false
}

/// Find the port whose device answers the probe with `tag`.
pub fn discover(
    tag: &str,
    baud: u32,
    read_timeout: Duration,
    probe_timeout: Duration,
) -> Result<SerialPortLink, LinkFault> {
    for summary in list_ports()? {
        let mut link = match SerialPortLink::open(&summary.name, baud, read_timeout) {
            Ok(link) => link,
            Err(e) => {
                debug!("Skipping {}: {e}", summary.name);
                continue;
            }
        };
        if probe(&mut link, tag, probe_timeout) {
            info!("Found '{tag}' device on {}", summary.name);
            return Ok(link);
        }
    }
    warn!("No serial port answered as '{tag}'");
    Err(LinkFault::PortNotFound(tag.to_string()))
}
