//! Serial source handling.

use crate::acquisition::config::AcquisitionConfig;
use crate::error::{Result, TelemetryError};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::fs::File;
use std::path::Path;

/// Information about an available serial port.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PortInfo {
    /// Port name (e.g. "/dev/ttyS0")
    pub name: String,
    /// Short description of the port type
    pub kind: String,
    /// Product name, if the port is a USB device that reports one
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (kind, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (
                format!("USB {:04x}:{:04x}", usb.vid, usb.pid),
                usb.product,
            ),
            SerialPortType::PciPort => ("PCI".to_string(), None),
            SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None),
            SerialPortType::Unknown => ("unknown".to_string(), None),
        };

        Self {
            name: info.port_name,
            kind,
            product,
        }
    }
}

/// List serial ports visible to the OS, sorted by name.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .map_err(|e| TelemetryError::serial_fault(e.to_string()))?
        .into_iter()
        .map(PortInfo::from)
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ports)
}

/// Open the serial device: 8N1, no flow control, configured read timeout.
pub fn open_serial(config: &AcquisitionConfig) -> Result<Box<dyn SerialPort>> {
    serialport::new(&config.device, config.baud_rate)
        .timeout(config.read_timeout())
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .open()
        .map_err(|e| TelemetryError::serial_fault(format!("open {}: {}", config.device, e)))
}

/// Open a recorded frame file to stand in for the serial device.
pub fn open_replay(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        TelemetryError::serial_fault(format!("open replay {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_ports() {
        // Only checks the call does not panic; CI machines rarely have ports.
        if let Ok(ports) = list_ports() {
            for port in &ports {
                assert!(!port.name.is_empty());
            }
        }
    }

    #[test]
    fn test_open_missing_device_is_serial_fault() {
        let config = AcquisitionConfig::new("/dev/does-not-exist-solar");
        let err = open_serial(&config).err().unwrap();
        assert!(matches!(err, TelemetryError::SerialFault(_)));
    }

    #[test]
    fn test_open_missing_replay_is_serial_fault() {
        let err = open_replay(Path::new("/nonexistent/frames.tsv")).unwrap_err();
        assert!(matches!(err, TelemetryError::SerialFault(_)));
    }
}
