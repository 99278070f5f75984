//! Serial device discovery
//!
//! Lists character devices that look like USB/UART serial ports so an
//! operator can pick the sensor node at startup (`ecosense ports`).

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Device-name prefixes that usually belong to serial adapters.
///
/// Linux: `ttyACM*` (CDC-ACM boards), `ttyUSB*` (FTDI/CH340), `ttyAMA*`/`serial*`
/// (Raspberry Pi UART). macOS: `cu.usbmodem*`, `cu.usbserial*`.
pub const SERIAL_PREFIXES: &[(&str, &str)] = &[
    ("ttyACM", "USB CDC-ACM"),
    ("ttyUSB", "USB serial adapter"),
    ("ttyAMA", "on-board UART"),
    ("serial", "on-board UART"),
    ("cu.usbmodem", "USB CDC-ACM"),
    ("cu.usbserial", "USB serial adapter"),
];

/// A candidate serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialPortInfo {
    pub path: PathBuf,
    pub description: &'static str,
}

/// Scan `/dev` for serial devices, sorted by path.
pub fn list_serial_ports() -> Vec<SerialPortInfo> {
    list_serial_ports_in(Path::new("/dev"))
}

/// Scan an arbitrary directory; split out so tests can use a temp dir.
pub fn list_serial_ports_in(dir: &Path) -> Vec<SerialPortInfo> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Cannot list device directory");
            return Vec::new();
        }
    };

    let mut ports: Vec<SerialPortInfo> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            SERIAL_PREFIXES
                .iter()
                .find(|&&(prefix, _)| name.starts_with(prefix))
                .map(|&(_, description)| SerialPortInfo {
                    path: entry.path(),
                    description,
                })
        })
        .collect();

    ports.sort_by(|a, b| a.path.cmp(&b.path));
    ports
}

/// Log the available ports, the way the node's bring-up checklist expects.
pub fn log_available_ports() {
    let ports = list_serial_ports();
    if ports.is_empty() {
        info!("No serial ports detected");
        return;
    }
    info!("Available serial ports:");
    for port in &ports {
        info!("  - {}: {}", port.path.display(), port.description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_only_serial_like_devices() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ttyUSB0", "ttyACM1", "tty0", "null", "ttyACM0", "cu.usbmodem1401"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let ports = list_serial_ports_in(dir.path());
        let names: Vec<_> = ports
            .iter()
            .map(|p| p.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["cu.usbmodem1401", "ttyACM0", "ttyACM1", "ttyUSB0"]);
        assert_eq!(ports[1].description, "USB CDC-ACM");
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        assert!(list_serial_ports_in(Path::new("/nonexistent/dev")).is_empty());
    }
}
