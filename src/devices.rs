//! Supported keyboards.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Vendor ID shared by all supported keyboard controllers.
pub const VENDOR_ID: u16 = 0x048d;

/// Keyboard opened when no device is specified.
pub const DEFAULT_DEVICE: DeviceId = DeviceId::new(VENDOR_ID, 0xc993);

/// Product ID entry of a device descriptor.
static PID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""pid"\s*:\s*"0[xX]([0-9A-Fa-f]+)""#).unwrap());

/// USB vendor and product ID.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct DeviceId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceId {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self { vendor_id, product_id }
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        DEFAULT_DEVICE
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Load autodetection candidates from a device descriptor file.
///
/// A missing or unreadable file results in an empty list.
pub fn load_supported_devices(path: impl AsRef<Path>) -> Vec<DeviceId> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => parse_supported_devices(&content),
        Err(err) => {
            debug!("Unable to read device list {}: {err}", path.display());
            Vec::new()
        },
    }
}

/// Extract all `"pid": "0xNNNN"` entries from a device descriptor.
///
/// Product IDs are paired with [`VENDOR_ID`] and returned in file order.
/// Entries which do not fit into 16 bits are skipped.
pub fn parse_supported_devices(content: &str) -> Vec<DeviceId> {
    PID_REGEX
        .captures_iter(content)
        .filter_map(|captures| {
            let hex = &captures[1];
            match u16::from_str_radix(hex, 16) {
                Ok(product_id) => Some(DeviceId::new(VENDOR_ID, product_id)),
                Err(err) => {
                    debug!("Skipping product ID 0x{hex}: {err}");
                    None
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"[
        { "name": "Legion 5 2022", "pid": "0xC975" },
        { "name": "Legion 5 2023", "pid" : "0xc993" },
        { "name": "broken", "pid": "0x123456" },
        { "name": "no pid" },
        { "name": "Legion 7", "pid":"0xC965" }
    ]"#;

    #[test]
    fn parse_descriptor() {
        assert_eq!(parse_supported_devices(DESCRIPTOR), [
            DeviceId::new(VENDOR_ID, 0xc975),
            DeviceId::new(VENDOR_ID, 0xc993),
            DeviceId::new(VENDOR_ID, 0xc965),
        ]);
    }

    #[test]
    fn parse_without_devices() {
        assert!(parse_supported_devices("").is_empty());
        assert!(parse_supported_devices("{ \"pid\": 51603 }").is_empty());
    }

    #[test]
    fn load_descriptor_file() {
        let path = std::env::temp_dir().join(format!("legionaura-{}.json", std::process::id()));
        fs::write(&path, DESCRIPTOR).unwrap();

        let devices = load_supported_devices(&path);
        let _ = fs::remove_file(&path);

        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0], DeviceId::new(0x048d, 0xc975));
    }

    #[test]
    fn load_missing_file() {
        assert!(load_supported_devices("/nonexistent/legionaura/devices.json").is_empty());
    }

    #[test]
    fn display_identity() {
        assert_eq!(DEFAULT_DEVICE.to_string(), "048d:c993");
        assert_eq!(DeviceId::default(), DEFAULT_DEVICE);
    }
}
