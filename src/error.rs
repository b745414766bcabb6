//! Keyboard backlight errors.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Color token is not a 6 digit `RRGGBB` hex string.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("at least one color required")]
    ZoneCount,

    /// Speed or brightness outside of the range supported by the firmware.
    #[error("{field} must be {min}..={max}, got {value}")]
    InvalidRange { field: &'static str, value: u8, min: u8, max: u8 },

    #[error("unable to initialize libusb: {0}")]
    UsbUnavailable(#[source] rusb::Error),

    #[error("device {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("unable to claim interface: {0}")]
    InterfaceClaimFailed(#[source] rusb::Error),

    #[error("no supported device found")]
    NoSupportedDeviceFound,

    #[error("device is not open")]
    NotOpen,

    #[error("feature report transfer failed: {0}")]
    TransferFailed(#[source] TransferError),

    #[error("feature report too short: {0} bytes")]
    ShortRead(usize),
}

impl Error {
    /// Whether the error originates from input validation rather than the device.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidColor(_) | Self::ZoneCount | Self::InvalidRange { .. })
    }

    /// Whether the error happened while locating or claiming the device.
    pub fn is_device_unavailable(&self) -> bool {
        matches!(
            self,
            Self::UsbUnavailable(_)
                | Self::DeviceNotFound { .. }
                | Self::InterfaceClaimFailed(_)
                | Self::NoSupportedDeviceFound
        )
    }
}

/// Cause of a failed feature report transfer.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error(transparent)]
    Usb(#[from] rusb::Error),

    /// Transfer completed, but with an unexpected number of bytes.
    #[error("{actual} of {expected} bytes transferred")]
    Length { expected: usize, actual: usize },
}
