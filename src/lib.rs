//! Lenovo Legion 4-zone keyboard backlight control.
//!
//! The keyboard's whole lighting state lives in one HID feature report, which
//! is written and read back with USB control transfers.

pub mod color;
pub mod controller;
pub mod devices;
pub mod error;
pub mod report;
pub mod session;

pub use crate::color::{normalize_zones, parse_color, parse_zones, Rgb, ZONE_COUNT};
pub use crate::controller::{FeatureReportDevice, LightingController};
pub use crate::devices::{load_supported_devices, DeviceId, DEFAULT_DEVICE};
pub use crate::error::{Error, Result, TransferError};
pub use crate::report::{
    decode_report, encode_report, Effect, EffectCode, EffectParams, WaveDirection,
};
pub use crate::session::UsbSession;
