//! Keyboard lighting controller.

use bytes::Bytes;
use tracing::debug;

use crate::color::{Rgb, ZONE_COUNT};
use crate::error::Result;
use crate::report::{self, Effect, EffectParams, BRIGHTNESS_RANGE, READ_BUFFER_LEN};

/// Device exchanging HID feature reports.
pub trait FeatureReportDevice {
    /// Write a complete feature report to the device.
    fn send_report(&mut self, report: &[u8]) -> Result<()>;

    /// Read the current feature report into a buffer of `buffer_size` bytes.
    fn get_report(&mut self, buffer_size: usize) -> Result<Bytes>;
}

impl<D: FeatureReportDevice + ?Sized> FeatureReportDevice for &mut D {
    fn send_report(&mut self, report: &[u8]) -> Result<()> {
        (**self).send_report(report)
    }

    fn get_report(&mut self, buffer_size: usize) -> Result<Bytes> {
        (**self).get_report(buffer_size)
    }
}

/// Applies lighting effects to a keyboard.
pub struct LightingController<D> {
    device: D,
}

impl<D: FeatureReportDevice> LightingController<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Replace the keyboard's lighting state.
    ///
    /// Parameters are sent as-is, range validation happens in
    /// [`EffectParams::new`].
    pub fn apply(&mut self, params: &EffectParams) -> Result<()> {
        debug!(?params, "Applying lighting state");
        let report = report::encode_report(params);
        self.device.send_report(&report)
    }

    /// Turn off all zones.
    pub fn off(&mut self) -> Result<()> {
        let params = EffectParams::new(Effect::Static, 1, 1)?.with_zones([Rgb::BLACK; ZONE_COUNT]);
        self.apply(&params)
    }

    /// Read the keyboard's current lighting state.
    pub fn read_state(&mut self) -> Result<EffectParams> {
        let report = self.device.get_report(READ_BUFFER_LEN)?;
        report::decode_report(&report)
    }

    /// Change brightness while keeping the active effect.
    ///
    /// The protocol has no standalone brightness message, so the current state
    /// is read back and rewritten with only the brightness replaced. Nothing is
    /// written if reading the state fails. Levels outside of the supported
    /// range are clamped.
    pub fn set_brightness_only(&mut self, level: u8) -> Result<()> {
        let brightness = level.clamp(*BRIGHTNESS_RANGE.start(), *BRIGHTNESS_RANGE.end());

        let mut params = self.read_state()?;
        params.brightness = brightness;

        self.apply(&params)
    }
}
