//! Lighting feature report layout.
//!
//! The keyboard takes its entire lighting state in a single 32 byte feature
//! report with ID `0xCC`:
//!
//! ```text
//! offset  size  field
//! 0       1     report ID (0xCC)
//! 1       1     0x16
//! 2       1     effect code
//! 3       1     speed (1..=4)
//! 4       1     brightness (1..=2)
//! 5       12    RGB of zones 0..=3, only for static and breath
//! 17      1     0x00
//! 18      1     wave right-to-left flag
//! 19      1     wave left-to-right flag
//! 20      12    padding
//! ```
//!
//! Reading the report back from the device yields the same layout.

use std::ops::RangeInclusive;

use bytes::{BufMut, Bytes, BytesMut};
use clap::ValueEnum;

use crate::color::{Rgb, ZONE_COUNT};
use crate::error::{Error, Result};

/// Feature report ID of the lighting state.
pub const REPORT_ID: u8 = 0xcc;

/// Size of the lighting state report sent to the device.
pub const REPORT_LEN: usize = 32;

/// Minimum size of a report read back from the device.
pub const MIN_REPORT_LEN: usize = 5;

/// Size of the buffer used for reading the lighting state.
pub const READ_BUFFER_LEN: usize = 64;

pub const SPEED_RANGE: RangeInclusive<u8> = 1..=4;
pub const BRIGHTNESS_RANGE: RangeInclusive<u8> = 1..=2;

const REPORT_KIND: u8 = 0x16;
const ZONES_OFFSET: usize = 5;
const WAVE_RTL_OFFSET: usize = 18;
const WAVE_LTR_OFFSET: usize = 19;

/// Lighting effect.
#[repr(u8)]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Effect {
    /// Keep the current effect, only used for brightness changes.
    None = 0x00,
    Static = 0x01,
    Breath = 0x03,
    Wave = 0x04,
    Hue = 0x06,
}

impl Effect {
    /// Protocol value of the effect.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether the effect makes use of the zone colors.
    pub const fn has_colors(self) -> bool {
        matches!(self, Self::Static | Self::Breath)
    }
}

impl TryFrom<u8> for Effect {
    type Error = u8;

    fn try_from(code: u8) -> std::result::Result<Self, u8> {
        match code {
            0x00 => Ok(Self::None),
            0x01 => Ok(Self::Static),
            0x03 => Ok(Self::Breath),
            0x04 => Ok(Self::Wave),
            0x06 => Ok(Self::Hue),
            code => Err(code),
        }
    }
}

/// Effect code as stored in a report.
///
/// Firmware revisions may report effects this crate does not know about, those
/// are kept as their raw value so they survive a read-modify-write cycle.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum EffectCode {
    Known(Effect),
    Unknown(u8),
}

impl EffectCode {
    pub const fn code(self) -> u8 {
        match self {
            Self::Known(effect) => effect.code(),
            Self::Unknown(code) => code,
        }
    }

    pub fn effect(self) -> Option<Effect> {
        match self {
            Self::Known(effect) => Some(effect),
            Self::Unknown(_) => None,
        }
    }

    fn is(self, effect: Effect) -> bool {
        self == Self::Known(effect)
    }
}

impl From<Effect> for EffectCode {
    fn from(effect: Effect) -> Self {
        Self::Known(effect)
    }
}

impl From<u8> for EffectCode {
    fn from(code: u8) -> Self {
        Effect::try_from(code).map_or(Self::Unknown(code), Self::Known)
    }
}

/// Direction of the wave effect.
#[derive(ValueEnum, Default, PartialEq, Eq, Debug, Copy, Clone)]
pub enum WaveDirection {
    #[default]
    #[value(skip)]
    None,
    #[value(name = "ltr")]
    LeftToRight,
    #[value(name = "rtl")]
    RightToLeft,
}

/// Complete lighting state of the keyboard.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct EffectParams {
    pub effect: EffectCode,
    pub speed: u8,
    pub brightness: u8,
    pub zones: [Rgb; ZONE_COUNT],
    pub wave_direction: WaveDirection,
}

impl EffectParams {
    /// Create lighting parameters with all zones black.
    ///
    /// Speed and brightness are rejected if they are outside of
    /// [`SPEED_RANGE`] and [`BRIGHTNESS_RANGE`].
    pub fn new(effect: Effect, speed: u8, brightness: u8) -> Result<Self> {
        Ok(Self {
            effect: effect.into(),
            speed: validate_speed(speed)?,
            brightness: validate_brightness(brightness)?,
            zones: [Rgb::BLACK; ZONE_COUNT],
            wave_direction: WaveDirection::None,
        })
    }

    pub fn with_zones(mut self, zones: [Rgb; ZONE_COUNT]) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_wave_direction(mut self, direction: WaveDirection) -> Self {
        self.wave_direction = direction;
        self
    }

    fn has_colors(&self) -> bool {
        self.effect.effect().map_or(false, Effect::has_colors)
    }
}

/// Ensure animation speed is within [`SPEED_RANGE`].
pub fn validate_speed(speed: u8) -> Result<u8> {
    validate_range("speed", speed, SPEED_RANGE)
}

/// Ensure brightness is within [`BRIGHTNESS_RANGE`].
pub fn validate_brightness(brightness: u8) -> Result<u8> {
    validate_range("brightness", brightness, BRIGHTNESS_RANGE)
}

fn validate_range(field: &'static str, value: u8, range: RangeInclusive<u8>) -> Result<u8> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidRange { field, value, min: *range.start(), max: *range.end() })
    }
}

/// Convert lighting parameters to the outbound feature report.
pub fn encode_report(params: &EffectParams) -> Bytes {
    let mut buf = BytesMut::with_capacity(REPORT_LEN);

    // Report ID.
    buf.put_u8(REPORT_ID);

    // Lighting state report.
    buf.put_u8(REPORT_KIND);

    // Effect.
    buf.put_u8(params.effect.code());

    // Animation speed.
    buf.put_u8(params.speed);

    // Brightness.
    buf.put_u8(params.brightness);

    // Zone colors.
    if params.has_colors() {
        for zone in &params.zones {
            buf.put_u8(zone.r);
            buf.put_u8(zone.g);
            buf.put_u8(zone.b);
        }
    } else {
        buf.put_bytes(0, 3 * ZONE_COUNT);
    }

    // Padding.
    buf.put_u8(0);

    // Wave direction.
    let wave = params.effect.is(Effect::Wave);
    buf.put_u8((wave && params.wave_direction == WaveDirection::RightToLeft) as u8);
    buf.put_u8((wave && params.wave_direction == WaveDirection::LeftToRight) as u8);

    // Padding for the fixed report size.
    buf.put_bytes(0, REPORT_LEN - buf.len());

    buf.freeze()
}

/// Parse a feature report read from the device.
///
/// Only the first [`MIN_REPORT_LEN`] bytes are mandatory, zone colors and wave
/// direction are treated as unset when the report ends before them.
pub fn decode_report(report: &[u8]) -> Result<EffectParams> {
    if report.len() < MIN_REPORT_LEN {
        return Err(Error::ShortRead(report.len()));
    }

    let byte = |offset: usize| report.get(offset).copied().unwrap_or(0);

    let mut params = EffectParams {
        effect: EffectCode::from(report[2]),
        speed: report[3],
        brightness: report[4],
        zones: [Rgb::BLACK; ZONE_COUNT],
        wave_direction: WaveDirection::None,
    };

    if params.has_colors() {
        for (i, zone) in params.zones.iter_mut().enumerate() {
            let offset = ZONES_OFFSET + i * 3;
            *zone = Rgb::new(byte(offset), byte(offset + 1), byte(offset + 2));
        }
    }

    if params.effect.is(Effect::Wave) {
        params.wave_direction = if byte(WAVE_RTL_OFFSET) != 0 {
            WaveDirection::RightToLeft
        } else if byte(WAVE_LTR_OFFSET) != 0 {
            WaveDirection::LeftToRight
        } else {
            WaveDirection::None
        };
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONES: [Rgb; ZONE_COUNT] = [
        Rgb { r: 0xff, g: 0x00, b: 0x00 },
        Rgb { r: 0x00, g: 0xff, b: 0x00 },
        Rgb { r: 0x00, g: 0x00, b: 0xff },
        Rgb { r: 0x12, g: 0x34, b: 0x56 },
    ];

    fn wave(direction: WaveDirection) -> EffectParams {
        EffectParams::new(Effect::Wave, 2, 1).unwrap().with_wave_direction(direction)
    }

    #[test]
    fn sparse_effect_codes() {
        let effects = [Effect::None, Effect::Static, Effect::Breath, Effect::Wave, Effect::Hue];
        let codes: Vec<u8> = effects.iter().map(|effect| effect.code()).collect();
        assert_eq!(codes, [0x00, 0x01, 0x03, 0x04, 0x06]);

        for code in 0..=u8::MAX {
            assert_eq!(EffectCode::from(code).code(), code);
        }
        assert_eq!(EffectCode::from(0x02), EffectCode::Unknown(0x02));
        assert_eq!(EffectCode::from(0x03), EffectCode::Known(Effect::Breath));
    }

    #[test]
    fn static_layout() {
        let params = EffectParams::new(Effect::Static, 3, 2).unwrap().with_zones(ZONES);
        let report = encode_report(&params);

        assert_eq!(report.len(), REPORT_LEN);
        assert_eq!(report[..5], [0xcc, 0x16, 0x01, 0x03, 0x02]);
        assert_eq!(report[5..17], [
            0xff, 0x00, 0x00, 0x00, 0xff, 0x00, 0x00, 0x00, 0xff, 0x12, 0x34, 0x56
        ]);
        assert!(report[17..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn colors_only_for_static_and_breath() {
        for effect in [Effect::None, Effect::Wave, Effect::Hue] {
            let params = EffectParams::new(effect, 1, 1).unwrap().with_zones(ZONES);
            let report = encode_report(&params);

            assert_eq!(report.len(), REPORT_LEN);
            assert_eq!(report[2], effect.code());
            assert!(report[5..17].iter().all(|&byte| byte == 0));
        }
    }

    #[test]
    fn wave_direction_flags() {
        let report = encode_report(&wave(WaveDirection::LeftToRight));
        assert_eq!(report[18..20], [0, 1]);
        assert_eq!(decode_report(&report).unwrap().wave_direction, WaveDirection::LeftToRight);

        let report = encode_report(&wave(WaveDirection::RightToLeft));
        assert_eq!(report[18..20], [1, 0]);
        assert_eq!(decode_report(&report).unwrap().wave_direction, WaveDirection::RightToLeft);

        let report = encode_report(&wave(WaveDirection::None));
        assert_eq!(report[18..20], [0, 0]);
        assert_eq!(decode_report(&report).unwrap().wave_direction, WaveDirection::None);
    }

    #[test]
    fn direction_ignored_without_wave() {
        let params = EffectParams::new(Effect::Hue, 1, 1)
            .unwrap()
            .with_wave_direction(WaveDirection::LeftToRight);
        let report = encode_report(&params);
        assert_eq!(report[18..20], [0, 0]);

        let mut raw = [0u8; READ_BUFFER_LEN];
        raw[..5].copy_from_slice(&[0xcc, 0x16, 0x06, 1, 1]);
        raw[18] = 1;
        assert_eq!(decode_report(&raw).unwrap().wave_direction, WaveDirection::None);
    }

    #[test]
    fn rtl_flag_takes_precedence() {
        let mut raw = [0u8; READ_BUFFER_LEN];
        raw[..5].copy_from_slice(&[0xcc, 0x16, 0x04, 1, 1]);
        raw[18] = 1;
        raw[19] = 1;
        assert_eq!(decode_report(&raw).unwrap().wave_direction, WaveDirection::RightToLeft);
    }

    #[test]
    fn decode_roundtrip() {
        for effect in [Effect::Static, Effect::Breath] {
            let params = EffectParams::new(effect, 4, 2).unwrap().with_zones(ZONES);
            assert_eq!(decode_report(&encode_report(&params)).unwrap(), params);
        }
    }

    #[test]
    fn decode_blackens_zones_without_colors() {
        let mut raw = [0xabu8; READ_BUFFER_LEN];
        raw[2] = Effect::Hue.code();

        let params = decode_report(&raw).unwrap();
        assert_eq!(params.effect, EffectCode::Known(Effect::Hue));
        assert_eq!(params.zones, [Rgb::BLACK; ZONE_COUNT]);
    }

    #[test]
    fn decode_preserves_unknown_effect() {
        let raw = [0xcc, 0x16, 0x7f, 2, 1];
        let params = decode_report(&raw).unwrap();

        assert_eq!(params.effect, EffectCode::Unknown(0x7f));
        assert_eq!(params.speed, 2);
        assert_eq!(params.brightness, 1);
        assert_eq!(encode_report(&params)[2], 0x7f);
    }

    #[test]
    fn decode_short_report() {
        assert!(matches!(decode_report(&[0xcc, 0x16, 0x01, 0x01]), Err(Error::ShortRead(4))));
        assert!(matches!(decode_report(&[]), Err(Error::ShortRead(0))));
    }

    #[test]
    fn decode_partial_report() {
        let params = decode_report(&[0xcc, 0x16, 0x01, 0x02, 0x01, 0xff]).unwrap();
        assert_eq!(params.speed, 2);
        assert_eq!(params.zones[0], Rgb::new(0xff, 0x00, 0x00));
        assert_eq!(params.zones[1], Rgb::BLACK);
    }

    #[test]
    fn reject_out_of_range() {
        assert!(matches!(
            EffectParams::new(Effect::Static, 0, 1),
            Err(Error::InvalidRange { field: "speed", value: 0, .. })
        ));
        assert!(matches!(
            EffectParams::new(Effect::Static, 5, 1),
            Err(Error::InvalidRange { field: "speed", value: 5, .. })
        ));
        assert!(matches!(
            EffectParams::new(Effect::Static, 1, 3),
            Err(Error::InvalidRange { field: "brightness", value: 3, .. })
        ));
        assert_eq!(validate_speed(4).unwrap(), 4);
        assert_eq!(validate_brightness(1).unwrap(), 1);
    }
}
