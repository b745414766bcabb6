//! Zone colors.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of independently colorable keyboard zones.
pub const ZONE_COUNT: usize = 4;

/// RGB color.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Rgb> {
        parse_color(s)
    }
}

impl Display for Rgb {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parse a color in the `RRGGBB` hex format.
///
/// Hex digits are accepted in either case. Prefixes like `#` or `0x` are
/// rejected.
pub fn parse_color(token: &str) -> Result<Rgb> {
    let invalid = || Error::InvalidColor(token.to_string());

    // `from_str_radix` alone would also accept a leading sign.
    if token.len() != 6 || !token.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let mut color = u32::from_str_radix(token, 16).map_err(|_| invalid())?;
    let b = (color & 0xff) as u8;
    color >>= 8;
    let g = (color & 0xff) as u8;
    color >>= 8;
    let r = color as u8;

    Ok(Rgb { r, g, b })
}

/// Expand user supplied color tokens to one token per zone.
///
/// The last token is repeated for all remaining zones and anything beyond
/// [`ZONE_COUNT`] is dropped. An empty input is returned unchanged, it is up
/// to the caller to reject it.
pub fn normalize_zones<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let mut zones: Vec<String> =
        tokens.iter().take(ZONE_COUNT).map(|token| token.as_ref().to_lowercase()).collect();

    if let Some(last) = zones.last().cloned() {
        zones.resize(ZONE_COUNT, last);
    }

    zones
}

/// Normalize and parse color tokens into the colors of all zones.
pub fn parse_zones<S: AsRef<str>>(tokens: &[S]) -> Result<[Rgb; ZONE_COUNT]> {
    let normalized = normalize_zones(tokens);
    if normalized.is_empty() {
        return Err(Error::ZoneCount);
    }

    let mut zones = [Rgb::BLACK; ZONE_COUNT];
    for (zone, token) in zones.iter_mut().zip(&normalized) {
        *zone = parse_color(token)?;
    }

    Ok(zones)
}
