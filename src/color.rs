use crate::Error;
use std::fmt;
use std::str::FromStr;

/// An RGBA color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self { red, green, blue, alpha }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            1.0,
        )
    }

    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        (to_byte(self.red), to_byte(self.green), to_byte(self.blue))
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` or `transparent`.
    ///
    /// `rgb()` channels are integers in `0..=255` or percentages; the alpha
    /// of `rgba()` is a number in `0..=1`.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let spec = input.trim();
        let invalid = || Error::InvalidColor(input.to_string());

        if spec.eq_ignore_ascii_case("transparent") {
            return Ok(Self::TRANSPARENT);
        }
        if let Some(hex) = spec.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }

        let lower = spec.to_ascii_lowercase();
        let (args, has_alpha) = if let Some(rest) = lower.strip_prefix("rgba(") {
            (rest, true)
        } else if let Some(rest) = lower.strip_prefix("rgb(") {
            (rest, false)
        } else {
            return Err(invalid());
        };
        let args = args.strip_suffix(')').ok_or_else(invalid)?;
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let expected = if has_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return Err(invalid());
        }

        let red = parse_channel(parts[0]).ok_or_else(invalid)?;
        let green = parse_channel(parts[1]).ok_or_else(invalid)?;
        let blue = parse_channel(parts[2]).ok_or_else(invalid)?;
        let alpha = if has_alpha {
            parse_alpha(parts[3]).ok_or_else(invalid)?
        } else {
            1.0
        };
        Ok(Self::new(red, green, blue, alpha))
    }
}

impl FromStr for Rgba {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.to_rgb8();
        if self.is_opaque() {
            write!(f, "rgb({r},{g},{b})")
        } else {
            write!(f, "rgba({r},{g},{b},{})", self.alpha)
        }
    }
}

fn to_byte(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digits: Vec<u8> = match hex.len() {
        3 | 4 => hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| (d * 17) as u8))
            .collect::<Option<Vec<_>>>()?,
        6 | 8 => (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
            .collect::<Option<Vec<_>>>()?,
        _ => return None,
    };
    let alpha = digits.get(3).map_or(1.0, |a| f64::from(*a) / 255.0);
    let mut color = Rgba::from_rgb8(digits[0], digits[1], digits[2]);
    color.alpha = alpha;
    Some(color)
}

fn parse_channel(raw: &str) -> Option<f64> {
    if let Some(pct) = raw.strip_suffix('%') {
        let value: f64 = pct.trim().parse().ok()?;
        return (0.0..=100.0).contains(&value).then_some(value / 100.0);
    }
    let value: u8 = raw.parse().ok()?;
    Some(f64::from(value) / 255.0)
}

fn parse_alpha(raw: &str) -> Option<f64> {
    let value: f64 = raw.parse().ok()?;
    (0.0..=1.0).contains(&value).then_some(value)
}

const PALETTE: &[(u8, u8, u8)] = &[
    (137, 180, 250),
    (166, 227, 161),
    (249, 226, 175),
    (245, 194, 231),
    (243, 139, 168),
    (148, 226, 213),
    (203, 166, 247),
    (250, 179, 135),
    (116, 199, 236),
    (180, 190, 254),
    (242, 205, 205),
    (235, 160, 172),
];

/// djb2-style hash of a tag key, used to pick a stable fallback color.
pub fn hash_key(key: &str) -> u64 {
    let mut h: u64 = 5381;
    for b in key.bytes() {
        h = (h.wrapping_shl(5)).wrapping_add(h) ^ u64::from(b);
    }
    h
}

/// Display color for a tag that has no color of its own.
pub fn palette_color(key: &str) -> (u8, u8, u8) {
    PALETTE[(hash_key(key) % PALETTE.len() as u64) as usize]
}
