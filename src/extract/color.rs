//! Background colour sniffing.

use once_cell::sync::Lazy;
use regex::Regex;

static RGB_FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^rgba?\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*(?:,\s*([\d.]+)\s*)?\)")
        .expect("valid rgb regex")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 1.0 };

    /// Parse `rgb(..)`, `rgba(..)`, `#rgb`, `#rrggbb`, `white` and
    /// `transparent`. Only the first whitespace-separated token of a
    /// shorthand value is considered.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(caps) = RGB_FUNC.captures(value) {
            let channel = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u16>().ok());
            let a = caps
                .get(4)
                .and_then(|m| m.as_str().parse::<f32>().ok())
                .unwrap_or(1.0);
            return Some(Rgba {
                r: channel(1)?.min(255) as u8,
                g: channel(2)?.min(255) as u8,
                b: channel(3)?.min(255) as u8,
                a,
            });
        }

        let token = value.split_whitespace().next()?.to_ascii_lowercase();
        match token.as_str() {
            "white" => Some(Self::WHITE),
            "transparent" => Some(Rgba { r: 0, g: 0, b: 0, a: 0.0 }),
            hex if hex.starts_with('#') => parse_hex(&hex[1..]),
            _ => None,
        }
    }

    pub fn is_white(&self) -> bool {
        self.r == 255 && self.g == 255 && self.b == 255 && self.a >= 1.0
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// Orange band used by schedule grids for booked slots.
    pub fn is_warning_orange(&self) -> bool {
        self.r > 220 && (100..=170).contains(&self.g) && self.b < 50
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expand = |s: &str| u8::from_str_radix(s, 16).ok();
    let (r, g, b) = match hex.len() {
        3 => {
            let d: Vec<String> = hex.chars().map(|c| format!("{c}{c}")).collect();
            (expand(&d[0])?, expand(&d[1])?, expand(&d[2])?)
        }
        6 => (expand(&hex[0..2])?, expand(&hex[2..4])?, expand(&hex[4..6])?),
        _ => return None,
    };
    Some(Rgba { r, g, b, a: 1.0 })
}

/// White, transparent, or no background at all.
pub fn is_blank_background(background: &str) -> bool {
    if background.trim().is_empty() {
        return true;
    }
    Rgba::parse(background)
        .map(|c| c.is_white() || c.is_transparent())
        .unwrap_or(false)
}

/// Opaque white only; an unset background does not count.
pub fn is_white_background(background: &str) -> bool {
    Rgba::parse(background).map(|c| c.is_white()).unwrap_or(false)
}

/// Missing, empty or white `bgcolor` attribute.
pub fn is_blank_attribute(bgcolor: Option<&str>) -> bool {
    match bgcolor.map(str::trim) {
        None | Some("") => true,
        Some(value) => Rgba::parse(value).map(|c| c.is_white()).unwrap_or(false),
    }
}

pub fn is_warning_background(background: &str) -> bool {
    Rgba::parse(background)
        .map(|c| c.is_warning_orange())
        .unwrap_or(false)
}
