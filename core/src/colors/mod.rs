//! Color spec resolution
//!
//! Turns the user's color options (`"Red"`, `"#112233"`, `"#80FF0000"`) into
//! RGBA values. Resolution is pure and never fails loudly: an unusable spec
//! yields `None` and the caller reports it as a per-field failure.

mod named;

pub use named::NAMED_COLORS;

use watermark_types::Color;

const OPAQUE: u8 = 255;

/// Resolve a color spec to RGBA.
///
/// - `#...` specs are parsed as hex.
/// - Otherwise the trimmed name is looked up case-insensitively in
///   [`NAMED_COLORS`] and its hex value resolved.
/// - Unknown names get one last attempt through the functional/bare-hex
///   parser before giving up.
pub fn resolve(spec: &str) -> Option<Color> {
    let trimmed = spec.trim();

    if trimmed.starts_with('#') {
        return parse_hex(trimmed);
    }

    if let Some(hex) = lookup_name(trimmed) {
        return resolve(hex);
    }

    parse_fallback(spec)
}

/// Hex value for a named color, if the palette has it
pub fn lookup_name(name: &str) -> Option<&'static str> {
    NAMED_COLORS
        .get(name.trim().to_ascii_lowercase().as_str())
        .copied()
}

/// Iterate the palette as `(name, hex)` pairs
pub fn named_colors() -> impl Iterator<Item = (&'static str, &'static str)> {
    NAMED_COLORS.entries().map(|(name, hex)| (*name, *hex))
}

/// Parse `#RGB`, `#ARGB`, `#RRGGBB` or `#AARRGGBB`.
///
/// Alpha comes first in the 4 and 8 digit forms.
pub fn parse_hex(spec: &str) -> Option<Color> {
    let digits = spec.trim().strip_prefix('#')?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let nibbles: Vec<u8> = digits
        .bytes()
        .filter_map(|b| (b as char).to_digit(16).map(|d| d as u8))
        .collect();

    let doubled = |n: u8| n << 4 | n;
    let byte = |hi: u8, lo: u8| hi << 4 | lo;

    match nibbles.as_slice() {
        [r, g, b] => Some([doubled(*r), doubled(*g), doubled(*b), OPAQUE]),
        [a, r, g, b] => Some([doubled(*r), doubled(*g), doubled(*b), doubled(*a)]),
        [r1, r2, g1, g2, b1, b2] => Some([byte(*r1, *r2), byte(*g1, *g2), byte(*b1, *b2), OPAQUE]),
        [a1, a2, r1, r2, g1, g2, b1, b2] => Some([
            byte(*r1, *r2),
            byte(*g1, *g2),
            byte(*b1, *b2),
            byte(*a1, *a2),
        ]),
        _ => None,
    }
}

/// Last-resort parse for specs that are neither `#` hex nor a known name:
/// `rgb(r, g, b)`, `rgba(r, g, b, a)` and bare 6/8 digit hex.
fn parse_fallback(spec: &str) -> Option<Color> {
    let lower = spec.trim().to_ascii_lowercase();

    if let Some(args) = lower
        .strip_prefix("rgba(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if let [r, g, b, a] = parts.as_slice() {
            return Some([
                r.parse().ok()?,
                g.parse().ok()?,
                b.parse().ok()?,
                parse_alpha(a)?,
            ]);
        }
        return None;
    }

    if let Some(args) = lower
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if let [r, g, b] = parts.as_slice() {
            return Some([r.parse().ok()?, g.parse().ok()?, b.parse().ok()?, OPAQUE]);
        }
        return None;
    }

    if matches!(lower.len(), 6 | 8) {
        return parse_hex(&format!("#{lower}"));
    }

    None
}

/// Alpha as a 0.0-1.0 fraction when written with a decimal point or as a
/// bare `0` or `1`, otherwise as 0-255
fn parse_alpha(value: &str) -> Option<u8> {
    if value == "1" {
        return Some(OPAQUE);
    }
    if value.contains('.') {
        let fraction: f64 = value.parse().ok()?;
        if !(0.0..=1.0).contains(&fraction) {
            return None;
        }
        Some((fraction * 255.0).round() as u8)
    } else {
        value.parse().ok()
    }
}
