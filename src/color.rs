//! Color token resolution
//!
//! Maps the color label of an input file (`red`, `tab:blue`, `#ff8000`,
//! `0.5`) to normalized RGBA. The accepted vocabulary follows the color
//! strings understood by matplotlib, which is what OpenSCAD users tend to
//! write inside `color("...")` calls:
//!
//! - CSS4 / X11 color names (`gray` and `grey` spellings)
//! - single-letter base colors `b g r c m y k w`
//! - the Tableau palette `tab:blue` .. `tab:cyan`
//! - hex literals `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`
//! - grayscale levels written as a number in `[0, 1]`
//! - `none` for fully transparent
//!
//! Matching is case-insensitive and ignores surrounding whitespace. Unknown
//! tokens resolve to opaque black together with a [`ColorParseWarning`].

use crate::error::ColorParseWarning;
use std::fmt;
use std::path::Path;

/// Normalized RGBA color, every channel in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    /// Red channel
    pub r: f64,
    /// Green channel
    pub g: f64,
    /// Blue channel
    pub b: f64,
    /// Alpha channel
    pub a: f64,
}

impl Rgba {
    /// Opaque black, the fallback for unrecognized tokens
    pub const BLACK: Rgba = Rgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    /// Create a color, clamping every channel to `[0, 1]`
    ///
    /// NaN channels become 0.
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            r: clamp(r),
            g: clamp(g),
            b: clamp(b),
            a: clamp(a),
        }
    }

    /// Opaque color from 8-bit channels
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba8((r, g, b, 255))
    }

    /// Color from 8-bit channels
    pub fn from_rgba8((r, g, b, a): (u8, u8, u8, u8)) -> Self {
        let unit = |v: u8| f64::from(v) / 255.0;
        Self::new(unit(r), unit(g), unit(b), unit(a))
    }

    /// Channels as a tuple
    pub fn to_tuple(self) -> (f64, f64, f64, f64) {
        (self.r, self.g, self.b, self.a)
    }

    /// Quantize to 8-bit channels with `round(v * 255)`
    pub fn to_rgba8(self) -> (u8, u8, u8, u8) {
        // Channels are clamped, so the product always fits in a u8
        let quantize = |v: f64| (v * 255.0).round() as u8;
        (
            quantize(self.r),
            quantize(self.g),
            quantize(self.b),
            quantize(self.a),
        )
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// A color label together with its resolved color
///
/// Derived once per input file and never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorSpec {
    /// The label as written (file stem), used to name the merged part
    pub token: String,
    /// Resolved color
    pub rgba: Rgba,
}

impl ColorSpec {
    /// Resolve a label; unknown labels resolve to black with a warning
    pub fn resolve(token: impl Into<String>) -> (Self, Option<ColorParseWarning>) {
        let token = token.into();
        let (rgba, warning) = resolve_color(&token);
        (Self { token, rgba }, warning)
    }

    /// Derive the label from a file name: `out/red.3mf` gives `red`
    pub fn from_path(path: impl AsRef<Path>) -> (Self, Option<ColorParseWarning>) {
        let token = path
            .as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::resolve(token)
    }
}

/// Resolve a token, falling back to opaque black
///
/// Never fails: an unrecognized token yields [`Rgba::BLACK`] plus a warning
/// the caller is expected to report.
pub fn resolve_color(token: &str) -> (Rgba, Option<ColorParseWarning>) {
    match parse_color(token) {
        Ok(rgba) => (rgba, None),
        Err(warning) => (Rgba::BLACK, Some(warning)),
    }
}

/// Parse a token strictly
pub fn parse_color(token: &str) -> Result<Rgba, ColorParseWarning> {
    let normalized = token.trim().to_ascii_lowercase();
    let unrecognized = || ColorParseWarning {
        token: token.to_string(),
    };

    if normalized == "none" {
        return Ok(Rgba::new(0.0, 0.0, 0.0, 0.0));
    }

    if let Some(hex) = normalized.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(unrecognized);
    }

    if let Some(rgba) = base_color(&normalized) {
        return Ok(rgba);
    }

    if let Some(rgba) = lookup_named(&normalized) {
        return Ok(rgba);
    }

    if let Ok(level) = normalized.parse::<f64>() {
        // Grayscale strings must already be in range; "1.5" is not a color
        if (0.0..=1.0).contains(&level) {
            return Ok(Rgba::new(level, level, level, 1.0));
        }
    }

    Err(unrecognized())
}

/// Hex digits after the leading `#`
fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    // Short form repeats each digit: "f80" is "ff8800"
    let short = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);

    let (r, g, b, a) = match hex.len() {
        3 => (short(0)?, short(1)?, short(2)?, 255),
        4 => (short(0)?, short(1)?, short(2)?, short(3)?),
        6 => (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 255),
        8 => (
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        ),
        _ => return None,
    };

    Some(Rgba::from_rgba8((r, g, b, a)))
}

fn base_color(name: &str) -> Option<Rgba> {
    let (r, g, b) = match name {
        "b" => (0.0, 0.0, 1.0),
        "g" => (0.0, 0.5, 0.0),
        "r" => (1.0, 0.0, 0.0),
        "c" => (0.0, 0.75, 0.75),
        "m" => (0.75, 0.0, 0.75),
        "y" => (0.75, 0.75, 0.0),
        "k" => (0.0, 0.0, 0.0),
        "w" => (1.0, 1.0, 1.0),
        _ => return None,
    };
    Some(Rgba::new(r, g, b, 1.0))
}

fn lookup_named(name: &str) -> Option<Rgba> {
    let table = if name.starts_with("tab:") {
        TABLEAU_COLORS
    } else {
        CSS4_COLORS
    };
    table
        .binary_search_by(|(candidate, _)| candidate.cmp(&name))
        .ok()
        .map(|index| {
            let rgb = table[index].1;
            Rgba::from_rgb8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
        })
}

/// Tableau palette, sorted by name
const TABLEAU_COLORS: &[(&str, u32)] = &[
    ("tab:blue", 0x1F77B4),
    ("tab:brown", 0x8C564B),
    ("tab:cyan", 0x17BECF),
    ("tab:gray", 0x7F7F7F),
    ("tab:green", 0x2CA02C),
    ("tab:grey", 0x7F7F7F),
    ("tab:olive", 0xBCBD22),
    ("tab:orange", 0xFF7F0E),
    ("tab:pink", 0xE377C2),
    ("tab:purple", 0x9467BD),
    ("tab:red", 0xD62728),
];

/// CSS4 / X11 color names, sorted by name
const CSS4_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xF0F8FF),
    ("antiquewhite", 0xFAEBD7),
    ("aqua", 0x00FFFF),
    ("aquamarine", 0x7FFFD4),
    ("azure", 0xF0FFFF),
    ("beige", 0xF5F5DC),
    ("bisque", 0xFFE4C4),
    ("black", 0x000000),
    ("blanchedalmond", 0xFFEBCD),
    ("blue", 0x0000FF),
    ("blueviolet", 0x8A2BE2),
    ("brown", 0xA52A2A),
    ("burlywood", 0xDEB887),
    ("cadetblue", 0x5F9EA0),
    ("chartreuse", 0x7FFF00),
    ("chocolate", 0xD2691E),
    ("coral", 0xFF7F50),
    ("cornflowerblue", 0x6495ED),
    ("cornsilk", 0xFFF8DC),
    ("crimson", 0xDC143C),
    ("cyan", 0x00FFFF),
    ("darkblue", 0x00008B),
    ("darkcyan", 0x008B8B),
    ("darkgoldenrod", 0xB8860B),
    ("darkgray", 0xA9A9A9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xA9A9A9),
    ("darkkhaki", 0xBDB76B),
    ("darkmagenta", 0x8B008B),
    ("darkolivegreen", 0x556B2F),
    ("darkorange", 0xFF8C00),
    ("darkorchid", 0x9932CC),
    ("darkred", 0x8B0000),
    ("darksalmon", 0xE9967A),
    ("darkseagreen", 0x8FBC8F),
    ("darkslateblue", 0x483D8B),
    ("darkslategray", 0x2F4F4F),
    ("darkslategrey", 0x2F4F4F),
    ("darkturquoise", 0x00CED1),
    ("darkviolet", 0x9400D3),
    ("deeppink", 0xFF1493),
    ("deepskyblue", 0x00BFFF),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1E90FF),
    ("firebrick", 0xB22222),
    ("floralwhite", 0xFFFAF0),
    ("forestgreen", 0x228B22),
    ("fuchsia", 0xFF00FF),
    ("gainsboro", 0xDCDCDC),
    ("ghostwhite", 0xF8F8FF),
    ("gold", 0xFFD700),
    ("goldenrod", 0xDAA520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xADFF2F),
    ("grey", 0x808080),
    ("honeydew", 0xF0FFF0),
    ("hotpink", 0xFF69B4),
    ("indianred", 0xCD5C5C),
    ("indigo", 0x4B0082),
    ("ivory", 0xFFFFF0),
    ("khaki", 0xF0E68C),
    ("lavender", 0xE6E6FA),
    ("lavenderblush", 0xFFF0F5),
    ("lawngreen", 0x7CFC00),
    ("lemonchiffon", 0xFFFACD),
    ("lightblue", 0xADD8E6),
    ("lightcoral", 0xF08080),
    ("lightcyan", 0xE0FFFF),
    ("lightgoldenrodyellow", 0xFAFAD2),
    ("lightgray", 0xD3D3D3),
    ("lightgreen", 0x90EE90),
    ("lightgrey", 0xD3D3D3),
    ("lightpink", 0xFFB6C1),
    ("lightsalmon", 0xFFA07A),
    ("lightseagreen", 0x20B2AA),
    ("lightskyblue", 0x87CEFA),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xB0C4DE),
    ("lightyellow", 0xFFFFE0),
    ("lime", 0x00FF00),
    ("limegreen", 0x32CD32),
    ("linen", 0xFAF0E6),
    ("magenta", 0xFF00FF),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66CDAA),
    ("mediumblue", 0x0000CD),
    ("mediumorchid", 0xBA55D3),
    ("mediumpurple", 0x9370DB),
    ("mediumseagreen", 0x3CB371),
    ("mediumslateblue", 0x7B68EE),
    ("mediumspringgreen", 0x00FA9A),
    ("mediumturquoise", 0x48D1CC),
    ("mediumvioletred", 0xC71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xF5FFFA),
    ("mistyrose", 0xFFE4E1),
    ("moccasin", 0xFFE4B5),
    ("navajowhite", 0xFFDEAD),
    ("navy", 0x000080),
    ("oldlace", 0xFDF5E6),
    ("olive", 0x808000),
    ("olivedrab", 0x6B8E23),
    ("orange", 0xFFA500),
    ("orangered", 0xFF4500),
    ("orchid", 0xDA70D6),
    ("palegoldenrod", 0xEEE8AA),
    ("palegreen", 0x98FB98),
    ("paleturquoise", 0xAFEEEE),
    ("palevioletred", 0xDB7093),
    ("papayawhip", 0xFFEFD5),
    ("peachpuff", 0xFFDAB9),
    ("peru", 0xCD853F),
    ("pink", 0xFFC0CB),
    ("plum", 0xDDA0DD),
    ("powderblue", 0xB0E0E6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xFF0000),
    ("rosybrown", 0xBC8F8F),
    ("royalblue", 0x4169E1),
    ("saddlebrown", 0x8B4513),
    ("salmon", 0xFA8072),
    ("sandybrown", 0xF4A460),
    ("seagreen", 0x2E8B57),
    ("seashell", 0xFFF5EE),
    ("sienna", 0xA0522D),
    ("silver", 0xC0C0C0),
    ("skyblue", 0x87CEEB),
    ("slateblue", 0x6A5ACD),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xFFFAFA),
    ("springgreen", 0x00FF7F),
    ("steelblue", 0x4682B4),
    ("tan", 0xD2B48C),
    ("teal", 0x008080),
    ("thistle", 0xD8BFD8),
    ("tomato", 0xFF6347),
    ("turquoise", 0x40E0D0),
    ("violet", 0xEE82EE),
    ("wheat", 0xF5DEB3),
    ("white", 0xFFFFFF),
    ("whitesmoke", 0xF5F5F5),
    ("yellow", 0xFFFF00),
    ("yellowgreen", 0x9ACD32),
];
