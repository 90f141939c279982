//! Material extension types

/// Color group from materials extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorGroup {
    /// Color group ID
    pub id: usize,
    /// List of colors in this group (sRGB, 8 bits per channel)
    pub colors: Vec<(u8, u8, u8, u8)>,
}

impl ColorGroup {
    /// Create a new color group
    pub fn new(id: usize) -> Self {
        Self {
            id,
            colors: Vec::new(),
        }
    }

    /// Append a color and return its index within the group
    pub fn add_color(&mut self, color: (u8, u8, u8, u8)) -> usize {
        self.colors.push(color);
        self.colors.len() - 1
    }
}

/// Base material group from materials extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMaterialGroup {
    /// Base material group ID
    pub id: usize,
    /// List of base materials in this group
    pub materials: Vec<BaseMaterial>,
}

impl BaseMaterialGroup {
    /// Create a new base material group
    pub fn new(id: usize) -> Self {
        Self {
            id,
            materials: Vec::new(),
        }
    }
}

/// Individual base material within a base material group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMaterial {
    /// Material name
    pub name: String,
    /// Display color in RGBA format (red, green, blue, alpha)
    pub displaycolor: (u8, u8, u8, u8),
}

impl BaseMaterial {
    /// Create a new base material
    pub fn new(name: String, displaycolor: (u8, u8, u8, u8)) -> Self {
        Self { name, displaycolor }
    }
}

/// Parse a 3MF color string in format `#RRGGBB` or `#RRGGBBAA`
pub fn parse_hex_color(color_str: &str) -> Option<(u8, u8, u8, u8)> {
    let hex = color_str.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        6 => Some((channel(0)?, channel(2)?, channel(4)?, 255)),
        8 => Some((channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
        _ => None,
    }
}

/// Format a color as `#RRGGBBAA`
pub fn format_hex_color(color: (u8, u8, u8, u8)) -> String {
    format!(
        "#{:02X}{:02X}{:02X}{:02X}",
        color.0, color.1, color.2, color.3
    )
}
