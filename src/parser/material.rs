//! Material extension parsing (color groups and base materials)

use crate::error::{Error, Result};
use crate::model::*;
use quick_xml::events::BytesStart;

use super::{parse_attributes, parse_id};

/// Parse a `<color color="#RRGGBB[AA]"/>` entry of a color group
pub(super) fn parse_color_element(e: &BytesStart) -> Result<(u8, u8, u8, u8)> {
    let attrs = parse_attributes(e)?;
    let value = attrs
        .get("color")
        .ok_or_else(|| Error::missing_attribute("color", "color"))?;
    parse_hex_color(value)
        .ok_or_else(|| Error::ParseError(format!("Invalid color value '{}'", value)))
}

/// Parse basematerials element start
pub(super) fn parse_basematerials_start(e: &BytesStart) -> Result<BaseMaterialGroup> {
    let attrs = parse_attributes(e)?;
    Ok(BaseMaterialGroup::new(parse_id(&attrs, "basematerials")?))
}

/// Parse a `<base name=".." displaycolor=".."/>` entry
pub(super) fn parse_base_element(e: &BytesStart) -> Result<BaseMaterial> {
    let attrs = parse_attributes(e)?;
    let name = attrs
        .get("name")
        .ok_or_else(|| Error::missing_attribute("base", "name"))?;
    let color = attrs
        .get("displaycolor")
        .ok_or_else(|| Error::missing_attribute("base", "displaycolor"))?;
    let displaycolor = parse_hex_color(color)
        .ok_or_else(|| Error::ParseError(format!("Invalid displaycolor value '{}'", color)))?;

    Ok(BaseMaterial::new(name.clone(), displaycolor))
}
