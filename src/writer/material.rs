//! Property groups under the `m:` prefix

use crate::error::{Error, Result};
use crate::model::*;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::io::Write as IoWrite;

pub(super) fn write_base_material_group<W: IoWrite>(
    writer: &mut Writer<W>,
    group: &BaseMaterialGroup,
) -> Result<()> {
    let entries = group.materials.iter().map(|material| {
        let mut base = BytesStart::new("m:base");
        base.push_attribute(("name", material.name.as_str()));
        base.push_attribute((
            "displaycolor",
            format_hex_color(material.displaycolor).as_str(),
        ));
        base
    });
    write_group(writer, "m:basematerials", group.id, entries)
}

/// Write a color group, one `#RRGGBBAA` entry per color
pub(super) fn write_color_group<W: IoWrite>(
    writer: &mut Writer<W>,
    group: &ColorGroup,
) -> Result<()> {
    let entries = group.colors.iter().map(|&color| {
        let mut entry = BytesStart::new("m:color");
        entry.push_attribute(("color", format_hex_color(color).as_str()));
        entry
    });
    write_group(writer, "m:colorgroup", group.id, entries)
}

/// `<tag id=…>` wrapping one empty element per entry
fn write_group<'a, W: IoWrite>(
    writer: &mut Writer<W>,
    tag: &str,
    id: usize,
    entries: impl Iterator<Item = BytesStart<'a>>,
) -> Result<()> {
    let mut elem = BytesStart::new(tag);
    elem.push_attribute(("id", id.to_string().as_str()));
    writer
        .write_event(Event::Start(elem))
        .map_err(|e| Error::xml_write(format!("Failed to open <{}>: {}", tag, e)))?;

    for entry in entries {
        writer
            .write_event(Event::Empty(entry))
            .map_err(|e| Error::xml_write(format!("Failed to write entry of <{}>: {}", tag, e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(|e| Error::xml_write(format!("Failed to close <{}>: {}", tag, e)))?;
    Ok(())
}
