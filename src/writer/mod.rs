//! XML writing for 3MF model files
//!
//! This module serializes [`Model`] structures back into 3MF-compliant XML,
//! the content of the `3D/3dmodel.model` part.

mod core;
mod material;

use crate::error::{Error, Result};
use crate::model::*;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write as IoWrite;

/// Write a Model to XML format
///
/// Resources are written in dependency order: property groups first, then
/// mesh objects, then components objects, so every reference points backwards.
pub fn write_model_xml<W: IoWrite>(model: &Model, writer: W) -> Result<()> {
    let mut xml_writer = Writer::new_with_indent(writer, b' ', 2);

    xml_writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    let mut model_elem = BytesStart::new("model");
    model_elem.push_attribute(("unit", model.unit.as_str()));
    model_elem.push_attribute(("xml:lang", "en-US"));
    model_elem.push_attribute(("xmlns", Extension::Core.namespace()));

    let ns_attrs: Vec<(String, &str)> = model
        .used_extensions()
        .into_iter()
        .filter(|ext| *ext != Extension::Core)
        .map(|ext| (format!("xmlns:{}", ext.prefix()), ext.namespace()))
        .collect();
    for (name, value) in &ns_attrs {
        model_elem.push_attribute((name.as_str(), *value));
    }

    xml_writer
        .write_event(Event::Start(model_elem))
        .map_err(|e| Error::xml_write(format!("Failed to write model element: {}", e)))?;

    for entry in &model.metadata {
        write_metadata(&mut xml_writer, entry)?;
    }

    write_resources(&mut xml_writer, &model.resources)?;

    core::write_build(&mut xml_writer, &model.build)?;

    xml_writer
        .write_event(Event::End(BytesEnd::new("model")))
        .map_err(|e| Error::xml_write(format!("Failed to close model element: {}", e)))?;

    Ok(())
}

/// Write a metadata entry
fn write_metadata<W: IoWrite>(writer: &mut Writer<W>, entry: &MetadataEntry) -> Result<()> {
    let mut elem = BytesStart::new("metadata");
    elem.push_attribute(("name", entry.name.as_str()));

    writer
        .write_event(Event::Start(elem))
        .map_err(|e| Error::xml_write(format!("Failed to write metadata element: {}", e)))?;

    writer
        .write_event(Event::Text(BytesText::new(&entry.value)))
        .map_err(|e| Error::xml_write(format!("Failed to write metadata value: {}", e)))?;

    writer
        .write_event(Event::End(BytesEnd::new("metadata")))
        .map_err(|e| Error::xml_write(format!("Failed to close metadata element: {}", e)))?;

    Ok(())
}

/// Write resources section
fn write_resources<W: IoWrite>(writer: &mut Writer<W>, resources: &Resources) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("resources")))
        .map_err(|e| Error::xml_write(format!("Failed to write resources element: {}", e)))?;

    for group in &resources.base_material_groups {
        material::write_base_material_group(writer, group)?;
    }

    for group in &resources.color_groups {
        material::write_color_group(writer, group)?;
    }

    let (meshes, assemblies): (Vec<&Object>, Vec<&Object>) = resources
        .objects
        .iter()
        .partition(|object| object.as_mesh().is_some());
    for object in meshes.into_iter().chain(assemblies) {
        core::write_object(writer, object)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("resources")))
        .map_err(|e| Error::xml_write(format!("Failed to close resources element: {}", e)))?;

    Ok(())
}
