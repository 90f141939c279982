//! Package writing functionality for creating 3MF files

use super::{
    CONTENT_TYPES_PATH, MODEL_CONTENT_TYPE, MODEL_PATH, MODEL_REL_TYPE, MODEL_RELS_PATH,
    RELS_CONTENT_TYPE, RELS_PATH, reader::validate_opc_part_name,
};
use crate::error::{Error, Result};
use crate::model::Attachment;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::collections::BTreeMap;
use std::io::{Seek, Write};
use urlencoding::encode;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Create a 3MF package (ZIP archive) from model data
///
/// This function creates a complete 3MF file including:
/// - `[Content_Types].xml`
/// - `_rels/.rels`
/// - `3D/3dmodel.model`
/// - `3D/_rels/3dmodel.model.rels` when an attachment carries a relationship type
/// - every attachment at its own path
///
/// Returns the writer after finishing the ZIP archive.
pub fn create_package<W: Write + Seek>(
    writer: W,
    model_xml: &str,
    attachments: &[Attachment],
) -> Result<W> {
    for attachment in attachments {
        validate_opc_part_name(&attachment.path)?;
        if is_reserved_part(&attachment.path) {
            return Err(Error::InvalidFormat(format!(
                "Attachment path '{}' collides with a package part",
                attachment.path
            )));
        }
    }

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    let content_types = content_types_xml(attachments)?;
    write_part(&mut zip, options, CONTENT_TYPES_PATH, content_types.as_bytes())?;

    let rels = relationships_xml(&[("/3D/3dmodel.model", MODEL_REL_TYPE)])?;
    write_part(&mut zip, options, RELS_PATH, rels.as_bytes())?;

    write_part(&mut zip, options, MODEL_PATH, model_xml.as_bytes())?;

    let targets: Vec<(String, &str)> = attachments
        .iter()
        .filter_map(|a| {
            a.relationship_type
                .as_deref()
                .map(|rel_type| (part_target(&a.path), rel_type))
        })
        .collect();
    if !targets.is_empty() {
        let targets: Vec<(&str, &str)> = targets.iter().map(|(t, r)| (t.as_str(), *r)).collect();
        let model_rels = relationships_xml(&targets)?;
        write_part(&mut zip, options, MODEL_RELS_PATH, model_rels.as_bytes())?;
    }

    for attachment in attachments {
        write_part(&mut zip, options, &attachment.path, &attachment.data)?;
    }

    // Finish and return the writer
    let writer = zip
        .finish()
        .map_err(|e| Error::xml_write(format!("Failed to finalize ZIP archive: {}", e)))?;

    Ok(writer)
}

/// Relationship target for an archive path: leading slash, each segment percent-encoded
fn part_target(path: &str) -> String {
    path.split('/')
        .map(|segment| format!("/{}", encode(segment)))
        .collect()
}

fn is_reserved_part(path: &str) -> bool {
    [CONTENT_TYPES_PATH, RELS_PATH, MODEL_PATH, MODEL_RELS_PATH]
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(path))
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    path: &str,
    data: &[u8],
) -> Result<()> {
    zip.start_file(path, options)
        .map_err(|e| Error::xml_write(format!("Failed to create '{}': {}", path, e)))?;
    zip.write_all(data)
        .map_err(|e| Error::xml_write(format!("Failed to write '{}': {}", path, e)))?;
    Ok(())
}

/// Build `[Content_Types].xml` with one default per distinct attachment extension
fn content_types_xml(attachments: &[Attachment]) -> Result<String> {
    let mut defaults: BTreeMap<String, String> = BTreeMap::new();
    for attachment in attachments {
        let Some(ext) = attachment.extension() else {
            continue;
        };
        if ext == "rels" || ext == "model" {
            continue;
        }
        defaults
            .entry(ext)
            .or_insert_with(|| attachment.content_type.clone());
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut types = BytesStart::new("Types");
    types.push_attribute(("xmlns", CONTENT_TYPES_NS));
    write_event(&mut writer, Event::Start(types))?;

    let fixed = [("rels", RELS_CONTENT_TYPE), ("model", MODEL_CONTENT_TYPE)];
    let extra = defaults.iter().map(|(e, c)| (e.as_str(), c.as_str()));
    for (extension, content_type) in fixed.into_iter().chain(extra) {
        let mut elem = BytesStart::new("Default");
        elem.push_attribute(("Extension", extension));
        elem.push_attribute(("ContentType", content_type));
        write_event(&mut writer, Event::Empty(elem))?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("Types")))?;
    into_string(writer)
}

/// Build a relationships part for `(target, type)` pairs
fn relationships_xml(targets: &[(&str, &str)]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", RELATIONSHIPS_NS));
    write_event(&mut writer, Event::Start(root))?;

    for (index, (target, rel_type)) in targets.iter().enumerate() {
        let id = format!("rel{}", index);
        let mut elem = BytesStart::new("Relationship");
        elem.push_attribute(("Target", *target));
        elem.push_attribute(("Id", id.as_str()));
        elem.push_attribute(("Type", *rel_type));
        write_event(&mut writer, Event::Empty(elem))?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("Relationships")))?;
    into_string(writer)
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::xml_write(format!("Failed to write package XML: {}", e)))
}

fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::xml_write(format!("Failed to convert XML to UTF-8: {}", e)))
}
