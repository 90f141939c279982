//! Package reading and validation functionality

use super::{
    CONTENT_TYPES_PATH, MODEL_CONTENT_TYPE, MODEL_REL_TYPE, Package, RELS_CONTENT_TYPE, RELS_PATH,
    Relationship,
};
use crate::error::{Error, Result};
use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{Read, Seek};
use urlencoding::decode;
use zip::ZipArchive;

/// Open a 3MF package from a reader
pub(super) fn open<R: Read + Seek>(reader: R) -> Result<Package<R>> {
    let archive = ZipArchive::new(reader)?;
    let mut package = Package { archive };

    // Validate required OPC structure
    validate_opc_structure(&mut package)?;

    Ok(package)
}

/// Validate OPC package structure according to 3MF spec
fn validate_opc_structure<R: Read + Seek>(package: &mut Package<R>) -> Result<()> {
    for required in [CONTENT_TYPES_PATH, RELS_PATH] {
        if !package.has_file(required) {
            return Err(Error::invalid_format_context(
                "OPC package structure",
                &format!(
                    "Missing required file '{}'. The 3MF file may be corrupt or improperly formatted.",
                    required
                ),
            ));
        }
    }

    validate_content_types(package)?;

    // Validate that model relationship exists and points to valid file
    let model_path = discover_model_path(package)?;
    if !package.has_file(&model_path) {
        return Err(Error::InvalidFormat(format!(
            "Model relationship points to non-existent file: {}",
            model_path
        )));
    }

    validate_all_relationships(package)?;

    Ok(())
}

/// Validate [Content_Types].xml structure
fn validate_content_types<R: Read + Seek>(package: &mut Package<R>) -> Result<()> {
    let content = package.get_file(CONTENT_TYPES_PATH)?;
    let mut reader = XmlReader::from_str(&content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut found_rels = false;
    let mut found_model = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::InvalidXml(e.to_string()))?;
                let attrs = attributes(e)?;
                let content_type = attrs.get("ContentType").map(String::as_str);

                if name_str.ends_with("Default") {
                    let extension = attrs.get("Extension").map(String::as_str);
                    match (extension, content_type) {
                        (Some(ext), Some(RELS_CONTENT_TYPE)) if ext.eq_ignore_ascii_case("rels") => {
                            found_rels = true;
                        }
                        (Some(ext), Some(MODEL_CONTENT_TYPE)) => {
                            // Per 3MF spec, the extension for 3D model files must be "model"
                            if !ext.eq_ignore_ascii_case("model") {
                                return Err(Error::InvalidFormat(format!(
                                    "Content type '{}' must use Extension='model', not Extension='{}'",
                                    MODEL_CONTENT_TYPE, ext
                                )));
                            }
                            found_model = true;
                        }
                        _ => {}
                    }
                } else if name_str.ends_with("Override") && content_type == Some(MODEL_CONTENT_TYPE)
                {
                    found_model = true;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    if !found_rels {
        return Err(Error::InvalidFormat(
            "Content Types missing required 'rels' extension definition".to_string(),
        ));
    }

    if !found_model {
        return Err(Error::InvalidFormat(
            "Content Types missing required model content type (Default or Override)".to_string(),
        ));
    }

    Ok(())
}

/// Validate all package relationships point to existing files
fn validate_all_relationships<R: Read + Seek>(package: &mut Package<R>) -> Result<()> {
    for rel in read_relationships(package, RELS_PATH)? {
        // Relationship types must not contain query strings or fragments
        if rel.rel_type.contains('?') || rel.rel_type.contains('#') {
            return Err(Error::InvalidFormat(format!(
                "Relationship Type cannot contain a query string or fragment: {}",
                rel.rel_type
            )));
        }

        validate_opc_part_name(&rel.target)?;

        let path = part_path(&rel.target)?;
        if !package.has_file(&path) {
            return Err(Error::InvalidFormat(format!(
                "Relationship points to non-existent file: {}",
                path
            )));
        }
    }

    Ok(())
}

/// Validate OPC part name according to OPC specification
///
/// Part names must not contain fragment identifiers, query strings, empty
/// segments, `.`/`..` segments or segments ending with `.`.
pub(super) fn validate_opc_part_name(part_name: &str) -> Result<()> {
    if part_name.contains('#') || part_name.contains('?') {
        return Err(Error::InvalidFormat(format!(
            "Part name cannot contain a fragment identifier or query string: {}",
            part_name
        )));
    }

    for (idx, segment) in part_name.split('/').enumerate() {
        if segment.is_empty() {
            // Allow leading slash (which creates empty first segment)
            if idx == 0 && part_name.starts_with('/') {
                continue;
            }
            return Err(Error::InvalidFormat(format!(
                "Part name cannot contain empty path segments (consecutive slashes): {}",
                part_name
            )));
        }

        if segment == "." || segment == ".." || segment.ends_with('.') {
            return Err(Error::InvalidFormat(format!(
                "Part name cannot contain '.' or '..' segments or segments ending with '.': {}",
                part_name
            )));
        }
    }

    Ok(())
}

/// Discover the model file path from the package relationships
pub(super) fn discover_model_path<R: Read + Seek>(package: &mut Package<R>) -> Result<String> {
    read_relationships(package, RELS_PATH)?
        .into_iter()
        .find(|rel| rel.rel_type == MODEL_REL_TYPE)
        .map(|rel| part_path(&rel.target))
        .transpose()?
        .ok_or_else(|| Error::MissingFile("3D model relationship not found".to_string()))
}

/// Parse a relationships part
pub(super) fn read_relationships<R: Read + Seek>(
    package: &mut Package<R>,
    rels_path: &str,
) -> Result<Vec<Relationship>> {
    let content = package.get_file(rels_path)?;
    let mut reader = XmlReader::from_str(&content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::InvalidXml(e.to_string()))?;

                if name_str.ends_with("Relationship") {
                    let mut attrs = attributes(e)?;
                    let target = attrs
                        .remove("Target")
                        .ok_or_else(|| Error::missing_attribute("Relationship", "Target"))?;
                    let rel_type = attrs
                        .remove("Type")
                        .ok_or_else(|| Error::missing_attribute("Relationship", "Type"))?;
                    relationships.push(Relationship {
                        id: attrs.remove("Id").unwrap_or_default(),
                        target,
                        rel_type,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Convert a relationship target into an archive entry name
///
/// Targets are percent-encoded per OPC; archive entries store the decoded
/// UTF-8 name without the leading slash.
pub(super) fn part_path(target: &str) -> Result<String> {
    let decoded = decode(target).map_err(|e| {
        Error::InvalidFormat(format!("Relationship target '{}' is not valid UTF-8: {}", target, e))
    })?;
    Ok(decoded.trim_start_matches('/').to_string())
}

fn attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::InvalidXml(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|e| Error::InvalidXml(e.to_string()))?;
        attrs.insert(key.to_string(), value.to_string());
    }
    Ok(attrs)
}
