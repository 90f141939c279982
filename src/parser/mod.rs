//! XML parsing for 3MF model files

mod core;
mod material;

use crate::error::{Error, Result};
use crate::model::*;
use crate::opc::Package;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{Read, Seek};

use core::{ObjectHeader, parse_build_item, parse_component, parse_triangle, parse_vertex};
use material::{parse_base_element, parse_basematerials_start, parse_color_element};

pub use core::parse_transform;

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// Parse a 3MF file from a reader
pub fn parse_3mf<R: Read + Seek>(reader: R) -> Result<Model> {
    let mut package = Package::open(reader)?;
    let model_xml = package.get_model()?;
    parse_model_xml(&model_xml)
}

/// Extract local name from potentially namespaced XML element name
///
/// - `"m:colorgroup"` returns `"colorgroup"`
/// - `"object"` returns `"object"`
pub(crate) fn get_local_name(name_str: &str) -> &str {
    match name_str.rfind(':') {
        Some(pos) => &name_str[pos + 1..],
        None => name_str,
    }
}

/// Object currently being parsed
struct PendingObject {
    header: ObjectHeader,
    mesh: Option<Mesh>,
    components: Option<Vec<Component>>,
}

impl PendingObject {
    fn finish(self) -> Result<Object> {
        let id = self.header.id;
        let shape = match (self.mesh, self.components) {
            (Some(mesh), None) => {
                validate_triangle_indices(id, &mesh)?;
                ObjectShape::Mesh(mesh)
            }
            (None, Some(components)) => ObjectShape::Components(components),
            (Some(_), Some(_)) => {
                return Err(Error::InvalidModel(format!(
                    "Object {} contains both a mesh and components",
                    id
                )));
            }
            (None, None) => {
                return Err(Error::InvalidModel(format!(
                    "Object {} contains neither a mesh nor components",
                    id
                )));
            }
        };
        Ok(self.header.into_object(shape))
    }
}

/// Parse the 3D model XML content
pub fn parse_model_xml(xml: &str) -> Result<Model> {
    // Text is kept untrimmed so metadata split around entity references
    // keeps its inner whitespace
    let mut reader = Reader::from_str(xml);

    let mut model = Model::new();
    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);
    let mut in_resources = false;
    let mut in_build = false;
    let mut current_object: Option<PendingObject> = None;
    let mut current_colorgroup: Option<ColorGroup> = None;
    let mut current_basematerials: Option<BaseMaterialGroup> = None;
    let mut current_metadata: Option<MetadataEntry> = None;
    let mut saw_model = false;

    loop {
        let event_result = reader.read_event_into(&mut buf);
        let is_empty = matches!(&event_result, Ok(Event::Empty(_)));

        match event_result {
            Ok(Event::DocType(_)) => {
                // DTD declarations are not allowed (XXE risk)
                return Err(Error::InvalidXml(
                    "DTD declarations are not allowed in 3MF files for security reasons"
                        .to_string(),
                ));
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::InvalidXml(e.to_string()))?;

                match get_local_name(name_str) {
                    "model" => {
                        saw_model = true;
                        let attrs = parse_attributes(e)?;
                        if let Some(unit) = attrs.get("unit") {
                            model.unit = unit.clone();
                        }
                    }
                    "metadata" if !in_resources && current_object.is_none() => {
                        let attrs = parse_attributes(e)?;
                        let name = attrs
                            .get("name")
                            .ok_or_else(|| Error::missing_attribute("metadata", "name"))?;
                        let entry = MetadataEntry::new(name.as_str(), "");
                        if is_empty {
                            model.metadata.push(entry);
                        } else {
                            current_metadata = Some(entry);
                        }
                    }
                    "resources" => in_resources = true,
                    "build" => in_build = true,
                    "object" if in_resources => {
                        let header = ObjectHeader::parse(e)?;
                        ensure_unique_id(&model, header.id)?;
                        current_object = Some(PendingObject {
                            header,
                            mesh: None,
                            components: None,
                        });
                    }
                    "mesh" => {
                        if let Some(ref mut object) = current_object {
                            object.mesh = Some(Mesh::new());
                        }
                    }
                    "vertex" => {
                        if let Some(mesh) = current_object.as_mut().and_then(|o| o.mesh.as_mut()) {
                            mesh.vertices.push(parse_vertex(e)?);
                        }
                    }
                    "triangle" => {
                        if let Some(mesh) = current_object.as_mut().and_then(|o| o.mesh.as_mut()) {
                            mesh.triangles.push(parse_triangle(e)?);
                        }
                    }
                    "components" => {
                        if let Some(ref mut object) = current_object {
                            object.components = Some(Vec::new());
                        }
                    }
                    "component" => {
                        if let Some(components) =
                            current_object.as_mut().and_then(|o| o.components.as_mut())
                        {
                            components.push(parse_component(e)?);
                        }
                    }
                    "colorgroup" if in_resources => {
                        let attrs = parse_attributes(e)?;
                        let id = parse_id(&attrs, "colorgroup")?;
                        ensure_unique_id(&model, id)?;
                        let group = ColorGroup::new(id);
                        if is_empty {
                            model.resources.color_groups.push(group);
                        } else {
                            current_colorgroup = Some(group);
                        }
                    }
                    "color" => {
                        if let Some(ref mut group) = current_colorgroup {
                            group.colors.push(parse_color_element(e)?);
                        }
                    }
                    "basematerials" if in_resources => {
                        let group = parse_basematerials_start(e)?;
                        ensure_unique_id(&model, group.id)?;
                        if is_empty {
                            model.resources.base_material_groups.push(group);
                        } else {
                            current_basematerials = Some(group);
                        }
                    }
                    "base" => {
                        if let Some(ref mut group) = current_basematerials {
                            group.materials.push(parse_base_element(e)?);
                        }
                    }
                    "item" if in_build => {
                        model.build.items.push(parse_build_item(e)?);
                    }
                    _ => {}
                }

                // Self-closing containers end here as well
                if is_empty {
                    match get_local_name(name_str) {
                        "resources" => in_resources = false,
                        "build" => in_build = false,
                        "object" => {
                            if let Some(object) = current_object.take() {
                                model.resources.objects.push(object.finish()?);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(ref mut entry) = current_metadata {
                    let value = t.decode().map_err(|e| Error::InvalidXml(e.to_string()))?;
                    entry.value.push_str(&value);
                }
            }
            Ok(Event::GeneralRef(r)) => {
                // Entity references inside text arrive as separate events
                if let Some(ref mut entry) = current_metadata {
                    let name =
                        std::str::from_utf8(&r).map_err(|e| Error::InvalidXml(e.to_string()))?;
                    let reference = format!("&{};", name);
                    let value = quick_xml::escape::unescape(&reference)
                        .map_err(|e| Error::InvalidXml(e.to_string()))?;
                    entry.value.push_str(&value);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::InvalidXml(e.to_string()))?;

                match get_local_name(name_str) {
                    "resources" => in_resources = false,
                    "build" => in_build = false,
                    "metadata" => {
                        if let Some(mut entry) = current_metadata.take() {
                            entry.value = entry.value.trim().to_string();
                            model.metadata.push(entry);
                        }
                    }
                    "object" => {
                        if let Some(object) = current_object.take() {
                            model.resources.objects.push(object.finish()?);
                        }
                    }
                    "colorgroup" => {
                        if let Some(group) = current_colorgroup.take() {
                            model.resources.color_groups.push(group);
                        }
                    }
                    "basematerials" => {
                        if let Some(group) = current_basematerials.take() {
                            model.resources.base_material_groups.push(group);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    if !saw_model {
        return Err(Error::InvalidXml(
            "Model part has no <model> root element".to_string(),
        ));
    }

    validate_build_references(&model)?;

    Ok(model)
}

fn ensure_unique_id(model: &Model, id: usize) -> Result<()> {
    if model.resources.contains_id(id) {
        return Err(Error::InvalidModel(format!("Duplicate resource id {}", id)));
    }
    Ok(())
}

/// Every triangle must index into the object's own vertex list
fn validate_triangle_indices(object_id: usize, mesh: &Mesh) -> Result<()> {
    let count = mesh.vertices.len();
    for (index, triangle) in mesh.triangles.iter().enumerate() {
        if triangle.indices().iter().any(|&v| v >= count) {
            return Err(Error::InvalidModel(format!(
                "Object {}: triangle {} references vertex index out of bounds (vertex count {})",
                object_id, index, count
            )));
        }
    }
    Ok(())
}

/// Build items and components must reference declared objects
fn validate_build_references(model: &Model) -> Result<()> {
    for object in &model.resources.objects {
        for component in object.as_components().unwrap_or_default() {
            if model.resources.object(component.objectid).is_none() {
                return Err(Error::InvalidModel(format!(
                    "Object {} has a component referencing unknown object {}",
                    object.id, component.objectid
                )));
            }
        }
    }
    for item in &model.build.items {
        if model.resources.object(item.objectid).is_none() {
            return Err(Error::InvalidModel(format!(
                "Build item references unknown object {}",
                item.objectid
            )));
        }
    }
    Ok(())
}

/// Parse attributes from an XML element into a map, unescaping values
pub(crate) fn parse_attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::with_capacity(8);

    for attr in e.attributes() {
        let attr = attr?;
        let key =
            std::str::from_utf8(attr.key.as_ref()).map_err(|e| Error::InvalidXml(e.to_string()))?;
        let value =
            std::str::from_utf8(&attr.value).map_err(|e| Error::InvalidXml(e.to_string()))?;
        let value = quick_xml::escape::unescape(value)
            .map_err(|e| Error::XmlAttr(format!("Attribute '{}': {}", key, e)))?;

        attrs.insert(get_local_name(key).to_string(), value.into_owned());
    }

    Ok(attrs)
}

/// Parse the required `id` attribute of a resource element
pub(crate) fn parse_id(attrs: &HashMap<String, String>, element: &str) -> Result<usize> {
    let id = attrs
        .get("id")
        .ok_or_else(|| Error::missing_attribute(element, "id"))?
        .parse::<usize>()?;
    if id == 0 {
        return Err(Error::InvalidModel(format!(
            "Element '<{}>' has id 0; resource ids must be positive",
            element
        )));
    }
    Ok(id)
}
