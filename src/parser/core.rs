//! Core 3MF element parsing
//!
//! This module handles parsing of core 3MF elements including objects,
//! vertices, triangles, components, and build items.

use crate::error::{Error, Result};
use crate::model::*;
use quick_xml::events::BytesStart;

use super::{parse_attributes, parse_id};

/// Attributes of an `<object>` element, before its mesh or components are known
pub(super) struct ObjectHeader {
    pub(super) id: usize,
    name: Option<String>,
    object_type: ObjectType,
    pid: Option<usize>,
    pindex: Option<usize>,
}

impl ObjectHeader {
    /// Parse object element attributes
    pub(super) fn parse(e: &BytesStart) -> Result<Self> {
        let attrs = parse_attributes(e)?;
        let id = parse_id(&attrs, "object")?;

        // Per 3MF Core spec, valid types: model, support, solidsupport, surface, other
        let object_type = match attrs.get("type").map(String::as_str) {
            None | Some("model") => ObjectType::Model,
            Some("support") => ObjectType::Support,
            Some("solidsupport") => ObjectType::SolidSupport,
            Some("surface") => ObjectType::Surface,
            Some("other") => ObjectType::Other,
            Some(other) => {
                return Err(Error::InvalidXml(format!(
                    "Invalid object type '{}'. Must be one of: model, support, solidsupport, surface, other",
                    other
                )));
            }
        };

        let pid = attrs.get("pid").map(|v| v.parse::<usize>()).transpose()?;
        let pindex = attrs
            .get("pindex")
            .map(|v| v.parse::<usize>())
            .transpose()?;

        Ok(Self {
            id,
            name: attrs.get("name").cloned(),
            object_type,
            pid,
            pindex,
        })
    }

    pub(super) fn into_object(self, shape: ObjectShape) -> Object {
        Object {
            id: self.id,
            name: self.name,
            object_type: self.object_type,
            pid: self.pid,
            pindex: self.pindex,
            shape,
        }
    }
}

/// Parse vertex element attributes
pub(super) fn parse_vertex(e: &BytesStart) -> Result<Vertex> {
    // Parse attributes directly without building a HashMap; vertices dominate file size
    let mut x = None;
    let mut y = None;
    let mut z = None;

    for attr in e.attributes() {
        let attr = attr?;
        let slot = match attr.key.as_ref() {
            b"x" => &mut x,
            b"y" => &mut y,
            b"z" => &mut z,
            _ => continue,
        };
        let value =
            std::str::from_utf8(&attr.value).map_err(|e| Error::InvalidXml(e.to_string()))?;
        let parsed = value.trim().parse::<f64>()?;
        if !parsed.is_finite() {
            return Err(Error::ParseError(format!(
                "Vertex coordinate '{}' is not a finite number",
                value
            )));
        }
        *slot = Some(parsed);
    }

    Ok(Vertex::new(
        x.ok_or_else(|| Error::missing_attribute("vertex", "x"))?,
        y.ok_or_else(|| Error::missing_attribute("vertex", "y"))?,
        z.ok_or_else(|| Error::missing_attribute("vertex", "z"))?,
    ))
}

/// Parse triangle element attributes
pub(super) fn parse_triangle(e: &BytesStart) -> Result<Triangle> {
    let attrs = parse_attributes(e)?;

    let index = |name: &str| -> Result<Option<usize>> {
        attrs
            .get(name)
            .map(|v| v.parse::<usize>().map_err(Error::from))
            .transpose()
    };
    let required = |name: &str| -> Result<usize> {
        index(name)?.ok_or_else(|| Error::missing_attribute("triangle", name))
    };

    let mut triangle = Triangle::new(required("v1")?, required("v2")?, required("v3")?);
    triangle.pid = index("pid")?;
    triangle.p1 = index("p1")?;
    triangle.p2 = index("p2")?;
    triangle.p3 = index("p3")?;

    Ok(triangle)
}

/// Parse component element attributes
pub(super) fn parse_component(e: &BytesStart) -> Result<Component> {
    let attrs = parse_attributes(e)?;

    let objectid = attrs
        .get("objectid")
        .ok_or_else(|| Error::missing_attribute("component", "objectid"))?
        .parse::<usize>()?;

    let mut component = Component::new(objectid);
    if let Some(transform) = attrs.get("transform") {
        component.transform = Some(parse_transform(transform)?);
    }

    Ok(component)
}

/// Parse build item element attributes
pub(super) fn parse_build_item(e: &BytesStart) -> Result<BuildItem> {
    let attrs = parse_attributes(e)?;

    let objectid = attrs
        .get("objectid")
        .ok_or_else(|| Error::missing_attribute("item", "objectid"))?
        .parse::<usize>()?;

    let mut item = BuildItem::new(objectid);
    if let Some(transform) = attrs.get("transform") {
        item.transform = Some(parse_transform(transform)?);
    }

    Ok(item)
}

/// Parse a `transform` attribute: exactly 12 whitespace-separated numbers
pub fn parse_transform(value: &str) -> Result<Transform> {
    let values = value
        .split_whitespace()
        .map(|s| s.parse::<f64>().map_err(Error::from))
        .collect::<Result<Vec<f64>>>()?;

    let matrix: [f64; Transform::LEN] = values.as_slice().try_into().map_err(|_| {
        Error::InvalidXml(format!(
            "Transform must have {} values, got {}",
            Transform::LEN,
            values.len()
        ))
    })?;

    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(Error::ParseError(format!(
            "Transform '{}' contains non-finite values",
            value
        )));
    }

    Ok(Transform(matrix))
}
