//! Objects, meshes, components and the build section

use crate::error::{Error, Result};
use crate::model::*;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::io::Write as IoWrite;

/// Write an object with its mesh or components
pub(super) fn write_object<W: IoWrite>(writer: &mut Writer<W>, object: &Object) -> Result<()> {
    let mut elem = BytesStart::new("object");
    push_number(&mut elem, "id", object.id);
    elem.push_attribute(("type", object.object_type.as_str()));
    if let Some(name) = &object.name {
        elem.push_attribute(("name", name.as_str()));
    }
    push_optional(&mut elem, "pid", object.pid);
    push_optional(&mut elem, "pindex", object.pindex);

    emit(writer, Event::Start(elem), "object")?;
    match &object.shape {
        ObjectShape::Mesh(mesh) => write_mesh(writer, mesh)?,
        ObjectShape::Components(components) => write_components(writer, components)?,
    }
    emit(writer, Event::End(BytesEnd::new("object")), "object")
}

fn write_mesh<W: IoWrite>(writer: &mut Writer<W>, mesh: &Mesh) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("mesh")), "mesh")?;

    emit(writer, Event::Start(BytesStart::new("vertices")), "vertices")?;
    for vertex in &mesh.vertices {
        let mut elem = BytesStart::new("vertex");
        for (axis, value) in [("x", vertex.x), ("y", vertex.y), ("z", vertex.z)] {
            elem.push_attribute((axis, value.to_string().as_str()));
        }
        emit(writer, Event::Empty(elem), "vertex")?;
    }
    emit(writer, Event::End(BytesEnd::new("vertices")), "vertices")?;

    emit(writer, Event::Start(BytesStart::new("triangles")), "triangles")?;
    for triangle in &mesh.triangles {
        let mut elem = BytesStart::new("triangle");
        push_number(&mut elem, "v1", triangle.v1);
        push_number(&mut elem, "v2", triangle.v2);
        push_number(&mut elem, "v3", triangle.v3);
        push_optional(&mut elem, "pid", triangle.pid);
        push_optional(&mut elem, "p1", triangle.p1);
        push_optional(&mut elem, "p2", triangle.p2);
        push_optional(&mut elem, "p3", triangle.p3);
        emit(writer, Event::Empty(elem), "triangle")?;
    }
    emit(writer, Event::End(BytesEnd::new("triangles")), "triangles")?;

    emit(writer, Event::End(BytesEnd::new("mesh")), "mesh")
}

fn write_components<W: IoWrite>(writer: &mut Writer<W>, components: &[Component]) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("components")), "components")?;
    for component in components {
        let elem = reference("component", component.objectid, component.transform.as_ref());
        emit(writer, Event::Empty(elem), "component")?;
    }
    emit(writer, Event::End(BytesEnd::new("components")), "components")
}

/// Write the build section
pub(super) fn write_build<W: IoWrite>(writer: &mut Writer<W>, build: &Build) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("build")), "build")?;
    for item in &build.items {
        let elem = reference("item", item.objectid, item.transform.as_ref());
        emit(writer, Event::Empty(elem), "item")?;
    }
    emit(writer, Event::End(BytesEnd::new("build")), "build")
}

/// `<tag objectid=… [transform=…]/>`, shared by components and build items
fn reference<'a>(tag: &'a str, objectid: usize, transform: Option<&Transform>) -> BytesStart<'a> {
    let mut elem = BytesStart::new(tag);
    push_number(&mut elem, "objectid", objectid);
    if let Some(transform) = transform {
        elem.push_attribute(("transform", format_transform(transform).as_str()));
    }
    elem
}

fn push_number(elem: &mut BytesStart, name: &str, value: usize) {
    elem.push_attribute((name, value.to_string().as_str()));
}

fn push_optional(elem: &mut BytesStart, name: &str, value: Option<usize>) {
    if let Some(value) = value {
        push_number(elem, name, value);
    }
}

fn emit<W: IoWrite>(writer: &mut Writer<W>, event: Event, element: &str) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::xml_write(format!("Failed to write <{}>: {}", element, e)))
}

fn format_transform(transform: &Transform) -> String {
    transform
        .0
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
