//! Slicer part-naming document
//!
//! Bambu Studio and OrcaSlicer read `Metadata/model_settings.config` to name
//! the parts of an object. Without it the merged parts still print in their
//! colors, they just show up with generic names.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <config>
//!   <object id="1">
//!     <part id="3" subtype="normal_part">
//!       <metadata key="name" value="red"/>
//!     </part>
//!   </object>
//! </config>
//! ```

use crate::error::{Error, Result};
use crate::merge::PartRecord;
use crate::model::{Attachment, Model};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

/// Well-known package path of the part-naming document
pub const MODEL_SETTINGS_PATH: &str = "Metadata/model_settings.config";

/// Content type the document is registered with
pub const MODEL_SETTINGS_CONTENT_TYPE: &str = "text/xml";

/// Part names for one object, rendered as a slicer configuration document
#[derive(Debug, Clone, PartialEq)]
pub struct SlicerConfig {
    object_id: usize,
    parts: Vec<PartRecord>,
    path: String,
}

impl SlicerConfig {
    /// Start a document for the object with the given resource id
    pub fn new(object_id: usize) -> Self {
        Self {
            object_id,
            parts: Vec::new(),
            path: MODEL_SETTINGS_PATH.to_string(),
        }
    }

    /// Add one part
    pub fn with_part(mut self, part: PartRecord) -> Self {
        self.parts.push(part);
        self
    }

    /// Add several parts, keeping their order
    pub fn with_parts(mut self, parts: impl IntoIterator<Item = PartRecord>) -> Self {
        self.parts.extend(parts);
        self
    }

    /// Store the document at a different package path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Resource id of the described object
    pub fn object_id(&self) -> usize {
        self.object_id
    }

    /// Described parts
    pub fn parts(&self) -> &[PartRecord] {
        &self.parts
    }

    /// Render the document
    ///
    /// Labels are written as attribute values and escaped by the XML writer,
    /// so any label yields a well-formed document.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_event(&mut writer, Event::Start(BytesStart::new("config")))?;

        let mut object = BytesStart::new("object");
        object.push_attribute(("id", self.object_id.to_string().as_str()));
        write_event(&mut writer, Event::Start(object))?;

        for part in &self.parts {
            let mut part_elem = BytesStart::new("part");
            part_elem.push_attribute(("id", part.resource_id.to_string().as_str()));
            part_elem.push_attribute(("subtype", "normal_part"));
            write_event(&mut writer, Event::Start(part_elem))?;

            let mut name = BytesStart::new("metadata");
            name.push_attribute(("key", "name"));
            name.push_attribute(("value", part.label.as_str()));
            write_event(&mut writer, Event::Empty(name))?;

            write_event(&mut writer, Event::End(BytesEnd::new("part")))?;
        }

        write_event(&mut writer, Event::End(BytesEnd::new("object")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("config")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::xml_write(format!("Failed to convert XML to UTF-8: {}", e)))
    }

    /// Package the document as an attachment without a relationship
    pub fn to_attachment(&self) -> Result<Attachment> {
        Ok(Attachment::new(
            self.path.as_str(),
            MODEL_SETTINGS_CONTENT_TYPE,
            self.to_xml()?.into_bytes(),
        ))
    }

    /// Attach the document to `model`, replacing an earlier one at the same path
    pub fn attach(&self, model: &mut Model) -> Result<()> {
        model.add_attachment(self.to_attachment()?);
        Ok(())
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::xml_write(format!("Failed to write slicer config: {}", e)))
}
