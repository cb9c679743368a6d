//! Generic JSON tree → XML

use crate::{FormatError, Result, FHIR_NS};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde_json::{Map, Value};
use std::io::Cursor;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Encode a generic resource tree as FHIR XML.
pub fn value_to_xml(resource: &Value) -> Result<String> {
    let obj = resource.as_object().ok_or(FormatError::ExpectedObject)?;
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write_resource(&mut writer, obj)?;
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_resource(writer: &mut XmlWriter, obj: &Map<String, Value>) -> Result<()> {
    let resource_type = obj
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or(FormatError::MissingResourceType)?;

    let mut start = BytesStart::new(resource_type);
    start.push_attribute(("xmlns", FHIR_NS));
    writer.write_event(Event::Start(start))?;
    write_members(writer, obj, &[])?;
    writer.write_event(Event::End(BytesEnd::new(resource_type)))?;
    Ok(())
}

/// Write the members of an object; metadata `_name` entries are merged into
/// their primitive. Members listed in `attributes` were already written.
fn write_members(
    writer: &mut XmlWriter,
    obj: &Map<String, Value>,
    attributes: &[&str],
) -> Result<()> {
    for (key, value) in obj {
        if key == "resourceType" || attributes.contains(&key.as_str()) {
            continue;
        }
        if let Some(name) = key.strip_prefix('_') {
            // metadata without a value of its own
            if !obj.contains_key(name) {
                write_value(writer, name, &Value::Null, Some(value))?;
            }
            continue;
        }
        write_value(writer, key, value, obj.get(&format!("_{}", key)))?;
    }
    Ok(())
}

fn write_value(
    writer: &mut XmlWriter,
    name: &str,
    value: &Value,
    meta: Option<&Value>,
) -> Result<()> {
    match value {
        Value::Array(items) => {
            let metas = meta.and_then(Value::as_array);
            for (idx, item) in items.iter().enumerate() {
                let item_meta = metas.and_then(|m| m.get(idx)).filter(|m| !m.is_null());
                write_value(writer, name, item, item_meta)?;
            }
            Ok(())
        }
        Value::Object(obj) if obj.contains_key("resourceType") => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            write_resource(writer, obj)?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
            Ok(())
        }
        Value::Object(obj) => write_complex(writer, name, obj),
        Value::String(s) if name == "div" && s.trim_start().starts_with('<') => {
            writer.get_mut().get_mut().extend_from_slice(s.as_bytes());
            Ok(())
        }
        _ => write_primitive(writer, name, value, meta),
    }
}

/// Complex datatypes carry `id` as attribute; extensions also carry `url`.
fn write_complex(writer: &mut XmlWriter, name: &str, obj: &Map<String, Value>) -> Result<()> {
    let mut start = BytesStart::new(name);
    let mut attributes = Vec::new();
    if let Some(Value::String(id)) = obj.get("id") {
        start.push_attribute(("id", id.as_str()));
        attributes.push("id");
    }
    if name == "extension" || name == "modifierExtension" {
        if let Some(Value::String(url)) = obj.get("url") {
            start.push_attribute(("url", url.as_str()));
            attributes.push("url");
        }
    }
    writer.write_event(Event::Start(start))?;
    write_members(writer, obj, &attributes)?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_primitive(
    writer: &mut XmlWriter,
    name: &str,
    value: &Value,
    meta: Option<&Value>,
) -> Result<()> {
    let mut elem = BytesStart::new(name);
    let text = match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    };
    if let Some(text) = &text {
        elem.push_attribute(("value", text.as_str()));
    }

    let meta = meta.and_then(Value::as_object);
    if let Some(Value::String(id)) = meta.and_then(|m| m.get("id")) {
        elem.push_attribute(("id", id.as_str()));
    }
    let extensions = meta.and_then(|m| m.get("extension"));

    match (text, extensions) {
        (None, None) => Ok(()),
        (_, Some(ext)) => {
            writer.write_event(Event::Start(elem))?;
            write_value(writer, "extension", ext, None)?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
            Ok(())
        }
        (Some(_), None) => {
            writer.write_event(Event::Empty(elem))?;
            Ok(())
        }
    }
}
