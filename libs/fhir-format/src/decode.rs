//! XML → generic JSON tree

use crate::{FormatError, Result, MAX_DEPTH, XHTML_NS};
use roxmltree::{Document, Node};
use serde_json::{Map, Value};

/// Convert a FHIR XML payload into the generic JSON tree.
pub fn xml_to_value(input: &str) -> Result<Value> {
    let doc = Document::parse(input)?;
    resource_to_value(input, &doc.root_element(), 0)
}

/// An element whose only element child is named like a resource type.
fn inline_resource<'a, 'input>(node: &Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    if node.attribute("value").is_some() {
        return None;
    }
    let mut children = node.children().filter(|c| c.is_element());
    let first = children.next()?;
    if children.next().is_some() {
        return None;
    }
    first
        .tag_name()
        .name()
        .starts_with(|c: char| c.is_ascii_uppercase())
        .then_some(first)
}

fn resource_to_value(source: &str, node: &Node, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(FormatError::TooDeep(MAX_DEPTH));
    }
    let mut map = Map::new();
    map.insert(
        "resourceType".to_string(),
        Value::String(node.tag_name().name().to_string()),
    );
    collect_children(source, node, &mut map, depth)?;
    Ok(Value::Object(map))
}

/// Children grouped by name, in first-occurrence order.
struct Group {
    name: String,
    values: Vec<Value>,
    meta: Vec<Option<Value>>,
}

fn collect_children(
    source: &str,
    node: &Node,
    target: &mut Map<String, Value>,
    depth: usize,
) -> Result<()> {
    let mut groups: Vec<Group> = Vec::new();

    for child in node.children().filter(|c| c.is_element()) {
        let name = child.tag_name().name();
        let (value, meta) = element_to_value(source, &child, depth + 1)?;
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => {
                group.values.push(value);
                group.meta.push(meta);
            }
            None => groups.push(Group {
                name: name.to_string(),
                values: vec![value],
                meta: vec![meta],
            }),
        }
    }

    for mut group in groups {
        let has_meta = group.meta.iter().any(Option::is_some);
        if group.values.len() == 1 {
            if let Some(value) = group.values.pop() {
                target.insert(group.name.clone(), value);
            }
            if let Some(Some(meta)) = group.meta.pop() {
                target.insert(format!("_{}", group.name), meta);
            }
        } else {
            if has_meta {
                let meta = group
                    .meta
                    .into_iter()
                    .map(|m| m.unwrap_or(Value::Null))
                    .collect();
                target.insert(format!("_{}", group.name), Value::Array(meta));
            }
            target.insert(group.name, Value::Array(group.values));
        }
    }
    Ok(())
}

fn element_to_value(source: &str, node: &Node, depth: usize) -> Result<(Value, Option<Value>)> {
    if depth > MAX_DEPTH {
        return Err(FormatError::TooDeep(MAX_DEPTH));
    }
    if node.tag_name().namespace() == Some(XHTML_NS) {
        return Ok((Value::String(source[node.range()].to_string()), None));
    }

    if let Some(inner) = inline_resource(node) {
        return Ok((resource_to_value(source, &inner, depth + 1)?, None));
    }

    if let Some(raw) = node.attribute("value") {
        let mut meta = Map::new();
        if let Some(id) = node.attribute("id") {
            meta.insert("id".to_string(), Value::String(id.to_string()));
        }
        let extensions: Vec<Value> = node
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == "extension")
            .map(|c| element_to_value(source, &c, depth + 1).map(|(value, _)| value))
            .collect::<Result<_>>()?;
        if !extensions.is_empty() {
            meta.insert("extension".to_string(), Value::Array(extensions));
        }
        let meta = (!meta.is_empty()).then_some(Value::Object(meta));
        return Ok((parse_primitive(raw), meta));
    }

    let mut obj = Map::new();
    if let Some(id) = node.attribute("id") {
        obj.insert("id".to_string(), Value::String(id.to_string()));
    }
    if let Some(url) = node.attribute("url") {
        obj.insert("url".to_string(), Value::String(url.to_string()));
    }
    collect_children(source, node, &mut obj, depth)?;

    // a primitive carrying only metadata has no value of its own
    if obj.is_empty() {
        return Ok((Value::Null, None));
    }
    Ok((Value::Object(obj), None))
}

/// Booleans become JSON booleans; everything else stays text.
///
/// Numbers are not guessed: codes such as "160" are strings in JSON, and the
/// models accept numeric fields given as text.
fn parse_primitive(input: &str) -> Value {
    match input {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(input.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_primitives_and_repeats() {
        let xml = r#"
        <Task xmlns="http://hl7.org/fhir">
            <id value="160.000.000.000.000.01"/>
            <meta>
                <profile value="https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Task|1.4"/>
            </meta>
            <identifier>
                <system value="https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_PrescriptionId"/>
                <value value="160.000.000.000.000.01"/>
            </identifier>
            <identifier>
                <system value="https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_AccessCode"/>
                <value value="0777"/>
            </identifier>
            <status value="ready"/>
            <priority value="10"/>
        </Task>
        "#;

        let value = xml_to_value(xml).unwrap();
        assert_eq!(value["resourceType"], "Task");
        assert_eq!(value["id"], "160.000.000.000.000.01");
        assert!(value["meta"]["profile"].is_string());
        assert_eq!(value["identifier"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["identifier"][1]["value"], "0777");
        assert_eq!(value["priority"], "10");
    }

    #[test]
    fn inline_resources_carry_resource_type() {
        let xml = r#"
        <Bundle xmlns="http://hl7.org/fhir">
            <type value="collection"/>
            <entry>
                <fullUrl value="urn:uuid:1"/>
                <resource>
                    <Binary>
                        <id value="b1"/>
                        <contentType value="application/pkcs7-mime"/>
                    </Binary>
                </resource>
            </entry>
        </Bundle>
        "#;

        let value = xml_to_value(xml).unwrap();
        assert_eq!(value["type"], "collection");
        assert_eq!(value["entry"]["resource"]["resourceType"], "Binary");
        assert_eq!(value["entry"]["resource"]["id"], "b1");
    }

    #[test]
    fn primitive_metadata_and_extensions() {
        let xml = r#"
        <Patient xmlns="http://hl7.org/fhir">
            <birthDate id="bd1" value="1974-12-25"/>
            <extension url="http://example.org/ext">
                <valueBoolean value="true"/>
            </extension>
        </Patient>
        "#;

        let value = xml_to_value(xml).unwrap();
        assert_eq!(value["birthDate"], "1974-12-25");
        assert_eq!(value["_birthDate"]["id"], "bd1");
        assert_eq!(value["extension"]["url"], "http://example.org/ext");
        assert_eq!(value["extension"]["valueBoolean"], true);
    }

    #[test]
    fn narrative_is_kept_as_markup() {
        let xml = r#"<Patient xmlns="http://hl7.org/fhir"><text><status value="generated"/><div xmlns="http://www.w3.org/1999/xhtml"><p>hi</p></div></text></Patient>"#;
        let value = xml_to_value(xml).unwrap();
        let div = value["text"]["div"].as_str().unwrap();
        assert!(div.starts_with("<div"));
        assert!(div.contains("<p>hi</p>"));
    }

    fn nested_extensions(levels: usize) -> String {
        format!(
            r#"<Task xmlns="http://hl7.org/fhir">{}{}</Task>"#,
            r#"<extension url="http://example.org/ext">"#.repeat(levels),
            "</extension>".repeat(levels)
        )
    }

    #[test]
    fn nesting_depth_is_limited() {
        let err = xml_to_value(&nested_extensions(5_000)).unwrap_err();
        assert!(matches!(err, FormatError::TooDeep(MAX_DEPTH)));

        let value = xml_to_value(&nested_extensions(MAX_DEPTH - 1)).unwrap();
        assert_eq!(value["extension"]["url"], "http://example.org/ext");
    }
}
