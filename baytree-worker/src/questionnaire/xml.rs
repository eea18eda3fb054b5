/// XML codec for Views questionnaire answers
///
/// Request documents:
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8" standalone="yes"?>
/// <answers>
///   <EntityType>Person</EntityType>
///   <EntityID>1042</EntityID>
///   <answer><Q1>Yes</Q1></answer>
/// </answers>
/// ```
///
/// The `<answer>` block is only present when answers are submitted.
///
/// Views replies with an `answerset` document naming the answer set it
/// created. The identifier is taken from, in order of preference: the root
/// element's `id` attribute, the first child element carrying an `id`
/// attribute, or the text of an `<id>` element.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// XML declaration prefixed to every request document
pub const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Codec errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    /// The document is not well-formed
    #[error("Malformed XML: {0}")]
    Malformed(String),

    /// The root element is not `answerset`
    #[error("Expected an answerset document, found {0}")]
    UnexpectedRoot(String),

    /// No identifier anywhere in the answer set
    #[error("Answer set carries no instance id")]
    MissingInstanceId,

    /// A field name is not usable as an element name
    #[error("Invalid answer field name: {0:?}")]
    InvalidFieldName(String),
}

fn envelope(entity_id: &str, answer_block: &str) -> String {
    format!(
        "{DECLARATION}\n<answers><EntityType>Person</EntityType><EntityID>{}</EntityID>{}</answers>",
        escape(entity_id),
        answer_block
    )
}

/// Document assigning a questionnaire to a Views person
pub fn assignment_document(entity_id: &str) -> String {
    envelope(entity_id, "")
}

/// Document submitting answers for a Views person
///
/// Each pair becomes `<field>value</field>` inside `<answer>`, in the given
/// order. Values are escaped.
///
/// # Errors
///
/// Returns [`XmlError::InvalidFieldName`] if a field name is not a plain XML
/// element name
pub fn answers_document(entity_id: &str, answers: &[(String, String)]) -> Result<String, XmlError> {
    let mut block = String::from("<answer>");
    for (field, value) in answers {
        if !is_element_name(field) {
            return Err(XmlError::InvalidFieldName(field.clone()));
        }
        block.push_str(&format!("<{field}>{}</{field}>", escape(value.as_str())));
    }
    block.push_str("</answer>");

    Ok(envelope(entity_id, &block))
}

/// Element names without namespaces: a letter or underscore, then letters,
/// digits, `_`, `-` or `.`; names starting with "xml" are reserved
fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_');

    valid_start
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.to_ascii_lowercase().starts_with("xml")
}

fn id_attribute(element: &BytesStart<'_>) -> Result<Option<String>, XmlError> {
    let attr = element
        .try_get_attribute("id")
        .map_err(|e| XmlError::Malformed(e.to_string()))?;

    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|e| XmlError::Malformed(e.to_string()))?;
            let value = value.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        None => Ok(None),
    }
}

/// Extracts the answer-set instance id from a Views response
pub fn parse_instance_id(xml: &str) -> Result<String, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut seen_root = false;
    let mut in_id_element = false;
    let mut id_text: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::Malformed(e.to_string()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));

                if depth == 0 {
                    if seen_root {
                        return Err(XmlError::Malformed("multiple root elements".to_string()));
                    }
                    seen_root = true;

                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if !name.eq_ignore_ascii_case("answerset") {
                        return Err(XmlError::UnexpectedRoot(name));
                    }
                    if let Some(id) = id_attribute(e)? {
                        return Ok(id);
                    }
                } else {
                    if depth == 1 {
                        if let Some(id) = id_attribute(e)? {
                            return Ok(id);
                        }
                    }
                    if !is_empty && id_text.is_none() && e.local_name().as_ref() == b"id" {
                        in_id_element = true;
                    }
                }

                if !is_empty {
                    depth += 1;
                }
            }
            Event::Text(ref text) if in_id_element => {
                let value = text
                    .unescape()
                    .map_err(|e| XmlError::Malformed(e.to_string()))?;
                if !value.trim().is_empty() {
                    id_text = Some(value.trim().to_string());
                }
            }
            Event::End(_) => {
                in_id_element = false;
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(XmlError::Malformed("empty document".to_string()));
    }

    id_text.ok_or(XmlError::MissingInstanceId)
}
