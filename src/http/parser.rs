//! Request body parsing
//!
//! [`BodyParser`] picks a decoder from the exact `Content-Type` value and
//! turns a raw body into a [`ParsedBody`]. Parsing never fails: malformed
//! or unrecognized input yields `None`.
//!
//! | Content type                                           | Result               |
//! |--------------------------------------------------------|----------------------|
//! | `application/json`                                     | [`ParsedBody::Json`] |
//! | `application/xml`, `text/xml`                          | [`ParsedBody::Xml`]  |
//! | `application/x-www-form-urlencoded`, `multipart/form-data` | [`ParsedBody::Form`] |
//!
//! XML documents containing a DTD are rejected, so external entities are
//! never resolved.

use super::server_request::Params;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_TEXT_XML: &str = "text/xml";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";

/// Structured form of a request body
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// A JSON object or array
    Json(Value),
    /// The root element of an XML document
    Xml(XmlElement),
    /// Decoded form fields
    Form(Params),
}

impl ParsedBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParsedBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlElement> {
        match self {
            ParsedBody::Xml(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&Params> {
        match self {
            ParsedBody::Form(params) => Some(params),
            _ => None,
        }
    }
}

/// An XML element with its attributes, text and child elements
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    /// Concatenated direct text content, trimmed
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// `None` when elements nest deeper than `depth_left`
    fn from_node(node: roxmltree::Node<'_, '_>, depth_left: usize) -> Option<Self> {
        let depth_left = depth_left.checked_sub(1)?;
        Some(XmlElement {
            name: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                .collect(),
            text: node
                .children()
                .filter(|child| child.is_text())
                .filter_map(|child| child.text())
                .collect::<String>()
                .trim()
                .to_string(),
            children: node
                .children()
                .filter(|child| child.is_element())
                .map(|child| XmlElement::from_node(child, depth_left))
                .collect::<Option<Vec<_>>>()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Xml,
    Form,
}

/// Body decoder selected by content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyParser {
    format: Option<Format>,
}

impl BodyParser {
    /// Select a decoder for an exact content type
    ///
    /// Parameters such as `; charset=utf-8` are not stripped, so
    /// `application/json; charset=utf-8` selects no decoder.
    pub fn new(content_type: &str) -> Self {
        let format = match content_type {
            CONTENT_TYPE_JSON => Some(Format::Json),
            CONTENT_TYPE_XML | CONTENT_TYPE_TEXT_XML => Some(Format::Xml),
            CONTENT_TYPE_FORM | CONTENT_TYPE_MULTIPART => Some(Format::Form),
            _ => None,
        };
        BodyParser { format }
    }

    /// Whether the content type carries form fields
    pub fn is_form(content_type: &str) -> bool {
        BodyParser::new(content_type).format == Some(Format::Form)
    }

    /// Decode a raw body
    pub fn parse(&self, data: &[u8]) -> Option<ParsedBody> {
        match self.format? {
            Format::Json => parse_json(data),
            Format::Xml => parse_xml(data),
            Format::Form => Some(ParsedBody::Form(decode_form(data))),
        }
    }
}

fn parse_json(data: &[u8]) -> Option<ParsedBody> {
    match serde_json::from_slice::<Value>(data) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(ParsedBody::Json(value)),
        Ok(_) => {
            debug!("JSON body is not an object or array, treating as empty");
            None
        }
        Err(e) => {
            debug!(error = %e, "Malformed JSON body");
            None
        }
    }
}

fn parse_xml(data: &[u8]) -> Option<ParsedBody> {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "XML body is not valid UTF-8");
            return None;
        }
    };

    match roxmltree::Document::parse(text) {
        Ok(document) => match XmlElement::from_node(document.root_element(), MAX_XML_DEPTH) {
            Some(root) => Some(ParsedBody::Xml(root)),
            None => {
                debug!(max_depth = MAX_XML_DEPTH, "XML body nested too deeply");
                None
            }
        },
        Err(e) => {
            debug!(error = %e, "Malformed XML body");
            None
        }
    }
}

/// Deepest bracket nesting accepted in a form key, as PHP's
/// `max_input_nesting_level`
pub const MAX_FORM_DEPTH: usize = 64;

/// Deepest element nesting accepted in an XML body
pub const MAX_XML_DEPTH: usize = 256;

/// Decode `application/x-www-form-urlencoded` data into nested fields
///
/// Bracketed keys build nested maps: `a[b]=1` yields `{"a": {"b": "1"}}`,
/// and `a[]=1&a[]=2` yields `{"a": ["1", "2"]}`. Maps whose keys are
/// exactly `0..n` in order become arrays.
///
/// Pairs nested deeper than [`MAX_FORM_DEPTH`] are dropped, as are `[]`
/// appends to a map whose largest index is `i64::MAX`.
pub fn decode_form(data: &[u8]) -> Params {
    let mut params = Params::new();
    for (key, value) in url::form_urlencoded::parse(data) {
        let (base, path) = split_key(&key);
        if base.is_empty() {
            continue;
        }
        if path.len() > MAX_FORM_DEPTH {
            debug!(field = base, depth = path.len(), "Form key nested too deeply, dropping");
            continue;
        }
        if !insert_nested(&mut params, base.to_string(), &path, value.into_owned()) {
            debug!(field = base, "No free index for form value, dropping");
        }
    }

    params
        .into_iter()
        .map(|(key, value)| (key, into_lists(value)))
        .collect()
}

/// Split `a[b][]` into `("a", ["b", ""])`
fn split_key(key: &str) -> (&str, Vec<String>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };

    let (base, mut rest) = key.split_at(open);
    let mut path = Vec::new();
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        path.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }

    if path.is_empty() {
        (key, path)
    } else {
        (base, path)
    }
}

/// Returns `false` when an append finds no free index
fn insert_nested(target: &mut Params, key: String, path: &[String], value: String) -> bool {
    let Some((next, rest)) = path.split_first() else {
        target.insert(key, Value::String(value));
        return true;
    };

    let slot = target
        .entry(key)
        .or_insert_with(|| Value::Object(Params::new()));
    if !slot.is_object() {
        *slot = Value::Object(Params::new());
    }
    let Value::Object(child) = slot else {
        return false;
    };

    let next = if next.is_empty() {
        match next_index(child) {
            Some(index) => index,
            None => return false,
        }
    } else {
        next.clone()
    };
    insert_nested(child, next, rest, value)
}

/// One past the largest index key, `None` if that would overflow
fn next_index(map: &Params) -> Option<String> {
    match map.keys().filter_map(|key| as_index(key)).max() {
        Some(max) => max.checked_add(1).map(|index| index.to_string()),
        None => Some("0".to_string()),
    }
}

/// A key counts as an index when it is a canonical decimal that fits `i64`
fn as_index(key: &str) -> Option<i64> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

fn into_lists(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sequential = !map.is_empty()
                && map
                    .keys()
                    .enumerate()
                    .all(|(i, key)| *key == i.to_string());
            if sequential {
                Value::Array(map.into_iter().map(|(_, v)| into_lists(v)).collect())
            } else {
                Value::Object(map.into_iter().map(|(k, v)| (k, into_lists(v))).collect())
            }
        }
        other => other,
    }
}
