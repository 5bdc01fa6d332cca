//! Minimal XML-RPC codec
//!
//! Covers what the Gandi API exchanges: method calls with positional
//! parameters, and responses carrying one value or a `<fault>`.
//!
//! Responses are first read into a small element tree with `quick-xml`, then
//! interpreted. Whitespace inside untyped `<value>` elements is preserved,
//! since an untyped value is a string.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use zonesync_core::{Error, Result};

use crate::PROVIDER;

/// An XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    /// `dateTime.iso8601`, kept verbatim
    DateTime(String),
    /// `base64`, kept as the encoded text
    Base64(String),
    Nil,
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Build a struct value from `(key, value)` pairs
    pub fn structure<K: Into<String>>(members: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Integer content; numeric strings are accepted too
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Member `key` of a struct value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Encode a `<methodCall>` document
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from(r#"<?xml version="1.0"?>"#);
    out.push_str("<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            let _ = write!(out, "<int>{}</int>", i);
        }
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s.as_str()));
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{}</double>", d);
        }
        Value::DateTime(s) => {
            let _ = write!(out, "<dateTime.iso8601>{}</dateTime.iso8601>", escape(s.as_str()));
        }
        Value::Base64(s) => {
            let _ = write!(out, "<base64>{}</base64>", escape(s.as_str()));
        }
        Value::Nil => out.push_str("<nil/>"),
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Decode a `<methodResponse>` document
///
/// # Errors
///
/// A `<fault>` response or a document that is not a well-formed XML-RPC
/// response yields [`Error::Provider`]. Fault errors carry the fault code
/// and string.
pub fn decode_response(body: &str) -> Result<Value> {
    let root = parse_tree(body)?;
    if root.name != "methodResponse" {
        return Err(malformed(format!("unexpected root element <{}>", root.name)));
    }

    if let Some(fault) = root.child("fault") {
        let value = parse_value(fault.required("value")?)?;
        let code = value.get("faultCode").and_then(Value::as_i64).unwrap_or_default();
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or("unknown fault");
        return Err(Error::provider(
            PROVIDER,
            format!("XML-RPC fault {}: {}", code, message),
        ));
    }

    let param = root.required("params")?.required("param")?;
    parse_value(param.required("value")?)
}

/// Parsed XML element: name, child elements, concatenated text
#[derive(Debug)]
struct Element {
    name: String,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn new(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn required(&self, name: &str) -> Result<&Element> {
        self.child(name)
            .ok_or_else(|| malformed(format!("<{}> has no <{}>", self.name, name)))
    }
}

fn parse_tree(body: &str) -> Result<Element> {
    let mut reader = Reader::from_str(body);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Element::new(e.name().as_ref())),
            Ok(Event::Empty(e)) => attach(&mut stack, &mut root, Element::new(e.name().as_ref())),
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t.unescape().map_err(|e| malformed(e.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(malformed("document ended inside an element"));
    }
    root.ok_or_else(|| malformed("empty document"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn parse_value(element: &Element) -> Result<Value> {
    let Some(typed) = element.children.first() else {
        return Ok(Value::String(element.text.clone()));
    };

    let text = typed.text.trim();
    let value = match typed.name.as_str() {
        "int" | "i4" | "i8" => Value::Int(
            text.parse()
                .map_err(|_| malformed(format!("invalid integer '{}'", text)))?,
        ),
        "boolean" => match text {
            "1" => Value::Bool(true),
            "0" => Value::Bool(false),
            other => return Err(malformed(format!("invalid boolean '{}'", other))),
        },
        "string" => Value::String(typed.text.clone()),
        "double" => Value::Double(
            text.parse()
                .map_err(|_| malformed(format!("invalid double '{}'", text)))?,
        ),
        "dateTime.iso8601" => Value::DateTime(text.to_string()),
        "base64" => Value::Base64(text.to_string()),
        "nil" => Value::Nil,
        "array" => {
            let data = typed.required("data")?;
            let items = data
                .children
                .iter()
                .filter(|c| c.name == "value")
                .map(parse_value)
                .collect::<Result<Vec<_>>>()?;
            Value::Array(items)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member.required("name")?.text.clone();
                let value = parse_value(member.required("value")?)?;
                members.insert(name, value);
            }
            Value::Struct(members)
        }
        other => return Err(malformed(format!("unknown value type <{}>", other))),
    };
    Ok(value)
}

fn malformed(detail: impl Into<String>) -> Error {
    Error::provider(
        PROVIDER,
        format!("Malformed XML-RPC response: {}", detail.into()),
    )
}
