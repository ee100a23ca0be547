//! The XML-RPC subset flrig uses.
//!
//! flrig exchanges scalars (`i4`/`int`, `double`, `string`, `boolean`),
//! arrays of strings, and the fault struct. This module encodes method
//! calls and decodes responses for exactly that subset; anything else is a
//! protocol error.

use rigsync_core::error::{Error, Result};

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Str(String),
    Bool(bool),
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

impl Value {
    /// The value as text. Numbers are formatted.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Double(d) => Some(d.to_string()),
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.into()),
            Value::Array(_) | Value::Struct(_) => None,
        }
    }

    /// The value as an integer. flrig often sends numbers as strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Double(d) if d.is_finite() => Some(d.round() as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|d| d.is_finite()).map(|d| d.round() as i64))
            }
            Value::Double(_) | Value::Array(_) | Value::Struct(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn encode_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => out.push_str(&format!("<i4>{i}</i4>")),
        Value::Double(d) => out.push_str(&format!("<double>{d}</double>")),
        Value::Str(s) => out.push_str(&format!("<string>{}</string>", escape(s))),
        Value::Bool(b) => out.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, v) in members {
                out.push_str(&format!("<member><name>{}</name>", escape(name)));
                encode_value(v, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Encode a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(param, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

// ---------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Consume `tag` (after whitespace) if it is next.
    fn eat(&mut self, tag: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(tag) {
            self.pos += tag.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tag: &str) -> Result<()> {
        if self.eat(tag) {
            Ok(())
        } else {
            Err(Error::Protocol(format!(
                "expected {tag} in XML-RPC reply near {:?}",
                self.rest().chars().take(40).collect::<String>()
            )))
        }
    }

    /// Text up to `end`, consuming `end` too.
    fn text_until(&mut self, end: &str) -> Result<&'a str> {
        let rest = self.rest();
        let idx = rest
            .find(end)
            .ok_or_else(|| Error::Protocol(format!("unterminated element, missing {end}")))?;
        self.pos += idx + end.len();
        Ok(&rest[..idx])
    }

    fn value(&mut self) -> Result<Value> {
        self.expect("<value>")?;
        if self.rest().starts_with("</value>") {
            self.pos += "</value>".len();
            return Ok(Value::Str(String::new()));
        }

        let value = if self.eat("<i4>") {
            Value::Int(parse_int(self.text_until("</i4>")?)?)
        } else if self.eat("<int>") {
            Value::Int(parse_int(self.text_until("</int>")?)?)
        } else if self.eat("<double>") {
            let text = self.text_until("</double>")?.trim();
            Value::Double(
                text.parse()
                    .map_err(|_| Error::Protocol(format!("bad double {text:?}")))?,
            )
        } else if self.eat("<boolean>") {
            Value::Bool(self.text_until("</boolean>")?.trim() == "1")
        } else if self.eat("<string/>") {
            Value::Str(String::new())
        } else if self.eat("<string>") {
            Value::Str(unescape(self.text_until("</string>")?))
        } else if self.eat("<array>") {
            self.expect("<data>")?;
            let mut items = Vec::new();
            while !self.eat("</data>") {
                items.push(self.value()?);
            }
            self.expect("</array>")?;
            Value::Array(items)
        } else if self.eat("<struct>") {
            let mut members = Vec::new();
            while !self.eat("</struct>") {
                self.expect("<member>")?;
                self.expect("<name>")?;
                let name = unescape(self.text_until("</name>")?);
                let v = self.value()?;
                self.expect("</member>")?;
                members.push((name, v));
            }
            Value::Struct(members)
        } else if self.rest().trim_start().starts_with('<') {
            return Err(Error::Protocol(format!(
                "unsupported XML-RPC type near {:?}",
                self.rest().chars().take(40).collect::<String>()
            )));
        } else {
            // Untyped content is a string.
            let text = self.text_until("</value>")?;
            return Ok(Value::Str(unescape(text)));
        };

        self.expect("</value>")?;
        Ok(value)
    }
}

fn parse_int(text: &str) -> Result<i64> {
    let text = text.trim();
    text.parse()
        .map_err(|_| Error::Protocol(format!("bad integer {text:?}")))
}

/// Decode a `methodResponse`. A fault becomes [`Error::Rejected`] with the
/// fault string; a response without a value decodes as an empty string.
pub fn decode_response(body: &str) -> Result<Value> {
    let start = body
        .find("<methodResponse>")
        .ok_or_else(|| Error::Protocol("reply is not an XML-RPC methodResponse".into()))?;
    let mut cur = Cursor {
        text: body,
        pos: start + "<methodResponse>".len(),
    };

    if cur.eat("<fault>") {
        let fault = cur.value()?;
        let message = fault
            .member("faultString")
            .and_then(Value::to_text)
            .unwrap_or_else(|| "unknown fault".into());
        let code = fault.member("faultCode").and_then(Value::as_i64);
        return Err(Error::Rejected(match code {
            Some(code) => format!("{message} (fault {code})"),
            None => message,
        }));
    }

    cur.expect("<params>")?;
    if cur.eat("</params>") {
        return Ok(Value::Str(String::new()));
    }
    cur.expect("<param>")?;
    let value = cur.value()?;
    cur.expect("</param>")?;
    Ok(value)
}
