//! The platform's native serialization format.
//!
//! ```text
//! N;                      null
//! b:1;                    bool
//! i:42;                   integer
//! d:0.5;                  float (INF, -INF and NAN spelled out)
//! s:5:"hello";            string, length in bytes
//! a:2:{i:0;s:1:"a";s:1:"k";N;}          array of key/value pairs
//! O:8:"stdClass":1:{s:4:"node";s:1:"x";}  object
//! ```
//!
//! Arrays whose keys are exactly `0..n` in order decode to [`Value::Seq`];
//! every other array decodes to [`Value::Map`]. An empty array is an
//! empty sequence. The format cannot tell the two apart, so a `Map` with
//! keys `0..n` (or no keys) encodes to the same bytes as the matching
//! `Seq` and decodes back as that `Seq`. Round trips are exact on the
//! encoded text, and on values already in this canonical form.

use super::{Codec, CodecError};
use crate::{MapKey, Value};

/// Nesting deeper than this is rejected rather than risking the stack.
const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, Default)]
pub struct PhpCodec;

impl Codec for PhpCodec {
    fn name(&self) -> &'static str {
        "php"
    }

    fn encode(&self, value: &Value) -> String {
        let mut out = String::new();
        encode_into(value, &mut out);
        out
    }

    fn decode(&self, raw: &str) -> Result<Value, CodecError> {
        let trimmed = raw.trim();
        let mut parser = Parser {
            input: trimmed.as_bytes(),
            pos: 0,
        };
        let value = parser.parse_value(0)?;
        if parser.pos != parser.input.len() {
            return Err(CodecError::TrailingData { pos: parser.pos });
        }
        Ok(value)
    }

    fn looks_encoded(&self, raw: &str) -> bool {
        let t = raw.trim().as_bytes();
        match t {
            [b'N', b';', ..] => true,
            [tag, b':', ..] => matches!(tag, b'a' | b'O' | b'C' | b's' | b'i' | b'd' | b'b'),
            _ => false,
        }
    }
}

// ── Encoding ─────────────────────────────────────────────────────────────────

fn encode_into(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("N;"),
        Value::Bool(b) => out.push_str(if *b { "b:1;" } else { "b:0;" }),
        Value::Int(i) => {
            out.push_str("i:");
            out.push_str(&i.to_string());
            out.push(';');
        }
        Value::Float(f) => {
            out.push_str("d:");
            out.push_str(&format_float(*f));
            out.push(';');
        }
        Value::Str(s) => encode_str(s, out),
        Value::Seq(items) => {
            out.push_str(&format!("a:{}:{{", items.len()));
            for (i, item) in items.iter().enumerate() {
                out.push_str(&format!("i:{};", i));
                encode_into(item, out);
            }
            out.push('}');
        }
        Value::Map(entries) => {
            out.push_str(&format!("a:{}:{{", entries.len()));
            encode_entries(entries, out);
            out.push('}');
        }
        Value::Object { class, fields } => {
            out.push_str(&format!(
                "O:{}:\"{}\":{}:{{",
                class.len(),
                class,
                fields.len()
            ));
            encode_entries(fields, out);
            out.push('}');
        }
    }
}

fn encode_entries(entries: &[(MapKey, Value)], out: &mut String) {
    for (key, value) in entries {
        match key {
            MapKey::Int(i) => out.push_str(&format!("i:{};", i)),
            MapKey::Str(s) => encode_str(s, out),
        }
        encode_into(value, out);
    }
}

fn encode_str(s: &str, out: &mut String) {
    out.push_str(&format!("s:{}:\"", s.len()));
    out.push_str(s);
    out.push_str("\";");
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        f.to_string()
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────────

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_value(&mut self, depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::Malformed(format!(
                "nesting deeper than {} levels",
                MAX_DEPTH
            )));
        }
        let tag_pos = self.pos;
        let tag = self.next()?;
        match tag {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                let pos = self.pos;
                match self.read_until(b';')? {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    _ => Err(CodecError::InvalidNumber { pos }),
                }
            }
            b'i' => {
                self.expect(b':')?;
                let pos = self.pos;
                let digits = self.read_until(b';')?;
                digits
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| CodecError::InvalidNumber { pos })
            }
            b'd' => {
                self.expect(b':')?;
                let pos = self.pos;
                let digits = self.read_until(b';')?;
                parse_float(digits)
                    .map(Value::Float)
                    .ok_or(CodecError::InvalidNumber { pos })
            }
            b's' => {
                self.expect(b':')?;
                self.parse_str_body().map(Value::Str)
            }
            b'a' => {
                self.expect(b':')?;
                let count = self.read_count()?;
                self.expect(b'{')?;
                let entries = self.parse_entries(count, depth)?;
                self.expect(b'}')?;
                Ok(canonicalize_array(entries))
            }
            b'O' => {
                self.expect(b':')?;
                let class = self.parse_str_literal()?;
                self.expect(b':')?;
                let count = self.read_count()?;
                self.expect(b'{')?;
                let fields = self.parse_entries(count, depth)?;
                self.expect(b'}')?;
                Ok(Value::Object { class, fields })
            }
            other => Err(CodecError::Unsupported {
                pos: tag_pos,
                tag: other as char,
            }),
        }
    }

    fn parse_entries(
        &mut self,
        count: usize,
        depth: usize,
    ) -> Result<Vec<(MapKey, Value)>, CodecError> {
        let remaining = self.input.len().saturating_sub(self.pos);
        let mut entries = Vec::with_capacity(count.min(remaining));
        for _ in 0..count {
            let key = self.parse_key()?;
            let value = self.parse_value(depth + 1)?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    fn parse_key(&mut self) -> Result<MapKey, CodecError> {
        let pos = self.pos;
        match self.next()? {
            b'i' => {
                self.expect(b':')?;
                let digits = self.read_until(b';')?;
                digits
                    .parse::<i64>()
                    .map(MapKey::Int)
                    .map_err(|_| CodecError::InvalidNumber { pos })
            }
            b's' => {
                self.expect(b':')?;
                self.parse_str_body().map(MapKey::Str)
            }
            _ => Err(CodecError::Unexpected {
                pos,
                expected: "integer or string key".to_string(),
            }),
        }
    }

    /// `<len>:"<bytes>";` after the `s:` prefix.
    fn parse_str_body(&mut self) -> Result<String, CodecError> {
        let s = self.parse_str_literal()?;
        self.expect(b';')?;
        Ok(s)
    }

    /// `<len>:"<bytes>"` with no terminator.
    fn parse_str_literal(&mut self) -> Result<String, CodecError> {
        let len = self.read_count()?;
        self.expect(b'"')?;
        let start = self.pos;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or(CodecError::UnexpectedEnd {
                pos: self.input.len(),
            })?;
        let bytes = &self.input[start..end];
        self.pos = end;
        self.expect(b'"')?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { pos: start })
    }

    fn read_count(&mut self) -> Result<usize, CodecError> {
        let pos = self.pos;
        self.read_until(b':')?
            .parse::<usize>()
            .map_err(|_| CodecError::InvalidNumber { pos })
    }

    /// Consume bytes up to `delim`, returning them without the delimiter.
    fn read_until(&mut self, delim: u8) -> Result<&'a str, CodecError> {
        let start = self.pos;
        let offset = self.input[start..]
            .iter()
            .position(|b| *b == delim)
            .ok_or(CodecError::UnexpectedEnd {
                pos: self.input.len(),
            })?;
        let input: &'a [u8] = self.input;
        let slice = &input[start..start + offset];
        self.pos = start + offset + 1;
        std::str::from_utf8(slice).map_err(|_| CodecError::InvalidUtf8 { pos: start })
    }

    fn next(&mut self) -> Result<u8, CodecError> {
        let b = *self
            .input
            .get(self.pos)
            .ok_or(CodecError::UnexpectedEnd { pos: self.pos })?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, want: u8) -> Result<(), CodecError> {
        let pos = self.pos;
        let got = self.next()?;
        if got != want {
            return Err(CodecError::Unexpected {
                pos,
                expected: format!("'{}'", want as char),
            });
        }
        Ok(())
    }
}

fn parse_float(digits: &str) -> Option<f64> {
    match digits {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NAN" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}

fn canonicalize_array(entries: Vec<(MapKey, Value)>) -> Value {
    let dense = entries
        .iter()
        .enumerate()
        .all(|(i, (k, _))| matches!(k, MapKey::Int(n) if *n == i as i64));
    if dense {
        Value::Seq(entries.into_iter().map(|(_, v)| v).collect())
    } else {
        Value::Map(entries)
    }
}
