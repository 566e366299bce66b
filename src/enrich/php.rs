//! Decoder for PHP `serialize()` output, as stored by the recipe plugin in post meta.
//!
//! Only the value kinds the plugin writes are supported: null, bool, int,
//! float, string and (nested) arrays. Strings are length-prefixed in bytes.

use std::collections::HashMap;

use crate::error::MigrationError;

#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<(PhpKey, PhpValue)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhpKey {
    Int(i64),
    Str(String),
}

impl PhpValue {
    pub fn get(&self, key: &str) -> Option<&PhpValue> {
        match self {
            PhpValue::Array(entries) => entries.iter().find_map(|(k, v)| match k {
                PhpKey::Str(s) if s == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Scalars rendered the way PHP would echo them; arrays and null have no text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            PhpValue::Str(s) => Some(s.clone()),
            PhpValue::Int(i) => Some(i.to_string()),
            PhpValue::Float(f) => Some(f.to_string()),
            PhpValue::Bool(b) => Some(if *b { "1".into() } else { String::new() }),
            PhpValue::Null | PhpValue::Array(_) => None,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &PhpValue> {
        let entries: &[(PhpKey, PhpValue)] = match self {
            PhpValue::Array(entries) => entries,
            _ => &[],
        };
        entries.iter().map(|(_, v)| v)
    }
}

pub fn unserialize(raw: &str) -> Result<PhpValue, MigrationError> {
    let mut parser = Parser { input: raw.as_bytes(), pos: 0 };
    let value = parser.value()?;
    if parser.pos != parser.input.len() && !raw[parser.pos..].trim().is_empty() {
        return Err(parser.error("trailing data"));
    }
    Ok(value)
}

/// A named (or unnamed) group of recipe items; each item is its scalar fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecipeGroup {
    pub name: Option<String>,
    pub items: Vec<HashMap<String, String>>,
}

/// Decode a serialized list of groups, each `{name, <items_key>: [..]}`.
pub fn decode_groups(raw: &str, items_key: &str) -> Result<Vec<RecipeGroup>, MigrationError> {
    let root = unserialize(raw)?;
    if !matches!(root, PhpValue::Array(_)) {
        return Err(MigrationError::RecipeDecode(format!("expected a list of groups, got {root:?}")));
    }
    let groups = root
        .values()
        .map(|group| RecipeGroup {
            name: group.get("name").and_then(PhpValue::as_text).filter(|n| !n.trim().is_empty()),
            items: group
                .get(items_key)
                .map(|items| items.values().map(scalar_fields).collect())
                .unwrap_or_default(),
        })
        .collect();
    Ok(groups)
}

fn scalar_fields(item: &PhpValue) -> HashMap<String, String> {
    let PhpValue::Array(entries) = item else { return HashMap::new() };
    entries
        .iter()
        .filter_map(|(k, v)| {
            let key = match k {
                PhpKey::Str(s) => s.clone(),
                PhpKey::Int(i) => i.to_string(),
            };
            v.as_text().map(|text| (key, text))
        })
        .collect()
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, what: &str) -> MigrationError {
        MigrationError::RecipeDecode(format!("{what} at byte {}", self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), MigrationError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    /// Read up to (and consume) `end`, returning the bytes before it as text.
    fn until(&mut self, end: u8) -> Result<&'a str, MigrationError> {
        let input = self.input;
        let start = self.pos;
        let rel = input[start..]
            .iter()
            .position(|b| *b == end)
            .ok_or_else(|| self.error(&format!("unterminated token, missing '{}'", end as char)))?;
        self.pos = start + rel + 1;
        std::str::from_utf8(&input[start..start + rel]).map_err(|_| self.error("invalid utf-8"))
    }

    fn number<T: std::str::FromStr>(&mut self, end: u8) -> Result<T, MigrationError> {
        let text = self.until(end)?;
        text.trim().parse::<T>().map_err(|_| self.error(&format!("bad number {text:?}")))
    }

    fn value(&mut self) -> Result<PhpValue, MigrationError> {
        let tag = self.peek().ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        match tag {
            b'N' => {
                self.expect(b';')?;
                Ok(PhpValue::Null)
            }
            b'b' => {
                self.expect(b':')?;
                let n: u8 = self.number(b';')?;
                Ok(PhpValue::Bool(n != 0))
            }
            b'i' => {
                self.expect(b':')?;
                Ok(PhpValue::Int(self.number(b';')?))
            }
            b'd' => {
                self.expect(b':')?;
                Ok(PhpValue::Float(self.number(b';')?))
            }
            b's' => {
                self.expect(b':')?;
                let len: usize = self.number(b':')?;
                self.expect(b'"')?;
                let end = self.pos.checked_add(len).ok_or_else(|| self.error("string length overflows"))?;
                let bytes = self.input.get(self.pos..end).ok_or_else(|| self.error("string runs past end"))?;
                let text = String::from_utf8_lossy(bytes).into_owned();
                self.pos = end;
                self.expect(b'"')?;
                self.expect(b';')?;
                Ok(PhpValue::Str(text))
            }
            b'a' => {
                self.expect(b':')?;
                let count: usize = self.number(b':')?;
                self.expect(b'{')?;
                let mut entries = Vec::with_capacity(count.min(self.input.len() - self.pos));
                for _ in 0..count {
                    let key = match self.value()? {
                        PhpValue::Int(i) => PhpKey::Int(i),
                        PhpValue::Str(s) => PhpKey::Str(s),
                        other => return Err(self.error(&format!("invalid array key {other:?}"))),
                    };
                    let value = self.value()?;
                    entries.push((key, value));
                }
                self.expect(b'}')?;
                Ok(PhpValue::Array(entries))
            }
            other => {
                self.pos -= 1;
                Err(self.error(&format!("unsupported type '{}'", other as char)))
            }
        }
    }
}
