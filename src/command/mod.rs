//! Address-based control surface.
//!
//! Messages carry a Unix-path style address and a list of typed arguments.
//! [`ControlBus`] moves them between senders and receivers inside the process,
//! [`Router`] turns them into parameter changes on proxy objects.

pub mod bus;
pub mod router;

use std::fmt;

pub use bus::{ControlBus, ListenerId};
pub use router::Router;

use crate::{broadcast::Value, Error, Result};

/*
Type Tags
=========

Typed data messages declare their layout with one character per field:

  | tag | field            |
  | --- | ---------------- |
  | i   | 32-bit integer   |
  | h   | 64-bit integer   |
  | f   | 32-bit float     |
  | d   | 64-bit float     |
  | s   | string           |

"ssfi" → two strings, a float, an integer.
*/

#[derive(Debug, Clone, PartialEq)]
pub enum OscValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

impl OscValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            OscValue::Int(_) => TypeTag::Int32,
            OscValue::Long(_) => TypeTag::Int64,
            OscValue::Float(_) => TypeTag::Float32,
            OscValue::Double(_) => TypeTag::Float64,
            OscValue::Str(_) => TypeTag::Str,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            OscValue::Int(v) => Some(*v as f32),
            OscValue::Long(v) => Some(*v as f32),
            OscValue::Float(v) => Some(*v),
            OscValue::Double(v) => Some(*v as f32),
            OscValue::Str(_) => None,
        }
    }
}

impl From<&OscValue> for Value {
    fn from(v: &OscValue) -> Self {
        match v {
            OscValue::Int(v) => Value::Int(*v as i64),
            OscValue::Long(v) => Value::Int(*v),
            OscValue::Float(v) => Value::Float(*v as f64),
            OscValue::Double(v) => Value::Float(*v),
            OscValue::Str(v) => Value::Str(v.clone()),
        }
    }
}

impl fmt::Display for OscValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscValue::Int(v) => write!(f, "{v}"),
            OscValue::Long(v) => write!(f, "{v}"),
            OscValue::Float(v) => write!(f, "{v}"),
            OscValue::Double(v) => write!(f, "{v}"),
            OscValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Int32,
    Int64,
    Float32,
    Float64,
    Str,
}

impl TypeTag {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(TypeTag::Int32),
            'h' => Some(TypeTag::Int64),
            'f' => Some(TypeTag::Float32),
            'd' => Some(TypeTag::Float64),
            's' => Some(TypeTag::Str),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            TypeTag::Int32 => 'i',
            TypeTag::Int64 => 'h',
            TypeTag::Float32 => 'f',
            TypeTag::Float64 => 'd',
            TypeTag::Str => 's',
        }
    }

    /// Convert a loosely typed value into this tag's representation.
    pub fn coerce(self, value: &Value) -> Option<OscValue> {
        match self {
            TypeTag::Int32 => value
                .as_int()
                .and_then(|v| i32::try_from(v).ok())
                .map(OscValue::Int),
            TypeTag::Int64 => value.as_int().map(OscValue::Long),
            TypeTag::Float32 => value.as_f64().map(|v| OscValue::Float(v as f32)),
            TypeTag::Float64 => value.as_f64().map(OscValue::Double),
            TypeTag::Str => value.as_str().map(|s| OscValue::Str(s.to_string())),
        }
    }
}

/// Parsed type-tag string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTags(Vec<TypeTag>);

impl TypeTags {
    pub fn parse(tags: &str) -> Result<Self> {
        tags.chars()
            .map(|c| {
                TypeTag::from_char(c)
                    .ok_or_else(|| Error::InvalidFormat(format!("unknown type tag '{c}' in \"{tags}\"")))
            })
            .collect::<Result<Vec<_>>>()
            .map(TypeTags)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tags(&self) -> &[TypeTag] {
        &self.0
    }

    /// Verify that `values` match the tags one to one.
    pub fn check(&self, values: &[OscValue]) -> Result<()> {
        if values.len() != self.0.len() {
            return Err(Error::InvalidFormat(format!(
                "expected {} values for \"{self}\", got {}",
                self.0.len(),
                values.len()
            )));
        }
        for (i, (tag, value)) in self.0.iter().zip(values).enumerate() {
            if value.tag() != *tag {
                return Err(Error::InvalidFormat(format!(
                    "value {i} is '{}', expected '{}'",
                    value.tag().as_char(),
                    tag.as_char()
                )));
            }
        }
        Ok(())
    }

    /// Convert `values` to the declared types.
    pub fn coerce(&self, values: &[Value]) -> Result<Vec<OscValue>> {
        if values.len() != self.0.len() {
            return Err(Error::InvalidFormat(format!(
                "expected {} values for \"{self}\", got {}",
                self.0.len(),
                values.len()
            )));
        }
        self.0
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (tag, value))| {
                tag.coerce(value).ok_or_else(|| {
                    Error::InvalidFormat(format!("value {i} ({value}) is not '{}'", tag.as_char()))
                })
            })
            .collect()
    }
}

impl fmt::Display for TypeTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in &self.0 {
            write!(f, "{}", tag.as_char())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub address: String,
    pub args: Vec<OscValue>,
}

impl Message {
    pub fn new(address: impl Into<String>, args: Vec<OscValue>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Single float message, the shape sent by audio-rate senders.
    pub fn float(address: impl Into<String>, value: f32) -> Self {
        Self::new(address, vec![OscValue::Float(value)])
    }
}

/// Match an address against a pattern with `*` (any run) and `?` (any char).
pub fn address_matches(pattern: &str, address: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let address: Vec<char> = address.chars().collect();

    let (mut p, mut a) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while a < address.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == address[a]) {
            p += 1;
            a += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, a));
            p += 1;
        } else if let Some((sp, sa)) = star {
            p = sp + 1;
            a = sa + 1;
            star = Some((sp, sa + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
