//! Typed bus values

use std::collections::BTreeMap;
use std::fmt;

use super::path::ObjectPath;

/// String-keyed dictionary (`a{sv}`)
pub type VariantDict = BTreeMap<String, Variant>;

/// A single value carried in a method call, reply or property access
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Byte(u8),
    Bool(bool),
    UInt16(u16),
    UInt32(u32),
    Str(String),
    ObjectPath(ObjectPath),
    Dict(VariantDict),
}

impl Variant {
    /// Type signature of the value
    pub fn signature(&self) -> &'static str {
        match self {
            Variant::Byte(_) => "y",
            Variant::Bool(_) => "b",
            Variant::UInt16(_) => "q",
            Variant::UInt32(_) => "u",
            Variant::Str(_) => "s",
            Variant::ObjectPath(_) => "o",
            Variant::Dict(_) => "a{sv}",
        }
    }

    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Variant::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Variant::UInt16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object_path(&self) -> Option<&ObjectPath> {
        match self {
            Variant::ObjectPath(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&VariantDict> {
        match self {
            Variant::Dict(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Byte(v) => write!(f, "{}", v),
            Variant::Bool(v) => write!(f, "{}", v),
            Variant::UInt16(v) => write!(f, "{}", v),
            Variant::UInt32(v) => write!(f, "{}", v),
            Variant::Str(v) => write!(f, "{:?}", v),
            Variant::ObjectPath(v) => write!(f, "{}", v),
            Variant::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            },
        }
    }
}

impl From<u8> for Variant {
    fn from(v: u8) -> Self {
        Variant::Byte(v)
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<u16> for Variant {
    fn from(v: u16) -> Self {
        Variant::UInt16(v)
    }
}

impl From<u32> for Variant {
    fn from(v: u32) -> Self {
        Variant::UInt32(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::Str(v.to_string())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::Str(v)
    }
}

impl From<ObjectPath> for Variant {
    fn from(v: ObjectPath) -> Self {
        Variant::ObjectPath(v)
    }
}

impl From<VariantDict> for Variant {
    fn from(v: VariantDict) -> Self {
        Variant::Dict(v)
    }
}
