//! Event properties
//!
//! A property is one named, typed field of an event. Its classification picks
//! the id namespace: object properties count up from 1, action properties
//! count down from -1.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

/// Property identifier
///
/// Never zero. Positive for object properties, negative for action properties.
pub type PropertyId = i64;

/// Whether a property describes persistent state or a single occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// State-like field, positive ids
    Object,
    /// Event-occurrence field, negative ids
    Action,
}

impl Classification {
    /// Token used in the persisted form
    pub const fn as_str(self) -> &'static str {
        match self {
            Classification::Object => "object",
            Classification::Action => "action",
        }
    }

    /// Check that an id lives in this classification's namespace
    #[inline]
    pub const fn owns_id(self, id: PropertyId) -> bool {
        match self {
            Classification::Object => id > 0,
            Classification::Action => id < 0,
        }
    }

    /// Id allocated after `id`, or `None` once the namespace is exhausted
    #[inline]
    pub const fn next_id(self, id: PropertyId) -> Option<PropertyId> {
        match self {
            Classification::Object => id.checked_add(1),
            Classification::Action => id.checked_sub(1),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "object" => Ok(Classification::Object),
            "action" => Ok(Classification::Action),
            other => Err(Error::MalformedSchema(format!(
                "unknown property type: '{}'",
                other
            ))),
        }
    }
}

/// Wire data type of a property
///
/// Determines the native storage of the field and the accessor shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Length-prefixed byte string
    String,
    /// 32-bit signed integer
    Integer,
    /// Double precision float
    Float,
    /// Single byte boolean
    Boolean,
}

impl DataType {
    /// Token used in the persisted form and in descriptor registrations
    pub const fn as_str(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(DataType::String),
            "integer" => Ok(DataType::Integer),
            "float" => Ok(DataType::Float),
            "boolean" => Ok(DataType::Boolean),
            other => Err(Error::UnsupportedDataType(other.to_string())),
        }
    }
}

/// A single property of the event schema
///
/// Field order here is the key order of the persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Property {
    id: PropertyId,
    name: String,
    #[serde(rename = "type")]
    classification: Classification,
    #[serde(rename = "dataType")]
    data_type: DataType,
}

impl Property {
    pub(crate) fn new(
        id: PropertyId,
        name: impl Into<String>,
        classification: Classification,
        data_type: DataType,
    ) -> Self {
        Property {
            id,
            name: name.into(),
            classification,
            data_type,
        }
    }

    #[inline]
    pub fn id(&self) -> PropertyId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}
