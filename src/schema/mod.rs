//! Property schema
//!
//! The schema owns every event property, hands out ids, answers name/id
//! lookups and persists itself in a canonical form.
//!
//! # Persisted form
//! A single compact JSON array of `{id, name, type, dataType}` records in
//! ascending id order, followed by a newline. Action properties (negative
//! ids, most negative first) therefore precede object properties. Consumers
//! compare this output byte for byte, so the order is part of the format.
//! Decoding accepts records in any order.

mod property;

pub use property::{Classification, DataType, Property, PropertyId};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Registry of event properties
///
/// Lookups take `&self` and can be shared across threads. Creation, deletion
/// and decoding take `&mut self`, so a loaded schema is normally wrapped in an
/// `Arc` and treated as read-only afterwards.
#[derive(Debug)]
pub struct PropertySchema {
    /// Backing file, if any
    path: Option<PathBuf>,
    /// Source of truth, ordered by id
    properties: BTreeMap<PropertyId, Property>,
    /// Derived name index
    names: HashMap<String, PropertyId>,
    /// Next object id (counts up from 1)
    next_object_id: PropertyId,
    /// Next action id (counts down from -1)
    next_action_id: PropertyId,
}

impl Default for PropertySchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Record as it appears on the wire, before validation
#[derive(Deserialize)]
struct RawRecord {
    id: Option<PropertyId>,
    name: Option<String>,
    #[serde(rename = "type")]
    classification: Option<String>,
    #[serde(rename = "dataType")]
    data_type: Option<String>,
}

impl PropertySchema {
    /// Create an empty in-memory schema
    pub fn new() -> Self {
        PropertySchema {
            path: None,
            properties: BTreeMap::new(),
            names: HashMap::new(),
            next_object_id: 1,
            next_action_id: -1,
        }
    }

    /// Create an empty schema backed by a file
    ///
    /// Nothing is read until [`PropertySchema::load`] is called.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        PropertySchema {
            path: Some(path.into()),
            ..Self::new()
        }
    }

    /// Backing file path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of properties
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// All properties in ascending id order
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Create a property, allocating the next id of its namespace
    pub fn create_property(
        &mut self,
        name: &str,
        classification: Classification,
        data_type: DataType,
    ) -> Result<&Property> {
        if self.names.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let counter = match classification {
            Classification::Object => &mut self.next_object_id,
            Classification::Action => &mut self.next_action_id,
        };
        let id = *counter;
        // The last id of a namespace is never issued, so the counter always
        // has somewhere to go.
        *counter = classification
            .next_id(id)
            .ok_or(Error::IdsExhausted(classification))?;
        debug!(target: "skyscript", id, name, %classification, %data_type, "created property");

        self.names.insert(name.to_string(), id);
        Ok(self
            .properties
            .entry(id)
            .or_insert_with(|| Property::new(id, name, classification, data_type)))
    }

    /// Remove a property
    ///
    /// The id is retired: the namespace counters never move backwards.
    pub fn delete_property(&mut self, id: PropertyId) -> Option<Property> {
        let property = self.properties.remove(&id)?;
        self.names.remove(property.name());
        debug!(target: "skyscript", id, name = property.name(), "deleted property");
        Some(property)
    }

    /// Look up a property by name (case-sensitive)
    pub fn get_by_name(&self, name: &str) -> Option<&Property> {
        self.names.get(name).and_then(|id| self.properties.get(id))
    }

    /// Look up a property by id
    pub fn get_by_id(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(&id)
    }

    /// Write the canonical form to a sink
    pub fn encode<W: Write>(&self, mut writer: W) -> Result<()> {
        let records: Vec<&Property> = self.properties.values().collect();
        serde_json::to_writer(&mut writer, &records).map_err(io::Error::from)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Replace the contents of the schema with a persisted form
    ///
    /// Records may come in any order. On error the schema is left untouched.
    pub fn decode<R: Read>(&mut self, reader: R) -> Result<()> {
        let records: Vec<RawRecord> = serde_json::from_reader(reader).map_err(|e| {
            if e.is_io() {
                Error::Io(e.into())
            } else {
                Error::MalformedSchema(e.to_string())
            }
        })?;

        let mut properties = BTreeMap::new();
        let mut names = HashMap::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let property = validate_record(index, record)?;
            if names.contains_key(property.name()) {
                return Err(Error::MalformedSchema(format!(
                    "duplicate property name: '{}'",
                    property.name()
                )));
            }
            if properties.contains_key(&property.id()) {
                return Err(Error::MalformedSchema(format!(
                    "duplicate property id: {}",
                    property.id()
                )));
            }
            names.insert(property.name().to_string(), property.id());
            properties.insert(property.id(), property);
        }

        // Counters resume past the most extreme id of each namespace.
        // validate_record guarantees the step cannot overflow.
        let next_object_id = properties
            .last_key_value()
            .map(|(&id, _)| id)
            .filter(|&id| id > 0)
            .and_then(|id| Classification::Object.next_id(id))
            .unwrap_or(1);
        let next_action_id = properties
            .first_key_value()
            .map(|(&id, _)| id)
            .filter(|&id| id < 0)
            .and_then(|id| Classification::Action.next_id(id))
            .unwrap_or(-1);
        self.next_object_id = next_object_id;
        self.next_action_id = next_action_id;
        self.properties = properties;
        self.names = names;

        debug!(target: "skyscript", count = self.properties.len(), "decoded property schema");
        Ok(())
    }

    /// Load the backing file
    ///
    /// A missing file leaves the schema empty.
    pub fn load(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        match fs::File::open(&path) {
            Ok(file) => self.decode(io::BufReader::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(target: "skyscript", path = %path.display(), "no property file yet");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the canonical form to the backing file
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut buffer = Vec::new();
        self.encode(&mut buffer)?;
        fs::write(path, buffer)?;
        Ok(())
    }
}

/// Turn a wire record into a property, checking every field
fn validate_record(index: usize, record: RawRecord) -> Result<Property> {
    let missing = |field: &str| Error::MalformedSchema(format!("record {}: missing '{}'", index, field));

    let id = record.id.ok_or_else(|| missing("id"))?;
    let name = record.name.ok_or_else(|| missing("name"))?;
    let classification: Classification = record
        .classification
        .ok_or_else(|| missing("type"))?
        .parse()?;
    let data_type: DataType = record
        .data_type
        .ok_or_else(|| missing("dataType"))?
        .parse()
        .map_err(|e| Error::MalformedSchema(format!("record {}: {}", index, e)))?;

    if !classification.owns_id(id) {
        return Err(Error::MalformedSchema(format!(
            "record {}: id {} is not valid for a {} property",
            index, id, classification
        )));
    }
    if classification.next_id(id).is_none() {
        return Err(Error::MalformedSchema(format!(
            "record {}: id {} exhausts the {} namespace",
            index, id, classification
        )));
    }

    Ok(Property::new(id, name, classification, data_type))
}
