//! Binding header generation
//!
//! Turns an ordered list of properties into a LuaJIT FFI header with three
//! sections that always list the properties in the same order:
//!
//! 1. field declarations of the event struct (`ffi.cdef`)
//! 2. accessors reachable as `event.<name>` (`ffi.metatype`)
//! 3. descriptor registrations `(id, offset, type)` (`sky_init_descriptor`)
//!
//! Offsets in section 3 are computed by the loader with `ffi.offsetof`; the
//! generator only fixes field order and field types.

use std::fmt;

use tracing::debug;

use crate::config::BindingConfig;
use crate::error::Result;
use crate::schema::{DataType, Property, PropertyId};
use crate::script::layout::EventLayout;

/// Name of the native string cell type
pub const STRING_TYPE_NAME: &str = "sky_string_t";

/// Name of the generated descriptor initializer
pub const DESCRIPTOR_INIT_FUNCTION: &str = "sky_init_descriptor";

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// A field of the generated event struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub field: String,
    pub data_type: DataType,
}

impl FieldDecl {
    /// Native C type of the field
    pub fn c_type(&self) -> &'static str {
        match self.data_type {
            DataType::String => STRING_TYPE_NAME,
            DataType::Integer => "int32_t",
            DataType::Float => "double",
            DataType::Boolean => "bool",
        }
    }
}

/// A read accessor exposed to scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    /// Name scripts use after the receiver
    pub name: String,
    pub field: String,
    pub data_type: DataType,
}

/// A descriptor registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub id: PropertyId,
    pub field: String,
    pub data_type: DataType,
}

/// Descriptor entry with a host-computed offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDescriptor {
    pub id: PropertyId,
    pub offset: usize,
    pub data_type: DataType,
}

/// Generated bindings for one script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingArtifact {
    struct_name: String,
    fields: Vec<FieldDecl>,
    accessors: Vec<Accessor>,
    descriptors: Vec<Descriptor>,
}

impl BindingArtifact {
    pub fn struct_name(&self) -> &str {
        &self.struct_name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Pair each descriptor with the offset from a host-side layout
    ///
    /// Entries whose property is missing from the layout are skipped.
    pub fn descriptors_with(&self, layout: &EventLayout) -> Vec<ResolvedDescriptor> {
        self.descriptors
            .iter()
            .filter_map(|d| {
                layout.field(d.id).map(|f| ResolvedDescriptor {
                    id: d.id,
                    offset: f.offset,
                    data_type: d.data_type,
                })
            })
            .collect()
    }

    /// Render the Lua header text
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BindingArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- Generated event bindings. Do not edit.")?;
        writeln!(f, "local ffi = require('ffi')")?;

        // Section 1: struct layout
        writeln!(f, "ffi.cdef([[")?;
        writeln!(f, "typedef struct {{")?;
        writeln!(f, "  int64_t length;")?;
        writeln!(f, "  char *data;")?;
        writeln!(f, "}} {};", STRING_TYPE_NAME)?;
        writeln!(f, "typedef struct {{")?;
        for decl in &self.fields {
            writeln!(f, "  {} {};", decl.c_type(), decl.field)?;
        }
        writeln!(f, "}} {};", self.struct_name)?;
        writeln!(f, "]])")?;

        // Section 2: accessors
        writeln!(f, "local {}_accessors = {{", self.struct_name)?;
        for accessor in &self.accessors {
            match accessor.data_type {
                DataType::String => writeln!(
                    f,
                    "  {} = function(event) return ffi.string(event.{}.data, event.{}.length) end,",
                    lua_key(&accessor.name),
                    accessor.field,
                    accessor.field
                )?,
                DataType::Integer | DataType::Float | DataType::Boolean => writeln!(
                    f,
                    "  {} = function(event) return event.{} end,",
                    lua_key(&accessor.name),
                    accessor.field
                )?,
            }
        }
        writeln!(f, "}}")?;
        writeln!(f, "ffi.metatype('{}', {{", self.struct_name)?;
        writeln!(f, "  __index = function(event, key)")?;
        writeln!(f, "    local accessor = {}_accessors[key]", self.struct_name)?;
        writeln!(f, "    if accessor ~= nil then return accessor(event) end")?;
        writeln!(f, "  end,")?;
        writeln!(f, "}})")?;

        // Section 3: descriptor registrations
        writeln!(f, "function {}(descriptor)", DESCRIPTOR_INIT_FUNCTION)?;
        for d in &self.descriptors {
            writeln!(
                f,
                "  descriptor:set_property({}, ffi.offsetof('{}', '{}'), '{}')",
                d.id, self.struct_name, d.field, d.data_type
            )?;
        }
        writeln!(f, "end")
    }
}

/// Generator for binding artifacts
#[derive(Debug, Clone)]
pub struct BindingGenerator {
    struct_name: String,
    field_prefix: String,
}

impl Default for BindingGenerator {
    fn default() -> Self {
        let config = BindingConfig::default();
        BindingGenerator {
            struct_name: config.struct_name,
            field_prefix: config.field_prefix,
        }
    }
}

impl BindingGenerator {
    pub fn new(config: &BindingConfig) -> Result<Self> {
        config.validate()?;
        Ok(BindingGenerator {
            struct_name: config.struct_name.clone(),
            field_prefix: config.field_prefix.clone(),
        })
    }

    /// Struct field name for a property name
    pub fn field_name(&self, name: &str) -> String {
        let mut field = String::with_capacity(self.field_prefix.len() + name.len());
        field.push_str(&self.field_prefix);
        field.push_str(name);
        field
    }

    /// Build the three sections for the given properties, keeping their order
    pub fn generate(&self, properties: &[&Property]) -> BindingArtifact {
        let mut fields = Vec::with_capacity(properties.len());
        let mut accessors = Vec::with_capacity(properties.len());
        let mut descriptors = Vec::with_capacity(properties.len());

        for property in properties {
            let field = self.field_name(property.name());
            let data_type = property.data_type();
            fields.push(FieldDecl {
                field: field.clone(),
                data_type,
            });
            accessors.push(Accessor {
                name: property.name().to_string(),
                field: field.clone(),
                data_type,
            });
            descriptors.push(Descriptor {
                id: property.id(),
                field,
                data_type,
            });
        }

        debug!(
            target: "skyscript",
            fields = fields.len(),
            struct_name = %self.struct_name,
            "generated event bindings"
        );
        BindingArtifact {
            struct_name: self.struct_name.clone(),
            fields,
            accessors,
            descriptors,
        }
    }
}

/// Render a table key, bracketing names Lua would not accept bare
fn lua_key(name: &str) -> String {
    let bare = crate::config::is_identifier(name) && !LUA_KEYWORDS.contains(&name);
    if bare {
        name.to_string()
    } else {
        let mut key = String::with_capacity(name.len() + 4);
        key.push_str("[\"");
        for c in name.chars() {
            match c {
                '"' => key.push_str("\\\""),
                '\\' => key.push_str("\\\\"),
                c => key.push(c),
            }
        }
        key.push_str("\"]");
        key
    }
}

/// Generate bindings with the default configuration
pub fn generate_bindings(properties: &[&Property]) -> BindingArtifact {
    BindingGenerator::default().generate(properties)
}
