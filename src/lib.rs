//! Skyscript - event property schema and LuaJIT script bindings
//!
//! Lets an analytics host run user scripts against event records without
//! copying event data into the interpreter. Scripts read fields straight out
//! of native memory through a header generated for exactly the properties
//! they reference.
//!
//! # Features
//! - Property schema with separate id namespaces for object (1, 2, ...) and
//!   action (-1, -2, ...) properties and a canonical JSON encoding
//! - Lexical scan of `event.name` / `event:name` references
//! - LuaJIT FFI header generation: struct layout, accessors, descriptor table
//! - Script lifecycle over any embedded runtime (`luajit` feature for mlua)
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use skyscript::{Classification, DataType, PropertySchema, ScriptBinding, Value};
//! use skyscript::runtime::lua::LuaJit;
//!
//! let mut schema = PropertySchema::new();
//! schema.create_property("salary", Classification::Object, DataType::Float)?;
//!
//! let source = "function bonus(event) return event.salary * 0.1 end";
//! let mut script = ScriptBinding::new(LuaJit, Arc::new(schema), source);
//! script.init()?;
//! ```

// Errors and configuration
pub mod config;
pub mod error;

// Property schema
pub mod schema;

// Reference extraction, code generation, lifecycle
pub mod script;

// Embedded runtime capability
pub mod runtime;

// Re-export main types
pub use config::BindingConfig;
pub use error::{Error, Result};
pub use runtime::{Runtime, Value};
pub use schema::{Classification, DataType, Property, PropertyId, PropertySchema};
pub use script::{BindingArtifact, BindingState, ScriptBinding};
