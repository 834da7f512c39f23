//! Binding configuration
//!
//! Names used by the reference scan and the generated header. The defaults
//! match what event scripts and the host loader expect; a host only needs to
//! override them when it ships its own loader.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Configuration shared by the extractor, the generator and the binding
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    /// Receiver token scanned for in `receiver.field` / `receiver:field`
    pub receiver: String,
    /// Name of the generated event struct
    pub struct_name: String,
    /// Prefix turning a property name into a struct field name
    pub field_prefix: String,
    /// Chunk name reported by the runtime in diagnostics
    pub chunk_name: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        BindingConfig {
            receiver: "event".to_string(),
            struct_name: "sky_lua_event_t".to_string(),
            field_prefix: "_".to_string(),
            chunk_name: "=script".to_string(),
        }
    }
}

impl BindingConfig {
    /// Parse a TOML document, filling absent keys with defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: BindingConfig =
            toml::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every generated name is a usable identifier
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.receiver) {
            return Err(Error::Config(format!(
                "receiver must be an identifier, got '{}'",
                self.receiver
            )));
        }
        if !is_identifier(&self.struct_name) {
            return Err(Error::Config(format!(
                "struct_name must be an identifier, got '{}'",
                self.struct_name
            )));
        }
        // Property names may start with a digit; the prefix keeps fields valid.
        if !is_identifier(&self.field_prefix) {
            return Err(Error::Config(format!(
                "field_prefix must be an identifier, got '{}'",
                self.field_prefix
            )));
        }
        Ok(())
    }
}

/// ASCII identifier: letter or underscore, then letters, digits, underscores
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
