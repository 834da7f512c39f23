//! Property reference extraction
//!
//! Finds every `event.name` and `event:name` in a script and resolves the
//! names against the schema.
//!
//! The scan is lexical. It does not know about strings or comments, so a
//! reference inside `"event.foo"` or `-- event.foo` counts like any other
//! and must name a known property.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::BindingConfig;
use crate::error::{Error, Result};
use crate::schema::{Property, PropertySchema};

/// Scanner for the default `event` receiver
static DEFAULT_PATTERN: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| reference_pattern("event"));

/// Extract the properties referenced through the default `event` receiver
pub fn extract_references<'a>(
    schema: &'a PropertySchema,
    source: &str,
) -> Result<Vec<&'a Property>> {
    let pattern = DEFAULT_PATTERN
        .as_ref()
        .map_err(|e| Error::Config(e.to_string()))?;
    ReferenceExtractor {
        pattern: pattern.clone(),
    }
    .extract(schema, source)
}

/// Compiled reference scanner
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    pattern: Regex,
}

impl ReferenceExtractor {
    /// Build a scanner for the configured receiver
    pub fn new(config: &BindingConfig) -> Result<Self> {
        config.validate()?;
        let pattern =
            reference_pattern(&config.receiver).map_err(|e| Error::Config(e.to_string()))?;
        Ok(ReferenceExtractor { pattern })
    }

    /// Names referenced in `source`, in order of appearance, duplicates kept
    pub fn referenced_names<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pattern
            .captures_iter(source)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Resolve every reference in `source`
    ///
    /// Fails on the first name the schema does not know. The result holds each
    /// property once, in ascending id order.
    pub fn extract<'a>(
        &self,
        schema: &'a PropertySchema,
        source: &str,
    ) -> Result<Vec<&'a Property>> {
        let mut seen = HashSet::new();
        let mut properties = Vec::new();

        for name in self.referenced_names(source) {
            let property = schema
                .get_by_name(name)
                .ok_or_else(|| Error::UnknownProperty(name.to_string()))?;
            if seen.insert(property.id()) {
                properties.push(property);
            }
        }
        properties.sort_by_key(|p| p.id());

        debug!(
            target: "skyscript",
            count = properties.len(),
            "extracted property references"
        );
        Ok(properties)
    }
}

/// `\b<receiver>[.:](ident)` with an ASCII word boundary and identifier
fn reference_pattern(receiver: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?-u:\b){}[.:]([0-9A-Za-z_]+)",
        regex::escape(receiver)
    ))
}
