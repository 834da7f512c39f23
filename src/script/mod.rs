//! Script bindings
//!
//! Static analysis of a script's event references, generation of the event
//! header, and the lifecycle of a script inside an embedded runtime.

pub mod binding;
pub mod codegen;
pub mod extract;
pub mod layout;

pub use binding::{BindingState, ScriptBinding};
pub use codegen::{BindingArtifact, BindingGenerator, generate_bindings};
pub use extract::{ReferenceExtractor, extract_references};
pub use layout::{EventLayout, FieldLayout};
