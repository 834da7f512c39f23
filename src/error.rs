//! Error types
//!
//! Every fallible operation in the crate reports one of these variants.
//! Nothing is retried internally; the caller decides what a failure means.

use thiserror::Error;

use crate::schema::Classification;

/// Errors raised by the schema, the binding generator and the script binding
#[derive(Debug, Error)]
pub enum Error {
    /// A property with this name already exists in the schema
    #[error("duplicate property name: '{0}'")]
    DuplicateName(String),

    /// Every id of a namespace has been handed out
    #[error("no {0} property ids left")]
    IdsExhausted(Classification),

    /// The persisted schema is structurally invalid
    #[error("malformed schema: {0}")]
    MalformedSchema(String),

    /// A script references a property the schema does not know
    #[error("property not found: '{0}'")]
    UnknownProperty(String),

    /// A data type token outside of string/integer/float/boolean
    #[error("unsupported data type: '{0}'")]
    UnsupportedDataType(String),

    /// The embedded runtime could not hand out a new state
    #[error("unable to initialize runtime: {0}")]
    RuntimeAcquisition(String),

    /// Header + script failed to compile
    #[error("syntax error: {0}")]
    Compile(String),

    /// The initial top-level run of the compiled unit raised an error
    #[error("init error: {0}")]
    InitExecution(String),

    /// The requested function is not a global of the compiled unit
    #[error("function not found: '{0}'")]
    FunctionNotFound(String),

    /// The runtime raised an error while the function was running
    #[error("invocation error: {0}")]
    Invocation(String),

    /// The binding was closed and cannot be initialized again
    #[error("script binding is closed")]
    Closed,

    /// Invalid binding configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading or writing a schema file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, Error>;
