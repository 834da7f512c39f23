//! Embedded runtime capability
//!
//! The script binding drives an interpreter it does not implement. This
//! module describes what it needs from one: open a state, compile a unit,
//! run it once, call global functions by name, close the state.
//!
//! Interpreters are single threaded. A handle is owned by exactly one
//! binding and every call on it goes through `&mut self`.

#[cfg(feature = "luajit")]
pub mod lua;

use std::fmt;

/// Host-side value passed to and returned from script functions
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Numeric view of integers and floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Why a call into the runtime failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// No global function with that name
    NotFound,
    /// The function raised an error; carries the runtime's message
    Raised(String),
}

/// Factory for runtime states
pub trait Runtime {
    type Handle: Handle;

    /// Acquire a fresh state with the standard libraries loaded
    fn open(&self) -> Result<Self::Handle, String>;
}

/// One live interpreter state
pub trait Handle {
    /// Compile `source` as a single unit, replacing any previous unit
    fn compile(&mut self, chunk_name: &str, source: &str) -> Result<(), String>;

    /// Run the compiled unit once with no arguments and no results
    fn execute(&mut self) -> Result<(), String>;

    /// Call a global function, returning exactly `nresults` values
    ///
    /// Missing results are padded with `Nil`, extra results dropped.
    fn call(&mut self, function: &str, args: &[Value], nresults: usize)
        -> Result<Vec<Value>, CallError>;

    /// Current depth of the evaluation stack
    fn stack_top(&self) -> usize;

    /// Discard values above `top`
    fn set_stack_top(&mut self, top: usize);

    /// Release the state
    fn close(self);
}
