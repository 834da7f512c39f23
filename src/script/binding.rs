//! Script binding lifecycle
//!
//! A `ScriptBinding` ties one script to one runtime state:
//!
//! ```text
//! Uninitialized --init--> Initialized --close--> Destroyed
//!       |                                            ^
//!       +------------------- close ------------------+
//! ```
//!
//! `init` generates the event header from the script's own references,
//! compiles header and script as one unit and runs it once so the script can
//! define its functions. Any failure on the way closes the state again.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::BindingConfig;
use crate::error::{Error, Result};
use crate::runtime::{CallError, Handle, Runtime, Value};
use crate::schema::PropertySchema;
use crate::script::codegen::BindingGenerator;
use crate::script::extract::ReferenceExtractor;

/// Lifecycle state of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Uninitialized,
    Initialized,
    /// Terminal
    Destroyed,
}

/// A script bound to a property schema and an embedded runtime
///
/// Every operation takes `&mut self`; share a binding between threads only
/// behind a `Mutex`. Separate bindings are independent.
pub struct ScriptBinding<R: Runtime> {
    runtime: R,
    schema: Arc<PropertySchema>,
    config: BindingConfig,
    source: String,
    header: String,
    handle: Option<R::Handle>,
    state: BindingState,
}

impl<R: Runtime> ScriptBinding<R> {
    /// Create a binding with the default configuration
    pub fn new(runtime: R, schema: Arc<PropertySchema>, source: impl Into<String>) -> Self {
        ScriptBinding {
            runtime,
            schema,
            config: BindingConfig::default(),
            source: source.into(),
            header: String::new(),
            handle: None,
            state: BindingState::Uninitialized,
        }
    }

    /// Create a binding with a custom configuration
    pub fn with_config(
        runtime: R,
        schema: Arc<PropertySchema>,
        source: impl Into<String>,
        config: BindingConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(ScriptBinding {
            runtime,
            schema,
            config,
            source: source.into(),
            header: String::new(),
            handle: None,
            state: BindingState::Uninitialized,
        })
    }

    /// The script source as given
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Generated header; empty until `init` has generated it
    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub fn schema(&self) -> &Arc<PropertySchema> {
        &self.schema
    }

    /// Acquire a runtime state, generate the header, compile and run the script once
    ///
    /// Does nothing if already initialized.
    pub fn init(&mut self) -> Result<()> {
        match self.state {
            BindingState::Initialized => return Ok(()),
            BindingState::Destroyed => return Err(Error::Closed),
            BindingState::Uninitialized => {}
        }

        let mut handle = self
            .runtime
            .open()
            .map_err(Error::RuntimeAcquisition)?;

        if let Err(e) = self.prepare(&mut handle) {
            warn!(target: "skyscript", error = %e, "script init failed, closing runtime state");
            handle.close();
            return Err(e);
        }

        self.handle = Some(handle);
        self.state = BindingState::Initialized;
        info!(target: "skyscript", header_bytes = self.header.len(), "script binding initialized");
        Ok(())
    }

    /// Steps 2-4 of init, run against a freshly opened handle
    fn prepare(&mut self, handle: &mut R::Handle) -> Result<()> {
        let extractor = ReferenceExtractor::new(&self.config)?;
        let generator = BindingGenerator::new(&self.config)?;

        let properties = extractor.extract(&self.schema, &self.source)?;
        self.header = generator.generate(&properties).render();

        let mut unit = String::with_capacity(self.header.len() + self.source.len());
        unit.push_str(&self.header);
        unit.push_str(&self.source);

        let top = handle.stack_top();
        let result = handle
            .compile(&self.config.chunk_name, &unit)
            .map_err(Error::Compile)
            .and_then(|()| handle.execute().map_err(Error::InitExecution));
        handle.set_stack_top(top);
        result
    }

    /// Call a global function of the script
    ///
    /// Initializes the binding first if needed. Returns exactly `nresults`
    /// values. A failed call leaves the binding usable.
    pub fn invoke(&mut self, function: &str, args: &[Value], nresults: usize) -> Result<Vec<Value>> {
        self.init()?;
        let handle = self.handle.as_mut().ok_or(Error::Closed)?;

        let top = handle.stack_top();
        let result = handle.call(function, args, nresults);
        if handle.stack_top() != top {
            debug!(
                target: "skyscript",
                function,
                expected = top,
                actual = handle.stack_top(),
                "rebalancing runtime stack"
            );
            handle.set_stack_top(top);
        }

        match result {
            Ok(mut values) => {
                values.resize(nresults, Value::Nil);
                Ok(values)
            }
            Err(CallError::NotFound) => Err(Error::FunctionNotFound(function.to_string())),
            Err(CallError::Raised(message)) => Err(Error::Invocation(message)),
        }
    }

    /// Release the runtime state
    ///
    /// Safe to call any number of times, including before `init`.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
            info!(target: "skyscript", "script binding closed");
        }
        self.state = BindingState::Destroyed;
    }
}

impl<R: Runtime> Drop for ScriptBinding<R> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Classification, DataType};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// What the fake runtime has seen
    #[derive(Debug, Default)]
    struct Journal {
        opened: usize,
        closed: usize,
        compiled: Vec<String>,
        executed: usize,
    }

    /// Runtime double: "compiles" anything without `SYNTAX_ERROR`, "runs"
    /// anything without `INIT_ERROR`, defines a global for every
    /// `function name(` it finds.
    #[derive(Clone, Default)]
    struct FakeRuntime {
        journal: Rc<RefCell<Journal>>,
        unavailable: bool,
    }

    struct FakeHandle {
        journal: Rc<RefCell<Journal>>,
        unit: Option<String>,
        globals: Vec<String>,
        stack: Vec<Value>,
    }

    impl Runtime for FakeRuntime {
        type Handle = FakeHandle;

        fn open(&self) -> std::result::Result<FakeHandle, String> {
            if self.unavailable {
                return Err("out of memory".to_string());
            }
            self.journal.borrow_mut().opened += 1;
            Ok(FakeHandle {
                journal: self.journal.clone(),
                unit: None,
                globals: Vec::new(),
                stack: Vec::new(),
            })
        }
    }

    impl Handle for FakeHandle {
        fn compile(&mut self, _chunk_name: &str, source: &str) -> std::result::Result<(), String> {
            self.journal.borrow_mut().compiled.push(source.to_string());
            if source.contains("SYNTAX_ERROR") {
                self.stack.push(Value::from("syntax error near SYNTAX_ERROR"));
                return Err("[string \"=script\"]:1: syntax error near SYNTAX_ERROR".to_string());
            }
            self.unit = Some(source.to_string());
            Ok(())
        }

        fn execute(&mut self) -> std::result::Result<(), String> {
            let unit = self.unit.clone().ok_or("nothing compiled")?;
            self.journal.borrow_mut().executed += 1;
            if unit.contains("INIT_ERROR") {
                return Err("attempt to call a nil value".to_string());
            }
            for rest in unit.split("function ").skip(1) {
                if let Some(name) = rest.split('(').next() {
                    self.globals.push(name.trim().to_string());
                }
            }
            Ok(())
        }

        fn call(
            &mut self,
            function: &str,
            args: &[Value],
            nresults: usize,
        ) -> std::result::Result<Vec<Value>, CallError> {
            if !self.globals.iter().any(|g| g == function) {
                return Err(CallError::NotFound);
            }
            if function == "boom" {
                self.stack.push(Value::from("boom"));
                self.stack.push(Value::Nil);
                return Err(CallError::Raised("script:3: boom".to_string()));
            }
            let mut results = args.to_vec();
            results.resize(nresults, Value::Nil);
            Ok(results)
        }

        fn stack_top(&self) -> usize {
            self.stack.len()
        }

        fn set_stack_top(&mut self, top: usize) {
            self.stack.truncate(top);
        }

        fn close(self) {
            self.journal.borrow_mut().closed += 1;
        }
    }

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn schema() -> Arc<PropertySchema> {
        let mut schema = PropertySchema::new();
        schema
            .create_property("name", Classification::Object, DataType::String)
            .unwrap();
        schema
            .create_property("salary", Classification::Object, DataType::Float)
            .unwrap();
        schema
            .create_property("purchaseAmount", Classification::Action, DataType::Integer)
            .unwrap();
        schema
            .create_property("isMember", Classification::Action, DataType::Boolean)
            .unwrap();
        Arc::new(schema)
    }

    const SCRIPT: &str = "function total(event) return event.purchaseAmount + event.salary end\n";

    #[test]
    fn test_init_generates_and_compiles_once() {
        init_logging();
        let runtime = FakeRuntime::default();
        let journal = runtime.journal.clone();
        let mut binding = ScriptBinding::new(runtime, schema(), SCRIPT);
        assert_eq!(binding.state(), BindingState::Uninitialized);
        assert!(binding.header().is_empty());

        binding.init().unwrap();
        binding.init().unwrap();
        assert_eq!(binding.state(), BindingState::Initialized);

        let journal = journal.borrow();
        assert_eq!(journal.opened, 1);
        assert_eq!(journal.executed, 1);
        assert_eq!(journal.compiled.len(), 1);

        let unit = &journal.compiled[0];
        assert!(unit.starts_with(binding.header()));
        assert!(unit.ends_with(SCRIPT));
        assert!(binding.header().contains("int32_t _purchaseAmount;"));
        assert!(binding.header().contains("double _salary;"));
        assert!(!binding.header().contains("_isMember"));
        assert!(binding.header().contains(
            "descriptor:set_property(-1, ffi.offsetof('sky_lua_event_t', '_purchaseAmount'), 'integer')"
        ));
    }

    #[test]
    fn test_invoke_auto_initializes() {
        let runtime = FakeRuntime::default();
        let journal = runtime.journal.clone();
        let mut binding = ScriptBinding::new(runtime, schema(), SCRIPT);

        let results = binding
            .invoke("total", &[Value::Integer(7), Value::from("x")], 3)
            .unwrap();
        assert_eq!(results, vec![Value::Integer(7), Value::from("x"), Value::Nil]);
        assert_eq!(binding.invoke("total", &[], 0).unwrap(), Vec::<Value>::new());
        assert_eq!(journal.borrow().executed, 1);
    }

    #[test]
    fn test_function_not_found() {
        let mut binding = ScriptBinding::new(FakeRuntime::default(), schema(), SCRIPT);
        let err = binding.invoke("average", &[], 1).unwrap_err();
        assert!(matches!(err, Error::FunctionNotFound(name) if name == "average"));
        assert_eq!(binding.state(), BindingState::Initialized);
    }

    #[test]
    fn test_invocation_error_keeps_stack_balanced() {
        let source = format!("{}function boom() error('boom') end\n", SCRIPT);
        let mut binding = ScriptBinding::new(FakeRuntime::default(), schema(), source);

        let err = binding.invoke("boom", &[], 1).unwrap_err();
        assert!(matches!(err, Error::Invocation(msg) if msg.contains("boom")));
        assert_eq!(binding.handle.as_ref().unwrap().stack_top(), 0);

        // Still usable
        let results = binding.invoke("total", &[Value::Float(1.5)], 1).unwrap();
        assert_eq!(results, vec![Value::Float(1.5)]);
    }

    #[test]
    fn test_unknown_property_closes_state() {
        let runtime = FakeRuntime::default();
        let journal = runtime.journal.clone();
        let mut binding = ScriptBinding::new(runtime, schema(), "return event.fooBar");

        let err = binding.init().unwrap_err();
        assert!(matches!(err, Error::UnknownProperty(name) if name == "fooBar"));
        assert_eq!(binding.state(), BindingState::Uninitialized);
        let journal = journal.borrow();
        assert_eq!(journal.opened, 1);
        assert_eq!(journal.closed, 1);
        assert!(journal.compiled.is_empty());
    }

    #[test]
    fn test_compile_error_closes_state() {
        let runtime = FakeRuntime::default();
        let journal = runtime.journal.clone();
        let mut binding = ScriptBinding::new(runtime, schema(), "SYNTAX_ERROR event.salary");

        let err = binding.init().unwrap_err();
        assert!(matches!(err, Error::Compile(msg) if msg.contains("SYNTAX_ERROR")));
        assert_eq!(journal.borrow().closed, 1);
        assert_eq!(journal.borrow().executed, 0);
        // Header is kept for diagnostics
        assert!(binding.header().contains("double _salary;"));
    }

    #[test]
    fn test_init_execution_error_closes_state() {
        let runtime = FakeRuntime::default();
        let journal = runtime.journal.clone();
        let mut binding = ScriptBinding::new(runtime, schema(), "INIT_ERROR()");

        let err = binding.init().unwrap_err();
        assert!(matches!(err, Error::InitExecution(msg) if msg.contains("nil value")));
        assert_eq!(journal.borrow().closed, 1);

        // A later attempt starts over with a fresh state
        let err = binding.invoke("f", &[], 0).unwrap_err();
        assert!(matches!(err, Error::InitExecution(_)));
        assert_eq!(journal.borrow().opened, 2);
        assert_eq!(journal.borrow().closed, 2);
    }

    #[test]
    fn test_runtime_unavailable() {
        let runtime = FakeRuntime {
            unavailable: true,
            ..FakeRuntime::default()
        };
        let mut binding = ScriptBinding::new(runtime, schema(), SCRIPT);
        let err = binding.init().unwrap_err();
        assert!(matches!(err, Error::RuntimeAcquisition(msg) if msg == "out of memory"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let runtime = FakeRuntime::default();
        let journal = runtime.journal.clone();

        let mut never_initialized = ScriptBinding::new(runtime.clone(), schema(), SCRIPT);
        never_initialized.close();
        never_initialized.close();
        assert_eq!(never_initialized.state(), BindingState::Destroyed);

        let mut binding = ScriptBinding::new(runtime, schema(), SCRIPT);
        binding.init().unwrap();
        binding.close();
        binding.close();
        assert_eq!(journal.borrow().closed, 1);

        assert!(matches!(binding.init(), Err(Error::Closed)));
        assert!(matches!(binding.invoke("total", &[], 0), Err(Error::Closed)));
    }

    #[test]
    fn test_drop_releases_state() {
        let runtime = FakeRuntime::default();
        let journal = runtime.journal.clone();
        {
            let mut binding = ScriptBinding::new(runtime, schema(), SCRIPT);
            binding.init().unwrap();
        }
        assert_eq!(journal.borrow().closed, 1);
    }

    #[test]
    fn test_custom_config() {
        let config = BindingConfig {
            receiver: "ev".to_string(),
            struct_name: "ev_t".to_string(),
            ..BindingConfig::default()
        };
        let runtime = FakeRuntime::default();
        let mut binding =
            ScriptBinding::with_config(runtime, schema(), "return ev:name()", config).unwrap();
        binding.init().unwrap();
        assert!(binding.header().contains("sky_string_t _name;\n} ev_t;"));

        let bad = BindingConfig {
            receiver: String::new(),
            ..BindingConfig::default()
        };
        assert!(matches!(
            ScriptBinding::with_config(FakeRuntime::default(), schema(), SCRIPT, bad),
            Err(Error::Config(_))
        ));
    }
}
