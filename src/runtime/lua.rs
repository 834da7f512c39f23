//! LuaJIT runtime backed by `mlua`
//!
//! Generated headers use the `ffi` library, so states are created with the
//! full (unsafe) standard library set.

use mlua::{Function, Lua, LuaOptions, MultiValue, RegistryKey, StdLib};

use super::{CallError, Handle, Runtime, Value};

/// LuaJIT state factory
#[derive(Debug, Default, Clone, Copy)]
pub struct LuaJit;

/// A LuaJIT state holding at most one compiled unit
pub struct LuaJitHandle {
    lua: Lua,
    chunk: Option<RegistryKey>,
}

impl Runtime for LuaJit {
    type Handle = LuaJitHandle;

    fn open(&self) -> Result<LuaJitHandle, String> {
        // SAFETY: scripts need `ffi` to read event memory laid out by the host.
        let lua = unsafe { Lua::unsafe_new_with(StdLib::ALL, LuaOptions::default()) };
        Ok(LuaJitHandle { lua, chunk: None })
    }
}

impl Handle for LuaJitHandle {
    fn compile(&mut self, chunk_name: &str, source: &str) -> Result<(), String> {
        let function = self
            .lua
            .load(source)
            .set_name(chunk_name)
            .into_function()
            .map_err(|e| e.to_string())?;
        let key = self
            .lua
            .create_registry_value(function)
            .map_err(|e| e.to_string())?;
        if let Some(old) = self.chunk.replace(key) {
            self.lua.remove_registry_value(old).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn execute(&mut self) -> Result<(), String> {
        let key = self.chunk.as_ref().ok_or("no compiled unit")?;
        let function: Function = self.lua.registry_value(key).map_err(|e| e.to_string())?;
        function.call::<_, ()>(()).map_err(|e| e.to_string())
    }

    fn call(
        &mut self,
        function: &str,
        args: &[Value],
        nresults: usize,
    ) -> Result<Vec<Value>, CallError> {
        let lua = &self.lua;
        let target = match lua.globals().get::<_, mlua::Value>(function) {
            Ok(mlua::Value::Function(f)) => f,
            Ok(_) => return Err(CallError::NotFound),
            Err(e) => return Err(CallError::Raised(e.to_string())),
        };

        let mut lua_args = Vec::with_capacity(args.len());
        for arg in args {
            lua_args.push(to_lua(lua, arg).map_err(|e| CallError::Raised(e.to_string()))?);
        }

        let results = target
            .call::<_, MultiValue>(MultiValue::from_vec(lua_args))
            .map_err(|e| CallError::Raised(e.to_string()))?;

        let mut values = Vec::with_capacity(nresults);
        for value in results.into_vec().into_iter().take(nresults) {
            values.push(from_lua(value).map_err(CallError::Raised)?);
        }
        values.resize(nresults, Value::Nil);
        Ok(values)
    }

    // mlua keeps the C stack balanced around every call.
    fn stack_top(&self) -> usize {
        0
    }

    fn set_stack_top(&mut self, _top: usize) {}

    fn close(self) {
        drop(self.chunk);
        drop(self.lua);
    }
}

fn to_lua<'lua>(lua: &'lua Lua, value: &Value) -> mlua::Result<mlua::Value<'lua>> {
    Ok(match value {
        Value::Nil => mlua::Value::Nil,
        Value::Boolean(b) => mlua::Value::Boolean(*b),
        Value::Integer(n) => mlua::Value::Integer(*n as mlua::Integer),
        Value::Float(n) => mlua::Value::Number(*n),
        Value::String(s) => mlua::Value::String(lua.create_string(s)?),
    })
}

fn from_lua(value: mlua::Value<'_>) -> Result<Value, String> {
    match value {
        mlua::Value::Nil => Ok(Value::Nil),
        mlua::Value::Boolean(b) => Ok(Value::Boolean(b)),
        mlua::Value::Integer(n) => Ok(Value::Integer(n as i64)),
        mlua::Value::Number(n) => Ok(Value::Float(n)),
        mlua::Value::String(s) => Ok(Value::String(s.to_string_lossy().into_owned())),
        other => Err(format!("unsupported return type: {}", other.type_name())),
    }
}
