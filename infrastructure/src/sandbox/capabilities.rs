//! Globals visible to analysis code.
//!
//! The VM starts with `table`, `string`, `math`, `utf8` and the base library.
//! Everything that reaches outside the VM or can swallow the deadline error
//! is removed; three capabilities are added:
//!
//! - `data`: deep copy of the input rows
//! - `set_result(value)`: publish the single result (first call wins)
//! - `log(...)` / `print(...)`: bounded log capture

use analyst_domain::LogBuffer;
use mlua::prelude::*;
use mlua::SerializeOptions;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};

/// Base-library globals the code must not see.
pub const REMOVED_GLOBALS: &[&str] = &[
    "io",
    "os",
    "package",
    "require",
    "debug",
    "coroutine",
    "load",
    "loadfile",
    "dofile",
    "collectgarbage",
    "pcall",
    "xpcall",
];

const MAX_RESULT_DEPTH: usize = 128;

/// What the code left behind.
#[derive(Debug)]
pub struct Captures {
    pub logs: LogBuffer,
    /// First published value, or why it could not be converted
    pub published: Option<Result<Value, String>>,
}

impl Captures {
    pub fn new(logs: LogBuffer) -> Self {
        Self {
            logs,
            published: None,
        }
    }
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> LuaError {
    LuaError::external(format!("capture lock poisoned: {}", e))
}

/// Strip the globals and install the capabilities.
pub fn install(
    lua: &Lua,
    data: &Value,
    captures: Arc<Mutex<Captures>>,
    deadline: Instant,
) -> LuaResult<()> {
    let globals = lua.globals();
    for name in REMOVED_GLOBALS {
        globals.set(*name, LuaValue::Nil)?;
    }

    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    globals.set("data", lua.to_value_with(data, options)?)?;

    let state = Arc::clone(&captures);
    let set_result = lua.create_function(move |_, value: LuaValue| {
        if Instant::now() >= deadline {
            warn!("set_result called after the deadline; ignored");
            return Ok(());
        }
        let mut captures = state.lock().map_err(lock_error)?;
        if captures.published.is_some() {
            warn!("set_result called more than once; later value discarded");
            return Ok(());
        }
        captures.published = Some(to_json(&value));
        Ok(())
    })?;
    globals.set("set_result", set_result)?;

    let state = Arc::clone(&captures);
    let log = lua.create_function(move |_, args: LuaMultiValue| {
        let line = args
            .iter()
            .map(render)
            .collect::<Vec<_>>()
            .join("\t");
        debug!(target: "sandbox", "{}", line);
        state.lock().map_err(lock_error)?.logs.push(line);
        Ok(())
    })?;
    globals.set("log", log.clone())?;
    globals.set("print", log)?;

    Ok(())
}

/// Text form of a logged value. Tables are shown as JSON when they have one.
fn render(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => s.to_string_lossy().to_string(),
        LuaValue::Table(_) => to_json(value)
            .map(|json| json.to_string())
            .unwrap_or_else(|_| "table".to_string()),
        other => other.type_name().to_string(),
    }
}

/// Convert a published value to JSON, explaining why when it has no pure-data form.
///
/// A table whose keys are exactly `1..=n` becomes an array; an empty table
/// becomes `[]`. Any other table becomes an object, with integer keys written
/// as decimal strings. Nothing is dropped: a table that cannot be written
/// out in full is rejected.
pub fn to_json(value: &LuaValue) -> Result<Value, String> {
    convert(value, &mut HashSet::new(), 0)
}

enum Key {
    Index(i64),
    Name(String),
}

fn convert(value: &LuaValue, path: &mut HashSet<usize>, depth: usize) -> Result<Value, String> {
    if depth > MAX_RESULT_DEPTH {
        return Err(format!("value is nested deeper than {} levels", MAX_RESULT_DEPTH));
    }
    match value {
        LuaValue::Nil => Ok(Value::Null),
        LuaValue::Boolean(b) => Ok(Value::Bool(*b)),
        LuaValue::Integer(i) => Ok(Value::from(*i)),
        LuaValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .ok_or_else(|| format!("number {} has no JSON form", n)),
        LuaValue::String(s) => s
            .to_str()
            .map(|s| Value::String(String::from(&*s)))
            .map_err(|_| "string is not valid UTF-8".to_string()),
        LuaValue::LightUserData(ptr) if ptr.0.is_null() => Ok(Value::Null),
        LuaValue::Table(table) => {
            let id = table.to_pointer() as usize;
            if !path.insert(id) {
                return Err("cyclic table reference".to_string());
            }
            let converted = convert_table(table, path, depth);
            path.remove(&id);
            converted
        }
        other => Err(format!("{} values cannot be published", other.type_name())),
    }
}

fn convert_table(
    table: &LuaTable,
    path: &mut HashSet<usize>,
    depth: usize,
) -> Result<Value, String> {
    let mut entries = Vec::new();
    let mut failure = None;
    table
        .for_each(|key: LuaValue, item: LuaValue| {
            if failure.is_some() {
                return Ok(());
            }
            let key = match key {
                LuaValue::Integer(i) => Key::Index(i),
                LuaValue::String(s) => match s.to_str() {
                    Ok(name) => Key::Name(String::from(&*name)),
                    Err(_) => {
                        failure = Some("table key is not valid UTF-8".to_string());
                        return Ok(());
                    }
                },
                other => {
                    failure = Some(format!("{} keys have no JSON form", other.type_name()));
                    return Ok(());
                }
            };
            match convert(&item, path, depth + 1) {
                Ok(item) => entries.push((key, item)),
                Err(reason) => failure = Some(reason),
            }
            Ok(())
        })
        .map_err(|e| e.to_string())?;
    if let Some(reason) = failure {
        return Err(reason);
    }

    if is_sequence(&entries) {
        let mut items: Vec<(i64, Value)> = entries
            .into_iter()
            .filter_map(|(key, item)| match key {
                Key::Index(i) => Some((i, item)),
                Key::Name(_) => None,
            })
            .collect();
        items.sort_by_key(|(i, _)| *i);
        return Ok(Value::Array(items.into_iter().map(|(_, item)| item).collect()));
    }

    let mut object = serde_json::Map::with_capacity(entries.len());
    for (key, item) in entries {
        let name = match key {
            Key::Index(i) => i.to_string(),
            Key::Name(name) => name,
        };
        if object.contains_key(&name) {
            return Err(format!("key \"{}\" appears both as a number and as a string", name));
        }
        object.insert(name, item);
    }
    Ok(Value::Object(object))
}

/// Keys are exactly `1..=n`. Lua never stores a nil value, so a count of
/// distinct integer keys all inside that range means none is missing.
fn is_sequence(entries: &[(Key, Value)]) -> bool {
    let n = entries.len() as i64;
    entries
        .iter()
        .all(|(key, _)| matches!(key, Key::Index(i) if (1..=n).contains(i)))
}
