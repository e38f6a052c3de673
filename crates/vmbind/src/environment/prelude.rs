//! Utility namespace shared by templates and binding expressions

use super::Environment;
use crate::template::escape::{escape_html, to_output_string};
use crate::value::{BuiltinFn, Value};

/// Names starting with this prefix are reserved for the runtime and are
/// never looked up in data.
pub const UTILITY_PREFIX: &str = "__";

/// The utility names visible to user code.
pub fn utility_names() -> &'static [&'static str] {
    &["__escape", "__string", "__each", "__include"]
}

impl Environment {
    /// Create an environment with the pure utilities loaded.
    pub fn with_prelude() -> Self {
        let mut env = Self::new();
        env.load_prelude();
        env
    }

    /// Load `__escape`, `__string` and `__each`.
    ///
    /// `__include` needs a template engine and is bound by the renderer.
    pub fn load_prelude(&mut self) {
        for builtin in utilities() {
            self.define_builtin(builtin);
        }
    }
}

/// The engine-independent utilities.
pub(crate) fn utilities() -> Vec<BuiltinFn> {
    vec![
        BuiltinFn::new("__escape", 1, builtin_escape),
        BuiltinFn::new("__string", 1, builtin_string),
        BuiltinFn::new("__each", 2, builtin_each),
    ]
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Function Implementations
// ═══════════════════════════════════════════════════════════════════════

fn builtin_escape(args: &[Value]) -> Result<Value, String> {
    let text = to_output_string(first(args))?;
    Ok(Value::string(escape_html(&text)))
}

fn builtin_string(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(to_output_string(first(args))?))
}

/// `__each(collection, |value, key| ...)`: lists pass the index, objects
/// pass the key.
fn builtin_each(args: &[Value]) -> Result<Value, String> {
    let callback = args.get(1).cloned().unwrap_or(Value::Undefined);
    if !callback.is_callable() {
        return Err(format!(
            "expected a function, found {}",
            crate::error::type_name(&callback)
        ));
    }
    match first(args) {
        Value::List(list) => {
            for (index, item) in list.to_vec().into_iter().enumerate() {
                callback
                    .call(&[item, Value::from(index)])
                    .map_err(|e| e.to_string())?;
            }
        }
        Value::Object(object) => {
            for (key, value) in object.entries() {
                callback
                    .call(&[value, Value::from(key)])
                    .map_err(|e| e.to_string())?;
            }
        }
        _ => {}
    }
    Ok(Value::Undefined)
}

fn first(args: &[Value]) -> &Value {
    args.first().unwrap_or(&Value::Undefined)
}
