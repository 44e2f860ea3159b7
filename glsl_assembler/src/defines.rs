//! Merging of module and application defines into `#define` directives.
use std::fmt::Write;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::module::ShaderModule;

/// Macro names and values in insertion order.
pub type Defines = IndexMap<SmolStr, DefineValue>;

/// The value for a single `#define NAME VALUE` directive.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefineValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl DefineValue {
    /// Returns `true` if the directive for this value should be written at all.
    ///
    /// Integer zero, `false`, empty text, and non finite floats suppress the macro.
    /// Finite floats including `0.0` are always written.
    pub fn is_emitted(&self) -> bool {
        match self {
            DefineValue::Bool(b) => *b,
            DefineValue::Int(i) => *i != 0,
            DefineValue::Float(f) => f.is_finite(),
            DefineValue::Text(t) => !t.is_empty(),
        }
    }
}

impl std::fmt::Display for DefineValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefineValue::Bool(b) => write!(f, "{b}"),
            DefineValue::Int(i) => write!(f, "{i}"),
            // Debug keeps the decimal point for values like 1.0.
            DefineValue::Float(v) => write!(f, "{v:?}"),
            DefineValue::Text(t) => write!(f, "{t}"),
        }
    }
}

impl From<bool> for DefineValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DefineValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for DefineValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for DefineValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DefineValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DefineValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Combine the defines of all `modules` in resolution order with the application `defines`.
///
/// Later modules override earlier ones and application defines override all modules.
/// Overridden names keep the position of their first definition.
pub fn merge_defines(modules: &[Arc<dyn ShaderModule>], defines: &Defines) -> Defines {
    let mut merged = Defines::new();
    for module in modules {
        merged.extend(module.defines().iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged.extend(defines.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Generate the `#define` directives for `defines` under a single comment header.
pub fn application_defines_glsl(defines: &Defines) -> String {
    if defines.is_empty() {
        return "\n".to_string();
    }

    let mut glsl = "\n// APPLICATION DEFINES\n".to_string();
    for (name, value) in defines {
        if value.is_emitted() {
            writeln!(&mut glsl, "#define {} {value}", name.to_uppercase()).unwrap();
        }
    }
    glsl
}
