//! Hook functions are declared by the application and filled in by injections.
//!
//! A hook is declared with a stage and a GLSL signature like `"fs:FILTER_COLOR(inout vec4 color)"`.
//! Injections with the key `fs:FILTER_COLOR` are appended to the body in order.
//! Declared hooks are always generated, so application code can call them
//! even if no module injects anything.
use std::fmt::Write;

use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::{
    error::AssembleShaderError,
    inject::{sorted_injections, Injection, StageTarget},
    ShaderStage,
};

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(untagged)]
pub enum HookFunction {
    /// A stage prefixed signature like `"vs:PROJECT(inout vec4 position)"`.
    Signature(String),
    /// A stage prefixed signature with code placed before and after any injections.
    Templated {
        hook: String,
        #[serde(default)]
        header: String,
        #[serde(default)]
        footer: String,
    },
    /// Signatures without a stage prefix for the vertex and fragment stage.
    Stages { vs: String, fs: String },
}

impl From<&str> for HookFunction {
    fn from(value: &str) -> Self {
        Self::Signature(value.to_string())
    }
}

/// A normalized hook function declaration for a single stage.
#[derive(Debug, PartialEq, Clone)]
pub struct HookFunctionSpec {
    pub stage: ShaderStage,
    /// The function name without the parameter list.
    pub name: SmolStr,
    /// The function name and parameter list like `FILTER_COLOR(inout vec4 color)`.
    pub signature: String,
    pub header: String,
    pub footer: String,
}

impl HookFunctionSpec {
    fn new(stage: ShaderStage, signature: &str, header: &str, footer: &str) -> Self {
        let signature = signature.trim();
        let name = signature
            .split_once('(')
            .map(|(name, _)| name)
            .unwrap_or(signature)
            .trim();
        Self {
            stage,
            name: name.into(),
            signature: signature.to_string(),
            header: header.to_string(),
            footer: footer.to_string(),
        }
    }

    fn parse(hook: &str, header: &str, footer: &str) -> Result<Self, AssembleShaderError> {
        let (stage, signature) = hook
            .trim()
            .split_once(':')
            .and_then(|(stage, signature)| Some((stage.parse::<ShaderStage>().ok()?, signature)))
            .filter(|(_, signature)| !signature.trim().is_empty())
            .ok_or_else(|| AssembleShaderError::InvalidHookFunction {
                hook: hook.to_string(),
            })?;
        Ok(Self::new(stage, signature, header, footer))
    }

    pub fn target(&self) -> StageTarget {
        StageTarget::new(self.stage, self.name.clone())
    }
}

/// Normalize hook declarations to one [HookFunctionSpec] per stage and name.
///
/// Redeclaring a hook replaces the earlier declaration but keeps its position.
pub fn normalize_hook_functions(
    hooks: &[HookFunction],
) -> Result<IndexMap<StageTarget, HookFunctionSpec>, AssembleShaderError> {
    let mut specs = IndexMap::new();
    for hook in hooks {
        match hook {
            HookFunction::Signature(hook) => {
                let spec = HookFunctionSpec::parse(hook, "", "")?;
                specs.insert(spec.target(), spec);
            }
            HookFunction::Templated {
                hook,
                header,
                footer,
            } => {
                let spec = HookFunctionSpec::parse(hook, header, footer)?;
                specs.insert(spec.target(), spec);
            }
            HookFunction::Stages { vs, fs } => {
                for (stage, signature) in [(ShaderStage::Vertex, vs), (ShaderStage::Fragment, fs)] {
                    let spec = HookFunctionSpec::new(stage, signature, "", "");
                    if spec.name.is_empty() {
                        return Err(AssembleShaderError::InvalidHookFunction {
                            hook: signature.clone(),
                        });
                    }
                    specs.insert(spec.target(), spec);
                }
            }
        }
    }
    Ok(specs)
}

/// Generate the function definitions for all hooks for `stage`.
pub fn hook_functions_glsl(
    hooks: &IndexMap<StageTarget, HookFunctionSpec>,
    stage: ShaderStage,
    injections: &IndexMap<StageTarget, Vec<Injection>>,
) -> String {
    let mut glsl = String::new();
    for (target, hook) in hooks.iter().filter(|(t, _)| t.stage == stage) {
        write_hook_function(&mut glsl, hook, injections.get(target).map(|i| i.as_slice()));
    }
    glsl
}

fn write_hook_function(glsl: &mut String, hook: &HookFunctionSpec, injections: Option<&[Injection]>) {
    writeln!(glsl, "void {} {{", hook.signature).unwrap();
    if !hook.header.is_empty() {
        write_indented(glsl, &hook.header);
    }
    for injection in sorted_injections(injections.unwrap_or_default()) {
        write_indented(glsl, &injection.code);
    }
    if !hook.footer.is_empty() {
        write_indented(glsl, &hook.footer);
    }
    writeln!(glsl, "}}").unwrap();
}

fn write_indented(glsl: &mut String, code: &str) {
    for line in code.lines() {
        if line.trim().is_empty() {
            glsl.push('\n');
        } else {
            writeln!(glsl, "  {line}").unwrap();
        }
    }
}
