//! Classification of injection keys and splicing of injected code into shader text.
//!
//! Keys of the form `vs:NAME` or `fs:NAME` append code to the hook function `NAME`.
//! Keys of the form `vs:#NAME` or `fs:#NAME` insert code at a location in the shader text.
//! The special name `#decl` inserts code before the hook functions,
//! and `#main-start` and `#main-end` insert code at the start and end of `main`.
//! Any other key is matched literally against the assembled text for both stages.
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::{error::AssembleShaderError, module::ShaderModule, ShaderStage};

/// Placeholder for declaration injections in the assembled source.
pub const DECLARATION_INJECT_MARKER: &str = "__INJECT_DECLARATIONS__";

static INJECTION_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(v|f)s:(#)?([\w-]+)$").unwrap());

static START_OF_MAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"void\s+main\s*\([^)]*\)\s*\{\n?").unwrap());

// Assumes main is the last function.
static END_OF_MAIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\}\n?[^{}]*$").unwrap());

/// Code to inject and its priority.
/// Injections with lower `order` are placed first.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(from = "InjectionRepr")]
pub struct Injection {
    pub code: String,
    pub order: i32,
}

impl Injection {
    pub fn new(code: impl Into<String>, order: i32) -> Self {
        Self {
            code: code.into(),
            order,
        }
    }
}

impl From<&str> for Injection {
    fn from(value: &str) -> Self {
        Self::new(value, 0)
    }
}

impl From<String> for Injection {
    fn from(value: String) -> Self {
        Self::new(value, 0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InjectionRepr {
    Code(String),
    Ordered {
        injection: String,
        #[serde(default)]
        order: i32,
    },
}

impl From<InjectionRepr> for Injection {
    fn from(value: InjectionRepr) -> Self {
        match value {
            InjectionRepr::Code(code) => Self::new(code, 0),
            InjectionRepr::Ordered { injection, order } => Self::new(injection, order),
        }
    }
}

/// A named location for a single stage like `fs:#decl` or `vs:MY_HOOK`.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct StageTarget {
    pub stage: ShaderStage,
    pub name: SmolStr,
}

impl StageTarget {
    pub fn new(stage: ShaderStage, name: impl Into<SmolStr>) -> Self {
        Self {
            stage,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for StageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.stage, self.name)
    }
}

/// The parsed form of an injection key.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum InjectionTarget {
    /// `vs:NAME` appends to the body of a declared hook function.
    Hook(StageTarget),
    /// `vs:#decl` inserts before the hook functions.
    Declaration(ShaderStage),
    /// `vs:#NAME` inserts at a location in the shader body.
    Main(StageTarget),
    /// Any other key inserts after the first occurrence of the key text in either stage.
    Pattern(String),
}

impl InjectionTarget {
    pub fn parse(key: &str) -> Result<Self, AssembleShaderError> {
        match INJECTION_KEY.captures(key) {
            Some(captures) => {
                let stage = if &captures[1] == "v" {
                    ShaderStage::Vertex
                } else {
                    ShaderStage::Fragment
                };
                let name = &captures[3];
                if captures.get(2).is_some() {
                    if name == "decl" {
                        Ok(Self::Declaration(stage))
                    } else {
                        Ok(Self::Main(StageTarget::new(stage, name)))
                    }
                } else {
                    Ok(Self::Hook(StageTarget::new(stage, name)))
                }
            }
            None => {
                // Stage prefixed keys should never silently become text patterns.
                if key.is_empty() || key.starts_with("vs:") || key.starts_with("fs:") {
                    Err(AssembleShaderError::InvalidInjectionKey {
                        key: key.to_string(),
                    })
                } else {
                    Ok(Self::Pattern(key.to_string()))
                }
            }
        }
    }
}

/// Injections grouped by target with contributions in the order they were added.
#[derive(Debug, PartialEq, Default)]
pub struct InjectionBuckets {
    pub declarations: IndexMap<ShaderStage, Vec<Injection>>,
    pub main: IndexMap<StageTarget, Vec<Injection>>,
    pub hooks: IndexMap<StageTarget, Vec<Injection>>,
    pub patterns: IndexMap<String, Vec<Injection>>,
}

impl InjectionBuckets {
    fn push(&mut self, target: InjectionTarget, injection: Injection) {
        match target {
            InjectionTarget::Hook(t) => self.hooks.entry(t).or_default().push(injection),
            InjectionTarget::Declaration(s) => {
                self.declarations.entry(s).or_default().push(injection)
            }
            InjectionTarget::Main(t) => self.main.entry(t).or_default().push(injection),
            InjectionTarget::Pattern(p) => self.patterns.entry(p).or_default().push(injection),
        }
    }
}

/// Classify the application injections in `inject` and the injections of each module.
///
/// Application injections are added first, so they precede module injections with equal order.
/// Module injections are added in the order of `modules`.
pub fn classify_injections(
    inject: &IndexMap<String, Injection>,
    modules: &[Arc<dyn ShaderModule>],
) -> Result<InjectionBuckets, AssembleShaderError> {
    let mut buckets = InjectionBuckets::default();

    for (key, injection) in inject {
        buckets.push(InjectionTarget::parse(key)?, injection.clone());
    }

    for module in modules {
        for (key, injection) in module.injections().iter() {
            let target = InjectionTarget::parse(key)?;
            if let InjectionTarget::Pattern(_) = target {
                // Modules can't know the text of every application shader.
                return Err(AssembleShaderError::InvalidInjectionKey { key: key.clone() });
            }
            buckets.push(target, injection.clone());
        }
    }

    Ok(buckets)
}

/// Sort injections by order while preserving the contribution order for ties.
pub fn sorted_injections(injections: &[Injection]) -> Vec<&Injection> {
    let mut sorted: Vec<_> = injections.iter().collect();
    sorted.sort_by_key(|i| i.order);
    sorted
}

fn injection_text(injections: &[Injection]) -> String {
    let mut text = sorted_injections(injections)
        .iter()
        .map(|i| i.code.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    text.push('\n');
    text
}

/// Replace the declaration marker in `source` with the declaration injections for `stage`.
///
/// The marker is removed if there are no declaration injections.
pub fn inject_declarations(
    source: &str,
    stage: ShaderStage,
    buckets: &InjectionBuckets,
) -> String {
    match buckets.declarations.get(&stage) {
        Some(injections) => {
            source.replacen(DECLARATION_INJECT_MARKER, &injection_text(injections), 1)
        }
        None => source.replacen(DECLARATION_INJECT_MARKER, "", 1),
    }
}

/// Apply the main injections for `stage` and all pattern injections to `source`.
///
/// Main injection targets are only searched in the shader body starting at `body_start`.
/// Pattern injections match anywhere in `source`.
/// Targets that can't be found are skipped.
/// Modules may inject into markers that only some application shaders contain.
pub fn inject_main(
    source: &str,
    body_start: usize,
    stage: ShaderStage,
    buckets: &InjectionBuckets,
) -> String {
    let mut source = source.to_string();

    for (target, injections) in buckets.main.iter().filter(|(t, _)| t.stage == stage) {
        let body = &source[body_start..];
        let index = match target.name.as_str() {
            "main-start" => START_OF_MAIN.find(body).map(|m| body_start + m.end()),
            "main-end" => END_OF_MAIN.find(body).map(|m| body_start + m.start()),
            marker => body
                .find(marker)
                .map(|i| line_end(&source, body_start + i + marker.len())),
        };
        match index {
            Some(index) => source = insert(&source, index, &injection_text(injections)),
            None => warn!("Unable to find injection target {target} in {stage} source"),
        }
    }

    for (pattern, injections) in &buckets.patterns {
        match source.find(pattern.as_str()) {
            Some(i) => {
                let end = line_end(&source, i + pattern.len());
                source = insert(&source, end, &injection_text(injections));
            }
            None => debug!("Unable to find injection pattern {pattern:?} in {stage} source"),
        }
    }

    source
}

// Keep markers in line comments from commenting out the injected code.
fn line_end(source: &str, index: usize) -> usize {
    if source[index..].starts_with('\n') {
        index + 1
    } else {
        index
    }
}

fn insert(source: &str, index: usize, text: &str) -> String {
    let mut result = String::with_capacity(source.len() + text.len());
    result.push_str(&source[..index]);
    result.push_str(text);
    result.push_str(&source[index..]);
    result
}
