//! Shader modules and the data they contribute to assembled shaders.
//!
//! Applications typically describe modules with [ModuleDescriptor].
//! Modules that need custom logic like computing uniforms from the uniforms of their dependencies
//! can implement [ShaderModule] directly.
use std::borrow::Cow;

use glam::{Mat4, Vec2, Vec3, Vec4};
use indexmap::IndexMap;
use log::{error, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{defines::Defines, inject::Injection, ShaderStage};

/// Uniform names and values in insertion order.
pub type Uniforms = IndexMap<SmolStr, UniformValue>;

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

/// A reusable, named bundle of shader source, defines, injections, and uniform logic.
///
/// Modules are read only during assembly and may be shared between threads.
pub trait ShaderModule: std::fmt::Debug + Send + Sync {
    /// The unique name used for dependency lookup and deduplication.
    fn name(&self) -> &str;

    /// The names of modules that must be placed before this module.
    fn dependencies(&self) -> &[SmolStr] {
        &[]
    }

    /// The module source for `stage` when assembling for `glsl_version` like `100` or `300`.
    fn source(&self, stage: ShaderStage, glsl_version: u32) -> Cow<'_, str>;

    fn defines(&self) -> Cow<'_, Defines> {
        Cow::Owned(Defines::new())
    }

    /// Code injections keyed by stage prefixed keys like `"vs:#decl"` or `"fs:MY_HOOK"`.
    fn injections(&self) -> Cow<'_, IndexMap<String, Injection>> {
        Cow::Owned(IndexMap::new())
    }

    /// Compute this module's uniforms from the application `props`.
    ///
    /// `previous` contains the uniforms of all modules earlier in resolution order,
    /// which always includes this module's dependencies.
    fn uniforms(&self, props: &Uniforms, previous: &Uniforms) -> Uniforms {
        let _ = (props, previous);
        Uniforms::new()
    }

    /// Report any uses of deprecated or removed symbols in the application `source` to `log`.
    fn check_deprecations(&self, source: &str, log: &dyn DeprecationLog) {
        let _ = (source, log);
    }
}

/// A receiver for deprecated module symbols found in application sources.
pub trait DeprecationLog: Send + Sync {
    /// `old` is still supported but should be replaced with `new`.
    fn deprecated(&self, module: &str, old: &str, new: &str);

    /// `old` is no longer supported and must be replaced with `new`.
    fn removed(&self, module: &str, old: &str, new: &str);
}

/// A [DeprecationLog] that reports using the [log] crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDeprecations;

impl DeprecationLog for LogDeprecations {
    fn deprecated(&self, module: &str, old: &str, new: &str) {
        warn!("Module {module:?}: {old} is deprecated. Use {new} instead.");
    }

    fn removed(&self, module: &str, old: &str, new: &str) {
        error!("Module {module:?}: {old} has been removed. Use {new} instead.");
    }
}

/// A symbol that applications should no longer use.
#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct Deprecation {
    /// `"function"` to match calls like `old(` or a declaration qualifier like `"uniform"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub old: String,
    pub new: String,
    /// `true` if still supported and `false` if removed.
    #[serde(default)]
    pub deprecated: bool,
}

impl Deprecation {
    /// Returns `true` if `source` uses the old symbol.
    pub fn is_used(&self, source: &str) -> bool {
        if self.kind == "function" {
            Regex::new(&format!(r"\b{}\(", regex::escape(&self.old)))
                .is_ok_and(|r| r.is_match(source))
        } else {
            source.contains(&format!("{} {};", self.kind, self.old))
        }
    }
}

/// A data driven [ShaderModule] that can also be loaded from JSON.
#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleDescriptor {
    pub name: SmolStr,
    pub dependencies: Vec<SmolStr>,
    /// Vertex shader source.
    pub vs: String,
    /// Fragment shader source.
    pub fs: String,
    pub defines: Defines,
    pub inject: IndexMap<String, Injection>,
    /// Declared uniforms and their default values.
    pub uniforms: Uniforms,
    pub deprecations: Vec<Deprecation>,
}

impl ShaderModule for ModuleDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[SmolStr] {
        &self.dependencies
    }

    fn source(&self, stage: ShaderStage, _glsl_version: u32) -> Cow<'_, str> {
        match stage {
            ShaderStage::Vertex => Cow::Borrowed(&self.vs),
            ShaderStage::Fragment => Cow::Borrowed(&self.fs),
        }
    }

    fn defines(&self) -> Cow<'_, Defines> {
        Cow::Borrowed(&self.defines)
    }

    fn injections(&self) -> Cow<'_, IndexMap<String, Injection>> {
        Cow::Borrowed(&self.inject)
    }

    fn uniforms(&self, props: &Uniforms, _previous: &Uniforms) -> Uniforms {
        self.uniforms
            .iter()
            .map(|(name, default)| {
                let value = props.get(name).copied().unwrap_or(*default);
                (name.clone(), value)
            })
            .collect()
    }

    fn check_deprecations(&self, source: &str, log: &dyn DeprecationLog) {
        for deprecation in &self.deprecations {
            if deprecation.is_used(source) {
                if deprecation.deprecated {
                    log.deprecated(&self.name, &deprecation.old, &deprecation.new);
                } else {
                    log.removed(&self.name, &deprecation.old, &deprecation.new);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordDeprecations(Mutex<Vec<String>>);

    impl DeprecationLog for RecordDeprecations {
        fn deprecated(&self, module: &str, old: &str, new: &str) {
            self.0
                .lock()
                .unwrap()
                .push(format!("deprecated {module} {old} {new}"));
        }

        fn removed(&self, module: &str, old: &str, new: &str) {
            self.0
                .lock()
                .unwrap()
                .push(format!("removed {module} {old} {new}"));
        }
    }

    fn lighting() -> ModuleDescriptor {
        ModuleDescriptor {
            name: "lighting".into(),
            deprecations: vec![
                Deprecation {
                    kind: "function".to_string(),
                    old: "lighting_getColor".to_string(),
                    new: "lighting_getLightColor".to_string(),
                    deprecated: true,
                },
                Deprecation {
                    kind: "uniform".to_string(),
                    old: "lighting_ambient".to_string(),
                    new: "lighting_ambientColor".to_string(),
                    deprecated: false,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn check_deprecations_function_and_declaration() {
        let log = RecordDeprecations::default();
        lighting().check_deprecations(
            "uniform vec3 lighting_ambient;\nvoid main() { vec3 c = lighting_getColor(n); }",
            &log,
        );
        assert_eq!(
            vec!["deprecated lighting lighting_getColor lighting_getLightColor"],
            log.0.into_inner().unwrap()
        );
    }

    #[test]
    fn check_deprecations_removed_declaration() {
        let log = RecordDeprecations::default();
        lighting().check_deprecations("uniform lighting_ambient;", &log);
        assert_eq!(
            vec!["removed lighting lighting_ambient lighting_ambientColor"],
            log.0.into_inner().unwrap()
        );
    }

    #[test]
    fn check_deprecations_requires_word_boundary() {
        let log = RecordDeprecations::default();
        lighting().check_deprecations("my_lighting_getColor(n);", &log);
        assert!(log.0.into_inner().unwrap().is_empty());
    }

    #[test]
    fn descriptor_uniforms_props_override_defaults() {
        let module = ModuleDescriptor {
            name: "fog".into(),
            uniforms: Uniforms::from([
                ("fog_density".into(), UniformValue::Float(0.5)),
                ("fog_color".into(), UniformValue::Vec3(Vec3::ONE)),
            ]),
            ..Default::default()
        };
        let props = Uniforms::from([
            ("fog_density".into(), UniformValue::Float(2.0)),
            ("unrelated".into(), UniformValue::Bool(true)),
        ]);

        assert_eq!(
            Uniforms::from([
                ("fog_density".into(), UniformValue::Float(2.0)),
                ("fog_color".into(), UniformValue::Vec3(Vec3::ONE)),
            ]),
            module.uniforms(&props, &Uniforms::new())
        );
    }

    #[test]
    fn descriptor_from_json() {
        let module: ModuleDescriptor = serde_json::from_str(
            r#"{
                "name": "picking",
                "dependencies": ["project"],
                "fs": "uniform vec4 picking_color;",
                "defines": {"PICKING_ENABLED": 1, "PICKING_SCALE": 0.5},
                "inject": {
                    "fs:#decl": "uniform bool picking_active;",
                    "fs:FILTER_COLOR": {"injection": "color = picking_color;", "order": 2}
                },
                "uniforms": {"picking_active": {"Bool": false}},
                "deprecations": [{"type": "function", "old": "pick", "new": "picking_filter"}]
            }"#,
        )
        .unwrap();

        assert_eq!(
            ModuleDescriptor {
                name: "picking".into(),
                dependencies: vec!["project".into()],
                vs: String::new(),
                fs: "uniform vec4 picking_color;".to_string(),
                defines: Defines::from([
                    ("PICKING_ENABLED".into(), 1.into()),
                    ("PICKING_SCALE".into(), 0.5.into()),
                ]),
                inject: IndexMap::from([
                    (
                        "fs:#decl".to_string(),
                        Injection::new("uniform bool picking_active;", 0)
                    ),
                    (
                        "fs:FILTER_COLOR".to_string(),
                        Injection::new("color = picking_color;", 2)
                    ),
                ]),
                uniforms: Uniforms::from([("picking_active".into(), UniformValue::Bool(false))]),
                deprecations: vec![Deprecation {
                    kind: "function".to_string(),
                    old: "pick".to_string(),
                    new: "picking_filter".to_string(),
                    deprecated: false,
                }],
            },
            module
        );
    }
}
