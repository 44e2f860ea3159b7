use std::{fmt::Write, sync::Arc};

use indexmap::IndexMap;
use log::debug;

use crate::{
    defines::{application_defines_glsl, merge_defines, Defines},
    error::AssembleShaderError,
    hook::{hook_functions_glsl, normalize_hook_functions, HookFunction, HookFunctionSpec},
    inject::{
        classify_injections, inject_declarations, inject_main, Injection, InjectionBuckets,
        StageTarget, DECLARATION_INJECT_MARKER,
    },
    module::{DeprecationLog, ShaderModule, Uniforms},
    platform::PlatformDefines,
    registry::{ModuleRef, ModuleRegistry},
    resolve::resolve_modules,
    transpile::Transpile,
    ShaderStage,
};

const FRAGMENT_SHADER_PROLOGUE: &str = "precision highp float;\n";

/// Per invocation inputs for [ShaderAssembler::assemble_shaders].
#[derive(Clone)]
pub struct AssembleShaderOptions<'a> {
    /// Used for the `SHADER_NAME` macro if present.
    pub id: Option<String>,
    /// Vertex shader source.
    pub vs: String,
    /// Fragment shader source.
    pub fs: String,
    pub modules: Vec<ModuleRef>,
    /// Application defines that override any module defines with the same name.
    pub defines: Defines,
    pub hook_functions: Vec<HookFunction>,
    /// Application injections keyed by stage prefixed keys or literal text patterns.
    pub inject: IndexMap<String, Injection>,
    /// Convert the output to GLSL ES 1.00 regardless of the source version.
    pub transpile_to_glsl100: bool,
    /// Prepend version, platform, and define macros. Defaults to `true`.
    pub prologue: bool,
    /// Receives deprecated module symbols found in the sources.
    /// Each module is checked once per stage, so a symbol used in both stages is reported twice.
    /// Deprecation checks are skipped if this is [None].
    pub log: Option<&'a dyn DeprecationLog>,
}

impl Default for AssembleShaderOptions<'_> {
    fn default() -> Self {
        Self {
            id: None,
            vs: String::new(),
            fs: String::new(),
            modules: Vec::new(),
            defines: Defines::new(),
            hook_functions: Vec::new(),
            inject: IndexMap::new(),
            transpile_to_glsl100: false,
            prologue: true,
            log: None,
        }
    }
}

/// The final shader sources for a single program.
#[derive(Debug, Clone)]
pub struct AssembledShaders {
    pub vs: String,
    pub fs: String,
    modules: Vec<Arc<dyn ShaderModule>>,
}

impl AssembledShaders {
    /// Combine the uniforms of all modules in dependency order.
    ///
    /// Each module sees the uniforms of earlier modules,
    /// and later modules override earlier values with the same name.
    pub fn get_uniforms(&self, props: &Uniforms) -> Uniforms {
        let mut uniforms = Uniforms::new();
        for module in &self.modules {
            let module_uniforms = module.uniforms(props, &uniforms);
            uniforms.extend(module_uniforms);
        }
        uniforms
    }

    /// The resolved modules in dependency order.
    pub fn modules(&self) -> &[Arc<dyn ShaderModule>] {
        &self.modules
    }
}

/// Combines module sources with application shaders.
///
/// Assembly does not modify any of its inputs,
/// so the same assembler can be used from multiple threads.
#[derive(Clone, Copy)]
pub struct ShaderAssembler<'a> {
    registry: &'a ModuleRegistry,
    platform: &'a dyn PlatformDefines,
    transpiler: &'a dyn Transpile,
}

// Shared inputs for both stages.
struct Program<'a> {
    modules: &'a [Arc<dyn ShaderModule>],
    defines: &'a Defines,
    hooks: &'a IndexMap<StageTarget, HookFunctionSpec>,
    injections: &'a InjectionBuckets,
}

impl<'a> ShaderAssembler<'a> {
    pub fn new(
        registry: &'a ModuleRegistry,
        platform: &'a dyn PlatformDefines,
        transpiler: &'a dyn Transpile,
    ) -> Self {
        Self {
            registry,
            platform,
            transpiler,
        }
    }

    /// Assemble the vertex and fragment shader for `options`.
    ///
    /// Any error aborts the entire assembly.
    #[tracing::instrument(skip_all)]
    pub fn assemble_shaders(
        &self,
        options: &AssembleShaderOptions,
    ) -> Result<AssembledShaders, AssembleShaderError> {
        let modules = resolve_modules(self.registry, &options.modules)?;
        let defines = merge_defines(&modules, &options.defines);
        let injections = classify_injections(&options.inject, &modules)?;
        let hooks = normalize_hook_functions(&options.hook_functions)?;

        debug!(
            "Assembling shader {:?} with {} modules",
            options.id.as_deref().unwrap_or_default(),
            modules.len()
        );

        let program = Program {
            modules: &modules,
            defines: &defines,
            hooks: &hooks,
            injections: &injections,
        };

        let vs = self.assemble_stage(ShaderStage::Vertex, &options.vs, options, &program)?;
        let fs = self.assemble_stage(ShaderStage::Fragment, &options.fs, options, &program)?;

        Ok(AssembledShaders { vs, fs, modules })
    }

    fn assemble_stage(
        &self,
        stage: ShaderStage,
        source: &str,
        options: &AssembleShaderOptions,
        program: &Program,
    ) -> Result<String, AssembleShaderError> {
        let (glsl_version, version_line, core_source) = split_version(source);

        // The version line is kept separate so injections can't match it.
        let mut glsl = String::new();

        if options.prologue {
            if let Some(id) = options.id.as_deref().filter(|id| !id.is_empty()) {
                if !source.contains("SHADER_NAME") {
                    writeln!(glsl, "#define SHADER_NAME {id}_{}", stage.type_name()).unwrap();
                }
            }
            writeln!(
                glsl,
                "#define SHADER_TYPE_{}",
                stage.type_name().to_uppercase()
            )
            .unwrap();
            glsl.push_str(&self.platform.platform_defines());
            glsl.push_str(&self.platform.version_defines());
            glsl.push_str(&application_defines_glsl(program.defines));
            if stage == ShaderStage::Fragment {
                glsl.push('\n');
                glsl.push_str(FRAGMENT_SHADER_PROLOGUE);
            }
            glsl.push('\n');
        }

        for module in program.modules {
            if let Some(log) = options.log {
                module.check_deprecations(core_source, log);
            }
            write_module_source(&mut glsl, module.as_ref(), stage, glsl_version);
        }

        write!(glsl, "\n\n{DECLARATION_INJECT_MARKER}\n\n").unwrap();
        glsl.push_str(&hook_functions_glsl(
            program.hooks,
            stage,
            &program.injections.hooks,
        ));
        glsl.push_str(core_source);

        let glsl = inject_declarations(&glsl, stage, program.injections);
        // Declarations are injected before the body, so the body is still the suffix.
        let body_start = glsl.len() - core_source.len();
        let glsl = inject_main(&glsl, body_start, stage, program.injections);
        let glsl = format!("{version_line}\n{glsl}");

        let target_version = if options.transpile_to_glsl100 {
            100
        } else {
            glsl_version
        };
        let glsl = self.transpiler.transpile(&glsl, target_version, stage)?;
        Ok(glsl)
    }
}

/// Split the version directive from the first line of `source` if present.
fn split_version(source: &str) -> (u32, &str, &str) {
    if source.starts_with("#version ") {
        match source.split_once('\n') {
            Some((version_line, core_source)) => (300, version_line, core_source),
            None => (300, source, ""),
        }
    } else {
        (100, "#version 100", source)
    }
}

fn write_module_source(
    glsl: &mut String,
    module: &dyn ShaderModule,
    stage: ShaderStage,
    glsl_version: u32,
) {
    let name = module.name();
    writeln!(glsl, "#define MODULE_{}", module_macro_name(name)).unwrap();
    writeln!(glsl, "{}", module.source(stage, glsl_version)).unwrap();
    writeln!(glsl, "// END MODULE_{name}\n").unwrap();
}

fn module_macro_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
