//! # glsl_assembler
//! glsl_assembler composes final GLSL source text from reusable shader modules.
//!
//! Applications provide abstract vertex and fragment sources and a list of requested modules.
//! Modules may depend on other modules, contribute defines and uniforms,
//! and inject code into declarations, hook functions, or marked locations in the shader body.
//! The assembled output is versioned and transpiled for the requested GLSL dialect.
//!
//! # Getting Started
//! ```rust
//! use glsl_assembler::{
//!     AssembleShaderOptions, GlslTranspiler, ModuleDescriptor, ModuleRegistry, PlatformInfo,
//!     ShaderAssembler,
//! };
//!
//! let mut registry = ModuleRegistry::new();
//! registry
//!     .register(ModuleDescriptor {
//!         name: "picking".into(),
//!         fs: "uniform vec4 picking_color;\n".to_string(),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! let platform = PlatformInfo::default();
//! let assembler = ShaderAssembler::new(&registry, &platform, &GlslTranspiler);
//!
//! let shaders = assembler
//!     .assemble_shaders(&AssembleShaderOptions {
//!         vs: "void main() { gl_Position = vec4(0.0); }".to_string(),
//!         fs: "void main() { gl_FragColor = picking_color; }".to_string(),
//!         modules: vec!["picking".into()],
//!         ..Default::default()
//!     })
//!     .unwrap();
//! assert!(shaders.fs.contains("#define MODULE_PICKING"));
//! ```

use strum::{Display, EnumString};

mod assemble;
pub mod defines;
pub mod error;
pub mod hook;
pub mod inject;
pub mod manifest;
pub mod module;
pub mod platform;
pub mod registry;
pub mod resolve;
pub mod transpile;

pub use assemble::{AssembleShaderOptions, AssembledShaders, ShaderAssembler};
pub use defines::{DefineValue, Defines};
pub use hook::HookFunction;
pub use inject::Injection;
pub use manifest::ShaderManifest;
pub use module::{
    Deprecation, DeprecationLog, LogDeprecations, ModuleDescriptor, ShaderModule, UniformValue,
    Uniforms,
};
pub use platform::{GlslFeature, GpuVendor, PlatformDefines, PlatformInfo};
pub use registry::{ModuleRef, ModuleRegistry};
pub use resolve::resolve_modules;
pub use transpile::{GlslTranspiler, Transpile};

/// The programmable pipeline stage for a shader source.
///
/// Stages are written as `vs` and `fs` in injection keys and hook declarations.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Display, EnumString)]
pub enum ShaderStage {
    #[strum(serialize = "vs")]
    Vertex,
    #[strum(serialize = "fs")]
    Fragment,
}

impl ShaderStage {
    /// The stage name used for generated macros like `SHADER_TYPE_VERTEX`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn shader_stage_names() {
        assert_eq!(Ok(ShaderStage::Vertex), "vs".parse::<ShaderStage>());
        assert_eq!(Ok(ShaderStage::Fragment), "fs".parse::<ShaderStage>());
        assert!("vertex".parse::<ShaderStage>().is_err());
        assert_eq!("vs", ShaderStage::Vertex.to_string());
        assert_eq!("fragment", ShaderStage::Fragment.type_name());
    }
}
