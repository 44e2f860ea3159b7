//! JSON descriptions of shader modules and the programs that use them.
//!
//! ```json
//! {
//!     "platform": { "gpu": "nvidia", "features": ["glsl-derivatives"] },
//!     "modules": [{ "name": "picking", "fs": "uniform vec4 picking_color;" }],
//!     "programs": [{ "id": "mesh", "vs": "mesh.vert", "fs": "mesh.frag", "modules": ["picking"] }]
//! }
//! ```
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::{
    defines::Defines, error::LoadManifestError, hook::HookFunction, inject::Injection,
    module::ModuleDescriptor, platform::PlatformInfo, registry::ModuleRegistry,
    AssembleShaderOptions,
};

#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShaderManifest {
    pub platform: PlatformInfo,
    pub modules: Vec<ModuleDescriptor>,
    pub programs: Vec<ProgramDescriptor>,
}

/// A vertex and fragment shader pair and the inputs for assembling it.
#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct ProgramDescriptor {
    pub id: String,
    /// Vertex shader path relative to the manifest.
    pub vs: PathBuf,
    /// Fragment shader path relative to the manifest.
    pub fs: PathBuf,
    #[serde(default)]
    pub modules: Vec<SmolStr>,
    #[serde(default)]
    pub defines: Defines,
    #[serde(default)]
    pub hook_functions: Vec<HookFunction>,
    #[serde(default)]
    pub inject: IndexMap<String, Injection>,
}

impl ShaderManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadManifestError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Register all manifest modules in declaration order.
    pub fn registry(&self) -> Result<ModuleRegistry, LoadManifestError> {
        let mut registry = ModuleRegistry::new();
        for module in &self.modules {
            registry.register(module.clone())?;
        }
        Ok(registry)
    }
}

impl ProgramDescriptor {
    /// Assembly options for this program using the already loaded shader sources.
    pub fn options(&self, vs: String, fs: String) -> AssembleShaderOptions<'static> {
        AssembleShaderOptions {
            id: Some(self.id.clone()),
            vs,
            fs,
            modules: self.modules.iter().cloned().map(Into::into).collect(),
            defines: self.defines.clone(),
            hook_functions: self.hook_functions.clone(),
            inject: self.inject.clone(),
            ..Default::default()
        }
    }

    /// Assembly options for this program with shader sources read relative to `folder`.
    pub fn load_options(
        &self,
        folder: &Path,
    ) -> Result<AssembleShaderOptions<'static>, LoadManifestError> {
        let vs = std::fs::read_to_string(folder.join(&self.vs))?;
        let fs = std::fs::read_to_string(folder.join(&self.fs))?;
        Ok(self.options(vs, fs))
    }
}
