use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ResolveModulesError {
    #[error("cyclic module dependency {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<SmolStr> },

    #[error("{}", unresolved_message(.name, .dependent.as_deref()))]
    UnresolvedModule {
        name: SmolStr,
        /// The module that declared the dependency or [None] if requested directly.
        dependent: Option<SmolStr>,
    },
}

fn unresolved_message(name: &str, dependent: Option<&str>) -> String {
    match dependent {
        Some(dependent) => format!("failed to resolve module {name:?} required by {dependent:?}"),
        None => format!("failed to resolve module {name:?}"),
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegisterModuleError {
    #[error("a module named {0:?} is already registered")]
    DuplicateModule(SmolStr),
}

#[derive(Debug, Error, PartialEq)]
pub enum TranspileError {
    #[error("unsupported GLSL version {0}")]
    UnsupportedVersion(u32),

    #[error("error transpiling shader: {0}")]
    Message(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum AssembleShaderError {
    #[error("error resolving shader modules")]
    Resolve(#[from] ResolveModulesError),

    #[error("invalid injection key {key:?}")]
    InvalidInjectionKey { key: String },

    #[error("invalid hook function {hook:?}")]
    InvalidHookFunction { hook: String },

    #[error("error transpiling assembled shader")]
    Transpile(#[from] TranspileError),
}

#[derive(Debug, Error)]
pub enum LoadManifestError {
    #[error("error reading manifest file")]
    Io(#[from] std::io::Error),

    #[error("error deserializing manifest JSON")]
    Json(#[from] serde_json::Error),

    #[error("error registering manifest modules")]
    Register(#[from] RegisterModuleError),
}
