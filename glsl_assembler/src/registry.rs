use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{error::RegisterModuleError, module::ModuleDescriptor, module::ShaderModule};

/// Named shader modules available for dependency lookup.
///
/// The registry is append only and is typically initialized once at startup.
/// Assembly only reads from the registry, so it can be shared between threads.
#[derive(Debug, Default, Clone)]
pub struct ModuleRegistry {
    modules: IndexMap<SmolStr, Arc<dyn ShaderModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `module` to the registry.
    /// Module names must be unique.
    pub fn register<M: ShaderModule + 'static>(
        &mut self,
        module: M,
    ) -> Result<(), RegisterModuleError> {
        self.register_shared(Arc::new(module))
    }

    /// Add an already shared `module` to the registry.
    pub fn register_shared(
        &mut self,
        module: Arc<dyn ShaderModule>,
    ) -> Result<(), RegisterModuleError> {
        let name = SmolStr::from(module.name());
        if self.modules.contains_key(&name) {
            return Err(RegisterModuleError::DuplicateModule(name));
        }
        self.modules.insert(name, module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ShaderModule>> {
        self.modules.get(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The registered modules in registration order.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn ShaderModule>> {
        self.modules.values()
    }
}

/// A requested module passed by value or by registered name.
#[derive(Debug, Clone)]
pub enum ModuleRef {
    Name(SmolStr),
    Module(Arc<dyn ShaderModule>),
}

impl ModuleRef {
    pub fn name(&self) -> &str {
        match self {
            ModuleRef::Name(name) => name,
            ModuleRef::Module(module) => module.name(),
        }
    }
}

impl From<&str> for ModuleRef {
    fn from(value: &str) -> Self {
        Self::Name(value.into())
    }
}

impl From<SmolStr> for ModuleRef {
    fn from(value: SmolStr) -> Self {
        Self::Name(value)
    }
}

impl From<Arc<dyn ShaderModule>> for ModuleRef {
    fn from(value: Arc<dyn ShaderModule>) -> Self {
        Self::Module(value)
    }
}

impl From<ModuleDescriptor> for ModuleRef {
    fn from(value: ModuleDescriptor) -> Self {
        Self::Module(Arc::new(value))
    }
}
