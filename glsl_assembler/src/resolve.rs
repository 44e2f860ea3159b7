//! Dependency resolution for shader modules.
use std::collections::HashSet;
use std::sync::Arc;

use log::debug;
use smol_str::SmolStr;

use crate::{
    error::ResolveModulesError,
    module::ShaderModule,
    registry::{ModuleRef, ModuleRegistry},
};

/// Expand `modules` and their dependencies into a flat list in dependency order.
///
/// Each module appears exactly once and always after all of its dependencies.
/// Dependencies are found by name first in the modules passed by value and then in `registry`.
pub fn resolve_modules(
    registry: &ModuleRegistry,
    modules: &[ModuleRef],
) -> Result<Vec<Arc<dyn ShaderModule>>, ResolveModulesError> {
    let mut resolver = Resolver {
        registry,
        requested: modules
            .iter()
            .filter_map(|m| match m {
                ModuleRef::Module(module) => Some(module),
                ModuleRef::Name(_) => None,
            })
            .collect(),
        resolved: Vec::new(),
        placed: HashSet::new(),
        visiting: Vec::new(),
    };

    for module in modules {
        let module = resolver.lookup(module.name(), None)?;
        resolver.visit(&module)?;
    }

    debug!(
        "Resolved modules: {:?}",
        resolver.resolved.iter().map(|m| m.name()).collect::<Vec<_>>()
    );

    Ok(resolver.resolved)
}

struct Resolver<'a> {
    registry: &'a ModuleRegistry,
    requested: Vec<&'a Arc<dyn ShaderModule>>,
    resolved: Vec<Arc<dyn ShaderModule>>,
    placed: HashSet<SmolStr>,
    // The current depth first path for detecting cycles.
    visiting: Vec<SmolStr>,
}

impl Resolver<'_> {
    fn lookup(
        &self,
        name: &str,
        dependent: Option<&str>,
    ) -> Result<Arc<dyn ShaderModule>, ResolveModulesError> {
        self.requested
            .iter()
            .find(|m| m.name() == name)
            .copied()
            .or_else(|| self.registry.get(name))
            .cloned()
            .ok_or_else(|| ResolveModulesError::UnresolvedModule {
                name: name.into(),
                dependent: dependent.map(Into::into),
            })
    }

    fn visit(&mut self, module: &Arc<dyn ShaderModule>) -> Result<(), ResolveModulesError> {
        let name = module.name();
        if self.placed.contains(name) {
            return Ok(());
        }

        if let Some(start) = self.visiting.iter().position(|n| n == name) {
            let mut cycle = self.visiting[start..].to_vec();
            cycle.push(name.into());
            return Err(ResolveModulesError::CyclicDependency { cycle });
        }

        self.visiting.push(name.into());
        for dependency in module.dependencies() {
            let dependency = self.lookup(dependency, Some(name))?;
            self.visit(&dependency)?;
        }
        self.visiting.pop();

        self.placed.insert(name.into());
        self.resolved.push(module.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::module::ModuleDescriptor;

    fn module(name: &str, dependencies: &[&str]) -> ModuleDescriptor {
        ModuleDescriptor {
            name: name.into(),
            dependencies: dependencies.iter().map(|d| (*d).into()).collect(),
            ..Default::default()
        }
    }

    fn registry(modules: Vec<ModuleDescriptor>) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for module in modules {
            registry.register(module).unwrap();
        }
        registry
    }

    fn names(modules: &[Arc<dyn ShaderModule>]) -> Vec<&str> {
        modules.iter().map(|m| m.name()).collect()
    }

    #[test]
    fn resolve_empty() {
        assert!(resolve_modules(&ModuleRegistry::new(), &[]).unwrap().is_empty());
    }

    #[test]
    fn resolve_dependency_before_dependent() {
        let registry = registry(vec![module("a", &[]), module("b", &["a"])]);
        let modules = resolve_modules(&registry, &["a".into(), "b".into()]).unwrap();
        assert_eq!(vec!["a", "b"], names(&modules));

        let modules = resolve_modules(&registry, &["b".into(), "a".into()]).unwrap();
        assert_eq!(vec!["a", "b"], names(&modules));
    }

    #[test]
    fn resolve_shared_dependency_once() {
        // d depends on b and c which both depend on a.
        let registry = registry(vec![
            module("a", &[]),
            module("b", &["a"]),
            module("c", &["a"]),
            module("d", &["b", "c"]),
        ]);
        let modules = resolve_modules(&registry, &["d".into(), "c".into()]).unwrap();
        assert_eq!(vec!["a", "b", "c", "d"], names(&modules));
    }

    #[test]
    fn resolve_dependency_order_property() {
        let registry = registry(vec![
            module("project", &[]),
            module("lights", &[]),
            module("gouraud", &["lights", "project"]),
            module("phong", &["lights"]),
            module("picking", &[]),
            module("material", &["phong", "gouraud", "picking"]),
        ]);
        let modules = resolve_modules(&registry, &["material".into(), "phong".into()]).unwrap();

        let names = names(&modules);
        assert_eq!(6, names.len());
        for (i, module) in modules.iter().enumerate() {
            assert_eq!(1, names.iter().filter(|n| **n == module.name()).count());
            for dependency in module.dependencies() {
                let d = names.iter().position(|n| *n == dependency.as_str()).unwrap();
                assert!(d < i, "{dependency} should be placed before {}", module.name());
            }
        }
    }

    #[test]
    fn resolve_modules_by_value() {
        let registry = registry(vec![module("a", &[])]);
        let modules = resolve_modules(
            &registry,
            &[module("c", &["b"]).into(), module("b", &["a"]).into()],
        )
        .unwrap();
        assert_eq!(vec!["a", "b", "c"], names(&modules));
    }

    #[test]
    fn resolve_cycle() {
        let registry = registry(vec![
            module("a", &["b"]),
            module("b", &["c"]),
            module("c", &["a"]),
        ]);
        assert_eq!(
            Err(ResolveModulesError::CyclicDependency {
                cycle: vec!["a".into(), "b".into(), "c".into(), "a".into()]
            }),
            resolve_modules(&registry, &["a".into()]).map(|m| names(&m).len())
        );
    }

    #[test]
    fn resolve_self_cycle() {
        let registry = registry(vec![module("a", &["a"])]);
        assert_eq!(
            "cyclic module dependency a -> a",
            resolve_modules(&registry, &["a".into()])
                .unwrap_err()
                .to_string()
        );
    }

    #[test]
    fn resolve_unknown_dependency() {
        let registry = registry(vec![module("a", &["missing"])]);
        assert_eq!(
            Err(ResolveModulesError::UnresolvedModule {
                name: "missing".into(),
                dependent: Some("a".into())
            }),
            resolve_modules(&registry, &["a".into()]).map(|m| m.len())
        );
    }

    #[test]
    fn resolve_unknown_requested_module() {
        assert_eq!(
            "failed to resolve module \"missing\"",
            resolve_modules(&ModuleRegistry::new(), &["missing".into()])
                .unwrap_err()
                .to_string()
        );
    }
}
