//! Activation: choosing and ordering the extensions for one invocation.

use log::debug;
use std::fmt;

use crate::error::{RockerError, RockerResult, Stage};
use crate::extension::{Category, Extension};
use crate::options::Options;
use crate::registry::ExtensionRegistry;

/// An instantiated, activated extension.
pub struct ActiveExtension {
    name: String,
    category: Category,
    instance: Box<dyn Extension>,
}

impl ActiveExtension {
    /// Wraps an instantiated extension.
    pub fn new(name: impl Into<String>, category: Category, instance: Box<dyn Extension>) -> Self {
        Self {
            name: name.into(),
            category,
            instance,
        }
    }

    /// Returns the extension name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ordering category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the extension itself.
    pub fn instance(&self) -> &dyn Extension {
        self.instance.as_ref()
    }
}

impl fmt::Debug for ActiveExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveExtension")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

/// Selects the requested extensions and puts them in application order.
///
/// An extension is active when its activation option is truthy. Only active
/// extensions are instantiated. The result is sorted stably by category, so
/// `AppliedLast` extensions come last and everything else keeps registry order.
/// Command-line flag order has no influence.
pub fn resolve(registry: &ExtensionRegistry, options: &Options) -> RockerResult<Vec<ActiveExtension>> {
    let mut active = Vec::new();

    for descriptor in registry.list() {
        if !options.is_enabled(descriptor.name()) {
            continue;
        }

        let instance = descriptor
            .instantiate(options)
            .map_err(|source| RockerError::extension(descriptor.name(), Stage::Activation, source))?;
        debug!(
            "activated extension '{}' ({})",
            descriptor.name(),
            descriptor.category()
        );
        active.push(ActiveExtension::new(
            descriptor.name(),
            descriptor.category(),
            instance,
        ));
    }

    active.sort_by_key(ActiveExtension::category);
    Ok(active)
}

/// Returns the names of `active`, in order.
pub fn active_names(active: &[ActiveExtension]) -> Vec<&str> {
    active.iter().map(ActiveExtension::name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtensionError;
    use crate::extension::ExtensionDescriptor;
    use crate::options::OptionValue;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Named(String);

    impl Extension for Named {
        fn name(&self) -> &str {
            &self.0
        }
    }

    fn counted(name: &str, category: Category, created: Arc<AtomicUsize>) -> ExtensionDescriptor {
        let owned = name.to_string();
        ExtensionDescriptor::builtin(name, "test", move |_: &Options| {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Named(owned.clone())) as Box<dyn Extension>)
        })
        .with_category(category)
    }

    fn registry(entries: &[(&str, Category)]) -> (ExtensionRegistry, Vec<Arc<AtomicUsize>>) {
        let mut registry = ExtensionRegistry::new();
        let mut counters = Vec::new();
        for (name, category) in entries {
            let counter = Arc::new(AtomicUsize::new(0));
            registry
                .register(counted(name, *category, counter.clone()))
                .unwrap();
            counters.push(counter);
        }
        (registry, counters)
    }

    #[test]
    fn test_applied_last_sorts_after_others() {
        let (registry, _) = registry(&[
            ("user", Category::AppliedLast),
            ("env", Category::Normal),
            ("x11", Category::Normal),
        ]);
        let options = Options::new("ubuntu:20.04")
            .enable("x11")
            .enable("user")
            .enable("env");

        let active = resolve(&registry, &options).unwrap();
        assert_eq!(active_names(&active), vec!["env", "x11", "user"]);
    }

    #[test]
    fn test_unrequested_extensions_are_never_instantiated() {
        let (registry, counters) = registry(&[("env", Category::Normal), ("home", Category::Normal)]);
        let options = Options::new("ubuntu").enable("env");

        let active = resolve(&registry, &options).unwrap();
        assert_eq!(active_names(&active), vec!["env"]);
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);
        assert_eq!(counters[1].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_false_flag_and_empty_values_do_not_activate() {
        let (registry, _) = registry(&[("env", Category::Normal), ("home", Category::Normal)]);
        let options = Options::new("ubuntu")
            .with_extension("env", OptionValue::Values(vec![]))
            .with_extension("home", OptionValue::Flag(false));

        assert!(resolve(&registry, &options).unwrap().is_empty());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let (registry, _) = registry(&[
            ("user", Category::AppliedLast),
            ("a", Category::Normal),
            ("b", Category::Normal),
            ("c", Category::Normal),
        ]);
        let options = Options::new("ubuntu")
            .enable("c")
            .enable("user")
            .enable("a")
            .enable("b");

        let first: Vec<String> = active_names(&resolve(&registry, &options).unwrap())
            .into_iter()
            .map(String::from)
            .collect();
        for _ in 0..10 {
            let again = resolve(&registry, &options).unwrap();
            assert_eq!(active_names(&again), first);
        }
        assert_eq!(first, vec!["a", "b", "c", "user"]);
    }

    #[test]
    fn test_factory_failure_names_extension() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(ExtensionDescriptor::builtin("ssh", "test", |_: &Options| {
                Err(ExtensionError::MissingEnv("SSH_AUTH_SOCK".to_string()))
            }))
            .unwrap();

        let err = resolve(&registry, &Options::new("ubuntu").enable("ssh")).unwrap_err();
        assert_eq!(err.extension_name(), Some("ssh"));
        assert_eq!(err.stage(), Stage::Activation);
    }
}
