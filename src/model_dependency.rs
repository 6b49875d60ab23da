//! Model dependency discovery.
//!
//! A model's dependencies are the registered types reachable from it through
//! struct fields and generic parameters. Computing them walks the registry, so
//! [`CachingModelDependencyProvider`] memoizes the result per [`ModelContext`].

use crate::cache::{LoadingCache, DEFAULT_EXPIRE_AFTER_WRITE, DEFAULT_MAXIMUM_SIZE};
use crate::error::Result;
use crate::naming::GenericNaming;
use crate::type_resolver::{ResolvedType, TypeRegistry};
use log::debug;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// A model being documented, together with the policies that shape its name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelContext {
    pub model_type: ResolvedType,
    pub naming: GenericNaming,
    /// Optional serialization view restricting the visible fields
    pub view: Option<String>,
    /// Whether the model is a handler return type rather than a parameter
    pub is_return_type: bool,
}

impl ModelContext {
    pub fn return_value(model_type: ResolvedType, naming: GenericNaming) -> Self {
        Self {
            model_type,
            naming,
            view: None,
            is_return_type: true,
        }
    }

    pub fn input_param(model_type: ResolvedType, naming: GenericNaming) -> Self {
        Self {
            is_return_type: false,
            ..Self::return_value(model_type, naming)
        }
    }
}

pub trait ModelDependencyProvider: Send + Sync {
    /// Types the model in `context` depends on, the model itself excluded
    fn dependent_models(&self, context: &ModelContext) -> Result<HashSet<ResolvedType>>;
}

impl<P: ModelDependencyProvider + ?Sized> ModelDependencyProvider for Arc<P> {
    fn dependent_models(&self, context: &ModelContext) -> Result<HashSet<ResolvedType>> {
        (**self).dependent_models(context)
    }
}

/// Walks the type registry breadth-first
pub struct DefaultModelDependencyProvider {
    registry: Arc<TypeRegistry>,
}

impl DefaultModelDependencyProvider {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }
}

impl ModelDependencyProvider for DefaultModelDependencyProvider {
    fn dependent_models(&self, context: &ModelContext) -> Result<HashSet<ResolvedType>> {
        let root = &context.model_type;
        let mut seen: HashSet<ResolvedType> = HashSet::new();
        let mut dependencies = HashSet::new();
        let mut queue = VecDeque::from([root.clone()]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            // Containers and unregistered wrappers only contribute their parameters
            if &current != root && self.registry.is_model(&current) {
                dependencies.insert(current.clone());
            }
            queue.extend(current.type_parameters.iter().cloned());
            queue.extend(
                self.registry
                    .resolved_fields(&current)
                    .into_iter()
                    .map(|(_, field_type)| field_type),
            );
        }

        debug!("Model {} depends on {} model(s)", root, dependencies.len());
        Ok(dependencies)
    }
}

/// Memoizes a delegate provider per model context
pub struct CachingModelDependencyProvider<D> {
    cache: LoadingCache<ModelContext, HashSet<ResolvedType>>,
    delegate: D,
}

impl<D: ModelDependencyProvider> CachingModelDependencyProvider<D> {
    pub fn new(delegate: D) -> Self {
        Self::with_cache(delegate, DEFAULT_MAXIMUM_SIZE, DEFAULT_EXPIRE_AFTER_WRITE)
    }

    pub fn with_cache(delegate: D, maximum_size: usize, expire_after_write: Duration) -> Self {
        Self {
            cache: LoadingCache::new(maximum_size, expire_after_write),
            delegate,
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

impl<D: ModelDependencyProvider> ModelDependencyProvider for CachingModelDependencyProvider<D> {
    fn dependent_models(&self, context: &ModelContext) -> Result<HashSet<ResolvedType>> {
        self.cache
            .get_or_try_load(context, |key| self.delegate.dependent_models(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::type_resolver::{TypeDecl, TypeExpr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        registry.register_type(
            TypeDecl::concrete("Pet")
                .with_field("name", TypeExpr::named("String"))
                .with_field("owner", TypeExpr::generic("Option", vec![TypeExpr::named("Owner")]))
                .with_field("tags", TypeExpr::generic("Vec", vec![TypeExpr::named("Tag")])),
        );
        registry.register_type(
            TypeDecl::concrete("Owner")
                .with_field("pets", TypeExpr::generic("Vec", vec![TypeExpr::named("Pet")])),
        );
        registry.register_type(TypeDecl::concrete("Tag").with_field("label", TypeExpr::named("String")));
        registry.register_type(TypeDecl::concrete("Status").with_variants(&["Available", "Sold"]));
        registry.register_type(
            TypeDecl::concrete("Page")
                .with_generics(&["T"])
                .with_field("items", TypeExpr::generic("Vec", vec![TypeExpr::named("T")]))
                .with_field("status", TypeExpr::named("Status")),
        );
        Arc::new(registry)
    }

    fn context(model_type: ResolvedType) -> ModelContext {
        ModelContext::return_value(model_type, GenericNaming::standard())
    }

    fn names(models: &HashSet<ResolvedType>) -> Vec<String> {
        let mut names: Vec<String> = models.iter().map(|m| m.to_string()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_walks_fields_transitively_through_cycles() {
        let provider = DefaultModelDependencyProvider::new(registry());
        let models = provider
            .dependent_models(&context(ResolvedType::simple("Pet")))
            .unwrap();
        // Owner refers back to Pet; the root itself is not its own dependency
        assert_eq!(names(&models), vec!["Owner", "Tag"]);
    }

    #[test]
    fn test_generic_parameters_are_bound() {
        let provider = DefaultModelDependencyProvider::new(registry());
        let page_of_tag = ResolvedType {
            erased_type: "Page".to_string(),
            type_parameters: vec![ResolvedType::simple("Tag")],
        };
        let models = provider.dependent_models(&context(page_of_tag)).unwrap();
        assert_eq!(names(&models), vec!["Status", "Tag"]);
    }

    #[test]
    fn test_containers_and_primitives_are_transparent() {
        let provider = DefaultModelDependencyProvider::new(registry());
        let tags = ResolvedType {
            erased_type: "Vec".to_string(),
            type_parameters: vec![ResolvedType::simple("Tag")],
        };
        assert_eq!(names(&provider.dependent_models(&context(tags)).unwrap()), vec!["Tag"]);
        assert!(provider
            .dependent_models(&context(ResolvedType::simple("u64")))
            .unwrap()
            .is_empty());
        assert!(provider
            .dependent_models(&context(ResolvedType::void()))
            .unwrap()
            .is_empty());
    }

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl ModelDependencyProvider for CountingProvider {
        fn dependent_models(&self, context: &ModelContext) -> Result<HashSet<ResolvedType>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::ModelResolution(context.model_type.to_string()));
            }
            Ok(HashSet::from([ResolvedType::simple("Tag")]))
        }
    }

    #[test]
    fn test_cached_result_skips_delegate() {
        let delegate = Arc::new(CountingProvider::new(false));
        let caching = CachingModelDependencyProvider::new(Arc::clone(&delegate));
        let ctx = context(ResolvedType::simple("Pet"));

        let first = caching.dependent_models(&ctx).unwrap();
        let second = caching.dependent_models(&ctx).unwrap();

        assert_eq!(first, second);
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_context_fields_are_part_of_the_key() {
        let delegate = Arc::new(CountingProvider::new(false));
        let caching = CachingModelDependencyProvider::new(Arc::clone(&delegate));
        let returned = context(ResolvedType::simple("Pet"));
        let input = ModelContext::input_param(ResolvedType::simple("Pet"), GenericNaming::standard());
        let codegen = ModelContext::return_value(ResolvedType::simple("Pet"), GenericNaming::codegen());

        for ctx in [&returned, &input, &codegen, &returned] {
            caching.dependent_models(ctx).unwrap();
        }
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 3);
        assert_eq!(caching.cached_entries(), 3);
    }

    #[test]
    fn test_delegate_failure_is_not_cached() {
        let delegate = Arc::new(CountingProvider::new(true));
        let caching = CachingModelDependencyProvider::new(Arc::clone(&delegate));
        let ctx = context(ResolvedType::simple("Pet"));

        assert!(matches!(
            caching.dependent_models(&ctx),
            Err(Error::ModelResolution(model)) if model == "Pet"
        ));
        assert!(caching.dependent_models(&ctx).is_err());
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 2);
        assert_eq!(caching.cached_entries(), 0);
    }

    #[test]
    fn test_entries_expire() {
        let delegate = Arc::new(CountingProvider::new(false));
        let caching =
            CachingModelDependencyProvider::with_cache(Arc::clone(&delegate), 10, Duration::from_millis(10));
        let ctx = context(ResolvedType::simple("Pet"));

        caching.dependent_models(&ctx).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        caching.dependent_models(&ctx).unwrap();
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 2);
    }
}
