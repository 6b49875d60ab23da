//! Reading operations from route contexts.
//!
//! An [`OperationReader`] turns one specialized [`RouteContext`] into the
//! operations documented under its path: one per HTTP method the route is
//! mapped to. [`CachingOperationReader`] memoizes a delegate by
//! [`OperationCacheKey`] so routes shared between groups are read once.

use crate::cache::{LoadingCache, DEFAULT_EXPIRE_AFTER_WRITE, DEFAULT_MAXIMUM_SIZE};
use crate::context::{HttpMethod, RouteContext};
use crate::equivalence::OperationCacheKey;
use crate::error::Result;
use crate::handler::{HandlerMethod, ParamAnnotation, ResolvedMethodParameter};
use crate::handler_resolver::HandlerMethodResolver;
use crate::naming::{GenericNaming, ParameterNameReader};
use crate::type_resolver::{ResolvedType, TypeRegistry, META_TYPE};
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// The location where a parameter value is extracted from in an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
}

/// A documented handler parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub parameter_type: ResolvedType,
    /// Type name rendered with the context's generic naming
    pub model_name: String,
    pub required: bool,
    /// Position of the parameter in the handler signature
    pub index: usize,
}

/// A single documented HTTP operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub method: HttpMethod,
    pub operation_id: String,
    pub summary: String,
    pub parameters: Vec<Parameter>,
    pub response_type: ResolvedType,
    /// Response model name, absent for `()` handlers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_model: Option<String>,
}

impl Operation {
    pub fn body_parameter(&self) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.location == ParameterLocation::Body)
    }
}

pub trait OperationReader: Send + Sync {
    /// Operations of a context bound to a single path, possibly none
    fn read(&self, context: &RouteContext) -> Result<Vec<Operation>>;
}

impl<R: OperationReader + ?Sized> OperationReader for Arc<R> {
    fn read(&self, context: &RouteContext) -> Result<Vec<Operation>> {
        (**self).read(context)
    }
}

/// Request-plumbing parameter types that never appear in the document
const IGNORED_PARAMETER_TYPES: &[&str] = &["HttpRequest", "Request", "HeaderMap", META_TYPE];

/// Builds operations from the resolved handler signature
pub struct DefaultOperationReader {
    resolver: HandlerMethodResolver,
    names: ParameterNameReader,
    ignored_types: HashSet<String>,
}

impl DefaultOperationReader {
    pub fn new(resolver: HandlerMethodResolver, names: ParameterNameReader) -> Self {
        Self {
            resolver,
            names,
            ignored_types: IGNORED_PARAMETER_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Excludes parameters of the given type from every operation
    pub fn ignoring_parameter_type(mut self, type_name: &str) -> Self {
        self.ignored_types.insert(type_name.to_string());
        self
    }

    /// `{method}Using{VERB}`; made unique per group by [`OperationIds`]
    fn operation_id(handler: &HandlerMethod, method: HttpMethod) -> String {
        format!("{}Using{}", handler.name(), method.as_str())
    }

    fn parameter(
        &self,
        handler: &HandlerMethod,
        resolved: &ResolvedMethodParameter,
        naming: &GenericNaming,
    ) -> Option<Parameter> {
        let parameter_type = &resolved.resolved_type;
        if self.ignored_types.contains(&parameter_type.erased_type) {
            debug!("Ignoring {} parameter of {}", parameter_type, handler.name());
            return None;
        }

        let optional = parameter_type.erased_type == "Option";
        let (location, required) = match resolved.parameter.annotations.first() {
            Some(ParamAnnotation::PathVariable(_)) => (ParameterLocation::Path, true),
            Some(ParamAnnotation::RequestParam { required, .. }) => {
                (ParameterLocation::Query, *required && !optional)
            }
            Some(ParamAnnotation::RequestHeader(_)) => (ParameterLocation::Header, !optional),
            Some(ParamAnnotation::ModelAttribute(_)) => (ParameterLocation::Query, false),
            Some(ParamAnnotation::RequestBody) => (ParameterLocation::Body, !optional),
            None if is_scalar(parameter_type) => (ParameterLocation::Query, !optional),
            None => (ParameterLocation::Body, !optional),
        };

        Some(Parameter {
            name: self.names.name_of(handler, &resolved.parameter),
            location,
            parameter_type: parameter_type.clone(),
            model_name: naming.type_name(parameter_type),
            required,
            index: resolved.parameter.index,
        })
    }
}

/// Scalars, optionally wrapped in `Option`
fn is_scalar(resolved: &ResolvedType) -> bool {
    match resolved.erased_type.as_str() {
        "Option" => resolved.type_parameters.iter().all(is_scalar),
        name => TypeRegistry::is_primitive(name),
    }
}

impl OperationReader for DefaultOperationReader {
    fn read(&self, context: &RouteContext) -> Result<Vec<Operation>> {
        let Some(handler) = context.handler_method() else {
            return Ok(Vec::new());
        };
        if handler.method.hidden {
            debug!("{} is hidden, no operations", handler.identity());
            return Ok(Vec::new());
        }

        let naming = context.naming();
        let response_type = self.resolver.method_return_type(Some(handler));
        let response_model = (!response_type.is_void()).then(|| naming.type_name(&response_type));
        let parameters: Vec<Parameter> = self
            .resolver
            .method_parameters(Some(handler))
            .iter()
            .filter_map(|p| self.parameter(handler, p, naming))
            .collect();

        let methods: Vec<HttpMethod> = if context.route_info().methods.is_empty() {
            vec![HttpMethod::Get]
        } else {
            context.route_info().methods.iter().copied().collect()
        };

        let operations = methods
            .into_iter()
            .map(|method| Operation {
                method,
                operation_id: Self::operation_id(handler, method),
                summary: handler.name().to_string(),
                parameters: parameters.clone(),
                response_type: response_type.clone(),
                response_model: response_model.clone(),
            })
            .collect::<Vec<_>>();

        debug!(
            "Read {} operation(s) for {} at {}",
            operations.len(),
            handler.name(),
            context.request_mapping_pattern()
        );
        Ok(operations)
    }
}

/// Operation ids issued within one documentation group.
///
/// The first request for an id returns it unchanged; later requests get a
/// `_1`, `_2`, ... suffix.
#[derive(Debug, Default)]
pub struct OperationIds {
    issued: HashMap<String, usize>,
}

impl OperationIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, base: &str) -> String {
        let seen = self.issued.entry(base.to_string()).or_insert(0);
        let id = match *seen {
            0 => base.to_string(),
            n => format!("{}_{}", base, n),
        };
        *seen += 1;
        id
    }
}

/// Memoizes a delegate reader by route context equivalence
pub struct CachingOperationReader<R> {
    cache: LoadingCache<OperationCacheKey, Vec<Operation>>,
    delegate: R,
}

impl<R: OperationReader> CachingOperationReader<R> {
    pub fn new(delegate: R) -> Self {
        Self::with_cache(delegate, DEFAULT_MAXIMUM_SIZE, DEFAULT_EXPIRE_AFTER_WRITE)
    }

    pub fn with_cache(delegate: R, maximum_size: usize, expire_after_write: Duration) -> Self {
        Self {
            cache: LoadingCache::new(maximum_size, expire_after_write),
            delegate,
        }
    }
}

impl<R: OperationReader> OperationReader for CachingOperationReader<R> {
    fn read(&self, context: &RouteContext) -> Result<Vec<Operation>> {
        self.cache
            .get_or_try_load(&OperationCacheKey::new(context), |_| self.delegate.read(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PathSelectors, RouteInfo};
    use crate::handler::{MethodDecl, ParamDecl};
    use crate::type_resolver::{ImplDecl, TypeDecl, TypeExpr};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pets_registry() -> (TypeRegistry, Vec<MethodDecl>) {
        let get = MethodDecl::new("get_pet")
            .with_param(
                ParamDecl::new("id", TypeExpr::named("u64"))
                    .annotated(ParamAnnotation::PathVariable("petId".to_string())),
            )
            .with_param(ParamDecl::new("verbose", TypeExpr::generic("Option", vec![TypeExpr::named("bool")])))
            .with_param(ParamDecl::new("req", TypeExpr::named("HttpRequest")))
            .returning(TypeExpr::named("Pet"));
        let create = MethodDecl::new("create_pet")
            .with_param(ParamDecl::new("pet", TypeExpr::named("Pet")))
            .with_param(
                ParamDecl::new("_trace", TypeExpr::named("String"))
                    .annotated(ParamAnnotation::RequestHeader("X-Trace".to_string())),
            );
        let secret = MethodDecl::new("secret").hidden();

        let mut registry = TypeRegistry::new();
        registry.register_type(TypeDecl::concrete("Pet").with_field("name", TypeExpr::named("String")));
        registry.register_type(TypeDecl::concrete("Pets"));
        registry.register_impl(
            ImplDecl::inherent("Pets")
                .with_method(get.clone())
                .with_method(create.clone())
                .with_method(secret.clone()),
        );
        (registry, vec![get, create, secret])
    }

    fn reader(registry: TypeRegistry) -> DefaultOperationReader {
        DefaultOperationReader::new(
            HandlerMethodResolver::new(Arc::new(registry)),
            ParameterNameReader::default(),
        )
    }

    fn context(method: MethodDecl, verbs: &[HttpMethod]) -> RouteContext {
        RouteContext::new(
            Some(Arc::new(HandlerMethod::new("Pets", "Pets", method))),
            RouteInfo::new(["/pets"], verbs),
            Arc::new(GenericNaming::standard()),
            Arc::new(PathSelectors::any()),
        )
        .copy_pattern_using("/pets")
    }

    #[test]
    fn test_parameters_located_by_annotation() {
        let (registry, methods) = pets_registry();
        let reader = reader(registry);

        let operations = reader.read(&context(methods[0].clone(), &[HttpMethod::Get])).unwrap();
        assert_eq!(operations.len(), 1);
        let op = &operations[0];
        assert_eq!(op.operation_id, "get_petUsingGET");
        assert_eq!(op.response_model.as_deref(), Some("Pet"));

        let located: Vec<(&str, ParameterLocation, bool)> = op
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.location, p.required))
            .collect();
        // HttpRequest is request plumbing and is left out
        assert_eq!(
            located,
            vec![
                ("petId", ParameterLocation::Path, true),
                ("verbose", ParameterLocation::Query, false),
            ]
        );
    }

    #[test]
    fn test_unannotated_model_is_body() {
        let (registry, methods) = pets_registry();
        let reader = reader(registry);

        let operations = reader.read(&context(methods[1].clone(), &[HttpMethod::Post])).unwrap();
        let op = &operations[0];
        assert_eq!(op.response_model, None);
        assert_eq!(op.body_parameter().map(|p| p.name.as_str()), Some("pet"));
        let header = &op.parameters[1];
        assert_eq!(header.name, "X-Trace");
        assert_eq!(header.location, ParameterLocation::Header);
    }

    #[test]
    fn test_one_operation_per_method_with_get_default() {
        let (registry, methods) = pets_registry();
        let reader = reader(registry);

        let both = reader
            .read(&context(methods[0].clone(), &[HttpMethod::Put, HttpMethod::Get]))
            .unwrap();
        let verbs: Vec<HttpMethod> = both.iter().map(|o| o.method).collect();
        assert_eq!(verbs, vec![HttpMethod::Get, HttpMethod::Put]);

        let defaulted = reader.read(&context(methods[1].clone(), &[])).unwrap();
        assert_eq!(defaulted[0].method, HttpMethod::Get);
    }

    #[test]
    fn test_reads_are_independent_of_history() {
        let (registry, methods) = pets_registry();
        let reader = reader(registry);
        let ctx = context(methods[0].clone(), &[HttpMethod::Get]);

        let first = reader.read(&ctx).unwrap();
        let second = reader.read(&ctx).unwrap();
        assert_eq!(first, second);
        assert_eq!(second[0].operation_id, "get_petUsingGET");
    }

    #[test]
    fn test_operation_ids_suffix_repeats() {
        let mut ids = OperationIds::new();
        assert_eq!(ids.claim("listUsingGET"), "listUsingGET");
        assert_eq!(ids.claim("listUsingGET"), "listUsingGET_1");
        assert_eq!(ids.claim("createUsingPOST"), "createUsingPOST");
        assert_eq!(ids.claim("listUsingGET"), "listUsingGET_2");
    }

    #[test]
    fn test_hidden_and_absent_handlers_have_no_operations() {
        let (registry, methods) = pets_registry();
        let reader = reader(registry);

        assert!(reader.read(&context(methods[2].clone(), &[HttpMethod::Get])).unwrap().is_empty());
        let absent = RouteContext::new(
            None,
            RouteInfo::new(["/x"], &[]),
            Arc::new(GenericNaming::standard()),
            Arc::new(PathSelectors::any()),
        );
        assert!(reader.read(&absent).unwrap().is_empty());
    }

    struct CountingReader(AtomicUsize);

    impl OperationReader for CountingReader {
        fn read(&self, context: &RouteContext) -> Result<Vec<Operation>> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Operation {
                method: HttpMethod::Get,
                operation_id: format!("op{}", n),
                summary: context.request_mapping_pattern().to_string(),
                parameters: Vec::new(),
                response_type: ResolvedType::void(),
                response_model: None,
            }])
        }
    }

    #[test]
    fn test_caching_reader_reads_equivalent_contexts_once() {
        let (_, methods) = pets_registry();
        let delegate = Arc::new(CountingReader(AtomicUsize::new(0)));
        let caching = CachingOperationReader::new(Arc::clone(&delegate));

        let first = caching.read(&context(methods[0].clone(), &[HttpMethod::Get])).unwrap();
        // A separately built but equivalent context is a hit
        let second = caching.read(&context(methods[0].clone(), &[HttpMethod::Get])).unwrap();
        let other_path = caching
            .read(&context(methods[0].clone(), &[HttpMethod::Get]).copy_pattern_using("/animals"))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(other_path[0].operation_id, "op1");
        assert_eq!(delegate.0.load(Ordering::SeqCst), 2);
    }
}
