use crate::context::{HttpMethod, RouteInfo};
use crate::extractor::{ApiMeta, ExtractedApi, HandlerExtractor, HandlerRegistration};
use crate::handler::{HandlerMethod, MethodDecl, ParamAnnotation, ParamDecl};
use crate::source::SourceFile;
use crate::type_resolver::{ImplDecl, TraitDecl, TypeDecl, TypeExpr, TypeRegistry, ANY};
use log::{debug, warn};
use syn::punctuated::Punctuated;
use syn::{
    visit::Visit, Attribute, FnArg, GenericArgument, GenericParam, Generics, ImplItem, LitBool, LitStr,
    Pat, PathArguments, ReturnType, Signature, Token, TraitItem, Type, TypeParamBound,
};

/// Extractor for controller-style handlers: routed methods declared in impl
/// and trait blocks with `#[get("/path")]`-like attributes
pub struct ControllerExtractor;

impl HandlerExtractor for ControllerExtractor {
    fn extract(&self, files: &[SourceFile]) -> ExtractedApi {
        let mut visitor = ControllerVisitor::default();

        // First pass: types, traits, impls and routes from every file
        for file in files {
            debug!("Extracting handlers from {}", file.path.display());
            visitor.visit_file(&file.syntax_tree);
        }

        // Trait routes need the complete set of implementors
        visitor.register_trait_routes();

        ExtractedApi {
            registry: visitor.registry,
            registrations: visitor.registrations,
        }
    }
}

/// A route declared on a trait method, registered once per implementor
struct TraitRoute {
    trait_name: String,
    method: MethodDecl,
    route_info: RouteInfo,
    api: ApiMeta,
}

/// Names in scope while converting type syntax
#[derive(Default, Clone)]
struct TypeScope {
    generics: Vec<String>,
    self_type: Option<String>,
}

impl TypeScope {
    fn with_generics(&self, generics: &Generics) -> Self {
        let mut scope = self.clone();
        scope.generics.extend(type_params(generics));
        scope
    }
}

#[derive(Default)]
struct ControllerVisitor {
    registry: TypeRegistry,
    registrations: Vec<HandlerRegistration>,
    trait_routes: Vec<TraitRoute>,
}

impl ControllerVisitor {
    fn register_trait_routes(&mut self) {
        for route in self.trait_routes.drain(..) {
            let implementors: Vec<String> = self
                .registry
                .implementors_of(&route.trait_name)
                .into_iter()
                .map(str::to_string)
                .collect();
            if implementors.is_empty() {
                warn!(
                    "Route on {}::{} has no implementing type, skipping",
                    route.trait_name, route.method.name
                );
                continue;
            }
            for bean_type in implementors {
                debug!("Registering {}::{} for {}", route.trait_name, route.method.name, bean_type);
                self.registrations.push(HandlerRegistration::new(
                    HandlerMethod::new(&bean_type, &route.trait_name, route.method.clone()),
                    route.route_info.clone(),
                    route.api.clone(),
                ));
            }
        }
    }
}

impl<'ast> Visit<'ast> for ControllerVisitor {
    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        let name = node.ident.to_string();
        let mut decl = if has_attr(&node.attrs, "proxy") {
            TypeDecl::proxy(&name)
        } else {
            TypeDecl::concrete(&name)
        };
        decl.generics = type_params(&node.generics);

        let scope = TypeScope::default().with_generics(&node.generics);
        for (index, field) in node.fields.iter().enumerate() {
            let field_name = field
                .ident
                .as_ref()
                .map(|i| i.to_string())
                .unwrap_or_else(|| index.to_string());
            decl = decl.with_field(&field_name, type_expr(&field.ty, &scope));
        }
        self.registry.register_type(decl);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        let mut decl = TypeDecl::concrete(&node.ident.to_string());
        decl.generics = type_params(&node.generics);
        decl.variants = node.variants.iter().map(|v| v.ident.to_string()).collect();
        self.registry.register_type(decl);
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        let trait_name = node.ident.to_string();
        let scope = TypeScope::default().with_generics(&node.generics);
        let prefix = scope_prefix(&node.attrs);
        let api = api_meta(&node.attrs);

        let mut decl = TraitDecl::new(&trait_name);
        decl.generics = type_params(&node.generics);
        for bound in &node.supertraits {
            if let TypeParamBound::Trait(bound) = bound {
                if let Some(segment) = bound.path.segments.last() {
                    decl = decl.with_supertrait(&segment.ident.to_string());
                }
            }
        }

        for item in &node.items {
            let TraitItem::Fn(method) = item else {
                continue;
            };
            let method_decl = method_decl(&method.sig, &method.attrs, &scope);
            if let Some(route_info) = route_info(&method.attrs, &prefix) {
                self.trait_routes.push(TraitRoute {
                    trait_name: trait_name.clone(),
                    method: method_decl.clone(),
                    route_info,
                    api: api.clone(),
                });
            }
            decl = if method.default.is_some() {
                decl.with_default_method(method_decl)
            } else {
                decl.with_method(method_decl)
            };
        }
        self.registry.register_trait(decl);
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        let Some(self_type) = type_name(&node.self_ty) else {
            debug!("Skipping impl block for an unnamed type");
            return;
        };
        let scope = TypeScope {
            self_type: Some(self_type.clone()),
            ..TypeScope::default()
        }
        .with_generics(&node.generics);
        let prefix = scope_prefix(&node.attrs);
        let api = api_meta(&node.attrs);

        let mut decl = match &node.trait_ {
            Some((_, path, _)) => ImplDecl::of_trait(path_expr(path, &scope), &self_type),
            None => ImplDecl::inherent(&self_type),
        };

        for item in &node.items {
            match item {
                ImplItem::Type(assoc) => {
                    decl = decl.with_associated_type(&assoc.ident.to_string(), type_expr(&assoc.ty, &scope));
                }
                ImplItem::Fn(method) => {
                    let method_decl = method_decl(&method.sig, &method.attrs, &scope);
                    if let Some(route_info) = route_info(&method.attrs, &prefix) {
                        self.registrations.push(HandlerRegistration::new(
                            HandlerMethod::new(&self_type, &self_type, method_decl.clone()),
                            route_info,
                            api.clone(),
                        ));
                    }
                    decl = decl.with_method(method_decl);
                }
                _ => {}
            }
        }
        self.registry.register_impl(decl);
    }
}

fn has_attr(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|a| a.path().is_ident(name))
}

fn type_params(generics: &Generics) -> Vec<String> {
    generics
        .params
        .iter()
        .filter_map(|p| match p {
            GenericParam::Type(t) => Some(t.ident.to_string()),
            _ => None,
        })
        .collect()
}

/// Last path segment of a named type
fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// Converts type syntax into a [`TypeExpr`]
fn type_expr(ty: &Type, scope: &TypeScope) -> TypeExpr {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => path_expr(&type_path.path, scope),
        Type::Reference(reference) => type_expr(&reference.elem, scope),
        Type::Paren(paren) => type_expr(&paren.elem, scope),
        Type::Group(group) => type_expr(&group.elem, scope),
        Type::Tuple(tuple) if tuple.elems.is_empty() => TypeExpr::Unit,
        Type::Tuple(tuple) => TypeExpr::generic("Tuple", tuple.elems.iter().map(|t| type_expr(t, scope)).collect()),
        Type::Slice(slice) => TypeExpr::generic("Vec", vec![type_expr(&slice.elem, scope)]),
        Type::Array(array) => TypeExpr::generic("Vec", vec![type_expr(&array.elem, scope)]),
        Type::ImplTrait(impl_trait) => impl_trait
            .bounds
            .iter()
            .find_map(|b| match b {
                TypeParamBound::Trait(bound) => Some(path_expr(&bound.path, scope)),
                _ => None,
            })
            .unwrap_or_else(|| TypeExpr::named(ANY)),
        _ => TypeExpr::named(ANY),
    }
}

fn path_expr(path: &syn::Path, scope: &TypeScope) -> TypeExpr {
    let segments: Vec<&syn::PathSegment> = path.segments.iter().collect();
    match segments.as_slice() {
        [first, assoc] if first.ident == "Self" => return TypeExpr::SelfAssoc(assoc.ident.to_string()),
        [only] if only.ident == "Self" => {
            if let Some(self_type) = &scope.self_type {
                return TypeExpr::named(self_type);
            }
        }
        _ => {}
    }

    let Some(last) = segments.last() else {
        return TypeExpr::named(ANY);
    };
    let name = last.ident.to_string();
    let args: Vec<TypeExpr> = match &last.arguments {
        PathArguments::AngleBracketed(angle) => angle
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(type_expr(ty, scope)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    if args.is_empty() && scope.generics.contains(&name) {
        TypeExpr::Variable(name)
    } else {
        TypeExpr::generic(&name, args)
    }
}

fn method_decl(sig: &Signature, attrs: &[Attribute], scope: &TypeScope) -> MethodDecl {
    let scope = scope.with_generics(&sig.generics);
    let mut decl = MethodDecl::new(&sig.ident.to_string());

    for input in &sig.inputs {
        // The receiver is not a parameter of the operation
        let FnArg::Typed(pat_type) = input else {
            continue;
        };
        let ty = type_expr(&pat_type.ty, &scope);
        let mut param = match pat_type.pat.as_ref() {
            Pat::Ident(ident) => ParamDecl::new(&ident.ident.to_string(), ty),
            _ => ParamDecl::unnamed(ty),
        };
        for attr in &pat_type.attrs {
            if let Some(annotation) = param_annotation(attr) {
                param = param.annotated(annotation);
            }
        }
        decl = decl.with_param(param);
    }

    if let ReturnType::Type(_, ty) = &sig.output {
        decl = decl.returning(type_expr(ty, &scope));
    }
    if has_attr(attrs, "hidden") {
        decl = decl.hidden();
    }
    decl
}

/// The single string argument of `#[attr("value")]`, empty for a bare `#[attr]`
fn string_arg(attr: &Attribute) -> Option<String> {
    match &attr.meta {
        syn::Meta::Path(_) => Some(String::new()),
        _ => attr.parse_args::<LitStr>().ok().map(|lit| lit.value()),
    }
}

fn param_annotation(attr: &Attribute) -> Option<ParamAnnotation> {
    let name = attr.path().get_ident()?.to_string();
    let annotation = match name.as_str() {
        "path" => ParamAnnotation::PathVariable(string_arg(attr)?),
        "header" => ParamAnnotation::RequestHeader(string_arg(attr)?),
        "model" => ParamAnnotation::ModelAttribute(string_arg(attr)?),
        "body" => ParamAnnotation::RequestBody,
        "query" => query_annotation(attr)?,
        _ => return None,
    };
    Some(annotation)
}

/// `#[query]`, `#[query("q")]` or `#[query(name = "q", required = false)]`
fn query_annotation(attr: &Attribute) -> Option<ParamAnnotation> {
    if let Some(name) = string_arg(attr) {
        return Some(ParamAnnotation::RequestParam { name, required: true });
    }

    let mut name = String::new();
    let mut required = true;
    let parsed = attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            name = meta.value()?.parse::<LitStr>()?.value();
        } else if meta.path.is_ident("required") {
            required = meta.value()?.parse::<LitBool>()?.value;
        } else {
            return Err(meta.error("unsupported query property"));
        }
        Ok(())
    });
    match parsed {
        Ok(()) => Some(ParamAnnotation::RequestParam { name, required }),
        Err(e) => {
            warn!("Ignoring malformed #[query] attribute: {}", e);
            None
        }
    }
}

fn scope_prefix(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .find(|a| a.path().is_ident("scope"))
        .and_then(string_arg)
        .unwrap_or_default()
}

/// `#[api(description = "...", tags("a", "b"))]`
fn api_meta(attrs: &[Attribute]) -> ApiMeta {
    let mut api = ApiMeta::default();
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("api")) else {
        return api;
    };

    let parsed = attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("description") {
            api.description = Some(meta.value()?.parse::<LitStr>()?.value());
        } else if meta.path.is_ident("tags") {
            let content;
            syn::parenthesized!(content in meta.input);
            let tags = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
            api.tags = tags.iter().map(LitStr::value).collect();
        } else {
            return Err(meta.error("unsupported api property"));
        }
        Ok(())
    });
    if let Err(e) = parsed {
        warn!("Ignoring malformed #[api] attribute: {}", e);
    }
    api
}

/// Route mapping of a method: its patterns, prefixed with the block scope,
/// and its HTTP methods
fn route_info(attrs: &[Attribute], prefix: &str) -> Option<RouteInfo> {
    let mut patterns: Vec<String> = Vec::new();
    let mut methods: Vec<HttpMethod> = Vec::new();
    let mut routed = false;

    for attr in attrs {
        let Some(ident) = attr.path().get_ident() else {
            continue;
        };
        let attr_name = ident.to_string();
        let method = HttpMethod::from_attribute(&attr_name);
        if method.is_none() && attr_name != "request_mapping" {
            continue;
        }

        let paths = match &attr.meta {
            syn::Meta::Path(_) => vec![String::new()],
            _ => match attr.parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated) {
                Ok(paths) => paths.iter().map(LitStr::value).collect(),
                Err(e) => {
                    warn!("Ignoring malformed #[{}] attribute: {}", attr_name, e);
                    continue;
                }
            },
        };
        routed = true;
        patterns.extend(paths.iter().map(|p| combine_paths(prefix, p)));
        methods.extend(method);
    }

    routed.then(|| RouteInfo::new(patterns, &methods))
}

/// Combine scope and path, handling slashes correctly
fn combine_paths(scope: &str, path: &str) -> String {
    if scope.is_empty() {
        return if path.is_empty() { "/".to_string() } else { path.to_string() };
    }

    let scope = scope.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        scope.to_string()
    } else {
        format!("{}/{}", scope, path)
    }
}
