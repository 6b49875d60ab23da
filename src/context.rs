//! Route contexts: the unit of work that drives description generation.

use crate::handler::HandlerMethod;
use crate::naming::GenericNaming;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// HTTP methods a route can be mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Parses a route attribute name such as `get` or `post`
    pub fn from_attribute(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            "head" => Some(HttpMethod::Head),
            "options" => Some(HttpMethod::Options),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw mapping of a route: its path patterns and HTTP methods
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteInfo {
    pub patterns: BTreeSet<String>,
    pub methods: BTreeSet<HttpMethod>,
}

impl RouteInfo {
    pub fn new<I, S>(patterns: I, methods: &[HttpMethod]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            methods: methods.iter().copied().collect(),
        }
    }
}

/// Selects which paths are documented
pub struct ApiSelector {
    path_selector: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl ApiSelector {
    pub fn new(path_selector: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            path_selector: Box::new(path_selector),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        (self.path_selector)(path)
    }
}

impl Default for ApiSelector {
    fn default() -> Self {
        PathSelectors::any()
    }
}

impl fmt::Debug for ApiSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSelector").finish_non_exhaustive()
    }
}

/// Common path selectors
pub struct PathSelectors;

impl PathSelectors {
    pub fn any() -> ApiSelector {
        ApiSelector::new(|_| true)
    }

    pub fn none() -> ApiSelector {
        ApiSelector::new(|_| false)
    }

    /// Paths starting with `prefix`
    pub fn prefix(prefix: &str) -> ApiSelector {
        let prefix = prefix.to_string();
        ApiSelector::new(move |path| path.starts_with(&prefix))
    }
}

/// A registered route bundled with the policies that apply to it.
///
/// Contexts are never mutated; [`RouteContext::copy_pattern_using`] yields a
/// new context bound to a single path that shares everything else.
#[derive(Debug, Clone)]
pub struct RouteContext {
    handler_method: Option<Arc<HandlerMethod>>,
    route_info: Arc<RouteInfo>,
    request_mapping_pattern: String,
    naming: Arc<GenericNaming>,
    selector: Arc<ApiSelector>,
}

impl RouteContext {
    pub fn new(
        handler_method: Option<Arc<HandlerMethod>>,
        route_info: RouteInfo,
        naming: Arc<GenericNaming>,
        selector: Arc<ApiSelector>,
    ) -> Self {
        Self {
            handler_method,
            route_info: Arc::new(route_info),
            request_mapping_pattern: String::new(),
            naming,
            selector,
        }
    }

    pub fn copy_pattern_using(&self, path: &str) -> Self {
        Self {
            request_mapping_pattern: path.to_string(),
            ..self.clone()
        }
    }

    pub fn handler_method(&self) -> Option<&HandlerMethod> {
        self.handler_method.as_deref()
    }

    pub fn route_info(&self) -> &RouteInfo {
        &self.route_info
    }

    /// The single path this context is bound to, empty before specialization
    pub fn request_mapping_pattern(&self) -> &str {
        &self.request_mapping_pattern
    }

    pub fn naming(&self) -> &GenericNaming {
        &self.naming
    }

    pub fn selector(&self) -> &ApiSelector {
        &self.selector
    }
}
