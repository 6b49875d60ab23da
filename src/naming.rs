//! Naming policies.
//!
//! [`GenericNaming`] renders resolved generic types as model names and is part
//! of every operation cache key. [`ParameterNameReader`] decides the
//! documented name of a handler parameter from an ordered list of
//! [`ParameterNamingStrategy`]s, the names discovered in source, and finally
//! a positional default.

use crate::handler::{HandlerMethod, MethodParameter, ParamAnnotation};
use crate::type_resolver::ResolvedType;
use log::debug;

/// How generic type names are rendered in the generated document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericNaming {
    pub open_generic: String,
    pub close_generic: String,
    pub list_delimiter: String,
}

impl GenericNaming {
    /// `Page«Pet»`, `Map«string,Pet»`
    pub fn standard() -> Self {
        Self {
            open_generic: "«".to_string(),
            close_generic: "»".to_string(),
            list_delimiter: ",".to_string(),
        }
    }

    /// Identifier-safe names for code generators: `PageOfPet`, `MapOfstringAndPet`
    pub fn codegen() -> Self {
        Self {
            open_generic: "Of".to_string(),
            close_generic: String::new(),
            list_delimiter: "And".to_string(),
        }
    }

    /// Renders a resolved type as a model name
    pub fn type_name(&self, resolved: &ResolvedType) -> String {
        if resolved.type_parameters.is_empty() {
            return resolved.erased_type.clone();
        }
        let params: Vec<String> = resolved
            .type_parameters
            .iter()
            .map(|p| self.type_name(p))
            .collect();
        format!(
            "{}{}{}{}",
            resolved.erased_type,
            self.open_generic,
            params.join(&self.list_delimiter),
            self.close_generic
        )
    }
}

impl Default for GenericNaming {
    fn default() -> Self {
        Self::standard()
    }
}

/// A pure policy proposing a parameter name from its metadata.
///
/// `Some("")` means the strategy applies but names nothing.
pub trait ParameterNamingStrategy: Send + Sync {
    fn name_of(&self, parameter: &MethodParameter) -> Option<String>;
}

/// Takes the name from the first annotation accepted by `select`
pub struct AnnotationNaming {
    select: fn(&ParamAnnotation) -> bool,
}

impl AnnotationNaming {
    pub fn path_variable() -> Self {
        Self {
            select: |a| matches!(a, ParamAnnotation::PathVariable(_)),
        }
    }

    pub fn model_attribute() -> Self {
        Self {
            select: |a| matches!(a, ParamAnnotation::ModelAttribute(_)),
        }
    }

    pub fn request_param() -> Self {
        Self {
            select: |a| matches!(a, ParamAnnotation::RequestParam { .. }),
        }
    }

    pub fn request_header() -> Self {
        Self {
            select: |a| matches!(a, ParamAnnotation::RequestHeader(_)),
        }
    }
}

impl ParameterNamingStrategy for AnnotationNaming {
    fn name_of(&self, parameter: &MethodParameter) -> Option<String> {
        parameter
            .annotations
            .iter()
            .find(|a| (self.select)(a))
            .map(|a| a.value().unwrap_or_default().to_string())
    }
}

/// Supplies the parameter names recorded for a method, by index
pub trait ParameterNameDiscoverer: Send + Sync {
    fn parameter_names(&self, method: &HandlerMethod) -> Option<Vec<String>>;
}

/// Discovers names from the binding identifiers written in source
pub struct SourceBindingDiscoverer;

impl ParameterNameDiscoverer for SourceBindingDiscoverer {
    fn parameter_names(&self, method: &HandlerMethod) -> Option<Vec<String>> {
        Some(
            method
                .method
                .parameters
                .iter()
                .map(|p| {
                    p.binding
                        .as_deref()
                        .filter(|b| !b.starts_with('_'))
                        .unwrap_or_default()
                        .to_string()
                })
                .collect(),
        )
    }
}

/// Decides documented parameter names.
///
/// Strategies are consulted in order and the first that applies decides; an
/// empty answer defers to the discovered binding name.
pub struct ParameterNameReader {
    strategies: Vec<Box<dyn ParameterNamingStrategy>>,
    discoverer: Box<dyn ParameterNameDiscoverer>,
}

impl ParameterNameReader {
    pub fn new(
        strategies: Vec<Box<dyn ParameterNamingStrategy>>,
        discoverer: Box<dyn ParameterNameDiscoverer>,
    ) -> Self {
        Self {
            strategies,
            discoverer,
        }
    }

    pub fn name_of(&self, method: &HandlerMethod, parameter: &MethodParameter) -> String {
        if let Some(name) = self
            .strategies
            .iter()
            .find_map(|s| s.name_of(parameter))
            .filter(|n| !n.is_empty())
        {
            return name;
        }

        if let Some(name) = self.discovered_name(method, parameter.index) {
            return name;
        }

        debug!(
            "No name found for parameter {} of {}, using positional default",
            parameter.index,
            method.name()
        );
        format!("param{}", parameter.index)
    }

    fn discovered_name(&self, method: &HandlerMethod, index: usize) -> Option<String> {
        self.discoverer
            .parameter_names(method)
            .and_then(|names| names.into_iter().nth(index))
            .filter(|name| !name.is_empty())
    }
}

impl Default for ParameterNameReader {
    fn default() -> Self {
        Self::new(
            vec![
                Box::new(AnnotationNaming::path_variable()),
                Box::new(AnnotationNaming::model_attribute()),
                Box::new(AnnotationNaming::request_param()),
                Box::new(AnnotationNaming::request_header()),
            ],
            Box::new(SourceBindingDiscoverer),
        )
    }
}
