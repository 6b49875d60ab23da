//! Handler method metadata.
//!
//! These structures stand in for the reflective method objects a web framework
//! would hand over at route registration time: a method declaration with its
//! parameter annotations, the bean type that serves it, and a hashable
//! identity used to key caches and lookups.

use crate::type_resolver::{ResolvedType, TypeExpr};
use serde::Serialize;
use std::fmt;

/// Annotation attached to a handler parameter.
///
/// Each variant carries the name the annotation assigns to the parameter, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamAnnotation {
    /// `#[path("id")]` - bound from a path segment
    PathVariable(String),
    /// `#[query("q")]` - bound from the query string
    RequestParam { name: String, required: bool },
    /// `#[header("X-Id")]` - bound from a request header
    RequestHeader(String),
    /// `#[model("m")]` - bound from form/query fields into a model
    ModelAttribute(String),
    /// `#[body]` - the request body
    RequestBody,
}

impl ParamAnnotation {
    /// The parameter name carried by the annotation, empty names excluded
    pub fn value(&self) -> Option<&str> {
        let value = match self {
            ParamAnnotation::PathVariable(name)
            | ParamAnnotation::RequestHeader(name)
            | ParamAnnotation::ModelAttribute(name)
            | ParamAnnotation::RequestParam { name, .. } => name.as_str(),
            ParamAnnotation::RequestBody => "",
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// A declared method parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamDecl {
    /// The binding identifier in source, if it was a plain identifier
    pub binding: Option<String>,
    /// Declared type, generics unresolved
    pub ty: TypeExpr,
    /// Annotations in declaration order
    pub annotations: Vec<ParamAnnotation>,
}

impl ParamDecl {
    pub fn new(binding: &str, ty: TypeExpr) -> Self {
        Self {
            binding: Some(binding.to_string()),
            ty,
            annotations: Vec::new(),
        }
    }

    pub fn unnamed(ty: TypeExpr) -> Self {
        Self {
            binding: None,
            ty,
            annotations: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: ParamAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// A method as declared in a trait or impl block
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDecl {
    pub name: String,
    pub parameters: Vec<ParamDecl>,
    pub return_type: TypeExpr,
    /// Marked `#[hidden]`: operation readers skip it
    pub hidden: bool,
}

impl MethodDecl {
    /// Creates a method with no parameters returning `()`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
            return_type: TypeExpr::Unit,
            hidden: false,
        }
    }

    pub fn with_param(mut self, param: ParamDecl) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn returning(mut self, return_type: TypeExpr) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn parameter_types(&self) -> Vec<TypeExpr> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }
}

/// Value identity of a declared method.
///
/// Two identities are equal when the serving type, declaring type, name,
/// parameter types and return type all match. A trait method served by two
/// implementors has two identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MethodIdentity {
    pub bean_type: String,
    pub declaring_type: String,
    pub name: String,
    pub parameter_types: Vec<TypeExpr>,
    pub return_type: TypeExpr,
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameter_types.iter().map(|t| t.to_string()).collect();
        if self.bean_type == self.declaring_type {
            write!(f, "{}", self.declaring_type)?;
        } else {
            write!(f, "<{} as {}>", self.bean_type, self.declaring_type)?;
        }
        write!(
            f,
            "::{}({}) -> {}",
            self.name,
            params.join(", "),
            self.return_type
        )
    }
}

/// A route's handler: the declared method plus the bean type serving it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerMethod {
    /// Runtime type of the bean the route dispatches to
    pub bean_type: String,
    /// Type (trait or impl self type) the method was declared on
    pub declaring_type: String,
    pub method: MethodDecl,
}

impl HandlerMethod {
    pub fn new(bean_type: &str, declaring_type: &str, method: MethodDecl) -> Self {
        Self {
            bean_type: bean_type.to_string(),
            declaring_type: declaring_type.to_string(),
            method,
        }
    }

    pub fn name(&self) -> &str {
        &self.method.name
    }

    pub fn identity(&self) -> MethodIdentity {
        MethodIdentity {
            bean_type: self.bean_type.clone(),
            declaring_type: self.declaring_type.clone(),
            name: self.method.name.clone(),
            parameter_types: self.method.parameter_types(),
            return_type: self.method.return_type.clone(),
        }
    }

    /// Parameter metadata in declaration order
    pub fn method_parameters(&self) -> Vec<MethodParameter> {
        self.method
            .parameters
            .iter()
            .enumerate()
            .map(|(index, param)| MethodParameter {
                index,
                declared_type: param.ty.clone(),
                annotations: param.annotations.clone(),
            })
            .collect()
    }
}

/// Metadata of one source parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodParameter {
    pub index: usize,
    pub declared_type: TypeExpr,
    pub annotations: Vec<ParamAnnotation>,
}

impl MethodParameter {
    pub fn has_annotation(&self, matches: impl Fn(&ParamAnnotation) -> bool) -> bool {
        self.annotations.iter().any(matches)
    }
}

/// A source parameter paired with its resolved type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedMethodParameter {
    pub parameter: MethodParameter,
    pub resolved_type: ResolvedType,
}
