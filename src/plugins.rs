//! Path decoration plugins.
//!
//! Decorators see a route context bound to one path together with the first
//! operation read for it, and contribute vendor extensions that end up on the
//! path item of the generated document.

use crate::context::RouteContext;
use crate::operation::Operation;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

/// Vendor extensions keyed by their `x-` name
pub type Extensions = BTreeMap<String, Value>;

/// What a path decorator gets to look at
#[derive(Debug, Clone, Copy)]
pub struct PathContext<'a> {
    pub route: &'a RouteContext,
    pub operation: &'a Operation,
    /// Number of operations read for the path
    pub operation_count: usize,
}

pub trait PathDecorator: Send + Sync {
    fn name(&self) -> &str;

    fn decorate(&self, context: &PathContext<'_>, extensions: &mut Extensions);
}

/// Records the handler serving the path as `x-handler`
pub struct HandlerPathDecorator;

impl PathDecorator for HandlerPathDecorator {
    fn name(&self) -> &str {
        "handler"
    }

    fn decorate(&self, context: &PathContext<'_>, extensions: &mut Extensions) {
        if let Some(handler) = context.route.handler_method() {
            extensions.insert(
                "x-handler".to_string(),
                Value::String(format!("{}::{}", handler.bean_type, handler.name())),
            );
        }
    }
}

/// Records how many operations the path has as `x-operation-count`
pub struct OperationCountPathDecorator;

impl PathDecorator for OperationCountPathDecorator {
    fn name(&self) -> &str {
        "operation-count"
    }

    fn decorate(&self, context: &PathContext<'_>, extensions: &mut Extensions) {
        extensions.insert(
            "x-operation-count".to_string(),
            Value::from(context.operation_count),
        );
    }
}

/// Runs registered plugins in registration order
pub struct DocumentationPluginsManager {
    path_decorators: Vec<Box<dyn PathDecorator>>,
}

impl DocumentationPluginsManager {
    pub fn new() -> Self {
        Self {
            path_decorators: Vec::new(),
        }
    }

    pub fn with_path_decorator(mut self, decorator: impl PathDecorator + 'static) -> Self {
        self.path_decorators.push(Box::new(decorator));
        self
    }

    /// Extensions contributed by every decorator; later decorators win on
    /// conflicting keys
    pub fn decorator(&self, context: &PathContext<'_>) -> Extensions {
        let mut extensions = Extensions::new();
        for decorator in &self.path_decorators {
            debug!(
                "Decorating {} with {}",
                context.route.request_mapping_pattern(),
                decorator.name()
            );
            decorator.decorate(context, &mut extensions);
        }
        extensions
    }
}

impl Default for DocumentationPluginsManager {
    fn default() -> Self {
        Self::new()
            .with_path_decorator(HandlerPathDecorator)
            .with_path_decorator(OperationCountPathDecorator)
    }
}
