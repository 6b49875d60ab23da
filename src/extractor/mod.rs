//! Handler extraction from parsed source files.
//!
//! An extractor walks the syntax trees of a project and produces the two
//! inputs of a documentation scan: a [`TypeRegistry`] describing the
//! program's types, traits and impl blocks, and one [`HandlerRegistration`]
//! per routed method.
//!
//! # Example
//!
//! ```no_run
//! use openapi_from_handlers::extractor::{controller::ControllerExtractor, HandlerExtractor};
//! use openapi_from_handlers::source::SourceSet;
//! use std::path::Path;
//!
//! let sources = SourceSet::load(Path::new("./my-project")).unwrap();
//! let extracted = ControllerExtractor.extract(&sources.files);
//! println!("Found {} handlers", extracted.registrations.len());
//! ```

pub mod controller;

use crate::context::RouteInfo;
use crate::handler::HandlerMethod;
use crate::source::SourceFile;
use crate::type_resolver::TypeRegistry;
use std::sync::Arc;

/// Extracts handler registrations from parsed Rust files.
pub trait HandlerExtractor {
    fn extract(&self, files: &[SourceFile]) -> ExtractedApi;
}

/// Everything an extractor found in a project
#[derive(Debug, Default)]
pub struct ExtractedApi {
    pub registry: TypeRegistry,
    pub registrations: Vec<HandlerRegistration>,
}

/// Listing metadata declared on the block that holds a handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiMeta {
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// A routed handler method as registered with the framework
#[derive(Debug, Clone)]
pub struct HandlerRegistration {
    pub handler: Arc<HandlerMethod>,
    pub route_info: RouteInfo,
    pub api: ApiMeta,
}

impl HandlerRegistration {
    pub fn new(handler: HandlerMethod, route_info: RouteInfo, api: ApiMeta) -> Self {
        Self {
            handler: Arc::new(handler),
            route_info,
            api,
        }
    }
}
