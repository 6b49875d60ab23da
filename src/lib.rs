//! openapi-from-handlers - OpenAPI documentation from routed Rust handler methods.
//!
//! The library reads the request-handler methods of a Rust web project and
//! resolves what each one really accepts and returns. Handlers may be
//! inherited from generic traits, declared through associated types, or
//! served by proxy types; resolution walks the program's type, trait and impl
//! declarations to find the concrete signature before documenting it.
//!
//! # Architecture
//!
//! 1. [`source`] - Walks a project directory and parses its Rust files
//! 2. [`extractor`] - Collects types, traits, impls and routed handlers
//! 3. [`type_resolver`] - The type registry and generic substitution
//! 4. [`handler_resolver`] - Picks the most specific concrete method of a handler
//! 5. [`operation`] - Reads operations from a route, with a bounded cache
//! 6. [`api_description`] - One description per selected path of a route
//! 7. [`documentation`] - Groups descriptions into listings and collects models
//! 8. [`schema_generator`] and [`openapi_builder`] - Render the OpenAPI document
//! 9. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_handlers::{
//!     documentation::{DocumentationConfig, DocumentationScanner},
//!     extractor::{controller::ControllerExtractor, HandlerExtractor},
//!     openapi_builder::OpenApiBuilder,
//!     schema_generator::SchemaGenerator,
//!     serializer::serialize_yaml,
//!     source::SourceSet,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let sources = SourceSet::load(Path::new("./my-project")).unwrap();
//! let extracted = ControllerExtractor.extract(&sources.files);
//!
//! let registry = Arc::new(extracted.registry);
//! let scanner = DocumentationScanner::new(Arc::clone(&registry));
//! let documentation = scanner
//!     .scan(&DocumentationConfig::default(), &extracted.registrations)
//!     .unwrap();
//!
//! let schema_gen = SchemaGenerator::new(registry, documentation.naming.clone());
//! let document = OpenApiBuilder::from_documentation(&documentation, schema_gen);
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod api_description;
pub mod cache;
pub mod cli;
pub mod context;
pub mod documentation;
pub mod equivalence;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod handler_resolver;
pub mod model_dependency;
pub mod naming;
pub mod openapi_builder;
pub mod operation;
pub mod plugins;
pub mod schema_generator;
pub mod serializer;
pub mod source;
pub mod type_resolver;
