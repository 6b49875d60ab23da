//! Assembly of API descriptions from route contexts.
//!
//! [`ApiDescriptionReader::read`] expands a route into one description per
//! selected path, in lexicographic path order, and records each in the shared
//! [`ApiDescriptionLookup`] under the route's handler method.

use crate::context::RouteContext;
use crate::error::Result;
use crate::handler::MethodIdentity;
use crate::operation::{Operation, OperationReader};
use crate::plugins::{DocumentationPluginsManager, Extensions, PathContext};
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// The operations documented under one path of one route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiDescription {
    pub path: String,
    pub description: String,
    pub operations: Vec<Operation>,
    pub hidden: bool,
    /// Path-level extensions contributed by decorators
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub decoration: Extensions,
}

/// Descriptions recorded per handler method during a scan.
///
/// Entries are only ever inserted whole; a method served under several paths
/// keeps the description of the last path read.
#[derive(Debug, Default)]
pub struct ApiDescriptionLookup {
    descriptions: RwLock<HashMap<MethodIdentity, ApiDescription>>,
}

impl ApiDescriptionLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, method: MethodIdentity, description: ApiDescription) {
        self.descriptions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(method, description);
    }

    pub fn description_for(&self, method: &MethodIdentity) -> Option<ApiDescription> {
        self.descriptions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(method)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.descriptions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ApiDescriptionReader {
    operation_reader: Arc<dyn OperationReader>,
    plugins: Arc<DocumentationPluginsManager>,
    lookup: Arc<ApiDescriptionLookup>,
}

impl ApiDescriptionReader {
    pub fn new(
        operation_reader: Arc<dyn OperationReader>,
        plugins: Arc<DocumentationPluginsManager>,
        lookup: Arc<ApiDescriptionLookup>,
    ) -> Self {
        Self {
            operation_reader,
            plugins,
            lookup,
        }
    }

    pub fn lookup(&self) -> &ApiDescriptionLookup {
        &self.lookup
    }

    /// Descriptions of every selected path of the route, sorted by path
    pub fn read(&self, outer: &RouteContext) -> Result<Vec<ApiDescription>> {
        let selector = outer.selector();
        // Patterns are kept in a BTreeSet, so iteration is already lexicographic
        let paths: Vec<&str> = outer
            .route_info()
            .patterns
            .iter()
            .map(String::as_str)
            .filter(|path| selector.matches(path))
            .collect();
        if paths.is_empty() {
            debug!("No selected paths for {:?}", outer.route_info().patterns);
            return Ok(Vec::new());
        }

        let mut descriptions = Vec::with_capacity(paths.len());
        for path in paths {
            let route = outer.copy_pattern_using(path);
            let operations = self.operation_reader.read(&route)?;
            let Some(first) = operations.first() else {
                debug!("No operations for {}, omitting", path);
                continue;
            };

            let decoration = self.plugins.decorator(&PathContext {
                route: &route,
                operation: first,
                operation_count: operations.len(),
            });
            let description = ApiDescription {
                path: path.to_string(),
                description: route
                    .handler_method()
                    .map(|h| h.name().to_string())
                    .unwrap_or_default(),
                operations,
                hidden: false,
                decoration,
            };

            if let Some(handler) = outer.handler_method() {
                self.lookup.add(handler.identity(), description.clone());
            }
            descriptions.push(description);
        }
        Ok(descriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ApiSelector, HttpMethod, PathSelectors, RouteInfo};
    use crate::error::Error;
    use crate::handler::{HandlerMethod, MethodDecl};
    use crate::naming::GenericNaming;
    use crate::type_resolver::ResolvedType;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Produces one GET operation per path and records the paths it saw
    #[derive(Default)]
    struct RecordingReader {
        seen: Mutex<Vec<String>>,
        empty: bool,
    }

    impl OperationReader for RecordingReader {
        fn read(&self, context: &RouteContext) -> Result<Vec<Operation>> {
            let path = context.request_mapping_pattern().to_string();
            self.seen.lock().unwrap().push(path.clone());
            if self.empty {
                return Ok(Vec::new());
            }
            Ok(vec![Operation {
                method: HttpMethod::Get,
                operation_id: format!("get{}", path.replace('/', "_")),
                summary: path,
                parameters: Vec::new(),
                response_type: ResolvedType::void(),
                response_model: None,
            }])
        }
    }

    struct FailingReader;

    impl OperationReader for FailingReader {
        fn read(&self, _context: &RouteContext) -> Result<Vec<Operation>> {
            Err(Error::ModelResolution("Pet".to_string()))
        }
    }

    fn handler() -> Arc<HandlerMethod> {
        Arc::new(HandlerMethod::new("Pets", "Pets", MethodDecl::new("list")))
    }

    fn route(selector: ApiSelector) -> RouteContext {
        RouteContext::new(
            Some(handler()),
            RouteInfo::new(["/b", "/a", "/c"], &[HttpMethod::Get]),
            Arc::new(GenericNaming::standard()),
            Arc::new(selector),
        )
    }

    fn reader(operations: Arc<dyn OperationReader>) -> ApiDescriptionReader {
        ApiDescriptionReader::new(
            operations,
            Arc::new(DocumentationPluginsManager::default()),
            Arc::new(ApiDescriptionLookup::new()),
        )
    }

    #[test]
    fn test_paths_are_sorted() {
        let operations = Arc::new(RecordingReader::default());
        let reader = reader(operations.clone());

        let descriptions = reader.read(&route(PathSelectors::any())).unwrap();

        let paths: Vec<&str> = descriptions.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
        assert_eq!(*operations.seen.lock().unwrap(), vec!["/a", "/b", "/c"]);
        assert!(descriptions.iter().all(|d| !d.hidden && d.description == "list"));
        assert_eq!(descriptions[0].decoration["x-handler"], serde_json::json!("Pets::list"));
    }

    #[test]
    fn test_selector_filters_paths() {
        let reader = reader(Arc::new(RecordingReader::default()));

        let selected = reader
            .read(&route(ApiSelector::new(|p| p != "/b")))
            .unwrap();
        let paths: Vec<&str> = selected.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/c"]);

        let none = reader.read(&route(PathSelectors::none())).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_lookup_records_outer_handler() {
        let reader = reader(Arc::new(RecordingReader::default()));
        reader.read(&route(PathSelectors::any())).unwrap();

        let recorded = reader.lookup().description_for(&handler().identity()).unwrap();
        assert_eq!(recorded.path, "/c");
        assert_eq!(reader.lookup().len(), 1);
    }

    #[test]
    fn test_empty_operations_are_omitted() {
        let operations = Arc::new(RecordingReader {
            empty: true,
            ..Default::default()
        });
        let reader = reader(operations.clone());

        assert!(reader.read(&route(PathSelectors::any())).unwrap().is_empty());
        assert_eq!(operations.seen.lock().unwrap().len(), 3);
        assert!(reader.lookup().description_for(&handler().identity()).is_none());
        assert!(reader.lookup().is_empty());
    }

    #[test]
    fn test_reader_failure_propagates() {
        let reader = reader(Arc::new(FailingReader));
        assert!(matches!(
            reader.read(&route(PathSelectors::any())),
            Err(Error::ModelResolution(_))
        ));
    }

    #[test]
    fn test_concurrent_additions_are_all_kept() {
        let lookup = Arc::new(ApiDescriptionLookup::new());
        let description = |path: &str| ApiDescription {
            path: path.to_string(),
            description: "list".to_string(),
            operations: Vec::new(),
            hidden: false,
            decoration: Extensions::new(),
        };

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let lookup = Arc::clone(&lookup);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        let method = MethodDecl::new(&format!("handler_{}_{}", worker, n));
                        let handler = HandlerMethod::new("Pets", "Pets", method);
                        lookup.add(handler.identity(), description(&format!("/{}/{}", worker, n)));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(lookup.len(), 400);
        let method = HandlerMethod::new("Pets", "Pets", MethodDecl::new("handler_7_49"));
        assert_eq!(lookup.description_for(&method.identity()).unwrap().path, "/7/49");
    }
}
