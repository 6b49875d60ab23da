//! Documentation assembly for a group of routes.
//!
//! A [`DocumentationScanner`] runs every registered route of a group through
//! the description reader, groups the resulting descriptions into one
//! [`ApiListing`] per serving type, collects the models the operations refer
//! to, and stores the outcome in a [`DocumentationCache`] keyed by group name.

use crate::api_description::{ApiDescription, ApiDescriptionLookup, ApiDescriptionReader};
use crate::context::{ApiSelector, PathSelectors, RouteContext};
use crate::error::Result;
use crate::extractor::{ApiMeta, HandlerRegistration};
use crate::handler_resolver::HandlerMethodResolver;
use crate::model_dependency::{
    CachingModelDependencyProvider, DefaultModelDependencyProvider, ModelContext, ModelDependencyProvider,
};
use crate::naming::{GenericNaming, ParameterNameReader};
use crate::operation::{CachingOperationReader, DefaultOperationReader, Operation, OperationIds, OperationReader};
use crate::plugins::DocumentationPluginsManager;
use crate::type_resolver::{ResolvedType, TypeRegistry};
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Name of the group used when none is configured
pub const DEFAULT_GROUP_NAME: &str = "default";

/// Descriptive metadata of the documented API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiInfo {
    pub title: String,
    pub description: String,
    pub version: String,
    pub terms_of_service_url: String,
    pub license: String,
    pub license_url: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "Api Documentation".to_string(),
            description: "Api Documentation".to_string(),
            version: "1.0".to_string(),
            terms_of_service_url: "urn:tos".to_string(),
            license: "Apache 2.0".to_string(),
            license_url: "http://www.apache.org/licenses/LICENSE-2.0".to_string(),
        }
    }
}

/// Settings of one documentation group
#[derive(Debug, Clone)]
pub struct DocumentationConfig {
    pub group_name: String,
    pub api_info: ApiInfo,
    pub naming: Arc<GenericNaming>,
    pub selector: Arc<ApiSelector>,
}

impl DocumentationConfig {
    pub fn with_group_name(mut self, group_name: &str) -> Self {
        self.group_name = group_name.to_string();
        self
    }

    pub fn with_api_info(mut self, api_info: ApiInfo) -> Self {
        self.api_info = api_info;
        self
    }

    pub fn with_naming(mut self, naming: GenericNaming) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    pub fn with_selector(mut self, selector: ApiSelector) -> Self {
        self.selector = Arc::new(selector);
        self
    }
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            group_name: DEFAULT_GROUP_NAME.to_string(),
            api_info: ApiInfo::default(),
            naming: Arc::new(GenericNaming::default()),
            selector: Arc::new(PathSelectors::any()),
        }
    }
}

/// Descriptions served by one type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiListing {
    /// The serving type
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub apis: Vec<ApiDescription>,
}

impl ApiListing {
    fn new(resource: &str, meta: &ApiMeta, group_name: &str) -> Self {
        let tags: BTreeSet<&str> = meta
            .tags
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .collect();
        let tags = if tags.is_empty() {
            vec![group_name.to_string()]
        } else {
            tags.into_iter().map(str::to_string).collect()
        };
        Self {
            resource: resource.to_string(),
            description: meta.description.clone(),
            tags,
            apis: Vec::new(),
        }
    }
}

/// The scanned documentation of one group
#[derive(Debug, Clone)]
pub struct Documentation {
    pub group_name: String,
    pub api_info: ApiInfo,
    pub naming: GenericNaming,
    /// Listings ordered by resource name
    pub listings: Vec<ApiListing>,
    /// Referenced models by rendered name
    pub models: BTreeMap<String, ResolvedType>,
}

impl Documentation {
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.listings
            .iter()
            .flat_map(|l| &l.apis)
            .flat_map(|d| &d.operations)
    }
}

/// Scanned documentation by group name
#[derive(Debug, Default)]
pub struct DocumentationCache {
    groups: RwLock<HashMap<String, Arc<Documentation>>>,
}

impl DocumentationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, documentation: Arc<Documentation>) {
        self.groups
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(documentation.group_name.clone(), documentation);
    }

    pub fn documentation_by_group(&self, group_name: &str) -> Option<Arc<Documentation>> {
        self.groups
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(group_name)
            .cloned()
    }

    /// Group names in sorted order
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.groups
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

pub struct DocumentationScanner {
    registry: Arc<TypeRegistry>,
    descriptions: ApiDescriptionReader,
    models: CachingModelDependencyProvider<DefaultModelDependencyProvider>,
    cache: Arc<DocumentationCache>,
}

impl DocumentationScanner {
    /// Wires the default readers and plugins over `registry`
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        let resolver = HandlerMethodResolver::new(registry.clone());
        let operations: Arc<dyn OperationReader> = Arc::new(CachingOperationReader::new(
            DefaultOperationReader::new(resolver, ParameterNameReader::default()),
        ));
        Self::with_readers(
            registry,
            operations,
            Arc::new(DocumentationPluginsManager::default()),
        )
    }

    pub fn with_readers(
        registry: Arc<TypeRegistry>,
        operations: Arc<dyn OperationReader>,
        plugins: Arc<DocumentationPluginsManager>,
    ) -> Self {
        Self {
            descriptions: ApiDescriptionReader::new(operations, plugins, Arc::new(ApiDescriptionLookup::new())),
            models: CachingModelDependencyProvider::new(DefaultModelDependencyProvider::new(registry.clone())),
            cache: Arc::new(DocumentationCache::new()),
            registry,
        }
    }

    pub fn lookup(&self) -> &ApiDescriptionLookup {
        self.descriptions.lookup()
    }

    pub fn cache(&self) -> Arc<DocumentationCache> {
        Arc::clone(&self.cache)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Documents `registrations` under the settings of `config`
    pub fn scan(
        &self,
        config: &DocumentationConfig,
        registrations: &[HandlerRegistration],
    ) -> Result<Arc<Documentation>> {
        info!(
            "Scanning {} route(s) for group '{}'",
            registrations.len(),
            config.group_name
        );

        let mut listings: BTreeMap<String, ApiListing> = BTreeMap::new();
        let mut models = BTreeMap::new();
        let mut operation_ids = OperationIds::new();
        for registration in registrations {
            let context = RouteContext::new(
                Some(Arc::clone(&registration.handler)),
                registration.route_info.clone(),
                Arc::clone(&config.naming),
                Arc::clone(&config.selector),
            );
            let mut descriptions = self.descriptions.read(&context)?;
            let Some(last) = descriptions.len().checked_sub(1) else {
                debug!("{} produced no descriptions", registration.handler.identity());
                continue;
            };

            // Ids are unique within the group, whichever reader produced them
            for operation in descriptions.iter_mut().flat_map(|d| d.operations.iter_mut()) {
                operation.operation_id = operation_ids.claim(&operation.operation_id);
            }
            self.lookup()
                .add(registration.handler.identity(), descriptions[last].clone());

            for operation in descriptions.iter().flat_map(|d| &d.operations) {
                self.collect_models(operation, &config.naming, &mut models)?;
            }

            let bean_type = &registration.handler.bean_type;
            listings
                .entry(bean_type.clone())
                .or_insert_with(|| ApiListing::new(bean_type, &registration.api, &config.group_name))
                .apis
                .extend(descriptions);
        }

        let mut listings: Vec<ApiListing> = listings.into_values().collect();
        for listing in &mut listings {
            listing.apis.sort_by(|a, b| a.path.cmp(&b.path));
        }

        let documentation = Arc::new(Documentation {
            group_name: config.group_name.clone(),
            api_info: config.api_info.clone(),
            naming: (*config.naming).clone(),
            listings,
            models,
        });
        info!(
            "Group '{}': {} listing(s), {} operation(s), {} model(s)",
            documentation.group_name,
            documentation.listings.len(),
            documentation.operations().count(),
            documentation.models.len()
        );
        self.cache.add(Arc::clone(&documentation));
        Ok(documentation)
    }

    /// Adds the response and parameter models of `operation`, with their
    /// dependencies, to `models`
    fn collect_models(
        &self,
        operation: &Operation,
        naming: &GenericNaming,
        models: &mut BTreeMap<String, ResolvedType>,
    ) -> Result<()> {
        let returned = std::iter::once(ModelContext::return_value(operation.response_type.clone(), naming.clone()));
        let inputs = operation
            .parameters
            .iter()
            .map(|p| ModelContext::input_param(p.parameter_type.clone(), naming.clone()));

        for context in returned.chain(inputs) {
            if context.model_type.is_void() {
                continue;
            }
            if self.registry.is_model(&context.model_type) {
                models.insert(naming.type_name(&context.model_type), context.model_type.clone());
            }
            for dependency in self.models.dependent_models(&context)? {
                models.insert(naming.type_name(&dependency), dependency);
            }
        }
        Ok(())
    }
}
