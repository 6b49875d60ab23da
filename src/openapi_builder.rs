use crate::api_description::ApiDescription;
use crate::context::HttpMethod;
use crate::documentation::{ApiInfo, Documentation};
use crate::operation::{Operation as ReadOperation, ParameterLocation};
use crate::plugins::Extensions;
use crate::schema_generator::{Schema, SchemaGenerator};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    /// Paths collection (URL path -> PathItem)
    paths: BTreeMap<String, PathItem>,
    /// Tags in first-use order
    tags: Vec<Tag>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "termsOfService", skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// `x-` vendor extensions contributed by path decorators
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl PathItem {
    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Parameters (path, query, header)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Components {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<BTreeMap<String, Schema>>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

/// Combines the values several handlers contributed for one path extension:
/// integers add up, other distinct values are collected into a list
fn merge_extension(existing: &mut Value, incoming: Value) {
    if let (Some(a), Some(b)) = (existing.as_i64(), incoming.as_i64()) {
        *existing = Value::from(a + b);
        return;
    }
    if *existing == incoming {
        return;
    }
    if !existing.is_array() {
        *existing = Value::Array(vec![existing.take()]);
    }
    if let Value::Array(values) = existing {
        let incoming = match incoming {
            Value::Array(values) => values,
            value => vec![value],
        };
        for value in incoming {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
}

fn json_content(schema: Schema) -> BTreeMap<String, MediaType> {
    BTreeMap::from([("application/json".to_string(), MediaType { schema })])
}

impl From<&ApiInfo> for Info {
    fn from(api_info: &ApiInfo) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Info {
            title: api_info.title.clone(),
            version: api_info.version.clone(),
            description: non_empty(&api_info.description),
            terms_of_service: non_empty(&api_info.terms_of_service_url),
            license: non_empty(&api_info.license).map(|name| License {
                name,
                url: non_empty(&api_info.license_url),
            }),
        }
    }
}

impl OpenApiBuilder {
    pub fn new(api_info: &ApiInfo) -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info::from(api_info),
            paths: BTreeMap::new(),
            tags: Vec::new(),
        }
    }

    /// Renders scanned documentation, generating component schemas for every
    /// model the documentation collected
    pub fn from_documentation(documentation: &Documentation, mut schema_gen: SchemaGenerator) -> OpenApiDocument {
        let mut builder = Self::new(&documentation.api_info);
        for listing in &documentation.listings {
            for tag in &listing.tags {
                builder.add_tag(tag, listing.description.as_deref());
            }
            for description in &listing.apis {
                builder.add_description(description, &listing.tags, &mut schema_gen);
            }
        }
        for model in documentation.models.values() {
            schema_gen.generate_schema(model);
        }
        builder.build(schema_gen)
    }

    pub fn add_tag(&mut self, name: &str, description: Option<&str>) {
        if self.tags.iter().any(|t| t.name == name) {
            return;
        }
        self.tags.push(Tag {
            name: name.to_string(),
            description: description.map(str::to_string),
        });
    }

    /// Add every operation of a description under its path
    pub fn add_description(
        &mut self,
        description: &ApiDescription,
        tags: &[String],
        schema_gen: &mut SchemaGenerator,
    ) {
        let openapi_path = Self::convert_path_format(&description.path);
        debug!("Adding path: {}", openapi_path);

        let operations: Vec<(HttpMethod, Operation)> = description
            .operations
            .iter()
            .map(|op| (op.method, Self::operation(op, tags, schema_gen)))
            .collect();

        let path_item = self.paths.entry(openapi_path).or_default();
        for (name, value) in &description.decoration {
            match path_item.extensions.get_mut(name) {
                Some(existing) => merge_extension(existing, value.clone()),
                None => {
                    path_item.extensions.insert(name.clone(), value.clone());
                }
            }
        }
        for (method, operation) in operations {
            *path_item.slot(method) = Some(operation);
        }
    }

    fn operation(op: &ReadOperation, tags: &[String], schema_gen: &mut SchemaGenerator) -> Operation {
        let parameters: Vec<Parameter> = op
            .parameters
            .iter()
            .filter(|p| p.location != ParameterLocation::Body)
            .map(|p| Parameter {
                name: p.name.clone(),
                location: match p.location {
                    ParameterLocation::Path => "path",
                    ParameterLocation::Header => "header",
                    ParameterLocation::Query | ParameterLocation::Body => "query",
                }
                .to_string(),
                required: p.required,
                schema: schema_gen.generate_schema(&p.parameter_type),
            })
            .collect();

        let request_body = op.body_parameter().map(|body| RequestBody {
            required: body.required,
            content: json_content(schema_gen.generate_schema(&body.parameter_type)),
        });

        let response = Response {
            description: "OK".to_string(),
            content: (!op.response_type.is_void())
                .then(|| json_content(schema_gen.generate_schema(&op.response_type))),
        };

        Operation {
            tags: tags.to_vec(),
            summary: Some(op.summary.clone()),
            description: None,
            operation_id: Some(op.operation_id.clone()),
            parameters: if parameters.is_empty() { None } else { Some(parameters) },
            request_body,
            responses: BTreeMap::from([("200".to_string(), response)]),
        }
    }

    /// Convert path format from :param or {param} to OpenAPI {param} format
    fn convert_path_format(path: &str) -> String {
        path.split('/')
            .map(|part| match part.strip_prefix(':') {
                Some(name) => format!("{{{}}}", name),
                None => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Build the final OpenAPI document
    pub fn build(self, schema_gen: SchemaGenerator) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let schemas = schema_gen.into_schemas();
        let components = if schemas.is_empty() {
            None
        } else {
            Some(Components { schemas: Some(schemas) })
        };

        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info,
            tags: self.tags,
            paths: self.paths,
            components,
        }
    }
}
