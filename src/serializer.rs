//! Rendering of a built [`OpenApiDocument`] as YAML or JSON text, and writing
//! that text to disk.

use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML format.
///
/// Paths, schemas and vendor extensions are emitted in sorted order, so the
/// same scan always renders the same text.
///
/// # Example
///
/// ```
/// use openapi_from_handlers::documentation::ApiInfo;
/// use openapi_from_handlers::naming::GenericNaming;
/// use openapi_from_handlers::openapi_builder::OpenApiBuilder;
/// use openapi_from_handlers::schema_generator::SchemaGenerator;
/// use openapi_from_handlers::serializer::serialize_yaml;
/// use openapi_from_handlers::type_resolver::TypeRegistry;
/// use std::sync::Arc;
///
/// let schema_gen = SchemaGenerator::new(Arc::new(TypeRegistry::new()), GenericNaming::standard());
/// let doc = OpenApiBuilder::new(&ApiInfo::default()).build(schema_gen);
/// let yaml = serialize_yaml(&doc).unwrap();
/// assert!(yaml.contains("Api Documentation"));
/// ```
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc)
        .context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON format with pretty printing.
///
/// The output is formatted with indentation for readability, making it suitable
/// for human review and version control.
///
/// # Example
///
/// ```ignore
/// let json = serialize_json(&doc)?;
/// println!("{}", json);
/// ```
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc)
        .context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file.
///
/// Creates the file and any missing parent directories, overwriting an
/// existing file.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HttpMethod;
    use crate::documentation::ApiInfo;
    use crate::naming::GenericNaming;
    use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
    use crate::operation::{Operation, Parameter, ParameterLocation};
    use crate::api_description::ApiDescription;
    use crate::schema_generator::SchemaGenerator;
    use crate::type_resolver::{ResolvedType, TypeDecl, TypeExpr, TypeRegistry};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn schema_gen() -> SchemaGenerator {
        let mut registry = TypeRegistry::new();
        registry.register_type(
            TypeDecl::concrete("User")
                .with_field("id", TypeExpr::named("u32"))
                .with_field("name", TypeExpr::named("String")),
        );
        SchemaGenerator::new(Arc::new(registry), GenericNaming::standard())
    }

    fn api_info() -> ApiInfo {
        ApiInfo {
            title: "Test API".to_string(),
            version: "1.0.0".to_string(),
            description: "A test API".to_string(),
            ..ApiInfo::default()
        }
    }

    /// Helper function to create a minimal OpenAPI document for testing
    fn create_test_document() -> OpenApiDocument {
        OpenApiBuilder::new(&api_info()).build(schema_gen())
    }

    fn create_user_document() -> OpenApiDocument {
        let mut gen = schema_gen();
        let mut builder = OpenApiBuilder::new(&api_info());
        let description = ApiDescription {
            path: "/users/{id}".to_string(),
            description: "get_user".to_string(),
            operations: vec![Operation {
                method: HttpMethod::Get,
                operation_id: "getUserUsingGET".to_string(),
                summary: "getUser".to_string(),
                parameters: vec![Parameter {
                    name: "id".to_string(),
                    location: ParameterLocation::Path,
                    parameter_type: ResolvedType::simple("u32"),
                    model_name: "u32".to_string(),
                    required: true,
                    index: 0,
                }],
                response_type: ResolvedType::simple("User"),
                response_model: Some("User".to_string()),
            }],
            hidden: false,
            decoration: Default::default(),
        };
        builder.add_description(&description, &["users".to_string()], &mut gen);
        builder.build(gen)
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();

        assert!(yaml.contains("openapi:"));
        assert!(yaml.contains("3.0.0"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("version: 1.0.0"));
        assert!(yaml.contains("description: A test API"));
        assert!(yaml.contains("termsOfService:"));
        assert!(yaml.contains("urn:tos"));
        assert!(yaml.contains("paths:"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_document()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.0");
        assert_eq!(parsed["info"]["title"], "Test API");
        assert_eq!(parsed["info"]["license"]["name"], "Apache 2.0");
        assert!(parsed.get("components").is_none());
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let json = serialize_json(&create_test_document()).unwrap();

        assert!(json.contains("  "));
        assert!(json.lines().count() > 5, "Pretty printed JSON should have multiple lines");
    }

    #[test]
    fn test_serialize_user_document() {
        let doc = create_user_document();

        let yaml = serialize_yaml(&doc).unwrap();
        assert!(yaml.contains("/users/{id}"));
        assert!(yaml.contains("operationId: getUserUsingGET"));

        let parsed: serde_json::Value = serde_json::from_str(&serialize_json(&doc).unwrap()).unwrap();
        let get = &parsed["paths"]["/users/{id}"]["get"];
        assert_eq!(get["parameters"][0]["in"], "path");
        assert_eq!(
            get["responses"]["200"]["content"]["application/json"]["schema"],
            json!({ "$ref": "#/components/schemas/User" })
        );
        assert_eq!(parsed["components"]["schemas"]["User"]["required"], json!(["id", "name"]));
    }

    #[test]
    fn test_serialization_is_deterministic() {
        assert_eq!(
            serialize_yaml(&create_user_document()).unwrap(),
            serialize_yaml(&create_user_document()).unwrap()
        );
    }

    #[test]
    fn test_roundtrip_yaml_serialization() {
        let doc = create_test_document();
        let deserialized: OpenApiDocument = serde_yaml::from_str(&serialize_yaml(&doc).unwrap()).unwrap();

        assert_eq!(deserialized.openapi, doc.openapi);
        assert_eq!(deserialized.info, doc.info);
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("test.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_write_json_file_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.json");

        write_to_file(&serialize_json(&create_user_document()).unwrap(), &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let deserialized: OpenApiDocument = serde_json::from_str(&content).unwrap();
        assert!(deserialized.paths.contains_key("/users/{id}"));
    }
}
