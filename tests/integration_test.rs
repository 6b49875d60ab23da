use openapi_from_handlers::{
    cli::{self, CliArgs},
    context::PathSelectors,
    documentation::{DocumentationConfig, DocumentationScanner},
    extractor::{controller::ControllerExtractor, HandlerExtractor},
    naming::GenericNaming,
    openapi_builder::{OpenApiBuilder, OpenApiDocument},
    schema_generator::SchemaGenerator,
    serializer::{serialize_json, serialize_yaml},
    source::SourceSet,
};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

/// Helper function to create a temporary test project
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn pet_store() -> TempDir {
    create_test_project(vec![("src/api.rs", include_str!("fixtures/pet_store.rs"))])
}

fn generate(temp_dir: &TempDir, config: DocumentationConfig) -> OpenApiDocument {
    let sources = SourceSet::load(temp_dir.path()).expect("Failed to load sources");
    let extracted = ControllerExtractor.extract(&sources.files);

    let registry = Arc::new(extracted.registry);
    let scanner = DocumentationScanner::new(Arc::clone(&registry));
    let documentation = scanner
        .scan(&config, &extracted.registrations)
        .expect("Failed to scan documentation");

    let schema_gen = SchemaGenerator::new(registry, documentation.naming.clone());
    OpenApiBuilder::from_documentation(&documentation, schema_gen)
}

fn to_json(document: &OpenApiDocument) -> Value {
    serde_json::from_str(&serialize_json(document).unwrap()).unwrap()
}

#[test]
fn test_pet_store_end_to_end() {
    let temp_dir = pet_store();
    let document = to_json(&generate(&temp_dir, DocumentationConfig::default()));

    let paths: Vec<&String> = document["paths"].as_object().unwrap().keys().collect();
    assert_eq!(
        paths,
        vec![
            "/api/categories/{id}",
            "/api/pets",
            "/api/pets/internal/stats",
            "/api/pets/{id}",
        ]
    );

    let list = &document["paths"]["/api/pets"]["get"];
    assert_eq!(list["operationId"], "listUsingGET");
    assert_eq!(list["tags"], json!(["pets"]));
    assert_eq!(
        list["parameters"],
        json!([{ "name": "page", "in": "query", "required": false, "schema": { "type": "integer", "format": "int32" } }])
    );
    assert_eq!(
        list["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/Page«Pet»"
    );

    let create = &document["paths"]["/api/pets"]["post"];
    assert_eq!(create["operationId"], "createUsingPOST");
    assert_eq!(create["requestBody"]["required"], true);
    assert!(create.get("parameters").is_none());

    // Both handlers serving the path are recorded
    let item = &document["paths"]["/api/pets"];
    assert_eq!(item["x-handler"], json!(["PetController::list", "PetController::create"]));
    assert_eq!(item["x-operation-count"], 2);
}

#[test]
fn test_unannotated_model_parameter_becomes_body() {
    let temp_dir = pet_store();
    let document = to_json(&generate(&temp_dir, DocumentationConfig::default()));

    let update = &document["paths"]["/api/pets/{id}"]["put"];
    assert_eq!(update["parameters"][0]["name"], "id");
    assert_eq!(update["parameters"][0]["in"], "path");
    assert_eq!(
        update["requestBody"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/Pet"
    );

    let stats = &document["paths"]["/api/pets/internal/stats"]["get"];
    assert_eq!(stats["parameters"][0]["name"], "X-Request-Id");
    assert_eq!(stats["parameters"][0]["in"], "header");
}

#[test]
fn test_hidden_handler_is_not_documented() {
    let temp_dir = pet_store();
    let document = to_json(&generate(&temp_dir, DocumentationConfig::default()));

    let item = &document["paths"]["/api/pets/{id}"];
    assert!(item.get("delete").is_none());
    assert!(item.get("put").is_some());
}

#[test]
fn test_trait_handler_resolves_concrete_return_type() {
    let temp_dir = pet_store();
    let document = to_json(&generate(&temp_dir, DocumentationConfig::default()));

    let item = &document["paths"]["/api/categories/{id}"];
    assert_eq!(item["x-handler"], "CategoryController::find");
    assert_eq!(item["x-operation-count"], 1);
    assert_eq!(item["get"]["operationId"], "findUsingGET");
    assert_eq!(item["get"]["tags"], json!(["default"]));
    assert_eq!(
        item["get"]["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/Category"
    );
}

#[test]
fn test_models_are_collected_into_components() {
    let temp_dir = pet_store();
    let document = to_json(&generate(&temp_dir, DocumentationConfig::default()));

    let schemas: Vec<&String> = document["components"]["schemas"].as_object().unwrap().keys().collect();
    assert_eq!(schemas, vec!["Category", "Page«Pet»", "Pet", "Status", "Tag"]);

    let pet = &document["components"]["schemas"]["Pet"];
    assert_eq!(pet["required"], json!(["id", "name", "status", "tags"]));
    assert_eq!(pet["properties"]["tags"]["items"]["$ref"], "#/components/schemas/Tag");
    assert_eq!(
        document["components"]["schemas"]["Status"]["enum"],
        json!(["Available", "Pending", "Sold"])
    );
}

#[test]
fn test_selector_and_codegen_naming() {
    let temp_dir = pet_store();
    let config = DocumentationConfig::default()
        .with_group_name("pets")
        .with_naming(GenericNaming::codegen())
        .with_selector(PathSelectors::prefix("/api/pets"));
    let document = to_json(&generate(&temp_dir, config));

    let paths = document["paths"].as_object().unwrap();
    assert!(!paths.contains_key("/api/categories/{id}"));
    assert_eq!(paths.len(), 3);
    assert!(document["components"]["schemas"].get("PageOfPet").is_some());
    assert!(document["components"]["schemas"].get("Category").is_some());
}

#[test]
fn test_output_is_stable_across_runs() {
    let temp_dir = pet_store();
    let first = serialize_yaml(&generate(&temp_dir, DocumentationConfig::default())).unwrap();
    let second = serialize_yaml(&generate(&temp_dir, DocumentationConfig::default())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cli_writes_json_document() {
    let temp_dir = pet_store();
    let output = temp_dir.path().join("out").join("openapi.json");
    let args = CliArgs::try_parse_from([
        "openapi-from-handlers",
        temp_dir.path().to_str().unwrap(),
        "--format",
        "json",
        "--output",
        output.to_str().unwrap(),
        "--title",
        "Pet Store",
    ])
    .unwrap();

    cli::run(cli::parse_args_from_parsed(args).unwrap()).unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["info"]["title"], "Pet Store");
    assert_eq!(written["openapi"], "3.0.0");
    assert!(written["paths"].get("/api/pets").is_some());
}

#[test]
fn test_project_without_handlers() {
    let temp_dir = create_test_project(vec![("src/lib.rs", "pub struct Unused;")]);
    let document = generate(&temp_dir, DocumentationConfig::default());

    assert!(document.paths.is_empty());
    assert!(document.components.is_none());
}
