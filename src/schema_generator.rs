use crate::naming::GenericNaming;
use crate::type_resolver::{ResolvedType, TypeRegistry, ANY};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Schema generator - converts resolved types to OpenAPI schemas
pub struct SchemaGenerator {
    registry: Arc<TypeRegistry>,
    naming: GenericNaming,
    /// Component schemas generated so far, by model name
    schemas: BTreeMap<String, Schema>,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "int64", "float", "double")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Value schema for map types
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    /// Enum values for enum types
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Schema {
    fn typed(schema_type: &str, format: Option<&str>) -> Self {
        Schema {
            schema_type: Some(schema_type.to_string()),
            format: format.map(|f| f.to_string()),
            ..Schema::default()
        }
    }

    fn reference(model_name: &str) -> Self {
        Schema {
            reference: Some(format!("#/components/schemas/{}", model_name)),
            ..Schema::default()
        }
    }

    /// Placeholder for types without a known shape
    fn object() -> Self {
        Schema::typed("object", None)
    }
}

impl SchemaGenerator {
    pub fn new(registry: Arc<TypeRegistry>, naming: GenericNaming) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            registry,
            naming,
            schemas: BTreeMap::new(),
        }
    }

    /// Generate a schema for a resolved type, registering component schemas
    /// for every model it refers to
    pub fn generate_schema(&mut self, resolved: &ResolvedType) -> Schema {
        debug!("Generating schema for type: {}", resolved);
        let first_param = resolved.type_parameters.first();

        match (resolved.erased_type.as_str(), first_param) {
            // Transparent wrappers
            ("Option" | "Box" | "Arc" | "Rc" | "Json", Some(inner)) => self.generate_schema(inner),
            ("Vec" | "VecDeque" | "HashSet" | "BTreeSet", Some(inner)) => Schema {
                items: Some(Box::new(self.generate_schema(inner))),
                ..Schema::typed("array", None)
            },
            ("HashMap" | "BTreeMap", _) => {
                let value = resolved
                    .type_parameters
                    .get(1)
                    .map(|v| self.generate_schema(v))
                    .unwrap_or_else(Schema::object);
                Schema {
                    additional_properties: Some(Box::new(value)),
                    ..Schema::object()
                }
            }
            (name, _) if TypeRegistry::is_primitive(name) => primitive_schema(name),
            (name, _) if name == ANY || resolved.is_void() => Schema::object(),
            _ if self.registry.is_model(resolved) => {
                let model_name = self.naming.type_name(resolved);
                self.generate_model_schema(&model_name, resolved);
                Schema::reference(&model_name)
            }
            _ => {
                debug!("Unknown type: {}, using object placeholder", resolved);
                Schema::object()
            }
        }
    }

    /// Generate the component schema of a registered struct or enum
    fn generate_model_schema(&mut self, model_name: &str, resolved: &ResolvedType) {
        if self.schemas.contains_key(model_name) {
            debug!("Schema for {} already exists", model_name);
            return;
        }
        let Some(decl) = self.registry.type_decl(&resolved.erased_type) else {
            return;
        };

        if decl.is_enum() {
            let schema = Schema {
                enum_values: Some(decl.variants.clone()),
                ..Schema::typed("string", None)
            };
            self.schemas.insert(model_name.to_string(), schema);
            return;
        }

        // Insert a placeholder first so self-referencing models terminate
        self.schemas.insert(model_name.to_string(), Schema::object());

        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        for (field_name, field_type) in self.registry.resolved_fields(resolved) {
            if field_type.erased_type != "Option" {
                required.push(field_name.clone());
            }
            let property = self.generate_schema(&field_type);
            properties.insert(field_name, property);
        }

        let schema = Schema {
            properties: Some(properties),
            required: if required.is_empty() { None } else { Some(required) },
            ..Schema::object()
        };
        self.schemas.insert(model_name.to_string(), schema);
    }

    /// All generated component schemas
    pub fn get_schemas(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    pub fn into_schemas(self) -> BTreeMap<String, Schema> {
        self.schemas
    }
}

/// Convert a primitive type name to an OpenAPI schema
fn primitive_schema(name: &str) -> Schema {
    match name {
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => Schema::typed("integer", Some("int32")),
        "i64" | "i128" | "isize" | "u64" | "u128" | "usize" => Schema::typed("integer", Some("int64")),
        "f32" => Schema::typed("number", Some("float")),
        "f64" => Schema::typed("number", Some("double")),
        "bool" => Schema::typed("boolean", None),
        _ => Schema::typed("string", None),
    }
}
