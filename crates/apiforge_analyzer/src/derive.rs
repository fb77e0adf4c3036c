//! Endpoint and JSON schema derivation rules.

use apiforge_catalog::{AccessOperation, EndpointSpec, Field, FieldKind, HttpMethod, Resource};
use serde_json::{json, Map, Value};

/// Derives the canonical endpoint set for a resource.
///
/// With an identifier field the resource yields list, create, get-by-id,
/// update and delete endpoints; without one, only the collection-level
/// list and create.
pub(crate) fn derive_endpoints(resource: &Resource) -> Vec<EndpointSpec> {
    let name = &resource.name;
    let item = item_schema(resource);
    let collection_path = format!("/{name}");
    let entity_path = format!("/{name}/{{id}}");

    let mut endpoints = vec![
        EndpointSpec {
            method: HttpMethod::Get,
            path: collection_path.clone(),
            summary: format!("List {name}"),
            requires_auth: resource.has_rule_for(AccessOperation::List),
            request_schema: None,
            response_schema: json!({"type": "array", "items": item.clone()}),
        },
        EndpointSpec {
            method: HttpMethod::Post,
            path: collection_path,
            summary: format!("Create {name}"),
            requires_auth: resource.has_rule_for(AccessOperation::Create),
            request_schema: Some(write_schema(resource)),
            response_schema: item.clone(),
        },
    ];

    if resource.has_identifier() {
        endpoints.push(EndpointSpec {
            method: HttpMethod::Get,
            path: entity_path.clone(),
            summary: format!("Get {name} by id"),
            requires_auth: resource.has_rule_for(AccessOperation::Get),
            request_schema: None,
            response_schema: item.clone(),
        });
        endpoints.push(EndpointSpec {
            method: HttpMethod::Put,
            path: entity_path.clone(),
            summary: format!("Update {name} by id"),
            requires_auth: resource.has_rule_for(AccessOperation::Update),
            request_schema: Some(write_schema(resource)),
            response_schema: item,
        });
        endpoints.push(EndpointSpec {
            method: HttpMethod::Delete,
            path: entity_path,
            summary: format!("Delete {name} by id"),
            requires_auth: resource.has_rule_for(AccessOperation::Delete),
            request_schema: None,
            response_schema: json!({
                "type": "object",
                "properties": {"deleted": {"type": "boolean"}},
                "required": ["deleted"],
            }),
        });
    }

    endpoints
}

/// Response schema for one entity: every field, non-nullable ones required.
fn item_schema(resource: &Resource) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in &resource.fields {
        properties.insert(field.name.clone(), field_schema(field));
        if !field.nullable {
            required.push(Value::String(field.name.clone()));
        }
    }

    schema_object(properties, required)
}

/// Request schema for writes: identifier and timestamp fields are
/// server-assigned and excluded entirely.
fn write_schema(resource: &Resource) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in &resource.fields {
        if field.kind.is_server_assigned() {
            continue;
        }
        properties.insert(field.name.clone(), field_schema(field));
        if !field.nullable {
            required.push(Value::String(field.name.clone()));
        }
    }

    schema_object(properties, required)
}

fn schema_object(properties: Map<String, Value>, required: Vec<Value>) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    Value::Object(schema)
}

/// Maps a field to its JSON schema fragment.
fn field_schema(field: &Field) -> Value {
    let mut schema = Map::new();
    let (ty, format) = match field.kind {
        FieldKind::Integer => ("number", None),
        FieldKind::Boolean => ("boolean", None),
        FieldKind::Object => ("object", None),
        FieldKind::Timestamp => ("string", Some("date-time")),
        FieldKind::Identifier => ("string", Some("uuid")),
        FieldKind::String => ("string", None),
    };
    schema.insert("type".into(), Value::String(ty.into()));
    if let Some(format) = format {
        schema.insert("format".into(), Value::String(format.into()));
    }
    if let Some(default) = &field.default {
        schema.insert("default".into(), default.clone());
    }
    Value::Object(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets() -> Resource {
        Resource::new(
            "widgets",
            vec![
                Field::new("id", FieldKind::Identifier),
                Field::new("name", FieldKind::String),
                Field::new("created_at", FieldKind::Timestamp),
                Field::new("note", FieldKind::String).nullable(),
            ],
        )
    }

    #[test]
    fn identifier_resource_yields_five_endpoints() {
        let endpoints = derive_endpoints(&widgets());
        let labels: Vec<String> = endpoints.iter().map(|e| e.label()).collect();
        assert_eq!(
            labels,
            vec![
                "GET /widgets",
                "POST /widgets",
                "GET /widgets/{id}",
                "PUT /widgets/{id}",
                "DELETE /widgets/{id}",
            ]
        );
    }

    #[test]
    fn no_identifier_yields_collection_endpoints_only() {
        let logs = Resource::new("logs", vec![Field::new("line", FieldKind::String)]);
        let endpoints = derive_endpoints(&logs);
        assert_eq!(endpoints.len(), 2);
        assert!(endpoints.iter().all(|e| e.path == "/logs"));
    }

    #[test]
    fn create_request_excludes_server_assigned_fields() {
        let endpoints = derive_endpoints(&widgets());
        let create = &endpoints[1];
        let schema = create.request_schema.as_ref().unwrap();

        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("name"));
        assert!(properties.contains_key("note"));
        assert!(!properties.contains_key("id"));
        assert!(!properties.contains_key("created_at"));

        let required = schema["required"].as_array().unwrap();
        assert_eq!(required, &vec![Value::String("name".into())]);
    }

    #[test]
    fn response_includes_all_fields_with_nullable_optional() {
        let endpoints = derive_endpoints(&widgets());
        let get_by_id = &endpoints[2];
        let schema = &get_by_id.response_schema;

        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 4);

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert!(required.contains(&"id"));
        assert!(required.contains(&"name"));
        assert!(required.contains(&"created_at"));
        assert!(!required.contains(&"note"));
    }

    #[test]
    fn type_mapping_markers() {
        let endpoints = derive_endpoints(&widgets());
        let item = &endpoints[2].response_schema;
        let properties = item["properties"].as_object().unwrap();

        assert_eq!(properties["id"]["type"], "string");
        assert_eq!(properties["id"]["format"], "uuid");
        assert_eq!(properties["created_at"]["format"], "date-time");
        assert_eq!(properties["name"]["type"], "string");
        assert!(properties["name"].get("format").is_none());
    }

    #[test]
    fn numeric_and_object_mapping() {
        let metrics = Resource::new(
            "metrics",
            vec![
                Field::new("count", FieldKind::Integer),
                Field::new("enabled", FieldKind::Boolean),
                Field::new("labels", FieldKind::Object),
            ],
        );
        let endpoints = derive_endpoints(&metrics);
        let item = &endpoints[1].response_schema;
        let properties = item["properties"].as_object().unwrap();

        assert_eq!(properties["count"]["type"], "number");
        assert_eq!(properties["enabled"]["type"], "boolean");
        assert_eq!(properties["labels"]["type"], "object");
    }

    #[test]
    fn access_rules_flag_auth() {
        use apiforge_catalog::AccessRule;

        let resource = widgets().with_access_rules(vec![
            AccessRule::new(AccessOperation::Create, "true", vec!["editor".into()]),
            AccessRule::new(AccessOperation::Delete, "true", vec!["admin".into()]),
        ]);
        let endpoints = derive_endpoints(&resource);

        assert!(!endpoints[0].requires_auth); // list
        assert!(endpoints[1].requires_auth); // create
        assert!(!endpoints[2].requires_auth); // get by id
        assert!(endpoints[4].requires_auth); // delete
    }

    #[test]
    fn default_values_carried_into_schema() {
        let resource = Resource::new(
            "flags",
            vec![Field::new("enabled", FieldKind::Boolean).with_default(json!(false))],
        );
        let endpoints = derive_endpoints(&resource);
        let schema = endpoints[1].request_schema.as_ref().unwrap();
        assert_eq!(schema["properties"]["enabled"]["default"], json!(false));
    }
}
