//! Schema introspection: fetching, minifying and querying the API schema.
//!
//! The minified schema is written to `graphql/schema/schema.json` and read
//! back at startup so the cache can tell entry types (which carry `sys`)
//! from embedded value types.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value, json};

use crate::client::GraphQlClient;
use crate::error::{Error, Result};
use crate::fs::write_file_create_dirs;

/// Default location of the minified schema, relative to the project root.
pub const DEFAULT_SCHEMA_PATH: &str = "graphql/schema/schema.json";

/// Standard introspection query without descriptions.
pub const INTROSPECTION_QUERY: &str = r#"query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types { ...FullType }
  }
}

fragment FullType on __Type {
  kind
  name
  fields(includeDeprecated: true) {
    name
    args { ...InputValue }
    type { ...TypeRef }
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) { name }
  possibleTypes { ...TypeRef }
}

fragment InputValue on __InputValue {
  name
  type { ...TypeRef }
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType { kind name ofType { kind name ofType { kind name ofType { kind name } } } }
      }
    }
  }
}"#;

/// A type known to the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaType {
    /// Introspection kind (`OBJECT`, `INTERFACE`, `ENUM`, ...).
    pub kind: String,
    /// Field names, for object and interface types.
    pub fields: Vec<String>,
}

/// Type and field lookup over an introspection result.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: HashMap<String, SchemaType>,
}

impl Schema {
    /// Build from an introspection result, either the bare `{"__schema": ..}`
    /// object or a full `{"data": {"__schema": ..}}` response.
    pub fn from_introspection(value: &Value) -> Result<Self> {
        let schema = value
            .get("__schema")
            .or_else(|| value.get("data").and_then(|data| data.get("__schema")))
            .ok_or_else(|| Error::Config("introspection result has no __schema".to_string()))?;

        let types = schema
            .get("types")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Config("introspection result has no types".to_string()))?;

        let types = types
            .iter()
            .filter_map(|ty| {
                let name = ty.get("name")?.as_str()?.to_string();
                let kind = ty.get("kind")?.as_str()?.to_string();
                let fields = ty
                    .get("fields")
                    .and_then(Value::as_array)
                    .map(|fields| {
                        fields
                            .iter()
                            .filter_map(|f| f.get("name")?.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                Some((name, SchemaType { kind, fields }))
            })
            .collect();

        Ok(Self { types })
    }

    /// Read a minified schema file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let value: Value = serde_json::from_str(&raw)?;
        Self::from_introspection(&value)
    }

    /// Whether the schema declares a type with this name.
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Whether `typename` declares a field called `field`.
    pub fn has_field(&self, typename: &str, field: &str) -> bool {
        self.types
            .get(typename)
            .is_some_and(|ty| ty.fields.iter().any(|f| f == field))
    }

    /// Look up a type.
    pub fn get(&self, name: &str) -> Option<&SchemaType> {
        self.types.get(name)
    }

    /// Number of known types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are known.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Fetch the schema with the public token, write the minified form to
/// `path`, and return it parsed.
pub async fn load_schema(client: &GraphQlClient, path: impl AsRef<Path>) -> Result<Schema> {
    let data = client
        .execute(INTROSPECTION_QUERY, &json!({}), false)
        .await?;
    let minified = minify_introspection(&data)?;

    let path = path.as_ref();
    write_file_create_dirs(path, serde_json::to_vec(&minified)?).await?;
    tracing::info!(path = %path.display(), "schema written");

    Schema::from_introspection(&minified)
}

/// Strip an introspection result down to what the cache needs.
///
/// Keeps object, interface, union and input types with their field shapes,
/// and enums with their value names. Scalars collapse to a single `Any`
/// type and built-in `__` types are dropped.
pub fn minify_introspection(value: &Value) -> Result<Value> {
    let schema = value
        .get("__schema")
        .ok_or_else(|| Error::Config("introspection result has no __schema".to_string()))?;

    let root_name = |field: &str| -> Value {
        schema
            .get(field)
            .and_then(|root| root.get("name"))
            .map(|name| json!({ "name": name }))
            .unwrap_or(Value::Null)
    };

    let mut types = Vec::new();
    for ty in schema
        .get("types")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let Some(name) = ty.get("name").and_then(Value::as_str) else {
            continue;
        };
        if name.starts_with("__") {
            continue;
        }

        let kind = ty.get("kind").and_then(Value::as_str).unwrap_or_default();
        let minified = match kind {
            "OBJECT" | "INTERFACE" => {
                let mut out = Map::new();
                out.insert("kind".into(), json!(kind));
                out.insert("name".into(), json!(name));
                out.insert("fields".into(), minify_fields(ty.get("fields")));
                out.insert("interfaces".into(), minify_type_list(ty.get("interfaces")));
                Value::Object(out)
            }
            "UNION" => json!({
                "kind": kind,
                "name": name,
                "possibleTypes": minify_type_list(ty.get("possibleTypes")),
            }),
            "INPUT_OBJECT" => json!({
                "kind": kind,
                "name": name,
                "inputFields": minify_args(ty.get("inputFields")),
            }),
            "ENUM" => json!({
                "kind": kind,
                "name": name,
                "enumValues": ty
                    .get("enumValues")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|v| v.get("name"))
                    .map(|n| json!({ "name": n }))
                    .collect::<Vec<_>>(),
            }),
            _ => continue,
        };
        types.push(minified);
    }
    types.push(json!({ "kind": "SCALAR", "name": "Any" }));

    Ok(json!({
        "__schema": {
            "queryType": root_name("queryType"),
            "mutationType": root_name("mutationType"),
            "subscriptionType": root_name("subscriptionType"),
            "types": types,
        }
    }))
}

fn minify_fields(fields: Option<&Value>) -> Value {
    Value::Array(
        fields
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|field| {
                json!({
                    "name": field.get("name").cloned().unwrap_or(Value::Null),
                    "type": minify_type_ref(field.get("type")),
                    "args": minify_args(field.get("args")),
                })
            })
            .collect(),
    )
}

fn minify_args(args: Option<&Value>) -> Value {
    Value::Array(
        args.and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|arg| {
                json!({
                    "name": arg.get("name").cloned().unwrap_or(Value::Null),
                    "type": minify_type_ref(arg.get("type")),
                })
            })
            .collect(),
    )
}

fn minify_type_list(list: Option<&Value>) -> Value {
    Value::Array(
        list.and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|ty| minify_type_ref(Some(ty)))
            .collect(),
    )
}

fn minify_type_ref(ty: Option<&Value>) -> Value {
    let Some(ty) = ty else {
        return Value::Null;
    };
    let kind = ty.get("kind").and_then(Value::as_str).unwrap_or_default();
    match kind {
        "NON_NULL" | "LIST" => json!({
            "kind": kind,
            "ofType": minify_type_ref(ty.get("ofType")),
        }),
        "SCALAR" => json!({ "kind": "SCALAR", "name": "Any" }),
        _ => json!({
            "kind": kind,
            "name": ty.get("name").cloned().unwrap_or(Value::Null),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn introspection() -> Value {
        json!({
            "__schema": {
                "queryType": { "name": "Query" },
                "mutationType": null,
                "subscriptionType": null,
                "types": [
                    { "kind": "OBJECT", "name": "Query", "description": "root",
                      "fields": [
                        { "name": "pageCollection", "description": "pages",
                          "args": [ { "name": "preview", "type": { "kind": "SCALAR", "name": "Boolean", "ofType": null } } ],
                          "type": { "kind": "OBJECT", "name": "PageCollection", "ofType": null } }
                      ],
                      "interfaces": [] },
                    { "kind": "OBJECT", "name": "Page",
                      "fields": [
                        { "name": "sys", "args": [],
                          "type": { "kind": "NON_NULL", "name": null, "ofType": { "kind": "OBJECT", "name": "Sys", "ofType": null } } },
                        { "name": "slug", "args": [], "type": { "kind": "SCALAR", "name": "String", "ofType": null } }
                      ],
                      "interfaces": [ { "kind": "INTERFACE", "name": "Entry", "ofType": null } ] },
                    { "kind": "SCALAR", "name": "String" },
                    { "kind": "ENUM", "name": "PageOrder", "enumValues": [ { "name": "slug_ASC" }, { "name": "slug_DESC" } ] },
                    { "kind": "OBJECT", "name": "__Type", "fields": [] }
                ]
            }
        })
    }

    #[test]
    fn minify_drops_builtins_and_scalars() {
        let minified = minify_introspection(&introspection()).unwrap();
        let types = minified["__schema"]["types"].as_array().unwrap();
        let names: Vec<_> = types.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Query", "Page", "PageOrder", "Any"]);
        assert_eq!(minified["__schema"]["queryType"], json!({ "name": "Query" }));
        assert_eq!(minified["__schema"]["mutationType"], Value::Null);
    }

    #[test]
    fn minify_strips_descriptions_and_collapses_scalars() {
        let minified = minify_introspection(&introspection()).unwrap();
        let query = &minified["__schema"]["types"][0];
        assert!(query.get("description").is_none());
        let field = &query["fields"][0];
        assert!(field.get("description").is_none());
        assert_eq!(
            field["args"][0]["type"],
            json!({ "kind": "SCALAR", "name": "Any" })
        );

        let page = &minified["__schema"]["types"][1];
        assert_eq!(
            page["fields"][0]["type"],
            json!({ "kind": "NON_NULL", "ofType": { "kind": "OBJECT", "name": "Sys" } })
        );
    }

    #[test]
    fn minify_keeps_enum_values() {
        let minified = minify_introspection(&introspection()).unwrap();
        let order = &minified["__schema"]["types"][2];
        assert_eq!(
            order["enumValues"],
            json!([{ "name": "slug_ASC" }, { "name": "slug_DESC" }])
        );
    }

    #[test]
    fn minify_requires_schema() {
        assert!(minify_introspection(&json!({ "data": null })).is_err());
    }

    #[test]
    fn schema_lookup() {
        let schema = Schema::from_introspection(&introspection()).unwrap();
        assert!(schema.has_type("Page"));
        assert!(!schema.has_type("Seo"));
        assert!(schema.has_field("Page", "sys"));
        assert!(!schema.has_field("Page", "title"));
        assert!(!schema.has_field("Missing", "sys"));
        assert_eq!(schema.get("PageOrder").unwrap().kind, "ENUM");
        assert_eq!(schema.len(), 5);
    }

    #[test]
    fn schema_accepts_full_response() {
        let schema =
            Schema::from_introspection(&json!({ "data": introspection() })).unwrap();
        assert!(schema.has_type("Query"));
    }

    #[test]
    fn schema_from_minified_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        let minified = minify_introspection(&introspection()).unwrap();
        std::fs::write(&path, serde_json::to_vec(&minified).unwrap()).unwrap();

        let schema = Schema::from_file(&path).unwrap();
        assert!(schema.has_field("Page", "sys"));
        assert!(schema.has_type("Any"));
    }
}
