use crate::diagnostics::{DiagnosticKind, Diagnostics};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Structural schema inferred from a sample JSON value
///
/// Serializes to the OpenAPI schema object shape, with the variant as `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
    /// Object with one property per member that carried a shape
    Object {
        #[serde(default)]
        properties: BTreeMap<String, Schema>,
        /// Member names present in the sample, sorted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        required: Option<Vec<String>>,
    },
    /// Array described by its first element
    Array { items: Box<Schema> },
    String,
    Boolean,
    Integer,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
}

/// The scalar kinds a JSON value can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Boolean,
    Integer,
    Number,
}

impl ScalarKind {
    /// Scalar kind of a JSON value, `None` for null, arrays and objects
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(ScalarKind::String),
            Value::Bool(_) => Some(ScalarKind::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(ScalarKind::Integer),
            Value::Number(_) => Some(ScalarKind::Number),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_schema(self) -> Schema {
        match self {
            ScalarKind::String => Schema::String,
            ScalarKind::Boolean => Schema::Boolean,
            ScalarKind::Integer => Schema::Integer,
            ScalarKind::Number => Schema::Number {
                format: Some("float".to_string()),
            },
        }
    }
}

impl Schema {
    /// Marks every property of an object schema as required.
    ///
    /// This reflects one sample only: a member is listed because it was present
    /// in the value the schema was inferred from, not because it is always
    /// present. Non-object schemas are returned unchanged.
    pub fn with_required(self) -> Self {
        match self {
            Schema::Object { properties, .. } => {
                let required: Vec<String> = properties.keys().cloned().collect();
                Schema::Object {
                    required: if required.is_empty() {
                        None
                    } else {
                        Some(required)
                    },
                    properties,
                }
            }
            other => other,
        }
    }

    /// Scalar kind of a scalar schema, `None` for objects and arrays
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Schema::String => Some(ScalarKind::String),
            Schema::Boolean => Some(ScalarKind::Boolean),
            Schema::Integer => Some(ScalarKind::Integer),
            Schema::Number { .. } => Some(ScalarKind::Number),
            Schema::Object { .. } | Schema::Array { .. } => None,
        }
    }

    /// Value of the serialized `type` field
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Object { .. } => "object",
            Schema::Array { .. } => "array",
            Schema::String => "string",
            Schema::Boolean => "boolean",
            Schema::Integer => "integer",
            Schema::Number { .. } => "number",
        }
    }
}

/// Infers a schema from a JSON value.
///
/// - objects recurse per member; members that yield no schema (null, empty
///   arrays) are dropped and recorded in `diagnostics`
/// - arrays yield `None` when empty, otherwise a schema for the first element
///   only; later elements are not inspected
/// - scalars map through [`ScalarKind`]; null yields `None`
///
/// The result is a lower bound on the shape of the data, not a contract.
pub fn infer(value: &Value, diagnostics: &mut Diagnostics) -> Option<Schema> {
    infer_at(value, "$", diagnostics)
}

fn infer_at(value: &Value, location: &str, diagnostics: &mut Diagnostics) -> Option<Schema> {
    match value {
        Value::Object(members) => {
            let mut properties = BTreeMap::new();
            for (name, member) in members {
                let member_location = format!("{}.{}", location, name);
                match infer_at(member, &member_location, diagnostics) {
                    Some(schema) => {
                        properties.insert(name.clone(), schema);
                    }
                    None => diagnostics.push(
                        DiagnosticKind::DroppedSchemaMember,
                        format!("no type could be inferred for {}", member_location),
                    ),
                }
            }
            Some(Schema::Object {
                properties,
                required: None,
            })
        }
        Value::Array(elements) => {
            let first = elements.first()?;
            let items = infer_at(first, &format!("{}[0]", location), diagnostics)?;
            Some(Schema::Array {
                items: Box::new(items),
            })
        }
        scalar => {
            let kind = ScalarKind::of(scalar);
            if kind.is_none() {
                debug!("No scalar kind for {} at {}", scalar, location);
            }
            kind.map(ScalarKind::to_schema)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(properties: Vec<(&str, Schema)>) -> Schema {
        Schema::Object {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            required: None,
        }
    }

    #[test]
    fn test_drops_null_and_empty_array_members() {
        let mut diagnostics = Diagnostics::new();
        let value = json!({"user": {"id": 1, "name": null, "posts": []}});

        let schema = infer(&value, &mut diagnostics).unwrap();

        assert_eq!(
            schema,
            object(vec![("user", object(vec![("id", Schema::Integer)]))])
        );
        assert_eq!(diagnostics.count(DiagnosticKind::DroppedSchemaMember), 2);
        assert!(diagnostics.entries()[0].message.contains("$.user.name"));
    }

    #[test]
    fn test_scalar_kinds() {
        let mut diagnostics = Diagnostics::new();
        let value = json!({"s": "x", "b": true, "i": -3, "u": 18446744073709551615u64, "f": 1.5});

        let schema = infer(&value, &mut diagnostics).unwrap();

        assert_eq!(
            schema,
            object(vec![
                ("b", Schema::Boolean),
                (
                    "f",
                    Schema::Number {
                        format: Some("float".to_string())
                    }
                ),
                ("i", Schema::Integer),
                ("s", Schema::String),
                ("u", Schema::Integer),
            ])
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_array_uses_first_element_only() {
        let mut diagnostics = Diagnostics::new();
        let value = json!([{"id": 1}, {"id": 2, "extra": "ignored"}]);

        let schema = infer(&value, &mut diagnostics).unwrap();

        assert_eq!(
            schema,
            Schema::Array {
                items: Box::new(object(vec![("id", Schema::Integer)]))
            }
        );
    }

    #[test]
    fn test_absent_values() {
        let mut diagnostics = Diagnostics::new();
        assert!(infer(&json!(null), &mut diagnostics).is_none());
        assert!(infer(&json!([]), &mut diagnostics).is_none());
        assert!(infer(&json!([null, 1]), &mut diagnostics).is_none());
    }

    #[test]
    fn test_nested_arrays() {
        let mut diagnostics = Diagnostics::new();
        let schema = infer(&json!([["a"]]), &mut diagnostics).unwrap();
        assert_eq!(
            schema,
            Schema::Array {
                items: Box::new(Schema::Array {
                    items: Box::new(Schema::String)
                })
            }
        );
    }

    #[test]
    fn test_with_required_sorts_member_names() {
        let mut diagnostics = Diagnostics::new();
        let value = json!({"title": "foo", "body": "bar", "userId": 1, "deleted": null});

        let schema = infer(&value, &mut diagnostics).unwrap().with_required();

        match schema {
            Schema::Object { required, .. } => assert_eq!(
                required,
                Some(vec![
                    "body".to_string(),
                    "title".to_string(),
                    "userId".to_string()
                ])
            ),
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_with_required_leaves_arrays_alone() {
        let schema = Schema::Array {
            items: Box::new(Schema::String),
        };
        assert_eq!(schema.clone().with_required(), schema);
    }

    #[test]
    fn test_scalar_kind_of_schema() {
        let mut diagnostics = Diagnostics::new();
        let value = json!({"page": 2, "ratio": 0.5, "ids": [1]});
        let schema = infer(&value, &mut diagnostics).unwrap();
        let Schema::Object { properties, .. } = schema else {
            panic!("expected an object schema");
        };

        assert_eq!(properties["page"].scalar_kind(), Some(ScalarKind::Integer));
        assert_eq!(properties["ratio"].scalar_kind(), Some(ScalarKind::Number));
        assert_eq!(properties["ids"].scalar_kind(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let mut diagnostics = Diagnostics::new();
        let schema = infer(&json!({"price": 9.5, "tags": ["a"]}), &mut diagnostics)
            .unwrap()
            .with_required();

        let serialized = serde_json::to_value(&schema).unwrap();

        assert_eq!(
            serialized,
            json!({
                "type": "object",
                "properties": {
                    "price": {"type": "number", "format": "float"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["price", "tags"]
            })
        );
    }

    #[test]
    fn test_deserialize_from_yaml_fragment() {
        let yaml = "properties:\n  id:\n    type: integer\nrequired:\n- id\ntype: object\n";
        let schema: Schema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema, object(vec![("id", Schema::Integer)]).with_required());
        assert_eq!(schema.type_name(), "object");
    }
}
