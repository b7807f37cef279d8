use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Keywords that strict structured output rejects or that carry no meaning
/// once the schema is inlined.
const UNSUPPORTED_KEYWORDS: &[&str] = &["default", "format", "minimum", "maximum", "title"];

/// Trait for types that can be used as OpenAI structured output.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate an OpenAI-compatible JSON schema for this type.
    ///
    /// Strict mode requires `additionalProperties: false` and every property
    /// listed in `required` on each object, with all `$ref`s inlined.
    fn openai_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = match &mut value {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions")
            }
            _ => None,
        };

        if let Some(Value::Object(defs)) = definitions {
            inline_refs(&mut value, &defs);
        }
        normalize(&mut value);

        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Schema names must match `^[a-zA-Z0-9_-]+$`.
pub(crate) fn schema_name<T: StructuredOutput>() -> String {
    let name: String = T::type_name()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if name.is_empty() {
        "structured_response".to_string()
    } else {
        name
    }
}

fn inline_refs(value: &mut Value, definitions: &Map<String, Value>) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();
            if let Some(def) = target {
                *value = def;
                inline_refs(value, definitions);
                return;
            }

            // schemars wraps a single $ref in allOf when the field has a doc comment
            let single_all_of = match map.get("allOf") {
                Some(Value::Array(items)) if items.len() == 1 => Some(items[0].clone()),
                _ => None,
            };
            if let Some(inner) = single_all_of {
                let description = map.get("description").cloned();
                *value = inner;
                inline_refs(value, definitions);
                if let (Some(desc), Value::Object(m)) = (description, &mut *value) {
                    m.insert("description".to_string(), desc);
                }
                return;
            }

            for v in map.values_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| inline_refs(v, definitions)),
        _ => {}
    }
}

fn normalize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for keyword in UNSUPPORTED_KEYWORDS {
                // `title`/`format` are also legitimate property names
                if !matches!(map.get(*keyword), Some(Value::Object(_))) {
                    map.remove(*keyword);
                }
            }

            let is_object = match map.get("type") {
                Some(Value::String(t)) => t == "object",
                Some(Value::Array(ts)) => ts.iter().any(|t| t == "object"),
                _ => false,
            };
            if is_object {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                let keys: Vec<Value> = match map.get("properties") {
                    Some(Value::Object(props)) => {
                        props.keys().map(|k| Value::String(k.clone())).collect()
                    }
                    _ => Vec::new(),
                };
                map.insert("required".to_string(), Value::Array(keys));
            }

            for v in map.values_mut() {
                normalize(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize),
        _ => {}
    }
}
