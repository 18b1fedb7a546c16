//! Forms: described state transitions found in a representation.
//!
//! HAL-FORMS `_templates` and Siren `actions` both parse into [`Form`].
//! A form knows how to turn caller-supplied values into a request body
//! (or query string) according to its method, content type and field types.

use crate::error::{HypermediaError, Result};
use crate::protocol::{append_query, normalize_content_type};
use bytes::Bytes;
use http::Method;
use serde_json::{Map, Value};

/// Content type of urlencoded form bodies.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// Content type of JSON bodies.
pub const JSON: &str = "application/json";

/// Input type of a form field. Drives how submitted values are encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Free text (the default).
    Text,
    /// Numeric input; values are sent as JSON numbers.
    Number,
    /// Numeric slider; encoded like [`FieldType::Number`].
    Range,
    /// Boolean toggle; values are sent as booleans.
    Checkbox,
    /// Single choice among options.
    Radio,
    /// Choice from a list of options.
    Select,
    /// Hidden input, usually carrying a default value.
    Hidden,
    /// Multi-line text.
    Textarea,
    /// Any other input type, kept verbatim (`email`, `date`, `url`, ...).
    Other(String),
}

impl FieldType {
    /// Parse an input type name. Unknown names become [`FieldType::Other`].
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "" | "text" => FieldType::Text,
            "number" => FieldType::Number,
            "range" => FieldType::Range,
            "checkbox" => FieldType::Checkbox,
            "radio" => FieldType::Radio,
            "select" => FieldType::Select,
            "hidden" => FieldType::Hidden,
            "textarea" => FieldType::Textarea,
            other => FieldType::Other(other.to_string()),
        }
    }

    /// Name of the input type.
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Range => "range",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Select => "select",
            FieldType::Hidden => "hidden",
            FieldType::Textarea => "textarea",
            FieldType::Other(name) => name,
        }
    }
}

/// A single input of a [`Form`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Name of the submitted value.
    pub name: String,
    /// Input type.
    pub field_type: FieldType,
    /// Submission fails when this value is missing.
    pub required: bool,
    /// Human-readable label or description.
    pub label: Option<String>,
    /// Default value.
    pub value: Option<Value>,
    /// The value may not be changed by the caller.
    pub read_only: bool,
    /// Regular expression the value must match (informational).
    pub pattern: Option<String>,
    /// Allowed values for select/radio inputs.
    pub options: Vec<Value>,
}

impl Field {
    /// Create a field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Field {
            name: name.into(),
            field_type,
            required: false,
            label: None,
            value: None,
            read_only: false,
            pattern: None,
            options: Vec::new(),
        }
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set a default value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn coerce(&self, value: Value) -> Result<Value> {
        match (&self.field_type, value) {
            (FieldType::Number | FieldType::Range, Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Ok(Value::from(i));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| {
                        HypermediaError::Validation(format!(
                            "field `{}` expects a number, got {:?}",
                            self.name, s
                        ))
                    })
            }
            (FieldType::Checkbox, Value::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "on" | "1" | "yes" => Ok(Value::Bool(true)),
                    "false" | "off" | "0" | "no" | "" => Ok(Value::Bool(false)),
                    _ => Err(HypermediaError::Validation(format!(
                        "field `{}` expects a boolean, got {:?}",
                        self.name, s
                    ))),
                }
            }
            (FieldType::Checkbox, Value::Number(n)) => Ok(Value::Bool(n.as_f64() != Some(0.0))),
            (_, value) => Ok(value),
        }
    }
}

/// Request produced by encoding form values.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedForm {
    /// Target URI, including the query string for safe methods.
    pub uri: String,
    /// HTTP method.
    pub method: Method,
    /// Serialized body, if the method carries one.
    pub body: Option<Bytes>,
    /// Content type of `body`.
    pub content_type: Option<String>,
}

/// A described state transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    /// Absolute target URI.
    pub uri: String,
    /// Template key or action name.
    pub name: String,
    /// Relation the form is registered under.
    pub rel: String,
    /// Human-readable title.
    pub title: Option<String>,
    /// HTTP method.
    pub method: Method,
    /// Content type of submitted bodies.
    pub content_type: String,
    /// Inputs.
    pub fields: Vec<Field>,
}

impl Form {
    /// Create a form with no fields.
    pub fn new(name: impl Into<String>, uri: impl Into<String>, method: Method) -> Self {
        let name = name.into();
        Form {
            uri: uri.into(),
            rel: name.clone(),
            name,
            title: None,
            method,
            content_type: JSON.to_string(),
            fields: Vec::new(),
        }
    }

    /// Set the content type of submitted bodies.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Merge defaults with `values`, coerce by field type and check required
    /// fields.
    ///
    /// Values for names the form does not declare are passed through
    /// unchanged. Read-only fields always keep their default.
    pub fn prepare_values(&self, values: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut out = Map::new();

        for field in &self.fields {
            let supplied = if field.read_only {
                None
            } else {
                values.get(&field.name).cloned()
            };
            let Some(value) = supplied.or_else(|| field.value.clone()) else {
                continue;
            };
            let value = match value {
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|v| field.coerce(v))
                        .collect::<Result<Vec<_>>>()?,
                ),
                other => field.coerce(other)?,
            };
            if !value.is_null() {
                out.insert(field.name.clone(), value);
            }
        }

        for (name, value) in values {
            if self.field(name).is_none() {
                out.insert(name.clone(), value.clone());
            }
        }

        if let Some(missing) = self
            .fields
            .iter()
            .find(|f| f.required && !out.contains_key(&f.name))
        {
            return Err(HypermediaError::Validation(format!(
                "required field `{}` of form `{}` is missing",
                missing.name, self.name
            )));
        }

        Ok(out)
    }

    /// Encode prepared values into a request.
    ///
    /// GET and HEAD forms put the values in the query string. Other methods
    /// serialize a urlencoded body when the form asks for one and JSON
    /// otherwise.
    pub fn encode(&self, values: &Map<String, Value>) -> Result<EncodedForm> {
        if self.method == Method::GET || self.method == Method::HEAD {
            let uri = if values.is_empty() {
                self.uri.clone()
            } else {
                append_query(&self.uri, values)?
            };
            return Ok(EncodedForm {
                uri,
                method: self.method.clone(),
                body: None,
                content_type: None,
            });
        }

        let content_type = normalize_content_type(&self.content_type);
        let body = if content_type == FORM_URLENCODED {
            Bytes::from(urlencode(values))
        } else {
            let json = serde_json::to_vec(&Value::Object(values.clone()))
                .map_err(|e| HypermediaError::Validation(e.to_string()))?;
            Bytes::from(json)
        };

        Ok(EncodedForm {
            uri: self.uri.clone(),
            method: self.method.clone(),
            body: Some(body),
            content_type: Some(self.content_type.clone()),
        })
    }
}

fn urlencode(values: &Map<String, Value>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in values {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(s) = form_value(item) {
                        serializer.append_pair(name, &s);
                    }
                }
            }
            other => {
                if let Some(s) = form_value(other) {
                    serializer.append_pair(name, &s);
                }
            }
        }
    }
    serializer.finish()
}

fn form_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
