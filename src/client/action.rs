//! Submitting forms.

use crate::client::{utils, Client, RequestOptions, Resource};
use crate::error::{HypermediaError, Result};
use crate::types::{Field, Form, State};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use serde_json::{Map, Value};
use std::fmt;

/// Extra validation of form values, run after defaults and coercion and
/// before anything is sent.
///
/// ```
/// use hypermedia_client::{Form, HypermediaError, Result, SchemaPlugin};
/// use serde_json::{Map, Value};
///
/// struct NoEmptyStrings;
///
/// impl SchemaPlugin for NoEmptyStrings {
///     fn validate(&self, form: &Form, values: &Map<String, Value>) -> Result<()> {
///         match values.iter().find(|(_, v)| v.as_str() == Some("")) {
///             Some((name, _)) => Err(HypermediaError::Validation(format!("{}.{} is empty", form.name, name))),
///             None => Ok(()),
///         }
///     }
/// }
/// ```
pub trait SchemaPlugin: Send + Sync {
    /// Reject `values` with [`HypermediaError::Validation`].
    fn validate(&self, form: &Form, values: &Map<String, Value>) -> Result<()>;
}

/// A form bound to a client, ready to submit.
#[derive(Clone)]
pub struct Action {
    form: Form,
    client: Option<Client>,
    // state the form was found on
    source: Option<String>,
}

impl Action {
    /// Bind `form` to `client`. Unbound actions can be inspected but not
    /// submitted.
    pub fn new(form: Form, client: Option<Client>) -> Self {
        Action {
            form,
            client,
            source: None,
        }
    }

    pub(crate) fn with_source(mut self, uri: impl Into<String>) -> Self {
        self.source = Some(uri.into());
        self
    }

    /// The underlying form.
    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Form name.
    pub fn name(&self) -> &str {
        &self.form.name
    }

    /// Absolute target URI.
    pub fn uri(&self) -> &str {
        &self.form.uri
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.form.method
    }

    /// Human-readable title.
    pub fn title(&self) -> Option<&str> {
        self.form.title.as_deref()
    }

    /// Content type of submitted bodies.
    pub fn content_type(&self) -> &str {
        &self.form.content_type
    }

    /// Inputs.
    pub fn fields(&self) -> &[Field] {
        &self.form.fields
    }

    /// Look up an input by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.form.field(name)
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or_else(|| {
            HypermediaError::Config(format!("action `{}` is not bound to a client", self.form.name))
        })
    }

    /// Validate and encode `values` into request options and a target.
    fn prepare(&self, client: &Client, values: &Map<String, Value>) -> Result<(String, RequestOptions)> {
        let values = self.form.prepare_values(values)?;
        if let Some(plugin) = &client.config().schema_plugin {
            plugin.validate(&self.form, &values)?;
        }

        let encoded = self.form.encode(&values)?;
        let mut options = RequestOptions::method(encoded.method);
        if let Some(content_type) = &encoded.content_type {
            let value = HeaderValue::from_str(content_type)
                .map_err(|e| HypermediaError::Validation(format!("invalid content type: {}", e)))?;
            options = options.with_header(CONTENT_TYPE, value);
        }
        options.body = encoded.body;
        Ok((encoded.uri, options))
    }

    /// Submit the form and parse the response.
    ///
    /// Missing values fall back to field defaults. Required fields that are
    /// still missing fail with [`HypermediaError::Validation`] before any
    /// request is made.
    pub async fn submit(&self, values: Map<String, Value>) -> Result<State> {
        let client = self.client()?;
        let (uri, options) = self.prepare(client, &values)?;
        tracing::debug!("Submitting `{}` as {} {}", self.form.name, self.form.method, uri);

        let state = client.request_state(&uri, &options, None).await?;
        if !State::is_safe(&self.form.method) {
            if let Some(source) = &self.source {
                client.cache().delete(source);
            }
        }
        Ok(state)
    }

    /// Submit the form and return the resource it leads to: the response's
    /// `Location`, or for `GET` forms the URI the values were encoded into.
    pub async fn submit_follow(&self, values: Map<String, Value>) -> Result<Resource> {
        let client = self.client()?;
        let (uri, options) = self.prepare(client, &values)?;
        if self.form.method == Method::GET {
            return client.go(&uri);
        }

        let state = client.request_state(&uri, &options, None).await?;
        if let Some(source) = &self.source {
            client.cache().delete(source);
        }
        match utils::location(state.headers(), &uri)? {
            Some(location) => client.go(&location),
            None => Err(HypermediaError::malformed("Location", "response has no Location header")),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.form.name)
            .field("method", &self.form.method)
            .field("uri", &self.form.uri)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::types::FieldType;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn search_form() -> Form {
        Form::new("search", "https://example.org/search", Method::GET)
            .with_field(Field::new("q", FieldType::Text).required())
            .with_field(Field::new("page", FieldType::Number).with_value(1))
    }

    #[tokio::test]
    async fn test_unbound_action_cannot_submit() {
        let action = Action::new(search_form(), None);
        assert_eq!(action.name(), "search");
        assert!(matches!(action.submit(Map::new()).await, Err(HypermediaError::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_required_field_sends_nothing() {
        let client = Client::new().unwrap();
        let action = Action::new(search_form(), Some(client));
        assert!(matches!(
            action.submit(Map::new()).await,
            Err(HypermediaError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_form_follow_encodes_query() {
        let client = Client::new().unwrap();
        let action = Action::new(search_form(), Some(client));
        let mut values = Map::new();
        values.insert("q".into(), json!("rust"));
        let resource = action.submit_follow(values).await.unwrap();
        assert_eq!(resource.uri(), "https://example.org/search?page=1&q=rust");
    }

    struct Counting(AtomicUsize);

    impl SchemaPlugin for Arc<Counting> {
        fn validate(&self, _form: &Form, values: &Map<String, Value>) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if values.get("q") == Some(&json!("forbidden")) {
                return Err(HypermediaError::Validation("q is forbidden".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_schema_plugin_runs_before_request() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let config = ClientConfig::default().with_schema_plugin(counter.clone());
        let client = Client::with_config(config).unwrap();
        let action = Action::new(search_form(), Some(client));

        let mut values = Map::new();
        values.insert("q".into(), json!("forbidden"));
        assert!(matches!(
            action.submit_follow(values).await,
            Err(HypermediaError::Validation(_))
        ));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
