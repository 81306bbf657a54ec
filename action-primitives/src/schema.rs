//! Parameter maps and their declarative schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const MAX_FIELD_LEN: usize = 64;

/// Parameters handed to an action, keyed by field name.
pub type Params = Map<String, Value>;

/// Declarative description of the parameters an action accepts.
///
/// Serializes as a flat `{ field: description }` object, which is also the
/// diagnostic payload returned when validation fails.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamsSchema {
    fields: BTreeMap<String, String>,
    #[serde(skip)]
    required: Vec<String>,
}

impl ParamsSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchemaField`] if the name is empty or too long.
    pub fn field(mut self, name: impl Into<String>, description: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_field_name(&name)?;
        self.required.push(name.clone());
        self.fields.insert(name, description.into());
        Ok(self)
    }

    /// Adds an optional field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchemaField`] if the name is empty or too long.
    pub fn optional_field(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        validate_field_name(&name)?;
        self.fields.insert(name, description.into());
        Ok(self)
    }

    /// Returns the field descriptions keyed by name.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Returns the names of required fields in declaration order.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Returns `true` when the schema declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `true` when every required field is present and not `null`.
    #[must_use]
    pub fn has_required(&self, params: &Params) -> bool {
        self.required
            .iter()
            .all(|name| params.get(name).is_some_and(|value| !value.is_null()))
    }

    /// Renders the schema as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, description)| (name.clone(), Value::from(description.as_str())))
                .collect(),
        )
    }
}

fn validate_field_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidSchemaField {
            field: String::new(),
            reason: "field name cannot be empty".into(),
        });
    }
    if name.len() > MAX_FIELD_LEN {
        return Err(Error::InvalidSchemaField {
            field: name.into(),
            reason: format!("field name length must be <= {MAX_FIELD_LEN}"),
        });
    }
    Ok(())
}
