//! Translation of raw tool input into action parameters.

use action_primitives::Params;
use action_registry::{MapContext, MappingError, ToolSpec};
use serde_json::Value;

/// Aliases the default mapper adds for common field spellings.
const KEY_ALIASES: [(&str, &str); 5] = [
    ("blockName", "name"),
    ("itemName", "item"),
    ("entityName", "entity"),
    ("playerName", "player"),
    ("targetName", "target"),
];

/// Default mapping applied when a tool spec has no mapper of its own.
///
/// Objects pass through unchanged, and each aliased key also populates its
/// short form unless the caller already supplied it. `null` maps to empty
/// parameters; any other input shape is rejected.
///
/// # Errors
///
/// Returns [`MappingError::InvalidInput`] when `input` is neither an object
/// nor `null`.
pub fn default_mapper(input: &Value, _context: &MapContext) -> Result<Params, MappingError> {
    let mut params = match input {
        Value::Null => return Ok(Params::new()),
        Value::Object(fields) => fields.clone(),
        other => {
            return Err(MappingError::invalid(format!(
                "tool input must be a JSON object, got {}",
                type_name(other)
            )));
        }
    };

    for (long, short) in KEY_ALIASES {
        if params.contains_key(short) {
            continue;
        }
        if let Some(value) = params.get(long).cloned() {
            params.insert(short.to_owned(), value);
        }
    }

    Ok(params)
}

/// Maps input with the spec's own mapper, falling back to [`default_mapper`].
///
/// # Errors
///
/// Propagates the mapper's [`MappingError`].
pub fn map_input(spec: &ToolSpec, input: &Value, context: &MapContext) -> Result<Params, MappingError> {
    match spec.mapper() {
        Some(mapper) => mapper(input, context),
        None => default_mapper(input, context),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use action_primitives::RequestId;
    use serde_json::json;

    fn context() -> MapContext {
        MapContext::new("mine_block", RequestId::random())
    }

    #[test]
    fn aliases_are_added_next_to_the_original_keys() {
        let params = default_mapper(&json!({ "blockName": "dirt554", "count": 1 }), &context())
            .expect("mapped");
        assert_eq!(params["name"], json!("dirt554"));
        assert_eq!(params["blockName"], json!("dirt554"));
        assert_eq!(params["count"], json!(1));
    }

    #[test]
    fn explicit_short_keys_win_over_aliases() {
        let params = default_mapper(
            &json!({ "playerName": "alex", "player": "steve" }),
            &context(),
        )
        .expect("mapped");
        assert_eq!(params["player"], json!("steve"));
    }

    #[test]
    fn null_is_empty_and_scalars_are_rejected() {
        assert!(default_mapper(&Value::Null, &context()).expect("mapped").is_empty());

        let err = default_mapper(&json!([1, 2]), &context()).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn custom_mapper_takes_precedence() {
        let spec = ToolSpec::new("craft", "Craft an item").with_mapper(|input, ctx| {
            let mut params = Params::new();
            params.insert("recipe".into(), input["what"].clone());
            params.insert("tool".into(), json!(ctx.tool_name()));
            Ok(params)
        });

        let params = map_input(&spec, &json!({ "what": "torch" }), &context()).expect("mapped");
        assert_eq!(params["recipe"], json!("torch"));
        assert_eq!(params["tool"], json!("mine_block"));
        assert!(!params.contains_key("what"));
    }
}
