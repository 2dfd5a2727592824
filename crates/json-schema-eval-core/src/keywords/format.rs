//! The `format` keyword.
//!
//! Always annotates with the format name. It only asserts when the format
//! was enabled on the catalog *and* a validator is registered for it; the
//! validator binding is captured at compile time, so enabling formats after
//! compilation has no effect on existing schemas.

use serde_json::{json, Value};

use crate::compiler::{Compiler, KeywordSite};
use crate::error::{EvalError, SchemaError};
use crate::evaluator::{EvalContext, ResultNode};
use crate::formats::FormatRegistration;
use crate::json::JsonNode;
use crate::keywords::Keyword;

pub struct FormatKeyword {
    name: String,
    validator: Option<FormatRegistration>,
}

impl std::fmt::Debug for FormatKeyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatKeyword")
            .field("name", &self.name)
            .field("asserting", &self.validator.is_some())
            .finish()
    }
}

impl Keyword for FormatKeyword {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        result.annotate(json!(self.name));
        match &self.validator {
            Some(registration) if registration.instance_types.contains(&instance.json_type()) => {
                if let Err(message) = (registration.validator)(instance) {
                    result.fail(format!(
                        "The instance is invalid against the \"{}\" format: {message}",
                        self.name
                    ));
                }
            }
            _ => result.no_assert(),
        }
        Ok(())
    }
}

pub(crate) fn format_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let name = value
        .as_str()
        .ok_or_else(|| compiler.invalid(site, "must be a format name string"))?;
    let validator = compiler.enabled_format(name);
    Ok(Box::new(FormatKeyword {
        name: name.to_string(),
        validator,
    }))
}
