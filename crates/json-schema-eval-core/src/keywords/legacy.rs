//! 2019-09 array applicators: `items` (schema or tuple form) and
//! `additionalItems`.

use serde_json::{json, Value};

use crate::compiler::{Compiler, KeywordSite};
use crate::error::{EvalError, SchemaError};
use crate::evaluator::{sibling, EvalContext, ResultNode};
use crate::json::{JsonNode, JsonValue};
use crate::keywords::{display_list, Keyword};
use crate::schema::SchemaIndex;

#[derive(Debug)]
enum ItemsForm {
    /// One schema applied to every element; annotation `true`.
    Single(SchemaIndex),
    /// Tuple form; annotation is the largest evaluated index.
    Tuple(Vec<SchemaIndex>),
}

#[derive(Debug)]
pub struct LegacyItems {
    form: ItemsForm,
}

impl Keyword for LegacyItems {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let items = match &instance.value {
            JsonValue::Array(items) => items,
            _ => return Ok(()),
        };
        if items.is_empty() {
            return Ok(());
        }
        match &self.form {
            ItemsForm::Single(subschema) => {
                let mut err_indices = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    if !ctx.descend(*subschema, item, result, None)? {
                        err_indices.push(index);
                    }
                }
                if err_indices.is_empty() {
                    result.annotate(json!(true));
                } else {
                    result.fail_containment(format!(
                        "Array elements {} are invalid",
                        display_list(&err_indices)
                    ));
                }
            }
            ItemsForm::Tuple(subschemas) => {
                let mut last_index = None;
                let mut err_indices = Vec::new();
                for (index, item) in items.iter().take(subschemas.len()).enumerate() {
                    last_index = Some(index);
                    if !ctx.descend(subschemas[index], item, result, Some(&index.to_string()))? {
                        err_indices.push(index);
                    }
                }
                if !err_indices.is_empty() {
                    result.fail_containment(format!(
                        "Array elements {} are invalid",
                        display_list(&err_indices)
                    ));
                } else if let Some(last) = last_index {
                    result.annotate(json!(last));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn legacy_items_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let form = match value {
        Value::Array(items) => {
            let mut subschemas = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                subschemas.push(compiler.subschema(site, &[site.name, &index.to_string()], item)?);
            }
            ItemsForm::Tuple(subschemas)
        }
        _ => ItemsForm::Single(compiler.subschema(site, &[site.name], value)?),
    };
    Ok(Box::new(LegacyItems { form }))
}

#[derive(Debug)]
pub struct AdditionalItems {
    subschema: SchemaIndex,
}

impl Keyword for AdditionalItems {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        // Only applies after a tuple-form `items` that left an index annotation.
        let start = match sibling(siblings, "items", &instance.path)
            .and_then(|node| node.annotation.as_ref())
            .and_then(Value::as_u64)
        {
            Some(last) => last as usize + 1,
            None => {
                result.discard();
                return Ok(());
            }
        };
        let items = match &instance.value {
            JsonValue::Array(items) => items,
            _ => return Ok(()),
        };
        let mut evaluated = false;
        let mut err_indices = Vec::new();
        for (index, item) in items.iter().enumerate().skip(start) {
            evaluated = true;
            if !ctx.descend(self.subschema, item, result, None)? {
                err_indices.push(index);
            }
        }
        if !err_indices.is_empty() {
            result.fail_containment(format!(
                "Array elements {} are invalid",
                display_list(&err_indices)
            ));
        } else if evaluated {
            result.annotate(json!(true));
        }
        Ok(())
    }
}

pub(crate) fn additional_items_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(AdditionalItems {
        subschema: compiler.subschema(site, &[site.name], value)?,
    }))
}
