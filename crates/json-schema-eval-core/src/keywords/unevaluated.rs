//! `unevaluatedItems` / `unevaluatedProperties`.
//!
//! These consume the annotations produced so far at the same schema node —
//! including everything reachable through in-place applicators (`allOf`,
//! `$ref`, `if`/`then`/`else`, ...) — and apply their subschema to whatever
//! was left unevaluated. Annotations are read by keyword name from the
//! result tree, never by schema traversal, and failed subtrees contribute
//! nothing.

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::compiler::{Compiler, KeywordSite};
use crate::error::{EvalError, SchemaError};
use crate::evaluator::{collect_annotations, EvalContext, ResultNode};
use crate::json::{JsonNode, JsonValue};
use crate::keywords::{display_list, Keyword};
use crate::schema::SchemaIndex;

#[derive(Debug)]
pub struct UnevaluatedItems {
    subschema: SchemaIndex,
    /// 2019-09 consults `items`/`additionalItems`; 2020-12 consults
    /// `prefixItems`/`items` and excludes `contains` matches.
    legacy: bool,
}

impl Keyword for UnevaluatedItems {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let items = match &instance.value {
            JsonValue::Array(items) => items,
            _ => return Ok(()),
        };

        // The keywords whose annotations mark a prefix as evaluated
        // (`true` marks the whole array).
        let prefix_keys: &[&str] = if self.legacy {
            &["items", "additionalItems", "unevaluatedItems"]
        } else {
            &["prefixItems", "items", "unevaluatedItems"]
        };
        let mut last_evaluated: i64 = -1;
        for key in prefix_keys {
            let mut annotations = Vec::new();
            collect_annotations(siblings, &instance.path, key, &mut annotations);
            for annotation in annotations {
                match annotation {
                    Value::Bool(true) => {
                        result.discard();
                        return Ok(());
                    }
                    other => {
                        if let Some(index) = other.as_u64() {
                            last_evaluated = last_evaluated.max(index as i64);
                        }
                    }
                }
            }
        }

        let mut contains_indices: HashSet<usize> = HashSet::new();
        if !self.legacy {
            let mut annotations = Vec::new();
            collect_annotations(siblings, &instance.path, "contains", &mut annotations);
            for annotation in annotations {
                if let Some(indices) = annotation.as_array() {
                    contains_indices
                        .extend(indices.iter().filter_map(Value::as_u64).map(|i| i as usize));
                }
            }
        }

        let start = (last_evaluated + 1) as usize;
        let mut evaluated = false;
        let mut err_indices = Vec::new();
        for (index, item) in items.iter().enumerate().skip(start) {
            if contains_indices.contains(&index) {
                continue;
            }
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

pub(crate) fn unevaluated_items_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(UnevaluatedItems {
        subschema: compiler.subschema(site, &[site.name], value)?,
        legacy: false,
    }))
}

pub(crate) fn legacy_unevaluated_items_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(UnevaluatedItems {
        subschema: compiler.subschema(site, &[site.name], value)?,
        legacy: true,
    }))
}

#[derive(Debug)]
pub struct UnevaluatedProperties {
    subschema: SchemaIndex,
}

impl Keyword for UnevaluatedProperties {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let members = match &instance.value {
            JsonValue::Object(members) => members,
            _ => return Ok(()),
        };

        let mut evaluated_names: HashSet<&str> = HashSet::new();
        for key in [
            "properties",
            "patternProperties",
            "additionalProperties",
            "unevaluatedProperties",
        ] {
            let mut annotations = Vec::new();
            collect_annotations(siblings, &instance.path, key, &mut annotations);
            for annotation in annotations {
                if let Some(names) = annotation.as_array() {
                    evaluated_names.extend(names.iter().filter_map(Value::as_str));
                }
            }
        }

        let mut annotation = Vec::new();
        let mut err_names = Vec::new();
        for (name, item) in members {
            if !evaluated_names.contains(name.as_str()) {
                if ctx.descend(self.subschema, item, result, None)? {
                    annotation.push(name.clone());
                } else {
                    err_names.push(name.as_str());
                }
            }
        }
        if err_names.is_empty() {
            result.annotate(json!(annotation));
        } else {
            result.fail_containment(format!(
                "Properties {} are invalid",
                display_list(&err_names)
            ));
        }
        Ok(())
    }
}

pub(crate) fn unevaluated_properties_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(UnevaluatedProperties {
        subschema: compiler.subschema(site, &[site.name], value)?,
    }))
}
