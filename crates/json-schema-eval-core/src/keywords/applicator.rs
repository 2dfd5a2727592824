//! Applicator vocabulary: keywords that apply subschemas to (parts of) the
//! instance, producing child result nodes.
//!
//! In-place applicators (`allOf`, `$ref`, `if`/`then`/`else`, ...) keep the
//! instance location; array and property applicators descend into items and
//! members. Annotations report what was evaluated, which is what the
//! `unevaluated*` keywords later consume.

use regex::Regex;
use serde_json::{json, Value};

use crate::compiler::{Compiler, KeywordSite};
use crate::error::{EvalError, SchemaError};
use crate::evaluator::{sibling, EvalContext, ResultNode};
use crate::json::{JsonNode, JsonValue};
use crate::keywords::{display_list, Keyword};
use crate::schema::SchemaIndex;

// ---------------------------------------------------------------------------
// Factory helpers
// ---------------------------------------------------------------------------

pub(crate) fn compile_single(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<SchemaIndex, SchemaError> {
    compiler.subschema(site, &[site.name], value)
}

pub(crate) fn compile_array(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Vec<SchemaIndex>, SchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| compiler.invalid(site, "must be an array of schemas"))?;
    let mut subschemas = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        subschemas.push(compiler.subschema(site, &[site.name, &index.to_string()], item)?);
    }
    Ok(subschemas)
}

pub(crate) fn compile_map(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Vec<(String, SchemaIndex)>, SchemaError> {
    let members = value
        .as_object()
        .ok_or_else(|| compiler.invalid(site, "must be an object of schemas"))?;
    let mut subschemas = Vec::with_capacity(members.len());
    for (name, member) in members {
        subschemas.push((
            name.clone(),
            compiler.subschema(site, &[site.name, name], member)?,
        ));
    }
    Ok(subschemas)
}

// ---------------------------------------------------------------------------
// allOf / anyOf / oneOf / not
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AllOf {
    subschemas: Vec<SchemaIndex>,
}

impl Keyword for AllOf {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let mut err_indices = Vec::new();
        for (index, subschema) in self.subschemas.iter().enumerate() {
            if !ctx.descend(*subschema, instance, result, Some(&index.to_string()))? {
                err_indices.push(index);
            }
        }
        if !err_indices.is_empty() {
            result.fail_containment(format!(
                "The instance is invalid against subschemas {}",
                display_list(&err_indices)
            ));
        }
        Ok(())
    }
}

pub(crate) fn all_of_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(AllOf {
        subschemas: compile_array(compiler, site, value)?,
    }))
}

#[derive(Debug)]
pub struct AnyOf {
    subschemas: Vec<SchemaIndex>,
}

impl Keyword for AnyOf {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let mut valid = false;
        for (index, subschema) in self.subschemas.iter().enumerate() {
            if ctx.descend(*subschema, instance, result, Some(&index.to_string()))? {
                valid = true;
            }
        }
        if !valid {
            result.fail_containment("The instance must be valid against at least one subschema");
        }
        Ok(())
    }
}

pub(crate) fn any_of_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(AnyOf {
        subschemas: compile_array(compiler, site, value)?,
    }))
}

#[derive(Debug)]
pub struct OneOf {
    subschemas: Vec<SchemaIndex>,
}

impl Keyword for OneOf {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let mut valid_indices = Vec::new();
        let mut err_indices = Vec::new();
        for (index, subschema) in self.subschemas.iter().enumerate() {
            if ctx.descend(*subschema, instance, result, Some(&index.to_string()))? {
                valid_indices.push(index);
            } else {
                err_indices.push(index);
            }
        }
        if valid_indices.len() != 1 {
            let message = format!(
                "The instance must be valid against exactly one subschema; \
                 it is valid against {} and invalid against {}",
                display_list(&valid_indices),
                display_list(&err_indices)
            );
            if valid_indices.len() > 1 {
                result.fail(message);
            } else {
                result.fail_containment(message);
            }
        }
        Ok(())
    }
}

pub(crate) fn one_of_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(OneOf {
        subschemas: compile_array(compiler, site, value)?,
    }))
}

#[derive(Debug)]
pub struct Not {
    subschema: SchemaIndex,
}

impl Keyword for Not {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if ctx.descend(self.subschema, instance, result, None)? {
            result.fail("The instance must not be valid against the subschema");
        }
        Ok(())
    }
}

pub(crate) fn not_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(Not {
        subschema: compile_single(compiler, site, value)?,
    }))
}

// ---------------------------------------------------------------------------
// if / then / else
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct If {
    subschema: SchemaIndex,
}

impl Keyword for If {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        ctx.descend(self.subschema, instance, result, None)?;
        result.no_assert();
        Ok(())
    }
}

pub(crate) fn if_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(If {
        subschema: compile_single(compiler, site, value)?,
    }))
}

/// The actual outcome of the sibling `if` subschema, if present.
fn if_outcome(siblings: &[ResultNode], instance: &JsonNode) -> Option<bool> {
    sibling(siblings, "if", &instance.path)
        .and_then(|node| node.children.first())
        .map(ResultNode::passed)
}

#[derive(Debug)]
pub struct Then {
    subschema: SchemaIndex,
}

impl Keyword for Then {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        match if_outcome(siblings, instance) {
            Some(true) => {
                if !ctx.descend(self.subschema, instance, result, None)? {
                    result.fail_containment(
                        "The instance is invalid against the \"then\" subschema",
                    );
                }
            }
            _ => result.discard(),
        }
        Ok(())
    }
}

pub(crate) fn then_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(Then {
        subschema: compile_single(compiler, site, value)?,
    }))
}

#[derive(Debug)]
pub struct Else {
    subschema: SchemaIndex,
}

impl Keyword for Else {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        match if_outcome(siblings, instance) {
            Some(false) => {
                if !ctx.descend(self.subschema, instance, result, None)? {
                    result.fail_containment(
                        "The instance is invalid against the \"else\" subschema",
                    );
                }
            }
            _ => result.discard(),
        }
        Ok(())
    }
}

pub(crate) fn else_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(Else {
        subschema: compile_single(compiler, site, value)?,
    }))
}

// ---------------------------------------------------------------------------
// dependentSchemas
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DependentSchemas {
    subschemas: Vec<(String, SchemaIndex)>,
}

impl Keyword for DependentSchemas {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let mut annotation = Vec::new();
        let mut err_names = Vec::new();
        for (name, subschema) in &self.subschemas {
            if instance.get(name).is_some() {
                if ctx.descend(*subschema, instance, result, Some(name))? {
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
                "Properties {} are invalid against the corresponding \"dependentSchemas\" subschemas",
                display_list(&err_names)
            ));
        }
        Ok(())
    }
}

pub(crate) fn dependent_schemas_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(DependentSchemas {
        subschemas: compile_map(compiler, site, value)?,
    }))
}

// ---------------------------------------------------------------------------
// prefixItems / items (2020-12)
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PrefixItems {
    subschemas: Vec<SchemaIndex>,
}

impl Keyword for PrefixItems {
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
        let mut last_index = None;
        let mut err_indices = Vec::new();
        for (index, item) in items.iter().take(self.subschemas.len()).enumerate() {
            last_index = Some(index);
            if !ctx.descend(self.subschemas[index], item, result, Some(&index.to_string()))? {
                err_indices.push(index);
            }
        }
        if !err_indices.is_empty() {
            result.fail_containment(format!(
                "Array elements {} are invalid",
                display_list(&err_indices)
            ));
        } else if let Some(last) = last_index {
            if last == items.len() - 1 {
                result.annotate(json!(true));
            } else {
                result.annotate(json!(last));
            }
        }
        Ok(())
    }
}

pub(crate) fn prefix_items_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(PrefixItems {
        subschemas: compile_array(compiler, site, value)?,
    }))
}

#[derive(Debug)]
pub struct Items {
    subschema: SchemaIndex,
    /// Number of sibling `prefixItems` subschemas at this schema node.
    start: usize,
}

impl Keyword for Items {
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
        let mut evaluated = false;
        let mut err_indices = Vec::new();
        for (index, item) in items.iter().enumerate().skip(self.start) {
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

pub(crate) fn items_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let start = site
        .parent
        .get("prefixItems")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    Ok(Box::new(Items {
        subschema: compile_single(compiler, site, value)?,
        start,
    }))
}

// ---------------------------------------------------------------------------
// contains
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Contains {
    subschema: SchemaIndex,
}

impl Keyword for Contains {
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
        let mut matched = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if ctx.descend(self.subschema, item, result, None)? {
                matched.push(index);
            }
        }
        result.annotate(json!(matched));
        if matched.is_empty() {
            result.fail(
                "The array does not contain any element that is valid \
                 against the \"contains\" subschema",
            );
        }
        Ok(())
    }
}

pub(crate) fn contains_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(Contains {
        subschema: compile_single(compiler, site, value)?,
    }))
}

// ---------------------------------------------------------------------------
// properties / patternProperties / additionalProperties / propertyNames
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Properties {
    subschemas: Vec<(String, SchemaIndex)>,
}

impl Keyword for Properties {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let members = match &instance.value {
            JsonValue::Object(members) => members,
            _ => return Ok(()),
        };
        let mut annotation = Vec::new();
        let mut err_names = Vec::new();
        for (name, item) in members {
            if let Some((_, subschema)) = self.subschemas.iter().find(|(n, _)| n == name) {
                if ctx.descend(*subschema, item, result, Some(name))? {
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

pub(crate) fn properties_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(Properties {
        subschemas: compile_map(compiler, site, value)?,
    }))
}

pub struct PatternProperties {
    subschemas: Vec<(String, Regex, SchemaIndex)>,
}

impl std::fmt::Debug for PatternProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternProperties")
            .field(
                "patterns",
                &self.subschemas.iter().map(|(p, _, _)| p).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Keyword for PatternProperties {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let members = match &instance.value {
            JsonValue::Object(members) => members,
            _ => return Ok(()),
        };
        let mut matched_names: Vec<String> = Vec::new();
        let mut err_names = Vec::new();
        for (name, item) in members {
            for (pattern, regex, subschema) in &self.subschemas {
                if regex.is_match(name) {
                    if ctx.descend(*subschema, item, result, Some(pattern))? {
                        if !matched_names.iter().any(|n| n == name) {
                            matched_names.push(name.clone());
                        }
                    } else {
                        err_names.push(name.as_str());
                    }
                }
            }
        }
        if err_names.is_empty() {
            result.annotate(json!(matched_names));
        } else {
            result.fail_containment(format!(
                "Properties {} are invalid",
                display_list(&err_names)
            ));
        }
        Ok(())
    }
}

pub(crate) fn pattern_properties_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let members = value
        .as_object()
        .ok_or_else(|| compiler.invalid(site, "must be an object of schemas"))?;
    let mut subschemas = Vec::with_capacity(members.len());
    for (pattern, member) in members {
        let regex = Regex::new(pattern)
            .map_err(|e| compiler.invalid(site, format!("invalid pattern '{pattern}': {e}")))?;
        let subschema = compiler.subschema(site, &[site.name, pattern], member)?;
        subschemas.push((pattern.clone(), regex, subschema));
    }
    Ok(Box::new(PatternProperties { subschemas }))
}

pub struct AdditionalProperties {
    subschema: SchemaIndex,
    /// Property names bound by the sibling `properties` keyword.
    sibling_names: Vec<String>,
    /// Patterns bound by the sibling `patternProperties` keyword.
    sibling_patterns: Vec<Regex>,
}

impl std::fmt::Debug for AdditionalProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdditionalProperties")
            .field("sibling_names", &self.sibling_names)
            .finish_non_exhaustive()
    }
}

impl Keyword for AdditionalProperties {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let members = match &instance.value {
            JsonValue::Object(members) => members,
            _ => return Ok(()),
        };
        let mut annotation = Vec::new();
        let mut err_names = Vec::new();
        for (name, item) in members {
            let covered = self.sibling_names.iter().any(|n| n == name)
                || self.sibling_patterns.iter().any(|re| re.is_match(name));
            if !covered {
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

pub(crate) fn additional_properties_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let sibling_names = site
        .parent
        .get("properties")
        .and_then(Value::as_object)
        .map(|members| members.keys().cloned().collect())
        .unwrap_or_default();
    let mut sibling_patterns = Vec::new();
    if let Some(patterns) = site.parent.get("patternProperties").and_then(Value::as_object) {
        for pattern in patterns.keys() {
            sibling_patterns.push(Regex::new(pattern).map_err(|e| {
                compiler.invalid(site, format!("invalid sibling pattern '{pattern}': {e}"))
            })?);
        }
    }
    Ok(Box::new(AdditionalProperties {
        subschema: compile_single(compiler, site, value)?,
        sibling_names,
        sibling_patterns,
    }))
}

#[derive(Debug)]
pub struct PropertyNames {
    subschema: SchemaIndex,
}

impl Keyword for PropertyNames {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let members = match &instance.value {
            JsonValue::Object(members) => members,
            _ => return Ok(()),
        };
        let mut err_names = Vec::new();
        for (name, _) in members {
            let name_node = JsonNode::detached_string(name, instance.path.child(name.clone()));
            if !ctx.descend(self.subschema, &name_node, result, None)? {
                err_names.push(name.as_str());
            }
        }
        if !err_names.is_empty() {
            result.fail_containment(format!(
                "Property names {} are invalid",
                display_list(&err_names)
            ));
        }
        Ok(())
    }
}

pub(crate) fn property_names_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(PropertyNames {
        subschema: compile_single(compiler, site, value)?,
    }))
}
