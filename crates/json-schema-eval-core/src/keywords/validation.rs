//! Validation vocabulary: pure assertions over the instance.

use regex::Regex;
use serde_json::Value;

use crate::compiler::{Compiler, KeywordSite};
use crate::error::{EvalError, SchemaError};
use crate::evaluator::{sibling, sibling_mut, EvalContext, ResultNode};
use crate::json::{JsonNode, JsonType, JsonValue};
use crate::keywords::{display_list, Keyword};
use crate::number::Number;

// ---------------------------------------------------------------------------
// Factory helpers
// ---------------------------------------------------------------------------

fn keyword_number(
    compiler: &Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Number, SchemaError> {
    match value {
        Value::Number(n) => Ok(Number::from_serde(n)),
        _ => Err(compiler.invalid(site, "must be a number")),
    }
}

fn keyword_limit(
    compiler: &Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<u64, SchemaError> {
    match value {
        Value::Number(n) => Number::from_serde(n)
            .as_u64()
            .ok_or_else(|| compiler.invalid(site, "must be a non-negative integer")),
        _ => Err(compiler.invalid(site, "must be a non-negative integer")),
    }
}

fn keyword_string_array(
    compiler: &Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Vec<String>, SchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| compiler.invalid(site, "must be an array of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| compiler.invalid(site, "must be an array of strings"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum TypeMatch {
    Type(JsonType),
    Integer,
}

impl TypeMatch {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => TypeMatch::Type(JsonType::Null),
            "boolean" => TypeMatch::Type(JsonType::Boolean),
            "number" => TypeMatch::Type(JsonType::Number),
            "integer" => TypeMatch::Integer,
            "string" => TypeMatch::Type(JsonType::String),
            "array" => TypeMatch::Type(JsonType::Array),
            "object" => TypeMatch::Type(JsonType::Object),
            _ => return None,
        })
    }

    fn matches(&self, instance: &JsonNode) -> bool {
        match self {
            TypeMatch::Type(t) => instance.json_type() == *t,
            TypeMatch::Integer => instance.is_integer(),
        }
    }
}

#[derive(Debug)]
pub struct Type {
    types: Vec<TypeMatch>,
    raw: String,
}

impl Keyword for Type {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if !self.types.iter().any(|t| t.matches(instance)) {
            result.fail(format!("The value must be of type {}", self.raw));
        }
        Ok(())
    }
}

pub(crate) fn type_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let names: Vec<&str> = match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| compiler.invalid(site, "must be a type name or array thereof"))
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(compiler.invalid(site, "must be a type name or array thereof")),
    };
    let types = names
        .iter()
        .map(|name| {
            TypeMatch::from_name(name)
                .ok_or_else(|| compiler.invalid(site, format!("unknown type '{name}'")))
        })
        .collect::<Result<_, _>>()?;
    Ok(Box::new(Type {
        types,
        raw: value.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// enum / const
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Enum {
    values: Vec<JsonNode>,
    raw: String,
}

impl Keyword for Enum {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if !self.values.iter().any(|v| v == instance) {
            result.fail(format!("The value must be one of {}", self.raw));
        }
        Ok(())
    }
}

pub(crate) fn enum_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| compiler.invalid(site, "must be an array"))?;
    Ok(Box::new(Enum {
        values: items.iter().map(JsonNode::from_value).collect(),
        raw: value.to_string(),
    }))
}

#[derive(Debug)]
pub struct Const {
    value: JsonNode,
    raw: String,
}

impl Keyword for Const {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if &self.value != instance {
            result.fail(format!("The value must be equal to {}", self.raw));
        }
        Ok(())
    }
}

pub(crate) fn const_factory(
    _compiler: &mut Compiler<'_>,
    _site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(Const {
        value: JsonNode::from_value(value),
        raw: value.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Numeric bounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Bound {
    Maximum,
    ExclusiveMaximum,
    Minimum,
    ExclusiveMinimum,
}

#[derive(Debug)]
pub struct NumericBound {
    bound: Bound,
    limit: Number,
}

impl Keyword for NumericBound {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let number = match instance.as_number() {
            Some(n) => n,
            None => return Ok(()),
        };
        let (ok, message) = match self.bound {
            Bound::Maximum => (
                number <= &self.limit,
                format!("The value may not be greater than {}", self.limit),
            ),
            Bound::ExclusiveMaximum => (
                number < &self.limit,
                format!("The value must be less than {}", self.limit),
            ),
            Bound::Minimum => (
                number >= &self.limit,
                format!("The value may not be less than {}", self.limit),
            ),
            Bound::ExclusiveMinimum => (
                number > &self.limit,
                format!("The value must be greater than {}", self.limit),
            ),
        };
        if !ok {
            result.fail(message);
        }
        Ok(())
    }
}

macro_rules! bound_factory {
    ($name:ident, $bound:expr) => {
        pub(crate) fn $name(
            compiler: &mut Compiler<'_>,
            site: &KeywordSite<'_>,
            value: &Value,
        ) -> Result<Box<dyn Keyword>, SchemaError> {
            Ok(Box::new(NumericBound {
                bound: $bound,
                limit: keyword_number(compiler, site, value)?,
            }))
        }
    };
}

bound_factory!(maximum_factory, Bound::Maximum);
bound_factory!(exclusive_maximum_factory, Bound::ExclusiveMaximum);
bound_factory!(minimum_factory, Bound::Minimum);
bound_factory!(exclusive_minimum_factory, Bound::ExclusiveMinimum);

#[derive(Debug)]
pub struct MultipleOf {
    divisor: Number,
}

impl Keyword for MultipleOf {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if let Some(number) = instance.as_number() {
            if !number.is_multiple_of(&self.divisor) {
                result.fail(format!("The value must be a multiple of {}", self.divisor));
            }
        }
        Ok(())
    }
}

pub(crate) fn multiple_of_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let divisor = keyword_number(compiler, site, value)?;
    if !divisor.is_positive() {
        return Err(compiler.invalid(site, "must be greater than zero"));
    }
    Ok(Box::new(MultipleOf { divisor }))
}

// ---------------------------------------------------------------------------
// String constraints
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MaxLength {
    limit: u64,
}

impl Keyword for MaxLength {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if let Some(text) = instance.as_str() {
            if text.chars().count() as u64 > self.limit {
                result.fail(format!(
                    "The text is too long (maximum {} characters)",
                    self.limit
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn max_length_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(MaxLength {
        limit: keyword_limit(compiler, site, value)?,
    }))
}

#[derive(Debug)]
pub struct MinLength {
    limit: u64,
}

impl Keyword for MinLength {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if let Some(text) = instance.as_str() {
            if (text.chars().count() as u64) < self.limit {
                result.fail(format!(
                    "The text is too short (minimum {} characters)",
                    self.limit
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn min_length_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(MinLength {
        limit: keyword_limit(compiler, site, value)?,
    }))
}

pub struct Pattern {
    regex: Regex,
    raw: String,
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern").field("raw", &self.raw).finish()
    }
}

impl Keyword for Pattern {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if let Some(text) = instance.as_str() {
            if !self.regex.is_match(text) {
                result.fail(format!(
                    "The text must match the regular expression \"{}\"",
                    self.raw
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn pattern_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let raw = value
        .as_str()
        .ok_or_else(|| compiler.invalid(site, "must be a regular expression string"))?;
    let regex = Regex::new(raw)
        .map_err(|e| compiler.invalid(site, format!("invalid regular expression: {e}")))?;
    Ok(Box::new(Pattern {
        regex,
        raw: raw.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Array constraints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum CountKind {
    MaxItems,
    MinItems,
    MaxProperties,
    MinProperties,
}

#[derive(Debug)]
pub struct CountLimit {
    kind: CountKind,
    limit: u64,
}

impl Keyword for CountLimit {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let count = match (&instance.value, self.kind) {
            (JsonValue::Array(items), CountKind::MaxItems | CountKind::MinItems) => {
                items.len() as u64
            }
            (JsonValue::Object(members), CountKind::MaxProperties | CountKind::MinProperties) => {
                members.len() as u64
            }
            _ => return Ok(()),
        };
        let message = match self.kind {
            CountKind::MaxItems if count > self.limit => {
                format!("The array has too many elements (maximum {})", self.limit)
            }
            CountKind::MinItems if count < self.limit => {
                format!("The array has too few elements (minimum {})", self.limit)
            }
            CountKind::MaxProperties if count > self.limit => {
                format!("The object has too many properties (maximum {})", self.limit)
            }
            CountKind::MinProperties if count < self.limit => {
                format!("The object has too few properties (minimum {})", self.limit)
            }
            _ => return Ok(()),
        };
        result.fail(message);
        Ok(())
    }
}

macro_rules! count_factory {
    ($name:ident, $kind:expr) => {
        pub(crate) fn $name(
            compiler: &mut Compiler<'_>,
            site: &KeywordSite<'_>,
            value: &Value,
        ) -> Result<Box<dyn Keyword>, SchemaError> {
            Ok(Box::new(CountLimit {
                kind: $kind,
                limit: keyword_limit(compiler, site, value)?,
            }))
        }
    };
}

count_factory!(max_items_factory, CountKind::MaxItems);
count_factory!(min_items_factory, CountKind::MinItems);
count_factory!(max_properties_factory, CountKind::MaxProperties);
count_factory!(min_properties_factory, CountKind::MinProperties);

#[derive(Debug)]
pub struct UniqueItems {
    unique: bool,
}

impl Keyword for UniqueItems {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if !self.unique {
            return Ok(());
        }
        if let JsonValue::Array(items) = &instance.value {
            for (index, item) in items.iter().enumerate() {
                if items[..index].iter().any(|other| other == item) {
                    result.fail("The array's elements must all be unique");
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn unique_items_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let unique = value
        .as_bool()
        .ok_or_else(|| compiler.invalid(site, "must be a boolean"))?;
    Ok(Box::new(UniqueItems { unique }))
}

// ---------------------------------------------------------------------------
// maxContains / minContains
// ---------------------------------------------------------------------------

fn contains_count(siblings: &[ResultNode], instance: &JsonNode) -> Option<usize> {
    sibling(siblings, "contains", &instance.path)
        .and_then(|node| node.annotation.as_ref())
        .and_then(Value::as_array)
        .map(Vec::len)
}

#[derive(Debug)]
pub struct MaxContains {
    limit: u64,
}

impl Keyword for MaxContains {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        match contains_count(siblings, instance) {
            Some(count) if count as u64 > self.limit => {
                result.fail(format!(
                    "The array has too many elements matching the \
                     \"contains\" subschema (maximum {})",
                    self.limit
                ));
            }
            Some(_) => {}
            None => result.discard(),
        }
        Ok(())
    }
}

pub(crate) fn max_contains_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(MaxContains {
        limit: keyword_limit(compiler, site, value)?,
    }))
}

#[derive(Debug)]
pub struct MinContains {
    limit: u64,
}

impl Keyword for MinContains {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let count = match contains_count(siblings, instance) {
            Some(count) => count,
            None => {
                result.discard();
                return Ok(());
            }
        };
        if (count as u64) < self.limit {
            result.fail(format!(
                "The array has too few elements matching the \
                 \"contains\" subschema (minimum {})",
                self.limit
            ));
            return Ok(());
        }
        // A satisfied minContains of 0 pardons an empty-match "contains"
        // failure, provided maxContains did not fail.
        let max_contains_ok = sibling(siblings, "maxContains", &instance.path)
            .map_or(true, |node| node.error.is_none());
        if max_contains_ok {
            if let Some(contains) = sibling_mut(siblings, "contains", &instance.path) {
                if contains.error.is_some() {
                    contains.error = None;
                    contains.passed = true;
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn min_contains_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(MinContains {
        limit: keyword_limit(compiler, site, value)?,
    }))
}

// ---------------------------------------------------------------------------
// required / dependentRequired
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Required {
    names: Vec<String>,
}

impl Keyword for Required {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if instance.as_object().is_none() {
            return Ok(());
        }
        let missing: Vec<&str> = self
            .names
            .iter()
            .filter(|name| instance.get(name).is_none())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            result.fail(format!(
                "The object is missing required properties {}",
                display_list(&missing)
            ));
        }
        Ok(())
    }
}

pub(crate) fn required_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(Required {
        names: keyword_string_array(compiler, site, value)?,
    }))
}

#[derive(Debug)]
pub struct DependentRequired {
    dependencies: Vec<(String, Vec<String>)>,
}

impl Keyword for DependentRequired {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        if instance.as_object().is_none() {
            return Ok(());
        }
        let mut missing = Vec::new();
        for (name, dependents) in &self.dependencies {
            if instance.get(name).is_some() {
                let absent: Vec<&str> = dependents
                    .iter()
                    .filter(|dep| instance.get(dep).is_none())
                    .map(String::as_str)
                    .collect();
                if !absent.is_empty() {
                    missing.push(format!("{name}: {}", display_list(&absent)));
                }
            }
        }
        if !missing.is_empty() {
            result.fail(format!(
                "The object is missing dependent properties {}",
                display_list(&missing)
            ));
        }
        Ok(())
    }
}

pub(crate) fn dependent_required_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let members = value
        .as_object()
        .ok_or_else(|| compiler.invalid(site, "must be an object of string arrays"))?;
    let mut dependencies = Vec::with_capacity(members.len());
    for (name, dependents) in members {
        dependencies.push((name.clone(), keyword_string_array(compiler, site, dependents)?));
    }
    Ok(Box::new(DependentRequired { dependencies }))
}
