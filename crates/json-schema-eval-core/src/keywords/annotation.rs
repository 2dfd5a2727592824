//! Annotation-only keywords: the meta-data and content vocabularies, plus
//! the collector for keywords not bound by any active vocabulary.

use serde_json::Value;

use crate::compiler::{Compiler, KeywordSite};
use crate::error::{EvalError, SchemaError};
use crate::evaluator::{EvalContext, ResultNode};
use crate::json::JsonNode;
use crate::keywords::Keyword;

/// Emits the raw keyword value as an annotation; never asserts.
#[derive(Debug)]
pub struct AnnotationKeyword {
    value: Value,
}

impl AnnotationKeyword {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Keyword for AnnotationKeyword {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        _instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        result.annotate(self.value.clone());
        result.no_assert();
        Ok(())
    }
}

pub(crate) fn annotation_factory(
    _compiler: &mut Compiler<'_>,
    _site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(AnnotationKeyword::new(value.clone())))
}

/// `contentSchema`: annotation-only, but its value is compiled so it is
/// addressable by reference.
pub(crate) fn content_schema_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    compiler.subschema(site, &[site.name], value)?;
    Ok(Box::new(AnnotationKeyword::new(value.clone())))
}
