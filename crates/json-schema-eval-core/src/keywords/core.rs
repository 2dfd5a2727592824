//! Core vocabulary: reference keywords and the compile-time-only keywords.
//!
//! `$schema`, `$id`, `$vocabulary`, and the anchor keywords are processed
//! by the compiler bootstrap before keyword construction; their specs exist
//! so they are recognized (and not collected as unknown-keyword
//! annotations). `$defs` compiles its subschemas so they are addressable by
//! reference, but never evaluates.

use serde_json::Value;

use crate::compiler::{Compiler, KeywordSite};
use crate::error::{EvalError, SchemaError};
use crate::evaluator::{EvalContext, ResultNode};
use crate::json::JsonNode;
use crate::keywords::Keyword;
use crate::schema::RefSlot;
use crate::uri::Uri;

/// A keyword with compile-time meaning only.
#[derive(Debug)]
pub struct StaticKeyword;

impl Keyword for StaticKeyword {
    fn evaluate(
        &self,
        _ctx: &mut EvalContext<'_>,
        _instance: &JsonNode,
        _result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        Ok(())
    }
}

pub(crate) fn static_factory(
    _compiler: &mut Compiler<'_>,
    _site: &KeywordSite<'_>,
    _value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    Ok(Box::new(StaticKeyword))
}

pub(crate) fn defs_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let members = value
        .as_object()
        .ok_or_else(|| compiler.invalid(site, "must be an object of schemas"))?;
    for (name, member) in members {
        compiler.subschema(site, &[site.name, name], member)?;
    }
    Ok(Box::new(StaticKeyword))
}

// ---------------------------------------------------------------------------
// $ref
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RefKeyword {
    uri: Uri,
    slot: RefSlot,
}

impl Keyword for RefKeyword {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let target = self
            .slot
            .get()
            .copied()
            .ok_or_else(|| EvalError::UnresolvedReference {
                uri: self.uri.to_string(),
            })?;
        if !ctx.descend(target, instance, result, None)? {
            result.fail_containment("The instance is invalid against the referenced schema");
        }
        Ok(())
    }
}

pub(crate) fn ref_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let reference = value
        .as_str()
        .ok_or_else(|| compiler.invalid(site, "must be a URI-reference string"))?;
    let uri = compiler.resolve_against_base(site.schema, reference)?;
    let slot = compiler.defer_reference(site, uri.clone());
    Ok(Box::new(RefKeyword { uri, slot }))
}

// ---------------------------------------------------------------------------
// $dynamicRef (2020-12)
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DynamicRefKeyword {
    uri: Uri,
    /// The plain-name fragment, when the reference targets an anchor.
    anchor: Option<String>,
    slot: RefSlot,
}

impl Keyword for DynamicRefKeyword {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let mut target = self
            .slot
            .get()
            .copied()
            .ok_or_else(|| EvalError::UnresolvedReference {
                uri: self.uri.to_string(),
            })?;

        // The reference is only dynamic when its static target was itself
        // declared with a matching $dynamicAnchor; then the outermost
        // dynamic-scope resource declaring that anchor wins.
        if let Some(name) = &self.anchor {
            let statically_dynamic = {
                let schema = ctx.schema(target);
                ctx.schema(schema.resource_root)
                    .dynamic_anchors
                    .get(name.as_str())
                    == Some(&target)
            };
            if statically_dynamic {
                if let Some(dynamic) = ctx.dynamic_anchor_target(name) {
                    tracing::trace!(anchor = %name, "dynamic reference retargeted");
                    target = dynamic;
                }
            }
        }

        if !ctx.descend(target, instance, result, None)? {
            result.fail_containment("The instance is invalid against the referenced schema");
        }
        Ok(())
    }
}

pub(crate) fn dynamic_ref_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    let reference = value
        .as_str()
        .ok_or_else(|| compiler.invalid(site, "must be a URI-reference string"))?;
    let uri = compiler.resolve_against_base(site.schema, reference)?;
    let anchor = uri
        .fragment()
        .filter(|f| !f.is_empty() && !f.starts_with('/'))
        .map(str::to_string);
    let slot = compiler.defer_reference(site, uri.clone());
    Ok(Box::new(DynamicRefKeyword { uri, anchor, slot }))
}

// ---------------------------------------------------------------------------
// $recursiveRef (2019-09)
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RecursiveRefKeyword {
    uri: Uri,
    slot: RefSlot,
}

impl Keyword for RecursiveRefKeyword {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        _siblings: &mut [ResultNode],
    ) -> Result<(), EvalError> {
        let mut target = self
            .slot
            .get()
            .copied()
            .ok_or_else(|| EvalError::UnresolvedReference {
                uri: self.uri.to_string(),
            })?;

        if ctx.schema(target).recursive_anchor {
            if let Some(outer) = ctx.recursive_anchor_target() {
                target = outer;
            }
        }

        if !ctx.descend(target, instance, result, None)? {
            result.fail_containment("The instance is invalid against the referenced schema");
        }
        Ok(())
    }
}

pub(crate) fn recursive_ref_factory(
    compiler: &mut Compiler<'_>,
    site: &KeywordSite<'_>,
    value: &Value,
) -> Result<Box<dyn Keyword>, SchemaError> {
    if value.as_str() != Some("#") {
        return Err(compiler.invalid(site, "may only take the value \"#\""));
    }
    let uri = compiler.resolve_against_base(site.schema, "#")?.strip_fragment();
    let slot = compiler.defer_reference(site, uri.clone());
    Ok(Box::new(RecursiveRefKeyword { uri, slot }))
}
