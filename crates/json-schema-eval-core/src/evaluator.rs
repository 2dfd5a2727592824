//! Dynamic evaluation: result tree, evaluation context, and scope stack.
//!
//! Every (schema, instance) visit gets a [`ResultNode`]; keyword visits
//! nest under schema visits and applicator subschema visits nest under
//! keyword visits, mirroring the dynamic evaluation path. The tree owns no
//! references into the catalog: absolute keyword locations are rendered at
//! node creation, so an [`Evaluation`] is self-contained.
//!
//! Validity has two faces, following the drafts:
//! - `passed` is the actual subtree outcome, used for annotation collection
//!   and by `then`/`else` when they consult their `if` sibling;
//! - `valid` is `passed` softened by non-asserting scopes (`if`, formats
//!   without an enabled validator), and is what aggregates into the parent.

use serde_json::Value;

use crate::catalog::{Catalog, SchemaCache};
use crate::error::EvalError;
use crate::json::JsonNode;
use crate::output::{create_output, OutputFormat};
use crate::pointer::JsonPointer;
use crate::schema::{SchemaIndex, SchemaKind};

/// Distinguishes schema visits from keyword visits in the result tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Schema,
    Keyword,
}

/// How a failing node should be reported by the output formatters.
///
/// Assertion errors come from the keyword's own check; containment errors
/// only restate that a child failed and are filtered from `basic` and
/// `detailed` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Assertion,
    Containment,
}

#[derive(Debug, Clone)]
pub struct ResultError {
    pub kind: ErrorKind,
    pub message: String,
}

/// One node of the evaluation result tree.
#[derive(Debug)]
pub struct ResultNode {
    pub(crate) kind: ResultKind,
    /// The keyword name, for keyword visits.
    pub(crate) name: String,
    pub(crate) instance_path: JsonPointer,
    /// The dynamic evaluation path (`keywordLocation`).
    pub(crate) evaluation_path: JsonPointer,
    /// The absolute keyword location, canonical-URI based.
    pub(crate) absolute_location: String,
    pub(crate) annotation: Option<Value>,
    pub(crate) error: Option<ResultError>,
    pub(crate) assertive: bool,
    pub(crate) discard: bool,
    pub(crate) passed: bool,
    pub(crate) children: Vec<ResultNode>,
}

impl ResultNode {
    pub(crate) fn schema_visit(
        instance_path: JsonPointer,
        evaluation_path: JsonPointer,
        absolute_location: String,
    ) -> Self {
        Self {
            kind: ResultKind::Schema,
            name: String::new(),
            instance_path,
            evaluation_path,
            absolute_location,
            annotation: None,
            error: None,
            assertive: true,
            discard: false,
            passed: true,
            children: Vec::new(),
        }
    }

    pub(crate) fn keyword_visit(
        name: &str,
        instance_path: JsonPointer,
        evaluation_path: JsonPointer,
        absolute_location: String,
    ) -> Self {
        Self {
            kind: ResultKind::Keyword,
            name: name.to_string(),
            ..Self::schema_visit(instance_path, evaluation_path, absolute_location)
        }
    }

    /// Attach an annotation to this node.
    pub fn annotate(&mut self, value: Value) {
        self.annotation = Some(value);
    }

    /// Mark this node failing with an assertion error.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(ResultError {
            kind: ErrorKind::Assertion,
            message: message.into(),
        });
    }

    /// Mark this node failing because a child subschema failed.
    pub fn fail_containment(&mut self, message: impl Into<String>) {
        self.error = Some(ResultError {
            kind: ErrorKind::Containment,
            message: message.into(),
        });
    }

    /// Make this scope non-asserting: its failure does not fail the parent.
    pub fn no_assert(&mut self) {
        self.assertive = false;
    }

    /// Drop this node from the result tree (inapplicable `then`/`else`).
    pub fn discard(&mut self) {
        self.discard = true;
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    /// The keyword name for keyword visits, empty for schema visits.
    pub fn keyword(&self) -> &str {
        &self.name
    }

    pub fn instance_path(&self) -> &JsonPointer {
        &self.instance_path
    }

    pub fn evaluation_path(&self) -> &JsonPointer {
        &self.evaluation_path
    }

    pub fn absolute_keyword_location(&self) -> &str {
        &self.absolute_location
    }

    pub fn annotation(&self) -> Option<&Value> {
        self.annotation.as_ref()
    }

    pub fn error(&self) -> Option<&ResultError> {
        self.error.as_ref()
    }

    /// The actual subtree outcome, before non-asserting softening.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// What this node contributes to its parent's validity.
    pub fn valid(&self) -> bool {
        self.passed || !self.assertive
    }

    pub fn children(&self) -> &[ResultNode] {
        &self.children
    }
}

/// Find a directly preceding keyword result for the same instance.
pub(crate) fn sibling<'a>(
    siblings: &'a [ResultNode],
    keyword: &str,
    instance_path: &JsonPointer,
) -> Option<&'a ResultNode> {
    siblings.iter().find(|node| {
        node.kind == ResultKind::Keyword
            && node.name == keyword
            && &node.instance_path == instance_path
    })
}

pub(crate) fn sibling_mut<'a>(
    siblings: &'a mut [ResultNode],
    keyword: &str,
    instance_path: &JsonPointer,
) -> Option<&'a mut ResultNode> {
    siblings.iter_mut().find(|node| {
        node.kind == ResultKind::Keyword
            && node.name == keyword
            && &node.instance_path == instance_path
    })
}

/// Collect annotation values produced under `nodes` by `keyword` for the
/// instance at `instance_path`, skipping failed subtrees.
pub(crate) fn collect_annotations<'a>(
    nodes: &'a [ResultNode],
    instance_path: &JsonPointer,
    keyword: &str,
    out: &mut Vec<&'a Value>,
) {
    for node in nodes {
        if !node.passed {
            continue;
        }
        if node.kind == ResultKind::Keyword
            && node.name == keyword
            && &node.instance_path == instance_path
        {
            if let Some(annotation) = &node.annotation {
                out.push(annotation);
            }
        }
        collect_annotations(&node.children, instance_path, keyword, out);
    }
}

/// Evaluation state threaded through keyword invocations.
///
/// The dynamic scope stack lives here, not on the schemas, so concurrent
/// evaluations over one catalog never interfere.
pub struct EvalContext<'c> {
    pub(crate) catalog: &'c Catalog,
    pub(crate) cache: &'c SchemaCache,
    /// Resource roots entered on the current dynamic path, outermost first.
    pub(crate) dynamic_scope: Vec<SchemaIndex>,
}

impl<'c> EvalContext<'c> {
    pub(crate) fn schema(&self, index: SchemaIndex) -> &'c crate::schema::Schema {
        &self.cache.arena[index.0]
    }

    /// Evaluate `target` against `instance` as a child of `parent`.
    ///
    /// With `path_key` the evaluation path descends by that key (array
    /// applicators, per-name applicators); without it the subschema applies
    /// in place (`$ref`, `items`, per-item visits). Returns whether the
    /// subschema passed.
    pub fn descend(
        &mut self,
        target: SchemaIndex,
        instance: &JsonNode,
        parent: &mut ResultNode,
        path_key: Option<&str>,
    ) -> Result<bool, EvalError> {
        let (resource_root, absolute) = {
            let schema = self.schema(target);
            (schema.resource_root, schema.uri.to_string())
        };
        let evaluation_path = match path_key {
            Some(key) => parent.evaluation_path.child(key),
            None => parent.evaluation_path.clone(),
        };
        let mut node = ResultNode::schema_visit(instance.path.clone(), evaluation_path, absolute);

        self.dynamic_scope.push(resource_root);
        let outcome = evaluate_schema(self, target, instance, &mut node);
        self.dynamic_scope.pop();
        outcome?;

        let passed = node.passed;
        parent.children.push(node);
        Ok(passed)
    }

    /// The outermost dynamic-scope resource declaring `$dynamicAnchor: name`.
    pub(crate) fn dynamic_anchor_target(&self, name: &str) -> Option<SchemaIndex> {
        self.dynamic_scope
            .iter()
            .find_map(|root| self.schema(*root).dynamic_anchors.get(name).copied())
    }

    /// The outermost dynamic-scope resource declaring `$recursiveAnchor: true`.
    pub(crate) fn recursive_anchor_target(&self) -> Option<SchemaIndex> {
        self.dynamic_scope
            .iter()
            .copied()
            .find(|root| self.schema(*root).recursive_anchor)
    }
}

/// Evaluate one schema node into `node`.
pub(crate) fn evaluate_schema<'c>(
    ctx: &mut EvalContext<'c>,
    index: SchemaIndex,
    instance: &JsonNode,
    node: &mut ResultNode,
) -> Result<(), EvalError> {
    let cache: &'c SchemaCache = ctx.cache;
    let schema = &cache.arena[index.0];

    match &schema.kind {
        SchemaKind::Boolean(true) => {}
        SchemaKind::Boolean(false) => {
            node.fail("The instance is disallowed by a boolean false schema");
        }
        SchemaKind::Object => {
            for keyword in &schema.keywords {
                if let Some(types) = keyword.instance_types {
                    if !types.contains(&instance.json_type()) {
                        continue;
                    }
                }
                let mut kwnode = ResultNode::keyword_visit(
                    &keyword.name,
                    instance.path.clone(),
                    node.evaluation_path.child(keyword.name.clone()),
                    schema.keyword_location(&keyword.name),
                );
                keyword
                    .imp
                    .evaluate(ctx, instance, &mut kwnode, &mut node.children)?;
                kwnode.passed = kwnode.error.is_none();
                if !kwnode.discard {
                    node.children.push(kwnode);
                }
            }
        }
    }

    node.passed = node.error.is_none() && node.children.iter().all(ResultNode::valid);
    Ok(())
}

/// Root entry point used by [`crate::schema::SchemaRef::evaluate`].
pub(crate) fn evaluate_root(
    catalog: &Catalog,
    cache_id: &str,
    index: SchemaIndex,
    instance: &JsonNode,
) -> Result<Evaluation, EvalError> {
    let cache = catalog
        .cache(cache_id)
        .ok_or_else(|| EvalError::StaleHandle {
            reason: format!("cache '{cache_id}' no longer exists"),
        })?;
    let mut ctx = EvalContext {
        catalog,
        cache,
        dynamic_scope: Vec::new(),
    };
    let (resource_root, absolute) = {
        let schema = ctx.schema(index);
        (schema.resource_root, schema.uri.to_string())
    };
    let mut root =
        ResultNode::schema_visit(instance.path.clone(), JsonPointer::root(), absolute);
    ctx.dynamic_scope.push(resource_root);
    evaluate_schema(&mut ctx, index, instance, &mut root)?;
    Ok(Evaluation { root })
}

/// The complete result of one `evaluate` call.
///
/// Owns its result tree; the compiled schema and the instance may be
/// dropped independently.
#[derive(Debug)]
pub struct Evaluation {
    root: ResultNode,
}

impl Evaluation {
    pub fn valid(&self) -> bool {
        self.root.valid()
    }

    pub fn root(&self) -> &ResultNode {
        &self.root
    }

    /// Reduce the result tree to one of the standard output formats.
    pub fn output(&self, format: OutputFormat) -> Value {
        create_output(&self.root, format)
    }
}
