//! The recursive walker that builds a [`DiffTree`] from two records.
use serde_json::Value;

use crate::config::DiffConfig;
use crate::error::{DiffError, DiffWarning};
use crate::record::Record;
use crate::schema::{FieldKind, SchemaRegistry, is_leaf_type};
use crate::score::ScoreTally;
use crate::validation::{ResourceValidator, SchemaValidator};

use super::align::{align, pad_to_equal_len};
use super::leaf::compare_leaf;
use super::tree::{Children, DiffNode, DiffTree, NodeId, make_label};

/// Field key of the synthetic leaf that scores a scalar found where an
/// object was expected.
pub const STRAY_VALUE_KEY: &str = "$value";

/// Field key whose nodes are labelled by their resolved type instead.
const RESOURCE_KEY: &str = "resource";

/// Compares a predicted record against a reference record of `type_name`
/// using the default configuration.
///
/// # Errors
///
/// Returns [`DiffError::UnknownType`] if `type_name`, or any type reached
/// while walking the records, is not defined in `schema`.
pub fn compare<'a>(
    schema: &SchemaRegistry,
    true_value: &'a Value,
    pred_value: &'a Value,
    type_name: &str,
) -> Result<DiffTree<'a>, DiffError> {
    Comparator::new(schema).compare(true_value, pred_value, type_name)
}

/// Like [`compare`], with an explicit configuration.
///
/// # Errors
///
/// See [`compare`].
pub fn compare_with_config<'a>(
    schema: &SchemaRegistry,
    config: &DiffConfig,
    true_value: &'a Value,
    pred_value: &'a Value,
    type_name: &str,
) -> Result<DiffTree<'a>, DiffError> {
    Comparator::with_config(schema, config.clone()).compare(true_value, pred_value, type_name)
}

/// Reusable tree-diff engine bound to a schema.
///
/// Each call to [`Comparator::compare`] is independent: the comparator holds
/// no per-comparison state, and candidate pairings scored during array
/// alignment are built into scratch trees that are discarded.
pub struct Comparator<'s> {
    schema: &'s SchemaRegistry,
    config: DiffConfig,
    validator: Box<dyn ResourceValidator + 's>,
}

/// Where a node sits and what it compares.
#[derive(Clone, Copy)]
struct NodeSpec<'a, 'k> {
    true_value: Record<'a>,
    pred_value: Record<'a>,
    type_name: &'k str,
    parent: Option<NodeId>,
    field_key: &'k str,
    array_index: Option<usize>,
}

/// Mutable state of one tree build.
struct Builder<'a> {
    nodes: Vec<DiffNode<'a>>,
    warnings: Vec<DiffWarning>,
    /// Scratch builds skip the validity check.
    validate: bool,
    /// Label and depth the root hangs under; empty for a full comparison.
    root_parent: (String, usize),
}

impl<'a> Builder<'a> {
    fn new(validate: bool) -> Self {
        Self {
            nodes: Vec::new(),
            warnings: Vec::new(),
            validate,
            root_parent: (String::new(), 0),
        }
    }

    /// A builder for one candidate pairing, rooted where the real node will
    /// sit so that labels and error paths match the final tree.
    fn scratch(parent_label: &str, depth: usize) -> Self {
        Self {
            root_parent: (parent_label.to_owned(), depth),
            ..Self::new(false)
        }
    }

    fn push(&mut self, node: DiffNode<'a>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn parent_info(&self, parent: Option<NodeId>) -> (String, usize) {
        parent
            .and_then(|p| self.nodes.get(p.0))
            .map_or_else(|| self.root_parent.clone(), |n| (n.label.clone(), n.depth + 1))
    }

    fn finish(self) -> DiffTree<'a> {
        DiffTree::from_parts(self.nodes, self.warnings)
    }
}

impl<'s> Comparator<'s> {
    /// Creates a comparator with the default configuration and the schema
    /// validator.
    pub fn new(schema: &'s SchemaRegistry) -> Self {
        Self::with_config(schema, DiffConfig::default())
    }

    /// Creates a comparator with an explicit configuration.
    pub fn with_config(schema: &'s SchemaRegistry, config: DiffConfig) -> Self {
        Self {
            schema,
            config,
            validator: Box::new(SchemaValidator::new(schema)),
        }
    }

    /// Replaces the validity check used for resource-level nodes.
    #[must_use]
    pub fn with_validator(mut self, validator: impl ResourceValidator + 's) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// The schema this comparator walks.
    pub fn schema(&self) -> &'s SchemaRegistry {
        self.schema
    }

    /// Builds the diff tree of two records of `type_name`.
    ///
    /// Warnings are stored on the returned tree and logged once each.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::UnknownType`] with the type name and node label
    /// if any type reached is not defined in the schema.
    pub fn compare<'a>(
        &self,
        true_value: &'a Value,
        pred_value: &'a Value,
        type_name: &str,
    ) -> Result<DiffTree<'a>, DiffError> {
        self.compare_records(Record::present(true_value), Record::present(pred_value), type_name)
    }

    /// Like [`Comparator::compare`], over possibly-absent records.
    ///
    /// # Errors
    ///
    /// See [`Comparator::compare`].
    pub fn compare_records<'a>(
        &self,
        true_value: Record<'a>,
        pred_value: Record<'a>,
        type_name: &str,
    ) -> Result<DiffTree<'a>, DiffError> {
        let mut builder = Builder::new(self.config.validate_resources);
        self.expand(
            &mut builder,
            NodeSpec {
                true_value,
                pred_value,
                type_name,
                parent: None,
                field_key: type_name,
                array_index: None,
            },
        )?;
        let tree = builder.finish();
        for warning in &tree.warnings {
            tracing::warn!("{warning}");
        }
        Ok(tree)
    }

    /// Scores one candidate pairing in a scratch tree placed at
    /// `parent_label.field_key.index`.
    #[allow(clippy::too_many_arguments)]
    fn score_pair(
        &self,
        true_value: Record<'_>,
        pred_value: Record<'_>,
        type_name: &str,
        field_key: &str,
        parent_label: &str,
        depth: usize,
        index: usize,
    ) -> Result<ScoreTally, DiffError> {
        let mut scratch = Builder::scratch(parent_label, depth);
        let root = self.expand(
            &mut scratch,
            NodeSpec {
                true_value,
                pred_value,
                type_name,
                parent: None,
                field_key,
                array_index: Some(index),
            },
        )?;
        Ok(scratch.nodes[root.0].score)
    }

    /// The type a node is walked under.
    ///
    /// The reference decides: its `resourceType` if it has one, else the
    /// declared type. Only where the reference is absent does a predicted
    /// `resourceType` count, and only if the schema defines that resource.
    fn resolve_type<'v>(&self, spec: &NodeSpec<'v, 'v>) -> &'v str {
        if is_leaf_type(spec.type_name) {
            return spec.type_name;
        }
        if let Some(named) = spec.true_value.resource_type() {
            return named;
        }
        if spec.true_value.is_absent() {
            if let Some(named) = spec.pred_value.resource_type() {
                if self.schema.is_resource(named) {
                    return named;
                }
            }
        }
        spec.type_name
    }

    fn expand<'a>(&self, b: &mut Builder<'a>, spec: NodeSpec<'a, '_>) -> Result<NodeId, DiffError> {
        let resolved = self.resolve_type(&spec);
        let (parent_label, depth) = b.parent_info(spec.parent);
        let key_part = if spec.field_key == RESOURCE_KEY {
            resolved
        } else {
            spec.field_key
        };
        let label = make_label(&parent_label, key_part, spec.array_index);
        tracing::trace!(label = %label, resolved_type = resolved, "expanding node");

        if is_leaf_type(resolved) {
            let score = compare_leaf(
                spec.true_value,
                spec.pred_value,
                spec.field_key,
                resolved,
                &self.config,
            );
            return Ok(b.push(new_node(&spec, resolved, label, depth, true, score)));
        }

        let Some(fields) = self.schema.fields(resolved) else {
            return Err(DiffError::UnknownType {
                type_name: resolved.to_owned(),
                path: label,
            });
        };

        let id = b.push(new_node(&spec, resolved, label.clone(), depth, false, ScoreTally::ZERO));
        let mut children = Vec::new();
        let mut score = ScoreTally::ZERO;

        let stray_true = spec.true_value.is_present() && !spec.true_value.is_object();
        let stray_pred = spec.pred_value.is_present() && !spec.pred_value.is_object();
        if stray_true || stray_pred {
            b.warnings.push(DiffWarning::NonObjectValue {
                path: label.clone(),
            });
            let stray = compare_leaf(
                spec.true_value.scalar_only(),
                spec.pred_value.scalar_only(),
                STRAY_VALUE_KEY,
                resolved,
                &self.config,
            );
            let leaf = DiffNode {
                true_value: spec.true_value.scalar_only(),
                pred_value: spec.pred_value.scalar_only(),
                type_name: resolved.to_owned(),
                resolved_type: resolved.to_owned(),
                parent: Some(id),
                children: Vec::new(),
                array_index: None,
                field_key: STRAY_VALUE_KEY.to_owned(),
                label: make_label(&label, STRAY_VALUE_KEY, None),
                depth: depth + 1,
                is_leaf: true,
                score: stray,
            };
            children.push((STRAY_VALUE_KEY.to_owned(), Children::Single(b.push(leaf))));
            score += stray;
        }

        let true_obj = spec.true_value.object_only();
        let pred_obj = spec.pred_value.object_only();
        for field in fields {
            let t = true_obj.get(&field.key);
            let p = pred_obj.get(&field.key);
            if t.is_absent() && p.is_absent() {
                continue;
            }
            match &field.kind {
                FieldKind::Leaf | FieldKind::Struct => {
                    let child = self.expand(
                        b,
                        NodeSpec {
                            true_value: t,
                            pred_value: p,
                            type_name: &field.declared_type,
                            parent: Some(id),
                            field_key: &field.key,
                            array_index: None,
                        },
                    )?;
                    score += b.nodes[child.0].score;
                    children.push((field.key.clone(), Children::Single(child)));
                }
                FieldKind::Array { item_type } => {
                    let items = self.expand_array(b, t, p, item_type, id, &field.key, &label)?;
                    score += items.iter().map(|c| b.nodes[c.0].score).sum::<ScoreTally>();
                    children.push((field.key.clone(), Children::Array(items)));
                }
                FieldKind::Unclassified => {
                    b.warnings.push(DiffWarning::UnclassifiedField {
                        path: label.clone(),
                        key: field.key.clone(),
                        declared_type: field.declared_type.clone(),
                    });
                }
            }
        }

        if b.validate && spec.pred_value.resource_type().is_some() {
            if let Some(pred) = spec.pred_value.value() {
                score = score.with_validity(self.validator.is_valid(pred));
            }
        }

        let node = &mut b.nodes[id.0];
        node.children = children;
        node.score = score;
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_array<'a>(
        &self,
        b: &mut Builder<'a>,
        true_value: Record<'a>,
        pred_value: Record<'a>,
        item_type: &str,
        parent: NodeId,
        field_key: &str,
        parent_label: &str,
    ) -> Result<Vec<NodeId>, DiffError> {
        let true_items = items_of(b, true_value, field_key, parent_label);
        let pred_items = items_of(b, pred_value, field_key, parent_label);
        let (true_items, pred_items) = pad_to_equal_len(true_items, pred_items);

        let depth = b.nodes[parent.0].depth + 1;
        let alignment = align(
            &true_items,
            &pred_items,
            self.config.max_exact_array_len,
            |i, t, p| self.score_pair(t, p, item_type, field_key, parent_label, depth, i),
        )?;

        let mut ids = Vec::with_capacity(alignment.order.len());
        for (i, &j) in alignment.order.iter().enumerate() {
            let id = self.expand(
                b,
                NodeSpec {
                    true_value: true_items[i],
                    pred_value: pred_items[j],
                    type_name: item_type,
                    parent: Some(parent),
                    field_key,
                    array_index: Some(i),
                },
            )?;
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Items of an array field; a lone non-array value counts as one item.
fn items_of<'a>(
    b: &mut Builder<'a>,
    value: Record<'a>,
    field_key: &str,
    parent_label: &str,
) -> Vec<Record<'a>> {
    match value.items() {
        Some(items) => items,
        None => {
            let warning = DiffWarning::NonArrayValue {
                path: parent_label.to_owned(),
                key: field_key.to_owned(),
            };
            if !b.warnings.contains(&warning) {
                b.warnings.push(warning);
            }
            vec![value]
        }
    }
}

fn new_node<'a>(
    spec: &NodeSpec<'a, '_>,
    resolved: &str,
    label: String,
    depth: usize,
    is_leaf: bool,
    score: ScoreTally,
) -> DiffNode<'a> {
    DiffNode {
        true_value: spec.true_value,
        pred_value: spec.pred_value,
        type_name: spec.type_name.to_owned(),
        resolved_type: resolved.to_owned(),
        parent: spec.parent,
        children: Vec::new(),
        array_index: spec.array_index,
        field_key: spec.field_key.to_owned(),
        label,
        depth,
        is_leaf,
        score,
    }
}
