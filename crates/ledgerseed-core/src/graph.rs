use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::DatabaseSchema;

/// Foreign key edge excluded from insertion ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredEdge {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Directed graph over tables with one edge per ordering foreign key.
///
/// Edges point from the referenced (parent) table to the referencing (child)
/// table so that a topological walk yields parents first. Self-references and
/// deferrable keys are kept aside as [`DeferredEdge`]s.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    children: BTreeMap<String, BTreeSet<String>>,
    deferred: Vec<DeferredEdge>,
}

impl DependencyGraph {
    pub fn build(schema: &DatabaseSchema) -> Self {
        let mut graph = Self::default();

        for table in &schema.tables {
            graph.children.entry(table.name.clone()).or_default();

            for fk in &table.foreign_keys {
                if table.is_self_referencing(fk) || fk.deferrable {
                    graph.deferred.push(DeferredEdge {
                        table: table.name.clone(),
                        column: fk.column.clone(),
                        referenced_table: fk.referenced_table.clone(),
                        referenced_column: fk.referenced_column.clone(),
                    });
                    continue;
                }
                graph
                    .children
                    .entry(fk.referenced_table.clone())
                    .or_default()
                    .insert(table.name.clone());
            }
        }

        graph
    }

    /// Require `child` to be generated after `parent` even without a foreign key.
    pub fn with_hint(mut self, child: &str, parent: &str) -> Self {
        if child != parent
            && self.children.contains_key(child)
            && self.children.contains_key(parent)
        {
            self.children
                .entry(parent.to_string())
                .or_default()
                .insert(child.to_string());
        }
        self
    }

    pub fn nodes(&self) -> usize {
        self.children.len()
    }

    pub fn edges(&self) -> usize {
        self.children.values().map(|targets| targets.len()).sum()
    }

    pub fn deferred_edges(&self) -> &[DeferredEdge] {
        &self.deferred
    }

    /// Parents-first order; ties are broken by table name.
    pub fn insertion_order(&self) -> Result<Vec<String>> {
        toposort(&self.children).map_err(|tables| Error::SchemaCycle { tables })
    }

    /// Exact reverse of [`insertion_order`](Self::insertion_order).
    pub fn truncation_order(&self) -> Result<Vec<String>> {
        let mut order = self.insertion_order()?;
        order.reverse();
        Ok(order)
    }
}

fn toposort(
    graph: &BTreeMap<String, BTreeSet<String>>,
) -> std::result::Result<Vec<String>, Vec<String>> {
    let mut indegree: BTreeMap<String, usize> = BTreeMap::new();

    for node in graph.keys() {
        indegree.entry(node.clone()).or_insert(0);
    }

    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<String> = indegree
        .iter()
        .filter_map(|(node, count)| (*count == 0).then(|| node.clone()))
        .collect();

    let mut order = Vec::with_capacity(indegree.len());

    while let Some(node) = ready.pop_first() {
        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.clone());
                    }
                }
            }
        }
        order.push(node);
    }

    if order.len() == indegree.len() {
        return Ok(order);
    }

    // Nodes left over are on a cycle or downstream of one; strip the latter.
    let mut remaining: BTreeSet<String> = indegree
        .into_iter()
        .filter_map(|(node, count)| (count > 0).then_some(node))
        .collect();
    loop {
        let sinks: Vec<String> = remaining
            .iter()
            .filter(|node| {
                graph
                    .get(*node)
                    .is_none_or(|targets| targets.iter().all(|target| !remaining.contains(target)))
            })
            .cloned()
            .collect();
        if sinks.is_empty() {
            break;
        }
        for sink in sinks {
            remaining.remove(&sink);
        }
    }
    Err(remaining.into_iter().collect())
}
