//! Provenance graph built from annotation values.
//!
//! An [`EdgeDefinition`] says "the value of `parent` on a file was derived into
//! the value of `child`". Applying the definitions to a set of files gives a
//! directed lineage graph with one node per distinct value.

use std::collections::{BTreeSet, HashMap};

use petgraph::{
  Direction,
  graph::{DiGraph, NodeIndex},
  visit::{Bfs, Reversed},
};
use serde::{Deserialize, Serialize};

use super::file::FileDetail;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeDefinition {
  /// Annotation holding the upstream value
  pub parent: String,
  /// Annotation holding the downstream value
  pub child: String,
  /// Label shown on the edge, e.g. "segmented from"
  pub relationship: String,
}

impl EdgeDefinition {
  pub fn new(parent: impl Into<String>, child: impl Into<String>, relationship: impl Into<String>) -> Self {
    Self {
      parent: parent.into(),
      child: child.into(),
      relationship: relationship.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenanceEdge {
  pub relationship: String,
  /// File the edge was derived from
  pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeView {
  pub parent: String,
  pub child: String,
  pub relationship: String,
  pub file_id: String,
}

#[derive(Debug, Default)]
pub struct ProvenanceGraph {
  graph: DiGraph<String, ProvenanceEdge>,
  value_to_node: HashMap<String, NodeIndex>,
}

impl ProvenanceGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// One edge per (file, definition, parent value, child value) where both annotations have values.
  pub fn build<'a>(files: impl IntoIterator<Item = &'a FileDetail>, definitions: &[EdgeDefinition]) -> Self {
    let mut graph = Self::new();
    for file in files {
      for def in definitions {
        let (Some(parents), Some(children)) = (file.values_for(&def.parent), file.values_for(&def.child)) else {
          continue;
        };
        for parent in &parents {
          for child in &children {
            graph.add_edge(&parent.to_string(), &child.to_string(), &def.relationship, &file.file_id);
          }
        }
      }
    }
    graph
  }

  fn add_value(&mut self, value: &str) -> NodeIndex {
    if let Some(&idx) = self.value_to_node.get(value) {
      return idx;
    }
    let idx = self.graph.add_node(value.to_string());
    self.value_to_node.insert(value.to_string(), idx);
    idx
  }

  pub fn add_edge(&mut self, parent: &str, child: &str, relationship: &str, file_id: &str) {
    let parent_idx = self.add_value(parent);
    let child_idx = self.add_value(child);
    self.graph.add_edge(
      parent_idx,
      child_idx,
      ProvenanceEdge {
        relationship: relationship.to_string(),
        file_id: file_id.to_string(),
      },
    );
  }

  pub fn contains(&self, value: &str) -> bool {
    self.value_to_node.contains_key(value)
  }

  /// Every value `value` was (transitively) derived from, sorted.
  pub fn ancestors(&self, value: &str) -> Vec<String> {
    let Some(&start) = self.value_to_node.get(value) else {
      return vec![];
    };
    let reversed = Reversed(&self.graph);
    let mut bfs = Bfs::new(reversed, start);
    let mut found = BTreeSet::new();
    while let Some(node) = bfs.next(reversed) {
      if node != start {
        found.insert(self.graph[node].clone());
      }
    }
    found.into_iter().collect()
  }

  /// Every value (transitively) derived from `value`, sorted.
  pub fn descendants(&self, value: &str) -> Vec<String> {
    let Some(&start) = self.value_to_node.get(value) else {
      return vec![];
    };
    let mut bfs = Bfs::new(&self.graph, start);
    let mut found = BTreeSet::new();
    while let Some(node) = bfs.next(&self.graph) {
      if node != start {
        found.insert(self.graph[node].clone());
      }
    }
    found.into_iter().collect()
  }

  /// Direct parents of `value`.
  pub fn parents(&self, value: &str) -> Vec<String> {
    self.neighbors(value, Direction::Incoming)
  }

  /// Direct children of `value`.
  pub fn children(&self, value: &str) -> Vec<String> {
    self.neighbors(value, Direction::Outgoing)
  }

  fn neighbors(&self, value: &str, direction: Direction) -> Vec<String> {
    let Some(&idx) = self.value_to_node.get(value) else {
      return vec![];
    };
    let found: BTreeSet<String> = self
      .graph
      .neighbors_directed(idx, direction)
      .map(|n| self.graph[n].clone())
      .collect();
    found.into_iter().collect()
  }

  pub fn edges(&self) -> Vec<EdgeView> {
    self
      .graph
      .edge_indices()
      .filter_map(|e| {
        let (parent, child) = self.graph.edge_endpoints(e)?;
        let edge = &self.graph[e];
        Some(EdgeView {
          parent: self.graph[parent].clone(),
          child: self.graph[child].clone(),
          relationship: edge.relationship.clone(),
          file_id: edge.file_id.clone(),
        })
      })
      .collect()
  }

  pub fn node_count(&self) -> usize {
    self.graph.node_count()
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }
}
