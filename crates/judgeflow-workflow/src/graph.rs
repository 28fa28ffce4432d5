use std::collections::{BTreeSet, HashMap, VecDeque};

/// Node-level adjacency for traversal and ordering.
///
/// Parallel slot edges between the same two nodes collapse into one entry.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: node -> downstream nodes.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node -> upstream nodes.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Nodes with no incoming edges, sorted.
  entry_points: Vec<String>,
}

impl Graph {
  /// Build a graph from node names and `(from, to)` node pairs.
  pub fn new<'a>(
    nodes: impl IntoIterator<Item = &'a String>,
    edges: impl IntoIterator<Item = (&'a str, &'a str)>,
  ) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for node in nodes {
      adjacency.entry(node.clone()).or_default();
      reverse_adjacency.entry(node.clone()).or_default();
    }

    for (from, to) in edges {
      let downstream = adjacency.entry(from.to_string()).or_default();
      if !downstream.iter().any(|n| n == to) {
        downstream.push(to.to_string());
        reverse_adjacency
          .entry(to.to_string())
          .or_default()
          .push(from.to_string());
      }
    }

    let mut entry_points: Vec<String> = reverse_adjacency
      .iter()
      .filter(|(_, upstream)| upstream.is_empty())
      .map(|(node, _)| node.clone())
      .collect();
    entry_points.sort();

    Self {
      adjacency,
      reverse_adjacency,
      entry_points,
    }
  }

  /// Nodes with no incoming edges.
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  pub fn downstream(&self, node: &str) -> &[String] {
    self
      .adjacency
      .get(node)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn upstream(&self, node: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Number of distinct upstream nodes per node.
  pub fn indegrees(&self) -> HashMap<&str, usize> {
    self
      .reverse_adjacency
      .iter()
      .map(|(node, upstream)| (node.as_str(), upstream.len()))
      .collect()
  }

  /// Kahn's algorithm. Ties are broken by node name so the order is stable.
  ///
  /// Returns the nodes left over, sorted, when the graph has a cycle.
  pub fn topological_order(&self) -> Result<Vec<String>, Vec<String>> {
    let mut indegree = self.indegrees();
    let mut ready: VecDeque<&str> = self.entry_points.iter().map(String::as_str).collect();
    let mut order = Vec::with_capacity(indegree.len());

    while let Some(node) = ready.pop_front() {
      order.push(node.to_string());
      let mut unlocked = Vec::new();
      for next in self.downstream(node) {
        if let Some(count) = indegree.get_mut(next.as_str()) {
          *count -= 1;
          if *count == 0 {
            unlocked.push(next.as_str());
          }
        }
      }
      unlocked.sort_unstable();
      ready.extend(unlocked);
    }

    if order.len() == indegree.len() {
      return Ok(order);
    }

    let mut leftover: Vec<String> = indegree
      .into_iter()
      .filter(|(_, count)| *count > 0)
      .map(|(node, _)| node.to_string())
      .collect();
    leftover.sort();
    Err(leftover)
  }

  /// Every node reachable from `roots`, including the roots themselves.
  pub fn forward_closure<'a>(&'a self, roots: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<&str> = roots.into_iter().collect();
    while let Some(node) = stack.pop() {
      if !seen.insert(node.to_string()) {
        continue;
      }
      stack.extend(self.downstream(node).iter().map(String::as_str));
    }
    seen
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn graph(nodes: &[&str], edges: &[(&'static str, &'static str)]) -> Graph {
    let names: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
    Graph::new(&names, edges.iter().copied())
  }

  #[test]
  fn test_entry_points_and_neighbours() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("a", "c"), ("b", "c")]);

    assert_eq!(g.entry_points(), &["a".to_string()]);
    assert_eq!(g.downstream("a"), &["b".to_string(), "c".to_string()]);
    assert_eq!(g.upstream("c"), &["a".to_string(), "b".to_string()]);
    assert!(g.upstream("missing").is_empty());
  }

  #[test]
  fn test_parallel_edges_collapse() {
    let g = graph(&["a", "b"], &[("a", "b"), ("a", "b")]);
    assert_eq!(g.indegrees()["b"], 1);
  }

  #[test]
  fn test_topological_order() {
    let g = graph(
      &["run", "compile", "check"],
      &[("compile", "run"), ("run", "check")],
    );
    assert_eq!(g.topological_order().unwrap(), vec!["compile", "run", "check"]);
  }

  #[test]
  fn test_cycle_reports_leftover() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "a"), ("b", "c")]);
    assert_eq!(g.topological_order().unwrap_err(), vec!["a", "b", "c"]);
  }

  #[test]
  fn test_forward_closure() {
    let g = graph(
      &["src", "run", "check", "gen"],
      &[("src", "run"), ("run", "check"), ("gen", "check")],
    );
    let closure: Vec<String> = g.forward_closure(["src"]).into_iter().collect();
    assert_eq!(closure, vec!["check", "run", "src"]);
  }
}
