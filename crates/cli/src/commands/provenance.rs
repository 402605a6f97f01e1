//! Provenance graph over annotation values

use anyhow::{Result, bail};
use biofile_finder::provenance::{EdgeDefinition, ProvenanceGraph};
use serde_json::json;

use super::{Context, QueryArgs, print_json};
use crate::format::format_edges;

/// Parse `PARENT:CHILD:RELATIONSHIP`; the relationship defaults to "derived from".
pub fn parse_edge(raw: &str) -> Result<EdgeDefinition> {
  let parts: Vec<&str> = raw.splitn(3, ':').map(str::trim).collect();
  match parts.as_slice() {
    [parent, child] if !parent.is_empty() && !child.is_empty() => {
      Ok(EdgeDefinition::new(*parent, *child, "derived from"))
    }
    [parent, child, relationship] if !parent.is_empty() && !child.is_empty() => {
      Ok(EdgeDefinition::new(*parent, *child, *relationship))
    }
    _ => bail!("Invalid edge '{}': expected PARENT:CHILD[:RELATIONSHIP]", raw),
  }
}

pub async fn cmd_provenance(ctx: &Context, edges: &[String], value: Option<&str>, query: &QueryArgs) -> Result<()> {
  let definitions = edges.iter().map(|e| parse_edge(e)).collect::<Result<Vec<_>>>()?;
  let files = ctx.fetch_all_files(query.to_query()?).await?;
  let graph = ProvenanceGraph::build(&files, &definitions);

  match value {
    Some(value) => {
      if !graph.contains(value) {
        bail!("'{}' does not appear in any provenance edge", value);
      }
      let ancestors = graph.ancestors(value);
      let descendants = graph.descendants(value);
      if ctx.json {
        return print_json(&json!({
          "value": value,
          "parents": graph.parents(value),
          "children": graph.children(value),
          "ancestors": ancestors,
          "descendants": descendants,
        }));
      }
      println!("{}", value);
      println!("  Ancestors:   {}", list_or_none(&ancestors));
      println!("  Descendants: {}", list_or_none(&descendants));
    }
    None => {
      let edges = graph.edges();
      if ctx.json {
        return print_json(&edges);
      }
      print!("{}", format_edges(&edges));
      println!("\n{} values, {} edges from {} files", graph.node_count(), graph.edge_count(), files.len());
    }
  }
  Ok(())
}

fn list_or_none(values: &[String]) -> String {
  if values.is_empty() {
    "(none)".to_string()
  } else {
    values.join(", ")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_edge() {
    assert_eq!(
      parse_edge("Raw file:Segmentation:segmented from").unwrap(),
      EdgeDefinition::new("Raw file", "Segmentation", "segmented from")
    );
    assert_eq!(
      parse_edge("Plate : Well").unwrap(),
      EdgeDefinition::new("Plate", "Well", "derived from")
    );
    assert!(parse_edge("Plate").is_err());
    assert!(parse_edge(":Well").is_err());
  }
}
