use std::fmt::Write;

use crate::graph::{LineageGraph, LineageResult, PlanNode};

const HEADER: &str = r#"digraph {
  graph [pad="0.5", nodesep="0.5", ranksep="0.5", fontname="Helvetica", fontsize=10, ranksep=2, rankdir="LR"];
  node [shape=plaintext]
"#;

/// Renders a lineage graph as a Graphviz document.
///
/// Nodes are sorted by label and edges by (producer label, producer port,
/// consumer label, consumer port), so equal graphs give equal bytes no matter
/// how they were assembled.
pub struct DotWriter;

impl DotWriter {
    pub fn render(graph: &LineageGraph) -> LineageResult<String> {
        let mut out = String::from(HEADER);

        for node in graph.sorted_nodes() {
            out.push('\n');
            Self::write_node(&mut out, node)?;
        }

        let edges = graph.sorted_edges()?;
        if !edges.is_empty() {
            out.push('\n');
        }
        for (producer, edge, consumer) in edges {
            writeln!(
                out,
                "  \"{}\":{} -> \"{}\":{};",
                escape_id(&producer.label),
                edge.producer.ordinal,
                escape_id(&consumer.label),
                edge.consumer.ordinal
            )?;
        }

        out.push_str("}\n");
        Ok(out)
    }

    fn write_node(out: &mut String, node: &PlanNode) -> LineageResult<()> {
        writeln!(out, "  \"{}\" [color=\"black\" label=<", escape_id(&node.label))?;
        writeln!(out, "  <table>")?;
        writeln!(
            out,
            "    <tr><td bgcolor=\"{}\" port=\"nodeName\"><i>{}</i></td></tr>",
            node.kind.color(),
            escape_html(&node.label)
        )?;
        for (port, column) in node.columns.iter().enumerate() {
            writeln!(out, "    <tr><td port=\"{}\">{}</td></tr>", port, escape_html(column))?;
        }
        writeln!(out, "  </table>>];")?;
        Ok(())
    }
}

fn escape_id(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
