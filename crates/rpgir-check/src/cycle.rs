//! Buffer-aware cycle detection over the data-flow subgraph.
//!
//! The analyzed graph contains only data edges: ordering-only edges are
//! skipped, and so are edges whose source node is a buffer (a node explicitly
//! allowed to close a loop because it holds state across it). Detection is an
//! iterative DFS with visiting/visited coloring; roots and neighbors are
//! visited in sorted order so the reported cycle is deterministic.

use std::collections::{BTreeSet, HashMap};

use petgraph::graphmap::DiGraphMap;

use rpgir_core::document::Document;

#[derive(Clone, Copy, PartialEq)]
enum Color {
    Visiting,
    Visited,
}

/// Returns the node-id path of the first data cycle found, closing back on
/// its first element (`[a, b, a]` for a 2-cycle), or `None` for an acyclic
/// graph.
pub fn find_cycle(doc: &Document) -> Option<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in &doc.nodes {
        graph.add_node(node.id.as_str());
    }
    for edge in &doc.edges {
        if edge.order_before {
            continue;
        }
        if doc.node(&edge.from).map(|n| n.buffer).unwrap_or(false) {
            continue;
        }
        if graph.contains_node(edge.from.as_str()) && graph.contains_node(edge.to.as_str()) {
            graph.add_edge(edge.from.as_str(), edge.to.as_str(), ());
        }
    }

    let roots: BTreeSet<&str> = doc.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut color: HashMap<&str, Color> = HashMap::new();

    for root in roots {
        if color.contains_key(root) {
            continue;
        }
        // Stack frames: (node, sorted successor list, next successor index).
        let mut stack: Vec<(&str, Vec<&str>, usize)> = vec![(root, successors(&graph, root), 0)];
        color.insert(root, Color::Visiting);

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            if frame.2 >= frame.1.len() {
                let done = frame.0;
                color.insert(done, Color::Visited);
                stack.pop();
                continue;
            }
            let next = frame.1[frame.2];
            frame.2 += 1;
            match color.get(next) {
                Some(Color::Visiting) => {
                    // Back edge: the cycle is the stack suffix from `next`.
                    let start = stack
                        .iter()
                        .position(|(n, _, _)| *n == next)
                        .unwrap_or(stack.len() - 1);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|(n, _, _)| n.to_string()).collect();
                    path.push(next.to_string());
                    return Some(path);
                }
                Some(Color::Visited) => {}
                None => {
                    color.insert(next, Color::Visiting);
                    stack.push((next, successors(&graph, next), 0));
                }
            }
        }
    }

    None
}

fn successors<'a>(graph: &DiGraphMap<&'a str, ()>, node: &'a str) -> Vec<&'a str> {
    let mut out: Vec<&str> = graph.neighbors(node).collect();
    out.sort_unstable();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::document::{EdgeDef, NodeDef, NodeKind, PortDef};

    fn node(id: &str) -> NodeDef {
        let mut n = NodeDef::new(id, NodeKind::Module, "test node");
        n.inputs.push(PortDef::optional("in"));
        n.outputs.push(PortDef::new("out"));
        n
    }

    fn two_node_loop() -> Document {
        let mut doc = Document::new("demo", "demo");
        doc.nodes.push(node("a@1"));
        doc.nodes.push(node("b@1"));
        doc.edges.push(EdgeDef::new("a@1", "out", "b@1", "in"));
        doc.edges.push(EdgeDef::new("b@1", "out", "a@1", "in"));
        doc
    }

    #[test]
    fn reports_two_node_cycle() {
        let path = find_cycle(&two_node_loop()).unwrap();
        assert_eq!(path, vec!["a@1", "b@1", "a@1"]);
    }

    #[test]
    fn buffer_on_closing_node_breaks_the_cycle() {
        let mut doc = two_node_loop();
        doc.node_mut("b@1").unwrap().buffer = true;
        assert_eq!(find_cycle(&doc), None);
    }

    #[test]
    fn ordering_edges_do_not_form_cycles() {
        let mut doc = two_node_loop();
        doc.edges[1].order_before = true;
        assert_eq!(find_cycle(&doc), None);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut doc = Document::new("demo", "demo");
        doc.nodes.push(node("a@1"));
        doc.edges.push(EdgeDef::new("a@1", "out", "a@1", "in"));
        let path = find_cycle(&doc).unwrap();
        assert_eq!(path, vec!["a@1", "a@1"]);
    }

    #[test]
    fn acyclic_chain_is_clean() {
        let mut doc = Document::new("demo", "demo");
        doc.nodes.push(node("a@1"));
        doc.nodes.push(node("b@1"));
        doc.nodes.push(node("c@1"));
        doc.edges.push(EdgeDef::new("a@1", "out", "b@1", "in"));
        doc.edges.push(EdgeDef::new("b@1", "out", "c@1", "in"));
        // Diamond-ish extra edge, still acyclic.
        doc.edges.push(EdgeDef::new("a@1", "out", "c@1", "in"));
        assert_eq!(find_cycle(&doc), None);
    }

    #[test]
    fn three_node_cycle_reports_full_path() {
        let mut doc = Document::new("demo", "demo");
        doc.nodes.push(node("a@1"));
        doc.nodes.push(node("b@1"));
        doc.nodes.push(node("c@1"));
        doc.edges.push(EdgeDef::new("a@1", "out", "b@1", "in"));
        doc.edges.push(EdgeDef::new("b@1", "out", "c@1", "in"));
        doc.edges.push(EdgeDef::new("c@1", "out", "a@1", "in"));
        let path = find_cycle(&doc).unwrap();
        assert_eq!(path, vec!["a@1", "b@1", "c@1", "a@1"]);
    }
}
