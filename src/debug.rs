use alloc::{collections::VecDeque, string::String};
use core::fmt::{self, Write};

use crate::{
    node::{links, Dir, Link},
    BalancedTree,
};

impl<K: fmt::Display> BalancedTree<K> {
    /// Writes the tree to `w` in graphviz `dot` format.
    ///
    /// Nodes are laid out one tree level per row and labelled `key:balance`. Absent children are
    /// drawn as points so that left and right children stay on their side.
    pub fn dotgraph<W: Write>(&self, name: &str, mut w: W) -> fmt::Result {
        let Some(root) = self.root else {
            return write!(w, "digraph \"graph-{name}\" {{}}");
        };

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{\n"
        )?;

        let mut level: VecDeque<Link<K>> = VecDeque::new();
        level.push_back(Some(root));

        let mut missing = 0usize;
        let mut edges = String::new();

        while !level.is_empty() {
            w.write_str("{rank=same; ")?;

            for _ in 0..level.len() {
                let Some(slot) = level.pop_front() else {
                    break;
                };

                let Some(node) = slot else {
                    write!(w, "\"graph-{name}-missing{missing}\" [shape=point]; ")?;
                    missing += 1;
                    continue;
                };

                let key = unsafe { &node.as_ref().key };
                let balance = unsafe { links(node).as_ref().balance() };
                write!(w, "\"graph-{name}-{key}\" [label=\"{key}:{balance}\"]; ")?;

                // Leaves get no placeholder children.
                if unsafe { links(node).as_ref().is_leaf() } {
                    continue;
                }

                for dir in [Dir::Left, Dir::Right] {
                    let child = unsafe { links(node).as_ref().child(dir) };
                    match child {
                        Some(child) => {
                            let child_key = unsafe { &child.as_ref().key };
                            writeln!(
                                edges,
                                "\"graph-{name}-{key}\" -> \"graph-{name}-{child_key}\";"
                            )?;
                        }
                        None => {
                            // Placeholders are numbered in the order they are popped, which is
                            // the order they are pushed.
                            let id = missing + level.iter().filter(|s| s.is_none()).count();
                            writeln!(
                                edges,
                                "\"graph-{name}-{key}\" -> \"graph-{name}-missing{id}\";"
                            )?;
                        }
                    }
                    level.push_back(child);
                }
            }

            w.write_str("}\n")?;
        }

        w.write_str(&edges)?;
        w.write_str(" }\n}")
    }
}
