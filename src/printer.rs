//! S-expression rendering of genomes.

use crate::grammar::{Definition, Grammar, NodeValue};
use crate::tree::{Node, Tree};

/// Overrides the rendering of specific terminals, e.g. to decode a weighted
/// terminal's value offset into a parameter index.
pub trait PrinterDelegate {
    /// Render `node` into `out` and return `true`, or return `false` to use
    /// the default rendering.
    fn print_terminal(&self, definition: &Definition, node: Node<'_, NodeValue>, out: &mut String)
        -> bool;
}

/// Prints genomes as S-expressions: `(name child …)` for functions, the bare
/// definition name for terminals.
#[derive(Debug, Clone, Copy)]
pub struct TreePrinter<'g> {
    grammar: &'g Grammar,
}

impl<'g> TreePrinter<'g> {
    /// Create a printer over the given grammar.
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Render a whole tree.
    #[must_use]
    pub fn print(&self, tree: &Tree<NodeValue>) -> String {
        self.print_with(tree, None)
    }

    /// Render a whole tree, consulting `delegate` for terminals.
    #[must_use]
    pub fn print_with(
        &self,
        tree: &Tree<NodeValue>,
        delegate: Option<&dyn PrinterDelegate>,
    ) -> String {
        let mut out = String::new();
        for node in tree {
            self.write_node(node, delegate, &mut out);
        }
        out
    }

    /// Render a single subtree.
    #[must_use]
    pub fn print_node(
        &self,
        node: Node<'_, NodeValue>,
        delegate: Option<&dyn PrinterDelegate>,
    ) -> String {
        let mut out = String::new();
        self.write_node(node, delegate, &mut out);
        out
    }

    fn write_node(
        &self,
        node: Node<'_, NodeValue>,
        delegate: Option<&dyn PrinterDelegate>,
        out: &mut String,
    ) {
        let definition = self.grammar.definition_for_value(*node.value());
        if definition.is_terminal() {
            if let Some(delegate) = delegate {
                if delegate.print_terminal(definition, node, out) {
                    return;
                }
            }
            out.push_str(definition.name());
            return;
        }
        out.push('(');
        out.push_str(definition.name());
        for child in node.children() {
            out.push(' ');
            self.write_node(child, delegate, out);
        }
        out.push(')');
    }
}
