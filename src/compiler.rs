//! Source-style rendering of genomes.
//!
//! Where the printer emits S-expressions, the compiler renders a genome the
//! way the target language would write it: `name(a, b)` for calls, and
//! `(a op b)` or `(op a)` for definitions the delegate marks as operators.

use crate::grammar::{Definition, Grammar, NodeValue};
use crate::tree::{Node, Tree};

/// Controls how definitions are rendered as source text.
pub trait CompilerDelegate {
    /// Render a terminal into `out` and return `true`, or return `false` to
    /// use the definition name.
    fn print_terminal(&self, definition: &Definition, node: Node<'_, NodeValue>, out: &mut String)
        -> bool;

    /// Render a whole function node into `out` and return `true`, or return
    /// `false` to use the default call or operator form.
    fn print_function(&self, definition: &Definition, node: Node<'_, NodeValue>, out: &mut String)
        -> bool;

    /// Whether a one- or two-argument function should render as an operator
    /// instead of a call.
    fn print_as_operator(&self, definition: &Definition) -> bool;
}

/// Renders genomes as source-style program text.
pub struct TreeCompiler<'a> {
    grammar: &'a Grammar,
    delegate: Option<&'a dyn CompilerDelegate>,
}

impl<'a> TreeCompiler<'a> {
    /// Create a compiler that always uses call syntax.
    #[must_use]
    pub fn new(grammar: &'a Grammar) -> Self {
        Self {
            grammar,
            delegate: None,
        }
    }

    /// Create a compiler that consults `delegate` for rendering choices.
    #[must_use]
    pub fn with_delegate(grammar: &'a Grammar, delegate: &'a dyn CompilerDelegate) -> Self {
        Self {
            grammar,
            delegate: Some(delegate),
        }
    }

    /// Render a whole tree.
    #[must_use]
    pub fn compile(&self, tree: &Tree<NodeValue>) -> String {
        let mut out = String::new();
        for node in tree {
            self.write_node(node, &mut out);
        }
        out
    }

    fn write_node(&self, node: Node<'_, NodeValue>, out: &mut String) {
        let definition = self.grammar.definition_for_value(*node.value());
        if definition.is_terminal() {
            if let Some(delegate) = self.delegate {
                if delegate.print_terminal(definition, node, out) {
                    return;
                }
            }
            out.push_str(definition.name());
            return;
        }
        if let Some(delegate) = self.delegate {
            if delegate.print_function(definition, node, out) {
                return;
            }
            if delegate.print_as_operator(definition) {
                match node.child_count() {
                    1 => {
                        out.push('(');
                        out.push_str(definition.name());
                        out.push(' ');
                        self.write_node(node.child(0), out);
                        out.push(')');
                        return;
                    }
                    2 => {
                        out.push('(');
                        self.write_node(node.child(0), out);
                        out.push(' ');
                        out.push_str(definition.name());
                        out.push(' ');
                        self.write_node(node.child(1), out);
                        out.push(')');
                        return;
                    }
                    // Operators have one or two operands; anything else
                    // falls back to call syntax.
                    _ => {}
                }
            }
        }
        out.push_str(definition.name());
        out.push('(');
        for (i, child) in node.children().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_node(child, out);
        }
        out.push(')');
    }
}
