//! Post-order genome evaluation.
//!
//! The walk resolves each node's definition and dispatches to the host's
//! terminal, unary, binary, or n-ary callback, threading child results up
//! the tree.

use crate::grammar::{Grammar, NodeValue};
use crate::tree::{Node, Tree};

/// A host-supplied interpreter for genomes over one grammar.
///
/// Implementors provide the callbacks; the trait supplies the recursive
/// dispatch through [`evaluate_node`](TreeEvaluator::evaluate_node).
pub trait TreeEvaluator {
    /// The value the evaluation produces.
    type Value;

    /// The grammar the evaluated genomes are written in.
    fn grammar(&self) -> &Grammar;

    /// Evaluate a terminal node.
    fn evaluate_terminal(&mut self, definition_id: usize, node: Node<'_, NodeValue>)
        -> Self::Value;

    /// Evaluate a one-argument function. Defaults to the identity.
    fn evaluate_unary(
        &mut self,
        definition_id: usize,
        node: Node<'_, NodeValue>,
        x: Self::Value,
    ) -> Self::Value {
        let _ = (definition_id, node);
        x
    }

    /// Evaluate a two-argument function.
    fn evaluate_binary(
        &mut self,
        definition_id: usize,
        node: Node<'_, NodeValue>,
        x: Self::Value,
        y: Self::Value,
    ) -> Self::Value;

    /// Evaluate a function of three or more arguments.
    fn evaluate_function(
        &mut self,
        definition_id: usize,
        node: Node<'_, NodeValue>,
        arguments: Vec<Self::Value>,
    ) -> Self::Value;

    /// Recursively evaluate the subtree rooted at `node`.
    fn evaluate_node(&mut self, node: Node<'_, NodeValue>) -> Self::Value {
        let (definition_id, is_terminal, num_arguments) = {
            let definition = self.grammar().definition_for_value(*node.value());
            (
                definition.definition_id(),
                definition.is_terminal(),
                definition.num_arguments(),
            )
        };
        if is_terminal {
            debug_assert!(node.is_leaf());
            return self.evaluate_terminal(definition_id, node);
        }
        debug_assert_eq!(node.child_count(), num_arguments);
        match num_arguments {
            1 => {
                let x = self.evaluate_node(node.child(0));
                self.evaluate_unary(definition_id, node, x)
            }
            2 => {
                let x = self.evaluate_node(node.child(0));
                let y = self.evaluate_node(node.child(1));
                self.evaluate_binary(definition_id, node, x, y)
            }
            _ => {
                let mut arguments = Vec::with_capacity(num_arguments);
                for child in node.children() {
                    arguments.push(self.evaluate_node(child));
                }
                self.evaluate_function(definition_id, node, arguments)
            }
        }
    }

    /// Evaluate a whole tree, or `None` if it is empty.
    fn evaluate(&mut self, tree: &Tree<NodeValue>) -> Option<Self::Value> {
        tree.root().map(|root| self.evaluate_node(root))
    }
}
