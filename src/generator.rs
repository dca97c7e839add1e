//! Random typed tree generation with the Full and Grow strategies.
//!
//! Full forces every branch to reach the depth limit before closing with a
//! terminal; Grow may pick a terminal at any depth. Both draw uniformly from
//! the type-constrained value space, which makes the pick proportional to
//! definition weights.

use rand::Rng;

use crate::error::GenerateError;
use crate::grammar::{Grammar, NodeValue, TypeDefinitionSet, TypeId};
use crate::tree::TreeBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Full,
    Grow,
}

/// Generates random GP trees under a grammar's type constraints.
#[derive(Debug, Clone, Copy)]
pub struct TreeGenerator<'g> {
    grammar: &'g Grammar,
}

impl<'g> TreeGenerator<'g> {
    /// Create a generator for the given grammar.
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// The grammar this generator draws from.
    #[must_use]
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    fn random_terminal_value<R: Rng + ?Sized>(
        &self,
        set: &TypeDefinitionSet,
        rng: &mut R,
    ) -> NodeValue {
        set.node_value_for(rng.gen_range(0..set.type_constrained_terminal_limit()))
    }

    fn random_function_value<R: Rng + ?Sized>(
        &self,
        set: &TypeDefinitionSet,
        rng: &mut R,
    ) -> NodeValue {
        set.node_value_for(rng.gen_range(
            set.type_constrained_terminal_limit()..set.type_constrained_function_limit(),
        ))
    }

    fn random_node_value<R: Rng + ?Sized>(
        &self,
        set: &TypeDefinitionSet,
        rng: &mut R,
    ) -> NodeValue {
        set.node_value_for(rng.gen_range(0..set.type_constrained_function_limit()))
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        builder: &mut TreeBuilder<'_, NodeValue>,
        max_depth: i32,
        strategy: Strategy,
        type_id: TypeId,
        rng: &mut R,
    ) -> Result<(), GenerateError> {
        let set = self.grammar.definition_set_for_type(type_id);
        if max_depth <= 1 {
            if set.has_terminals() {
                builder.add(self.random_terminal_value(set, rng));
                return Ok(());
            }
            return Err(GenerateError::DepthExhausted { type_id });
        }
        let value = match strategy {
            Strategy::Full if set.has_functions() => self.random_function_value(set, rng),
            Strategy::Grow if set.has_functions() => self.random_node_value(set, rng),
            // No function produces this type; a terminal is the only
            // well-typed choice left.
            _ if set.has_terminals() => self.random_terminal_value(set, rng),
            _ => return Err(GenerateError::DepthExhausted { type_id }),
        };
        let definition = self.grammar.definition_for_value(value);
        if definition.is_terminal() {
            builder.add(value);
            return Ok(());
        }
        builder.push(value);
        for i in 0..definition.num_arguments() {
            self.generate(
                builder,
                max_depth - 1,
                strategy,
                definition.argument_type(i),
                rng,
            )?;
        }
        builder.pop();
        Ok(())
    }

    /// Generate a tree whose every branch reaches exactly `max_depth`.
    ///
    /// Pass [`INVALID_TYPE`](crate::grammar::INVALID_TYPE) as `type_id` to
    /// allow any root type.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::DepthExhausted`] when generation reaches the
    /// depth limit through a type without terminals. The builder's contents
    /// are unspecified after an error; discard the tree.
    pub fn generate_full<R: Rng + ?Sized>(
        &self,
        builder: &mut TreeBuilder<'_, NodeValue>,
        max_depth: i32,
        type_id: TypeId,
        rng: &mut R,
    ) -> Result<(), GenerateError> {
        self.generate(builder, max_depth, Strategy::Full, type_id, rng)
    }

    /// Generate a tree that may stop growing before `max_depth`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::DepthExhausted`] when generation reaches the
    /// depth limit through a type without terminals. The builder's contents
    /// are unspecified after an error; discard the tree.
    pub fn generate_grow<R: Rng + ?Sized>(
        &self,
        builder: &mut TreeBuilder<'_, NodeValue>,
        max_depth: i32,
        type_id: TypeId,
        rng: &mut R,
    ) -> Result<(), GenerateError> {
        self.generate(builder, max_depth, Strategy::Grow, type_id, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{binary, terminal, unary, Type, INVALID_TYPE};
    use crate::tree::Node;
    use crate::Genome;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn arithmetic_grammar() -> Grammar {
        let int = Type::new("int");
        Grammar::new(
            &[int.clone()],
            vec![
                terminal("x", &int, 10),
                terminal("y", &int, 10),
                binary("+", &int, [&int, &int], 5),
                binary("*", &int, [&int, &int], 11),
                unary("sin", &int, &int, 3),
            ],
        )
        .unwrap()
    }

    fn typed_grammar() -> Grammar {
        let scalar = Type::new("float");
        let vector = Type::new("float3");
        Grammar::new(
            &[scalar.clone(), vector.clone()],
            vec![
                terminal("x", &scalar, 10),
                terminal("orange", &vector, 4),
                binary("+", &scalar, [&scalar, &scalar], 5),
                binary("darker", &vector, [&vector, &scalar], 2),
                unary("grayscale", &vector, &vector, 8),
            ],
        )
        .unwrap()
    }

    fn depth(node: Node<'_, u32>) -> i32 {
        1 + node.children().map(depth).max().unwrap_or(0)
    }

    fn check_types(grammar: &Grammar, node: Node<'_, u32>) {
        let definition = grammar.definition_for_value(*node.value());
        assert_eq!(node.child_count(), definition.num_arguments());
        for (i, child) in node.children().enumerate() {
            let child_definition = grammar.definition_for_value(*child.value());
            assert_eq!(child_definition.result_type(), definition.argument_type(i));
            check_types(grammar, child);
        }
    }

    #[test]
    fn test_full_reaches_exact_depth() {
        let grammar = arithmetic_grammar();
        let generator = TreeGenerator::new(&grammar);
        let mut rng = SmallRng::seed_from_u64(7);
        for target in 1..7 {
            let mut genome = Genome::new();
            let mut builder = TreeBuilder::new(&mut genome);
            generator
                .generate_full(&mut builder, target, INVALID_TYPE, &mut rng)
                .unwrap();
            let root = genome.root().unwrap();
            assert_eq!(depth(root), target);
            // Every internal node is a function, every leaf a terminal.
            for index in 0..genome.node_count() {
                let node = genome.node(index);
                let definition = grammar.definition_for_value(*node.value());
                assert_eq!(node.is_leaf(), definition.is_terminal());
            }
        }
    }

    #[test]
    fn test_grow_stays_within_depth() {
        let grammar = arithmetic_grammar();
        let generator = TreeGenerator::new(&grammar);
        let mut rng = SmallRng::seed_from_u64(8);
        for _ in 0..50 {
            let mut genome = Genome::new();
            let mut builder = TreeBuilder::new(&mut genome);
            generator
                .generate_grow(&mut builder, 5, INVALID_TYPE, &mut rng)
                .unwrap();
            assert!(depth(genome.root().unwrap()) <= 5);
            assert!(genome.node_count() >= 1);
        }
    }

    #[test]
    fn test_generated_trees_are_well_typed() {
        let grammar = typed_grammar();
        let generator = TreeGenerator::new(&grammar);
        let vector = grammar.type_by_name("float3").unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..50 {
            let mut genome = Genome::new();
            let mut builder = TreeBuilder::new(&mut genome);
            generator
                .generate_grow(&mut builder, 4, vector, &mut rng)
                .unwrap();
            let root = genome.root().unwrap();
            let root_definition = grammar.definition_for_value(*root.value());
            assert_eq!(root_definition.result_type(), vector);
            check_types(&grammar, root);
        }
    }

    #[test]
    fn test_depth_one_emits_single_terminal() {
        let grammar = arithmetic_grammar();
        let generator = TreeGenerator::new(&grammar);
        let mut rng = SmallRng::seed_from_u64(10);
        let mut genome = Genome::new();
        let mut builder = TreeBuilder::new(&mut genome);
        generator
            .generate_full(&mut builder, 1, INVALID_TYPE, &mut rng)
            .unwrap();
        assert_eq!(genome.node_count(), 1);
        assert!(grammar
            .definition_for_value(*genome.root().unwrap().value())
            .is_terminal());
    }

    #[test]
    fn test_full_without_functions_closes_with_terminal() {
        // No function produces "unit", so Full has to close the branch with
        // a terminal even though the depth budget is not used up.
        let scalar = Type::new("float");
        let unit = Type::new("unit");
        let grammar = Grammar::new(
            &[scalar.clone(), unit.clone()],
            vec![
                terminal("x", &scalar, 10),
                terminal("flag", &unit, 3),
                binary("+", &scalar, [&scalar, &scalar], 5),
            ],
        )
        .unwrap();
        let generator = TreeGenerator::new(&grammar);
        let unit_id = grammar.type_by_name("unit").unwrap();
        let flag = grammar.definition_by_name("flag").unwrap();
        let mut rng = SmallRng::seed_from_u64(12);
        for _ in 0..20 {
            let mut genome = Genome::new();
            let mut builder = TreeBuilder::new(&mut genome);
            generator
                .generate_full(&mut builder, 4, unit_id, &mut rng)
                .unwrap();
            assert_eq!(genome.node_count(), 1);
            assert!(flag.contains(*genome.root().unwrap().value()));
        }
    }

    #[test]
    fn test_terminal_less_type_exhausts_depth() {
        // "loop" has functions but no terminals, so any branch that must
        // close at depth 1 with it fails.
        let looping = Type::new("loop");
        let grammar = Grammar::new(
            &[looping.clone()],
            vec![unary("next", &looping, &looping, 1)],
        )
        .unwrap();
        let generator = TreeGenerator::new(&grammar);
        let type_id = grammar.type_by_name("loop").unwrap();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut genome = Genome::new();
        let mut builder = TreeBuilder::new(&mut genome);
        let err = generator
            .generate_grow(&mut builder, 3, type_id, &mut rng)
            .unwrap_err();
        assert_eq!(err, GenerateError::DepthExhausted { type_id });
    }
}
