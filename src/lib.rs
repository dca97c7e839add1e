// Allow unwrap in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Arbor: a typed tree-based genetic programming engine.
//!
//! Programs are expression trees over a user-supplied typed grammar, stored
//! as packed preorder arrays so that subtree extraction and replacement are
//! bulk copies. The engine evolves a population of such trees by tournament
//! selection with elitism, type-aware subtree crossover, and subtree
//! mutation; fitness and evaluation semantics stay with the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │       Population / Evolution        │
//! ├─────────────────────────────────────┤
//! │  Selection │ Crossover │ Mutation   │
//! ├─────────────────────────────────────┤
//! │  Initializer  │  Tree Generator     │
//! ├─────────────────────────────────────┤
//! │    Typed Grammar │ Packed Tree      │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use arbor::{binary, terminal, Grammar, Type, TreeBuilder, TreePrinter};
//!
//! let int = Type::new("int");
//! let grammar = Grammar::new(
//!     &[int.clone()],
//!     vec![
//!         terminal("x", &int, 10),
//!         terminal("y", &int, 10),
//!         binary("+", &int, [&int, &int], 5),
//!     ],
//! )
//! .unwrap();
//!
//! let mut genome = arbor::Genome::new();
//! let mut builder = TreeBuilder::new(&mut genome);
//! builder.push(grammar.definition_by_name("+").unwrap().node_value());
//! builder.add(grammar.definition_by_name("x").unwrap().node_value());
//! builder.add(grammar.definition_by_name("y").unwrap().node_value());
//! builder.pop();
//!
//! assert_eq!(TreePrinter::new(&grammar).print(&genome), "(+ x y)");
//! ```

pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod evolution;
pub mod generator;
pub mod grammar;
pub mod initializer;
pub mod printer;
pub mod tree;

pub use compiler::{CompilerDelegate, TreeCompiler};
pub use error::{EvolutionError, GenerateError, GrammarError, TreeError};
pub use evaluator::TreeEvaluator;
pub use evolution::{EvolutionDelegate, EvolutionParams, Population, Stats};
pub use generator::TreeGenerator;
pub use grammar::{
    binary, function, terminal, ternary, unary, Definition, DefinitionKind, DefinitionSpec,
    Grammar, NodeValue, Type, TypeDefinitionSet, TypeId, INVALID_TYPE,
};
pub use initializer::{
    InitOptions, Initializer, RampedHalfAndHalfDelegate, RampedHalfAndHalfInitializer,
};
pub use printer::{PrinterDelegate, TreePrinter};
pub use tree::{Node, Siblings, Tree, TreeBuilder};

/// A GP genome: a packed tree of grammar node values.
pub type Genome = Tree<NodeValue>;
