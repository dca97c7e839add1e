//! Error types for the genetic programming engine.

use std::fmt;

use crate::grammar::{TypeId, INVALID_TYPE};

/// Errors raised while constructing a [`Grammar`](crate::grammar::Grammar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// Two definitions share the same name.
    DuplicateName(String),
    /// Two registered types share the same name.
    DuplicateType(String),
    /// A definition has a weight of zero.
    ZeroWeight(String),
    /// A definition references a type that was not registered.
    UnknownType {
        /// Name of the offending definition.
        definition: String,
        /// The unregistered type name.
        type_name: String,
    },
    /// A function definition has no arguments.
    NoArguments(String),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::DuplicateName(name) => {
                write!(f, "duplicate definition name: {name:?}")
            }
            GrammarError::DuplicateType(name) => write!(f, "duplicate type name: {name:?}"),
            GrammarError::ZeroWeight(name) => {
                write!(f, "definition {name:?} has a zero weight")
            }
            GrammarError::UnknownType {
                definition,
                type_name,
            } => write!(
                f,
                "definition {definition:?} references unknown type {type_name:?}"
            ),
            GrammarError::NoArguments(name) => {
                write!(f, "function {name:?} has no arguments")
            }
        }
    }
}

impl std::error::Error for GrammarError {}

/// Errors raised by subtree operations on a [`Tree`](crate::tree::Tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// A node index past the end of the tree.
    IndexOutOfRange {
        /// The requested node index.
        index: usize,
        /// The number of nodes in the tree.
        len: usize,
    },
    /// Replacing a subtree with an empty tree would orphan a child slot.
    EmptyReplacement,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::IndexOutOfRange { index, len } => {
                write!(f, "node index {index} out of range for tree of {len} nodes")
            }
            TreeError::EmptyReplacement => {
                write!(f, "cannot replace a subtree with an empty tree")
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// Errors raised while generating a random tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateError {
    /// Generation descended to the depth limit through a type that has no
    /// terminals, so no leaf can close the branch.
    DepthExhausted {
        /// The type that was required at the exhausted position.
        type_id: TypeId,
    },
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::DepthExhausted { type_id } => {
                if *type_id == INVALID_TYPE {
                    write!(f, "depth exhausted: the grammar has no terminals")
                } else {
                    write!(f, "depth exhausted: type {type_id} has no terminals")
                }
            }
        }
    }
}

impl std::error::Error for GenerateError {}

/// Errors raised by [`Population`](crate::evolution::Population) operations.
#[derive(Debug)]
pub enum EvolutionError {
    /// A population cannot be empty.
    EmptyPopulation,
    /// The generational algorithm needs at least four individuals.
    PopulationTooSmall {
        /// The actual population size.
        len: usize,
    },
    /// Mutation and crossover rates must be non-negative and sum to at most 1.
    InvalidRates {
        /// The configured mutation rate.
        mutation: f64,
        /// The configured crossover rate.
        crossover: f64,
    },
    /// An initializer emitted a different number of genomes than requested.
    WrongPopulationSize {
        /// The requested population size.
        expected: usize,
        /// The number of genomes actually emitted.
        got: usize,
    },
    /// A subtree operation failed during variation.
    Tree {
        /// The generation that was being produced.
        generation: u32,
        /// The underlying tree error.
        source: TreeError,
    },
    /// Random tree generation failed during initialization.
    Generate {
        /// The generation that was being produced.
        generation: u32,
        /// The underlying generation error.
        source: GenerateError,
    },
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvolutionError::EmptyPopulation => write!(f, "population is empty"),
            EvolutionError::PopulationTooSmall { len } => {
                write!(f, "population of {len} is too small to evolve (minimum 4)")
            }
            EvolutionError::InvalidRates {
                mutation,
                crossover,
            } => write!(
                f,
                "invalid variation rates: mutation {mutation} + crossover {crossover}"
            ),
            EvolutionError::WrongPopulationSize { expected, got } => {
                write!(f, "initializer emitted {got} genomes, expected {expected}")
            }
            EvolutionError::Tree { generation, source } => {
                write!(f, "tree operation failed in generation {generation}: {source}")
            }
            EvolutionError::Generate { generation, source } => {
                write!(f, "generation {generation} failed to generate a tree: {source}")
            }
        }
    }
}

impl std::error::Error for EvolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvolutionError::Tree { source, .. } => Some(source),
            EvolutionError::Generate { source, .. } => Some(source),
            _ => None,
        }
    }
}
