//! Population initialization.
//!
//! The ramped half-and-half initializer builds the first half of the
//! population with the Full strategy and the second half with Grow, ramping
//! the target depth from 1 up to the configured maximum inside each half.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::GenerateError;
use crate::generator::TreeGenerator;
use crate::grammar::{Grammar, NodeValue, INVALID_TYPE};
use crate::tree::TreeBuilder;
use crate::Genome;

/// Options controlling population initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitOptions {
    /// The maximum depth of generated genomes.
    pub max_depth: i32,
    /// The number of genomes to emit.
    pub population_size: usize,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            max_depth: 6,
            population_size: 100,
        }
    }
}

/// Produces the genomes of an initial population.
pub trait Initializer {
    /// Emit exactly `options.population_size` genomes to `sink`.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if a genome cannot be generated; genomes
    /// already emitted stay with the sink.
    fn initialize(
        &mut self,
        options: &InitOptions,
        rng: &mut dyn RngCore,
        sink: &mut dyn FnMut(Genome),
    ) -> Result<(), GenerateError>;
}

/// Overrides tree emission during ramped half-and-half initialization,
/// typically to force a specific root function or root type.
pub trait RampedHalfAndHalfDelegate {
    /// Called before each Full tree. Return `Ok(true)` if the delegate built
    /// the tree itself.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if the delegate's own generation fails.
    fn generate_full(
        &mut self,
        generator: &TreeGenerator<'_>,
        builder: &mut TreeBuilder<'_, NodeValue>,
        max_depth: i32,
        rng: &mut dyn RngCore,
    ) -> Result<bool, GenerateError>;

    /// Called before each Grow tree. Return `Ok(true)` if the delegate built
    /// the tree itself.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if the delegate's own generation fails.
    fn generate_grow(
        &mut self,
        generator: &TreeGenerator<'_>,
        builder: &mut TreeBuilder<'_, NodeValue>,
        max_depth: i32,
        rng: &mut dyn RngCore,
    ) -> Result<bool, GenerateError>;
}

/// Ramped half-and-half initialization.
pub struct RampedHalfAndHalfInitializer<'a> {
    generator: TreeGenerator<'a>,
    delegate: Option<&'a mut dyn RampedHalfAndHalfDelegate>,
}

impl<'a> RampedHalfAndHalfInitializer<'a> {
    /// Create an initializer over the given grammar.
    #[must_use]
    pub fn new(grammar: &'a Grammar) -> Self {
        Self {
            generator: TreeGenerator::new(grammar),
            delegate: None,
        }
    }

    /// Create an initializer that consults `delegate` before emitting each
    /// tree.
    #[must_use]
    pub fn with_delegate(
        grammar: &'a Grammar,
        delegate: &'a mut dyn RampedHalfAndHalfDelegate,
    ) -> Self {
        Self {
            generator: TreeGenerator::new(grammar),
            delegate: Some(delegate),
        }
    }
}

impl Initializer for RampedHalfAndHalfInitializer<'_> {
    fn initialize(
        &mut self,
        options: &InitOptions,
        rng: &mut dyn RngCore,
        sink: &mut dyn FnMut(Genome),
    ) -> Result<(), GenerateError> {
        let size = options.population_size;
        let half = size / 2;
        // The ramp divides by the exact half; only the loop bound truncates.
        let depth_delta = if size == 0 {
            0.0
        } else {
            options.max_depth as f32 / (size as f32 / 2.0)
        };

        let mut depth = 1.0_f32;
        for _ in 0..half {
            let current_depth = depth.floor() as i32;
            let mut genome = Genome::new();
            {
                let mut builder = TreeBuilder::new(&mut genome);
                let handled = match self.delegate.as_mut() {
                    Some(delegate) => {
                        delegate.generate_full(&self.generator, &mut builder, current_depth, rng)?
                    }
                    None => false,
                };
                if !handled {
                    self.generator
                        .generate_full(&mut builder, current_depth, INVALID_TYPE, &mut *rng)?;
                }
            }
            sink(genome);
            depth += depth_delta;
        }

        depth = 1.0;
        for _ in half..size {
            let current_depth = depth.floor() as i32;
            let mut genome = Genome::new();
            {
                let mut builder = TreeBuilder::new(&mut genome);
                let handled = match self.delegate.as_mut() {
                    Some(delegate) => {
                        delegate.generate_grow(&self.generator, &mut builder, current_depth, rng)?
                    }
                    None => false,
                };
                if !handled {
                    self.generator
                        .generate_grow(&mut builder, current_depth, INVALID_TYPE, &mut *rng)?;
                }
            }
            sink(genome);
            depth += depth_delta;
        }
        Ok(())
    }
}
