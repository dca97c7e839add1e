//! The evolutionary loop: populations, selection, and variation.
//!
//! Each generation keeps the best individual through elitism, refills the
//! rest by tournament selection, and then walks the new population applying
//! subtree mutation and type-aware subtree crossover at the configured
//! rates. All randomness is drawn from the single generator owned by
//! [`EvolutionParams`], so a fixed seed reproduces a run bit for bit.

// Recoverable crossover failures are reported on stderr.
#![allow(clippy::print_stderr)]
#![allow(clippy::cast_precision_loss)]

use std::io;
use std::ops::Index;

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{EvolutionError, TreeError};
use crate::grammar::{Grammar, TypeId};
use crate::initializer::{InitOptions, Initializer};
use crate::printer::{PrinterDelegate, TreePrinter};
use crate::Genome;

/// The parameters that control the evolutionary process.
///
/// The generator is the only source of randomness for selection, mutation,
/// and crossover; cloning it forks an independent stream, which breaks
/// reproducibility for everything but tests.
#[derive(Debug, Clone)]
pub struct EvolutionParams<R: Rng = SmallRng> {
    /// The random number generator used for all random numbers.
    pub rng: R,
    /// Probability that a variation slot is mutated.
    pub mutation_rate: f64,
    /// Probability that a variation slot is crossed over with a partner.
    pub crossover_rate: f64,
}

impl Default for EvolutionParams<SmallRng> {
    fn default() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            mutation_rate: 0.0,
            crossover_rate: 0.0,
        }
    }
}

impl EvolutionParams<SmallRng> {
    /// Parameters with a reproducible generator.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            mutation_rate: 0.0,
            crossover_rate: 0.0,
        }
    }
}

impl<R: Rng> EvolutionParams<R> {
    /// Parameters drawing from the given generator.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            mutation_rate: 0.0,
            crossover_rate: 0.0,
        }
    }

    fn validate(&self) -> Result<(), EvolutionError> {
        if self.mutation_rate < 0.0
            || self.crossover_rate < 0.0
            || self.mutation_rate + self.crossover_rate > 1.0
        {
            return Err(EvolutionError::InvalidRates {
                mutation: self.mutation_rate,
                crossover: self.crossover_rate,
            });
        }
        Ok(())
    }
}

/// Host callbacks a [`Population`] evolves against.
pub trait EvolutionDelegate {
    /// The grammar the genomes are written in.
    fn grammar(&self) -> &Grammar;

    /// Score every individual, writing into `fitnesses` (sized to match).
    fn compute_fitness(&mut self, individuals: &[Genome], fitnesses: &mut [f64]);

    /// Produce a fresh random tree whose root has the given type. Used as
    /// the replacement source for subtree mutation.
    fn generate_random_tree(&mut self, type_id: TypeId, rng: &mut dyn RngCore) -> Genome;

    /// Custom rendering for population dumps.
    fn printer_delegate(&self) -> Option<&dyn PrinterDelegate> {
        None
    }
}

/// A fitness snapshot of a population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Mean fitness of the population.
    pub average_fitness: f64,
    /// Fitness of the best individual.
    pub best_fitness: f64,
    /// Index of the best individual (first seen on ties).
    pub best_index: usize,
}

impl Stats {
    /// Compute statistics from fitness values. Zeroed for an empty slice.
    #[must_use]
    pub fn from_fitnesses(fitnesses: &[f64]) -> Self {
        if fitnesses.is_empty() {
            return Self {
                average_fitness: 0.0,
                best_fitness: 0.0,
                best_index: 0,
            };
        }
        let mut best_index = 0;
        let mut sum = 0.0;
        for (i, &fitness) in fitnesses.iter().enumerate() {
            sum += fitness;
            if fitness > fitnesses[best_index] {
                best_index = i;
            }
        }
        Self {
            average_fitness: sum / fitnesses.len() as f64,
            best_fitness: fitnesses[best_index],
            best_index,
        }
    }
}

/// A population of tree genomes evolved generation by generation.
#[derive(Debug)]
pub struct Population {
    individuals: Vec<Genome>,
    fitnesses: Vec<f64>,
    generation: u32,
    evaluated_generation: Option<u32>,
    best_index: usize,
}

impl Population {
    /// Create a population slot for `size` individuals.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::EmptyPopulation`] if `size` is zero.
    pub fn new(size: usize) -> Result<Self, EvolutionError> {
        if size == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }
        Ok(Self {
            individuals: Vec::with_capacity(size),
            fitnesses: vec![0.0; size],
            generation: 0,
            evaluated_generation: None,
            best_index: 0,
        })
    }

    /// The population size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fitnesses.len()
    }

    /// Whether the population holds no individuals yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// The current generation number, starting at zero.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The current individuals.
    #[must_use]
    pub fn individuals(&self) -> &[Genome] {
        &self.individuals
    }

    /// The fitness scores of the last evaluated generation.
    #[must_use]
    pub fn fitnesses(&self) -> &[f64] {
        &self.fitnesses
    }

    /// Fill the population with genomes from `initializer`.
    ///
    /// # Errors
    ///
    /// Propagates generation failures and rejects an initializer that emits
    /// a different number of genomes than the population size.
    pub fn initialize(
        &mut self,
        max_depth: i32,
        rng: &mut dyn RngCore,
        initializer: &mut dyn Initializer,
    ) -> Result<(), EvolutionError> {
        let options = InitOptions {
            max_depth,
            population_size: self.fitnesses.len(),
        };
        let generation = self.generation;
        self.individuals.clear();
        let individuals = &mut self.individuals;
        initializer
            .initialize(&options, rng, &mut |genome| individuals.push(genome))
            .map_err(|source| EvolutionError::Generate { generation, source })?;
        if self.individuals.len() != self.fitnesses.len() {
            return Err(EvolutionError::WrongPopulationSize {
                expected: self.fitnesses.len(),
                got: self.individuals.len(),
            });
        }
        self.evaluated_generation = None;
        Ok(())
    }

    /// Score the current generation and return the index of its best
    /// individual. The host callback runs at most once per generation.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::EmptyPopulation`] if the population was
    /// never initialized.
    pub fn evaluate_generation(
        &mut self,
        delegate: &mut dyn EvolutionDelegate,
    ) -> Result<usize, EvolutionError> {
        if self.individuals.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        if self.evaluated_generation == Some(self.generation) {
            return Ok(self.best_index);
        }
        delegate.compute_fitness(&self.individuals, &mut self.fitnesses);
        self.best_index = Stats::from_fitnesses(&self.fitnesses).best_index;
        self.evaluated_generation = Some(self.generation);
        Ok(self.best_index)
    }

    /// Statistics over the current fitness scores.
    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats::from_fitnesses(&self.fitnesses)
    }

    /// Replace the population with the next generation.
    ///
    /// The best individual seeds two slots that variation may touch and is
    /// appended once more unmodified at the end, so it always survives. The
    /// remaining slots are filled by size-3 tournament selection, then the
    /// whole new population is walked once: each slot is mutated with
    /// probability `mutation_rate`, crossed over with the following slot
    /// with probability `crossover_rate` (consuming both slots), or kept
    /// as-is.
    ///
    /// # Errors
    ///
    /// Rejects invalid rates and populations smaller than four, and
    /// propagates variation failures with the generation number attached.
    pub fn next_generation<R: Rng>(
        &mut self,
        params: &mut EvolutionParams<R>,
        delegate: &mut dyn EvolutionDelegate,
    ) -> Result<(), EvolutionError> {
        params.validate()?;
        let size = self.individuals.len();
        if size == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }
        if size < 4 {
            return Err(EvolutionError::PopulationTooSmall { len: size });
        }
        let best = self.evaluate_generation(delegate)?;
        let generation = self.generation;

        let mut new_generation: Vec<Genome> = Vec::with_capacity(size + 1);
        // Two elite seeds that variation below is allowed to touch.
        new_generation.push(self.individuals[best].clone());
        new_generation.push(self.individuals[best].clone());
        for _ in 0..size - 3 {
            let winner = self.tournament(&mut params.rng);
            new_generation.push(self.individuals[winner].clone());
        }

        let mut i = 0;
        while i < new_generation.len() {
            let p: f64 = params.rng.r#gen();
            if p <= params.mutation_rate {
                mutate(&mut new_generation[i], delegate, &mut params.rng)
                    .map_err(|source| EvolutionError::Tree { generation, source })?;
            } else if p <= params.mutation_rate + params.crossover_rate {
                let len = new_generation.len();
                let mut partner = if i + 1 < len {
                    i + 1
                } else {
                    params.rng.gen_range(0..len)
                };
                if partner == i {
                    partner = i - 1;
                }
                if !new_generation[i].is_empty() {
                    let node = params.rng.gen_range(0..new_generation[i].node_count());
                    let type_id = delegate
                        .grammar()
                        .definition_for_value(*new_generation[i].node(node).value())
                        .result_type();
                    let (genome, other) = index_pair(&mut new_generation, i, partner);
                    let swapped =
                        crossover(genome, node, type_id, other, delegate.grammar(), &mut params.rng)
                            .map_err(|source| EvolutionError::Tree { generation, source })?;
                    if !swapped {
                        eprintln!(
                            "Warning: crossover in generation {generation} found no node of type {type_id} in the partner; pair left unchanged"
                        );
                    }
                }
                // Both slots of the pair are consumed.
                i += 1;
            }
            i += 1;
        }

        // The preserved elite, past the reach of variation.
        new_generation.push(self.individuals[best].clone());

        self.individuals = new_generation;
        self.generation += 1;
        Ok(())
    }

    /// Write the generation banner and best individual (optionally every
    /// individual) to `out`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `out`.
    pub fn dump<W: io::Write>(
        &self,
        delegate: &dyn EvolutionDelegate,
        print_individuals: bool,
        out: &mut W,
    ) -> io::Result<()> {
        let stats = self.stats();
        let printer = TreePrinter::new(delegate.grammar());
        writeln!(out, "-----")?;
        writeln!(out, "generation: {}", self.generation)?;
        writeln!(out, "average fitness: {}", stats.average_fitness)?;
        writeln!(out, "best fitness: {}", stats.best_fitness)?;
        if let Some(best) = self.individuals.get(stats.best_index) {
            writeln!(
                out,
                "best individual: {}",
                printer.print_with(best, delegate.printer_delegate())
            )?;
        }
        if print_individuals {
            for (i, genome) in self.individuals.iter().enumerate() {
                writeln!(
                    out,
                    "\t#{i}: {}",
                    printer.print_with(genome, delegate.printer_delegate())
                )?;
            }
        }
        writeln!(out, "-----")
    }

    /// Size-3 tournament: draw three indices with replacement, keep the
    /// fittest (first seen on ties).
    fn tournament<R: Rng>(&self, rng: &mut R) -> usize {
        let size = self.individuals.len();
        let candidates = [
            rng.gen_range(0..size),
            rng.gen_range(0..size),
            rng.gen_range(0..size),
        ];
        let mut winner = candidates[0];
        for &candidate in &candidates[1..] {
            if self.fitnesses[candidate] > self.fitnesses[winner] {
                winner = candidate;
            }
        }
        winner
    }
}

impl Index<usize> for Population {
    type Output = Genome;

    fn index(&self, index: usize) -> &Genome {
        &self.individuals[index]
    }
}

/// Replace a uniformly chosen subtree with a fresh tree of the same type.
fn mutate<R: Rng>(
    genome: &mut Genome,
    delegate: &mut dyn EvolutionDelegate,
    rng: &mut R,
) -> Result<(), TreeError> {
    if genome.is_empty() {
        return Ok(());
    }
    let node = rng.gen_range(0..genome.node_count());
    let type_id = delegate
        .grammar()
        .definition_for_value(*genome.node(node).value())
        .result_type();
    let replacement = delegate.generate_random_tree(type_id, rng);
    genome.replace(node, &replacement)
}

/// Swap the subtree of `genome` at `node` with a uniformly chosen subtree of
/// `other` whose root has the same type. Returns `Ok(false)` when `other`
/// has no node of that type; the pair is left unchanged.
fn crossover<R: Rng>(
    genome: &mut Genome,
    node: usize,
    type_id: TypeId,
    other: &mut Genome,
    grammar: &Grammar,
    rng: &mut R,
) -> Result<bool, TreeError> {
    let candidates: Vec<usize> = (0..other.node_count())
        .filter(|&j| {
            grammar
                .definition_for_value(*other.node(j).value())
                .result_type()
                == type_id
        })
        .collect();
    if candidates.is_empty() {
        return Ok(false);
    }
    let partner_node = candidates[rng.gen_range(0..candidates.len())];
    let from_genome = genome.get_subtree(node)?;
    let from_other = other.get_subtree(partner_node)?;
    genome.replace(node, &from_other)?;
    other.replace(partner_node, &from_genome)?;
    Ok(true)
}

/// Mutable references to two distinct slots of `genomes`.
fn index_pair(genomes: &mut [Genome], i: usize, j: usize) -> (&mut Genome, &mut Genome) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = genomes.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = genomes.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}
