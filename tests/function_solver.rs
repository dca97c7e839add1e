//! End-to-end symbolic regression: evolve an expression that approximates
//! a target function of two parameters.
//!
//! The single weighted `parameter` terminal is multiplexed over both
//! parameters through its node-value offset, and rendered as `$0` / `$1` by
//! a printer delegate.

#![allow(clippy::unwrap_used)]

use arbor::{
    binary, terminal, Definition, EvolutionDelegate, EvolutionParams, Genome, Grammar, Node,
    NodeValue, Population, PrinterDelegate, RampedHalfAndHalfInitializer, TreeBuilder,
    TreeEvaluator, TreeGenerator, TreePrinter, Type, TypeId,
};
use rand::RngCore;

/// The function we are trying to find: `(+ (* $0 $1) (- $1 (* $0 $0)))`.
fn target(x: i64, y: i64) -> i64 {
    x * y + (y - x * x)
}

const PARAMETER_COUNT: u32 = 2;

const TRAINING_SET: [[i64; 2]; 8] = [
    [1, 2],
    [4, 5],
    [6, 7],
    [8, 9],
    [10, 11],
    [45, 11],
    [450, 660],
    [2017, 13],
];

fn solver_grammar() -> Grammar {
    let int = Type::new("int");
    Grammar::new(
        &[int.clone()],
        vec![
            terminal("parameter", &int, 50),
            terminal("1", &int, 50),
            binary("+", &int, [&int, &int], 50),
            binary("-", &int, [&int, &int], 50),
            binary("*", &int, [&int, &int], 50),
        ],
    )
    .unwrap()
}

/// Which parameter a `parameter` node denotes, decoded from its value offset.
fn parameter_index(definition: &Definition, node: Node<'_, NodeValue>) -> usize {
    let offset = node.value() - definition.node_value();
    let per_parameter = definition.weight() / PARAMETER_COUNT;
    (offset / per_parameter) as usize
}

/// Renders `parameter` terminals as `$0` / `$1`.
struct ParameterPrinter;

impl PrinterDelegate for ParameterPrinter {
    fn print_terminal(
        &self,
        definition: &Definition,
        node: Node<'_, NodeValue>,
        out: &mut String,
    ) -> bool {
        if definition.name() != "parameter" {
            return false;
        }
        out.push('$');
        out.push_str(&parameter_index(definition, node).to_string());
        true
    }
}

struct FnEvaluator<'g> {
    grammar: &'g Grammar,
    parameters: [i64; 2],
    parameter: usize,
    add: usize,
    sub: usize,
}

impl<'g> FnEvaluator<'g> {
    fn new(grammar: &'g Grammar, parameters: [i64; 2]) -> Self {
        let id = |name: &str| grammar.definition_by_name(name).unwrap().definition_id();
        Self {
            grammar,
            parameters,
            parameter: id("parameter"),
            add: id("+"),
            sub: id("-"),
        }
    }
}

impl TreeEvaluator for FnEvaluator<'_> {
    type Value = i64;

    fn grammar(&self) -> &Grammar {
        self.grammar
    }

    fn evaluate_terminal(&mut self, definition_id: usize, node: Node<'_, NodeValue>) -> i64 {
        if definition_id == self.parameter {
            let definition = self.grammar.definition(definition_id);
            return self.parameters[parameter_index(definition, node)];
        }
        1
    }

    fn evaluate_binary(
        &mut self,
        definition_id: usize,
        _node: Node<'_, NodeValue>,
        x: i64,
        y: i64,
    ) -> i64 {
        // Wrapping keeps runaway product chains total.
        if definition_id == self.add {
            x.wrapping_add(y)
        } else if definition_id == self.sub {
            x.wrapping_sub(y)
        } else {
            x.wrapping_mul(y)
        }
    }

    fn evaluate_function(
        &mut self,
        _definition_id: usize,
        _node: Node<'_, NodeValue>,
        _arguments: Vec<i64>,
    ) -> i64 {
        0
    }
}

struct FnEvolver<'g> {
    grammar: &'g Grammar,
    printer: ParameterPrinter,
}

impl<'g> FnEvolver<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            printer: ParameterPrinter,
        }
    }

    fn fitness_of(&self, genome: &Genome) -> f64 {
        let mut fitness = 0.0;
        for parameters in TRAINING_SET {
            let expected = target(parameters[0], parameters[1]);
            let mut evaluator = FnEvaluator::new(self.grammar, parameters);
            let answer = evaluator.evaluate(genome).unwrap();
            fitness += 1.0 - (answer as f64 - expected as f64).abs() / 1000.0;
        }
        fitness /= TRAINING_SET.len() as f64;
        // Penalize large trees.
        fitness - (genome.node_count() as f64 / 30.0).ceil().log10()
    }
}

impl EvolutionDelegate for FnEvolver<'_> {
    fn grammar(&self) -> &Grammar {
        self.grammar
    }

    fn compute_fitness(&mut self, individuals: &[Genome], fitnesses: &mut [f64]) {
        for (i, genome) in individuals.iter().enumerate() {
            fitnesses[i] = self.fitness_of(genome);
        }
    }

    fn generate_random_tree(&mut self, type_id: TypeId, rng: &mut dyn RngCore) -> Genome {
        let generator = TreeGenerator::new(self.grammar);
        let mut genome = Genome::new();
        let mut builder = TreeBuilder::new(&mut genome);
        generator
            .generate_grow(&mut builder, 2, type_id, &mut *rng)
            .unwrap();
        genome
    }

    fn printer_delegate(&self) -> Option<&dyn PrinterDelegate> {
        Some(&self.printer)
    }
}

fn run(seed: u64, generations: u32) -> (Population, f64) {
    let grammar = solver_grammar();
    let mut delegate = FnEvolver::new(&grammar);
    let mut params = EvolutionParams::seeded(seed);
    params.mutation_rate = 0.1;
    params.crossover_rate = 0.895;

    let mut population = Population::new(100).unwrap();
    let mut init = RampedHalfAndHalfInitializer::new(&grammar);
    population.initialize(10, &mut params.rng, &mut init).unwrap();

    population.evaluate_generation(&mut delegate).unwrap();
    let mut previous_best = population.stats().best_fitness;
    for _ in 0..generations {
        population.next_generation(&mut params, &mut delegate).unwrap();
        population.evaluate_generation(&mut delegate).unwrap();
        let best = population.stats().best_fitness;
        // The preserved elite makes the best fitness monotone.
        assert!(best >= previous_best);
        previous_best = best;
    }
    (population, previous_best)
}

#[test]
fn test_evolution_run_postconditions() {
    let (population, best_fitness) = run(42, 100);
    assert_eq!(population.generation(), 100);
    assert_eq!(population.individuals().len(), 100);

    let stats = population.stats();
    assert_eq!(stats.best_fitness, best_fitness);
    assert!(stats.best_index < population.len());

    // The winner prints as a well-formed expression over the solver grammar.
    let grammar = solver_grammar();
    let printer = TreePrinter::new(&grammar);
    let rendered = printer.print_with(&population[stats.best_index], Some(&ParameterPrinter));
    assert!(!rendered.is_empty());
    for genome in population.individuals() {
        assert!(!genome.is_empty());
        assert_eq!(genome.node(0).subtree_size(), genome.node_count());
    }
}

#[test]
fn test_run_is_deterministic() {
    let (first, first_best) = run(7, 20);
    let (second, second_best) = run(7, 20);
    assert_eq!(first_best, second_best);
    assert_eq!(first.individuals(), second.individuals());
}

#[test]
fn test_parameter_terminal_decodes_offsets() {
    let grammar = solver_grammar();
    let parameter = grammar.definition_by_name("parameter").unwrap();

    // Offsets in the lower half of the range decode to $0, the upper half
    // to $1.
    let mut genome = Genome::new();
    TreeBuilder::new(&mut genome).add(parameter.node_value() + 24);
    let mut evaluator = FnEvaluator::new(&grammar, [10, 20]);
    assert_eq!(evaluator.evaluate(&genome), Some(10));
    let printer = TreePrinter::new(&grammar);
    assert_eq!(printer.print_with(&genome, Some(&ParameterPrinter)), "$0");

    let mut genome = Genome::new();
    TreeBuilder::new(&mut genome).add(parameter.node_value() + 25);
    let mut evaluator = FnEvaluator::new(&grammar, [10, 20]);
    assert_eq!(evaluator.evaluate(&genome), Some(20));
    let printer = TreePrinter::new(&grammar);
    assert_eq!(printer.print_with(&genome, Some(&ParameterPrinter)), "$1");
}
