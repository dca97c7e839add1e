//! Typed grammar: the vocabulary of terminals and functions a genome draws
//! from.
//!
//! Every definition owns a half-open range `[node_value, node_value + weight)`
//! of the dense node-value space. Any value in the range resolves back to the
//! definition, which makes a uniform draw over a value range a
//! weight-proportional pick, and lets hosts multiplex one weighted terminal
//! over several meanings through the value offset.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::GrammarError;

/// Dense integer encoding of a grammar definition.
pub type NodeValue = u32;

/// Index of a registered type.
pub type TypeId = u32;

/// Sentinel type meaning "any type".
pub const INVALID_TYPE: TypeId = TypeId::MAX;

/// A named type handle used while declaring a grammar.
///
/// Types are registered with [`Grammar::new`]; their [`TypeId`] is their
/// position in the registration list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    name: String,
}

impl Type {
    /// Create a type handle with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The type's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Whether a definition produces leaves or internal nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    /// A leaf producer with no arguments.
    Terminal,
    /// An internal-node producer with at least one argument.
    Function,
}

/// A grammar entry as declared, before registration assigns its encoding.
#[derive(Debug, Clone)]
pub struct DefinitionSpec {
    name: String,
    result_type: String,
    argument_types: Vec<String>,
    weight: u32,
    kind: DefinitionKind,
}

/// Declare a terminal of the given type.
#[must_use]
pub fn terminal(name: &str, result_type: &Type, weight: u32) -> DefinitionSpec {
    DefinitionSpec {
        name: name.to_string(),
        result_type: result_type.name.clone(),
        argument_types: Vec::new(),
        weight,
        kind: DefinitionKind::Terminal,
    }
}

/// Declare a function with an arbitrary argument list.
#[must_use]
pub fn function(name: &str, result_type: &Type, arguments: &[&Type], weight: u32) -> DefinitionSpec {
    DefinitionSpec {
        name: name.to_string(),
        result_type: result_type.name.clone(),
        argument_types: arguments.iter().map(|ty| ty.name.clone()).collect(),
        weight,
        kind: DefinitionKind::Function,
    }
}

/// Declare a one-argument function.
#[must_use]
pub fn unary(name: &str, result_type: &Type, argument: &Type, weight: u32) -> DefinitionSpec {
    function(name, result_type, &[argument], weight)
}

/// Declare a two-argument function.
#[must_use]
pub fn binary(name: &str, result_type: &Type, arguments: [&Type; 2], weight: u32) -> DefinitionSpec {
    function(name, result_type, &arguments, weight)
}

/// Declare a three-argument function.
#[must_use]
pub fn ternary(name: &str, result_type: &Type, arguments: [&Type; 3], weight: u32) -> DefinitionSpec {
    function(name, result_type, &arguments, weight)
}

/// A registered grammar entry.
#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    definition_id: usize,
    node_value: NodeValue,
    weight: u32,
    kind: DefinitionKind,
    result_type: TypeId,
    argument_types: Vec<TypeId>,
}

impl Definition {
    /// The definition's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dense index of this definition in canonical grammar order.
    #[must_use]
    pub fn definition_id(&self) -> usize {
        self.definition_id
    }

    /// First node value of this definition's code range.
    #[must_use]
    pub fn node_value(&self) -> NodeValue {
        self.node_value
    }

    /// Width of the code range, which doubles as the selection weight.
    #[must_use]
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Terminal or function.
    #[must_use]
    pub fn kind(&self) -> DefinitionKind {
        self.kind
    }

    /// Whether this definition is a terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind == DefinitionKind::Terminal
    }

    /// Whether this definition is a function.
    #[must_use]
    pub fn is_function(&self) -> bool {
        self.kind == DefinitionKind::Function
    }

    /// The type this definition produces.
    #[must_use]
    pub fn result_type(&self) -> TypeId {
        self.result_type
    }

    /// The number of arguments (zero for terminals).
    #[must_use]
    pub fn num_arguments(&self) -> usize {
        self.argument_types.len()
    }

    /// The required type of argument `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_arguments()`.
    #[must_use]
    pub fn argument_type(&self, i: usize) -> TypeId {
        self.argument_types[i]
    }

    /// Whether `value` falls inside this definition's code range.
    #[must_use]
    pub fn contains(&self, value: NodeValue) -> bool {
        value >= self.node_value && value < self.node_value + self.weight
    }
}

/// The definitions usable where a given type is required, in a contiguous
/// type-constrained value space of its own: `[0, terminal_limit)` maps to the
/// type's terminals, `[terminal_limit, function_limit)` to its functions.
#[derive(Debug, Clone)]
pub struct TypeDefinitionSet {
    terminal_limit: NodeValue,
    function_limit: NodeValue,
    value_map: Vec<NodeValue>,
}

impl TypeDefinitionSet {
    fn build(definitions: &[Definition], terminals: &Range<usize>, functions: &Range<usize>) -> Self {
        let mut value_map = Vec::new();
        for definition in &definitions[terminals.clone()] {
            for offset in 0..definition.weight {
                value_map.push(definition.node_value + offset);
            }
        }
        let terminal_limit = value_map.len() as NodeValue;
        for definition in &definitions[functions.clone()] {
            for offset in 0..definition.weight {
                value_map.push(definition.node_value + offset);
            }
        }
        let function_limit = value_map.len() as NodeValue;
        Self {
            terminal_limit,
            function_limit,
            value_map,
        }
    }

    /// End of the terminal segment of the constrained value space.
    #[must_use]
    pub fn type_constrained_terminal_limit(&self) -> NodeValue {
        self.terminal_limit
    }

    /// End of the whole constrained value space (terminals then functions).
    #[must_use]
    pub fn type_constrained_function_limit(&self) -> NodeValue {
        self.function_limit
    }

    /// Whether the set contains any terminal.
    #[must_use]
    pub fn has_terminals(&self) -> bool {
        self.terminal_limit > 0
    }

    /// Whether the set contains any function.
    #[must_use]
    pub fn has_functions(&self) -> bool {
        self.function_limit > self.terminal_limit
    }

    /// Map a type-constrained node value back to the global value space.
    ///
    /// Offsets within a definition's range are preserved.
    ///
    /// # Panics
    ///
    /// Panics if `value >= type_constrained_function_limit()`.
    #[must_use]
    pub fn node_value_for(&self, value: NodeValue) -> NodeValue {
        self.value_map[value as usize]
    }
}

/// An immutable, typed GP grammar.
///
/// Construction reorders the declared definitions into the canonical layout:
/// for each registered type in order, all of its terminals; then for each
/// type in order, all of its functions. Declaration order is preserved inside
/// each (type, kind) bucket. Node values are the running prefix sum of
/// weights along this order, so all terminals occupy `[0, terminal_limit)`
/// and all functions `[terminal_limit, node_limit)`.
#[derive(Debug, Clone)]
pub struct Grammar {
    definitions: Vec<Definition>,
    ids_by_name: HashMap<String, usize>,
    type_names: Vec<String>,
    terminal_ranges: Vec<Range<usize>>,
    function_ranges: Vec<Range<usize>>,
    sets: Vec<TypeDefinitionSet>,
    global_set: TypeDefinitionSet,
    terminal_count: usize,
    terminal_limit: NodeValue,
    function_limit: NodeValue,
}

struct ResolvedSpec {
    name: String,
    result_type: TypeId,
    argument_types: Vec<TypeId>,
    weight: u32,
    kind: DefinitionKind,
}

impl Grammar {
    /// Register `types` and `definitions` and build the derived indexes.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for a duplicate type or definition name, a
    /// zero weight, an unregistered type reference, or a function with no
    /// arguments.
    pub fn new(types: &[Type], definitions: Vec<DefinitionSpec>) -> Result<Self, GrammarError> {
        let mut type_ids: HashMap<&str, TypeId> = HashMap::new();
        for (id, ty) in types.iter().enumerate() {
            if type_ids.insert(ty.name(), id as TypeId).is_some() {
                return Err(GrammarError::DuplicateType(ty.name().to_string()));
            }
        }

        let mut resolved = Vec::with_capacity(definitions.len());
        for spec in definitions {
            if spec.weight == 0 {
                return Err(GrammarError::ZeroWeight(spec.name));
            }
            if spec.kind == DefinitionKind::Function && spec.argument_types.is_empty() {
                return Err(GrammarError::NoArguments(spec.name));
            }
            let result_type = match type_ids.get(spec.result_type.as_str()) {
                Some(&id) => id,
                None => {
                    return Err(GrammarError::UnknownType {
                        definition: spec.name,
                        type_name: spec.result_type,
                    })
                }
            };
            let mut argument_types = Vec::with_capacity(spec.argument_types.len());
            for type_name in spec.argument_types {
                match type_ids.get(type_name.as_str()) {
                    Some(&id) => argument_types.push(id),
                    None => {
                        return Err(GrammarError::UnknownType {
                            definition: spec.name,
                            type_name,
                        })
                    }
                }
            }
            resolved.push(ResolvedSpec {
                name: spec.name,
                result_type,
                argument_types,
                weight: spec.weight,
                kind: spec.kind,
            });
        }

        // Canonical reorder: terminals bucketed by type, then functions.
        let mut canonical: Vec<Definition> = Vec::with_capacity(resolved.len());
        let mut ids_by_name = HashMap::with_capacity(resolved.len());
        let mut terminal_ranges = vec![0..0; types.len()];
        let mut function_ranges = vec![0..0; types.len()];
        let mut terminal_count = 0;
        let mut node_value: NodeValue = 0;
        for kind in [DefinitionKind::Terminal, DefinitionKind::Function] {
            for type_id in 0..types.len() as TypeId {
                let start = canonical.len();
                for spec in &resolved {
                    if spec.kind != kind || spec.result_type != type_id {
                        continue;
                    }
                    let definition_id = canonical.len();
                    if ids_by_name.insert(spec.name.clone(), definition_id).is_some() {
                        return Err(GrammarError::DuplicateName(spec.name.clone()));
                    }
                    canonical.push(Definition {
                        name: spec.name.clone(),
                        definition_id,
                        node_value,
                        weight: spec.weight,
                        kind: spec.kind,
                        result_type: spec.result_type,
                        argument_types: spec.argument_types.clone(),
                    });
                    node_value += spec.weight;
                }
                let range = start..canonical.len();
                match kind {
                    DefinitionKind::Terminal => terminal_ranges[type_id as usize] = range,
                    DefinitionKind::Function => function_ranges[type_id as usize] = range,
                }
            }
            if kind == DefinitionKind::Terminal {
                terminal_count = canonical.len();
            }
        }

        let terminal_limit: NodeValue = canonical[..terminal_count]
            .iter()
            .map(Definition::weight)
            .sum();
        let function_limit = node_value - terminal_limit;

        let sets = (0..types.len())
            .map(|t| TypeDefinitionSet::build(&canonical, &terminal_ranges[t], &function_ranges[t]))
            .collect();
        let global_set = TypeDefinitionSet::build(
            &canonical,
            &(0..terminal_count),
            &(terminal_count..canonical.len()),
        );

        Ok(Self {
            definitions: canonical,
            ids_by_name,
            type_names: types.iter().map(|ty| ty.name.clone()).collect(),
            terminal_ranges,
            function_ranges,
            sets,
            global_set,
            terminal_count,
            terminal_limit,
            function_limit,
        })
    }

    /// The number of registered definitions.
    #[must_use]
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// The definition with the given dense id.
    ///
    /// # Panics
    ///
    /// Panics if `definition_id >= definition_count()`.
    #[must_use]
    pub fn definition(&self, definition_id: usize) -> &Definition {
        &self.definitions[definition_id]
    }

    /// Look up a definition by name.
    #[must_use]
    pub fn definition_by_name(&self, name: &str) -> Option<&Definition> {
        self.ids_by_name.get(name).map(|&id| &self.definitions[id])
    }

    /// Resolve a node value to the id of the definition whose code range
    /// contains it.
    ///
    /// Callers pass values produced by this grammar; values at or past
    /// [`node_limit`](Grammar::node_limit) resolve to the last definition.
    #[must_use]
    pub fn definition_id_for_value(&self, value: NodeValue) -> usize {
        let after = self
            .definitions
            .partition_point(|definition| definition.node_value <= value);
        after.saturating_sub(1)
    }

    /// Resolve a node value to its definition.
    #[must_use]
    pub fn definition_for_value(&self, value: NodeValue) -> &Definition {
        &self.definitions[self.definition_id_for_value(value)]
    }

    /// Sum of the weights of all terminals. Terminal node values occupy
    /// `[0, terminal_limit)`.
    #[must_use]
    pub fn terminal_limit(&self) -> NodeValue {
        self.terminal_limit
    }

    /// Sum of the weights of all functions. Function node values occupy
    /// `[terminal_limit, node_limit)`.
    #[must_use]
    pub fn function_limit(&self) -> NodeValue {
        self.function_limit
    }

    /// One past the largest assigned node value.
    #[must_use]
    pub fn node_limit(&self) -> NodeValue {
        self.terminal_limit + self.function_limit
    }

    /// The number of registered types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.type_names.len()
    }

    /// Look up a registered type by name.
    #[must_use]
    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.type_names
            .iter()
            .position(|type_name| type_name == name)
            .map(|id| id as TypeId)
    }

    /// The name of a registered type.
    ///
    /// # Panics
    ///
    /// Panics if `type_id` is not registered.
    #[must_use]
    pub fn type_name(&self, type_id: TypeId) -> &str {
        &self.type_names[type_id as usize]
    }

    /// The terminals producing the given type, in canonical order.
    /// [`INVALID_TYPE`] selects all terminals.
    ///
    /// # Panics
    ///
    /// Panics if `type_id` is neither registered nor [`INVALID_TYPE`].
    #[must_use]
    pub fn terminals_for_type(&self, type_id: TypeId) -> &[Definition] {
        if type_id == INVALID_TYPE {
            return &self.definitions[..self.terminal_count];
        }
        &self.definitions[self.terminal_ranges[type_id as usize].clone()]
    }

    /// The functions producing the given type, in canonical order.
    /// [`INVALID_TYPE`] selects all functions.
    ///
    /// # Panics
    ///
    /// Panics if `type_id` is neither registered nor [`INVALID_TYPE`].
    #[must_use]
    pub fn functions_for_type(&self, type_id: TypeId) -> &[Definition] {
        if type_id == INVALID_TYPE {
            return &self.definitions[self.terminal_count..];
        }
        &self.definitions[self.function_ranges[type_id as usize].clone()]
    }

    /// Whether any terminal produces the given type.
    #[must_use]
    pub fn has_terminals(&self, type_id: TypeId) -> bool {
        !self.terminals_for_type(type_id).is_empty()
    }

    /// Whether any function produces the given type.
    #[must_use]
    pub fn has_functions(&self, type_id: TypeId) -> bool {
        !self.functions_for_type(type_id).is_empty()
    }

    /// The definition set for the given type, or the global set for
    /// [`INVALID_TYPE`].
    ///
    /// # Panics
    ///
    /// Panics if `type_id` is neither registered nor [`INVALID_TYPE`].
    #[must_use]
    pub fn definition_set_for_type(&self, type_id: TypeId) -> &TypeDefinitionSet {
        if type_id == INVALID_TYPE {
            &self.global_set
        } else {
            &self.sets[type_id as usize]
        }
    }
}
