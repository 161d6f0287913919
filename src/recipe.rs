//! The [`Recipe`] sum type (§4.4): lookup's output, and the binder's input
//! to `use_recipe`, a small DSL for "how to produce a binding from a name
//! resolution result" (§9 "Recipe + Bind-by-recipe double dispatch").
//!
//! §4.4 lists `Literal`, `Selection`, `FreeTable`, `AttachedTable(joins)`,
//! `Column(column, link?)`, `Kernel(quotient, idx)`, `Complement(quotient)`,
//! `Identity(recipes)`, `Chain(recipes)`, `Substitution(...)`,
//! `Binding(binding)`, `Closed(recipe)`, `Pinned(scope, recipe)`,
//! `Ambiguous(alternatives)`, `Invalid`. All are represented; `Substitution`
//! is reduced to the shape the binder actually needs (a parameter list plus
//! a body `Syntax` to re-bind at the call site) since the original's general
//! macro/definition system is out of scope here (see DESIGN.md).

use crate::binding::Binding;
use crate::catalog::join::Join;
use crate::catalog::{ColumnId, TableId};
use crate::syntax::Syntax;

#[derive(Debug, Clone)]
pub enum Recipe {
    Literal,
    FreeTable { table: TableId },
    AttachedTable { table: TableId, joins: Vec<Join> },
    Column { column: ColumnId, link: Option<Vec<Join>> },
    /// The `idx`-th kernel expression of an enclosing `Quotient` scope.
    Kernel { idx: usize },
    /// The complement link back to the pre-quotient rows.
    Complement,
    Identity { arms: Vec<Recipe> },
    Chain { arms: Vec<Recipe> },
    /// A calculated-attribute definition: `parameters` are bound as
    /// definitions in the scope `body` is re-bound against.
    Substitution {
        parameters: Vec<String>,
        body: Box<Syntax>,
    },
    Binding { binding: Box<Binding> },
    Closed { recipe: Box<Recipe> },
    Ambiguous { alternatives: Vec<String> },
    Invalid,
}
