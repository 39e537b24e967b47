//! Primitive procedure library.
//!
//! Every primitive is described once by a [`BuiltinOp`]: the names it answers to, how it
//! receives its inputs and its [`Arity`]. Each group module exposes a static table and
//! [`install`] registers all of them, with every alias sharing a single procedure.
//!
//! ## Calling conventions
//!
//! - **Functions** receive evaluated inputs, left to right (`sum`, `first`, `print`)
//! - **Lazy** primitives receive their input expressions unevaluated (`and`, `or`)
//! - **Special forms** take over the rest of the statement while it is compiled (`to`)
//!
//! Infix operators reuse the function primitives (`+` is `sum`, `=` is `equalp`), so
//! operator and prefix forms report identical errors.
//!
//! ## Adding New Primitives
//!
//! 1. **Implement the function** in the group module, using the `coerce` helpers for
//!    input checking so messages read `NAME: Expected number`
//! 2. **Add a table entry** to the group's `OPS` with every alias and the arity
//! 3. **Add tests** to the group's data-driven table

use std::fmt;
use std::rc::Rc;

use crate::ast::Value;
use crate::evaluator::{Expr, Tokens};
use crate::procedures::{Arity, Procedure, ProcedureBody, Registry};
use crate::reader::InfixOp;
use crate::{Error, Interpreter, Outcome};

mod coerce;
mod control;
mod data;
mod graphics;
mod logic;
mod math;
mod text;
mod variables;
mod workspace;

/// Primitive over evaluated inputs
pub type PrimitiveFn = fn(&mut Interpreter, Vec<Value>) -> Outcome<Option<Value>>;
/// Primitive over unevaluated input expressions
pub type LazyFn = fn(&mut Interpreter, &[Expr]) -> Outcome<Option<Value>>;
/// Special form consuming the remainder of its statement
pub type SpecialFn = fn(&mut Interpreter, &mut Tokens<'_>) -> Result<(), Error>;

/// How a primitive receives its inputs
#[derive(Clone, Copy)]
pub enum OpKind {
    Function(PrimitiveFn),
    Lazy(LazyFn),
    Special(SpecialFn),
}

impl fmt::Debug for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::Lazy(_) => write!(f, "Lazy(<fn>)"),
            OpKind::Special(_) => write!(f, "Special(<fn>)"),
        }
    }
}

/// Table entry describing one primitive
#[derive(Debug)]
pub struct BuiltinOp {
    /// Canonical name first, then aliases
    pub names: &'static [&'static str],
    pub op_kind: OpKind,
    pub arity: Arity,
}

impl BuiltinOp {
    pub(crate) const fn function(names: &'static [&'static str], arity: Arity, f: PrimitiveFn) -> Self {
        BuiltinOp {
            names,
            op_kind: OpKind::Function(f),
            arity,
        }
    }

    pub(crate) const fn lazy(names: &'static [&'static str], arity: Arity, f: LazyFn) -> Self {
        BuiltinOp {
            names,
            op_kind: OpKind::Lazy(f),
            arity,
        }
    }

    pub(crate) const fn special(names: &'static [&'static str], f: SpecialFn) -> Self {
        BuiltinOp {
            names,
            op_kind: OpKind::Special(f),
            arity: Arity::fixed(0),
        }
    }
}

static GROUPS: &[&[BuiltinOp]] = &[
    data::OPS,
    math::OPS,
    logic::OPS,
    control::OPS,
    variables::OPS,
    workspace::OPS,
    text::OPS,
    graphics::OPS,
];

/// Every primitive in registration order
pub fn builtin_ops() -> impl Iterator<Item = &'static BuiltinOp> {
    GROUPS.iter().flat_map(|group| group.iter())
}

/// Register every primitive under all of its names
pub(crate) fn install(registry: &mut Registry) {
    for op in builtin_ops() {
        let procedure = Rc::new(Procedure {
            name: op.names[0].to_owned(),
            arity: op.arity,
            body: ProcedureBody::Builtin(op.op_kind),
        });
        for name in op.names {
            registry.insert(name, Rc::clone(&procedure));
        }
    }
}

/// The primitive behind an infix operator; `None` is unary negation
pub(crate) fn infix_primitive(op: Option<InfixOp>) -> (&'static str, PrimitiveFn) {
    match op {
        None => ("minus", math::minus),
        Some(InfixOp::Add) => ("sum", math::sum),
        Some(InfixOp::Subtract) => ("difference", math::difference),
        Some(InfixOp::Multiply) => ("product", math::product),
        Some(InfixOp::Divide) => ("quotient", math::quotient),
        Some(InfixOp::Remainder) => ("remainder", math::remainder),
        Some(InfixOp::Power) => ("power", math::power),
        Some(InfixOp::Equal) => ("equalp", data::equalp),
        Some(InfixOp::NotEqual) => ("notequalp", data::notequalp),
        Some(InfixOp::Less) => ("lessp", math::lessp),
        Some(InfixOp::Greater) => ("greaterp", math::greaterp),
        Some(InfixOp::LessEqual) => ("lessequalp", math::lessequalp),
        Some(InfixOp::GreaterEqual) => ("greaterequalp", math::greaterequalp),
    }
}


#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_builtin_ops_registry() {
        let mut seen = HashSet::new();
        for op in builtin_ops() {
            assert!(!op.names.is_empty());
            for name in op.names {
                assert_eq!(*name, name.to_lowercase(), "names are stored lower-cased");
                assert!(seen.insert(*name), "duplicate primitive name {name}");
            }
            let Arity {
                minimum,
                default,
                maximum,
            } = op.arity;
            assert!(minimum <= default, "{}: default below minimum", op.names[0]);
            if let Some(maximum) = maximum {
                assert!(default <= maximum, "{}: default above maximum", op.names[0]);
            }
        }

        let mut registry = Registry::default();
        install(&mut registry);
        let cases = [("fd", "forward"), ("SE", "sentence"), ("op", "output"), ("?", "?")];
        for (alias, canonical) in cases {
            let procedure = registry.get(alias).unwrap();
            assert!(Rc::ptr_eq(&procedure, &registry.get(canonical).unwrap()));
            assert_eq!(procedure.name, canonical);
            assert!(procedure.is_primitive());
        }
        assert!(registry.get("to").unwrap().is_special());
        assert!(registry.get("and").unwrap().is_noeval());
        assert!(!registry.get("sum").unwrap().is_noeval());
    }

    #[test]
    fn test_infix_operators_share_primitives() {
        let mut registry = Registry::default();
        install(&mut registry);
        let ops = [
            InfixOp::Add,
            InfixOp::Subtract,
            InfixOp::Multiply,
            InfixOp::Divide,
            InfixOp::Remainder,
            InfixOp::Power,
            InfixOp::Equal,
            InfixOp::NotEqual,
            InfixOp::Less,
            InfixOp::Greater,
            InfixOp::LessEqual,
            InfixOp::GreaterEqual,
        ];
        for op in ops.into_iter().map(Some).chain([None]) {
            let (name, _) = infix_primitive(op);
            let procedure = registry.get(name).unwrap();
            assert!(
                matches!(procedure.body, ProcedureBody::Builtin(OpKind::Function(_))),
                "{name} is not a function primitive"
            );
            let operands = if op.is_some() { 2 } else { 1 };
            assert_eq!(procedure.arity.validate(operands), Ok(()), "{name}");
        }
    }
}
