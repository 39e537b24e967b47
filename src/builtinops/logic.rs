//! Boolean primitives. `and` and `or` receive their inputs unevaluated and stop at the
//! first input that decides the result.

use super::BuiltinOp;
use super::coerce::{output, take};
use crate::ast::Value;
use crate::evaluator::Expr;
use crate::procedures::Arity;
use crate::{Interpreter, Outcome};

type Output = Outcome<Option<Value>>;

pub(crate) static OPS: &[BuiltinOp] = &[
    BuiltinOp::function(&["true"], Arity::fixed(0), truth),
    BuiltinOp::function(&["false"], Arity::fixed(0), falsity),
    BuiltinOp::lazy(&["and"], Arity::variadic(0, 2), and),
    BuiltinOp::lazy(&["or"], Arity::variadic(0, 2), or),
    BuiltinOp::function(&["xor"], Arity::variadic(0, 2), xor),
    BuiltinOp::function(&["not"], Arity::fixed(1), not),
];

fn truth(_: &mut Interpreter, _: Vec<Value>) -> Output {
    output("true")
}

fn falsity(_: &mut Interpreter, _: Vec<Value>) -> Output {
    output("false")
}

/// Evaluate inputs in order until one equals `decisive`
fn short_circuit(interp: &mut Interpreter, args: &[Expr], decisive: bool) -> Output {
    let consumer = if decisive { "or" } else { "and" };
    for arg in args {
        let value = interp.eval_value(arg, consumer)?;
        if interp.expect_bool(&value)? == decisive {
            return output(decisive);
        }
    }
    output(!decisive)
}

fn and(interp: &mut Interpreter, args: &[Expr]) -> Output {
    short_circuit(interp, args, false)
}

fn or(interp: &mut Interpreter, args: &[Expr]) -> Output {
    short_circuit(interp, args, true)
}

fn xor(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let mut result = false;
    for arg in &args {
        result ^= interp.expect_bool(arg)?;
    }
    output(result)
}

fn not(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [x] = take(interp, args)?;
    output(!interp.expect_bool(&x)?)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Want::*, check};
    use crate::ErrorCode;

    #[test]
    fn test_logic() {
        check(vec![
            ("true", Shows("true")),
            ("and true 1", Shows("1")),
            ("and 1 0", Shows("0")),
            ("(and)", Shows("1")),
            ("(or)", Shows("0")),
            ("(and 1 1 \"false)", Shows("0")),
            ("or false \"TRUE", Shows("1")),
            // The undefined variable is never evaluated
            ("and 0 :undefined", Shows("0")),
            ("or 1 :undefined", Shows("1")),
            ("and 1 :undefined", Fails(ErrorCode::BadVar)),
            ("and 1 \"maybe", Says("AND: Expected true or false")),
            ("xor 1 0", Shows("1")),
            ("(xor 1 1 1)", Shows("1")),
            ("not 0", Shows("1")),
            ("not \"false", Shows("1")),
            ("not [a]", Fails(ErrorCode::BadInput)),
            ("if and 1 2 > 1 [\"yes]", Shows("yes")),
        ]);
    }
}
