//! Variables and property lists.

use super::BuiltinOp;
use super::coerce::{output, take};
use crate::ast::Value;
use crate::procedures::Arity;
use crate::scope::Lookup;
use crate::{ErrorCode, Interpreter, Outcome};

type Output = Outcome<Option<Value>>;

pub(crate) static OPS: &[BuiltinOp] = &[
    BuiltinOp::function(&["make"], Arity::fixed(2), make),
    BuiltinOp::function(&["name"], Arity::fixed(2), name),
    BuiltinOp::function(&["local"], Arity::variadic(1, 1), local),
    BuiltinOp::function(&["localmake"], Arity::fixed(2), localmake),
    BuiltinOp::function(&["thing"], Arity::fixed(1), thing),
    BuiltinOp::function(&["global"], Arity::variadic(1, 1), global),
    BuiltinOp::function(&["namep", "name?"], Arity::fixed(1), namep),
    BuiltinOp::function(&["pprop"], Arity::fixed(3), pprop),
    BuiltinOp::function(&["gprop"], Arity::fixed(2), gprop),
    BuiltinOp::function(&["remprop"], Arity::fixed(2), remprop),
    BuiltinOp::function(&["plist"], Arity::fixed(1), plist),
    BuiltinOp::function(&["plistp", "plist?"], Arity::fixed(1), plistp),
];

fn make(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name, value] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    interp.scopes.set(&name, value);
    Ok(None)
}

/// `make` with its inputs reversed
fn name(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [value, name] = take(interp, args)?;
    make(interp, vec![name, value])
}

/// Declare names in the current frame; each input may be a name or a list of names
fn local(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    for arg in &args {
        for name in interp.expect_names(arg)? {
            interp.scopes.declare_local(&name);
        }
    }
    Ok(None)
}

fn localmake(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name, value] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    interp.scopes.set_local(&name, value);
    Ok(None)
}

fn thing(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    match interp.scopes.get(&name) {
        Lookup::Bound(value) => output(value.clone()),
        Lookup::Unassigned | Lookup::Unknown => Err(interp
            .error_with(
                ErrorCode::BadVar,
                "Don't know about variable {name:U}",
                &[("name", &name)],
            )
            .into()),
    }
}

fn global(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    for arg in &args {
        for name in interp.expect_names(arg)? {
            interp.scopes.declare_global(&name);
        }
    }
    Ok(None)
}

fn namep(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    output(matches!(interp.scopes.get(&name), Lookup::Bound(_)))
}

fn pprop(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [plist, property, value] = take(interp, args)?;
    let (plist, property) = (interp.expect_word(&plist)?, interp.expect_word(&property)?);
    interp.plists.put(&plist, &property, value);
    Ok(None)
}

/// A missing property is the empty list
fn gprop(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [plist, property] = take(interp, args)?;
    let (plist, property) = (interp.expect_word(&plist)?, interp.expect_word(&property)?);
    output(
        interp
            .plists
            .get(&plist, &property)
            .cloned()
            .unwrap_or_else(|| Value::List(Vec::new())),
    )
}

fn remprop(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [plist, property] = take(interp, args)?;
    let (plist, property) = (interp.expect_word(&plist)?, interp.expect_word(&property)?);
    interp.plists.remove(&plist, &property);
    Ok(None)
}

fn plist(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [plist] = take(interp, args)?;
    let plist = interp.expect_word(&plist)?;
    output(Value::List(interp.plists.flatten(&plist)))
}

fn plistp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [plist] = take(interp, args)?;
    let plist = interp.expect_word(&plist)?;
    output(interp.plists.contains(&plist))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Want::*, check};
    use crate::ErrorCode;

    #[test]
    fn test_variables() {
        check(vec![
            ("make \"x 3 :x", Shows("3")),
            ("make \"X 3 :x", Shows("3")),
            ("name 4 \"y :y", Shows("4")),
            ("make \"v \"x make :v 5 :x", Shows("5")),
            ("make 3 [a] thing 3", Shows("[a]")),
            ("make [a] 1", Fails(ErrorCode::BadInput)),
            ("make \"x [a b] thing \"x", Shows("[a b]")),
            ("thing \"nope", Says("Don't know about variable NOPE")),
            ("namep \"nope", Shows("0")),
            ("make \"here 1 name? \"here", Shows("1")),
            // Declared but never assigned is not a name yet
            ("global \"g namep \"g", Shows("0")),
            ("global \"g :g", Fails(ErrorCode::BadVar)),
            ("to f local [a b] make \"a 1 make \"b 2 output :a + :b end f", Shows("3")),
            ("to f (local \"a \"b) make \"b 2 output :b end (list f namep \"b)", Shows("[2 0]")),
            ("to f localmake \"t 9 output :t end (list f namep \"t)", Shows("[9 0]")),
            ("to inner make \"t 2 end to outer local \"t inner output :t end (list outer namep \"t)", Shows("[2 0]")),
            ("to f global \"gv make \"gv 7 end f :gv", Shows("7")),
            // A second local for a name already in the frame starts it over
            ("to f :x local \"x output :x end f 1", Fails(ErrorCode::BadVar)),
            ("to f local \"y make \"y 5 local \"y output namep \"y end f", Shows("0")),
            ("to f localmake \"y 5 local \"y make \"y 6 output :y end (list f namep \"y)", Shows("[6 0]")),
        ]);
    }

    #[test]
    fn test_property_lists() {
        check(vec![
            ("pprop \"fido \"kind \"dog gprop \"fido \"kind", Shows("dog")),
            ("pprop \"fido \"kind \"dog gprop \"FIDO \"Kind", Shows("dog")),
            ("gprop \"fido \"kind", Shows("[]")),
            ("pprop \"p \"a 1 pprop \"p \"b [2] plist \"p", Shows("[a 1 b [2]]")),
            ("pprop \"p \"a 1 pprop \"p \"a 3 plist \"p", Shows("[a 3]")),
            ("pprop \"p \"a 1 remprop \"p \"a plist \"p", Shows("[]")),
            ("pprop \"p \"a 1 remprop \"p \"a plistp \"p", Shows("0")),
            ("pprop \"p \"a 1 plist? \"p", Shows("1")),
            ("plistp \"none", Shows("0")),
            ("pprop [p] \"a 1", Fails(ErrorCode::BadInput)),
        ]);
    }
}
