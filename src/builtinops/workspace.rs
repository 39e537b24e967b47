//! Procedure definition and workspace management.
//!
//! `to` is the only special form: while its statement is being compiled it takes over
//! the token stream, reading the procedure name, the input header and the body up to
//! the matching `end`. Every definition and erasure is reported to the save hook.

use std::rc::Rc;

use super::BuiltinOp;
use super::coerce::{output, take};
use crate::ast::{Value, is_number};
use crate::evaluator::Tokens;
use crate::procedures::{Arity, Procedure, UserProcedure};
use crate::reader::Atom;
use crate::scope::Lookup;
use crate::{Error, ErrorCode, Interpreter, Outcome};

type Output = Outcome<Option<Value>>;

pub(crate) static OPS: &[BuiltinOp] = &[
    BuiltinOp::special(&["to"], to),
    BuiltinOp::function(&["define"], Arity::fixed(2), define),
    BuiltinOp::function(&["text"], Arity::fixed(1), text),
    BuiltinOp::function(&["copydef"], Arity::fixed(2), copydef),
    BuiltinOp::function(&["arity"], Arity::fixed(1), arity),
    BuiltinOp::function(&["erase", "er"], Arity::fixed(1), erase),
    BuiltinOp::function(&["erall"], Arity::fixed(0), erall),
    BuiltinOp::function(&["erps"], Arity::fixed(0), erps),
    BuiltinOp::function(&["ern"], Arity::fixed(1), ern),
    BuiltinOp::function(&["erpls"], Arity::fixed(0), erpls),
    BuiltinOp::function(&["procedures"], Arity::fixed(0), procedures),
    BuiltinOp::function(&["primitives"], Arity::fixed(0), primitives),
    BuiltinOp::function(&["globals"], Arity::fixed(0), globals),
    BuiltinOp::function(&["names"], Arity::fixed(0), names),
    BuiltinOp::function(&["plists"], Arity::fixed(0), plists),
    BuiltinOp::function(&["contents"], Arity::fixed(0), contents),
    BuiltinOp::function(&["printout", "po"], Arity::fixed(1), printout),
    BuiltinOp::function(&["pot"], Arity::fixed(1), pot),
    BuiltinOp::function(&["procedurep", "procedure?"], Arity::fixed(1), procedurep),
    BuiltinOp::function(&["primitivep", "primitive?"], Arity::fixed(1), primitivep),
    BuiltinOp::function(&["definedp", "defined?"], Arity::fixed(1), definedp),
];

/// Names of procedures, variables and property lists to list or erase
#[derive(Debug, Default)]
struct Contents {
    procedures: Vec<String>,
    variables: Vec<String>,
    plists: Vec<String>,
}

impl Interpreter {
    /// Fail unless `name` may be bound to a new procedure or erased
    fn check_replaceable(&self, name: &str, action: &str) -> Result<(), Error> {
        let Some(existing) = self.procedures.get(name) else {
            return Ok(());
        };
        let template = if existing.is_special() {
            "Can't {action} special {name:U}"
        } else if existing.is_primitive() && !self.redefinition_permitted() {
            "Can't {action} primitive {name:U}"
        } else {
            return Ok(());
        };
        Err(self.error_with(
            ErrorCode::IsPrimitive,
            template,
            &[("action", action), ("name", name)],
        ))
    }

    /// The definition of a procedure written in Logo
    fn user_definition<'p>(&self, procedure: &'p Procedure) -> Result<&'p UserProcedure, Error> {
        procedure.as_user().ok_or_else(|| {
            self.error_with(
                ErrorCode::IsPrimitive,
                "{_PROC_}: Can't show primitive {name:U}",
                &[("name", &procedure.name)],
            )
        })
    }

    pub(crate) fn define_procedure(&mut self, name: &str, definition: UserProcedure) -> Result<(), Error> {
        self.check_replaceable(name, "redefine")?;
        let procedure = Procedure::user(name, definition);
        let source = procedure.as_user().map(|definition| definition.to_source(&procedure.name));
        log::debug!("defined {}", procedure.display_name());
        self.procedures.insert(name, Rc::new(procedure));
        self.notify_saved(name, source.as_deref());
        Ok(())
    }

    fn erase_procedure(&mut self, name: &str) -> Result<(), Error> {
        self.check_replaceable(name, "erase")?;
        if self.procedures.remove(name).is_some() {
            log::debug!("erased {}", name.to_uppercase());
            self.notify_saved(name, None);
        }
        Ok(())
    }

    fn user_procedure_names(&self) -> Vec<String> {
        self.procedures.names(|procedure| !procedure.is_primitive())
    }

    /// A name, a list of names, or a contents list `[[procedures] [variables] [plists]]`
    fn contents_of(&self, what: &Value) -> Result<Contents, Error> {
        match what {
            Value::List(groups) if !groups.is_empty() && groups.iter().all(Value::is_list) => {
                let mut lists = groups.iter().map(|group| self.expect_names(group));
                Ok(Contents {
                    procedures: lists.next().transpose()?.unwrap_or_default(),
                    variables: lists.next().transpose()?.unwrap_or_default(),
                    plists: lists.next().transpose()?.unwrap_or_default(),
                })
            }
            names => Ok(Contents {
                procedures: self.expect_names(names)?,
                ..Contents::default()
            }),
        }
    }

    /// Source that recreates the named workspace entries
    fn listing(&self, contents: &Contents, titles_only: bool) -> Result<String, Error> {
        let mut out = String::new();
        for name in &contents.procedures {
            let procedure = self.expect_procedure(name)?;
            let source = self.user_definition(&procedure)?.to_source(&procedure.name);
            match source.lines().next() {
                Some(title) if titles_only => out.push_str(title),
                _ => out.push_str(&source),
            }
            out.push('\n');
        }
        for name in &contents.variables {
            if let Lookup::Bound(value) = self.scopes.get(name) {
                out.push_str(&format!("make \"{name} {}\n", literal_source(value)));
            }
        }
        for name in &contents.plists {
            for pair in self.plists.flatten(name).chunks(2) {
                if let [property, value] = pair {
                    out.push_str(&format!("pprop \"{name} \"{property} {}\n", literal_source(value)));
                }
            }
        }
        Ok(out)
    }
}

/// A value as an expression that evaluates to it
fn literal_source(value: &Value) -> String {
    match value {
        Value::Word(text) if !is_number(text) => format!("\"{}", value.to_source()),
        other => other.to_source(),
    }
}

/// `to name :inputs... body... end`
fn to(interp: &mut Interpreter, tokens: &mut Tokens<'_>) -> Result<(), Error> {
    let name = match tokens.next() {
        Some(Atom::Word(text)) if !is_number(text) && !text.starts_with(':') => {
            text.trim_start_matches('"').to_owned()
        }
        _ => return Err(interp.bad_input("{_PROC_}: Expected procedure name")),
    };
    let mut atoms = Vec::new();
    while let Some(atom) = tokens.next() {
        if interp.is_keyword(atom, "end") {
            break;
        }
        atoms.push(atom.clone());
    }
    let definition = UserProcedure::parse(atoms).map_err(|err| interp.definition_error(err))?;
    interp.define_procedure(&name, definition)
}

/// `define "name [[inputs] [line] ...]`, the inverse of `text`
fn define(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name, text] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    let mut lines = interp.expect_list(text)?.into_iter();
    let inputs = match lines.next() {
        Some(inputs) => interp.expect_list(inputs)?,
        None => Vec::new(),
    };

    let header: Vec<Atom> = inputs
        .into_iter()
        .map(|input| match input {
            Value::List(mut items) => {
                if let Some(Value::Word(name)) = items.first_mut()
                    && !name.starts_with(':')
                {
                    name.insert(0, ':');
                }
                Atom::List(items)
            }
            Value::Word(name) if !is_number(&name) && !name.starts_with(':') => Atom::Word(format!(":{name}")),
            other => Atom::Word(other.to_string()),
        })
        .collect();
    let mut definition = UserProcedure::parse(header).map_err(|err| interp.definition_error(err))?;
    if !definition.body.is_empty() {
        return Err(interp.bad_input("{_PROC_}: Expected list of inputs").into());
    }
    for line in lines {
        definition.body.extend(interp.expect_instructions(&line)?);
    }
    interp.define_procedure(&name, definition)?;
    Ok(None)
}

fn text(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name] = take(interp, args)?;
    let procedure = interp.expect_procedure(&interp.expect_word(&name)?)?;
    output(interp.user_definition(&procedure)?.to_text())
}

/// `copydef "new "old`
fn copydef(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [new_name, old_name] = take(interp, args)?;
    let (new_name, old_name) = (interp.expect_word(&new_name)?, interp.expect_word(&old_name)?);
    let procedure = interp.expect_procedure(&old_name)?;
    match procedure.as_user() {
        Some(definition) => interp.define_procedure(&new_name, definition.clone())?,
        None => {
            interp.check_replaceable(&new_name, "redefine")?;
            interp.procedures.insert(&new_name, procedure);
        }
    }
    Ok(None)
}

/// `[minimum default maximum]`, with -1 for no maximum
fn arity(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    output(interp.expect_procedure(&name)?.arity.to_value())
}

fn erase(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [what] = take(interp, args)?;
    let contents = interp.contents_of(&what)?;
    for name in &contents.procedures {
        interp.erase_procedure(name)?;
    }
    for name in &contents.variables {
        interp.scopes.erase_global(name);
    }
    for name in &contents.plists {
        interp.plists.erase(name);
    }
    Ok(None)
}

fn erps(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    for name in interp.user_procedure_names() {
        interp.erase_procedure(&name)?;
    }
    Ok(None)
}

fn ern(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [names] = take(interp, args)?;
    for name in interp.expect_names(&names)? {
        interp.scopes.erase_global(&name);
    }
    Ok(None)
}

fn erpls(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.plists.clear();
    Ok(None)
}

fn erall(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    erps(interp, args)?;
    interp.scopes.clear_globals();
    interp.plists.clear();
    Ok(None)
}

fn word_list(names: Vec<String>) -> Value {
    Value::List(names.into_iter().map(Value::Word).collect())
}

fn procedures(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(word_list(interp.user_procedure_names()))
}

fn primitives(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(word_list(interp.procedures.names(Procedure::is_primitive)))
}

fn globals(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(word_list(interp.scopes.global_names()))
}

/// Contents list holding only the global variables
fn names(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(Value::List(vec![
        Value::List(Vec::new()),
        word_list(interp.scopes.global_names()),
    ]))
}

/// Contents list holding only the property lists
fn plists(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(Value::List(vec![
        Value::List(Vec::new()),
        Value::List(Vec::new()),
        word_list(interp.plists.names()),
    ]))
}

fn contents(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(Value::List(vec![
        word_list(interp.user_procedure_names()),
        word_list(interp.scopes.global_names()),
        word_list(interp.plists.names()),
    ]))
}

fn print_listing(interp: &mut Interpreter, args: Vec<Value>, titles_only: bool) -> Output {
    let [what] = take(interp, args)?;
    let contents = interp.contents_of(&what)?;
    let listing = interp.listing(&contents, titles_only)?;
    interp.stream.write(&listing);
    Ok(None)
}

fn printout(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    print_listing(interp, args, false)
}

/// Like `printout`, but only the title line of each procedure
fn pot(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    print_listing(interp, args, true)
}

fn procedurep(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    output(interp.procedures.contains(&name))
}

fn primitivep(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    output(interp.procedures.get(&name).is_some_and(|p| p.is_primitive()))
}

fn definedp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    output(interp.procedures.get(&name).is_some_and(|p| !p.is_primitive()))
}
