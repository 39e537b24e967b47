//! Words, lists and arrays: constructors, selectors, mutators and predicates.

use rand::Rng;

use super::BuiltinOp;
use super::coerce::{output, take};
use crate::ast::{ArrayRef, StoreError, Value};
use crate::procedures::Arity;
use crate::reader::{self, Atom};
use crate::scope::Lookup;
use crate::{Error, ErrorCode, Interpreter, Outcome};

type Output = Outcome<Option<Value>>;

pub(crate) static OPS: &[BuiltinOp] = &[
    // Constructors
    BuiltinOp::function(&["word"], Arity::variadic(0, 2), word),
    BuiltinOp::function(&["list"], Arity::variadic(0, 2), list),
    BuiltinOp::function(&["sentence", "se"], Arity::variadic(0, 2), sentence),
    BuiltinOp::function(&["fput"], Arity::fixed(2), fput),
    BuiltinOp::function(&["lput"], Arity::fixed(2), lput),
    BuiltinOp::function(&["array"], Arity::range(1, 1, 2), array),
    BuiltinOp::function(&["listtoarray"], Arity::range(1, 1, 2), listtoarray),
    BuiltinOp::function(&["arraytolist"], Arity::fixed(1), arraytolist),
    BuiltinOp::function(&["combine"], Arity::fixed(2), combine),
    BuiltinOp::function(&["reverse"], Arity::fixed(1), reverse),
    BuiltinOp::function(&["gensym"], Arity::fixed(0), gensym),
    // Selectors
    BuiltinOp::function(&["first"], Arity::fixed(1), first),
    BuiltinOp::function(&["firsts"], Arity::fixed(1), firsts),
    BuiltinOp::function(&["last"], Arity::fixed(1), last),
    BuiltinOp::function(&["butfirst", "bf"], Arity::fixed(1), butfirst),
    BuiltinOp::function(&["butfirsts", "bfs"], Arity::fixed(1), butfirsts),
    BuiltinOp::function(&["butlast", "bl"], Arity::fixed(1), butlast),
    BuiltinOp::function(&["item"], Arity::fixed(2), item),
    BuiltinOp::function(&["pick"], Arity::fixed(1), pick),
    BuiltinOp::function(&["remove"], Arity::fixed(2), remove),
    BuiltinOp::function(&["remdup"], Arity::fixed(1), remdup),
    BuiltinOp::function(&["quoted"], Arity::fixed(1), quoted),
    // Mutators
    BuiltinOp::function(&["setitem"], Arity::fixed(3), setitem),
    BuiltinOp::function(&["push"], Arity::fixed(2), push),
    BuiltinOp::function(&["pop"], Arity::fixed(1), pop),
    BuiltinOp::function(&["queue"], Arity::fixed(2), queue),
    BuiltinOp::function(&["dequeue"], Arity::fixed(1), pop),
    // Predicates
    BuiltinOp::function(&["wordp", "word?"], Arity::fixed(1), wordp),
    BuiltinOp::function(&["listp", "list?"], Arity::fixed(1), listp),
    BuiltinOp::function(&["arrayp", "array?"], Arity::fixed(1), arrayp),
    BuiltinOp::function(&["numberp", "number?"], Arity::fixed(1), numberp),
    BuiltinOp::function(&["emptyp", "empty?"], Arity::fixed(1), emptyp),
    BuiltinOp::function(&["equalp", "equal?"], Arity::fixed(2), equalp),
    BuiltinOp::function(&["notequalp", "notequal?"], Arity::fixed(2), notequalp),
    BuiltinOp::function(&["beforep", "before?"], Arity::fixed(2), beforep),
    BuiltinOp::function(&[".eq"], Arity::fixed(2), identical),
    BuiltinOp::function(&["memberp", "member?"], Arity::fixed(2), memberp),
    BuiltinOp::function(&["substringp", "substring?"], Arity::fixed(2), substringp),
    // Queries
    BuiltinOp::function(&["count"], Arity::fixed(1), count),
    BuiltinOp::function(&["ascii"], Arity::fixed(1), ascii),
    BuiltinOp::function(&["char"], Arity::fixed(1), char),
    BuiltinOp::function(&["member"], Arity::fixed(2), member),
    BuiltinOp::function(&["lowercase"], Arity::fixed(1), lowercase),
    BuiltinOp::function(&["uppercase"], Arity::fixed(1), uppercase),
    BuiltinOp::function(&["parse"], Arity::fixed(1), parse),
    BuiltinOp::function(&["runparse"], Arity::fixed(1), runparse),
];

/// Members of a list or array, or characters of a word
enum Seq {
    Chars(Vec<char>),
    Items(Vec<Value>),
}

impl Seq {
    fn len(&self) -> usize {
        match self {
            Seq::Chars(chars) => chars.len(),
            Seq::Items(items) => items.len(),
        }
    }

    fn get(&self, index: usize) -> Option<Value> {
        match self {
            Seq::Chars(chars) => chars.get(index).map(|c| Value::Word(c.to_string())),
            Seq::Items(items) => items.get(index).cloned(),
        }
    }

    /// The members in `range`, as a word or list like the original
    fn slice(&self, range: std::ops::Range<usize>) -> Value {
        match self {
            Seq::Chars(chars) => Value::Word(chars[range].iter().collect()),
            Seq::Items(items) => Value::List(items[range].to_vec()),
        }
    }
}

impl Interpreter {
    fn seq(&self, value: &Value) -> Result<Seq, Error> {
        match value {
            Value::List(items) => Ok(Seq::Items(items.clone())),
            Value::Array(array) => Ok(Seq::Items(array.to_vec())),
            word => Ok(Seq::Chars(self.expect_word(word)?.chars().collect())),
        }
    }

    fn non_empty_seq(&self, value: &Value) -> Result<Seq, Error> {
        let seq = self.seq(value)?;
        if seq.len() == 0 {
            return Err(self.bad_input(match seq {
                Seq::Chars(_) => "{_PROC_}: Expected non-empty word",
                Seq::Items(_) => "{_PROC_}: Expected non-empty list",
            }));
        }
        Ok(seq)
    }

    /// The list held by a variable used as a stack or queue
    fn list_variable(&self, name: &str, create: bool) -> Result<Vec<Value>, Error> {
        match self.scopes.get(name) {
            Lookup::Bound(value) => self.expect_list(value.clone()),
            Lookup::Unassigned | Lookup::Unknown if create => Ok(Vec::new()),
            Lookup::Unassigned | Lookup::Unknown => Err(self.error_with(
                ErrorCode::BadVar,
                "Don't know about variable {name:U}",
                &[("name", name)],
            )),
        }
    }
}

fn word(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let mut text = String::new();
    for arg in &args {
        text.push_str(&interp.expect_word(arg)?);
    }
    output(text)
}

fn list(_: &mut Interpreter, args: Vec<Value>) -> Output {
    output(Value::List(args))
}

fn sentence(_: &mut Interpreter, args: Vec<Value>) -> Output {
    let mut items = Vec::new();
    for arg in args {
        match arg {
            Value::List(members) => items.extend(members),
            other => items.push(other),
        }
    }
    output(Value::List(items))
}

fn fput(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing, target] = take(interp, args)?;
    match target {
        Value::List(mut items) => {
            items.insert(0, thing);
            output(Value::List(items))
        }
        word => output(interp.expect_word(&thing)? + &interp.expect_word(&word)?),
    }
}

fn lput(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing, target] = take(interp, args)?;
    match target {
        Value::List(mut items) => {
            items.push(thing);
            output(Value::List(items))
        }
        word => output(interp.expect_word(&word)? + &interp.expect_word(&thing)?),
    }
}

/// The optional origin input, 1 when absent
fn origin(interp: &Interpreter, args: &[Value]) -> Result<i64, Error> {
    args.get(1).map_or(Ok(1), |value| interp.expect_integer(value))
}

fn array(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let size = interp.expect_count(&args[0])?;
    let origin = origin(interp, &args)?;
    output(ArrayRef::with_size(size, origin))
}

fn listtoarray(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let origin = origin(interp, &args)?;
    let items = interp.expect_list(args[0].clone())?;
    output(ArrayRef::new(items, origin))
}

fn arraytolist(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [array] = take(interp, args)?;
    output(Value::List(interp.expect_array(&array)?.to_vec()))
}

fn combine(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    match &args[1] {
        Value::List(_) => fput(interp, args),
        _ => word(interp, args),
    }
}

fn reverse(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    match interp.seq(&thing)? {
        Seq::Chars(chars) => output(chars.into_iter().rev().collect::<String>()),
        Seq::Items(mut items) => {
            items.reverse();
            output(Value::List(items))
        }
    }
}

fn gensym(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.gensym_counter += 1;
    output(format!("g{}", interp.gensym_counter))
}

fn first(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    if let Value::Array(array) = &thing {
        return output(array.origin());
    }
    Ok(interp.non_empty_seq(&thing)?.get(0))
}

fn last(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    let seq = interp.non_empty_seq(&thing)?;
    Ok(seq.get(seq.len() - 1))
}

fn butfirst(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    let seq = interp.non_empty_seq(&thing)?;
    output(seq.slice(1..seq.len()))
}

fn butlast(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    let seq = interp.non_empty_seq(&thing)?;
    output(seq.slice(0..seq.len() - 1))
}

/// Apply a one-input selector to every member of a list
fn map_members(interp: &mut Interpreter, args: Vec<Value>, selector: fn(&mut Interpreter, Vec<Value>) -> Output) -> Output {
    let [members] = take(interp, args)?;
    let mut results = Vec::new();
    for member in interp.expect_list(members)? {
        results.extend(selector(interp, vec![member])?);
    }
    output(Value::List(results))
}

fn firsts(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    map_members(interp, args, first)
}

fn butfirsts(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    map_members(interp, args, butfirst)
}

fn item(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [index, thing] = take(interp, args)?;
    let index = interp.expect_integer(&index)?;
    let found = match &thing {
        Value::Array(array) => array.get(index),
        other => {
            let seq = interp.seq(other)?;
            index
                .checked_sub(1)
                .and_then(|slot| usize::try_from(slot).ok())
                .and_then(|slot| seq.get(slot))
        }
    };
    match found {
        Some(value) => output(value),
        None => Err(interp.bad_input("{_PROC_}: Index out of bounds").into()),
    }
}

fn pick(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    let seq = interp.non_empty_seq(&thing)?;
    let slot = interp.rng.gen_range(0..seq.len());
    Ok(seq.get(slot))
}

fn remove(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing, from] = take(interp, args)?;
    match interp.seq(&from)? {
        Seq::Chars(chars) => {
            let unwanted = interp.expect_word(&thing)?;
            let text: String = chars.into_iter().collect();
            output(if unwanted.is_empty() { text } else { text.replace(&unwanted, "") })
        }
        Seq::Items(items) => output(Value::List(
            items.into_iter().filter(|item| *item != thing).collect(),
        )),
    }
}

/// Drop duplicates, keeping the rightmost occurrence
fn remdup(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    let items = interp.expect_list(thing)?;
    let kept = items
        .iter()
        .enumerate()
        .filter(|(i, item)| !items[i + 1..].contains(item))
        .map(|(_, item)| item.clone())
        .collect();
    output(Value::List(kept))
}

fn quoted(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    match thing {
        Value::List(_) | Value::Array(_) => output(thing),
        word => output(format!("\"{}", interp.expect_word(&word)?)),
    }
}

fn setitem(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [index, array, value] = take(interp, args)?;
    let index = interp.expect_integer(&index)?;
    let array = interp.expect_array(&array)?;
    match array.set(index, value) {
        Ok(()) => Ok(None),
        Err(StoreError::OutOfBounds) => Err(interp.bad_input("{_PROC_}: Index out of bounds").into()),
        Err(StoreError::Circular) => Err(interp.bad_input("{_PROC_}: Can't create circular array").into()),
    }
}

fn push(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name, thing] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    let mut stack = interp.list_variable(&name, true)?;
    stack.insert(0, thing);
    interp.scopes.set(&name, Value::List(stack));
    Ok(None)
}

fn queue(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name, thing] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    let mut queue = interp.list_variable(&name, true)?;
    queue.push(thing);
    interp.scopes.set(&name, Value::List(queue));
    Ok(None)
}

/// `pop` and `dequeue`: both take from the front
fn pop(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [name] = take(interp, args)?;
    let name = interp.expect_word(&name)?;
    let mut items = interp.list_variable(&name, false)?;
    if items.is_empty() {
        return Err(interp.bad_input("{_PROC_}: Expected non-empty list").into());
    }
    let front = items.remove(0);
    interp.scopes.set(&name, Value::List(items));
    output(front)
}

fn wordp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    output(thing.is_word())
}

fn listp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    output(thing.is_list())
}

fn arrayp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    output(thing.is_array())
}

fn numberp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    output(thing.as_number().is_some())
}

fn emptyp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    output(!thing.is_array() && thing.is_empty())
}

pub(crate) fn equalp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [a, b] = take(interp, args)?;
    output(a == b)
}

pub(crate) fn notequalp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [a, b] = take(interp, args)?;
    output(a != b)
}

fn beforep(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [a, b] = take(interp, args)?;
    output(interp.expect_word(&a)? < interp.expect_word(&b)?)
}

fn identical(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [a, b] = take(interp, args)?;
    output(match (&a, &b) {
        (Value::Array(x), Value::Array(y)) => x.ptr_eq(y),
        _ => a == b,
    })
}

fn memberp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing, within] = take(interp, args)?;
    let found = match interp.seq(&within)? {
        Seq::Items(items) => items.contains(&thing),
        Seq::Chars(chars) => match thing.word_text() {
            Some(text) if !text.is_empty() => chars.into_iter().collect::<String>().contains(&text),
            _ => false,
        },
    };
    output(found)
}

fn substringp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [part, whole] = take(interp, args)?;
    let found = match (part.word_text(), whole.word_text()) {
        (Some(part), Some(whole)) => whole.contains(&part),
        _ => false,
    };
    output(found)
}

fn count(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    output(interp.seq(&thing)?.len())
}

fn ascii(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    let text = interp.expect_word(&thing)?;
    match text.chars().next() {
        Some(c) => output(i64::from(u32::from(c))),
        None => Err(interp.bad_input("{_PROC_}: Expected non-empty word").into()),
    }
}

fn char(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [code] = take(interp, args)?;
    let code = interp.expect_integer(&code)?;
    match u32::try_from(code).ok().and_then(std::char::from_u32) {
        Some(c) => output(c.to_string()),
        None => Err(interp.bad_input("{_PROC_}: Expected character code").into()),
    }
}

fn member(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing, within] = take(interp, args)?;
    match interp.seq(&within)? {
        Seq::Items(items) => {
            let tail = match items.iter().position(|item| *item == thing) {
                Some(start) => items[start..].to_vec(),
                None => Vec::new(),
            };
            output(Value::List(tail))
        }
        Seq::Chars(chars) => {
            let text: String = chars.into_iter().collect();
            let needle = interp.expect_word(&thing)?;
            let tail = match text.find(&needle) {
                Some(start) if !needle.is_empty() => text[start..].to_owned(),
                _ => String::new(),
            };
            output(tail)
        }
    }
}

fn lowercase(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    output(interp.expect_word(&thing)?.to_lowercase())
}

fn uppercase(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    output(interp.expect_word(&thing)?.to_uppercase())
}

fn parse(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    let text = interp.expect_word(&thing)?;
    let items = reader::parse_words(&text).map_err(|err| interp.parse_error(err))?;
    output(Value::List(items))
}

fn runparse(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [thing] = take(interp, args)?;
    let atoms = interp.expect_instructions(&thing)?;
    output(Value::List(atoms.iter().map(Atom::to_value).collect()))
}
