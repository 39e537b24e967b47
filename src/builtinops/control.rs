//! Control structures, non-local exits and higher-order templates.
//!
//! Instruction inputs are lists (or words holding program text) that are read when the
//! primitive runs. Loops check the cancellation flag and offer the host a yield between
//! iterations, so `forever` stays interruptible even when its body calls nothing.
//!
//! A template is one of:
//! - a procedure name: `map "first [[a b] [c d]]`
//! - an explicit-slot list, input names first: `map [[x] :x * 2] [1 2 3]`
//! - a question-mark list, where `?` is the first input: `map [? * 2] [1 2 3]`

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use super::BuiltinOp;
use super::coerce::{output, take};
use crate::ast::{NumberType, Value};
use crate::evaluator::{Expr, Tokens};
use crate::procedures::{Arity, ArityError};
use crate::reader::{self, Atom};
use crate::scheduler::RunState;
use crate::{ERROR_TAG, Error, ErrorCode, Interpreter, Outcome, Signal};

type Output = Outcome<Option<Value>>;

pub(crate) static OPS: &[BuiltinOp] = &[
    BuiltinOp::function(&["run"], Arity::fixed(1), run),
    BuiltinOp::function(&["runresult"], Arity::fixed(1), runresult),
    BuiltinOp::function(&["repeat"], Arity::fixed(2), repeat),
    BuiltinOp::function(&["forever"], Arity::fixed(1), forever),
    BuiltinOp::function(&["repcount", "#"], Arity::fixed(0), repcount),
    BuiltinOp::function(&["if"], Arity::range(2, 2, 3), if_),
    BuiltinOp::function(&["ifelse"], Arity::fixed(3), ifelse),
    BuiltinOp::function(&["test"], Arity::fixed(1), test),
    BuiltinOp::function(&["iftrue", "ift"], Arity::fixed(1), iftrue),
    BuiltinOp::function(&["iffalse", "iff"], Arity::fixed(1), iffalse),
    BuiltinOp::function(&["stop"], Arity::fixed(0), stop),
    BuiltinOp::function(&["output", "op"], Arity::fixed(1), output_),
    BuiltinOp::lazy(&[".maybeoutput"], Arity::fixed(1), maybeoutput),
    BuiltinOp::function(&["catch"], Arity::fixed(2), catch),
    BuiltinOp::function(&["throw"], Arity::range(1, 1, 2), throw),
    BuiltinOp::function(&["error"], Arity::fixed(0), error),
    BuiltinOp::function(&["wait"], Arity::fixed(1), wait),
    BuiltinOp::function(&["bye"], Arity::fixed(0), bye),
    BuiltinOp::function(&["ignore"], Arity::fixed(1), ignore),
    BuiltinOp::function(&["for"], Arity::fixed(2), for_),
    BuiltinOp::function(&["while"], Arity::fixed(2), while_),
    BuiltinOp::function(&["until"], Arity::fixed(2), until),
    BuiltinOp::function(&["do.while"], Arity::fixed(2), do_while),
    BuiltinOp::function(&["do.until"], Arity::fixed(2), do_until),
    BuiltinOp::function(&["apply"], Arity::fixed(2), apply),
    BuiltinOp::function(&["invoke"], Arity::variadic(1, 2), invoke),
    BuiltinOp::function(&["foreach"], Arity::fixed(2), foreach),
    BuiltinOp::function(&["map"], Arity::fixed(2), map),
    BuiltinOp::function(&["filter"], Arity::fixed(2), filter),
    BuiltinOp::function(&["find"], Arity::fixed(2), find),
    BuiltinOp::function(&["reduce"], Arity::fixed(2), reduce),
    BuiltinOp::function(&["?"], Arity::range(0, 0, 1), slot),
    BuiltinOp::function(&["?rest"], Arity::range(0, 0, 1), slot_rest),
];

impl Interpreter {
    /// Between loop iterations: honour cancellation and the time slice
    fn loop_tick(&mut self) -> Outcome<()> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(Signal::Cancelled);
        }
        self.maybe_yield();
        Ok(())
    }

    /// A condition input: a list is an expression evaluated now, anything else a boolean
    fn condition(&mut self, condition: &Value, consumer: &str) -> Outcome<bool> {
        let value = match condition {
            Value::List(_) => {
                let atoms = self.expect_instructions(condition)?;
                self.evaluate_expression(&atoms, consumer)?
            }
            other => other.clone(),
        };
        Ok(self.expect_bool(&value)?)
    }

    /// `stop` and `output` only make sense inside a procedure
    fn exit_procedure(&self, name: &str, value: Option<Value>) -> Output {
        if self.user_depth == 0 {
            return Err(self
                .error_with(
                    ErrorCode::BadOutput,
                    "Can only use {name:U} inside a procedure",
                    &[("name", name)],
                )
                .into());
        }
        Err(Signal::Output(value))
    }

    /// Call a template with evaluated inputs
    pub(crate) fn call_template(&mut self, template: &Value, inputs: Vec<Value>) -> Output {
        let Value::List(items) = template else {
            let procedure = self.expect_procedure(&self.expect_word(template)?)?;
            return self.apply(&procedure, inputs);
        };
        match items.split_first() {
            Some((Value::List(names), body)) if !body.is_empty() && names.iter().all(Value::is_word) => {
                self.call_slot_template(names, body, inputs)
            }
            _ => {
                let atoms = reader::parse_list(items).map_err(|err| self.parse_error(err))?;
                self.template_inputs.push(inputs);
                let result = self.execute(&atoms, true);
                self.template_inputs.pop();
                result
            }
        }
    }

    /// `[[a b] body...]`: inputs bound to names in a new frame; `output` returns from it
    fn call_slot_template(&mut self, names: &[Value], body: &[Value], inputs: Vec<Value>) -> Output {
        if inputs.len() != names.len() {
            let err = if inputs.len() < names.len() {
                ArityError::NotEnough
            } else {
                ArityError::TooMany
            };
            return Err(self.arity_error(err, "template").into());
        }
        let parsed = if body.iter().all(Value::is_list) {
            body.iter()
                .map(|line| self.expect_instructions(line))
                .collect::<Result<Vec<_>, _>>()
                .map(|lines| lines.concat())
        } else {
            reader::parse_list(body).map_err(|err| self.parse_error(err))
        };
        let atoms = parsed?;

        self.user_depth += 1;
        self.scopes.push_frame();
        for (name, value) in names.iter().zip(inputs) {
            let name = name.word_text().unwrap_or_default();
            self.scopes.set_local(name.trim_start_matches(':'), value);
        }
        let result = self.execute(&atoms, true);
        self.scopes.pop_frame();
        self.user_depth -= 1;

        match result {
            Err(Signal::Output(value)) => Ok(value),
            other => other,
        }
    }

    /// Call a template whose result is consumed
    fn template_value(&mut self, template: &Value, inputs: Vec<Value>) -> Outcome<Value> {
        match self.call_template(template, inputs)? {
            Some(value) => Ok(value),
            None => Err(self
                .error(ErrorCode::NoOutput, "{_PROC_}: Template didn't output")
                .into()),
        }
    }
}

/// Members of a list or array, or the characters of a word
fn members(interp: &Interpreter, data: &Value) -> Result<Vec<Value>, Error> {
    match data {
        Value::List(items) => Ok(items.clone()),
        Value::Array(array) => Ok(array.to_vec()),
        word => Ok(interp
            .expect_word(word)?
            .chars()
            .map(|c| Value::Word(c.to_string()))
            .collect()),
    }
}

fn run(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [instructions] = take(interp, args)?;
    let atoms = interp.expect_instructions(&instructions)?;
    interp.execute(&atoms, true)
}

/// `[]` when the instructions output nothing, `[value]` otherwise
fn runresult(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [instructions] = take(interp, args)?;
    let atoms = interp.expect_instructions(&instructions)?;
    let result = interp.execute(&atoms, true)?;
    output(Value::List(result.into_iter().collect()))
}

/// Run `body` once per count, maintaining `repcount`; `None` repeats forever
fn counted_loop(interp: &mut Interpreter, count: Option<i64>, body: &[Atom]) -> Output {
    interp.repcount.push(0);
    let result = (|| -> Output {
        let mut iteration = 0;
        while count.is_none_or(|count| iteration < count) {
            iteration += 1;
            if let Some(current) = interp.repcount.last_mut() {
                *current = iteration;
            }
            interp.execute(body, false)?;
            interp.loop_tick()?;
        }
        Ok(None)
    })();
    interp.repcount.pop();
    result
}

fn repeat(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [count, instructions] = take(interp, args)?;
    let count = interp.expect_integer(&count)?;
    let body = interp.expect_instructions(&instructions)?;
    counted_loop(interp, Some(count), &body)
}

fn forever(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [instructions] = take(interp, args)?;
    let body = interp.expect_instructions(&instructions)?;
    counted_loop(interp, None, &body)
}

/// Iteration of the innermost `repeat` or `forever`; -1 outside any loop
fn repcount(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.repcount.last().copied().unwrap_or(-1))
}

fn if_(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let branch = if interp.condition(&args[0], "if")? {
        Some(&args[1])
    } else {
        args.get(2)
    };
    match branch {
        Some(instructions) => {
            let atoms = interp.expect_instructions(instructions)?;
            interp.execute(&atoms, true)
        }
        None => Ok(None),
    }
}

fn ifelse(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    if_(interp, args)
}

fn test(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [condition] = take(interp, args)?;
    let result = interp.condition(&condition, "test")?;
    interp.scopes.set_test(result);
    Ok(None)
}

fn run_if_tested(interp: &mut Interpreter, args: Vec<Value>, wanted: bool) -> Output {
    let [instructions] = take(interp, args)?;
    match interp.scopes.test() {
        None => Err(interp
            .error(ErrorCode::NoTest, "{_PROC_}: Called without TEST")
            .into()),
        Some(result) if result == wanted => {
            let atoms = interp.expect_instructions(&instructions)?;
            interp.execute(&atoms, true)
        }
        Some(_) => Ok(None),
    }
}

fn iftrue(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    run_if_tested(interp, args, true)
}

fn iffalse(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    run_if_tested(interp, args, false)
}

fn stop(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.exit_procedure("stop", None)
}

fn output_(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [value] = take(interp, args)?;
    interp.exit_procedure("output", Some(value))
}

/// Output the input's value if it has one, otherwise stop
fn maybeoutput(interp: &mut Interpreter, args: &[Expr]) -> Output {
    let value = match args.first() {
        Some(expr) => interp.eval(expr)?,
        None => None,
    };
    interp.exit_procedure(".maybeoutput", value)
}

/// Run instructions, intercepting throws of `tag`; tag `error` also catches runtime errors
fn catch(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [tag, instructions] = take(interp, args)?;
    let tag = interp.expect_word(&tag)?.to_uppercase();
    let atoms = interp.expect_instructions(&instructions)?;
    match interp.execute(&atoms, true) {
        Err(Signal::Throw(err)) if err.tag == tag => {
            if err.has_default_tag() {
                log::debug!("caught error: {err}");
                interp.last_error = Some(err);
                Ok(None)
            } else {
                Ok(err.value)
            }
        }
        other => other,
    }
}

fn throw(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let mut args = args.into_iter();
    let tag = match args.next() {
        Some(tag) => interp.expect_word(&tag)?.to_uppercase(),
        None => return Ok(None),
    };
    let value = args.next();
    // Attributed to the innermost user procedure
    let thrower = interp
        .call_stack
        .iter()
        .rev()
        .find(|name| interp.procedures.get(name).is_some_and(|p| !p.is_primitive()))
        .cloned();

    let err = if tag == ERROR_TAG {
        let message = value
            .as_ref()
            .map_or_else(|| "User error".to_owned(), Value::to_print_string);
        Error::new(ErrorCode::UserGenerated, message)
    } else {
        let template = interp.error_with(ErrorCode::ThrowError, "No CATCH for tag {tag}", &[("tag", &tag)]);
        Error {
            tag,
            value,
            ..template
        }
    };
    Err(err.in_procedure(thrower.as_deref()).into())
}

/// `[code message procedure line]` for the error last caught, then forget it
fn error(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    let Some(err) = interp.last_error.take() else {
        return output(Value::List(Vec::new()));
    };
    let code = i64::from(err.code_number());
    let procedure = err
        .procedure
        .map_or_else(|| Value::List(Vec::new()), Value::Word);
    output(Value::List(vec![
        Value::from(code),
        Value::Word(err.message),
        procedure,
        Value::from(-1),
    ]))
}

/// Pause for a number of 60ths of a second
fn wait(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [ticks] = take(interp, args)?;
    let ticks = interp.expect_number(&ticks)?;
    if ticks < 0.0 || !ticks.is_finite() {
        return Err(interp.bad_input("{_PROC_}: Expected non-negative number").into());
    }
    let resume = interp.state;
    interp.set_state(RunState::SuspendedOnYield);
    interp.events.wait(Duration::from_secs_f64(ticks / 60.0));
    interp.set_state(resume);
    interp.last_yield = Instant::now();
    Ok(None)
}

/// Cancel the current run
fn bye(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.cancel.store(true, Ordering::SeqCst);
    Err(Signal::Cancelled)
}

fn ignore(_: &mut Interpreter, _: Vec<Value>) -> Output {
    Ok(None)
}

/// `for [var start end step] body`, where the limits are expressions read left to right
fn for_(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [control, instructions] = take(interp, args)?;
    let control = interp.expect_list(control)?;
    let Some((variable, limits)) = control.split_first() else {
        return Err(interp.bad_input("{_PROC_}: Expected control list").into());
    };
    let variable = interp.expect_word(variable)?;
    let atoms = reader::parse_list(limits).map_err(|err| interp.parse_error(err))?;

    let mut tokens = Tokens::new(&atoms);
    let mut numbers = Vec::new();
    while !tokens.is_empty() {
        let expr = interp.compile(&mut tokens)?;
        let value = interp.eval_value(&expr, "for")?;
        numbers.push(interp.expect_number(&value)?);
    }
    let (start, end, step) = match numbers[..] {
        [start, end] => (start, end, if end < start { -1.0 } else { 1.0 }),
        [start, end, step] => (start, end, step),
        _ => return Err(interp.bad_input("{_PROC_}: Expected control list").into()),
    };
    if step == 0.0 {
        return Err(interp.bad_input("{_PROC_}: Step must not be zero").into());
    }

    let body = interp.expect_instructions(&instructions)?;
    let mut iteration: NumberType = 0.0;
    loop {
        let value = start + step * iteration;
        if (step > 0.0 && value > end) || (step < 0.0 && value < end) {
            return Ok(None);
        }
        interp.scopes.set_local(&variable, Value::Number(value));
        interp.execute(&body, false)?;
        interp.loop_tick()?;
        iteration += 1.0;
    }
}

/// Shared shape of the four conditional loops
fn conditional_loop(interp: &mut Interpreter, args: Vec<Value>, body_first: bool, continue_while: bool) -> Output {
    let [first, second] = take(interp, args)?;
    let (condition, instructions) = if body_first { (second, first) } else { (first, second) };
    let body = interp.expect_instructions(&instructions)?;
    let name = interp.call_stack.last().cloned().unwrap_or_default().to_lowercase();
    if body_first {
        interp.execute(&body, false)?;
    }
    while interp.condition(&condition, &name)? == continue_while {
        interp.execute(&body, false)?;
        interp.loop_tick()?;
    }
    Ok(None)
}

fn while_(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    conditional_loop(interp, args, false, true)
}

fn until(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    conditional_loop(interp, args, false, false)
}

fn do_while(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    conditional_loop(interp, args, true, true)
}

fn do_until(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    conditional_loop(interp, args, true, false)
}

fn apply(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [template, inputs] = take(interp, args)?;
    let inputs = interp.expect_list(inputs)?;
    interp.call_template(&template, inputs)
}

fn invoke(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let mut args = args.into_iter();
    let Some(template) = args.next() else {
        return Ok(None);
    };
    interp.call_template(&template, args.collect())
}

fn foreach(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [data, template] = take(interp, args)?;
    for item in members(interp, &data)? {
        interp.call_template(&template, vec![item])?;
        interp.loop_tick()?;
    }
    Ok(None)
}

/// A word maps to a word, anything else to a list
fn map(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [template, data] = take(interp, args)?;
    let mut results = Vec::new();
    for item in members(interp, &data)? {
        results.push(interp.template_value(&template, vec![item])?);
    }
    if data.is_word() {
        let mut text = String::new();
        for result in &results {
            text.push_str(&interp.expect_word(result)?);
        }
        return output(text);
    }
    output(Value::List(results))
}

fn filter(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [template, data] = take(interp, args)?;
    let mut kept = Vec::new();
    for item in members(interp, &data)? {
        let verdict = interp.template_value(&template, vec![item.clone()])?;
        if interp.expect_bool(&verdict)? {
            kept.push(item);
        }
    }
    if data.is_word() {
        return output(kept.iter().filter_map(Value::word_text).collect::<String>());
    }
    output(Value::List(kept))
}

/// First member the template accepts, or the empty list
fn find(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [template, data] = take(interp, args)?;
    for item in members(interp, &data)? {
        let verdict = interp.template_value(&template, vec![item.clone()])?;
        if interp.expect_bool(&verdict)? {
            return output(item);
        }
    }
    output(Value::List(Vec::new()))
}

/// Combine members pairwise from the left
fn reduce(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [template, data] = take(interp, args)?;
    let mut items = members(interp, &data)?.into_iter();
    let Some(mut acc) = items.next() else {
        return Err(interp.bad_input("{_PROC_}: Expected non-empty list").into());
    };
    for item in items {
        acc = interp.template_value(&template, vec![acc, item])?;
    }
    output(acc)
}

/// Input `n` (default 1) of the innermost question-mark template
fn slot(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let index = match args.first() {
        Some(n) => interp.expect_count(n)?,
        None => 1,
    };
    let value = interp
        .template_inputs
        .last()
        .and_then(|inputs| inputs.get(index.wrapping_sub(1)))
        .cloned();
    match value {
        Some(value) => output(value),
        None => Err(interp.bad_input("{_PROC_}: No such template input").into()),
    }
}

/// Template inputs after input `n` (default 1)
fn slot_rest(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let skip = match args.first() {
        Some(n) => interp.expect_count(n)?,
        None => 1,
    };
    let Some(inputs) = interp.template_inputs.last() else {
        return Err(interp.bad_input("{_PROC_}: No such template input").into());
    };
    output(Value::List(inputs.iter().skip(skip).cloned().collect()))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Want::*, check};
    use crate::ErrorCode;

    #[test]
    fn test_run_and_branching() {
        check(vec![
            ("run [sum 1 2]", Shows("3")),
            ("run \"sum\\ 2\\ 2", Shows("4")),
            ("runresult [sum 1 2]", Shows("[3]")),
            ("runresult [make \"x 1]", Shows("[]")),
            ("run [print 1]", Prints("1\n")),
            ("to f run [3] end f", Says("Don't know what to do with 3")),
            ("if 1 [\"yes]", Shows("yes")),
            ("if 0 [\"yes]", Nothing),
            ("(if \"false [\"yes] [\"no])", Shows("no")),
            ("ifelse [2 > 1] [\"yes] [\"no]", Shows("yes")),
            ("ifelse \"maybe [1] [2]", Fails(ErrorCode::BadInput)),
            ("if 1 [print \"a print \"b]", Prints("a\nb\n")),
            ("test 1 = 1 iftrue [print \"t] iffalse [print \"f]", Prints("t\n")),
            ("test \"false ift [print \"t] iff [print \"f]", Prints("f\n")),
            ("iftrue [print 1]", Fails(ErrorCode::NoTest)),
            ("iftrue [print 1]", Says("IFTRUE: Called without TEST")),
            ("to f test 1 end f iftrue [print 1]", Fails(ErrorCode::NoTest)),
            ("ignore 3", Nothing),
        ]);
    }

    #[test]
    fn test_loops() {
        check(vec![
            ("repeat 3 [type repcount]", Prints("123")),
            ("repeat 0 [print 1]", Prints("")),
            ("repeat -2 [print 1]", Prints("")),
            ("repeat 2 [repeat 2 [type #] type repcount]", Prints("121122")),
            ("repcount", Shows("-1")),
            ("repeat 2 [1]", Fails(ErrorCode::BadOutput)),
            ("repeat 1.5 [print 1]", Fails(ErrorCode::BadInput)),
            ("to f forever [if repcount > 4 [output repcount]] end f", Shows("5")),
            ("for [i 1 3] [type :i]", Prints("123")),
            ("for [i 3 1] [type :i]", Prints("321")),
            ("for [i 0 1 0.25] [type :i type \"\\ ]", Prints("0 0.25 0.5 0.75 1 ")),
            ("make \"n 2 for [i :n :n * 2] [type :i]", Prints("234")),
            ("for [i 1 5 -1] [print :i]", Prints("")),
            ("for [i 1 5 0] [print :i]", Fails(ErrorCode::BadInput)),
            ("for [i 1] [print :i]", Fails(ErrorCode::BadInput)),
            ("make \"i 0 while [:i < 3] [make \"i :i + 1] :i", Shows("3")),
            ("make \"i 0 until [:i = 4] [make \"i :i + 1] :i", Shows("4")),
            ("make \"i 10 do.while [make \"i :i + 1] [:i < 3] :i", Shows("11")),
            ("make \"i 0 do.until [make \"i :i + 1] [:i > 2] :i", Shows("3")),
            ("while \"maybe [print 1]", Fails(ErrorCode::BadInput)),
            ("bye print 1", Prints("")),
        ]);
    }

    #[test]
    fn test_non_local_exits() {
        check(vec![
            ("stop", Says("Can only use STOP inside a procedure")),
            ("output 1", Says("Can only use OUTPUT inside a procedure")),
            ("op 1", Fails(ErrorCode::BadOutput)),
            ("to f .maybeoutput sum 1 2 end f", Shows("3")),
            ("to f .maybeoutput print 1 end f", Prints("1\n")),
            ("to f repeat 3 [for [i 1 3] [if :i = 2 [output repcount * 10 + :i]]] end f", Shows("12")),
            ("catch \"x [throw \"x [a b]]", Shows("[a b]")),
            ("catch \"X [throw \"x]", Nothing),
            ("catch \"y [throw \"x]", Says("No CATCH for tag X")),
            ("catch \"error [throw \"error 42] error", Shows("[35 42 [] -1]")),
            ("catch \"error [frob] (list first error)", Shows("[24]")),
            ("to f catch \"error [sqrt -1] output error end first bf f", Shows("SQRT: Expected non-negative number")),
            ("error", Shows("[]")),
            ("catch \"error [1 / 0] error error", Shows("[]")),
            ("to f throw \"error [bad thing] end catch \"error [f] item 3 error", Shows("F")),
            ("catch \"x [throw \"error]", Fails(ErrorCode::UserGenerated)),
            ("catch \"error [throw \"x]", Fails(ErrorCode::ThrowError)),
            ("wait 0 \"done", Shows("done")),
            ("wait -1", Fails(ErrorCode::BadInput)),
        ]);
    }

    #[test]
    fn test_templates() {
        check(vec![
            ("apply \"sum [1 2]", Shows("3")),
            ("apply [? * 10] [4]", Shows("40")),
            ("apply [[a b] :a - :b] [10 4]", Shows("6")),
            ("apply [[a b] [make \"c :a * :b] [output :c + 1]] [2 3]", Shows("7")),
            ("apply [[a] :a] [1 2]", Fails(ErrorCode::TooManyInputs)),
            ("apply \"frob [1]", Says("Don't know how to FROB")),
            ("apply \"to []", Fails(ErrorCode::BadProc)),
            ("invoke \"first [a b]", Shows("a")),
            ("(invoke [(list ? (? 2) ?rest)] 1 2 3)", Shows("[1 2 [2 3]]")),
            ("(invoke \"list)", Shows("[]")),
            ("map [? * ?] [1 2 3]", Shows("[1 4 9]")),
            ("map \"first [[a b] [c d]]", Shows("[a c]")),
            ("map [[x] uppercase :x] \"abc", Shows("ABC")),
            ("map [print ?] [1]", Says("MAP: Template didn't output")),
            ("filter [? > 1] [0 1 2 3]", Shows("[2 3]")),
            ("filter \"numberp [a 1 b 2]", Shows("[1 2]")),
            ("filter [? = \"a] \"banana", Shows("aaa")),
            ("find [? > 1] [0 1 2 3]", Shows("2")),
            ("find [? > 5] [0 1]", Shows("[]")),
            ("reduce \"sum [1 2 3 4]", Shows("10")),
            ("reduce [word (? 2) ?] [a b c]", Shows("cba")),
            ("reduce \"sum [5]", Shows("5")),
            ("reduce \"sum []", Fails(ErrorCode::BadInput)),
            ("foreach [a b] [type ?]", Prints("ab")),
            ("foreach \"xy [[c] type :c type \"-]", Prints("x-y-")),
            ("?", Says("?: No such template input")),
            ("to double :n output :n * 2 end map \"double [1 2]", Shows("[2 4]")),
            ("to f output map [[x] output :x + 1] [1 2] end show f", Prints("[2 3]\n")),
        ]);
    }
}
