//! Statement compiler and evaluator.
//!
//! A statement is compiled from the atom stream into an [`Expr`] tree and then evaluated.
//! Compilation follows Logo's precedence ladder, lowest first:
//!
//! | level          | operators              |
//! |----------------|------------------------|
//! | relational     | `= < > <= >= <>`       |
//! | additive       | `+ -`                  |
//! | multiplicative | `* / %`                |
//! | power          | `^` (right-associative)|
//! | unary          | negation               |
//! | primary        | literals, `:var`, `(...)`, procedure calls |
//!
//! A bare procedure name starts a natural call, which compiles exactly as many following
//! expressions as the procedure's default arity. `(name ...)` collects expressions up to
//! the closing parenthesis and checks the count against the arity bounds. The special
//! form `to` runs while compiling, consuming the rest of its definition from the stream.
//!
//! Evaluation threads non-local control through [`Outcome`]: `output` and `stop` unwind as
//! [`Signal::Output`] to the nearest user-procedure call, errors and throws as
//! [`Signal::Throw`], and cancellation as [`Signal::Cancelled`].

use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::ast::{Value, parse_number};
use crate::builtinops::{OpKind, infix_primitive};
use crate::procedures::{ArityError, Procedure, ProcedureBody, UserProcedure};
use crate::reader::{Atom, InfixOp};
use crate::scheduler::RunState;
use crate::scope::Lookup;
use crate::{Error, ErrorCode, Interpreter, Outcome, Signal};

/// Cursor over the atoms of a statement sequence
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    atoms: &'a [Atom],
    position: usize,
}

impl<'a> Tokens<'a> {
    pub fn new(atoms: &'a [Atom]) -> Self {
        Self::at(atoms, 0)
    }

    /// Resume reading at `position`
    pub fn at(atoms: &'a [Atom], position: usize) -> Self {
        Tokens { atoms, position }
    }

    pub fn peek(&self) -> Option<&'a Atom> {
        self.peek_nth(0)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'a Atom> {
        self.atoms.get(self.position + n)
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.atoms.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a Atom;

    fn next(&mut self) -> Option<&'a Atom> {
        let atom = self.atoms.get(self.position)?;
        self.position += 1;
        Some(atom)
    }
}

/// A compiled, re-evaluatable expression
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Negate(Box<Expr>),
    Binary(InfixOp, Box<Expr>, Box<Expr>),
    Call {
        procedure: Rc<Procedure>,
        args: Vec<Expr>,
    },
    /// A special form that already ran while compiling
    Nothing,
}

type Level = fn(&mut Interpreter, &mut Tokens<'_>) -> Result<Expr, Error>;

impl Interpreter {
    /// Compile one expression from the front of `tokens`
    pub(crate) fn compile(&mut self, tokens: &mut Tokens<'_>) -> Result<Expr, Error> {
        self.binary_level(tokens, InfixOp::is_relational, Self::additive)
    }

    fn additive(&mut self, tokens: &mut Tokens<'_>) -> Result<Expr, Error> {
        self.binary_level(tokens, InfixOp::is_additive, Self::multiplicative)
    }

    fn multiplicative(&mut self, tokens: &mut Tokens<'_>) -> Result<Expr, Error> {
        self.binary_level(tokens, InfixOp::is_multiplicative, Self::power)
    }

    /// Left-associative fold of one precedence level
    fn binary_level(
        &mut self,
        tokens: &mut Tokens<'_>,
        accepts: fn(InfixOp) -> bool,
        operand: Level,
    ) -> Result<Expr, Error> {
        let mut lhs = operand(self, tokens)?;
        while let Some(Atom::Infix(op)) = tokens.peek()
            && accepts(*op)
        {
            tokens.next();
            let rhs = operand(self, tokens)?;
            lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn power(&mut self, tokens: &mut Tokens<'_>) -> Result<Expr, Error> {
        let base = self.unary(tokens)?;
        if let Some(Atom::Infix(InfixOp::Power)) = tokens.peek() {
            tokens.next();
            let exponent = self.power(tokens)?;
            return Ok(Expr::Binary(InfixOp::Power, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn unary(&mut self, tokens: &mut Tokens<'_>) -> Result<Expr, Error> {
        if let Some(Atom::UnaryMinus) = tokens.peek() {
            tokens.next();
            let operand = self.unary(tokens)?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.primary(tokens)
    }

    fn primary(&mut self, tokens: &mut Tokens<'_>) -> Result<Expr, Error> {
        let Some(atom) = tokens.next() else {
            return Err(self.error(ErrorCode::MissingParen, "Unexpected end of instructions"));
        };
        match atom {
            Atom::List(items) => Ok(Expr::Literal(Value::List(items.clone()))),
            Atom::Array(array) => Ok(Expr::Literal(Value::Array(array.clone()))),
            Atom::BadOrigin { origin, .. } => Err(self.error_with(
                ErrorCode::BadInput,
                "Array origin must be an integer, not {origin}",
                &[("origin", origin)],
            )),
            Atom::CloseParen => Err(self.error(ErrorCode::BadParen, "Unexpected ')'")),
            Atom::Infix(op) => Err(self.error_with(
                ErrorCode::BadProc,
                "Don't know how to {name:U}",
                &[("name", op.symbol())],
            )),
            Atom::UnaryMinus => Ok(Expr::Negate(Box::new(self.unary(tokens)?))),
            Atom::OpenParen => self.parenthesized(tokens),
            Atom::Word(text) => {
                if let Some(n) = parse_number(text) {
                    return Ok(Expr::Literal(Value::Number(n)));
                }
                if let Some(word) = text.strip_prefix('"').or_else(|| text.strip_prefix('\'')) {
                    return Ok(Expr::Literal(Value::Word(word.to_owned())));
                }
                if let Some(name) = text.strip_prefix(':') {
                    return Ok(Expr::Variable(name.to_owned()));
                }
                self.call(text, tokens, false)
            }
        }
    }

    fn parenthesized(&mut self, tokens: &mut Tokens<'_>) -> Result<Expr, Error> {
        if let Some(Atom::Word(name)) = tokens.peek()
            && self.procedures.contains(name)
            && !matches!(tokens.peek_nth(1), Some(Atom::Infix(_)))
        {
            tokens.next();
            return self.call(name, tokens, true);
        }
        let expr = self.compile(tokens)?;
        self.close_paren(tokens)?;
        Ok(expr)
    }

    fn close_paren(&self, tokens: &mut Tokens<'_>) -> Result<(), Error> {
        match tokens.next() {
            Some(Atom::CloseParen) => Ok(()),
            None => Err(self.error(ErrorCode::MissingParen, "Expected ')'")),
            Some(other) => Err(self.error_with(
                ErrorCode::MissingParen,
                "Expected ')', saw {word}",
                &[("word", &other.to_source())],
            )),
        }
    }

    fn call(&mut self, name: &str, tokens: &mut Tokens<'_>, parenthesized: bool) -> Result<Expr, Error> {
        let Some(procedure) = self.procedures.get(name) else {
            return Err(self.unknown_procedure(name));
        };

        if let ProcedureBody::Builtin(OpKind::Special(special)) = procedure.body {
            self.call_stack.push(procedure.display_name());
            let result = special(self, tokens);
            self.call_stack.pop();
            result?;
            if parenthesized {
                self.close_paren(tokens)?;
            }
            return Ok(Expr::Nothing);
        }

        let mut args = Vec::new();
        if parenthesized {
            while !matches!(tokens.peek(), Some(Atom::CloseParen)) {
                if tokens.is_empty() {
                    return Err(self.error(ErrorCode::MissingParen, "Expected ')'"));
                }
                args.push(self.compile(tokens)?);
            }
            tokens.next();
            procedure
                .arity
                .validate(args.len())
                .map_err(|err| self.arity_error(err, name))?;
        } else {
            for _ in 0..procedure.arity.default {
                args.push(self.compile(tokens)?);
            }
        }
        Ok(Expr::Call { procedure, args })
    }

    pub(crate) fn arity_error(&self, err: ArityError, name: &str) -> Error {
        match err {
            ArityError::NotEnough => self.error_with(
                ErrorCode::NotEnoughInputs,
                "Not enough inputs for {name:U}",
                &[("name", name)],
            ),
            ArityError::TooMany => self.error_with(
                ErrorCode::TooManyInputs,
                "Too many inputs for {name:U}",
                &[("name", name)],
            ),
        }
    }

    /// A word that names no procedure, telling `fd10` apart from a plain unknown name
    fn unknown_procedure(&self, name: &str) -> Error {
        let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
        if !stem.is_empty() && stem.len() < name.len() && self.procedures.contains(stem) {
            return self.error_with(
                ErrorCode::MissingSpace,
                "Need a space between {name:U} and {value}",
                &[("name", stem), ("value", &name[stem.len()..])],
            );
        }
        self.error_with(ErrorCode::BadProc, "Don't know how to {name:U}", &[("name", name)])
    }

    pub(crate) fn eval(&mut self, expr: &Expr) -> Outcome<Option<Value>> {
        match expr {
            Expr::Literal(value) => Ok(Some(value.clone())),
            Expr::Variable(name) => match self.scopes.get(name) {
                Lookup::Bound(value) => Ok(Some(value.clone())),
                Lookup::Unassigned | Lookup::Unknown => Err(self
                    .error_with(
                        ErrorCode::BadVar,
                        "Don't know about variable {name:U}",
                        &[("name", name)],
                    )
                    .into()),
            },
            Expr::Negate(operand) => {
                let (name, function) = infix_primitive(None);
                let value = self.eval_value(operand, name)?;
                self.call_builtin(name, function, vec![value])
            }
            Expr::Binary(op, lhs, rhs) => {
                let (name, function) = infix_primitive(Some(*op));
                let left = self.eval_value(lhs, name)?;
                let right = self.eval_value(rhs, name)?;
                self.call_builtin(name, function, vec![left, right])
            }
            Expr::Call { procedure, args } => self.call_procedure(procedure, args),
            Expr::Nothing => Ok(None),
        }
    }

    /// Evaluate an expression whose value is consumed by `consumer`
    pub(crate) fn eval_value(&mut self, expr: &Expr, consumer: &str) -> Outcome<Value> {
        match self.eval(expr)? {
            Some(value) => Ok(value),
            None => {
                let name = match expr {
                    Expr::Call { procedure, .. } => procedure.name.as_str(),
                    _ => "",
                };
                Err(self
                    .error_with(
                        ErrorCode::NoOutput,
                        "{name:U} didn't output to {consumer:U}",
                        &[("name", name), ("consumer", consumer)],
                    )
                    .into())
            }
        }
    }

    fn call_builtin(
        &mut self,
        name: &str,
        function: crate::builtinops::PrimitiveFn,
        values: Vec<Value>,
    ) -> Outcome<Option<Value>> {
        self.call_stack.push(name.to_uppercase());
        let result = function(self, values);
        self.call_stack.pop();
        result
    }

    fn call_procedure(&mut self, procedure: &Rc<Procedure>, args: &[Expr]) -> Outcome<Option<Value>> {
        if let ProcedureBody::Builtin(OpKind::Lazy(function)) = procedure.body {
            self.call_stack.push(procedure.display_name());
            let result = function(self, args);
            self.call_stack.pop();
            return result;
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_value(arg, &procedure.name)?);
        }
        self.apply(procedure, values)
    }

    /// Call a procedure with already evaluated inputs
    pub(crate) fn apply(&mut self, procedure: &Rc<Procedure>, values: Vec<Value>) -> Outcome<Option<Value>> {
        procedure
            .arity
            .validate(values.len())
            .map_err(|err| self.arity_error(err, &procedure.name))?;
        self.call_stack.push(procedure.display_name());
        let result = match &procedure.body {
            ProcedureBody::Builtin(OpKind::Function(function)) => function(self, values),
            ProcedureBody::Builtin(OpKind::Lazy(function)) => {
                let args: Vec<Expr> = values.into_iter().map(Expr::Literal).collect();
                function(self, &args)
            }
            ProcedureBody::Builtin(OpKind::Special(_)) => Err(self
                .error_with(ErrorCode::BadProc, "Can't apply {name:U}", &[("name", &procedure.name)])
                .into()),
            ProcedureBody::User(definition) => self.call_user(definition, values),
        };
        self.call_stack.pop();
        result
    }

    fn call_user(&mut self, definition: &UserProcedure, values: Vec<Value>) -> Outcome<Option<Value>> {
        if self.user_depth >= self.config.recursion_limit {
            return Err(self.uncoded_error("Too many nested procedure calls", &[]).into());
        }
        self.user_depth += 1;
        self.scopes.push_frame();
        let result = self.bind_and_run(definition, values);
        self.scopes.pop_frame();
        self.user_depth -= 1;

        let value = match result {
            Ok(()) => None,
            Err(Signal::Output(value)) => value,
            Err(other) => return Err(other),
        };
        self.maybe_yield();
        Ok(value)
    }

    fn bind_and_run(&mut self, definition: &UserProcedure, values: Vec<Value>) -> Outcome<()> {
        let mut values = values.into_iter();
        for (name, value) in definition.inputs.iter().zip(values.by_ref()) {
            self.scopes.set_local(name, value);
        }
        for input in &definition.optional {
            let value = match values.next() {
                Some(value) => value,
                None => self.evaluate_expression(&input.expression, &input.name)?,
            };
            self.scopes.set_local(&input.name, value);
        }
        if let Some(rest) = &definition.rest {
            self.scopes.set_local(rest, Value::List(values.collect()));
        }
        self.execute(&definition.body, false)?;
        Ok(())
    }

    /// Hand control to the host event loop once the time slice is used up
    pub(crate) fn maybe_yield(&mut self) {
        if self.last_yield.elapsed() < self.config.yield_slice {
            return;
        }
        log::trace!("yielding after {:?}", self.last_yield.elapsed());
        let resume = self.state;
        self.set_state(RunState::SuspendedOnYield);
        self.events.yield_now();
        self.set_state(resume);
        self.last_yield = Instant::now();
        self.yielded = true;
    }

    /// Run a statement sequence; with `return_result` the last statement's value is kept
    pub(crate) fn execute(&mut self, atoms: &[Atom], return_result: bool) -> Outcome<Option<Value>> {
        let mut tokens = Tokens::new(atoms);
        let mut last = None;
        while !tokens.is_empty() {
            last = self.execute_statement(&mut tokens, return_result)?;
        }
        Ok(last)
    }

    /// Compile and evaluate one statement
    pub(crate) fn execute_statement(
        &mut self,
        tokens: &mut Tokens<'_>,
        return_result: bool,
    ) -> Outcome<Option<Value>> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(Signal::Cancelled);
        }
        let expr = self.compile(tokens)?;
        match self.eval(&expr)? {
            Some(value) if !return_result => Err(self
                .error_with(
                    ErrorCode::BadOutput,
                    "Don't know what to do with {result}",
                    &[("result", &value.to_string())],
                )
                .into()),
            result => Ok(result),
        }
    }

    /// Value of the first expression in `atoms`
    pub(crate) fn evaluate_expression(&mut self, atoms: &[Atom], consumer: &str) -> Outcome<Value> {
        let mut tokens = Tokens::new(atoms);
        let expr = self.compile(&mut tokens)?;
        self.eval_value(&expr, consumer)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ast::{nil, val};
    use crate::host::BufferStream;
    use crate::{Config, host::HeadlessTurtle};

    #[derive(Debug)]
    enum Expected {
        /// The last statement's value
        Val(Value),
        /// Completes without a value
        Nothing,
        /// Fails with this code
        Code(ErrorCode),
        /// Fails with this message
        Message(&'static str),
        /// Completes and prints exactly this text
        Printed(&'static str),
    }

    use Expected::*;

    fn interpreter() -> (Interpreter, BufferStream) {
        let stream = BufferStream::default();
        let interp = Interpreter::with_config(
            Box::new(HeadlessTurtle::default()),
            Box::new(stream.clone()),
            Config {
                random_seed: Some(7),
                recursion_limit: 100,
                ..Config::default()
            },
        );
        (interp, stream)
    }

    fn run_cases(cases: Vec<(&str, Expected)>) {
        for (i, (source, expected)) in cases.into_iter().enumerate() {
            let (mut interp, stream) = interpreter();
            let result = match expected {
                Printed(_) => interp.run(source),
                _ => interp.evaluate(source),
            };
            match (&result, &expected) {
                (Ok(Some(value)), Val(want)) => {
                    assert_eq!(value, want, "#{}: {source:?}", i + 1);
                    // equalp treats 1 and "1 alike; the rendering must match too
                    assert_eq!(value.to_string(), want.to_string(), "#{}: {source:?}", i + 1);
                }
                (Ok(None), Nothing) => {}
                (Ok(None), Printed(text)) => {
                    assert_eq!(stream.output(), *text, "#{}: {source:?}", i + 1);
                }
                (Err(err), Code(code)) => {
                    assert_eq!(err.code, Some(*code), "#{}: {source:?}: {err}", i + 1);
                }
                (Err(err), Message(message)) => {
                    assert_eq!(err.message, *message, "#{}: {source:?}", i + 1);
                }
                _ => panic!("#{}: {source:?}: expected {expected:?}, got {result:?}", i + 1),
            }
        }
    }

    #[test]
    fn test_unary_minus_and_precedence() {
        run_cases(vec![
            ("-4", Val(val(-4))),
            ("- 4 + 10", Val(val(6))),
            ("10 + - 4", Val(val(6))),
            ("make \"t 10-4 :t", Val(val(6))),
            ("sum 10 - 4", Message("Unexpected end of instructions")),
            ("sum 10 (-4)", Val(val(6))),
            ("10- 4", Val(val(6))),
            ("1 + 2 * 3", Val(val(7))),
            ("(1 + 2) * 3", Val(val(9))),
            ("2 ^ 3 ^ 2", Val(val(512))),
            ("-2 ^ 2", Val(val(4))),
            ("10 - 2 - 3", Val(val(5))),
            ("20 / 2 / 5", Val(val(2))),
            ("7 % 3", Val(val(1))),
            ("1 + 1 = 2", Val(val(1))),
            ("3 < 2 + 2", Val(val(1))),
            ("3 <> 3", Val(val(0))),
            ("3 >= 3", Val(val(1))),
            ("\"abc = \"abc", Val(val(1))),
            ("3 * -:x", Code(ErrorCode::BadVar)),
        ]);
    }

    #[test]
    fn test_primary_forms_and_compile_errors() {
        run_cases(vec![
            ("\"hello", Val(val("hello"))),
            ("'hi", Val(val("hi"))),
            ("[a b [c]]", Val(val(vec![val("a"), val("b"), val(["c"])]))),
            ("3.50", Val(val(3.5))),
            ("(word)", Val(val(""))),
            ("(sum 1 2 3 4)", Val(val(10))),
            ("(list)", Val(nil())),
            ("(first [a b] )", Val(val("a"))),
            ("(first)", Code(ErrorCode::NotEnoughInputs)),
            ("(first [a] [b])", Code(ErrorCode::TooManyInputs)),
            ("(first)", Message("Not enough inputs for FIRST")),
            ("(sum 1 2", Code(ErrorCode::MissingParen)),
            ("(1 + 2", Message("Expected ')'")),
            ("(1 + 2 3)", Message("Expected ')', saw 3")),
            ("sum 1 2)", Code(ErrorCode::BadParen)),
            ("+ 2", Message("Don't know how to +")),
            ("frobnicate 3", Message("Don't know how to FROBNICATE")),
            ("print1", Message("Need a space between PRINT and 1")),
            ("fd10", Code(ErrorCode::MissingSpace)),
            ("abc123", Code(ErrorCode::BadProc)),
            (":nothing", Message("Don't know about variable NOTHING")),
            ("print [a", Code(ErrorCode::BadBracket)),
            ("print {a", Code(ErrorCode::BadBrace)),
            ("to f \"x end f", Message("Don't know what to do with x")),
        ]);
    }

    #[test]
    fn test_procedures_and_scoping() {
        run_cases(vec![
            ("to foo output 6 end foo", Val(val(6))),
            ("to foo output 6 end FOO", Val(val(6))),
            ("to foo output 6 end Foo", Val(val(6))),
            ("to double :n\noutput :n * 2\nend\ndouble double 3", Val(val(12))),
            ("to fact :n\nif :n < 2 [output 1]\noutput :n * fact :n - 1\nend\nfact 5", Val(val(120))),
            // Optional inputs default in the new frame and may use earlier inputs
            ("to f :a [:b :a * 10]\noutput :a + :b\nend\n(list f 1 (f 1 2))", Val(val([11, 3]))),
            ("to f [:rest] output :rest end (f 1 2 3)", Val(val([1, 2, 3]))),
            ("to f [:rest] output :rest end f", Val(nil())),
            ("to f :a [:b 5] 2 output :a + :b end f 1 2", Val(val(3))),
            ("to f :a output :a end (f 1 2)", Code(ErrorCode::TooManyInputs)),
            // Dynamic scope: a callee sees its caller's locals
            ("to inner output :x end\nto outer local \"x make \"x 5 output inner end\nouter", Val(val(5))),
            ("to f local \"y make \"y 1 end f :y", Code(ErrorCode::BadVar)),
            ("to f make \"created 9 end f :created", Val(val(9))),
            ("make \"x 1 to f :x make \"x 2 end f 10 :x", Val(val(1))),
            ("to noop end noop", Nothing),
            ("to noop end print noop", Message("NOOP didn't output to PRINT")),
            ("to f stop print 1 end f", Nothing),
            ("output 3", Code(ErrorCode::BadOutput)),
            ("to f :a :a end", Code(ErrorCode::AlreadyDefined)),
            ("to f :a 3 end", Code(ErrorCode::BadInput)),
            ("to print end", Code(ErrorCode::IsPrimitive)),
            ("to to end", Message("Can't redefine special TO")),
            ("make \"redefp \"true to print :x output 42 end print 1", Val(val(42))),
            ("to loop loop end loop", Message("Too many nested procedure calls")),
            ("to f output 1 + :missing end f", Message("Don't know about variable MISSING")),
        ]);
    }

    #[test]
    fn test_values_arrays_and_printing() {
        run_cases(vec![
            ("count [ a b [ c d e ] f ]", Val(val(4))),
            ("make \"a {1} make \"b :a equalp :a :b", Val(val(1))),
            ("equalp {1} {1}", Val(val(0))),
            ("make \"a {1 2} setitem 1 :a :a", Code(ErrorCode::BadInput)),
            ("make \"a {1 2} setitem 1 :a :a", Message("SETITEM: Can't create circular array")),
            ("make \"a {1} make \"b {2} setitem 1 :b :a setitem 1 :a :b", Message("SETITEM: Can't create circular array")),
            ("make \"a {1 2} make \"b :a setitem 2 :b 9 item 2 :a", Val(val(9))),
            ("make \"l [1 2] make \"m :l make \"m lput 3 :m :l", Val(val([1, 2]))),
            ("print [a [b c]]", Printed("a [b c]\n")),
            ("show [a [b c]]", Printed("[a [b c]]\n")),
            ("(print \"a [b] {c}@0)", Printed("a b {c}@0\n")),
            ("type \"a type [b c] print \"|", Printed("ab c|\n")),
            ("print sum 0.1 0.2", Printed("0.30000000000000004\n")),
            ("print -0", Printed("0\n")),
            ("(show {1 2}@1.5)", Code(ErrorCode::BadInput)),
            ("show {1 2}@1.5", Message("Array origin must be an integer, not 1.5")),
            ("to f output {a}@-0.5 end f", Code(ErrorCode::BadInput)),
            ("item 10 {a b}@1e1", Val(val("a"))),
            ("count [{1}@1.5 x]", Val(val(2))),
        ]);
    }

    #[test]
    fn test_non_local_control() {
        run_cases(vec![
            ("catch \"done [throw \"done] 5", Val(val(5))),
            ("catch \"done [throw \"done 7]", Val(val(7))),
            ("catch \"error [print 1 / 0] first error", Val(val(4))),
            ("catch \"error [frob] item 2 error", Val(val("Don't know how to FROB"))),
            ("throw \"unknown", Code(ErrorCode::ThrowError)),
            ("throw \"unknown", Message("No CATCH for tag UNKNOWN")),
            ("throw \"error", Code(ErrorCode::UserGenerated)),
            ("(throw \"error [custom failure])", Message("custom failure")),
            ("to f catch \"x [output 3] output 4 end f", Val(val(3))),
            ("to f repeat 5 [if repcount = 3 [output repcount]] end f", Val(val(3))),
            ("to f [:n 0] if :n > 2 [stop] print :n (f :n + 1) end f", Printed("0\n1\n2\n")),
            ("ignore 1 / 0", Message("QUOTIENT: Division by zero")),
            ("remainder 1 0", Code(ErrorCode::BadInput)),
        ]);
    }

    #[test]
    fn test_call_stack_and_frames_unwind_on_errors() {
        let (mut interp, _) = interpreter();
        interp.run("to boom local \"inner make \"inner 1 output 1 / 0 end").unwrap();
        let err = interp.run("boom").unwrap_err();
        assert_eq!(err.procedure.as_deref(), Some("QUOTIENT"));
        assert_eq!(interp.scopes.depth(), 1);
        assert!(interp.call_stack.is_empty());
        assert_eq!(interp.user_depth, 0);
        assert_eq!(interp.variable("inner"), None);
    }

    #[test]
    fn test_procedure_round_trip_preserves_behaviour() {
        let definitions = [
            ("poly", "to poly :a [:b :a + 1] [:c] 2\n  output (se :a :b :c)\nend"),
            ("neg", "to neg :x\noutput -:x * 2\nend"),
            ("pick3", "to pick3 :l [:n 2]\noutput item :n :l\nend"),
        ];
        let calls = [
            "poly 1 5", "(poly 1)", "(poly 1 2 3 4)", "neg 4", "neg -1", "pick3 [a b c]", "(pick3 [a b c] 3)",
        ];
        let (mut original, _) = interpreter();
        for (_, source) in definitions {
            original.run(source).unwrap();
        }
        let (mut reread, _) = interpreter();
        for (name, _) in definitions {
            let text = original.procedure_text(name).unwrap();
            reread.run(&text).unwrap();
            assert_eq!(reread.procedure_arity(name), original.procedure_arity(name), "{name}");
            assert_eq!(reread.procedure_text(name).unwrap(), text);
        }
        for call in calls {
            match (original.evaluate(call), reread.evaluate(call)) {
                (Ok(a), Ok(b)) => assert_eq!(a, b, "{call}"),
                (Err(a), Err(b)) => assert_eq!(a.message, b.message, "{call}"),
                (a, b) => panic!("{call}: {a:?} vs {b:?}"),
            }
        }
    }

    #[test]
    fn test_compile_stops_at_statement_boundaries() {
        let (mut interp, _) = interpreter();
        let atoms = crate::reader::parse("print 1 + 2 print sum 3 4").unwrap();
        let mut tokens = Tokens::new(&atoms);
        let first = interp.compile(&mut tokens).unwrap();
        assert!(matches!(first, Expr::Call { ref args, .. } if args.len() == 1));
        assert_eq!(tokens.position(), 4);
        interp.compile(&mut tokens).unwrap();
        assert!(tokens.is_empty());
    }
}
