//! Procedure definitions and the procedure registry.
//!
//! Every callable, primitive or user-defined, is a [`Procedure`]: a name, an [`Arity`]
//! and a body. The registry maps lower-cased names to shared procedures, so aliases such
//! as `fd` and `forward` resolve to one implementation.
//!
//! User procedures are built from the atoms that follow `to NAME` (or from the list given
//! to `define`). The header is read in a fixed phase order and each phase ends as soon as
//! its pattern stops matching:
//!
//! ```logo
//! to name :required [:optional default] [:rest] 2 body...
//! ```
//!
//! Anything left over is the body. [`UserProcedure::to_source`] renders the canonical
//! `to ... end` text that reads back to an equivalent procedure.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{Value, parse_number};
use crate::builtinops::OpKind;
use crate::reader::{Atom, ParseError, atoms_to_values, list_text, parse_list, render_atoms};

/// Number of inputs a procedure accepts.
///
/// `default` is what a natural (unparenthesized) call consumes; parenthesized calls may
/// pass anything from `minimum` to `maximum`, where `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub minimum: usize,
    pub default: usize,
    pub maximum: Option<usize>,
}

/// Why an input count was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityError {
    NotEnough,
    TooMany,
}

impl Arity {
    /// Exactly `n` inputs
    pub const fn fixed(n: usize) -> Self {
        Arity {
            minimum: n,
            default: n,
            maximum: Some(n),
        }
    }

    /// At least `minimum` inputs, `default` in a natural call, no upper bound
    pub const fn variadic(minimum: usize, default: usize) -> Self {
        Arity {
            minimum,
            default,
            maximum: None,
        }
    }

    pub const fn range(minimum: usize, default: usize, maximum: usize) -> Self {
        Arity {
            minimum,
            default,
            maximum: Some(maximum),
        }
    }

    pub fn validate(&self, count: usize) -> Result<(), ArityError> {
        if count < self.minimum {
            Err(ArityError::NotEnough)
        } else if self.maximum.is_some_and(|max| count > max) {
            Err(ArityError::TooMany)
        } else {
            Ok(())
        }
    }

    /// The `[minimum default maximum]` triple reported by `arity`; unbounded is `-1`
    pub fn to_value(&self) -> Value {
        let maximum = self.maximum.map_or(-1, |max| max as i64);
        Value::List(vec![
            Value::from(self.minimum),
            Value::from(self.default),
            Value::from(maximum),
        ])
    }
}

/// A named callable
#[derive(Debug)]
pub struct Procedure {
    /// Lower-cased name the procedure was created under
    pub name: String,
    pub arity: Arity,
    pub body: ProcedureBody,
}

#[derive(Debug)]
pub enum ProcedureBody {
    Builtin(OpKind),
    User(UserProcedure),
}

impl Procedure {
    pub fn user(name: &str, definition: UserProcedure) -> Self {
        Procedure {
            name: name.to_lowercase(),
            arity: definition.arity(),
            body: ProcedureBody::User(definition),
        }
    }

    /// Built in; may only be replaced when `redefp` is set
    pub fn is_primitive(&self) -> bool {
        matches!(self.body, ProcedureBody::Builtin(_))
    }

    /// Consumes the raw remainder of its statement; can never be replaced
    pub fn is_special(&self) -> bool {
        matches!(self.body, ProcedureBody::Builtin(OpKind::Special(_)))
    }

    /// Receives its inputs unevaluated
    pub fn is_noeval(&self) -> bool {
        matches!(self.body, ProcedureBody::Builtin(OpKind::Lazy(_)))
    }

    pub fn display_name(&self) -> String {
        self.name.to_uppercase()
    }

    pub fn as_user(&self) -> Option<&UserProcedure> {
        match &self.body {
            ProcedureBody::User(definition) => Some(definition),
            ProcedureBody::Builtin(_) => None,
        }
    }
}

/// An optional input with the expression that supplies its default
#[derive(Debug, Clone, PartialEq)]
pub struct OptionalInput {
    pub name: String,
    /// Default expression as written
    pub default: Vec<Value>,
    pub(crate) expression: Vec<Atom>,
}

/// Inputs and body of a procedure defined in Logo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProcedure {
    pub inputs: Vec<String>,
    pub optional: Vec<OptionalInput>,
    pub rest: Option<String>,
    /// Natural-call arity when it differs from the required count
    pub default_arity: Option<usize>,
    pub body: Vec<Atom>,
}

/// Malformed procedure headers
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionError {
    /// The same input name appears twice
    DuplicateInput(String),
    /// The arity override is not a whole number within the accepted input counts
    BadDefaultArity(String),
    /// An optional input's default does not read as instructions
    BadDefault(ParseError),
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DefinitionError::DuplicateInput(name) => write!(f, "Duplicate input {name}"),
            DefinitionError::BadDefaultArity(text) => write!(f, "Bad default arity {text}"),
            DefinitionError::BadDefault(err) => write!(f, "Bad default: {err}"),
        }
    }
}

impl std::error::Error for DefinitionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Required,
    Optional,
    Rest,
    DefaultArity,
    Body,
}

/// `:name` as an input name
fn input_name(value: &Value) -> Option<String> {
    match value {
        Value::Word(text) => text.strip_prefix(':').map(str::to_owned),
        _ => None,
    }
}

impl UserProcedure {
    /// Read a header-and-body atom sequence into a procedure
    pub fn parse(atoms: Vec<Atom>) -> Result<Self, DefinitionError> {
        let mut procedure = UserProcedure::default();
        let mut phase = Phase::Required;
        let mut arity_text = None;

        for atom in atoms {
            if phase == Phase::Required {
                if let Atom::Word(text) = &atom
                    && let Some(name) = text.strip_prefix(':')
                {
                    procedure.add_name(name)?;
                    procedure.inputs.push(name.to_owned());
                    continue;
                }
                phase = Phase::Optional;
            }
            if phase == Phase::Optional {
                if let Atom::List(items) = &atom
                    && items.len() > 1
                    && let Some(name) = input_name(&items[0])
                {
                    procedure.add_name(&name)?;
                    let default = items[1..].to_vec();
                    let expression = parse_list(&default).map_err(DefinitionError::BadDefault)?;
                    procedure.optional.push(OptionalInput {
                        name,
                        default,
                        expression,
                    });
                    continue;
                }
                phase = Phase::Rest;
            }
            if phase == Phase::Rest {
                phase = Phase::DefaultArity;
                if let Atom::List(items) = &atom
                    && items.len() == 1
                    && let Some(name) = input_name(&items[0])
                {
                    procedure.add_name(&name)?;
                    procedure.rest = Some(name);
                    continue;
                }
            }
            if phase == Phase::DefaultArity {
                phase = Phase::Body;
                if let Atom::Word(text) = &atom
                    && parse_number(text).is_some()
                {
                    arity_text = Some(text.clone());
                    continue;
                }
            }
            procedure.body.push(atom);
        }

        if let Some(text) = arity_text {
            procedure.default_arity = Some(procedure.check_default_arity(&text)?);
        }
        Ok(procedure)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .map(String::as_str)
            .chain(self.optional.iter().map(|input| input.name.as_str()))
            .chain(self.rest.as_deref())
    }

    fn add_name(&self, name: &str) -> Result<(), DefinitionError> {
        if self.names().any(|existing| existing.eq_ignore_ascii_case(name)) {
            return Err(DefinitionError::DuplicateInput(name.to_owned()));
        }
        Ok(())
    }

    fn check_default_arity(&self, text: &str) -> Result<usize, DefinitionError> {
        let bad = || DefinitionError::BadDefaultArity(text.to_owned());
        let n = parse_number(text).ok_or_else(bad)?;
        if n.fract() != 0.0 || n < self.inputs.len() as f64 {
            return Err(bad());
        }
        let n = n as usize;
        if self.rest.is_none() && n > self.inputs.len() + self.optional.len() {
            return Err(bad());
        }
        Ok(n)
    }

    pub fn arity(&self) -> Arity {
        let minimum = self.inputs.len();
        Arity {
            minimum,
            default: self.default_arity.unwrap_or(minimum),
            maximum: match self.rest {
                Some(_) => None,
                None => Some(minimum + self.optional.len()),
            },
        }
    }

    fn header_parts(&self, prefix: &str) -> Vec<String> {
        let mut parts: Vec<String> = self
            .inputs
            .iter()
            .map(|name| format!("{prefix}{name}"))
            .collect();
        for input in &self.optional {
            parts.push(format!("[{prefix}{} {}]", input.name, list_text(&input.default)));
        }
        if let Some(rest) = &self.rest {
            parts.push(format!("[{prefix}{rest}]"));
        }
        if let Some(n) = self.default_arity {
            parts.push(n.to_string());
        }
        parts
    }

    /// Canonical `to ... end` source
    pub fn to_source(&self, name: &str) -> String {
        let mut header = format!("to {name}");
        for part in self.header_parts(":") {
            header.push(' ');
            header.push_str(&part);
        }
        let body = render_atoms(&self.body);
        if body.is_empty() {
            format!("{header}\nend")
        } else {
            format!("{header}\n  {body}\nend")
        }
    }

    /// The `[[inputs] [body]]` form that `text` outputs and `define` accepts
    pub fn to_text(&self) -> Value {
        let mut inputs: Vec<Value> = self.inputs.iter().map(|n| Value::from(n.as_str())).collect();
        for input in &self.optional {
            let mut item = vec![Value::from(input.name.as_str())];
            item.extend(input.default.iter().cloned());
            inputs.push(Value::List(item));
        }
        if let Some(rest) = &self.rest {
            inputs.push(Value::List(vec![Value::from(rest.as_str())]));
        }
        if let Some(n) = self.default_arity {
            inputs.push(Value::from(n));
        }
        let mut text = vec![Value::List(inputs)];
        if !self.body.is_empty() {
            text.push(Value::List(atoms_to_values(&self.body)));
        }
        Value::List(text)
    }
}

/// Name to procedure table; names are case-insensitive
#[derive(Debug, Default)]
pub struct Registry {
    procedures: IndexMap<String, Rc<Procedure>>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<Rc<Procedure>> {
        self.procedures.get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.procedures.contains_key(&name.to_lowercase())
    }

    pub fn insert(&mut self, name: &str, procedure: Rc<Procedure>) {
        self.procedures.insert(name.to_lowercase(), procedure);
    }

    pub fn remove(&mut self, name: &str) -> Option<Rc<Procedure>> {
        self.procedures.shift_remove(&name.to_lowercase())
    }

    /// Registered names whose procedure satisfies `filter`, in registration order
    pub fn names(&self, filter: impl Fn(&Procedure) -> bool) -> Vec<String> {
        self.procedures
            .iter()
            .filter(|(_, procedure)| filter(procedure))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ast::val;
    use crate::reader::parse;

    fn definition(source: &str) -> Result<UserProcedure, DefinitionError> {
        UserProcedure::parse(parse(source).unwrap())
    }

    #[test]
    fn test_arity_validation() {
        let cases: Vec<(Arity, usize, Result<(), ArityError>)> = vec![
            (Arity::fixed(2), 2, Ok(())),
            (Arity::fixed(2), 1, Err(ArityError::NotEnough)),
            (Arity::fixed(2), 3, Err(ArityError::TooMany)),
            (Arity::variadic(0, 2), 0, Ok(())),
            (Arity::variadic(0, 2), 100, Ok(())),
            (Arity::range(1, 1, 2), 2, Ok(())),
            (Arity::range(1, 1, 2), 0, Err(ArityError::NotEnough)),
        ];
        for (i, (arity, count, expected)) in cases.iter().enumerate() {
            assert_eq!(arity.validate(*count), *expected, "#{}", i + 1);
        }
        assert_eq!(Arity::variadic(1, 2).to_value(), val([1, 2, -1]));
    }

    #[test]
    fn test_header_phases() {
        let cases: Vec<(&str, Arity, usize)> = vec![
            (":a :b print :a", Arity::fixed(2), 2),
            (":a [:b 1] [:c] 3", Arity::variadic(1, 3), 0),
            (":a [:b :a * 2] print :b", Arity::range(1, 1, 2), 2),
            ("[:rest] print :rest", Arity::variadic(0, 0), 2),
            // A one-item list after the optionals is the rest input, not a default
            ("[:x 1] [:y] 1", Arity::variadic(0, 1), 0),
            // Once a phase stops matching, later header forms are body
            ("print :a :b", Arity::fixed(0), 3),
            (":a 1 :b", Arity::fixed(1), 1),
            ("[print 1]", Arity::fixed(0), 1),
            ("", Arity::fixed(0), 0),
        ];
        for (i, (source, arity, body_len)) in cases.iter().enumerate() {
            let procedure = definition(source).unwrap();
            assert_eq!(procedure.arity(), *arity, "#{}: {source:?}", i + 1);
            assert_eq!(procedure.body.len(), *body_len, "#{}: {source:?}", i + 1);
        }
    }

    #[test]
    fn test_header_errors() {
        let cases: Vec<(&str, DefinitionError)> = vec![
            (":a :A", DefinitionError::DuplicateInput("A".into())),
            (":a [:a 1]", DefinitionError::DuplicateInput("a".into())),
            (":a 0", DefinitionError::BadDefaultArity("0".into())),
            (":a [:b 1] 3", DefinitionError::BadDefaultArity("3".into())),
            (":a 1.5", DefinitionError::BadDefaultArity("1.5".into())),
        ];
        for (i, (source, expected)) in cases.iter().enumerate() {
            assert_eq!(definition(source).unwrap_err(), *expected, "#{}: {source:?}", i + 1);
        }
    }

    #[test]
    fn test_canonical_rendering_round_trips() {
        let sources = [
            ":size repeat 4 [fd :size rt 90]",
            ":a [:b :a + 1] [:c] 2 output (list :a :b :c)",
            ":n if :n < 1 [output 1] output :n * fact :n - 1",
            ":x output -:x",
            "",
        ];
        for source in sources {
            let procedure = definition(source).unwrap();
            let text = procedure.to_source("demo");
            let header_and_body = text
                .strip_prefix("to demo")
                .and_then(|rest| rest.strip_suffix("end"))
                .unwrap();
            let reread = definition(header_and_body).unwrap();
            assert_eq!(reread, procedure, "{text}");
        }
        let procedure = definition(":a [:b 1] [:c] 2 print :a").unwrap();
        assert_eq!(procedure.to_source("foo"), "to foo :a [:b 1] [:c] 2\n  print :a\nend");
        assert_eq!(procedure.to_text().to_string(), "[[a [b 1] [c] 2] [print :a]]");
    }

    #[test]
    fn test_registry_aliases_share_procedures() {
        let mut registry = Registry::default();
        let procedure = Rc::new(Procedure::user("Square", UserProcedure::default()));
        registry.insert("Square", Rc::clone(&procedure));
        registry.insert("sq", Rc::clone(&procedure));
        assert!(Rc::ptr_eq(&registry.get("SQUARE").unwrap(), &registry.get("Sq").unwrap()));
        assert_eq!(registry.names(|_| true), vec!["square", "sq"]);
        assert!(registry.remove("SQ").is_some());
        assert!(!registry.contains("sq"));
        assert_eq!(procedure.display_name(), "SQUARE");
    }
}
