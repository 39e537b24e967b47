//! LogoXP - an interpreter for a Logo-family language
//!
//! This crate reads Logo program text, evaluates it with Logo's operator precedence and
//! spacing-sensitive unary minus, runs user-defined procedures with optional and rest
//! inputs over dynamically scoped variables, and drives a turtle-graphics host as a side
//! effect.
//!
//! ```logo
//! to square :size
//!   repeat 4 [forward :size right 90]
//! end
//! square 50
//! print sum 10 (-4)            ; 6
//! make "a {1 2 3}@0            ; array with origin 0
//! ```
//!
//! ## Value Model
//!
//! Logo has words (strings or numbers), lists and arrays:
//! - Lists have value semantics: `make` and procedure inputs never share structure
//! - Arrays are mutable and shared by reference; storing an array inside itself fails
//! - Words compare numerically when either side is a number, otherwise exactly
//!
//! ## Execution
//!
//! An [`interpreter::Interpreter`] owns all state (variables, procedures, property lists)
//! and talks to its host through the [`host::Turtle`], [`host::Stream`] and
//! [`host::EventLoop`] traits. Top-level runs are queued first-in first-out and advanced
//! one statement at a time by [`interpreter::Interpreter::step`]; `run` and `evaluate`
//! drive the queue to completion for convenience.
//!
//! ## Modules
//!
//! - `ast`: Logo values, arrays, number grammar and rendering
//! - `reader`: text to atom sequence, including unary-minus disambiguation
//! - `scope`: dynamic variable frames and property lists
//! - `procedures`: arity rules, procedure registry, definition parsing and rendering
//! - `evaluator`: statement compiler and evaluator
//! - `scheduler`: run queue and the step state machine
//! - `host`: turtle, stream and event-loop collaborators
//! - `builtinops`: the primitive procedure library

use std::fmt;

use crate::ast::Value;

/// Maximum nesting of list and array literals accepted by the reader
pub const MAX_PARSE_DEPTH: usize = 256;

/// Default number of nested user-procedure calls before evaluation fails
pub const DEFAULT_RECURSION_LIMIT: usize = 1000;

/// Tag carried by runtime errors and caught by `catch "error`
pub const ERROR_TAG: &str = "ERROR";

/// Stable numeric error codes reported to Logo programs through `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadInput,
    NoOutput,
    NotEnoughInputs,
    TooManyInputs,
    BadOutput,
    MissingParen,
    BadVar,
    BadParen,
    AlreadyDefined,
    ThrowError,
    IsPrimitive,
    BadProc,
    NoTest,
    BadBracket,
    BadBrace,
    UserGenerated,
    MissingSpace,
}

impl ErrorCode {
    pub fn number(self) -> i32 {
        match self {
            ErrorCode::BadInput => 4,
            ErrorCode::NoOutput => 5,
            ErrorCode::NotEnoughInputs => 6,
            ErrorCode::TooManyInputs => 8,
            ErrorCode::BadOutput => 9,
            ErrorCode::MissingParen => 10,
            ErrorCode::BadVar => 11,
            ErrorCode::BadParen => 12,
            ErrorCode::AlreadyDefined => 15,
            ErrorCode::ThrowError => 21,
            ErrorCode::IsPrimitive => 22,
            ErrorCode::BadProc => 24,
            ErrorCode::NoTest => 25,
            ErrorCode::BadBracket => 26,
            ErrorCode::BadBrace => 27,
            ErrorCode::UserGenerated => 35,
            ErrorCode::MissingSpace => 39,
        }
    }
}

/// A catchable Logo failure: runtime errors and uncaught throws alike.
///
/// Runtime errors carry the [`ERROR_TAG`] tag, so `catch "error [...]` intercepts them.
/// `procedure` names the procedure that was executing when the error was raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub tag: String,
    pub value: Option<Value>,
    pub message: String,
    pub code: Option<ErrorCode>,
    pub procedure: Option<String>,
}

impl Error {
    /// Create a runtime error with the default tag
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Error {
            tag: ERROR_TAG.into(),
            value: None,
            message: message.into(),
            code: Some(code),
            procedure: None,
        }
    }

    /// Create a runtime error that has no numeric code
    pub fn uncoded(message: impl Into<String>) -> Self {
        Error {
            code: None,
            ..Error::new(ErrorCode::BadInput, message)
        }
    }

    /// Create the error raised by `throw`
    pub fn thrown(tag: impl Into<String>, value: Option<Value>, message: impl Into<String>) -> Self {
        Error {
            tag: tag.into(),
            value,
            message: message.into(),
            code: None,
            procedure: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn in_procedure(mut self, procedure: Option<&str>) -> Self {
        self.procedure = procedure.map(str::to_owned);
        self
    }

    /// The numeric code as Logo reports it; `-1` when the error has none
    pub fn code_number(&self) -> i32 {
        self.code.map_or(-1, ErrorCode::number)
    }

    pub fn has_default_tag(&self) -> bool {
        self.tag == ERROR_TAG
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

/// Non-local control flowing out of evaluation.
///
/// Ordinary completion is the `Ok` side of [`Outcome`]; everything that unwinds is a
/// `Signal`. `Output` is consumed by the nearest user-procedure frame, `Throw` by a
/// matching `catch`, and `Cancelled` only by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Throw(Error),
    Output(Option<Value>),
    Cancelled,
}

impl From<Error> for Signal {
    fn from(error: Error) -> Self {
        Signal::Throw(error)
    }
}

/// Result of evaluating anything that may unwind
pub type Outcome<T> = Result<T, Signal>;

/// Expand a message template.
///
/// `{name}` is replaced by the parameter `name`, `{name:U}` and `{name:L}` by its upper-
/// and lower-cased forms, and `{_PROC_}` by the executing procedure. Unknown
/// placeholders are kept verbatim.
pub fn format_message(template: &str, params: &[(&str, &str)], procedure: Option<&str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let placeholder = &after[..end];
        let (key, case) = match placeholder.split_once(':') {
            Some((key, case)) => (key, Some(case)),
            None => (placeholder, None),
        };
        let replacement = if key == "_PROC_" {
            Some(procedure.unwrap_or_default())
        } else {
            params.iter().find(|(name, _)| *name == key).map(|(_, v)| *v)
        };
        match (replacement, case) {
            (Some(text), Some("U")) => out.push_str(&text.to_uppercase()),
            (Some(text), Some("L")) => out.push_str(&text.to_lowercase()),
            (Some(text), _) => out.push_str(text),
            (None, _) => {
                out.push('{');
                out.push_str(placeholder);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod host;
pub mod interpreter;
pub mod procedures;
pub mod reader;
pub mod scheduler;
pub mod scope;

pub use interpreter::{Config, Interpreter};
