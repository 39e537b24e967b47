//! This module defines the Logo value model. [`Value`] covers Logo's three data types:
//! words (kept as either [`Value::Number`] or [`Value::Word`] depending on how they were
//! produced), lists and arrays. Lists are plain vectors, so cloning a value copies every
//! nested list, while arrays live behind an [`ArrayRef`] handle that clones by reference.
//! Equality follows Logo's `equalp`: words compare numerically when either side is a
//! number, lists compare element by element and arrays compare by identity.
//!
//! The number grammar shared by the reader and by word coercion also lives here, together
//! with the three renderings of a value: `show` form ([`fmt::Display`]), `print` form
//! ([`Value::to_print_string`]) and source form ([`Value::to_source`]), which escapes
//! characters so that the text reads back as the same value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use nom::{
    IResult, Parser,
    branch::alt,
    character::complete::{char, digit0, digit1, one_of},
    combinator::{all_consuming, opt, recognize},
    sequence::pair,
};

/// Type alias for number values in interpreter
pub(crate) type NumberType = f64;

/// Characters that always need escaping when a word is rendered back to source
const ALWAYS_ESCAPED: &str = "[]{}\\;";

/// Recognize an unsigned number: digits with an optional fraction, or a bare fraction,
/// either one followed by an optional exponent.
pub(crate) fn unsigned_number(input: &str) -> IResult<&str, &str> {
    recognize((
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)
}

/// Parse a word as a number, accepting an optional leading minus sign
pub fn parse_number(text: &str) -> Option<NumberType> {
    let (_, literal) = all_consuming(recognize(pair(opt(char('-')), unsigned_number)))
        .parse(text)
        .ok()?;
    literal.parse().ok()
}

/// Check whether a word reads as a number
pub fn is_number(text: &str) -> bool {
    parse_number(text).is_some()
}

/// Render a number the way Logo prints it
pub(crate) fn format_number(n: NumberType) -> String {
    if n == 0.0 {
        "0".into()
    } else if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).into()
    } else {
        format!("{n}")
    }
}

/// Core value type in interpreter
///
/// To build values, use the conversions and helpers:
/// - `val(42)` for numbers, `val("abc")` for words, `nil()` for the empty list
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![val("a"), val([1, 2])])` for mixed lists
#[derive(Clone)]
pub enum Value {
    /// A word holding a number
    Number(NumberType),
    /// A word holding text (which may still read as a number)
    Word(String),
    /// Lists (copied whenever the value is cloned)
    List(Vec<Value>),
    /// Arrays (shared whenever the value is cloned)
    Array(ArrayRef),
}

/// Storage behind an array handle
#[derive(Debug)]
pub struct LogoArray {
    items: Vec<Value>,
    origin: i64,
}

/// Shared, mutable handle to a fixed-length array with an index origin
#[derive(Clone)]
pub struct ArrayRef(Rc<RefCell<LogoArray>>);

/// Reasons an array store is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    OutOfBounds,
    Circular,
}

impl ArrayRef {
    pub fn new(items: Vec<Value>, origin: i64) -> Self {
        ArrayRef(Rc::new(RefCell::new(LogoArray { items, origin })))
    }

    /// Create an array of `size` empty lists
    pub fn with_size(size: usize, origin: i64) -> Self {
        Self::new(vec![Value::List(Vec::new()); size], origin)
    }

    pub fn origin(&self) -> i64 {
        self.0.borrow().origin
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current contents
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    fn slot(&self, index: i64) -> Option<usize> {
        let array = self.0.borrow();
        let offset = index.checked_sub(array.origin)?;
        usize::try_from(offset)
            .ok()
            .filter(|&slot| slot < array.items.len())
    }

    pub fn get(&self, index: i64) -> Option<Value> {
        let slot = self.slot(index)?;
        self.0.borrow().items.get(slot).cloned()
    }

    /// Store `value` at `index`, refusing values that contain this array
    pub fn set(&self, index: i64, value: Value) -> Result<(), StoreError> {
        let slot = self.slot(index).ok_or(StoreError::OutOfBounds)?;
        if value.contains_array(self) {
            return Err(StoreError::Circular);
        }
        self.0.borrow_mut().items[slot] = value;
        Ok(())
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Arrays are equal only to themselves
impl PartialEq for ArrayRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let array = self.0.borrow();
        write!(f, "Array@{}{:?}", array.origin, array.items)
    }
}

impl Value {
    /// Numeric reading of a word; lists and arrays have none
    pub fn as_number(&self) -> Option<NumberType> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Word(text) => parse_number(text),
            Value::List(_) | Value::Array(_) => None,
        }
    }

    /// Text of a word; numbers render the way Logo prints them
    pub fn word_text(&self) -> Option<String> {
        match self {
            Value::Number(n) => Some(format_number(*n)),
            Value::Word(text) => Some(text.clone()),
            Value::List(_) | Value::Array(_) => None,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self, Value::Number(_) | Value::Word(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Empty word or empty list
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Number(_) => false,
            Value::Word(text) => text.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Array(array) => array.is_empty(),
        }
    }

    /// True if `target` is this value or is reachable through it
    pub fn contains_array(&self, target: &ArrayRef) -> bool {
        self.reaches(target, &mut Vec::new())
    }

    /// `searched` holds arrays already walked, so shared members are visited once
    fn reaches(&self, target: &ArrayRef, searched: &mut Vec<*const RefCell<LogoArray>>) -> bool {
        match self {
            Value::Array(array) => {
                if array.ptr_eq(target) {
                    return true;
                }
                let ptr = Rc::as_ptr(&array.0);
                if searched.contains(&ptr) {
                    return false;
                }
                searched.push(ptr);
                array.0.borrow().items.iter().any(|v| v.reaches(target, searched))
            }
            Value::List(items) => items.iter().any(|v| v.reaches(target, searched)),
            Value::Number(_) | Value::Word(_) => false,
        }
    }

    /// `print` form: like `show`, but a top-level list loses its brackets
    pub fn to_print_string(&self) -> String {
        match self {
            Value::List(items) => join_items(items, Rendering::Show),
            other => other.to_string(),
        }
    }

    /// Source form: renders with escapes so the text reads back as the same value
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        render(self, Rendering::Source, &mut out);
        out
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Rendering {
    Show,
    Source,
}

fn join_items(items: &[Value], rendering: Rendering) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        render(item, rendering, &mut out);
    }
    out
}

fn render(value: &Value, rendering: Rendering, out: &mut String) {
    match value {
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::Word(text) if rendering == Rendering::Source => {
            out.push_str(&escape_word(text, ""));
        }
        Value::Word(text) => out.push_str(text),
        Value::List(items) => {
            out.push('[');
            out.push_str(&join_items(items, rendering));
            out.push(']');
        }
        Value::Array(array) => {
            out.push('{');
            out.push_str(&join_items(&array.to_vec(), rendering));
            out.push('}');
            if array.origin() != 1 {
                out.push('@');
                out.push_str(&array.origin().to_string());
            }
        }
    }
}

/// Backslash-escape whitespace, brackets, braces, backslashes, semicolons and any
/// character in `extra`
pub(crate) fn escape_word(text: &str, extra: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_whitespace() || ALWAYS_ESCAPED.contains(c) || extra.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Word(s) => write!(f, "Word(\"{s}\")"),
            Value::List(items) => {
                write!(f, "List(")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::Array(array) => write!(f, "{array:?}"),
        }
    }
}

/// `show` form
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        render(self, Rendering::Show, &mut out);
        f.write_str(&out)
    }
}

/// Logo `equalp` semantics
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::List(_) | Value::Array(_), _) | (_, Value::List(_) | Value::Array(_)) => false,
            (Value::Number(a), Value::Number(b)) => a == b,
            (left, right) => {
                let (left_number, right_number) = (left.as_number(), right.as_number());
                if left_number.is_some() || right_number.is_some() {
                    left_number == right_number
                } else {
                    left.word_text() == right.word_text()
                }
            }
        }
    }
}

impl From<NumberType> for Value {
    fn from(n: NumberType) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as NumberType)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as NumberType)
    }
}

/// Logo predicates answer 1 or 0
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Word(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Word(s)
    }
}

impl From<ArrayRef> for Value {
    fn from(array: ArrayRef) -> Self {
        Value::Array(array)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Build a value from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// The empty list
pub fn nil() -> Value {
    Value::List(Vec::new())
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_number_grammar() {
        let cases: Vec<(&str, Option<f64>)> = vec![
            ("42", Some(42.0)),
            ("-4", Some(-4.0)),
            ("3.25", Some(3.25)),
            ("1.", Some(1.0)),
            (".5", Some(0.5)),
            ("-.5", Some(-0.5)),
            ("1e3", Some(1000.0)),
            ("2.5E-1", Some(0.25)),
            ("1e+2", Some(100.0)),
            ("", None),
            ("-", None),
            (".", None),
            ("1e", None),
            ("12a", None),
            ("--1", None),
            ("+1", None),
            ("abc", None),
        ];
        for (i, (text, expected)) in cases.iter().enumerate() {
            assert_eq!(parse_number(text), *expected, "#{}: {text:?}", i + 1);
        }
    }

    #[test]
    fn test_equality() {
        let a = ArrayRef::new(vec![val(1)], 1);
        let b = ArrayRef::new(vec![val(1)], 1);
        let cases: Vec<(Value, Value, bool)> = vec![
            (val(1), val("1"), true),
            (val("1.0"), val("1"), true),
            (val("abc"), val("abc"), true),
            (val("abc"), val("ABC"), false),
            (val(1), val("abc"), false),
            (val("1e1"), val(10), true),
            (val([1, 2]), val(["1", "2"]), true),
            (val([1, 2]), val([1]), false),
            (nil(), val(""), false),
            (val(vec![val("a"), val([1])]), val(vec![val("a"), val([1])]), true),
            (Value::Array(a.clone()), Value::Array(a.clone()), true),
            (Value::Array(a), Value::Array(b), false),
        ];
        for (i, (left, right, expected)) in cases.iter().enumerate() {
            assert_eq!(left == right, *expected, "#{}: {left:?} vs {right:?}", i + 1);
        }
    }

    #[test]
    fn test_renderings() {
        let array = ArrayRef::new(vec![val("a"), val([1, 2])], 0);
        let cases: Vec<(Value, &str, &str, &str)> = vec![
            (val(3), "3", "3", "3"),
            (val(0.1 + 0.2), "0.30000000000000004", "0.30000000000000004", "0.30000000000000004"),
            (val(-0.0), "0", "0", "0"),
            (val("hello"), "hello", "hello", "hello"),
            (val("a b"), "a b", "a b", "a\\ b"),
            (val(vec![val("a"), val(["b", "c"])]), "[a [b c]]", "a [b c]", "[a [b c]]"),
            (nil(), "[]", "", "[]"),
            (Value::Array(array), "{a [1 2]}@0", "{a [1 2]}@0", "{a [1 2]}@0"),
            (Value::Array(ArrayRef::new(vec![val(1)], 1)), "{1}", "{1}", "{1}"),
            (val(vec![val("["), val("x;y")]), "[[ x;y]", "[ x;y", "[\\[ x\\;y]"),
        ];
        for (i, (value, show, print, source)) in cases.iter().enumerate() {
            assert_eq!(value.to_string(), *show, "#{} show", i + 1);
            assert_eq!(value.to_print_string(), *print, "#{} print", i + 1);
            assert_eq!(value.to_source(), *source, "#{} source", i + 1);
        }
    }

    #[test]
    fn test_lists_copy_and_arrays_alias() {
        let array = ArrayRef::new(vec![val(1), val(2)], 1);
        let original = val(vec![val([1, 2]), Value::Array(array.clone())]);
        let mut copy = original.clone();

        if let Value::List(items) = &mut copy {
            items[0] = val("changed");
        }
        assert_eq!(original, val(vec![val([1, 2]), Value::Array(array.clone())]));

        if let Value::List(items) = &copy
            && let Value::Array(shared) = &items[1]
        {
            shared.set(1, val(99)).unwrap();
        }
        assert_eq!(array.get(1).unwrap(), val(99));
    }

    #[test]
    fn test_array_store_rules() {
        let outer = ArrayRef::new(vec![nil(), nil()], 0);
        let inner = ArrayRef::with_size(1, 1);
        outer.set(0, Value::Array(inner.clone())).unwrap();

        assert_eq!(outer.set(2, val(1)), Err(StoreError::OutOfBounds));
        assert_eq!(outer.set(-1, val(1)), Err(StoreError::OutOfBounds));
        assert_eq!(outer.set(1, Value::Array(outer.clone())), Err(StoreError::Circular));
        assert_eq!(
            inner.set(1, val(vec![Value::Array(outer.clone())])),
            Err(StoreError::Circular)
        );
        assert_eq!(inner.set(1, val("fine")), Ok(()));
        assert_eq!(outer.get(0).unwrap().to_string(), "{fine}");
        assert_eq!(inner.get(0), None);
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_cycle_check_visits_shared_arrays_once() {
        // Each level holds the one below twice: 2^64 paths, 64 distinct arrays
        let mut level = ArrayRef::new(vec![val(0)], 1);
        for _ in 0..64 {
            let shared = Value::Array(level.clone());
            level = ArrayRef::new(vec![shared.clone(), shared], 1);
        }
        let top = Value::Array(level);
        let unrelated = ArrayRef::new(vec![], 1);
        assert!(!top.contains_array(&unrelated));

        let holder = ArrayRef::new(vec![nil()], 1);
        assert_eq!(holder.set(1, top.clone()), Ok(()));
        assert!(!top.contains_array(&holder));
        assert!(Value::Array(holder.clone()).contains_array(&holder));
    }
}
