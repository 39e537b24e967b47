//! Reader turning Logo source text into a flat sequence of [`Atom`]s.
//!
//! Reading happens in two passes. The first folds physical lines into logical text:
//! `;` comments are dropped and a `~` ending a physical line joins it with the next one.
//! The second pass tokenizes, recursing into `[...]` lists and `{...}@origin` arrays,
//! whose contents are kept as plain words (instruction lists are read again when they
//! are run). A backslash makes the following character literal everywhere.
//!
//! The reader also decides whether each `-` is subtraction or negation. A minus is unary
//! when it is the first token, when it follows an infix operator or `(`, or when it has
//! whitespace before it but none after it:
//!
//! ```logo
//! print -4         ; negation
//! print 10-4       ; subtraction
//! print sum 10 (-4)
//! ```

use std::fmt;

use nom::{
    IResult, Parser,
    character::complete::{char, one_of},
    combinator::{opt, recognize},
    sequence::{pair, preceded},
};

use crate::ErrorCode;
use crate::MAX_PARSE_DEPTH;
use crate::ast::{ArrayRef, Value, escape_word, is_number, unsigned_number};

/// Characters that form infix operators
pub(crate) const INFIX_CHARS: &str = "+-*/%^=<>";

/// Binary operators, ordered here from the lowest precedence level to the highest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Equal,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    NotEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
}

impl InfixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            InfixOp::Equal => "=",
            InfixOp::Less => "<",
            InfixOp::Greater => ">",
            InfixOp::LessEqual => "<=",
            InfixOp::GreaterEqual => ">=",
            InfixOp::NotEqual => "<>",
            InfixOp::Add => "+",
            InfixOp::Subtract => "-",
            InfixOp::Multiply => "*",
            InfixOp::Divide => "/",
            InfixOp::Remainder => "%",
            InfixOp::Power => "^",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => InfixOp::Equal,
            "<" => InfixOp::Less,
            ">" => InfixOp::Greater,
            "<=" => InfixOp::LessEqual,
            ">=" => InfixOp::GreaterEqual,
            "<>" => InfixOp::NotEqual,
            "+" => InfixOp::Add,
            "-" => InfixOp::Subtract,
            "*" => InfixOp::Multiply,
            "/" => InfixOp::Divide,
            "%" => InfixOp::Remainder,
            "^" => InfixOp::Power,
            _ => return None,
        })
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            InfixOp::Equal
                | InfixOp::Less
                | InfixOp::Greater
                | InfixOp::LessEqual
                | InfixOp::GreaterEqual
                | InfixOp::NotEqual
        )
    }

    pub fn is_additive(self) -> bool {
        matches!(self, InfixOp::Add | InfixOp::Subtract)
    }

    pub fn is_multiplicative(self) -> bool {
        matches!(self, InfixOp::Multiply | InfixOp::Divide | InfixOp::Remainder)
    }
}

/// One token of program text.
///
/// Words keep their prefix: `"abc` is a quoted word, `:abc` a variable reference, and a
/// bare word is a number or a procedure name.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Word(String),
    List(Vec<Value>),
    Array(ArrayRef),
    /// An array literal whose `@` origin is not an integer; evaluating it fails
    BadOrigin { items: Vec<Value>, origin: String },
    Infix(InfixOp),
    OpenParen,
    CloseParen,
    UnaryMinus,
}

impl Atom {
    /// Render back to text that reads as the same atom
    pub fn to_source(&self) -> String {
        match self {
            Atom::Word(text) => word_source(text),
            Atom::List(items) => Value::List(items.clone()).to_source(),
            Atom::Array(array) => Value::Array(array.clone()).to_source(),
            Atom::BadOrigin { items, origin } => {
                format!("{}@{origin}", Value::Array(ArrayRef::new(items.clone(), 1)).to_source())
            }
            Atom::Infix(op) => op.symbol().into(),
            Atom::OpenParen => "(".into(),
            Atom::CloseParen => ")".into(),
            Atom::UnaryMinus => "-".into(),
        }
    }

    /// The atom as a list member, the way `text` reports procedure bodies
    pub fn to_value(&self) -> Value {
        match self {
            Atom::Word(text) => Value::Word(text.clone()),
            Atom::List(items) => Value::List(items.clone()),
            Atom::Array(array) => Value::Array(array.clone()),
            other => Value::Word(other.to_source()),
        }
    }
}

fn word_source(text: &str) -> String {
    if is_number(text) {
        return text.into();
    }
    for prefix in ['"', '\''] {
        if let Some(rest) = text.strip_prefix(prefix) {
            return format!("{prefix}{}", escape_word(rest, "()"));
        }
    }
    match text.strip_prefix(':') {
        Some(rest) => format!(":{}", escape_word(rest, "()+-*/%^=<>")),
        None => escape_word(text, "()+-*/%^=<>"),
    }
}

/// Render an atom sequence as one line of source; negation stays attached to its operand
pub fn render_atoms(atoms: &[Atom]) -> String {
    let mut out = String::new();
    let mut glued = false;
    for atom in atoms {
        if !out.is_empty() && !glued {
            out.push(' ');
        }
        out.push_str(&atom.to_source());
        glued = *atom == Atom::UnaryMinus;
    }
    out
}

/// Convert atoms to list members, folding each negation into the word that follows it
pub fn atoms_to_values(atoms: &[Atom]) -> Vec<Value> {
    let mut values = Vec::with_capacity(atoms.len());
    let mut negate = false;
    for atom in atoms {
        if *atom == Atom::UnaryMinus {
            if negate {
                values.push(Value::Word("-".into()));
            }
            negate = true;
            continue;
        }
        let value = atom.to_value();
        match (negate, value) {
            (true, Value::Word(text)) => values.push(Value::Word(format!("-{text}"))),
            (true, other) => {
                values.push(Value::Word("-".into()));
                values.push(other);
            }
            (false, other) => values.push(other),
        }
        negate = false;
    }
    if negate {
        values.push(Value::Word("-".into()));
    }
    values
}

/// Categorizes structural reading failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A `]` with no list open
    UnexpectedBracket,
    /// A `}` with no array open
    UnexpectedBrace,
    /// A `)` with no `(` open
    UnexpectedParen,
    /// Input ended inside a list
    UnterminatedList,
    /// Input ended inside an array
    UnterminatedArray,
    /// List and array literals nested deeper than [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
}

impl ParseErrorKind {
    /// Message template reported to Logo programs
    pub fn message(self) -> &'static str {
        match self {
            ParseErrorKind::UnexpectedBracket => "Unexpected ']'",
            ParseErrorKind::UnexpectedBrace => "Unexpected '}'",
            ParseErrorKind::UnexpectedParen => "Unexpected ')'",
            ParseErrorKind::UnterminatedList => "Expected ']'",
            ParseErrorKind::UnterminatedArray => "Expected '}'",
            ParseErrorKind::TooDeeplyNested => "Too deeply nested",
        }
    }

    pub fn code(self) -> ErrorCode {
        match self {
            ParseErrorKind::UnexpectedBracket | ParseErrorKind::UnterminatedList => {
                ErrorCode::BadBracket
            }
            ParseErrorKind::UnexpectedBrace | ParseErrorKind::UnterminatedArray => {
                ErrorCode::BadBrace
            }
            ParseErrorKind::UnexpectedParen => ErrorCode::BadParen,
            ParseErrorKind::TooDeeplyNested => ErrorCode::BadInput,
        }
    }
}

/// A structured error describing where reading stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Byte offset into the logical text (comments and continuations removed)
    pub position: usize,
    /// Snippet of the logical text around the failure
    pub context: String,
}

impl ParseError {
    fn at(kind: ParseErrorKind, input: &str, offset: usize) -> Self {
        const BEFORE: usize = 20;
        const MAX_CONTEXT: usize = 60;

        let start = input
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i + BEFORE <= offset)
            .last()
            .unwrap_or(0);
        let mut context: String = input[start..].chars().take(MAX_CONTEXT).collect();
        if start > 0 {
            context.insert_str(0, "[...]");
        }
        ParseError {
            kind,
            position: offset,
            context: context.replace('\n', "\\n"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at position {}\nContext: {}",
            self.kind.message(),
            self.position,
            self.context
        )
    }
}

impl std::error::Error for ParseError {}

/// Read program text into atoms
pub fn parse(source: &str) -> Result<Vec<Atom>, ParseError> {
    let text = logical_text(source);
    Reader::new(&text).atoms()
}

/// Read a list as instructions, e.g. the body given to `run` or `repeat`
pub fn parse_list(items: &[Value]) -> Result<Vec<Atom>, ParseError> {
    parse(&list_text(items))
}

/// Split text into list members the way a `[...]` literal would
pub fn parse_words(source: &str) -> Result<Vec<Value>, ParseError> {
    let text = logical_text(source);
    Reader::new(&text).items(None)
}

/// Source text for the members of a list, without the outer brackets
pub fn list_text(items: &[Value]) -> String {
    items
        .iter()
        .map(Value::to_source)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold physical lines into logical text: strip comments and join continued lines
fn logical_text(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().filter(|&c| c != '\r').peekable();
    let mut in_comment = false;
    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                in_comment = false;
                out.push('\n');
            }
            '~' if chars.peek() == Some(&'\n') => {
                chars.next();
                in_comment = false;
            }
            _ if in_comment => {}
            ';' => in_comment = true,
            '\\' => {
                out.push('\\');
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn is_code_delimiter(c: char) -> bool {
    c.is_whitespace() || "[]{}()".contains(c) || INFIX_CHARS.contains(c)
}

fn is_quoted_delimiter(c: char) -> bool {
    c.is_whitespace() || "[]{}()".contains(c)
}

fn is_list_delimiter(c: char) -> bool {
    c.is_whitespace() || "[]{}".contains(c)
}

/// `@` followed by an optionally signed number; whether it is an integer is checked later
fn array_origin(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), recognize(pair(opt(one_of("+-")), unsigned_number))).parse(input)
}

/// The origin as an index base, if it is a whole number an `i64` holds
fn integer_origin(text: &str) -> Option<i64> {
    let n: f64 = text.parse().ok()?;
    (n.fract() == 0.0 && n.abs() < 9.0e18).then_some(n as i64)
}

struct Reader<'a> {
    text: &'a str,
    rest: &'a str,
    depth: usize,
    open_parens: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Reader {
            text,
            rest: text,
            depth: 0,
            open_parens: 0,
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::at(kind, self.text, self.text.len() - self.rest.len())
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.rest = &self.rest[c.len_utf8()..];
        Some(c)
    }

    /// Skip whitespace, reporting whether there was any
    fn skip_whitespace(&mut self) -> bool {
        let trimmed = self.rest.trim_start();
        let skipped = trimmed.len() != self.rest.len();
        self.rest = trimmed;
        skipped
    }

    fn atoms(&mut self) -> Result<Vec<Atom>, ParseError> {
        let mut atoms = Vec::new();
        loop {
            let leading_space = self.skip_whitespace();
            let Some(c) = self.peek() else {
                return Ok(atoms);
            };
            let atom = match c {
                '[' => Atom::List(self.nested(']')?),
                '{' => self.array()?,
                ']' => return Err(self.error(ParseErrorKind::UnexpectedBracket)),
                '}' => return Err(self.error(ParseErrorKind::UnexpectedBrace)),
                '(' => {
                    self.bump();
                    self.open_parens += 1;
                    Atom::OpenParen
                }
                ')' => {
                    if self.open_parens == 0 {
                        return Err(self.error(ParseErrorKind::UnexpectedParen));
                    }
                    self.bump();
                    self.open_parens -= 1;
                    Atom::CloseParen
                }
                '"' | '\'' => {
                    self.bump();
                    Atom::Word(format!("{c}{}", self.word(is_quoted_delimiter)))
                }
                ':' => {
                    self.bump();
                    Atom::Word(format!(":{}", self.word(is_code_delimiter)))
                }
                c if INFIX_CHARS.contains(c) => self.operator(atoms.last(), leading_space),
                _ => self.number_or_word(),
            };
            atoms.push(atom);
        }
    }

    fn operator(&mut self, previous: Option<&Atom>, leading_space: bool) -> Atom {
        let width = if ["<=", ">=", "<>"].iter().any(|s| self.rest.starts_with(s)) {
            2
        } else {
            1
        };
        let (symbol, rest) = self.rest.split_at(width);
        self.rest = rest;
        let Some(op) = InfixOp::from_symbol(symbol) else {
            return Atom::Word(symbol.into());
        };
        if op == InfixOp::Subtract {
            let trailing_space = self.rest.starts_with(char::is_whitespace);
            let unary = match previous {
                None | Some(Atom::Infix(_) | Atom::OpenParen) => true,
                Some(_) => leading_space && !trailing_space,
            };
            if unary {
                return Atom::UnaryMinus;
            }
        }
        Atom::Infix(op)
    }

    fn number_or_word(&mut self) -> Atom {
        if let Ok((rest, literal)) = unsigned_number(self.rest)
            && rest.chars().next().is_none_or(is_code_delimiter)
        {
            self.rest = rest;
            return Atom::Word(literal.into());
        }
        Atom::Word(self.word(is_code_delimiter))
    }

    fn word(&mut self, is_delimiter: fn(char) -> bool) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                if let Some(escaped) = self.bump() {
                    word.push(escaped);
                }
                continue;
            }
            if is_delimiter(c) {
                break;
            }
            word.push(c);
            self.bump();
        }
        word
    }

    /// Read a bracketed literal whose opening character is next
    fn nested(&mut self, close: char) -> Result<Vec<Value>, ParseError> {
        self.bump();
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(self.error(ParseErrorKind::TooDeeplyNested));
        }
        let items = self.items(Some(close))?;
        self.depth -= 1;
        Ok(items)
    }

    fn array(&mut self) -> Result<Atom, ParseError> {
        let items = self.nested('}')?;
        let Ok((rest, origin)) = array_origin(self.rest) else {
            return Ok(Atom::Array(ArrayRef::new(items, 1)));
        };
        self.rest = rest;
        Ok(match integer_origin(origin) {
            Some(origin) => Atom::Array(ArrayRef::new(items, origin)),
            None => Atom::BadOrigin { items, origin: origin.into() },
        })
    }

    /// Read list members up to `close`, or to the end of input when `close` is `None`
    fn items(&mut self, close: Option<char>) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                return match close {
                    None => Ok(items),
                    Some(']') => Err(self.error(ParseErrorKind::UnterminatedList)),
                    Some(_) => Err(self.error(ParseErrorKind::UnterminatedArray)),
                };
            };
            match c {
                ']' | '}' if close == Some(c) => {
                    self.bump();
                    return Ok(items);
                }
                ']' => return Err(self.error(ParseErrorKind::UnexpectedBracket)),
                '}' => return Err(self.error(ParseErrorKind::UnexpectedBrace)),
                '[' => items.push(Value::List(self.nested(']')?)),
                '{' => items.push(self.array()?.to_value()),
                _ => items.push(Value::Word(self.word(is_list_delimiter))),
            }
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Compact rendering of an atom for table-driven tests
    fn show(atom: &Atom) -> String {
        match atom {
            Atom::UnaryMinus => "neg".into(),
            Atom::Word(text) => text.clone(),
            Atom::List(items) => Value::List(items.clone()).to_string(),
            Atom::Array(array) => Value::Array(array.clone()).to_string(),
            other => other.to_source(),
        }
    }

    fn tokens(source: &str) -> Vec<String> {
        parse(source)
            .unwrap_or_else(|e| panic!("unexpected parse error for {source:?}: {e}"))
            .iter()
            .map(show)
            .collect()
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Table covers every lexical form
    fn test_tokenization_data_driven() {
        let cases: Vec<(&str, Vec<&str>)> = vec![
            // Unary minus disambiguation
            ("-4", vec!["neg", "4"]),
            ("print -4", vec!["print", "neg", "4"]),
            ("- 4 + 10", vec!["neg", "4", "+", "10"]),
            ("10 + - 4", vec!["10", "+", "neg", "4"]),
            ("make \"t 10-4 :t", vec!["make", "\"t", "10", "-", "4", ":t"]),
            ("sum 10 - 4", vec!["sum", "10", "-", "4"]),
            ("sum 10 (-4)", vec!["sum", "10", "(", "neg", "4", ")"]),
            ("10- 4", vec!["10", "-", "4"]),
            ("10 -4", vec!["10", "neg", "4"]),
            ("3*-2", vec!["3", "*", "neg", "2"]),
            (":a-:b", vec![":a", "-", ":b"]),
            // Operators
            ("a<=b", vec!["a", "<=", "b"]),
            ("3<>4", vec!["3", "<>", "4"]),
            ("2^3>=8", vec!["2", "^", "3", ">=", "8"]),
            (":x*2", vec![":x", "*", "2"]),
            ("7%2", vec!["7", "%", "2"]),
            // Numbers and words
            ("1.5e3", vec!["1.5e3"]),
            ("1e-3", vec!["1e-3"]),
            (".5", vec![".5"]),
            ("1foo", vec!["1foo"]),
            (".eq", vec![".eq"]),
            ("foo1", vec!["foo1"]),
            ("print \"a+b", vec!["print", "\"a+b"]),
            ("(word \"a \"b)", vec!["(", "word", "\"a", "\"b", ")"]),
            ("'quoted", vec!["'quoted"]),
            ("print \"", vec!["print", "\""]),
            // Comments and continuations
            ("print 1 ; comment\nprint 2", vec!["print", "1", "print", "2"]),
            ("print 1;comment ~\n 2", vec!["print", "1", "2"]),
            ("print ~\n 5", vec!["print", "5"]),
            ("print \"a\\~\nprint 2", vec!["print", "\"a~", "print", "2"]),
            ("print \"a\\;b", vec!["print", "\"a;b"]),
            ("print 1\r\nprint 2", vec!["print", "1", "print", "2"]),
            // Lists and arrays
            ("[a b [c d e] f]", vec!["[a b [c d e] f]"]),
            ("[]", vec!["[]"]),
            ("[fd 10-4 (sum 1 2)]", vec!["[fd 10-4 (sum 1 2)]"]),
            ("{1 2}@0", vec!["{1 2}@0"]),
            ("{1}@-2", vec!["{1}@-2"]),
            ("{1}@+3", vec!["{1}@3"]),
            ("{1}@1.5", vec!["{1}@1.5"]),
            ("{1}@-2.5 x", vec!["{1}@-2.5", "x"]),
            ("{1}@1e1", vec!["{1}@10"]),
            ("[{1}@.5]", vec!["[{1}@.5]"]),
            ("{1}@x", vec!["{1}", "@x"]),
            ("[{a [b]}@0 c]", vec!["[{a [b]}@0 c]"]),
        ];
        for (i, (source, expected)) in cases.iter().enumerate() {
            assert_eq!(tokens(source), *expected, "#{}: {source:?}", i + 1);
        }
    }

    #[test]
    fn test_escapes() {
        let atoms = parse("\"a\\ b [x\\ y z] \\(").unwrap();
        assert_eq!(atoms[0], Atom::Word("\"a b".into()));
        assert_eq!(
            atoms[1],
            Atom::List(vec![Value::Word("x y".into()), Value::Word("z".into())])
        );
        assert_eq!(atoms[2], Atom::Word("(".into()));
        assert_eq!(atoms[2].to_source(), "\\(");
    }

    #[test]
    fn test_structural_errors() {
        let deep = format!(
            "{}{}",
            "[".repeat(MAX_PARSE_DEPTH + 1),
            "]".repeat(MAX_PARSE_DEPTH + 1)
        );
        let cases: Vec<(&str, ParseErrorKind)> = vec![
            ("]", ParseErrorKind::UnexpectedBracket),
            ("print [a]]", ParseErrorKind::UnexpectedBracket),
            ("[a", ParseErrorKind::UnterminatedList),
            ("[a [b]", ParseErrorKind::UnterminatedList),
            ("{a", ParseErrorKind::UnterminatedArray),
            ("}", ParseErrorKind::UnexpectedBrace),
            (")", ParseErrorKind::UnexpectedParen),
            ("(print 1))", ParseErrorKind::UnexpectedParen),
            ("[a }", ParseErrorKind::UnexpectedBrace),
            ("{a ]", ParseErrorKind::UnexpectedBracket),
            (deep.as_str(), ParseErrorKind::TooDeeplyNested),
        ];
        for (i, (source, kind)) in cases.iter().enumerate() {
            let err = parse(source).unwrap_err();
            assert_eq!(err.kind, *kind, "#{}: {source:?}", i + 1);
        }
        assert_eq!(ParseErrorKind::UnterminatedList.code(), ErrorCode::BadBracket);
        assert_eq!(ParseErrorKind::UnexpectedParen.code(), ErrorCode::BadParen);
        // An unclosed paren is left for the evaluator to report
        assert!(parse("(print 1").is_ok());
    }

    #[test]
    fn test_parse_list_reads_words_as_code() {
        let list = parse_words("print 1+2 [a b]").unwrap();
        assert_eq!(list.len(), 3);
        let atoms = parse_list(&list).unwrap();
        let rendered: Vec<String> = atoms.iter().map(show).collect();
        assert_eq!(rendered, vec!["print", "1", "+", "2", "[a b]"]);
        assert_eq!(parse_words("a ]").unwrap_err().kind, ParseErrorKind::UnexpectedBracket);
    }

    #[test]
    fn test_rendering_round_trip() {
        let sources = [
            "print -4",
            "make \"t 10 - 4",
            "print sum 10 (-4)",
            "if :x < 3 [print [a b]] print \"a\\ b",
            "show :n * -:m",
        ];
        for source in sources {
            let atoms = parse(source).unwrap();
            let rendered = render_atoms(&atoms);
            assert_eq!(parse(&rendered).unwrap(), atoms, "{source:?} -> {rendered:?}");
        }
        let atoms = parse("print 3 * -4").unwrap();
        let values = atoms_to_values(&atoms);
        assert_eq!(list_text(&values), "print 3 * -4");
    }
}
