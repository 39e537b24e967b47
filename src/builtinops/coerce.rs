//! Input coercion shared by the primitive groups.
//!
//! Failures are BAD_INPUT errors attributed to the executing primitive.

use std::rc::Rc;

use crate::ast::{ArrayRef, NumberType, Value};
use crate::procedures::Procedure;
use crate::reader::{self, Atom};
use crate::{Error, ErrorCode, Interpreter, Outcome};

/// Move a validated input vector into a fixed-size array
pub(crate) fn take<const N: usize>(interp: &Interpreter, args: Vec<Value>) -> Result<[Value; N], Error> {
    let count = args.len();
    args.try_into().map_err(|_| {
        let name = interp.call_stack.last().cloned().unwrap_or_default();
        interp.arity_error(
            if count < N {
                crate::procedures::ArityError::NotEnough
            } else {
                crate::procedures::ArityError::TooMany
            },
            &name,
        )
    })
}

/// Output a value
pub(crate) fn output(value: impl Into<Value>) -> Outcome<Option<Value>> {
    Ok(Some(value.into()))
}

impl Interpreter {
    pub(crate) fn bad_input(&self, template: &str) -> Error {
        self.error(ErrorCode::BadInput, template)
    }

    pub(crate) fn expect_number(&self, value: &Value) -> Result<NumberType, Error> {
        value
            .as_number()
            .ok_or_else(|| self.bad_input("{_PROC_}: Expected number"))
    }

    pub(crate) fn expect_integer(&self, value: &Value) -> Result<i64, Error> {
        let n = self.expect_number(value)?;
        if n.fract() != 0.0 || !n.is_finite() {
            return Err(self.bad_input("{_PROC_}: Expected integer"));
        }
        Ok(n as i64)
    }

    /// A count or size: a non-negative integer
    pub(crate) fn expect_count(&self, value: &Value) -> Result<usize, Error> {
        usize::try_from(self.expect_integer(value)?)
            .map_err(|_| self.bad_input("{_PROC_}: Expected non-negative integer"))
    }

    pub(crate) fn expect_word(&self, value: &Value) -> Result<String, Error> {
        value
            .word_text()
            .ok_or_else(|| self.bad_input("{_PROC_}: Expected string"))
    }

    pub(crate) fn expect_list(&self, value: Value) -> Result<Vec<Value>, Error> {
        match value {
            Value::List(items) => Ok(items),
            _ => Err(self.bad_input("{_PROC_}: Expected list")),
        }
    }

    pub(crate) fn expect_array(&self, value: &Value) -> Result<ArrayRef, Error> {
        match value {
            Value::Array(array) => Ok(array.clone()),
            _ => Err(self.bad_input("{_PROC_}: Expected array")),
        }
    }

    /// Booleans are non-zero/zero numbers or the words `true` and `false`
    pub(crate) fn expect_bool(&self, value: &Value) -> Result<bool, Error> {
        if let Some(n) = value.as_number() {
            return Ok(n != 0.0);
        }
        match value.word_text() {
            Some(text) if text.eq_ignore_ascii_case("true") => Ok(true),
            Some(text) if text.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(self.bad_input("{_PROC_}: Expected true or false")),
        }
    }

    /// Instructions given as a list, or as a word holding program text
    pub(crate) fn expect_instructions(&self, value: &Value) -> Result<Vec<Atom>, Error> {
        let parsed = match value {
            Value::List(items) => reader::parse_list(items),
            Value::Word(text) => reader::parse(text),
            Value::Number(_) => reader::parse(&value.to_string()),
            Value::Array(_) => return Err(self.bad_input("{_PROC_}: Expected list")),
        };
        parsed.map_err(|err| self.parse_error(err))
    }

    /// An `[x y]` coordinate pair
    pub(crate) fn expect_point(&self, value: Value) -> Result<(NumberType, NumberType), Error> {
        match self.expect_list(value)?.as_slice() {
            [x, y] => Ok((self.expect_number(x)?, self.expect_number(y)?)),
            _ => Err(self.bad_input("{_PROC_}: Expected list of two numbers")),
        }
    }

    /// A procedure known by `name`
    pub(crate) fn expect_procedure(&self, name: &str) -> Result<Rc<Procedure>, Error> {
        self.procedures
            .get(name)
            .ok_or_else(|| self.error_with(ErrorCode::BadProc, "Don't know how to {name:U}", &[("name", name)]))
    }

    /// A variable or procedure name, or a list of them
    pub(crate) fn expect_names(&self, value: &Value) -> Result<Vec<String>, Error> {
        match value {
            Value::List(items) => items.iter().map(|item| self.expect_word(item)).collect(),
            other => Ok(vec![self.expect_word(other)?]),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ast::{nil, val};

    #[test]
    fn test_coercions() {
        let mut interp = Interpreter::default();
        interp.call_stack.push("DEMO".into());

        assert_eq!(interp.expect_number(&val("2.5")).unwrap(), 2.5);
        assert_eq!(interp.expect_integer(&val(4)).unwrap(), 4);
        assert_eq!(interp.expect_count(&val("3")).unwrap(), 3);
        assert_eq!(interp.expect_word(&val(12)).unwrap(), "12");
        assert!(interp.expect_bool(&val("TRUE")).unwrap());
        assert!(!interp.expect_bool(&val(0)).unwrap());
        assert_eq!(interp.expect_point(val([3, -4])).unwrap(), (3.0, -4.0));
        assert_eq!(interp.expect_names(&val(["a", "b"])).unwrap(), vec!["a", "b"]);
        assert_eq!(interp.expect_instructions(&val("fd 10")).unwrap().len(), 2);
        assert_eq!(interp.expect_procedure("FD").unwrap().name, "forward");

        let failures: Vec<(Result<(), Error>, &str)> = vec![
            (interp.expect_number(&val("abc")).map(drop), "DEMO: Expected number"),
            (interp.expect_number(&nil()).map(drop), "DEMO: Expected number"),
            (interp.expect_integer(&val(1.5)).map(drop), "DEMO: Expected integer"),
            (interp.expect_count(&val(-1)).map(drop), "DEMO: Expected non-negative integer"),
            (interp.expect_word(&nil()).map(drop), "DEMO: Expected string"),
            (interp.expect_list(val("a")).map(drop), "DEMO: Expected list"),
            (interp.expect_array(&nil()).map(drop), "DEMO: Expected array"),
            (interp.expect_bool(&val("maybe")).map(drop), "DEMO: Expected true or false"),
            (interp.expect_point(val([1])).map(drop), "DEMO: Expected list of two numbers"),
        ];
        assert_eq!(
            interp.expect_procedure("frob").unwrap_err().code,
            Some(ErrorCode::BadProc)
        );
        for (i, (result, message)) in failures.into_iter().enumerate() {
            let err = result.unwrap_err();
            assert_eq!(err.message, message, "#{}", i + 1);
            assert_eq!(err.code, Some(ErrorCode::BadInput), "#{}", i + 1);
        }

        let [a, b] = take::<2>(&interp, vec![val(1), val(2)]).unwrap();
        assert_eq!((a, b), (val(1), val(2)));
        assert_eq!(
            take::<2>(&interp, vec![val(1)]).unwrap_err().code,
            Some(ErrorCode::NotEnoughInputs)
        );
    }
}
