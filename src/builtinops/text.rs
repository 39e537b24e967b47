//! Console text: printing, reading lines and the stream's presentation properties.

use std::time::Instant;

use super::BuiltinOp;
use super::coerce::{output, take};
use super::graphics::color_input;
use crate::ast::Value;
use crate::procedures::Arity;
use crate::reader;
use crate::scheduler::RunState;
use crate::{Interpreter, Outcome};

type Output = Outcome<Option<Value>>;

pub(crate) static OPS: &[BuiltinOp] = &[
    BuiltinOp::function(&["print", "pr"], Arity::variadic(0, 1), print),
    BuiltinOp::function(&["type"], Arity::variadic(0, 1), type_),
    BuiltinOp::function(&["show"], Arity::variadic(0, 1), show),
    BuiltinOp::function(&["readlist", "rl"], Arity::range(0, 0, 1), readlist),
    BuiltinOp::function(&["readword", "rw"], Arity::range(0, 0, 1), readword),
    BuiltinOp::function(&["cleartext", "ct"], Arity::fixed(0), cleartext),
    BuiltinOp::function(&["settextcolor", "settc"], Arity::fixed(1), settextcolor),
    BuiltinOp::function(&["textcolor"], Arity::fixed(0), textcolor),
    BuiltinOp::function(&["settextsize"], Arity::fixed(1), settextsize),
    BuiltinOp::function(&["textsize"], Arity::fixed(0), textsize),
    BuiltinOp::function(&["setfont"], Arity::fixed(1), setfont),
    BuiltinOp::function(&["font"], Arity::fixed(0), font),
];

fn joined(args: &[Value], render: fn(&Value) -> String) -> String {
    args.iter().map(render).collect::<Vec<_>>().join(" ")
}

/// Lists lose their outer brackets
fn print(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let text = joined(&args, Value::to_print_string);
    interp.stream.write(&format!("{text}\n"));
    Ok(None)
}

/// `print` without the newline
fn type_(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let text = joined(&args, Value::to_print_string);
    interp.stream.write(&text);
    Ok(None)
}

fn show(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let text = joined(&args, ToString::to_string);
    interp.stream.write(&format!("{text}\n"));
    Ok(None)
}

impl Interpreter {
    /// Suspend on the stream until a line arrives; `None` at end of input
    fn read_line(&mut self, args: &[Value]) -> Option<String> {
        let prompt = args.first().map(Value::to_print_string);
        let resume = self.state;
        self.set_state(RunState::SuspendedOnInput);
        let line = self.stream.read(prompt.as_deref());
        self.set_state(resume);
        self.last_yield = Instant::now();
        log::trace!("read {line:?}");
        line
    }
}

/// A line read as a list of words
fn readlist(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let Some(line) = interp.read_line(&args) else {
        return output(Value::List(Vec::new()));
    };
    let words = reader::parse_words(&line).map_err(|err| interp.parse_error(err))?;
    output(Value::List(words))
}

/// A line read as a single word, spaces included
fn readword(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    match interp.read_line(&args) {
        Some(line) => output(line),
        None => output(Value::List(Vec::new())),
    }
}

fn cleartext(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.stream.clear();
    Ok(None)
}

fn settextcolor(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [color] = take(interp, args)?;
    let color = color_input(interp, &color)?;
    interp.stream.set_color(color);
    Ok(None)
}

fn textcolor(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.stream.color())
}

fn settextsize(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [size] = take(interp, args)?;
    let size = interp.expect_number(&size)?;
    interp.stream.set_text_size(size);
    Ok(None)
}

fn textsize(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.stream.text_size())
}

fn setfont(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [font] = take(interp, args)?;
    let font = interp.expect_word(&font)?;
    interp.stream.set_font(font);
    Ok(None)
}

fn font(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.stream.font())
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::super::testing::{Want::*, check, interpreter};
    use crate::ErrorCode;
    use crate::ast::val;

    #[test]
    fn test_printing() {
        check(vec![
            ("print [a [b c]]", Prints("a [b c]\n")),
            ("pr \"hello", Prints("hello\n")),
            ("(print 1 [2 3] \"x)", Prints("1 2 3 x\n")),
            ("(print)", Prints("\n")),
            ("print []", Prints("\n")),
            ("print {a b}", Prints("{a b}\n")),
            ("print listtoarray [1 2] ", Prints("{1 2}\n")),
            ("type \"a type \"b", Prints("ab")),
            ("(type 1 2) print 3", Prints("1 23\n")),
            ("show [a [b c]]", Prints("[a [b c]]\n")),
            ("(show \"a [b])", Prints("a [b]\n")),
            ("show {1 2}@0", Prints("{1 2}@0\n")),
            ("print 3 / 2", Prints("1.5\n")),
            ("print", Fails(ErrorCode::NotEnoughInputs)),
        ]);
    }

    #[test]
    fn test_stream_properties() {
        check(vec![
            ("settextcolor \"red textcolor", Shows("red")),
            ("settc 4 textcolor", Shows("red")),
            ("settc [100 0 0] textcolor", Shows("#ff0000")),
            ("textcolor", Shows("black")),
            ("settextsize 20 textsize", Shows("20")),
            ("settextsize \"big", Fails(ErrorCode::BadInput)),
            ("setfont \"serif font", Shows("serif")),
            ("setfont [a b]", Fails(ErrorCode::BadInput)),
            ("print 1 cleartext print 2", Prints("2\n")),
            ("type 1 ct", Prints("")),
        ]);
    }

    #[test]
    fn test_reading() {
        let cases = vec![
            ("readlist", Some("a [b c] 3"), Some("[a [b c] 3]"), None),
            ("rl", None, Some("[]"), None),
            ("(readlist \"name?)", Some("x"), Some("[x]"), Some("name?")),
            ("readword", Some("two words"), Some("two words"), None),
            ("(rw [Your name?])", Some("Ada"), Some("Ada"), Some("Your name?")),
            ("readword", None, Some("[]"), None),
            ("first readlist", Some("  padded  "), Some("padded"), None),
        ];
        for (i, (source, input, shows, prompt)) in cases.into_iter().enumerate() {
            let (mut interp, stream) = interpreter();
            if let Some(line) = input {
                stream.push_input(line);
            }
            let value = interp.evaluate(source).unwrap();
            assert_eq!(value.map(|v| v.to_string()).as_deref(), shows, "#{}: {source:?}", i + 1);
            assert_eq!(stream.last_prompt().as_deref(), prompt, "#{}: {source:?}", i + 1);
        }

        let (mut interp, stream) = interpreter();
        stream.push_input("[unclosed");
        let err = interp.evaluate("readlist").unwrap_err();
        assert_eq!(err.code, Some(ErrorCode::BadBracket));

        let (mut interp, stream) = interpreter();
        stream.push_input("5");
        assert_eq!(interp.evaluate("readword + 1").unwrap(), Some(val(6)));
    }
}
