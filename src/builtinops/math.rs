//! Arithmetic, comparison, trigonometry, random numbers and bitwise operations.
//!
//! Trigonometric primitives work in degrees; the `rad` variants take radians.
//! Bitwise primitives operate on 32-bit signed integers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::BuiltinOp;
use super::coerce::{output, take};
use crate::ast::{NumberType, Value};
use crate::procedures::Arity;
use crate::{Error, Interpreter, Outcome};

type Output = Outcome<Option<Value>>;

pub(crate) static OPS: &[BuiltinOp] = &[
    BuiltinOp::function(&["sum"], Arity::variadic(0, 2), sum),
    BuiltinOp::function(&["difference"], Arity::fixed(2), difference),
    BuiltinOp::function(&["minus"], Arity::fixed(1), minus),
    BuiltinOp::function(&["product"], Arity::variadic(0, 2), product),
    BuiltinOp::function(&["quotient"], Arity::range(1, 2, 2), quotient),
    BuiltinOp::function(&["remainder"], Arity::fixed(2), remainder),
    BuiltinOp::function(&["modulo"], Arity::fixed(2), modulo),
    BuiltinOp::function(&["int"], Arity::fixed(1), int),
    BuiltinOp::function(&["round"], Arity::fixed(1), round),
    BuiltinOp::function(&["sqrt"], Arity::fixed(1), sqrt),
    BuiltinOp::function(&["power"], Arity::fixed(2), power),
    BuiltinOp::function(&["exp"], Arity::fixed(1), exp),
    BuiltinOp::function(&["log10"], Arity::fixed(1), log10),
    BuiltinOp::function(&["ln"], Arity::fixed(1), ln),
    BuiltinOp::function(&["sin"], Arity::fixed(1), sin),
    BuiltinOp::function(&["cos"], Arity::fixed(1), cos),
    BuiltinOp::function(&["tan"], Arity::fixed(1), tan),
    BuiltinOp::function(&["arctan"], Arity::range(1, 1, 2), arctan),
    BuiltinOp::function(&["radsin"], Arity::fixed(1), radsin),
    BuiltinOp::function(&["radcos"], Arity::fixed(1), radcos),
    BuiltinOp::function(&["radtan"], Arity::fixed(1), radtan),
    BuiltinOp::function(&["radarctan"], Arity::range(1, 1, 2), radarctan),
    BuiltinOp::function(&["iseq"], Arity::fixed(2), iseq),
    BuiltinOp::function(&["rseq"], Arity::fixed(3), rseq),
    BuiltinOp::function(&["lessp", "less?"], Arity::fixed(2), lessp),
    BuiltinOp::function(&["greaterp", "greater?"], Arity::fixed(2), greaterp),
    BuiltinOp::function(&["lessequalp", "lessequal?"], Arity::fixed(2), lessequalp),
    BuiltinOp::function(&["greaterequalp", "greaterequal?"], Arity::fixed(2), greaterequalp),
    BuiltinOp::function(&["random"], Arity::range(1, 1, 2), random),
    BuiltinOp::function(&["rerandom"], Arity::range(0, 0, 1), rerandom),
    BuiltinOp::function(&["form"], Arity::fixed(3), form),
    BuiltinOp::function(&["bitand"], Arity::variadic(0, 2), bitand),
    BuiltinOp::function(&["bitor"], Arity::variadic(0, 2), bitor),
    BuiltinOp::function(&["bitxor"], Arity::variadic(0, 2), bitxor),
    BuiltinOp::function(&["bitnot"], Arity::fixed(1), bitnot),
    BuiltinOp::function(&["ashift"], Arity::fixed(2), ashift),
    BuiltinOp::function(&["lshift"], Arity::fixed(2), lshift),
];

impl Interpreter {
    fn expect_numbers(&self, args: &[Value]) -> Result<Vec<NumberType>, Error> {
        args.iter().map(|arg| self.expect_number(arg)).collect()
    }

    fn expect_bits(&self, value: &Value) -> Result<i32, Error> {
        i32::try_from(self.expect_integer(value)?)
            .map_err(|_| self.bad_input("{_PROC_}: Expected 32-bit integer"))
    }

    fn expect_divisor(&self, value: &Value) -> Result<NumberType, Error> {
        let n = self.expect_number(value)?;
        if n == 0.0 {
            return Err(self.bad_input("{_PROC_}: Division by zero"));
        }
        Ok(n)
    }
}

fn unary(interp: &Interpreter, args: Vec<Value>, f: fn(NumberType) -> NumberType) -> Output {
    let [x] = take(interp, args)?;
    output(f(interp.expect_number(&x)?))
}

fn binary(interp: &Interpreter, args: Vec<Value>, f: fn(NumberType, NumberType) -> NumberType) -> Output {
    let [a, b] = take(interp, args)?;
    output(f(interp.expect_number(&a)?, interp.expect_number(&b)?))
}

fn compare(interp: &Interpreter, args: Vec<Value>, f: fn(&NumberType, &NumberType) -> bool) -> Output {
    let [a, b] = take(interp, args)?;
    output(f(&interp.expect_number(&a)?, &interp.expect_number(&b)?))
}

pub(crate) fn sum(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    output(interp.expect_numbers(&args)?.into_iter().sum::<NumberType>())
}

pub(crate) fn difference(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    binary(interp, args, |a, b| a - b)
}

pub(crate) fn minus(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, |x| -x)
}

pub(crate) fn product(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    output(interp.expect_numbers(&args)?.into_iter().product::<NumberType>())
}

/// `(quotient x)` is the reciprocal of `x`
pub(crate) fn quotient(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    match args.as_slice() {
        [x] => output(1.0 / interp.expect_divisor(x)?),
        [a, b] => {
            let a = interp.expect_number(a)?;
            output(a / interp.expect_divisor(b)?)
        }
        _ => Ok(None),
    }
}

/// Remainder with the sign of the dividend
pub(crate) fn remainder(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [a, b] = take(interp, args)?;
    let a = interp.expect_number(&a)?;
    output(a % interp.expect_divisor(&b)?)
}

/// Remainder with the sign of the divisor
fn modulo(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [a, b] = take(interp, args)?;
    let a = interp.expect_number(&a)?;
    let b = interp.expect_divisor(&b)?;
    let r = a % b;
    output(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r })
}

fn int(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, NumberType::trunc)
}

fn round(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, NumberType::round)
}

fn sqrt(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [x] = take(interp, args)?;
    match interp.expect_number(&x)? {
        x if x < 0.0 => Err(interp.bad_input("{_PROC_}: Expected non-negative number").into()),
        x => output(x.sqrt()),
    }
}

pub(crate) fn power(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    binary(interp, args, NumberType::powf)
}

fn exp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, NumberType::exp)
}

fn logarithm(interp: &Interpreter, args: Vec<Value>, f: fn(NumberType) -> NumberType) -> Output {
    let [x] = take(interp, args)?;
    match interp.expect_number(&x)? {
        x if x <= 0.0 => Err(interp.bad_input("{_PROC_}: Expected positive number").into()),
        x => output(f(x)),
    }
}

fn log10(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    logarithm(interp, args, NumberType::log10)
}

fn ln(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    logarithm(interp, args, NumberType::ln)
}

fn sin(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, |x| x.to_radians().sin())
}

fn cos(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, |x| x.to_radians().cos())
}

fn tan(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, |x| x.to_radians().tan())
}

fn radsin(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, NumberType::sin)
}

fn radcos(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, NumberType::cos)
}

fn radtan(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    unary(interp, args, NumberType::tan)
}

/// `arctan x` or `(arctan x y)`, the angle of the point `[x y]`
fn radians_arctan(interp: &Interpreter, args: &[Value]) -> Result<NumberType, Error> {
    let numbers = interp.expect_numbers(args)?;
    Ok(match numbers.as_slice() {
        [x, y] => y.atan2(*x),
        [x] => x.atan(),
        _ => 0.0,
    })
}

fn arctan(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    output(radians_arctan(interp, &args)?.to_degrees())
}

fn radarctan(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    output(radians_arctan(interp, &args)?)
}

/// Integers from `from` to `to` inclusive, counting down when `to` is smaller
fn iseq(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [from, to] = take(interp, args)?;
    let (from, to) = (interp.expect_integer(&from)?, interp.expect_integer(&to)?);
    let items: Vec<Value> = if from <= to {
        (from..=to).map(Value::from).collect()
    } else {
        (to..=from).rev().map(Value::from).collect()
    };
    output(Value::List(items))
}

/// `count` evenly spaced numbers from `from` to `to`
fn rseq(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [from, to, count] = take(interp, args)?;
    let (from, to) = (interp.expect_number(&from)?, interp.expect_number(&to)?);
    let count = interp.expect_count(&count)?;
    let step = if count > 1 {
        (to - from) / (count - 1) as NumberType
    } else {
        0.0
    };
    let items = (0..count).map(|i| Value::from(from + step * i as NumberType)).collect();
    output(Value::List(items))
}

pub(crate) fn lessp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    compare(interp, args, NumberType::lt)
}

pub(crate) fn greaterp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    compare(interp, args, NumberType::gt)
}

pub(crate) fn lessequalp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    compare(interp, args, NumberType::le)
}

pub(crate) fn greaterequalp(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    compare(interp, args, NumberType::ge)
}

/// `random n` is in `0..n`; `(random a b)` is in `a..=b`
fn random(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let bounds = args
        .iter()
        .map(|arg| interp.expect_integer(arg))
        .collect::<Result<Vec<_>, _>>()?;
    let range = match bounds.as_slice() {
        [n] if *n > 0 => 0..=n - 1,
        [low, high] if low <= high => *low..=*high,
        _ => return Err(interp.bad_input("{_PROC_}: Expected a non-empty range").into()),
    };
    output(interp.rng.gen_range(range))
}

/// Restart the random sequence from a seed, 0 when none is given
fn rerandom(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let seed = match args.first() {
        Some(seed) => interp.expect_integer(seed)?,
        None => 0,
    };
    interp.rng = StdRng::seed_from_u64(seed as u64);
    Ok(None)
}

/// Right-aligned in `width` columns with `precision` decimals
fn form(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [number, width, precision] = take(interp, args)?;
    let number = interp.expect_number(&number)?;
    let width = interp.expect_count(&width)?;
    let precision = interp.expect_count(&precision)?;
    output(format!("{number:>width$.precision$}"))
}

fn fold_bits(interp: &Interpreter, args: &[Value], identity: i32, f: fn(i32, i32) -> i32) -> Output {
    let mut acc = identity;
    for arg in args {
        acc = f(acc, interp.expect_bits(arg)?);
    }
    output(i64::from(acc))
}

fn bitand(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    fold_bits(interp, &args, -1, |a, b| a & b)
}

fn bitor(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    fold_bits(interp, &args, 0, |a, b| a | b)
}

fn bitxor(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    fold_bits(interp, &args, 0, |a, b| a ^ b)
}

fn bitnot(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [x] = take(interp, args)?;
    output(i64::from(!interp.expect_bits(&x)?))
}

fn shift_inputs(interp: &Interpreter, args: Vec<Value>) -> Result<(i32, i32), Error> {
    let [value, distance] = take(interp, args)?;
    Ok((interp.expect_bits(&value)?, interp.expect_bits(&distance)?))
}

/// Shift left for positive distances, right with sign extension for negative ones
fn ashift(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let (value, distance) = shift_inputs(interp, args)?;
    let shifted = if distance >= 0 {
        value.wrapping_shl(distance.unsigned_abs())
    } else {
        value.wrapping_shr(distance.unsigned_abs())
    };
    output(i64::from(shifted))
}

/// Like `ashift`, but right shifts fill with zeros
fn lshift(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let (value, distance) = shift_inputs(interp, args)?;
    let bits = value as u32;
    let shifted = if distance >= 0 {
        bits.wrapping_shl(distance.unsigned_abs())
    } else {
        bits.wrapping_shr(distance.unsigned_abs())
    };
    output(i64::from(shifted as i32))
}
