//! Turtle graphics. Every primitive forwards to the host [`Turtle`](crate::host::Turtle);
//! the interpreter keeps no drawing state of its own.

use super::BuiltinOp;
use super::coerce::{output, take};
use crate::ast::{NumberType, Value};
use crate::host::{PenMode, PenState, TurtleMode};
use crate::procedures::Arity;
use crate::{Error, Interpreter, Outcome};

type Output = Outcome<Option<Value>>;

pub(crate) static OPS: &[BuiltinOp] = &[
    BuiltinOp::function(&["forward", "fd"], Arity::fixed(1), forward),
    BuiltinOp::function(&["back", "bk"], Arity::fixed(1), back),
    BuiltinOp::function(&["left", "lt"], Arity::fixed(1), left),
    BuiltinOp::function(&["right", "rt"], Arity::fixed(1), right),
    BuiltinOp::function(&["setpos"], Arity::fixed(1), setpos),
    BuiltinOp::function(&["setxy"], Arity::fixed(2), setxy),
    BuiltinOp::function(&["setx"], Arity::fixed(1), setx),
    BuiltinOp::function(&["sety"], Arity::fixed(1), sety),
    BuiltinOp::function(&["setheading", "seth"], Arity::fixed(1), setheading),
    BuiltinOp::function(&["home"], Arity::fixed(0), home),
    BuiltinOp::function(&["arc"], Arity::fixed(2), arc),
    BuiltinOp::function(&["pos"], Arity::fixed(0), pos),
    BuiltinOp::function(&["xcor"], Arity::fixed(0), xcor),
    BuiltinOp::function(&["ycor"], Arity::fixed(0), ycor),
    BuiltinOp::function(&["heading"], Arity::fixed(0), heading),
    BuiltinOp::function(&["towards"], Arity::fixed(1), towards),
    BuiltinOp::function(&["showturtle", "st"], Arity::fixed(0), showturtle),
    BuiltinOp::function(&["hideturtle", "ht"], Arity::fixed(0), hideturtle),
    BuiltinOp::function(&["shownp", "shown?"], Arity::fixed(0), shownp),
    BuiltinOp::function(&["clean"], Arity::fixed(0), clean),
    BuiltinOp::function(&["clearscreen", "cs"], Arity::fixed(0), clearscreen),
    BuiltinOp::function(&["pendown", "pd"], Arity::fixed(0), pendown),
    BuiltinOp::function(&["penup", "pu"], Arity::fixed(0), penup),
    BuiltinOp::function(&["pendownp", "pendown?"], Arity::fixed(0), pendownp),
    BuiltinOp::function(&["penpaint", "ppt"], Arity::fixed(0), penpaint),
    BuiltinOp::function(&["penerase", "pe"], Arity::fixed(0), penerase),
    BuiltinOp::function(&["penreverse", "px"], Arity::fixed(0), penreverse),
    BuiltinOp::function(&["penmode"], Arity::fixed(0), penmode),
    BuiltinOp::function(&["setpencolor", "setpc"], Arity::fixed(1), setpencolor),
    BuiltinOp::function(&["pencolor", "pc"], Arity::fixed(0), pencolor),
    BuiltinOp::function(&["setpensize"], Arity::fixed(1), setpensize),
    BuiltinOp::function(&["pensize"], Arity::fixed(0), pensize),
    BuiltinOp::function(&["setbackground", "setbg"], Arity::fixed(1), setbackground),
    BuiltinOp::function(&["background", "bg"], Arity::fixed(0), background),
    BuiltinOp::function(&["fill"], Arity::fixed(0), fill),
    BuiltinOp::function(&["filled"], Arity::fixed(2), filled),
    BuiltinOp::function(&["label"], Arity::fixed(1), label),
    BuiltinOp::function(&["setlabelheight"], Arity::fixed(1), setlabelheight),
    BuiltinOp::function(&["labelsize"], Arity::fixed(0), labelsize),
    BuiltinOp::function(&["scrunch"], Arity::fixed(0), scrunch),
    BuiltinOp::function(&["setscrunch"], Arity::fixed(2), setscrunch),
    BuiltinOp::function(&["wrap"], Arity::fixed(0), wrap),
    BuiltinOp::function(&["window"], Arity::fixed(0), window),
    BuiltinOp::function(&["fence"], Arity::fixed(0), fence),
    BuiltinOp::function(&["turtlemode"], Arity::fixed(0), turtlemode),
    BuiltinOp::function(&["setturtle"], Arity::fixed(1), setturtle),
    BuiltinOp::function(&["turtle"], Arity::fixed(0), turtle),
    BuiltinOp::function(&["turtles"], Arity::fixed(0), turtles),
    BuiltinOp::function(&["bounds"], Arity::fixed(0), bounds),
    BuiltinOp::function(&["mousepos"], Arity::fixed(0), mousepos),
    BuiltinOp::function(&["clickpos"], Arity::fixed(0), clickpos),
    BuiltinOp::function(&["buttonp", "button?"], Arity::fixed(0), buttonp),
    BuiltinOp::function(&["button"], Arity::fixed(0), button),
];

/// Colors selected by number
/// Highest turtle number `setturtle` accepts
const MAX_TURTLES: usize = 1024;

const PALETTE: [&str; 16] = [
    "black", "blue", "lime", "cyan", "red", "magenta", "yellow", "white", "brown", "tan", "green",
    "aquamarine", "salmon", "purple", "orange", "gray",
];

/// A color input: a palette index, an `[r g b]` list of percentages, or a color word
pub(super) fn color_input(interp: &Interpreter, color: &Value) -> Result<String, Error> {
    match color {
        Value::List(channels) => {
            let [r, g, b] = channels.as_slice() else {
                return Err(interp.bad_input("{_PROC_}: Expected list of three numbers"));
            };
            let mut hex = String::from("#");
            for channel in [r, g, b] {
                let percent = interp.expect_number(channel)?.clamp(0.0, 100.0);
                hex.push_str(&format!("{:02x}", (percent * 255.0 / 100.0).round() as u8));
            }
            Ok(hex)
        }
        Value::Array(_) => Err(interp.bad_input("{_PROC_}: Expected color")),
        other if other.as_number().is_some() => {
            let index = interp.expect_integer(other)?;
            Ok(PALETTE[index.rem_euclid(PALETTE.len() as i64) as usize].to_owned())
        }
        other => interp.expect_word(other),
    }
}

fn point((x, y): (NumberType, NumberType)) -> Value {
    Value::List(vec![Value::from(x), Value::from(y)])
}

fn forward(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [distance] = take(interp, args)?;
    let distance = interp.expect_number(&distance)?;
    interp.turtle.move_forward(distance);
    Ok(None)
}

fn back(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [distance] = take(interp, args)?;
    let distance = interp.expect_number(&distance)?;
    interp.turtle.move_forward(-distance);
    Ok(None)
}

fn left(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [degrees] = take(interp, args)?;
    let degrees = interp.expect_number(&degrees)?;
    interp.turtle.turn(-degrees);
    Ok(None)
}

fn right(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [degrees] = take(interp, args)?;
    let degrees = interp.expect_number(&degrees)?;
    interp.turtle.turn(degrees);
    Ok(None)
}

fn setpos(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [position] = take(interp, args)?;
    let (x, y) = interp.expect_point(position)?;
    interp.turtle.set_position(x, y);
    Ok(None)
}

fn setxy(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [x, y] = take(interp, args)?;
    let (x, y) = (interp.expect_number(&x)?, interp.expect_number(&y)?);
    interp.turtle.set_position(x, y);
    Ok(None)
}

fn setx(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [x] = take(interp, args)?;
    let x = interp.expect_number(&x)?;
    let (_, y) = interp.turtle.position();
    interp.turtle.set_position(x, y);
    Ok(None)
}

fn sety(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [y] = take(interp, args)?;
    let y = interp.expect_number(&y)?;
    let (x, _) = interp.turtle.position();
    interp.turtle.set_position(x, y);
    Ok(None)
}

fn setheading(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [degrees] = take(interp, args)?;
    let degrees = interp.expect_number(&degrees)?;
    interp.turtle.set_heading(degrees);
    Ok(None)
}

fn home(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.turtle.home();
    Ok(None)
}

/// `arc angle radius`, centred on the turtle
fn arc(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [angle, radius] = take(interp, args)?;
    let (angle, radius) = (interp.expect_number(&angle)?, interp.expect_number(&radius)?);
    interp.turtle.arc(angle, radius);
    Ok(None)
}

fn pos(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(point(interp.turtle.position()))
}

fn xcor(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.position().0)
}

fn ycor(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.position().1)
}

fn heading(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.heading())
}

fn towards(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [target] = take(interp, args)?;
    let (x, y) = interp.expect_point(target)?;
    output(interp.turtle.towards(x, y))
}

fn showturtle(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.turtle.set_visible(true);
    Ok(None)
}

fn hideturtle(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.turtle.set_visible(false);
    Ok(None)
}

fn shownp(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.visible())
}

fn clean(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.turtle.clean();
    Ok(None)
}

fn clearscreen(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.turtle.clear_screen();
    Ok(None)
}

impl Interpreter {
    fn update_pen(&mut self, update: impl FnOnce(&mut PenState)) {
        let mut pen = self.turtle.pen();
        update(&mut pen);
        self.turtle.set_pen(pen);
    }
}

fn pendown(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.update_pen(|pen| pen.down = true);
    Ok(None)
}

fn penup(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.update_pen(|pen| pen.down = false);
    Ok(None)
}

fn pendownp(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.pen().down)
}

/// Selecting a pen mode also puts the pen down
fn set_pen_mode(interp: &mut Interpreter, mode: PenMode) -> Output {
    interp.update_pen(|pen| {
        pen.mode = mode;
        pen.down = true;
    });
    Ok(None)
}

fn penpaint(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    set_pen_mode(interp, PenMode::Paint)
}

fn penerase(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    set_pen_mode(interp, PenMode::Erase)
}

fn penreverse(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    set_pen_mode(interp, PenMode::Reverse)
}

fn penmode(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.pen().mode.name())
}

fn setpencolor(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [color] = take(interp, args)?;
    let color = color_input(interp, &color)?;
    interp.update_pen(|pen| pen.color = color);
    Ok(None)
}

fn pencolor(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.pen().color)
}

/// A single width, or a `[width height]` pair of which only the width is used
fn setpensize(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [size] = take(interp, args)?;
    let width = match &size {
        Value::List(dimensions) => match dimensions.first() {
            Some(width) => interp.expect_number(width)?,
            None => return Err(interp.bad_input("{_PROC_}: Expected number").into()),
        },
        other => interp.expect_number(other)?,
    };
    if width < 0.0 {
        return Err(interp.bad_input("{_PROC_}: Expected non-negative number").into());
    }
    interp.update_pen(|pen| pen.width = width);
    Ok(None)
}

fn pensize(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    let width = interp.turtle.pen().width;
    output(point((width, width)))
}

fn setbackground(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [color] = take(interp, args)?;
    let color = color_input(interp, &color)?;
    interp.turtle.set_background(color);
    Ok(None)
}

fn background(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.background())
}

fn fill(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    interp.turtle.fill();
    Ok(None)
}

/// `filled color [instructions]`: fill the path the instructions trace
fn filled(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [color, instructions] = take(interp, args)?;
    let color = color_input(interp, &color)?;
    let atoms = interp.expect_instructions(&instructions)?;
    interp.turtle.begin_path();
    let result = interp.execute(&atoms, false);
    interp.turtle.fill_path(&color);
    result.map(|_| None)
}

fn label(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [text] = take(interp, args)?;
    interp.turtle.draw_text(&text.to_print_string());
    Ok(None)
}

fn setlabelheight(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [height] = take(interp, args)?;
    let height = interp.expect_number(&height)?;
    interp.turtle.set_label_height(height);
    Ok(None)
}

fn labelsize(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    let height = interp.turtle.label_height();
    output(point((height, height)))
}

fn scrunch(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(point(interp.turtle.scrunch()))
}

fn setscrunch(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [sx, sy] = take(interp, args)?;
    let (sx, sy) = (interp.expect_number(&sx)?, interp.expect_number(&sy)?);
    if sx == 0.0 || sy == 0.0 {
        return Err(interp.bad_input("{_PROC_}: Scale must not be zero").into());
    }
    interp.turtle.set_scrunch(sx, sy);
    Ok(None)
}

fn set_turtle_mode(interp: &mut Interpreter, mode: TurtleMode) -> Output {
    interp.turtle.set_mode(mode);
    Ok(None)
}

fn wrap(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    set_turtle_mode(interp, TurtleMode::Wrap)
}

fn window(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    set_turtle_mode(interp, TurtleMode::Window)
}

fn fence(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    set_turtle_mode(interp, TurtleMode::Fence)
}

fn turtlemode(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.mode().name())
}

/// Turtles are numbered from 1; selecting a new number creates turtles up to it
fn setturtle(interp: &mut Interpreter, args: Vec<Value>) -> Output {
    let [index] = take(interp, args)?;
    let index = interp.expect_count(&index)?;
    if index == 0 {
        return Err(interp.bad_input("{_PROC_}: Expected positive integer").into());
    }
    if index > MAX_TURTLES {
        return Err(interp.bad_input("{_PROC_}: Turtle number too large").into());
    }
    log::trace!("select turtle {index}");
    interp.turtle.select_turtle(index - 1);
    Ok(None)
}

fn turtle(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.current_turtle() + 1)
}

fn turtles(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.turtle_count())
}

/// `[xmin xmax ymin ymax]` of the visible area
fn bounds(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(Value::from(interp.turtle.bounds().to_vec()))
}

fn mousepos(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(point(interp.turtle.pointer().position))
}

fn clickpos(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(point(interp.turtle.pointer().click))
}

fn buttonp(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(interp.turtle.pointer().buttons != 0)
}

/// Pressed buttons as a bit mask
fn button(interp: &mut Interpreter, _: Vec<Value>) -> Output {
    output(i64::from(interp.turtle.pointer().buttons))
}
