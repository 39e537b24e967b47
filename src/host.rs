//! Host collaborators.
//!
//! The interpreter never draws or does I/O itself. Turtle commands go to a [`Turtle`],
//! text goes to and comes from a [`Stream`], and an [`EventLoop`] is given control
//! whenever a run suspends: on voluntary yields, on `wait`, and around reads. All three
//! are called synchronously from the interpreter's single thread; a host that needs to
//! process its own events does so inside these callbacks.
//!
//! [`HeadlessTurtle`], [`BufferStream`] and [`ThreadEventLoop`] are complete
//! implementations without a display, used by tests and the REPL demo.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::scheduler::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenMode {
    Paint,
    Erase,
    Reverse,
}

impl PenMode {
    pub fn name(self) -> &'static str {
        match self {
            PenMode::Paint => "paint",
            PenMode::Erase => "erase",
            PenMode::Reverse => "reverse",
        }
    }
}

/// What happens when the turtle leaves the visible area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurtleMode {
    Wrap,
    Window,
    Fence,
}

impl TurtleMode {
    pub fn name(self) -> &'static str {
        match self {
            TurtleMode::Wrap => "wrap",
            TurtleMode::Window => "window",
            TurtleMode::Fence => "fence",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PenState {
    pub down: bool,
    pub mode: PenMode,
    pub width: f64,
    pub color: String,
}

impl Default for PenState {
    fn default() -> Self {
        PenState {
            down: true,
            mode: PenMode::Paint,
            width: 1.0,
            color: "#000000".into(),
        }
    }
}

/// Pointer and touch introspection, in turtle coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pointer {
    pub position: (f64, f64),
    pub click: (f64, f64),
    pub buttons: u32,
}

/// Turtle graphics back end.
///
/// Headings are in degrees, clockwise from north; positions are turtle coordinates with
/// the origin at the centre of the screen.
pub trait Turtle {
    fn move_forward(&mut self, distance: f64);
    fn turn(&mut self, degrees: f64);
    fn position(&self) -> (f64, f64);
    fn set_position(&mut self, x: f64, y: f64);
    fn heading(&self) -> f64;
    fn set_heading(&mut self, degrees: f64);
    /// Draw an arc centred on the turtle without moving it
    fn arc(&mut self, angle: f64, radius: f64);

    /// Heading that would point the turtle at `(x, y)`
    fn towards(&self, x: f64, y: f64) -> f64 {
        let (from_x, from_y) = self.position();
        normalize_heading((x - from_x).atan2(y - from_y).to_degrees())
    }

    fn home(&mut self) {
        self.set_position(0.0, 0.0);
        self.set_heading(0.0);
    }

    /// Erase the drawing without moving the turtle
    fn clean(&mut self);

    fn clear_screen(&mut self) {
        self.clean();
        self.home();
    }

    fn pen(&self) -> PenState;
    fn set_pen(&mut self, pen: PenState);
    fn background(&self) -> String;
    fn set_background(&mut self, color: String);

    fn begin_path(&mut self);
    fn fill_path(&mut self, color: &str);
    /// Flood fill from the turtle position
    fn fill(&mut self);

    fn select_turtle(&mut self, index: usize);
    fn current_turtle(&self) -> usize;
    fn turtle_count(&self) -> usize;

    fn scrunch(&self) -> (f64, f64);
    fn set_scrunch(&mut self, sx: f64, sy: f64);
    /// Visible area as `[xmin, xmax, ymin, ymax]`
    fn bounds(&self) -> [f64; 4];

    fn visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
    fn mode(&self) -> TurtleMode;
    fn set_mode(&mut self, mode: TurtleMode);

    fn draw_text(&mut self, text: &str);
    fn label_height(&self) -> f64;
    fn set_label_height(&mut self, height: f64);

    fn pointer(&self) -> Pointer {
        Pointer::default()
    }
}

/// Text console back end
pub trait Stream {
    fn write(&mut self, text: &str);
    /// Wait for a line of input; `None` at end of input
    fn read(&mut self, prompt: Option<&str>) -> Option<String>;
    fn clear(&mut self);
    fn color(&self) -> String;
    fn set_color(&mut self, color: String);
    fn font(&self) -> String;
    fn set_font(&mut self, font: String);
    fn text_size(&self) -> f64;
    fn set_text_size(&mut self, size: f64);
}

/// Receives control whenever a run suspends
pub trait EventLoop {
    /// Voluntary yield after a time slice; return to resume immediately
    fn yield_now(&mut self) {}

    /// Suspend for `duration` (the `wait` primitive)
    fn wait(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn state_changed(&mut self, _state: RunState) {}
}

/// Event loop for hosts without one of their own
#[derive(Debug, Default)]
pub struct ThreadEventLoop;

impl EventLoop for ThreadEventLoop {
    fn yield_now(&mut self) {
        std::thread::yield_now();
    }
}

pub(crate) fn normalize_heading(degrees: f64) -> f64 {
    let heading = degrees.rem_euclid(360.0);
    if heading == 360.0 { 0.0 } else { heading }
}

/// Sine and cosine of a heading, exact on the compass points
fn sin_cos_degrees(degrees: f64) -> (f64, f64) {
    let heading = normalize_heading(degrees);
    match heading {
        0.0 => (0.0, 1.0),
        90.0 => (1.0, 0.0),
        180.0 => (0.0, -1.0),
        270.0 => (-1.0, 0.0),
        _ => heading.to_radians().sin_cos(),
    }
}

#[derive(Debug, Clone, Copy)]
struct TurtleState {
    x: f64,
    y: f64,
    heading: f64,
    visible: bool,
}

impl Default for TurtleState {
    fn default() -> Self {
        TurtleState {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            visible: true,
        }
    }
}

/// A turtle that keeps state but draws nothing
#[derive(Debug)]
pub struct HeadlessTurtle {
    turtles: Vec<TurtleState>,
    current: usize,
    pen: PenState,
    background: String,
    mode: TurtleMode,
    scrunch: (f64, f64),
    width: f64,
    height: f64,
    label_height: f64,
}

impl HeadlessTurtle {
    pub fn new(width: f64, height: f64) -> Self {
        HeadlessTurtle {
            turtles: vec![TurtleState::default()],
            current: 0,
            pen: PenState::default(),
            background: "#ffffff".into(),
            mode: TurtleMode::Wrap,
            scrunch: (1.0, 1.0),
            width,
            height,
            label_height: 14.0,
        }
    }

    fn state(&self) -> &TurtleState {
        &self.turtles[self.current]
    }

    fn state_mut(&mut self) -> &mut TurtleState {
        &mut self.turtles[self.current]
    }
}

impl Default for HeadlessTurtle {
    fn default() -> Self {
        Self::new(600.0, 600.0)
    }
}

impl Turtle for HeadlessTurtle {
    fn move_forward(&mut self, distance: f64) {
        let (sin, cos) = sin_cos_degrees(self.state().heading);
        let state = self.state_mut();
        state.x += distance * sin;
        state.y += distance * cos;
    }

    fn turn(&mut self, degrees: f64) {
        let state = self.state_mut();
        state.heading = normalize_heading(state.heading + degrees);
    }

    fn position(&self) -> (f64, f64) {
        (self.state().x, self.state().y)
    }

    fn set_position(&mut self, x: f64, y: f64) {
        let state = self.state_mut();
        state.x = x;
        state.y = y;
    }

    fn heading(&self) -> f64 {
        self.state().heading
    }

    fn set_heading(&mut self, degrees: f64) {
        self.state_mut().heading = normalize_heading(degrees);
    }

    fn arc(&mut self, _angle: f64, _radius: f64) {}

    fn clean(&mut self) {}

    fn pen(&self) -> PenState {
        self.pen.clone()
    }

    fn set_pen(&mut self, pen: PenState) {
        self.pen = pen;
    }

    fn background(&self) -> String {
        self.background.clone()
    }

    fn set_background(&mut self, color: String) {
        self.background = color;
    }

    fn begin_path(&mut self) {}

    fn fill_path(&mut self, _color: &str) {}

    fn fill(&mut self) {}

    fn select_turtle(&mut self, index: usize) {
        if index >= self.turtles.len() {
            self.turtles.resize(index + 1, TurtleState::default());
        }
        self.current = index;
    }

    fn current_turtle(&self) -> usize {
        self.current
    }

    fn turtle_count(&self) -> usize {
        self.turtles.len()
    }

    fn scrunch(&self) -> (f64, f64) {
        self.scrunch
    }

    fn set_scrunch(&mut self, sx: f64, sy: f64) {
        self.scrunch = (sx, sy);
    }

    fn bounds(&self) -> [f64; 4] {
        let (sx, sy) = self.scrunch;
        let (half_width, half_height) = (self.width / 2.0 / sx, self.height / 2.0 / sy);
        [-half_width, half_width, -half_height, half_height]
    }

    fn visible(&self) -> bool {
        self.state().visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.state_mut().visible = visible;
    }

    fn mode(&self) -> TurtleMode {
        self.mode
    }

    fn set_mode(&mut self, mode: TurtleMode) {
        self.mode = mode;
    }

    fn draw_text(&mut self, _text: &str) {}

    fn label_height(&self) -> f64 {
        self.label_height
    }

    fn set_label_height(&mut self, height: f64) {
        self.label_height = height;
    }
}

#[derive(Debug)]
struct BufferState {
    input: VecDeque<String>,
    output: String,
    last_prompt: Option<String>,
    color: String,
    font: String,
    size: f64,
}

/// In-memory stream; clones share the same buffers so a caller can keep a handle
#[derive(Debug, Clone)]
pub struct BufferStream(Rc<RefCell<BufferState>>);

impl Default for BufferStream {
    fn default() -> Self {
        BufferStream(Rc::new(RefCell::new(BufferState {
            input: VecDeque::new(),
            output: String::new(),
            last_prompt: None,
            color: "black".into(),
            font: "monospace".into(),
            size: 13.0,
        })))
    }
}

impl BufferStream {
    /// Queue a line to be returned by a later read
    pub fn push_input(&self, line: impl Into<String>) {
        self.0.borrow_mut().input.push_back(line.into());
    }

    pub fn output(&self) -> String {
        self.0.borrow().output.clone()
    }

    pub fn take_output(&self) -> String {
        std::mem::take(&mut self.0.borrow_mut().output)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.0.borrow().last_prompt.clone()
    }
}

impl Stream for BufferStream {
    fn write(&mut self, text: &str) {
        self.0.borrow_mut().output.push_str(text);
    }

    fn read(&mut self, prompt: Option<&str>) -> Option<String> {
        let mut state = self.0.borrow_mut();
        state.last_prompt = prompt.map(str::to_owned);
        state.input.pop_front()
    }

    fn clear(&mut self) {
        let mut state = self.0.borrow_mut();
        state.output.clear();
        state.last_prompt = None;
    }

    fn color(&self) -> String {
        self.0.borrow().color.clone()
    }

    fn set_color(&mut self, color: String) {
        self.0.borrow_mut().color = color;
    }

    fn font(&self) -> String {
        self.0.borrow().font.clone()
    }

    fn set_font(&mut self, font: String) {
        self.0.borrow_mut().font = font;
    }

    fn text_size(&self) -> f64 {
        self.0.borrow().size
    }

    fn set_text_size(&mut self, size: f64) {
        self.0.borrow_mut().size = size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_geometry() {
        let mut turtle = HeadlessTurtle::default();
        let steps: Vec<(&str, f64, (f64, f64), f64)> = vec![
            ("forward", 100.0, (0.0, 100.0), 0.0),
            ("right", 90.0, (0.0, 100.0), 90.0),
            ("forward", 50.0, (50.0, 100.0), 90.0),
            ("right", 90.0, (50.0, 100.0), 180.0),
            ("forward", 100.0, (50.0, 0.0), 180.0),
            ("left", 270.0, (50.0, 0.0), 270.0),
            ("forward", 50.0, (0.0, 0.0), 270.0),
            ("left", -450.0, (0.0, 0.0), 0.0),
        ];
        for (i, (command, amount, position, heading)) in steps.into_iter().enumerate() {
            match command {
                "forward" => turtle.move_forward(amount),
                "right" => turtle.turn(amount),
                "left" => turtle.turn(-amount),
                _ => unreachable!(),
            }
            assert_eq!(turtle.position(), position, "step #{}", i + 1);
            assert_eq!(turtle.heading(), heading, "step #{}", i + 1);
        }
        assert_eq!(turtle.towards(10.0, 0.0), 90.0);
        assert_eq!(turtle.towards(0.0, -10.0), 180.0);
    }

    #[test]
    fn test_multiple_turtles_keep_separate_state() {
        let mut turtle = HeadlessTurtle::default();
        turtle.move_forward(10.0);
        turtle.select_turtle(2);
        assert_eq!(turtle.turtle_count(), 3);
        assert_eq!(turtle.position(), (0.0, 0.0));
        turtle.set_visible(false);
        turtle.select_turtle(0);
        assert_eq!(turtle.position(), (0.0, 10.0));
        assert!(turtle.visible());
        turtle.clear_screen();
        assert_eq!(turtle.position(), (0.0, 0.0));
    }

    #[test]
    fn test_buffer_stream_shares_state() {
        let stream = BufferStream::default();
        let mut writer = stream.clone();
        writer.write("hello ");
        writer.write("world");
        stream.push_input("typed");
        assert_eq!(writer.read(Some("?")), Some("typed".into()));
        assert_eq!(writer.read(None), None);
        assert_eq!(stream.last_prompt(), None);
        assert_eq!(stream.take_output(), "hello world");
        assert_eq!(stream.output(), "");
    }
}
