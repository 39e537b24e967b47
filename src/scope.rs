//! Dynamic variable scopes and property lists.
//!
//! Variables live in a stack of frames. Frame 0 is the global frame and is never popped;
//! every user-procedure call pushes a frame for its inputs and locals. Lookup walks from
//! the innermost frame outwards, so a procedure sees the locals of whoever called it.
//! Names are case-insensitive and stored lower-cased.
//!
//! Property lists are a separate namespace of named key/value bags.

use indexmap::IndexMap;

use crate::ast::Value;

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// One level of the dynamic scope stack.
///
/// A cell holding `None` was declared with `local` or `global` but not yet assigned.
#[derive(Debug, Default)]
struct Frame {
    cells: IndexMap<String, Option<Value>>,
    /// Result of the last `test` executed in this frame
    test: Option<bool>,
}

/// What a variable lookup found
#[derive(Debug, PartialEq)]
pub enum Lookup<'a> {
    Bound(&'a Value),
    /// Declared in some frame but never assigned
    Unassigned,
    Unknown,
}

#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![Frame::default()],
        }
    }

    /// Number of frames including the global frame
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pop the innermost frame; the global frame stays
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn get(&self, name: &str) -> Lookup<'_> {
        let key = normalize(name);
        for frame in self.frames.iter().rev() {
            if let Some(cell) = frame.cells.get(&key) {
                return match cell {
                    Some(value) => Lookup::Bound(value),
                    None => Lookup::Unassigned,
                };
            }
        }
        Lookup::Unknown
    }

    /// Assign to the nearest frame holding `name`, or create a global
    pub fn set(&mut self, name: &str, value: Value) {
        let key = normalize(name);
        let index = self
            .frames
            .iter()
            .rposition(|frame| frame.cells.contains_key(&key))
            .unwrap_or(0);
        self.frames[index].cells.insert(key, Some(value));
    }

    /// Give `name` a fresh, valueless cell in the innermost frame
    pub fn declare_local(&mut self, name: &str) {
        self.innermost().cells.insert(normalize(name), None);
    }

    /// Bind `name` in the innermost frame
    pub fn set_local(&mut self, name: &str, value: Value) {
        self.innermost().cells.insert(normalize(name), Some(value));
    }

    /// Declare `name` in the global frame without a value, unless it is already there
    pub fn declare_global(&mut self, name: &str) {
        self.global_frame().cells.entry(normalize(name)).or_insert(None);
    }

    /// Remove a global variable
    pub fn erase_global(&mut self, name: &str) -> bool {
        self.global_frame().cells.shift_remove(&normalize(name)).is_some()
    }

    /// Names of global variables that hold a value, in creation order
    pub fn global_names(&self) -> Vec<String> {
        self.frames[0]
            .cells
            .iter()
            .filter(|(_, cell)| cell.is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn clear_globals(&mut self) {
        self.global_frame().cells.clear();
    }

    pub fn set_test(&mut self, result: bool) {
        self.innermost().test = Some(result);
    }

    pub fn test(&self) -> Option<bool> {
        self.frames.last().and_then(|frame| frame.test)
    }

    fn innermost(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn global_frame(&mut self) -> &mut Frame {
        &mut self.frames[0]
    }
}

/// Property lists: plist name to ordered property name/value pairs.
#[derive(Debug, Default)]
pub struct PropertyLists {
    lists: IndexMap<String, IndexMap<String, Value>>,
}

impl PropertyLists {
    pub fn put(&mut self, plist: &str, property: &str, value: Value) {
        self.lists
            .entry(normalize(plist))
            .or_default()
            .insert(normalize(property), value);
    }

    pub fn get(&self, plist: &str, property: &str) -> Option<&Value> {
        self.lists.get(&normalize(plist))?.get(&normalize(property))
    }

    /// Remove one property; a plist left empty disappears
    pub fn remove(&mut self, plist: &str, property: &str) {
        let key = normalize(plist);
        if let Some(properties) = self.lists.get_mut(&key) {
            properties.shift_remove(&normalize(property));
            if properties.is_empty() {
                self.lists.shift_remove(&key);
            }
        }
    }

    /// The plist flattened as `[name value name value ...]`
    pub fn flatten(&self, plist: &str) -> Vec<Value> {
        self.lists
            .get(&normalize(plist))
            .into_iter()
            .flatten()
            .flat_map(|(name, value)| [Value::Word(name.clone()), value.clone()])
            .collect()
    }

    pub fn contains(&self, plist: &str) -> bool {
        self.lists.contains_key(&normalize(plist))
    }

    pub fn erase(&mut self, plist: &str) {
        self.lists.shift_remove(&normalize(plist));
    }

    pub fn names(&self) -> Vec<String> {
        self.lists.keys().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
