//! Interpreter instance state.
//!
//! An [`Interpreter`] owns everything a Logo session mutates: the dynamic scope stack,
//! the procedure registry, property lists, the run queue and the host collaborators.
//! Nothing is shared between instances, so several interpreters can coexist in one
//! process. Evaluation lives in `evaluator`, the run queue in `scheduler`.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::ast::Value;
use crate::host::{BufferStream, EventLoop, HeadlessTurtle, Stream, ThreadEventLoop, Turtle};
use crate::procedures::{Arity, DefinitionError, Registry};
use crate::reader::{Atom, ParseError};
use crate::scheduler::{RunQueue, RunState};
use crate::scope::{Lookup, PropertyLists, ScopeStack};
use crate::{DEFAULT_RECURSION_LIMIT, Error, ErrorCode, builtinops, format_message};

/// Tunable interpreter limits.
#[derive(Debug, Clone)]
pub struct Config {
    /// Wall-clock time between voluntary yields to the host event loop
    pub yield_slice: Duration,
    /// Maximum number of nested user-procedure calls
    pub recursion_limit: usize,
    /// Seed for `random`; `None` seeds from the operating system
    pub random_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            yield_slice: Duration::from_millis(20),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            random_seed: None,
        }
    }
}

type Localizer = Box<dyn Fn(&str) -> Option<String>>;
type KeywordAlias = Box<dyn Fn(&str) -> Option<String>>;
type SaveHook = Box<dyn FnMut(&str, Option<&str>)>;

pub struct Interpreter {
    pub(crate) scopes: ScopeStack,
    pub(crate) procedures: Registry,
    pub(crate) plists: PropertyLists,
    pub(crate) turtle: Box<dyn Turtle>,
    pub(crate) stream: Box<dyn Stream>,
    pub(crate) events: Box<dyn EventLoop>,
    pub(crate) config: Config,
    /// Upper-cased names of the procedures being executed, innermost last
    pub(crate) call_stack: Vec<String>,
    /// Nesting depth of user-procedure calls
    pub(crate) user_depth: usize,
    /// Iteration counters of the enclosing `repeat`/`forever` loops
    pub(crate) repcount: Vec<i64>,
    /// Inputs of the enclosing question-mark templates, for `?` and `?rest`
    pub(crate) template_inputs: Vec<Vec<Value>>,
    /// Error most recently caught by `catch "error`
    pub(crate) last_error: Option<Error>,
    pub(crate) rng: StdRng,
    pub(crate) gensym_counter: u64,
    pub(crate) last_yield: Instant,
    /// Set whenever a voluntary yield happened during the current step
    pub(crate) yielded: bool,
    pub(crate) cancel: Arc<AtomicBool>,
    pub(crate) runs: RunQueue,
    pub(crate) state: RunState,
    localizer: Option<Localizer>,
    keyword_alias: Option<KeywordAlias>,
    save_hook: Option<SaveHook>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(
            Box::new(HeadlessTurtle::default()),
            Box::new(BufferStream::default()),
        )
    }
}

impl Interpreter {
    pub fn new(turtle: Box<dyn Turtle>, stream: Box<dyn Stream>) -> Self {
        Self::with_config(turtle, stream, Config::default())
    }

    pub fn with_config(turtle: Box<dyn Turtle>, stream: Box<dyn Stream>, config: Config) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut procedures = Registry::default();
        builtinops::install(&mut procedures);
        Interpreter {
            scopes: ScopeStack::new(),
            procedures,
            plists: PropertyLists::default(),
            turtle,
            stream,
            events: Box::new(ThreadEventLoop),
            config,
            call_stack: Vec::new(),
            user_depth: 0,
            repcount: Vec::new(),
            template_inputs: Vec::new(),
            last_error: None,
            rng,
            gensym_counter: 0,
            last_yield: Instant::now(),
            yielded: false,
            cancel: Arc::new(AtomicBool::new(false)),
            runs: RunQueue::default(),
            state: RunState::Idle,
            localizer: None,
            keyword_alias: None,
            save_hook: None,
        }
    }

    pub fn set_event_loop(&mut self, events: Box<dyn EventLoop>) {
        self.events = events;
    }

    /// Map message templates before they are formatted
    pub fn set_localizer(&mut self, localizer: impl Fn(&str) -> Option<String> + 'static) {
        self.localizer = Some(Box::new(localizer));
    }

    /// Map words to the keywords they stand for (e.g. a translated `END`)
    pub fn set_keyword_alias(&mut self, alias: impl Fn(&str) -> Option<String> + 'static) {
        self.keyword_alias = Some(Box::new(alias));
    }

    /// Called with the procedure name and its `to ... end` text on every definition,
    /// and with `None` when it is erased
    pub fn set_save_hook(&mut self, hook: impl FnMut(&str, Option<&str>) + 'static) {
        self.save_hook = Some(Box::new(hook));
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current value of a variable, searching the active frames
    pub fn variable(&self, name: &str) -> Option<Value> {
        match self.scopes.get(name) {
            Lookup::Bound(value) => Some(value.clone()),
            Lookup::Unassigned | Lookup::Unknown => None,
        }
    }

    pub fn is_procedure(&self, name: &str) -> bool {
        self.procedures.contains(name)
    }

    pub fn procedure_arity(&self, name: &str) -> Option<Arity> {
        self.procedures.get(name).map(|procedure| procedure.arity)
    }

    /// Canonical `to ... end` source of a user-defined procedure
    pub fn procedure_text(&self, name: &str) -> Option<String> {
        let procedure = self.procedures.get(name)?;
        let definition = procedure.as_user()?;
        Some(definition.to_source(&procedure.name))
    }

    fn localize(&self, template: &str) -> String {
        self.localizer
            .as_ref()
            .and_then(|localize| localize(template))
            .unwrap_or_else(|| template.to_owned())
    }

    /// Build an error attributed to the executing procedure
    pub(crate) fn error_with(&self, code: ErrorCode, template: &str, params: &[(&str, &str)]) -> Error {
        self.uncoded_error(template, params).with_code(code)
    }

    pub(crate) fn error(&self, code: ErrorCode, template: &str) -> Error {
        self.error_with(code, template, &[])
    }

    pub(crate) fn uncoded_error(&self, template: &str, params: &[(&str, &str)]) -> Error {
        let procedure = self.call_stack.last().map(String::as_str);
        let message = format_message(&self.localize(template), params, procedure);
        Error::uncoded(message).in_procedure(procedure)
    }

    pub(crate) fn parse_error(&self, err: ParseError) -> Error {
        log::debug!("read failed: {err}");
        self.error(err.kind.code(), err.kind.message())
    }

    pub(crate) fn definition_error(&self, err: DefinitionError) -> Error {
        match err {
            DefinitionError::DuplicateInput(name) => self.error_with(
                ErrorCode::AlreadyDefined,
                "{_PROC_}: Input {name:U} is already defined",
                &[("name", &name)],
            ),
            DefinitionError::BadDefaultArity(text) => self.error_with(
                ErrorCode::BadInput,
                "{_PROC_}: Bad default number of inputs {value}",
                &[("value", &text)],
            ),
            DefinitionError::BadDefault(err) => self.parse_error(err),
        }
    }

    /// Whether `atom` is the word `keyword`, directly or through the keyword alias hook
    pub(crate) fn is_keyword(&self, atom: &Atom, keyword: &str) -> bool {
        let Atom::Word(text) = atom else {
            return false;
        };
        if text.eq_ignore_ascii_case(keyword) {
            return true;
        }
        self.keyword_alias
            .as_ref()
            .and_then(|alias| alias(text))
            .is_some_and(|mapped| mapped.eq_ignore_ascii_case(keyword))
    }

    pub(crate) fn notify_saved(&mut self, name: &str, text: Option<&str>) {
        if let Some(hook) = self.save_hook.as_mut() {
            hook(&name.to_lowercase(), text);
        }
    }

    /// Whether the Logo program has set `redefp`, permitting primitives to be replaced
    pub(crate) fn redefinition_permitted(&self) -> bool {
        match self.scopes.get("redefp") {
            Lookup::Bound(value) => match value.word_text() {
                Some(text) => text.eq_ignore_ascii_case("true") || value.as_number().is_some_and(|n| n != 0.0),
                None => false,
            },
            Lookup::Unassigned | Lookup::Unknown => false,
        }
    }

    pub(crate) fn set_state(&mut self, state: RunState) {
        if self.state != state {
            log::trace!("run state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.events.state_changed(state);
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ast::val;

    #[test]
    fn test_localizer_and_procedure_context() {
        let mut interp = Interpreter::default();
        interp.set_localizer(|template| {
            (template == "Don't know how to {name:U}").then(|| "Je ne sais pas {name:U}".to_string())
        });
        interp.call_stack.push("FOO".into());
        let err = interp.error_with(ErrorCode::BadProc, "Don't know how to {name:U}", &[("name", "bar")]);
        assert_eq!(err.message, "Je ne sais pas BAR");
        assert_eq!(err.procedure.as_deref(), Some("FOO"));
        assert_eq!(err.code_number(), 24);

        let err = interp.error(ErrorCode::BadInput, "{_PROC_}: Expected number");
        assert_eq!(err.message, "FOO: Expected number");
    }

    #[test]
    fn test_keyword_alias() {
        let mut interp = Interpreter::default();
        let end = Atom::Word("End".into());
        let fin = Atom::Word("fin".into());
        assert!(interp.is_keyword(&end, "END"));
        assert!(!interp.is_keyword(&fin, "END"));
        interp.set_keyword_alias(|word| word.eq_ignore_ascii_case("fin").then(|| "END".to_string()));
        assert!(interp.is_keyword(&fin, "END"));
        assert!(!interp.is_keyword(&Atom::List(vec![val("end")]), "END"));
    }

    #[test]
    fn test_redefp_flag() {
        let mut interp = Interpreter::default();
        assert!(!interp.redefinition_permitted());
        interp.scopes.set("redefp", val("true"));
        assert!(interp.redefinition_permitted());
        interp.scopes.set("REDEFP", val(0));
        assert!(!interp.redefinition_permitted());
        interp.scopes.set("redefp", val(1));
        assert!(interp.redefinition_permitted());
        assert_eq!(interp.variable("Redefp").unwrap(), val(1));
    }
}
