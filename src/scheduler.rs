//! Top-level run queue.
//!
//! Program text handed to an interpreter becomes a run. Runs are queued first-in
//! first-out and only the run at the front of the queue makes progress, so one run
//! settles before the next begins. [`Interpreter::step`] advances the front run by one
//! top-level statement and reports what happened; hosts with their own event loop call
//! it repeatedly, everyone else uses [`Interpreter::run`] or [`Interpreter::evaluate`].
//!
//! ```text
//! Idle -> Running -> (SuspendedOnInput | SuspendedOnYield -> Running)* -> Completed
//!                                                                       | Failed
//!                                                                       | Cancelled
//! ```
//!
//! Suspensions happen inside a step, through the host's [`crate::host::EventLoop`] and
//! [`crate::host::Stream`] callbacks, and every transition is reported to
//! `EventLoop::state_changed`. Cancellation is a shared flag checked before each
//! statement; a cancelled run settles as [`RunOutcome::Cancelled`], never as an error.

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use indexmap::IndexMap;

use crate::ast::Value;
use crate::evaluator::Tokens;
use crate::reader::{self, Atom};
use crate::{Error, Interpreter, Signal};

/// Identifies a submitted run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Keep the value of the last statement instead of rejecting unused values
    pub return_result: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    SuspendedOnInput,
    SuspendedOnYield,
    Completed,
    Failed,
    Cancelled,
}

/// How a run settled
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Option<Value>),
    Failed(Error),
    Cancelled,
}

impl RunOutcome {
    /// Cancellation is not an error and reports no value
    pub fn into_result(self) -> Result<Option<Value>, Error> {
        match self {
            RunOutcome::Completed(value) => Ok(value),
            RunOutcome::Failed(err) => Err(err),
            RunOutcome::Cancelled => Ok(None),
        }
    }
}

/// Result of one call to [`Interpreter::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing is queued
    Idle,
    /// One statement ran and the run has more
    Continue(RunId),
    /// Like `Continue`, but the run yielded to the event loop during the statement
    Yielded(RunId),
    /// The run finished; its outcome is ready for [`Interpreter::take_outcome`]
    Settled(RunId),
}

#[derive(Debug)]
struct PendingRun {
    id: RunId,
    source: String,
    options: RunOptions,
    /// Read on the first step
    atoms: Option<Rc<[Atom]>>,
    cursor: usize,
    last: Option<Value>,
}

#[derive(Debug, Default)]
pub(crate) struct RunQueue {
    next_id: u64,
    pending: VecDeque<PendingRun>,
    settled: IndexMap<RunId, RunOutcome>,
}

impl Interpreter {
    /// Queue program text; it starts once every earlier run has settled
    pub fn submit(&mut self, source: impl Into<String>, options: RunOptions) -> RunId {
        self.runs.next_id += 1;
        let id = RunId(self.runs.next_id);
        log::debug!("run {id:?} submitted");
        self.runs.pending.push_back(PendingRun {
            id,
            source: source.into(),
            options,
            atoms: None,
            cursor: 0,
            last: None,
        });
        id
    }

    /// Advance the run at the front of the queue by one statement
    pub fn step(&mut self) -> Step {
        let Some(mut run) = self.runs.pending.pop_front() else {
            return Step::Idle;
        };
        let id = run.id;

        let atoms = match &run.atoms {
            Some(atoms) => Rc::clone(atoms),
            None => {
                log::debug!("run {id:?} started");
                self.set_state(RunState::Running);
                self.last_yield = Instant::now();
                match reader::parse(&run.source) {
                    Ok(atoms) => {
                        let atoms: Rc<[Atom]> = atoms.into();
                        run.atoms = Some(Rc::clone(&atoms));
                        atoms
                    }
                    Err(err) => {
                        let err = self.parse_error(err);
                        return self.settle(id, RunOutcome::Failed(err));
                    }
                }
            }
        };

        self.yielded = false;
        let mut tokens = Tokens::at(&atoms, run.cursor);
        if !tokens.is_empty() {
            match self.execute_statement(&mut tokens, run.options.return_result) {
                Ok(value) => {
                    run.last = value;
                    run.cursor = tokens.position();
                }
                Err(Signal::Throw(err)) => return self.settle(id, RunOutcome::Failed(err)),
                Err(Signal::Cancelled) => return self.settle(id, RunOutcome::Cancelled),
                Err(Signal::Output(_)) => {
                    let err = self.uncoded_error("Output escaped its procedure", &[]);
                    return self.settle(id, RunOutcome::Failed(err));
                }
            }
        }
        if tokens.is_empty() {
            let last = run.last.take();
            return self.settle(id, RunOutcome::Completed(last));
        }

        self.runs.pending.push_front(run);
        if self.yielded {
            Step::Yielded(id)
        } else {
            Step::Continue(id)
        }
    }

    fn settle(&mut self, id: RunId, outcome: RunOutcome) -> Step {
        let state = match &outcome {
            RunOutcome::Completed(_) => RunState::Completed,
            RunOutcome::Failed(err) => {
                log::debug!("run {id:?} failed: {err}");
                RunState::Failed
            }
            RunOutcome::Cancelled => {
                log::debug!("run {id:?} cancelled");
                self.cancel.store(false, Ordering::SeqCst);
                RunState::Cancelled
            }
        };
        self.call_stack.clear();
        self.repcount.clear();
        self.template_inputs.clear();
        self.set_state(state);
        self.runs.settled.insert(id, outcome);
        if self.runs.pending.is_empty() {
            self.set_state(RunState::Idle);
        }
        Step::Settled(id)
    }

    /// Remove and return the outcome of a settled run
    pub fn take_outcome(&mut self, id: RunId) -> Option<RunOutcome> {
        self.runs.settled.shift_remove(&id)
    }

    /// Queue `source` and drive the queue until it settles
    pub fn run_with(&mut self, source: &str, options: RunOptions) -> Result<Option<Value>, Error> {
        let id = self.submit(source, options);
        loop {
            if let Some(outcome) = self.take_outcome(id) {
                return outcome.into_result();
            }
            if self.step() == Step::Idle {
                return Ok(None);
            }
        }
    }

    /// Run statements; a statement that produces an unused value is an error
    pub fn run(&mut self, source: &str) -> Result<Option<Value>, Error> {
        self.run_with(source, RunOptions::default())
    }

    /// Run statements and return the value of the last one
    pub fn evaluate(&mut self, source: &str) -> Result<Option<Value>, Error> {
        self.run_with(source, RunOptions { return_result: true })
    }

    /// Ask the active run to stop at its next statement boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// The cancellation flag, for hosts that cancel from a callback or another thread
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run_state(&self) -> RunState {
        self.state
    }

    pub fn pending_runs(&self) -> usize {
        self.runs.pending.len()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use super::*;
    use crate::ast::val;
    use crate::host::{BufferStream, EventLoop, HeadlessTurtle};
    use crate::{Config, ErrorCode};

    /// Records state transitions and raises the cancel flag after `cancel_after` yields
    struct RecordingLoop {
        states: Rc<RefCell<Vec<RunState>>>,
        yields: usize,
        cancel_after: Option<usize>,
        cancel: Arc<AtomicBool>,
    }

    impl EventLoop for RecordingLoop {
        fn yield_now(&mut self) {
            self.yields += 1;
            if self.cancel_after.is_some_and(|n| self.yields >= n) {
                self.cancel.store(true, Ordering::SeqCst);
            }
        }

        fn wait(&mut self, _duration: Duration) {}

        fn state_changed(&mut self, state: RunState) {
            self.states.borrow_mut().push(state);
        }
    }

    fn interpreter(
        yield_slice: Duration,
        cancel_after: Option<usize>,
    ) -> (Interpreter, BufferStream, Rc<RefCell<Vec<RunState>>>) {
        let stream = BufferStream::default();
        let mut interp = Interpreter::with_config(
            Box::new(HeadlessTurtle::default()),
            Box::new(stream.clone()),
            Config {
                yield_slice,
                ..Config::default()
            },
        );
        let states = Rc::new(RefCell::new(Vec::new()));
        interp.set_event_loop(Box::new(RecordingLoop {
            states: Rc::clone(&states),
            yields: 0,
            cancel_after,
            cancel: interp.cancel_handle(),
        }));
        (interp, stream, states)
    }

    #[test]
    fn test_runs_settle_in_submission_order() {
        let (mut interp, stream, _) = interpreter(Duration::from_secs(60), None);
        let first = interp.submit("print \"a1 print \"a2 print \"a3", RunOptions::default());
        let second = interp.submit("print \"b", RunOptions::default());
        assert_eq!(interp.pending_runs(), 2);

        let mut steps = Vec::new();
        loop {
            let step = interp.step();
            if step == Step::Idle {
                break;
            }
            steps.push(step);
        }
        assert_eq!(
            steps,
            vec![
                Step::Continue(first),
                Step::Continue(first),
                Step::Settled(first),
                Step::Settled(second),
            ]
        );
        assert_eq!(stream.output(), "a1\na2\na3\nb\n");
        assert_eq!(interp.take_outcome(first), Some(RunOutcome::Completed(None)));
        assert_eq!(interp.take_outcome(first), None);
        assert_eq!(interp.run_state(), RunState::Idle);
    }

    #[test]
    fn test_failure_does_not_block_the_queue() {
        let (mut interp, stream, _) = interpreter(Duration::from_secs(60), None);
        let failing = interp.submit("print 1 frob print 2", RunOptions::default());
        let unreadable = interp.submit("print 3 ]", RunOptions::default());
        let next = interp.submit("print 4", RunOptions::default());
        while interp.step() != Step::Idle {}

        match interp.take_outcome(failing).unwrap() {
            RunOutcome::Failed(err) => assert_eq!(err.code, Some(ErrorCode::BadProc)),
            other => panic!("expected failure, got {other:?}"),
        }
        match interp.take_outcome(unreadable).unwrap() {
            RunOutcome::Failed(err) => assert_eq!(err.code, Some(ErrorCode::BadBracket)),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(interp.take_outcome(next), Some(RunOutcome::Completed(None)));
        // Nothing from the unreadable run executes
        assert_eq!(stream.output(), "1\n4\n");
    }

    #[test]
    fn test_cancellation_stops_at_statement_boundary() {
        let (mut interp, stream, states) = interpreter(Duration::ZERO, Some(2));
        interp
            .run("to tick make \"n :n + 1 end make \"n 0")
            .unwrap();
        let result = interp.run("forever [tick] print \"unreachable");
        assert_eq!(result, Ok(None));
        // One yield from TICK returning, one from FOREVER finishing its first pass
        assert_eq!(interp.variable("n"), Some(val(1)));
        assert_eq!(stream.output(), "");
        assert!(!interp.cancel_handle().load(Ordering::SeqCst));

        let states = states.borrow();
        assert!(states.contains(&RunState::SuspendedOnYield));
        assert_eq!(
            states[states.len() - 2..],
            [RunState::Cancelled, RunState::Idle]
        );
        drop(states);

        // The interpreter is usable afterwards
        assert_eq!(interp.evaluate(":n + 1"), Ok(Some(val(2))));
    }

    #[test]
    fn test_cancel_while_idle_is_consumed_by_next_run() {
        let (mut interp, stream, _) = interpreter(Duration::from_secs(60), None);
        interp.cancel();
        let id = interp.submit("print 1", RunOptions::default());
        while interp.step() != Step::Idle {}
        assert_eq!(interp.take_outcome(id), Some(RunOutcome::Cancelled));
        assert_eq!(interp.run("print 2"), Ok(None));
        assert_eq!(stream.output(), "2\n");
    }

    #[test]
    fn test_value_returning_mode() {
        let (mut interp, _, _) = interpreter(Duration::from_secs(60), None);
        assert_eq!(interp.evaluate("1 + 2"), Ok(Some(val(3))));
        assert_eq!(interp.evaluate(""), Ok(None));
        let err = interp.run("1 + 2").unwrap_err();
        assert_eq!(err.code, Some(ErrorCode::BadOutput));
        assert_eq!(err.message, "Don't know what to do with 3");
    }

    #[test]
    fn test_yield_reports_suspension() {
        let (mut interp, _, states) = interpreter(Duration::ZERO, None);
        interp.run("to f end").unwrap();
        let id = interp.submit("f f", RunOptions::default());
        assert_eq!(interp.step(), Step::Yielded(id));
        assert_eq!(interp.step(), Step::Settled(id));
        let states = states.borrow();
        assert_eq!(
            states[..],
            [
                RunState::Running,
                RunState::Completed,
                RunState::Idle,
                RunState::Running,
                RunState::SuspendedOnYield,
                RunState::Running,
                RunState::SuspendedOnYield,
                RunState::Running,
                RunState::Completed,
                RunState::Idle,
            ]
        );
    }
}
