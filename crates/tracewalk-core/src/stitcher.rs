//! # Session Stitcher
//!
//! Drives repeated debugger sessions and stitches their frames into one
//! continuous trace.
//!
//! A single session has bounded output and bounded time, so the trace is
//! reconstructed window by window: the first session starts at the program
//! entry and steps until it reaches a stop condition; every later session is
//! re-armed at a line the previous window already validated as user code.
//!
//! ## State machine
//!
//! ```text
//! Start -> AwaitingSession -> SteppingWindow -> Rearming -> AwaitingSession ...
//!                                   |
//!                                   +-> Done(Success | Timeout | Error)
//! ```
//!
//! Only `AwaitingSession` performs I/O (through a [`SessionRunner`]). Every
//! other transition is a function of the current state and the owned
//! [`TraceAccumulator`], see [`Stitcher::transition`].

use std::fmt;
use std::ops::Range;
use std::time::Duration;

use tracing::{debug, info, info_span, warn};

use crate::classifier::{FrameClass, FrameClassifier};
use crate::config::TraceConfig;
use crate::driver::SessionRunner;
use crate::error::TraceResult;
use crate::roadmap::{self, Roadmap};
use crate::types::{Breakpoint, FrameEvent, SessionPlan, SessionResult, StepDirective, Terminal};

/// Why a trace stopped with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceFault
{
    /// The debugger's scripting surface reported a fault while stepping.
    Debugger(String),
    /// A session reported a boundary without a single frame: its breakpoint
    /// was already non-user code, so re-arming would loop forever.
    DegenerateRearm
    {
        /// Breakpoint of the degenerate session.
        breakpoint: Breakpoint,
    },
    /// The session ceiling was reached before any terminal condition.
    SessionLimit(usize),
}

impl fmt::Display for TraceFault
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Debugger(message) => write!(f, "debugger fault: {message}"),
            Self::DegenerateRearm { breakpoint } => {
                write!(f, "re-armed session at {breakpoint} stopped before any user frame")
            }
            Self::SessionLimit(max) => write!(f, "gave up after {max} sessions"),
        }
    }
}

/// Global terminal condition of a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOutcome
{
    /// Stepping ran off the end of user source: the program returned.
    Success,
    /// A session exceeded its budget; the roadmap is partial.
    Timeout,
    /// The trace halted on a fault; the roadmap holds everything before it.
    Error(TraceFault),
}

impl fmt::Display for TraceOutcome
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Success => f.write_str("success"),
            Self::Timeout => f.write_str("timeout"),
            Self::Error(fault) => write!(f, "error ({fault})"),
        }
    }
}

/// States of the stitching loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StitchState
{
    /// Nothing has run yet.
    Start,
    /// A session is planned and waiting to be run.
    AwaitingSession(SessionPlan),
    /// A session finished and its window must be merged.
    SteppingWindow
    {
        /// Plan the session ran with.
        plan: SessionPlan,
        /// What it produced.
        result: SessionResult,
    },
    /// The window closed at a boundary; the next session resumes here.
    Rearming
    {
        /// Resume breakpoint.
        resume: Breakpoint,
    },
    /// The trace is over.
    Done(TraceOutcome),
}

/// Everything stitched so far. Owned by the caller of the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceAccumulator
{
    events: Vec<FrameEvent>,
    windows: Vec<Range<usize>>,
    sessions: usize,
}

impl TraceAccumulator
{
    /// Merge one window, renumbering its events into the global sequence.
    pub fn append_window(&mut self, window: &[FrameEvent]) -> Range<usize>
    {
        let start = self.events.len();
        self.events
            .extend(window.iter().enumerate().map(|(i, event)| event.renumbered(start + i)));
        let range = start..self.events.len();
        self.windows.push(range.clone());
        range
    }

    /// Events stitched so far, globally numbered.
    #[must_use]
    pub fn events(&self) -> &[FrameEvent]
    {
        &self.events
    }

    /// One index range per merged session window.
    #[must_use]
    pub fn windows(&self) -> &[Range<usize>]
    {
        &self.windows
    }

    /// Sessions run so far, including any that timed out.
    #[must_use]
    pub fn sessions(&self) -> usize
    {
        self.sessions
    }

    fn into_report(self, outcome: TraceOutcome) -> TraceReport
    {
        let roadmap = roadmap::build(&self.events, &self.windows);
        TraceReport {
            outcome,
            events: self.events,
            windows: self.windows,
            sessions: self.sessions,
            roadmap,
        }
    }
}

/// Final artifact of a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceReport
{
    /// How the trace ended.
    pub outcome: TraceOutcome,
    /// Every accepted frame, globally numbered.
    pub events: Vec<FrameEvent>,
    /// Session windows as ranges into `events`.
    pub windows: Vec<Range<usize>>,
    /// Number of sessions run.
    pub sessions: usize,
    /// Replay actions, one per event.
    pub roadmap: Roadmap,
}

/// Line a re-armed session should resume at, given the window just closed.
///
/// Second-to-last observed frame when there are at least two, else the only
/// one.
#[must_use]
pub fn resume_point(window: &[FrameEvent]) -> Option<&FrameEvent>
{
    match window.len() {
        0 => None,
        1 => window.first(),
        n => window.get(n - 2),
    }
}

/// Orchestrates sessions into a [`TraceReport`].
#[derive(Debug, Clone)]
pub struct Stitcher
{
    classifier: FrameClassifier,
    first_timeout: Duration,
    resume_timeout: Duration,
    max_sessions: usize,
}

impl Stitcher
{
    /// Build a stitcher from the run configuration.
    #[must_use]
    pub fn new(config: &TraceConfig) -> Self
    {
        Self {
            classifier: FrameClassifier::new(config.policy.clone()),
            first_timeout: config.first_timeout,
            resume_timeout: config.resume_timeout,
            max_sessions: config.max_sessions,
        }
    }

    /// Run sessions until a global terminal condition is reached.
    ///
    /// ## Errors
    ///
    /// Only faults that prevent a session from running at all propagate
    /// (`DebuggerLaunch`, `Io`). Timeouts and debugger faults end the trace
    /// with the matching [`TraceOutcome`] and keep the partial roadmap.
    pub fn run<R>(&self, runner: &mut R) -> TraceResult<TraceReport>
    where
        R: SessionRunner + ?Sized,
    {
        let span = info_span!("trace");
        let _guard = span.enter();

        let mut accumulator = TraceAccumulator::default();
        let mut state = StitchState::Start;

        loop {
            state = match state {
                StitchState::AwaitingSession(plan) => {
                    debug!(session = accumulator.sessions + 1, breakpoint = %plan.breakpoint, "starting session");
                    let result = runner.run(&plan)?;
                    accumulator.sessions += 1;
                    StitchState::SteppingWindow { plan, result }
                }
                StitchState::Done(outcome) => {
                    info!(%outcome, sessions = accumulator.sessions, frames = accumulator.events.len(), "trace finished");
                    return Ok(accumulator.into_report(outcome));
                }
                other => self.transition(other, &mut accumulator),
            };
        }
    }

    /// Advance every state that does not need the debugger.
    ///
    /// `AwaitingSession` and `Done` are returned unchanged.
    #[must_use]
    pub fn transition(&self, state: StitchState, accumulator: &mut TraceAccumulator) -> StitchState
    {
        match state {
            StitchState::Start => StitchState::AwaitingSession(SessionPlan {
                breakpoint: Breakpoint::Entry(self.classifier.policy().entry_function.clone()),
                directive: StepDirective::Trace,
                timeout: self.first_timeout,
            }),
            StitchState::SteppingWindow { plan, result } => self.close_window(plan, result, accumulator),
            StitchState::Rearming { resume } => StitchState::AwaitingSession(SessionPlan {
                breakpoint: resume,
                directive: StepDirective::Resume,
                timeout: self.resume_timeout,
            }),
            waiting @ (StitchState::AwaitingSession(_) | StitchState::Done(_)) => waiting,
        }
    }

    fn close_window(&self, plan: SessionPlan, result: SessionResult, accumulator: &mut TraceAccumulator) -> StitchState
    {
        if result.terminal == Terminal::Timeout {
            warn!(breakpoint = %plan.breakpoint, "session timed out, keeping the roadmap built so far");
            return StitchState::Done(TraceOutcome::Timeout);
        }

        let accepted = self.accepted_frames(&result.events);
        let truncated = accepted < result.events.len();
        let window = &result.events[..accepted];

        for (offset, event) in window.iter().enumerate() {
            info!(
                index = accumulator.events.len() + offset,
                line = event.source_line,
                function = %event.function_name,
                file = event.source_file.as_deref().unwrap_or("??"),
                "observed frame"
            );
        }
        accumulator.append_window(window);

        let terminal = if truncated && result.terminal != Terminal::Error {
            Terminal::LibraryBoundary
        } else {
            result.terminal
        };
        debug!(%terminal, frames = window.len(), "session window closed");

        match terminal {
            Terminal::EndOfSource => StitchState::Done(TraceOutcome::Success),
            Terminal::Error => {
                let message = result.fault.unwrap_or_else(|| "unknown debugger error".to_string());
                warn!(%message, "debugger reported a fault");
                StitchState::Done(TraceOutcome::Error(TraceFault::Debugger(message)))
            }
            Terminal::Timeout => StitchState::Done(TraceOutcome::Timeout),
            Terminal::LibraryBoundary | Terminal::Continuing => {
                let Some(resume) = resume_point(window) else {
                    warn!(breakpoint = %plan.breakpoint, "session reached a boundary without any user frame");
                    return StitchState::Done(TraceOutcome::Error(TraceFault::DegenerateRearm {
                        breakpoint: plan.breakpoint,
                    }));
                };

                if accumulator.sessions >= self.max_sessions {
                    warn!(max = self.max_sessions, "session ceiling reached");
                    return StitchState::Done(TraceOutcome::Error(TraceFault::SessionLimit(self.max_sessions)));
                }

                let resume = Breakpoint::at_event(resume);
                debug!(%resume, "re-arming");
                StitchState::Rearming { resume }
            }
        }
    }

    /// Number of leading frames before the first one whose resolved source
    /// file the policy rejects.
    ///
    /// Frames without a location were already accepted by the stepping
    /// helper and are kept.
    fn accepted_frames(&self, events: &[FrameEvent]) -> usize
    {
        events
            .iter()
            .position(|event| {
                let located = event.source_file.as_deref().is_some_and(|f| !f.is_empty());
                let rejected = located && self.classifier.classify_event(event) == FrameClass::Library;
                if rejected {
                    debug!(%event, "frame classified as library code, closing window");
                }
                rejected
            })
            .unwrap_or(events.len())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn frame(index: usize, line: u32) -> FrameEvent
    {
        FrameEvent::new(index, line, "main", "/work/prog.c")
    }

    fn result(events: Vec<FrameEvent>, terminal: Terminal) -> SessionResult
    {
        SessionResult {
            raw_output: String::new(),
            events,
            terminal,
            fault: None,
        }
    }

    fn stepping(result: SessionResult) -> StitchState
    {
        StitchState::SteppingWindow {
            plan: SessionPlan {
                breakpoint: Breakpoint::Entry("main".to_string()),
                directive: StepDirective::Trace,
                timeout: Duration::from_secs(1),
            },
            result,
        }
    }

    #[test]
    fn test_resume_point()
    {
        assert_eq!(resume_point(&[]), None);
        assert_eq!(resume_point(&[frame(0, 4)]).map(|e| e.source_line), Some(4));
        assert_eq!(
            resume_point(&[frame(0, 4), frame(1, 5), frame(2, 9)]).map(|e| e.source_line),
            Some(5)
        );
    }

    #[test]
    fn test_start_plans_entry_session()
    {
        let stitcher = Stitcher::new(&TraceConfig::default());
        let state = stitcher.transition(StitchState::Start, &mut TraceAccumulator::default());

        match state {
            StitchState::AwaitingSession(plan) => {
                assert_eq!(plan.breakpoint, Breakpoint::Entry("main".to_string()));
                assert_eq!(plan.directive, StepDirective::Trace);
                assert_eq!(plan.timeout, TraceConfig::default().first_timeout);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_rearming_plans_resume_session()
    {
        let stitcher = Stitcher::new(&TraceConfig::default());
        let resume = Breakpoint::Line {
            file: Some("/work/prog.c".to_string()),
            line: 12,
        };
        let state = stitcher.transition(StitchState::Rearming { resume: resume.clone() }, &mut TraceAccumulator::default());

        assert_eq!(
            state,
            StitchState::AwaitingSession(SessionPlan {
                breakpoint: resume,
                directive: StepDirective::Resume,
                timeout: Duration::from_secs(10),
            })
        );
    }

    #[test]
    fn test_boundary_rearms_at_second_to_last_line()
    {
        let stitcher = Stitcher::new(&TraceConfig::default());
        let mut accumulator = TraceAccumulator::default();
        accumulator.sessions = 1;

        let state = stitcher.transition(
            stepping(result(vec![frame(0, 3), frame(1, 4), frame(2, 7)], Terminal::LibraryBoundary)),
            &mut accumulator,
        );

        assert_eq!(
            state,
            StitchState::Rearming {
                resume: Breakpoint::Line {
                    file: Some("/work/prog.c".to_string()),
                    line: 4
                }
            }
        );
        assert_eq!(accumulator.windows(), &[0..3]);
    }

    #[test]
    fn test_library_frame_truncates_window()
    {
        let stitcher = Stitcher::new(&TraceConfig::default());
        let mut accumulator = TraceAccumulator::default();
        accumulator.sessions = 1;

        let events = vec![
            frame(0, 3),
            frame(1, 4),
            FrameEvent::new(2, 120, "puts", "/usr/src/glibc/puts.c"),
            frame(3, 5),
        ];
        let state = stitcher.transition(stepping(result(events, Terminal::EndOfSource)), &mut accumulator);

        assert!(matches!(state, StitchState::Rearming { .. }));
        assert_eq!(accumulator.events().len(), 2);
    }

    #[test]
    fn test_unlocated_frames_are_kept()
    {
        let stitcher = Stitcher::new(&TraceConfig::default());
        let mut accumulator = TraceAccumulator::default();
        accumulator.sessions = 1;

        let events = crate::parser::extract_events("line 3 at index 0\nline 4 at index 1\nline 5 at index 2\n");
        let state = stitcher.transition(stepping(result(events, Terminal::EndOfSource)), &mut accumulator);

        assert_eq!(state, StitchState::Done(TraceOutcome::Success));
        assert_eq!(accumulator.windows(), &[0..3]);
    }

    #[test]
    fn test_session_ceiling()
    {
        let config = TraceConfig {
            max_sessions: 2,
            ..TraceConfig::default()
        };
        let stitcher = Stitcher::new(&config);
        let mut accumulator = TraceAccumulator::default();
        accumulator.sessions = 2;

        let state = stitcher.transition(stepping(result(vec![frame(0, 3)], Terminal::Continuing)), &mut accumulator);
        assert_eq!(state, StitchState::Done(TraceOutcome::Error(TraceFault::SessionLimit(2))));
        assert_eq!(accumulator.events().len(), 1);
    }

    #[test]
    fn test_append_window_renumbers_globally()
    {
        let mut accumulator = TraceAccumulator::default();
        accumulator.append_window(&[frame(0, 1), frame(1, 2)]);
        let range = accumulator.append_window(&[frame(0, 8), frame(1, 9)]);

        assert_eq!(range, 2..4);
        let indexes: Vec<usize> = accumulator.events().iter().map(|e| e.sequence_index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
        assert_eq!(accumulator.events()[2].source_line, 8);
    }
}
