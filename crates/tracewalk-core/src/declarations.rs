//! # Declaration Snapshot
//!
//! At one stopped line, reports for every variable in scope whether its
//! declaration precedes the line.
//!
//! The walk starts at the innermost lexical block and follows each block's
//! enclosing block outward until none is left. Records come out innermost
//! first, in discovery order within a block. Same-named variables of nested
//! blocks are all reported; shadowing is not resolved.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::driver::SessionRunner;
use crate::error::{TraceError, TraceResult};
use crate::types::{Breakpoint, SessionPlan, StepDirective, Terminal};

const BLOCK_TAG: &str = "tracewalk:block";
const VAR_TAG: &str = "tracewalk:var";

/// Whether a variable is declared at the query line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationStatus
{
    /// Declared on or before the query line.
    Declared,
    /// Declared after the query line.
    PendingDeclaration,
    /// The debugger could not resolve the declaration line.
    Unknown,
}

impl fmt::Display for DeclarationStatus
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Declared => f.write_str("declared"),
            Self::PendingDeclaration => f.write_str("not declared yet"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// One in-scope variable at the query line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationRecord
{
    /// Variable name as the debugger prints it.
    pub variable_name: String,
    /// Declaration line, if resolved.
    pub declaration_line: Option<u32>,
    /// Comparison against the query line.
    pub status: DeclarationStatus,
    /// Nesting distance from the innermost block (0 = innermost).
    pub scope_depth: usize,
}

impl fmt::Display for DeclarationRecord
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.declaration_line {
            Some(line) => write!(f, "{}: line {} ({})", self.variable_name, line, self.status),
            None => write!(f, "{}: line unknown ({})", self.variable_name, self.status),
        }
    }
}

/// A variable binding as reported by the debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding
{
    /// Variable name.
    pub name: String,
    /// Declaration line; `None` when unresolved.
    pub line: Option<u32>,
}

/// A lexical block and the chain of blocks enclosing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalBlock
{
    /// Variables bound directly in this block, in discovery order.
    pub bindings: Vec<Binding>,
    /// The block enclosing this one.
    pub enclosing: Option<Box<LexicalBlock>>,
}

impl LexicalBlock
{
    /// Build a chain from per-block bindings listed innermost first.
    #[must_use]
    pub fn chain(blocks: Vec<Vec<Binding>>) -> Option<Self>
    {
        blocks.into_iter().rev().fold(None, |enclosing, bindings| {
            Some(Self {
                bindings,
                enclosing: enclosing.map(Box::new),
            })
        })
    }
}

/// Declarations at one query line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSnapshot
{
    /// Line the records are keyed by.
    pub query_line: u32,
    /// Records, innermost block first.
    pub records: Vec<DeclarationRecord>,
}

/// Walk `innermost` outward and classify every binding against `query_line`.
#[must_use]
pub fn snapshot(innermost: &LexicalBlock, query_line: u32) -> Vec<DeclarationRecord>
{
    let mut records = Vec::new();
    let mut block = Some(innermost);
    let mut depth = 0;

    while let Some(current) = block {
        records.extend(current.bindings.iter().map(|binding| {
            let status = match binding.line {
                Some(line) if line <= query_line => DeclarationStatus::Declared,
                Some(_) => DeclarationStatus::PendingDeclaration,
                None => DeclarationStatus::Unknown,
            };
            DeclarationRecord {
                variable_name: binding.name.clone(),
                declaration_line: binding.line,
                status,
                scope_depth: depth,
            }
        }));
        block = current.enclosing.as_deref();
        depth += 1;
    }

    records
}

/// Rebuild the scope chain from the helper's `block`/`var` lines.
///
/// A declaration line of 0 or `unknown` is unresolved. Variables printed
/// before any block marker belong to the innermost block.
#[must_use]
pub fn parse_scope_chain(raw: &str) -> Option<LexicalBlock>
{
    let mut blocks: Vec<Vec<Binding>> = Vec::new();

    for line in raw.lines().map(str::trim) {
        if line.starts_with(BLOCK_TAG) {
            blocks.push(Vec::new());
        } else if let Some(rest) = line.strip_prefix(VAR_TAG) {
            let Some((name, declared)) = rest.trim().rsplit_once(" line=") else {
                continue;
            };
            let binding = Binding {
                name: name.trim().to_string(),
                line: declared.trim().parse::<u32>().ok().filter(|l| *l > 0),
            };
            if blocks.is_empty() {
                blocks.push(Vec::new());
            }
            if let Some(block) = blocks.last_mut() {
                block.push(binding);
            }
        }
    }

    LexicalBlock::chain(blocks)
}

/// Stop at `line` in one debugger session and snapshot its declarations.
///
/// ## Errors
///
/// - `SessionTimedOut`: the session exceeded `timeout`
/// - `DebuggerFault`: the scripting surface reported an error
/// - anything the runner propagates (`DebuggerLaunch`, `Io`)
pub fn capture_declarations<R>(runner: &mut R, file: Option<String>, line: u32, timeout: Duration) -> TraceResult<DeclarationSnapshot>
where
    R: SessionRunner + ?Sized,
{
    let plan = SessionPlan {
        breakpoint: Breakpoint::Line { file, line },
        directive: StepDirective::Declarations { line },
        timeout,
    };
    let result = runner.run(&plan)?;

    match result.terminal {
        Terminal::Timeout => return Err(TraceError::SessionTimedOut { limit: timeout }),
        Terminal::Error => {
            return Err(TraceError::DebuggerFault(
                result.fault.unwrap_or_else(|| "unknown debugger error".to_string()),
            ))
        }
        _ => {}
    }

    let records = parse_scope_chain(&result.raw_output)
        .map(|innermost| snapshot(&innermost, line))
        .unwrap_or_default();
    debug!(line, records = records.len(), "captured declarations");

    Ok(DeclarationSnapshot { query_line: line, records })
}
