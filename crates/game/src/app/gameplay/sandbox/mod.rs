//! Restricted evaluator for the small Python-shaped subset the challenges
//! are written in.
//!
//! Pipeline: `lexer` turns source into tokens (with INDENT/DEDENT), `parser`
//! builds the `ast`, and `interpreter` walks it under a step budget. There
//! is no file, module or process access; the only side channel is captured
//! stdout.

mod ast;
mod interpreter;
mod lexer;
mod parser;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

pub(crate) use ast::FunctionDef;
use interpreter::Interpreter;

pub(crate) const DEFAULT_STEP_BUDGET: u64 = 10_000;
pub(crate) const MAX_CALL_DEPTH: usize = 64;
pub(crate) const MAX_STDOUT_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    SyntaxError,
    IndentationError,
    NameError,
    TypeError,
    ValueError,
    IndexError,
    ZeroDivisionError,
    OverflowError,
    MemoryError,
    RecursionError,
    TimeoutError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Script failure, displayed the way the player would see a traceback's
/// last line: `NameError: name 'x' is not defined`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub(crate) struct SandboxError {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
}

impl SandboxError {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Print,
    Range,
    Len,
    Str,
    Int,
}

impl Builtin {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        match name {
            "print" => Some(Self::Print),
            "range" => Some(Self::Range),
            "len" => Some(Self::Len),
            "str" => Some(Self::Str),
            "int" => Some(Self::Int),
            _ => None,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Range => "range",
            Self::Len => "len",
            Self::Str => "str",
            Self::Int => "int",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    Range { start: i64, stop: i64, step: i64 },
    Function(Rc<FunctionDef>),
    Builtin(Builtin),
}

impl Value {
    pub(crate) fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Range { .. } => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
        }
    }

    pub(crate) fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_))
    }
}

/// `str()` rendering.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Str(value) => f.write_str(value),
            Value::Range { start, stop, step } if *step == 1 => write!(f, "range({start}, {stop})"),
            Value::Range { start, stop, step } => write!(f, "range({start}, {stop}, {step})"),
            Value::Function(def) => write!(f, "<function {}>", def.name),
            Value::Builtin(builtin) => write!(f, "<built-in function {}>", builtin.name()),
        }
    }
}

/// Result of running a whole script. `bindings` holds the top-level names
/// bound before the script finished or failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SandboxOutcome {
    pub(crate) stdout: String,
    pub(crate) bindings: BTreeMap<String, Value>,
    pub(crate) error: Option<SandboxError>,
}

/// Black-box script runner the grader depends on.
pub(crate) trait ScriptSandbox {
    fn execute(&self, script: &str) -> SandboxOutcome;

    /// Calls the function bound to `name` in a finished run.
    fn invoke(
        &self,
        outcome: &SandboxOutcome,
        name: &str,
        args: &[Value],
    ) -> Result<Value, SandboxError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RestrictedSandbox {
    step_budget: u64,
}

impl Default for RestrictedSandbox {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_BUDGET)
    }
}

impl RestrictedSandbox {
    pub(crate) fn new(step_budget: u64) -> Self {
        Self {
            step_budget: step_budget.max(1),
        }
    }
}

impl ScriptSandbox for RestrictedSandbox {
    fn execute(&self, script: &str) -> SandboxOutcome {
        let program = match lexer::tokenize(script).and_then(|tokens| parser::parse(&tokens)) {
            Ok(program) => program,
            Err(error) => {
                return SandboxOutcome {
                    error: Some(error),
                    ..SandboxOutcome::default()
                }
            }
        };

        let mut interpreter = Interpreter::new(self.step_budget, BTreeMap::new());
        let error = interpreter.run(&program).err();
        let (stdout, bindings) = interpreter.into_parts();
        SandboxOutcome {
            stdout,
            bindings,
            error,
        }
    }

    fn invoke(
        &self,
        outcome: &SandboxOutcome,
        name: &str,
        args: &[Value],
    ) -> Result<Value, SandboxError> {
        let callee = outcome.bindings.get(name).cloned().ok_or_else(|| {
            SandboxError::new(ErrorKind::NameError, format!("name '{name}' is not defined"))
        })?;
        let mut interpreter = Interpreter::new(self.step_budget, outcome.bindings.clone());
        interpreter.call_value(&callee, args.to_vec(), Vec::new())
    }
}
