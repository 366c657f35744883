//! Tree-walking evaluator.
//!
//! Every statement, loop iteration and call costs one step. Running out of
//! steps is reported as a `TimeoutError`, so a script can never hang the
//! frame loop.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::ast::{BinaryOp, BoolOp, CompareOp, Expr, FunctionDef, Stmt, UnaryOp};
use super::{Builtin, ErrorKind, SandboxError, Value, MAX_CALL_DEPTH, MAX_STDOUT_BYTES};

const MAX_STRING_BYTES: usize = 64 * 1024;

type Scope = BTreeMap<String, Value>;

enum Flow {
    Normal,
    Return(Value),
}

pub(crate) struct Interpreter {
    globals: Scope,
    frames: Vec<Scope>,
    steps_left: u64,
    stdout: String,
}

fn error(kind: ErrorKind, message: impl Into<String>) -> SandboxError {
    SandboxError::new(kind, message)
}

fn type_error(message: impl Into<String>) -> SandboxError {
    error(ErrorKind::TypeError, message)
}

fn overflow() -> SandboxError {
    error(ErrorKind::OverflowError, "integer result too large")
}

impl Interpreter {
    pub(crate) fn new(step_budget: u64, globals: Scope) -> Self {
        Self {
            globals,
            frames: Vec::new(),
            steps_left: step_budget,
            stdout: String::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (String, Scope) {
        (self.stdout, self.globals)
    }

    pub(crate) fn run(&mut self, program: &[Stmt]) -> Result<(), SandboxError> {
        match self.exec_block(program)? {
            Flow::Normal | Flow::Return(_) => Ok(()),
        }
    }

    fn tick(&mut self) -> Result<(), SandboxError> {
        if self.steps_left == 0 {
            return Err(error(ErrorKind::TimeoutError, "step budget exhausted"));
        }
        self.steps_left -= 1;
        Ok(())
    }

    fn scope_mut(&mut self) -> &mut Scope {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.globals,
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, SandboxError> {
        self.frames
            .last()
            .and_then(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
            .or_else(|| Builtin::lookup(name).map(Value::Builtin))
            .ok_or_else(|| error(ErrorKind::NameError, format!("name '{name}' is not defined")))
    }

    fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow, SandboxError> {
        for stmt in body {
            if let Flow::Return(value) = self.exec_stmt(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, SandboxError> {
        self.tick()?;
        match stmt {
            Stmt::Assign { name, value } => {
                let value = self.eval(value)?;
                self.scope_mut().insert(name.clone(), value);
            }
            Stmt::AugAssign { name, op, value } => {
                let current = self.lookup(name)?;
                let rhs = self.eval(value)?;
                let value = binary(*op, current, rhs)?;
                self.scope_mut().insert(name.clone(), value);
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::For { var, iter, body } => {
                let iterable = self.eval(iter)?;
                return self.exec_for(var, iterable, body);
            }
            Stmt::Def(def) => {
                self.scope_mut()
                    .insert(def.name.clone(), Value::Function(Rc::clone(def)));
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Pass => {}
        }
        Ok(Flow::Normal)
    }

    fn exec_for(
        &mut self,
        var: &str,
        iterable: Value,
        body: &[Stmt],
    ) -> Result<Flow, SandboxError> {
        match iterable {
            Value::Range { start, stop, step } => {
                let mut current = start;
                while (step > 0 && current < stop) || (step < 0 && current > stop) {
                    let flow = self.loop_iteration(var, Value::Int(current), body)?;
                    if let Flow::Return(value) = flow {
                        return Ok(Flow::Return(value));
                    }
                    let Some(next) = current.checked_add(step) else {
                        break;
                    };
                    current = next;
                }
            }
            Value::Str(text) => {
                for ch in text.chars() {
                    let flow = self.loop_iteration(var, Value::Str(ch.to_string()), body)?;
                    if let Flow::Return(value) = flow {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            other => {
                return Err(type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                )))
            }
        }
        Ok(Flow::Normal)
    }

    fn loop_iteration(
        &mut self,
        var: &str,
        item: Value,
        body: &[Stmt],
    ) -> Result<Flow, SandboxError> {
        self.tick()?;
        self.scope_mut().insert(var.to_string(), item);
        self.exec_block(body)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, SandboxError> {
        match expr {
            Expr::Int(value) => Ok(Value::Int(*value)),
            Expr::Str(value) => Ok(Value::Str(value.clone())),
            Expr::Bool(value) => Ok(Value::Bool(*value)),
            Expr::NoneLit => Ok(Value::None),
            Expr::Name(name) => self.lookup(name),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, value)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                match (op, truthy(&left)) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Compare { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                compare(*op, &left, &right).map(Value::Bool)
            }
            Expr::Call {
                callee,
                args,
                kwargs,
            } => {
                let callee = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let kwargs = kwargs
                    .iter()
                    .map(|(name, arg)| Ok((name.clone(), self.eval(arg)?)))
                    .collect::<Result<Vec<_>, SandboxError>>()?;
                self.call_value(&callee, args, kwargs)
            }
            Expr::Subscript { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                subscript(&target, &index)
            }
            Expr::Slice {
                target,
                start,
                stop,
                step,
            } => {
                let target = self.eval(target)?;
                let start = self.eval_slice_bound(start.as_deref())?;
                let stop = self.eval_slice_bound(stop.as_deref())?;
                let step = self.eval_slice_bound(step.as_deref())?;
                slice(&target, start, stop, step)
            }
        }
    }

    fn eval_slice_bound(&mut self, bound: Option<&Expr>) -> Result<Option<i64>, SandboxError> {
        let Some(expr) = bound else {
            return Ok(None);
        };
        match self.eval(expr)? {
            Value::None => Ok(None),
            value => as_int(&value).map(Some).ok_or_else(|| {
                type_error("slice indices must be integers or None")
            }),
        }
    }

    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, SandboxError> {
        self.tick()?;
        match callee {
            Value::Function(def) => self.call_function(def, args, kwargs),
            Value::Builtin(builtin) => self.call_builtin(*builtin, args, kwargs),
            other => Err(type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(
        &mut self,
        def: &Rc<FunctionDef>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, SandboxError> {
        let frame = bind_arguments(def, args, kwargs)?;
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(error(
                ErrorKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }
        self.frames.push(frame);
        let flow = self.exec_block(&def.body);
        self.frames.pop();
        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::None),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, SandboxError> {
        if builtin == Builtin::Print {
            return self.print(args, kwargs);
        }
        if !kwargs.is_empty() {
            return Err(type_error(format!(
                "{}() takes no keyword arguments",
                builtin.name()
            )));
        }
        match builtin {
            Builtin::Print => Ok(Value::None),
            Builtin::Range => range(args),
            Builtin::Len => {
                let [value] = exactly_one("len", args)?;
                len(&value).map(Value::Int)
            }
            Builtin::Str => match args.len() {
                0 => Ok(Value::str("")),
                1 => Ok(Value::Str(args[0].to_string())),
                n => Err(type_error(format!(
                    "str() takes at most 1 argument ({n} given)"
                ))),
            },
            Builtin::Int => match args.len() {
                0 => Ok(Value::Int(0)),
                1 => to_int(&args[0]),
                n => Err(type_error(format!(
                    "int() takes at most 1 argument ({n} given)"
                ))),
            },
        }
    }

    fn print(
        &mut self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, SandboxError> {
        let mut sep = " ".to_string();
        let mut end = "\n".to_string();
        for (name, value) in kwargs {
            let slot = match name.as_str() {
                "sep" => &mut sep,
                "end" => &mut end,
                other => {
                    return Err(type_error(format!(
                        "'{other}' is an invalid keyword argument for print()"
                    )))
                }
            };
            match value {
                Value::Str(text) => *slot = text,
                Value::None => {}
                other => {
                    return Err(type_error(format!(
                        "{name} must be None or a string, not {}",
                        other.type_name()
                    )))
                }
            }
        }

        let mut line = args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(&sep);
        line.push_str(&end);
        self.write_stdout(&line);
        Ok(Value::None)
    }

    /// Appends to captured stdout; output past `MAX_STDOUT_BYTES` is dropped.
    fn write_stdout(&mut self, text: &str) {
        let room = MAX_STDOUT_BYTES.saturating_sub(self.stdout.len());
        if text.len() <= room {
            self.stdout.push_str(text);
            return;
        }
        let mut cut = room;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        self.stdout.push_str(&text[..cut]);
    }
}

fn bind_arguments(
    def: &FunctionDef,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Scope, SandboxError> {
    let name = &def.name;
    if args.len() > def.params.len() {
        return Err(type_error(format!(
            "{name}() takes {} positional arguments but {} were given",
            def.params.len(),
            args.len()
        )));
    }

    let mut frame = Scope::new();
    for (param, value) in def.params.iter().zip(args) {
        frame.insert(param.clone(), value);
    }
    for (key, value) in kwargs {
        if !def.params.contains(&key) {
            return Err(type_error(format!(
                "{name}() got an unexpected keyword argument '{key}'"
            )));
        }
        if frame.contains_key(&key) {
            return Err(type_error(format!(
                "{name}() got multiple values for argument '{key}'"
            )));
        }
        frame.insert(key, value);
    }

    let missing: Vec<String> = def
        .params
        .iter()
        .filter(|param| !frame.contains_key(*param))
        .map(|param| format!("'{param}'"))
        .collect();
    if !missing.is_empty() {
        let plural = if missing.len() == 1 { "" } else { "s" };
        return Err(type_error(format!(
            "{name}() missing {} required positional argument{plural}: {}",
            missing.len(),
            missing.join(" and ")
        )));
    }
    Ok(frame)
}

fn exactly_one(name: &str, args: Vec<Value>) -> Result<[Value; 1], SandboxError> {
    let given = args.len();
    <[Value; 1]>::try_from(args).map_err(|_| {
        type_error(format!("{name}() takes exactly one argument ({given} given)"))
    })
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(value) => Some(*value),
        Value::Bool(value) => Some(i64::from(*value)),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::None => false,
        Value::Bool(value) => *value,
        Value::Int(value) => *value != 0,
        Value::Str(value) => !value.is_empty(),
        Value::Range { start, stop, step } => range_len(*start, *stop, *step) > 0,
        Value::Function(_) | Value::Builtin(_) => true,
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, SandboxError> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!truthy(&value)));
    }
    let Some(number) = as_int(&value) else {
        let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
        return Err(type_error(format!(
            "bad operand type for unary {symbol}: '{}'",
            value.type_name()
        )));
    };
    match op {
        UnaryOp::Neg => number.checked_neg().map(Value::Int).ok_or_else(overflow),
        _ => Ok(Value::Int(number)),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, SandboxError> {
    if let (Some(a), Some(b)) = (as_int(&left), as_int(&right)) {
        return int_binary(op, a, b);
    }
    match (op, &left, &right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => {
            check_string_size(a.len().saturating_add(b.len()))?;
            Ok(Value::Str(format!("{a}{b}")))
        }
        (BinaryOp::Mul, Value::Str(text), count) | (BinaryOp::Mul, count, Value::Str(text))
            if as_int(count).is_some() =>
        {
            let times = usize::try_from(as_int(count).unwrap_or(0).max(0)).unwrap_or(0);
            check_string_size(text.len().saturating_mul(times))?;
            Ok(Value::Str(text.repeat(times)))
        }
        _ => Err(type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op_symbol(op),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn check_string_size(bytes: usize) -> Result<(), SandboxError> {
    if bytes > MAX_STRING_BYTES {
        return Err(error(ErrorKind::MemoryError, "string too large"));
    }
    Ok(())
}

fn int_binary(op: BinaryOp, a: i64, b: i64) -> Result<Value, SandboxError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::FloorDiv | BinaryOp::Mod if b == 0 => {
            let what = if op == BinaryOp::Mod { "modulo" } else { "division" };
            return Err(error(
                ErrorKind::ZeroDivisionError,
                format!("integer {what} by zero"),
            ));
        }
        BinaryOp::FloorDiv => floor_div(a, b),
        BinaryOp::Mod => floor_mod(a, b),
    };
    result.map(Value::Int).ok_or_else(overflow)
}

/// Division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

/// Remainder with the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let remainder = a.checked_rem(b)?;
    if remainder != 0 && ((remainder < 0) != (b < 0)) {
        remainder.checked_add(b)
    } else {
        Some(remainder)
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Mod => "%",
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, SandboxError> {
    let ordering = match (as_int(left), as_int(right), left, right) {
        (Some(a), Some(b), _, _) => Some(a.cmp(&b)),
        (_, _, Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match (op, ordering) {
        (CompareOp::Eq, Some(ordering)) => Ok(ordering.is_eq()),
        (CompareOp::NotEq, Some(ordering)) => Ok(ordering.is_ne()),
        (CompareOp::Eq, None) => Ok(left == right),
        (CompareOp::NotEq, None) => Ok(left != right),
        (CompareOp::Lt, Some(ordering)) => Ok(ordering.is_lt()),
        (CompareOp::LtE, Some(ordering)) => Ok(ordering.is_le()),
        (CompareOp::Gt, Some(ordering)) => Ok(ordering.is_gt()),
        (CompareOp::GtE, Some(ordering)) => Ok(ordering.is_ge()),
        (op, None) => {
            let symbol = match op {
                CompareOp::Lt => "<",
                CompareOp::LtE => "<=",
                CompareOp::Gt => ">",
                _ => ">=",
            };
            Err(type_error(format!(
                "'{symbol}' not supported between instances of '{}' and '{}'",
                left.type_name(),
                right.type_name()
            )))
        }
    }
}

fn range_len(start: i64, stop: i64, step: i64) -> i64 {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let len = if step > 0 && start < stop {
        (stop - start - 1) / step + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) / (-step) + 1
    } else {
        0
    };
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn range(args: Vec<Value>) -> Result<Value, SandboxError> {
    let ints = args
        .iter()
        .map(|arg| {
            as_int(arg).ok_or_else(|| {
                type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    arg.type_name()
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        [] => return Err(type_error("range expected at least 1 argument, got 0")),
        more => {
            return Err(type_error(format!(
                "range expected at most 3 arguments, got {}",
                more.len()
            )))
        }
    };
    if step == 0 {
        return Err(error(ErrorKind::ValueError, "range() arg 3 must not be zero"));
    }
    Ok(Value::Range { start, stop, step })
}

fn len(value: &Value) -> Result<i64, SandboxError> {
    match value {
        Value::Str(text) => Ok(i64::try_from(text.chars().count()).unwrap_or(i64::MAX)),
        Value::Range { start, stop, step } => Ok(range_len(*start, *stop, *step)),
        other => Err(type_error(format!(
            "object of type '{}' has no len()",
            other.type_name()
        ))),
    }
}

fn to_int(value: &Value) -> Result<Value, SandboxError> {
    if let Some(number) = as_int(value) {
        return Ok(Value::Int(number));
    }
    match value {
        Value::Str(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| {
                error(
                    ErrorKind::ValueError,
                    format!("invalid literal for int() with base 10: '{text}'"),
                )
            }),
        other => Err(type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

/// Resolves a possibly negative index against `len`.
fn normalize_index(index: i64, len: i64) -> Option<i64> {
    let resolved = if index < 0 { index.checked_add(len)? } else { index };
    (0..len).contains(&resolved).then_some(resolved)
}

fn subscript(target: &Value, index: &Value) -> Result<Value, SandboxError> {
    let Some(raw) = as_int(index) else {
        return Err(type_error(format!(
            "{} indices must be integers, not '{}'",
            target.type_name(),
            index.type_name()
        )));
    };
    match target {
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            let len = i64::try_from(chars.len()).unwrap_or(i64::MAX);
            normalize_index(raw, len)
                .and_then(|i| chars.get(i as usize))
                .map(|ch| Value::Str(ch.to_string()))
                .ok_or_else(|| error(ErrorKind::IndexError, "string index out of range"))
        }
        Value::Range { start, stop, step } => normalize_index(raw, range_len(*start, *stop, *step))
            .and_then(|i| i.checked_mul(*step)?.checked_add(*start))
            .map(Value::Int)
            .ok_or_else(|| error(ErrorKind::IndexError, "range object index out of range")),
        other => Err(type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// Resolves slice bounds the way Python does for a sequence of `len`,
/// returning the selected indices.
fn slice_indices(len: i64, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<i64> {
    let adjust = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound.saturating_add(len) } else { bound };
        bound.clamp(low, high)
    };
    let (start, stop) = if step > 0 {
        (
            start.map_or(0, |s| adjust(s, 0, len)),
            stop.map_or(len, |s| adjust(s, 0, len)),
        )
    } else {
        (
            start.map_or(len - 1, |s| adjust(s, -1, len - 1)),
            stop.map_or(-1, |s| adjust(s, -1, len - 1)),
        )
    };

    let mut indices = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        indices.push(i);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    indices
}

fn slice(
    target: &Value,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Value, SandboxError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(error(ErrorKind::ValueError, "slice step cannot be zero"));
    }
    let Value::Str(text) = target else {
        return Err(type_error(format!(
            "'{}' object is not subscriptable",
            target.type_name()
        )));
    };
    let chars: Vec<char> = text.chars().collect();
    let len = i64::try_from(chars.len()).unwrap_or(i64::MAX);
    let sliced: String = slice_indices(len, start, stop, step)
        .into_iter()
        .filter_map(|i| chars.get(i as usize))
        .collect();
    Ok(Value::Str(sliced))
}
