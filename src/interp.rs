//! The execution engine: fetch-dispatch loop, frames, call stack, data
//! stack, and the typed semantics of every opcode (spec §5-§7).

use std::cmp::Ordering;
use std::io::{BufRead, Write};

use crate::error::{InterpretError, RunError};
use crate::frame::{FrameTag, Frames};
use crate::label::LabelMap;
use crate::program::{Opcode, Operand, Program, TypeKeyword};
use crate::value::Value;

/// Holds everything that changes while a program runs: the three frames,
/// the call stack of return addresses, the data stack used by `PUSHS`
/// and friends, and the program counter.
pub struct Interpreter<'p, R, O, E> {
    program: &'p Program,
    labels: &'p LabelMap,
    frames: Frames,
    call_stack: Vec<usize>,
    data_stack: Vec<Value>,
    pc: usize,
    input: R,
    stdout: O,
    stderr: E,
    executed: u64,
}

impl<'p, R: BufRead, O: Write, E: Write> Interpreter<'p, R, O, E> {
    pub fn new(program: &'p Program, labels: &'p LabelMap, input: R, stdout: O, stderr: E) -> Self {
        Interpreter {
            program,
            labels,
            frames: Frames::new(),
            call_stack: Vec::new(),
            data_stack: Vec::new(),
            pc: 0,
            input,
            stdout,
            stderr,
            executed: 0,
        }
    }

    /// Run to completion. Returns the process exit code: 0 for falling off
    /// the end of the program, or whatever `EXIT` was given.
    pub fn run(mut self) -> Result<u8, RunError> {
        loop {
            if self.pc >= self.program.len() {
                return Ok(0);
            }
            // Instructions never mutate `self.program`; indexing by value
            // avoids holding a borrow of `self` across the call to `step`.
            let instr_index = self.pc;
            if let Some(code) = self.step(instr_index)? {
                return Ok(code);
            }
        }
    }

    fn step(&mut self, index: usize) -> Result<Option<u8>, RunError> {
        let instr = &self.program[index];
        let opcode = instr.opcode;
        let mut next_pc = self.pc + 1;
        self.executed += 1;

        match opcode {
            Opcode::Createframe => self.frames.create_frame(),
            Opcode::Pushframe => self.frames.push_frame()?,
            Opcode::Popframe => self.frames.pop_frame()?,
            Opcode::Return => {
                next_pc = self
                    .call_stack
                    .pop()
                    .ok_or_else(|| InterpretError::value_missing("RETURN with an empty call stack"))?;
            }
            Opcode::Break => self.exec_break()?,

            Opcode::Defvar => {
                let (tag, name) = var_operand(&instr.operands[0]);
                self.frames.get_mut(tag)?.define(name)?;
            }
            Opcode::Pops => {
                let (tag, name) = var_operand(&instr.operands[0]);
                let v = self.pop_value()?;
                self.frames.get_mut(tag)?.assign(name, v)?;
            }
            Opcode::Call => {
                self.call_stack.push(next_pc);
                next_pc = self.resolve_label(&instr.operands[0])?;
            }
            Opcode::Label => {}
            Opcode::Jump => {
                next_pc = self.resolve_label(&instr.operands[0])?;
            }
            Opcode::Jumpifeqs | Opcode::Jumpifneqs => {
                let b = self.pop_value()?;
                let a = self.pop_value()?;
                let eq = values_eq(&a, &b)?;
                let take = if opcode == Opcode::Jumpifeqs { eq } else { !eq };
                if take {
                    next_pc = self.resolve_label(&instr.operands[0])?;
                }
            }

            Opcode::Pushs => {
                let v = self.resolve_symb(&instr.operands[0])?;
                self.data_stack.push(v);
            }
            Opcode::Write => {
                let v = self.resolve_symb(&instr.operands[0])?;
                write!(self.stdout, "{v}")?;
            }
            Opcode::Exit => {
                let v = self.resolve_symb(&instr.operands[0])?;
                return Ok(Some(exit_code_from_value(v)?));
            }
            Opcode::Dprint => {
                let v = self.resolve_symb(&instr.operands[0])?;
                write!(self.stderr, "{v}")?;
            }

            Opcode::Move => {
                let (tag, name) = var_operand(&instr.operands[0]);
                let v = self.resolve_symb(&instr.operands[1])?;
                self.frames.get_mut(tag)?.assign(name, v)?;
            }
            Opcode::Int2char => self.write_unary(&instr.operands, int2char_impl)?,
            Opcode::Strlen => self.write_unary(&instr.operands, strlen_impl)?,
            Opcode::Type => {
                let (tag, name) = var_operand(&instr.operands[0]);
                let v = self.resolve_symb_lenient(&instr.operands[1])?;
                self.frames.get_mut(tag)?.assign(name, type_impl(v))?;
            }
            Opcode::Not => self.write_unary(&instr.operands, not_impl)?,
            Opcode::Read => {
                let (tag, name) = var_operand(&instr.operands[0]);
                let kw = match &instr.operands[1] {
                    Operand::Type(kw) => *kw,
                    _ => unreachable!("READ's signature guarantees a type operand"),
                };
                let v = self.exec_read(kw)?;
                self.frames.get_mut(tag)?.assign(name, v)?;
            }

            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Idiv => {
                self.write_binary(&instr.operands, |a, b| apply_arith(opcode, a, b))?;
            }
            Opcode::Lt | Opcode::Gt | Opcode::Eq => {
                self.write_binary(&instr.operands, |a, b| apply_compare(opcode, a, b))?;
            }
            Opcode::And | Opcode::Or => {
                self.write_binary(&instr.operands, |a, b| apply_logic2(opcode, a, b))?;
            }
            Opcode::Stri2int => self.write_binary(&instr.operands, stri2int_impl)?,
            Opcode::Concat => self.write_binary(&instr.operands, concat_impl)?,
            Opcode::Getchar => self.write_binary(&instr.operands, getchar_impl)?,
            Opcode::Setchar => {
                let (tag, name) = var_operand(&instr.operands[0]);
                let current = self
                    .frames
                    .get(tag)?
                    .read(name, false)?
                    .expect("lenient=false guarantees Some");
                let i = self.resolve_symb(&instr.operands[1])?;
                let s = self.resolve_symb(&instr.operands[2])?;
                let r = setchar_impl(&current, &i, &s)?;
                self.frames.get_mut(tag)?.assign(name, r)?;
            }
            Opcode::Jumpifeq | Opcode::Jumpifneq => {
                let a = self.resolve_symb(&instr.operands[1])?;
                let b = self.resolve_symb(&instr.operands[2])?;
                let eq = values_eq(&a, &b)?;
                let take = if opcode == Opcode::Jumpifeq { eq } else { !eq };
                if take {
                    next_pc = self.resolve_label(&instr.operands[0])?;
                }
            }

            Opcode::Clears => self.data_stack.clear(),
            Opcode::Adds | Opcode::Subs | Opcode::Muls | Opcode::Idivs => {
                self.pop_apply_binary(|a, b| apply_arith(opcode, a, b))?;
            }
            Opcode::Lts | Opcode::Gts | Opcode::Eqs => {
                self.pop_apply_binary(|a, b| apply_compare(opcode, a, b))?;
            }
            Opcode::Ands | Opcode::Ors => {
                self.pop_apply_binary(|a, b| apply_logic2(opcode, a, b))?;
            }
            Opcode::Nots => {
                let a = self.pop_value()?;
                self.data_stack.push(not_impl(&a)?);
            }
            Opcode::Int2chars => {
                let a = self.pop_value()?;
                self.data_stack.push(int2char_impl(&a)?);
            }
            Opcode::Stri2ints => {
                let i = self.pop_value()?;
                let s = self.pop_value()?;
                self.data_stack.push(stri2int_impl(&s, &i)?);
            }
        }

        self.pc = next_pc;
        Ok(None)
    }

    fn resolve_symb(&self, operand: &Operand) -> Result<Value, InterpretError> {
        match operand {
            Operand::Literal(v) => Ok(v.clone()),
            Operand::Var(tag, name) => {
                Ok(self.frames.get(*tag)?.read(name, false)?.expect("lenient=false guarantees Some"))
            }
            _ => unreachable!("SYMB operands are always literals or variables"),
        }
    }

    fn resolve_symb_lenient(&self, operand: &Operand) -> Result<Option<Value>, InterpretError> {
        match operand {
            Operand::Literal(v) => Ok(Some(v.clone())),
            Operand::Var(tag, name) => self.frames.get(*tag)?.read(name, true),
            _ => unreachable!("SYMB operands are always literals or variables"),
        }
    }

    fn resolve_label(&self, operand: &Operand) -> Result<usize, InterpretError> {
        match operand {
            Operand::Label(name) => self
                .labels
                .get(name)
                .copied()
                .ok_or_else(|| InterpretError::sem(format!("jump to undefined label '{name}'"))),
            _ => unreachable!("label operands are always resolved labels"),
        }
    }

    fn pop_value(&mut self) -> Result<Value, InterpretError> {
        self.data_stack.pop().ok_or_else(|| InterpretError::value_missing("the data stack is empty"))
    }

    /// Resolve a `[Var, Symb]` instruction's operands, apply `f`, and
    /// assign the result. Shared by `INT2CHAR`, `STRLEN`, `NOT`.
    fn write_unary(
        &mut self,
        operands: &[Operand],
        f: impl Fn(&Value) -> Result<Value, InterpretError>,
    ) -> Result<(), InterpretError> {
        let (tag, name) = var_operand(&operands[0]);
        let a = self.resolve_symb(&operands[1])?;
        let r = f(&a)?;
        self.frames.get_mut(tag)?.assign(name, r)
    }

    /// Resolve a `[Var, Symb, Symb]` instruction's operands, apply `f`,
    /// and assign the result.
    fn write_binary(
        &mut self,
        operands: &[Operand],
        f: impl Fn(&Value, &Value) -> Result<Value, InterpretError>,
    ) -> Result<(), InterpretError> {
        let (tag, name) = var_operand(&operands[0]);
        let a = self.resolve_symb(&operands[1])?;
        let b = self.resolve_symb(&operands[2])?;
        let r = f(&a, &b)?;
        self.frames.get_mut(tag)?.assign(name, r)
    }

    /// Pop two values (second operand on top), apply `f`, push the result.
    fn pop_apply_binary(&mut self, f: impl Fn(&Value, &Value) -> Result<Value, InterpretError>) -> Result<(), InterpretError> {
        let b = self.pop_value()?;
        let a = self.pop_value()?;
        self.data_stack.push(f(&a, &b)?);
        Ok(())
    }

    fn exec_read(&mut self, kw: TypeKeyword) -> Result<Value, InterpretError> {
        let mut line = String::new();
        let bytes_read = self.input.read_line(&mut line).unwrap_or(0);
        if bytes_read == 0 {
            return Ok(Value::Nil);
        }
        let line = line.trim_end();
        Ok(match kw {
            TypeKeyword::Int => {
                if crate::lex::is_int(line) {
                    line.parse().map(Value::Int).unwrap_or(Value::Nil)
                } else {
                    Value::Nil
                }
            }
            TypeKeyword::Bool => Value::Bool(line.eq_ignore_ascii_case("true")),
            TypeKeyword::Str => Value::Str(line.to_string()),
        })
    }

    fn exec_break(&mut self) -> Result<(), InterpretError> {
        writeln!(
            self.stderr,
            "pos={} executed={} gf={} lf_depth={} tf={} call_depth={} data_depth={}",
            self.pc,
            self.executed,
            self.frames.gf.len(),
            self.frames.lf_stack.len(),
            self.frames.tf.is_some(),
            self.call_stack.len(),
            self.data_stack.len(),
        )
        .map_err(|_| InterpretError::invalid_struct("BREAK: failed to write to stderr"))
    }
}

fn var_operand(operand: &Operand) -> (FrameTag, &str) {
    match operand {
        Operand::Var(tag, name) => (*tag, name.as_str()),
        _ => unreachable!("VAR operands are always variables"),
    }
}

fn expect_int(v: &Value) -> Result<i64, InterpretError> {
    match v {
        Value::Int(i) => Ok(*i),
        other => Err(InterpretError::types(format!("expected int, got {}", other.tag_name()))),
    }
}

fn expect_bool(v: &Value) -> Result<bool, InterpretError> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(InterpretError::types(format!("expected bool, got {}", other.tag_name()))),
    }
}

fn expect_str(v: &Value) -> Result<&str, InterpretError> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(InterpretError::types(format!("expected string, got {}", other.tag_name()))),
    }
}

/// Shared by `ADD`/`SUB`/`MUL`/`IDIV` and their stack-popping counterparts.
fn apply_arith(opcode: Opcode, a: &Value, b: &Value) -> Result<Value, InterpretError> {
    let x = expect_int(a)?;
    let y = expect_int(b)?;
    match opcode {
        Opcode::Add | Opcode::Adds => Ok(Value::Int(x.wrapping_add(y))),
        Opcode::Sub | Opcode::Subs => Ok(Value::Int(x.wrapping_sub(y))),
        Opcode::Mul | Opcode::Muls => Ok(Value::Int(x.wrapping_mul(y))),
        Opcode::Idiv | Opcode::Idivs => {
            if y == 0 {
                return Err(InterpretError::value_wrong("division by zero"));
            }
            Ok(Value::Int(x.wrapping_div(y)))
        }
        _ => unreachable!(),
    }
}

/// Ordering between two same-tagged, non-nil values. `LT`/`GT` reject any
/// other combination, including a `Nil` on either side.
fn value_cmp(a: &Value, b: &Value) -> Result<Ordering, InterpretError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        _ => Err(InterpretError::types("LT/GT require two operands of the same non-nil type")),
    }
}

/// `EQ`'s looser rule: `nil` compares equal only to `nil`, and otherwise
/// never equal to a differently-tagged value.
fn values_eq(a: &Value, b: &Value) -> Result<bool, InterpretError> {
    match (a, b) {
        (Value::Nil, Value::Nil) => Ok(true),
        (Value::Nil, _) | (_, Value::Nil) => Ok(false),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        _ => Err(InterpretError::types("EQ requires two operands of the same type")),
    }
}

/// Shared by `LT`/`GT`/`EQ` and their stack-popping counterparts.
fn apply_compare(opcode: Opcode, a: &Value, b: &Value) -> Result<Value, InterpretError> {
    match opcode {
        Opcode::Lt | Opcode::Lts => Ok(Value::Bool(value_cmp(a, b)? == Ordering::Less)),
        Opcode::Gt | Opcode::Gts => Ok(Value::Bool(value_cmp(a, b)? == Ordering::Greater)),
        Opcode::Eq | Opcode::Eqs => Ok(Value::Bool(values_eq(a, b)?)),
        _ => unreachable!(),
    }
}

/// Shared by `AND`/`OR` and their stack-popping counterparts.
fn apply_logic2(opcode: Opcode, a: &Value, b: &Value) -> Result<Value, InterpretError> {
    let x = expect_bool(a)?;
    let y = expect_bool(b)?;
    match opcode {
        Opcode::And | Opcode::Ands => Ok(Value::Bool(x && y)),
        Opcode::Or | Opcode::Ors => Ok(Value::Bool(x || y)),
        _ => unreachable!(),
    }
}

fn not_impl(a: &Value) -> Result<Value, InterpretError> {
    Ok(Value::Bool(!expect_bool(a)?))
}

fn int2char_impl(a: &Value) -> Result<Value, InterpretError> {
    let n = expect_int(a)?;
    if !(0..=0x10FFFF).contains(&n) {
        return Err(InterpretError::string(format!("{n} is not a valid character code")));
    }
    let c = char::from_u32(n as u32).ok_or_else(|| InterpretError::string(format!("{n} is not a valid character code")))?;
    Ok(Value::Str(c.to_string()))
}

fn strlen_impl(a: &Value) -> Result<Value, InterpretError> {
    let s = expect_str(a)?;
    Ok(Value::Int(s.chars().count() as i64))
}

fn type_impl(v: Option<Value>) -> Value {
    match v {
        Some(v) => Value::Str(v.tag_name().to_string()),
        None => Value::Str(String::new()),
    }
}

fn char_at(s: &str, idx: i64) -> Result<usize, InterpretError> {
    if idx < 0 || (idx as usize) >= s.chars().count() {
        return Err(InterpretError::string(format!("index {idx} is out of bounds")));
    }
    Ok(idx as usize)
}

fn stri2int_impl(s: &Value, i: &Value) -> Result<Value, InterpretError> {
    let s = expect_str(s)?;
    let i = expect_int(i)?;
    let idx = char_at(s, i)?;
    let c = s.chars().nth(idx).expect("bounds already checked");
    Ok(Value::Int(c as i64))
}

fn getchar_impl(s: &Value, i: &Value) -> Result<Value, InterpretError> {
    let s = expect_str(s)?;
    let i = expect_int(i)?;
    let idx = char_at(s, i)?;
    let c = s.chars().nth(idx).expect("bounds already checked");
    Ok(Value::Str(c.to_string()))
}

fn concat_impl(a: &Value, b: &Value) -> Result<Value, InterpretError> {
    let a = expect_str(a)?;
    let b = expect_str(b)?;
    Ok(Value::Str(format!("{a}{b}")))
}

fn setchar_impl(current: &Value, i: &Value, replacement: &Value) -> Result<Value, InterpretError> {
    let mut chars: Vec<char> = expect_str(current)?.chars().collect();
    let i = expect_int(i)?;
    if i < 0 || (i as usize) >= chars.len() {
        return Err(InterpretError::string(format!("index {i} is out of bounds")));
    }
    let repl = expect_str(replacement)?;
    let c = repl.chars().next().ok_or_else(|| InterpretError::string("SETCHAR's replacement string is empty"))?;
    chars[i as usize] = c;
    Ok(Value::Str(chars.into_iter().collect()))
}

fn exit_code_from_value(v: Value) -> Result<u8, InterpretError> {
    match v {
        Value::Int(i) if (0..=49).contains(&i) => Ok(i as u8),
        Value::Int(i) => Err(InterpretError::value_wrong(format!("EXIT code {i} is out of range 0..49"))),
        other => Err(InterpretError::types(format!("EXIT requires an int operand, got {}", other.tag_name()))),
    }
}
