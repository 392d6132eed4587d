//! The instruction set: opcodes, operands, and the signature table that
//! the loader validates every instruction against (spec §3-§4.3).

use crate::frame::FrameTag;
use crate::value::Value;

/// The type keyword accepted by `READ`'s second operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKeyword {
    Int,
    Str,
    Bool,
}

impl TypeKeyword {
    pub fn from_str(s: &str) -> Option<TypeKeyword> {
        match s {
            "int" => Some(TypeKeyword::Int),
            "string" => Some(TypeKeyword::Str),
            "bool" => Some(TypeKeyword::Bool),
            _ => None,
        }
    }
}

/// A resolved instruction operand. Literal operands already carry their
/// decoded `Value` (string escapes substituted once, at load time).
#[derive(Debug, Clone)]
pub enum Operand {
    Var(FrameTag, String),
    Label(String),
    Type(TypeKeyword),
    Literal(Value),
}

/// The abstract operand kind used for signature matching: literal kinds
/// collapse into `Symb`, and `Var` collapses into `Symb` too wherever the
/// signature accepts either a variable or a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbstractKind {
    Var,
    Label,
    Type,
    Symb,
}

/// Every opcode in the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Createframe,
    Pushframe,
    Popframe,
    Return,
    Break,
    Defvar,
    Pops,
    Call,
    Label,
    Jump,
    Jumpifeqs,
    Jumpifneqs,
    Pushs,
    Write,
    Exit,
    Dprint,
    Move,
    Int2char,
    Strlen,
    Type,
    Not,
    Read,
    Add,
    Sub,
    Mul,
    Idiv,
    Lt,
    Gt,
    Eq,
    And,
    Or,
    Stri2int,
    Concat,
    Getchar,
    Setchar,
    Jumpifeq,
    Jumpifneq,
    Clears,
    Adds,
    Subs,
    Muls,
    Idivs,
    Lts,
    Gts,
    Eqs,
    Ands,
    Ors,
    Nots,
    Int2chars,
    Stri2ints,
}

impl Opcode {
    /// Look up an opcode by its case-insensitive textual name.
    pub fn from_name(name: &str) -> Option<Opcode> {
        use Opcode::*;
        Some(match name.to_ascii_uppercase().as_str() {
            "CREATEFRAME" => Createframe,
            "PUSHFRAME" => Pushframe,
            "POPFRAME" => Popframe,
            "RETURN" => Return,
            "BREAK" => Break,
            "DEFVAR" => Defvar,
            "POPS" => Pops,
            "CALL" => Call,
            "LABEL" => Label,
            "JUMP" => Jump,
            "JUMPIFEQS" => Jumpifeqs,
            "JUMPIFNEQS" => Jumpifneqs,
            "PUSHS" => Pushs,
            "WRITE" => Write,
            "EXIT" => Exit,
            "DPRINT" => Dprint,
            "MOVE" => Move,
            "INT2CHAR" => Int2char,
            "STRLEN" => Strlen,
            "TYPE" => Type,
            "NOT" => Not,
            "READ" => Read,
            "ADD" => Add,
            "SUB" => Sub,
            "MUL" => Mul,
            "IDIV" => Idiv,
            "LT" => Lt,
            "GT" => Gt,
            "EQ" => Eq,
            "AND" => And,
            "OR" => Or,
            "STRI2INT" => Stri2int,
            "CONCAT" => Concat,
            "GETCHAR" => Getchar,
            "SETCHAR" => Setchar,
            "JUMPIFEQ" => Jumpifeq,
            "JUMPIFNEQ" => Jumpifneq,
            "CLEARS" => Clears,
            "ADDS" => Adds,
            "SUBS" => Subs,
            "MULS" => Muls,
            "IDIVS" => Idivs,
            "LTS" => Lts,
            "GTS" => Gts,
            "EQS" => Eqs,
            "ANDS" => Ands,
            "ORS" => Ors,
            "NOTS" => Nots,
            "INT2CHARS" => Int2chars,
            "STRI2INTS" => Stri2ints,
            _ => return None,
        })
    }

    /// The declared operand-kind signature, in positional order.
    pub fn signature(self) -> &'static [AbstractKind] {
        use AbstractKind::*;
        use Opcode::*;
        match self {
            Createframe | Pushframe | Popframe | Return | Break | Clears | Adds | Subs | Muls | Idivs | Lts | Gts
            | Eqs | Ands | Ors | Nots | Int2chars | Stri2ints => &[],
            Defvar | Pops => &[Var],
            Call | Label | Jump | Jumpifeqs | Jumpifneqs => &[AbstractKind::Label],
            Pushs | Write | Exit | Dprint => &[Symb],
            Move | Int2char | Strlen | Type | Not => &[Var, Symb],
            Read => &[Var, AbstractKind::Type],
            Add | Sub | Mul | Idiv | Lt | Gt | Eq | And | Or | Stri2int | Concat | Getchar | Setchar => {
                &[Var, Symb, Symb]
            }
            Jumpifeq | Jumpifneq => &[AbstractKind::Label, Symb, Symb],
        }
    }
}

/// An opcode together with its resolved operands, in program order.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

/// The sorted, validated sequence of instructions that make up a program.
pub type Program = Vec<Instruction>;
