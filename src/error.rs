//! Exit-code taxonomy and the one error type the rest of the crate returns.
//!
//! Every failure is fatal: there is no recovery, just a classification into
//! one of the nine codes below and a human-readable message.

use std::fmt;

/// The nine fatal outcomes an interpreter run can have, beyond a clean exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidFormat,
    InvalidStruct,
    Sem,
    Types,
    Var,
    Frame,
    ValueMissing,
    ValueWrong,
    Str,
}

impl ErrorKind {
    /// The process exit code this kind terminates with.
    pub fn code(self) -> u8 {
        match self {
            ErrorKind::InvalidFormat => 31,
            ErrorKind::InvalidStruct => 32,
            ErrorKind::Sem => 52,
            ErrorKind::Types => 53,
            ErrorKind::Var => 54,
            ErrorKind::Frame => 55,
            ErrorKind::ValueMissing => 56,
            ErrorKind::ValueWrong => 57,
            ErrorKind::Str => 58,
        }
    }
}

/// A fatal interpreter error: a classification plus a one-line message.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretError {
    pub kind: ErrorKind,
    pub message: String,
}

impl InterpretError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> InterpretError {
        InterpretError { kind, message: message.into() }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.code()
    }
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for InterpretError {}

macro_rules! ctor {
    ($name:ident, $kind:ident) => {
        pub fn $name(message: impl Into<String>) -> InterpretError {
            InterpretError::new(ErrorKind::$kind, message)
        }
    };
}

impl InterpretError {
    ctor!(invalid_format, InvalidFormat);
    ctor!(invalid_struct, InvalidStruct);
    ctor!(sem, Sem);
    ctor!(types, Types);
    ctor!(var, Var);
    ctor!(frame, Frame);
    ctor!(value_missing, ValueMissing);
    ctor!(value_wrong, ValueWrong);
    ctor!(string, Str);
}

/// Wraps the two ways a run can fail: a classified `InterpretError`, or a
/// genuine I/O failure writing to stdout/stderr or reading from input. The
/// latter sits outside the nine-code taxonomy entirely.
#[derive(Debug)]
pub enum RunError {
    Interpret(InterpretError),
    Io(std::io::Error),
}

impl From<InterpretError> for RunError {
    fn from(err: InterpretError) -> RunError {
        RunError::Interpret(err)
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> RunError {
        RunError::Io(err)
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Interpret(err) => write!(f, "{err}"),
            RunError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for RunError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_spec() {
        assert_eq!(ErrorKind::InvalidFormat.code(), 31);
        assert_eq!(ErrorKind::InvalidStruct.code(), 32);
        assert_eq!(ErrorKind::Sem.code(), 52);
        assert_eq!(ErrorKind::Types.code(), 53);
        assert_eq!(ErrorKind::Var.code(), 54);
        assert_eq!(ErrorKind::Frame.code(), 55);
        assert_eq!(ErrorKind::ValueMissing.code(), 56);
        assert_eq!(ErrorKind::ValueWrong.code(), 57);
        assert_eq!(ErrorKind::Str.code(), 58);
    }

    #[test]
    fn display_is_just_the_message() {
        let err = InterpretError::sem("duplicate label 'x'");
        assert_eq!(err.to_string(), "duplicate label 'x'");
        assert_eq!(err.exit_code(), 52);
    }
}
