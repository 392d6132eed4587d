//! Frames: named scopes holding variable slots, and the three-register
//! frame model (GF/TF/LF-stack) the execution engine maintains.

use std::collections::HashMap;
use std::fmt;

use crate::error::InterpretError;
use crate::value::{Slot, Value};

/// Which frame register a variable reference resolves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTag {
    Gf,
    Lf,
    Tf,
}

impl FrameTag {
    pub fn from_str(s: &str) -> Option<FrameTag> {
        match s {
            "GF" => Some(FrameTag::Gf),
            "LF" => Some(FrameTag::Lf),
            "TF" => Some(FrameTag::Tf),
            _ => None,
        }
    }
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrameTag::Gf => "GF",
            FrameTag::Lf => "LF",
            FrameTag::Tf => "TF",
        };
        write!(f, "{s}")
    }
}

/// An ordered-irrelevant mapping from variable name to slot. Variables can
/// only be added, never removed; redefining one is a `SEM` error.
#[derive(Debug, Default, Clone)]
pub struct Frame {
    variables: HashMap<String, Slot>,
}

impl Frame {
    pub fn new() -> Frame {
        Frame { variables: HashMap::new() }
    }

    /// Declare a fresh, undefined slot. Fails if `name` is already declared.
    pub fn define(&mut self, name: &str) -> Result<(), InterpretError> {
        if self.variables.contains_key(name) {
            return Err(InterpretError::sem(format!("variable '{name}' is already defined")));
        }
        self.variables.insert(name.to_string(), None);
        Ok(())
    }

    /// Overwrite a declared slot with a value. Fails if `name` was never
    /// declared in this frame.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), InterpretError> {
        let slot = self
            .variables
            .get_mut(name)
            .ok_or_else(|| InterpretError::var(format!("variable '{name}' does not exist")))?;
        *slot = Some(value);
        Ok(())
    }

    /// Number of variables declared in this frame, defined or not.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Read a declared slot. When `lenient` is false, reading an undefined
    /// slot fails with `VALUE_MISSING`; when true (only `TYPE` asks for
    /// this), an undefined slot is reported as `None` instead of failing.
    pub fn read(&self, name: &str, lenient: bool) -> Result<Option<Value>, InterpretError> {
        let slot = self
            .variables
            .get(name)
            .ok_or_else(|| InterpretError::var(format!("variable '{name}' does not exist")))?;
        match slot {
            Some(value) => Ok(Some(value.clone())),
            None if lenient => Ok(None),
            None => Err(InterpretError::value_missing(format!("variable '{name}' has no value yet"))),
        }
    }
}

/// The three frame registers the engine maintains: a permanent global
/// frame, an optional temporary frame, and a stack of local frames whose
/// top is the active `LF`.
#[derive(Debug, Default)]
pub struct Frames {
    pub gf: Frame,
    pub tf: Option<Frame>,
    pub lf_stack: Vec<Frame>,
}

impl Frames {
    pub fn new() -> Frames {
        Frames { gf: Frame::new(), tf: None, lf_stack: Vec::new() }
    }

    /// Resolve a frame tag to the frame it currently refers to.
    pub fn get(&self, tag: FrameTag) -> Result<&Frame, InterpretError> {
        match tag {
            FrameTag::Gf => Ok(&self.gf),
            FrameTag::Tf => self.tf.as_ref().ok_or_else(|| InterpretError::frame("temporary frame does not exist")),
            FrameTag::Lf => self.lf_stack.last().ok_or_else(|| InterpretError::frame("local frame stack is empty")),
        }
    }

    /// Resolve a frame tag to the frame it currently refers to, mutably.
    pub fn get_mut(&mut self, tag: FrameTag) -> Result<&mut Frame, InterpretError> {
        match tag {
            FrameTag::Gf => Ok(&mut self.gf),
            FrameTag::Tf => self.tf.as_mut().ok_or_else(|| InterpretError::frame("temporary frame does not exist")),
            FrameTag::Lf => self.lf_stack.last_mut().ok_or_else(|| InterpretError::frame("local frame stack is empty")),
        }
    }

    /// `CREATEFRAME`: always replaces whatever `TF` held, if anything.
    pub fn create_frame(&mut self) {
        self.tf = Some(Frame::new());
    }

    /// `PUSHFRAME`: move `TF` onto the local-frame stack, clearing `TF`.
    pub fn push_frame(&mut self) -> Result<(), InterpretError> {
        let tf = self.tf.take().ok_or_else(|| InterpretError::frame("temporary frame does not exist"))?;
        self.lf_stack.push(tf);
        Ok(())
    }

    /// `POPFRAME`: move the top local frame back into `TF`.
    pub fn pop_frame(&mut self) -> Result<(), InterpretError> {
        let lf = self.lf_stack.pop().ok_or_else(|| InterpretError::frame("local frame stack is empty"))?;
        self.tf = Some(lf);
        Ok(())
    }
}
