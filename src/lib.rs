//! An interpreter for IPPcode21, an assembly-like intermediate
//! representation delivered as XML.

pub mod error;
pub mod frame;
pub mod interp;
pub mod label;
pub mod lex;
pub mod loader;
pub mod program;
pub mod value;

use std::io::{BufRead, Write};

use error::RunError;
use interp::Interpreter;

/// Load, validate, and run a program read from `source`, using `input` for
/// `READ` and writing `WRITE`/`DPRINT`/`BREAK` output to `stdout`/`stderr`.
///
/// Returns the process exit code on success. On a fatal error the message
/// is already written to `stderr`; the caller only needs to propagate the
/// returned code.
///
/// ```
/// use std::io::Cursor;
///
/// let xml = r#"
///     <program language="IPPcode21">
///         <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
///         <instruction order="2" opcode="ADD">
///             <arg1 type="var">GF@r</arg1>
///             <arg2 type="int">2</arg2>
///             <arg3 type="int">3</arg3>
///         </instruction>
///         <instruction order="3" opcode="WRITE"><arg1 type="var">GF@r</arg1></instruction>
///     </program>
/// "#;
///
/// let mut stdout = Vec::new();
/// let mut stderr = Vec::new();
/// let code = ipp21::run(Cursor::new(xml.as_bytes()), Cursor::new(&b""[..]), &mut stdout, &mut stderr);
///
/// assert_eq!(code, 0);
/// assert_eq!(String::from_utf8(stdout).unwrap(), "5");
/// ```
pub fn run<S, I, O, E>(source: S, input: I, mut stdout: O, mut stderr: E) -> u8
where
    S: BufRead,
    I: BufRead,
    O: Write,
    E: Write,
{
    match run_inner(source, input, &mut stdout, &mut stderr) {
        Ok(code) => code,
        Err(err) => {
            let _ = writeln!(stderr, "{err}");
            match err {
                RunError::Interpret(err) => err.exit_code(),
                RunError::Io(_) => 1,
            }
        }
    }
}

fn run_inner<S: BufRead, I: BufRead, O: Write, E: Write>(
    source: S,
    input: I,
    stdout: O,
    stderr: E,
) -> Result<u8, RunError> {
    let program = loader::load_program(source)?;
    let labels = label::build_label_map(&program)?;
    let interp = Interpreter::new(&program, &labels, input, stdout, stderr);
    interp.run()
}
