//! Turns the source XML document into a sorted, validated `Program`
//! (spec §4.3, §6). This is where the "parsed XML tree" spec.md treats as
//! an external input actually gets built, using `quick-xml` as the
//! document reader.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::InterpretError;
use crate::frame::FrameTag;
use crate::lex;
use crate::program::{AbstractKind, Instruction, Opcode, Operand, Program, TypeKeyword};
use crate::value::Value;

/// One `argN` child of an `instruction` element, before reordering and
/// validation.
struct RawArg {
    tag: String,
    type_attr: String,
    text: String,
}

/// One `instruction` element, before sorting by `order`.
struct RawInstruction {
    opcode: String,
    order: i64,
    args: Vec<RawArg>,
}

/// Parse `source` into a sorted `Program`. Malformed XML fails with
/// `INVALID_FORMAT`; anything structurally wrong with the program or its
/// instructions fails with `INVALID_STRUCT`.
pub fn load_program<R: BufRead>(source: R) -> Result<Program, InterpretError> {
    let raw = parse_xml(source)?;
    check_order(&raw)?;
    let mut raw = raw;
    raw.sort_by_key(|instr| instr.order);
    raw.into_iter().map(build_instruction).collect()
}

fn parse_xml<R: BufRead>(source: R) -> Result<Vec<RawInstruction>, InterpretError> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut saw_root = false;
    let mut instructions = Vec::new();

    // Current instruction being accumulated, and the current arg within it.
    let mut current_instr: Option<RawInstruction> = None;
    let mut current_arg: Option<(String, String)> = None; // (tag, type)
    let mut current_text = String::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| InterpretError::invalid_format(format!("malformed XML: {err}")))?;

        match event {
            Event::Eof => break,
            Event::Start(e) => {
                handle_start(
                    &e,
                    false,
                    &mut saw_root,
                    &mut current_instr,
                    &mut current_arg,
                    &mut current_text,
                    &mut instructions,
                )?;
            }
            Event::Empty(e) => {
                handle_start(
                    &e,
                    true,
                    &mut saw_root,
                    &mut current_instr,
                    &mut current_arg,
                    &mut current_text,
                    &mut instructions,
                )?;
            }
            Event::Text(e) => {
                current_text.push_str(
                    &e.unescape()
                        .map_err(|err| InterpretError::invalid_format(format!("malformed XML text: {err}")))?,
                );
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if current_arg.is_some() {
                    finish_arg(&mut current_instr, &mut current_arg, &mut current_text)?;
                } else if name == "instruction" {
                    finish_instruction(&mut instructions, &mut current_instr)?;
                }
            }
            _ => {}
        }

        buf.clear();
    }

    if !saw_root {
        return Err(InterpretError::invalid_struct("'program' root element is missing"));
    }

    Ok(instructions)
}

/// Handles a `Start` (`is_empty = false`) or `Empty` (`is_empty = true`)
/// element the same way; an empty element just closes itself immediately.
#[allow(clippy::too_many_arguments)]
fn handle_start(
    e: &BytesStart<'_>,
    is_empty: bool,
    saw_root: &mut bool,
    current_instr: &mut Option<RawInstruction>,
    current_arg: &mut Option<(String, String)>,
    current_text: &mut String,
    instructions: &mut Vec<RawInstruction>,
) -> Result<(), InterpretError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    match name.as_str() {
        "program" => {
            if *saw_root {
                return Err(InterpretError::invalid_struct("multiple root elements"));
            }
            *saw_root = true;
            check_program_attrs(e)?;
        }
        "instruction" => {
            if !*saw_root {
                return Err(InterpretError::invalid_struct("'instruction' outside 'program'"));
            }
            let (opcode, order) = instruction_attrs(e)?;
            *current_instr = Some(RawInstruction { opcode, order, args: Vec::new() });
            if is_empty {
                finish_instruction(instructions, current_instr)?;
            }
        }
        other if current_instr.is_some() => {
            let type_attr = arg_type_attr(e)?;
            *current_arg = Some((other.to_string(), type_attr));
            current_text.clear();
            if is_empty {
                finish_arg(current_instr, current_arg, current_text)?;
            }
        }
        _ => return Err(InterpretError::invalid_struct(format!("unexpected element '{name}'"))),
    }
    Ok(())
}

fn finish_instruction(
    instructions: &mut Vec<RawInstruction>,
    current_instr: &mut Option<RawInstruction>,
) -> Result<(), InterpretError> {
    if let Some(instr) = current_instr.take() {
        instructions.push(instr);
    }
    Ok(())
}

fn finish_arg(
    current_instr: &mut Option<RawInstruction>,
    current_arg: &mut Option<(String, String)>,
    current_text: &mut String,
) -> Result<(), InterpretError> {
    if let Some((tag, type_attr)) = current_arg.take() {
        let instr = current_instr
            .as_mut()
            .ok_or_else(|| InterpretError::invalid_struct("argument outside an instruction"))?;
        instr.args.push(RawArg { tag, type_attr, text: std::mem::take(current_text) });
    }
    Ok(())
}

fn attr_value(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, InterpretError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| InterpretError::invalid_format(format!("malformed XML attribute: {err}")))?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| InterpretError::invalid_format(format!("malformed XML attribute: {err}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn attr_names(e: &BytesStart<'_>) -> Result<Vec<String>, InterpretError> {
    let mut names = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| InterpretError::invalid_format(format!("malformed XML attribute: {err}")))?;
        names.push(String::from_utf8_lossy(attr.key.as_ref()).into_owned());
    }
    Ok(names)
}

fn check_program_attrs(e: &BytesStart<'_>) -> Result<(), InterpretError> {
    for name in attr_names(e)? {
        if !matches!(name.as_str(), "language" | "name" | "description") {
            return Err(InterpretError::invalid_struct(format!("invalid 'program' attribute '{name}'")));
        }
    }
    match attr_value(e, "language")? {
        Some(lang) if lang == "IPPcode21" => Ok(()),
        _ => Err(InterpretError::invalid_struct("'program' must carry language=\"IPPcode21\"")),
    }
}

fn instruction_attrs(e: &BytesStart<'_>) -> Result<(String, i64), InterpretError> {
    for name in attr_names(e)? {
        if !matches!(name.as_str(), "opcode" | "order") {
            return Err(InterpretError::invalid_struct(format!("invalid 'instruction' attribute '{name}'")));
        }
    }
    let opcode = attr_value(e, "opcode")?.ok_or_else(|| InterpretError::invalid_struct("'instruction' missing 'opcode'"))?;
    let order_text = attr_value(e, "order")?.ok_or_else(|| InterpretError::invalid_struct("'instruction' missing 'order'"))?;
    let order: i64 = order_text
        .parse()
        .map_err(|_| InterpretError::invalid_struct(format!("invalid 'order' value '{order_text}'")))?;
    if order < 1 {
        return Err(InterpretError::invalid_struct(format!("'order' must be positive, got {order}")));
    }
    Ok((opcode, order))
}

fn arg_type_attr(e: &BytesStart<'_>) -> Result<String, InterpretError> {
    let names = attr_names(e)?;
    if names != ["type"] {
        return Err(InterpretError::invalid_struct("argument must carry exactly the 'type' attribute"));
    }
    attr_value(e, "type")?.ok_or_else(|| InterpretError::invalid_struct("argument missing 'type'"))
}

fn check_order(raw: &[RawInstruction]) -> Result<(), InterpretError> {
    let mut seen = std::collections::HashSet::new();
    for instr in raw {
        if !seen.insert(instr.order) {
            return Err(InterpretError::invalid_struct(format!("duplicate instruction order {}", instr.order)));
        }
    }
    Ok(())
}

fn build_instruction(mut raw: RawInstruction) -> Result<Instruction, InterpretError> {
    let opcode = Opcode::from_name(&raw.opcode)
        .ok_or_else(|| InterpretError::invalid_struct(format!("unknown opcode '{}'", raw.opcode)))?;

    raw.args.sort_by(|a, b| a.tag.cmp(&b.tag));
    for (i, arg) in raw.args.iter().enumerate() {
        let expected = format!("arg{}", i + 1);
        if arg.tag != expected {
            return Err(InterpretError::invalid_struct(format!(
                "expected argument tags arg1..arg{}, got '{}'",
                raw.args.len(),
                arg.tag
            )));
        }
    }

    let mut operands = Vec::with_capacity(raw.args.len());
    let mut abstract_kinds = Vec::with_capacity(raw.args.len());
    for arg in &raw.args {
        let (operand, declared) = build_operand(&arg.type_attr, &arg.text)?;
        abstract_kinds.push(normalize_kind(declared, opcode, abstract_kinds.len()));
        operands.push(operand);
    }

    if abstract_kinds != opcode.signature() {
        return Err(InterpretError::invalid_struct(format!(
            "'{}' has the wrong argument shape",
            raw.opcode
        )));
    }

    Ok(Instruction { opcode, operands })
}

/// Normalize a declared kind to the abstract kind used for signature
/// matching: literal kinds always become `Symb`; `var` becomes `Symb` too
/// when that is what the opcode's signature expects at this position.
fn normalize_kind(declared: AbstractKind, opcode: Opcode, position: usize) -> AbstractKind {
    match declared {
        AbstractKind::Var => {
            if opcode.signature().get(position) == Some(&AbstractKind::Symb) {
                AbstractKind::Symb
            } else {
                AbstractKind::Var
            }
        }
        other => other,
    }
}

/// Lexically validate `text` against `type_attr` and build the runtime
/// `Operand`, returning its declared (pre-normalization) abstract kind.
fn build_operand(type_attr: &str, text: &str) -> Result<(Operand, AbstractKind), InterpretError> {
    match type_attr {
        "var" => {
            let (tag, name) = lex::split_var(text)
                .ok_or_else(|| InterpretError::invalid_struct(format!("invalid variable operand '{text}'")))?;
            let tag = FrameTag::from_str(tag).expect("split_var only returns GF/LF/TF");
            Ok((Operand::Var(tag, name.to_string()), AbstractKind::Var))
        }
        "label" => {
            if !lex::is_label(text) {
                return Err(InterpretError::invalid_struct(format!("invalid label operand '{text}'")));
            }
            Ok((Operand::Label(text.to_string()), AbstractKind::Label))
        }
        "type" => {
            if !lex::is_type_keyword(text) {
                return Err(InterpretError::invalid_struct(format!("invalid type operand '{text}'")));
            }
            let kw = TypeKeyword::from_str(text).expect("is_type_keyword only accepts int/string/bool");
            Ok((Operand::Type(kw), AbstractKind::Type))
        }
        "int" => {
            if !lex::is_int(text) {
                return Err(InterpretError::invalid_struct(format!("invalid int operand '{text}'")));
            }
            let value: i64 = text
                .parse()
                .map_err(|_| InterpretError::invalid_struct(format!("int operand out of range '{text}'")))?;
            Ok((Operand::Literal(Value::Int(value)), AbstractKind::Symb))
        }
        "bool" => {
            if !lex::is_bool(text) {
                return Err(InterpretError::invalid_struct(format!("invalid bool operand '{text}'")));
            }
            Ok((Operand::Literal(Value::Bool(text == "true")), AbstractKind::Symb))
        }
        "nil" => {
            if !lex::is_nil(text) {
                return Err(InterpretError::invalid_struct(format!("invalid nil operand '{text}'")));
            }
            Ok((Operand::Literal(Value::Nil), AbstractKind::Symb))
        }
        "string" => {
            if !lex::is_string(text) {
                return Err(InterpretError::invalid_struct(format!("invalid string operand '{text}'")));
            }
            let decoded = decode_escapes(text)?;
            Ok((Operand::Literal(Value::Str(decoded)), AbstractKind::Symb))
        }
        other => Err(InterpretError::invalid_struct(format!("unknown argument type '{other}'"))),
    }
}

/// Substitute every `\DDD` triple with the Unicode scalar value `DDD`.
/// Called once at load time so the decoded form is stored directly in the
/// resulting `Value`.
pub fn decode_escapes(text: &str) -> Result<String, InterpretError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let digits: String = chars.by_ref().take(3).collect();
            let code: u32 = digits
                .parse()
                .map_err(|_| InterpretError::string(format!("invalid escape sequence '\\{digits}'")))?;
            let ch = char::from_u32(code).ok_or_else(|| InterpretError::string(format!("invalid escape code {code}")))?;
            out.push(ch);
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(xml: &str) -> Result<Program, InterpretError> {
        load_program(Cursor::new(xml.as_bytes()))
    }

    #[test]
    fn rejects_wrong_root() {
        let xml = r#"<prog language="IPPcode21"></prog>"#;
        assert!(load(xml).is_err());
    }

    #[test]
    fn rejects_bad_language() {
        let xml = r#"<program language="oops"></program>"#;
        assert!(load(xml).is_err());
    }

    #[test]
    fn sorts_by_order_and_collapses_literals_to_symb() {
        let xml = r#"
            <program language="IPPcode21">
                <instruction order="2" opcode="WRITE">
                    <arg1 type="var">GF@x</arg1>
                </instruction>
                <instruction order="1" opcode="DEFVAR">
                    <arg1 type="var">GF@x</arg1>
                </instruction>
            </program>
        "#;
        let prog = load(xml).unwrap();
        assert_eq!(prog.len(), 2);
        assert_eq!(prog[0].opcode, Opcode::Defvar);
        assert_eq!(prog[1].opcode, Opcode::Write);
    }

    #[test]
    fn reorders_args_by_tag_name() {
        let xml = r#"
            <program language="IPPcode21">
                <instruction order="1" opcode="ADD">
                    <arg3 type="int">5</arg3>
                    <arg1 type="var">GF@r</arg1>
                    <arg2 type="int">7</arg2>
                </instruction>
            </program>
        "#;
        let prog = load(xml).unwrap();
        match &prog[0].operands[1] {
            Operand::Literal(Value::Int(7)) => {}
            other => panic!("expected literal 7, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_order_rejected() {
        let xml = r#"
            <program language="IPPcode21">
                <instruction order="1" opcode="BREAK"></instruction>
                <instruction order="1" opcode="BREAK"></instruction>
            </program>
        "#;
        assert!(load(xml).is_err());
    }

    #[test]
    fn unknown_opcode_rejected() {
        let xml = r#"<program language="IPPcode21"><instruction order="1" opcode="NOPE"></instruction></program>"#;
        assert!(load(xml).is_err());
    }

    #[test]
    fn wrong_signature_rejected() {
        let xml = r#"
            <program language="IPPcode21">
                <instruction order="1" opcode="DEFVAR">
                    <arg1 type="int">1</arg1>
                </instruction>
            </program>
        "#;
        assert!(load(xml).is_err());
    }

    #[test]
    fn decodes_string_escapes() {
        assert_eq!(decode_escapes("hello\\032world").unwrap(), "hello world");
        assert_eq!(decode_escapes("plain").unwrap(), "plain");
    }
}
