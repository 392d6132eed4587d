//! End-to-end scenarios run through the public `ipp21::run` entry point,
//! built directly from literal XML documents.

use std::io::Cursor;

fn run(xml: &str, input: &str) -> (u8, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = ipp21::run(Cursor::new(xml.as_bytes()), Cursor::new(input.as_bytes()), &mut stdout, &mut stderr);
    (code, String::from_utf8(stdout).unwrap(), String::from_utf8(stderr).unwrap())
}

#[test]
fn s1_hello_world() {
    let xml = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@x</arg1></instruction>
            <instruction order="2" opcode="MOVE">
                <arg1 type="var">GF@x</arg1>
                <arg2 type="string">hello</arg2>
            </instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="var">GF@x</arg1></instruction>
            <instruction order="4" opcode="WRITE"><arg1 type="string">\032world</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "hello world");
}

#[test]
fn s2_arithmetic() {
    let xml = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
            <instruction order="2" opcode="ADD">
                <arg1 type="var">GF@r</arg1>
                <arg2 type="int">7</arg2>
                <arg3 type="int">5</arg3>
            </instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="var">GF@r</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "12");
}

#[test]
fn s3_division_by_zero() {
    let xml = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
            <instruction order="2" opcode="IDIV">
                <arg1 type="var">GF@r</arg1>
                <arg2 type="int">1</arg2>
                <arg3 type="int">0</arg3>
            </instruction>
        </program>
    "#;
    let (code, _, err) = run(xml, "");
    assert_eq!(code, 57);
    assert!(!err.is_empty());
}

#[test]
fn s4_frames() {
    let xml = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="CREATEFRAME"></instruction>
            <instruction order="2" opcode="DEFVAR"><arg1 type="var">TF@a</arg1></instruction>
            <instruction order="3" opcode="MOVE">
                <arg1 type="var">TF@a</arg1>
                <arg2 type="int">3</arg2>
            </instruction>
            <instruction order="4" opcode="PUSHFRAME"></instruction>
            <instruction order="5" opcode="DEFVAR"><arg1 type="var">LF@b</arg1></instruction>
            <instruction order="6" opcode="MOVE">
                <arg1 type="var">LF@b</arg1>
                <arg2 type="int">4</arg2>
            </instruction>
            <instruction order="7" opcode="WRITE"><arg1 type="var">LF@b</arg1></instruction>
            <instruction order="8" opcode="POPFRAME"></instruction>
            <instruction order="9" opcode="WRITE"><arg1 type="var">TF@a</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "43");
}

#[test]
fn s5_call_and_return() {
    let xml = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="JUMP"><arg1 type="label">main</arg1></instruction>
            <instruction order="2" opcode="LABEL"><arg1 type="label">sub</arg1></instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="string">sub</arg1></instruction>
            <instruction order="4" opcode="RETURN"></instruction>
            <instruction order="5" opcode="LABEL"><arg1 type="label">main</arg1></instruction>
            <instruction order="6" opcode="CALL"><arg1 type="label">sub</arg1></instruction>
            <instruction order="7" opcode="WRITE"><arg1 type="string">end</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "subend");
}

#[test]
fn s6_eq_with_nil() {
    let xml = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
            <instruction order="2" opcode="EQ">
                <arg1 type="var">GF@r</arg1>
                <arg2 type="nil">nil</arg2>
                <arg3 type="int">1</arg3>
            </instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="var">GF@r</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "false");
}

#[test]
fn sort_stability_across_document_order() {
    let in_order = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
            <instruction order="2" opcode="MOVE"><arg1 type="var">GF@r</arg1><arg2 type="int">1</arg2></instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="var">GF@r</arg1></instruction>
        </program>
    "#;
    let shuffled = r#"
        <program language="IPPcode21">
            <instruction order="3" opcode="WRITE"><arg1 type="var">GF@r</arg1></instruction>
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
            <instruction order="2" opcode="MOVE"><arg1 type="var">GF@r</arg1><arg2 type="int">1</arg2></instruction>
        </program>
    "#;
    assert_eq!(run(in_order, ""), run(shuffled, ""));
}

#[test]
fn argument_order_invariance() {
    let in_order = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
            <instruction order="2" opcode="SUB">
                <arg1 type="var">GF@r</arg1>
                <arg2 type="int">10</arg2>
                <arg3 type="int">3</arg3>
            </instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="var">GF@r</arg1></instruction>
        </program>
    "#;
    let shuffled = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
            <instruction order="2" opcode="SUB">
                <arg3 type="int">3</arg3>
                <arg1 type="var">GF@r</arg1>
                <arg2 type="int">10</arg2>
            </instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="var">GF@r</arg1></instruction>
        </program>
    "#;
    assert_eq!(run(in_order, ""), run(shuffled, ""));
}

#[test]
fn second_popframe_fails_with_frame_error() {
    let xml = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="CREATEFRAME"></instruction>
            <instruction order="2" opcode="PUSHFRAME"></instruction>
            <instruction order="3" opcode="POPFRAME"></instruction>
            <instruction order="4" opcode="POPFRAME"></instruction>
        </program>
    "#;
    let (code, _, _) = run(xml, "");
    assert_eq!(code, 55);
}

#[test]
fn duplicate_label_fails_at_load() {
    let xml = r#"
        <program language="IPPcode21">
            <instruction order="1" opcode="LABEL"><arg1 type="label">l</arg1></instruction>
            <instruction order="2" opcode="LABEL"><arg1 type="label">l</arg1></instruction>
        </program>
    "#;
    let (code, _, _) = run(xml, "");
    assert_eq!(code, 52);
}
