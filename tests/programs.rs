use scriptc::ir::{Condition, Instruction};
use test_case::test_case;

use crate::common::compile_program;

mod common;

#[test_case(include_str!("programs/hello.json"), "programs/hello.json", 7 ; "hello.json")]
#[test_case(include_str!("programs/countdown.json"), "programs/countdown.json", 22 ; "countdown.json")]
#[test_case(include_str!("programs/branches.json"), "programs/branches.json", 34 ; "branches.json")]
#[test_case(include_str!("programs/goto_loop.json"), "programs/goto_loop.json", 19 ; "goto_loop.json")]
#[test_case(include_str!("programs/calls.json"), "programs/calls.json", 21 ; "calls.json")]
fn program_tests(source: &str, path: &str, instructions: usize) {
    let executable = compile_program(source, path).unwrap();
    assert_eq!(executable.len(), instructions);
    assert_eq!(executable.instructions.last(), Some(&Instruction::Nop));

    let enters = executable
        .instructions
        .iter()
        .filter(|i| matches!(i, Instruction::ScopeEnter))
        .count();
    let exits = executable
        .instructions
        .iter()
        .filter(|i| matches!(i, Instruction::ScopeExit))
        .count();
    assert_eq!(enters, exits);

    for (address, instruction) in executable.instructions.iter().enumerate() {
        if let Some(target) = instruction.target() {
            assert!(target < executable.len(), "@{address} jumps out of range");
        }
    }
}

#[test]
fn hello_listing() {
    let executable =
        compile_program(include_str!("programs/hello.json"), "programs/hello.json").unwrap();
    assert_eq!(
        executable.to_string(),
        r#"; hello v1.0
; uid h-1
; Greets the caller.
; output greeting: string
0: clear   greeting
1: load    "hello, world"
2: merge   greeting
3: load    "1"
4: new     done
5: fault
6: nop
"#
    );
}

#[test]
fn countdown_loop() {
    let executable = compile_program(
        include_str!("programs/countdown.json"),
        "programs/countdown.json",
    )
    .unwrap();
    let code = &executable.instructions;

    assert_eq!(code[4], Instruction::Fetch("limit".to_string()));
    assert_eq!(code[5], Instruction::DeclareNew("i".to_string()));
    assert_eq!(
        code[6],
        Instruction::CondJump {
            condition: Condition::Done,
            target: Some(20)
        }
    );
    assert_eq!(code[18], Instruction::Store("i".to_string()));
    assert_eq!(code[19], Instruction::Jump(6));
    assert_eq!(code[20], Instruction::Fault);
    assert_eq!((executable.header.major, executable.header.minor), (2, 0));
}

#[test]
fn branches_targets() {
    let executable = compile_program(
        include_str!("programs/branches.json"),
        "programs/branches.json",
    )
    .unwrap();
    let code = &executable.instructions;

    // while
    assert_eq!(code[8].target(), Some(27));
    assert_eq!(code[26], Instruction::Jump(4));
    // if
    assert_eq!(
        code[14],
        Instruction::CondJump {
            condition: Condition::Greater,
            target: Some(22)
        }
    );
    assert_eq!(code[22], Instruction::Nop);
    // assert
    assert_eq!(
        code[28],
        Instruction::Assert {
            condition: Condition::Equal,
            target: Some(32)
        }
    );
}

#[test]
fn goto_loop_resolves_both_ways() {
    let executable = compile_program(
        include_str!("programs/goto_loop.json"),
        "programs/goto_loop.json",
    )
    .unwrap();
    let code = &executable.instructions;

    assert_eq!(
        code[13],
        Instruction::Goto {
            label: "top".to_string(),
            target: Some(2)
        }
    );
    // A label after the last construct lands on the trailing no-op.
    assert_eq!(
        code[16],
        Instruction::Goto {
            label: "end".to_string(),
            target: Some(18)
        }
    );
}

#[test]
fn calls_json_artifact() {
    let executable =
        compile_program(include_str!("programs/calls.json"), "programs/calls.json").unwrap();
    assert_eq!(executable.instructions[7], Instruction::Store("text".to_string()));

    let json: serde_json::Value = serde_json::from_str(&executable.to_json().unwrap()).unwrap();
    assert_eq!(json["header"]["name"], "calls");
    assert_eq!(json["instructions"][5]["call"], "format");
    assert_eq!(json["instructions"][18]["member-call"], "append");
}
