//! An interpreter for the CHIP-8 virtual machine.
//!
//! ## Design
//!
//! * one explicit machine-state aggregate, no globals; the decoder,
//!   executor and display take it by exclusive reference so tests can run
//!   as many independent machines as they like
//! * abstract display and input behind traits so a variety of frontends
//!   work; the stock ones are a TUI canvas and raw crossterm polling
//! * both instruction dialects (SUPER-CHIP and COSMAC VIP) behind one
//!   switch, fixed per run; the four families they disagree on branch on
//!   it inside the executor
//! * timers count down per executed cycle, not per wall-clock frame, which
//!   is what the machine this reimplements actually did; the free-run loop
//!   sleeps between cycles to keep ROMs at a playable speed
//! * every fatal condition (unknown opcode, stack misuse, unmapped key,
//!   debugger protocol error) is a `Chip8Error` carried up to the binary,
//!   which turns it into a diagnostic and a nonzero exit
//!
//! Model
//!
//! Chip8Interpreter(machine, surface, display, input)
//!  |-- Machine: registers, memory(font, program), stack, timers, keypad, rng
//!  |-- decode: word -> operand fields, total, pure
//!  |-- execute: one decoded instruction -> state transition
//!  `-- Surface: 64x32 XOR compositor, snapshot read by the Display impl
//!
//! Debugger(interpreter, command stream, diagnostic stream)
//!  `-- breakpoints, watchpoints, state/memory dumps between cycles

pub mod debugger;
pub mod decode;
pub mod display;
pub mod error;
pub mod exec;
pub mod input;
pub mod interpreter;
pub mod machine;
pub mod memory;
