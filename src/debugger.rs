use std::io::{BufRead, Write};

use crate::decode::decode;
use crate::error::Chip8Error;
use crate::exec::Flow;
use crate::interpreter::Chip8Interpreter;
use crate::memory::RAM_SIZE;

const MAX_WATCHPOINTS: usize = 16;

const HEXDUMP_ROW: usize = 16;

/// a watched memory location and the value it held when last inspected;
/// stored as an index into RAM, never as a pointer into it
struct Watchpoint {
    addr: usize,
    last: u8,
}

/// Interactive inspector wrapped around the cycle driver. Strictly
/// synchronous: the session sits paused between commands, runs traced
/// cycles only when told to, and dies on the first protocol error.
///
/// Commands, one per line:
///
///   m <addr> [<size>]  dump size bytes at addr (negative addr: all of RAM)
///   b <addr>           run until PC reaches addr, then pause again
///   w <addr>           watch a memory byte, reporting every change
///   s                  end the session
///   n (or blank)       advance one cycle
///
/// Addresses are decimal or 0x-prefixed hex. Before each traced cycle the
/// decoded next instruction and the whole machine state go to the
/// diagnostic stream; after it, changed watchpoints are reported.
pub struct Debugger<'d, 'i, R, W> {
    interp: &'d mut Chip8Interpreter<'i>,
    commands: R,
    out: W,
    watchpoints: Vec<Watchpoint>,
}

impl<'d, 'i, R: BufRead, W: Write> Debugger<'d, 'i, R, W> {
    pub fn new(interp: &'d mut Chip8Interpreter<'i>, commands: R, out: W) -> Self {
        Debugger {
            interp,
            commands,
            out,
            watchpoints: Vec::new(),
        }
    }

    /// the command loop; returns Ok on `s`, end of the command stream, or
    /// a program halt, and Err on any fatal machine or protocol condition
    pub fn run(&mut self) -> Result<(), Chip8Error> {
        loop {
            write!(self.out, "c8db> ")?;
            self.out.flush()?;
            let mut line = String::new();
            if self.commands.read_line(&mut line)? == 0 {
                // command stream closed; treat like `s`
                return Ok(());
            }
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                None | Some("n") => {
                    if self.trace_cycle()? == Flow::Halt {
                        return Ok(());
                    }
                }
                Some("s") => return Ok(()),
                Some("m") => {
                    let addr = parse_addr(tokens.next(), &line)?;
                    let size = match tokens.next() {
                        Some(tok) => tok
                            .parse::<usize>()
                            .map_err(|_| Chip8Error::MalformedCommand(line.trim().into()))?,
                        None => 1,
                    };
                    self.dump_range(addr, size)?;
                }
                Some("b") => {
                    let target = parse_addr(tokens.next(), &line)?;
                    if target < 0 || target >= (RAM_SIZE - 1) as i64 {
                        return Err(Chip8Error::BreakpointOutOfRange(target));
                    }
                    if self.run_to(target as u16)? == Flow::Halt {
                        return Ok(());
                    }
                }
                Some("w") => {
                    let addr = parse_addr(tokens.next(), &line)?;
                    if addr < 0 || addr >= RAM_SIZE as i64 {
                        return Err(Chip8Error::AddressOutOfRange {
                            addr: addr as usize,
                            len: 1,
                        });
                    }
                    self.add_watchpoint(addr as usize)?;
                }
                Some(cmd) => return Err(Chip8Error::UnknownCommand(cmd.into())),
            }
        }
    }

    /// run cycles unconditionally until PC lands on the target
    fn run_to(&mut self, target: u16) -> Result<Flow, Chip8Error> {
        loop {
            if self.trace_cycle()? == Flow::Halt {
                return Ok(Flow::Halt);
            }
            if self.interp.machine().pc == target {
                writeln!(self.out, "break at 0x{target:03x}")?;
                return Ok(Flow::Continue);
            }
        }
    }

    /// one verbose cycle: instruction and state dumps first, then the
    /// step, then watchpoint reports
    fn trace_cycle(&mut self) -> Result<Flow, Chip8Error> {
        self.dump_instruction()?;
        self.dump_state()?;
        let flow = self.interp.step()?;
        self.report_watchpoints()?;
        if flow == Flow::Halt {
            writeln!(self.out, "machine halted")?;
        }
        Ok(flow)
    }

    fn add_watchpoint(&mut self, addr: usize) -> Result<(), Chip8Error> {
        if self.watchpoints.len() >= MAX_WATCHPOINTS {
            return Err(Chip8Error::TooManyWatchpoints(self.watchpoints.len()));
        }
        let last = self.interp.machine().memory.as_bytes()[addr];
        let index = self.watchpoints.len();
        self.watchpoints.push(Watchpoint { addr, last });
        writeln!(self.out, "watch[{index}] set at 0x{addr:03x}")?;
        Ok(())
    }

    fn report_watchpoints(&mut self) -> Result<(), Chip8Error> {
        let memory = self.interp.machine().memory.as_bytes();
        for (index, wp) in self.watchpoints.iter_mut().enumerate() {
            let now = memory[wp.addr];
            if now != wp.last {
                writeln!(
                    self.out,
                    "watch[{index}] 0x{:03x}: 0x{:02x} -> 0x{now:02x}",
                    wp.addr, wp.last
                )?;
                wp.last = now;
            }
        }
        Ok(())
    }

    fn dump_instruction(&mut self) -> Result<(), Chip8Error> {
        let m = self.interp.machine();
        let ins = decode(m.memory.read_word(m.pc));
        writeln!(
            self.out,
            "next: pc=0x{:03x} op=0x{:04x} nnn=0x{:03x} x={:x} y={:x} kk=0x{:02x} n={:x}",
            m.pc, ins.word, ins.nnn, ins.x, ins.y, ins.kk, ins.n
        )?;
        Ok(())
    }

    fn dump_state(&mut self) -> Result<(), Chip8Error> {
        let m = self.interp.machine();
        for row in m.v.chunks(8) {
            let line: Vec<String> = row.iter().map(|v| format!("{v:02x}")).collect();
            writeln!(self.out, "V: {}", line.join(" "))?;
        }
        writeln!(
            self.out,
            "PC=0x{:03x} I=0x{:03x} SP={} DT={:02x} ST={:02x}",
            m.pc,
            m.i,
            m.stack_depth(),
            m.delay_timer,
            m.sound_timer
        )?;
        let frames: Vec<String> = m
            .stack_frames()
            .iter()
            .map(|a| format!("0x{a:03x}"))
            .collect();
        writeln!(self.out, "stack: [{}]", frames.join(", "))?;
        self.dump_bytes(0, RAM_SIZE)
    }

    fn dump_range(&mut self, addr: i64, size: usize) -> Result<(), Chip8Error> {
        if addr < 0 {
            return self.dump_bytes(0, RAM_SIZE);
        }
        let addr = addr as usize;
        if addr + size > RAM_SIZE {
            return Err(Chip8Error::AddressOutOfRange { addr, len: size });
        }
        self.dump_bytes(addr, size)
    }

    fn dump_bytes(&mut self, start: usize, len: usize) -> Result<(), Chip8Error> {
        let memory = self.interp.machine().memory.as_bytes();
        for (row, chunk) in memory[start..start + len].chunks(HEXDUMP_ROW).enumerate() {
            let line: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            writeln!(
                self.out,
                "0x{:03x}: {}",
                start + row * HEXDUMP_ROW,
                line.join(" ")
            )?;
        }
        Ok(())
    }
}

fn parse_addr(token: Option<&str>, line: &str) -> Result<i64, Chip8Error> {
    let parsed = token.and_then(|tok| {
        if let Some(hex) = tok.strip_prefix("0x") {
            i64::from_str_radix(hex, 16).ok()
        } else {
            tok.parse().ok()
        }
    });
    parsed.ok_or_else(|| Chip8Error::MalformedCommand(line.trim().into()))
}
