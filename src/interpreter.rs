use std::io;
use std::time::Duration;

use crate::decode::decode;
use crate::display::{Display, Surface};
use crate::error::Chip8Error;
use crate::exec::{execute, Flow};
use crate::input::Input;
use crate::machine::{InstructionSet, Machine};

/// rough COSMAC-era instruction throughput; the free-run loop executes a
/// cycle then sleeps the remainder of the period, so ROMs pace about right
/// without tying timers to the wall clock
const CYCLE_HZ: u64 = 700;

/// The cycle driver: owns the machine state and the compositing surface,
/// borrows the presentation and input collaborators, and turns the crank
/// one fetch/decode/execute/timer-decrement round per `step`.
pub struct Chip8Interpreter<'a> {
    machine: Machine,
    surface: Surface,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        instruction_set: InstructionSet,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
    ) -> Chip8Interpreter<'a> {
        Chip8Interpreter {
            machine: Machine::new(instruction_set),
            surface: Surface::new(),
            display,
            input,
        }
    }

    /// load a chip8 program at 0x200
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        self.machine.memory.load_program(reader)
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// one cycle: fetch, decode, refresh the polled keypad, execute,
    /// decrement timers, re-present the surface if it changed
    pub fn step(&mut self) -> Result<Flow, Chip8Error> {
        let word = self.machine.fetch();
        let ins = decode(word);
        self.machine.keys = self.input.poll_keys()?;
        let flow = execute(&mut self.machine, &mut self.surface, &mut *self.input, ins)?;
        self.machine.tick_timers();
        if self.surface.take_dirty() {
            self.display.draw(self.surface.snapshot())?;
        }
        Ok(flow)
    }

    /// free-run until the program halts itself
    pub fn run(&mut self) -> Result<(), Chip8Error> {
        let period = Duration::from_micros(1_000_000 / CYCLE_HZ);
        loop {
            if let Flow::Halt = self.step()? {
                log::info!(
                    "halt instruction at 0x{:03x}",
                    self.machine.pc.wrapping_sub(2)
                );
                return Ok(());
            }
            spin_sleep::sleep(period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::machine::V_FLAG;

    fn run_to_halt(interp: &mut Chip8Interpreter) -> usize {
        let mut cycles = 0;
        loop {
            cycles += 1;
            assert!(cycles < 100, "program never halted");
            if interp.step().unwrap() == Flow::Halt {
                return cycles;
            }
        }
    }

    #[test]
    fn test_add_scenario_halts_with_sum() {
        // LD V0,5; LD V1,3; ADD V0,V1; HALT
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut interp = Chip8Interpreter::new(InstructionSet::Super, &mut display, &mut input);
        let mut rom: &[u8] = &[0x60, 0x05, 0x61, 0x03, 0x80, 0x14, 0x00, 0x00];
        interp.load_program(&mut rom).unwrap();
        assert_eq!(run_to_halt(&mut interp), 4);
        assert_eq!(interp.machine().v[0], 8);
        assert_eq!(interp.machine().v[V_FLAG], 0);
    }

    #[test]
    fn test_call_return_scenario() {
        // CALL 0x206; (two halt words); RET at 0x206
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut interp = Chip8Interpreter::new(InstructionSet::Super, &mut display, &mut input);
        let mut rom: &[u8] = &[0x22, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEE];
        interp.load_program(&mut rom).unwrap();

        assert_eq!(interp.step().unwrap(), Flow::Continue); // CALL
        assert_eq!(interp.machine().pc, 0x206);
        assert_eq!(interp.machine().stack_depth(), 1);

        assert_eq!(interp.step().unwrap(), Flow::Continue); // RET
        assert_eq!(interp.machine().pc, 0x202);
        assert_eq!(interp.machine().stack_depth(), 0);

        assert_eq!(interp.step().unwrap(), Flow::Halt);
    }

    #[test]
    fn test_skip_moves_pc_by_4_from_fetch() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut interp = Chip8Interpreter::new(InstructionSet::Super, &mut display, &mut input);
        let mut rom: &[u8] = &[0x30, 0x00, 0x30, 0x01]; // SE V0,0 then SE V0,1
        interp.load_program(&mut rom).unwrap();

        interp.step().unwrap(); // condition holds
        assert_eq!(interp.machine().pc, 0x204);
        interp.step().unwrap(); // condition fails
        assert_eq!(interp.machine().pc, 0x206);
    }

    #[test]
    fn test_timers_decrement_once_per_cycle() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut interp = Chip8Interpreter::new(InstructionSet::Super, &mut display, &mut input);
        // LD V0,5; LD DT,V0; HALT
        let mut rom: &[u8] = &[0x60, 0x05, 0xf0, 0x15, 0x00, 0x00];
        interp.load_program(&mut rom).unwrap();

        interp.step().unwrap();
        interp.step().unwrap(); // DT set to 5, then ticked down in the same cycle
        assert_eq!(interp.machine().delay_timer, 4);
        interp.step().unwrap();
        assert_eq!(interp.machine().delay_timer, 3);
    }

    #[test]
    fn test_dirty_surface_is_presented() {
        struct CountingDisplay {
            frames: usize,
        }
        impl Display for CountingDisplay {
            fn draw(&mut self, _frame: &[u8]) -> Result<(), Chip8Error> {
                self.frames += 1;
                Ok(())
            }
        }

        let mut display = CountingDisplay { frames: 0 };
        let mut input = DummyInput::new(&[]);
        {
            let mut interp =
                Chip8Interpreter::new(InstructionSet::Super, &mut display, &mut input);
            // CLS; LD V0,1; HALT -- only the clear dirties the surface
            let mut rom: &[u8] = &[0x00, 0xe0, 0x60, 0x01, 0x00, 0x00];
            interp.load_program(&mut rom).unwrap();
            run_to_halt(&mut interp);
        }
        assert_eq!(display.frames, 1);
    }

    #[test]
    fn test_rom_too_large_rejected() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut interp = Chip8Interpreter::new(InstructionSet::Super, &mut display, &mut input);
        let big = vec![0u8; 3585];
        assert!(matches!(
            interp.load_program(&mut big.as_slice()),
            Err(Chip8Error::RomTooLarge(3585))
        ));
    }
}
