use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crossterm::event::{poll, read, Event, KeyCode};
use crossterm::terminal;

use crate::error::Chip8Error;
use crate::machine::NUM_KEYS;

/// Fixed mapping from physical key symbols to the 16 logical COSMAC codes,
/// using the left-hand side of a qwerty keyboard. This is configuration
/// data, not machine logic; the left values are what the operator presses,
/// the right values are what the program sees.
const CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// the logical code for a physical symbol, if the symbol is mapped at all
pub fn map_key(sym: char) -> Option<u8> {
    CONVENTIONAL_KEYMAP
        .iter()
        .find(|(ch, _)| *ch == sym)
        .map(|&(_, code)| code)
}

/// Reads keypresses on behalf of the machine.
pub trait Input {
    /// current pressed state of the 16 logical keys, polled (not queued)
    fn poll_keys(&mut self) -> Result<[bool; NUM_KEYS], Chip8Error>;

    /// block until one mapped key arrives and return its logical code;
    /// an unmapped symbol is a fatal condition
    fn wait_key(&mut self) -> Result<u8, Chip8Error>;
}

/// simple implementation of Input, using STDIN via crossterm
pub struct StdinInput {
    keymap: HashMap<char, u8>,
}

impl StdinInput {
    pub fn new() -> Result<Self, Chip8Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            keymap: HashMap::from(CONVENTIONAL_KEYMAP),
        })
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn poll_keys(&mut self) -> Result<[bool; NUM_KEYS], Chip8Error> {
        // terminals only report key-down, so a key counts as held for the
        // one cycle that observes its event
        let mut pressed = [false; NUM_KEYS];
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Char(key) => match self.keymap.get(&key) {
                        Some(code) => pressed[*code as usize] = true,
                        None => log::warn!("can't map {:?} to a COSMAC key", key),
                    },
                    _ => log::warn!("unknown key event received"),
                },
                _ => log::warn!("unknown event received"),
            }
        }
        Ok(pressed)
    }

    fn wait_key(&mut self) -> Result<u8, Chip8Error> {
        loop {
            if let Event::Key(evt) = read()? {
                if let KeyCode::Char(key) = evt.code {
                    return self
                        .keymap
                        .get(&key)
                        .copied()
                        .ok_or(Chip8Error::UnmappedKey(key));
                }
            }
        }
    }
}

/// scripted Input implementation for testing and for debug sessions,
/// where stdin belongs to the command stream
pub struct DummyInput {
    held: [bool; NUM_KEYS],
    typed: VecDeque<char>,
}

impl DummyInput {
    /// the given logical codes read as held down on every poll
    pub fn new(held_keys: &[u8]) -> Self {
        let mut held = [false; NUM_KEYS];
        for &code in held_keys {
            held[code as usize] = true;
        }
        DummyInput {
            held,
            typed: VecDeque::new(),
        }
    }

    /// physical symbols consumed one at a time by key waits
    pub fn with_typed(symbols: &[char]) -> Self {
        DummyInput {
            held: [false; NUM_KEYS],
            typed: symbols.iter().copied().collect(),
        }
    }
}

impl Input for DummyInput {
    fn poll_keys(&mut self) -> Result<[bool; NUM_KEYS], Chip8Error> {
        Ok(self.held)
    }

    fn wait_key(&mut self) -> Result<u8, Chip8Error> {
        let sym = self.typed.pop_front().ok_or(Chip8Error::InputExhausted)?;
        map_key(sym).ok_or(Chip8Error::UnmappedKey(sym))
    }
}
