use std::io;

/// Every fatal condition the machine or debugger can hit. None of these are
/// recoverable: once an invariant is broken the program being interpreted
/// can't be trusted, so the top-level handler reports the error and exits
/// with a nonzero status.
#[derive(thiserror::Error, Debug)]
pub enum Chip8Error {
    /// the literal word is reported so the operator can find it in the ROM
    #[error("unknown instruction: 0x{0:04x}")]
    UnknownOpcode(u16),

    #[error("call stack overflow at 0x{pc:03x}")]
    StackOverflow { pc: u16 },

    #[error("return with empty call stack at 0x{pc:03x}")]
    StackUnderflow { pc: u16 },

    #[error("no COSMAC key mapped to {0:?}")]
    UnmappedKey(char),

    #[error("key wait: input source exhausted")]
    InputExhausted,

    #[error("ROM is {0} bytes; only 3584 fit above 0x200")]
    RomTooLarge(usize),

    #[error("memory range 0x{addr:03x}+{len} is out of bounds")]
    AddressOutOfRange { addr: usize, len: usize },

    #[error("breakpoint address {0} is outside program memory")]
    BreakpointOutOfRange(i64),

    #[error("watchpoint limit reached ({0} registered)")]
    TooManyWatchpoints(usize),

    #[error("unknown debugger command: {0:?}")]
    UnknownCommand(String),

    #[error("malformed debugger command: {0}")]
    MalformedCommand(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Terminal(crossterm::ErrorKind),
}
