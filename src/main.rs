use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use env_logger::Env;

use chip8::debugger::Debugger;
use chip8::display::{AsciiDisplay, MonoTermDisplay};
use chip8::error::Chip8Error;
use chip8::input::{DummyInput, StdinInput};
use chip8::interpreter::Chip8Interpreter;
use chip8::machine::InstructionSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum RunMode {
    /// free-run the ROM with the terminal display
    Normal,
    /// step under the interactive inspector
    Debug,
}

#[derive(Parser)]
struct Args {
    /// ROM file path
    rom: PathBuf,

    /// run mode
    #[arg(value_enum, ignore_case = true, default_value = "normal")]
    mode: RunMode,

    /// instruction set dialect
    #[arg(value_enum, ignore_case = true, default_value = "super")]
    instruction_set: InstructionSet,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        log::error!("{err}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Chip8Error> {
    log::info!("loading ROM {}", args.rom.display());
    let mut rom = File::open(&args.rom)?;

    match args.mode {
        RunMode::Normal => {
            let mut display = MonoTermDisplay::new()?;
            let mut input = StdinInput::new()?;
            let mut interp = Chip8Interpreter::new(args.instruction_set, &mut display, &mut input);
            let n = interp.load_program(&mut rom)?;
            log::info!("loaded {n} bytes");
            interp.run()
        }
        RunMode::Debug => {
            // frames go to stdout, diagnostics to stderr, commands come
            // from stdin; raw keypad input has no channel left, so key
            // waits fail rather than hang the session
            let mut display = AsciiDisplay::new(io::stdout());
            let mut input = DummyInput::new(&[]);
            let mut interp = Chip8Interpreter::new(args.instruction_set, &mut display, &mut input);
            let n = interp.load_program(&mut rom)?;
            log::info!("loaded {n} bytes");
            let stdin = io::stdin();
            Debugger::new(&mut interp, stdin.lock(), io::stderr()).run()
        }
    }
}
