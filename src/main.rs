use std::error::Error;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chip8_vm::call_stack::CallStack;
use chip8_vm::display::{SharedFrameBuffer, TermDisplay};
use chip8_vm::input::TermInput;
use chip8_vm::logger::LogFacade;
use chip8_vm::memory::Memory;
use chip8_vm::processor::{Config, Processor, ProcessorHandle};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// instruction clock rate, roughly what the original hardware managed
const INSTRUCTION_RATE_HZ: u32 = 700;
/// delay timer rate
const TIMER_RATE_HZ: u32 = 60;
/// how often the front end polls input and redraws
const FRONTEND_POLL: Duration = Duration::from_millis(8);

const USAGE: &str = "usage: chip8-vm [--load-store-quirk] [--shift-quirk] [--jump-quirk] <rom>";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut config = Config::default();
    let mut rom_path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--load-store-quirk" => config.register_rw_modifies_i = true,
            "--shift-quirk" => config.shift_takes_value_from_vy = true,
            "--jump-quirk" => config.use_vx_for_offset_jump = true,
            _ => rom_path = Some(arg),
        }
    }
    let rom_path = rom_path.ok_or(USAGE)?;
    let rom = fs::read(&rom_path)?;

    let mut memory = Memory::new();
    memory.load_default_font(Processor::FONT_START);
    memory.load(Processor::CODE_START, &rom)?;
    let mut call_stack = CallStack::new();
    let frame = SharedFrameBuffer::new();
    let mut screen = frame.clone();
    let logger = LogFacade;

    let mut processor = Processor::new(
        config,
        &mut call_stack,
        &mut memory,
        &mut screen,
        &logger,
        Box::new(StdRng::from_entropy()),
    );
    let timer_handle = processor.handle();
    let input_handle = processor.handle();

    let mut display = TermDisplay::new()?;
    let mut input = TermInput::new()?;
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| run_instruction_clock(&mut processor, &stop, INSTRUCTION_RATE_HZ));
        s.spawn(|| run_timer_clock(&timer_handle, &stop, TIMER_RATE_HZ));

        let mut outcome = Ok(());
        while !stop.load(Ordering::Relaxed) {
            match input.pump(&input_handle) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
            if let Some(snapshot) = frame.take_if_dirty() {
                if let Err(e) = display.render(&snapshot) {
                    outcome = Err(e);
                    break;
                }
            }
            thread::sleep(FRONTEND_POLL);
        }
        stop.store(true, Ordering::Relaxed);
        outcome
    })?;

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..12 {
        println!();
    }
    Ok(())
}

/// Run `step()` at a fixed rate with a sleep-until-deadline loop: measure
/// the wall time each cycle took and sleep only the remainder, so jitter
/// never accumulates beyond a single cycle. Stops when an instruction fails
/// or the stop flag rises.
fn run_instruction_clock(processor: &mut Processor, stop: &AtomicBool, rate_hz: u32) {
    let period = Duration::from_secs(1) / rate_hz;
    let sleeper = spin_sleep::SpinSleeper::default();
    let mut last = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        let elapsed = last.elapsed();
        if elapsed < period {
            sleeper.sleep(period - elapsed);
        }
        last = Instant::now();
        if !processor.step() {
            break;
        }
    }
    stop.store(true, Ordering::Relaxed);
}

/// Tick the delay timer at a fixed rate until the session stops.
fn run_timer_clock(processor: &ProcessorHandle, stop: &AtomicBool, rate_hz: u32) {
    let period = Duration::from_secs(1) / rate_hz;
    let sleeper = spin_sleep::SpinSleeper::default();
    let mut last = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        let elapsed = last.elapsed();
        if elapsed < period {
            sleeper.sleep(period - elapsed);
        }
        last = Instant::now();
        processor.update_timers();
    }
}
