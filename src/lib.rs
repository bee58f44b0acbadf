//! A CHIP-8 virtual machine.
//!
//! ## Design
//!
//! * the interpreter core is a [`processor::Processor`] stepping one
//!   instruction at a time over a bounded [`memory::Memory`], a
//!   [`call_stack::CallStack`] and an abstract [`display::Screen`]; it owns
//!   the CPU registers and nothing else
//! * addresses are a validated 12-bit type ([`address::Address`]) so memory
//!   indexing never needs a bounds check
//! * three actors drive the processor: an instruction clock calling
//!   `step()` at ~700Hz, a timer clock calling `update_timers()` at 60Hz,
//!   and an input source calling `toggle_key()` whenever the user does
//!   something. Only the fields those last two touch are shared (and
//!   atomic); the rest belongs to the instruction clock
//! * display, input and logging sit behind traits so the terminal front end
//!   in `main` is swappable and the core is testable without one
//! * a `step()` returning false (unknown opcode, return with an empty call
//!   stack) is fatal for the session: the driver stops the clock and leaves
//!   everything else untouched

pub mod address;
pub mod call_stack;
pub mod display;
pub mod input;
pub mod logger;
pub mod memory;
pub mod processor;
