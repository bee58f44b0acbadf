use crate::address::Address;
use crate::call_stack::CallStack;
use crate::display::{Screen, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::logger::Logger;
use crate::memory::Memory;
use rand::{Rng, RngCore};
use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};
use std::sync::Arc;

/// Points where historical interpreters disagree. All default to the
/// original COSMAC VIP behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Fx55/Fx65 leave I pointing past the copied registers (I += x + 1).
    pub register_rw_modifies_i: bool,
    /// 8xy6/8xyE shift the value of Vy instead of Vx shifting itself.
    pub shift_takes_value_from_vy: bool,
    /// Bnnn jumps to nnn + Vx (CHIP-48/SUPER-CHIP) instead of nnn + V0.
    pub use_vx_for_offset_jump: bool,
}

// Fx0A sub-state packed into one atomic byte: bits 4-5 hold the state, the
// low nibble holds the key captured on the Waiting -> Got transition. A
// single cell keeps the capture and the transition atomic with respect to
// the input thread.
const GET_KEY_IDLE: u8 = 0x00;
const GET_KEY_WAITING: u8 = 0x10;
const GET_KEY_GOT: u8 = 0x20;
const GET_KEY_STATE_MASK: u8 = 0x30;

/// The fields touched by more than one actor: `update_timers` and
/// `toggle_key` may run on other threads while `step` executes. Everything
/// else in the processor belongs to the instruction clock alone.
#[derive(Default)]
struct Shared {
    delay_timer: AtomicU8,
    keys: AtomicU16,
    get_key: AtomicU8,
}

impl Shared {
    fn update_timers(&self) {
        let _ = self
            .delay_timer
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| t.checked_sub(1));
    }

    fn toggle_key(&self, key: u8, pressed: bool) {
        let key = key & 0x0F;
        let mask = 1u16 << key;
        if pressed {
            self.keys.fetch_or(mask, Ordering::Relaxed);
        } else {
            self.keys.fetch_and(!mask, Ordering::Relaxed);
            // a release completes a pending Fx0A wait, capturing the key in
            // the same atomic write as the state change
            let _ = self.get_key.compare_exchange(
                GET_KEY_WAITING,
                GET_KEY_GOT | key,
                Ordering::AcqRel,
                Ordering::Relaxed,
            );
        }
    }

    fn key_pressed(&self, key: u8) -> bool {
        self.keys.load(Ordering::Relaxed) & (1u16 << (key & 0x0F)) != 0
    }
}

/// Cloneable handle for the actors that drive the processor from outside
/// the instruction clock: the timer thread and the input source.
#[derive(Clone)]
pub struct ProcessorHandle {
    shared: Arc<Shared>,
}

impl ProcessorHandle {
    /// Tick the delay timer down one step, flooring at 0. Conventionally
    /// called at 60Hz.
    pub fn update_timers(&self) {
        self.shared.update_timers();
    }

    /// Record key `key` (0x0..=0xF) going down or up.
    pub fn toggle_key(&self, key: u8, pressed: bool) {
        self.shared.toggle_key(key, pressed);
    }
}

/// The interpreter core: fetches, decodes and executes one instruction per
/// [`step`](Processor::step), mutating its registers and the borrowed
/// memory, call stack and screen.
pub struct Processor<'a> {
    config: Config,
    call_stack: &'a mut CallStack,
    memory: &'a mut Memory,
    screen: &'a mut (dyn Screen + Send),
    logger: &'a (dyn Logger + Sync),
    rng: Box<dyn RngCore + Send>,

    pc: Address,
    i: Address,
    v: [u8; 16],
    shared: Arc<Shared>,
}

impl<'a> Processor<'a> {
    /// Where programs are loaded and execution starts.
    pub const CODE_START: Address = Address::truncated(0x200);
    /// Where the glyph font lives, by convention.
    pub const FONT_START: Address = Address::truncated(0x050);

    pub fn new(
        config: Config,
        call_stack: &'a mut CallStack,
        memory: &'a mut Memory,
        screen: &'a mut (dyn Screen + Send),
        logger: &'a (dyn Logger + Sync),
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Processor {
            config,
            call_stack,
            memory,
            screen,
            logger,
            rng,
            pc: Self::CODE_START,
            i: Address::truncated(0),
            v: [0; 16],
            shared: Arc::new(Shared::default()),
        }
    }

    /// A handle for the timer and input actors. Only the cross-thread
    /// fields are shared; `pc`, `i` and the V registers stay private to
    /// `step`.
    pub fn handle(&self) -> ProcessorHandle {
        ProcessorHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// See [`ProcessorHandle::update_timers`].
    pub fn update_timers(&self) {
        self.shared.update_timers();
    }

    /// See [`ProcessorHandle::toggle_key`].
    pub fn toggle_key(&self, key: u8, pressed: bool) {
        self.shared.toggle_key(key, pressed);
    }

    /// Fetch, decode and execute one instruction. Returns false on an
    /// unsupported opcode or a return with nothing on the call stack; both
    /// are fatal and the driving loop must stop.
    pub fn step(&mut self) -> bool {
        let at = self.pc;
        let first_byte = self.memory[self.pc];
        self.pc += 1;
        let nn = self.memory[self.pc];
        self.pc += 1;

        let opcode = u16::from_be_bytes([first_byte, nn]);
        let x = (first_byte & 0x0F) as usize;
        let y = (nn >> 4) as usize;
        let n = nn & 0x0F;
        let nnn = Address::truncated(opcode);

        match first_byte >> 4 {
            0x0 => return self.native_instruction(opcode, at),
            0x1 => {
                self.logger.debug(&format!("jump to {}", nnn));
                self.pc = nnn;
            }
            0x2 => {
                self.logger.debug(&format!("call {}", nnn));
                self.call_stack.push(self.pc);
                self.pc = nnn;
            }
            0x3 => {
                if self.v[x] == nn {
                    self.skip();
                }
            }
            0x4 => {
                if self.v[x] != nn {
                    self.skip();
                }
            }
            0x5 if n == 0 => {
                if self.v[x] == self.v[y] {
                    self.skip();
                }
            }
            0x6 => self.v[x] = nn,
            0x7 => self.v[x] = self.v[x].wrapping_add(nn),
            0x8 => return self.alu_instruction(x, y, opcode, at),
            0x9 if n == 0 => {
                if self.v[x] != self.v[y] {
                    self.skip();
                }
            }
            0xA => self.i = nnn,
            0xB => {
                let offset = if self.config.use_vx_for_offset_jump {
                    self.v[x]
                } else {
                    self.v[0]
                };
                self.pc = nnn + u16::from(offset);
            }
            0xC => self.v[x] = self.rng.gen::<u8>() & nn,
            0xD => self.draw(x, y, n),
            0xE => return self.key_skips(x, opcode, at),
            0xF => return self.register_instruction(x, opcode, at),
            _ => return self.unknown(opcode, at),
        }
        true
    }

    /// skip the next instruction
    fn skip(&mut self) {
        self.pc += 2;
    }

    fn unknown(&self, opcode: u16, at: Address) -> bool {
        self.logger
            .error(&format!("unsupported instruction {:#06x} at {}", opcode, at));
        false
    }

    /// 0nnn family: only clear-screen and return survive, anything else
    /// would be a native COSMAC routine we cannot run.
    fn native_instruction(&mut self, opcode: u16, at: Address) -> bool {
        match opcode & Address::VALUE_MASK {
            0x0E0 => {
                self.logger.debug("clear screen");
                self.screen.clear();
                true
            }
            0x0EE => match self.call_stack.pop() {
                Some(return_to) => {
                    self.logger.debug(&format!("return to {}", return_to));
                    self.pc = return_to;
                    true
                }
                None => {
                    self.logger
                        .error(&format!("return with empty call stack at {}", at));
                    false
                }
            },
            _ => self.unknown(opcode, at),
        }
    }

    /// 8xy_ family: register-register ALU operations. VF is written after
    /// the result, so an operation targeting VF keeps the flag.
    fn alu_instruction(&mut self, x: usize, y: usize, opcode: u16, at: Address) -> bool {
        let vx = self.v[x];
        let vy = self.v[y];
        match opcode & 0xF {
            0x0 => self.v[x] = vy,
            0x1 => self.v[x] = vx | vy,
            0x2 => self.v[x] = vx & vy,
            0x3 => self.v[x] = vx ^ vy,
            0x4 => {
                let (sum, carry) = vx.overflowing_add(vy);
                self.v[x] = sum;
                self.v[0xF] = carry as u8;
            }
            0x5 => {
                let (diff, borrow) = vx.overflowing_sub(vy);
                self.v[x] = diff;
                self.v[0xF] = (!borrow) as u8;
            }
            0x6 => {
                let source = if self.config.shift_takes_value_from_vy {
                    vy
                } else {
                    vx
                };
                self.v[x] = source >> 1;
                self.v[0xF] = source & 1;
            }
            0x7 => {
                let (diff, borrow) = vy.overflowing_sub(vx);
                self.v[x] = diff;
                self.v[0xF] = (!borrow) as u8;
            }
            0xE => {
                let source = if self.config.shift_takes_value_from_vy {
                    vy
                } else {
                    vx
                };
                self.v[x] = source << 1;
                self.v[0xF] = source >> 7;
            }
            _ => return self.unknown(opcode, at),
        }
        true
    }

    /// Dxyn: XOR-blit an 8-pixel-wide sprite of n rows from memory at I.
    /// Start coordinates wrap onto the screen, the sprite itself clips at
    /// the right and bottom edges. VF reports any 1 -> 0 pixel transition.
    fn draw(&mut self, x: usize, y: usize, rows: u8) {
        let start_x = self.v[x] % SCREEN_WIDTH;
        let start_y = self.v[y] % SCREEN_HEIGHT;
        self.v[0xF] = 0;
        for row in 0..rows {
            let py = start_y + row;
            if py >= SCREEN_HEIGHT {
                break;
            }
            let sprite = self.memory[self.i + u16::from(row)];
            for bit in 0..8u8 {
                let px = start_x + bit;
                if px >= SCREEN_WIDTH {
                    break;
                }
                if sprite & (0x80 >> bit) == 0 {
                    continue;
                }
                if self.screen.get_pixel(px, py) {
                    self.v[0xF] = 1;
                    self.screen.set_pixel(px, py, false);
                } else {
                    self.screen.set_pixel(px, py, true);
                }
            }
        }
    }

    /// Ex__ family: skips conditional on the current key state.
    fn key_skips(&mut self, x: usize, opcode: u16, at: Address) -> bool {
        match opcode & 0xFF {
            0x9E => {
                if self.shared.key_pressed(self.v[x]) {
                    self.skip();
                }
            }
            0xA1 => {
                if !self.shared.key_pressed(self.v[x]) {
                    self.skip();
                }
            }
            _ => return self.unknown(opcode, at),
        }
        true
    }

    /// Fx0A: cooperative busy-wait for a key release. While no key has been
    /// captured the program counter is rewound so the same instruction runs
    /// again next cycle; timers and input keep going in the meantime.
    fn get_key(&mut self, x: usize) {
        let state = self.shared.get_key.load(Ordering::Acquire);
        match state & GET_KEY_STATE_MASK {
            GET_KEY_GOT => {
                self.v[x] = state & 0x0F;
                self.shared.get_key.store(GET_KEY_IDLE, Ordering::Release);
            }
            GET_KEY_IDLE => {
                self.shared
                    .get_key
                    .store(GET_KEY_WAITING, Ordering::Release);
                self.pc -= 2;
            }
            _ => self.pc -= 2,
        }
    }

    /// Fx__ family: timers, the index register and register/memory traffic.
    fn register_instruction(&mut self, x: usize, opcode: u16, at: Address) -> bool {
        match opcode & 0xFF {
            0x07 => self.v[x] = self.shared.delay_timer.load(Ordering::Relaxed),
            0x0A => self.get_key(x),
            0x15 => self.shared.delay_timer.store(self.v[x], Ordering::Relaxed),
            0x1E => {
                let sum = self.i.raw() + u16::from(self.v[x]);
                self.v[0xF] = (sum > Address::VALUE_MASK) as u8;
                self.i = Address::truncated(sum);
            }
            0x29 => self.i = Self::FONT_START + u16::from(self.v[x] & 0x0F) * 5,
            0x33 => {
                let value = self.v[x];
                self.memory[self.i] = value / 100;
                self.memory[self.i + 1] = value / 10 % 10;
                self.memory[self.i + 2] = value % 10;
            }
            0x55 => {
                for offset in 0..=x {
                    self.memory[self.i + offset as u16] = self.v[offset];
                }
                if self.config.register_rw_modifies_i {
                    self.i += x as u16 + 1;
                }
            }
            0x65 => {
                for offset in 0..=x {
                    self.v[offset] = self.memory[self.i + offset as u16];
                }
                if self.config.register_rw_modifies_i {
                    self.i += x as u16 + 1;
                }
            }
            _ => return self.unknown(opcode, at),
        }
        true
    }
}
