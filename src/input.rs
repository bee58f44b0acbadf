use crate::processor::ProcessorHandle;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

/// map of characters read from the keyboard to the 16-key pad, using the
/// left-hand side of a qwerty keyboard
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

/// Terminals report keypresses but never key-up events, so a release has to
/// be synthesized: each mapped press marks the pad key held and refreshes a
/// hold deadline, and keys whose deadline has passed are released. Terminal
/// auto-repeat keeps a physically held key alive.
const KEY_HOLD: Duration = Duration::from_millis(150);

/// Feeds terminal keypresses to the processor as pad press/release events.
/// Puts the terminal in raw mode for its lifetime.
pub struct TermInput {
    keymap: HashMap<char, u8>,
    held_until: [Option<Instant>; 16],
}

impl TermInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: HashMap::from(CONVENTIONAL_KEYMAP),
            held_until: [None; 16],
        })
    }

    /// Drain pending terminal events into the processor and release any
    /// expired keys. Returns false once the user asks to quit (Esc or
    /// Ctrl-C).
    pub fn pump(&mut self, processor: &ProcessorHandle) -> Result<bool, io::Error> {
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                match evt.code {
                    KeyCode::Esc => return Ok(false),
                    KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(false)
                    }
                    KeyCode::Char(c) => {
                        if let Some(&key) = self.keymap.get(&c) {
                            if self.held_until[key as usize].is_none() {
                                processor.toggle_key(key, true);
                            }
                            self.held_until[key as usize] = Some(Instant::now() + KEY_HOLD);
                        }
                    }
                    _ => {}
                }
            }
        }

        let now = Instant::now();
        for (key, deadline) in self.held_until.iter_mut().enumerate() {
            if matches!(deadline, Some(t) if *t <= now) {
                processor.toggle_key(key as u8, false);
                *deadline = None;
            }
        }
        Ok(true)
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
