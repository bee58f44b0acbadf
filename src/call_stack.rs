use crate::address::Address;

/// Return addresses for subroutine calls, most recent on top.
///
/// Depth is not capped; classic interpreters stopped at 12-16 frames but a
/// runaway program just grows the vector here. The interpreter reports an
/// empty-stack return as a fatal condition instead.
#[derive(Default)]
pub struct CallStack {
    frames: Vec<Address>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack { frames: Vec::new() }
    }

    /// Push a return address onto the stack.
    pub fn push(&mut self, address: Address) {
        self.frames.push(address);
    }

    /// Pop and return the most recently pushed address, or `None` if the
    /// stack is empty.
    pub fn pop(&mut self) -> Option<Address> {
        self.frames.pop()
    }

    /// Peek at the most recently pushed address without removing it.
    pub fn top(&self) -> Option<Address> {
        self.frames.last().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
