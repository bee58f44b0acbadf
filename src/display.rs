use std::io;
use std::sync::{Arc, Mutex};
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

pub const SCREEN_WIDTH: u8 = 64;
pub const SCREEN_HEIGHT: u8 = 32;

/// Screen is the one visible side effect the interpreter has. It should
/// abstract the implementation details, so a variety of kinds of display
/// work: the draw instruction only ever reads and flips single pixels.
pub trait Screen {
    /// turn every pixel off
    fn clear(&mut self);

    /// whether the pixel at (x, y) is lit, x in 0..64, y in 0..32
    fn get_pixel(&self, x: u8, y: u8) -> bool;

    /// light or darken the pixel at (x, y)
    fn set_pixel(&mut self, x: u8, y: u8, on: bool);
}

/// Plain monochrome pixel grid. This is the screen used directly in tests
/// and the state behind [`SharedFrameBuffer`] in the real front end.
#[derive(Clone)]
pub struct FrameBuffer {
    pixels: [[bool; SCREEN_WIDTH as usize]; SCREEN_HEIGHT as usize],
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer {
            pixels: [[false; SCREEN_WIDTH as usize]; SCREEN_HEIGHT as usize],
        }
    }

    /// iterate over the coordinates of every lit pixel
    pub fn lit_pixels(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.pixels.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, on)| **on)
                .map(move |(x, _)| (x as u8, y as u8))
        })
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        FrameBuffer::new()
    }
}

impl Screen for FrameBuffer {
    fn clear(&mut self) {
        self.pixels = [[false; SCREEN_WIDTH as usize]; SCREEN_HEIGHT as usize];
    }

    fn get_pixel(&self, x: u8, y: u8) -> bool {
        self.pixels[y as usize][x as usize]
    }

    fn set_pixel(&mut self, x: u8, y: u8, on: bool) {
        self.pixels[y as usize][x as usize] = on;
    }
}

struct SharedInner {
    frame: FrameBuffer,
    dirty: bool,
}

/// A frame buffer that can be written by the instruction clock thread while
/// the main thread renders it. Writes mark the frame dirty; the renderer
/// takes a snapshot only when something changed.
#[derive(Clone)]
pub struct SharedFrameBuffer {
    inner: Arc<Mutex<SharedInner>>,
}

impl SharedFrameBuffer {
    pub fn new() -> Self {
        SharedFrameBuffer {
            inner: Arc::new(Mutex::new(SharedInner {
                frame: FrameBuffer::new(),
                dirty: true,
            })),
        }
    }

    /// Snapshot the frame if it changed since the last call.
    pub fn take_if_dirty(&self) -> Option<FrameBuffer> {
        let mut inner = self.inner.lock().unwrap();
        if inner.dirty {
            inner.dirty = false;
            Some(inner.frame.clone())
        } else {
            None
        }
    }
}

impl Default for SharedFrameBuffer {
    fn default() -> Self {
        SharedFrameBuffer::new()
    }
}

impl Screen for SharedFrameBuffer {
    fn clear(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.frame.clear();
        inner.dirty = true;
    }

    fn get_pixel(&self, x: u8, y: u8) -> bool {
        self.inner.lock().unwrap().frame.get_pixel(x, y)
    }

    fn set_pixel(&mut self, x: u8, y: u8, on: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.frame.set_pixel(x, y, on);
        inner.dirty = true;
    }
}

/// Monochrome display in a terminal, rendered with TUI over crossterm.
pub struct TermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TermDisplay {
    pub fn new() -> Result<TermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(TermDisplay { terminal })
    }

    /// Draw a frame snapshot. Assumes a 1:1 ratio between terminal cells
    /// and CHIP-8 pixels.
    pub fn render(&mut self, frame: &FrameBuffer) -> Result<(), io::Error> {
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + SCREEN_WIDTH as u16, 2 + SCREEN_HEIGHT as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds([0.0, (SCREEN_WIDTH - 1) as f64])
                .y_bounds([-1.0 * (SCREEN_HEIGHT - 1) as f64, 0.0])
                .marker(Marker::Block)
                .paint(|ctx| {
                    // the canvas y axis points up, the frame buffer's down
                    ctx.draw(&Points {
                        coords: &frame
                            .lit_pixels()
                            .map(|(x, y)| (x as f64, -1.0 * y as f64))
                            .collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}
