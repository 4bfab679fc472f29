use std::io;
use std::io::Write;

use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

use crate::error::Chip8Error;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// one bit per pixel, row-major, MSB leftmost
pub const FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT / 8;

/// The monochrome pixel grid sprites are composited onto.
///
/// Sprite *origins* wrap around the grid edges; the scan of an individual
/// sprite does not, it clips at the right and bottom boundary.
pub struct Surface {
    frame: [u8; FRAME_BYTES],
    dirty: bool,
}

impl Surface {
    pub fn new() -> Self {
        Surface {
            frame: [0; FRAME_BYTES],
            dirty: false,
        }
    }

    pub fn clear(&mut self) {
        self.frame = [0; FRAME_BYTES];
        self.dirty = true;
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let idx = y * SCREEN_WIDTH + x;
        self.frame[idx / 8] & (0x80 >> (idx % 8)) != 0
    }

    fn flip(&mut self, x: usize, y: usize) {
        let idx = y * SCREEN_WIDTH + x;
        self.frame[idx / 8] ^= 0x80 >> (idx % 8);
    }

    /// XOR-composite a sprite whose rows the caller has already read from
    /// memory. Returns true if any lit pixel was turned off (the collision
    /// condition; the executor owns the flag register itself).
    pub fn blit(&mut self, x: u8, y: u8, rows: &[u8]) -> bool {
        let ox = x as usize % SCREEN_WIDTH;
        let oy = y as usize % SCREEN_HEIGHT;
        let mut collision = false;
        for (row, byte) in rows.iter().enumerate() {
            let py = oy + row;
            if py >= SCREEN_HEIGHT {
                break;
            }
            for bit in 0..8 {
                let px = ox + bit;
                if px >= SCREEN_WIDTH {
                    break;
                }
                if byte & (0x80 >> bit) != 0 {
                    if self.pixel(px, py) {
                        collision = true;
                    }
                    self.flip(px, py);
                }
            }
        }
        self.dirty = true;
        collision
    }

    /// the full grid, for the render collaborator
    pub fn snapshot(&self) -> &[u8] {
        &self.frame
    }

    /// whether the surface changed since this was last called
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

/// Display is used by the cycle driver to present the surface. It should
/// abstract the implementation details, so a variety of kinds of screen
/// would work.
pub trait Display {
    /// present one full-grid snapshot (FRAME_BYTES of packed pixels)
    fn draw(&mut self, frame: &[u8]) -> Result<(), Chip8Error>;
}

/// expand the packed frame into float coords for one bitplane, suitable
/// for rendering with TUI
fn plane_points(frame: &[u8], lit: bool) -> impl Iterator<Item = (f64, f64)> + '_ {
    let mut count = SCREEN_WIDTH * SCREEN_HEIGHT;
    std::iter::from_fn(move || {
        while count > 0 {
            count -= 1;
            let bit = 1 & (frame[count / 8] >> (7 - count % 8));
            if (bit == 1) == lit {
                return Some((
                    (count % SCREEN_WIDTH) as f64,        // x
                    -1.0 * (count / SCREEN_WIDTH) as f64, // y
                ));
            }
        }
        None
    })
}

/// monochrome display in a terminal, rendered using TUI over crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, Chip8Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;
        Ok(MonoTermDisplay { terminal })
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &[u8]) -> Result<(), Chip8Error> {
        // make sure we're given exactly the right amount of data to draw
        assert_eq!(
            frame.len(),
            FRAME_BYTES,
            "MonoTermDisplay must have correct-sized data to draw"
        );

        // 1:1 ratio between terminal cells, chip8 pixels and the TUI canvas
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
                    ctx.draw(&Points {
                        coords: &plane_points(frame, false).collect::<Vec<_>>(),
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &plane_points(frame, true).collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// plain-text frame printer for the debug session's presentation stream;
/// one `X `/`  ` cell per pixel, a ruled line between frames
pub struct AsciiDisplay<W: Write> {
    out: W,
}

impl<W: Write> AsciiDisplay<W> {
    pub fn new(out: W) -> Self {
        AsciiDisplay { out }
    }
}

impl<W: Write> Display for AsciiDisplay<W> {
    fn draw(&mut self, frame: &[u8]) -> Result<(), Chip8Error> {
        assert_eq!(frame.len(), FRAME_BYTES);
        writeln!(self.out, "{}", "=".repeat(SCREEN_WIDTH * 2))?;
        for row in 0..SCREEN_HEIGHT {
            let mut line = String::with_capacity(SCREEN_WIDTH * 2);
            for col in 0..SCREEN_WIDTH {
                let idx = row * SCREEN_WIDTH + col;
                let bit = 1 & (frame[idx / 8] >> (7 - idx % 8));
                line.push_str(if bit == 1 { "X " } else { "  " });
            }
            writeln!(self.out, "{}", line.trim_end())?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// useful for testing non-display routines
pub struct DummyDisplay;

impl DummyDisplay {
    pub fn new() -> Self {
        DummyDisplay {}
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, _frame: &[u8]) -> Result<(), Chip8Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_surface_is_dark() {
        let s = Surface::new();
        assert_eq!(s.snapshot(), &[0u8; FRAME_BYTES]);
    }

    #[test]
    fn test_blit_sets_pixels_msb_first() {
        let mut s = Surface::new();
        assert!(!s.blit(0, 0, &[0b1010_0001]));
        assert!(s.pixel(0, 0));
        assert!(!s.pixel(1, 0));
        assert!(s.pixel(2, 0));
        assert!(s.pixel(7, 0));
        assert!(!s.pixel(8, 0));
    }

    #[test]
    fn test_double_blit_is_self_inverse_and_collides() {
        let mut s = Surface::new();
        assert!(!s.blit(12, 7, &[0xff, 0x81]));
        // same sprite again: every previously-lit bit goes dark
        assert!(s.blit(12, 7, &[0xff, 0x81]));
        assert_eq!(s.snapshot(), &[0u8; FRAME_BYTES]);
    }

    #[test]
    fn test_partial_overlap_collides() {
        let mut s = Surface::new();
        assert!(!s.blit(0, 0, &[0b1000_0000]));
        assert!(s.blit(0, 0, &[0b1100_0000]));
        // XOR: first pixel off, second on
        assert!(!s.pixel(0, 0));
        assert!(s.pixel(1, 0));
    }

    #[test]
    fn test_origin_wraps() {
        let mut s = Surface::new();
        s.blit(64 + 2, 32 + 1, &[0x80]);
        assert!(s.pixel(2, 1));
    }

    #[test]
    fn test_scan_clips_at_edges() {
        let mut s = Surface::new();
        s.blit(62, 31, &[0xff, 0xff]);
        // only columns 62,63 of row 31 land; the rest clips
        assert!(s.pixel(62, 31));
        assert!(s.pixel(63, 31));
        assert!(!s.pixel(0, 31));
        assert!(!s.pixel(0, 0));
        let lit: u32 = s.snapshot().iter().map(|b| b.count_ones()).sum();
        assert_eq!(lit, 2);
    }

    #[test]
    fn test_clear_and_dirty_flag() {
        let mut s = Surface::new();
        assert!(!s.take_dirty());
        s.blit(0, 0, &[0xff]);
        assert!(s.take_dirty());
        assert!(!s.take_dirty());
        s.clear();
        assert!(s.take_dirty());
        assert_eq!(s.snapshot(), &[0u8; FRAME_BYTES]);
    }

    #[test]
    fn test_ascii_display_renders_lit_cells() -> Result<(), Chip8Error> {
        let mut s = Surface::new();
        s.blit(0, 0, &[0b1100_0000]);
        let mut out = Vec::new();
        AsciiDisplay::new(&mut out).draw(s.snapshot())?;
        let text = String::from_utf8(out).unwrap();
        let first_row = text.lines().nth(1).unwrap();
        assert_eq!(first_row, "X X");
        Ok(())
    }
}
