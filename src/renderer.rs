use std::io::{self, Write};

use crate::config::{Color, GlyphWeight, RenderConfig};
use crate::grid::GlyphGrid;

/// Writes the glyph grid to stdout with cursor-addressed ANSI sequences,
/// repainting only cells that changed since the previous frame to keep
/// flicker down.
pub struct TermRenderer {
    prev_cells: Vec<char>,
    prev_cols: usize,
    prev_rows: usize,
    prev_fg: Color,
    prev_bg: Color,
    prev_weight: GlyphWeight,
    dirty: bool,
}

impl TermRenderer {
    pub fn new() -> Self {
        Self {
            prev_cells: Vec::new(),
            prev_cols: 0,
            prev_rows: 0,
            prev_fg: [0, 0, 0],
            prev_bg: [255, 255, 255],
            prev_weight: GlyphWeight::Normal,
            dirty: true,
        }
    }

    /// Force a full repaint on the next render (resize, style change).
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    fn style_sequence(config: &RenderConfig) -> String {
        let [fr, fg_, fb] = config.glyph_color;
        let [br, bg_, bb] = config.background_color;
        let weight = match config.weight {
            GlyphWeight::Normal => "",
            GlyphWeight::Bold => "\x1B[1m",
            GlyphWeight::Italic => "\x1B[3m",
        };
        format!("\x1B[0m{weight}\x1B[38;2;{fr};{fg_};{fb}m\x1B[48;2;{br};{bg_};{bb}m")
    }

    /// Emit changed cells. A size or style change clears the whole screen
    /// with the background color first.
    pub fn render(&mut self, grid: &GlyphGrid, config: &RenderConfig) -> io::Result<()> {
        let mut out = io::stdout().lock();

        let style_changed = self.prev_fg != config.glyph_color
            || self.prev_bg != config.background_color
            || self.prev_weight != config.weight;
        let size_changed = grid.cols != self.prev_cols || grid.rows != self.prev_rows;

        if self.dirty || style_changed || size_changed {
            self.prev_cells = vec!['\0'; grid.cols * grid.rows];
            self.prev_cols = grid.cols;
            self.prev_rows = grid.rows;
            self.prev_fg = config.glyph_color;
            self.prev_bg = config.background_color;
            self.prev_weight = config.weight;
            self.dirty = false;
            // set style first so the clear fills with the background color
            write!(out, "{}\x1B[2J\x1B[1;1H", Self::style_sequence(config))?;
        }

        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let i = row * grid.cols + col;
                let c = grid.cells()[i];
                if self.prev_cells[i] != c {
                    write!(out, "\x1B[{};{}H{}", row + 1, col + 1, c)?;
                    self.prev_cells[i] = c;
                }
            }
        }

        out.flush()
    }

    /// One-line footer below the grid, truncated to the terminal width.
    pub fn status_line(&mut self, row: u16, cols: u16, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        let line: String = text.chars().take(cols as usize).collect();
        write!(
            out,
            "\x1B[{};1H\x1B[7m{:<width$}\x1B[27m",
            row + 1,
            line,
            width = cols as usize
        )?;
        out.flush()
    }
}

impl Default for TermRenderer {
    fn default() -> Self {
        Self::new()
    }
}
