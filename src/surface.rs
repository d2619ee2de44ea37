/// The terminal-backed output surface: a cell grid with a derived logical
/// pixel space so the viewport math stays real pixel math. Cell height is
/// the configured glyph size; cell width is half of it, the usual terminal
/// cell aspect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub cols: u16,
    pub rows: u16,
    glyph_size: u16,
    /// Export supersampling factor, the terminal's stand-in for a display
    /// devicePixelRatio.
    pixel_density: f32,
}

impl Surface {
    pub fn new(cols: u16, rows: u16, glyph_size: u16, pixel_density: f32) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
            glyph_size: glyph_size.max(1),
            pixel_density: if pixel_density > 0.0 { pixel_density } else { 1.0 },
        }
    }

    /// (cell width, cell height) in logical pixels.
    pub fn cell_size(&self) -> (f32, f32) {
        let cell_h = self.glyph_size as f32;
        let cell_w = (self.glyph_size / 2).max(1) as f32;
        (cell_w, cell_h)
    }

    pub fn pixel_w(&self) -> f32 {
        self.cols as f32 * self.cell_size().0
    }

    pub fn pixel_h(&self) -> f32 {
        self.rows as f32 * self.cell_size().1
    }

    pub fn pixel_density(&self) -> f32 {
        self.pixel_density
    }

    pub fn set_glyph_size(&mut self, glyph_size: u16) {
        self.glyph_size = glyph_size.max(1);
    }

    /// Terminal resize; geometry derived from the old size is invalid.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
    }
}
