//! Samples the video frame on a fixed grid and turns luminance into ramp
//! glyphs on the output grid, through the viewport transform.

use crate::config::RenderConfig;
use crate::frame::VideoFrame;
use crate::geometry::Viewport;
use crate::grid::GlyphGrid;
use crate::surface::Surface;

/// Brightness as the unweighted channel mean, matching the source filter's
/// look rather than a perceptual luma curve.
pub fn brightness(r: u8, g: u8, b: u8) -> u8 {
    ((r as u16 + g as u16 + b as u16) / 3) as u8
}

/// Map brightness 0-255 onto a ramp index, darkest to the *last* ramp
/// character: `floor(map(b, 0, 255, len-1, 0))`. Always in `[0, len-1]`.
pub fn glyph_index(brightness: u8, ramp_len: usize) -> usize {
    debug_assert!(ramp_len >= 1);
    let span = (ramp_len - 1) as f32;
    let i = ((255 - brightness) as f32 * span / 255.0).floor() as usize;
    i.min(ramp_len - 1)
}

/// Walk the frame at `sample_step` stride, push each sample through the
/// viewport transform and stamp the matching glyph into the grid. Returns
/// the number of grid samples visited.
///
/// Out-of-surface samples are dropped; a stride wider than the frame still
/// visits (and may draw) the origin sample.
pub fn map_frame(
    frame: &VideoFrame,
    viewport: &Viewport,
    config: &RenderConfig,
    surface: &Surface,
    grid: &mut GlyphGrid,
) -> usize {
    grid.clear();

    if !frame.is_ready() {
        return 0;
    }

    let ramp = config.ramp();
    let transform = viewport.transform();
    let step = config.sample_step.max(1) as u32;
    let (cell_w, cell_h) = surface.cell_size();

    let mut visited = 0;
    let mut y = 0;
    while y < frame.height {
        let mut x = 0;
        while x < frame.width {
            visited += 1;
            if let Some((r, g, b)) = frame.pixel(x, y) {
                let glyph = ramp[glyph_index(brightness(r, g, b), ramp.len())];
                let (px, py) = transform.apply(x as f32, y as f32);
                if px >= 0.0 && py >= 0.0 {
                    let col = (px / cell_w) as usize;
                    let row = (py / cell_h) as usize;
                    grid.set(col, row, glyph);
                }
            }
            x += step;
        }
        y += step;
    }

    visited
}
