//! Snapshot export: rasterize the glyph grid to pixels, crop to the
//! viewport's recorded container region, encode as PNG.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::{Rgb, RgbImage, imageops};
use tracing::info;

use crate::config::{GlyphWeight, RenderConfig};
use crate::error::{LensError, Result};
use crate::font;
use crate::geometry::CropRect;
use crate::grid::{BLANK, GlyphGrid};
use crate::surface::Surface;

/// A cropped snapshot held in memory until the user saves, shares or
/// discards it.
pub struct CapturedPhoto {
    pub filename: String,
    pub image: RgbImage,
}

/// Timestamped filename, unique per capture.
fn snapshot_filename() -> String {
    format!("binary-lens-{}.png", Utc::now().timestamp_millis())
}

/// Rasterize the full surface at pixel density, then crop. Uses the same
/// `CropRect` the render pass recorded, so the snapshot is exactly the
/// visible container.
pub fn capture(
    grid: &GlyphGrid,
    config: &RenderConfig,
    surface: &Surface,
    crop: CropRect,
) -> Result<CapturedPhoto> {
    let density = surface.pixel_density();
    let image_w = (surface.pixel_w() * density).round() as u32;
    let image_h = (surface.pixel_h() * density).round() as u32;
    if image_w == 0 || image_h == 0 {
        return Err(LensError::export("surface has no pixels"));
    }

    let mut image = RgbImage::from_pixel(image_w, image_h, Rgb(config.background_color));
    let (cell_w, cell_h) = surface.cell_size();
    let cell_px_w = cell_w * density;
    let cell_px_h = cell_h * density;

    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let c = match grid.get(col, row) {
                Some(c) if c != BLANK => c,
                _ => continue,
            };
            let x0 = (col as f32 * cell_px_w).round() as u32;
            let x1 = ((col + 1) as f32 * cell_px_w).round().min(image_w as f32) as u32;
            let y0 = (row as f32 * cell_px_h).round() as u32;
            let y1 = ((row + 1) as f32 * cell_px_h).round().min(image_h as f32) as u32;

            match font::glyph(c) {
                Some(columns) => {
                    draw_glyph(&mut image, columns, (x0, x1, y0, y1), config);
                }
                // outside the font table: render as a solid cell
                None => {
                    for y in y0..y1 {
                        for x in x0..x1 {
                            image.put_pixel(x, y, Rgb(config.glyph_color));
                        }
                    }
                }
            }
        }
    }

    let (cx, cy, cw, ch) = crop.to_pixels(image_w, image_h);
    let image = imageops::crop_imm(&image, cx, cy, cw, ch).to_image();

    let photo = CapturedPhoto {
        filename: snapshot_filename(),
        image,
    };
    info!(filename = %photo.filename, w = cw, h = ch, "snapshot captured");
    Ok(photo)
}

/// Stretch the 5x7 bitmap over the cell rect. Bold thickens strokes by a
/// font column, italic shears the sampling toward the top-right.
fn draw_glyph(
    image: &mut RgbImage,
    columns: &[u8; font::GLYPH_W],
    (x0, x1, y0, y1): (u32, u32, u32, u32),
    config: &RenderConfig,
) {
    let span_w = (x1 - x0).max(1) as f32;
    let span_h = (y1 - y0).max(1) as f32;

    for y in y0..y1 {
        let v_f = (y - y0) as f32 * font::GLYPH_H as f32 / span_h;
        let v = v_f as usize;
        let shear = match config.weight {
            GlyphWeight::Italic => (font::GLYPH_H as f32 - 1.0 - v as f32) * 0.2,
            _ => 0.0,
        };
        for x in x0..x1 {
            let u_f = (x - x0) as f32 * font::GLYPH_W as f32 / span_w - shear;
            if u_f < 0.0 {
                continue;
            }
            let u = u_f as usize;
            let mut inked = font::pixel_set(columns, u, v);
            if !inked && config.weight == GlyphWeight::Bold && u > 0 {
                inked = font::pixel_set(columns, u - 1, v);
            }
            if inked {
                image.put_pixel(x, y, Rgb(config.glyph_color));
            }
        }
    }
}

impl CapturedPhoto {
    /// Write the PNG into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        self.image
            .save(&path)
            .map_err(|e| LensError::export(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "snapshot saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AspectRatio, FacingMode};
    use crate::geometry::Viewport;

    fn fixture() -> (RenderConfig, Surface, GlyphGrid) {
        let mut config = RenderConfig::new();
        config.set_glyph_size(8);
        let surface = Surface::new(8, 4, config.glyph_size, 1.0);
        let grid = GlyphGrid::new(8, 4);
        (config, surface, grid)
    }

    fn full_crop(surface: &Surface) -> CropRect {
        CropRect {
            x: 0.0,
            y: 0.0,
            w: surface.pixel_w(),
            h: surface.pixel_h(),
        }
    }

    #[test]
    fn blank_grid_is_pure_background() {
        let (config, surface, grid) = fixture();
        let photo = capture(&grid, &config, &surface, full_crop(&surface)).unwrap();
        assert!(
            photo
                .image
                .pixels()
                .all(|p| p.0 == config.background_color)
        );
    }

    #[test]
    fn drawn_cell_contains_glyph_color() {
        let (config, surface, mut grid) = fixture();
        grid.set(0, 0, '@');
        let photo = capture(&grid, &config, &surface, full_crop(&surface)).unwrap();
        let cell: Vec<_> = (0..8).flat_map(|y| (0..4).map(move |x| (x, y))).collect();
        assert!(
            cell.iter()
                .any(|&(x, y)| photo.image.get_pixel(x, y).0 == config.glyph_color)
        );
    }

    #[test]
    fn unknown_glyph_renders_solid() {
        let (config, surface, mut grid) = fixture();
        grid.set(1, 1, '█');
        let photo = capture(&grid, &config, &surface, full_crop(&surface)).unwrap();
        // cell (1,1) spans x 4..8, y 8..16
        for y in 8..16 {
            for x in 4..8 {
                assert_eq!(photo.image.get_pixel(x, y).0, config.glyph_color);
            }
        }
    }

    #[test]
    fn bold_never_loses_ink() {
        let (mut config, surface, mut grid) = fixture();
        grid.set(0, 0, 'H');
        let normal = capture(&grid, &config, &surface, full_crop(&surface)).unwrap();
        config.weight = GlyphWeight::Bold;
        let bold = capture(&grid, &config, &surface, full_crop(&surface)).unwrap();

        let ink = |img: &RgbImage| {
            img.pixels()
                .filter(|p| p.0 == config.glyph_color)
                .count()
        };
        assert!(ink(&bold.image) >= ink(&normal.image));
    }

    #[test]
    fn crop_bounds_match_viewport_rect() {
        let (config, surface, grid) = fixture();
        let vp = Viewport::compute(
            surface.pixel_w(),
            surface.pixel_h(),
            640,
            480,
            &AspectRatio::parse("1:1").unwrap(),
            FacingMode::Environment,
            surface.pixel_density(),
        )
        .unwrap();

        let photo = capture(&grid, &config, &surface, vp.crop_rect()).unwrap();
        let (_, _, cw, ch) = vp
            .crop_rect()
            .to_pixels(surface.pixel_w() as u32, surface.pixel_h() as u32);
        assert_eq!(photo.image.width(), cw);
        assert_eq!(photo.image.height(), ch);
    }

    #[test]
    fn repeated_capture_with_same_geometry_is_identical() {
        let (config, surface, mut grid) = fixture();
        grid.set(2, 2, '#');
        let crop = full_crop(&surface);
        let a = capture(&grid, &config, &surface, crop).unwrap();
        let b = capture(&grid, &config, &surface, crop).unwrap();
        assert_eq!(a.image.as_raw(), b.image.as_raw());
    }

    #[test]
    fn filename_is_prefixed_png() {
        let (config, surface, grid) = fixture();
        let photo = capture(&grid, &config, &surface, full_crop(&surface)).unwrap();
        assert!(photo.filename.starts_with("binary-lens-"));
        assert!(photo.filename.ends_with(".png"));
    }
}
