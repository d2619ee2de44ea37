//! Cover-fit viewport geometry.
//!
//! Maps source video pixel space into output-surface pixel space under
//! "cover" semantics: the video is scaled by the smallest uniform factor
//! that fills the target container on both axes, cropping the overflow.
//! When the configured aspect ratio's orientation conflicts with the
//! physical surface orientation the container is computed in swapped
//! "logical" space and a 90-degree rotation folds it back. The exact same
//! pipeline serves live rendering and snapshot cropping.

use crate::config::{AspectRatio, FacingMode};
use crate::error::{LensError, Result};

/// One affine step of the viewport pipeline, in issue order: each op is
/// composed onto the current transform the way a canvas accumulates them,
/// so the op issued last touches the point first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    /// Quarter turn about the surface origin; `(x, y) -> (w - y, x)`.
    Rotate90 { surface_w: f32 },
    Translate { dx: f32, dy: f32 },
    Scale { sx: f32, sy: f32 },
}

/// Row-major 2x3 affine matrix: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    fn from_op(op: TransformOp) -> Self {
        match op {
            TransformOp::Rotate90 { surface_w } => Self {
                a: 0.0,
                b: 1.0,
                c: -1.0,
                d: 0.0,
                e: surface_w,
                f: 0.0,
            },
            TransformOp::Translate { dx, dy } => Self {
                a: 1.0,
                b: 0.0,
                c: 0.0,
                d: 1.0,
                e: dx,
                f: dy,
            },
            TransformOp::Scale { sx, sy } => Self {
                a: sx,
                b: 0.0,
                c: 0.0,
                d: sy,
                e: 0.0,
                f: 0.0,
            },
        }
    }

    /// Compose `rhs` to run before `self` in point space.
    fn mul(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }

    /// Fold an op list in issue order into a single matrix.
    pub fn from_ops(ops: &[TransformOp]) -> Self {
        ops.iter()
            .fold(Self::identity(), |acc, &op| acc.mul(Self::from_op(op)))
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// Axis-aligned crop region in physical surface pixels, pixel density
/// already applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl CropRect {
    /// Integer pixel rect clamped to the given image bounds.
    pub fn to_pixels(&self, image_w: u32, image_h: u32) -> (u32, u32, u32, u32) {
        let x = self.x.round().max(0.0) as u32;
        let y = self.y.round().max(0.0) as u32;
        let x = x.min(image_w.saturating_sub(1));
        let y = y.min(image_h.saturating_sub(1));
        let w = (self.w.round() as u32).min(image_w - x).max(1);
        let h = (self.h.round() as u32).min(image_h - y).max(1);
        (x, y, w, h)
    }
}

/// Per-frame derived geometry. Recomputed on every render pass and again,
/// identically, for snapshot export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Largest aspect-ratio box inside the (possibly swapped) surface.
    pub container_w: f32,
    pub container_h: f32,
    /// Uniform source-to-container scale; covers, never letterboxes.
    pub scale_factor: f32,
    /// Centers the scaled video inside the container.
    pub offset_x: f32,
    pub offset_y: f32,
    /// Centers the container inside the available space.
    pub draw_x: f32,
    pub draw_y: f32,
    /// Set when the ratio orientation conflicts with the surface.
    pub rotated: bool,
    surface_w: f32,
    video_w: f32,
    mirrored: bool,
    pixel_density: f32,
}

impl Viewport {
    /// Compute geometry for one frame. Zero video dimensions mean the
    /// stream has not negotiated yet; the caller skips the frame.
    pub fn compute(
        surface_w: f32,
        surface_h: f32,
        video_w: u32,
        video_h: u32,
        ratio: &AspectRatio,
        facing: FacingMode,
        pixel_density: f32,
    ) -> Result<Self> {
        if video_w == 0 || video_h == 0 {
            return Err(LensError::StreamNotReady);
        }

        let value = ratio.value();
        let surface_portrait = surface_h > surface_w;
        let ratio_portrait = ratio.is_portrait();
        let ratio_landscape = value > 1.0;
        // Square ratios fit either orientation; never rotate them.
        let rotated = (ratio_portrait && !surface_portrait && surface_w != surface_h)
            || (ratio_landscape && surface_portrait);

        let (avail_w, avail_h) = if rotated {
            (surface_h, surface_w)
        } else {
            (surface_w, surface_h)
        };

        let mut container_w = avail_w;
        let mut container_h = avail_w / value;
        if container_h > avail_h {
            container_h = avail_h;
            container_w = avail_h * value;
        }

        let video_w = video_w as f32;
        let video_h = video_h as f32;
        let scale_factor = (container_w / video_w).max(container_h / video_h);

        let offset_x = (container_w - video_w * scale_factor) / 2.0;
        let offset_y = (container_h - video_h * scale_factor) / 2.0;
        let draw_x = (avail_w - container_w) / 2.0;
        let draw_y = (avail_h - container_h) / 2.0;

        Ok(Self {
            container_w,
            container_h,
            scale_factor,
            offset_x,
            offset_y,
            draw_x,
            draw_y,
            rotated,
            surface_w,
            video_w,
            mirrored: facing == FacingMode::User,
            pixel_density,
        })
    }

    /// The pipeline in issue order: rotate, center container, center video,
    /// scale, mirror. Render and export both consume exactly this list.
    pub fn ops(&self) -> Vec<TransformOp> {
        let mut ops = Vec::with_capacity(6);
        if self.rotated {
            ops.push(TransformOp::Rotate90 {
                surface_w: self.surface_w,
            });
        }
        ops.push(TransformOp::Translate {
            dx: self.draw_x,
            dy: self.draw_y,
        });
        ops.push(TransformOp::Translate {
            dx: self.offset_x,
            dy: self.offset_y,
        });
        ops.push(TransformOp::Scale {
            sx: self.scale_factor,
            sy: self.scale_factor,
        });
        if self.mirrored {
            ops.push(TransformOp::Scale { sx: -1.0, sy: 1.0 });
            ops.push(TransformOp::Translate {
                dx: -self.video_w,
                dy: 0.0,
            });
        }
        ops
    }

    pub fn transform(&self) -> Transform {
        Transform::from_ops(&self.ops())
    }

    /// The container rectangle in physical surface coordinates, rotation
    /// folded in, scaled by pixel density. This is the snapshot crop.
    pub fn crop_rect(&self) -> CropRect {
        let d = self.pixel_density;
        if self.rotated {
            // Logical (draw_x, draw_y, cw, ch) through (x, y) -> (W - y, x).
            CropRect {
                x: (self.surface_w - self.draw_y - self.container_h) * d,
                y: self.draw_x * d,
                w: self.container_h * d,
                h: self.container_w * d,
            }
        } else {
            CropRect {
                x: self.draw_x * d,
                y: self.draw_y * d,
                w: self.container_w * d,
                h: self.container_h * d,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(label: &str) -> AspectRatio {
        AspectRatio::parse(label).unwrap()
    }

    fn viewport(
        surface: (f32, f32),
        video: (u32, u32),
        label: &str,
        facing: FacingMode,
    ) -> Viewport {
        Viewport::compute(
            surface.0,
            surface.1,
            video.0,
            video.1,
            &ratio(label),
            facing,
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn zero_dimensions_are_not_ready() {
        let err = Viewport::compute(
            100.0,
            100.0,
            0,
            480,
            &ratio("16:9"),
            FacingMode::Environment,
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, LensError::StreamNotReady));
    }

    #[test]
    fn cover_fit_never_letterboxes() {
        let cases = [
            ((1920.0, 1080.0), (640, 480), "16:9"),
            ((800.0, 600.0), (1280, 720), "4:3"),
            ((333.0, 777.0), (640, 360), "1:1"),
            ((1024.0, 512.0), (320, 240), "9:16"),
        ];
        for (surface, video, label) in cases {
            let vp = viewport(surface, video, label, FacingMode::Environment);
            let scaled_w = vp.scale_factor * video.0 as f32;
            let scaled_h = vp.scale_factor * video.1 as f32;
            assert!(
                scaled_w >= vp.container_w - 1e-3 && scaled_h >= vp.container_h - 1e-3,
                "scaled {scaled_w}x{scaled_h} must cover {}x{}",
                vp.container_w,
                vp.container_h
            );
        }
    }

    #[test]
    fn container_is_largest_ratio_box() {
        let vp = viewport((1000.0, 500.0), (640, 480), "1:1", FacingMode::Environment);
        assert!((vp.container_w - 500.0).abs() < 1e-3);
        assert!((vp.container_h - 500.0).abs() < 1e-3);
        assert!((vp.draw_x - 250.0).abs() < 1e-3);
        assert!((vp.draw_y - 0.0).abs() < 1e-3);
    }

    #[test]
    fn portrait_ratio_on_landscape_surface_rotates() {
        let vp = viewport((1600.0, 900.0), (640, 480), "4:5", FacingMode::Environment);
        assert!(vp.rotated);
        // available space was swapped before fitting
        assert!(vp.container_w <= 900.0 + 1e-3);
        assert!(vp.container_h <= 1600.0 + 1e-3);
        assert!((vp.container_w / vp.container_h - 0.8).abs() < 1e-3);
    }

    #[test]
    fn square_ratio_never_rotates() {
        assert!(!viewport((1600.0, 900.0), (640, 480), "1:1", FacingMode::Environment).rotated);
        assert!(!viewport((900.0, 1600.0), (640, 480), "1:1", FacingMode::Environment).rotated);
    }

    #[test]
    fn matching_orientation_does_not_rotate() {
        assert!(!viewport((1600.0, 900.0), (640, 480), "16:9", FacingMode::Environment).rotated);
        assert!(!viewport((900.0, 1600.0), (640, 480), "4:5", FacingMode::Environment).rotated);
    }

    #[test]
    fn transform_centers_video_midpoint_in_container() {
        let vp = viewport((1000.0, 500.0), (640, 480), "1:1", FacingMode::Environment);
        let t = vp.transform();
        let (cx, cy) = t.apply(320.0, 240.0);
        assert!((cx - 500.0).abs() < 1e-2);
        assert!((cy - 250.0).abs() < 1e-2);
    }

    #[test]
    fn mirror_swaps_horizontal_edges() {
        let vp = viewport((640.0, 480.0), (640, 480), "4:3", FacingMode::User);
        let t = vp.transform();
        let (left, _) = t.apply(0.0, 0.0);
        let (right, _) = t.apply(640.0, 0.0);
        assert!((left - 640.0).abs() < 1e-2);
        assert!(right.abs() < 1e-2);
    }

    #[test]
    fn rotated_transform_lands_inside_physical_surface() {
        let vp = viewport((1600.0, 900.0), (480, 600), "4:5", FacingMode::Environment);
        let t = vp.transform();
        for (x, y) in [(0.0, 0.0), (480.0, 0.0), (0.0, 600.0), (480.0, 600.0), (240.0, 300.0)] {
            let (px, py) = t.apply(x, y);
            assert!(
                (-1.0..=1601.0).contains(&px) && (-1.0..=901.0).contains(&py),
                "({x},{y}) mapped outside the surface: ({px},{py})"
            );
        }
    }

    #[test]
    fn crop_rect_matches_container_when_unrotated() {
        let vp = viewport((1000.0, 500.0), (640, 480), "1:1", FacingMode::Environment);
        let crop = vp.crop_rect();
        assert_eq!(
            crop,
            CropRect {
                x: vp.draw_x,
                y: vp.draw_y,
                w: vp.container_w,
                h: vp.container_h
            }
        );
    }

    #[test]
    fn rotated_crop_rect_contains_transformed_container_center() {
        let vp = viewport((1600.0, 900.0), (480, 600), "4:5", FacingMode::Environment);
        let crop = vp.crop_rect();
        let t = vp.transform();
        let (cx, cy) = t.apply(240.0, 300.0);
        assert!(cx >= crop.x && cx <= crop.x + crop.w);
        assert!(cy >= crop.y && cy <= crop.y + crop.h);
        // a quarter turn swaps the rect sides
        assert!((crop.w - vp.container_h).abs() < 1e-3);
        assert!((crop.h - vp.container_w).abs() < 1e-3);
    }

    #[test]
    fn pixel_density_scales_the_crop() {
        let vp = Viewport::compute(
            1000.0,
            500.0,
            640,
            480,
            &ratio("1:1"),
            FacingMode::Environment,
            2.0,
        )
        .unwrap();
        let crop = vp.crop_rect();
        assert!((crop.w - 1000.0).abs() < 1e-3);
        assert!((crop.x - 500.0).abs() < 1e-3);
    }

    #[test]
    fn recomputation_is_deterministic() {
        let a = viewport((1366.0, 768.0), (1280, 720), "4:5", FacingMode::User);
        let b = viewport((1366.0, 768.0), (1280, 720), "4:5", FacingMode::User);
        assert_eq!(a, b);
        assert_eq!(a.crop_rect(), b.crop_rect());
        assert_eq!(a.ops(), b.ops());
    }

    #[test]
    fn crop_to_pixels_clamps_to_image() {
        let crop = CropRect {
            x: -4.0,
            y: 2.0,
            w: 5000.0,
            h: 10.0,
        };
        let (x, y, w, h) = crop.to_pixels(100, 50);
        assert_eq!((x, y), (0, 2));
        assert!(x + w <= 100);
        assert!(y + h <= 50);
    }
}
