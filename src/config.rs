use crate::error::{LensError, Result};

/// RGB triple, each channel 0-255.
pub type Color = [u8; 3];

/// Which physical camera the capture source should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera, the default.
    Environment,
    /// Front camera; the preview is mirrored like a mirror.
    User,
}

impl FacingMode {
    pub fn toggle(self) -> Self {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

/// Rendered glyph weight, applied as SGR attributes on the terminal and as
/// a stroke hint in the exported image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphWeight {
    Normal,
    Bold,
    Italic,
}

impl GlyphWeight {
    pub fn cycle(self) -> Self {
        match self {
            GlyphWeight::Normal => GlyphWeight::Bold,
            GlyphWeight::Bold => GlyphWeight::Italic,
            GlyphWeight::Italic => GlyphWeight::Normal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GlyphWeight::Normal => "normal",
            GlyphWeight::Bold => "bold",
            GlyphWeight::Italic => "italic",
        }
    }
}

impl std::str::FromStr for GlyphWeight {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(GlyphWeight::Normal),
            "bold" => Ok(GlyphWeight::Bold),
            "italic" => Ok(GlyphWeight::Italic),
            other => Err(LensError::config(format!("unknown glyph weight '{other}'"))),
        }
    }
}

/// A target aspect ratio, kept alongside its `W:H` label so the selection
/// can be persisted and shown back to the user verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectRatio {
    label: String,
    width: f32,
    height: f32,
}

impl AspectRatio {
    /// Ratio labels offered by the selector, in cycle order.
    pub const PRESETS: [&'static str; 5] = ["16:9", "4:3", "1:1", "4:5", "9:16"];

    /// Parse a `W:H` label such as `"16:9"`.
    pub fn parse(label: &str) -> Result<Self> {
        let (w, h) = label
            .split_once(':')
            .ok_or_else(|| LensError::config(format!("aspect ratio '{label}' is not W:H")))?;
        let width: f32 = w
            .trim()
            .parse()
            .map_err(|_| LensError::config(format!("aspect ratio '{label}' is not numeric")))?;
        let height: f32 = h
            .trim()
            .parse()
            .map_err(|_| LensError::config(format!("aspect ratio '{label}' is not numeric")))?;

        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(LensError::config(format!(
                "aspect ratio '{label}' must have positive terms"
            )));
        }

        Ok(Self {
            label: format!("{}:{}", w.trim(), h.trim()),
            width,
            height,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Numeric width/height value, e.g. "16:9" -> 1.778.
    pub fn value(&self) -> f32 {
        self.width / self.height
    }

    pub fn is_portrait(&self) -> bool {
        self.value() < 1.0
    }

    /// Nominal capture resolution to request from the camera as a hint,
    /// anchored to 640 on the long side and rounded to even numbers.
    pub fn nominal_resolution(&self) -> (u32, u32) {
        let value = self.value();
        let (w, h) = if value >= 1.0 {
            (640.0, 640.0 / value)
        } else {
            (640.0 * value, 640.0)
        };
        (even(w), even(h))
    }

    /// Next preset ratio; an off-list ratio re-enters the cycle at the top.
    pub fn cycle(&self) -> Self {
        let at = Self::PRESETS.iter().position(|p| *p == self.label);
        let next = match at {
            Some(i) => Self::PRESETS[(i + 1) % Self::PRESETS.len()],
            None => Self::PRESETS[0],
        };
        // presets always parse
        Self::parse(next).unwrap_or_else(|_| self.clone())
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            label: "16:9".to_string(),
            width: 16.0,
            height: 9.0,
        }
    }
}

fn even(v: f32) -> u32 {
    let v = v.round() as u32;
    v - (v % 2)
}

/// Parse a `#RRGGBB` hex color.
pub fn parse_hex_color(hex: &str) -> Result<Color> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LensError::config(format!("color '{hex}' is not #RRGGBB")));
    }

    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16);
    match (channel(0), channel(2), channel(4)) {
        (Ok(r), Ok(g), Ok(b)) => Ok([r, g, b]),
        _ => Err(LensError::config(format!("color '{hex}' is not #RRGGBB"))),
    }
}

/// User-adjustable rendering parameters. Owned by the app and passed by
/// reference to the compositor and mapper each frame.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Pixel stride for grid sampling, 1..=64.
    pub sample_step: usize,
    /// Glyph size in logical pixels, 4..=64. Determines the surface cell
    /// size (cell height = glyph size, cell width = half of it).
    pub glyph_size: u16,
    /// Ordered character ramp, sparsest glyph first; dark pixels draw from
    /// the far end. Never empty.
    ramp: Vec<char>,
    pub glyph_color: Color,
    pub background_color: Color,
    pub weight: GlyphWeight,
    pub aspect_ratio: AspectRatio,
    pub facing: FacingMode,
}

impl RenderConfig {
    pub const DEFAULT_RAMP: &'static str = " .:-=+*#%@";
    pub const LETTERS_RAMP: &'static str =
        "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    pub const SAMPLE_STEP_MIN: usize = 1;
    pub const SAMPLE_STEP_MAX: usize = 64;
    pub const GLYPH_SIZE_MIN: u16 = 4;
    pub const GLYPH_SIZE_MAX: u16 = 64;

    pub fn new() -> Self {
        Self {
            sample_step: 10,
            glyph_size: 13,
            ramp: Self::DEFAULT_RAMP.chars().collect(),
            glyph_color: [0, 0, 0],
            background_color: [255, 255, 255],
            weight: GlyphWeight::Normal,
            aspect_ratio: AspectRatio::default(),
            facing: FacingMode::Environment,
        }
    }

    pub fn ramp(&self) -> &[char] {
        &self.ramp
    }

    /// Replace the ramp; an empty string is rejected and the previous ramp
    /// stays in effect.
    pub fn set_ramp(&mut self, chars: &str) -> Result<()> {
        if chars.is_empty() {
            return Err(LensError::config("glyph ramp must not be empty"));
        }
        self.ramp = chars.chars().collect();
        Ok(())
    }

    pub fn set_sample_step(&mut self, step: usize) {
        self.sample_step = step.clamp(Self::SAMPLE_STEP_MIN, Self::SAMPLE_STEP_MAX);
    }

    pub fn adjust_sample_step(&mut self, delta: isize) {
        let step = self.sample_step as isize + delta;
        self.set_sample_step(step.max(Self::SAMPLE_STEP_MIN as isize) as usize);
    }

    pub fn set_glyph_size(&mut self, size: u16) {
        self.glyph_size = size.clamp(Self::GLYPH_SIZE_MIN, Self::GLYPH_SIZE_MAX);
    }

    pub fn adjust_glyph_size(&mut self, delta: i16) {
        let size = self.glyph_size as i16 + delta;
        self.set_glyph_size(size.max(Self::GLYPH_SIZE_MIN as i16) as u16);
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_parses_wh_labels() {
        let r = AspectRatio::parse("16:9").unwrap();
        assert!((r.value() - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(r.label(), "16:9");
        assert!(!r.is_portrait());

        let r = AspectRatio::parse("4:5").unwrap();
        assert!(r.is_portrait());
    }

    #[test]
    fn ratio_rejects_garbage() {
        assert!(AspectRatio::parse("16x9").is_err());
        assert!(AspectRatio::parse("0:9").is_err());
        assert!(AspectRatio::parse("16:-9").is_err());
        assert!(AspectRatio::parse("wide").is_err());
    }

    #[test]
    fn ratio_cycle_walks_presets_and_recovers() {
        let mut r = AspectRatio::default();
        for _ in 0..AspectRatio::PRESETS.len() {
            r = r.cycle();
        }
        assert_eq!(r.label(), "16:9");

        let odd = AspectRatio::parse("21:9").unwrap();
        assert_eq!(odd.cycle().label(), AspectRatio::PRESETS[0]);
    }

    #[test]
    fn nominal_resolution_tracks_orientation() {
        let (w, h) = AspectRatio::parse("16:9").unwrap().nominal_resolution();
        assert_eq!((w, h), (640, 360));

        let (w, h) = AspectRatio::parse("4:5").unwrap().nominal_resolution();
        assert_eq!((w, h), (512, 640));
        assert_eq!(w % 2, 0);
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#000000").unwrap(), [0, 0, 0]);
        assert_eq!(parse_hex_color("#ff8001").unwrap(), [255, 128, 1]);
        assert_eq!(parse_hex_color("ffffff").unwrap(), [255, 255, 255]);
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn sample_step_and_glyph_size_clamp() {
        let mut config = RenderConfig::new();
        config.set_sample_step(0);
        assert_eq!(config.sample_step, RenderConfig::SAMPLE_STEP_MIN);
        config.set_sample_step(1000);
        assert_eq!(config.sample_step, RenderConfig::SAMPLE_STEP_MAX);

        config.adjust_glyph_size(-100);
        assert_eq!(config.glyph_size, RenderConfig::GLYPH_SIZE_MIN);
        config.adjust_glyph_size(100);
        assert_eq!(config.glyph_size, RenderConfig::GLYPH_SIZE_MAX);
    }

    #[test]
    fn empty_ramp_is_rejected_and_previous_kept() {
        let mut config = RenderConfig::new();
        assert!(config.set_ramp("").is_err());
        assert_eq!(config.ramp().len(), RenderConfig::DEFAULT_RAMP.chars().count());

        config.set_ramp("@").unwrap();
        assert_eq!(config.ramp(), &['@']);
    }

    #[test]
    fn facing_toggle_round_trips() {
        let facing = FacingMode::Environment;
        assert_eq!(facing.toggle().toggle(), facing);
    }
}
