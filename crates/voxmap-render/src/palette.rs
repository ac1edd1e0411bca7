//! Height → color lookup built from HSL ramps.
//!
//! Heights below sea level ramp from light red to near black, heights above
//! it from near black to light green. Sea level itself is a flat gray so the
//! waterline stands out.

/// Packed `0xRRGGBB` color.
pub type Rgb = u32;

/// Color of heights outside the configured range. Should never be visible.
pub const DEFAULT_COLOR: Rgb = 0x8f_00_8f;

/// Height painted gray.
pub const SEA_LEVEL: usize = 62;

const SEA_LEVEL_COLOR: Rgb = 0x30_30_30;

/// Splits a packed color into bytes.
pub fn rgb_bytes(color: Rgb) -> [u8; 3] {
    [(color >> 16) as u8, (color >> 8) as u8, color as u8]
}

fn hue_to_rgb(m1: f64, m2: f64, mut h: f64) -> f64 {
    while h < 1.0 {
        h += 1.0;
    }
    while h > 1.0 {
        h -= 1.0;
    }
    if h * 6.0 < 1.0 {
        return m1 + (m2 - m1) * h * 6.0;
    }
    if h * 2.0 < 1.0 {
        return m2;
    }
    if h * 3.0 < 2.0 {
        return m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0;
    }
    m1
}

/// Converts hue, saturation and lightness in `[0, 1]` to a packed color.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
    let m1 = l * 2.0 - m2;
    let channel = |h: f64| ((hue_to_rgb(m1, m2, h) * 255.0) as i32).clamp(0, 255) as u32;
    let r = channel(h + 1.0 / 3.0);
    let g = channel(h);
    let b = channel(h - 1.0 / 3.0);
    (r << 16) | (g << 8) | b
}

/// Fills `table[start..=stop]` with a linear ramp in HSL space.
fn hsl_ramp(table: &mut [Rgb; 256], start: usize, stop: usize, h: (f64, f64), s: (f64, f64), l: (f64, f64)) {
    if stop < start {
        return;
    }
    let steps = (stop - start + 1) as f64;
    let (dh, ds, dl) = ((h.1 - h.0) / steps, (s.1 - s.0) / steps, (l.1 - l.0) / steps);
    let (mut hh, mut ss, mut ll) = (h.0, s.0, l.0);
    for slot in &mut table[start..=stop] {
        *slot = hsl_to_rgb(hh, ss, ll);
        hh += dh;
        ss += ds;
        ll += dl;
    }
}

/// Static height palette for one maximum height.
#[derive(Clone, Debug)]
pub struct HeightPalette {
    colors: [Rgb; 256],
    max_height: u16,
}

impl HeightPalette {
    pub fn new(max_height: u16) -> Self {
        let max = usize::from(max_height.min(255));
        let mut colors = [DEFAULT_COLOR; 256];
        hsl_ramp(&mut colors, 0, SEA_LEVEL - 1, (0.0, 0.0), (0.9, 0.9), (0.8, 0.1));
        hsl_ramp(&mut colors, SEA_LEVEL + 1, max, (0.4, 0.4), (0.9, 0.9), (0.1, 0.8));
        colors[SEA_LEVEL] = SEA_LEVEL_COLOR;
        Self { colors, max_height }
    }

    pub fn color(&self, height: u8) -> Rgb {
        self.colors[usize::from(height)]
    }

    pub fn max_height(&self) -> u16 {
        self.max_height
    }
}
