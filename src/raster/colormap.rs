//! Colour scaling for raster maps.

use plotters::style::RGBColor;

use super::RasterFrame;

/// Deep blue through cyan and yellow to red.
const SPECTRUM: [RGBColor; 8] = [
    RGBColor(0x0b, 0x1a, 0x8f),
    RGBColor(0x00, 0x33, 0xff),
    RGBColor(0x00, 0x80, 0xff),
    RGBColor(0x00, 0xff, 0xff),
    RGBColor(0x66, 0xff, 0x00),
    RGBColor(0xff, 0xff, 0x00),
    RGBColor(0xff, 0x99, 0x00),
    RGBColor(0xff, 0x00, 0x00),
];

const LEVELS: usize = 256;

/// Evenly spaced stops sampled into a lookup table.
#[derive(Debug, Clone)]
pub struct Colormap {
    lut: Vec<RGBColor>,
}

impl Colormap {
    pub fn spectrum() -> Self {
        Self::from_stops(&SPECTRUM, LEVELS)
    }

    pub fn from_stops(stops: &[RGBColor], levels: usize) -> Self {
        let segments = (stops.len() - 1) as f64;
        let lut = (0..levels)
            .map(|i| {
                let t = i as f64 / (levels - 1) as f64 * segments;
                let k = (t.floor() as usize).min(stops.len() - 2);
                lerp(stops[k], stops[k + 1], t - k as f64)
            })
            .collect();

        Colormap { lut }
    }

    /// Colour of a normalised value; out-of-range input is clamped.
    pub fn color(&self, t: f64) -> RGBColor {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let index = ((t * self.lut.len() as f64) as usize).min(self.lut.len() - 1);
        self.lut[index]
    }
}

fn lerp(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Linear value range mapped onto the colormap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub low: f64,
    pub high: f64,
}

impl ColorScale {
    /// Range between two percentiles of the frame's valid, non-zero cells.
    pub fn from_frame(frame: &RasterFrame, low_pct: f64, high_pct: f64) -> Self {
        let mut values: Vec<f64> = frame
            .values()
            .iter()
            .copied()
            .filter(|v| frame.is_data(*v) && *v != 0.0)
            .map(f64::from)
            .collect();

        if values.is_empty() {
            return ColorScale { low: 0.0, high: 1.0 };
        }
        values.sort_by(f64::total_cmp);

        let low = percentile(&values, low_pct);
        let mut high = percentile(&values, high_pct);
        if high <= low {
            high = low + 1e-12;
        }

        ColorScale { low, high }
    }

    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.low) / (self.high - self.low)).clamp(0.0, 1.0)
    }

    /// Evenly spaced tick values from `low` to `high`.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        match count {
            0 => vec![],
            1 => vec![self.low],
            n => (0..n)
                .map(|i| self.low + (self.high - self.low) * i as f64 / (n - 1) as f64)
                .collect(),
        }
    }
}

/// Percentile of sorted values with linear interpolation between ranks.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Formats like `%.6g`: six significant digits, trailing zeros trimmed.
pub fn format_significant(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return if value.is_finite() { "0".to_string() } else { value.to_string() };
    }

    let exponent = value.abs().log10().floor() as i32;
    if !(-4..6).contains(&exponent) {
        let formatted = format!("{:.5e}", value);
        let (mantissa, exp) = formatted.split_once('e').unwrap_or((&formatted, "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs());
    }

    let decimals = (5 - exponent).max(0) as usize;
    trim_zeros(&format!("{:.*}", decimals, value)).to_string()
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

// -- Tests -------------------------------------------------------------------
