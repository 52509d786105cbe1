//! Single-band GeoTIFF frames.

use std::{fs::File, io::BufReader, path::Path};

use geo::{BoundingRect, Contains, Coord, MultiPolygon, Rect};
use tiff::{
    decoder::{Decoder, DecodingResult, Limits},
    tags::Tag,
};

use crate::error::{ReportError, Result};

/// Values at or above this are fill values in the CAMS exports.
const FILL_THRESHOLD: f32 = 1e20;

/// Axis-aligned pixel to world mapping. Rows grow southwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y - row * self.pixel_height,
        )
    }

    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (self.origin_y - y) / self.pixel_height,
        )
    }
}

#[derive(Debug, Clone)]
pub struct RasterFrame {
    width: usize,
    height: usize,
    values: Vec<f32>,
    transform: GeoTransform,
    nodata: Option<f32>,
}

impl RasterFrame {
    pub fn new(
        width: usize,
        height: usize,
        values: Vec<f32>,
        transform: GeoTransform,
        nodata: Option<f32>,
    ) -> Self {
        assert_eq!(values.len(), width * height, "raster size mismatch");
        RasterFrame {
            width,
            height,
            values,
            transform,
            nodata,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ReportError::io(path, e))?;
        let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());
        let invalid = |reason: String| ReportError::InvalidRaster {
            path: path.to_path_buf(),
            reason,
        };

        let (width, height) = decoder.dimensions()?;
        let transform = read_transform(&mut decoder).map_err(invalid)?;
        let nodata = decoder
            .get_tag_ascii_string(Tag::GdalNodata)
            .ok()
            .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok());

        let values: Vec<f32> = match decoder.read_image()? {
            DecodingResult::F32(v) => v,
            DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
            DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
            DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
            DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
            DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
            DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
            _ => return Err(invalid("unsupported sample format".to_string())),
        };

        let (width, height) = (width as usize, height as usize);
        if values.len() != width * height {
            return Err(invalid(format!(
                "expected a single band of {}x{} samples, got {}",
                width,
                height,
                values.len()
            )));
        }

        Ok(RasterFrame::new(width, height, values, transform, nodata))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    #[cfg(test)]
    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn value(&self, col: usize, row: usize) -> f32 {
        self.values[row * self.width + col]
    }

    /// Finite, not the nodata marker and below the fill threshold.
    pub fn is_data(&self, value: f32) -> bool {
        value.is_finite() && value < FILL_THRESHOLD && self.nodata != Some(value)
    }

    pub fn extent(&self) -> Rect<f64> {
        let (x0, y0) = self.transform.pixel_to_world(0.0, 0.0);
        let (x1, y1) = self
            .transform
            .pixel_to_world(self.width as f64, self.height as f64);
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    /// Mean of the cells whose centres fall inside `area`, `None` when no
    /// data cell does.
    pub fn regional_mean(&self, area: &MultiPolygon<f64>) -> Option<f64> {
        let bounds = area.bounding_rect()?;
        let (c0, r0) = self.transform.world_to_pixel(bounds.min().x, bounds.max().y);
        let (c1, r1) = self.transform.world_to_pixel(bounds.max().x, bounds.min().y);

        let cols = clamp_span(c0.min(c1), c0.max(c1), self.width);
        let rows = clamp_span(r0.min(r1), r0.max(r1), self.height);

        let mut sum = 0.0f64;
        let mut count = 0usize;
        for row in rows {
            for col in cols.clone() {
                let value = self.value(col, row);
                if !self.is_data(value) {
                    continue;
                }
                let (x, y) = self
                    .transform
                    .pixel_to_world(col as f64 + 0.5, row as f64 + 0.5);
                if area.contains(&Coord { x, y }) {
                    sum += f64::from(value);
                    count += 1;
                }
            }
        }

        (count > 0).then(|| sum / count as f64)
    }
}

fn clamp_span(start: f64, end: f64, len: usize) -> std::ops::Range<usize> {
    let start = start.floor().max(0.0) as usize;
    let end = (end.ceil().max(0.0) as usize).min(len);
    start.min(end)..end
}

fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> std::result::Result<GeoTransform, String> {
    if let Ok(scale) = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag) {
        let tie = decoder
            .get_tag_f64_vec(Tag::ModelTiepointTag)
            .map_err(|e| format!("pixel scale without tiepoint: {e}"))?;
        if scale.len() < 2 || tie.len() < 6 {
            return Err("malformed pixel scale or tiepoint".to_string());
        }

        return Ok(GeoTransform {
            origin_x: tie[3] - tie[0] * scale[0],
            origin_y: tie[4] + tie[1] * scale[1],
            pixel_width: scale[0],
            pixel_height: scale[1],
        });
    }

    if let Ok(m) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if m.len() < 16 {
            return Err("malformed model transformation".to_string());
        }
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err("rotated rasters are not supported".to_string());
        }

        return Ok(GeoTransform {
            origin_x: m[3],
            origin_y: m[7],
            pixel_width: m[0],
            pixel_height: -m[5],
        });
    }

    Err("missing GeoTIFF georeferencing tags".to_string())
}

// -- Tests -------------------------------------------------------------------
