//! Overview and zoomed maps of a raster frame.

use std::path::Path;

use chrono::NaiveDate;
use geo::{Coord, LineString, Rect};
use image::{ImageFormat, RgbImage};
use plotters::{
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};
use tracing::debug;

use crate::{
    artifact::{GeneratedImage, ImageKind},
    boundary::{BoundarySet, Region},
    config::{parse_hex_color, Language, MapStyle},
    error::{ReportError, Result},
    fonts,
    gas::GasProfile,
    report::locale::Locale,
};

use super::{
    colormap::{format_significant, ColorScale, Colormap},
    RasterFrame, RasterSource,
};

const BACKGROUND: RGBColor = WHITE;
const MAX_ASPECT: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapView {
    /// Whole boundary layer.
    Overview,
    /// One region with its outline highlighted.
    Zoomed,
}

/// Everything needed to draw one map.
pub struct MapPlot<'a> {
    pub frame: &'a RasterFrame,
    pub view: MapView,
    pub extent: Rect<f64>,
    pub scale: ColorScale,
    pub outlines: &'a [Region],
    pub highlight: Option<&'a Region>,
    pub profile: &'a GasProfile,
}

/// Draws a map into a PNG file and returns its pixel size.
pub trait MapRenderer {
    fn render(&self, plot: &MapPlot<'_>, path: &Path) -> Result<(u32, u32)>;

    fn style(&self) -> &MapStyle;
}

/// The region layer plus the optional district layer drawn as base outlines.
#[derive(Debug, Clone)]
pub struct MapLayers {
    pub regions: BoundarySet,
    pub districts: Option<BoundarySet>,
}

impl MapLayers {
    pub fn outlines(&self) -> &[Region] {
        self.districts
            .as_ref()
            .unwrap_or(&self.regions)
            .regions()
    }
}

/// Renders the overview and zoomed maps of `gas` on `date`.
pub fn render_maps(
    source: &dyn RasterSource,
    renderer: &dyn MapRenderer,
    layers: &MapLayers,
    profile: &GasProfile,
    date: NaiveDate,
    region: &str,
    out_dir: &Path,
) -> Result<(GeneratedImage, GeneratedImage)> {
    let region = layers.regions.resolve(region)?;
    let frame = source.frame(&profile.id, date)?;
    let style = renderer.style();
    let scale = ColorScale::from_frame(
        &frame,
        style.clip_low_percentile,
        style.clip_high_percentile,
    );
    debug!(gas = %profile.id, %date, low = scale.low, high = scale.high, "colour range");

    let render = |view: MapView, bounds: Option<Rect<f64>>, highlight: Option<&Region>| {
        let kind = match view {
            MapView::Overview => ImageKind::OverviewMap,
            MapView::Zoomed => ImageKind::ZoomedMap,
        };
        let plot = MapPlot {
            frame: &frame,
            view,
            extent: view_extent(&frame, bounds, style.zoom_pad),
            scale,
            outlines: layers.outlines(),
            highlight,
            profile,
        };
        let path = out_dir.join(kind.file_name(&profile.id, date));
        let (width, height) = renderer.render(&plot, &path)?;

        Ok::<_, ReportError>(GeneratedImage {
            path,
            kind,
            gas: profile.id.clone(),
            width,
            height,
        })
    };

    let overview = render(MapView::Overview, layers.regions.extent(), None)?;
    let zoomed = render(MapView::Zoomed, region.envelope(), Some(region))?;

    Ok((overview, zoomed))
}

/// Pads `bounds` on every side and clamps it to the raster. Degenerate
/// results fall back to the full raster extent.
pub fn view_extent(frame: &RasterFrame, bounds: Option<Rect<f64>>, pad: f64) -> Rect<f64> {
    let full = frame.extent();
    let Some(bounds) = bounds else {
        return full;
    };

    let (dx, dy) = (bounds.width() * pad, bounds.height() * pad);
    let min_x = (bounds.min().x - dx).max(full.min().x);
    let max_x = (bounds.max().x + dx).min(full.max().x);
    let min_y = (bounds.min().y - dy).max(full.min().y);
    let max_y = (bounds.max().y + dy).min(full.max().y);

    let (min_x, max_x) = if max_x > min_x {
        (min_x, max_x)
    } else {
        (full.min().x, full.max().x)
    };
    let (min_y, max_y) = if max_y > min_y {
        (min_y, max_y)
    } else {
        (full.min().y, full.max().y)
    };

    Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y })
}

/// Plotters implementation on an RGB bitmap, encoded with `image`.
pub struct PlottersMapRenderer {
    style: MapStyle,
    locale: Locale,
    colormap: Colormap,
    base_color: RGBColor,
    highlight_color: RGBColor,
    nodata_color: RGBColor,
}

impl PlottersMapRenderer {
    pub fn new(style: MapStyle, language: Language) -> Result<Self> {
        Ok(PlottersMapRenderer {
            base_color: parse_hex_color(&style.base_color)?,
            highlight_color: parse_hex_color(&style.highlight_color)?,
            nodata_color: parse_hex_color(&style.nodata_color)?,
            locale: Locale::new(language),
            colormap: Colormap::spectrum(),
            style,
        })
    }

    fn map_size(&self, frame: &RasterFrame, extent: &Rect<f64>) -> (u32, u32) {
        let t = frame.transform();
        let cols = extent.width() / t.pixel_width.abs();
        let rows = extent.height() / t.pixel_height.abs();
        let aspect = (rows / cols).clamp(1.0 / MAX_ASPECT, MAX_ASPECT);
        let width = self.style.width.max(16);

        (width, ((f64::from(width) * aspect).round() as u32).max(1))
    }

    fn paint_raster(&self, plot: &MapPlot<'_>, buf: &mut [u8], width: u32, height: u32) {
        let frame = plot.frame;
        let extent = plot.extent;
        let t = frame.transform();

        for py in 0..height {
            let y = extent.max().y - (f64::from(py) + 0.5) / f64::from(height) * extent.height();
            for px in 0..width {
                let x = extent.min().x + (f64::from(px) + 0.5) / f64::from(width) * extent.width();
                let (col, row) = t.world_to_pixel(x, y);
                let color = self.sample(plot, col, row).unwrap_or(BACKGROUND);

                let offset = ((py * width + px) * 3) as usize;
                buf[offset] = color.0;
                buf[offset + 1] = color.1;
                buf[offset + 2] = color.2;
            }
        }
    }

    /// Zero cells take the NoData colour, non-data cells stay background and
    /// valid cells are interpolated bilinearly from their valid neighbours.
    fn sample(&self, plot: &MapPlot<'_>, col: f64, row: f64) -> Option<RGBColor> {
        let frame = plot.frame;
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (c, r) = (col.floor() as usize, row.floor() as usize);
        if c >= frame.width() || r >= frame.height() {
            return None;
        }

        let value = frame.value(c, r);
        if !frame.is_data(value) {
            return None;
        }
        if value == 0.0 {
            return Some(self.nodata_color);
        }

        let value = bilinear(frame, col - 0.5, row - 0.5).unwrap_or(f64::from(value));
        Some(self.colormap.color(plot.scale.normalize(value)))
    }

    fn draw_outlines<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        plot: &MapPlot<'_>,
        size: (u32, u32),
    ) -> Result<()> {
        let base_width = match plot.view {
            MapView::Overview => self.style.base_width_overview,
            MapView::Zoomed => self.style.base_width_zoomed,
        };
        let base = ShapeStyle::from(&self.base_color).stroke_width(base_width);
        for region in plot.outlines {
            draw_region(area, region, &plot.extent, size, base)?;
        }

        if let Some(region) = plot.highlight {
            let width = self.style.highlight_width;
            let halo = ShapeStyle::from(&self.highlight_color.mix(0.5))
                .stroke_width(width + width.div_ceil(2));
            draw_region(area, region, &plot.extent, size, halo)?;
            let line = ShapeStyle::from(&self.highlight_color).stroke_width(width);
            draw_region(area, region, &plot.extent, size, line)?;
        }

        Ok(())
    }

    fn draw_legend<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        plot: &MapPlot<'_>,
    ) -> Result<()> {
        let (w, h) = area.dim_in_pixel();
        let (w, h) = (w as i32, h as i32);
        area.fill(&BACKGROUND).map_err(ReportError::render)?;

        let bar_left = w / 20;
        let bar_right = bar_left + w * 2 / 5;
        let bar_top = h * 2 / 5;
        let bar_bottom = bar_top + (h / 5).max(4);
        let font_size = f64::from((h / 6).max(8));

        let title = self.locale.legend_title(&plot.profile.id, &plot.profile.map_unit);
        let title_style = TextStyle::from((fonts::FAMILY, font_size).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        area.draw(&Text::new(
            title,
            ((bar_left + bar_right) / 2, bar_top - 4),
            title_style,
        ))
        .map_err(ReportError::render)?;

        let span = (bar_right - bar_left).max(1);
        for x in bar_left..bar_right {
            let t = f64::from(x - bar_left) / f64::from(span - 1).max(1.0);
            let color = self.colormap.color(t);
            area.draw(&Rectangle::new([(x, bar_top), (x + 1, bar_bottom)], color.filled()))
                .map_err(ReportError::render)?;
        }

        let label_style = TextStyle::from((fonts::FAMILY, font_size * 0.9).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Top));
        let ticks = plot.scale.ticks(self.style.legend_ticks);
        let last = ticks.len().saturating_sub(1).max(1) as f64;
        for (i, tick) in ticks.iter().enumerate() {
            let x = bar_left + (f64::from(span) * i as f64 / last).round() as i32;
            let label = format_significant(tick * plot.profile.legend_scale);
            area.draw(&Text::new(label, (x, bar_bottom + 3), label_style.clone()))
                .map_err(ReportError::render)?;
        }

        let swatch_left = bar_right + w / 60 + 2;
        let swatch_right = swatch_left + (bar_bottom - bar_top);
        area.draw(&Rectangle::new(
            [(swatch_left, bar_top), (swatch_right, bar_bottom)],
            self.nodata_color.filled(),
        ))
        .map_err(ReportError::render)?;

        let nodata_style = TextStyle::from((fonts::FAMILY, font_size * 0.9).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Left, VPos::Center));
        area.draw(&Text::new(
            self.locale.nodata_label().to_string(),
            (swatch_right + 4, (bar_top + bar_bottom) / 2),
            nodata_style,
        ))
        .map_err(ReportError::render)?;

        Ok(())
    }
}

impl MapRenderer for PlottersMapRenderer {
    fn render(&self, plot: &MapPlot<'_>, path: &Path) -> Result<(u32, u32)> {
        fonts::ensure_registered()?;

        let (width, map_height) = self.map_size(plot.frame, &plot.extent);
        let height = map_height + self.style.legend_height;
        let mut buf = vec![255u8; (width * height * 3) as usize];
        self.paint_raster(plot, &mut buf[..(width * map_height * 3) as usize], width, map_height);

        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            let (map, legend) = root.split_vertically(map_height);
            self.draw_outlines(&map, plot, (width, map_height))?;
            // Outlines may spill below the map; the legend repaints its strip.
            self.draw_legend(&legend, plot)?;
            root.present().map_err(ReportError::render)?;
        }

        let image = RgbImage::from_raw(width, height, buf)
            .ok_or_else(|| ReportError::Render("map buffer size mismatch".to_string()))?;
        image.save_with_format(path, ImageFormat::Png)?;
        debug!(path = %path.display(), width, height, "map written");

        Ok((width, height))
    }

    fn style(&self) -> &MapStyle {
        &self.style
    }
}

fn draw_region<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    region: &Region,
    extent: &Rect<f64>,
    (width, height): (u32, u32),
    style: ShapeStyle,
) -> Result<()> {
    let project = |c: &Coord<f64>| {
        let x = (c.x - extent.min().x) / extent.width() * f64::from(width);
        let y = (extent.max().y - c.y) / extent.height() * f64::from(height);
        (x.round() as i32, y.round() as i32)
    };
    let ring = |line: &LineString<f64>| line.coords().map(project).collect::<Vec<_>>();

    for polygon in &region.geometry {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for line in rings {
            area.draw(&PathElement::new(ring(line), style))
                .map_err(ReportError::render)?;
        }
    }

    Ok(())
}

/// Bilinear interpolation over cell centres, skipping zero and non-data
/// neighbours. `None` when no neighbour qualifies.
fn bilinear(frame: &RasterFrame, x: f64, y: f64) -> Option<f64> {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);

    let mut sum = 0.0;
    let mut weight = 0.0;
    for (dx, dy, w) in [
        (0.0, 0.0, (1.0 - fx) * (1.0 - fy)),
        (1.0, 0.0, fx * (1.0 - fy)),
        (0.0, 1.0, (1.0 - fx) * fy),
        (1.0, 1.0, fx * fy),
    ] {
        let (cx, cy) = (x0 + dx, y0 + dy);
        if cx < 0.0 || cy < 0.0 || w <= 0.0 {
            continue;
        }
        let (cx, cy) = (cx as usize, cy as usize);
        if cx >= frame.width() || cy >= frame.height() {
            continue;
        }
        let value = frame.value(cx, cy);
        if frame.is_data(value) && value != 0.0 {
            sum += f64::from(value) * w;
            weight += w;
        }
    }

    (weight > 0.0).then(|| sum / weight)
}

// -- Tests -------------------------------------------------------------------
