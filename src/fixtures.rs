//! Synthetic rasters and boundaries shared by the unit tests.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use chrono::{Duration, NaiveDate};
use geo::{Coord, Rect};
use tiff::{
    encoder::{colortype::Gray32Float, TiffEncoder},
    tags::Tag,
};

use crate::{
    config::ReportConfig,
    raster::{frame::GeoTransform, RasterFrame},
};

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 68;

pub fn country_extent() -> Rect<f64> {
    Rect::new(Coord { x: 48.0, y: 32.0 }, Coord { x: 80.0, y: 49.0 })
}

pub fn transform_fixture() -> GeoTransform {
    GeoTransform {
        origin_x: 48.0,
        origin_y: 49.0,
        pixel_width: 0.25,
        pixel_height: 0.25,
    }
}

/// West-east gradient scaled by `level`, a block of zeros in the north-west
/// corner and a nodata strip along the southern edge.
pub fn frame_fixture(level: f32) -> RasterFrame {
    let mut values = Vec::with_capacity(WIDTH * HEIGHT);
    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            let value = if row < 4 && col < 4 {
                0.0
            } else if row == HEIGHT - 1 {
                -9999.0
            } else {
                level * (1.0 + col as f32 / WIDTH as f32) + row as f32 * 0.001
            };
            values.push(value);
        }
    }

    RasterFrame::new(WIDTH, HEIGHT, values, transform_fixture(), Some(-9999.0))
}

pub fn write_geotiff(path: &Path, frame: &RasterFrame) -> tiff::TiffResult<()> {
    let transform = frame.transform();
    let mut file = File::create(path)?;
    let mut tiff = TiffEncoder::new(&mut file)?;
    let mut image = tiff.new_image::<Gray32Float>(frame.width() as u32, frame.height() as u32)?;

    let scale = [transform.pixel_width, transform.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    image.encoder().write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
    image.encoder().write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    if let Some(nodata) = frame.nodata() {
        image.encoder().write_tag(Tag::GdalNodata, nodata.to_string().as_str())?;
    }

    image.write_data(frame.values())
}

pub const REGIONS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": {"parent_cod": 1, "region_nam": "North"},
            "geometry": {"type": "Polygon", "coordinates": [[[55, 41], [75, 41], [75, 47], [55, 47], [55, 41]]]}
        },
        {
            "type": "Feature",
            "properties": {"parent_cod": 2, "region_nam": "South"},
            "geometry": {"type": "Polygon", "coordinates": [[[55, 34], [75, 34], [75, 41], [55, 41], [55, 34]]]}
        }
    ]
}"#;

pub const DISTRICTS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"id": "n1"}, "geometry": {"type": "Polygon", "coordinates": [[[55, 41], [65, 41], [65, 47], [55, 47], [55, 41]]]}},
        {"type": "Feature", "properties": {"id": "n2"}, "geometry": {"type": "Polygon", "coordinates": [[[65, 41], [75, 41], [75, 47], [65, 47], [65, 41]]]}},
        {"type": "Feature", "properties": {"id": "s1"}, "geometry": {"type": "Polygon", "coordinates": [[[55, 34], [75, 34], [75, 41], [55, 41], [55, 34]]]}}
    ]
}"#;

pub struct Dataset {
    pub rasters_root: PathBuf,
    pub regions: PathBuf,
    pub districts: PathBuf,
}

impl Dataset {
    /// Writes one frame per gas and day for `days` days ending on `end`.
    pub fn build(root: &Path, gases: &[&str], end: NaiveDate, days: u32) -> Dataset {
        let rasters_root = root.join("rasters");
        for gas in gases {
            let dir = rasters_root.join(gas);
            fs::create_dir_all(&dir).unwrap();
            for offset in 0..days {
                let date = end - Duration::days(i64::from(offset));
                let level = 1.0 + (days - offset) as f32 * 0.05;
                let path = dir.join(format!("{gas}_{}.tif", date.format("%Y-%m-%d")));
                write_geotiff(&path, &frame_fixture(level)).unwrap();
            }
        }

        let regions = root.join("regions.geojson");
        fs::write(&regions, REGIONS).unwrap();
        let districts = root.join("districts.geojson");
        fs::write(&districts, DISTRICTS).unwrap();

        Dataset {
            rasters_root,
            regions,
            districts,
        }
    }

    /// Small images keep the rendering tests fast.
    pub fn config(&self) -> ReportConfig {
        let mut config = ReportConfig::default();
        config.data.rasters_root = self.rasters_root.clone();
        config.data.regions = self.regions.clone();
        config.data.districts = Some(self.districts.clone());
        config.map.width = 320;
        config.map.legend_height = 80;
        config.chart.width = 480;
        config.chart.height = 240;
        config
    }
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}
