//! Region boundaries loaded from GeoJSON.
//!
//! Boundaries must share the raster CRS (lon/lat for the CAMS frames); no
//! reprojection is performed.

use std::{fs, path::Path};

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ReportError, Result};

#[derive(Debug, Clone)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl Region {
    pub fn envelope(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }
}

/// All features of one boundary layer.
#[derive(Debug, Clone)]
pub struct BoundarySet {
    regions: Vec<Region>,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

impl BoundarySet {
    pub fn load(path: &Path, id_field: &str, name_field: &str) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        Self::from_geojson(&text, id_field, name_field).map_err(|reason| {
            ReportError::InvalidBoundary {
                path: path.to_path_buf(),
                reason,
            }
        })
    }

    pub fn from_geojson(
        text: &str,
        id_field: &str,
        name_field: &str,
    ) -> std::result::Result<Self, String> {
        let collection: FeatureCollection =
            serde_json::from_str(text).map_err(|e| e.to_string())?;

        let mut regions = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.into_iter().enumerate() {
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let geometry = to_multi_polygon(&geometry)
                .map_err(|reason| format!("feature {index}: {reason}"))?;

            let properties = feature.properties.unwrap_or_default();
            let id = property_string(&properties, id_field).unwrap_or_else(|| index.to_string());
            let name = property_string(&properties, name_field)
                .or_else(|| property_string(&properties, "region_name"))
                .unwrap_or_else(|| id.clone());

            regions.push(Region { id, name, geometry });
        }

        if regions.is_empty() {
            return Err("no polygon features".to_string());
        }

        Ok(BoundarySet { regions })
    }

    /// Resolves a region by id, then by case-insensitive name.
    pub fn find(&self, region: &str) -> Option<&Region> {
        let wanted = region.trim();
        self.regions
            .iter()
            .find(|r| r.id == wanted)
            .or_else(|| {
                self.regions
                    .iter()
                    .find(|r| r.name.eq_ignore_ascii_case(wanted))
            })
    }

    pub fn resolve(&self, region: &str) -> Result<&Region> {
        self.find(region).ok_or_else(|| ReportError::UnknownRegion {
            region: region.to_string(),
        })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Envelope of every feature in the layer.
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.regions
            .iter()
            .filter_map(Region::envelope)
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }
}

fn property_string(properties: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    match properties.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        }),
        _ => None,
    }
}

fn to_multi_polygon(geometry: &Geometry) -> std::result::Result<MultiPolygon<f64>, String> {
    match geometry.kind.as_str() {
        "Polygon" => Ok(MultiPolygon::new(vec![parse_polygon(&geometry.coordinates)?])),
        "MultiPolygon" => {
            let parts = geometry
                .coordinates
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array")?;
            let polygons = parts
                .iter()
                .map(parse_polygon)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(MultiPolygon::new(polygons))
        }
        other => Err(format!("unsupported geometry type `{other}`")),
    }
}

fn parse_polygon(value: &Value) -> std::result::Result<Polygon<f64>, String> {
    let rings = value.as_array().ok_or("polygon must be an array of rings")?;
    let mut rings = rings.iter().map(parse_ring);

    let exterior = rings.next().ok_or("polygon without exterior ring")??;
    let interiors = rings.collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(value: &Value) -> std::result::Result<LineString<f64>, String> {
    let points = value.as_array().ok_or("ring must be an array of positions")?;
    let coords = points
        .iter()
        .map(|p| {
            let pos = p.as_array().filter(|pos| pos.len() >= 2);
            match pos.map(|pos| (pos[0].as_f64(), pos[1].as_f64())) {
                Some((Some(x), Some(y))) => Ok(Coord { x, y }),
                _ => Err(format!("invalid position {p}")),
            }
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if coords.len() < 3 {
        return Err("ring needs at least three positions".to_string());
    }

    Ok(LineString::new(coords))
}

// -- Tests -------------------------------------------------------------------
