//! Gas profiles: display names, units and value scaling.

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use crate::error::{ReportError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct GasProfile {
    pub id: String,
    pub display_name: String,
    /// Unit of the scaled daily means on the chart.
    pub chart_unit: String,
    /// Factor applied to raw cell means before charting.
    pub chart_scale: f64,
    /// Unit of the raw raster values shown in the map legend.
    pub map_unit: String,
    /// Factor applied to legend tick labels.
    pub legend_scale: f64,
    /// Paragraph appended to the gas section; `{unit}` is substituted.
    pub description: Option<String>,
}

impl GasProfile {
    /// Built-in profile for the CAMS gases; anything else gets a neutral one.
    pub fn builtin(id: &str) -> Self {
        let id = normalize_gas(id);
        let (chart_unit, chart_scale, map_unit, legend_scale) = match id.as_str() {
            "CH4" => ("ppm", 1e-3, "ppm", 1e-3),
            "NO2" | "SO2" | "HCHO" => ("mol/km²", 1e6, "mol/m²", 1.0),
            "CO" | "O3" => ("mol/m²", 1.0, "mol/m²", 1.0),
            "AERAI" => ("unitless", 1.0, "", 1.0),
            _ => ("unit", 1.0, "unit", 1.0),
        };

        GasProfile {
            display_name: id.clone(),
            id,
            chart_unit: chart_unit.to_string(),
            chart_scale,
            map_unit: map_unit.to_string(),
            legend_scale,
            description: None,
        }
    }

    /// Scales a raw regional mean for charting, rounded to three decimals.
    pub fn scale_mean(&self, raw: f64) -> f64 {
        ((raw * self.chart_scale) * 1000.0).round() / 1000.0
    }

    pub fn description_text(&self) -> Option<String> {
        self.description
            .as_ref()
            .map(|text| text.replace("{unit}", &self.chart_unit))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogEntry {
    #[serde(alias = "display_uz")]
    display: Option<String>,
    unit: Option<String>,
    #[serde(alias = "text_uz")]
    text: Option<String>,
}

/// Gas profiles keyed by normalised identifier.
#[derive(Debug, Clone, Default)]
pub struct GasCatalog {
    overrides: HashMap<String, CatalogEntry>,
}

impl GasCatalog {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(GasCatalog::default());
        };
        let text = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: HashMap<String, CatalogEntry> = serde_json::from_str(text)?;
        let overrides = raw
            .into_iter()
            .map(|(gas, entry)| (normalize_gas(&gas), entry))
            .collect();

        Ok(GasCatalog { overrides })
    }

    pub fn profile(&self, gas: &str) -> GasProfile {
        let mut profile = GasProfile::builtin(gas);

        if let Some(entry) = self.overrides.get(&profile.id) {
            if let Some(display) = entry.display.as_ref().filter(|d| !d.trim().is_empty()) {
                profile.display_name = display.clone();
            }
            if let Some(unit) = &entry.unit {
                profile.chart_unit = unit.clone();
            }
            profile.description = entry.text.clone().filter(|t| !t.trim().is_empty());
        }

        profile
    }
}

/// Gas identifiers are compared trimmed and upper-cased.
pub fn normalize_gas(gas: &str) -> String {
    gas.trim().to_uppercase()
}

/// Gas identifiers name directories and files, so only ASCII letters,
/// digits, `_` and `-` are accepted.
pub fn check_gas_id(gas: &str) -> Result<()> {
    let valid = !gas.is_empty()
        && gas
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(ReportError::InvalidRequest(format!("invalid gas identifier `{gas}`")))
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_scale_ch4_to_ppm() {
        let profile = GasProfile::builtin("ch4");

        assert_eq!(profile.id, "CH4");
        assert_eq!(profile.scale_mean(1893.4567), 1.893);
        assert_eq!(profile.legend_scale, 1e-3);
    }

    #[test]
    fn should_scale_column_densities() {
        let no2 = GasProfile::builtin("NO2");
        assert_eq!(no2.scale_mean(0.000_123_456_7), 123.457);
        assert_eq!(no2.chart_unit, "mol/km²");

        let o3 = GasProfile::builtin("O3");
        assert_eq!(o3.scale_mean(0.123_456), 0.123);
    }

    #[test]
    fn should_fall_back_for_unknown_gas() {
        let profile = GasProfile::builtin(" co2 ");

        assert_eq!(profile.id, "CO2");
        assert_eq!(profile.display_name, "CO2");
        assert_eq!(profile.chart_scale, 1.0);
    }

    #[test]
    fn should_reject_gas_ids_that_leave_the_store() {
        assert!(check_gas_id("CO2").is_ok());
        assert!(check_gas_id("PM2_5").is_ok());

        for gas in ["../X", "/ETC", "A/B", "A\\B", "..", ""] {
            assert_eq!(check_gas_id(gas).unwrap_err().kind(), "InvalidRequest", "{gas}");
        }
    }

    #[test]
    fn should_override_from_catalog() {
        let catalog = GasCatalog::from_json(
            r#"{
                "no2": {"display_uz": "Azot dioksidi (NO2)", "unit": "µmol/m²", "text_uz": "O'rtacha qiymat {unit}."},
                "CO": {"display": ""}
            }"#,
        )
        .unwrap();

        let no2 = catalog.profile("NO2");
        assert_eq!(no2.display_name, "Azot dioksidi (NO2)");
        assert_eq!(no2.chart_unit, "µmol/m²");
        assert_eq!(no2.description_text().as_deref(), Some("O'rtacha qiymat µmol/m²."));

        let co = catalog.profile("co");
        assert_eq!(co.display_name, "CO");
        assert!(co.description.is_none());
    }
}
