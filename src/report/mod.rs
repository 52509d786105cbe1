//! Report assembly: one section per gas with two maps and a chart.

pub mod docx;
pub mod locale;

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::{
    artifact::{GeneratedImage, ImageKind},
    boundary::BoundarySet,
    cli::create_progress_bar,
    config::{DocumentStyle, ReportConfig},
    error::{ReportError, Result},
    gas::{check_gas_id, normalize_gas, GasCatalog},
    raster::{render::MapLayers, render_maps, GeoTiffStore, MapRenderer, PlottersMapRenderer, RasterSource},
    series::{
        render_timeseries, window_start, ChartRenderer, ParquetSeriesSource,
        PlottersChartRenderer, RasterSeriesSource, SeriesSource,
    },
};

use locale::Locale;

/// What to report on.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub gases: Vec<String>,
    pub date: NaiveDate,
    pub region: String,
    pub period_days: u32,
}

impl ReportRequest {
    /// Normalises gas identifiers and drops repeats, keeping the first.
    pub fn new<I, S>(gases: I, date: NaiveDate, region: &str, period_days: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for gas in gases {
            let gas = normalize_gas(gas.as_ref());
            if !gas.is_empty() && !unique.contains(&gas) {
                unique.push(gas);
            }
        }

        ReportRequest {
            gases: unique,
            date,
            region: region.trim().to_string(),
            period_days,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gases.is_empty() {
            return Err(ReportError::InvalidRequest("no gas requested".to_string()));
        }
        if self.period_days == 0 {
            return Err(ReportError::InvalidRequest(
                "period must be at least one day".to_string(),
            ));
        }
        if window_start(self.date, self.period_days).is_none() {
            return Err(ReportError::InvalidRequest(format!(
                "a {}-day period ending on {} is outside the supported dates",
                self.period_days, self.date
            )));
        }
        if self.region.is_empty() {
            return Err(ReportError::InvalidRequest("no region requested".to_string()));
        }
        self.gases.iter().try_for_each(|gas| check_gas_id(gas))
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub style: DocumentStyle,
    pub sections: Vec<Section>,
}

impl Report {
    /// Figures in document order.
    pub fn figures(&self) -> impl Iterator<Item = &Figure> {
        self.sections
            .iter()
            .flat_map(|s| s.blocks.iter())
            .filter_map(|b| match b {
                Block::Figure(figure) => Some(figure),
                _ => None,
            })
    }
}

#[derive(Debug, Clone)]
pub struct Section {
    pub gas: String,
    pub heading: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone)]
pub enum Block {
    Caption(String),
    Figure(Figure),
    /// Free text; blank lines separate paragraphs.
    Text(String),
    PageBreak,
}

#[derive(Debug, Clone)]
pub struct Figure {
    pub kind: ImageKind,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Figure {
    fn load(image: &GeneratedImage) -> Result<Self> {
        Ok(Figure {
            kind: image.kind,
            png: fs::read(&image.path).map_err(|e| ReportError::io(&image.path, e))?,
            width: image.width,
            height: image.height,
        })
    }
}

/// Data sources, renderers and layout shared by every section of a run.
pub struct ReportContext {
    pub rasters: Box<dyn RasterSource>,
    pub series: Box<dyn SeriesSource>,
    pub maps: Box<dyn MapRenderer>,
    pub charts: Box<dyn ChartRenderer>,
    pub layers: MapLayers,
    pub catalog: GasCatalog,
    pub locale: Locale,
    pub style: DocumentStyle,
}

impl ReportContext {
    pub fn from_config(config: &ReportConfig) -> Result<Self> {
        let data = &config.data;
        let regions = BoundarySet::load(&data.regions, &data.region_id_field, &data.region_name_field)?;
        let districts = data
            .districts
            .as_deref()
            .map(|path| BoundarySet::load(path, "id", "name"))
            .transpose()?;

        let store = GeoTiffStore::new(&data.rasters_root);
        let series: Box<dyn SeriesSource> = match &data.series {
            Some(path) => Box::new(ParquetSeriesSource::open(path)?),
            None => Box::new(RasterSeriesSource::new(store.clone())),
        };
        let language = config.document.language;

        Ok(ReportContext {
            rasters: Box::new(store),
            series,
            maps: Box::new(PlottersMapRenderer::new(config.map.clone(), language)?),
            charts: Box::new(PlottersChartRenderer::new(config.chart.clone(), language)?),
            layers: MapLayers { regions, districts },
            catalog: GasCatalog::load(data.gas_catalog.as_deref())?,
            locale: Locale::new(language),
            style: config.document.clone(),
        })
    }
}

/// Renders every gas into `work_dir` and builds the document model.
///
/// The request is validated and the region resolved before anything is
/// rendered. The first failing gas aborts the whole report.
pub fn assemble_report(
    request: &ReportRequest,
    ctx: &ReportContext,
    work_dir: &Path,
    progress: &ProgressBar,
) -> Result<(Report, Vec<GeneratedImage>)> {
    request.validate()?;
    let region = ctx.layers.regions.resolve(&request.region)?;

    let mut sections = Vec::with_capacity(request.gases.len());
    let mut images = Vec::new();

    for (index, gas) in request.gases.iter().enumerate() {
        progress.set_message(format!("{gas}: maps"));
        let profile = ctx.catalog.profile(gas);
        let (overview, zoomed) = render_maps(
            ctx.rasters.as_ref(),
            ctx.maps.as_ref(),
            &ctx.layers,
            &profile,
            request.date,
            &region.id,
            work_dir,
        )?;

        progress.set_message(format!("{gas}: chart"));
        let chart = render_timeseries(
            ctx.series.as_ref(),
            ctx.charts.as_ref(),
            &profile,
            region,
            request.date,
            request.period_days,
            work_dir,
        )?;

        let mut blocks = vec![
            Block::Caption(ctx.locale.overview_caption().to_string()),
            Block::Figure(Figure::load(&overview)?),
            Block::Caption(ctx.locale.zoomed_caption(&region.name)),
            Block::Figure(Figure::load(&zoomed)?),
            Block::PageBreak,
            Block::Caption(ctx.locale.chart_caption(request.period_days, &profile.display_name)),
            Block::Figure(Figure::load(&chart)?),
        ];
        if let Some(text) = profile.description_text() {
            blocks.push(Block::Text(text));
        }
        if index + 1 < request.gases.len() {
            blocks.push(Block::PageBreak);
        }

        sections.push(Section {
            gas: gas.clone(),
            heading: ctx.locale.heading(index + 1, &region.name, request.date, &profile.display_name),
            blocks,
        });
        images.extend([overview, zoomed, chart]);
        debug!(%gas, "section assembled");
        progress.inc(1);
    }

    Ok((
        Report {
            style: ctx.style.clone(),
            sections,
        },
        images,
    ))
}

/// Builds the report and writes it to `output`.
///
/// The document is written to a staging file beside `output` and renamed
/// into place, so a failed run leaves no document behind.
pub fn generate_report(
    request: &ReportRequest,
    config: &ReportConfig,
    output: &Path,
) -> Result<PathBuf> {
    request.validate()?;
    let ctx = ReportContext::from_config(config)?;
    // resolve before creating any file
    ctx.layers.regions.resolve(&request.region)?;

    let work_dir = tempfile::Builder::new()
        .prefix("airrep_")
        .tempdir()
        .map_err(|e| ReportError::io(std::env::temp_dir(), e))?;
    info!(
        gases = ?request.gases,
        region = %request.region,
        date = %request.date,
        period_days = request.period_days,
        "generating report"
    );

    let bar = create_progress_bar(request.gases.len() as u64, "Rendering".to_string());
    let (report, images) = assemble_report(request, &ctx, work_dir.path(), &bar)?;
    bar.finish_with_message("Rendered");

    if let Some(dir) = &config.keep_images {
        keep_images(&images, dir)?;
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
    }
    let staging = staging_path(output);
    if let Err(e) = docx::write_docx(&report, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    fs::rename(&staging, output).map_err(|e| ReportError::io(output, e))?;
    let gases: Vec<&str> = report.sections.iter().map(|s| s.gas.as_str()).collect();
    info!(path = %output.display(), ?gases, "report written");

    Ok(output.to_path_buf())
}

fn staging_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "report.docx".to_string());
    output.with_file_name(format!(".{name}.partial"))
}

fn keep_images(images: &[GeneratedImage], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;
    for image in images {
        let Some(name) = image.path.file_name() else {
            continue;
        };
        let target = dir.join(name);
        fs::copy(&image.path, &target).map_err(|e| ReportError::io(&target, e))?;
    }
    debug!(dir = %dir.display(), count = images.len(), "kept intermediate images");

    Ok(())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::{fs::File, io::Read};

    use tempfile::TempDir;
    use zip::ZipArchive;

    use super::*;
    use crate::{
        boundary::Region,
        fixtures::{date, Dataset},
        gas::GasProfile,
        series::window_start,
    };

    fn request_fixture(gases: &[&str], region: &str, period_days: u32) -> ReportRequest {
        ReportRequest::new(gases.iter().copied(), date("2024-01-15"), region, period_days)
    }

    fn assemble(dataset: &Dataset, request: &ReportRequest, work: &Path) -> Result<Report> {
        let ctx = ReportContext::from_config(&dataset.config())?;
        assemble_report(request, &ctx, work, &ProgressBar::hidden()).map(|(report, _)| report)
    }

    fn north(dataset: &Dataset) -> Region {
        let config = dataset.config();
        BoundarySet::load(&config.data.regions, "parent_cod", "region_nam")
            .unwrap()
            .resolve("North")
            .unwrap()
            .clone()
    }

    #[test]
    fn should_normalize_requested_gases() {
        let request = request_fixture(&[" no2", "CO", "NO2", ""], "North", 7);

        assert_eq!(request.gases, vec!["NO2", "CO"]);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn should_reject_invalid_requests() {
        let empty = request_fixture(&[], "North", 7);
        assert_eq!(empty.validate().unwrap_err().kind(), "InvalidRequest");

        let no_period = request_fixture(&["CO"], "North", 0);
        assert_eq!(no_period.validate().unwrap_err().kind(), "InvalidRequest");

        let endless = request_fixture(&["CO"], "North", u32::MAX);
        assert_eq!(endless.validate().unwrap_err().kind(), "InvalidRequest");

        for gas in ["../X", "/ETC"] {
            let escaping = request_fixture(&[gas], "North", 7);
            assert_eq!(escaping.validate().unwrap_err().kind(), "InvalidRequest", "{gas}");
        }
    }

    #[test]
    fn should_build_one_section_with_three_figures() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["NO2"], date("2024-01-15"), 7);
        let work = TempDir::new().unwrap();

        let report = assemble(&dataset, &request_fixture(&["NO2"], "North", 7), work.path()).unwrap();

        assert_eq!(report.sections.len(), 1);
        let kinds: Vec<ImageKind> = report.figures().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![ImageKind::OverviewMap, ImageKind::ZoomedMap, ImageKind::TimeseriesChart]
        );
        assert!(report.figures().all(|f| f.png.starts_with(b"\x89PNG")));
    }

    #[test]
    fn should_write_document_with_three_media_parts() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["NO2"], date("2024-01-15"), 7);
        let output = tmp.path().join("report.docx");

        let path = generate_report(
            &request_fixture(&["NO2"], "North", 7),
            &dataset.config(),
            &output,
        )
        .unwrap();

        assert_eq!(path, output);
        assert!(!tmp.path().join(".report.docx.partial").exists());
        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let media = archive
            .file_names()
            .filter(|n| n.starts_with("word/media/"))
            .count();
        assert_eq!(media, 3);

        let mut document = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut document)
            .unwrap();
        assert!(document.contains("North"));
    }

    #[test]
    fn should_create_missing_output_directory() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["CO"], date("2024-01-15"), 2);
        let output = tmp.path().join("reports/2024/report.docx");

        generate_report(&request_fixture(&["CO"], "North", 2), &dataset.config(), &output).unwrap();

        assert!(output.is_file());
    }

    #[test]
    fn should_not_write_document_for_unknown_region() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["CO"], date("2024-01-15"), 3);
        let output = tmp.path().join("report.docx");

        let err = generate_report(
            &request_fixture(&["CO"], "Atlantis", 3),
            &dataset.config(),
            &output,
        )
        .unwrap_err();

        assert!(matches!(err, ReportError::UnknownRegion { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn should_fail_without_raster_frame() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["CO"], date("2024-01-10"), 3);
        let output = tmp.path().join("report.docx");

        let err = generate_report(
            &request_fixture(&["CO"], "North", 3),
            &dataset.config(),
            &output,
        )
        .unwrap_err();

        assert_eq!(err.kind(), "RasterUnavailable");
        assert!(!output.exists());
    }

    #[test]
    fn should_abort_when_any_gas_fails() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["CO"], date("2024-01-15"), 3);
        let output = tmp.path().join("report.docx");

        let err = generate_report(
            &request_fixture(&["CO", "SO2"], "North", 3),
            &dataset.config(),
            &output,
        )
        .unwrap_err();

        assert!(matches!(err, ReportError::RasterUnavailable { ref gas, .. } if gas == "SO2"));
        assert!(!output.exists());
    }

    #[test]
    fn should_keep_gas_order_and_separate_sections() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["SO2", "CO"], date("2024-01-15"), 2);
        let work = TempDir::new().unwrap();

        let report =
            assemble(&dataset, &request_fixture(&["SO2", "co"], "1", 2), work.path()).unwrap();

        let gases: Vec<&str> = report.sections.iter().map(|s| s.gas.as_str()).collect();
        assert_eq!(gases, vec!["SO2", "CO"]);
        assert!(report.sections[0].heading.starts_with("1. "));
        assert!(report.sections[1].heading.starts_with("2. "));
        assert!(matches!(report.sections[0].blocks.last(), Some(Block::PageBreak)));
        assert!(matches!(report.sections[1].blocks.last(), Some(Block::Figure(_))));
    }

    #[test]
    fn should_append_gas_description() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["NO2"], date("2024-01-15"), 1);
        let work = TempDir::new().unwrap();
        let mut ctx = ReportContext::from_config(&dataset.config()).unwrap();
        ctx.catalog =
            GasCatalog::from_json(r#"{"no2": {"display": "Azot dioksidi", "text": "Measured in {unit}."}}"#)
                .unwrap();

        let (report, _) = assemble_report(
            &request_fixture(&["NO2"], "North", 1),
            &ctx,
            work.path(),
            &ProgressBar::hidden(),
        )
        .unwrap();

        let section = &report.sections[0];
        assert!(section.heading.contains("Azot dioksidi"));
        assert!(matches!(
            section.blocks.last(),
            Some(Block::Text(text)) if text == "Measured in mol/km²."
        ));
    }

    #[test]
    fn should_render_identical_images_across_runs() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["CO"], date("2024-01-15"), 5);
        let request = request_fixture(&["CO"], "North", 5);
        let (first_dir, second_dir) = (TempDir::new().unwrap(), TempDir::new().unwrap());

        let first = assemble(&dataset, &request, first_dir.path()).unwrap();
        let second = assemble(&dataset, &request, second_dir.path()).unwrap();

        let pngs = |report: &Report| report.figures().map(|f| f.png.clone()).collect::<Vec<_>>();
        assert_eq!(pngs(&first), pngs(&second));
    }

    #[test]
    fn should_chart_single_day_period() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["CO"], date("2024-01-15"), 3);
        let work = TempDir::new().unwrap();

        let report = assemble(&dataset, &request_fixture(&["CO"], "North", 1), work.path()).unwrap();
        assert_eq!(report.figures().count(), 3);

        let ctx = ReportContext::from_config(&dataset.config()).unwrap();
        let points = ctx
            .series
            .daily_means(&GasProfile::builtin("CO"), &north(&dataset), date("2024-01-15"), date("2024-01-15"))
            .unwrap();
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn should_report_thirty_days_for_north() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["CO2"], date("2024-01-15"), 30);
        let work = TempDir::new().unwrap();
        let mut config = dataset.config();
        config.keep_images = Some(tmp.path().join("kept"));
        let output = tmp.path().join("co2.docx");

        let request = request_fixture(&["CO2"], "North", 30);
        generate_report(&request, &config, &output).unwrap();

        let report = assemble(&dataset, &request, work.path()).unwrap();
        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].gas, "CO2");
        assert!(report.sections[0].heading.contains("North"));
        assert!(tmp.path().join("kept/CO2_2024-01-15_zoomed.png").is_file());

        let ctx = ReportContext::from_config(&dataset.config()).unwrap();
        let end = date("2024-01-15");
        let points = ctx
            .series
            .daily_means(&GasProfile::builtin("CO2"), &north(&dataset), window_start(end, 30).unwrap(), end)
            .unwrap();
        assert_eq!(points.len(), 30);
        assert_eq!(points.last().map(|p| p.date), Some(end));
    }
}
