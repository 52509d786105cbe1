//! Build the DOCX report.

use anyhow::{Error, Result};

use crate::{
    cli::ReportArgs,
    config::ReportConfig,
    report::{generate_report, ReportRequest},
};

use super::{load_config, make_report_file_name};

pub fn report(args: &ReportArgs) -> Result<String> {
    let config = report_config(args)?;
    let request = ReportRequest::new(&args.gases, args.date, &args.region, args.period_days);
    let output = match &args.output {
        Some(path) => path.clone(),
        None => make_report_file_name(args.date, &args.region)?,
    };

    let path = generate_report(&request, &config, &output).map_err(|e| {
        let context = format!(
            "{}: report for {} in `{}` on {}",
            e.kind(),
            request.gases.join(", "),
            request.region,
            request.date
        );
        Error::new(e).context(context)
    })?;

    Ok(path.to_string_lossy().to_string())
}

/// Config file plus every report flag that was given.
fn report_config(args: &ReportArgs) -> Result<ReportConfig> {
    let mut config = load_config(&args.data)?;

    if args.districts.is_some() {
        config.data.districts.clone_from(&args.districts);
    }
    if args.series.is_some() {
        config.data.series.clone_from(&args.series);
    }
    if args.gas_catalog.is_some() {
        config.data.gas_catalog.clone_from(&args.gas_catalog);
    }
    if args.keep_images.is_some() {
        config.keep_images.clone_from(&args.keep_images);
    }
    if let Some(language) = args.language {
        config.document.language = language;
    }

    Ok(config)
}

// -- Tests -------------------------------------------------------------------
