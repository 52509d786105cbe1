//! Save and load the daily regional mean table.

use std::{fs::File, path::Path, sync::Arc};

use arrow::{
    array::{Array, Date32Array, Date32Builder, Float64Array, Float64Builder, StringArray, StringBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{DateTime, Datelike, NaiveDate};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
};

use crate::{
    error::{ReportError, Result},
    series::TimeSeriesPoint,
};

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("gas", DataType::Utf8, false),
        Field::new("region", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        Field::new("mean", DataType::Float64, false),
    ]))
}

fn epoch_offset() -> i32 {
    DateTime::UNIX_EPOCH.date_naive().num_days_from_ce()
}

pub fn save_series(points: &[TimeSeriesPoint], file_path: &Path) -> Result<()> {
    let file = File::create(file_path).map_err(|e| ReportError::io(file_path, e))?;
    let schema = schema();

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .set_dictionary_enabled(true)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let mut gas_builder = StringBuilder::with_capacity(points.len(), points.len() * 4);
    let mut region_builder = StringBuilder::with_capacity(points.len(), points.len() * 4);
    let mut date_builder = Date32Builder::with_capacity(points.len());
    let mut mean_builder = Float64Builder::with_capacity(points.len());

    let epoch_offset = epoch_offset();
    for point in points {
        gas_builder.append_value(&point.gas);
        region_builder.append_value(&point.region);
        date_builder.append_value(point.date.num_days_from_ce() - epoch_offset);
        mean_builder.append_value(point.mean_value);
    }

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(gas_builder.finish()),
            Arc::new(region_builder.finish()),
            Arc::new(date_builder.finish()),
            Arc::new(mean_builder.finish()),
        ],
    )?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

pub fn load_series(file_path: &Path) -> Result<Vec<TimeSeriesPoint>> {
    let file = File::open(file_path).map_err(|e| ReportError::io(file_path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let invalid = |reason: &str| ReportError::InvalidRequest(format!(
        "series table `{}`: {reason}",
        file_path.display()
    ));

    let epoch_offset = epoch_offset();
    let mut points = Vec::new();
    for batch in reader {
        let batch = batch?;
        let column = |name: &str| {
            batch
                .column_by_name(name)
                .ok_or_else(|| invalid(&format!("missing column `{name}`")))
        };

        let gas = column("gas")?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| invalid("`gas` is not a string column"))?;
        let region = column("region")?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| invalid("`region` is not a string column"))?;
        let date = column("date")?
            .as_any()
            .downcast_ref::<Date32Array>()
            .ok_or_else(|| invalid("`date` is not a date32 column"))?;
        let mean = column("mean")?
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| invalid("`mean` is not a float64 column"))?;

        for i in 0..batch.num_rows() {
            if gas.is_null(i) || region.is_null(i) || date.is_null(i) || mean.is_null(i) {
                continue;
            }
            let day = NaiveDate::from_num_days_from_ce_opt(date.value(i) + epoch_offset)
                .ok_or_else(|| invalid("date out of range"))?;

            points.push(TimeSeriesPoint {
                date: day,
                gas: gas.value(i).to_string(),
                region: region.value(i).to_string(),
                mean_value: mean.value(i),
            });
        }
    }

    Ok(points)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use tempfile::NamedTempFile;

    use super::*;
    use crate::fixtures::date;

    fn points_fixture() -> Vec<TimeSeriesPoint> {
        ["2024-01-13", "2024-01-14", "2024-01-15"]
            .iter()
            .enumerate()
            .map(|(i, day)| TimeSeriesPoint {
                date: date(day),
                gas: "NO2".to_string(),
                region: "1703".to_string(),
                mean_value: 100.0 + i as f64,
            })
            .collect()
    }

    #[test]
    fn should_write_long_format_schema() {
        let temp_file = NamedTempFile::new().unwrap();
        save_series(&points_fixture(), temp_file.path()).unwrap();

        let file = File::open(temp_file.path()).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();

        let mut total_rows = 0;
        for batch in reader {
            let batch = batch.unwrap();
            total_rows += batch.num_rows();

            let schema = batch.schema();
            assert_eq!(schema.fields().len(), 4);
            assert_eq!(schema.field(0).name(), "gas");
            assert_eq!(schema.field(2).name(), "date");
            assert_eq!(schema.field(2).data_type(), &DataType::Date32);
            assert_eq!(schema.field(3).name(), "mean");

            let dates = batch.column(2).as_any().downcast_ref::<Date32Array>().unwrap();
            // 2024-01-13 is day 19735 since the epoch
            assert_eq!(dates.value(0), 19735);
        }
        assert_eq!(total_rows, 3);
    }

    #[test]
    fn should_load_saved_points() {
        let temp_file = NamedTempFile::new().unwrap();
        let points = points_fixture();
        save_series(&points, temp_file.path()).unwrap();

        assert_eq!(load_series(temp_file.path()).unwrap(), points);
    }

    #[test]
    fn should_fail_on_missing_table() {
        let err = load_series(Path::new("/nonexistent/series.parquet")).unwrap_err();
        assert_eq!(err.kind(), "IOFailure");
    }
}
