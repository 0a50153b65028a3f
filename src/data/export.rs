use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::CellValue;
use super::table::CanonicalTable;

// ---------------------------------------------------------------------------
// Arrow
// ---------------------------------------------------------------------------

/// Convert the table into one Arrow record batch.
///
/// Schema: a non-null `t` column, then one nullable column per table column
/// named `id/key/aspect`. Absent cells become nulls. A column holding any
/// text label is `Utf8`, otherwise `Float64`.
pub fn to_record_batch(table: &CanonicalTable) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.num_columns() + 1);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns() + 1);

    fields.push(Field::new("t", DataType::Float64, false));
    arrays.push(Arc::new(Float64Array::from(
        table.rows().iter().map(|t| t.get()).collect::<Vec<f64>>(),
    )));

    for (c, column) in table.columns().iter().enumerate() {
        let cells: Vec<Option<&CellValue>> =
            (0..table.num_rows()).map(|r| table.cell(r, c)).collect();
        let has_labels = cells.iter().any(|v| matches!(v, Some(CellValue::Label(_))));
        if has_labels {
            fields.push(Field::new(column.to_string(), DataType::Utf8, true));
            let values: Vec<Option<String>> =
                cells.iter().map(|v| v.map(|v| v.to_string())).collect();
            arrays.push(Arc::new(StringArray::from(values)));
        } else {
            fields.push(Field::new(column.to_string(), DataType::Float64, true));
            let values: Vec<Option<f64>> =
                cells.iter().map(|v| v.and_then(CellValue::as_f64)).collect();
            arrays.push(Arc::new(Float64Array::from(values)));
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building record batch")
}

/// Write the table as a single-batch Parquet file.
pub fn write_parquet(table: &CanonicalTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Render the table as an ASCII grid, for inspection.
pub fn pretty(table: &CanonicalTable) -> Result<String> {
    let batch = to_record_batch(table)?;
    let rendered =
        arrow::util::pretty::pretty_format_batches(&[batch]).context("formatting table")?;
    Ok(rendered.to_string())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// CSV layout: header `t,<id/key/aspect>...`; one line per row; absent cells
/// are empty fields.
pub fn write_csv(table: &CanonicalTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).context("creating CSV file")?;
    write_csv_to(table, file)
}

pub fn write_csv_to<W: std::io::Write>(table: &CanonicalTable, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["t".to_string()];
    header.extend(table.columns().iter().map(|c| c.to_string()));
    writer.write_record(&header).context("writing CSV header")?;

    for (r, t) in table.rows().iter().enumerate() {
        let mut record = Vec::with_capacity(table.num_columns() + 1);
        record.push(t.to_string());
        for c in 0..table.num_columns() {
            record.push(table.cell(r, c).map(|v| v.to_string()).unwrap_or_default());
        }
        writer
            .write_record(&record)
            .with_context(|| format!("writing CSV row {r}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_str;
    use arrow::array::Array;

    fn sample() -> CanonicalTable {
        load_str(
            r#"{"tracker-commons":true,"units":{},"data":[
                {"id":1,"t":[0,1],"x":[[1],[2]],"head":"L"},
                {"id":2,"t":[1],"x":[[7]]}]}"#,
        )
        .unwrap()
        .worm
        .table()
        .cloned()
        .unwrap()
    }

    #[test]
    fn record_batch_has_nullable_columns() {
        let batch = to_record_batch(&sample()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 4);
        let schema = batch.schema();
        assert_eq!(schema.field(1).name(), "1/head/0");
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(3).name(), "2/x/0");
        let id2 = batch.column(3).as_any().downcast_ref::<Float64Array>().unwrap();
        assert!(id2.is_null(0));
        assert_eq!(id2.value(1), 7.0);
    }

    #[test]
    fn csv_leaves_absent_cells_empty() {
        let mut buf = Vec::new();
        write_csv_to(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "t,1/head/0,1/x/0,2/x/0");
        assert_eq!(lines[1], "0,L,1,");
        assert_eq!(lines[2], "1,L,2,7");
    }

    #[test]
    fn parquet_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.parquet");
        write_parquet(&sample(), &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
