use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::error::{GridError, Result};
use super::model::{
    CellValue, GRID_ID, GRID_SCORE, GRID_SEGMENT, GRID_SEGMENT_KMEANS, GridRow, GridTable,
    REQUIRED_COLUMNS,
};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a grid table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – Parquet file with the grid columns
/// * anything else      – comma-separated text with a header row
///
/// Parse failures are reported as [`GridError::DataLoad`] carrying the full
/// context chain; a header without one of [`REQUIRED_COLUMNS`] is reported as
/// [`GridError::MissingColumn`].
pub fn load_file(path: &Path) -> Result<GridTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        _ => load_csv(path),
    }?;

    warn_duplicate_ids(&table, path);
    log::info!(
        "Loaded {} grids from {} with columns {:?}",
        table.len(),
        path.display(),
        table.columns
    );
    Ok(table)
}

fn data_load_error(path: &Path, err: anyhow::Error) -> GridError {
    GridError::DataLoad {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    }
}

/// Locate every required column in the header, failing on the first absent one.
fn required_indices(path: &Path, headers: &[String]) -> Result<[usize; 9]> {
    let mut indices = [0usize; 9];
    for (slot, name) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| GridError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })?;
    }
    Ok(indices)
}

/// Duplicate ids are tolerated; lookups return the first occurrence.
fn warn_duplicate_ids(table: &GridTable, path: &Path) {
    let mut seen = HashSet::with_capacity(table.len());
    for row in &table.rows {
        if !seen.insert(row.grid_id.as_str()) {
            log::warn!(
                "{}: grid_id '{}' appears more than once; lookups use the first row",
                path.display(),
                row.grid_id
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Typed field parsing shared by both formats
// ---------------------------------------------------------------------------

/// Raw cells of the nine model columns for one row, as text.
struct RawRow<'a> {
    cells: [&'a str; 9],
}

impl RawRow<'_> {
    fn into_grid_row(self, row_no: usize, extra: BTreeMap<String, CellValue>) -> anyhow::Result<GridRow> {
        let [id, segment, kmeans, score, building, yellow, road, empty, water] = self.cells;

        let grid_id = id.trim();
        if grid_id.is_empty() {
            bail!("row {row_no}: empty {GRID_ID}");
        }
        let grid_segment = required_label(segment, row_no, GRID_SEGMENT)?;
        let grid_segment_kmeans = required_label(kmeans, row_no, GRID_SEGMENT_KMEANS)?;

        let grid_score = parse_feature(score, row_no, GRID_SCORE)?;
        if !grid_score.is_finite() {
            bail!("row {row_no}: {GRID_SCORE} must be a finite number, got '{score}'");
        }

        Ok(GridRow {
            grid_id: grid_id.to_string(),
            grid_segment,
            grid_segment_kmeans,
            grid_score,
            building_density: parse_feature(building, row_no, REQUIRED_COLUMNS[4])?,
            yellow_building_density: parse_feature(yellow, row_no, REQUIRED_COLUMNS[5])?,
            total_road_density: parse_feature(road, row_no, REQUIRED_COLUMNS[6])?,
            empty: parse_feature(empty, row_no, REQUIRED_COLUMNS[7])?,
            waterbody: parse_feature(water, row_no, REQUIRED_COLUMNS[8])?,
            extra,
        })
    }
}

fn required_label(s: &str, row: usize, col: &str) -> anyhow::Result<String> {
    let s = s.trim();
    if s.is_empty() {
        bail!("row {row}: empty {col}");
    }
    Ok(s.to_string())
}

/// Empty cells read as NaN, matching how the profile mean skips them.
fn parse_feature(s: &str, row: usize, col: &str) -> anyhow::Result<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(f64::NAN);
    }
    s.parse::<f64>()
        .with_context(|| format!("row {row}, {col}: '{s}' is not a number"))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one grid per record.
/// Columns outside the data model are kept as typed pass-through cells.
fn load_csv(path: &Path) -> Result<GridTable> {
    let mut reader = csv::Reader::from_path(path)
        .context("opening CSV")
        .map_err(|e| data_load_error(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")
        .map_err(|e| data_load_error(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let indices = required_indices(path, &headers)?;
    read_csv_rows(&mut reader, &headers, &indices)
        .map(|rows| GridTable::new(rows, headers.clone()))
        .map_err(|e| data_load_error(path, e))
}

fn read_csv_rows<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    headers: &[String],
    indices: &[usize; 9],
) -> anyhow::Result<Vec<GridRow>> {
    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let cells = indices.map(|i| record.get(i).unwrap_or(""));

        let mut extra = BTreeMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            if indices.contains(&col_idx) {
                continue;
            }
            if let Some(col_name) = headers.get(col_idx) {
                extra.insert(col_name.clone(), CellValue::guess(value));
            }
        }

        rows.push(RawRow { cells }.into_grid_row(row_no, extra)?);
    }

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding the grid columns.
///
/// `grid_id` may be an integer or string column; numeric columns may be
/// any of Float64 / Float32 / Int64 / Int32.  Works with files written by
/// both **Pandas** (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<GridTable> {
    let file = std::fs::File::open(path)
        .context("opening parquet file")
        .map_err(|e| data_load_error(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")
        .map_err(|e| data_load_error(path, e))?;

    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let indices = required_indices(path, &headers)?;

    let reader = builder
        .build()
        .context("building parquet reader")
        .map_err(|e| data_load_error(path, e))?;

    read_parquet_rows(reader, &headers, &indices)
        .map(|rows| GridTable::new(rows, headers.clone()))
        .map_err(|e| data_load_error(path, e))
}

fn read_parquet_rows(
    reader: parquet::arrow::arrow_reader::ParquetRecordBatchReader,
    headers: &[String],
    indices: &[usize; 9],
) -> anyhow::Result<Vec<GridRow>> {
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let offset = rows.len();

        for row in 0..batch.num_rows() {
            let row_no = offset + row;
            let text: Vec<String> = indices
                .iter()
                .map(|&i| cell_text(batch.column(i), row))
                .collect::<anyhow::Result<_>>()
                .with_context(|| format!("parquet row {row_no}"))?;

            let mut extra = BTreeMap::new();
            for (col_idx, col_name) in headers.iter().enumerate() {
                if indices.contains(&col_idx) {
                    continue;
                }
                extra.insert(col_name.clone(), extract_cell_value(batch.column(col_idx), row));
            }

            let cells = std::array::from_fn(|k| text[k].as_str());
            rows.push(RawRow { cells }.into_grid_row(row_no, extra)?);
        }
    }

    Ok(rows)
}

// -- Parquet / Arrow helpers --

/// Render a model column cell as text so both formats share one parser.
/// Nulls become the empty string.
fn cell_text(col: &Arc<dyn Array>, row: usize) -> anyhow::Result<String> {
    if col.is_null(row) {
        return Ok(String::new());
    }
    let text = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        DataType::Int32 => downcast::<Int32Array>(col)?.value(row).to_string(),
        DataType::Int64 => downcast::<Int64Array>(col)?.value(row).to_string(),
        DataType::Float32 => downcast::<Float32Array>(col)?.value(row).to_string(),
        DataType::Float64 => downcast::<Float64Array>(col)?.value(row).to_string(),
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(text)
}

fn downcast<T: 'static>(col: &Arc<dyn Array>) -> anyhow::Result<&T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array layout for {:?}", col.data_type()))
}

/// Extract a single pass-through value from an Arrow column at a given row.
fn extract_cell_value(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => {
            if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                CellValue::String(s.value(row).to_string())
            } else {
                CellValue::Null
            }
        }
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map_or(CellValue::Null, |a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map_or(CellValue::Null, |a| CellValue::Integer(a.value(row))),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map_or(CellValue::Null, |a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map_or(CellValue::Null, |a| CellValue::Float(a.value(row))),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map_or(CellValue::Null, |a| CellValue::Bool(a.value(row))),
        other => CellValue::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use arrow::array::ArrayRef;
    use arrow::record_batch::RecordBatch;
    use arrow::datatypes::{Field, Schema};
    use parquet::arrow::ArrowWriter;

    const HEADER: &str = "grid_id,grid_segment,grid_segment_kmeans,grid_score,\
building_density,yellow_building_density,total_road_density,empty,waterbody";

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_csv_preserves_order_and_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "grids.csv",
            &format!(
                "{HEADER}\n\
                 3,High,Cluster 1,30.5,0.8,0.1,0.4,0.05,0.0\n\
                 1,Low,Cluster 0,10,0.5,0.2,0.1,0.30,0.1\n"
            ),
        );

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].grid_id, "3");
        assert_eq!(table.rows[1].grid_id, "1");
        assert_eq!(table.rows[0].grid_segment, "High");
        assert_eq!(table.rows[0].grid_segment_kmeans, "Cluster 1");
        assert_eq!(table.rows[0].grid_score, 30.5);
        assert_eq!(table.rows[1].grid_score, 10.0);
        assert_eq!(table.rows[1].empty, 0.3);
        assert_eq!(table.columns.len(), 9);
    }

    #[test]
    fn test_load_csv_keeps_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "grids.csv",
            "ward,grid_id,grid_segment,grid_segment_kmeans,grid_score,building_density,\
yellow_building_density,total_road_density,empty,waterbody,lat\n\
             Rohini,g-1,High,Cluster 2,1.5,0.1,0.1,0.1,0.1,0.1,28.7\n",
        );

        let table = load_file(&path).unwrap();
        let row = &table.rows[0];
        assert_eq!(row.grid_id, "g-1");
        assert_eq!(row.extra.get("ward"), Some(&CellValue::String("Rohini".into())));
        assert_eq!(row.extra.get("lat"), Some(&CellValue::Float(28.7)));
        assert_eq!(table.columns.first().map(String::as_str), Some("ward"));
        assert_eq!(table.extra_columns().collect::<Vec<_>>(), vec!["ward", "lat"]);
    }

    #[test]
    fn test_missing_column_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "grids.csv",
            "grid_id,grid_segment,grid_segment_kmeans,grid_score,building_density\n1,A,B,1,0.1\n",
        );

        match load_file(&path) {
            Err(GridError::MissingColumn { column, .. }) => {
                assert_eq!(column, "yellow_building_density")
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_data_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        assert!(matches!(load_file(&path), Err(GridError::DataLoad { .. })));
    }

    #[test]
    fn test_bad_score_is_data_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "grids.csv", &format!("{HEADER}\n1,A,B,abc,0,0,0,0,0\n"));

        match load_file(&path) {
            Err(GridError::DataLoad { reason, .. }) => assert!(reason.contains("grid_score")),
            other => panic!("expected DataLoad, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_score_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "grids.csv", &format!("{HEADER}\n1,A,B,,0,0,0,0,0\n"));
        assert!(matches!(load_file(&path), Err(GridError::DataLoad { .. })));
    }

    #[test]
    fn test_empty_segment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "grids.csv", &format!("{HEADER}\n1,,B,1,0,0,0,0,0\n"));

        match load_file(&path) {
            Err(GridError::DataLoad { reason, .. }) => assert!(reason.contains("grid_segment")),
            other => panic!("expected DataLoad, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_feature_reads_as_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "grids.csv", &format!("{HEADER}\n1,A,B,1,,0,0,0,0\n"));

        let table = load_file(&path).unwrap();
        assert!(table.rows[0].building_density.is_nan());
    }

    #[test]
    fn test_header_only_loads_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "grids.csv", &format!("{HEADER}\n"));

        let table = load_file(&path).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "grids.csv",
            &format!("{HEADER}\n1,A,B,1,0,0,0,0,0\n1,C,D,2,0,0,0,0,0\n"),
        );

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_load_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grids.parquet");

        let float_col = |v: Vec<f64>| -> ArrayRef { Arc::new(Float64Array::from(v)) };
        let str_col = |v: Vec<&str>| -> ArrayRef { Arc::new(StringArray::from(v)) };

        let mut fields = vec![
            Field::new("grid_id", DataType::Int64, false),
            Field::new("grid_segment", DataType::Utf8, false),
            Field::new("grid_segment_kmeans", DataType::Utf8, false),
        ];
        for name in &REQUIRED_COLUMNS[3..] {
            fields.push(Field::new(*name, DataType::Float64, true));
        }
        fields.push(Field::new("urban", DataType::Boolean, false));
        let schema = Arc::new(Schema::new(fields));

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![11, 12])) as ArrayRef,
            str_col(vec!["High", "Low"]),
            str_col(vec!["Cluster 0", "Cluster 1"]),
            float_col(vec![0.9, 0.1]),
        ];
        for _ in 0..5 {
            columns.push(float_col(vec![0.25, 0.75]));
        }
        columns.push(Arc::new(BooleanArray::from(vec![true, false])));

        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].grid_id, "11");
        assert_eq!(table.rows[1].grid_segment, "Low");
        assert_eq!(table.rows[0].grid_score, 0.9);
        assert_eq!(table.rows[1].waterbody, 0.75);
        assert_eq!(table.rows[0].extra.get("urban"), Some(&CellValue::Bool(true)));
    }
}
