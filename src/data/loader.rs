use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray, TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, ResolvedSchema, SalesDataset, TransactionRow};
use super::PipelineError;

/// Candidate source columns for the order timestamp, in priority order.
pub const DATE_CANDIDATES: [&str; 4] = ["order_date", "date", "order_datetime", "transaction_date"];
/// Candidate source columns for the product label, in priority order.
pub const PRODUCT_CANDIDATES: [&str; 3] = ["product_name", "product_title", "product_id"];

const COL_CATEGORY: &str = "category";
const COL_AMOUNT: &str = "total_amount";
const COL_MARGIN: &str = "profit_margin";
const COL_QUANTITY: &str = "quantity";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sales dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with one transaction per record (primary format)
/// * `.json`    – records orientation, `[{ "category": ..., ... }, ...]`
/// * `.parquet` – flat scalar columns
///
/// The only fatal condition is a source that cannot be read or parsed as a
/// table at all; per-cell numeric and date failures become missing values.
pub fn load_file(path: &Path) -> Result<SalesDataset, PipelineError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(anyhow::anyhow!("unsupported file extension: .{other}")),
    };
    loaded.map_err(PipelineError::DataUnavailable)
}

// ---------------------------------------------------------------------------
// Load cache
// ---------------------------------------------------------------------------

/// Read-through cache of loaded datasets, keyed by source path.  The only
/// cross-interaction state in the system; no eviction, invalidated only by
/// process restart.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: BTreeMap<PathBuf, Arc<SalesDataset>>,
}

impl DatasetCache {
    /// Return the cached dataset for `path`, loading it on first request.
    pub fn load(&mut self, path: &Path) -> Result<Arc<SalesDataset>, PipelineError> {
        if let Some(dataset) = self.entries.get(path) {
            log::debug!("cache hit for {}", path.display());
            return Ok(Arc::clone(dataset));
        }
        let dataset = Arc::new(load_file(path)?);
        log::info!(
            "loaded {} rows from {} (date column: {:?}, product column: {:?})",
            dataset.len(),
            path.display(),
            dataset.schema.date_column,
            dataset.schema.product_column
        );
        self.entries.insert(path.to_path_buf(), Arc::clone(&dataset));
        Ok(dataset)
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<SalesDataset> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    read_csv(file)
}

/// Parse CSV from any reader.  Header row required; cell values are
/// type-guessed and the typed columns coerced afterwards.
pub fn read_csv<R: Read>(reader: R) -> Result<SalesDataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut cells = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            cells.insert(header.clone(), guess_cell(record.get(idx).unwrap_or("")));
        }
        records.push(cells);
    }

    Ok(build_rows(records))
}

fn guess_cell(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default
/// `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "order_date": "2024-01-05", "category": "Toys", "total_amount": 59.9, ... },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<SalesDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    read_json(&text)
}

pub fn read_json(text: &str) -> Result<SalesDataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let rows = root
        .as_array()
        .context("expected top-level JSON array of records")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, rec) in rows.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("row {i} is not a JSON object"))?;
        let cells: BTreeMap<String, CellValue> = obj
            .iter()
            .map(|(key, val)| (key.clone(), json_to_cell(val)))
            .collect();
        records.push(cells);
    }

    Ok(build_rows(records))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat scalar columns.  Works with files written
/// by both Pandas (`df.to_parquet()`) and Polars (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<SalesDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

        for row in 0..batch.num_rows() {
            let mut cells = BTreeMap::new();
            for (idx, name) in names.iter().enumerate() {
                cells.insert(name.clone(), extract_cell(batch.column(idx), row));
            }
            records.push(cells);
        }
    }

    Ok(build_rows(records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                CellValue::String(s.value(row).to_string())
            } else {
                // LargeStringArray
                let s = col.as_string::<i64>();
                CellValue::String(s.value(row).to_string())
            }
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            CellValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            CellValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            CellValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            CellValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            CellValue::Bool(arr.value(row))
        }
        DataType::Date32 => {
            let arr = col.as_any().downcast_ref::<Date32Array>().unwrap();
            match arr.value_as_date(row) {
                Some(d) => CellValue::Date(d.format("%Y-%m-%d").to_string()),
                None => CellValue::Null,
            }
        }
        DataType::Timestamp(unit, _) => {
            let dt = match unit {
                TimeUnit::Second => col
                    .as_any()
                    .downcast_ref::<TimestampSecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
                TimeUnit::Millisecond => col
                    .as_any()
                    .downcast_ref::<TimestampMillisecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
                TimeUnit::Microsecond => col
                    .as_any()
                    .downcast_ref::<TimestampMicrosecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
                TimeUnit::Nanosecond => col
                    .as_any()
                    .downcast_ref::<TimestampNanosecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
            };
            match dt {
                Some(dt) => CellValue::Date(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => CellValue::Null,
            }
        }
        _ => CellValue::String(format!("{:?}", col.data_type())),
    }
}

// ---------------------------------------------------------------------------
// Schema resolution & row construction (shared by all formats)
// ---------------------------------------------------------------------------

fn resolve_schema(columns: &BTreeSet<String>) -> ResolvedSchema {
    let date_column = DATE_CANDIDATES
        .iter()
        .find(|c| columns.contains(**c))
        .map(|c| c.to_string());
    let product_column = PRODUCT_CANDIDATES
        .iter()
        .find(|c| columns.contains(**c))
        .map(|c| c.to_string());

    ResolvedSchema {
        date_column,
        product_column,
        has_category: columns.contains(COL_CATEGORY),
        has_amount: columns.contains(COL_AMOUNT),
        has_margin: columns.contains(COL_MARGIN),
        has_quantity: columns.contains(COL_QUANTITY),
    }
}

fn build_rows(records: Vec<BTreeMap<String, CellValue>>) -> SalesDataset {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    for rec in &records {
        for col in rec.keys() {
            columns.insert(col.clone());
        }
    }
    let schema = resolve_schema(&columns);

    let rows = records
        .into_iter()
        .map(|cells| row_from_cells(cells, &schema))
        .collect();

    SalesDataset::from_rows(rows, schema)
}

fn row_from_cells(mut cells: BTreeMap<String, CellValue>, schema: &ResolvedSchema) -> TransactionRow {
    let category = if schema.has_category {
        cells.remove(COL_CATEGORY).and_then(|v| v.as_label())
    } else {
        None
    };
    let product = schema
        .product_column
        .as_deref()
        .and_then(|col| cells.remove(col))
        .and_then(|v| v.as_label());
    let order_date = schema
        .date_column
        .as_deref()
        .and_then(|col| cells.remove(col))
        .and_then(|v| cell_to_datetime(&v));
    let total_amount = cells.remove(COL_AMOUNT).and_then(|v| v.as_f64());
    let profit_margin = cells.remove(COL_MARGIN).and_then(|v| v.as_f64());
    let quantity = cells.remove(COL_QUANTITY).and_then(|v| v.as_i64());

    TransactionRow {
        category,
        product,
        total_amount,
        profit_margin,
        quantity,
        order_date,
        extra: cells,
    }
}

fn cell_to_datetime(v: &CellValue) -> Option<NaiveDateTime> {
    match v {
        CellValue::String(s) | CellValue::Date(s) => parse_datetime(s),
        _ => None,
    }
}

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a timestamp from the small ladder of formats the source data uses.
/// Bare dates land at midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
order_id,order_date,category,product_name,quantity,total_amount,profit_margin,region
1001,2024-01-05 10:30:00,Electronics,USB Hub,2,59.80,0.22,North
1002,2024-01-06,Electronics,Laptop Stand,1,89.00,0.31,South
1003,2024-01-08,Home,Desk Lamp,N/A,45.50,0.18,North
1004,not-a-date,,Laptop Stand,3,267.00,bad,East
";

    #[test]
    fn loads_sample_and_coerces_bad_cells() {
        let ds = read_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 4);

        // quantity "N/A" becomes missing, not an error
        assert_eq!(ds.rows[2].quantity, None);
        assert_eq!(ds.rows[2].total_amount, Some(45.5));

        // unparseable margin and date become missing
        assert_eq!(ds.rows[3].profit_margin, None);
        assert_eq!(ds.rows[3].order_date, None);

        // empty category is missing
        assert_eq!(ds.rows[3].category, None);
        assert_eq!(ds.rows[0].category.as_deref(), Some("Electronics"));

        // bare date lands at midnight
        assert_eq!(
            ds.rows[1].order_date.unwrap().to_string(),
            "2024-01-06 00:00:00"
        );
    }

    #[test]
    fn resolves_columns_by_priority() {
        let ds = read_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(ds.schema.date_column.as_deref(), Some("order_date"));
        assert_eq!(ds.schema.product_column.as_deref(), Some("product_name"));
        assert!(ds.schema.has_category);
        assert!(ds.schema.has_amount);

        let alt = "\
transaction_date,product_title,product_id,total_amount
2024-02-01,Mug,77,12.0
";
        let ds = read_csv(alt.as_bytes()).unwrap();
        assert_eq!(ds.schema.date_column.as_deref(), Some("transaction_date"));
        // product_title wins over product_id
        assert_eq!(ds.schema.product_column.as_deref(), Some("product_title"));
        assert_eq!(ds.rows[0].product.as_deref(), Some("Mug"));
        // the losing candidate stays a pass-through column
        assert!(ds.extra_columns.iter().any(|c| c == "product_id"));
    }

    #[test]
    fn absent_product_columns_degrade() {
        let csv = "category,total_amount\nToys,10.0\n";
        let ds = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(ds.schema.product_column, None);
        assert_eq!(ds.rows[0].product, None);
    }

    #[test]
    fn extra_columns_pass_through() {
        let ds = read_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(ds.extra_columns, vec!["order_id".to_string(), "region".to_string()]);
        assert_eq!(
            ds.rows[0].extra.get("region"),
            Some(&CellValue::String("North".into()))
        );
        assert_eq!(ds.rows[0].extra.get("order_id"), Some(&CellValue::Integer(1001)));
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let err = load_file(Path::new("/no/such/file.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable(_)));
    }

    #[test]
    fn unsupported_extension_is_data_unavailable() {
        let err = load_file(Path::new("sales.xlsx")).unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable(_)));
        assert!(err.to_string().contains("xlsx"));
    }

    #[test]
    fn json_records_load() {
        let text = r#"[
            {"order_date": "2024-03-04", "category": "Toys", "product_id": 5, "total_amount": 20.5, "profit_margin": 0.4, "quantity": 2},
            {"order_date": null, "category": "Toys", "product_id": 5, "total_amount": "oops", "profit_margin": 0.1, "quantity": 1}
        ]"#;
        let ds = read_json(text).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.schema.product_column.as_deref(), Some("product_id"));
        assert_eq!(ds.rows[0].product.as_deref(), Some("5"));
        assert_eq!(ds.rows[0].total_amount, Some(20.5));
        assert_eq!(ds.rows[1].total_amount, None);
        assert_eq!(ds.rows[1].order_date, None);
    }

    #[test]
    fn cache_returns_same_dataset() {
        let path = std::env::temp_dir().join("salesdash_cache_test.csv");
        std::fs::write(&path, SAMPLE_CSV).unwrap();

        let mut cache = DatasetCache::default();
        let a = cache.load(&path).unwrap();
        let b = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn datetime_ladder() {
        assert!(parse_datetime("2024-01-05 10:30:00").is_some());
        assert!(parse_datetime("2024-01-05T10:30:00").is_some());
        assert!(parse_datetime("2024-01-05 10:30").is_some());
        assert!(parse_datetime("01/05/2024").is_some());
        assert!(parse_datetime("05.01.2024").is_none());
        assert!(parse_datetime("").is_none());
    }
}
