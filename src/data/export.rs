use anyhow::Result;

use super::aggregate::TopProductRow;
use super::model::SalesDataset;

/// Column headers for the tabular rendering of the dataset: typed columns
/// first, under their resolved source names, then pass-through columns.
pub fn table_header(dataset: &SalesDataset) -> Vec<String> {
    let schema = &dataset.schema;
    let mut header = Vec::new();
    if let Some(col) = &schema.date_column {
        header.push(col.clone());
    }
    if schema.has_category {
        header.push("category".to_string());
    }
    if let Some(col) = &schema.product_column {
        header.push(col.clone());
    }
    if schema.has_quantity {
        header.push("quantity".to_string());
    }
    if schema.has_amount {
        header.push("total_amount".to_string());
    }
    if schema.has_margin {
        header.push("profit_margin".to_string());
    }
    header.extend(dataset.extra_columns.iter().cloned());
    header
}

/// One display record in [`table_header`] order.  Missing values render as
/// empty fields.
pub fn table_record(dataset: &SalesDataset, index: usize) -> Vec<String> {
    let schema = &dataset.schema;
    let row = &dataset.rows[index];
    let mut rec = Vec::new();

    if schema.date_column.is_some() {
        rec.push(
            row.order_date
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        );
    }
    if schema.has_category {
        rec.push(row.category.clone().unwrap_or_default());
    }
    if schema.product_column.is_some() {
        rec.push(row.product.clone().unwrap_or_default());
    }
    if schema.has_quantity {
        rec.push(row.quantity.map(|q| q.to_string()).unwrap_or_default());
    }
    if schema.has_amount {
        rec.push(
            row.total_amount
                .map(|a| format!("{a:.2}"))
                .unwrap_or_default(),
        );
    }
    if schema.has_margin {
        rec.push(
            row.profit_margin
                .map(|m| m.to_string())
                .unwrap_or_default(),
        );
    }
    for col in &dataset.extra_columns {
        rec.push(
            row.extra
                .get(col)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        );
    }
    rec
}

/// Serialise the filtered rows as delimited text for the download action.
pub fn filtered_table_csv(dataset: &SalesDataset, indices: &[usize]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(table_header(dataset))?;
    for &i in indices {
        wtr.write_record(table_record(dataset, i))?;
    }
    writer_to_string(wtr)
}

/// Serialise the top-product rollup as delimited text.
pub fn top_products_csv(rows: &[TopProductRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["product", "total_amount", "profit_margin", "quantity"])?;
    for r in rows {
        wtr.write_record([
            r.product.clone(),
            format!("{:.2}", r.total_amount),
            r.profit_margin.to_string(),
            r.quantity.to_string(),
        ])?;
    }
    writer_to_string(wtr)
}

fn writer_to_string(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV writer: {e}"))?;
    String::from_utf8(bytes).map_err(|e| anyhow::anyhow!("CSV output was not UTF-8: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;

    const SAMPLE_CSV: &str = "\
order_date,category,product_name,quantity,total_amount,profit_margin,region
2024-01-05,Electronics,USB Hub,2,59.80,0.22,North
2024-01-06,Home,Desk Lamp,N/A,45.50,0.18,South
";

    #[test]
    fn filtered_export_round_shape() {
        let ds = read_csv(SAMPLE_CSV.as_bytes()).unwrap();
        let text = filtered_table_csv(&ds, &[0, 1]).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "order_date,category,product_name,quantity,total_amount,profit_margin,region"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-05 00:00:00,Electronics,USB Hub,2,59.80,0.22,North"
        );
        // the coerced-missing quantity exports as an empty field
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-06 00:00:00,Home,Desk Lamp,,45.50,0.18,South"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn export_respects_filtered_indices() {
        let ds = read_csv(SAMPLE_CSV.as_bytes()).unwrap();
        let text = filtered_table_csv(&ds, &[1]).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Desk Lamp"));
        assert!(!text.contains("USB Hub"));
    }

    #[test]
    fn top_products_export() {
        let rows = vec![TopProductRow {
            product: "USB Hub".into(),
            total_amount: 119.6,
            profit_margin: 0.44,
            quantity: 4,
        }];
        let text = top_products_csv(&rows).unwrap();
        assert_eq!(
            text,
            "product,total_amount,profit_margin,quantity\nUSB Hub,119.60,0.44,4\n"
        );
    }
}
