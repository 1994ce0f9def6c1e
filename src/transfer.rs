//! Bulk CSV export and import of the inventory table.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    db,
    errors::AppError,
    structs::{InventoryItem, ItemInput},
    utils::optional_text,
};

pub const CSV_HEADERS: [&str; 11] = [
    "Part Number",
    "Part Name",
    "Description",
    "Origin Part Number",
    "Vendor Part Number",
    "Cost",
    "Quantity",
    "Min on Hand",
    "Location",
    "Manufacturer",
    "Notes",
];

#[derive(Serialize)]
struct ExportRow<'a> {
    part_number: i64,
    part_name: &'a str,
    description: Option<&'a str>,
    origin_part_number: Option<&'a str>,
    vendor_part_number: Option<&'a str>,
    cost: Option<f64>,
    quantity: i64,
    min_on_hand: i64,
    location: Option<&'a str>,
    manufacturer: Option<&'a str>,
    notes: Option<&'a str>,
}

impl<'a> From<&'a InventoryItem> for ExportRow<'a> {
    fn from(item: &'a InventoryItem) -> Self {
        Self {
            part_number: item.part_number,
            part_name: &item.part_name,
            description: item.description.as_deref(),
            origin_part_number: item.origin_part_number.as_deref(),
            vendor_part_number: item.vendor_part_number.as_deref(),
            cost: item.cost,
            quantity: item.quantity,
            min_on_hand: item.min_on_hand,
            location: item.location.as_deref(),
            manufacturer: item.manufacturer.as_deref(),
            notes: item.notes.as_deref(),
        }
    }
}

/// The whole table as CSV, header first, sorted by part number.
pub async fn export_csv(pool: &SqlitePool) -> Result<Vec<u8>, AppError> {
    let items = db::all_items(pool).await?;

    // Header is written by hand so an empty table still gets one.
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;
    for item in &items {
        writer.serialize(ExportRow::from(item))?;
    }
    let data = writer.into_inner().map_err(|e| {
        log::error!("Failed to flush CSV export: {}", e);
        AppError::InternalServerError
    })?;
    log::info!("Exported {} inventory rows", items.len());
    Ok(data)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    /// Rows without exactly eleven columns; they are left out rather than failing the import.
    pub skipped: usize,
}

/// Upserts every well-formed row inside one transaction.
///
/// The first header row is ignored. Any unparsable value or store error aborts
/// the import and rolls back every row written so far.
pub async fn import_csv(pool: &SqlitePool, data: &[u8]) -> Result<ImportSummary, AppError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| AppError::ImportError(e.to_string()))?;
        // Line where the record starts; quoted cells may span several lines.
        let line = record
            .position()
            .map_or(index as u64 + 2, |position| position.line());
        if record.len() != CSV_HEADERS.len() {
            summary.skipped += 1;
            continue;
        }

        let (part_number, input) = parse_row(&record)
            .map_err(|reason| AppError::ImportError(format!("line {line}: {reason}")))?;

        let existing = match part_number {
            Some(part_number) => db::item_exists(&mut *tx, part_number)
                .await?
                .then_some(part_number),
            None => None,
        };
        match existing {
            Some(part_number) => {
                db::update_item(&mut *tx, part_number, &input).await?;
                summary.updated += 1;
            }
            None => {
                db::insert_item(&mut *tx, part_number, &input).await?;
                summary.inserted += 1;
            }
        }
    }

    tx.commit().await?;
    if summary.skipped > 0 {
        log::warn!(
            "Skipped {} CSV rows without {} columns",
            summary.skipped,
            CSV_HEADERS.len()
        );
    }
    Ok(summary)
}

fn parse_row(record: &StringRecord) -> Result<(Option<i64>, ItemInput), String> {
    let field = |i: usize| record.get(i).unwrap_or_default();

    let part_number = match field(0).trim() {
        "" => None,
        raw => Some(
            raw.parse::<i64>()
                .map_err(|_| format!("invalid part number {raw:?}"))?,
        ),
    };

    let cost = match field(5).trim() {
        "" => None,
        raw => match raw.parse::<f64>() {
            Ok(cost) if cost.is_finite() && cost >= 0.0 => Some(cost),
            _ => return Err(format!("invalid cost {raw:?}")),
        },
    };

    let count = |i: usize, name: &str| -> Result<i64, String> {
        let raw = field(i).trim();
        match raw.parse::<i64>() {
            Ok(value) if value >= 0 => Ok(value),
            _ => Err(format!("invalid {name} {raw:?}")),
        }
    };

    let input = ItemInput {
        part_name: field(1).to_owned(),
        description: optional_text(field(2)),
        origin_part_number: optional_text(field(3)),
        vendor_part_number: optional_text(field(4)),
        cost,
        quantity: count(6, "quantity")?,
        min_on_hand: count(7, "min on hand")?,
        location: optional_text(field(8)),
        manufacturer: optional_text(field(9)),
        notes: optional_text(field(10)),
    };
    Ok((part_number, input))
}
