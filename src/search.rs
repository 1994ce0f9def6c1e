use std::str::FromStr;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::structs::InventoryItem;

pub const PAGE_SIZE: i64 = 10;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    #[default]
    All,
    PartNumber,
    PartName,
    Description,
    Manufacturer,
}

impl SearchField {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchField::All => "all",
            SearchField::PartNumber => "part_number",
            SearchField::PartName => "part_name",
            SearchField::Description => "description",
            SearchField::Manufacturer => "manufacturer",
        }
    }

    /// WHERE clause and how many times the pattern must be bound into it.
    /// SQLite's LIKE already folds ASCII case.
    fn filter_clause(self) -> (&'static str, usize) {
        match self {
            SearchField::All => (
                "part_name LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\' \
                 OR manufacturer LIKE ? ESCAPE '\\' OR CAST(part_number AS TEXT) LIKE ? ESCAPE '\\'",
                4,
            ),
            SearchField::PartNumber => ("CAST(part_number AS TEXT) LIKE ? ESCAPE '\\'", 1),
            SearchField::PartName => ("part_name LIKE ? ESCAPE '\\'", 1),
            SearchField::Description => ("description LIKE ? ESCAPE '\\'", 1),
            SearchField::Manufacturer => ("manufacturer LIKE ? ESCAPE '\\'", 1),
        }
    }
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(SearchField::All),
            "part_number" => Ok(SearchField::PartNumber),
            "part_name" => Ok(SearchField::PartName),
            "description" => Ok(SearchField::Description),
            "manufacturer" => Ok(SearchField::Manufacturer),
            other => Err(format!("Not a valid choice: {other}")),
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub search_term: Option<String>,
    pub field: SearchField,
}

#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_num: Option<i64>,
    pub prev_num: Option<i64>,
}

impl<T> Page<T> {
    fn new(items: Vec<T>, page: i64, total: i64) -> Self {
        let pages = (total + PAGE_SIZE - 1) / PAGE_SIZE;
        let has_next = page < pages;
        let has_prev = page > 1;
        Self {
            items,
            page,
            per_page: PAGE_SIZE,
            total,
            has_next,
            has_prev,
            next_num: has_next.then(|| page + 1),
            prev_num: has_prev.then(|| page - 1),
        }
    }
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// One page of items matching `criteria`, ordered by part number.
/// Pages below 1 are read as page 1; pages past the end come back empty.
pub async fn search_items(
    pool: &SqlitePool,
    criteria: &SearchCriteria,
    page: i64,
) -> Result<Page<InventoryItem>, sqlx::Error> {
    let page = page.max(1);
    let filter = criteria
        .search_term
        .as_deref()
        .filter(|term| !term.is_empty())
        .map(|term| (criteria.field.filter_clause(), like_pattern(term)));

    let where_clause = match &filter {
        Some(((clause, _), _)) => format!(" WHERE ({clause})"),
        None => String::new(),
    };

    let count_sql = format!("SELECT COUNT(*) FROM inventory{where_clause}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(((_, binds), pattern)) = &filter {
        for _ in 0..*binds {
            count_query = count_query.bind(pattern.as_str());
        }
    }
    let total = count_query.fetch_one(pool).await?;

    let items_sql =
        format!("SELECT * FROM inventory{where_clause} ORDER BY part_number ASC LIMIT ? OFFSET ?");
    let mut items_query = sqlx::query_as::<_, InventoryItem>(&items_sql);
    if let Some(((_, binds), pattern)) = &filter {
        for _ in 0..*binds {
            items_query = items_query.bind(pattern.as_str());
        }
    }
    let offset = (page - 1).saturating_mul(PAGE_SIZE);
    let items = items_query
        .bind(PAGE_SIZE)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(Page::new(items, page, total))
}
