//! Scan in / scan out: quantity adjustments for physical receipt and withdrawal.
//!
//! Each adjustment is a single conditional UPDATE, so two concurrent scan-outs
//! can never both pass the stock check against the same starting quantity.

use sqlx::SqlitePool;

use crate::{errors::AppError, structs::FieldErrors};

fn ensure_positive(delta: i64) -> Result<(), AppError> {
    if delta < 1 {
        let mut errors = FieldErrors::new();
        errors.insert("quantity", "Number must be at least 1.".into());
        return Err(AppError::Validation(errors));
    }
    Ok(())
}

async fn current_quantity(pool: &SqlitePool, part_number: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT quantity FROM inventory WHERE part_number = ?")
        .bind(part_number)
        .fetch_optional(pool)
        .await
}

/// Adds `delta` units and returns the new quantity.
///
/// The sum must stay an INTEGER: SQLite would otherwise store an overflowing
/// result as REAL and the row could no longer be read back.
pub async fn scan_in(
    pool: &SqlitePool,
    part_number: i64,
    delta: i64,
    actor: &str,
) -> Result<i64, AppError> {
    ensure_positive(delta)?;
    let updated: Option<i64> = sqlx::query_scalar::<_, i64>(
        "UPDATE inventory SET quantity = quantity + ? WHERE part_number = ? AND quantity <= ? RETURNING quantity",
    )
    .bind(delta)
    .bind(part_number)
    .bind(i64::MAX - delta)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(quantity) => {
            log::info!(target: "audit", "{} units added to {} by {}.", delta, part_number, actor);
            Ok(quantity)
        }
        None => match current_quantity(pool, part_number).await? {
            Some(_) => {
                log::warn!("Scan in of {} units to {} would overflow quantity", delta, part_number);
                let mut errors = FieldErrors::new();
                errors.insert("quantity", "Quantity is too large for this item.".into());
                Err(AppError::Validation(errors))
            }
            None => Err(AppError::NotFound),
        },
    }
}

/// Removes `delta` units if that many are on hand and returns the new quantity.
pub async fn scan_out(
    pool: &SqlitePool,
    part_number: i64,
    delta: i64,
    actor: &str,
) -> Result<i64, AppError> {
    ensure_positive(delta)?;
    let updated: Option<i64> = sqlx::query_scalar::<_, i64>(
        "UPDATE inventory SET quantity = quantity - ? WHERE part_number = ? AND quantity >= ? RETURNING quantity",
    )
    .bind(delta)
    .bind(part_number)
    .bind(delta)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(quantity) => {
            log::info!(target: "audit", "{} units removed from {} by {}.", delta, part_number, actor);
            Ok(quantity)
        }
        None => match current_quantity(pool, part_number).await? {
            Some(available) => Err(AppError::InsufficientStock { available }),
            None => Err(AppError::NotFound),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        get_item, insert_item,
        test_support::{item, test_pool},
    };

    async fn quantity_of(pool: &SqlitePool, part_number: i64) -> i64 {
        get_item(pool, part_number).await.unwrap().unwrap().quantity
    }

    #[actix_web::test]
    async fn scan_in_adds_delta() {
        let pool = test_pool().await;
        insert_item(&pool, Some(7), &item("Rivet", 5, 0)).await.unwrap();

        assert_eq!(scan_in(&pool, 7, 12, "alice").await.unwrap(), 17);
        assert_eq!(quantity_of(&pool, 7).await, 17);
    }

    #[actix_web::test]
    async fn scan_in_refuses_to_overflow_quantity() {
        let pool = test_pool().await;
        insert_item(&pool, Some(7), &item("Rivet", 5, 0)).await.unwrap();

        let err = scan_in(&pool, 7, i64::MAX - 1, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref errors) if errors.contains_key("quantity")));
        assert_eq!(quantity_of(&pool, 7).await, 5);

        let kind: String = sqlx::query_scalar("SELECT typeof(quantity) FROM inventory WHERE part_number = 7")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(kind, "integer");

        assert_eq!(scan_in(&pool, 7, i64::MAX - 5, "alice").await.unwrap(), i64::MAX);
    }

    #[actix_web::test]
    async fn scan_out_removes_up_to_available_stock() {
        let pool = test_pool().await;
        insert_item(&pool, Some(7), &item("Rivet", 5, 0)).await.unwrap();

        assert_eq!(scan_out(&pool, 7, 5, "alice").await.unwrap(), 0);
        assert_eq!(quantity_of(&pool, 7).await, 0);
    }

    #[actix_web::test]
    async fn scan_out_beyond_stock_leaves_quantity_unchanged() {
        let pool = test_pool().await;
        insert_item(&pool, Some(7), &item("Rivet", 5, 0)).await.unwrap();

        let err = scan_out(&pool, 7, 6, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 5 }));
        assert_eq!(quantity_of(&pool, 7).await, 5);
    }

    #[actix_web::test]
    async fn unknown_part_number_is_not_found() {
        let pool = test_pool().await;
        assert!(matches!(scan_in(&pool, 99, 1, "alice").await, Err(AppError::NotFound)));
        assert!(matches!(scan_out(&pool, 99, 1, "alice").await, Err(AppError::NotFound)));
    }

    #[actix_web::test]
    async fn non_positive_delta_is_rejected() {
        let pool = test_pool().await;
        insert_item(&pool, Some(7), &item("Rivet", 5, 0)).await.unwrap();

        assert!(matches!(scan_in(&pool, 7, 0, "alice").await, Err(AppError::Validation(_))));
        assert!(matches!(scan_out(&pool, 7, -2, "alice").await, Err(AppError::Validation(_))));
        assert_eq!(quantity_of(&pool, 7).await, 5);
    }
}
