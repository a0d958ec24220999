use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Order, OrderNumber, OrderStatusType},
};

/// Inserts the order, or, if an order with the same number already exists, overwrites its status, accrual and
/// timestamp. The owner of an existing order is never changed.
pub async fn upsert_order(order: &Order, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let res = sqlx::query(
        r#"
            INSERT INTO orders (number, user_id, status, accrual, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(number) DO UPDATE SET
                status = excluded.status,
                accrual = excluded.accrual,
                updated_at = excluded.updated_at;
        "#,
    )
    .bind(&order.number)
    .bind(order.user_id)
    .bind(order.status)
    .bind(order.accrual)
    .bind(order.updated_at)
    .execute(conn)
    .await?;
    trace!("🗃️ Upserted order {}. {} rows affected", order.number, res.rows_affected());
    Ok(())
}

/// Inserts the order unless its number is already taken. Returns true if a row was written.
pub async fn insert_order_if_absent(order: &Order, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let res = sqlx::query(
        r#"
            INSERT INTO orders (number, user_id, status, accrual, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(number) DO NOTHING;
        "#,
    )
    .bind(&order.number)
    .bind(order.user_id)
    .bind(order.status)
    .bind(order.accrual)
    .bind(order.updated_at)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(
        "SELECT number, user_id, status, accrual, updated_at FROM orders WHERE number = $1 LIMIT 1",
    )
    .bind(number)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Fetches every order whose status is one of `statuses`, oldest first.
pub async fn fetch_orders_with_status(
    statuses: &[OrderStatusType],
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = sqlx::QueryBuilder::new(
        "SELECT number, user_id, status, accrual, updated_at FROM orders WHERE status IN (",
    );
    let mut list = builder.separated(", ");
    for status in statuses {
        list.push_bind(*status);
    }
    builder.push(") ORDER BY updated_at ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

pub async fn fetch_orders_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT number, user_id, status, accrual, updated_at FROM orders WHERE user_id = $1 ORDER BY updated_at ASC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
