use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewWithdrawal, Withdrawal},
};

pub async fn insert_withdrawal(
    withdrawal: NewWithdrawal,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, SqliteDatabaseError> {
    let record = sqlx::query_as::<_, Withdrawal>(
        r#"
            INSERT INTO withdrawals (user_id, order_number, sum, processed_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, order_number, sum, processed_at;
        "#,
    )
    .bind(withdrawal.user_id)
    .bind(&withdrawal.order_number)
    .bind(withdrawal.sum)
    .bind(withdrawal.processed_at)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_withdrawals_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, SqliteDatabaseError> {
    let withdrawals = sqlx::query_as::<_, Withdrawal>(
        r#"
            SELECT id, user_id, order_number, sum, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at ASC, id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(withdrawals)
}
