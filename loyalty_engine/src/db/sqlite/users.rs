use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewUser, User},
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, User>(
        r#"
            INSERT INTO users (login, password_hash, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, login, password_hash, created_at;
        "#,
    )
    .bind(&user.login)
    .bind(&user.password_hash)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(SqliteDatabaseError::DuplicateLogin(user.login))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user_by_login(
    login: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, SqliteDatabaseError> {
    let user = sqlx::query_as::<_, User>("SELECT id, login, password_hash, created_at FROM users WHERE login = $1")
        .bind(login)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}
