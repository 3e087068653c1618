//! `BEGIN IMMEDIATE` transaction helper shared by every repository's
//! `update(id, mutator)` and exposed as the Store's bare `transaction`
//! operation for callers that need more than one statement to land
//! atomically.
//!
//! `BEGIN IMMEDIATE` takes the write lock up front instead of on first
//! write, so a losing writer sees `SQLITE_BUSY` immediately rather than
//! mid-transaction; that failure is what drives the retry below.

use futures_util::future::BoxFuture;
use sqlx::{SqliteConnection, SqlitePool};

use transcribe_core::ports::RepositoryError;

const MAX_ATTEMPTS: u32 = 5;

pub(crate) fn storage_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

fn is_busy(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            let msg = db.message().to_ascii_lowercase();
            msg.contains("locked") || msg.contains("busy")
        }
        _ => false,
    }
}

fn is_busy_repository_error(e: &RepositoryError) -> bool {
    match e {
        RepositoryError::Storage(msg) => {
            let msg = msg.to_ascii_lowercase();
            msg.contains("locked") || msg.contains("busy")
        }
        _ => false,
    }
}

/// Runs `body` against a freshly acquired connection inside `BEGIN
/// IMMEDIATE`. On success the transaction is committed and `body`'s
/// result returned; on a busy-database error the whole closure (not just
/// the write) is re-run against a fresh read, which is what lets a
/// read-modify-write mutator observe the row it's actually racing
/// against.
pub async fn transaction<T, F>(pool: &SqlitePool, body: F) -> Result<T, RepositoryError>
where
    F: for<'c> Fn(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, RepositoryError>>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let mut conn = pool.acquire().await.map_err(storage_err)?;

        if let Err(e) = sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await {
            if is_busy(&e) && attempt < MAX_ATTEMPTS {
                continue;
            }
            return Err(storage_err(e));
        }

        match body(&mut conn).await {
            Ok(value) => match sqlx::query("COMMIT").execute(&mut *conn).await {
                Ok(_) => return Ok(value),
                Err(e) => {
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                    if is_busy(&e) && attempt < MAX_ATTEMPTS {
                        continue;
                    }
                    return Err(storage_err(e));
                }
            },
            Err(err) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                if is_busy_repository_error(&err) && attempt < MAX_ATTEMPTS {
                    continue;
                }
                return Err(err);
            }
        }
    }
    unreachable!("loop returns on its last iteration")
}
