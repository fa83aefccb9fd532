use sqlx::SqliteConnection;

use crate::{db_types::Conversation, traits::AuctionApiError};

/// Idempotently opens the conversation thread for a job. Safe to call on every acceptance retry.
pub async fn ensure_conversation(
    job_id: i64,
    customer_id: &str,
    worker_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Conversation, AuctionApiError> {
    sqlx::query("INSERT INTO conversations (job_id, customer_id, worker_id) VALUES ($1, $2, $3) ON CONFLICT (job_id) DO NOTHING")
        .bind(job_id)
        .bind(customer_id)
        .bind(worker_id)
        .execute(&mut *conn)
        .await?;
    let conversation = sqlx::query_as("SELECT * FROM conversations WHERE job_id = $1")
        .bind(job_id)
        .fetch_one(conn)
        .await?;
    Ok(conversation)
}
