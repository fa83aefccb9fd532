use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewPayment, Payment},
    payment_objects::PaymentUpdate,
    traits::EscrowApiError,
};

/// Upserts the escrow row keyed on `job_id`. A conflicting insert refreshes the amounts and the
/// worker, but deliberately leaves `status`, `intent_id` and `memo` alone so a retry never
/// regresses the state machine.
pub async fn upsert_payment(payment: &NewPayment, conn: &mut SqliteConnection) -> Result<Payment, EscrowApiError> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                job_id,
                customer_id,
                worker_id,
                amount,
                platform_fee,
                worker_payout,
                currency
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (job_id) DO UPDATE SET
                worker_id = excluded.worker_id,
                amount = excluded.amount,
                platform_fee = excluded.platform_fee,
                worker_payout = excluded.worker_payout,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(payment.job_id)
    .bind(&payment.customer_id)
    .bind(&payment.worker_id)
    .bind(payment.amount)
    .bind(payment.platform_fee)
    .bind(payment.worker_payout)
    .bind(&payment.currency)
    .fetch_one(conn)
    .await?;
    debug!("💰️ Escrow row for job #{} is {}", payment.job_id, payment.status);
    Ok(payment)
}

pub async fn fetch_payment_for_job(job_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE job_id = $1").bind(job_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn payments_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as(
        "SELECT * FROM payments WHERE customer_id = $1 OR worker_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(payments)
}

pub async fn update_payment(
    job_id: i64,
    update: PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, EscrowApiError> {
    if update.is_empty() {
        debug!("💰️ No fields to update for the payment on job #{job_id}. Update request skipped.");
        return Err(EscrowApiError::PaymentModificationNoOp);
    }
    let mut builder = QueryBuilder::new("UPDATE payments SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(status) = update.new_status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(intent_id) = update.new_intent_id {
        set_clause.push("intent_id = ");
        set_clause.push_bind_unseparated(intent_id);
    }
    if let Some(memo) = update.new_memo {
        set_clause.push("memo = ");
        set_clause.push_bind_unseparated(memo);
    }
    if let Some(amount) = update.new_amount {
        set_clause.push("amount = ");
        set_clause.push_bind_unseparated(amount);
    }
    if let Some(fee) = update.new_platform_fee {
        set_clause.push("platform_fee = ");
        set_clause.push_bind_unseparated(fee);
    }
    if let Some(payout) = update.new_worker_payout {
        set_clause.push("worker_payout = ");
        set_clause.push_bind_unseparated(payout);
    }
    builder.push(" WHERE job_id = ");
    builder.push_bind(job_id);
    builder.push(" RETURNING *");
    trace!("💰️ Executing query: {}", builder.sql());
    let res = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Payment::from_row(&row)).transpose()?;
    trace!("💰️ Result of update_payment: {res:?}");
    Ok(res)
}
