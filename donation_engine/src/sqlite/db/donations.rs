use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Donation, DonationStatus, DonationStatusChange, GatewaySettlement, NewDonation, RefundRecord},
    traits::{DonationDbError, DonationQueryFilter},
};

/// Inserts a new donation into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// Offline donations are inserted as `Completed`, everything else as `Pending`.
/// The DB triggers the first status history entry for the donation.
pub async fn insert_donation(
    donation: NewDonation,
    status: DonationStatus,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Donation, DonationDbError> {
    let verified_at = (status == DonationStatus::Completed).then_some(donation.created_at);
    let record = sqlx::query_as(
        r#"
            INSERT INTO donations (
                campaign_id,
                donor_name,
                donor_contact,
                donor_tax_id,
                amount,
                currency,
                channel,
                reference,
                status,
                status_reason,
                verified_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING *;
        "#,
    )
    .bind(donation.campaign_id)
    .bind(donation.donor.name)
    .bind(donation.donor.contact)
    .bind(donation.donor.tax_id)
    .bind(donation.amount)
    .bind(donation.currency)
    .bind(donation.channel.to_string())
    .bind(donation.reference)
    .bind(status.to_string())
    .bind(reason)
    .bind(verified_at)
    .bind(donation.created_at)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_donation(id: i64, conn: &mut SqliteConnection) -> Result<Option<Donation>, DonationDbError> {
    let donation = sqlx::query_as("SELECT * FROM donations WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(donation)
}

pub async fn fetch_donation_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, DonationDbError> {
    let donation = sqlx::query_as("SELECT * FROM donations WHERE gateway_payment_id = $1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(donation)
}

pub async fn fetch_donation_by_order_id(
    order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, DonationDbError> {
    let donation = sqlx::query_as("SELECT * FROM donations WHERE gateway_order_id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(donation)
}

/// Binds a gateway order id to a pending donation that does not have one yet.
pub(crate) async fn attach_gateway_order(
    id: i64,
    order_id: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, DonationDbError> {
    let result = sqlx::query_as(
        r#"UPDATE donations SET gateway_order_id = $1, updated_at = $2
           WHERE id = $3 AND status = 'Pending' AND gateway_order_id IS NULL
           RETURNING *"#,
    )
    .bind(order_id)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await;
    match result {
        Ok(donation) => Ok(donation),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(DonationDbError::OrderIdAlreadyBound(order_id.to_string()))
        },
        Err(e) => Err(e.into()),
    }
}

/// Changes the status of a donation, but only if its current status is one of `from`.
///
/// Returns the updated donation, or `None` if the donation was not in one of the expected states.
pub(crate) async fn update_status_if(
    id: i64,
    from: &[DonationStatus],
    to: DonationStatus,
    reason: Option<&str>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, DonationDbError> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE donations SET status = ");
    builder.push_bind(to.to_string());
    builder.push(", status_reason = ");
    builder.push_bind(reason.map(String::from));
    builder.push(", updated_at = ");
    builder.push_bind(now);
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    push_status_in(&mut builder, from);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let donation = builder.build_query_as::<Donation>().fetch_optional(conn).await?;
    Ok(donation)
}

/// Moves the donation for the given gateway order from `Pending` to `Processing`.
pub(crate) async fn mark_processing_by_order_id(
    order_id: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, DonationDbError> {
    let donation = sqlx::query_as(
        r#"UPDATE donations SET status = 'Processing', status_reason = 'Payment authorized by gateway', updated_at = $1
           WHERE gateway_order_id = $2 AND status = 'Pending'
           RETURNING *"#,
    )
    .bind(now)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(donation)
}

/// The conditional half of settlement. Only an open donation is completed, so at most one caller can ever see
/// `Some` for a given donation.
pub(crate) async fn complete(
    settlement: &GatewaySettlement,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, DonationDbError> {
    let result = sqlx::query_as(
        r#"UPDATE donations SET
               status = 'Completed',
               status_reason = 'Payment verified',
               gateway_payment_id = $1,
               gateway_signature = $2,
               verified_at = $3,
               updated_at = $3
           WHERE id = $4 AND status IN ('Pending', 'Processing')
           RETURNING *"#,
    )
    .bind(&settlement.gateway_payment_id)
    .bind(&settlement.signature)
    .bind(now)
    .bind(settlement.donation_id)
    .fetch_optional(conn)
    .await;
    match result {
        Ok(donation) => Ok(donation),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(DonationDbError::PaymentIdAlreadyBound(settlement.gateway_payment_id.clone()))
        },
        Err(e) => Err(e.into()),
    }
}

/// The conditional half of a refund. Only a `Completed` donation with enough unrefunded value is touched.
pub(crate) async fn refund(
    refund: &RefundRecord,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, DonationDbError> {
    let reason = refund.reason.clone().unwrap_or_else(|| format!("Refunded {}", refund.amount));
    let donation = sqlx::query_as(
        r#"UPDATE donations SET
               status = 'Refunded',
               refunded_amount = refunded_amount + $1,
               gateway_refund_id = $2,
               status_reason = $3,
               updated_at = $4
           WHERE id = $5 AND status = 'Completed' AND refunded_amount + $1 <= amount
           RETURNING *"#,
    )
    .bind(refund.amount)
    .bind(&refund.gateway_refund_id)
    .bind(reason)
    .bind(now)
    .bind(refund.donation_id)
    .fetch_optional(conn)
    .await?;
    Ok(donation)
}

/// Fetches donations according to criteria specified in the `DonationQueryFilter`
///
/// Resulting donations are ordered by `created_at`, then `id`, in ascending order
pub async fn search_donations(
    query: DonationQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Donation>, DonationDbError> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM donations WHERE 1 = 1");
    if let Some(campaign_id) = query.campaign_id {
        builder.push(" AND campaign_id = ");
        builder.push_bind(campaign_id);
    }
    push_status_in(&mut builder, &query.statuses);
    if let Some(channel) = query.channel {
        builder.push(" AND channel = ");
        builder.push_bind(channel.to_string());
    }
    if let Some(since) = query.since {
        builder.push(" AND created_at >= ");
        builder.push_bind(since);
    }
    if let Some(until) = query.until {
        builder.push(" AND created_at < ");
        builder.push_bind(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let donations = builder.build_query_as::<Donation>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_donations: {}", donations.len());
    Ok(donations)
}

pub async fn fetch_status_history(
    donation_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<DonationStatusChange>, DonationDbError> {
    let history = sqlx::query_as("SELECT * FROM donation_status_history WHERE donation_id = $1 ORDER BY id ASC")
        .bind(donation_id)
        .fetch_all(conn)
        .await?;
    Ok(history)
}

fn push_status_in(builder: &mut QueryBuilder<'_, Sqlite>, statuses: &[DonationStatus]) {
    if statuses.is_empty() {
        return;
    }
    builder.push(" AND status IN (");
    let mut list = builder.separated(", ");
    for status in statuses {
        list.push_bind(status.to_string());
    }
    builder.push(")");
}
