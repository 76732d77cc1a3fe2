use chrono::{DateTime, Utc};
use dpg_common::Amount;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Campaign, NewCampaign},
    traits::DonationDbError,
};

pub async fn insert_campaign(
    campaign: NewCampaign,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Campaign, DonationDbError> {
    let campaign = sqlx::query_as(
        r#"
            INSERT INTO campaigns (name, target_amount, currency, status, is_public, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(campaign.name)
    .bind(campaign.target_amount)
    .bind(campaign.currency)
    .bind(campaign.status.to_string())
    .bind(campaign.is_public)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(campaign)
}

pub async fn fetch_campaign(id: i64, conn: &mut SqliteConnection) -> Result<Option<Campaign>, DonationDbError> {
    let campaign = sqlx::query_as("SELECT * FROM campaigns WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(campaign)
}

/// Adds `amount` to the campaign's collected amount in a single statement. The running total is never read back and
/// rewritten, so concurrent increments cannot lose updates.
///
/// SQLite silently promotes an overflowing integer sum to REAL, so the statement refuses any credit that would push
/// the total past `i64::MAX`. The caller's transaction must then be abandoned.
pub async fn increment_collected(
    id: i64,
    amount: Amount,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), DonationDbError> {
    let result = sqlx::query(
        r#"UPDATE campaigns SET collected_amount = collected_amount + $1, updated_at = $2
           WHERE id = $3 AND $1 >= 0 AND collected_amount <= $4 - $1"#,
    )
    .bind(amount)
    .bind(now)
    .bind(id)
    .bind(i64::MAX)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return match fetch_campaign(id, conn).await? {
            Some(campaign) => Err(DonationDbError::CollectedAmountOverflow(format!(
                "Campaign #{id} has collected {} and cannot be credited with {amount}",
                campaign.collected_amount
            ))),
            None => Err(DonationDbError::CampaignNotFound(id)),
        };
    }
    trace!("🗃️ Campaign #{id} credited with {amount}");
    Ok(())
}

/// Subtracts `amount` from the collected amount. Fails, and changes nothing, if the total would go negative.
pub async fn decrement_collected(
    id: i64,
    amount: Amount,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), DonationDbError> {
    let result = sqlx::query(
        r#"UPDATE campaigns SET collected_amount = collected_amount - $1, updated_at = $2
           WHERE id = $3 AND collected_amount >= $1"#,
    )
    .bind(amount)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DonationDbError::InsufficientCollectedAmount(format!(
            "Campaign #{id} cannot be debited by {amount}"
        )));
    }
    trace!("🗃️ Campaign #{id} debited by {amount}");
    Ok(())
}

/// The collected amount as implied by the donation rows themselves.
pub async fn computed_collected_amount(id: i64, conn: &mut SqliteConnection) -> Result<Amount, DonationDbError> {
    let total: i64 = sqlx::query_scalar(
        r#"SELECT COALESCE(SUM(amount - refunded_amount), 0) FROM donations
           WHERE campaign_id = $1 AND status IN ('Completed', 'Refunded')"#,
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(Amount::from(total))
}
