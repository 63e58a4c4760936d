//! No-response strikes and the blacklist entries they trigger.

use dispatch_core::blacklist::{strike_window_start, strikes_exceeded, BlacklistReason};
use dispatch_core::types::{DbId, Timestamp};
use dispatch_db::repositories::{BlacklistRepo, EligibilityRepo, NewBlacklistEntry, StrikeRepo};
use sqlx::PgConnection;

use crate::EngineContext;

/// Strike every notified professional who never answered the attribution.
///
/// A professional reaching the strike limit inside the counting window gets
/// a `no_response` blacklist entry unless one is already in force. Returns
/// the newly blacklisted professionals.
pub(crate) async fn record_no_response(
    conn: &mut PgConnection,
    ctx: &EngineContext,
    attribution_id: DbId,
    now: Timestamp,
) -> Result<Vec<DbId>, sqlx::Error> {
    let config = &ctx.config;
    let silent = EligibilityRepo::silent_professional_ids(&mut *conn, attribution_id).await?;
    let window_start = strike_window_start(now, config);

    let mut blacklisted = Vec::new();
    for professional_id in silent {
        if !StrikeRepo::record(&mut *conn, professional_id, attribution_id, now).await? {
            continue;
        }
        let strikes = StrikeRepo::count_since(&mut *conn, professional_id, window_start).await?;
        if !strikes_exceeded(strikes, config)
            || BlacklistRepo::has_active(&mut *conn, professional_id, now).await?
        {
            continue;
        }

        let reason = BlacklistReason::NoResponse;
        BlacklistRepo::create(
            &mut *conn,
            &NewBlacklistEntry {
                professional_id,
                reason,
                attribution_id: Some(attribution_id),
                note: None,
                expires_at: reason.default_expiry(now, config),
                now,
            },
        )
        .await?;
        tracing::info!(
            professional_id,
            attribution_id,
            strikes,
            "Professional blacklisted for repeated no-response",
        );
        blacklisted.push(professional_id);
    }
    Ok(blacklisted)
}
