//! Column lists and row mapping shared by the query modules.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with microsecond
//! precision, so ordering and range comparisons in SQL are plain string
//! comparisons.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use cofound_types::models::{Match, MatchScores, Message, User};

pub const USER_COLUMNS: &str = "id, external_id, email, name, bio, avatar_url, role_intent, \
     location, experience_years, previous_startups, is_active, is_banned, created_at";

pub const MATCH_COLUMNS: &str = "id, user_id, target_user_id, match_score, match_explanation, \
     complementarity_score, commitment_alignment_score, location_fit_score, intent_score, \
     interest_overlap_score, preference_alignment_score, status, intro_requested_at, \
     intro_accepted_at, created_at, updated_at";

pub const MESSAGE_COLUMNS: &str = "id, match_id, sender_id, recipient_id, content, message_type, \
     is_read, read_at, created_at";

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Drop sub-microsecond precision so an in-memory value equals what a later
/// read returns.
pub fn truncate_ts(ts: DateTime<Utc>) -> DateTime<Utc> {
    parse_ts(&format_ts(ts)).unwrap_or(ts)
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).map_err(|e| conversion_error(idx, e))
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_ts(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parsed::<Uuid>(row, 0)?,
        external_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        bio: row.get(4)?,
        avatar_url: row.get(5)?,
        role_intent: parsed(row, 6)?,
        location: row.get(7)?,
        experience_years: row.get(8)?,
        previous_startups: row.get(9)?,
        is_active: row.get(10)?,
        is_banned: row.get(11)?,
        created_at: timestamp(row, 12)?,
    })
}

pub fn match_from_row(row: &Row<'_>) -> rusqlite::Result<Match> {
    Ok(Match {
        id: parsed(row, 0)?,
        user_id: parsed(row, 1)?,
        target_user_id: parsed(row, 2)?,
        scores: MatchScores {
            match_score: row.get(3)?,
            match_explanation: row.get(4)?,
            complementarity_score: row.get(5)?,
            commitment_alignment_score: row.get(6)?,
            location_fit_score: row.get(7)?,
            intent_score: row.get(8)?,
            interest_overlap_score: row.get(9)?,
            preference_alignment_score: row.get(10)?,
        },
        status: parsed(row, 11)?,
        intro_requested_at: optional_timestamp(row, 12)?,
        intro_accepted_at: optional_timestamp(row, 13)?,
        created_at: timestamp(row, 14)?,
        updated_at: timestamp(row, 15)?,
    })
}

pub fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: parsed(row, 0)?,
        match_id: parsed(row, 1)?,
        sender_id: parsed(row, 2)?,
        recipient_id: parsed(row, 3)?,
        content: row.get(4)?,
        message_type: parsed(row, 5)?,
        is_read: row.get(6)?,
        read_at: optional_timestamp(row, 7)?,
        created_at: timestamp(row, 8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_as_strings() {
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let late = early + chrono::Duration::microseconds(1500);
        assert!(format_ts(early) < format_ts(late));
        assert_eq!(format_ts(early).len(), format_ts(late).len());
        assert_eq!(parse_ts(&format_ts(late)).unwrap(), late);
    }

    #[test]
    fn truncation_is_stable() {
        let now = Utc::now();
        let t = truncate_ts(now);
        assert_eq!(truncate_ts(t), t);
        assert!(now - t < chrono::Duration::microseconds(1));
    }
}
