use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use cofound_types::models::{Match, MatchStatus};

use super::Window;
use crate::rows::{MATCH_COLUMNS, format_ts, match_from_row};

fn opt_ts(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(format_ts)
}

pub fn insert_match(conn: &Connection, m: &Match) -> Result<()> {
    conn.execute(
        "INSERT INTO matches (id, user_id, target_user_id, match_score, match_explanation,
                              complementarity_score, commitment_alignment_score, location_fit_score,
                              intent_score, interest_overlap_score, preference_alignment_score,
                              status, intro_requested_at, intro_accepted_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        rusqlite::params![
            m.id.to_string(),
            m.user_id.to_string(),
            m.target_user_id.to_string(),
            m.scores.match_score,
            m.scores.match_explanation,
            m.scores.complementarity_score,
            m.scores.commitment_alignment_score,
            m.scores.location_fit_score,
            m.scores.intent_score,
            m.scores.interest_overlap_score,
            m.scores.preference_alignment_score,
            m.status.as_str(),
            opt_ts(m.intro_requested_at),
            opt_ts(m.intro_accepted_at),
            format_ts(m.created_at),
            format_ts(m.updated_at),
        ],
    )?;
    Ok(())
}

/// Persist the mutable lifecycle fields of an existing row.
pub fn update_lifecycle(conn: &Connection, m: &Match) -> Result<()> {
    conn.execute(
        "UPDATE matches
         SET status = ?2, intro_requested_at = ?3, intro_accepted_at = ?4, updated_at = ?5
         WHERE id = ?1",
        rusqlite::params![
            m.id.to_string(),
            m.status.as_str(),
            opt_ts(m.intro_requested_at),
            opt_ts(m.intro_accepted_at),
            format_ts(m.updated_at),
        ],
    )?;
    Ok(())
}

pub fn touch(conn: &Connection, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE matches SET updated_at = ?2 WHERE id = ?1",
        rusqlite::params![id.to_string(), format_ts(at)],
    )?;
    Ok(())
}

pub fn get_match(conn: &Connection, id: Uuid) -> Result<Option<Match>> {
    let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1");
    Ok(conn.query_row(&sql, [id.to_string()], match_from_row).optional()?)
}

/// The directed row `user_id -> target_user_id`, if any.
pub fn get_by_pair(conn: &Connection, user_id: Uuid, target_user_id: Uuid) -> Result<Option<Match>> {
    let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE user_id = ?1 AND target_user_id = ?2");
    Ok(conn
        .query_row(&sql, [user_id.to_string(), target_user_id.to_string()], match_from_row)
        .optional()?)
}

/// The directed row `user_id -> target_user_id`, only if its owner has
/// requested an introduction on it.
pub fn get_requested_by_pair(conn: &Connection, user_id: Uuid, target_user_id: Uuid) -> Result<Option<Match>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches
         WHERE user_id = ?1 AND target_user_id = ?2 AND intro_requested_at IS NOT NULL"
    );
    Ok(conn
        .query_row(&sql, [user_id.to_string(), target_user_id.to_string()], match_from_row)
        .optional()?)
}

/// Rows owned by `user_id` whose introduction was requested at or after `since`.
pub fn count_intros_since(conn: &Connection, user_id: Uuid, since: DateTime<Utc>) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM matches
         WHERE user_id = ?1 AND intro_requested_at IS NOT NULL AND intro_requested_at >= ?2",
        [user_id.to_string(), format_ts(since)],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}

/// Matches in either direction involving `user_id`, newest first.
pub fn list_for_participant(
    conn: &Connection,
    user_id: Uuid,
    status: Option<MatchStatus>,
    window: Window,
) -> Result<Vec<Match>> {
    let status_clause = if status.is_some() { "AND status = ?4" } else { "" };
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches
         WHERE (user_id = ?1 OR target_user_id = ?1) {status_clause}
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let uid = user_id.to_string();
    let rows = match status {
        Some(s) => stmt
            .query_map(rusqlite::params![uid, window.limit, window.skip, s.as_str()], match_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(rusqlite::params![uid, window.limit, window.skip], match_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

/// Every connected match involving `user_id`, oldest first.
pub fn list_connected(conn: &Connection, user_id: Uuid) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches
         WHERE (user_id = ?1 OR target_user_id = ?1) AND status = 'connected'
         ORDER BY created_at ASC, rowid ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id.to_string()], match_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Rows owned by `user_id` in `status`, newest first.
pub fn list_owned_with_status(
    conn: &Connection,
    user_id: Uuid,
    status: MatchStatus,
    window: Window,
) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches
         WHERE user_id = ?1 AND status = ?2
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?3 OFFSET ?4"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![user_id.to_string(), status.as_str(), window.limit, window.skip],
            match_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_owned_with_status(conn: &Connection, user_id: Uuid, status: MatchStatus) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM matches WHERE user_id = ?1 AND status = ?2",
        [user_id.to_string(), status.as_str().to_string()],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}

/// Introductions involving `user_id` that have not been accepted yet.
pub fn count_open_intros(conn: &Connection, user_id: Uuid) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM matches
         WHERE ((user_id = ?1 AND intro_requested_at IS NOT NULL)
             OR (target_user_id = ?1 AND intro_accepted_at IS NOT NULL))
           AND intro_accepted_at IS NULL",
        [user_id.to_string()],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}
