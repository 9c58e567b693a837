use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use cofound_types::models::{Message, MessageType};

use super::Window;
use crate::rows::{MESSAGE_COLUMNS, format_ts, message_from_row};

pub fn insert_message(conn: &Connection, msg: &Message) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, match_id, sender_id, recipient_id, content, message_type,
                               is_read, read_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            msg.id.to_string(),
            msg.match_id.to_string(),
            msg.sender_id.to_string(),
            msg.recipient_id.to_string(),
            msg.content,
            msg.message_type.as_str(),
            msg.is_read,
            msg.read_at.map(format_ts),
            format_ts(msg.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_message(conn: &Connection, id: Uuid) -> Result<Option<Message>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
    Ok(conn.query_row(&sql, [id.to_string()], message_from_row).optional()?)
}

/// Thread messages in chronological order.
pub fn list_for_match(conn: &Connection, match_id: Uuid, window: Window) -> Result<Vec<Message>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE match_id = ?1
         ORDER BY created_at ASC, rowid ASC
         LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![match_id.to_string(), window.limit, window.skip],
            message_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn last_for_match(conn: &Connection, match_id: Uuid) -> Result<Option<Message>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE match_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT 1"
    );
    Ok(conn.query_row(&sql, [match_id.to_string()], message_from_row).optional()?)
}

pub fn count_unread(conn: &Connection, match_id: Uuid, recipient_id: Uuid) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE match_id = ?1 AND recipient_id = ?2 AND is_read = 0",
        [match_id.to_string(), recipient_id.to_string()],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}

/// Messages of `kind` sent by `sender_id` at or after `since`.
pub fn count_sent_since(
    conn: &Connection,
    sender_id: Uuid,
    kind: MessageType,
    since: DateTime<Utc>,
) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages
         WHERE sender_id = ?1 AND message_type = ?2 AND created_at >= ?3",
        [sender_id.to_string(), kind.as_str().to_string(), format_ts(since)],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}

/// Returns whether the message changed. Already-read messages keep their
/// first `read_at`.
pub fn mark_read(conn: &Connection, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE messages SET is_read = 1, read_at = ?2 WHERE id = ?1 AND is_read = 0",
        [id.to_string(), format_ts(at)],
    )?;
    Ok(changed > 0)
}

/// Mark every unread message addressed to `recipient_id` in a thread, all
/// with the same timestamp. Returns the number of messages changed.
pub fn mark_all_read(conn: &Connection, match_id: Uuid, recipient_id: Uuid, at: DateTime<Utc>) -> Result<u64> {
    let changed = conn.execute(
        "UPDATE messages SET is_read = 1, read_at = ?3
         WHERE match_id = ?1 AND recipient_id = ?2 AND is_read = 0",
        [match_id.to_string(), recipient_id.to_string(), format_ts(at)],
    )?;
    Ok(changed as u64)
}
