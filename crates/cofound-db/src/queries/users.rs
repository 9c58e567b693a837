use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use uuid::Uuid;

use cofound_types::models::{MatchStatus, RoleIntent, User};

use super::Window;
use crate::Database;
use crate::rows::{USER_COLUMNS, format_ts, user_from_row};

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, external_id, email, name, bio, avatar_url, role_intent, location,
                            experience_years, previous_startups, is_active, is_banned, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            user.id.to_string(),
            user.external_id,
            user.email,
            user.name,
            user.bio,
            user.avatar_url,
            user.role_intent.as_str(),
            user.location,
            user.experience_years,
            user.previous_startups,
            user.is_active,
            user.is_banned,
            format_ts(user.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id.to_string()], user_from_row).optional()?)
}

/// A user that exists and is active. Banned users are still returned.
pub fn get_active_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND is_active = 1");
    Ok(conn.query_row(&sql, [id.to_string()], user_from_row).optional()?)
}

/// A user other people are allowed to see: active and not banned.
pub fn get_visible_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND is_active = 1 AND is_banned = 0"
    );
    Ok(conn.query_row(&sql, [id.to_string()], user_from_row).optional()?)
}

pub fn get_user_by_external_id(conn: &Connection, external_id: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = ?1");
    Ok(conn.query_row(&sql, [external_id], user_from_row).optional()?)
}

pub fn email_taken(conn: &Connection, email: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE email = ?1", [email], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Write back the editable profile fields of `user`.
pub fn update_profile(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "UPDATE users SET name = ?2, bio = ?3, avatar_url = ?4, role_intent = ?5, location = ?6,
                          experience_years = ?7, previous_startups = ?8
         WHERE id = ?1",
        rusqlite::params![
            user.id.to_string(),
            user.name,
            user.bio,
            user.avatar_url,
            user.role_intent.as_str(),
            user.location,
            user.experience_years,
            user.previous_startups,
        ],
    )?;
    Ok(())
}

pub fn set_flags(conn: &Connection, id: Uuid, is_active: bool, is_banned: bool) -> Result<()> {
    conn.execute(
        "UPDATE users SET is_active = ?2, is_banned = ?3 WHERE id = ?1",
        rusqlite::params![id.to_string(), is_active, is_banned],
    )?;
    Ok(())
}

/// Which profiles a user may be shown when browsing.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    pub viewer_id: Uuid,
    /// Only profiles with this role; `None` disables role filtering.
    pub role: Option<RoleIntent>,
    /// Hide targets of the viewer's own matches in these statuses. `None`
    /// hides targets of every match the viewer owns.
    pub hide_statuses: Option<Vec<MatchStatus>>,
}

impl CandidateFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut params = vec![Value::Text(self.viewer_id.to_string())];
        let mut sql = String::from(
            "u.is_active = 1 AND u.is_banned = 0 AND u.id <> ?1
             AND u.id NOT IN (SELECT m.target_user_id FROM matches m WHERE m.user_id = ?1",
        );

        if let Some(statuses) = &self.hide_statuses {
            if statuses.is_empty() {
                sql.push_str(" AND 0");
            } else {
                let placeholders: Vec<String> = statuses
                    .iter()
                    .map(|s| {
                        params.push(Value::Text(s.as_str().to_string()));
                        format!("?{}", params.len())
                    })
                    .collect();
                sql.push_str(&format!(" AND m.status IN ({})", placeholders.join(", ")));
            }
        }
        sql.push(')');

        if let Some(role) = self.role {
            params.push(Value::Text(role.as_str().to_string()));
            sql.push_str(&format!(" AND u.role_intent = ?{}", params.len()));
        }

        (sql, params)
    }
}

pub fn list_candidates(conn: &Connection, filter: &CandidateFilter, window: Window) -> Result<Vec<User>> {
    let (clause, mut params) = filter.where_clause();
    params.push(Value::Integer(window.limit as i64));
    let limit_idx = params.len();
    params.push(Value::Integer(window.skip as i64));
    let offset_idx = params.len();

    let cols = USER_COLUMNS
        .split(", ")
        .map(|c| format!("u.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {cols} FROM users u WHERE {clause}
         ORDER BY u.created_at DESC, u.rowid DESC
         LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_candidates(conn: &Connection, filter: &CandidateFilter) -> Result<u64> {
    let (clause, params) = filter.where_clause();
    let sql = format!("SELECT COUNT(*) FROM users u WHERE {clause}");
    let count: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |r| r.get(0))?;
    Ok(count as u64)
}

impl Database {
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.with_conn(|conn| insert_user(conn, user))
    }

    pub fn get_user_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_by_external_id(conn, external_id))
    }
}
