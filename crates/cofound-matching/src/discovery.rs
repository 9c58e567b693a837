use cofound_db::queries::Window;
use cofound_db::users::CandidateFilter;
use cofound_db::{Connection, matches, users};
use cofound_types::api::ProfileCounts;
use cofound_types::models::{MatchStatus, User, UserPublic};

use crate::Matchmaker;
use crate::error::Result;

/// Statuses that take a profile out of the discover feed.
const DISCOVER_HIDDEN: [MatchStatus; 3] = [MatchStatus::Saved, MatchStatus::Dismissed, MatchStatus::Viewed];

fn discover_filter(actor: &User) -> CandidateFilter {
    CandidateFilter {
        viewer_id: actor.id,
        role: actor.role_intent.complement(),
        hide_statuses: Some(DISCOVER_HIDDEN.to_vec()),
    }
}

/// Targets of the actor's rows in `status`, newest row first. Rows whose
/// target no longer exists are dropped.
fn owned_targets(conn: &Connection, actor: &User, status: MatchStatus, window: Window) -> anyhow::Result<Vec<UserPublic>> {
    let mut out = Vec::new();
    for record in matches::list_owned_with_status(conn, actor.id, status, window)? {
        if let Some(user) = users::get_user(conn, record.target_user_id)? {
            out.push(user.public());
        }
    }
    Ok(out)
}

impl Matchmaker {
    /// Profiles the actor has not saved, skipped or viewed yet.
    pub fn discover(&self, actor: &User, window: Window) -> Result<Vec<UserPublic>> {
        let filter = discover_filter(actor);
        let found = self.db.with_conn(|conn| users::list_candidates(conn, &filter, window))?;
        Ok(found.iter().map(User::public).collect())
    }

    /// Profiles the actor has no match row with at all.
    pub fn recommendations(&self, actor: &User, window: Window) -> Result<Vec<UserPublic>> {
        let filter = CandidateFilter {
            viewer_id: actor.id,
            role: actor.role_intent.complement(),
            hide_statuses: None,
        };
        let found = self.db.with_conn(|conn| users::list_candidates(conn, &filter, window))?;
        Ok(found.iter().map(User::public).collect())
    }

    pub fn saved_profiles(&self, actor: &User, window: Window) -> Result<Vec<UserPublic>> {
        Ok(self
            .db
            .with_conn(|conn| owned_targets(conn, actor, MatchStatus::Saved, window))?)
    }

    pub fn skipped_profiles(&self, actor: &User, window: Window) -> Result<Vec<UserPublic>> {
        Ok(self
            .db
            .with_conn(|conn| owned_targets(conn, actor, MatchStatus::Dismissed, window))?)
    }

    pub fn profile_counts(&self, actor: &User) -> Result<ProfileCounts> {
        let filter = discover_filter(actor);
        Ok(self.db.with_conn(|conn| {
            Ok(ProfileCounts {
                discover_count: users::count_candidates(conn, &filter)?,
                saved_count: matches::count_owned_with_status(conn, actor.id, MatchStatus::Saved)?,
                matches_count: matches::count_open_intros(conn, actor.id)?,
            })
        })?)
    }
}
