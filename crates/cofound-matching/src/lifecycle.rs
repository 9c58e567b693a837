use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use cofound_db::queries::Window;
use cofound_db::rows::truncate_ts;
use cofound_db::{Connection, matches, messages, users};
use cofound_types::api::MatchWithUser;
use cofound_types::models::{Match, MatchScores, MatchStatus, Message, MessageType, User};

use crate::Matchmaker;
use crate::error::{MatchError, Result};
use crate::limits::{INTRO_MESSAGE_MAX, INTRO_MESSAGE_MIN, INTRO_RESPONSE_MAX, check_length, intro_window};

/// Result of [`Matchmaker::invite`].
#[derive(Debug, Clone)]
pub struct InviteOutcome {
    pub record: Match,
    /// Quota left after this invite was counted.
    pub invites_remaining: u32,
    /// True when the other party had already asked for an introduction and
    /// both rows were moved to `connected`.
    pub auto_connected: bool,
}

fn new_match(user_id: Uuid, target_user_id: Uuid, status: MatchStatus, now: DateTime<Utc>) -> Match {
    Match {
        id: Uuid::new_v4(),
        user_id,
        target_user_id,
        scores: MatchScores::default(),
        status,
        intro_requested_at: None,
        intro_accepted_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn intro_message(
    match_id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    kind: MessageType,
    content: &str,
    now: DateTime<Utc>,
) -> Message {
    Message {
        id: Uuid::new_v4(),
        match_id,
        sender_id,
        recipient_id,
        content: content.to_string(),
        message_type: kind,
        is_read: false,
        read_at: None,
        created_at: now,
    }
}

fn load_match(conn: &Connection, match_id: Uuid) -> Result<Match> {
    matches::get_match(conn, match_id)?.ok_or_else(|| MatchError::not_found("Match not found"))
}

impl Matchmaker {
    /// Number of introductions `actor_id` made inside the rolling window.
    fn recent_intros(&self, conn: &Connection, actor_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
        Ok(matches::count_intros_since(conn, actor_id, now - intro_window())?)
    }

    /// Invite a profile straight from discovery: creates or upgrades the
    /// actor's row and sends the intro message in one step. If the target
    /// already asked for an introduction to the actor, both rows become
    /// `connected`.
    ///
    /// The mirror-row read and the two writes are not guarded against both
    /// users inviting each other at the same instant; each row still ends in
    /// a valid state.
    pub fn invite(&self, actor: &User, target_id: Uuid, message: &str, now: DateTime<Utc>) -> Result<InviteOutcome> {
        check_length("message", message, INTRO_MESSAGE_MIN, INTRO_MESSAGE_MAX)?;
        if target_id == actor.id {
            return Err(MatchError::invalid_input("Cannot invite yourself"));
        }
        let now = truncate_ts(now);
        let limit = self.limits.intro_weekly as u64;

        self.db.transaction(|conn| {
            users::get_visible_user(conn, target_id)?
                .ok_or_else(|| MatchError::not_found("Profile not found"))?;

            let existing = matches::get_by_pair(conn, actor.id, target_id)?;
            if let Some(m) = &existing {
                if m.intro_requested_at.is_some() {
                    return Err(MatchError::AlreadyRequested);
                }
                if m.intro_accepted_at.is_some() {
                    return Err(MatchError::AlreadyConnected);
                }
            }

            let recent = self.recent_intros(conn, actor.id, now)?;
            if recent >= limit {
                let remaining = limit.saturating_sub(recent) as u32;
                warn!("Invite quota exhausted for {} ({} in the last week)", actor.id, recent);
                return Err(MatchError::RateLimited {
                    message: format!(
                        "Maximum of {} invitations per week. You have {} invites left.",
                        limit, remaining
                    ),
                    remaining,
                });
            }
            let invites_remaining = limit.saturating_sub(recent + 1) as u32;

            let reciprocal = matches::get_requested_by_pair(conn, target_id, actor.id)?;
            let is_new = existing.is_none();
            let mut record = existing
                .unwrap_or_else(|| new_match(actor.id, target_id, MatchStatus::IntroRequested, now));

            record.intro_requested_at = Some(now);
            record.updated_at = now;
            let auto_connected = match reciprocal {
                Some(mut mirror) => {
                    record.status = MatchStatus::Connected;
                    record.intro_accepted_at = Some(now);

                    mirror.status = MatchStatus::Connected;
                    mirror.intro_accepted_at = Some(now);
                    mirror.updated_at = now;
                    matches::update_lifecycle(conn, &mirror)?;
                    true
                }
                None => {
                    record.status = MatchStatus::IntroRequested;
                    false
                }
            };

            if is_new {
                matches::insert_match(conn, &record)?;
            } else {
                matches::update_lifecycle(conn, &record)?;
            }

            messages::insert_message(
                conn,
                &intro_message(record.id, actor.id, target_id, MessageType::IntroRequest, message, now),
            )?;

            if auto_connected {
                info!("Reciprocal invite: {} and {} are now connected", actor.id, target_id);
            } else {
                info!("Invite sent from {} to {} (match {})", actor.id, target_id, record.id);
            }

            Ok(InviteOutcome {
                record,
                invites_remaining,
                auto_connected,
            })
        })
    }

    /// Ask for an introduction on a match the actor owns. Unlike `invite`,
    /// this never checks the mirror row, so it cannot auto-connect.
    pub fn request_introduction(
        &self,
        actor: &User,
        match_id: Uuid,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<Match> {
        check_length("message", message, INTRO_MESSAGE_MIN, INTRO_MESSAGE_MAX)?;
        let now = truncate_ts(now);
        let limit = self.limits.intro_weekly as u64;

        self.db.transaction(|conn| {
            let mut record = load_match(conn, match_id)?;
            if record.user_id != actor.id {
                return Err(MatchError::forbidden(
                    "You can only request introductions for your own matches",
                ));
            }
            if record.intro_requested_at.is_some() {
                return Err(MatchError::invalid_state("Introduction already requested for this match"));
            }
            if record.intro_accepted_at.is_some() {
                return Err(MatchError::invalid_state("Already connected with this user"));
            }

            let recent = self.recent_intros(conn, actor.id, now)?;
            if recent >= limit {
                warn!("Intro request quota exhausted for {} ({} in the last week)", actor.id, recent);
                return Err(MatchError::RateLimited {
                    message: format!(
                        "Maximum of {} introduction requests per week. Please try again next week.",
                        limit
                    ),
                    remaining: 0,
                });
            }

            record.status = MatchStatus::IntroRequested;
            record.intro_requested_at = Some(now);
            record.updated_at = now;
            matches::update_lifecycle(conn, &record)?;

            messages::insert_message(
                conn,
                &intro_message(
                    record.id,
                    actor.id,
                    record.target_user_id,
                    MessageType::IntroRequest,
                    message,
                    now,
                ),
            )?;

            info!("Introduction requested on match {} by {}", record.id, actor.id);
            Ok(record)
        })
    }

    /// Accept or decline an introduction addressed to the actor. A non-empty
    /// `note` is delivered to the requester either way.
    pub fn respond_to_introduction(
        &self,
        actor: &User,
        match_id: Uuid,
        accept: bool,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Match> {
        if let Some(note) = note {
            check_length("message", note, 0, INTRO_RESPONSE_MAX)?;
        }
        let now = truncate_ts(now);

        self.db.transaction(|conn| {
            let mut record = load_match(conn, match_id)?;
            if record.target_user_id != actor.id {
                return Err(MatchError::forbidden(
                    "You can only respond to introduction requests sent to you",
                ));
            }
            if record.intro_requested_at.is_none() {
                return Err(MatchError::invalid_state("No introduction request found for this match"));
            }
            if record.intro_accepted_at.is_some() {
                return Err(MatchError::invalid_state("Introduction already accepted"));
            }

            if accept {
                record.status = MatchStatus::Connected;
                record.intro_accepted_at = Some(now);
            } else {
                record.status = MatchStatus::Dismissed;
            }
            record.updated_at = now;
            matches::update_lifecycle(conn, &record)?;

            if let Some(note) = note.filter(|n| !n.is_empty()) {
                messages::insert_message(
                    conn,
                    &intro_message(
                        record.id,
                        actor.id,
                        record.user_id,
                        MessageType::IntroResponse,
                        note,
                        now,
                    ),
                )?;
            }

            info!(
                "Introduction on match {} {} by {}",
                record.id,
                if accept { "accepted" } else { "declined" },
                actor.id
            );
            Ok(record)
        })
    }

    /// Passive status changes (`viewed`, `saved`, `dismissed`) by either
    /// participant. Once an introduction was requested only `viewed` is
    /// still accepted.
    pub fn update_status(&self, actor: &User, match_id: Uuid, status: &str, now: DateTime<Utc>) -> Result<Match> {
        let status = status
            .parse::<MatchStatus>()
            .ok()
            .filter(MatchStatus::is_user_settable)
            .ok_or_else(|| {
                let allowed: Vec<&str> = MatchStatus::USER_SETTABLE.iter().map(|s| s.as_str()).collect();
                MatchError::invalid_input(format!("Status must be one of: {}", allowed.join(", ")))
            })?;
        let now = truncate_ts(now);

        self.db.transaction(|conn| {
            let mut record = load_match(conn, match_id)?;
            if !record.is_participant(actor.id) {
                return Err(MatchError::forbidden("Not authorized to update this match"));
            }
            if record.intro_requested_at.is_some()
                && matches!(status, MatchStatus::Saved | MatchStatus::Dismissed)
            {
                return Err(MatchError::invalid_state(
                    "Cannot change status after introduction request has been sent",
                ));
            }

            record.status = status;
            record.updated_at = now;
            matches::update_lifecycle(conn, &record)?;
            Ok(record)
        })
    }

    /// Matches in either direction, newest first. Rows whose other party is
    /// inactive or banned are left out rather than reported.
    pub fn list_matches(&self, actor: &User, status_filter: Option<&str>, window: Window) -> Result<Vec<MatchWithUser>> {
        let status = status_filter
            .map(|s| {
                s.parse::<MatchStatus>()
                    .map_err(|e| MatchError::invalid_input(e.to_string()))
            })
            .transpose()?;

        self.db.with_conn(|conn| {
            let rows = matches::list_for_participant(conn, actor.id, status, window)?;
            let mut out = Vec::with_capacity(rows.len());
            for record in rows {
                let other = record.other_party(actor.id);
                if let Some(user) = users::get_visible_user(conn, other)? {
                    out.push(MatchWithUser {
                        record,
                        target_user: user.public(),
                    });
                }
            }
            Ok(out)
        })
        .map_err(MatchError::from)
    }

    pub fn get_match(&self, actor: &User, match_id: Uuid) -> Result<MatchWithUser> {
        self.db.transaction(|conn| {
            let record = load_match(conn, match_id)?;
            if !record.is_participant(actor.id) {
                return Err(MatchError::forbidden("Not authorized to view this match"));
            }
            let other = users::get_visible_user(conn, record.other_party(actor.id))?
                .ok_or_else(|| MatchError::not_found("Target user not found"))?;
            Ok(MatchWithUser {
                record,
                target_user: other.public(),
            })
        })
    }

    pub fn save_profile(&self, actor: &User, target_id: Uuid, now: DateTime<Utc>) -> Result<Match> {
        self.mark_profile(actor, target_id, MatchStatus::Saved, now)
    }

    pub fn skip_profile(&self, actor: &User, target_id: Uuid, now: DateTime<Utc>) -> Result<Match> {
        self.mark_profile(actor, target_id, MatchStatus::Dismissed, now)
    }

    /// Upsert the actor's row with `status`, leaving intro fields alone.
    fn mark_profile(&self, actor: &User, target_id: Uuid, status: MatchStatus, now: DateTime<Utc>) -> Result<Match> {
        if target_id == actor.id {
            let verb = if status == MatchStatus::Saved { "save" } else { "skip" };
            return Err(MatchError::invalid_input(format!("Cannot {verb} your own profile")));
        }
        let now = truncate_ts(now);

        self.db.transaction(|conn| {
            users::get_active_user(conn, target_id)?
                .ok_or_else(|| MatchError::not_found("Profile not found"))?;

            match matches::get_by_pair(conn, actor.id, target_id)? {
                Some(mut record) => {
                    record.status = status;
                    record.updated_at = now;
                    matches::update_lifecycle(conn, &record)?;
                    Ok(record)
                }
                None => {
                    let record = new_match(actor.id, target_id, status, now);
                    matches::insert_match(conn, &record)?;
                    Ok(record)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use cofound_types::models::RoleIntent;

    use super::*;
    use crate::ErrorKind;
    use crate::fixtures::{add_user, base_time, intro_text, matchmaker, set_flags};

    fn pair_row(mm: &Matchmaker, a: &User, b: &User) -> Option<Match> {
        mm.db().with_conn(|conn| matches::get_by_pair(conn, a.id, b.id)).unwrap()
    }

    fn thread(mm: &Matchmaker, match_id: Uuid) -> Vec<Message> {
        mm.db()
            .with_conn(|conn| messages::list_for_match(conn, match_id, Window::new(0, 100)))
            .unwrap()
    }

    fn message_count(mm: &Matchmaker) -> i64 {
        mm.db()
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn invite_creates_intro_request() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);

        let out = mm.invite(&a, b.id, &intro_text(), base_time()).unwrap();
        assert!(!out.auto_connected);
        assert_eq!(out.invites_remaining, 19);
        assert_eq!(out.record.status, MatchStatus::IntroRequested);

        let row = pair_row(&mm, &a, &b).unwrap();
        assert_eq!(row.status, MatchStatus::IntroRequested);
        assert_eq!(row.intro_requested_at, Some(base_time()));
        assert!(row.intro_accepted_at.is_none());

        let msgs = thread(&mm, row.id);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].message_type, MessageType::IntroRequest);
        assert_eq!(msgs[0].recipient_id, b.id);
        assert_eq!(msgs[0].content.chars().count(), 120);
    }

    #[test]
    fn second_invite_never_duplicates() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);

        mm.invite(&a, b.id, &intro_text(), base_time()).unwrap();
        let err = mm.invite(&a, b.id, &intro_text(), base_time()).unwrap_err();
        assert!(matches!(err, MatchError::AlreadyRequested));
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let rows: i64 = mm
            .db()
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM matches", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn reciprocal_invite_connects_both_rows() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);

        mm.invite(&b, a.id, &intro_text(), base_time()).unwrap();
        let before = message_count(&mm);

        let later = base_time() + Duration::hours(2);
        let out = mm.invite(&a, b.id, &intro_text(), later).unwrap();
        assert!(out.auto_connected);
        assert_eq!(message_count(&mm), before + 1);

        let ab = pair_row(&mm, &a, &b).unwrap();
        let ba = pair_row(&mm, &b, &a).unwrap();
        assert_eq!(ab.status, MatchStatus::Connected);
        assert_eq!(ba.status, MatchStatus::Connected);
        assert_eq!(ab.intro_requested_at, Some(later));
        assert_eq!(ab.intro_accepted_at, Some(later));
        assert_eq!(ba.intro_accepted_at, Some(later));
        assert_eq!(ba.intro_requested_at, Some(base_time()));

        let msgs = thread(&mm, ab.id);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].sender_id, a.id);

        // Already connected rows still report "already requested" first.
        let err = mm.invite(&a, b.id, &intro_text(), later).unwrap_err();
        assert!(matches!(err, MatchError::AlreadyRequested));
    }

    #[test]
    fn invite_upgrades_saved_row_in_place() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);

        let saved = mm.save_profile(&a, b.id, base_time()).unwrap();
        let out = mm.invite(&a, b.id, &intro_text(), base_time()).unwrap();
        assert_eq!(out.record.id, saved.id);
        assert_eq!(pair_row(&mm, &a, &b).unwrap().status, MatchStatus::IntroRequested);
    }

    #[test]
    fn invite_rejects_self_and_hidden_targets() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let banned = add_user(&mm, "banned", RoleIntent::Cofounder);
        set_flags(&mm, &banned, true, true);

        let err = mm.invite(&a, a.id, &intro_text(), base_time()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = mm.invite(&a, banned.id, &intro_text(), base_time()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = mm.invite(&a, Uuid::new_v4(), &intro_text(), base_time()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = mm.invite(&a, banned.id, "too short", base_time()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn weekly_invite_quota() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::EarlyEmployee);
        let targets: Vec<User> = (0..21)
            .map(|i| add_user(&mm, &format!("t{i}"), RoleIntent::Founder))
            .collect();

        for (i, t) in targets.iter().take(20).enumerate() {
            let out = mm.invite(&a, t.id, &intro_text(), base_time()).unwrap();
            assert_eq!(out.invites_remaining, 19 - i as u32);
        }

        let err = mm.invite(&a, targets[20].id, &intro_text(), base_time()).unwrap_err();
        match err {
            MatchError::RateLimited { message, remaining } => {
                assert_eq!(remaining, 0);
                assert!(message.contains("0 invites left"));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
        assert!(pair_row(&mm, &a, &targets[20]).is_none());
    }

    #[test]
    fn invites_older_than_a_week_do_not_count() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::EarlyEmployee);
        let old = base_time() - Duration::days(8);
        for i in 0..20 {
            let t = add_user(&mm, &format!("old{i}"), RoleIntent::Founder);
            mm.invite(&a, t.id, &intro_text(), old).unwrap();
        }

        let fresh = add_user(&mm, "fresh", RoleIntent::Founder);
        let out = mm.invite(&a, fresh.id, &intro_text(), base_time()).unwrap();
        assert_eq!(out.invites_remaining, 19);
    }

    #[test]
    fn request_introduction_on_owned_match() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);
        let saved = mm.save_profile(&a, b.id, base_time()).unwrap();

        let err = mm
            .request_introduction(&b, saved.id, &intro_text(), base_time())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let m = mm.request_introduction(&a, saved.id, &intro_text(), base_time()).unwrap();
        assert_eq!(m.status, MatchStatus::IntroRequested);
        assert_eq!(m.intro_requested_at, Some(base_time()));
        assert_eq!(thread(&mm, saved.id).len(), 1);

        let err = mm
            .request_introduction(&a, saved.id, &intro_text(), base_time())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let err = mm
            .request_introduction(&a, Uuid::new_v4(), &intro_text(), base_time())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn request_introduction_does_not_auto_connect() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);

        mm.invite(&b, a.id, &intro_text(), base_time()).unwrap();
        let saved = mm.save_profile(&a, b.id, base_time()).unwrap();
        let m = mm.request_introduction(&a, saved.id, &intro_text(), base_time()).unwrap();

        assert_eq!(m.status, MatchStatus::IntroRequested);
        assert_eq!(pair_row(&mm, &b, &a).unwrap().status, MatchStatus::IntroRequested);
    }

    #[test]
    fn request_introduction_shares_weekly_quota() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::EarlyEmployee);
        for i in 0..20 {
            let t = add_user(&mm, &format!("t{i}"), RoleIntent::Founder);
            mm.invite(&a, t.id, &intro_text(), base_time()).unwrap();
        }
        let extra = add_user(&mm, "extra", RoleIntent::Founder);
        let saved = mm.save_profile(&a, extra.id, base_time()).unwrap();

        let err = mm
            .request_introduction(&a, saved.id, &intro_text(), base_time())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(pair_row(&mm, &a, &extra).unwrap().status, MatchStatus::Saved);
    }

    #[test]
    fn respond_accept_and_decline() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);
        let c = add_user(&mm, "c", RoleIntent::Cofounder);

        let ab = mm.invite(&a, b.id, &intro_text(), base_time()).unwrap().record;
        let err = mm
            .respond_to_introduction(&a, ab.id, true, None, base_time())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let later = base_time() + Duration::minutes(5);
        let m = mm
            .respond_to_introduction(&b, ab.id, true, Some("Happy to chat!"), later)
            .unwrap();
        assert_eq!(m.status, MatchStatus::Connected);
        assert_eq!(m.intro_accepted_at, Some(later));
        let msgs = thread(&mm, ab.id);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].message_type, MessageType::IntroResponse);
        assert_eq!(msgs[1].recipient_id, a.id);

        let err = mm
            .respond_to_introduction(&b, ab.id, true, None, later)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let ac = mm.invite(&a, c.id, &intro_text(), base_time()).unwrap().record;
        let m = mm.respond_to_introduction(&c, ac.id, false, Some(""), later).unwrap();
        assert_eq!(m.status, MatchStatus::Dismissed);
        assert!(m.intro_accepted_at.is_none());
        assert_eq!(thread(&mm, ac.id).len(), 1);
    }

    #[test]
    fn respond_requires_pending_request() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);
        let saved = mm.save_profile(&a, b.id, base_time()).unwrap();

        let err = mm
            .respond_to_introduction(&b, saved.id, true, None, base_time())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn update_status_rules() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);
        let c = add_user(&mm, "c", RoleIntent::Cofounder);
        let saved = mm.save_profile(&a, b.id, base_time()).unwrap();

        let m = mm.update_status(&b, saved.id, "viewed", base_time()).unwrap();
        assert_eq!(m.status, MatchStatus::Viewed);

        let err = mm.update_status(&a, saved.id, "connected", base_time()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = mm.update_status(&c, saved.id, "saved", base_time()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        mm.request_introduction(&a, saved.id, &intro_text(), base_time()).unwrap();
        for status in ["saved", "dismissed"] {
            let err = mm.update_status(&a, saved.id, status, base_time()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState);
        }
        let m = mm.update_status(&a, saved.id, "viewed", base_time()).unwrap();
        assert_eq!(m.status, MatchStatus::Viewed);
        assert!(m.intro_requested_at.is_some());
    }

    #[test]
    fn list_matches_hides_banned_counterparts() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);
        let c = add_user(&mm, "c", RoleIntent::Cofounder);

        mm.save_profile(&a, b.id, base_time()).unwrap();
        mm.invite(&c, a.id, &intro_text(), base_time() + Duration::minutes(1)).unwrap();

        let all = mm.list_matches(&a, None, Window::new(0, 50)).unwrap();
        let names: Vec<_> = all.iter().map(|m| m.target_user.name.clone()).collect();
        assert_eq!(names, vec!["c", "b"]);

        let requested = mm
            .list_matches(&a, Some("intro_requested"), Window::new(0, 50))
            .unwrap();
        assert_eq!(requested.len(), 1);

        set_flags(&mm, &c, true, true);
        let all = mm.list_matches(&a, None, Window::new(0, 50)).unwrap();
        assert_eq!(all.len(), 1);

        let err = mm.list_matches(&a, Some("bogus"), Window::new(0, 50)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn get_match_checks_participants() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);
        let c = add_user(&mm, "c", RoleIntent::Cofounder);
        let m = mm.save_profile(&a, b.id, base_time()).unwrap();

        assert_eq!(mm.get_match(&b, m.id).unwrap().target_user.id, a.id);
        assert_eq!(mm.get_match(&c, m.id).unwrap_err().kind(), ErrorKind::Forbidden);

        set_flags(&mm, &b, false, false);
        assert_eq!(mm.get_match(&a, m.id).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn save_and_skip_upsert() {
        let mm = matchmaker();
        let a = add_user(&mm, "a", RoleIntent::Founder);
        let b = add_user(&mm, "b", RoleIntent::Cofounder);

        let saved = mm.save_profile(&a, b.id, base_time()).unwrap();
        assert_eq!(saved.scores, MatchScores::default());
        let skipped = mm.skip_profile(&a, b.id, base_time()).unwrap();
        assert_eq!(skipped.id, saved.id);
        assert_eq!(pair_row(&mm, &a, &b).unwrap().status, MatchStatus::Dismissed);

        let err = mm.save_profile(&a, a.id, base_time()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        set_flags(&mm, &b, false, false);
        let err = mm.skip_profile(&a, b.id, base_time()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
