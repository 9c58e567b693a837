use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use cofound_db::queries::Window;
use cofound_db::rows::truncate_ts;
use cofound_db::{Connection, matches, messages, users};
use cofound_types::api::{Conversation, MessageWithSender, UnreadCount};
use cofound_types::models::{Match, MatchStatus, Message, MessageType, User, UserPublic};

use crate::Matchmaker;
use crate::error::{MatchError, Result};
use crate::limits::{CHAT_MESSAGE_MAX, CHAT_MESSAGE_MIN, check_length, message_window};

/// Load a match and check that `actor` takes part in it.
fn participant_match(conn: &Connection, actor: &User, match_id: Uuid, denied: &str) -> Result<Match> {
    let record = matches::get_match(conn, match_id)?
        .ok_or_else(|| MatchError::not_found("Match not found"))?;
    if !record.is_participant(actor.id) {
        return Err(MatchError::forbidden(denied));
    }
    Ok(record)
}

impl Matchmaker {
    /// Post a chat message on a connected match.
    pub fn send_message(
        &self,
        actor: &User,
        match_id: Uuid,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageWithSender> {
        check_length("content", content, CHAT_MESSAGE_MIN, CHAT_MESSAGE_MAX)?;
        let now = truncate_ts(now);
        let limit = self.limits.message_daily as u64;

        self.db.transaction(|conn| {
            let record = participant_match(
                conn,
                actor,
                match_id,
                "Not authorized to send messages for this match",
            )?;
            if record.status != MatchStatus::Connected {
                return Err(MatchError::invalid_state("Messages can only be sent to connected users"));
            }

            let sent = messages::count_sent_since(conn, actor.id, MessageType::Message, now - message_window())?;
            if sent >= limit {
                warn!("Daily message quota exhausted for {} ({} sent)", actor.id, sent);
                return Err(MatchError::RateLimited {
                    message: format!("Maximum of {} messages per day. Please try again tomorrow.", limit),
                    remaining: 0,
                });
            }

            let message = Message {
                id: Uuid::new_v4(),
                match_id: record.id,
                sender_id: actor.id,
                recipient_id: record.other_party(actor.id),
                content: content.to_string(),
                message_type: MessageType::Message,
                is_read: false,
                read_at: None,
                created_at: now,
            };
            messages::insert_message(conn, &message)?;
            matches::touch(conn, record.id, now)?;

            Ok(MessageWithSender {
                record: message,
                sender: Some(actor.public()),
            })
        })
    }

    /// One entry per counterparty across the actor's connected matches, most
    /// recently active first.
    pub fn get_conversations(&self, actor: &User, window: Window) -> Result<Vec<Conversation>> {
        let mut conversations = self.db.with_conn(|conn| {
            let connected = matches::list_connected(conn, actor.id)?;

            // Both directions of a pair can be connected; keep the first seen.
            let mut seen = HashSet::new();
            let mut out = Vec::new();
            for record in connected {
                let other_id = record.other_party(actor.id);
                if !seen.insert(other_id) {
                    continue;
                }
                let Some(other) = users::get_visible_user(conn, other_id)? else {
                    continue;
                };

                let last = messages::last_for_match(conn, record.id)?;
                let unread_count = messages::count_unread(conn, record.id, actor.id)?;

                let mut updated_at = record.updated_at;
                let mut last_message = None;
                if let Some(msg) = last {
                    if msg.created_at > updated_at {
                        updated_at = msg.created_at;
                    }
                    if let Some(sender) = users::get_user(conn, msg.sender_id)? {
                        last_message = Some(MessageWithSender {
                            record: msg,
                            sender: Some(sender.public()),
                        });
                    }
                }

                out.push(Conversation {
                    match_id: record.id,
                    other_user: other.public(),
                    last_message,
                    unread_count,
                    updated_at,
                });
            }
            Ok(out)
        })?;

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations
            .into_iter()
            .skip(window.skip as usize)
            .take(window.limit as usize)
            .collect())
    }

    /// Thread history, oldest first, with each sender's profile attached.
    pub fn get_messages(&self, actor: &User, match_id: Uuid, window: Window) -> Result<Vec<MessageWithSender>> {
        self.db.transaction(|conn| {
            let record = participant_match(
                conn,
                actor,
                match_id,
                "Not authorized to view messages for this match",
            )?;
            if record.status != MatchStatus::Connected {
                return Err(MatchError::invalid_state(
                    "Messages are only available for connected matches",
                ));
            }

            let rows = messages::list_for_match(conn, match_id, window)?;
            let mut senders: HashMap<Uuid, Option<UserPublic>> = HashMap::new();
            let mut out = Vec::with_capacity(rows.len());
            for msg in rows {
                let sender = match senders.get(&msg.sender_id) {
                    Some(cached) => cached.clone(),
                    None => {
                        let found = users::get_user(conn, msg.sender_id)?.map(|u| u.public());
                        senders.insert(msg.sender_id, found.clone());
                        found
                    }
                };
                // Messages from deleted senders are not shown.
                if sender.is_some() {
                    out.push(MessageWithSender { record: msg, sender });
                }
            }
            Ok(out)
        })
    }

    /// Mark one message read. Only its recipient may do so; marking an
    /// already-read message keeps the first `read_at`.
    pub fn mark_read(&self, actor: &User, message_id: Uuid, now: DateTime<Utc>) -> Result<Message> {
        let now = truncate_ts(now);
        self.db.transaction(|conn| {
            let mut msg = messages::get_message(conn, message_id)?
                .ok_or_else(|| MatchError::not_found("Message not found"))?;
            if msg.recipient_id != actor.id {
                return Err(MatchError::forbidden("Not authorized to mark this message as read"));
            }
            if !msg.is_read && messages::mark_read(conn, msg.id, now)? {
                msg.is_read = true;
                msg.read_at = Some(now);
            }
            Ok(msg)
        })
    }

    /// Mark every unread message addressed to the actor in a thread.
    pub fn mark_all_read(&self, actor: &User, match_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
        let now = truncate_ts(now);
        self.db.transaction(|conn| {
            participant_match(conn, actor, match_id, "Not authorized to mark messages for this match")?;
            let marked = messages::mark_all_read(conn, match_id, actor.id, now)?;
            if marked > 0 {
                info!("Marked {} messages read on match {} for {}", marked, match_id, actor.id);
            }
            Ok(marked)
        })
    }

    pub fn unread_count(&self, actor: &User) -> Result<UnreadCount> {
        self.db
            .with_conn(|conn| {
                let mut total_unread = 0;
                let mut conversations = HashMap::new();
                for record in matches::list_connected(conn, actor.id)? {
                    let unread = messages::count_unread(conn, record.id, actor.id)?;
                    if unread > 0 {
                        total_unread += unread;
                        conversations.insert(record.id, unread);
                    }
                }
                Ok(UnreadCount {
                    total_unread,
                    conversations,
                })
            })
            .map_err(MatchError::from)
    }
}
