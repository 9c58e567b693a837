//! Match lifecycle, messaging gate and discovery feeds.
//!
//! A `Match` row is directed: `user_id` expressed interest in
//! `target_user_id`. Mutual interest is two rows, reconciled into
//! `connected` by [`Matchmaker::invite`] when the second party invites.
//! Quotas are counted from existing rows inside the request transaction
//! (count, then insert), so concurrent requests from one user can overshoot
//! a limit by a small margin.

pub mod discovery;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod limits;

use std::sync::Arc;

use cofound_db::Database;

pub use error::{ErrorKind, MatchError, Result};
pub use lifecycle::InviteOutcome;
pub use limits::Limits;

#[derive(Clone)]
pub struct Matchmaker {
    db: Arc<Database>,
    limits: Limits,
}

impl Matchmaker {
    pub fn new(db: Arc<Database>, limits: Limits) -> Self {
        Self { db, limits }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }
}
