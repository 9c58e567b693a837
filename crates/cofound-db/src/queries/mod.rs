//! Query functions take a plain `&Connection` so a caller can compose several
//! of them inside one `Database::transaction`.

pub mod matches;
pub mod messages;
pub mod users;

/// Offset/limit window applied in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u32,
    pub limit: u32,
}

impl Window {
    pub const fn new(skip: u32, limit: u32) -> Self {
        Self { skip, limit }
    }
}
