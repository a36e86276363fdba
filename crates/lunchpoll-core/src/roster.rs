//! Community membership roster mirrored into a spreadsheet page.

use serde::{Deserialize, Serialize};

use crate::SheetRow;

/// Header row of the roster page.
pub const ROSTER_HEADER: [&str; 2] = ["User ID", "Display Name"];

/// A community member as reported by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    /// Bot accounts are never mirrored.
    #[serde(default)]
    pub bot: bool,
}

impl Member {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            bot: false,
        }
    }

    fn to_cells(&self) -> SheetRow {
        vec![self.user_id.clone(), self.display_name.clone()]
    }
}

/// Ordered list of human members, at most one entry per user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    members: Vec<Member>,
}

impl Roster {
    /// Builds a roster from a full member listing, dropping bots and
    /// repeated IDs.
    pub fn from_members(members: impl IntoIterator<Item = Member>) -> Self {
        let mut roster = Self::default();
        for member in members {
            roster.add(member);
        }
        roster
    }

    /// Decodes the roster page. A leading header row and rows without a
    /// user ID are skipped.
    pub fn from_rows(rows: &[SheetRow]) -> Self {
        let members = rows.iter().enumerate().filter_map(|(index, row)| {
            let user_id = row.first().map_or("", |c| c.trim());
            if user_id.is_empty() || (index == 0 && user_id == ROSTER_HEADER[0]) {
                return None;
            }
            Some(Member::new(user_id, row.get(1).map_or("", |c| c.trim())))
        });
        Self::from_members(members)
    }

    /// Encodes header plus one row per member.
    pub fn to_rows(&self) -> Vec<SheetRow> {
        std::iter::once(ROSTER_HEADER.iter().map(ToString::to_string).collect())
            .chain(self.members.iter().map(Member::to_cells))
            .collect()
    }

    /// The row to append when `member` joins.
    pub fn row_for(member: &Member) -> SheetRow {
        member.to_cells()
    }

    /// Adds `member`. Returns `false` for bots and already-listed users.
    pub fn add(&mut self, member: Member) -> bool {
        if member.bot || self.contains(&member.user_id) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Removes the member with `user_id`. Returns whether one was present.
    pub fn remove(&mut self, user_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.user_id != user_id);
        self.members.len() != before
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
