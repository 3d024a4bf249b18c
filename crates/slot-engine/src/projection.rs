//! Optimistic, immutable projection of a user's posts.
//!
//! An editing session holds a [`ScheduleBoard`] and moves it forward with
//! [`ScheduleBoard::apply`], which never mutates the board it is called on.
//! Optimistic changes are applied before storage confirms them and are
//! reconciled by slot key and post id, never by position:
//!
//! - a create adds a tentative entry, then either [`BoardEvent::Confirmed`]
//!   swaps in the stored record or [`BoardEvent::Removed`] takes it back out;
//! - an update replaces the entry, and a failed write replaces it again with
//!   the previous version.
//!
//! Both rollbacks restore the board to exactly its pre-call state.

use chrono::NaiveDate;
use tracing::debug;

use crate::grid::{build_grid, SlotGrid};
use crate::model::{AvailabilityRule, PostId, ScheduledPost, SlotKey};

#[derive(Debug, Clone)]
pub enum BoardEvent {
    /// A tentative entry added ahead of persistence.
    Added(ScheduledPost),
    /// Storage confirmed the tentative entry `tentative`; `post` carries the stored id.
    Confirmed {
        tentative: PostId,
        post: ScheduledPost,
    },
    /// An entry replaced wholesale, matched by id.
    Replaced(ScheduledPost),
    /// An entry removed, matched by slot key and id.
    Removed { key: SlotKey, id: PostId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleBoard {
    posts: Vec<ScheduledPost>,
}

impl ScheduleBoard {
    pub fn new(posts: Vec<ScheduledPost>) -> Self {
        Self { posts }
    }

    pub fn posts(&self) -> &[ScheduledPost] {
        &self.posts
    }

    pub fn get(&self, id: &PostId) -> Option<&ScheduledPost> {
        self.posts.iter().find(|post| &post.id == id)
    }

    /// Posts whose slot key equals `key`.
    pub fn at_slot<'a>(&'a self, key: &'a SlotKey) -> impl Iterator<Item = &'a ScheduledPost> + 'a {
        self.posts
            .iter()
            .filter(move |post| post.slot_key().ok().as_ref() == Some(key))
    }

    /// Whether any entry is still awaiting storage confirmation.
    pub fn has_tentative(&self) -> bool {
        self.posts.iter().any(|post| post.id.is_tentative())
    }

    /// The state after `event`. `self` is left untouched.
    pub fn apply(&self, event: BoardEvent) -> ScheduleBoard {
        let mut posts = self.posts.clone();
        match event {
            BoardEvent::Added(post) => {
                debug!(post_id = %post.id, "board: added");
                posts.push(post);
            }
            BoardEvent::Confirmed { tentative, post } => {
                debug!(tentative = %tentative, post_id = %post.id, "board: confirmed");
                match posts.iter_mut().find(|p| p.id == tentative) {
                    Some(slot) => *slot = post,
                    None => posts.push(post),
                }
            }
            BoardEvent::Replaced(post) => {
                debug!(post_id = %post.id, "board: replaced");
                if let Some(slot) = posts.iter_mut().find(|p| p.id == post.id) {
                    *slot = post;
                }
            }
            BoardEvent::Removed { key, id } => {
                debug!(post_id = %id, key = %key, "board: removed");
                posts.retain(|p| !(p.id == id && p.slot_key().ok().as_ref() == Some(&key)));
            }
        }
        ScheduleBoard { posts }
    }

    /// The slot grid for this board's posts.
    pub fn grid(&self, today: NaiveDate, window_days: u32, rules: &[AvailabilityRule]) -> SlotGrid {
        build_grid(today, window_days, rules, &self.posts)
    }
}
