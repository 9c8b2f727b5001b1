use crate::roster::TrackedPlayer;
use chrono::NaiveDate;
use serenity::all::UserId;
use std::{collections::HashMap, time::Duration};
use tokio::time::Instant;

/// How long the buttons of a multiple-match search stay usable.
pub const SELECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// State which is lost across sessions
pub struct VolatileState {
    pub selections: PendingSelections,
    /// Date, in the configured timezone, the daily schedule was last posted.
    pub schedule_posted_on: Option<NaiveDate>,
    /// `Ready` fires again on every gateway reconnect.
    pub poller_started: bool,
}

impl VolatileState {
    pub fn new() -> Self {
        Self {
            selections: PendingSelections::new(),
            schedule_posted_on: None,
            poller_started: false,
        }
    }

    /// True exactly once, for the caller that should start the poller.
    pub fn claim_poller_start(&mut self) -> bool {
        !std::mem::replace(&mut self.poller_started, true)
    }
}

pub struct PendingSelection {
    pub owner: UserId,
    pub candidates: Vec<TrackedPlayer>,
    created: Instant,
}

#[derive(Debug, PartialEq)]
pub enum SelectionError {
    /// Unknown id, already used, or timed out.
    Expired,
    NotOwner,
}

/// Searches that matched several players, waiting for the requester to pick one.
pub struct PendingSelections {
    next_id: u64,
    pending: HashMap<u64, PendingSelection>,
}

impl PendingSelections {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: HashMap::new(),
        }
    }

    pub fn insert(&mut self, owner: UserId, candidates: Vec<TrackedPlayer>) -> u64 {
        self.insert_at(owner, candidates, Instant::now())
    }

    fn insert_at(&mut self, owner: UserId, candidates: Vec<TrackedPlayer>, created: Instant) -> u64 {
        self.expire(created);

        self.next_id += 1;
        let id = self.next_id;
        self.pending.insert(
            id,
            PendingSelection {
                owner,
                candidates,
                created,
            },
        );
        id
    }

    /// Claim candidate `index` of selection `id`.  The selection is consumed only when `user`
    /// owns it.
    pub fn take(
        &mut self,
        id: u64,
        index: usize,
        user: UserId,
    ) -> Result<TrackedPlayer, SelectionError> {
        self.take_at(id, index, user, Instant::now())
    }

    fn take_at(
        &mut self,
        id: u64,
        index: usize,
        user: UserId,
        now: Instant,
    ) -> Result<TrackedPlayer, SelectionError> {
        self.claim(id, user, now)?
            .candidates
            .into_iter()
            .nth(index)
            .ok_or(SelectionError::Expired)
    }

    pub fn cancel(&mut self, id: u64, user: UserId) -> Result<(), SelectionError> {
        self.claim(id, user, Instant::now()).map(|_| ())
    }

    fn claim(
        &mut self,
        id: u64,
        user: UserId,
        now: Instant,
    ) -> Result<PendingSelection, SelectionError> {
        self.expire(now);

        match self.pending.get(&id) {
            None => Err(SelectionError::Expired),
            Some(selection) if selection.owner != user => Err(SelectionError::NotOwner),
            Some(_) => self.pending.remove(&id).ok_or(SelectionError::Expired),
        }
    }

    fn expire(&mut self, now: Instant) {
        self.pending
            .retain(|_, s| now.duration_since(s.created) < SELECTION_TIMEOUT);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::player;

    fn owner() -> UserId {
        UserId::new(1)
    }

    fn other() -> UserId {
        UserId::new(2)
    }

    fn smiths() -> Vec<TrackedPlayer> {
        vec![player(669257, "Will Smith"), player(519293, "Will Smith")]
    }

    #[test]
    fn owner_claims_chosen_candidate_once() {
        let mut selections = PendingSelections::new();
        let id = selections.insert(owner(), smiths());

        let chosen = selections.take(id, 1, owner()).unwrap();
        assert_eq!(chosen.id, 519293);
        assert_eq!(selections.take(id, 0, owner()), Err(SelectionError::Expired));
    }

    #[test]
    fn other_users_cannot_claim_or_cancel() {
        let mut selections = PendingSelections::new();
        let id = selections.insert(owner(), smiths());

        assert_eq!(selections.take(id, 0, other()), Err(SelectionError::NotOwner));
        assert_eq!(selections.cancel(id, other()), Err(SelectionError::NotOwner));
        assert_eq!(selections.len(), 1);

        selections.cancel(id, owner()).unwrap();
        assert_eq!(selections.len(), 0);
    }

    #[test]
    fn selections_time_out() {
        let mut selections = PendingSelections::new();
        let start = Instant::now();
        let id = selections.insert_at(owner(), smiths(), start);

        let late = start + SELECTION_TIMEOUT + Duration::from_secs(1);
        assert_eq!(
            selections.take_at(id, 0, owner(), late),
            Err(SelectionError::Expired)
        );
    }

    #[test]
    fn poller_is_started_by_the_first_ready_only() {
        let mut vstate = VolatileState::new();
        assert!(vstate.claim_poller_start());
        // Reconnects fire Ready again.
        assert!(!vstate.claim_poller_start());
        assert!(!vstate.claim_poller_start());
    }

    #[test]
    fn ids_are_not_reused() {
        let mut selections = PendingSelections::new();
        let first = selections.insert(owner(), smiths());
        selections.cancel(first, owner()).unwrap();
        let second = selections.insert(owner(), smiths());
        assert_ne!(first, second);
    }
}
