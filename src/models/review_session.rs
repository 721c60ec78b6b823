//! Review session management for one sitting of spaced repetition practice.
//! Handles multi-round review of the due set with grades recorded in the store.

use super::{Grade, ReviewItem};
use crate::error::{Result, StoreError};
use crate::store::ReviewStore;
use chrono::{DateTime, Utc};

/// Walks the items that were due when the session started.
/// Items graded `Again` are repeated in subsequent rounds until every item in a
/// round is recalled.
pub struct ReviewSession<'a> {
    store: &'a ReviewStore,
    cards: Vec<ReviewItem>,
    current_round: Vec<usize>,
    current_index: usize,
    failed: Vec<usize>,
    round_number: usize,
    reviewed: usize,
}

impl<'a> ReviewSession<'a> {
    /// Starts a session over the items due at `now`.
    pub fn start(store: &'a ReviewStore, now: DateTime<Utc>) -> Self {
        Self::from_items(store, store.items_due(now))
    }

    pub fn from_items(store: &'a ReviewStore, cards: Vec<ReviewItem>) -> Self {
        let current_round = (0..cards.len()).collect();
        Self {
            store,
            cards,
            current_round,
            current_index: 0,
            failed: Vec::new(),
            round_number: 1,
            reviewed: 0,
        }
    }

    pub fn current(&self) -> Option<&ReviewItem> {
        self.current_round
            .get(self.current_index)
            .and_then(|&idx| self.cards.get(idx))
    }

    /// Records `grade` for the current item and moves on. Returns `None` once
    /// the session is complete.
    ///
    /// If the item was removed from the store since the session started, it is
    /// dropped from the session and `ItemNotFound` is returned. Other errors
    /// leave the session on the same item so the grade can be retried.
    pub fn grade_current(&mut self, grade: Grade, now: DateTime<Utc>) -> Result<Option<ReviewItem>> {
        let Some(&idx) = self.current_round.get(self.current_index) else {
            return Ok(None);
        };
        let id = self.cards[idx].id;

        match self.store.record_grade(id, grade, now) {
            Ok(updated) => {
                self.cards[idx] = updated.clone();
                self.reviewed += 1;
                if !grade.is_success() {
                    self.failed.push(idx);
                }
                self.advance();
                Ok(Some(updated))
            }
            Err(StoreError::ItemNotFound(id)) => {
                self.advance();
                Err(StoreError::ItemNotFound(id))
            }
            Err(e) => Err(e),
        }
    }

    fn advance(&mut self) {
        self.current_index += 1;
        if self.current_index >= self.current_round.len() {
            self.start_next_round();
        }
    }

    /// Starts a new round with the items graded `Again` in this one.
    /// If there are none, the session is complete.
    fn start_next_round(&mut self) {
        self.current_round = std::mem::take(&mut self.failed);
        self.current_index = 0;
        if !self.current_round.is_empty() {
            self.round_number += 1;
        }
    }

    pub fn round_number(&self) -> usize {
        self.round_number
    }

    /// Number of grades recorded so far, repeats included.
    pub fn reviewed_count(&self) -> usize {
        self.reviewed
    }

    pub fn total_count(&self) -> usize {
        self.cards.len()
    }

    pub fn remaining_in_round(&self) -> usize {
        self.current_round.len().saturating_sub(self.current_index)
    }

    pub fn is_completed(&self) -> bool {
        self.current_index >= self.current_round.len()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.current_round.len())
        } else {
            format!(
                "Round {} (Review): {} cards to retry",
                self.round_number,
                self.current_round.len()
            )
        }
    }
}
