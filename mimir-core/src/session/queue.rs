use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use crate::CardId;

/// Working queue for the mastery modes: a ready ring that rotates in O(1)
/// and a min-heap of cards sitting out a requeue delay.
#[derive(Debug, Default)]
pub(crate) struct StudyQueue {
    ready: VecDeque<CardId>,
    // (eligible_at, insertion seq, card); seq keeps equal times FIFO
    delayed: BinaryHeap<Reverse<(DateTime<Utc>, u64, CardId)>>,
    seq: u64,
}

impl StudyQueue {
    pub(crate) fn new(ids: impl IntoIterator<Item = CardId>) -> Self {
        Self {
            ready: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// The card that would be served at `now`, without mutating anything.
    pub(crate) fn peek(&self, now: DateTime<Utc>) -> Option<CardId> {
        if let Some(id) = self.ready.front() {
            return Some(*id);
        }
        self.delayed
            .peek()
            .filter(|Reverse((at, _, _))| *at <= now)
            .map(|Reverse((_, _, id))| *id)
    }

    /// Moves every delayed card whose time has come onto the ready tail.
    pub(crate) fn promote(&mut self, now: DateTime<Utc>) {
        while let Some(Reverse((at, _, _))) = self.delayed.peek() {
            if *at > now {
                break;
            }
            if let Some(Reverse((_, _, id))) = self.delayed.pop() {
                self.ready.push_back(id);
            }
        }
    }

    pub(crate) fn front(&self) -> Option<CardId> {
        self.ready.front().copied()
    }

    pub(crate) fn pop_front(&mut self) -> Option<CardId> {
        self.ready.pop_front()
    }

    pub(crate) fn rotate_to_back(&mut self) {
        if let Some(id) = self.ready.pop_front() {
            self.ready.push_back(id);
        }
    }

    pub(crate) fn delay_front(&mut self, until: DateTime<Utc>) {
        if let Some(id) = self.ready.pop_front() {
            self.seq += 1;
            self.delayed.push(Reverse((until, self.seq, id)));
        }
    }

    pub(crate) fn next_eligible_at(&self) -> Option<DateTime<Utc>> {
        self.delayed.peek().map(|Reverse((at, _, _))| *at)
    }

    pub(crate) fn len(&self) -> usize {
        self.ready.len() + self.delayed.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn rotate_moves_front_to_tail() {
        let ids: Vec<CardId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut q = StudyQueue::new(ids.clone());
        q.rotate_to_back();
        assert_eq!(q.front(), Some(ids[1]));
        q.pop_front();
        q.pop_front();
        assert_eq!(q.front(), Some(ids[0]));
    }

    #[test]
    fn delayed_cards_come_back_in_eligible_order() {
        let now = Utc::now();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut q = StudyQueue::new([a, b]);
        q.delay_front(now + Duration::seconds(30));
        q.delay_front(now + Duration::seconds(10));

        assert_eq!(q.peek(now), None);
        assert_eq!(q.next_eligible_at(), Some(now + Duration::seconds(10)));
        assert_eq!(q.peek(now + Duration::seconds(10)), Some(b));

        q.promote(now + Duration::seconds(60));
        assert_eq!(q.pop_front(), Some(b));
        assert_eq!(q.pop_front(), Some(a));
        assert!(q.is_empty());
    }
}
