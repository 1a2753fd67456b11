//! Review session state machine.
//!
//! A session walks the user through a working set pulled from a
//! [`CardStore`]. `blitz` and `learning` drill every card until it has been
//! answered correctly `mastery_threshold` times in a row; `retaining` shows
//! each due card once, earliest due first, and persists the rescheduled card
//! after every answer.
//!
//! Answers are only accepted while the answer is revealed, and every
//! persisting answer writes to the store before the session moves on. A
//! failed write leaves the session exactly as it was so the same answer can
//! be submitted again.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::repo::{CardQuery, CardStore};
use crate::scheduler::{sort_by_due_date, DueDate, SchedulingPolicy};
use crate::{Card, CardId, CoreError, ReviewMode, Scope};

mod queue;

use queue::StudyQueue;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Active,
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionStats {
    Mastery { completed: usize, total: usize },
    SinglePass { position: usize, total: usize },
}

impl SessionStats {
    pub fn done(&self) -> usize {
        match self {
            SessionStats::Mastery { completed, .. } => *completed,
            SessionStats::SinglePass { position, .. } => *position,
        }
    }

    pub fn total(&self) -> usize {
        match self {
            SessionStats::Mastery { total, .. } | SessionStats::SinglePass { total, .. } => *total,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnswerEffect {
    /// Not mastered yet; the card returns later in this session.
    Requeued {
        streak: u32,
        eligible_at: Option<DateTime<Utc>>,
    },
    /// Reached the mastery threshold and left the queue.
    Mastered { graduated: bool },
    /// Single pass: the card was rescheduled and persisted.
    Rescheduled { due_date: Option<DateTime<Utc>> },
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnswerOutcome {
    /// Answer arrived when none was expected; nothing changed.
    Ignored,
    Answered {
        card_id: CardId,
        correct: bool,
        effect: AnswerEffect,
        /// Set on the answer that completed the session; callers should
        /// refresh any due counts they display.
        finished: Option<SessionStats>,
    },
}

impl AnswerOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, AnswerOutcome::Ignored)
    }

    pub fn finished(&self) -> Option<SessionStats> {
        match self {
            AnswerOutcome::Answered { finished, .. } => *finished,
            AnswerOutcome::Ignored => None,
        }
    }
}

pub struct ReviewSession {
    store: Arc<dyn CardStore>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,

    state: SessionState,
    scope: Option<Scope>,
    mode: Option<ReviewMode>,
    cards: HashMap<CardId, Card>,
    // single pass
    order: Vec<CardId>,
    position: usize,
    // mastery modes
    queue: StudyQueue,
    progress: HashMap<CardId, u32>,

    showing_answer: bool,
    last_answer_at: Option<DateTime<Utc>>,
}

impl ReviewSession {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self::with_config(store, SessionConfig::default())
    }

    pub fn with_config(store: Arc<dyn CardStore>, config: SessionConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn CardStore>, config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
            state: SessionState::Idle,
            scope: None,
            mode: None,
            cards: HashMap::new(),
            order: Vec::new(),
            position: 0,
            queue: StudyQueue::default(),
            progress: HashMap::new(),
            showing_answer: false,
            last_answer_at: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> Option<ReviewMode> {
        self.mode
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Loads the working set for `mode` and activates the session. An empty
    /// working set is not an error: the session stays idle and `false` comes
    /// back.
    pub async fn start(&mut self, scope: Scope, mode: ReviewMode) -> Result<bool, CoreError> {
        self.reset();
        let now = self.clock.now();

        let in_scope = self.store.get_all(&CardQuery::scope(scope.clone())).await?;
        let mut working: Vec<Card> = match mode {
            ReviewMode::Blitz => in_scope,
            ReviewMode::Learning => in_scope
                .into_iter()
                .filter(|c| c.is_learning() || c.policy() == SchedulingPolicy::Interval)
                .collect(),
            ReviewMode::Retaining => in_scope.into_iter().filter(|c| c.is_due(now)).collect(),
        };

        if working.is_empty() {
            info!(%scope, %mode, "no cards available for session");
            return Ok(false);
        }

        if mode.tracks_mastery() {
            if self.config.shuffle {
                working.shuffle(&mut rand::thread_rng());
            }
            self.queue = StudyQueue::new(working.iter().map(|c| c.id));
            self.progress = working.iter().map(|c| (c.id, 0)).collect();
        } else {
            sort_by_due_date(&mut working);
            self.order = working.iter().map(|c| c.id).collect();
        }

        info!(%scope, %mode, cards = working.len(), "review session started");
        self.cards = working.into_iter().map(|c| (c.id, c)).collect();
        self.scope = Some(scope);
        self.mode = Some(mode);
        self.state = SessionState::Active;
        Ok(true)
    }

    /// The card to show now. `None` when idle, complete, or when every
    /// remaining learning card is waiting out its requeue delay.
    pub fn current_card(&self) -> Option<&Card> {
        let id = self.current_id(self.clock.now())?;
        self.cards.get(&id)
    }

    fn current_id(&self, now: DateTime<Utc>) -> Option<CardId> {
        if self.state != SessionState::Active {
            return None;
        }
        match self.mode? {
            ReviewMode::Retaining => self.order.get(self.position).copied(),
            ReviewMode::Blitz | ReviewMode::Learning => self.queue.peek(now),
        }
    }

    pub fn reveal_answer(&mut self) {
        if self.current_card().is_some() {
            self.showing_answer = true;
        }
    }

    pub fn is_answer_revealed(&self) -> bool {
        self.showing_answer
    }

    pub async fn submit_answer(&mut self, success: bool) -> Result<AnswerOutcome, CoreError> {
        let now = self.clock.now();
        if self.state != SessionState::Active || !self.showing_answer {
            return Ok(AnswerOutcome::Ignored);
        }
        if self.within_debounce(now) {
            debug!("answer ignored inside debounce window");
            return Ok(AnswerOutcome::Ignored);
        }
        match self.mode {
            Some(ReviewMode::Retaining) => self.answer_single_pass(success, now).await,
            Some(mode) => self.answer_mastery(mode, success, now).await,
            None => Ok(AnswerOutcome::Ignored),
        }
    }

    fn within_debounce(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_answer_at else {
            return false;
        };
        (now - last)
            .to_std()
            .map(|elapsed| elapsed < self.config.debounce)
            .unwrap_or(false)
    }

    async fn answer_single_pass(&mut self, success: bool, now: DateTime<Utc>) -> Result<AnswerOutcome, CoreError> {
        let Some(id) = self.order.get(self.position).copied() else {
            return Ok(AnswerOutcome::Ignored);
        };
        let Some(mut updated) = self.cards.get(&id).cloned() else {
            return Ok(AnswerOutcome::Ignored);
        };
        updated.apply_retention_answer(success, now);
        if let Err(e) = self.store.put(&updated).await {
            warn!(card_id = %id, error = %e, "failed to persist review; answer not applied");
            return Err(e);
        }

        debug!(card_id = %id, success, due = ?updated.due_date(), "card rescheduled");
        let effect = AnswerEffect::Rescheduled {
            due_date: updated.due_date(),
        };
        self.cards.insert(id, updated);
        self.position += 1;
        Ok(self.settle(id, success, effect, now))
    }

    async fn answer_mastery(
        &mut self,
        mode: ReviewMode,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, CoreError> {
        self.queue.promote(now);
        let Some(id) = self.queue.front() else {
            return Ok(AnswerOutcome::Ignored);
        };
        let threshold = self.config.mastery_threshold.max(1);
        let streak = if success {
            self.progress.get(&id).copied().unwrap_or(0) + 1
        } else {
            0
        };

        let effect = if streak >= threshold {
            let graduated = if mode == ReviewMode::Learning {
                self.graduate(id, now).await?
            } else {
                false
            };
            self.queue.pop_front();
            AnswerEffect::Mastered { graduated }
        } else if success && mode == ReviewMode::Learning && self.waits_after_success(id) {
            let eligible_at = chrono::Duration::from_std(self.config.learning_requeue_delay)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(now);
            self.queue.delay_front(eligible_at);
            AnswerEffect::Requeued {
                streak,
                eligible_at: Some(eligible_at),
            }
        } else {
            self.queue.rotate_to_back();
            AnswerEffect::Requeued {
                streak,
                eligible_at: None,
            }
        };

        debug!(card_id = %id, success, streak, "mastery progress");
        self.progress.insert(id, streak);
        Ok(self.settle(id, success, effect, now))
    }

    /// Only interval-policy cards sit out the requeue delay; mode-policy
    /// learning cards drill like blitz.
    fn waits_after_success(&self, id: CardId) -> bool {
        !self.config.learning_requeue_delay.is_zero()
            && self
                .cards
                .get(&id)
                .is_some_and(|c| c.policy() == SchedulingPolicy::Interval)
    }

    /// Persists graduation before the card leaves the queue. Returns whether
    /// the card changed mode; interval cards graduate in-session only.
    async fn graduate(&mut self, id: CardId, now: DateTime<Utc>) -> Result<bool, CoreError> {
        let Some(mut updated) = self.cards.get(&id).cloned() else {
            return Ok(false);
        };
        if !updated.graduate(now) {
            return Ok(false);
        }
        if let Err(e) = self.store.put(&updated).await {
            warn!(card_id = %id, error = %e, "failed to persist graduation; answer not applied");
            return Err(e);
        }
        info!(card_id = %id, "card graduated to retaining");
        self.cards.insert(id, updated);
        Ok(true)
    }

    fn settle(&mut self, card_id: CardId, correct: bool, effect: AnswerEffect, now: DateTime<Utc>) -> AnswerOutcome {
        self.showing_answer = false;
        self.last_answer_at = Some(now);
        let finished = if self.check_complete() {
            self.state = SessionState::Complete;
            let stats = self.stats();
            info!(mode = ?self.mode, stats = ?stats, "review session complete");
            stats
        } else {
            None
        };
        AnswerOutcome::Answered {
            card_id,
            correct,
            effect,
            finished,
        }
    }

    fn check_complete(&self) -> bool {
        match self.mode {
            Some(ReviewMode::Retaining) => self.position >= self.order.len(),
            Some(_) => self.all_mastered(),
            None => false,
        }
    }

    fn all_mastered(&self) -> bool {
        if self.queue.is_empty() {
            return true;
        }
        let threshold = self.config.mastery_threshold.max(1);
        self.progress.values().all(|count| *count >= threshold)
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn stats(&self) -> Option<SessionStats> {
        match self.mode? {
            ReviewMode::Retaining => Some(SessionStats::SinglePass {
                position: self.position,
                total: self.order.len(),
            }),
            ReviewMode::Blitz | ReviewMode::Learning => {
                let threshold = self.config.mastery_threshold.max(1);
                Some(SessionStats::Mastery {
                    completed: self.progress.values().filter(|c| **c >= threshold).count(),
                    total: self.progress.len(),
                })
            }
        }
    }

    /// Consecutive correct answers for a card in this session.
    pub fn progress(&self, card_id: CardId) -> u32 {
        self.progress.get(&card_id).copied().unwrap_or(0)
    }

    pub fn is_mastered(&self, card_id: CardId) -> bool {
        self.progress(card_id) >= self.config.mastery_threshold.max(1)
    }

    /// Cards not yet mastered (mastery modes) or not yet shown (single pass).
    pub fn remaining(&self) -> usize {
        match self.mode {
            Some(ReviewMode::Retaining) => self.order.len().saturating_sub(self.position),
            Some(_) => self.queue.len(),
            None => 0,
        }
    }

    /// When no card is available only because learning cards are waiting
    /// out their delay, the instant the first one becomes available.
    pub fn next_wake(&self) -> Option<DateTime<Utc>> {
        if self.state != SessionState::Active || self.current_card().is_some() {
            return None;
        }
        self.queue.next_eligible_at()
    }

    pub fn time_until_next(&self) -> Option<std::time::Duration> {
        let wake = self.next_wake()?;
        Some((wake - self.clock.now()).to_std().unwrap_or_default())
    }

    /// Abandons the session. Only answers that already completed have been
    /// persisted.
    pub fn exit(&mut self) {
        if self.state == SessionState::Active {
            info!(mode = ?self.mode, stats = ?self.stats(), "review session exited early");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.scope = None;
        self.mode = None;
        self.cards.clear();
        self.order.clear();
        self.position = 0;
        self.queue = StudyQueue::default();
        self.progress.clear();
        self.showing_answer = false;
        self.last_answer_at = None;
    }
}
