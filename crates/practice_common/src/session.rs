//! Practice session flow.
//!
//! A `PracticeSession` is the per-login context: current question, the pairs
//! already asked, counters and the feedback flags of the last answer.
//! `PracticeFlow` applies user actions to it and returns a snapshot.
//!
//! Phases: AwaitingAnswer --submit--> ShowingFeedback --next--> AwaitingAnswer

use crate::error::{PracticeError, PracticeResult};
use crate::practice_log::{PracticeEntry, PracticeLog};
use crate::questions::{Question, QuestionGenerator};
use crate::rewards::{RewardCatalog, RewardItem};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Correct answers that make up a full session
pub const PROGRESS_TARGET: u32 = 28;

/// A reward is granted on every Nth cumulative correct answer
pub const REWARD_CADENCE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingAnswer,
    ShowingFeedback,
}

pub struct PracticeSession {
    username: String,
    question: Question,
    asked: HashSet<Question>,
    correct_count: u32,
    answered_count: u32,
    round: u32,
    phase: Phase,
    feedback: Option<String>,
    reward: Option<RewardItem>,
    celebrate: bool,
    disappoint: bool,
    rng: StdRng,
}

impl PracticeSession {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn question(&self) -> Question {
        self.question
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            username: self.username.clone(),
            question: QuestionView {
                minuend: self.question.minuend,
                subtrahend: self.question.subtrahend,
                text: self.question.to_string(),
            },
            phase: self.phase,
            feedback: self.feedback.clone(),
            reward_earned: self.reward.is_some(),
            reward: self.reward.clone(),
            celebrate: self.celebrate,
            disappoint: self.disappoint,
            show_next: self.phase == Phase::ShowingFeedback,
            answered_count: self.answered_count,
            round: self.round,
            progress: Progress::new(self.correct_count),
        }
    }

    fn clear_feedback(&mut self) {
        self.feedback = None;
        self.reward = None;
        self.celebrate = false;
        self.disappoint = false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub minuend: u8,
    pub subtrahend: u8,
    pub text: String,
}

/// Correct answers against the session target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub correct: u32,
    pub target: u32,
    /// Capped at 1.0; practice continues past the target
    pub fraction: f64,
    pub goal_reached: bool,
}

impl Progress {
    pub fn new(correct: u32) -> Self {
        Self {
            correct,
            target: PROGRESS_TARGET,
            fraction: (f64::from(correct) / f64::from(PROGRESS_TARGET)).min(1.0),
            goal_reached: correct >= PROGRESS_TARGET,
        }
    }
}

/// What a client needs to render the practice view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub username: String,
    pub question: QuestionView,
    pub phase: Phase,
    pub feedback: Option<String>,
    pub reward_earned: bool,
    pub reward: Option<RewardItem>,
    pub celebrate: bool,
    pub disappoint: bool,
    pub show_next: bool,
    pub answered_count: u32,
    pub round: u32,
    pub progress: Progress,
}

/// True when the k-th cumulative correct answer earns a reward
pub fn reward_due(correct_count: u32) -> bool {
    correct_count > 0 && correct_count % REWARD_CADENCE == 0
}

#[derive(Clone)]
pub struct PracticeFlow {
    log: PracticeLog,
    catalog: Arc<RewardCatalog>,
    generator: QuestionGenerator,
}

impl PracticeFlow {
    pub fn new(
        log: PracticeLog,
        catalog: Arc<RewardCatalog>,
        generator: QuestionGenerator,
    ) -> Self {
        Self {
            log,
            catalog,
            generator,
        }
    }

    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    /// Fresh session for a user who just logged in
    pub fn start(&self, username: &str) -> PracticeResult<PracticeSession> {
        self.start_with_rng(username, StdRng::from_entropy())
    }

    /// Same as `start` with a caller-provided RNG
    pub fn start_with_rng(
        &self,
        username: &str,
        mut rng: StdRng,
    ) -> PracticeResult<PracticeSession> {
        let mut asked = HashSet::new();
        let question = self.generator.next(&mut rng, &mut asked)?;

        info!("Practice session started for {}", username);
        Ok(PracticeSession {
            username: username.to_string(),
            question,
            asked,
            correct_count: 0,
            answered_count: 0,
            round: 1,
            phase: Phase::AwaitingAnswer,
            feedback: None,
            reward: None,
            celebrate: false,
            disappoint: false,
            rng,
        })
    }

    /// Grade an answer to the current question.
    ///
    /// The answer and any reward it earns are stored in one transaction
    /// before the session changes, so a storage error leaves both the
    /// session and the inventory as they were.
    pub async fn submit(
        &self,
        session: &mut PracticeSession,
        answer: i64,
    ) -> PracticeResult<SessionSnapshot> {
        if session.phase != Phase::AwaitingAnswer {
            return Err(PracticeError::AlreadyAnswered);
        }

        let question = session.question;
        let correct_answer = question.answer();
        let is_correct = answer == correct_answer;
        let correct_count = session.correct_count + u32::from(is_correct);

        let reward = if is_correct && reward_due(correct_count) {
            let item = self.catalog.sample(&mut session.rng);
            if item.is_none() {
                warn!("Reward due for {} but the catalog is empty", session.username);
            }
            item
        } else {
            None
        };

        let entry = PracticeEntry {
            username: session.username.clone(),
            question: question.to_string(),
            user_answer: answer,
            correct_answer,
            is_correct,
        };
        self.log
            .append_with_reward(entry, reward.as_ref().map(|item| item.title.clone()))
            .await?;

        if let Some(item) = &reward {
            info!(
                "{} earned '{}' at {} correct answers",
                session.username, item.title, correct_count
            );
        }

        session.clear_feedback();
        session.answered_count += 1;
        session.correct_count = correct_count;
        session.phase = Phase::ShowingFeedback;

        if is_correct {
            session.celebrate = true;
            session.feedback = Some(match &reward {
                Some(item) => format!(
                    "Correct! {} = {}. You earned a new item: {}!",
                    question, correct_answer, item.title
                ),
                None => format!("Correct! {} = {}. Great job!", question, correct_answer),
            });
            session.reward = reward;
        } else {
            session.disappoint = true;
            session.feedback = Some(format!(
                "Not quite. {} = {}, not {}. Keep trying!",
                question, correct_answer, answer
            ));
        }

        debug!(
            "{} answered {} with {} (correct: {})",
            session.username, question, answer, is_correct
        );
        Ok(session.snapshot())
    }

    /// Move on to a new question, clearing feedback and flags.
    ///
    /// When every pair has been asked, a new round begins. The question just
    /// answered stays in the new round's asked-set so it is not repeated
    /// back to back.
    pub fn next_question(&self, session: &mut PracticeSession) -> PracticeResult<SessionSnapshot> {
        if session.phase != Phase::ShowingFeedback {
            return Err(PracticeError::AnswerPending);
        }

        let question = match self.generator.next(&mut session.rng, &mut session.asked) {
            Ok(question) => question,
            Err(PracticeError::QuestionsExhausted(total)) => {
                session.asked.clear();
                session.asked.insert(session.question);
                session.round += 1;
                info!(
                    "{} has seen all {} questions; starting round {}",
                    session.username, total, session.round
                );
                self.generator.next(&mut session.rng, &mut session.asked)?
            }
            Err(e) => return Err(e),
        };

        session.question = question;
        session.clear_feedback();
        session.phase = Phase::AwaitingAnswer;
        Ok(session.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbLocation, PracticeDb};
    use crate::inventory::InventoryStore;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        db: PracticeDb,
        flow: PracticeFlow,
        inventory: InventoryStore,
        log: PracticeLog,
        _dir: TempDir,
    }

    async fn fixture(catalog: RewardCatalog) -> Fixture {
        let dir = tempdir().unwrap();
        let db = PracticeDb::open(DbLocation::Custom(dir.path().join("test.db")))
            .await
            .unwrap();
        let log = PracticeLog::new(db.clone());
        let inventory = InventoryStore::new(db.clone());
        let flow = PracticeFlow::new(
            log.clone(),
            Arc::new(catalog),
            QuestionGenerator::default(),
        );
        Fixture {
            db,
            flow,
            inventory,
            log,
            _dir: dir,
        }
    }

    async fn answer_correctly(
        flow: &PracticeFlow,
        session: &mut PracticeSession,
    ) -> SessionSnapshot {
        let answer = session.question().answer();
        let snapshot = flow.submit(session, answer).await.unwrap();
        flow.next_question(session).unwrap();
        snapshot
    }

    #[test]
    fn test_reward_cadence() {
        let due: Vec<u32> = (0..=12).filter(|k| reward_due(*k)).collect();
        assert_eq!(due, vec![3, 6, 9, 12]);
    }

    #[test]
    fn test_progress_caps_at_target() {
        let half = Progress::new(14);
        assert_eq!(half.fraction, 0.5);
        assert!(!half.goal_reached);

        let past = Progress::new(30);
        assert_eq!(past.fraction, 1.0);
        assert!(past.goal_reached);
        assert_eq!(past.correct, 30);
    }

    #[tokio::test]
    async fn test_start_state() {
        let fx = fixture(RewardCatalog::builtin()).await;
        let session = fx
            .flow
            .start_with_rng("alice", StdRng::seed_from_u64(1))
            .unwrap();
        let snap = session.snapshot();

        assert_eq!(snap.phase, Phase::AwaitingAnswer);
        assert!(!snap.show_next);
        assert!(snap.feedback.is_none());
        assert_eq!(snap.progress.correct, 0);
        assert_eq!(snap.round, 1);
        assert_eq!(snap.question.text, session.question().to_string());
    }

    #[tokio::test]
    async fn test_third_correct_answer_grants_one_item() {
        let fx = fixture(RewardCatalog::builtin()).await;
        let mut session = fx
            .flow
            .start_with_rng("alice", StdRng::seed_from_u64(2))
            .unwrap();

        let first = answer_correctly(&fx.flow, &mut session).await;
        assert!(first.celebrate);
        assert!(!first.reward_earned);
        let second = answer_correctly(&fx.flow, &mut session).await;
        assert!(!second.reward_earned);
        let third = answer_correctly(&fx.flow, &mut session).await;
        assert!(third.reward_earned);
        assert!(third.show_next);

        let items = fx.inventory.list("alice").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(Some(&items[0]), third.reward.as_ref().map(|r| &r.title));

        let fourth = answer_correctly(&fx.flow, &mut session).await;
        assert!(!fourth.reward_earned);
        assert_eq!(fx.inventory.list("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_answer_feedback_and_log() {
        let fx = fixture(RewardCatalog::builtin()).await;
        let mut session = fx
            .flow
            .start_with_rng("alice", StdRng::seed_from_u64(3))
            .unwrap();
        let correct = session.question().answer();

        let snap = fx.flow.submit(&mut session, correct + 1).await.unwrap();
        assert!(snap.disappoint);
        assert!(!snap.celebrate);
        assert!(!snap.reward_earned);
        assert!(snap.feedback.unwrap().contains(&format!("= {}", correct)));
        assert_eq!(snap.progress.correct, 0);
        assert_eq!(snap.answered_count, 1);

        let stats = fx.log.stats("alice").await.unwrap();
        assert_eq!(stats.answered, 1);
        assert_eq!(stats.correct, 0);
    }

    #[tokio::test]
    async fn test_wrong_answers_do_not_break_cadence() {
        let fx = fixture(RewardCatalog::builtin()).await;
        let mut session = fx
            .flow
            .start_with_rng("alice", StdRng::seed_from_u64(4))
            .unwrap();

        answer_correctly(&fx.flow, &mut session).await;
        answer_correctly(&fx.flow, &mut session).await;

        let wrong = session.question().answer() + 3;
        fx.flow.submit(&mut session, wrong).await.unwrap();
        fx.flow.next_question(&mut session).unwrap();
        assert!(fx.inventory.list("alice").await.unwrap().is_empty());

        let third = answer_correctly(&fx.flow, &mut session).await;
        assert!(third.reward_earned);
        assert_eq!(third.progress.correct, 3);
    }

    #[tokio::test]
    async fn test_phase_conflicts() {
        let fx = fixture(RewardCatalog::builtin()).await;
        let mut session = fx
            .flow
            .start_with_rng("alice", StdRng::seed_from_u64(5))
            .unwrap();

        assert!(matches!(
            fx.flow.next_question(&mut session),
            Err(PracticeError::AnswerPending)
        ));

        let answer = session.question().answer();
        fx.flow.submit(&mut session, answer).await.unwrap();
        assert!(matches!(
            fx.flow.submit(&mut session, answer).await,
            Err(PracticeError::AlreadyAnswered)
        ));
        assert_eq!(fx.log.stats("alice").await.unwrap().answered, 1);
    }

    #[tokio::test]
    async fn test_next_question_clears_flags_and_never_repeats() {
        let fx = fixture(RewardCatalog::builtin()).await;
        let mut session = fx
            .flow
            .start_with_rng("alice", StdRng::seed_from_u64(6))
            .unwrap();
        let mut seen = HashSet::new();
        seen.insert(session.question());

        for _ in 0..40 {
            let answer = session.question().answer();
            fx.flow.submit(&mut session, answer).await.unwrap();
            let snap = fx.flow.next_question(&mut session).unwrap();
            assert!(snap.feedback.is_none());
            assert!(!snap.celebrate && !snap.disappoint && !snap.reward_earned);
            assert!(!snap.show_next);
            assert!(seen.insert(session.question()), "question repeated");
        }
        assert_eq!(session.correct_count(), 40);
        assert_eq!(fx.inventory.list("alice").await.unwrap().len(), 13);
    }

    #[tokio::test]
    async fn test_new_round_after_all_pairs() {
        let fx = fixture(RewardCatalog::builtin()).await;
        let mut session = fx
            .flow
            .start_with_rng("alice", StdRng::seed_from_u64(7))
            .unwrap();

        for _ in 0..73 {
            fx.flow.submit(&mut session, -1).await.unwrap();
            fx.flow.next_question(&mut session).unwrap();
        }
        assert_eq!(session.snapshot().round, 1);
        let last_of_round = session.question();

        fx.flow.submit(&mut session, -1).await.unwrap();
        fx.flow.next_question(&mut session).unwrap();
        assert_eq!(session.snapshot().round, 2);
        assert_ne!(session.question(), last_of_round);
        assert_eq!(session.asked.len(), 2);
        assert!(session.asked.contains(&last_of_round));
    }

    #[tokio::test]
    async fn test_failed_submit_grants_nothing_and_retry_grants_once() {
        let fx = fixture(RewardCatalog::builtin()).await;
        let mut session = fx
            .flow
            .start_with_rng("alice", StdRng::seed_from_u64(9))
            .unwrap();

        answer_correctly(&fx.flow, &mut session).await;
        answer_correctly(&fx.flow, &mut session).await;

        rename_table(&fx.db, "subtraction_practice", "practice_moved").await;
        let answer = session.question().answer();
        assert!(fx.flow.submit(&mut session, answer).await.is_err());
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
        assert_eq!(session.correct_count(), 2);
        assert!(fx.inventory.list("alice").await.unwrap().is_empty());

        rename_table(&fx.db, "practice_moved", "subtraction_practice").await;
        let retry = fx.flow.submit(&mut session, answer).await.unwrap();
        assert!(retry.reward_earned);
        assert_eq!(retry.progress.correct, 3);
        assert_eq!(fx.inventory.list("alice").await.unwrap().len(), 1);
        assert_eq!(fx.log.stats("alice").await.unwrap().answered, 3);
    }

    async fn rename_table(db: &PracticeDb, from: &str, to: &str) {
        let sql = format!("ALTER TABLE {} RENAME TO {}", from, to);
        db.execute(move |conn| {
            conn.execute(&sql, [])?;
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_empty_catalog_grants_nothing() {
        let fx = fixture(RewardCatalog::default()).await;
        let mut session = fx
            .flow
            .start_with_rng("alice", StdRng::seed_from_u64(8))
            .unwrap();

        for _ in 0..3 {
            let snap = answer_correctly(&fx.flow, &mut session).await;
            assert!(!snap.reward_earned);
        }
        assert!(fx.inventory.list("alice").await.unwrap().is_empty());
    }
}
