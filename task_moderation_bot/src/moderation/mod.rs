//! Everything a submission goes through before anyone sees it.

pub mod classifier;
pub mod detectors;
pub mod escalation;
pub mod similarity;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use teloxide::types::UserId;

use crate::{
    config::ModerationConfig,
    error::{check_user_id, ModerationError, OcrError},
    notify::{dispatch_best_effort, Audience, Notifier},
    ocr::OcrService,
    stores::BanLedgerStore,
    types::{BanStatus, Consequence, Context, MatchedWord, ModerationVerdict, Severity},
    word_lists::WordLists,
};

use self::{
    classifier::classify,
    detectors::{InvalidCharsDetector, PhoneFinder},
    escalation::{EscalationMachine, EscalationPolicy, Violation},
    similarity::{ShingleComparator, SimilarityDetector, TextComparator},
};

/// How much of the offending text goes into a notification.
const QUOTE_LEN: usize = 1000;

/// What was wrong with a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Finding {
    StopWord(MatchedWord),
    InvalidChars,
    PhoneNumber,
}

impl Finding {
    fn violation(&self) -> Violation {
        match self {
            Finding::StopWord(_) | Finding::InvalidChars => Violation::Content,
            Finding::PhoneNumber => Violation::PhoneNumber,
        }
    }

    fn severity(&self) -> Severity {
        match self {
            Finding::StopWord(_) => Severity::ContentViolation,
            Finding::InvalidChars => Severity::InvalidChars,
            Finding::PhoneNumber => Severity::PhoneNumber,
        }
    }

    fn describe(&self) -> String {
        match self {
            Finding::StopWord(matched) => {
                format!("Forbidden word found in \"{}\".", matched.found_in)
            }
            Finding::InvalidChars => {
                "Only cyrillic letters are allowed, without decorative symbols.".to_string()
            }
            Finding::PhoneNumber => {
                "Sharing phone numbers isn't allowed, keep the conversation here.".to_string()
            }
        }
    }
}

/// The moderation engine. Cheap to share behind an [`Arc`].
pub struct Moderator {
    word_lists: Arc<WordLists>,
    escalation: EscalationMachine,
    phone_finder: PhoneFinder,
    invalid_chars: InvalidCharsDetector,
    similarity: SimilarityDetector,
    similarity_threshold: f64,
    similarity_timeout: Duration,
    ocr: Arc<dyn OcrService>,
    ocr_timeout: Duration,
    notifier: Arc<dyn Notifier>,
}

impl Moderator {
    pub fn new(
        config: &ModerationConfig,
        word_lists: Arc<WordLists>,
        ledger: Arc<dyn BanLedgerStore>,
        ocr: Arc<dyn OcrService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Moderator {
            word_lists,
            escalation: EscalationMachine::new(ledger, EscalationPolicy::from(config)),
            phone_finder: PhoneFinder {
                min_digits: config.min_phone_digits,
                max_gap: config.phone_max_gap,
            },
            invalid_chars: InvalidCharsDetector::new(&config.allowed_latin),
            similarity: SimilarityDetector::new(
                Arc::new(ShingleComparator),
                config.similarity_threshold,
                config.similarity_timeout(),
            ),
            similarity_threshold: config.similarity_threshold,
            similarity_timeout: config.similarity_timeout(),
            ocr,
            ocr_timeout: config.ocr_timeout(),
            notifier,
        }
    }

    /// Use a different way of comparing texts for duplicate detection.
    pub fn with_comparator(mut self, comparator: Arc<dyn TextComparator>) -> Self {
        self.similarity =
            SimilarityDetector::new(comparator, self.similarity_threshold, self.similarity_timeout);
        self
    }

    pub fn word_lists(&self) -> &Arc<WordLists> {
        &self.word_lists
    }

    /// Check `text` submitted by `user_id` in `context`. A refused
    /// submission escalates the user's ledger. Clean text from a suspended
    /// or permanently banned user is refused without escalating.
    ///
    /// # Errors
    ///
    /// Fails if the user ID is invalid or the ban ledger can't be read or
    /// written. The submission must not be let through then.
    pub async fn evaluate(
        &self,
        text: &str,
        context: Context,
        user_id: UserId,
    ) -> Result<ModerationVerdict, ModerationError> {
        check_user_id(user_id)?;

        let Some(finding) = self.inspect(text, context) else {
            return Ok(self
                .blocked_verdict(user_id)
                .await?
                .unwrap_or_else(ModerationVerdict::allowed));
        };

        let (consequence, _) = self
            .escalation
            .escalate(user_id, finding.violation(), Utc::now())
            .await?;

        if consequence.is_transition() {
            self.notify_transition(user_id, context, &finding, &consequence, text);
        }

        Ok(ModerationVerdict {
            allowed: false,
            reason: Some(self.reason(&finding, &consequence)),
            severity: finding.severity(),
            consequence,
        })
    }

    /// Read the text off a photo and check it. Photos whose text can't be
    /// read are let through.
    pub async fn evaluate_photo(
        &self,
        image: Vec<u8>,
        user_id: UserId,
    ) -> Result<ModerationVerdict, ModerationError> {
        check_user_id(user_id)?;

        if let Some(verdict) = self.blocked_verdict(user_id).await? {
            return Ok(verdict);
        }

        let extracted = tokio::time::timeout(self.ocr_timeout, self.ocr.extract_text(image))
            .await
            .unwrap_or(Err(OcrError::TimedOut));

        let text = match extracted {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(ModerationVerdict::allowed()),
            Err(e) => {
                log::warn!("Letting a photo from {user_id} through unchecked: {e}");
                return Ok(ModerationVerdict::allowed());
            }
        };

        log::debug!("Read from a photo of {user_id}: {text:?}");
        self.evaluate(&text, Context::PhotoText, user_id).await
    }

    /// Whether `new_text` is just `old_text` with cosmetic edits.
    pub async fn evaluate_duplicate(&self, old_text: &str, new_text: &str) -> bool {
        self.similarity.are_similar(old_text, new_text).await
    }

    /// Refuse a resubmission of the user's previous task. Never touches
    /// the ban ledger.
    pub async fn check_resubmission(
        &self,
        old_text: &str,
        new_text: &str,
        user_id: UserId,
    ) -> Result<ModerationVerdict, ModerationError> {
        check_user_id(user_id)?;

        if !self.evaluate_duplicate(old_text, new_text).await {
            return Ok(ModerationVerdict::allowed());
        }

        log::debug!("{user_id} resubmitted a task");
        Ok(ModerationVerdict {
            allowed: false,
            reason: Some(
                "This task is the same as your previous one. Edit it instead of posting it again."
                    .to_string(),
            ),
            severity: Severity::DuplicateContent,
            consequence: Consequence::None,
        })
    }

    /// Effective state of the user's ledger at `now`.
    pub async fn ban_status(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<BanStatus, ModerationError> {
        check_user_id(user_id)?;
        self.escalation.status(user_id, now).await
    }

    /// A refusal if the user can't post anything right now.
    async fn blocked_verdict(
        &self,
        user_id: UserId,
    ) -> Result<Option<ModerationVerdict>, ModerationError> {
        let (reason, consequence) = match self.escalation.status(user_id, Utc::now()).await? {
            BanStatus::Suspended { until } => (
                format!("You can't post until {} UTC.", until.format("%Y-%m-%d %H:%M")),
                Consequence::StillSuspended { until },
            ),
            BanStatus::PermanentlyBanned => (
                "You are banned permanently.".to_string(),
                Consequence::AlreadyPermanent,
            ),
            BanStatus::Clean | BanStatus::Warned(_) => return Ok(None),
        };

        log::debug!("{user_id} is blocked: {consequence:?}");
        Ok(Some(ModerationVerdict {
            allowed: false,
            reason: Some(reason),
            severity: Severity::None,
            consequence,
        }))
    }

    /// Word lists first, then characters, then phone numbers.
    fn inspect(&self, text: &str, context: Context) -> Option<Finding> {
        let lists = self.word_lists.snapshot();
        if let Some(matched) = classify(text, &lists, &context.categories()) {
            return Some(Finding::StopWord(matched));
        }
        if context.checks_charset() && self.invalid_chars.contains_invalid_chars(text) {
            return Some(Finding::InvalidChars);
        }
        if self.phone_finder.contains_phone(text) {
            return Some(Finding::PhoneNumber);
        }
        None
    }

    fn reason(&self, finding: &Finding, consequence: &Consequence) -> String {
        let outcome = match consequence {
            Consequence::None => String::new(),
            Consequence::Warned { warning } => format!(
                " Warning {warning} of {}, after that the ban is permanent.",
                self.escalation.policy().max_warnings
            ),
            Consequence::Suspended { until, .. } | Consequence::StillSuspended { until } => format!(
                " You can't post until {} UTC.",
                until.format("%Y-%m-%d %H:%M")
            ),
            Consequence::PermanentlyBanned | Consequence::AlreadyPermanent => {
                " You are banned permanently.".to_string()
            }
        };
        format!("{}{outcome}", finding.describe())
    }

    fn notify_transition(
        &self,
        user_id: UserId,
        context: Context,
        finding: &Finding,
        consequence: &Consequence,
        text: &str,
    ) {
        let what = match finding {
            Finding::StopWord(matched) => format!(
                "{} word <code>{}</code>",
                matched.category,
                html_escape::encode_text(&matched.word)
            ),
            Finding::InvalidChars => "invalid characters".to_string(),
            Finding::PhoneNumber => "phone number".to_string(),
        };
        let outcome = match consequence {
            Consequence::Warned { warning } => format!("warning {warning}"),
            Consequence::Suspended { until, ban_counter } => format!(
                "suspended until {} UTC, ban {ban_counter}",
                until.format("%Y-%m-%d %H:%M")
            ),
            Consequence::PermanentlyBanned => "<b>permanently banned</b>".to_string(),
            Consequence::None
            | Consequence::AlreadyPermanent
            | Consequence::StillSuspended { .. } => return,
        };
        let quote: String = text.chars().take(QUOTE_LEN).collect();

        let message = format!(
            "User <code>{user_id}</code>, {context:?}: {what}, {outcome}.\n<blockquote>{}</blockquote>",
            html_escape::encode_text(&quote)
        );

        if consequence.is_ban() {
            dispatch_best_effort(&self.notifier, Audience::Administrators, message.clone());
        }
        dispatch_best_effort(&self.notifier, Audience::BlockedActivity, message);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{
        database::Database,
        notify::test_doubles::{FailingNotifier, RecordingNotifier},
        ocr::test_doubles::{FixedOcr, StuckOcr},
        stores::WordListStore,
        types::Category,
    };

    const USER: UserId = UserId(42);
    const TASK: &str = "Нужен электрик, заменить розетки в квартире. Оплата 2000 рублей.";

    struct Setup {
        db: Arc<Database>,
        moderator: Arc<Moderator>,
        notifications: UnboundedReceiver<(Audience, String)>,
    }

    async fn setup_with(config: ModerationConfig, ocr: impl OcrService + 'static) -> Setup {
        let db = Arc::new(Database::new("sqlite::memory:").await.unwrap());
        for (category, word) in [
            (Category::LongStop, "авито"),
            (Category::ShortStop, "вк"),
            (Category::Profanity, "хуй"),
            (Category::White, "страхуй"),
            (Category::MessageLong, "телеграм"),
            (Category::PhotoLong, "инстаграм"),
        ] {
            db.insert(category, word).await.unwrap();
        }
        let word_lists = Arc::new(WordLists::load(db.clone()).await.unwrap());
        let (notifier, notifications) = RecordingNotifier::new();
        let moderator = Moderator::new(&config, word_lists, db.clone(), Arc::new(ocr), notifier);
        Setup {
            db,
            moderator: Arc::new(moderator),
            notifications,
        }
    }

    async fn setup() -> Setup {
        setup_with(ModerationConfig::default(), FixedOcr(None)).await
    }

    #[tokio::test]
    async fn clean_task_is_allowed() {
        let s = setup().await;
        let verdict = s.moderator.evaluate(TASK, Context::Task, USER).await.unwrap();
        assert_eq!(verdict, ModerationVerdict::allowed());
        assert_eq!(s.db.get(USER).await.unwrap(), None);
    }

    #[tokio::test]
    async fn long_stop_word_inside_a_word_is_refused() {
        let s = setup().await;
        let verdict = s
            .moderator
            .evaluate("Смотрите подробности на АвитоМаркете", Context::Task, USER)
            .await
            .unwrap();
        assert!(!verdict.allowed);
        assert_eq!(verdict.severity, Severity::ContentViolation);
        assert!(matches!(
            verdict.consequence,
            Consequence::Suspended { ban_counter: 1, .. }
        ));
        assert!(verdict.reason.unwrap().contains("авитомаркете"));
    }

    #[tokio::test]
    async fn short_stop_word_inside_a_word_is_allowed() {
        let s = setup().await;
        let verdict = s
            .moderator
            .evaluate("Испеку вкусный торт", Context::Task, USER)
            .await
            .unwrap();
        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn white_list_excuses_the_word() {
        let s = setup().await;
        let verdict = s
            .moderator
            .evaluate("Страхуй меня на стройке", Context::Task, USER)
            .await
            .unwrap();
        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn context_selects_word_lists() {
        let s = setup().await;
        let text = "пишите в телеграм";
        assert!(
            s.moderator
                .evaluate(text, Context::Task, USER)
                .await
                .unwrap()
                .allowed
        );
        assert!(
            !s.moderator
                .evaluate(text, Context::ChatMessage, USER)
                .await
                .unwrap()
                .allowed
        );
    }

    #[tokio::test]
    async fn content_ladder() {
        let s = setup().await;
        for expected in 1..=3 {
            let verdict = s
                .moderator
                .evaluate("продам на авито", Context::Task, USER)
                .await
                .unwrap();
            assert!(matches!(
                verdict.consequence,
                Consequence::Suspended { ban_counter, .. } if ban_counter == expected
            ));
            let record = s.db.get(USER).await.unwrap().unwrap();
            assert_eq!(record.ban_counter, expected);
            assert!(record.ban_now);
            assert!(!record.forever);
        }

        let verdict = s
            .moderator
            .evaluate("продам на авито", Context::Task, USER)
            .await
            .unwrap();
        assert_eq!(verdict.consequence, Consequence::PermanentlyBanned);
        assert!(s.db.get(USER).await.unwrap().unwrap().forever);

        let verdict = s
            .moderator
            .evaluate("продам на авито", Context::Task, USER)
            .await
            .unwrap();
        assert!(!verdict.allowed);
        assert_eq!(verdict.consequence, Consequence::AlreadyPermanent);
    }

    #[tokio::test]
    async fn phone_ladder() {
        let s = setup().await;
        let text = "Звоните 8 999 123-45-67";

        for expected in 1..=2 {
            let verdict = s.moderator.evaluate(text, Context::Task, USER).await.unwrap();
            assert!(!verdict.allowed);
            assert_eq!(verdict.severity, Severity::PhoneNumber);
            assert_eq!(verdict.consequence, Consequence::Warned { warning: expected });
            let record = s.db.get(USER).await.unwrap().unwrap();
            assert_eq!(record.warning, expected);
            assert!(!record.ban_now);
        }

        let verdict = s.moderator.evaluate(text, Context::Task, USER).await.unwrap();
        assert_eq!(verdict.consequence, Consequence::PermanentlyBanned);
        let record = s.db.get(USER).await.unwrap().unwrap();
        assert!(record.forever);
        assert_eq!(record.warning, 3);
    }

    #[tokio::test]
    async fn stop_words_are_checked_before_phone_numbers() {
        let s = setup().await;
        let verdict = s
            .moderator
            .evaluate("авито 89991234567", Context::Task, USER)
            .await
            .unwrap();
        assert_eq!(verdict.severity, Severity::ContentViolation);
    }

    #[tokio::test]
    async fn invalid_chars_are_not_checked_on_photos() {
        let s = setup().await;
        let verdict = s
            .moderator
            .evaluate("Пишите в whatsapp", Context::Task, USER)
            .await
            .unwrap();
        assert_eq!(verdict.severity, Severity::InvalidChars);
        assert!(verdict.consequence.is_ban());

        let verdict = s
            .moderator
            .evaluate("Пишите в whatsapp", Context::PhotoText, UserId(43))
            .await
            .unwrap();
        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn duplicates_never_touch_the_ledger() {
        let s = setup().await;
        let edited = "нужен ЭЛЕКТРИК: заменить розетки в квартире!! Оплата 3000 рублей";
        for _ in 0..10 {
            let verdict = s
                .moderator
                .check_resubmission(TASK, edited, USER)
                .await
                .unwrap();
            assert!(!verdict.allowed);
            assert_eq!(verdict.severity, Severity::DuplicateContent);
            assert_eq!(verdict.consequence, Consequence::None);
            assert!(verdict.reason.is_some());
        }
        assert_eq!(s.db.get(USER).await.unwrap(), None);

        let verdict = s
            .moderator
            .check_resubmission(TASK, "Нужно выгулять собаку вечером", USER)
            .await
            .unwrap();
        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn duplicate_detection_is_symmetric() {
        let s = setup().await;
        let other = "Ищу репетитора по математике";
        assert!(s.moderator.evaluate_duplicate(TASK, TASK).await);
        assert_eq!(
            s.moderator.evaluate_duplicate(TASK, other).await,
            s.moderator.evaluate_duplicate(other, TASK).await
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_violations_both_count() {
        let s = setup().await;
        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let moderator = s.moderator.clone();
                tokio::spawn(async move {
                    moderator
                        .evaluate("продам на авито", Context::Task, USER)
                        .await
                })
            })
            .collect();
        for task in tasks {
            assert!(!task.await.unwrap().unwrap().allowed);
        }
        assert_eq!(s.db.get(USER).await.unwrap().unwrap().ban_counter, 2);
    }

    #[tokio::test]
    async fn unavailable_store_fails_loudly() {
        let s = setup().await;
        s.db.close().await;
        let result = s.moderator.evaluate("продам на авито", Context::Task, USER).await;
        assert!(matches!(result, Err(ModerationError::StoreUnavailable(_))));
        let result = s.moderator.ban_status(USER, Utc::now()).await;
        assert!(matches!(result, Err(ModerationError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn invalid_user_id_is_rejected() {
        let s = setup().await;
        for user in [UserId(0), UserId(u64::MAX)] {
            let result = s.moderator.evaluate(TASK, Context::Task, user).await;
            assert!(matches!(result, Err(ModerationError::InvalidUserId(_))));
        }
    }

    #[tokio::test]
    async fn bans_notify_channel_and_admins() {
        let mut s = setup().await;
        s.moderator
            .evaluate("продам на <b>авито</b>", Context::Task, USER)
            .await
            .unwrap();

        let mut audiences = Vec::new();
        for _ in 0..2 {
            let (audience, message) = s.notifications.recv().await.unwrap();
            assert!(message.contains("42"));
            assert!(message.contains("&lt;b&gt;"));
            audiences.push(audience);
        }
        assert!(audiences.contains(&Audience::BlockedActivity));
        assert!(audiences.contains(&Audience::Administrators));
    }

    #[tokio::test]
    async fn warnings_only_notify_the_channel() {
        let mut s = setup().await;
        s.moderator
            .evaluate("89991234567", Context::ChatMessage, USER)
            .await
            .unwrap();

        let (audience, _) = s.notifications.recv().await.unwrap();
        assert_eq!(audience, Audience::BlockedActivity);
        let more = tokio::time::timeout(Duration::from_millis(100), s.notifications.recv()).await;
        assert!(more.is_err());
    }

    #[tokio::test]
    async fn failing_notifier_doesnt_affect_the_verdict() {
        let db = Arc::new(Database::new("sqlite::memory:").await.unwrap());
        db.insert(Category::LongStop, "авито").await.unwrap();
        let word_lists = Arc::new(WordLists::load(db.clone()).await.unwrap());
        let moderator = Moderator::new(
            &ModerationConfig::default(),
            word_lists,
            db.clone(),
            Arc::new(FixedOcr(None)),
            Arc::new(FailingNotifier),
        );

        let verdict = moderator
            .evaluate("продам на авито", Context::Task, USER)
            .await
            .unwrap();
        assert!(!verdict.allowed);
        assert_eq!(db.get(USER).await.unwrap().unwrap().ban_counter, 1);
    }

    #[tokio::test]
    async fn photo_text_is_checked_with_photo_lists() {
        let s = setup_with(ModerationConfig::default(), FixedOcr(Some("Мой инстаграм"))).await;
        let verdict = s.moderator.evaluate_photo(vec![0xFF, 0xD8], USER).await.unwrap();
        assert!(!verdict.allowed);
        assert_eq!(verdict.severity, Severity::ContentViolation);
    }

    #[tokio::test]
    async fn unreadable_photos_are_let_through() {
        let s = setup().await;
        let verdict = s.moderator.evaluate_photo(vec![0xFF, 0xD8], USER).await.unwrap();
        assert!(verdict.allowed);

        let config = ModerationConfig {
            ocr_timeout_ms: 50,
            ..Default::default()
        };
        let s = setup_with(config, StuckOcr).await;
        let verdict = s.moderator.evaluate_photo(vec![0xFF, 0xD8], USER).await.unwrap();
        assert!(verdict.allowed);
        assert_eq!(s.db.get(USER).await.unwrap(), None);
    }

    #[tokio::test]
    async fn permanently_banned_user_cant_post_clean_text() {
        let s = setup().await;
        for _ in 0..4 {
            s.moderator
                .evaluate("продам на авито", Context::Task, USER)
                .await
                .unwrap();
        }
        assert!(s.db.get(USER).await.unwrap().unwrap().forever);

        for context in [Context::ChatMessage, Context::PersonalMessage, Context::Task] {
            let verdict = s
                .moderator
                .evaluate("всем привет", context, USER)
                .await
                .unwrap();
            assert!(!verdict.allowed);
            assert_eq!(verdict.consequence, Consequence::AlreadyPermanent);
            assert!(verdict.reason.is_some());
        }

        let verdict = s
            .moderator
            .evaluate("всем привет", Context::ChatMessage, UserId(43))
            .await
            .unwrap();
        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn suspended_user_cant_post_clean_text() {
        let mut s = setup().await;
        s.moderator
            .evaluate("продам на авито", Context::Task, USER)
            .await
            .unwrap();
        let before = s.db.get(USER).await.unwrap().unwrap();
        for _ in 0..2 {
            s.notifications.recv().await.unwrap();
        }

        let verdict = s
            .moderator
            .evaluate("всем привет", Context::ChatMessage, USER)
            .await
            .unwrap();
        assert!(!verdict.allowed);
        assert_eq!(verdict.severity, Severity::None);
        assert_eq!(
            verdict.consequence,
            Consequence::StillSuspended {
                until: before.ban_end.unwrap()
            }
        );
        assert!(verdict.reason.unwrap().contains("UTC"));
        assert_eq!(s.db.get(USER).await.unwrap(), Some(before));

        let more = tokio::time::timeout(Duration::from_millis(100), s.notifications.recv()).await;
        assert!(more.is_err());
    }

    #[tokio::test]
    async fn suspension_still_escalates_on_violations() {
        let s = setup().await;
        for expected in 1..=2 {
            let verdict = s
                .moderator
                .evaluate("продам на авито", Context::ChatMessage, USER)
                .await
                .unwrap();
            assert!(matches!(
                verdict.consequence,
                Consequence::Suspended { ban_counter, .. } if ban_counter == expected
            ));
        }
    }

    #[tokio::test]
    async fn banned_users_photos_are_refused_unread() {
        let s = setup().await;
        for _ in 0..3 {
            s.moderator
                .evaluate("89991234567", Context::ChatMessage, USER)
                .await
                .unwrap();
        }
        let verdict = s.moderator.evaluate_photo(vec![0xFF, 0xD8], USER).await.unwrap();
        assert!(!verdict.allowed);
        assert_eq!(verdict.consequence, Consequence::AlreadyPermanent);
    }

    #[tokio::test]
    async fn warned_user_can_still_post() {
        let s = setup().await;
        s.moderator
            .evaluate("89991234567", Context::ChatMessage, USER)
            .await
            .unwrap();
        let verdict = s.moderator.evaluate(TASK, Context::Task, USER).await.unwrap();
        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn ban_status_follows_the_ledger() {
        let s = setup().await;
        let now = Utc::now();
        assert_eq!(s.moderator.ban_status(USER, now).await.unwrap(), BanStatus::Clean);

        s.moderator
            .evaluate("продам на авито", Context::Task, USER)
            .await
            .unwrap();
        assert!(matches!(
            s.moderator.ban_status(USER, Utc::now()).await.unwrap(),
            BanStatus::Suspended { .. }
        ));
        assert_eq!(
            s.moderator
                .ban_status(USER, Utc::now() + TimeDelta::hours(25))
                .await
                .unwrap(),
            BanStatus::Clean
        );
    }
}
