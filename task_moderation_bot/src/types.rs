use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, TimeZone, Utc};
use teloxide::types::UserId;

/// A word list a [`WordEntry`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Stop words matched anywhere inside the text, even mid-word.
    LongStop,
    /// Stop words matched only as whole words.
    ShortStop,
    Profanity,
    /// Exceptions that cancel a stop word match they fully cover.
    White,
    MessageLong,
    MessageShort,
    PersonalLong,
    PersonalShort,
    PhotoLong,
    PhotoShort,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::LongStop,
        Category::ShortStop,
        Category::Profanity,
        Category::White,
        Category::MessageLong,
        Category::MessageShort,
        Category::PersonalLong,
        Category::PersonalShort,
        Category::PhotoLong,
        Category::PhotoShort,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::LongStop => "long_stop",
            Category::ShortStop => "short_stop",
            Category::Profanity => "profanity",
            Category::White => "white",
            Category::MessageLong => "message_long",
            Category::MessageShort => "message_short",
            Category::PersonalLong => "personal_long",
            Category::PersonalShort => "personal_short",
            Category::PhotoLong => "photo_long",
            Category::PhotoShort => "photo_short",
        }
    }
}

impl FromStr for Category {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or("Unknown word list category")
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The word list categories consulted for one kind of submission,
/// in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySet {
    pub profanity: Category,
    pub long: Category,
    pub short: Category,
    pub white: Category,
}

/// Where a piece of text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// Description of a task posted by a customer.
    Task,
    /// Message in a group chat.
    ChatMessage,
    /// Direct message between a customer and a worker.
    PersonalMessage,
    /// Text read off a photo.
    PhotoText,
}

impl Context {
    pub fn categories(self) -> CategorySet {
        let (long, short) = match self {
            Context::Task => (Category::LongStop, Category::ShortStop),
            Context::ChatMessage => (Category::MessageLong, Category::MessageShort),
            Context::PersonalMessage => (Category::PersonalLong, Category::PersonalShort),
            Context::PhotoText => (Category::PhotoLong, Category::PhotoShort),
        };
        CategorySet {
            profanity: Category::Profanity,
            long,
            short,
            white: Category::White,
        }
    }

    /// OCR routinely reads cyrillic letters as latin ones, so photo text
    /// skips the character set check.
    pub fn checks_charset(self) -> bool {
        !matches!(self, Context::PhotoText)
    }
}

/// A single word list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub id: i64,
    /// Lowercased and trimmed.
    pub word: String,
}

/// A stop word found by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedWord {
    pub category: Category,
    /// The word list entry that matched.
    pub word: String,
    /// The whole words of the text the match was found in.
    pub found_in: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    None,
    ContentViolation,
    PhoneNumber,
    InvalidChars,
    DuplicateContent,
}

/// What happened to the user's ledger as a result of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consequence {
    /// Nothing, either because the submission was fine or because the
    /// violation doesn't escalate.
    None,
    /// Phone number warning, with the new warning count.
    Warned { warning: u8 },
    /// Temporary suspension, with the new ban counter.
    Suspended {
        until: DateTime<Utc>,
        ban_counter: u32,
    },
    /// This violation made the ban permanent.
    PermanentlyBanned,
    /// The user was already permanently banned; nothing changed.
    AlreadyPermanent,
    /// The user is serving a suspension; nothing changed.
    StillSuspended { until: DateTime<Utc> },
}

impl Consequence {
    /// True if this changed the ledger.
    pub fn is_transition(&self) -> bool {
        !matches!(
            self,
            Consequence::None | Consequence::AlreadyPermanent | Consequence::StillSuspended { .. }
        )
    }

    /// True if this suspends the user, temporarily or not.
    pub fn is_ban(&self) -> bool {
        matches!(
            self,
            Consequence::Suspended { .. } | Consequence::PermanentlyBanned
        )
    }
}

/// Result of moderating one submission. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub allowed: bool,
    /// User-facing explanation, if the submission was refused.
    pub reason: Option<String>,
    pub severity: Severity,
    pub consequence: Consequence,
}

impl ModerationVerdict {
    pub fn allowed() -> Self {
        ModerationVerdict {
            allowed: true,
            reason: None,
            severity: Severity::None,
            consequence: Consequence::None,
        }
    }
}

/// `ban_end` used for permanent bans.
pub fn permanent_ban_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A user's violation ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRecord {
    pub tg_id: UserId,
    /// Content violation bans so far. Never goes down.
    pub ban_counter: u32,
    pub ban_now: bool,
    pub ban_end: Option<DateTime<Utc>>,
    pub forever: bool,
    /// Phone number warnings so far, up to the configured maximum.
    pub warning: u8,
}

impl BanRecord {
    pub fn new(tg_id: UserId) -> Self {
        BanRecord {
            tg_id,
            ban_counter: 0,
            ban_now: false,
            ban_end: None,
            forever: false,
            warning: 0,
        }
    }

    /// Effective state of this ledger at `now`.
    pub fn status(&self, now: DateTime<Utc>) -> BanStatus {
        if self.forever {
            return BanStatus::PermanentlyBanned;
        }
        match self.ban_end {
            Some(until) if self.ban_now && until > now => BanStatus::Suspended { until },
            _ if self.warning > 0 => BanStatus::Warned(self.warning),
            _ => BanStatus::Clean,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanStatus {
    Clean,
    Warned(u8),
    Suspended { until: DateTime<Utc> },
    PermanentlyBanned,
}

impl Display for BanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BanStatus::Clean => write!(f, "No violations"),
            BanStatus::Warned(n) => write!(f, "{n} phone number warning(s)"),
            BanStatus::Suspended { until } => {
                write!(f, "Suspended until {} UTC", until.format("%Y-%m-%d %H:%M"))
            }
            BanStatus::PermanentlyBanned => write!(f, "Permanently banned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn category_names_round_trip_through_commands() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert_eq!("PHOTO_SHORT".parse::<Category>(), Ok(Category::PhotoShort));
        assert!("photo".parse::<Category>().is_err());
    }

    #[test]
    fn contexts_swap_only_stop_word_lists() {
        let task = Context::Task.categories();
        let photo = Context::PhotoText.categories();
        assert_eq!(task.profanity, photo.profanity);
        assert_eq!(task.white, photo.white);
        assert_eq!(photo.long, Category::PhotoLong);
        assert_eq!(photo.short, Category::PhotoShort);
        assert_eq!(
            Context::PersonalMessage.categories().long,
            Category::PersonalLong
        );
    }

    #[test]
    fn elapsed_suspension_is_not_a_suspension() {
        let now = Utc::now();
        let mut record = BanRecord::new(UserId(42));
        record.ban_counter = 1;
        record.ban_now = true;
        record.ban_end = Some(now - TimeDelta::hours(1));
        assert_eq!(record.status(now), BanStatus::Clean);

        record.ban_end = Some(now + TimeDelta::hours(1));
        assert!(matches!(record.status(now), BanStatus::Suspended { .. }));

        record.forever = true;
        assert_eq!(record.status(now), BanStatus::PermanentlyBanned);
    }

    #[test]
    fn refusing_a_blocked_user_is_not_a_transition() {
        let until = Utc::now();
        for consequence in [
            Consequence::None,
            Consequence::AlreadyPermanent,
            Consequence::StillSuspended { until },
        ] {
            assert!(!consequence.is_transition());
            assert!(!consequence.is_ban());
        }
        assert!(Consequence::Warned { warning: 1 }.is_transition());
    }
}
