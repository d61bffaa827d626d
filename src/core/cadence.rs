/// Cadence policy — decides, per inbound event, whether the bot speaks.
///
/// A hard ceiling (`max_count`/`max_minutes`) guarantees an eventual post on a
/// quiet timeline, a soft floor (`min_count`/`min_minutes`) keeps bursts from
/// triggering posts too eagerly, and a per-author runaway window stops a
/// single chatty account from driving the bot.
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::core::cleaner;
use crate::core::config::{BotConfig, ConfigError, KeywordRule, TweetConfig};
use crate::core::markov::{Generator, Strategy};
use crate::schema::event::{Action, AuthorId, Event, EventKind};

/// Mutable counters behind the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyState {
    /// Text-carrying events seen since the last post.
    pub event_count: u64,
    pub last_reset: DateTime<Utc>,
    /// `(seen_at, author)` for every event inside the runaway window, oldest first.
    pub recent_authors: VecDeque<(DateTime<Utc>, AuthorId)>,
}

impl PolicyState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            event_count: 0,
            last_reset: now,
            recent_authors: VecDeque::new(),
        }
    }

    fn reset(&mut self, now: DateTime<Utc>) {
        self.event_count = 0;
        self.last_reset = now;
    }

    fn authored_by(&self, author: AuthorId) -> usize {
        self.recent_authors.iter().filter(|(_, a)| *a == author).count()
    }
}

/// What the policy decided for one event. The first matching arm wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Nothing to do, or the event came from the bot itself.
    Ignore,
    /// The author is unknown or has exceeded the runaway limit.
    Suppressed,
    /// Text matched a keyword rule; reply with the sampled message.
    KeywordReply { message: String },
    /// The event replies to the bot.
    DirectedReply,
    /// The cadence limits were crossed; post on our own.
    CadenceTweet { strategy: Strategy },
    /// Someone followed the bot.
    FollowBack { user: AuthorId },
}

#[derive(Debug, Clone)]
struct KeywordTrigger {
    pattern: Regex,
    messages: Vec<String>,
}

/// Reactive decision function over [`PolicyState`].
#[derive(Debug, Clone)]
pub struct CadencePolicy {
    self_id: AuthorId,
    limits: TweetConfig,
    keywords: Vec<KeywordTrigger>,
    state: PolicyState,
}

impl CadencePolicy {
    pub fn new(
        self_id: AuthorId,
        limits: TweetConfig,
        rules: &[KeywordRule],
        now: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        let keywords = rules
            .iter()
            .map(|rule| {
                Ok(KeywordTrigger {
                    pattern: rule.compile()?,
                    messages: rule.messages.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            self_id,
            limits,
            keywords,
            state: PolicyState::new(now),
        })
    }

    pub fn from_config(config: &BotConfig, now: DateTime<Utc>) -> Result<Self, ConfigError> {
        Self::new(config.self_id, config.tweet, &config.keywords, now)
    }

    pub fn state(&self) -> &PolicyState {
        &self.state
    }

    /// Decide what to do about `event`, updating the counters.
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        event: &Event,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Trigger {
        if event.is_authored_by(self.self_id) {
            return Trigger::Ignore;
        }

        self.observe(event, now);

        if event.kind == EventKind::Follow {
            return match (event.author_id, event.target_id) {
                (Some(user), Some(target)) if target == self.self_id => {
                    info!(%user, "followed");
                    Trigger::FollowBack { user }
                }
                _ => Trigger::Ignore,
            };
        }

        if self.is_runaway(event) {
            debug!(author = ?event.author_id, "runaway guard suppressed event");
            return Trigger::Suppressed;
        }

        let trigger = self
            .keyword_reply(event, rng)
            .or_else(|| self.directed_reply(event))
            .or_else(|| self.cadence_tweet(now, rng))
            .unwrap_or(Trigger::Ignore);

        if trigger != Trigger::Ignore {
            info!(?trigger, count = self.state.event_count, "trigger fired");
            self.state.reset(now);
        }
        trigger
    }

    /// Decide, then turn the decision into an outbound action using `generator`.
    ///
    /// Generation that finds no candidates yields `Action::None`.
    pub fn handle<R: Rng + ?Sized>(
        &mut self,
        event: &Event,
        now: DateTime<Utc>,
        generator: &Generator<'_>,
        rng: &mut R,
    ) -> Action {
        let mention = event.mention();
        let generated = |text: Option<String>| text.filter(|t| !t.is_empty());

        match self.decide(event, now, rng) {
            Trigger::Ignore | Trigger::Suppressed => Action::None,
            Trigger::KeywordReply { message } => Action::Reply {
                text: format!("{}{}", mention, message),
                in_reply_to_id: event.id,
            },
            Trigger::DirectedReply => match generated(generator.generate_reply(&event.keywords, rng)) {
                Some(text) => Action::Reply {
                    text: format!("{}{}", mention, text),
                    in_reply_to_id: event.id,
                },
                None => {
                    debug!("no anchor for directed reply");
                    Action::None
                }
            },
            Trigger::CadenceTweet { strategy } => match generated(generator.generate(strategy, rng)) {
                Some(text) => Action::Tweet { text },
                None => {
                    debug!(?strategy, "nothing generated for tweet");
                    Action::None
                }
            },
            Trigger::FollowBack { user } => Action::FollowAndGreet {
                user,
                text: generated(generator.generate_popular(rng))
                    .map(|text| format!("{}{}", mention, text)),
            },
        }
    }

    fn observe(&mut self, event: &Event, now: DateTime<Utc>) {
        if event.has_text() {
            self.state.event_count = self.state.event_count.saturating_add(1);
        }
        if let Some(author) = event.author_id {
            self.state.recent_authors.push_back((now, author));
        }
        let window = self.limits.runaway_window();
        self.state
            .recent_authors
            .retain(|(seen_at, _)| now.signed_duration_since(*seen_at) <= window);
    }

    fn is_runaway(&self, event: &Event) -> bool {
        match event.author_id {
            Some(author) => self.state.authored_by(author) > self.limits.runaway_count,
            None => true,
        }
    }

    fn keyword_reply<R: Rng + ?Sized>(&self, event: &Event, rng: &mut R) -> Option<Trigger> {
        let text = event.text.as_deref().filter(|t| !t.is_empty())?;
        if event
            .in_reply_to_author_id
            .is_some_and(|to| to != self.self_id)
        {
            return None;
        }
        let text = cleaner::clean(text);
        let rule = self.keywords.iter().find(|k| k.pattern.is_match(&text))?;
        let message = rule.messages.choose(rng)?;
        Some(Trigger::KeywordReply {
            message: message.clone(),
        })
    }

    fn directed_reply(&self, event: &Event) -> Option<Trigger> {
        (event.in_reply_to_author_id == Some(self.self_id)).then_some(Trigger::DirectedReply)
    }

    fn cadence_tweet<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> Option<Trigger> {
        let elapsed = now.signed_duration_since(self.state.last_reset);
        let count = self.state.event_count;
        let due = elapsed > self.limits.max_interval()
            || count > self.limits.max_count
            || (count > self.limits.min_count && elapsed > self.limits.min_interval());
        due.then(|| Trigger::CadenceTweet {
            strategy: self.limits.mode.pick(rng),
        })
    }
}
