//! Per-user delivery policy and quiet-hours arithmetic.
//!
//! A user either has a stored preference record or falls back to
//! [`DeliveryPolicy::default`]. Eligibility for a given notification kind
//! and channel is decided by [`DeliveryPolicy::should_send`]; all time
//! handling goes through [`TimeOfDay`] (minutes since midnight), parsed once
//! at the boundary rather than re-parsed per comparison.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Wildcard allow-set entry matching every notification kind.
pub const KIND_ALL: &str = "all";

/// A delivery surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Push,
    InApp,
}

impl Channel {
    /// Parse a channel name; unknown names yield `None` so callers fail
    /// closed.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Channel::Email),
            "push" => Some(Channel::Push),
            "in_app" => Some(Channel::InApp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Push => "push",
            Channel::InApp => "in_app",
        }
    }
}

// ---------------------------------------------------------------------------
// Time of day
// ---------------------------------------------------------------------------

/// A time of day as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Parse an `HH:MM` string. Returns `None` for anything out of range or
    /// malformed.
    pub fn parse(s: &str) -> Option<Self> {
        let (hours, minutes) = s.split_once(':')?;
        let hours: u16 = hours.parse().ok()?;
        let minutes: u16 = minutes.parse().ok()?;
        if hours > 23 || minutes > 59 {
            return None;
        }
        Some(TimeOfDay(hours * 60 + minutes))
    }

    /// Build from a UTC timestamp's wall-clock component.
    pub fn from_timestamp(ts: crate::types::Timestamp) -> Self {
        use chrono::Timelike;
        TimeOfDay((ts.hour() * 60 + ts.minute()) as u16)
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u16 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Delivery policy
// ---------------------------------------------------------------------------

/// Allow-set and toggle for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPolicy {
    pub enabled: bool,
    /// Allowed notification kinds, or the wildcard [`KIND_ALL`].
    pub kinds: Vec<String>,
}

impl ChannelPolicy {
    fn new(enabled: bool, kinds: &[&str]) -> Self {
        ChannelPolicy {
            enabled,
            kinds: kinds.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Whether the allow-set admits the given kind.
    fn allows(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k == KIND_ALL || k == kind)
    }
}

/// A recurring daily suppression window, possibly wrapping midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuietHours {
    pub enabled: bool,
    pub start: Option<TimeOfDay>,
    pub end: Option<TimeOfDay>,
}

impl QuietHours {
    /// Whether `now` falls inside the window.
    ///
    /// `start <= end` is a same-day span (inclusive both ends); `start > end`
    /// wraps midnight, e.g. 22:00–08:00. Disabled or incomplete windows are
    /// never "in".
    pub fn contains(&self, now: TimeOfDay) -> bool {
        if !self.enabled {
            return false;
        }
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return false;
        };
        if start <= end {
            start <= now && now <= end
        } else {
            now >= start || now <= end
        }
    }
}

/// The resolved delivery configuration for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub email: ChannelPolicy,
    pub push: ChannelPolicy,
    pub in_app: ChannelPolicy,
    pub quiet_hours: QuietHours,
}

impl Default for DeliveryPolicy {
    /// System defaults, used when no preference record is stored.
    fn default() -> Self {
        DeliveryPolicy {
            email: ChannelPolicy::new(true, &["welcome", "security", "billing"]),
            push: ChannelPolicy::new(true, &["urgent", "reminders"]),
            in_app: ChannelPolicy::new(true, &[KIND_ALL]),
            quiet_hours: QuietHours::default(),
        }
    }
}

impl DeliveryPolicy {
    fn channel(&self, channel: Channel) -> &ChannelPolicy {
        match channel {
            Channel::Email => &self.email,
            Channel::Push => &self.push,
            Channel::InApp => &self.in_app,
        }
    }

    /// Decide delivery eligibility for one notification.
    ///
    /// The channel must be enabled, its allow-set must admit `kind` (or
    /// carry the wildcard), and `now` must fall outside any enabled
    /// quiet-hours window.
    pub fn should_send(&self, kind: &str, channel: Channel, now: TimeOfDay) -> bool {
        let policy = self.channel(channel);
        if !policy.enabled {
            return false;
        }
        if !policy.allows(kind) {
            return false;
        }
        if self.quiet_hours.contains(now) {
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
