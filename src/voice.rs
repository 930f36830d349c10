use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Voices known to be stable on the speech service, tried in order when the
/// primary voice fails.
pub const DEFAULT_FALLBACK_VOICES: [&str; 4] = [
    "zh-CN-XiaoxiaoNeural",
    "zh-CN-YunxiNeural",
    "zh-CN-XiaoyiNeural",
    "zh-CN-YunjianNeural",
];

/// Default primary voice.
pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";

/// Opaque identifier of a synthesis voice (e.g. `"zh-CN-YunxiNeural"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceIdentity(String);

impl VoiceIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VoiceIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VoiceIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

pub fn default_fallback_voices() -> Vec<VoiceIdentity> {
    DEFAULT_FALLBACK_VOICES
        .iter()
        .copied()
        .map(VoiceIdentity::from)
        .collect()
}

/// What the policy picked for one attempt index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSelection<'a> {
    /// Try this voice.
    Voice(&'a VoiceIdentity),
    /// The candidate for this index is the primary or was already tried.
    Skip,
    /// Every distinct voice has been tried.
    Exhausted,
}

/// Picks the voice for each attempt of a retry sequence.
///
/// Attempt 0 is always the primary voice; attempt `k > 0` maps to
/// `fallbacks[(k - 1) % len]`. The caller owns the set of voices already
/// tried, so independent retry loops never share state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceFallbackPolicy {
    primary: VoiceIdentity,
    fallbacks: Vec<VoiceIdentity>,
    distinct: usize,
}

impl VoiceFallbackPolicy {
    pub fn new(primary: VoiceIdentity, fallbacks: Vec<VoiceIdentity>) -> Self {
        let distinct = std::iter::once(&primary)
            .chain(fallbacks.iter())
            .collect::<HashSet<_>>()
            .len();
        Self {
            primary,
            fallbacks,
            distinct,
        }
    }

    pub fn primary(&self) -> &VoiceIdentity {
        &self.primary
    }

    pub fn fallbacks(&self) -> &[VoiceIdentity] {
        &self.fallbacks
    }

    /// Number of distinct voices among the primary and the fallbacks.
    pub fn distinct_voices(&self) -> usize {
        self.distinct
    }

    /// Attempt indices needed to visit every fallback slot once.
    pub fn attempts_to_cover_all(&self) -> usize {
        1 + self.fallbacks.len()
    }

    pub fn select(
        &self,
        attempt: usize,
        tried: &HashSet<VoiceIdentity>,
    ) -> VoiceSelection<'_> {
        if self.is_exhausted(tried) {
            return VoiceSelection::Exhausted;
        }
        if attempt == 0 {
            return VoiceSelection::Voice(&self.primary);
        }
        if self.fallbacks.is_empty() {
            return VoiceSelection::Exhausted;
        }

        let candidate = &self.fallbacks[(attempt - 1) % self.fallbacks.len()];
        if *candidate == self.primary || tried.contains(candidate) {
            VoiceSelection::Skip
        } else {
            VoiceSelection::Voice(candidate)
        }
    }

    fn is_exhausted(&self, tried: &HashSet<VoiceIdentity>) -> bool {
        tried.contains(&self.primary) && self.fallbacks.iter().all(|v| tried.contains(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(primary: &str, fallbacks: &[&str]) -> VoiceFallbackPolicy {
        VoiceFallbackPolicy::new(
            primary.into(),
            fallbacks.iter().copied().map(VoiceIdentity::from).collect(),
        )
    }

    #[test]
    fn first_attempt_is_primary() {
        let p = policy("A", &["B", "C"]);
        assert_eq!(p.select(0, &HashSet::new()), VoiceSelection::Voice(&"A".into()));
    }

    #[test]
    fn rotates_through_fallbacks() {
        let p = policy("A", &["B", "C", "D"]);
        let mut tried = HashSet::new();
        tried.insert(VoiceIdentity::from("A"));
        assert_eq!(p.select(1, &tried), VoiceSelection::Voice(&"B".into()));
        tried.insert("B".into());
        assert_eq!(p.select(2, &tried), VoiceSelection::Voice(&"C".into()));
        // index 4 wraps back to B, which was already tried
        assert_eq!(p.select(4, &tried), VoiceSelection::Skip);
    }

    #[test]
    fn skips_primary_in_fallback_list() {
        let p = policy("A", &["A", "B"]);
        let tried: HashSet<_> = [VoiceIdentity::from("A")].into_iter().collect();
        assert_eq!(p.select(1, &tried), VoiceSelection::Skip);
        assert_eq!(p.select(2, &tried), VoiceSelection::Voice(&"B".into()));
        assert_eq!(p.distinct_voices(), 2);
    }

    #[test]
    fn exhausted_once_all_distinct_voices_tried() {
        let p = policy("A", &["B", "A"]);
        let tried: HashSet<_> = ["A", "B"].into_iter().map(VoiceIdentity::from).collect();
        assert_eq!(p.select(0, &tried), VoiceSelection::Exhausted);
        assert_eq!(p.select(3, &tried), VoiceSelection::Exhausted);
    }

    #[test]
    fn no_fallbacks_exhausts_after_primary() {
        let p = policy("A", &[]);
        assert_eq!(p.select(1, &HashSet::new()), VoiceSelection::Exhausted);
        assert_eq!(p.attempts_to_cover_all(), 1);
    }
}
