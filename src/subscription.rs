//! Decides whether an inbound OSC address is delivered to the external
//! sink (C6).
//!
//! Two modes: accept-all (the default, and the state whenever the
//! subscribed set becomes empty) or a set of pattern strings, OR'd
//! together. See spec.md §4.4 for the pattern grammar and §9 Open Question
//! 1 for the (preserved) non-exclusivity of negative patterns.

use std::collections::HashSet;

use tokio::sync::RwLock;

enum Mode {
    AcceptAll,
    Patterns(HashSet<String>),
}

/// Subscription state, mutated from control paths and read on every inbound
/// datagram — hence the lock (§5).
pub struct SubscriptionFilter {
    mode: RwLock<Mode>,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionFilter {
    pub fn new() -> Self {
        Self {
            mode: RwLock::new(Mode::AcceptAll),
        }
    }

    /// Disable accept-all, add `pattern` to the subscribed set.
    pub async fn subscribe(&self, pattern: impl Into<String>) {
        let mut mode = self.mode.write().await;
        let set = match &mut *mode {
            Mode::Patterns(set) => set,
            Mode::AcceptAll => {
                *mode = Mode::Patterns(HashSet::new());
                match &mut *mode {
                    Mode::Patterns(set) => set,
                    Mode::AcceptAll => unreachable!(),
                }
            }
        };
        set.insert(pattern.into());
    }

    /// Remove `pattern`; if the set becomes empty, re-enable accept-all.
    pub async fn unsubscribe(&self, pattern: &str) {
        let mut mode = self.mode.write().await;
        if let Mode::Patterns(set) = &mut *mode {
            set.remove(pattern);
            if set.is_empty() {
                *mode = Mode::AcceptAll;
            }
        }
    }

    /// Clear the subscribed set and re-enable accept-all.
    ///
    /// Named `subscribe_all_paths` rather than the source's
    /// `subscribeToAll` — see spec.md §9 Open Question 3, the original name
    /// shadows an instance field and is unreachable there.
    pub async fn subscribe_all_paths(&self) {
        let mut mode = self.mode.write().await;
        *mode = Mode::AcceptAll;
    }

    /// Whether `address` is accepted — `true` iff accept-all is active, or
    /// any subscribed pattern matches (OR across patterns).
    pub async fn accepts(&self, address: &str) -> bool {
        match &*self.mode.read().await {
            Mode::AcceptAll => true,
            Mode::Patterns(set) => set.iter().any(|p| pattern_matches(p, address)),
        }
    }
}

/// One pattern's match rule, per spec.md §4.4:
/// 1. Exact — pattern equals address.
/// 2. Prefix wildcard — `pattern` ends with `*`; matches addresses
///    starting with the prefix before `*`.
/// 3. Negative substring — contains the literal token `(!?`; splits into
///    `basePattern` (left) and `excludePattern` (right, up to the next
///    `)`). Matches when address starts with `basePattern` and does NOT
///    contain `excludePattern`.
fn pattern_matches(pattern: &str, address: &str) -> bool {
    if let Some(token_start) = pattern.find("(!?") {
        let base = &pattern[..token_start];
        let rest = &pattern[token_start + "(!?".len()..];
        let exclude = match rest.find(')') {
            Some(end) => &rest[..end],
            None => rest,
        };
        return address.starts_with(base) && !address.contains(exclude);
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return address.starts_with(prefix);
    }
    pattern == address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_accepts_everything() {
        let f = SubscriptionFilter::new();
        assert!(f.accepts("/anything/at/all").await);
    }

    #[tokio::test]
    async fn exact_pattern() {
        let f = SubscriptionFilter::new();
        f.subscribe("/avatar/parameters/mood").await;
        assert!(f.accepts("/avatar/parameters/mood").await);
        assert!(!f.accepts("/avatar/parameters/other").await);
    }

    #[tokio::test]
    async fn prefix_wildcard() {
        let f = SubscriptionFilter::new();
        f.subscribe("/avatar/parameters/*").await;
        assert!(f.accepts("/avatar/parameters/mood").await);
        assert!(!f.accepts("/tracking/vrsystem").await);
    }

    #[tokio::test]
    async fn negative_substring() {
        let f = SubscriptionFilter::new();
        f.subscribe("/avatar/parameters/(!?vrcft)").await;
        assert!(f.accepts("/avatar/parameters/mood").await);
        assert!(!f.accepts("/avatar/parameters/vrcft/eye").await);
    }

    /// S6 from spec.md §8.
    #[tokio::test]
    async fn s6_or_semantics_then_narrowing() {
        let f = SubscriptionFilter::new();
        f.subscribe("/avatar/parameters/*").await;
        f.subscribe("/avatar/parameters/(!?vrcft)").await;

        // OR across patterns: the wildcard still matches even though the
        // negative pattern would reject it on its own.
        assert!(f.accepts("/avatar/parameters/mood").await);
        assert!(f.accepts("/avatar/parameters/vrcft/eye").await);

        f.unsubscribe("/avatar/parameters/*").await;

        assert!(f.accepts("/avatar/parameters/mood").await);
        assert!(!f.accepts("/avatar/parameters/vrcft/eye").await);
    }

    #[tokio::test]
    async fn unsubscribe_last_pattern_restores_accept_all() {
        let f = SubscriptionFilter::new();
        f.subscribe("/only/one").await;
        f.unsubscribe("/only/one").await;
        assert!(f.accepts("/whatever").await);
    }

    #[tokio::test]
    async fn subscribe_all_paths_resets_to_accept_all() {
        let f = SubscriptionFilter::new();
        f.subscribe("/only/one").await;
        f.subscribe_all_paths().await;
        assert!(f.accepts("/whatever/else").await);
    }
}
