use std::time::Duration;

use super::key::QueryKey;

/// Per key-family staleness rules.
///
/// Keys with no matching rule stay fresh until explicitly invalidated.
/// When several rules match, the longest prefix wins.
#[derive(Debug, Clone, Default)]
pub struct StalePolicy {
  rules: Vec<(QueryKey, Duration)>,
}

impl StalePolicy {
  pub fn new() -> Self {
    Self::default()
  }

  /// Entries under `prefix` go stale `ttl` after they were fetched.
  pub fn with_rule(mut self, prefix: QueryKey, ttl: Duration) -> Self {
    self.rules.push((prefix, ttl));
    self
  }

  pub fn ttl_for(&self, key: &QueryKey) -> Option<Duration> {
    self
      .rules
      .iter()
      .filter(|(prefix, _)| key.starts_with(prefix))
      .max_by_key(|(prefix, _)| prefix.segments().len())
      .map(|(_, ttl)| *ttl)
  }
}
