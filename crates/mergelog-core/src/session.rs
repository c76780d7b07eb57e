//! Session context: one per process run.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// How far back the cutoff reaches when the caller supplies none.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Run-scoped identity and cutoff, stamped onto every stored row.
///
/// Created once at startup and passed explicitly to everything that needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
  id:         Uuid,
  cutoff:     DateTime<Utc>,
  started_at: DateTime<Utc>,
}

impl SessionContext {
  pub fn new(cutoff: Option<DateTime<Utc>>) -> Self {
    let started_at = Utc::now();
    Self {
      id: Uuid::new_v4(),
      cutoff: cutoff
        .unwrap_or_else(|| started_at - Duration::days(DEFAULT_LOOKBACK_DAYS)),
      started_at,
    }
  }

  pub fn id(&self) -> Uuid { self.id }

  /// The earliest merge timestamp eligible for this run.
  pub fn cutoff(&self) -> DateTime<Utc> { self.cutoff }

  pub fn started_at(&self) -> DateTime<Utc> { self.started_at }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn default_cutoff_is_thirty_days_back() {
    let s = SessionContext::new(None);
    assert_eq!(s.started_at() - s.cutoff(), Duration::days(30));
  }

  #[test]
  fn explicit_cutoff_is_kept() {
    let cutoff = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let s = SessionContext::new(Some(cutoff));
    assert_eq!(s.cutoff(), cutoff);
  }

  #[test]
  fn each_session_gets_its_own_id() {
    assert_ne!(SessionContext::new(None).id(), SessionContext::new(None).id());
  }
}
