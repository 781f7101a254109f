use std::sync::Arc;

use tracing::debug;

use specreg_db::SpecStore;
use specreg_types::CustomerId;

use crate::error::QuotaResult;
use crate::limit::LimitSource;

// ---------------------------------------------------------------------------
// QuotaDecision
// ---------------------------------------------------------------------------

/// Outcome of one quota check. Computed fresh for every write attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotaDecision {
    /// `true` if accepting the write would exceed the ceiling.
    pub exceeded: bool,
    /// Ceiling in effect when the check ran.
    pub ceiling: u64,
    /// Models already counted against the customer.
    pub current: u64,
    /// Models the write would add.
    pub proposed: u64,
    /// User-facing explanation, present when `exceeded`.
    pub reason: Option<String>,
}

impl QuotaDecision {
    /// Decide `current + proposed > ceiling`.
    pub fn evaluate(ceiling: u64, current: u64, proposed: u64) -> Self {
        let exceeded = current.saturating_add(proposed) > ceiling;
        let reason = exceeded.then(|| {
            format!(
                "with this spec the maximum number of {ceiling} models for the free tier \
                 would be exceeded, current models count: {current}, models in this spec: {proposed}"
            )
        });
        Self {
            exceeded,
            ceiling,
            current,
            proposed,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        !self.exceeded
    }
}

// ---------------------------------------------------------------------------
// QuotaPolicy
// ---------------------------------------------------------------------------

/// Free-tier quota on the total number of models a customer stores.
///
/// The ceiling comes from an injected [`LimitSource`] and is resolved on
/// every check. The current count is read from the metadata store at check
/// time; the check is not atomic with the write that follows it.
#[derive(Clone)]
pub struct QuotaPolicy {
    limit: Arc<dyn LimitSource>,
}

impl QuotaPolicy {
    pub fn new(limit: impl LimitSource + 'static) -> Self {
        Self {
            limit: Arc::new(limit),
        }
    }

    pub fn from_arc(limit: Arc<dyn LimitSource>) -> Self {
        Self { limit }
    }

    /// Ceiling currently in effect.
    pub fn ceiling(&self) -> u64 {
        self.limit.ceiling()
    }

    /// Would adding `proposed` models push the customer over the ceiling?
    pub fn check_would_exceed<S: SpecStore + ?Sized>(
        &self,
        store: &S,
        sub: &CustomerId,
        proposed: u64,
    ) -> QuotaResult<QuotaDecision> {
        let current = store.count_customer_models(sub)?;
        Ok(self.decide(current, proposed))
    }

    fn decide(&self, current: u64, proposed: u64) -> QuotaDecision {
        let decision = QuotaDecision::evaluate(self.ceiling(), current, proposed);
        debug!(
            ceiling = decision.ceiling,
            current,
            proposed,
            exceeded = decision.exceeded,
            "quota checked"
        );
        decision
    }
}

impl std::fmt::Debug for QuotaPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaPolicy")
            .field("ceiling", &self.ceiling())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limit::SharedLimit;
    use proptest::prelude::*;
    use specreg_db::{InMemoryDatabase, SpecMetadata};
    use specreg_types::{SpecId, SpecVersion};

    fn sub(s: &str) -> CustomerId {
        CustomerId::new(s).unwrap()
    }

    fn store_spec(db: &InMemoryDatabase, spec_id: &str, version: &str, models: u64) {
        let meta = SpecMetadata {
            version: SpecVersion::new(version).unwrap(),
            model_count: models,
            title: None,
            description: None,
        };
        db.create_update_spec(&sub("alice"), &SpecId::new(spec_id).unwrap(), &meta)
            .unwrap();
    }

    #[test]
    fn reason_string_is_exact() {
        let decision = QuotaDecision::evaluate(5, 3, 3);
        assert!(decision.exceeded);
        assert_eq!(
            decision.reason.as_deref(),
            Some(
                "with this spec the maximum number of 5 models for the free tier would be \
                 exceeded, current models count: 3, models in this spec: 3"
            )
        );
    }

    #[test]
    fn reaching_the_ceiling_exactly_is_allowed() {
        let decision = QuotaDecision::evaluate(5, 2, 3);
        assert!(decision.is_allowed());
        assert!(decision.reason.is_none());
    }

    #[test]
    fn check_reads_current_count_from_store() {
        let db = InMemoryDatabase::new();
        let policy = QuotaPolicy::new(5u64);

        let first = policy.check_would_exceed(&db, &sub("alice"), 3).unwrap();
        assert!(first.is_allowed());
        store_spec(&db, "pets", "1", 3);

        let second = policy.check_would_exceed(&db, &sub("alice"), 3).unwrap();
        assert!(second.exceeded);
        assert_eq!((second.ceiling, second.current, second.proposed), (5, 3, 3));
    }

    #[test]
    fn ceiling_change_applies_to_next_check() {
        let db = InMemoryDatabase::new();
        store_spec(&db, "pets", "1", 3);
        let limit = SharedLimit::new(10);
        let policy = QuotaPolicy::new(limit.clone());

        assert!(policy.check_would_exceed(&db, &sub("alice"), 3).unwrap().is_allowed());
        limit.set(5);
        assert!(policy.check_would_exceed(&db, &sub("alice"), 3).unwrap().exceeded);
    }

    #[test]
    fn huge_values_do_not_overflow() {
        assert!(QuotaDecision::evaluate(u64::MAX, u64::MAX, 1).exceeded);
    }

    proptest! {
        #[test]
        fn larger_proposals_stay_exceeded(
            ceiling in 0u64..10_000,
            current in 0u64..10_000,
            proposed in 0u64..10_000,
            extra in 0u64..10_000,
        ) {
            let base = QuotaDecision::evaluate(ceiling, current, proposed);
            if base.exceeded {
                prop_assert!(QuotaDecision::evaluate(ceiling, current, proposed + extra).exceeded);
            }
        }

        #[test]
        fn lowering_the_ceiling_never_allows_more(
            ceiling in 0u64..10_000,
            lower_by in 0u64..10_000,
            current in 0u64..10_000,
            proposed in 0u64..10_000,
        ) {
            let lower = ceiling.saturating_sub(lower_by);
            let before = QuotaDecision::evaluate(ceiling, current, proposed);
            let after = QuotaDecision::evaluate(lower, current, proposed);
            if before.exceeded {
                prop_assert!(after.exceeded);
            }
        }
    }
}
