//! Built-in dispatching rules.
//!
//! All rules return lower scores for higher priority items.

use super::{DispatchingRule, RuleScore};
use crate::normalize::OrderMetrics;

/// Earliest Due Date.
///
/// # Reference
/// Jackson (1955), optimal for minimizing maximum lateness on single machine.
#[derive(Debug, Clone, Copy)]
pub struct Edd;

impl DispatchingRule for Edd {
    fn name(&self) -> &'static str {
        "EDD"
    }

    fn evaluate(&self, order: &OrderMetrics) -> RuleScore {
        order.days_until_deadline as f64
    }
}

/// Highest urgency score first.
///
/// Urgency blends the priority tier with deadline proximity, so a High
/// item always precedes a Medium one.
#[derive(Debug, Clone, Copy)]
pub struct Urgency;

impl DispatchingRule for Urgency {
    fn name(&self) -> &'static str {
        "URGENCY"
    }

    fn evaluate(&self, order: &OrderMetrics) -> RuleScore {
        -(order.urgency_score as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactoryConfig, WorkItem};
    use crate::normalize::normalize;
    use chrono::NaiveDate;

    #[test]
    fn test_scores() {
        let date = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
        let items = vec![
            WorkItem::per_unit("far", 4, date(21), 1.0),
            WorkItem::per_unit("near", 16, date(3), 1.0),
        ];
        let m = normalize(&items, &FactoryConfig::new(8.0), date(1)).unwrap().metrics;

        assert_eq!(Edd.evaluate(&m[1]), 2.0);
        assert_eq!(Edd.evaluate(&m[0]), 20.0);
        // near is derived High (3000 - 2), far Low (1000 - 20)
        assert_eq!(Urgency.evaluate(&m[1]), -2998.0);
        assert_eq!(Urgency.evaluate(&m[0]), -980.0);
        assert_eq!(Urgency.name(), "URGENCY");
    }
}
