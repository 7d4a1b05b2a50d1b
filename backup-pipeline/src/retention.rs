//! Retention rule for the remote archive.
//!
//! Once the archive holds more than the threshold, exactly one object (the
//! oldest) is selected per run. Repeated scheduled runs converge on the
//! threshold.

use crate::archive::RemoteObject;

/// Number of archived snapshots tolerated before pruning starts.
pub const RETENTION_THRESHOLD: usize = 2;

pub trait RetentionPolicy: Send + Sync {
    /// Name of the single object to delete, if any.
    fn select_for_deletion(&self, inventory: &[RemoteObject]) -> Option<String>;
}

/// Deletes the oldest object once the inventory exceeds `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdRetention {
    pub threshold: usize,
}

impl Default for ThresholdRetention {
    fn default() -> Self {
        Self {
            threshold: RETENTION_THRESHOLD,
        }
    }
}

impl RetentionPolicy for ThresholdRetention {
    fn select_for_deletion(&self, inventory: &[RemoteObject]) -> Option<String> {
        select_for_deletion(inventory, self.threshold)
    }
}

/// Returns the name of the oldest object when `inventory` holds more than
/// `threshold` entries. The caller's slice is left untouched.
pub fn select_for_deletion(inventory: &[RemoteObject], threshold: usize) -> Option<String> {
    if inventory.len() <= threshold {
        return None;
    }

    let mut ordered: Vec<&RemoteObject> = inventory.iter().collect();
    // Stable: equal timestamps keep listing order
    ordered.sort_by_key(|obj| obj.last_modified);
    ordered.first().map(|obj| obj.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn obj(name: &str, last_modified: DateTime<Utc>) -> RemoteObject {
        RemoteObject {
            name: name.to_string(),
            last_modified,
        }
    }

    #[test]
    fn test_threshold_table() {
        let now = Utc::now();
        let months = |n: i64| now - Duration::days(30 * n);

        let cases: Vec<(&str, Vec<RemoteObject>, Option<&str>)> = vec![
            ("no objects", vec![], None),
            ("one object", vec![obj("a", now)], None),
            ("two objects", vec![obj("a", now), obj("b", now)], None),
            (
                "three objects, oldest in the middle",
                vec![obj("a", now), obj("b", months(2)), obj("c", months(1))],
                Some("b"),
            ),
            (
                "three objects, oldest first",
                vec![obj("a", months(2)), obj("b", now), obj("c", months(1))],
                Some("a"),
            ),
            (
                "three objects, oldest last",
                vec![obj("a", months(1)), obj("b", now), obj("c", months(2))],
                Some("c"),
            ),
            (
                "four objects, only one selected",
                vec![
                    obj("a", months(1)),
                    obj("b", now),
                    obj("c", months(2)),
                    obj("d", months(3)),
                ],
                Some("d"),
            ),
        ];

        let policy = ThresholdRetention::default();
        for (case, inventory, expected) in cases {
            assert_eq!(
                policy.select_for_deletion(&inventory).as_deref(),
                expected,
                "{case}"
            );
        }
    }

    #[test]
    fn test_concrete_scenarios() {
        let now = Utc::now();
        let inventory = vec![
            obj("a", now - Duration::days(1)),
            obj("b", now),
            obj("c", now - Duration::days(2)),
        ];
        assert_eq!(
            select_for_deletion(&inventory, RETENTION_THRESHOLD),
            Some("c".to_string())
        );

        let t0 = now;
        let inventory = vec![obj("a", t0), obj("b", t0 + Duration::seconds(1))];
        assert_eq!(select_for_deletion(&inventory, RETENTION_THRESHOLD), None);
    }

    #[test]
    fn test_permutation_invariance() {
        let now = Utc::now();
        let base = vec![
            obj("newest", now),
            obj("middle", now - Duration::hours(5)),
            obj("oldest", now - Duration::days(3)),
            obj("recent", now - Duration::minutes(1)),
        ];

        // Every rotation and its reverse
        for shift in 0..base.len() {
            let mut rotated = base.clone();
            rotated.rotate_left(shift);
            assert_eq!(
                select_for_deletion(&rotated, RETENTION_THRESHOLD).as_deref(),
                Some("oldest")
            );
            rotated.reverse();
            assert_eq!(
                select_for_deletion(&rotated, RETENTION_THRESHOLD).as_deref(),
                Some("oldest")
            );
        }
    }

    #[test]
    fn test_does_not_reorder_input() {
        let now = Utc::now();
        let inventory = vec![
            obj("a", now),
            obj("b", now - Duration::days(1)),
            obj("c", now - Duration::days(2)),
        ];
        let before: Vec<String> = inventory.iter().map(|o| o.name.clone()).collect();

        let _ = select_for_deletion(&inventory, RETENTION_THRESHOLD);

        let after: Vec<String> = inventory.iter().map(|o| o.name.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_ties_resolve_to_listing_order() {
        let t = Utc::now() - Duration::days(4);
        let inventory = vec![
            obj("first", t),
            obj("second", t),
            obj("third", t + Duration::days(1)),
        ];
        assert_eq!(
            select_for_deletion(&inventory, RETENTION_THRESHOLD).as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_custom_threshold() {
        let now = Utc::now();
        let policy = ThresholdRetention { threshold: 0 };
        assert_eq!(
            policy.select_for_deletion(&[obj("only", now)]).as_deref(),
            Some("only")
        );
        assert_eq!(policy.select_for_deletion(&[]), None);
    }
}
