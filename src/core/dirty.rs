use chrono::NaiveDate;
use std::collections::BTreeSet;

/// A `(subject, day)` pair whose aggregate must be recomputed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirtyDay {
    pub subject_id: String,
    pub day: NaiveDate,
}

impl DirtyDay {
    pub fn new(subject_id: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            subject_id: subject_id.into(),
            day,
        }
    }
}

/// Deduplicated set of dirty pairs, iterated in (subject, day) order.
#[derive(Debug, Default, Clone)]
pub struct DirtyDays {
    days: BTreeSet<DirtyDay>,
}

impl DirtyDays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs without a subject cannot be aggregated and are ignored.
    pub fn mark(&mut self, subject_id: Option<&str>, day: NaiveDate) -> bool {
        match subject_id {
            Some(s) if !s.is_empty() => self.days.insert(DirtyDay::new(s, day)),
            _ => false,
        }
    }

    pub fn extend<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (String, NaiveDate)>,
    {
        for (subject, day) in pairs {
            self.mark(Some(&subject), day);
        }
    }

    pub fn union(&mut self, other: &DirtyDays) {
        self.days.extend(other.days.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirtyDay> {
        self.days.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn dedups_and_orders_pairs() {
        let mut set = DirtyDays::new();
        assert!(set.mark(Some("B"), d("2025-01-02")));
        assert!(set.mark(Some("A"), d("2025-01-03")));
        assert!(!set.mark(Some("B"), d("2025-01-02")));
        assert!(!set.mark(None, d("2025-01-02")));

        let mut persisted = DirtyDays::new();
        persisted.extend(vec![("A".to_string(), d("2025-01-01")), ("B".to_string(), d("2025-01-02"))]);
        set.union(&persisted);

        let keys: Vec<(String, String)> = set
            .iter()
            .map(|p| (p.subject_id.clone(), p.day.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A".into(), "2025-01-01".into()),
                ("A".into(), "2025-01-03".into()),
                ("B".into(), "2025-01-02".into()),
            ]
        );
    }
}
