use std::cmp::Ordering;
use std::collections::HashMap;

use super::Keyed;
use crate::record::ChangeEvent;
use crate::types::RecordId;

/// What applying one event did to a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new entry was prepended.
    Inserted,
    /// An existing entry was replaced in place.
    Replaced,
    /// An entry was removed.
    Removed,
    /// Nothing changed (delete of an absent id).
    Unchanged,
}

impl ApplyOutcome {
    pub fn is_change(self) -> bool {
        self != ApplyOutcome::Unchanged
    }
}

/// An ordered list of records with unique ids.
///
/// Order is insertion order: snapshot order first, with records created
/// afterwards prepended. Updates keep their position.
///
/// # Example
///
/// ```
/// use filedeck_core::{ChangeEvent, Record, RecordId, RecordList};
///
/// let rec = |id: &str| Record::with_id(RecordId::new(id).unwrap());
///
/// let mut list = RecordList::from_snapshot(vec![rec("a"), rec("b")]);
/// list.apply(ChangeEvent::Created(rec("c")));
/// list.apply(ChangeEvent::Deleted(RecordId::new("a").unwrap()));
///
/// let ids: Vec<_> = list.iter().map(|r| r.id.as_str()).collect();
/// assert_eq!(ids, ["c", "b"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RecordList<T> {
    items: Vec<T>,
}

impl<T> Default for RecordList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> RecordList<T> {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// A list holding exactly `snapshot`, in order.
    pub fn from_snapshot(snapshot: impl IntoIterator<Item = T>) -> Self {
        let mut list = Self::new();
        list.initialize(snapshot);
        list
    }

    /// Replaces the whole content with `snapshot`.
    ///
    /// A repeated id replaces the earlier occurrence in place.
    pub fn initialize(&mut self, snapshot: impl IntoIterator<Item = T>) {
        let mut index: HashMap<RecordId, usize> = HashMap::new();
        let mut items: Vec<T> = Vec::new();

        for item in snapshot {
            match index.get(item.key()) {
                Some(&pos) => items[pos] = item,
                None => {
                    index.insert(item.key().clone(), items.len());
                    items.push(item);
                }
            }
        }

        self.items = items;
    }

    /// Applies one change event.
    ///
    /// A create for a present id replaces it; an update for an absent id
    /// prepends it; a delete for an absent id does nothing.
    pub fn apply(&mut self, event: ChangeEvent<T>) -> ApplyOutcome {
        match event {
            ChangeEvent::Created(item) | ChangeEvent::Updated(item) => self.upsert(item),
            ChangeEvent::Deleted(id) => match self.remove(&id) {
                Some(_) => ApplyOutcome::Removed,
                None => ApplyOutcome::Unchanged,
            },
        }
    }

    /// Replaces the entry with the same id, or prepends a new one.
    pub fn upsert(&mut self, item: T) -> ApplyOutcome {
        match self.position(item.key()) {
            Some(pos) => {
                self.items[pos] = item;
                ApplyOutcome::Replaced
            }
            None => {
                self.items.insert(0, item);
                ApplyOutcome::Inserted
            }
        }
    }

    /// Removes and returns the entry with `id`.
    pub fn remove(&mut self, id: &RecordId) -> Option<T> {
        self.position(id).map(|pos| self.items.remove(pos))
    }

    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.items.iter().position(|item| item.key() == id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&T> {
        self.items.iter().find(|item| item.key() == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// The `n` most recently updated entries.
    pub fn bounded_recent(&self, n: usize) -> Vec<T>
    where
        T: Clone,
    {
        bounded_recent(&self.items, n)
    }
}

impl<'a, T> IntoIterator for &'a RecordList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Copies `items` sorted by update time, newest first, truncated to `n`.
///
/// Entries without a timestamp sort last. Ties keep their list order.
pub fn bounded_recent<T: Keyed + Clone>(items: &[T], n: usize) -> Vec<T> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| match (a.updated_at(), b.updated_at()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::types::Timestamp;
    use std::collections::HashSet;

    fn id(s: &str) -> RecordId {
        RecordId::new(s).unwrap()
    }

    fn rec(s: &str, updated: &str) -> Record {
        let mut r = Record::with_id(id(s));
        r.updated = Some(Timestamp::parse(updated).unwrap());
        r
    }

    fn named(s: &str, name: &str) -> Record {
        let mut r = Record::with_id(id(s));
        r.fields.insert("name".into(), name.into());
        r
    }

    fn ids(list: &RecordList<Record>) -> Vec<&str> {
        list.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn created_is_prepended() {
        let mut list = RecordList::from_snapshot(vec![
            rec("1", "2024-01-01 00:00:01.000Z"),
            rec("2", "2024-01-01 00:00:02.000Z"),
        ]);

        let outcome = list.apply(ChangeEvent::Created(rec("3", "2024-01-01 00:00:03.000Z")));

        assert_eq!(outcome, ApplyOutcome::Inserted);
        assert_eq!(ids(&list), ["3", "1", "2"]);
    }

    #[test]
    fn updated_keeps_position() {
        let mut list = RecordList::from_snapshot(vec![named("1", "a"), named("2", "b")]);

        let outcome = list.apply(ChangeEvent::Updated(named("2", "x")));

        assert_eq!(outcome, ApplyOutcome::Replaced);
        assert_eq!(ids(&list), ["1", "2"]);
        assert_eq!(list.get(&id("2")).and_then(Record::name), Some("x"));
    }

    #[test]
    fn deleting_twice_is_a_noop() {
        let mut list = RecordList::from_snapshot(vec![named("1", "a"), named("2", "b")]);

        assert_eq!(list.apply(ChangeEvent::Deleted(id("1"))), ApplyOutcome::Removed);
        assert_eq!(ids(&list), ["2"]);

        assert_eq!(list.apply(ChangeEvent::Deleted(id("1"))), ApplyOutcome::Unchanged);
        assert_eq!(ids(&list), ["2"]);
    }

    #[test]
    fn created_for_present_id_acts_as_update() {
        let mut list = RecordList::from_snapshot(vec![named("1", "a"), named("2", "b")]);

        let outcome = list.apply(ChangeEvent::Created(named("2", "again")));

        assert_eq!(outcome, ApplyOutcome::Replaced);
        assert_eq!(ids(&list), ["1", "2"]);
        assert_eq!(list.get(&id("2")).and_then(Record::name), Some("again"));
    }

    #[test]
    fn updated_for_absent_id_acts_as_create() {
        let mut list = RecordList::from_snapshot(vec![named("1", "a")]);

        let outcome = list.apply(ChangeEvent::Updated(named("9", "late")));

        assert_eq!(outcome, ApplyOutcome::Inserted);
        assert_eq!(ids(&list), ["9", "1"]);
    }

    #[test]
    fn initialize_replaces_content_and_dedupes() {
        let mut list = RecordList::from_snapshot(vec![named("old", "x")]);

        list.initialize(vec![named("1", "a"), named("2", "b"), named("1", "c")]);

        assert_eq!(ids(&list), ["1", "2"]);
        assert_eq!(list.get(&id("1")).and_then(Record::name), Some("c"));
    }

    #[test]
    fn bounded_recent_sorts_and_truncates() {
        let list = RecordList::from_snapshot(vec![
            rec("a", "2024-01-01 00:00:01.000Z"),
            Record::with_id(id("none")),
            rec("c", "2024-01-01 00:00:03.000Z"),
            rec("b", "2024-01-01 00:00:02.000Z"),
            rec("tie", "2024-01-01 00:00:03.000Z"),
        ]);

        let recent = list.bounded_recent(4);
        let recent: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(recent, ["c", "tie", "b", "a"]);

        assert_eq!(list.bounded_recent(10).last().map(|r| r.id.as_str()), Some("none"));
        assert!(list.bounded_recent(0).is_empty());
    }

    /// Small deterministic generator so the sequence test needs no extra crates.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            self.0 >> 33
        }
    }

    #[test]
    fn arbitrary_event_sequences_keep_ids_unique() {
        for seed in 0..50u64 {
            let mut rng = Lcg(seed);
            let mut list = RecordList::new();
            list.initialize((0..rng.next() % 5).map(|i| named(&format!("r{}", i), "s")));

            for step in 0..200 {
                let key = format!("r{}", rng.next() % 8);
                let name = format!("v{}", step);
                let event = match rng.next() % 3 {
                    0 => ChangeEvent::Created(named(&key, &name)),
                    1 => ChangeEvent::Updated(named(&key, &name)),
                    _ => ChangeEvent::Deleted(id(&key)),
                };
                let deleted = matches!(event, ChangeEvent::Deleted(_));

                list.apply(event);

                let unique: HashSet<&str> = list.iter().map(|r| r.id.as_str()).collect();
                assert_eq!(unique.len(), list.len(), "seed {} step {}", seed, step);

                if deleted {
                    assert!(!list.contains(&id(&key)));
                } else {
                    assert_eq!(list.get(&id(&key)).and_then(Record::name), Some(name.as_str()));
                }
            }
        }
    }
}
