//! Set-like operations on id lists such as `shared` and a folder's `file`.
//!
//! Existing members keep their order; additions append.

use crate::types::RecordId;

pub fn contains(members: &[RecordId], id: &RecordId) -> bool {
    members.contains(id)
}

/// Adds `id` unless already present. Returns true if the list changed.
pub fn add(members: &mut Vec<RecordId>, id: RecordId) -> bool {
    if members.contains(&id) {
        return false;
    }
    members.push(id);
    true
}

/// Removes every occurrence of `id`. Returns true if the list changed.
pub fn remove(members: &mut Vec<RecordId>, id: &RecordId) -> bool {
    let before = members.len();
    members.retain(|m| m != id);
    members.len() != before
}

/// Adds `id` if absent, removes it if present. Returns true if `id` is now a member.
pub fn toggle(members: &mut Vec<RecordId>, id: RecordId) -> bool {
    if remove(members, &id) {
        false
    } else {
        members.push(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<RecordId> {
        list.iter().map(|s| RecordId::new(*s).unwrap()).collect()
    }

    #[test]
    fn add_does_not_duplicate() {
        let mut members = ids(&["a", "b"]);
        assert!(!add(&mut members, RecordId::new("a").unwrap()));
        assert!(add(&mut members, RecordId::new("c").unwrap()));
        assert_eq!(members, ids(&["a", "b", "c"]));
    }

    #[test]
    fn remove_keeps_order() {
        let mut members = ids(&["a", "b", "c"]);
        assert!(remove(&mut members, &RecordId::new("b").unwrap()));
        assert!(!remove(&mut members, &RecordId::new("b").unwrap()));
        assert_eq!(members, ids(&["a", "c"]));
    }

    #[test]
    fn toggle_flips_membership() {
        let mut members = ids(&["a"]);
        let b = RecordId::new("b").unwrap();

        assert!(toggle(&mut members, b.clone()));
        assert!(contains(&members, &b));
        assert!(!toggle(&mut members, b.clone()));
        assert!(!contains(&members, &b));
        assert_eq!(members, ids(&["a"]));
    }
}
