//! Batch grouping of generation history.
//!
//! Records sharing a `batch_id` form one group; a record without one forms a
//! singleton group keyed by its own id. Group order preserves the first-seen
//! order of the input scan (the history query returns newest first, so
//! groups come out newest first too).

use std::collections::HashMap;

use uuid::Uuid;

use crate::types::DbId;

/// Prefix for synthetic single-record group keys.
const SINGLE_KEY_PREFIX: &str = "single-";

/// Compute the grouping key for one record.
pub fn group_key(batch_id: Option<&Uuid>, record_id: DbId) -> String {
    match batch_id {
        Some(batch) => batch.to_string(),
        None => format!("{SINGLE_KEY_PREFIX}{record_id}"),
    }
}

/// What a grouping key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// A standalone record.
    Single(DbId),
    /// A whole batch.
    Batch(Uuid),
}

/// Parse a grouping key back into what it addresses.
pub fn parse_group_key(key: &str) -> Option<GroupKey> {
    if let Some(rest) = key.strip_prefix(SINGLE_KEY_PREFIX) {
        return rest.parse().ok().map(GroupKey::Single);
    }
    Uuid::parse_str(key).ok().map(GroupKey::Batch)
}

/// One group of records sharing a grouping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<T> {
    /// The shared batch id, or the synthetic single-record key.
    pub key: String,
    /// Member records in scan order.
    pub items: Vec<T>,
}

/// Partition `items` into groups, preserving first-seen key order.
///
/// Every item lands in exactly one group; no item is dropped.
pub fn group_by_key<T>(items: Vec<T>, key_of: impl Fn(&T) -> String) -> Vec<Group<T>> {
    let mut index_of: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group<T>> = Vec::new();

    for item in items {
        let key = key_of(&item);
        match index_of.get(&key) {
            Some(&i) => groups[i].items.push(item),
            None => {
                index_of.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    items: vec![item],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rec {
        id: DbId,
        batch: Option<Uuid>,
    }

    fn key_of(r: &Rec) -> String {
        group_key(r.batch.as_ref(), r.id)
    }

    #[test]
    fn batch_records_share_a_group() {
        let batch = Uuid::new_v4();
        let recs = vec![
            Rec { id: 1, batch: Some(batch) },
            Rec { id: 2, batch: Some(batch) },
            Rec { id: 3, batch: None },
        ];
        let groups = group_by_key(recs, key_of);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, batch.to_string());
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[1].key, "single-3");
        assert_eq!(groups[1].items.len(), 1);
    }

    #[test]
    fn standalone_records_get_unique_keys() {
        let recs = vec![Rec { id: 10, batch: None }, Rec { id: 11, batch: None }];
        let groups = group_by_key(recs, key_of);
        assert_eq!(groups.len(), 2);
        assert_ne!(groups[0].key, groups[1].key);
    }

    #[test]
    fn grouping_partitions_without_loss_or_overlap() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let recs: Vec<Rec> = (0..20)
            .map(|i| Rec {
                id: i,
                batch: match i % 3 {
                    0 => Some(a),
                    1 => Some(b),
                    _ => None,
                },
            })
            .collect();

        let groups = group_by_key(recs, key_of);
        let total: usize = groups.iter().map(|g| g.items.len()).sum();
        assert_eq!(total, 20);

        let mut seen = std::collections::HashSet::new();
        for group in &groups {
            for item in &group.items {
                assert!(seen.insert(item.id), "record {} appears twice", item.id);
            }
        }
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // Newest-first scan: b appears first, then a, interleaved.
        let recs = vec![
            Rec { id: 1, batch: Some(b) },
            Rec { id: 2, batch: Some(a) },
            Rec { id: 3, batch: Some(b) },
        ];
        let groups = group_by_key(recs, key_of);
        assert_eq!(groups[0].key, b.to_string());
        assert_eq!(groups[1].key, a.to_string());
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let groups = group_by_key(Vec::<Rec>::new(), key_of);
        assert!(groups.is_empty());
    }

    #[test]
    fn keys_parse_back_to_what_they_address() {
        let batch = Uuid::new_v4();
        assert_eq!(
            parse_group_key(&group_key(Some(&batch), 9)),
            Some(GroupKey::Batch(batch))
        );
        assert_eq!(
            parse_group_key(&group_key(None, 9)),
            Some(GroupKey::Single(9))
        );
        assert_eq!(parse_group_key("not-a-key"), None);
    }
}
