//! Interest-filter table (spec §3, §4.5).
//!
//! Filters may be added without a corresponding forwarder registration
//! when the application only wants local dispatch (`setInterestFilter`).
//!
//! `callback` is taken out of the entry before being invoked and put back
//! afterward (spec §4.5 "Concurrency for callbacks": a callback may call
//! back into the Face) so the Face's table mutex is never held while a
//! user callback runs.

use ndn_common::interest::Interest;
use ndn_common::name::Name;

pub type OnInterestCallback = Box<dyn FnMut(&Name, &Interest) + Send>;

/// A prefix plus an optional relative suffix pattern. When present, the
/// pattern must equal the Interest name's components following the
/// prefix exactly (spec §4.5: "if the filter has a suffix pattern, the
/// remainder matches the pattern").
pub struct InterestFilterEntry {
    pub id: u64,
    pub prefix: Name,
    pub suffix_pattern: Option<Name>,
    callback: Option<OnInterestCallback>,
}

impl InterestFilterEntry {
    pub fn matches(&self, name: &Name) -> bool {
        if !self.prefix.is_prefix_of(name) {
            return false;
        }
        match &self.suffix_pattern {
            None => true,
            Some(pattern) => {
                let remainder = name.get_sub_name(self.prefix.len() as i64, name.len());
                &remainder == pattern
            }
        }
    }
}

#[derive(Default)]
pub struct InterestFilterTable {
    entries: Vec<InterestFilterEntry>,
    next_id: u64,
}

impl InterestFilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(
        &mut self,
        prefix: Name,
        suffix_pattern: Option<Name>,
        on_interest: OnInterestCallback,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(InterestFilterEntry {
            id,
            prefix,
            suffix_pattern,
            callback: Some(on_interest),
        });
        id
    }

    pub fn remove(&mut self, id: u64) -> Option<InterestFilterEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Every filter matching `name`, in ascending entry-ID order (spec
    /// §4.5 "Interest dispatch": "Multiple matches all fire").
    pub fn matching_ids(&self, name: &Name) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .entries
            .iter()
            .filter(|e| e.matches(name))
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The prefix registered under `id`, if the entry still exists.
    pub fn entry_prefix(&self, id: u64) -> Option<Name> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.prefix.clone())
    }

    /// Takes the callback out of entry `id` so it can be invoked without
    /// the table's mutex held. Returns `None` if the entry (or its
    /// callback, already taken) is gone.
    pub fn take_callback(&mut self, id: u64) -> Option<OnInterestCallback> {
        self.entries.iter_mut().find(|e| e.id == id)?.callback.take()
    }

    /// Restores a callback taken by `take_callback`, unless the entry was
    /// removed (e.g. by the callback itself) in the meantime.
    pub fn put_callback_back(&mut self, id: u64, callback: OnInterestCallback) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.callback = Some(callback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_only_filter_matches_descendants() {
        let mut table = InterestFilterTable::new();
        table.insert(Name::parse("/svc").unwrap(), None, Box::new(|_, _| {}));
        assert_eq!(table.matching_ids(&Name::parse("/svc/op").unwrap()).len(), 1);
        assert_eq!(table.matching_ids(&Name::parse("/other").unwrap()).len(), 0);
    }

    #[test]
    fn multiple_matching_filters_are_returned_in_id_order() {
        let mut table = InterestFilterTable::new();
        let a = table.insert(Name::parse("/svc").unwrap(), None, Box::new(|_, _| {}));
        let b = table.insert(Name::parse("/svc").unwrap(), None, Box::new(|_, _| {}));
        assert_eq!(table.matching_ids(&Name::parse("/svc/op").unwrap()), vec![a, b]);
    }

    #[test]
    fn suffix_pattern_restricts_match_to_exact_remainder() {
        let mut table = InterestFilterTable::new();
        table.insert(
            Name::parse("/svc").unwrap(),
            Some(Name::parse("/op").unwrap()),
            Box::new(|_, _| {}),
        );
        assert_eq!(table.matching_ids(&Name::parse("/svc/op").unwrap()).len(), 1);
        assert_eq!(table.matching_ids(&Name::parse("/svc/other").unwrap()).len(), 0);
    }

    #[test]
    fn take_and_put_back_callback_round_trips() {
        let mut table = InterestFilterTable::new();
        let id = table.insert(Name::parse("/svc").unwrap(), None, Box::new(|_, _| {}));
        let cb = table.take_callback(id).unwrap();
        assert!(table.take_callback(id).is_none());
        table.put_callback_back(id, cb);
        assert!(table.take_callback(id).is_some());
    }
}
