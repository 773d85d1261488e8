//! Pending-interest table (spec §3, §4.5).
//!
//! A list keyed by generated unique ID, with matching done by linear scan
//! (spec §4.5: "linear scan acceptable at this scale"). Callbacks are held
//! by value and removed from the table before being invoked, so a callback
//! that calls back into the Face never re-enters this table while it is
//! locked (spec §4.5 "Concurrency for callbacks").

use bytes::Bytes;
use ndn_common::data::Data;
use ndn_common::interest::Interest;
use ndn_common::lp::NackReason;
use std::time::Instant;

pub type OnDataCallback = Box<dyn FnMut(&Interest, &Data) + Send>;
pub type OnTimeoutCallback = Box<dyn FnMut(&Interest) + Send>;
pub type OnNackCallback = Box<dyn FnMut(&Interest, NackReason) + Send>;

/// One outstanding `expressInterest` (spec §3 "Pending-interest entry").
pub struct PendingInterestEntry {
    pub id: u64,
    pub interest: Interest,
    pub on_data: OnDataCallback,
    pub on_timeout: Option<OnTimeoutCallback>,
    pub on_nack: Option<OnNackCallback>,
    /// `None` means the Interest's lifetime was unspecified (infinite).
    pub deadline: Option<Instant>,
    pub wire: Bytes,
}

#[derive(Default)]
pub struct PendingInterestTable {
    entries: Vec<PendingInterestEntry>,
    next_id: u64,
}

impl PendingInterestTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allocates the next ID and inserts the entry (invariant i: no two
    /// entries share an ID).
    pub fn insert(
        &mut self,
        interest: Interest,
        wire: Bytes,
        deadline: Option<Instant>,
        on_data: OnDataCallback,
        on_timeout: Option<OnTimeoutCallback>,
        on_nack: Option<OnNackCallback>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(PendingInterestEntry {
            id,
            interest,
            on_data,
            on_timeout,
            on_nack,
            deadline,
            wire,
        });
        id
    }

    /// Removes and returns the entry with `id`, if present.
    pub fn remove(&mut self, id: u64) -> Option<PendingInterestEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Removes and returns, in ascending-ID order, every entry whose
    /// Interest matches `data` (spec §4.6). A Data matching nothing leaves
    /// the table untouched.
    pub fn take_matching_data(&mut self, data: &Data) -> Vec<PendingInterestEntry> {
        let mut matched_ids: Vec<u64> = self
            .entries
            .iter()
            .filter(|e| crate::face::matches_data(&e.interest, data))
            .map(|e| e.id)
            .collect();
        matched_ids.sort_unstable();

        matched_ids
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    /// Removes and returns the single entry whose Interest equals the
    /// nacked Interest by name + selectors + nonce (spec §4.5 "Nack
    /// dispatch"). An exact value match is used since a Nack always
    /// carries back the Interest it refused.
    pub fn take_matching_nack(&mut self, nacked: &Interest) -> Option<PendingInterestEntry> {
        let pos = self.entries.iter().position(|e| &e.interest == nacked)?;
        Some(self.entries.remove(pos))
    }

    /// Removes and returns, in ascending-ID order, every entry whose
    /// deadline has passed as of `now` (spec §4.5 "Timeout scan").
    pub fn take_expired(&mut self, now: Instant) -> Vec<PendingInterestEntry> {
        let mut expired_ids: Vec<u64> = self
            .entries
            .iter()
            .filter(|e| matches!(e.deadline, Some(deadline) if deadline <= now))
            .map(|e| e.id)
            .collect();
        expired_ids.sort_unstable();

        expired_ids
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndn_common::name::Name;

    fn interest(uri: &str) -> Interest {
        Interest::new(Name::parse(uri).unwrap())
    }

    #[test]
    fn ids_are_unique_and_ascending() {
        let mut table = PendingInterestTable::new();
        let a = table.insert(interest("/a"), Bytes::new(), None, Box::new(|_, _| {}), None, None);
        let b = table.insert(interest("/b"), Bytes::new(), None, Box::new(|_, _| {}), None, None);
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn remove_erases_entry() {
        let mut table = PendingInterestTable::new();
        let id = table.insert(interest("/a"), Bytes::new(), None, Box::new(|_, _| {}), None, None);
        assert!(table.remove(id).is_some());
        assert!(table.remove(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn expired_entries_are_returned_in_ascending_id_order() {
        let mut table = PendingInterestTable::new();
        let past = Instant::now() - std::time::Duration::from_secs(10);
        let a = table.insert(interest("/a"), Bytes::new(), Some(past), Box::new(|_, _| {}), None, None);
        let b = table.insert(interest("/b"), Bytes::new(), Some(past), Box::new(|_, _| {}), None, None);
        table.insert(interest("/c"), Bytes::new(), None, Box::new(|_, _| {}), None, None);

        let expired = table.take_expired(Instant::now());
        assert_eq!(expired.len(), 2);
        assert_eq!(expired[0].id, a);
        assert_eq!(expired[1].id, b);
        assert_eq!(table.len(), 1);
    }
}
