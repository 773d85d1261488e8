//! Registered-prefix table (spec §3, §4.5).

use ndn_common::name::Name;

pub type OnRegistrationFailedCallback = Box<dyn FnMut(&str) + Send>;
pub type OnRegistrationSuccessCallback = Box<dyn FnMut(u64) + Send>;

/// A prefix registered with a forwarder, or pending registration (spec §3
/// "Registered-prefix entry"). `filter_id` cross-references the
/// interest-filter entry inserted alongside it so local dispatch works
/// immediately, before the forwarder confirms.
pub struct RegisteredPrefixEntry {
    pub id: u64,
    pub prefix: Name,
    pub filter_id: Option<u64>,
    pub on_registration_failed: Option<OnRegistrationFailedCallback>,
}

#[derive(Default)]
pub struct RegisteredPrefixTable {
    entries: Vec<RegisteredPrefixEntry>,
    next_id: u64,
}

impl RegisteredPrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(
        &mut self,
        prefix: Name,
        filter_id: Option<u64>,
        on_registration_failed: Option<OnRegistrationFailedCallback>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(RegisteredPrefixEntry {
            id,
            prefix,
            filter_id,
            on_registration_failed,
        });
        id
    }

    pub fn remove(&mut self, id: u64) -> Option<RegisteredPrefixEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut RegisteredPrefixEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_round_trip() {
        let mut table = RegisteredPrefixTable::new();
        let id = table.insert(Name::parse("/svc").unwrap(), Some(7), None);
        assert_eq!(table.len(), 1);
        let entry = table.remove(id).unwrap();
        assert_eq!(entry.prefix, Name::parse("/svc").unwrap());
        assert_eq!(table.len(), 0);
    }
}
