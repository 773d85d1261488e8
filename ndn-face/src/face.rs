//! The Face dispatch core (spec §4.5): owns a transport, the element
//! reader, and the three dispatch tables, and implements
//! `expressInterest`/`registerPrefix`/`setInterestFilter`/`putData`.
//!
//! The table mutex (spec §5 "Shared resources") is a plain
//! `std::sync::Mutex` and is never held across an `.await` — table methods
//! hand back owned entries (or take a callback out, `Option`-style), the
//! lock is dropped, and only then is a callback invoked or a wire send
//! awaited. This is what makes the Face re-entrant under single-threaded
//! dispatch (spec §4.5 "Concurrency for callbacks"): a callback calling
//! back into `expressInterest`/`registerPrefix` never deadlocks on a lock
//! it's nominally still inside.

use crate::error::{Error, Result};
use crate::interest_filter::{InterestFilterTable, OnInterestCallback};
use crate::pending_interest::{OnDataCallback, OnNackCallback, OnTimeoutCallback, PendingInterestTable};
use crate::registered_prefix::{OnRegistrationFailedCallback, OnRegistrationSuccessCallback, RegisteredPrefixTable};

use bytes::{Bytes, BytesMut};
use log::warn;
use ndn_common::control::{registration_prefix, ControlParameters, ControlResponse, ForwardingFlags};
use ndn_common::data::Data;
use ndn_common::element_reader::ElementReader;
use ndn_common::interest::Interest;
use ndn_common::lp::{LpPacket, NackReason};
use ndn_common::metrics::FaceMetrics;
use ndn_common::name::Name;
use ndn_common::signing::{SigningFacade, SigningInfo};
use ndn_common::tlv::{self, TlvElement};
use ndn_transport::Transport;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

/// Spec §4.6 "Interest-matches-Data": the exact five-step rule.
pub fn matches_data(interest: &Interest, data: &Data) -> bool {
    let full_name = data.full_name();
    let l = interest.name.len() as i64;
    let f = full_name.len() as i64;

    // 1. Length constraints.
    let min_suffix = interest.min_suffix_components.unwrap_or(0).max(0);
    if l + min_suffix > f {
        return false;
    }
    if let Some(max_suffix) = interest.max_suffix_components {
        if max_suffix >= 0 && l + max_suffix < f {
            return false;
        }
    }

    // 2. Prefix.
    match l.cmp(&f) {
        std::cmp::Ordering::Equal => {
            if interest.name != full_name {
                return false;
            }
        }
        std::cmp::Ordering::Less => {
            if !interest.name.is_prefix_of(&data.name) {
                return false;
            }
        }
        std::cmp::Ordering::Greater => return false,
    }

    // 3. Exclude: the excluded component is the implicit digest when the
    // Interest name is one component short of the full name, otherwise
    // it's the next component of the (non-digest) Data name.
    if !interest.exclude.is_empty() && f > l {
        let excluded = if l == f - 1 {
            full_name.get(-1)
        } else {
            data.name.get(l)
        };
        if let Some(component) = excluded {
            if interest.exclude.matches(component) {
                return false;
            }
        }
    }

    // 4. KeyLocator selector: structural equality against the Data's own.
    if let Some(selector_kl) = &interest.key_locator {
        match data.signature.key_locator() {
            Some(data_kl) if data_kl == selector_kl => {}
            _ => return false,
        }
    }

    // 5. MustBeFresh is advisory for the forwarder; not enforced here.
    true
}

enum Decoded {
    Interest(Interest),
    Data(Data),
    Nack(Interest, NackReason),
}

struct Tables {
    pending_interests: PendingInterestTable,
    registered_prefixes: RegisteredPrefixTable,
    interest_filters: InterestFilterTable,
}

/// An application's network endpoint (spec §4.5). Multiplexes one
/// `Transport` and dispatches everything it decodes against the three
/// tables.
pub struct Face {
    transport: AsyncMutex<Box<dyn Transport>>,
    element_reader: Mutex<ElementReader>,
    tables: Mutex<Tables>,
    metrics: FaceMetrics,
    signer: Option<Arc<dyn SigningFacade + Send + Sync>>,
    command_signing_info: SigningInfo,
    is_local: bool,
}

impl Face {
    pub fn new(transport: Box<dyn Transport>, is_local: bool) -> Self {
        Self {
            transport: AsyncMutex::new(transport),
            element_reader: Mutex::new(ElementReader::new()),
            tables: Mutex::new(Tables {
                pending_interests: PendingInterestTable::new(),
                registered_prefixes: RegisteredPrefixTable::new(),
                interest_filters: InterestFilterTable::new(),
            }),
            metrics: FaceMetrics::new(),
            signer: None,
            command_signing_info: SigningInfo::Sha256,
            is_local,
        }
    }

    /// Attaches a signing façade used to sign command Interests sent by
    /// `registerPrefix` (spec §4.7).
    pub fn with_signer(mut self, signer: Arc<dyn SigningFacade + Send + Sync>, info: SigningInfo) -> Self {
        self.signer = Some(signer);
        self.command_signing_info = info;
        self
    }

    pub fn metrics(&self) -> &FaceMetrics {
        &self.metrics
    }

    async fn send_wire(&self, wire: Bytes) -> Result<()> {
        self.metrics.bytes_sent.add(wire.len() as u64);
        let mut transport = self.transport.lock().await;
        transport.send(wire).await?;
        Ok(())
    }

    /// Sends an Interest and registers a pending-interest entry for its
    /// response (spec §4.5 `expressInterest`, five-step algorithm).
    pub async fn express_interest(
        &self,
        mut interest: Interest,
        on_data: OnDataCallback,
        on_timeout: Option<OnTimeoutCallback>,
        on_nack: Option<OnNackCallback>,
    ) -> Result<u64> {
        let (wire, _) = interest.encode();
        let deadline = interest
            .interest_lifetime_ms
            .filter(|ms| *ms >= 0)
            .map(|ms| Instant::now() + Duration::from_millis(ms as u64));

        let id = {
            let mut tables = self.tables.lock().unwrap();
            let id = tables
                .pending_interests
                .insert(interest.clone(), wire.clone(), deadline, on_data, on_timeout, on_nack);
            self.metrics.pending_interest_inserts.increment();
            self.metrics
                .pending_interest_size
                .set(tables.pending_interests.len() as u64);
            id
        };
        self.metrics.interests_expressed.increment();

        if let Err(err) = self.send_wire(wire).await {
            self.remove_pending_interest(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Cancels a pending Interest; no callback fires for it afterward even
    /// if its Data is already in flight (spec §5 "cancellation").
    pub fn remove_pending_interest(&self, id: u64) {
        let mut tables = self.tables.lock().unwrap();
        if tables.pending_interests.remove(id).is_some() {
            self.metrics.pending_interest_removals.increment();
            self.metrics
                .pending_interest_size
                .set(tables.pending_interests.len() as u64);
        }
    }

    /// Registers `prefix` with the connected forwarder and arranges for
    /// `on_interest` to fire on matching Interests (spec §4.5
    /// `registerPrefix`, three-step algorithm). Returns once the
    /// forwarder's `ControlResponse` is known.
    pub async fn register_prefix(
        &self,
        prefix: Name,
        on_interest: OnInterestCallback,
        on_registration_failed: Option<OnRegistrationFailedCallback>,
        mut on_registration_success: Option<OnRegistrationSuccessCallback>,
        flags: Option<ForwardingFlags>,
    ) -> Result<u64> {
        let filter_id = {
            let mut tables = self.tables.lock().unwrap();
            let id = tables.interest_filters.insert(prefix.clone(), None, on_interest);
            self.metrics
                .interest_filter_size
                .set(tables.interest_filters.len() as u64);
            id
        };
        let registration_id = {
            let mut tables = self.tables.lock().unwrap();
            let id = tables
                .registered_prefixes
                .insert(prefix.clone(), Some(filter_id), on_registration_failed);
            self.metrics
                .registered_prefix_size
                .set(tables.registered_prefixes.len() as u64);
            id
        };

        let mut params = ControlParameters::new(prefix);
        params.flags = flags;
        let mut params_bytes = BytesMut::new();
        params.to_tlv().encode(&mut params_bytes);

        let command_name = Name::parse(registration_prefix(self.is_local))
            .expect("well-known registration prefix is always a valid URI")
            .append_bytes(params_bytes.freeze());

        let mut command_interest = Interest::new(command_name);
        command_interest.must_be_fresh = true;
        command_interest.interest_lifetime_ms = Some(4_000);

        if let Some(signer) = &self.signer {
            command_interest = signer.sign_interest(command_interest, &self.command_signing_info)?;
            self.metrics.signing_operations.increment();
        }

        let (response_tx, response_rx) = futures::channel::oneshot::channel();
        let response_tx = Mutex::new(Some(response_tx));

        let on_data: OnDataCallback = Box::new(move |_interest, data| {
            let mut content = data.content.clone();
            let result = TlvElement::decode(&mut content)
                .map_err(|e| e.to_string())
                .and_then(|elem| ControlResponse::from_tlv(&elem).map_err(|e| e.to_string()));
            if let Some(tx) = response_tx.lock().unwrap().take() {
                let _ = tx.send(result);
            }
        });

        // Dropping the pending-interest entry without ever calling
        // `on_data` (a timeout) drops `response_tx` with it, which cancels
        // `response_rx` below — no separate on_timeout wiring is needed.
        self.express_interest(command_interest, on_data, None, None).await?;

        match response_rx.await {
            Ok(Ok(response)) if response.is_success() => {
                self.metrics.registration_successes.increment();
                if let Some(callback) = &mut on_registration_success {
                    callback(registration_id);
                }
                Ok(registration_id)
            }
            Ok(Ok(response)) => {
                let message = response.status_text;
                self.fail_registration(registration_id, filter_id, &message);
                Err(Error::RegistrationFailed(message))
            }
            Ok(Err(message)) => {
                self.fail_registration(registration_id, filter_id, &message);
                Err(Error::RegistrationFailed(message))
            }
            Err(_) => {
                let message = "registration command Interest timed out".to_string();
                self.fail_registration(registration_id, filter_id, &message);
                Err(Error::RegistrationFailed(message))
            }
        }
    }

    fn fail_registration(&self, registration_id: u64, filter_id: u64, message: &str) {
        let mut on_failed = {
            let mut tables = self.tables.lock().unwrap();
            tables.interest_filters.remove(filter_id);
            self.metrics
                .interest_filter_size
                .set(tables.interest_filters.len() as u64);
            let entry = tables.registered_prefixes.remove(registration_id);
            self.metrics
                .registered_prefix_size
                .set(tables.registered_prefixes.len() as u64);
            entry.and_then(|e| e.on_registration_failed)
        };
        self.metrics.registration_failures.increment();
        if let Some(callback) = &mut on_failed {
            callback(message);
        }
    }

    /// Local-only dispatch, no forwarder registration command (spec §4.5
    /// `setInterestFilter`).
    pub fn set_interest_filter(
        &self,
        prefix: Name,
        suffix_pattern: Option<Name>,
        on_interest: OnInterestCallback,
    ) -> u64 {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.interest_filters.insert(prefix, suffix_pattern, on_interest);
        self.metrics
            .interest_filter_size
            .set(tables.interest_filters.len() as u64);
        id
    }

    pub fn unset_interest_filter(&self, id: u64) {
        let mut tables = self.tables.lock().unwrap();
        tables.interest_filters.remove(id);
        self.metrics
            .interest_filter_size
            .set(tables.interest_filters.len() as u64);
    }

    pub async fn put_data(&self, data: &Data) -> Result<()> {
        let (wire, _) = data.encode();
        self.metrics.data_sent.increment();
        self.send_wire(wire).await
    }

    fn decode_wire(&self, bytes: Bytes) -> Result<Decoded> {
        let mut peek = bytes.clone();
        let outer = TlvElement::decode(&mut peek)?;
        if outer.tlv_type == tlv::TLV_LP_PACKET {
            let lp = LpPacket::decode(&bytes)?;
            let fragment = lp
                .fragment
                .clone()
                .ok_or_else(|| Error::Packet(ndn_common::Error::Lp("LpPacket carried no fragment".into())))?;
            if lp.is_nack() {
                let (interest, _) = Interest::decode(&fragment)?;
                return Ok(Decoded::Nack(interest, lp.nack_reason.unwrap()));
            }
            return self.decode_bare(fragment);
        }
        self.decode_bare(bytes)
    }

    fn decode_bare(&self, bytes: Bytes) -> Result<Decoded> {
        let mut peek = bytes.clone();
        let outer = TlvElement::decode(&mut peek)?;
        match outer.tlv_type {
            t if t == tlv::TLV_INTEREST => {
                let (interest, _) = Interest::decode(&bytes)?;
                Ok(Decoded::Interest(interest))
            }
            t if t == tlv::TLV_DATA => {
                let (data, _) = Data::decode(&bytes)?;
                Ok(Decoded::Data(data))
            }
            other => Err(Error::Packet(ndn_common::Error::NdnPacket(format!(
                "unrecognized top-level TLV type {other}"
            )))),
        }
    }

    fn dispatch_bytes(&self, bytes: Bytes) {
        self.metrics.bytes_received.add(bytes.len() as u64);
        match self.decode_wire(bytes) {
            Ok(Decoded::Interest(interest)) => self.dispatch_interest(&interest),
            Ok(Decoded::Data(data)) => self.dispatch_data(&data),
            Ok(Decoded::Nack(interest, reason)) => self.dispatch_nack(&interest, reason),
            Err(err) => warn!("dropping malformed element: {err}"),
        }
    }

    /// Spec §4.5 "Data dispatch": every matching pending Interest fires
    /// once, in ascending entry-ID order; unmatched Data is dropped.
    fn dispatch_data(&self, data: &Data) {
        self.metrics.data_received.increment();
        let matched = {
            let mut tables = self.tables.lock().unwrap();
            let matched = tables.pending_interests.take_matching_data(data);
            self.metrics
                .pending_interest_size
                .set(tables.pending_interests.len() as u64);
            matched
        };
        for mut entry in matched {
            (entry.on_data)(&entry.interest, data);
            self.metrics.interests_satisfied.increment();
            self.metrics.pending_interest_removals.increment();
        }
    }

    /// Spec §4.5 "Interest dispatch": every interest filter whose prefix
    /// (and optional suffix pattern) matches fires, in ascending filter-ID
    /// order.
    fn dispatch_interest(&self, interest: &Interest) {
        self.metrics.interests_received.increment();
        let ids = {
            let tables = self.tables.lock().unwrap();
            tables.interest_filters.matching_ids(&interest.name)
        };
        for id in ids {
            let (callback, prefix) = {
                let mut tables = self.tables.lock().unwrap();
                let prefix = tables.interest_filters.entry_prefix(id);
                let callback = tables.interest_filters.take_callback(id);
                (callback, prefix)
            };
            if let (Some(mut callback), Some(prefix)) = (callback, prefix) {
                callback(&prefix, interest);
                let mut tables = self.tables.lock().unwrap();
                tables.interest_filters.put_callback_back(id, callback);
            }
        }
    }

    /// Spec §4.5 "Nack dispatch": matched by name + selectors + nonce,
    /// fires `on_nack` once and removes the entry.
    fn dispatch_nack(&self, nacked: &Interest, reason: NackReason) {
        self.metrics.interests_nacked.increment();
        let entry = {
            let mut tables = self.tables.lock().unwrap();
            let entry = tables.pending_interests.take_matching_nack(nacked);
            self.metrics
                .pending_interest_size
                .set(tables.pending_interests.len() as u64);
            entry
        };
        if let Some(mut entry) = entry {
            if let Some(on_nack) = &mut entry.on_nack {
                on_nack(&entry.interest, reason);
            }
            self.metrics.pending_interest_removals.increment();
        }
    }

    /// Spec §4.5 "Timeout scan": runs on every `process_events` tick (and
    /// once per loop iteration of `run`), ascending entry-ID order for
    /// simultaneous expirations.
    fn scan_timeouts(&self, now: Instant) {
        let expired = {
            let mut tables = self.tables.lock().unwrap();
            let expired = tables.pending_interests.take_expired(now);
            self.metrics
                .pending_interest_size
                .set(tables.pending_interests.len() as u64);
            expired
        };
        for mut entry in expired {
            if let Some(on_timeout) = &mut entry.on_timeout {
                on_timeout(&entry.interest);
            }
            self.metrics.interests_timed_out.increment();
            self.metrics.pending_interest_removals.increment();
        }
    }

    /// Synchronous-poll-mode entry point (spec §4.4/§5): drains whatever
    /// the transport has buffered and dispatches it, then scans for
    /// timeouts. Returns the number of elements dispatched.
    pub async fn process_events(&self) -> Result<usize> {
        self.scan_timeouts(Instant::now());

        let mut chunks = Vec::new();
        {
            let mut transport = self.transport.lock().await;
            transport.process_events(&mut |bytes| chunks.push(bytes))?;
        }

        let mut elements = Vec::new();
        {
            let mut reader = self.element_reader.lock().unwrap();
            for chunk in &chunks {
                reader.feed(
                    chunk,
                    |element| elements.push(element),
                    |message, _| warn!("element reader error: {message}"),
                );
            }
        }

        let count = elements.len();
        for element in elements {
            self.dispatch_bytes(element);
        }
        Ok(count)
    }

    /// Asynchronous-reactor-mode entry point (spec §4.4/§5): awaits
    /// elements from the transport until it closes.
    pub async fn run(&self) -> Result<()> {
        loop {
            let next = {
                let mut transport = self.transport.lock().await;
                transport.recv_async().await
            };
            let Some(bytes) = next else {
                return Ok(());
            };

            let mut elements = Vec::new();
            {
                let mut reader = self.element_reader.lock().unwrap();
                reader.feed(
                    &bytes,
                    |element| elements.push(element),
                    |message, _| warn!("element reader error: {message}"),
                );
            }
            for element in elements {
                self.dispatch_bytes(element);
            }
            self.scan_timeouts(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndn_common::name::Component;
    use ndn_common::signature::{Exclude, ExcludeEntry, KeyLocator, Signature};

    fn interest(uri: &str) -> Interest {
        Interest::new(Name::parse(uri).unwrap())
    }

    fn data(uri: &str) -> Data {
        Data::new(Name::parse(uri).unwrap())
    }

    #[test]
    fn exact_name_matches_its_own_full_name() {
        let d = data("/a/b");
        let full = d.full_name();
        let i = Interest::new(full);
        assert!(matches_data(&i, &d));
    }

    #[test]
    fn prefix_interest_matches_descendant_data() {
        let d = data("/a/b");
        let i = interest("/a");
        assert!(matches_data(&i, &d));
    }

    #[test]
    fn unrelated_name_does_not_match() {
        let d = data("/a/b");
        let i = interest("/x");
        assert!(!matches_data(&i, &d));
    }

    #[test]
    fn min_suffix_components_rejects_too_short_a_match() {
        let d = data("/a");
        let mut i = interest("/a");
        i.min_suffix_components = Some(2);
        // full name is /a/<digest>, length 2; interest name length 1;
        // 1 + 2 > 2, so this must fail.
        assert!(!matches_data(&i, &d));
    }

    #[test]
    fn max_suffix_components_bounds_match() {
        let d = data("/a/b/c");
        let mut i = interest("/a");
        i.max_suffix_components = Some(1);
        // full name length 4, interest length 1; 1 + 1 < 4, fails.
        assert!(!matches_data(&i, &d));
    }

    #[test]
    fn exclude_rejects_excluded_next_component() {
        let d = data("/a/b");
        let mut i = interest("/a");
        let mut exclude = Exclude::new();
        exclude
            .push(ExcludeEntry::Component(d.name.get(1).unwrap().clone()))
            .unwrap();
        i.exclude = exclude;
        assert!(!matches_data(&i, &d));
    }

    #[test]
    fn exclude_allows_non_excluded_component() {
        let d = data("/a/b");
        let mut i = interest("/a");
        let mut exclude = Exclude::new();
        exclude.push(ExcludeEntry::Component(Component::new(&b"z"[..]))).unwrap();
        i.exclude = exclude;
        assert!(matches_data(&i, &d));
    }

    #[test]
    fn key_locator_selector_requires_structural_equality() {
        let mut d = data("/a");
        d.signature = Signature::Sha256WithRsa {
            key_locator: KeyLocator::KeyName(Name::parse("/key/1").unwrap()),
            validity: None,
            value: None,
        };
        let mut i = interest("/a");
        i.key_locator = Some(KeyLocator::KeyName(Name::parse("/key/1").unwrap()));
        assert!(matches_data(&i, &d));

        i.key_locator = Some(KeyLocator::KeyName(Name::parse("/key/2").unwrap()));
        assert!(!matches_data(&i, &d));
    }

    #[tokio::test]
    async fn express_interest_and_matching_data_fire_on_data_once() {
        let (transport, _peer) = ndn_transport::MemoryTransport::pair(8);
        let face = Face::new(Box::new(transport), true);

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let id = face
            .express_interest(
                interest("/a/b"),
                Box::new(move |_interest, data| {
                    received_clone.lock().unwrap().push(data.name.clone());
                }),
                None,
                None,
            )
            .await
            .unwrap();

        let d = data("/a/b");
        face.dispatch_data(&d);

        assert_eq!(received.lock().unwrap().len(), 1);
        assert_eq!(received.lock().unwrap()[0], Name::parse("/a/b").unwrap());
        // The entry was consumed; removing it again is a no-op.
        face.remove_pending_interest(id);
    }

    #[tokio::test]
    async fn interest_filter_and_pending_interest_both_fire_without_timeout() {
        // Spec §8 scenario 6: a filter and a pending Interest both match
        // the same incoming Interest/Data pair without one starving the
        // other or producing a spurious onTimeout.
        let (transport, _peer) = ndn_transport::MemoryTransport::pair(8);
        let face = Face::new(Box::new(transport), true);

        let filter_fired = Arc::new(Mutex::new(false));
        let filter_fired_clone = filter_fired.clone();
        face.set_interest_filter(
            Name::parse("/svc").unwrap(),
            None,
            Box::new(move |_prefix, _interest| {
                *filter_fired_clone.lock().unwrap() = true;
            }),
        );

        let timed_out = Arc::new(Mutex::new(false));
        let timed_out_clone = timed_out.clone();
        let data_fired = Arc::new(Mutex::new(false));
        let data_fired_clone = data_fired.clone();
        let mut sent = interest("/svc/op");
        sent.interest_lifetime_ms = Some(4_000);
        face.express_interest(
            sent,
            Box::new(move |_interest, _data| {
                *data_fired_clone.lock().unwrap() = true;
            }),
            Some(Box::new(move |_interest| {
                *timed_out_clone.lock().unwrap() = true;
            })),
            None,
        )
        .await
        .unwrap();

        face.dispatch_interest(&interest("/svc/op"));
        let d = data("/svc/op");
        face.dispatch_data(&d);
        face.scan_timeouts(Instant::now());

        assert!(*filter_fired.lock().unwrap());
        assert!(*data_fired.lock().unwrap());
        assert!(!*timed_out.lock().unwrap());
    }
}
