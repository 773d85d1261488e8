//! The Face dispatch core (spec §4.5): an application's network endpoint.
//!
//! `Face` multiplexes one `ndn_transport::Transport` and dispatches
//! decoded Interest/Data/Nack against three tables — pending interests,
//! registered prefixes, interest filters — exposing `expressInterest`,
//! `registerPrefix`, `setInterestFilter`, and `putData`.

pub mod error;
mod face;
pub mod interest_filter;
pub mod pending_interest;
pub mod registered_prefix;

pub use error::{Error, Result};
pub use face::{matches_data, Face};
pub use interest_filter::{InterestFilterEntry, InterestFilterTable, OnInterestCallback};
pub use pending_interest::{
    OnDataCallback, OnNackCallback, OnTimeoutCallback, PendingInterestEntry, PendingInterestTable,
};
pub use registered_prefix::{
    OnRegistrationFailedCallback, OnRegistrationSuccessCallback, RegisteredPrefixEntry, RegisteredPrefixTable,
};
