//! `ndn-cli interest`: express an Interest and print the Data response.

use crate::utils::{connect_face, poll_until, Endpoint};
use anyhow::Result;
use log::info;
use ndn_common::interest::Interest;
use ndn_common::name::Name;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub async fn send_interest(name_str: String, timeout_ms: u64, endpoint: String, must_be_fresh: bool) -> Result<()> {
    info!("sending Interest name={name_str} timeout={timeout_ms}ms");

    let endpoint = Endpoint::parse(&endpoint)?;
    let face = connect_face(&endpoint).await?;

    let mut interest = Interest::new(Name::parse(&name_str)?);
    interest.must_be_fresh = must_be_fresh;
    interest.interest_lifetime_ms = Some(timeout_ms as i64);

    println!("Interest: {name_str} (timeout {timeout_ms}ms)");

    let outcome = Arc::new(Mutex::new(None));
    let on_data = {
        let outcome = outcome.clone();
        Box::new(move |_interest: &Interest, data: &ndn_common::data::Data| {
            *outcome.lock().unwrap() = Some(format!(
                "Data: {}\n  Content ({} bytes): {}",
                data.name,
                data.content.len(),
                String::from_utf8_lossy(&data.content)
            ));
        })
    };
    let on_timeout = {
        let outcome = outcome.clone();
        Box::new(move |interest: &Interest| {
            *outcome.lock().unwrap() = Some(format!("Timed out: {}", interest.name));
        })
    };
    let on_nack = {
        let outcome = outcome.clone();
        Box::new(move |interest: &Interest, reason: ndn_common::lp::NackReason| {
            *outcome.lock().unwrap() = Some(format!("Nacked ({reason:?}): {}", interest.name));
        })
    };

    face.express_interest(interest, on_data, Some(on_timeout), Some(on_nack)).await?;

    let deadline = Instant::now() + Duration::from_millis(timeout_ms) + Duration::from_millis(200);
    poll_until(&face, deadline).await?;

    match outcome.lock().unwrap().take() {
        Some(line) => println!("{line}"),
        None => println!("No response within {timeout_ms}ms"),
    }

    Ok(())
}
