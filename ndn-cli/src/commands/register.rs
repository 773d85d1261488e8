//! `ndn-cli register`: register a prefix with the connected forwarder and
//! report the `ControlResponse` outcome, without serving any Data.

use crate::utils::{connect_face, Endpoint};
use anyhow::Result;
use log::info;
use ndn_common::name::Name;
use std::sync::Arc;
use std::time::Duration;

pub async fn register_prefix(prefix_str: String, endpoint: String) -> Result<()> {
    info!("registering prefix={prefix_str}");

    let endpoint = Endpoint::parse(&endpoint)?;
    let face = Arc::new(connect_face(&endpoint).await?);
    let prefix = Name::parse(&prefix_str)?;

    println!("Registering {prefix_str}...");

    let poll_face = face.clone();
    let poll_task = tokio::spawn(async move {
        loop {
            let _ = poll_face.process_events().await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    let result = face.register_prefix(prefix, Box::new(|_, _| {}), None, None, None).await;
    poll_task.abort();

    match result {
        Ok(id) => println!("Registered (registration id {id})"),
        Err(err) => println!("Registration failed: {err}"),
    }

    Ok(())
}
