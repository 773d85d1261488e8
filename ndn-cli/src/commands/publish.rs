//! `ndn-cli publish`: register a prefix and serve one Data packet for
//! every matching Interest until interrupted.

use crate::utils::{connect_face, Endpoint};
use anyhow::Result;
use log::info;
use ndn_common::data::Data;
use ndn_common::name::Name;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

pub async fn publish_data(name_str: String, content: String, ttl_ms: u64, endpoint: String) -> Result<()> {
    info!("publishing name={name_str} content_len={} ttl={ttl_ms}ms", content.len());

    let endpoint = Endpoint::parse(&endpoint)?;
    let face = Arc::new(connect_face(&endpoint).await?);

    let name = Name::parse(&name_str)?;
    let mut template = Data::new(name.clone());
    template.meta_info.content_type = Some(ndn_common::data::CONTENT_TYPE_BLOB);
    template.meta_info.freshness_period_ms = Some(ttl_ms);
    template.content = bytes::Bytes::from(content.clone());

    println!("Publishing Data under {name_str} ({} bytes, ttl {ttl_ms}ms)", content.len());

    let serve_face = face.clone();
    let on_interest = Box::new(move |_prefix: &Name, interest: &ndn_common::interest::Interest| {
        let mut data = template.clone();
        data.name = interest.name.clone();
        let face = serve_face.clone();
        tokio::spawn(async move {
            if let Err(err) = face.put_data(&data).await {
                log::warn!("failed to send Data for {}: {err}", data.name);
            }
        });
    });

    face.register_prefix(name, on_interest, None, None, None).await?;
    println!("Registered. Serving Interests; press Ctrl+C to stop.");

    let poll_face = face.clone();
    let poll_task = tokio::spawn(async move {
        loop {
            if let Err(err) = poll_face.process_events().await {
                log::warn!("process_events error: {err}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    signal::ctrl_c().await?;
    poll_task.abort();
    println!("Shutting down.");
    Ok(())
}
