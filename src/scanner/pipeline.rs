// src/scanner/pipeline.rs
//! Match-and-persist for one raw item: match → exists → insert → notify → log.

use metrics::counter;

use super::ScanContext;
use crate::config::Settings;
use crate::error::StoreError;
use crate::lead::{Lead, LeadSource, RawItem};
use crate::matcher::match_keyword;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NoMatch,
    AlreadySeen,
    Created(Lead),
}

/// Persist `item` as a new lead if it matches and has not been seen.
///
/// Only store failures are returned; a webhook failure is logged and the lead
/// stays persisted.
pub async fn process_item(
    ctx: &ScanContext,
    settings: &Settings,
    source: LeadSource,
    keywords: &[String],
    item: RawItem,
) -> Result<Outcome, StoreError> {
    let Some(tag) = match_keyword(&item.search_text(), keywords) else {
        return Ok(Outcome::NoMatch);
    };

    if ctx.store.exists(&item.source_id).await? {
        counter!("scanner_duplicates_total", "source" => source.as_str()).increment(1);
        return Ok(Outcome::AlreadySeen);
    }

    let lead = Lead::from_match(source, item, tag);
    match ctx.store.insert(lead.clone()).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            counter!("scanner_duplicates_total", "source" => source.as_str()).increment(1);
            return Ok(Outcome::AlreadySeen);
        }
        Err(e) => return Err(e),
    }

    counter!("scanner_leads_total", "source" => source.as_str()).increment(1);
    tracing::info!(
        target: "scanner",
        %source,
        id = lead.source_id(),
        keyword = lead.tag(),
        url = lead.url(),
        "new lead"
    );
    ctx.logs.info(
        source,
        format!("new lead {} [{}] {}", lead.source_id(), lead.tag(), lead.title()),
    );

    if let Some(webhook) = settings.general.webhook() {
        if let Err(e) = ctx.notifier.notify(webhook, &lead).await {
            counter!("scanner_notify_errors_total", "source" => source.as_str()).increment(1);
            tracing::warn!(target: "scanner", %source, id = lead.source_id(), error = %format!("{e:#}"), "webhook notify failed");
            ctx.logs
                .warn(source, format!("notify failed for {}: {e:#}", lead.source_id()));
        }
    }

    Ok(Outcome::Created(lead))
}
