//! Subcommand handlers. Each one maps onto a single manager event.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use fifa_cache_core::network::Method;
use fifa_cache_core::utils::{format_bytes, truncate_string};
use fifa_cache_core::{
    CacheStorage, Destination, DiskCacheStorage, FetchOutcome, OfflineCacheManager, Request,
};
use tracing::debug;

/// Widest URL column in the `stores` listing
const MAX_URL_DISPLAY: usize = 60;

pub async fn install(manager: &OfflineCacheManager) -> Result<()> {
    let report = manager.on_install().await?;
    let total = report.cached.len() + report.failed.len();
    let status = if report.is_complete() { "complete" } else { "partial" };
    println!(
        "Installed {} ({}): cached {}/{} assets",
        manager.cache_name(),
        status,
        report.cached.len(),
        total
    );
    for failure in &report.failed {
        println!("  failed {}: {}", failure.path, failure.error);
    }
    Ok(())
}

pub async fn activate(manager: &OfflineCacheManager) -> Result<()> {
    let deleted = manager
        .on_activate()
        .await
        .context("Activation failed")?;
    debug!(active = manager.state().await.is_active(), "Activation finished");
    if deleted.is_empty() {
        println!("Activated {}: no old caches", manager.cache_name());
    } else {
        println!("Activated {}: deleted {} old cache(s)", manager.cache_name(), deleted.len());
        for name in deleted {
            println!("  {}", name);
        }
    }
    Ok(())
}

pub async fn fetch(
    manager: &OfflineCacheManager,
    target: &str,
    method: &str,
    document: bool,
) -> Result<()> {
    let url = manager.config().resolve(target)?;
    let method: Method = method
        .to_uppercase()
        .parse()
        .with_context(|| format!("Invalid HTTP method: {}", method))?;
    let mut request = Request::new(method, url);
    if document {
        request = request.with_destination(Destination::Document);
    }

    let mut outcome = match manager.on_fetch(request).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_network() => {
            return Err(anyhow::Error::new(e)
                .context("Request failed and no cached copy was available"));
        }
        Err(e) => return Err(e.into()),
    };

    match &outcome {
        FetchOutcome::Passthrough => {
            eprintln!("Not intercepted (only same-origin GET requests are cached)");
        }
        FetchOutcome::Respond {
            response, source, ..
        } => {
            eprintln!(
                "{} {} ({}, {})",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or(""),
                source,
                format_bytes(response.body().len() as u64)
            );
            let mut stdout = io::stdout().lock();
            stdout.write_all(response.body())?;
            stdout.flush()?;
        }
    }

    // The process exits right after, so let the detached write land
    outcome.settle().await;
    Ok(())
}

pub async fn sync(manager: &OfflineCacheManager, tag: &str) -> Result<()> {
    manager.on_sync(tag).await?;
    println!("Sync '{}' handled", tag);
    Ok(())
}

pub async fn message(manager: &OfflineCacheManager, payload: &str) -> Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(payload).context("Message must be valid JSON")?;
    if manager.on_message(&payload).await? {
        println!("Message handled");
    } else {
        println!("Message ignored");
    }
    Ok(())
}

pub async fn stores(manager: &OfflineCacheManager, storage: &Arc<DiskCacheStorage>) -> Result<()> {
    let names = storage.keys().await?;
    debug!(root = %storage.root().display(), count = names.len(), "Listing stores");
    if names.is_empty() {
        println!("No caches in {}", storage.root().display());
        return Ok(());
    }

    for name in names {
        let marker = if &name == manager.cache_name() { " (current)" } else { "" };
        let store = storage.open(&name).await?;
        let entries = store.entries().await?;
        let total: u64 = entries.iter().map(|e| e.size).sum();
        println!(
            "{}{}: {} entries, {}",
            store.name(),
            marker,
            entries.len(),
            format_bytes(total)
        );
        for entry in entries {
            println!(
                "  {:<6} {:<width$} {} {:>10}  {}",
                entry.key.method,
                truncate_string(&entry.key.url, MAX_URL_DISPLAY),
                entry.status,
                format_bytes(entry.size),
                entry.age_display(),
                width = MAX_URL_DISPLAY
            );
        }
    }
    Ok(())
}

pub fn config(manager: &OfflineCacheManager, save_to: Option<&PathBuf>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(manager.config())?);
    if let Some(path) = save_to {
        manager.config().save_to(path)?;
        eprintln!("Saved to {}", path.display());
    }
    Ok(())
}
