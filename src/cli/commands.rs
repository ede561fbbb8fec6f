use chrono::Local;

use crate::app::{AppContext, Result, TickerError};
use crate::config::format_interval;
use crate::coordinator::{ContentCoordinator, Selection};
use crate::domain::ContentItem;
use crate::service::TickerEvent;

pub fn list_sources(ctx: &AppContext) {
    for source in ctx.registry.sources() {
        println!("{}  {}", source.index, source.name);
        for (index, label) in source.categories.iter().enumerate() {
            println!("    {}  {}", index, label);
        }
    }
}

pub async fn fetch_once(ctx: &AppContext, source: usize, category: usize) -> Result<()> {
    let service = ctx.registry.create_service_with_category(
        source,
        category,
        ctx.log_switch.is_enabled(),
    )?;

    service.refresh_now().await;

    if let Some(error) = service.last_error() {
        return Err(TickerError::RefreshFailed(error));
    }

    let snapshot = service.snapshot();
    for item in &snapshot.current {
        print_item(item);
    }
    println!("{} items", snapshot.current.len());
    Ok(())
}

pub async fn watch(ctx: &AppContext, selection: Selection) -> Result<()> {
    let mut coordinator = ContentCoordinator::start(ctx.registry.clone(), selection)?;
    let mut events = coordinator.subscribe();

    let name = coordinator
        .sources()
        .get(selection.source)
        .map(|s| s.name)
        .unwrap_or_default();
    println!(
        "Watching {} every {} (Ctrl-C to stop)",
        name,
        format_interval(selection.interval.as_secs())
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            event = events.recv() => match event {
                Ok(TickerEvent::RefreshCompleted { has_new_items: true }) => {
                    let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
                    let new_items = coordinator.new_items();
                    println!("[{}] {} new items", stamp, new_items.len());
                    for item in &new_items {
                        print_item(item);
                    }
                }
                Ok(TickerEvent::RefreshCompleted { has_new_items: false }) => {
                    if let Some(error) = coordinator.last_error() {
                        eprintln!("Refresh failed: {}", error);
                    }
                }
                Ok(TickerEvent::RefreshStarted) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    coordinator.close();
    println!("Stopped");
    Ok(())
}

fn print_item(item: &ContentItem) {
    let created = item.created_at().with_timezone(&Local).format("%H:%M");
    println!("{}  {}", created, item.headline());
    if let Some(link) = item.link() {
        println!("       {}", link);
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::fetcher::reachability::ReachabilityGate;
    use crate::fetcher::stub::{StaticReachability, StubFetcher};
    use crate::logging::LogSwitch;

    const ARS: &str = "https://feeds.arstechnica.com/arstechnica/index";

    fn context(fetcher: &Arc<StubFetcher>) -> AppContext {
        let gate = Arc::new(ReachabilityGate::new(Arc::new(StaticReachability::new(true))));
        AppContext::with_parts(fetcher.clone(), gate, LogSwitch::default())
    }

    #[tokio::test]
    async fn test_fetch_once_reports_failure() {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.fail(ARS, 503);

        let err = fetch_once(&context(&fetcher), 3, 0).await.unwrap_err();
        assert!(matches!(err, TickerError::RefreshFailed(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_once_succeeds() {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.respond(
            ARS,
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Ars</title><item><title>One</title><link>https://ars.test/1</link></item></channel></rss>"#,
        );

        assert!(fetch_once(&context(&fetcher), 3, 0).await.is_ok());
        assert_eq!(fetcher.calls_to(ARS), 1);
    }

    #[tokio::test]
    async fn test_fetch_once_rejects_bad_source() {
        let fetcher = Arc::new(StubFetcher::new());
        let err = fetch_once(&context(&fetcher), 8, 0).await.unwrap_err();
        assert!(matches!(err, TickerError::SourceOutOfRange { .. }));
        assert_eq!(fetcher.total_calls(), 0);
    }
}
