mod cli;
mod server;

use caselaw_core::{CaseStore, Query, QueryOrchestrator, SourceKind};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Command};
use server::{AppState, CaseDetail};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "caselaw boot"
    );

    let backends = cli.backends;
    match cli.command {
        Command::Serve { bind } => {
            let corpus = Arc::new(backends.corpus().await?);
            info!(cases = corpus.len(), path = %backends.corpus_path.display(), "corpus loaded");
            let orchestrator = backends.build_orchestrator(corpus.clone())?;

            let app = server::router(AppState {
                orchestrator,
                corpus,
            });
            let listener = tokio::net::TcpListener::bind(bind).await?;
            info!(%bind, "listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Command::Search {
            query,
            mode,
            limit,
            explain,
        } => {
            let corpus = Arc::new(backends.corpus().await?);
            let orchestrator = backends.build_orchestrator(corpus)?;
            run_search(&orchestrator, Query::new(query, mode).with_limit(limit), explain).await?;
        }
        Command::Case { id } => {
            let corpus = backends.corpus().await?;
            match corpus.get_case(id).await? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&CaseDetail::from(record))?);
                }
                None => anyhow::bail!("case {id} not found"),
            }
        }
        Command::Index => {
            let corpus = backends.corpus().await?;
            let records: Vec<_> = corpus.records().cloned().collect();
            let qdrant = backends.qdrant()?;

            qdrant.ensure_collection().await?;
            let indexed = qdrant.upsert_cases(&records).await?;
            let collection = qdrant.collection_info().await?;

            println!(
                "{indexed} cases indexed into {} ({} points, status {}) at {}",
                collection.name,
                collection.points_count,
                collection.status,
                Utc::now().to_rfc3339()
            );
        }
    }

    Ok(())
}

async fn run_search(
    orchestrator: &QueryOrchestrator,
    query: Query,
    explain: bool,
) -> anyhow::Result<()> {
    let outcome = orchestrator.run(&query).await?;
    let response = outcome.response;

    println!("query: {}", query.text);
    println!("mode: {}", response.mode);
    println!("\n{}\n", response.answer);

    for (index, source) in response.sources.iter().enumerate() {
        let kind = match source.kind {
            SourceKind::Case => "case",
            SourceKind::Web => "web",
        };
        println!(
            "[{}] {kind} score={:.4} {} {} ({}, {})",
            index + 1,
            source.relevance_score,
            source.name,
            source.citation,
            source.court,
            source.year
        );
        if !source.url.is_empty() {
            println!("  url={}", source.url);
        }
    }

    if explain {
        let report = outcome.report;
        println!("explain: request_id={}", report.request_id);
        println!(
            "explain: cache_hit={} cache_degraded={}",
            report.cache_hit, report.cache_degraded
        );
        match report.trigger {
            Some(decision) => {
                println!("explain: web_triggered={}", decision.triggered);
                for reason in decision.reasons {
                    println!("explain: reason={reason}");
                }
            }
            None => println!("explain: trigger not evaluated"),
        }
        if let Some(error) = report.web_error {
            println!("explain: web_error={error}");
        }
        for citation in report.citations_used {
            println!("explain: cited={} {}", citation.name, citation.citation);
        }
        let stages: Vec<String> = report
            .stages
            .iter()
            .map(|stage| format!("{stage:?}"))
            .collect();
        println!("explain: stages={}", stages.join(" -> "));
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
