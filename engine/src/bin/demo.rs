//! Raffle engine demo.
//!
//! Creates a raffle, lets a crowd of simulated visitors race for a handful of
//! numbers while a subscriber watches, then walks the owner through confirming,
//! releasing, exporting and deleting.
//!
//! ```text
//! RUST_LOG=raffle_engine=debug METRICS_ADDR=127.0.0.1:9000 cargo run --bin demo
//! ```

use anyhow::Context;
use futures::StreamExt;
use rand::Rng;
use raffle_engine::config::Config;
use raffle_engine::metrics::MetricsServer;
use raffle_engine::{Buyer, Money, OwnerId, RaffleDraft, RaffleService, TicketStatus};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const VISITORS: usize = 40;
const HOT_NUMBERS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.telemetry.log_level)
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let metrics = match config.telemetry.metrics_addr {
        Some(addr) => {
            let mut server = MetricsServer::new(addr);
            server.start().context("failed to start metrics")?;
            Some(server)
        }
        None => None,
    };

    info!("Raffle engine demo");
    let service = RaffleService::with_system_clock(config.registry.clone());
    let owner = OwnerId::new("demo-owner");

    let raffle = service
        .create_raffle(
            &owner,
            RaffleDraft::new(
                "Rifa Solidaria de Primavera",
                "Bicicleta rodado 26",
                Money::from_cents(150_000),
                "11 2345-6789",
            )
            .with_owner_name("Club del Barrio"),
        )
        .await?;
    info!(
        raffle_id = %raffle.id,
        path = %raffle.public_path(),
        contact = %raffle.owner_contact.deep_link(),
        "Raffle published"
    );

    let mut snapshots = service.subscribe(raffle.id).await?;
    let watcher = tokio::spawn(async move {
        let mut seen = 0_usize;
        while let Some(snapshot) = snapshots.next().await {
            seen += 1;
            let claimed = snapshot.iter().filter(|t| !t.is_available()).count();
            info!(snapshot = seen, claimed, "Subscriber received snapshot");
        }
        seen
    });

    let picks: Vec<u32> = {
        let mut rng = rand::thread_rng();
        (0..VISITORS).map(|_| rng.gen_range(1..=HOT_NUMBERS)).collect()
    };
    let attempts = picks.into_iter().enumerate().map(|(visitor, number)| {
        let service = service.clone();
        let raffle_id = raffle.id;
        tokio::spawn(async move {
            let buyer = Buyer::new(format!("Visitante {visitor}"), format!("11{visitor:08}"));
            service.reserve_ticket(raffle_id, number, buyer).await
        })
    });
    let outcomes = futures::future::try_join_all(attempts).await?;
    let won = outcomes.iter().filter(|o| o.is_ok()).count();
    let lost = outcomes.iter().filter(|o| o.is_conflict()).count();
    info!(visitors = VISITORS, won, lost, "Reservation race finished");

    let tickets = service.list_tickets(raffle.slug.as_str()).await?;
    let reserved: Vec<u32> = tickets
        .iter()
        .filter(|t| t.status() == TicketStatus::Reserved)
        .map(|t| t.number().get())
        .collect();

    if let Some(&first) = reserved.first() {
        let sold = service.mark_as_sold(&owner, raffle.id, first).await?;
        info!(number = first, buyer = ?sold.buyer().map(|b| &b.name), "Sale confirmed");
    }
    if let Some(&last) = reserved.last().filter(|_| reserved.len() > 1) {
        service.release_ticket(&owner, raffle.id, last).await?;
        service.release_ticket(&owner, raffle.id, last).await?;
        info!(number = last, "Ticket released twice");
    }

    let stats = service.stats(raffle.id).await?;
    info!(
        available = stats.available,
        reserved = stats.reserved,
        sold = stats.sold,
        "Inventory"
    );

    let file_name = service.csv_file_name(raffle.id).await?;
    let csv = service.export_csv(&owner, raffle.id).await?;
    println!("--- {file_name} ---\n{csv}");

    let document = service.export_document(raffle.id).await?;
    info!(bytes = document.to_json()?.len(), "Raffle document exported");

    service.toggle_raffle_status(&owner, raffle.id, raffle.is_active).await?;
    let closed = service
        .reserve_ticket(raffle.id, 99, Buyer::new("Tarde", "1100000000"))
        .await;
    info!(error = ?closed.error().map(ToString::to_string), "Reservation on closed raffle");

    service.delete_raffle(&owner, raffle.id).await?;
    let seen = tokio::time::timeout(Duration::from_secs(1), watcher).await??;
    info!(snapshots = seen, "Raffle deleted, subscription ended");

    if let Some(rendered) = metrics.as_ref().and_then(MetricsServer::render) {
        println!("{rendered}");
    }

    Ok(())
}
