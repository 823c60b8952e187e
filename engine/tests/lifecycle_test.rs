//! End-to-end ticket lifecycle through the service facade.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use raffle_engine::config::RegistryConfig;
use raffle_engine::{
    buyer_contact_link, Buyer, Money, OwnerId, Raffle, RaffleDraft, RaffleError, RaffleService,
    TicketStatus,
};
use raffle_testing::ManualClock;
use raffle_testing::epoch;
use std::sync::Arc;

struct Fixture {
    service: RaffleService,
    clock: Arc<ManualClock>,
    owner: OwnerId,
    raffle: Raffle,
}

async fn fixture() -> Fixture {
    let clock = Arc::new(ManualClock::new(epoch()));
    let service = RaffleService::new(RegistryConfig::default(), clock.clone());
    let owner = OwnerId::new("owner-1");
    let raffle = service
        .create_raffle(
            &owner,
            RaffleDraft::new("Rifa del Club", "Televisor", Money::from_cents(25_000), "1122334455")
                .with_owner_name("Club"),
        )
        .await
        .unwrap();
    Fixture {
        service,
        clock,
        owner,
        raffle,
    }
}

#[tokio::test]
async fn test_reserve_sell_release_round() {
    let f = fixture().await;

    let reserved = f
        .service
        .reserve_ticket(f.raffle.id, 7, Buyer::new("Ana", "1155667788"))
        .await;
    assert!(reserved.is_ok());
    let ticket = reserved.ticket().unwrap();
    assert_eq!(ticket.reserved_at(), Some(epoch()));
    assert_eq!(
        buyer_contact_link(ticket).as_deref(),
        Some("https://wa.me/1155667788")
    );

    f.clock.advance(chrono::Duration::minutes(30));
    let sold = f.service.mark_as_sold(&f.owner, f.raffle.id, 7).await.unwrap();
    assert_eq!(sold.status(), TicketStatus::Sold);
    assert_eq!(sold.reserved_at(), Some(epoch()));
    assert_eq!(sold.sold_at(), Some(epoch() + chrono::Duration::minutes(30)));
    assert_eq!(sold.buyer().unwrap().name, "Ana");

    let released = f.service.release_ticket(&f.owner, f.raffle.id, 7).await.unwrap();
    assert_eq!(released.status(), TicketStatus::Available);
    assert!(released.buyer().is_none());
    assert_eq!(released.reserved_at(), None);
    assert_eq!(released.sold_at(), None);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let f = fixture().await;
    f.service
        .reserve_ticket(f.raffle.id, 3, Buyer::new("Ana", "1"))
        .await;

    let first = f.service.release_ticket(&f.owner, f.raffle.id, 3).await.unwrap();
    let second = f.service.release_ticket(&f.owner, f.raffle.id, 3).await.unwrap();
    assert_eq!(first, second);
    assert!(second.is_available());
}

#[tokio::test]
async fn test_mark_as_sold_requires_reservation() {
    let f = fixture().await;

    let error = f.service.mark_as_sold(&f.owner, f.raffle.id, 9).await.unwrap_err();
    assert!(error.is_conflict());

    f.service
        .reserve_ticket(f.raffle.id, 9, Buyer::new("Ana", "1"))
        .await;
    f.service.mark_as_sold(&f.owner, f.raffle.id, 9).await.unwrap();
    let again = f.service.mark_as_sold(&f.owner, f.raffle.id, 9).await.unwrap_err();
    assert!(matches!(
        again,
        RaffleError::Conflict {
            actual: TicketStatus::Sold,
            ..
        }
    ));
}

#[tokio::test]
async fn test_reservation_validation() {
    let f = fixture().await;

    let blank_name = f
        .service
        .reserve_ticket(f.raffle.id, 1, Buyer::new("  ", "123"))
        .await;
    assert!(matches!(blank_name.error(), Some(RaffleError::Validation(_))));

    let blank_phone = f
        .service
        .reserve_ticket(f.raffle.id, 1, Buyer::new("Ana", ""))
        .await;
    assert!(matches!(blank_phone.error(), Some(RaffleError::Validation(_))));

    let out_of_range = f
        .service
        .reserve_ticket(f.raffle.id, 101, Buyer::new("Ana", "1"))
        .await;
    assert!(out_of_range.error().unwrap().is_not_found());

    let trimmed = f
        .service
        .reserve_ticket(f.raffle.id, 1, Buyer::new(" Ana ", " 1 ").with_email(" "))
        .await;
    let buyer = trimmed.ticket().unwrap().buyer().unwrap();
    assert_eq!(buyer.name, "Ana");
    assert_eq!(buyer.email, None);
}

#[tokio::test]
async fn test_toggle_status_closes_reservations() {
    let f = fixture().await;

    let raffle = f
        .service
        .toggle_raffle_status(&f.owner, f.raffle.id, f.raffle.is_active)
        .await
        .unwrap();
    assert!(!raffle.is_active);

    let outcome = f
        .service
        .reserve_ticket(f.raffle.id, 5, Buyer::new("Ana", "1"))
        .await;
    assert!(matches!(outcome.error(), Some(RaffleError::RaffleInactive { .. })));

    // Still readable while inactive
    assert_eq!(f.service.list_tickets(f.raffle.slug.as_str()).await.unwrap().len(), 100);

    let raffle = f
        .service
        .toggle_raffle_status(&f.owner, f.raffle.id, raffle.is_active)
        .await
        .unwrap();
    assert!(raffle.is_active);
    assert!(f
        .service
        .reserve_ticket(f.raffle.id, 5, Buyer::new("Ana", "1"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_owner_operations_reject_other_owners() {
    let f = fixture().await;
    let intruder = OwnerId::new("intruder");
    f.service
        .reserve_ticket(f.raffle.id, 2, Buyer::new("Ana", "1"))
        .await;

    let results = [
        f.service.mark_as_sold(&intruder, f.raffle.id, 2).await.map(drop),
        f.service.release_ticket(&intruder, f.raffle.id, 2).await.map(drop),
        f.service
            .toggle_raffle_status(&intruder, f.raffle.id, true)
            .await
            .map(drop),
        f.service.delete_raffle(&intruder, f.raffle.id).await,
        f.service.export_csv(&intruder, f.raffle.id).await.map(drop),
    ];
    for result in results {
        assert!(matches!(result, Err(RaffleError::NotOwner { .. })));
    }
    assert_eq!(
        f.service.get_ticket(&f.raffle.id.to_string(), 2).await.unwrap().status(),
        TicketStatus::Reserved
    );
}

#[tokio::test]
async fn test_delete_removes_raffle_and_tickets() {
    let f = fixture().await;
    let id = f.raffle.id.to_string();

    f.service.delete_raffle(&f.owner, f.raffle.id).await.unwrap();

    assert!(f.service.get_raffle(&id).await.unwrap_err().is_not_found());
    assert!(f.service.get_raffle(f.raffle.slug.as_str()).await.unwrap_err().is_not_found());
    assert!(f.service.get_ticket(&id, 1).await.unwrap_err().is_not_found());
    assert!(f.service.stats(f.raffle.id).await.unwrap_err().is_not_found());
    assert!(f
        .service
        .reserve_ticket(f.raffle.id, 1, Buyer::new("Ana", "1"))
        .await
        .error()
        .unwrap()
        .is_not_found());
    assert!(f.service.delete_raffle(&f.owner, f.raffle.id).await.is_err());
}

#[tokio::test]
async fn test_csv_export_lists_claimed_tickets() {
    let f = fixture().await;
    f.service
        .reserve_ticket(f.raffle.id, 12, Buyer::new("Ana", "111").with_email("ana@mail.com"))
        .await;
    f.service
        .reserve_ticket(f.raffle.id, 3, Buyer::new("Beto", "222"))
        .await;
    f.service.mark_as_sold(&f.owner, f.raffle.id, 3).await.unwrap();

    let csv = f.service.export_csv(&f.owner, f.raffle.id).await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Número,Nombre,Teléfono,Email,Estado",
            "3,Beto,222,,vendido",
            "12,Ana,111,ana@mail.com,reservado",
        ]
    );
    assert_eq!(
        f.service.csv_file_name(f.raffle.id).await.unwrap(),
        "sorteo-Rifa del Club-numeros.csv"
    );
}
