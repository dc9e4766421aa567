use std::sync::Arc;
use boxoffice_core::{BookingOrchestrator, BookingOutcome, CoreError, InMemoryBookingRepository};
use boxoffice_shared::{Booking, BookingFilter, BookingStatus};
use proptest::prelude::*;
use uuid::Uuid;

fn setup() -> (Arc<InMemoryBookingRepository>, Arc<BookingOrchestrator>) {
    let repo = Arc::new(InMemoryBookingRepository::new());
    let orchestrator = Arc::new(BookingOrchestrator::new(repo.clone()));
    (repo, orchestrator)
}

fn booked(outcome: BookingOutcome) -> Booking {
    match outcome {
        BookingOutcome::Booked { booking } => booking,
        other => panic!("expected a booking, got {:?}", other),
    }
}

fn confirmed_for(repo: &InMemoryBookingRepository, event_id: Uuid) -> Vec<Booking> {
    repo.all_bookings()
        .into_iter()
        .filter(|b| b.event_id == event_id && b.is_live() && b.status == BookingStatus::Confirmed)
        .collect()
}

#[tokio::test]
async fn test_single_ticket_handoff_scenario() {
    let (repo, orchestrator) = setup();
    let event = orchestrator.create_event(1).await.unwrap();

    let u1 = booked(orchestrator.book_ticket(event.id, "u1").await.unwrap());
    let second = orchestrator.book_ticket(event.id, "u2").await.unwrap();
    assert!(matches!(second, BookingOutcome::Waitlisted { position: 1, .. }));

    let outcome = orchestrator.cancel_booking(u1.id).await.unwrap();
    assert_eq!(outcome.canceled.id, u1.id);
    assert_eq!(outcome.promoted.as_ref().unwrap().user_id, "u2");

    let overview = orchestrator.get_event(event.id).await.unwrap();
    assert_eq!(overview.event.available_tickets, 0);
    assert_eq!(overview.waitlist_size, 0);
    assert_eq!(repo.raw_event(event.id).unwrap().available_tickets, 0);

    let confirmed = confirmed_for(&repo, event.id);
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].user_id, "u2");

    let all = orchestrator
        .list_bookings(&BookingFilter::for_event(event.id).with_canceled())
        .await
        .unwrap();
    let canceled: Vec<_> = all
        .iter()
        .filter(|d| d.booking.status == BookingStatus::Canceled)
        .collect();
    assert_eq!(canceled.len(), 1);
    assert_eq!(canceled[0].booking.user_id, "u1");
}

#[tokio::test]
async fn test_zero_ticket_event_waitlists_immediately() {
    let (repo, orchestrator) = setup();
    let event = orchestrator.create_event(0).await.unwrap();

    let outcome = orchestrator.book_ticket(event.id, "u1").await.unwrap();
    assert!(matches!(outcome, BookingOutcome::Waitlisted { position: 1, .. }));
    assert_eq!(orchestrator.waitlist_size(event.id).await.unwrap(), 1);
    assert!(repo.all_bookings().is_empty());
}

#[tokio::test]
async fn test_cancel_unknown_booking() {
    let (_repo, orchestrator) = setup();
    let result = orchestrator.cancel_booking(Uuid::new_v4()).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_book_unknown_event() {
    let (_repo, orchestrator) = setup();
    let result = orchestrator.book_ticket(Uuid::new_v4(), "u1").await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_fifo_promotion_order() {
    let (_repo, orchestrator) = setup();
    let event = orchestrator.create_event(3).await.unwrap();

    let mut holders = Vec::new();
    for user in ["a", "b", "c"] {
        holders.push(booked(orchestrator.book_ticket(event.id, user).await.unwrap()));
    }
    for user in ["u1", "u2", "u3"] {
        let outcome = orchestrator.book_ticket(event.id, user).await.unwrap();
        assert!(matches!(outcome, BookingOutcome::Waitlisted { .. }));
    }

    let mut promoted = Vec::new();
    for holder in holders {
        let outcome = orchestrator.cancel_booking(holder.id).await.unwrap();
        promoted.push(outcome.promoted.unwrap().user_id);
    }
    assert_eq!(promoted, vec!["u1", "u2", "u3"]);
}

#[tokio::test]
async fn test_idle_slot_release() {
    let (repo, orchestrator) = setup();
    let event = orchestrator.create_event(2).await.unwrap();
    let booking = booked(orchestrator.book_ticket(event.id, "u1").await.unwrap());
    let before = repo.all_bookings().len();

    let outcome = orchestrator.cancel_booking(booking.id).await.unwrap();

    assert!(outcome.promoted.is_none());
    assert_eq!(repo.all_bookings().len(), before);
    assert_eq!(orchestrator.get_event(event.id).await.unwrap().event.available_tickets, 2);
    assert_eq!(repo.raw_event(event.id).unwrap().available_tickets, 2);
}

#[tokio::test]
async fn test_reassignment_keeps_availability() {
    let (repo, orchestrator) = setup();
    let event = orchestrator.create_event(1).await.unwrap();
    let booking = booked(orchestrator.book_ticket(event.id, "u1").await.unwrap());
    orchestrator.book_ticket(event.id, "u2").await.unwrap();
    let before = repo.all_bookings().len();

    let outcome = orchestrator.cancel_booking(booking.id).await.unwrap();

    let promoted = outcome.promoted.unwrap();
    assert_eq!(promoted.status, BookingStatus::Confirmed);
    assert_eq!(repo.all_bookings().len(), before + 1);
    assert_eq!(orchestrator.get_event(event.id).await.unwrap().event.available_tickets, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_respect_capacity() {
    let (repo, orchestrator) = setup();
    let capacity = 10;
    let requests = 50;
    let event = orchestrator.create_event(capacity).await.unwrap();
    let event_id = event.id;

    let handles: Vec<_> = (0..requests)
        .map(|i| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.book_ticket(event_id, &format!("user-{}", i)).await })
        })
        .collect();

    let mut booked_count = 0;
    let mut waitlisted_count = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            BookingOutcome::Booked { .. } => booked_count += 1,
            BookingOutcome::Waitlisted { .. } => waitlisted_count += 1,
        }
    }

    assert_eq!(booked_count, capacity);
    assert_eq!(waitlisted_count, requests - capacity);
    assert_eq!(confirmed_for(&repo, event.id).len() as i64, capacity);
    assert_eq!(orchestrator.waitlist_size(event.id).await.unwrap() as i64, requests - capacity);
    assert_eq!(repo.raw_event(event.id).unwrap().available_tickets, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cancellations_promote_each_waiting_user_once() {
    let (repo, orchestrator) = setup();
    let event = orchestrator.create_event(5).await.unwrap();

    let mut holders = Vec::new();
    for i in 0..5 {
        holders.push(booked(orchestrator.book_ticket(event.id, &format!("holder-{}", i)).await.unwrap()));
    }
    for i in 0..3 {
        orchestrator.book_ticket(event.id, &format!("waiting-{}", i)).await.unwrap();
    }

    let handles: Vec<_> = holders
        .into_iter()
        .map(|holder| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.cancel_booking(holder.id).await })
        })
        .collect();

    let mut promoted = Vec::new();
    for handle in handles {
        if let Some(booking) = handle.await.unwrap().unwrap().promoted {
            promoted.push(booking.user_id);
        }
    }
    promoted.sort();

    assert_eq!(promoted, vec!["waiting-0", "waiting-1", "waiting-2"]);
    assert_eq!(orchestrator.get_event(event.id).await.unwrap().event.available_tickets, 2);
    assert_eq!(repo.raw_event(event.id).unwrap().available_tickets, 2);
    assert_eq!(confirmed_for(&repo, event.id).len(), 3);
}

#[derive(Debug, Clone)]
enum Op {
    Book(u8),
    Cancel(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6).prop_map(Op::Book),
        (0usize..16).prop_map(Op::Cancel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_inventory_invariants_hold(total in 0i64..5, ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (repo, orchestrator) = setup();
            let event = orchestrator.create_event(total).await.unwrap();

            for op in ops {
                match op {
                    Op::Book(user) => {
                        orchestrator.book_ticket(event.id, &format!("u{}", user)).await.unwrap();
                    }
                    Op::Cancel(pick) => {
                        let live = confirmed_for(&repo, event.id);
                        if !live.is_empty() {
                            let target = &live[pick % live.len()];
                            orchestrator.cancel_booking(target.id).await.unwrap();
                        }
                    }
                }

                let overview = orchestrator.get_event(event.id).await.unwrap();
                let available = overview.event.available_tickets;
                let confirmed = confirmed_for(&repo, event.id).len() as i32;

                assert!(available >= 0 && available <= total as i32);
                assert!(confirmed <= total as i32);
                assert_eq!(available + confirmed, total as i32);
                assert_eq!(repo.raw_event(event.id).unwrap().available_tickets, available);
                // An idle unit never coexists with a waiting user
                assert!(available == 0 || overview.waitlist_size == 0);
            }
        });
    }
}
