//! Connection request lifecycle tests.

use std::sync::Arc;

use ripple::connections;
use ripple::error::StoreError;
use ripple::profiles;
use ripple::rows::{ConnectionStatus, ProfileRow};
use ripple::store::MemoryStore;

const REQUESTER: &str = "user-req";
const ADDRESSEE: &str = "user-add";

async fn seed_profiles(store: &MemoryStore) {
    for (user, name) in [(REQUESTER, "Rhea Requester"), (ADDRESSEE, "Adam Addressee")] {
        profiles::upsert_profile(
            store,
            &ProfileRow {
                user_id: user.to_string(),
                full_name: Some(name.to_string()),
                avatar_url: None,
                current_position: None,
            },
        )
        .await
        .expect("profile");
    }
}

#[tokio::test]
async fn requests_start_pending_and_are_addressed() {
    let store = Arc::new(MemoryStore::new());
    seed_profiles(&store).await;

    let request = connections::send_connection_request(&*store, REQUESTER, ADDRESSEE)
        .await
        .expect("request");
    assert_eq!(request.status, ConnectionStatus::Pending);

    let pending = connections::get_pending_requests(&*store, ADDRESSEE)
        .await
        .expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].requester_id, REQUESTER);

    // Nothing pending from the requester's point of view.
    let none = connections::get_pending_requests(&*store, REQUESTER)
        .await
        .expect("pending");
    assert!(none.is_empty());
}

#[tokio::test]
async fn accepting_joins_both_sides_with_counterparts() {
    let store = Arc::new(MemoryStore::new());
    seed_profiles(&store).await;

    let request = connections::send_connection_request(&*store, REQUESTER, ADDRESSEE)
        .await
        .expect("request");
    connections::respond_to_request(&*store, &request.id, ConnectionStatus::Accepted)
        .await
        .expect("respond");

    let of_requester = connections::get_connections(&*store, REQUESTER)
        .await
        .expect("connections");
    assert_eq!(of_requester.len(), 1);
    assert_eq!(of_requester[0].connection.status, ConnectionStatus::Accepted);
    assert_eq!(
        of_requester[0]
            .counterpart
            .as_ref()
            .and_then(|p| p.full_name.as_deref()),
        Some("Adam Addressee")
    );

    let of_addressee = connections::get_connections(&*store, ADDRESSEE)
        .await
        .expect("connections");
    assert_eq!(
        of_addressee[0]
            .counterpart
            .as_ref()
            .and_then(|p| p.full_name.as_deref()),
        Some("Rhea Requester")
    );

    // Accepted requests no longer show as pending.
    let pending = connections::get_pending_requests(&*store, ADDRESSEE)
        .await
        .expect("pending");
    assert!(pending.is_empty());
}

#[tokio::test]
async fn rejecting_leaves_no_connection() {
    let store = Arc::new(MemoryStore::new());
    seed_profiles(&store).await;

    let request = connections::send_connection_request(&*store, REQUESTER, ADDRESSEE)
        .await
        .expect("request");
    connections::respond_to_request(&*store, &request.id, ConnectionStatus::Rejected)
        .await
        .expect("respond");

    assert!(connections::get_connections(&*store, REQUESTER)
        .await
        .expect("connections")
        .is_empty());
    assert!(connections::get_pending_requests(&*store, ADDRESSEE)
        .await
        .expect("pending")
        .is_empty());
}

#[tokio::test]
async fn responding_to_an_unknown_request_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let err = connections::respond_to_request(&*store, "missing", ConnectionStatus::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}
