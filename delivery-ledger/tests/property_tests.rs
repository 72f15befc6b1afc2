//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Sequence advances by exactly 1 per successful append
//! - Initialization happens at most once per delivery id
//! - Terminal states absorb all further writes
//! - Oracle-written entries are stamped verified
//! - Capacity bounds hold for role grants

use delivery_ledger::{
    Config, DeliveryId, DeliveryIntake, DeliveryStatus, Error, EventUpdate, Ledger,
    PayloadFingerprint, Role, UserId,
};
use proptest::prelude::*;

const OWNER: &str = "root-ops";
const DISPATCHER: &str = "dispatcher";
const COURIER: &str = "courier-1";

/// Strategy for generating non-terminal status codes
fn open_status_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("pending"),
        Just("assigned"),
        Just("in-transit"),
        Just("delayed"),
        Just("arrived"),
    ]
}

/// Strategy for generating terminal status codes
fn terminal_status_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("delivered"), Just("failed"), Just("cancelled")]
}

/// Strategy for generating coordinate strings
fn coordinate_strategy() -> impl Strategy<Value = String> {
    "-?[0-9]{1,3}\\.[0-9]{1,4}"
}

/// Create test ledger with temp directory
async fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    config.owner = OWNER.to_string();

    (Ledger::open(config).await.unwrap(), temp_dir)
}

fn intake(delivery_id: u64) -> DeliveryIntake {
    DeliveryIntake {
        delivery_id: DeliveryId::new(delivery_id),
        operator: UserId::new(COURIER),
        supplier: UserId::new("depot-north"),
        recipient: UserId::new("customer-77"),
        expected_arrival: 2000,
        payload_fingerprint: PayloadFingerprint::digest(b"manifest"),
    }
}

fn update(status: &str) -> EventUpdate {
    EventUpdate {
        latitude: "40.7128".to_string(),
        longitude: "-74.0060".to_string(),
        altitude: 100,
        status: status.to_string(),
        note: "checkpoint".to_string(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: sequence starts at 0 and advances by exactly 1 per
    /// successful append, in order
    #[test]
    fn prop_sequence_advances_by_one(
        statuses in prop::collection::vec(open_status_strategy(), 1..20)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let id = DeliveryId::new(1);

            ledger
                .initialize_delivery(UserId::new(DISPATCHER), intake(1))
                .await
                .unwrap();
            prop_assert_eq!(ledger.query().latest_sequence(id).unwrap(), 0);

            for (i, status) in statuses.iter().enumerate() {
                let seq = ledger
                    .log_event(UserId::new(COURIER), id, update(status))
                    .await
                    .unwrap();
                prop_assert_eq!(seq, (i + 1) as u32);
            }

            prop_assert_eq!(
                ledger.query().latest_sequence(id).unwrap(),
                statuses.len() as u32
            );

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: initialization succeeds at most once; retries leave the
    /// record and grants untouched
    #[test]
    fn prop_initialize_at_most_once(expected_arrival in 1u64..1_000_000) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let id = DeliveryId::new(7);

            let mut first = intake(7);
            first.expected_arrival = expected_arrival;
            ledger
                .initialize_delivery(UserId::new(DISPATCHER), first)
                .await
                .unwrap();

            let before = ledger.query().delivery_details(id).unwrap().unwrap();

            let mut second = intake(7);
            second.expected_arrival = expected_arrival + 1;
            second.operator = UserId::new("someone-else");
            let err = ledger
                .initialize_delivery(UserId::new("someone-else"), second)
                .await
                .unwrap_err();
            prop_assert!(matches!(err, Error::AlreadyInitialized(_)));

            let after = ledger.query().delivery_details(id).unwrap().unwrap();
            prop_assert_eq!(after.expected_arrival, before.expected_arrival);
            prop_assert_eq!(after.operator, before.operator);
            prop_assert!(!ledger
                .query()
                .has_role(&UserId::new("someone-else"), id, Role::Operator)
                .unwrap());

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: a terminal status absorbs every further write; nothing
    /// past the terminal entry is appended
    #[test]
    fn prop_terminal_absorbs(
        open_statuses in prop::collection::vec(open_status_strategy(), 0..5),
        terminal in terminal_status_strategy()
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let id = DeliveryId::new(1);
            let courier = UserId::new(COURIER);

            ledger
                .initialize_delivery(UserId::new(DISPATCHER), intake(1))
                .await
                .unwrap();
            for status in &open_statuses {
                ledger
                    .log_event(courier.clone(), id, update(status))
                    .await
                    .unwrap();
            }

            let final_seq = ledger
                .log_event(courier.clone(), id, update(terminal))
                .await
                .unwrap();
            prop_assert!(ledger.query().is_delivery_completed(id).unwrap());

            let record = ledger.query().delivery_details(id).unwrap().unwrap();
            prop_assert!(record.actual_arrival.is_some());

            let err = ledger
                .log_event(courier.clone(), id, update("arrived"))
                .await
                .unwrap_err();
            prop_assert!(matches!(err, Error::AlreadyCompleted(_)));
            let err = ledger
                .log_failure(courier.clone(), id, "late report")
                .await
                .unwrap_err();
            prop_assert!(matches!(err, Error::AlreadyCompleted(_)));

            prop_assert_eq!(ledger.query().latest_sequence(id).unwrap(), final_seq);
            prop_assert!(ledger
                .query()
                .event_log_entry(id, final_seq + 1)
                .unwrap()
                .is_none());

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: entries written by an allowlisted caller are stamped
    /// verified; operator entries are not
    #[test]
    fn prop_oracle_flag_matches_registry(statuses in prop::collection::vec(open_status_strategy(), 1..6)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let id = DeliveryId::new(1);
            let owner = UserId::new(OWNER);
            let feed = UserId::new("gps-feed");

            ledger
                .initialize_delivery(UserId::new(DISPATCHER), intake(1))
                .await
                .unwrap();
            ledger.add_oracle(&owner, feed.clone()).unwrap();

            for (i, status) in statuses.iter().enumerate() {
                // Alternate between the operator and the oracle feed
                let caller = if i % 2 == 0 {
                    UserId::new(COURIER)
                } else {
                    feed.clone()
                };
                let seq = ledger
                    .log_event(caller.clone(), id, update(status))
                    .await
                    .unwrap();
                let entry = ledger.query().event_log_entry(id, seq).unwrap().unwrap();
                prop_assert_eq!(entry.oracle_verified, i % 2 == 1);
                prop_assert_eq!(entry.updated_by, caller);
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: invalid inputs are rejected without any partial write
    #[test]
    fn prop_invalid_input_leaves_no_trace(
        bad_status in "[a-z]{1,12}",
        lat in coordinate_strategy(),
        lon in coordinate_strategy()
    ) {
        prop_assume!(DeliveryStatus::from_str(&bad_status).is_none());

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let id = DeliveryId::new(1);
            let courier = UserId::new(COURIER);

            ledger
                .initialize_delivery(UserId::new(DISPATCHER), intake(1))
                .await
                .unwrap();

            let bad_update = EventUpdate {
                latitude: lat,
                longitude: lon,
                altitude: 100,
                status: bad_status.clone(),
                note: "checkpoint".to_string(),
            };
            let err = ledger
                .log_event(courier.clone(), id, bad_update)
                .await
                .unwrap_err();
            prop_assert!(matches!(err, Error::InvalidStatus(_)));

            let mut empty_coord = update("in-transit");
            empty_coord.latitude = String::new();
            let err = ledger
                .log_event(courier.clone(), id, empty_coord)
                .await
                .unwrap_err();
            prop_assert!(matches!(err, Error::EmptyCoordinate(_)));

            prop_assert_eq!(ledger.query().latest_sequence(id).unwrap(), 0);
            prop_assert!(ledger.query().event_log_entry(id, 1).unwrap().is_none());

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_delivery_lifecycle() {
        let (ledger, _temp) = create_test_ledger().await;
        let id = DeliveryId::new(1);
        let courier = UserId::new(COURIER);

        ledger
            .initialize_delivery(UserId::new(DISPATCHER), intake(1))
            .await
            .unwrap();

        let mut first = update("in-transit");
        first.note = "started".to_string();
        let seq = ledger.log_event(courier.clone(), id, first).await.unwrap();
        assert_eq!(seq, 1);

        let record = ledger.query().delivery_details(id).unwrap().unwrap();
        assert_eq!(record.status, DeliveryStatus::InTransit);
        assert!(!record.completed);

        let mut second = update("delivered");
        second.note = "handover".to_string();
        let seq = ledger.log_event(courier.clone(), id, second).await.unwrap();
        assert_eq!(seq, 2);

        let record = ledger.query().delivery_details(id).unwrap().unwrap();
        assert!(record.completed);
        assert!(record.actual_arrival.is_some());

        let err = ledger
            .log_event(courier, id, update("arrived"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyCompleted(_)));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unregistered_caller_then_oracle() {
        let (ledger, _temp) = create_test_ledger().await;
        let id = DeliveryId::new(1);
        let owner = UserId::new(OWNER);
        let scanner = UserId::new("scanner-7");

        ledger
            .initialize_delivery(UserId::new(DISPATCHER), intake(1))
            .await
            .unwrap();

        let err = ledger
            .log_event(scanner.clone(), id, update("in-transit"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        ledger.add_oracle(&owner, scanner.clone()).unwrap();
        let seq = ledger
            .log_event(scanner, id, update("in-transit"))
            .await
            .unwrap();
        let entry = ledger.query().event_log_entry(id, seq).unwrap().unwrap();
        assert!(entry.oracle_verified);

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_event_log_limit() {
        let (ledger, _temp) = create_test_ledger().await;
        let id = DeliveryId::new(1);
        let courier = UserId::new(COURIER);

        ledger
            .initialize_delivery(UserId::new(DISPATCHER), intake(1))
            .await
            .unwrap();

        // Exactly 100 appends succeed
        for i in 1..=100u32 {
            let seq = ledger
                .log_event(courier.clone(), id, update("in-transit"))
                .await
                .unwrap();
            assert_eq!(seq, i);
        }

        // The 101st fails and the sequence stops advancing
        let err = ledger
            .log_event(courier.clone(), id, update("in-transit"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LogLimitExceeded(_)));
        assert_eq!(ledger.query().latest_sequence(id).unwrap(), 100);
        assert!(ledger.query().event_log_entry(id, 101).unwrap().is_none());

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_forced_failure_leaves_log_untouched() {
        let (ledger, _temp) = create_test_ledger().await;
        let id = DeliveryId::new(1);
        let courier = UserId::new(COURIER);

        ledger
            .initialize_delivery(UserId::new(DISPATCHER), intake(1))
            .await
            .unwrap();
        ledger
            .log_event(courier.clone(), id, update("in-transit"))
            .await
            .unwrap();

        ledger
            .log_failure(courier.clone(), id, "customs hold")
            .await
            .unwrap();

        let record = ledger.query().delivery_details(id).unwrap().unwrap();
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert!(record.completed);
        assert_eq!(record.failure_reason.as_deref(), Some("customs hold"));
        assert_eq!(record.sequence, 1);
        assert!(ledger.query().event_log_entry(id, 2).unwrap().is_none());

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_oracle_cannot_force_failure() {
        let (ledger, _temp) = create_test_ledger().await;
        let id = DeliveryId::new(1);
        let owner = UserId::new(OWNER);
        let feed = UserId::new("gps-feed");

        ledger
            .initialize_delivery(UserId::new(DISPATCHER), intake(1))
            .await
            .unwrap();
        ledger.add_oracle(&owner, feed.clone()).unwrap();

        // The allowlist grants event logging, not forced failure
        ledger
            .log_event(feed.clone(), id, update("delayed"))
            .await
            .unwrap();
        let err = ledger
            .log_failure(feed, id, "giving up")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_pause_blocks_all_callers() {
        let (ledger, _temp) = create_test_ledger().await;
        let owner = UserId::new(OWNER);
        let id = DeliveryId::new(1);

        ledger
            .initialize_delivery(UserId::new(DISPATCHER), intake(1))
            .await
            .unwrap();
        ledger.pause(&owner).unwrap();

        for caller in [owner.clone(), UserId::new(COURIER), UserId::new(DISPATCHER)] {
            let err = ledger
                .log_event(caller.clone(), id, update("in-transit"))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Paused));
            let err = ledger
                .initialize_delivery(caller, intake(2))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Paused));
        }

        ledger.unpause(&owner).unwrap();
        ledger
            .initialize_delivery(UserId::new(DISPATCHER), intake(2))
            .await
            .unwrap();

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_role_capacity_bound() {
        let (ledger, _temp) = create_test_ledger().await;
        let id = DeliveryId::new(1);
        let dispatcher = UserId::new(DISPATCHER);
        let target = UserId::new("courier-2");

        ledger
            .initialize_delivery(dispatcher.clone(), intake(1))
            .await
            .unwrap();

        for _ in 0..5 {
            ledger
                .assign_role(&dispatcher, &target, id, Role::Operator)
                .unwrap();
        }
        let err = ledger
            .assign_role(&dispatcher, &target, id, Role::Supplier)
            .unwrap_err();
        assert!(matches!(err, Error::RoleCapacityExceeded { .. }));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_clock_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.owner = OWNER.to_string();

        let first_start = {
            let ledger = Ledger::open(config.clone()).await.unwrap();
            ledger
                .initialize_delivery(UserId::new(DISPATCHER), intake(1))
                .await
                .unwrap();
            let start = ledger
                .query()
                .delivery_details(DeliveryId::new(1))
                .unwrap()
                .unwrap()
                .start_time;
            ledger.shutdown().await.unwrap();
            start
        };

        let ledger = Ledger::open(config).await.unwrap();
        ledger
            .initialize_delivery(UserId::new(DISPATCHER), intake(2))
            .await
            .unwrap();
        let second_start = ledger
            .query()
            .delivery_details(DeliveryId::new(2))
            .unwrap()
            .unwrap()
            .start_time;
        assert!(second_start > first_start);

        ledger.shutdown().await.unwrap();
    }
}
