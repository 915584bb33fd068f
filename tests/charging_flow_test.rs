// tests/charging_flow_test.rs
//! End-to-end charging flows through the processor against simulated peers

mod peer_simulator;

use std::sync::Arc;
use std::time::Duration;

use apolo_chf::database::RecordStore;
use apolo_chf::error::ChargingError;
use apolo_chf::models::{
    CauseForRecordClosing, MultipleUnitUsage, QuotaManagementIndicator, RecordStatus, Trigger,
    TriggerType, UsedUnitContainer,
};
use apolo_chf::peers::{CcRequestType, RequestSubType, RequestedAction, ServiceUnit};
use peer_simulator::{
    charging_request, online_usage, AccountSimulator, Harness, RatingSimulator, SUPI,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHARGING_ID: &str = "imsi-208930000000001SMF0";

async fn open_session(harness: &Harness) -> String {
    let (_, location) = harness
        .processor
        .create(charging_request(vec![], vec![]))
        .await
        .unwrap();
    location
}

#[tokio::test]
async fn test_create_returns_location() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());

    let (response, location) = harness
        .processor
        .create(charging_request(vec![], vec![]))
        .await
        .unwrap();

    assert!(location.ends_with("/nchf-convergedcharging/v3/chargingdata/imsi-208930000000001SMF0"));
    assert!(response.multiple_unit_information.is_empty());
    assert!(harness.rating.requests().is_empty());
    assert!(harness.accounts.requests().is_empty());

    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Open);
    assert_eq!(records[0].nf_consumer, "SMF");
}

#[tokio::test]
async fn test_reserve_shortfall_refills_before_granting() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());
    open_session(&harness).await;

    // Reserve 1500 at unit cost 1
    let response = harness
        .processor
        .update(charging_request(vec![online_usage(5, 0, 1500)], vec![]), CHARGING_ID)
        .await
        .unwrap();
    let info = &response.multiple_unit_information[0];
    assert_eq!(info.rating_group, 5);
    assert_eq!(info.granted_unit.as_ref().unwrap().total_volume, Some(1500));
    assert_eq!(info.volume_quota_threshold, Some(1200));

    // 1000 used at unit cost 2 overdraws the reservation by 500
    harness.rating.set_unit_cost(2);
    harness
        .processor
        .update(charging_request(vec![online_usage(5, 1000, 0)], vec![]), CHARGING_ID)
        .await
        .unwrap();

    let debits = harness.accounts.requests();
    assert_eq!(debits.len(), 2);
    let refill = &debits[1];
    assert_eq!(refill.cc_request_number, 1);
    assert_eq!(refill.cc_request_type, CcRequestType::UpdateRequest);
    assert_eq!(refill.requested_action, RequestedAction::DirectDebiting);
    assert_eq!(
        refill.multiple_services_credit_control.requested_service_unit,
        Some(ServiceUnit::octets(500))
    );

    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].total_volume(), 1000);
}

#[tokio::test]
async fn test_one_time_event_rejects_update() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());

    let mut request = charging_request(vec![], vec![]);
    request.one_time_event = true;
    harness.processor.create(request).await.unwrap();

    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records[0].status, RecordStatus::Closed);
    assert!(records[0].one_time_event);

    let err = harness
        .processor
        .update(charging_request(vec![online_usage(1, 10, 10)], vec![]), CHARGING_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, ChargingError::RecordClosed(_)));
    assert!(harness.rating.requests().is_empty());
}

#[tokio::test]
async fn test_final_trigger_debits_without_partial_record() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 300), AccountSimulator::new());
    open_session(&harness).await;

    let response = harness
        .processor
        .update(
            charging_request(
                vec![online_usage(7, 100, 0)],
                vec![Trigger::immediate(TriggerType::Final)],
            ),
            CHARGING_ID,
        )
        .await
        .unwrap();

    let info = &response.multiple_unit_information[0];
    assert_eq!(info.rating_group, 7);
    assert_eq!(info.granted_unit.as_ref().unwrap().total_volume, Some(0));

    let pricing = harness.rating.requests();
    assert_eq!(pricing.len(), 1);
    assert_eq!(pricing[0].service_rating.request_sub_type, RequestSubType::Debit);
    assert_eq!(pricing[0].service_rating.consumed_units, Some(100));

    let debits = harness.accounts.requests();
    assert_eq!(debits.len(), 1);
    assert_eq!(debits[0].cc_request_type, CcRequestType::TerminationRequest);
    assert_eq!(
        debits[0].multiple_services_credit_control.used_service_unit,
        Some(ServiceUnit::octets(300))
    );

    // No partial record: still one open record
    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_open());
}

#[tokio::test]
async fn test_change_of_condition_reopens_record() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());
    open_session(&harness).await;

    harness
        .processor
        .update(
            charging_request(
                vec![online_usage(1, 100, 100)],
                vec![Trigger::immediate(TriggerType::QosChange)],
            ),
            CHARGING_ID,
        )
        .await
        .unwrap();

    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records.len(), 2);

    let (closed, successor) = (&records[0], &records[1]);
    assert_eq!(closed.status, RecordStatus::Closed);
    assert_eq!(closed.cause_for_record_closing, Some(CauseForRecordClosing::PartialRecord));
    assert_eq!(closed.total_volume(), 100);
    assert!(successor.is_open());
    assert!(successor.continuation);
    assert_eq!(successor.charging_session_id, CHARGING_ID);
    assert!(successor.record_sequence_number > closed.record_sequence_number);

    // The successor keeps accepting usage under the same id
    harness
        .processor
        .update(charging_request(vec![online_usage(1, 40, 100)], vec![]), CHARGING_ID)
        .await
        .unwrap();
    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records[1].total_volume(), 40);
}

#[tokio::test]
async fn test_failed_partial_write_keeps_usage() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());
    open_session(&harness).await;

    harness.store.fail_next_persist();
    let err = harness
        .processor
        .update(
            charging_request(
                vec![online_usage(1, 100, 100)],
                vec![Trigger::immediate(TriggerType::QosChange)],
            ),
            CHARGING_ID,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ChargingError::Persistence(_)));

    // The record stays open with the reported usage
    harness
        .processor
        .update(charging_request(vec![online_usage(1, 40, 100)], vec![]), CHARGING_ID)
        .await
        .unwrap();

    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_open());
    assert_eq!(records[0].record_sequence_number, 0);
    assert_eq!(records[0].total_volume(), 140);

    // Reported again, the change of condition closes it with all its usage
    harness
        .processor
        .update(
            charging_request(
                vec![online_usage(1, 0, 100)],
                vec![Trigger::immediate(TriggerType::QosChange)],
            ),
            CHARGING_ID,
        )
        .await
        .unwrap();

    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].cause_for_record_closing, Some(CauseForRecordClosing::PartialRecord));
    assert_eq!(records[0].total_volume(), 140);
    assert!(records[1].is_open());
    assert!(records[1].continuation);
}

#[tokio::test]
async fn test_release_closes_record() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());
    open_session(&harness).await;

    harness
        .processor
        .update(charging_request(vec![online_usage(1, 0, 100)], vec![]), CHARGING_ID)
        .await
        .unwrap();
    harness
        .processor
        .release(charging_request(vec![online_usage(1, 80, 0)], vec![]), CHARGING_ID)
        .await
        .unwrap();

    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Closed);
    assert_eq!(records[0].cause_for_record_closing, Some(CauseForRecordClosing::NormalRelease));
    assert_eq!(records[0].total_volume(), 80);

    let err = harness
        .processor
        .release(charging_request(vec![], vec![]), CHARGING_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, ChargingError::RecordClosed(_)));
}

#[tokio::test]
async fn test_unknown_subscriber_and_charging_id() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());

    let err = harness
        .processor
        .update(charging_request(vec![online_usage(1, 10, 10)], vec![]), CHARGING_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, ChargingError::SubscriberNotFound(_)));

    open_session(&harness).await;
    let err = harness
        .processor
        .update(charging_request(vec![online_usage(1, 10, 10)], vec![]), "imsi-208930000000001SMF9")
        .await
        .unwrap_err();
    assert!(matches!(err, ChargingError::ChargingSessionNotFound(_)));
    assert_eq!(err.status_code().as_u16(), 404);

    assert!(harness.rating.requests().is_empty());
    assert!(harness.accounts.requests().is_empty());
}

#[tokio::test]
async fn test_malformed_subscriber_rejected() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());

    let mut request = charging_request(vec![], vec![]);
    request.subscriber_identifier = "imsi-20893abc".to_string();

    let err = harness.processor.create(request).await.unwrap_err();
    assert!(matches!(err, ChargingError::MalformedSubscriber(_)));
    assert_eq!(harness.processor.context().registry().len(), 0);
}

#[tokio::test]
async fn test_offline_group_needs_no_peers() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());
    open_session(&harness).await;

    let offline = MultipleUnitUsage {
        rating_group: 9,
        used_unit_container: vec![UsedUnitContainer {
            quota_management_indicator: Some(QuotaManagementIndicator::OfflineCharging),
            total_volume: Some(2048),
            ..Default::default()
        }],
        ..Default::default()
    };

    let response = harness
        .processor
        .update(charging_request(vec![offline], vec![]), CHARGING_ID)
        .await
        .unwrap();

    let info = &response.multiple_unit_information[0];
    assert_eq!(info.rating_group, 9);
    assert_eq!(info.volume_quota_threshold, Some(30_000_000));
    assert!(info.granted_unit.is_none());
    assert!(harness.rating.requests().is_empty());

    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records[0].total_volume(), 2048);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_are_serialized() {
    let harness = Harness::new(
        RatingSimulator::new(1, 10_000, 0),
        AccountSimulator::with_delay(Duration::from_millis(10)),
    );
    open_session(&harness).await;

    let updates: Vec<_> = (0..8)
        .map(|_| {
            let processor = Arc::clone(&harness.processor);
            tokio::spawn(async move {
                processor
                    .update(charging_request(vec![online_usage(1, 100, 100)], vec![]), CHARGING_ID)
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(updates).await {
        assert!(result.unwrap().is_ok());
    }

    let mut numbers: Vec<u32> = harness
        .accounts
        .requests()
        .iter()
        .map(|r| r.cc_request_number)
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (0..8).collect::<Vec<u32>>());

    let records = harness.store.records(SUPI).await.unwrap();
    assert_eq!(records[0].total_volume(), 800);
    assert_eq!(records[0].usage[&1].containers, 8);
}

#[tokio::test]
async fn test_recharge_restores_reserve_and_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(body_partial_json(serde_json::json!({
            "reauthorizationDetails": [{ "ratingGroup": 7 }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(RatingSimulator::new(1, 10_000, 50), AccountSimulator::new());

    let mut create = charging_request(vec![], vec![]);
    create.notify_uri = Some(format!("{}/notify", server.uri()));
    harness.processor.create(create).await.unwrap();

    // Final unit: rating group 7 goes to debit mode
    harness
        .processor
        .update(
            charging_request(
                vec![online_usage(7, 10, 0)],
                vec![Trigger::immediate(TriggerType::Final)],
            ),
            CHARGING_ID,
        )
        .await
        .unwrap();

    harness.processor.notify_recharge(SUPI, 7).await.unwrap();

    let mut delivered = false;
    for _ in 0..100 {
        if server.received_requests().await.map_or(0, |r| r.len()) == 1 {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(delivered);

    harness
        .processor
        .update(charging_request(vec![online_usage(7, 10, 100)], vec![]), CHARGING_ID)
        .await
        .unwrap();

    let last = harness.rating.requests().pop().unwrap();
    assert_eq!(last.service_rating.request_sub_type, RequestSubType::Reserve);
}

#[tokio::test]
async fn test_recharge_for_unknown_subscriber() {
    let harness = Harness::new(RatingSimulator::new(1, 10_000, 0), AccountSimulator::new());

    let err = harness
        .processor
        .notify_recharge("imsi-208930000000009", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ChargingError::SubscriberNotFound(_)));

    // Known subscriber without notify URI: nothing to signal, still accepted
    open_session(&harness).await;
    assert!(harness.processor.notify_recharge(SUPI, 1).await.is_ok());
}
