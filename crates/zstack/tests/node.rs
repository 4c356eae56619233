mod common;

use common::{areq, deadline_in, srsp, MockAdapter};
use zstack::{ZStack, ZStackConfig, ZStackError, ZStackEvent};
use zstack_protocol::{
    ApplicationMessage, ClusterId, Endpoint, IeeeAddress, NetworkAddress, ProfileId, ZStackStatus,
};
use zstack_unpi::{MessageType, Subsystem};

const NODE: IeeeAddress = IeeeAddress(0x00158d0001a2b3c4);

fn start() -> (ZStack, MockAdapter) {
    MockAdapter::start(ZStackConfig::default())
}

fn on_off_message() -> ApplicationMessage {
    ApplicationMessage {
        cluster_id: ClusterId(0x0006),
        source_endpoint: Endpoint(1),
        destination_endpoint: Endpoint(11),
        data: vec![0x01, 0x2a, 0x01],
    }
}

/// Accept data requests and confirm each with `confirm_status`.
fn script_data_request(mock: &MockAdapter, confirm_status: u8) {
    mock.on(MessageType::Sreq, Subsystem::Af, 0x01, move |frame| {
        let endpoint = frame.payload[2];
        let transaction_id = frame.payload[6];
        vec![
            srsp(Subsystem::Af, 0x01, vec![0x00]),
            areq(
                Subsystem::Af,
                0x80,
                vec![confirm_status, endpoint, transaction_id],
            ),
        ]
    });
}

#[tokio::test]
async fn test_resolve_uses_node_table() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x1234), None);

    let address = zstack
        .resolve_node_network_address(deadline_in(500), NODE)
        .await
        .unwrap();

    assert_eq!(address, NetworkAddress(0x1234));
    assert!(mock.captured().is_empty());
}

#[tokio::test]
async fn test_resolve_queries_once_then_caches() {
    let (zstack, mock) = start();
    mock.script_network_address(NODE.0, 0x5678);

    for _ in 0..2 {
        let address = zstack
            .resolve_node_network_address(deadline_in(500), NODE)
            .await
            .unwrap();
        assert_eq!(address, NetworkAddress(0x5678));
    }

    let queries = mock.calls(MessageType::Sreq, Subsystem::Zdo, 0x00);
    assert_eq!(queries.len(), 1);
    assert_eq!(&queries[0].payload[..8], &NODE.0.to_le_bytes());
    assert_eq!(&queries[0].payload[8..], &[0x00, 0x00]);
    assert_eq!(
        zstack.node_table().get(NODE).unwrap().network_address,
        NetworkAddress(0x5678)
    );
}

#[tokio::test]
async fn test_concurrent_resolves_share_one_query() {
    let (zstack, mock) = start();
    mock.script_network_address(NODE.0, 0x5678);

    let (first, second, third) = tokio::join!(
        zstack.resolve_node_network_address(deadline_in(500), NODE),
        zstack.resolve_node_network_address(deadline_in(500), NODE),
        zstack.resolve_node_network_address(deadline_in(500), NODE),
    );

    assert_eq!(first.unwrap(), NetworkAddress(0x5678));
    assert_eq!(second.unwrap(), NetworkAddress(0x5678));
    assert_eq!(third.unwrap(), NetworkAddress(0x5678));
    assert_eq!(mock.calls(MessageType::Sreq, Subsystem::Zdo, 0x00).len(), 1);
}

#[tokio::test]
async fn test_resolve_unknown_node_times_out() {
    let (zstack, mock) = start();
    mock.script_network_address(0x1111, 0x5678);

    let err = zstack
        .resolve_node_network_address(deadline_in(200), NODE)
        .await
        .unwrap_err();

    assert!(err.is_deadline());
    assert!(zstack.node_table().is_empty());
}

#[tokio::test]
async fn test_send_with_ack_waits_for_confirm() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x1234), None);
    script_data_request(&mock, 0x00);

    zstack
        .send_application_message(deadline_in(500), NODE, on_off_message(), true)
        .await
        .unwrap();

    let requests = mock.calls(MessageType::Sreq, Subsystem::Af, 0x01);
    assert_eq!(requests.len(), 1);
    let payload = &requests[0].payload;
    assert_eq!(&payload[..6], &[0x34, 0x12, 11, 1, 0x06, 0x00]);
    assert_eq!(payload[7], 0x10);
    assert_eq!(payload[8], 0x20);
    assert_eq!(&payload[9..], &[0x03, 0x01, 0x2a, 0x01]);

    assert_eq!(zstack.transaction_ids().available(), 256);
}

#[tokio::test]
async fn test_send_with_ack_reports_confirm_failure() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x1234), None);
    script_data_request(&mock, 0xE9);

    let err = zstack
        .send_application_message(deadline_in(500), NODE, on_off_message(), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ZStackError::DeviceFailure(ZStackStatus::MAC_NO_ACK)
    ));
    assert_eq!(zstack.transaction_ids().available(), 256);
}

#[tokio::test]
async fn test_send_with_ack_times_out_without_confirm() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x1234), None);
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Af,
        0x01,
        vec![srsp(Subsystem::Af, 0x01, vec![0x00])],
    );

    let err = zstack
        .send_application_message(deadline_in(200), NODE, on_off_message(), true)
        .await
        .unwrap_err();

    assert!(err.is_deadline());
    assert_eq!(zstack.transaction_ids().available(), 256);
}

#[tokio::test]
async fn test_send_without_ack_needs_only_reply() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x1234), None);
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Af,
        0x01,
        vec![srsp(Subsystem::Af, 0x01, vec![0x00])],
    );

    zstack
        .send_application_message(deadline_in(500), NODE, on_off_message(), false)
        .await
        .unwrap();

    let requests = mock.calls(MessageType::Sreq, Subsystem::Af, 0x01);
    assert_eq!(requests[0].payload[7], 0x00);
}

#[tokio::test]
async fn test_send_rejected_by_adapter() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x1234), None);
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Af,
        0x01,
        vec![srsp(Subsystem::Af, 0x01, vec![0x11])],
    );

    let err = zstack
        .send_application_message(deadline_in(500), NODE, on_off_message(), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ZStackError::DeviceFailure(ZStackStatus::BUFFER_FULL)
    ));
}

#[tokio::test]
async fn test_concurrent_sends_use_distinct_transaction_ids() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x1234), None);
    script_data_request(&mock, 0x00);

    let send = || zstack.send_application_message(deadline_in(1_000), NODE, on_off_message(), true);
    let (a, b, c, d) = tokio::join!(send(), send(), send(), send());
    for result in [a, b, c, d] {
        result.unwrap();
    }

    let mut ids: Vec<u8> = mock
        .calls(MessageType::Sreq, Subsystem::Af, 0x01)
        .iter()
        .map(|f| f.payload[6])
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_force_leave_emits_one_event_without_traffic() {
    let (zstack, mock) = start();
    let ieee = IeeeAddress(0x1);
    zstack
        .node_table()
        .add_or_update(ieee, NetworkAddress(0x0001), None);

    zstack.force_node_leave(ieee).await.unwrap();

    match zstack.read_event(deadline_in(200)).await.unwrap() {
        ZStackEvent::NodeLeave(node) => assert_eq!(node.ieee_address, ieee),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(zstack.read_event(deadline_in(100)).await.unwrap_err().is_deadline());
    assert!(mock.captured().is_empty());
    assert!(zstack.node_table().get(ieee).is_none());
}

#[tokio::test]
async fn test_force_leave_unknown_node() {
    let (zstack, _mock) = start();

    let err = zstack.force_node_leave(NODE).await.unwrap_err();

    assert!(matches!(err, ZStackError::NodeNotFound(address) if address == NODE));
}

#[tokio::test]
async fn test_request_leave_confirmed() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x4000), None);
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Zdo,
        0x34,
        vec![
            srsp(Subsystem::Zdo, 0x34, vec![0x00]),
            areq(Subsystem::Zdo, 0xB4, vec![0x00, 0x40, 0x00]),
        ],
    );

    zstack
        .request_node_leave(deadline_in(500), NODE)
        .await
        .unwrap();

    let requests = mock.calls(MessageType::Sreq, Subsystem::Zdo, 0x34);
    assert_eq!(requests.len(), 1);
    assert_eq!(&requests[0].payload[..2], &[0x00, 0x40]);
    assert_eq!(&requests[0].payload[2..10], &NODE.0.to_le_bytes());

    assert!(zstack.node_table().get(NODE).is_none());
    assert!(matches!(
        zstack.read_event(deadline_in(200)).await.unwrap(),
        ZStackEvent::NodeLeave(node) if node.ieee_address == NODE
    ));
}

#[tokio::test]
async fn test_leaves_complete_while_events_unread() {
    let (zstack, mock) = MockAdapter::start(ZStackConfig {
        event_capacity: 1,
        ..Default::default()
    });
    for ieee in [0x1, 0x2] {
        zstack
            .node_table()
            .add_or_update(IeeeAddress(ieee), NetworkAddress(ieee as u16), None);
    }
    zstack.node_table().add_or_update(NODE, NetworkAddress(0x4000), None);
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Zdo,
        0x34,
        vec![
            srsp(Subsystem::Zdo, 0x34, vec![0x00]),
            areq(Subsystem::Zdo, 0xB4, vec![0x00, 0x40, 0x00]),
        ],
    );

    // Nobody reads events while the queue overflows.
    let leaves = async {
        zstack.force_node_leave(IeeeAddress(0x1)).await?;
        zstack.force_node_leave(IeeeAddress(0x2)).await?;
        zstack.request_node_leave(deadline_in(300), NODE).await
    };
    tokio::time::timeout(std::time::Duration::from_millis(500), leaves)
        .await
        .expect("leave operations do not wait for an event reader")
        .unwrap();

    assert!(zstack.node_table().is_empty());
    assert!(matches!(
        zstack.read_event(deadline_in(100)).await.unwrap(),
        ZStackEvent::NodeLeave(node) if node.ieee_address == NODE
    ));
    assert!(zstack.read_event(deadline_in(100)).await.unwrap_err().is_deadline());
}

#[tokio::test]
async fn test_request_leave_ignores_other_sources() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x4000), None);
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Zdo,
        0x34,
        vec![
            srsp(Subsystem::Zdo, 0x34, vec![0x00]),
            areq(Subsystem::Zdo, 0xB4, vec![0x01, 0x40, 0x00]),
        ],
    );

    let err = zstack
        .request_node_leave(deadline_in(200), NODE)
        .await
        .unwrap_err();

    assert!(err.is_deadline());
    assert!(zstack.node_table().get(NODE).is_some());
}

#[tokio::test]
async fn test_request_leave_without_response_times_out() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x4000), None);
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Zdo,
        0x34,
        vec![srsp(Subsystem::Zdo, 0x34, vec![0x00])],
    );

    let err = zstack
        .request_node_leave(deadline_in(200), NODE)
        .await
        .unwrap_err();

    assert!(err.is_deadline());
    assert!(zstack.node_table().get(NODE).is_some());
    assert!(zstack.read_event(deadline_in(50)).await.is_err());
}

#[tokio::test]
async fn test_request_leave_reports_failure_status() {
    let (zstack, mock) = start();
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x4000), None);
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Zdo,
        0x34,
        vec![
            srsp(Subsystem::Zdo, 0x34, vec![0x00]),
            areq(Subsystem::Zdo, 0xB4, vec![0x00, 0x40, 0x01]),
        ],
    );

    let err = zstack
        .request_node_leave(deadline_in(500), NODE)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ZStackError::DeviceFailure(ZStackStatus::FAILURE)
    ));
    assert!(zstack.node_table().get(NODE).is_some());
}

#[tokio::test]
async fn test_gate_bounds_outstanding_requests() {
    let config = ZStackConfig {
        concurrency: 1,
        ..ZStackConfig::default()
    };
    let (zstack, mock) = MockAdapter::start(config);
    zstack
        .node_table()
        .add_or_update(NODE, NetworkAddress(0x4000), None);
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Zdo,
        0x34,
        vec![srsp(Subsystem::Zdo, 0x34, vec![0x00])],
    );
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Af,
        0x00,
        vec![srsp(Subsystem::Af, 0x00, vec![0x00])],
    );

    let (leave, register) = tokio::join!(
        zstack.request_node_leave(deadline_in(500), NODE),
        async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            zstack
                .register_adapter_endpoint(
                    deadline_in(100),
                    Endpoint(1),
                    ProfileId::HOME_AUTOMATION,
                    0x0005,
                    0,
                    vec![],
                    vec![],
                )
                .await
        }
    );

    assert!(leave.unwrap_err().is_deadline());
    assert!(matches!(
        register.unwrap_err(),
        ZStackError::DeadlineExceeded("waiting for a free request slot")
    ));
    assert!(mock.calls(MessageType::Sreq, Subsystem::Af, 0x00).is_empty());
}

#[tokio::test]
async fn test_register_adapter_endpoint() {
    let (zstack, mock) = start();
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Af,
        0x00,
        vec![srsp(Subsystem::Af, 0x00, vec![0x00])],
    );

    zstack
        .register_adapter_endpoint(
            deadline_in(500),
            Endpoint(1),
            ProfileId::HOME_AUTOMATION,
            0x0005,
            0,
            vec![ClusterId(0x0000), ClusterId(0x0006)],
            vec![ClusterId(0x0019)],
        )
        .await
        .unwrap();

    let requests = mock.calls(MessageType::Sreq, Subsystem::Af, 0x00);
    assert_eq!(
        requests[0].payload,
        vec![
            0x01, 0x04, 0x01, 0x05, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x06, 0x00, 0x01, 0x19,
            0x00
        ]
    );
}

#[tokio::test]
async fn test_permit_and_deny_join() {
    let (zstack, mock) = start();
    mock.on_reply(
        MessageType::Sreq,
        Subsystem::Zdo,
        0x36,
        vec![srsp(Subsystem::Zdo, 0x36, vec![0x00])],
    );

    zstack.permit_join(deadline_in(500), 60).await.unwrap();
    zstack.deny_join(deadline_in(500)).await.unwrap();

    let requests = mock.calls(MessageType::Sreq, Subsystem::Zdo, 0x36);
    assert_eq!(requests[0].payload, vec![0x0F, 0xFC, 0xFF, 60, 0x00]);
    assert_eq!(requests[1].payload, vec![0x0F, 0xFC, 0xFF, 0x00, 0x00]);
}
