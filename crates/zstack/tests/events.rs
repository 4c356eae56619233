mod common;

use common::{areq, deadline_in, initialised, MockAdapter};
use zstack::ZStackEvent;
use zstack_protocol::{ClusterId, Endpoint, IeeeAddress, LogicalType, NetworkAddress};
use zstack_unpi::Subsystem;

const NODE: IeeeAddress = IeeeAddress(0x00158d0001a2b3c4);

async fn announce(mock: &MockAdapter, network: u16, capabilities: u8) {
    let mut payload = Vec::new();
    payload.extend_from_slice(&network.to_le_bytes());
    payload.extend_from_slice(&network.to_le_bytes());
    payload.extend_from_slice(&NODE.0.to_le_bytes());
    payload.push(capabilities);
    mock.inject(areq(Subsystem::Zdo, 0xC1, payload)).await;
}

async fn incoming(mock: &MockAdapter, source: u16, data: &[u8]) {
    let mut payload = vec![0x00, 0x00, 0x06, 0x00];
    payload.extend_from_slice(&source.to_le_bytes());
    payload.extend_from_slice(&[11, 1, 0x00, 0xA0, 0x00]);
    payload.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
    payload.push(0x07);
    payload.push(data.len() as u8);
    payload.extend_from_slice(data);
    mock.inject(areq(Subsystem::Af, 0x81, payload)).await;
}

async fn leave(mock: &MockAdapter, source: u16) {
    let mut payload = Vec::new();
    payload.extend_from_slice(&source.to_le_bytes());
    payload.extend_from_slice(&NODE.0.to_le_bytes());
    payload.extend_from_slice(&[0x00, 0x00, 0x00]);
    mock.inject(areq(Subsystem::Zdo, 0xC9, payload)).await;
}

#[tokio::test]
async fn test_announce_joins_then_updates() {
    let (zstack, mock) = initialised().await;

    announce(&mock, 0x2001, 0x8E).await;
    match zstack.read_event(deadline_in(500)).await.unwrap() {
        ZStackEvent::NodeJoin(node) => {
            assert_eq!(node.ieee_address, NODE);
            assert_eq!(node.network_address, NetworkAddress(0x2001));
            assert_eq!(node.logical_type, Some(LogicalType::Router));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    announce(&mock, 0x2002, 0x80).await;
    match zstack.read_event(deadline_in(500)).await.unwrap() {
        ZStackEvent::NodeUpdate(node) => {
            assert_eq!(node.network_address, NetworkAddress(0x2002));
            assert_eq!(node.logical_type, Some(LogicalType::EndDevice));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert_eq!(zstack.node_table().len(), 1);
}

#[tokio::test]
async fn test_incoming_message_from_known_node() {
    let (zstack, mock) = initialised().await;
    announce(&mock, 0x2001, 0x80).await;
    zstack.read_event(deadline_in(500)).await.unwrap();

    incoming(&mock, 0x2001, &[0x18, 0x01, 0x0A]).await;

    match zstack.read_event(deadline_in(500)).await.unwrap() {
        ZStackEvent::ApplicationMessage {
            source_ieee,
            source_network,
            message,
        } => {
            assert_eq!(source_ieee, NODE);
            assert_eq!(source_network, NetworkAddress(0x2001));
            assert_eq!(message.cluster_id, ClusterId(0x0006));
            assert_eq!(message.source_endpoint, Endpoint(11));
            assert_eq!(message.destination_endpoint, Endpoint(1));
            assert_eq!(message.data, vec![0x18, 0x01, 0x0A]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_incoming_message_from_unknown_node_is_dropped() {
    let (zstack, mock) = initialised().await;

    incoming(&mock, 0x3003, &[0x00]).await;

    assert!(zstack
        .read_event(deadline_in(200))
        .await
        .unwrap_err()
        .is_deadline());
}

#[tokio::test]
async fn test_leave_indication_removes_node() {
    let (zstack, mock) = initialised().await;
    announce(&mock, 0x2001, 0x80).await;
    zstack.read_event(deadline_in(500)).await.unwrap();

    leave(&mock, 0x2001).await;

    match zstack.read_event(deadline_in(500)).await.unwrap() {
        ZStackEvent::NodeLeave(node) => assert_eq!(node.ieee_address, NODE),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(zstack.node_table().is_empty());

    // A second leave for the same node is not reported again.
    leave(&mock, 0x2001).await;
    assert!(zstack.read_event(deadline_in(200)).await.is_err());
}

#[tokio::test]
async fn test_unsolicited_network_address_refreshes_table() {
    let (zstack, mock) = initialised().await;

    let mut payload = vec![0x00];
    payload.extend_from_slice(&NODE.0.to_le_bytes());
    payload.extend_from_slice(&0x4444u16.to_le_bytes());
    payload.extend_from_slice(&[0x00, 0x00]);
    mock.inject(areq(Subsystem::Zdo, 0x80, payload)).await;

    // Table updates are silent; wait for the deadline to let the loop run.
    assert!(zstack.read_event(deadline_in(200)).await.is_err());
    assert_eq!(
        zstack.node_table().get(NODE).map(|node| node.network_address),
        Some(NetworkAddress(0x4444))
    );
}

#[tokio::test]
async fn test_malformed_indication_does_not_stop_loops() {
    let (zstack, mock) = initialised().await;

    mock.inject(areq(Subsystem::Zdo, 0xC1, vec![0x01])).await;
    announce(&mock, 0x2001, 0x80).await;

    assert!(matches!(
        zstack.read_event(deadline_in(500)).await.unwrap(),
        ZStackEvent::NodeJoin(_)
    ));
}
