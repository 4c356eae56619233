//! Scripted adapter used by the integration tests.
//!
//! The mock records every frame the driver writes and answers frames whose
//! identity has a handler. Handlers return the frames to send back, in order.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use zstack::{channel_transport, ZStack, ZStackConfig};
use zstack_protocol::{ExtendedPanId, NetworkKey, PanId};
use zstack_unpi::{Frame, MessageType, Subsystem};

pub use zstack::NetworkConfiguration;

type Key = (MessageType, Subsystem, u8);
type Handler = Box<dyn Fn(&Frame) -> Vec<Frame> + Send + Sync>;

pub const ADAPTER_IEEE: u64 = 0x00124b0001020304;

pub fn srsp(subsystem: Subsystem, command_id: u8, payload: Vec<u8>) -> Frame {
    Frame::new(MessageType::Srsp, subsystem, command_id, payload)
}

pub fn areq(subsystem: Subsystem, command_id: u8, payload: Vec<u8>) -> Frame {
    Frame::new(MessageType::Areq, subsystem, command_id, payload)
}

pub fn deadline_in(millis: u64) -> Instant {
    Instant::now() + Duration::from_millis(millis)
}

pub fn network_configuration() -> NetworkConfiguration {
    NetworkConfiguration {
        pan_id: PanId(0x1a62),
        extended_pan_id: ExtendedPanId(0xdddd_dddd_dddd_dddd),
        network_key: NetworkKey([
            0x01, 0x03, 0x05, 0x07, 0x09, 0x0b, 0x0d, 0x0f, 0x00, 0x02, 0x04, 0x06, 0x08, 0x0a,
            0x0c, 0x0d,
        ]),
        channel: 15,
    }
}

#[derive(Clone)]
pub struct MockAdapter {
    to_host: mpsc::Sender<Frame>,
    handlers: Arc<Mutex<HashMap<Key, Handler>>>,
    captured: Arc<Mutex<Vec<Frame>>>,
    nv: Arc<Mutex<HashMap<u16, Vec<u8>>>>,
}

impl MockAdapter {
    /// Create a driver attached to a new mock adapter.
    pub fn start(config: ZStackConfig) -> (ZStack, MockAdapter) {
        let (transport, adapter_end) = channel_transport(64);
        let mock = MockAdapter {
            to_host: adapter_end.to_host,
            handlers: Arc::new(Mutex::new(HashMap::new())),
            captured: Arc::new(Mutex::new(Vec::new())),
            nv: Arc::new(Mutex::new(HashMap::new())),
        };

        let runner = mock.clone();
        let mut from_host = adapter_end.from_host;
        tokio::spawn(async move {
            while let Some(frame) = from_host.recv().await {
                runner.captured.lock().push(frame.clone());
                let key = (frame.message_type, frame.subsystem, frame.command_id);
                let responses = match runner.handlers.lock().get(&key) {
                    Some(handler) => handler(&frame),
                    None => Vec::new(),
                };
                for response in responses {
                    if runner.to_host.send(response).await.is_err() {
                        return;
                    }
                }
            }
        });

        let zstack = ZStack::new(transport, config).expect("valid configuration");
        (zstack, mock)
    }

    /// Answer every frame of the given identity.
    pub fn on<F>(&self, message_type: MessageType, subsystem: Subsystem, command_id: u8, handler: F)
    where
        F: Fn(&Frame) -> Vec<Frame> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .insert((message_type, subsystem, command_id), Box::new(handler));
    }

    /// Answer every frame of the given identity with fixed frames.
    pub fn on_reply(
        &self,
        message_type: MessageType,
        subsystem: Subsystem,
        command_id: u8,
        responses: Vec<Frame>,
    ) {
        self.on(message_type, subsystem, command_id, move |_| responses.clone());
    }

    pub async fn inject(&self, frame: Frame) {
        self.to_host.send(frame).await.expect("driver listening");
    }

    pub fn captured(&self) -> Vec<Frame> {
        self.captured.lock().clone()
    }

    pub fn calls(&self, message_type: MessageType, subsystem: Subsystem, command_id: u8) -> Vec<Frame> {
        self.captured
            .lock()
            .iter()
            .filter(|f| {
                f.message_type == message_type
                    && f.subsystem == subsystem
                    && f.command_id == command_id
            })
            .cloned()
            .collect()
    }

    /// Item ids of every NV write, in order.
    pub fn nv_writes(&self) -> Vec<u16> {
        self.calls(MessageType::Sreq, Subsystem::Sys, 0x09)
            .iter()
            .map(|f| u16::from_le_bytes([f.payload[0], f.payload[1]]))
            .collect()
    }

    pub fn nv_value(&self, item_id: u16) -> Option<Vec<u8>> {
        self.nv.lock().get(&item_id).cloned()
    }

    pub fn set_nv(&self, item_id: u16, value: Vec<u8>) {
        self.nv.lock().insert(item_id, value);
    }

    /// Behave like a coordinator-capable adapter with NV memory.
    ///
    /// `product_id` zero selects pre-3.x firmware. `final_state` is reported
    /// after the stack is started.
    pub fn script_coordinator(&self, product_id: u8, final_state: u8) {
        self.on_reply(
            MessageType::Areq,
            Subsystem::Sys,
            0x00,
            vec![areq(
                Subsystem::Sys,
                0x80,
                vec![0x00, 0x02, product_id, 0x02, 0x07, 0x01],
            )],
        );

        let nv = Arc::clone(&self.nv);
        self.on(MessageType::Sreq, Subsystem::Sys, 0x08, move |frame| {
            let item_id = u16::from_le_bytes([frame.payload[0], frame.payload[1]]);
            let payload = match nv.lock().get(&item_id) {
                Some(value) => {
                    let mut payload = vec![0x00, value.len() as u8];
                    payload.extend_from_slice(value);
                    payload
                }
                None => vec![0x09, 0x00],
            };
            vec![srsp(Subsystem::Sys, 0x08, payload)]
        });

        let nv = Arc::clone(&self.nv);
        self.on(MessageType::Sreq, Subsystem::Sys, 0x09, move |frame| {
            let item_id = u16::from_le_bytes([frame.payload[0], frame.payload[1]]);
            let len = frame.payload[3] as usize;
            nv.lock()
                .insert(item_id, frame.payload[4..4 + len].to_vec());
            vec![srsp(Subsystem::Sys, 0x09, vec![0x00])]
        });

        self.on_reply(
            MessageType::Sreq,
            Subsystem::Sapi,
            0x00,
            vec![
                srsp(Subsystem::Sapi, 0x00, vec![]),
                areq(Subsystem::Zdo, 0xC0, vec![0x08]),
                areq(Subsystem::Zdo, 0xC0, vec![final_state]),
            ],
        );

        self.on_reply(
            MessageType::Sreq,
            Subsystem::Sys,
            0x04,
            vec![srsp(Subsystem::Sys, 0x04, ADAPTER_IEEE.to_le_bytes().to_vec())],
        );

        let mut device_info = vec![0x00];
        device_info.extend_from_slice(&ADAPTER_IEEE.to_le_bytes());
        device_info.extend_from_slice(&[0x00, 0x00, 0x07, 0x09, 0x00]);
        self.on_reply(
            MessageType::Sreq,
            Subsystem::Util,
            0x00,
            vec![srsp(Subsystem::Util, 0x00, device_info)],
        );

        self.on_reply(
            MessageType::Sreq,
            Subsystem::Zdo,
            0x36,
            vec![srsp(Subsystem::Zdo, 0x36, vec![0x00])],
        );
    }

    /// Preload NV memory with the items `network` would be verified against.
    pub fn store_network(&self, network: &NetworkConfiguration) {
        self.set_nv(0x0087, vec![0x00]);
        self.set_nv(0x0083, network.pan_id.0.to_le_bytes().to_vec());
        self.set_nv(0x002D, network.extended_pan_id.0.to_le_bytes().to_vec());
        self.set_nv(0x0084, (1u32 << network.channel).to_le_bytes().to_vec());
    }

    /// Answer network address requests for `ieee` with `network`.
    pub fn script_network_address(&self, ieee: u64, network: u16) {
        self.on(MessageType::Sreq, Subsystem::Zdo, 0x00, move |frame| {
            let requested = u64::from_le_bytes(frame.payload[0..8].try_into().unwrap());
            let mut payload = vec![0x00];
            payload.extend_from_slice(&requested.to_le_bytes());
            payload.extend_from_slice(&network.to_le_bytes());
            payload.extend_from_slice(&[0x00, 0x00]);

            let mut responses = vec![srsp(Subsystem::Zdo, 0x00, vec![0x00])];
            if requested == ieee {
                responses.push(areq(Subsystem::Zdo, 0x80, payload));
            }
            responses
        });
    }
}

/// A driver whose adapter has completed bootstrap with a matching stored
/// configuration.
pub async fn initialised() -> (ZStack, MockAdapter) {
    let (zstack, mock) = MockAdapter::start(ZStackConfig::default());
    let network = network_configuration();
    mock.script_coordinator(0x01, 0x09);
    mock.store_network(&network);

    zstack
        .initialise(deadline_in(2_000), network)
        .await
        .expect("bootstrap succeeds");
    (zstack, mock)
}
