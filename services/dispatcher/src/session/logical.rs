use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use dispatch_bus::{drain, keys, mark_completed, mark_failed, mark_started, pop_next, Bus, FleetRegistry};
use dispatch_protocol::{Envelope, LogicalAck};

use crate::config::IDLE_POLL_INTERVAL;
use crate::error::SessionError;
use crate::status;
use crate::wire::{read_frame, write_frame};

/// Runs the logical protocol loop of §4.3 for one session: Idle, dispatch
/// the next round-robin envelope, await its ack, repeat, until teardown.
///
/// `sub_ids[i]` is the bus id `<device_id>_<i+1>` (or just `device_id` for a
/// single-node device) that round-robin slot `i` reads from.
pub async fn run<B: Bus>(
    mut stream: TcpStream,
    device_id: &str,
    sub_ids: &[String],
    registry: &FleetRegistry<B>,
    bus: &B,
) {
    let mut rr_counter: usize = 0;
    let outcome = drive(&mut stream, device_id, sub_ids, bus, &mut rr_counter).await;
    if let Err(error) = &outcome {
        warn!(%device_id, %error, "logical session ended with an error");
    } else {
        info!(%device_id, "logical session disconnected");
    }
    teardown(device_id, sub_ids, registry, bus).await;
}

async fn drive<B: Bus>(
    stream: &mut TcpStream,
    device_id: &str,
    sub_ids: &[String],
    bus: &B,
    rr_counter: &mut usize,
) -> Result<(), SessionError> {
    loop {
        if !status::is_running(bus).await {
            debug!("server status is stopped, tearing down session");
            return Ok(());
        }
        if take_disconnect_flag(bus, device_id, sub_ids).await {
            debug!("disconnect flag observed, tearing down session");
            return Ok(());
        }

        let Some((index, raw_envelope)) = next_envelope(bus, sub_ids, rr_counter).await? else {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            continue;
        };

        dispatch_one(stream, bus, index, &raw_envelope).await?;
    }
}

/// Selects the next round-robin slot and pops one envelope from it,
/// advancing the counter regardless of whether that slot had anything
/// queued (§4.3: "empty pops advance the counter regardless").
async fn next_envelope<B: Bus>(
    bus: &B,
    sub_ids: &[String],
    rr_counter: &mut usize,
) -> Result<Option<(usize, String)>, SessionError> {
    let n = sub_ids.len();
    let index = *rr_counter % n;
    *rr_counter = rr_counter.wrapping_add(1);
    match pop_next(bus, &sub_ids[index]).await? {
        Some(raw) => Ok(Some((index, raw))),
        None => Ok(None),
    }
}

async fn dispatch_one<B: Bus>(
    stream: &mut TcpStream,
    bus: &B,
    index: usize,
    raw_envelope: &str,
) -> Result<(), SessionError> {
    let envelope = Envelope::parse(raw_envelope)?;
    let node_id = envelope.node_id().map(str::to_owned);

    if let Some(node_id) = &node_id {
        mark_started(bus, node_id).await?;
    }

    let bytes = envelope.into_wire_bytes(index)?;
    write_frame(stream, &bytes).await?;
    debug!(index, "dispatched envelope, awaiting ack");

    let ack_result = await_ack(stream).await;
    if let Some(node_id) = &node_id {
        match &ack_result {
            Ok(ack) if ack.status.is_success() => mark_completed(bus, node_id).await?,
            Ok(_) => mark_failed(bus, node_id).await?,
            Err(_) => mark_failed(bus, node_id).await?,
        }
    }
    ack_result.map(drop)
}

async fn await_ack(stream: &mut TcpStream) -> Result<LogicalAck, SessionError> {
    let frame = read_frame(stream).await?;
    Ok(serde_json::from_slice::<LogicalAck>(&frame).map_err(dispatch_protocol::ProtocolError::from)?)
}

/// Checks and consumes `<device_id>:disconnect` — the parent id §4.3 Idle
/// names literally — as well as `<sub_id>:disconnect` for every sub-device.
/// For a single-node device `sub_ids == [device_id]`, so the parent check is
/// just a harmless repeat; for a multi-node device it's the only way an
/// operator flag set on the parent id (the id the registry mirror doesn't
/// even expose per-sub-device separately for this purpose) is ever
/// observed. Any id carrying the flag tears the whole session down, since
/// sub-devices of a multi-node registration share lifecycle (§3).
async fn take_disconnect_flag<B: Bus>(bus: &B, device_id: &str, sub_ids: &[String]) -> bool {
    let mut disconnected = false;
    let ids = std::iter::once(device_id).chain(sub_ids.iter().map(String::as_str));
    for id in ids {
        let key = keys::disconnect_key(id);
        match bus.get(&key).await {
            Ok(Some(value)) if value == "true" => {
                disconnected = true;
                let _ = bus.del(&key).await;
            }
            _ => {}
        }
    }
    disconnected
}

/// Terminating state of §4.3/§4.6: flush every sub-device's queue to
/// `failed`, remove the registry entries, then delete the per-device bus
/// keys. Order matches §4.6: queues/status/config first, registry mirror
/// second.
async fn teardown<B: Bus>(device_id: &str, sub_ids: &[String], registry: &FleetRegistry<B>, bus: &B) {
    for id in sub_ids {
        match drain(bus, id).await {
            Ok(envelopes) => {
                for raw in envelopes {
                    if let Ok(envelope) = Envelope::parse(&raw) {
                        if let Some(node_id) = envelope.node_id() {
                            if let Err(error) = mark_failed(bus, node_id).await {
                                warn!(%node_id, %error, "failed to mark flushed node as failed");
                            }
                        }
                    }
                }
            }
            Err(error) => warn!(%device_id, %error, "failed to drain queue during teardown"),
        }
        let _ = bus.del(&keys::status_key(id)).await;
        let _ = bus.del(&keys::current_config_key(id)).await;
    }

    if let Err(error) = registry.remove_logical(sub_ids).await {
        warn!(%device_id, %error, "failed to remove logical registry entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_bus::push_command;
    use dispatch_test_support::FakeBus;

    fn envelope_json(node_id: &str) -> String {
        serde_json::json!({"command": "start", "node_id": node_id}).to_string()
    }

    /// Spec §8 scenario 2: two envelopes queued on sub-device 1 (`a`, `b`),
    /// one on sub-device 2 (`c`), none on sub-device 3. Round-robin must
    /// dispatch `_1:a, _2:c, _3(miss), _1:b` — the empty pop on `_3` still
    /// advances the counter instead of re-trying the same slot.
    #[tokio::test]
    async fn round_robin_skips_empty_slot_and_advances_regardless() {
        let bus = FakeBus::new();
        let sub_ids = vec!["d_1".to_owned(), "d_2".to_owned(), "d_3".to_owned()];

        push_command(&bus, "d_1", &envelope_json("a")).await.unwrap();
        push_command(&bus, "d_1", &envelope_json("b")).await.unwrap();
        push_command(&bus, "d_2", &envelope_json("c")).await.unwrap();

        let mut rr_counter = 0usize;
        let mut dispatched = Vec::new();
        for _ in 0..4 {
            if let Some((index, raw)) = next_envelope(&bus, &sub_ids, &mut rr_counter).await.unwrap() {
                let envelope = Envelope::parse(&raw).unwrap();
                dispatched.push((index, envelope.node_id().unwrap().to_owned()));
            }
        }

        assert_eq!(
            dispatched,
            vec![(0, "a".to_owned()), (1, "c".to_owned()), (0, "b".to_owned())]
        );
        assert_eq!(rr_counter, 4);
    }

    #[tokio::test]
    async fn single_node_always_dispatches_from_index_zero() {
        let bus = FakeBus::new();
        let sub_ids = vec!["solo".to_owned()];
        push_command(&bus, "solo", &envelope_json("n1")).await.unwrap();

        let mut rr_counter = 0usize;
        let (index, raw) = next_envelope(&bus, &sub_ids, &mut rr_counter)
            .await
            .unwrap()
            .expect("one envelope queued");
        assert_eq!(index, 0);
        assert_eq!(Envelope::parse(&raw).unwrap().node_id(), Some("n1"));
    }
}
