//! Per-client order-book stream.
use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use crossbeam_channel::{Receiver, select};
use log::{debug, error};
use spread_common::SpreadError;
use spread_common::book::OrderBookEvent;
use spread_common::instrument::InstrumentId;

/// Instruments one client subscribed to, with the depth it asked for.
pub type Subscriptions = HashMap<InstrumentId, usize>;

/// Cuts `event` down to `depth` levels per side.
pub fn truncate_depth(event: &OrderBookEvent, depth: usize) -> OrderBookEvent {
    OrderBookEvent {
        figi: event.figi.clone(),
        depth: depth as u32,
        bids: event.bids.iter().take(depth).copied().collect(),
        asks: event.asks.iter().take(depth).copied().collect(),
        time_ms: event.time_ms,
    }
}

/// Stream task for a single client.
///
/// Listens for order books on `data_rx`, keeps the ones the client
/// subscribed to, trims them to the requested depth and sends them as
/// bincode frames to `target_addr`. Ends when `stop_rx` fires, the generator
/// goes away, or a send fails.
pub fn handle_client_stream(
    socket: Arc<UdpSocket>,
    target_addr: SocketAddr,
    subscriptions: Subscriptions,
    data_rx: Receiver<OrderBookEvent>,
    stop_rx: Receiver<()>,
) -> Result<(), SpreadError> {
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(data_rx) -> msg => match msg {
                Ok(event) => {
                    let Some(&depth) = subscriptions.get(&event.figi) else {
                        continue;
                    };
                    let frame = truncate_depth(&event, depth).to_frame()?;
                    if let Err(e) = socket.send_to(&frame, target_addr) {
                        error!("Failed to send UDP frame to {}: {}", target_addr, e);
                        return Err(SpreadError::Io(e));
                    }
                }
                Err(e) => {
                    return Err(SpreadError::ChannelRecv(e.to_string()));
                }
            }
        }
    }
    debug!("Stream for {} finished", target_addr);
    Ok(())
}
