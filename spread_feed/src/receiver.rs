use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use spread_common::command::Command;
use spread_common::instrument::Instrument;
use spread_common::SpreadError;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

/// Upper bound on a single command document.
const MAX_COMMAND: u64 = 64 * 1024;

/// What one command connection asked for.
#[derive(Debug)]
pub enum Request {
    /// Catalog request; answered on the same connection.
    Futures,
    /// Subscription to stream to the given UDP address.
    Subscribe(Command, SocketAddr),
}

/// TCP command receiver for catalog requests and order-book subscriptions.
///
/// Each connection carries one JSON `Command`. Catalog requests are answered
/// in place with the JSON catalog; subscriptions are forwarded, together
/// with the client's UDP `SocketAddr`, into the channel given to
/// [`Self::receive_loop_with_channel`]. A malformed command only fails its
/// own connection.
pub struct CommandReceiver {
    socket: TcpListener,
    catalog: Vec<Instrument>,
}

impl CommandReceiver {
    /// Bind a new TCP receiver to `bind_addr` (e.g., `0.0.0.0:8080`).
    pub fn new(bind_addr: &str, catalog: Vec<Instrument>) -> Result<Self, SpreadError> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket, catalog })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, SpreadError> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking accept loop. Returns only if the listener itself fails.
    pub fn receive_loop_with_channel(
        self,
        tx: Sender<(Command, SocketAddr)>,
    ) -> Result<(), SpreadError> {
        info!(
            "Command TCP server is started on {}",
            self.socket.local_addr()?
        );

        for stream in self.socket.incoming() {
            match stream {
                Ok(mut stream) => match self.handle_connection(&mut stream) {
                    Ok(Request::Subscribe(cmd, target)) => {
                        tx.send((cmd, target))
                            .map_err(|e| SpreadError::ChannelSend(e.to_string()))?;
                    }
                    Ok(Request::Futures) => {}
                    Err(e) => warn!("Rejected command connection: {}", e),
                },
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }

    fn handle_connection(&self, stream: &mut TcpStream) -> Result<Request, SpreadError> {
        let client_tcp_addr = stream.peer_addr()?;
        debug!("client_tcp_addr: {:?}", &client_tcp_addr);

        let mut buf = Vec::new();
        std::io::Read::by_ref(stream).take(MAX_COMMAND).read_to_end(&mut buf)?;
        let cmd: Command = serde_json::from_slice(&buf)?;
        info!("Received {} command from {}", cmd.header, client_tcp_addr);

        if cmd.is_futures() {
            let reply = serde_json::to_vec(&self.catalog)?;
            stream.write_all(&reply)?;
            return Ok(Request::Futures);
        }
        if !cmd.is_subscribe() {
            return Err(SpreadError::Format(format!(
                "unsupported command header {}",
                cmd.header
            )));
        }

        let port: u16 = cmd
            .port
            .parse()
            .map_err(|e| SpreadError::Format(format!("Invalid UDP port in command: {}", e)))?;
        let target_udp_addr = SocketAddr::new(client_tcp_addr.ip(), port);
        Ok(Request::Subscribe(cmd, target_udp_addr))
    }
}
