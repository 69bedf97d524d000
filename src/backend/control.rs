//! JSON-lines TCP surface for transport triggers from outside the terminal,
//! such as media keys bound to `playdeck --remote`.

use crate::protocol::{self, BackendEvent, Envelope, TransportCommand};
use anyhow::Context;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const ACCEPT_INTERVAL: Duration = Duration::from_millis(12);

/// One line on the control socket.
pub type ControlMessage = Envelope<TransportCommand>;

pub struct ControlListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
}

impl ControlListener {
    pub fn bind(addr: &str, events: Sender<Envelope<BackendEvent>>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .with_context(|| format!("failed to bind control listener at {addr}"))?;
        listener
            .set_nonblocking(true)
            .context("failed to set nonblocking listener")?;
        let local_addr = listener
            .local_addr()
            .context("failed to read control listener address")?;

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        thread::spawn(move || accept_loop(listener, flag, events));

        info!(%local_addr, "control listener bound");
        Ok(Self {
            local_addr,
            running,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(listener: TcpListener, running: Arc<AtomicBool>, events: Sender<Envelope<BackendEvent>>) {
    while running.load(Ordering::Relaxed) {
        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "control connection");
                    let events = events.clone();
                    thread::spawn(move || connection_reader(stream, events));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!(error = %err, "control accept failed");
                    break;
                }
            }
        }
        thread::sleep(ACCEPT_INTERVAL);
    }
    debug!("control listener stopped");
}

fn connection_reader(stream: TcpStream, events: Sender<Envelope<BackendEvent>>) {
    // Accepted sockets inherit nonblocking mode on some platforms.
    if let Err(err) = stream.set_nonblocking(false) {
        warn!(error = %err, "control connection setup failed");
        return;
    }

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) if line.trim().is_empty() => {}
            Ok(_) => match protocol::decode::<TransportCommand>(&line) {
                Ok(command) => {
                    info!(?command, "control command");
                    let event = Envelope::new(BackendEvent::Transport(command));
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "dropping control message"),
            },
            Err(err) => {
                warn!(error = %err, "control read failed");
                break;
            }
        }
    }
}

/// Sends one command to a running player.
pub fn send_control(addr: &str, command: TransportCommand) -> anyhow::Result<()> {
    let mut stream =
        TcpStream::connect(addr).with_context(|| format!("failed to connect to {addr}"))?;
    send_json_line(&mut stream, &Envelope::new(command))
        .with_context(|| format!("failed to send {command:?} to {addr}"))
}

fn send_json_line(stream: &mut TcpStream, message: &ControlMessage) -> anyhow::Result<()> {
    let mut bytes = protocol::encode(message).context("serialize failed")?.into_bytes();
    bytes.push(b'\n');
    stream.write_all(&bytes).context("write failed")?;
    stream.flush().context("flush failed")?;
    Ok(())
}
