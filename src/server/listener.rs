//! TCP listener and per-connection loop

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use super::commands::{execute, Command, Context};
use super::config::ServerConfig;
use super::errors::{ProtocolError, ProtocolResult};
use super::resp::{parse_request, Reply};
use crate::observability::{log_event, log_event_with_fields, Event};

/// Stops a running [`Server`]. Cloneable; any clone may trigger it.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

/// Request server bound to a socket
pub struct Server {
    listener: TcpListener,
    context: Arc<Context>,
    slots: Arc<Semaphore>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Binds the listen address; serving starts with [`Server::run`].
    pub async fn bind(config: &ServerConfig, context: Context) -> ProtocolResult<Self> {
        if config.listen_addr.trim().is_empty() {
            return Err(ProtocolError::InvalidAddress(config.listen_addr.clone()));
        }
        let listener = TcpListener::bind(config.listen_addr.as_str()).await?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            listener,
            context: Arc::new(context),
            slots: Arc::new(Semaphore::new(config.max_connections.max(1))),
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    pub fn local_addr(&self) -> ProtocolResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown_tx))
    }

    /// Serves until Ctrl-C.
    pub async fn run_until_ctrl_c(self) -> ProtocolResult<()> {
        let handle = self.shutdown_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.shutdown();
            }
        });
        self.run().await
    }

    /// Serves until shutdown is triggered.
    ///
    /// On shutdown the listener is dropped, each connection finishes the
    /// request it is running and exits, and once all have exited the store
    /// is closed.
    pub async fn run(self) -> ProtocolResult<()> {
        let addr = self.local_addr()?.to_string();
        log_event_with_fields(Event::Serving, &[("addr", &addr)]);

        let mut stop = self.shutdown_tx.subscribe();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = async { stop.wait_for(|stopped| *stopped).await.map(drop) } => break,

                Some(_) = connections.join_next(), if !connections.is_empty() => {}

                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            let error = e.to_string();
                            log_event_with_fields(Event::ConnectionFailed, &[("error", &error)]);
                            continue;
                        }
                    };

                    let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
                        refuse(stream, peer).await;
                        continue;
                    };

                    let context = Arc::clone(&self.context);
                    let stop = self.shutdown_tx.subscribe();
                    connections.spawn(async move {
                        let _permit = permit;
                        handle_connection(stream, peer, context, stop).await;
                    });
                }
            }
        }

        log_event(Event::ShutdownStart);
        drop(self.listener);
        while connections.join_next().await.is_some() {}

        let store = Arc::clone(&self.context.store);
        let closed = tokio::task::spawn_blocking(move || store.close())
            .await
            .map_err(|e| ProtocolError::TaskFailed(e.to_string()))?;
        match closed {
            Ok(()) => log_event(Event::StoreClosed),
            Err(e) => {
                let error = e.to_string();
                log_event_with_fields(Event::StoreWriteFailed, &[("error", &error)]);
            }
        }

        log_event(Event::ShutdownComplete);
        Ok(())
    }
}

async fn refuse(mut stream: TcpStream, peer: SocketAddr) {
    let peer = peer.to_string();
    log_event_with_fields(
        Event::CommandRejected,
        &[("peer", &peer), ("reason", "max number of clients reached")],
    );
    let reply = Reply::err("max number of clients reached").encode();
    let _ = stream.write_all(&reply).await;
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: Arc<Context>,
    stop: watch::Receiver<bool>,
) {
    let peer = peer.to_string();
    log_event_with_fields(Event::ConnectionAccepted, &[("peer", &peer)]);

    match serve(stream, &context, stop).await {
        Ok(()) => log_event_with_fields(Event::ConnectionClosed, &[("peer", &peer)]),
        Err(e) => {
            let error = e.to_string();
            log_event_with_fields(Event::ConnectionFailed, &[("peer", &peer), ("error", &error)]);
        }
    }
}

/// Reads, runs and answers requests until the client leaves, sends QUIT,
/// or the server stops. Pipelined requests are answered in order with one
/// write per read.
async fn serve(
    mut stream: TcpStream,
    context: &Arc<Context>,
    mut stop: watch::Receiver<bool>,
) -> ProtocolResult<()> {
    let mut inbound: Vec<u8> = Vec::with_capacity(4096);
    let mut outbound: Vec<u8> = Vec::with_capacity(4096);

    loop {
        let mut quit = false;
        while !quit {
            let (request, consumed) = match parse_request(&inbound) {
                Ok(Some(parsed)) => parsed,
                Ok(None) => break,
                Err(e) => {
                    if e.is_client_fault() {
                        Reply::err(e.to_string()).encode_into(&mut outbound);
                        stream.write_all(&outbound).await?;
                    }
                    return Err(e);
                }
            };
            inbound.drain(..consumed);
            if request.is_empty() {
                continue;
            }

            let reply = match Command::parse(&request) {
                Ok(Command::Quit) => {
                    quit = true;
                    Reply::ok()
                }
                Ok(command) => dispatch(context, command).await?,
                Err(reply) => reply,
            };
            reply.encode_into(&mut outbound);
        }

        if !outbound.is_empty() {
            stream.write_all(&outbound).await?;
            outbound.clear();
        }
        if quit {
            return Ok(());
        }

        tokio::select! {
            read = stream.read_buf(&mut inbound) => {
                if read? == 0 {
                    return Ok(());
                }
            }
            _ = stop.wait_for(|stopped| *stopped) => return Ok(()),
        }
    }
}

/// Store commands run on the blocking pool; the rest run inline.
async fn dispatch(context: &Arc<Context>, command: Command) -> ProtocolResult<Reply> {
    if !command.touches_store() {
        return Ok(execute(context, &command));
    }
    let context = Arc::clone(context);
    tokio::task::spawn_blocking(move || execute(&context, &command))
        .await
        .map_err(|e| ProtocolError::TaskFailed(e.to_string()))
}
