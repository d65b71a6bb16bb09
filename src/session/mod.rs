//! Concurrent ingestion pipeline for one gateway connection.
//!
//! # Data Flow
//! ```text
//! WebSocket read half
//!     → reader task → inbound queue
//!     → process workers (parse, classify)
//!         → API responses: correlation table
//!         → events: router → handler pool
//! handlers → ApiHandle → outbound queue
//!     → writer workers → WebSocket write half (serialized)
//! ```
//!
//! # Design Decisions
//! - Fixed worker pools; frames are dequeued in arrival order from one
//!   shared channel, completion order across workers is unspecified
//! - The sink mutex enforces the single-active-writer discipline no matter
//!   how many writer workers are configured
//! - A read error or clean close ends only the read side; dropping the
//!   inbound sender lets process workers drain what is queued and exit
//! - Shutdown is cooperative: trigger, broadcast wake, join every worker

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::api::{ApiHandle, CorrelationTable};
use crate::config::GatewayConfig;
use crate::event::{Event, EventKind};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::Router;
use crate::tasks::HandlerPool;

type SharedReceiver = Arc<Mutex<mpsc::UnboundedReceiver<String>>>;

/// A running pipeline over one accepted gateway connection.
pub struct Session {
    shutdown: Shutdown,
    reader: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    api: ApiHandle,
}

impl Session {
    /// Spawn the reader, process workers and writer workers over `ws`.
    ///
    /// The router must be fully built before the session starts; its tables
    /// are shared read-only across all workers.
    pub fn start<S>(ws: WebSocketStream<S>, router: Arc<Router>, config: &GatewayConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let table = Arc::new(CorrelationTable::new());
        let api = ApiHandle::new(outbound_tx, table.clone(), config.api.call_timeout());
        let pool = HandlerPool::new(config.pipeline.handler_pool);

        let (sink, stream) = ws.split();
        let sink = Arc::new(Mutex::new(sink));
        let shutdown = Shutdown::new();

        let reader = tokio::spawn(read_loop(stream, inbound_tx, shutdown.subscribe()));

        let mut workers = Vec::new();
        let inbound_rx: SharedReceiver = Arc::new(Mutex::new(inbound_rx));
        for _ in 0..config.pipeline.process_workers.max(1) {
            workers.push(tokio::spawn(process_loop(
                inbound_rx.clone(),
                router.clone(),
                api.clone(),
                pool.clone(),
                table.clone(),
                shutdown.subscribe(),
            )));
        }

        let outbound_rx: SharedReceiver = Arc::new(Mutex::new(outbound_rx));
        for _ in 0..config.pipeline.writer_workers.max(1) {
            workers.push(tokio::spawn(write_loop(
                outbound_rx.clone(),
                sink.clone(),
                shutdown.subscribe(),
            )));
        }

        Self {
            shutdown,
            reader: Some(reader),
            workers,
            api,
        }
    }

    /// Handle to the outbound API surface for this session.
    pub fn api(&self) -> ApiHandle {
        self.api.clone()
    }

    /// Resolve once the read side of the connection has ended (clean close
    /// or read error). Queued work keeps draining until shutdown.
    pub async fn closed(&mut self) {
        if let Some(reader) = self.reader.as_mut() {
            let _ = reader.await;
            self.reader = None;
        }
    }

    /// Trigger cooperative shutdown and join every worker task. Teardown is
    /// complete when this returns.
    pub async fn shutdown(mut self) {
        self.shutdown.trigger();
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
        tracing::info!("session teardown complete");
    }
}

/// Owns the read half: every complete text frame goes onto the inbound
/// queue. A clean close is not a failure; a read error ends the session's
/// read side only.
async fn read_loop<S>(
    mut stream: SplitStream<WebSocketStream<S>>,
    inbound: mpsc::UnboundedSender<String>,
    mut stop: tokio::sync::broadcast::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = stop.recv() => break,
            next = stream.next() => match next {
                Some(Ok(Message::Text(text))) => {
                    metrics::record_frame_in();
                    if inbound.send(text.to_string()).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("gateway closed the connection");
                    break;
                }
                Some(Ok(_)) => {} // binary and control frames carry no documents
                Some(Err(error)) => {
                    tracing::error!(%error, "transport read failed");
                    break;
                }
            },
        }
    }
}

/// Process worker: parse one frame, then either complete a pending API
/// request or hand the event to the router. Parse failures drop the frame.
async fn process_loop(
    inbound: SharedReceiver,
    router: Arc<Router>,
    api: ApiHandle,
    pool: HandlerPool,
    table: Arc<CorrelationTable>,
    mut stop: tokio::sync::broadcast::Receiver<()>,
) {
    loop {
        let frame = {
            let mut rx = inbound.lock().await;
            tokio::select! {
                frame = rx.recv() => frame,
                _ = stop.recv() => None,
            }
        };
        let Some(frame) = frame else { break };

        let event = match Event::parse(&frame) {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(%error, frame = %frame, "dropping malformed frame");
                metrics::record_frame_dropped();
                continue;
            }
        };
        match event.kind() {
            EventKind::ApiResponse => match (event.echo(), event.api_response()) {
                (Some(echo), Some(response)) => {
                    table.complete(echo, response);
                }
                _ => tracing::debug!("response frame without usable echo id ignored"),
            },
            _ => router.dispatch(event, &api, &pool),
        }
    }
}

/// Writer worker: drain the outbound queue into the sink. The sink lock
/// serializes writes regardless of pool size. Write errors are logged and
/// do not stop the worker.
async fn write_loop<S>(
    outbound: SharedReceiver,
    sink: Arc<Mutex<SplitSink<WebSocketStream<S>, Message>>>,
    mut stop: tokio::sync::broadcast::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let payload = {
            let mut rx = outbound.lock().await;
            tokio::select! {
                payload = rx.recv() => payload,
                _ = stop.recv() => None,
            }
        };
        let Some(payload) = payload else { break };

        let mut sink = sink.lock().await;
        match sink.send(Message::Text(payload.into())).await {
            Ok(()) => metrics::record_frame_out(),
            Err(error) => tracing::error!(%error, "transport write failed"),
        }
    }
}
