//! WebSocket endpoint and per-connection session actor.
//!
//! Session lifecycle: the route handler registers the connection in the
//! registry, then upgrades it. The actor replays the backlog as
//! `[Recent] ` lines before forwarding any live broadcast, relays
//! authorized inbound messages into the store and registry, and
//! deregisters itself exactly once when the connection closes.

use crate::services::NotificationStore;
use crate::state::AppState;
use crate::websocket::{messages, ConnectionRegistry, Role, SubscriberId};
use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// `admin` grants the sender role; anything else is a receiver.
    pub client: Option<String>,
}

/// Line pushed to this session's WebSocket.
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct Outbound(String);

pub struct WsSession {
    role: Role,
    subscriber_id: SubscriberId,
    registry: ConnectionRegistry,
    store: NotificationStore,
    /// Live-broadcast channel handed out at registration; taken by the
    /// outbound pump when the actor starts.
    live_rx: Option<UnboundedReceiver<String>>,
    /// Per-session queue keeping inbound frames in arrival order.
    inbound_tx: Option<UnboundedSender<String>>,
    hb: Instant,
}

impl WsSession {
    fn new(
        role: Role,
        subscriber_id: SubscriberId,
        registry: ConnectionRegistry,
        store: NotificationStore,
        live_rx: UnboundedReceiver<String>,
    ) -> Self {
        Self {
            role,
            subscriber_id,
            registry,
            store,
            live_rx: Some(live_rx),
            inbound_tx: None,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!("WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Replay the backlog to this connection only, then forward live
    /// broadcast lines in order. Runs until the registry entry is removed
    /// (which drops the channel sender).
    fn start_outbound_pump(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(mut live_rx) = self.live_rx.take() else {
            return;
        };
        let addr = ctx.address();
        let store = self.store.clone();

        actix::spawn(async move {
            for entry in store.recent().await {
                addr.do_send(Outbound(messages::recent_frame(&entry)));
            }
            while let Some(line) = live_rx.recv().await {
                addr.do_send(Outbound(line));
            }
        });
    }

    /// Append-and-broadcast worker. A single task per session keeps a
    /// connection's messages strictly in arrival order; the store's own
    /// lock serializes appends across sessions.
    fn start_inbound_worker(&mut self, _ctx: &mut ws::WebsocketContext<Self>) {
        let (tx, mut rx) = unbounded_channel::<String>();
        self.inbound_tx = Some(tx);

        let store = self.store.clone();
        let registry = self.registry.clone();

        actix::spawn(async move {
            while let Some(body) = rx.recv().await {
                store.append(&body).await;
                registry
                    .broadcast(&messages::notification_frame(&body))
                    .await;
            }
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(subscriber = ?self.subscriber_id, role = ?self.role, "WebSocket session started");

        self.hb(ctx);
        self.start_outbound_pump(ctx);
        self.start_inbound_worker(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(subscriber = ?self.subscriber_id, "WebSocket session stopped");

        let registry = self.registry.clone();
        let subscriber_id = self.subscriber_id;
        actix::spawn(async move {
            registry.deregister(subscriber_id).await;
        });
    }
}

impl Handler<Outbound> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                if messages::is_authorized(self.role, &text) {
                    let body = messages::notification_body(&text);
                    if let Some(tx) = &self.inbound_tx {
                        if tx.send(body).is_err() {
                            ctx.stop();
                        }
                    }
                } else {
                    debug!(subscriber = ?self.subscriber_id, "rejected unauthorized message");
                    ctx.text(messages::REJECTION_TEXT);
                }
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                debug!(subscriber = ?self.subscriber_id, ?reason, "close frame received");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("continuation frames not supported, closing");
                ctx.stop();
            }
            Ok(ws::Message::Nop) => {}
            Err(e) => {
                error!(error = %e, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}

/// WebSocket endpoint.
///
/// Endpoint: GET /ws?client=admin|user (default `user`)
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let role = Role::from_client_param(query.client.as_deref());

    let (subscriber_id, live_rx) = state.registry.register(role).await;
    let session = WsSession::new(
        role,
        subscriber_id,
        state.registry.clone(),
        state.store.clone(),
        live_rx,
    );

    match ws::start(session, &req, stream) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            // Failed handshake never leaves a registry entry behind.
            state.registry.deregister(subscriber_id).await;
            Err(e)
        }
    }
}
