use crate::config::WebSocketConfig;
use crate::middleware::guards::User;
use crate::state::AppState;
use crate::websocket::{ConnectionRegistry, SubscriberId};
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

/// Event pushed by the registry, already serialized
struct Outbound(String);

// WebSocket Actor
struct WsSession {
    username: String,
    subscriber_id: SubscriberId,
    registry: ConnectionRegistry,
    outbound: Option<UnboundedReceiver<String>>,
    config: WebSocketConfig,
    hb: Instant,
}

impl WsSession {
    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = Duration::from_secs(self.config.client_timeout_secs);
        ctx.run_interval(
            Duration::from_secs(self.config.heartbeat_interval_secs),
            move |act, ctx| {
                if Instant::now().duration_since(act.hb) > timeout {
                    tracing::warn!(user = %act.username, "WebSocket heartbeat failed, disconnecting");
                    ctx.stop();
                    return;
                }
                ctx.ping(b"");
            },
        );
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user = %self.username, "WebSocket session started");
        self.hb(ctx);

        // Bridge the registry queue into the actor
        if let Some(rx) = self.outbound.take() {
            let stream = futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|msg| (Outbound(msg), rx))
            });
            ctx.add_stream(stream);
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user = %self.username, "WebSocket session stopped");

        // Cleanup: remove subscriber from registry
        let registry = self.registry.clone();
        let username = self.username.clone();
        let subscriber_id = self.subscriber_id;

        actix::spawn(async move {
            registry.remove_subscriber(&username, subscriber_id).await;
        });
    }
}

impl StreamHandler<Outbound> for WsSession {
    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }

    // The registry dropping our queue must not close the socket
    fn finished(&mut self, _ctx: &mut Self::Context) {}
}

// Handle WebSocket protocol messages
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
            Ok(ws::Message::Text(_)) | Ok(ws::Message::Binary(_)) => {
                // Push-only channel; writes go through the REST endpoints
                self.hb = Instant::now();
                tracing::debug!(user = %self.username, "ignoring inbound WebSocket frame");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("WebSocket close message received: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(user = %self.username, error = %e, "WebSocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// GET /ws
/// Realtime channel: `message.new` and `message.read` events for the caller
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, Error> {
    let (subscriber_id, rx) = state.registry.add_subscriber(&user.username).await;

    let session = WsSession {
        username: user.username.clone(),
        subscriber_id,
        registry: state.registry.clone(),
        outbound: Some(rx),
        config: state.config.websocket.clone(),
        hb: Instant::now(),
    };

    match ws::start(session, &req, stream) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            // Handshake rejected: the session never started
            state
                .registry
                .remove_subscriber(&user.username, subscriber_id)
                .await;
            Err(e)
        }
    }
}
