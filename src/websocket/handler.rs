use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, info, warn};

use crate::models::*;
use crate::websocket::host_actor::{Inbound, Register, Unregister};

/// One participant connection. Frames are parsed here and forwarded to the
/// host; the host's replies come back as [`ChessWebSocketMessage`]s.
pub struct ChessWebSocket {
    pub id: ConnectionId,
    pub app_state: web::Data<AppState>,
}

impl ChessWebSocket {
    fn reply(ctx: &mut ws::WebsocketContext<Self>, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(text) => ctx.text(text),
            Err(e) => warn!("Error serializing reply: {}", e),
        }
    }

    fn reply_error(ctx: &mut ws::WebsocketContext<Self>, error: String) {
        Self::reply(ctx, &ServerMessage::Error { error });
    }
}

impl Actor for ChessWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("WebSocket connection started: {}", self.id);
        self.app_state.host.do_send(Register {
            connection: self.id,
            session: ctx.address().recipient(),
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        info!("WebSocket connection closed: {}", self.id);
        self.app_state.host.do_send(Unregister { connection: self.id });
        Running::Stop
    }
}

impl Handler<ChessWebSocketMessage> for ChessWebSocket {
    type Result = ();

    fn handle(&mut self, msg: ChessWebSocketMessage, ctx: &mut Self::Context) {
        debug!("Forwarding message to {}: {}", self.id, msg.0);
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChessWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => {
                debug!("Received from {}: {}", self.id, text);
                match serde_json::from_str::<ClientMessage>(text.as_ref()) {
                    Ok(message) => self.app_state.host.do_send(Inbound {
                        connection: self.id,
                        message,
                    }),
                    Err(e) => {
                        warn!("Error parsing client message from {}: {}", self.id, e);
                        Self::reply_error(ctx, format!("Invalid message format: {e}"));
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
                Self::reply_error(ctx, "Binary messages are not supported".to_string());
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection {} closed: {:?}", self.id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = app_state.allocate_connection_id();
    info!("New WebSocket connection request, assigned {}", id);

    let ws = ChessWebSocket {
        id,
        app_state: app_state.clone(),
    };
    ws::start(ws, &req, stream)
}
