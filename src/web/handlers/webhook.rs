use salvo::prelude::*;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::bridge::EventAction;
use crate::discourse::{WebhookPost, WebhookTopic};
use crate::web::web_state;

fn render_error(res: &mut Response, status: StatusCode, message: &str) {
    res.status_code(status);
    res.render(Json(json!({ "status": "error", "message": message })));
}

fn header_value(req: &Request, name: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// `POST /discourse-webhook` — the inbound half of reverse sync. The
/// resource kind and event name travel in Discourse's custom headers; the
/// body is `{"post": {...}}` or `{"topic": {...}}`.
#[handler]
pub async fn discourse_webhook(req: &mut Request, res: &mut Response) {
    let event_type = header_value(req, "X-Discourse-Event-Type");
    let event_name = header_value(req, "X-Discourse-Event");

    let payload = match req.parse_json::<Value>().await {
        Ok(payload) => payload,
        Err(err) => {
            warn!("received unparseable webhook payload: {}", err);
            render_error(res, StatusCode::BAD_REQUEST, "invalid payload");
            return;
        }
    };

    info!("received webhook: {}/{}", event_type, event_name);
    debug!("webhook payload: {}", payload);

    let Some(action) = EventAction::from_event_name(&event_name) else {
        debug!("ignoring event: {}", event_name);
        res.render(Json(json!({ "status": "ignored" })));
        return;
    };

    let service = web_state().service.clone();
    let outcome = match event_type.as_str() {
        "post" => {
            match serde_json::from_value::<WebhookPost>(
                payload.get("post").cloned().unwrap_or(Value::Null),
            ) {
                Ok(post) => service.handle_post_event(action, post).await,
                Err(err) => {
                    warn!("malformed post payload: {}", err);
                    render_error(res, StatusCode::BAD_REQUEST, "malformed post payload");
                    return;
                }
            }
        }
        "topic" => {
            match serde_json::from_value::<WebhookTopic>(
                payload.get("topic").cloned().unwrap_or(Value::Null),
            ) {
                Ok(topic) => service.handle_topic_event(action, topic).await,
                Err(err) => {
                    warn!("malformed topic payload: {}", err);
                    render_error(res, StatusCode::BAD_REQUEST, "malformed topic payload");
                    return;
                }
            }
        }
        other => {
            debug!("ignoring event type: {}", other);
            res.render(Json(json!({ "status": "ignored" })));
            return;
        }
    };

    match outcome {
        Ok(()) => {
            res.render(Json(json!({ "status": "success" })));
        }
        Err(err) => {
            error!("error handling webhook: {err:#}");
            render_error(
                res,
                StatusCode::INTERNAL_SERVER_ERROR,
                "error handling webhook",
            );
        }
    }
}
