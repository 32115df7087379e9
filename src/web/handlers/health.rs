use salvo::prelude::*;
use serde_json::json;

use crate::web::web_state;

#[handler]
pub async fn health_check(res: &mut Response) {
    res.render(Json(json!({ "status": "healthy" })));
}

#[handler]
pub async fn get_status(res: &mut Response) {
    let uptime = web_state().started_at.elapsed().as_secs();
    res.render(Json(json!({
        "status": "running",
        "uptime_seconds": uptime,
    })));
}
