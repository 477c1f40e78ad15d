use std::rc::Rc;

use log::{info, warn};
use tally_common::PollBatch;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Request, RequestInit, Response};

use super::{poll_url, Shared};
use crate::time::{set_timeout, sleep};

/// Long-poll loop. Runs until the connection is closed or the policy gives up.
pub(super) async fn run(shared: Rc<Shared>) {
    let mut cursor: Option<u64> = None;

    while !shared.closed.get() {
        let (url, deadline) = match cursor {
            // handshake: answered immediately with the current cursor
            None => (poll_url(&shared.base_url, None, 0), shared.policy.timeout_ms),
            Some(after) => (
                poll_url(&shared.base_url, Some(after), shared.policy.poll_wait_ms),
                shared.policy.poll_deadline_ms(),
            ),
        };

        match fetch_batch(&url, deadline).await {
            Ok(batch) => {
                if shared.closed.get() {
                    break;
                }
                if cursor.is_none() {
                    info!("connected to {} over polling", shared.base_url);
                } else {
                    shared.sink.on_batch(&batch);
                }
                shared.failures.set(0);
                cursor = Some(batch.cursor);
            }
            Err(e) => {
                if shared.closed.get() {
                    break;
                }
                warn!("poll failed: {e:?}");
                match shared.record_failure() {
                    Some(delay) => sleep(delay).await,
                    None => break,
                }
            }
        }
    }
}

async fn fetch_batch(url: &str, deadline_ms: u32) -> Result<PollBatch, JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let controller = AbortController::new()?;

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_signal(Some(&controller.signal()));
    let request = Request::new_with_str_and_init(url, &opts)?;
    request.headers().set("Accept", "application/json")?;

    let timer = {
        let controller = controller.clone();
        set_timeout(deadline_ms, Box::new(move || controller.abort()))
    };

    let result = fetch_json(&window, &request).await;

    if let Some(timer) = timer {
        window.clear_timeout_with_handle(timer);
    }
    result
}

async fn fetch_json(window: &web_sys::Window, request: &Request) -> Result<PollBatch, JsValue> {
    let resp: Response = JsFuture::from(window.fetch_with_request(request))
        .await?
        .dyn_into()?;
    if !resp.ok() {
        return Err(JsValue::from_str(&format!(
            "poll failed: {} {}",
            resp.status(),
            resp.status_text()
        )));
    }
    let body = JsFuture::from(resp.text()?).await?;
    let body = body.as_string().ok_or("response body is not text")?;
    serde_json::from_str::<PollBatch>(&body)
        .map_err(|e| JsValue::from_str(&format!("bad poll response: {e}")))
}
