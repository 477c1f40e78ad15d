use std::{cell::Cell, rc::Rc};

use log::{info, warn};
use tally_common::Transport;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CloseEvent, ErrorEvent, Event, MessageEvent, WebSocket};

use super::{start, ws_url, Shared};
use crate::time::{set_timeout, sleep};

/// An open WebSocket and the handlers bound to it.
pub(super) struct LiveSocket {
    ws: WebSocket,

    // prevent GC of closures
    _onopen: Closure<dyn FnMut(Event)>,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
    _onclose: Closure<dyn FnMut(CloseEvent)>,
    _onerror: Closure<dyn FnMut(ErrorEvent)>,
}

impl Drop for LiveSocket {
    fn drop(&mut self) {
        // detach first, the closures are freed right after this
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        self.ws.set_onerror(None);
        let _ = self.ws.close();
    }
}

pub(super) fn connect(shared: &Rc<Shared>) {
    let url = ws_url(&shared.base_url);
    let ws = match WebSocket::new(&url) {
        Ok(ws) => ws,
        Err(e) => {
            warn!("failed to open {url}: {e:?}");
            on_failure(shared, false);
            return;
        }
    };
    let opened = Rc::new(Cell::new(false));

    let onopen = {
        let shared = Rc::clone(shared);
        let opened = Rc::clone(&opened);
        Closure::wrap(Box::new(move |_e: Event| {
            opened.set(true);
            shared.failures.set(0);
            info!("connected to {} over websocket", shared.base_url);
        }) as Box<dyn FnMut(Event)>)
    };
    ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));

    let onmessage = {
        let shared = Rc::clone(shared);
        Closure::wrap(Box::new(move |e: MessageEvent| {
            if let Some(text) = e.data().as_string() {
                shared.sink.on_text(&text);
            }
        }) as Box<dyn FnMut(MessageEvent)>)
    };
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

    let onclose = {
        let shared = Rc::clone(shared);
        let opened = Rc::clone(&opened);
        Closure::wrap(Box::new(move |e: CloseEvent| {
            info!("websocket closed: code={}, reason={}", e.code(), e.reason());
            if !shared.closed.get() {
                on_failure(&shared, opened.get());
            }
        }) as Box<dyn FnMut(CloseEvent)>)
    };
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

    let onerror = Closure::wrap(Box::new(move |_e: ErrorEvent| {
        warn!("websocket error");
    }) as Box<dyn FnMut(ErrorEvent)>);
    ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

    {
        let pending = ws.clone();
        set_timeout(
            shared.policy.timeout_ms,
            Box::new(move || {
                if pending.ready_state() == WebSocket::CONNECTING {
                    warn!("websocket connection timed out");
                    let _ = pending.close();
                }
            }),
        );
    }

    *shared.socket.borrow_mut() = Some(LiveSocket {
        ws,
        _onopen: onopen,
        _onmessage: onmessage,
        _onclose: onclose,
        _onerror: onerror,
    });
}

/// Called from inside socket handlers, so all follow-up work is deferred.
fn on_failure(shared: &Rc<Shared>, was_open: bool) {
    if !was_open {
        if let Some(next) = shared.policy.fallback(Transport::WebSocket) {
            info!("websocket unavailable, falling back to {next:?}");
            let shared = Rc::clone(shared);
            spawn_local(async move {
                sleep(0).await;
                shared.socket.borrow_mut().take();
                if !shared.closed.get() {
                    start(&shared, next);
                }
            });
            return;
        }
    }

    if let Some(delay) = shared.record_failure() {
        info!("reconnecting in {delay}ms");
        let shared = Rc::clone(shared);
        spawn_local(async move {
            sleep(delay).await;
            if !shared.closed.get() {
                connect(&shared);
            }
        });
    }
}
