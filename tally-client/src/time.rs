//! Timers on the browser event loop.

use js_sys::{Function, Promise};
use wasm_bindgen::{closure::Closure, JsCast};
use wasm_bindgen_futures::JsFuture;

use crate::dom::Timers;

/// `setTimeout` / `clearTimeout` on the global window.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowTimers;

impl Timers for WindowTimers {
    type Handle = i32;

    fn schedule(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> i32 {
        set_timeout(delay_ms, callback).unwrap_or(-1)
    }

    fn cancel(&self, handle: i32) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(handle);
        }
    }
}

/// Run `callback` once after `delay_ms`. The JS function frees itself after
/// the call.
pub fn set_timeout(delay_ms: u32, callback: Box<dyn FnOnce()>) -> Option<i32> {
    let window = web_sys::window()?;
    let function = Closure::once_into_js(move || callback());
    window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            function.unchecked_ref::<Function>(),
            clamp_delay(delay_ms),
        )
        .ok()
}

/// Resolve after `delay_ms`.
pub async fn sleep(delay_ms: u32) {
    let promise = Promise::new(&mut |resolve, _reject| {
        if let Some(window) = web_sys::window() {
            let _ = window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, clamp_delay(delay_ms));
        }
    });
    let _ = JsFuture::from(promise).await;
}

fn clamp_delay(delay_ms: u32) -> i32 {
    delay_ms.min(i32::MAX as u32) as i32
}
