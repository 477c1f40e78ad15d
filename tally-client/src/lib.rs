//! Tally dashboard client - live counters for the browser.
//!
//! ```js
//! const dashboard = Dashboard.pollingOnly(location.origin);
//! dashboard.attachAura();
//! ```

use std::rc::Rc;

use tally_common::TransportPolicy;
use wasm_bindgen::prelude::*;

mod aura;
mod dom;
mod network;
mod pulse;
mod time;
mod updater;

pub use dom::{DocumentSurface, Node, Surface, Timers};
pub use pulse::{Pulser, PULSE_MS, UPDATING_CLASS};
pub use time::WindowTimers;
pub use updater::Updater;

use aura::Aura;
use network::Connection;

/// A live dashboard page: one push connection plus the card effects.
#[wasm_bindgen]
pub struct Dashboard {
    connection: Connection,
    aura: Option<Aura>,
}

#[wasm_bindgen]
impl Dashboard {
    /// Connect with default negotiation (WebSocket, falling back to polling).
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: &str) -> Result<Dashboard, JsValue> {
        Self::connect(base_url, TransportPolicy::default())
    }

    /// Connect over long-polling only, five reconnection attempts, 10s timeout.
    #[wasm_bindgen(js_name = pollingOnly)]
    pub fn polling_only(base_url: &str) -> Result<Dashboard, JsValue> {
        Self::connect(base_url, TransportPolicy::polling_only())
    }

    /// Connect with a policy object, e.g. `{ transports: ["polling"], timeout: 10000 }`.
    #[wasm_bindgen(js_name = withPolicy)]
    pub fn with_policy(base_url: &str, policy: JsValue) -> Result<Dashboard, JsValue> {
        let policy: TransportPolicy = serde_wasm_bindgen::from_value(policy)?;
        Self::connect(base_url, policy)
    }

    /// Start the cursor highlight on every `.card` currently on the page.
    #[wasm_bindgen(js_name = attachAura)]
    pub fn attach_aura(&mut self) -> Result<u32, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("no document")?;
        let aura = Aura::attach(&document)?;
        let count = aura.len() as u32;
        self.aura = Some(aura);
        Ok(count)
    }

    pub fn close(&mut self) {
        self.connection.close();
        self.aura = None;
        log::info!("dashboard closed");
    }
}

impl Dashboard {
    fn connect(base_url: &str, policy: TransportPolicy) -> Result<Dashboard, JsValue> {
        console_error_panic_hook::set_once();
        // already initialised when a second dashboard is created
        let _ = console_log::init_with_level(log::Level::Info);

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let base_url = if base_url.is_empty() {
            window.location().origin()?
        } else {
            base_url.to_string()
        };

        log::info!(
            "dashboard connecting to {} via {:?}",
            base_url,
            policy.transports
        );
        let updater = Rc::new(Updater::new(DocumentSurface::new(document), WindowTimers));
        let connection = Connection::open(&base_url, policy, updater);

        Ok(Dashboard {
            connection,
            aura: None,
        })
    }
}
