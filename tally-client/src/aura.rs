//! Cursor-following highlight on `.card` elements.

use tally_common::aura::{css_percent, Rect, CARD_CLASS, MOUSE_X_PROPERTY, MOUSE_Y_PROPERTY};
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement, MouseEvent};

/// Listeners attached to every card present when it was created.
pub struct Aura {
    listeners: Vec<(HtmlElement, Closure<dyn FnMut(MouseEvent)>)>,
}

impl Aura {
    pub fn attach(document: &Document) -> Result<Aura, JsValue> {
        let cards = document.query_selector_all(&format!(".{CARD_CLASS}"))?;
        let mut listeners = Vec::with_capacity(cards.length() as usize);

        for i in 0..cards.length() {
            let Some(card) = cards.item(i).and_then(|n| n.dyn_into::<HtmlElement>().ok()) else {
                continue;
            };
            let onmove = {
                let card = card.clone();
                Closure::wrap(Box::new(move |e: MouseEvent| track(&card, &e))
                    as Box<dyn FnMut(MouseEvent)>)
            };
            card.add_event_listener_with_callback("mousemove", onmove.as_ref().unchecked_ref())?;
            listeners.push((card, onmove));
        }

        log::debug!("aura attached to {} cards", listeners.len());
        Ok(Aura { listeners })
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl Drop for Aura {
    fn drop(&mut self) {
        for (card, onmove) in &self.listeners {
            let _ = card
                .remove_event_listener_with_callback("mousemove", onmove.as_ref().unchecked_ref());
        }
    }
}

fn track(card: &HtmlElement, e: &MouseEvent) {
    let bounds = card.get_bounding_client_rect();
    let rect = Rect::new(bounds.left(), bounds.top(), bounds.width(), bounds.height());
    let Some((x, y)) = rect.pointer_percent(f64::from(e.client_x()), f64::from(e.client_y())) else {
        return;
    };
    let style = card.style();
    let _ = style.set_property(MOUSE_X_PROPERTY, &css_percent(x));
    let _ = style.set_property(MOUSE_Y_PROPERTY, &css_percent(y));
}
