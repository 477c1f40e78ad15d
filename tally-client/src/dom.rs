//! The slice of the DOM the updater touches.
//!
//! Kept behind small traits so the pulse logic runs the same against the
//! browser document and against the in-memory document used by tests.

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement};

/// An element whose text and classes can be changed.
pub trait Node {
    fn remove_class(&self, class: &str);
    fn add_class(&self, class: &str);
    /// Read a layout-dependent property so pending style changes are flushed.
    fn force_layout(&self);
    fn set_text(&self, text: &str);
}

/// Looks elements up by id.
pub trait Surface {
    type Node: Node + Clone + 'static;

    fn find(&self, id: &str) -> Option<Self::Node>;
}

/// One-shot timers on the page's event loop.
pub trait Timers {
    type Handle: 'static;

    fn schedule(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Self::Handle;
    fn cancel(&self, handle: Self::Handle);
}

impl Node for Element {
    fn remove_class(&self, class: &str) {
        let _ = self.class_list().remove_1(class);
    }

    fn add_class(&self, class: &str) {
        let _ = self.class_list().add_1(class);
    }

    fn force_layout(&self) {
        match self.dyn_ref::<HtmlElement>() {
            Some(html) => {
                let _ = html.offset_width();
            }
            None => {
                let _ = self.client_width();
            }
        }
    }

    fn set_text(&self, text: &str) {
        self.set_text_content(Some(text));
    }
}

pub struct DocumentSurface {
    document: Document,
}

impl DocumentSurface {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl Surface for DocumentSurface {
    type Node = Element;

    fn find(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::{
        cell::{Cell, RefCell},
        collections::{BTreeSet, HashMap},
        rc::Rc,
    };

    #[derive(Debug, Default)]
    pub struct FakeElement {
        pub text: String,
        pub classes: BTreeSet<String>,
        pub ops: Vec<String>,
    }

    /// In-memory document keyed by element id.
    #[derive(Clone, Default)]
    pub struct FakeDocument {
        elements: Rc<RefCell<HashMap<String, FakeElement>>>,
    }

    impl FakeDocument {
        pub fn with_ids(ids: &[&str]) -> Self {
            let doc = Self::default();
            for id in ids {
                doc.elements
                    .borrow_mut()
                    .insert(id.to_string(), FakeElement::default());
            }
            doc
        }

        pub fn text(&self, id: &str) -> Option<String> {
            self.elements.borrow().get(id).map(|e| e.text.clone())
        }

        pub fn has_class(&self, id: &str, class: &str) -> bool {
            self.elements
                .borrow()
                .get(id)
                .is_some_and(|e| e.classes.contains(class))
        }

        pub fn ops(&self, id: &str) -> Vec<String> {
            self.elements
                .borrow()
                .get(id)
                .map(|e| e.ops.clone())
                .unwrap_or_default()
        }

        pub fn total_ops(&self) -> usize {
            self.elements.borrow().values().map(|e| e.ops.len()).sum()
        }
    }

    #[derive(Clone)]
    pub struct FakeNode {
        id: String,
        doc: FakeDocument,
    }

    impl FakeNode {
        fn with<R>(&self, f: impl FnOnce(&mut FakeElement) -> R) -> R {
            let mut elements = self.doc.elements.borrow_mut();
            let element = elements.get_mut(&self.id).expect("element removed");
            f(element)
        }
    }

    impl Node for FakeNode {
        fn remove_class(&self, class: &str) {
            self.with(|e| {
                e.classes.remove(class);
                e.ops.push(format!("remove {class}"));
            });
        }

        fn add_class(&self, class: &str) {
            self.with(|e| {
                e.classes.insert(class.to_string());
                e.ops.push(format!("add {class}"));
            });
        }

        fn force_layout(&self) {
            self.with(|e| e.ops.push("layout".to_string()));
        }

        fn set_text(&self, text: &str) {
            self.with(|e| {
                e.text = text.to_string();
                e.ops.push(format!("text {text}"));
            });
        }
    }

    impl Surface for FakeDocument {
        type Node = FakeNode;

        fn find(&self, id: &str) -> Option<FakeNode> {
            self.elements.borrow().contains_key(id).then(|| FakeNode {
                id: id.to_string(),
                doc: self.clone(),
            })
        }
    }

    struct Scheduled {
        id: u32,
        due: u64,
        callback: Box<dyn FnOnce()>,
    }

    /// Manually advanced clock.
    #[derive(Clone, Default)]
    pub struct FakeTimers {
        now: Rc<Cell<u64>>,
        next_id: Rc<Cell<u32>>,
        queue: Rc<RefCell<Vec<Scheduled>>>,
    }

    impl FakeTimers {
        pub fn advance(&self, ms: u64) {
            let target = self.now.get() + ms;
            loop {
                let next = {
                    let mut queue = self.queue.borrow_mut();
                    let idx = queue
                        .iter()
                        .enumerate()
                        .filter(|(_, s)| s.due <= target)
                        .min_by_key(|(_, s)| (s.due, s.id))
                        .map(|(i, _)| i);
                    idx.map(|i| queue.remove(i))
                };
                match next {
                    Some(scheduled) => {
                        self.now.set(scheduled.due);
                        (scheduled.callback)();
                    }
                    None => break,
                }
            }
            self.now.set(target);
        }

        pub fn pending(&self) -> usize {
            self.queue.borrow().len()
        }
    }

    impl Timers for FakeTimers {
        type Handle = u32;

        fn schedule(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> u32 {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.queue.borrow_mut().push(Scheduled {
                id,
                due: self.now.get() + u64::from(delay_ms),
                callback,
            });
            id
        }

        fn cancel(&self, handle: u32) {
            self.queue.borrow_mut().retain(|s| s.id != handle);
        }
    }
}
