// src/page.rs
//! A minimal page model: elements with classes, attributes and click
//! listeners, enough to bind the flag controller without a browser.
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::measurement::{FLAG_BUTTON_CLASS, ID_ATTRIBUTE};

pub type ClickListener = Arc<dyn Fn(&ClickEvent) + Send + Sync>;

/// Root container the controller searches for flag buttons.
pub trait Page {
    fn query_class(&self, class: &str) -> Vec<Arc<Element>>;
}

pub struct ClickEvent {
    target: Arc<Element>,
    default_prevented: AtomicBool,
}

impl ClickEvent {
    pub fn target(&self) -> &Arc<Element> {
        &self.target
    }

    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::SeqCst);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct Element {
    classes: HashSet<String>,
    attributes: HashMap<String, String>,
    listeners: Mutex<Vec<(String, ClickListener)>>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag button for the given measurement id.
    pub fn flag_button(id: &str) -> Self {
        Self::new()
            .with_class(FLAG_BUTTON_CLASS)
            .with_attribute(ID_ATTRIBUTE, id)
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Registers `listener` under `key`. A key that is already registered is
    /// left alone and `false` is returned.
    pub fn add_click_listener(&self, key: &str, listener: ClickListener) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners.iter().any(|(k, _)| k == key) {
            return false;
        }
        listeners.push((key.to_string(), listener));
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Dispatches a click to every listener and returns the event so callers
    /// can see whether the default action was prevented.
    pub fn click(self: &Arc<Self>) -> ClickEvent {
        let event = ClickEvent {
            target: Arc::clone(self),
            default_prevented: AtomicBool::new(false),
        };

        // Listeners may touch the element, so don't hold the lock while calling them
        let listeners: Vec<ClickListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(&event);
        }
        event
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("classes", &self.classes)
            .field("attributes", &self.attributes)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Document {
    elements: Vec<Arc<Element>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: Element) -> Arc<Element> {
        let element = Arc::new(element);
        self.elements.push(Arc::clone(&element));
        element
    }

    pub fn elements(&self) -> &[Arc<Element>] {
        &self.elements
    }
}

impl Page for Document {
    fn query_class(&self, class: &str) -> Vec<Arc<Element>> {
        self.elements.query_class(class)
    }
}

impl Page for Vec<Arc<Element>> {
    fn query_class(&self, class: &str) -> Vec<Arc<Element>> {
        self.iter().filter(|e| e.has_class(class)).cloned().collect()
    }
}
