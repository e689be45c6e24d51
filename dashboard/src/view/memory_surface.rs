use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::warn;

use super::{
    bindings::{element_id, ElementRole},
    Element, UiSurface,
};
use crate::utils::constants::ENABLE_BUTTON_ID;

/// Element table held in memory. Backs the terminal surface and the tests.
#[derive(Debug, Default)]
pub struct MemorySurface {
    elements: BTreeMap<String, Element>,
    alerts: Mutex<Vec<String>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every element the dashboard binds for `assets`, plus the connect button
    pub fn with_dashboard_elements(assets: &[String]) -> Self {
        let mut surface = Self::new();
        surface.add_element(ENABLE_BUTTON_ID);
        for asset in assets {
            for role in ElementRole::ALL {
                surface.add_element(&element_id(asset, role));
            }
        }
        surface
    }

    pub fn add_element(&mut self, id: &str) -> Element {
        self.elements
            .entry(id.to_string())
            .or_insert_with(|| Element::new(id))
            .clone()
    }

    pub fn remove_element(&mut self, id: &str) -> Option<Element> {
        self.elements.remove(id)
    }

    pub fn element_ids(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().clone()
    }
}

impl UiSurface for MemorySurface {
    fn element(&self, id: &str) -> Option<Element> {
        self.elements.get(id).cloned()
    }

    fn alert(&self, message: &str) {
        warn!("Alert: {}", message);
        self.alerts.lock().push(message.to_string());
    }
}
