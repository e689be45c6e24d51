use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ElementState {
    /// Display text of spans
    pub text: String,
    /// Current value of text inputs
    pub value: String,
    /// Checked flag of checkboxes
    pub checked: bool,
}

/// Shared handle to one UI element. Clones point at the same state.
#[derive(Debug, Clone)]
pub struct Element {
    id: String,
    state: Arc<Mutex<ElementState>>,
}

impl Element {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(ElementState::default())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.state.lock().text = text.into();
    }

    pub fn value(&self) -> String {
        self.state.lock().value.clone()
    }

    pub fn set_value(&self, value: impl Into<String>) {
        self.state.lock().value = value.into();
    }

    pub fn is_checked(&self) -> bool {
        self.state.lock().checked
    }

    pub fn set_checked(&self, checked: bool) {
        self.state.lock().checked = checked;
    }

    /// True when both handles refer to the same element
    pub fn same_as(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}
