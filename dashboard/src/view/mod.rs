pub mod bindings;
pub mod element;
pub mod memory_surface;
pub mod projector;

pub use bindings::{element_id, kebab_to_camel_case, BindingError, ElementBindings, ElementRole};
pub use element::Element;
pub use memory_surface::MemorySurface;

/// Where the dashboard draws: a set of addressable elements plus a blocking notice.
pub trait UiSurface: Send + Sync {
    /// Looks up an element by its kebab-case id
    fn element(&self, id: &str) -> Option<Element>;

    /// Shows a message the user has to acknowledge
    fn alert(&self, message: &str);

    /// Called after a projection pass so the surface can redraw
    fn render(&self) {}
}
