use std::collections::HashMap;

use super::{Element, UiSurface};
use crate::utils::constants::ENABLE_BUTTON_ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRole {
    SupplyInput,
    SupplyButton,
    BorrowInput,
    BorrowButton,
    Supplied,
    Borrowed,
    Borrowable,
    CollateralCheckbox,
}

impl ElementRole {
    pub const ALL: [ElementRole; 8] = [
        ElementRole::SupplyInput,
        ElementRole::SupplyButton,
        ElementRole::BorrowInput,
        ElementRole::BorrowButton,
        ElementRole::Supplied,
        ElementRole::Borrowed,
        ElementRole::Borrowable,
        ElementRole::CollateralCheckbox,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            ElementRole::SupplyInput => "supply-input",
            ElementRole::SupplyButton => "supply-button",
            ElementRole::BorrowInput => "borrow-input",
            ElementRole::BorrowButton => "borrow-button",
            ElementRole::Supplied => "supplied",
            ElementRole::Borrowed => "borrowed",
            ElementRole::Borrowable => "borrowable",
            ElementRole::CollateralCheckbox => "collateral-checkbox",
        }
    }
}

/// Kebab-case element id, e.g. `eth-supply-input`
pub fn element_id(asset: &str, role: ElementRole) -> String {
    format!("{}-{}", asset.to_lowercase(), role.suffix())
}

/// `eth-supply-input` -> `ethSupplyInput`
pub fn kebab_to_camel_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut upper_next = false;

    for c in value.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("missing element #{selector}")]
    MissingElement { selector: String },
}

/// Element handles for every (asset, role) pair of the session, keyed by camelCase name
#[derive(Debug, Clone)]
pub struct ElementBindings {
    elements: HashMap<String, Element>,
    enable_button: Option<Element>,
}

impl ElementBindings {
    /// Resolves all `<asset>-<role>` elements on `surface`.
    ///
    /// # Errors
    /// Fails on the first id that does not resolve, naming it.
    pub fn bind(surface: &dyn UiSurface, assets: &[String]) -> Result<Self, BindingError> {
        let mut elements = HashMap::with_capacity(assets.len() * ElementRole::ALL.len());

        for asset in assets {
            for role in ElementRole::ALL {
                let selector = element_id(asset, role);
                let element = surface
                    .element(&selector)
                    .ok_or_else(|| BindingError::MissingElement {
                        selector: selector.clone(),
                    })?;
                elements.insert(kebab_to_camel_case(&selector), element);
            }
        }

        Ok(Self {
            elements,
            enable_button: surface.element(ENABLE_BUTTON_ID),
        })
    }

    pub fn get(&self, asset: &str, role: ElementRole) -> Option<&Element> {
        self.by_key(&kebab_to_camel_case(&element_id(asset, role)))
    }

    /// Lookup by camelCase key, e.g. `usdcBorrowable`
    pub fn by_key(&self, key: &str) -> Option<&Element> {
        self.elements.get(key)
    }

    pub fn enable_button(&self) -> Option<&Element> {
        self.enable_button.as_ref()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
