//! Interactive form (AcroForm) and its elements.
//!
//! Elements are stored by fully qualified name in insertion order. Each
//! element refers to its widget annotations by page and annotation id; the
//! annotations themselves live on the pages.

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::action::{Action, AnnotationEvent};
use super::ids::{AnnotationId, PageId};
use crate::error::{Error, Result};

bitflags! {
    /// Field flags common to all field types (ISO 32000-1 Table 221).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct FieldFlags: u32 {
        /// Field is read-only; user cannot change the value
        const READ_ONLY = 1 << 0;
        /// Field must have a value before submit
        const REQUIRED = 1 << 1;
        /// Field is not exported by submit-form actions
        const NO_EXPORT = 1 << 2;
    }
}

/// Barcode symbologies for barcode fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarCodeSymbology {
    /// QR code
    QrCode,
    /// PDF417
    Pdf417,
    /// Data Matrix
    DataMatrix,
}

/// Field variants with their type specific state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Text entry
    Text {
        /// Maximum length
        max_len: Option<usize>,
        /// Allow multiple lines
        multiline: bool,
    },
    /// Combo box or list box
    Choice {
        /// Options in display order
        options: Vec<String>,
        /// Combo box rather than list
        combo: bool,
    },
    /// Push button
    Button {
        /// Caption
        label: String,
    },
    /// Check box
    Checkbox {
        /// Current state
        checked: bool,
    },
    /// Group of radio buttons
    RadioButton {
        /// Export values, one per widget
        options: Vec<String>,
        /// Currently selected option
        selected: Option<String>,
    },
    /// Signature field
    Signature {
        /// Index into the document's signature revisions
        revision: Option<usize>,
    },
    /// Barcode field
    BarCode {
        /// Symbology
        symbology: BarCodeSymbology,
    },
}

/// Placement of a field on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetRef {
    /// Page holding the widget
    pub page: PageId,
    /// Widget annotation on that page
    pub annotation: AnnotationId,
}

/// A named form element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormElement {
    /// Variant
    pub kind: FieldKind,
    /// Current value as text
    pub value: Option<String>,
    /// Alternate description shown as a tooltip
    pub tooltip: Option<String>,
    /// Flags
    pub flags: FieldFlags,
    /// Field level actions
    pub actions: IndexMap<AnnotationEvent, Action>,
    /// Visual placements
    pub widgets: Vec<WidgetRef>,
}

impl FormElement {
    /// Create an element of the given kind with no widgets.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            value: None,
            tooltip: None,
            flags: FieldFlags::empty(),
            actions: IndexMap::new(),
            widgets: Vec::new(),
        }
    }

    /// Single line text field.
    pub fn text() -> Self {
        Self::new(FieldKind::Text {
            max_len: None,
            multiline: false,
        })
    }

    /// Unchecked checkbox.
    pub fn checkbox() -> Self {
        Self::new(FieldKind::Checkbox { checked: false })
    }

    /// Unsigned signature field.
    pub fn signature() -> Self {
        Self::new(FieldKind::Signature { revision: None })
    }

    /// Set the value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the tooltip.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Set flags.
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// The document's interactive form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Form {
    elements: IndexMap<String, FormElement>,
    /// Raw XFA packet, kept only structurally
    xfa: Option<String>,
}

impl Form {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element under a unique name.
    pub fn add_element(&mut self, name: impl Into<String>, element: FormElement) -> Result<()> {
        let name = name.into();
        if self.elements.contains_key(&name) {
            return Err(Error::NameCollision([name].into_iter().collect()));
        }
        self.elements.insert(name, element);
        Ok(())
    }

    /// Look up an element.
    pub fn element(&self, name: &str) -> Option<&FormElement> {
        self.elements.get(name)
    }

    /// Look up an element mutably.
    pub fn element_mut(&mut self, name: &str) -> Option<&mut FormElement> {
        self.elements.get_mut(name)
    }

    /// Remove an element, keeping the order of the rest. Widgets on pages
    /// are the caller's concern; see `Document::remove_field`.
    pub fn remove_element(&mut self, name: &str) -> Option<FormElement> {
        self.elements.shift_remove(name)
    }

    /// Rename an element in place.
    pub fn rename_element(&mut self, from: &str, to: impl Into<String>) -> Result<()> {
        let to = to.into();
        if self.elements.contains_key(&to) {
            return Err(Error::NameCollision([to].into_iter().collect()));
        }
        let index = self
            .elements
            .get_index_of(from)
            .ok_or_else(|| Error::InvalidArgument(format!("no form element named '{}'", from)))?;
        let (_, element) = self
            .elements
            .shift_remove_index(index)
            .ok_or_else(|| Error::InvalidArgument(format!("no form element named '{}'", from)))?;
        self.elements.insert(to, element);
        let last = self.elements.len() - 1;
        self.elements.move_index(last, index);
        Ok(())
    }

    /// Element names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(|k| k.as_str())
    }

    /// Elements in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormElement)> {
        self.elements.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Elements in order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut FormElement)> {
        self.elements.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the form has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Attach an XFA packet.
    pub fn set_xfa(&mut self, xfa: impl Into<String>) {
        self.xfa = Some(xfa.into());
    }

    /// Whether an XFA packet is present.
    pub fn has_xfa(&self) -> bool {
        self.xfa.is_some()
    }

    /// Drop the XFA packet, keeping the AcroForm elements.
    pub fn remove_xfa(&mut self) -> bool {
        self.xfa.take().is_some()
    }

    pub(crate) fn take_elements(&mut self) -> IndexMap<String, FormElement> {
        std::mem::take(&mut self.elements)
    }

    pub(crate) fn extend_unchecked(&mut self, elements: IndexMap<String, FormElement>) {
        self.elements.extend(elements);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_rejected() {
        let mut form = Form::new();
        form.add_element("Name", FormElement::text()).unwrap();
        let err = form.add_element("Name", FormElement::checkbox()).unwrap_err();
        match err {
            Error::NameCollision(names) => {
                assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["Name".to_string()])
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(form.element("Name").map(|e| &e.kind), Some(FieldKind::Text { .. })));
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut form = Form::new();
        form.add_element("a", FormElement::text()).unwrap();
        form.add_element("b", FormElement::text()).unwrap();
        form.add_element("c", FormElement::text()).unwrap();
        form.rename_element("b", "beta").unwrap();
        assert_eq!(form.names().collect::<Vec<_>>(), vec!["a", "beta", "c"]);
        assert!(form.rename_element("a", "c").is_err());
        assert!(form.rename_element("zzz", "y").is_err());
    }

    #[test]
    fn test_xfa() {
        let mut form = Form::new();
        assert!(!form.remove_xfa());
        form.set_xfa("<xdp:xdp/>");
        assert!(form.has_xfa());
        assert!(form.remove_xfa());
        assert!(!form.has_xfa());
    }
}
