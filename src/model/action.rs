//! Actions triggered by documents, annotations and bookmarks.

use serde::{Deserialize, Serialize};

use super::ids::PageId;

/// Something the viewer does in response to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Go to a page, optionally scrolled to a y position
    GoTo {
        /// Target page
        page: PageId,
        /// Top of the view in page space
        top: Option<f32>,
    },
    /// Open a URL
    Url(String),
    /// Run a named viewer action such as "NextPage"
    Named(String),
    /// Run JavaScript
    JavaScript(String),
    /// Launch an external file or application
    Launch(String),
    /// Submit form fields to a URL
    SubmitForm {
        /// Destination
        url: String,
        /// Fields to submit; empty means all
        fields: Vec<String>,
    },
    /// Reset form fields
    ResetForm {
        /// Fields to reset; empty means all
        fields: Vec<String>,
    },
}

impl Action {
    /// Action going to the top of a page.
    pub fn goto(page: PageId) -> Self {
        Action::GoTo { page, top: None }
    }

    /// Whether running this action executes script.
    pub fn is_javascript(&self) -> bool {
        matches!(self, Action::JavaScript(_))
    }

    /// Whether this action launches something outside the viewer.
    pub fn is_launch(&self) -> bool {
        matches!(self, Action::Launch(_))
    }

    /// Page this action jumps to, if any.
    pub fn target_page(&self) -> Option<PageId> {
        match self {
            Action::GoTo { page, .. } => Some(*page),
            _ => None,
        }
    }

    /// Short human description used for alternate text.
    pub fn describe(&self) -> String {
        match self {
            Action::GoTo { .. } => "Go to page".to_string(),
            Action::Url(url) => url.clone(),
            Action::Named(name) => name.clone(),
            Action::JavaScript(_) => "Script".to_string(),
            Action::Launch(target) => format!("Launch {}", target),
            Action::SubmitForm { url, .. } => format!("Submit to {}", url),
            Action::ResetForm { .. } => "Reset form".to_string(),
        }
    }
}

/// Document level events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentEvent {
    /// Document opened
    Open,
    /// Document about to close
    Close,
    /// Before printing
    WillPrint,
    /// After printing
    DidPrint,
    /// Before saving
    WillSave,
    /// After saving
    DidSave,
}

/// Annotation and field level events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationEvent {
    /// Mouse click (activation)
    Click,
    /// Pointer enters the rectangle
    MouseEnter,
    /// Pointer leaves the rectangle
    MouseExit,
    /// Field gains focus
    Focus,
    /// Field loses focus
    Blur,
    /// Keystroke in a field
    KeyStroke,
    /// Format a field value
    Format,
    /// Validate a field value
    Validate,
    /// Recalculate a field value
    Calculate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_predicates() {
        let page = PageId::new();
        assert_eq!(Action::goto(page).target_page(), Some(page));
        assert!(Action::JavaScript("app.alert(1)".into()).is_javascript());
        assert!(Action::Launch("calc.exe".into()).is_launch());
        assert_eq!(Action::Url("https://example.com".into()).describe(), "https://example.com");
    }
}
