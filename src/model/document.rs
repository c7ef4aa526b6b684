//! The document: root of the object graph.

use std::collections::HashSet;

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::action::{Action, DocumentEvent};
use super::annotation::{Annotation, AnnotationKind};
use super::bookmark::Bookmark;
use super::embedded_file::EmbeddedFile;
use super::form::{Form, FormElement, WidgetRef};
use super::ids::{AnnotationId, PageId};
use super::layer::OptionalContentLayer;
use super::locale::Locale;
use super::page::Page;
use super::signature::SignatureRevision;
use super::structure::{self, StructureElement};
use super::xmp::XmpMetadata;
use crate::error::{Error, Result};
use crate::geometry::{PageSize, Rect};
use crate::profile::{OutputIntent, OutputProfile};

bitflags! {
    /// Operations granted to users of an encrypted document.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Permissions: u32 {
        /// Print the document
        const PRINT = 1 << 2;
        /// Modify the contents
        const MODIFY = 1 << 3;
        /// Copy or extract text and graphics
        const COPY = 1 << 4;
        /// Add or modify annotations and fill forms
        const ANNOTATE = 1 << 5;
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::all()
    }
}

/// Password encryption applied when the document is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionSettings {
    #[serde(skip)]
    pub(crate) password: String,
    /// Granted operations
    pub permissions: Permissions,
}

impl EncryptionSettings {
    /// Encrypt with a password.
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            permissions: Permissions::default(),
        }
    }

    /// Restrict permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

/// How the document is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Organize for incremental loading
    pub linearize: bool,
    /// Compress the body
    pub compress: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            linearize: false,
            compress: true,
        }
    }
}

/// A document.
///
/// ## Example
///
/// ```
/// use pdf_folio::geometry::PageSize;
/// use pdf_folio::model::{Document, FormElement};
///
/// let mut doc = Document::new();
/// let page = doc.new_page(PageSize::A4);
/// page.draw_text("Hello", 72.0, 770.0);
/// doc.form_mut().add_element("Name", FormElement::text()).unwrap();
/// assert!(doc.form_mut().add_element("Name", FormElement::text()).is_err());
/// assert_eq!(doc.pages().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pages: Vec<Page>,
    form: Form,
    bookmarks: Vec<Bookmark>,
    named_actions: IndexMap<String, Action>,
    embedded_files: IndexMap<String, EmbeddedFile>,
    actions: IndexMap<DocumentEvent, Action>,
    javascript: IndexMap<String, String>,
    info: IndexMap<String, String>,
    locale: Option<Locale>,
    xmp: XmpMetadata,
    output_intents: Vec<OutputIntent>,
    layers: Vec<OptionalContentLayer>,
    signatures: Vec<SignatureRevision>,
    encryption: Option<EncryptionSettings>,
    options: RenderOptions,
    required_profile: Option<OutputProfile>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            form: Form::new(),
            bookmarks: Vec::new(),
            named_actions: IndexMap::new(),
            embedded_files: IndexMap::new(),
            actions: IndexMap::new(),
            javascript: IndexMap::new(),
            info: IndexMap::new(),
            locale: None,
            xmp: XmpMetadata::new(),
            output_intents: Vec::new(),
            layers: Vec::new(),
            signatures: Vec::new(),
            encryption: None,
            options: RenderOptions::default(),
            required_profile: None,
        }
    }

    /// Create an empty document that refuses to render unless it is
    /// compatible with `profile`.
    pub fn with_profile(profile: OutputProfile) -> Self {
        let mut doc = Self::new();
        doc.required_profile = Some(profile);
        doc
    }

    /// Profile the document must satisfy to render.
    pub fn required_profile(&self) -> Option<&OutputProfile> {
        self.required_profile.as_ref()
    }

    /// Set or clear the required profile.
    pub fn set_required_profile(&mut self, profile: Option<OutputProfile>) {
        self.required_profile = profile;
    }

    // Pages

    /// Append an empty page.
    pub fn new_page(&mut self, size: PageSize) -> &mut Page {
        let index = self.pages.len();
        self.pages.push(Page::new(size));
        &mut self.pages[index]
    }

    /// Append a page taken from elsewhere.
    pub fn add_page(&mut self, page: Page) -> Result<&mut Page> {
        if self.page_index(page.id()).is_some() {
            return Err(Error::state(format!("page {} is already in this document", page.id())));
        }
        let index = self.pages.len();
        self.pages.push(page);
        Ok(&mut self.pages[index])
    }

    /// Remove a page, handing ownership to the caller. Widget references
    /// to it are dropped from the form.
    pub fn remove_page(&mut self, index: usize) -> Result<Page> {
        if index >= self.pages.len() {
            return Err(Error::InvalidArgument(format!(
                "page index {} out of range (document has {} pages)",
                index,
                self.pages.len()
            )));
        }
        let page = self.pages.remove(index);
        for (_, element) in self.form.iter_mut() {
            element.widgets.retain(|w| w.page != page.id());
        }
        Ok(page)
    }

    /// Pages in display order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Live list of pages.
    pub fn pages_mut(&mut self) -> &mut Vec<Page> {
        &mut self.pages
    }

    /// Page by index.
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Page by index, mutably.
    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    /// Index of a page.
    pub fn page_index(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id() == id)
    }

    // Form

    /// The form.
    pub fn form(&self) -> &Form {
        &self.form
    }

    /// The form, mutably.
    pub fn form_mut(&mut self) -> &mut Form {
        &mut self.form
    }

    /// Place a widget for a field on a page.
    pub fn add_widget(&mut self, field: &str, page_index: usize, rect: Rect) -> Result<AnnotationId> {
        if self.form.element(field).is_none() {
            return Err(Error::InvalidArgument(format!("no form element named '{}'", field)));
        }
        let page = self
            .pages
            .get_mut(page_index)
            .ok_or_else(|| Error::InvalidArgument(format!("page index {} out of range", page_index)))?;
        let annotation = page.add_annotation(Annotation::widget(rect, field));
        let widget = WidgetRef {
            page: page.id(),
            annotation,
        };
        if let Some(element) = self.form.element_mut(field) {
            element.widgets.push(widget);
        }
        Ok(annotation)
    }

    /// Remove a field together with its widgets.
    pub fn remove_field(&mut self, name: &str) -> Option<FormElement> {
        let element = self.form.remove_element(name)?;
        for widget in &element.widgets {
            if let Some(page) = self.pages.iter_mut().find(|p| p.id() == widget.page) {
                page.remove_annotation(widget.annotation);
            }
        }
        Some(element)
    }

    /// Rename a field; its widgets follow.
    pub fn rename_field(&mut self, from: &str, to: &str) -> Result<()> {
        self.form.rename_element(from, to)?;
        for page in &mut self.pages {
            for a in page.annotations_mut() {
                if let AnnotationKind::Widget { field } = &mut a.kind {
                    if field == from {
                        *field = to.to_string();
                    }
                }
            }
        }
        Ok(())
    }

    // Navigation and attachments

    /// Bookmarks.
    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    /// Live bookmark tree.
    pub fn bookmarks_mut(&mut self) -> &mut Vec<Bookmark> {
        &mut self.bookmarks
    }

    /// Nest all bookmarks under a new one pointing at the first page.
    pub fn nest_bookmarks(&mut self, title: impl Into<String>) {
        let mut root = match self.pages.first() {
            Some(first) => Bookmark::to_page(title, first.id()),
            None => Bookmark::new(title),
        };
        root.children = std::mem::take(&mut self.bookmarks);
        self.bookmarks.push(root);
    }

    /// Named actions.
    pub fn named_actions(&self) -> &IndexMap<String, Action> {
        &self.named_actions
    }

    /// Live map of named actions.
    pub fn named_actions_mut(&mut self) -> &mut IndexMap<String, Action> {
        &mut self.named_actions
    }

    /// Embedded files by name.
    pub fn embedded_files(&self) -> &IndexMap<String, EmbeddedFile> {
        &self.embedded_files
    }

    /// Live map of embedded files.
    pub fn embedded_files_mut(&mut self) -> &mut IndexMap<String, EmbeddedFile> {
        &mut self.embedded_files
    }

    /// Document-level actions.
    pub fn actions(&self) -> &IndexMap<DocumentEvent, Action> {
        &self.actions
    }

    /// Live map of document-level actions.
    pub fn actions_mut(&mut self) -> &mut IndexMap<DocumentEvent, Action> {
        &mut self.actions
    }

    /// Document JavaScript by name.
    pub fn javascript(&self) -> &IndexMap<String, String> {
        &self.javascript
    }

    /// Live map of document JavaScript.
    pub fn javascript_mut(&mut self) -> &mut IndexMap<String, String> {
        &mut self.javascript
    }

    // Metadata

    /// Info entry.
    pub fn info(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(|s| s.as_str())
    }

    /// All Info entries.
    pub fn info_entries(&self) -> &IndexMap<String, String> {
        &self.info
    }

    /// Set or, with `None`, remove an Info entry.
    pub fn set_info(&mut self, key: impl Into<String>, value: Option<&str>) {
        let key = key.into();
        match value {
            Some(v) => {
                self.info.insert(key, v.to_string());
            },
            None => {
                self.info.shift_remove(&key);
            },
        }
    }

    /// Document language.
    pub fn locale(&self) -> Option<&Locale> {
        self.locale.as_ref()
    }

    /// Set the document language.
    pub fn set_locale(&mut self, locale: Option<Locale>) {
        self.locale = locale;
    }

    /// XMP properties.
    pub fn xmp(&self) -> &XmpMetadata {
        &self.xmp
    }

    /// XMP properties, mutably.
    pub fn xmp_mut(&mut self) -> &mut XmpMetadata {
        &mut self.xmp
    }

    /// Generate the XMP packet for the current metadata.
    pub fn xmp_packet(&self) -> String {
        let language = self.locale.as_ref().map(|l| l.to_string());
        self.xmp.to_packet(&self.info, language.as_deref())
    }

    /// Replace metadata from an XMP packet. Info entries found in the
    /// packet overwrite existing ones.
    pub fn set_xmp_packet(&mut self, xml: &str) -> Result<()> {
        let parsed = XmpMetadata::parse(xml)?;
        for (k, v) in parsed.info {
            self.info.insert(k, v);
        }
        if let Some(language) = parsed.language {
            self.locale = Some(language.parse()?);
        }
        self.xmp = parsed.metadata;
        self.xmp.present = true;
        Ok(())
    }

    /// Output intents.
    pub fn output_intents(&self) -> &[OutputIntent] {
        &self.output_intents
    }

    /// Live list of output intents.
    pub fn output_intents_mut(&mut self) -> &mut Vec<OutputIntent> {
        &mut self.output_intents
    }

    // Layers, signatures, security

    /// Optional content layers.
    pub fn layers(&self) -> &[OptionalContentLayer] {
        &self.layers
    }

    /// Add a layer and return it for configuration.
    pub fn add_layer(&mut self, name: impl Into<String>) -> &mut OptionalContentLayer {
        let index = self.layers.len();
        self.layers.push(OptionalContentLayer::new(name));
        &mut self.layers[index]
    }

    /// Live list of layers.
    pub fn layers_mut(&mut self) -> &mut Vec<OptionalContentLayer> {
        &mut self.layers
    }

    /// Signature revisions, oldest first.
    pub fn signatures(&self) -> &[SignatureRevision] {
        &self.signatures
    }

    /// Record a signature. Fails if the field is not a signature field.
    pub fn add_signature(&mut self, revision: SignatureRevision) -> Result<()> {
        let index = self.signatures.len();
        match self.form.element_mut(&revision.field).map(|e| &mut e.kind) {
            Some(super::form::FieldKind::Signature { revision: slot }) => *slot = Some(index),
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "'{}' is not a signature field",
                    revision.field
                )))
            },
        }
        self.signatures.push(revision);
        Ok(())
    }

    /// Drop all signatures, leaving the signature fields unsigned.
    pub fn clear_signatures(&mut self) -> usize {
        for (_, element) in self.form.iter_mut() {
            if let super::form::FieldKind::Signature { revision } = &mut element.kind {
                *revision = None;
            }
        }
        std::mem::take(&mut self.signatures).len()
    }

    /// Encryption applied at render.
    pub fn encryption(&self) -> Option<&EncryptionSettings> {
        self.encryption.as_ref()
    }

    /// Set or remove encryption.
    pub fn set_encryption(&mut self, encryption: Option<EncryptionSettings>) {
        self.encryption = encryption;
    }

    /// Render options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render options, mutably.
    pub fn options_mut(&mut self) -> &mut RenderOptions {
        &mut self.options
    }

    // Structure

    /// Whether any page content is tagged.
    pub fn is_tagged(&self) -> bool {
        self.pages.iter().any(|p| p.is_tagged())
    }

    /// Logical structure rebuilt from the tags in page content.
    pub fn structure_tree(&self) -> StructureElement {
        structure::build(&self.pages)
    }

    /// Check the invariants that must hold before rendering: balanced
    /// page content and unique page ids.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for page in &self.pages {
            if !seen.insert(page.id()) {
                return Err(Error::state(format!("page {} appears more than once", page.id())));
            }
            page.check_balanced()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldKind;

    #[test]
    fn test_new_page_appends() {
        let mut doc = Document::new();
        doc.new_page(PageSize::A4);
        let id = doc.new_page(PageSize::Letter).id();
        assert_eq!(doc.pages().len(), 2);
        assert_eq!(doc.page_index(id), Some(1));
        assert_eq!(doc.page(1).unwrap().width(), 612.0);
    }

    #[test]
    fn test_live_views() {
        let mut doc = Document::new();
        doc.bookmarks_mut().push(Bookmark::new("Intro"));
        doc.embedded_files_mut()
            .insert("a.txt".into(), EmbeddedFile::new("a.txt", b"hi".to_vec()));
        doc.pages_mut().push(Page::new(PageSize::A5));
        assert_eq!(doc.bookmarks().len(), 1);
        assert_eq!(doc.embedded_files().len(), 1);
        assert_eq!(doc.pages().len(), 1);
    }

    #[test]
    fn test_moving_page_between_documents() {
        let mut a = Document::new();
        a.new_page(PageSize::A4);
        let mut b = Document::new();
        let page = a.remove_page(0).unwrap();
        let id = page.id();
        b.add_page(page).unwrap();
        assert!(a.pages().is_empty());
        assert_eq!(b.page_index(id), Some(0));
        let dup = b.pages()[0].clone();
        assert!(matches!(b.add_page(dup), Err(Error::StateMisuse(_))));
    }

    #[test]
    fn test_widgets_follow_field() {
        let mut doc = Document::new();
        doc.new_page(PageSize::A4);
        doc.form_mut().add_element("Name", FormElement::text()).unwrap();
        doc.add_widget("Name", 0, Rect::new(10.0, 10.0, 100.0, 20.0)).unwrap();
        assert_eq!(doc.pages()[0].annotations().len(), 1);
        assert!(doc.add_widget("Missing", 0, Rect::default()).is_err());

        doc.rename_field("Name", "FullName").unwrap();
        assert!(matches!(
            &doc.pages()[0].annotations()[0].kind,
            AnnotationKind::Widget { field } if field == "FullName"
        ));

        let removed = doc.remove_field("FullName").unwrap();
        assert_eq!(removed.widgets.len(), 1);
        assert!(doc.pages()[0].annotations().is_empty());
    }

    #[test]
    fn test_nest_bookmarks() {
        let mut doc = Document::new();
        let first = doc.new_page(PageSize::A4).id();
        doc.bookmarks_mut().push(Bookmark::new("One"));
        doc.bookmarks_mut().push(Bookmark::new("Two"));
        doc.nest_bookmarks("report.pdf");
        assert_eq!(doc.bookmarks().len(), 1);
        let root = &doc.bookmarks()[0];
        assert_eq!(root.title, "report.pdf");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.action.as_ref().and_then(|a| a.target_page()), Some(first));
    }

    #[test]
    fn test_signatures() {
        let mut doc = Document::new();
        doc.form_mut().add_element("Sig", FormElement::signature()).unwrap();
        doc.add_signature(SignatureRevision::new("Sig", vec![1, 2, 3])).unwrap();
        assert!(matches!(
            doc.form().element("Sig").map(|e| &e.kind),
            Some(FieldKind::Signature { revision: Some(0) })
        ));
        assert!(doc.add_signature(SignatureRevision::new("Nope", vec![])).is_err());
        assert_eq!(doc.clear_signatures(), 1);
        assert!(matches!(
            doc.form().element("Sig").map(|e| &e.kind),
            Some(FieldKind::Signature { revision: None })
        ));
    }

    #[test]
    fn test_xmp_packet_round_trip() {
        let mut doc = Document::new();
        doc.set_info("Title", Some("Annual report"));
        doc.set_locale(Some(Locale::new("en", Some("GB"))));
        let packet = doc.xmp_packet();

        let mut other = Document::new();
        other.set_xmp_packet(&packet).unwrap();
        assert_eq!(other.info("Title"), Some("Annual report"));
        assert_eq!(other.locale().map(|l| l.language()), Some("en"));
        assert!(other.xmp().present);
    }

    #[test]
    fn test_validate_rejects_unbalanced_and_duplicate_pages() {
        let mut doc = Document::new();
        doc.new_page(PageSize::A4).save();
        assert!(matches!(doc.validate(), Err(Error::StateMisuse(_))));
        doc.pages_mut()[0].restore().unwrap();
        assert!(doc.validate().is_ok());
        let copy = doc.pages()[0].clone();
        doc.pages_mut().push(copy);
        assert!(doc.validate().is_err());
    }
}
