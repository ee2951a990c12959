use crate::utils::trim_and_clean_text;
use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// Tags whose text never reaches the rendered page.
const INVISIBLE_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "svg"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("Element {0:?} does not belong to this document")]
    UnknownElement(ElementId),
    #[error("Element {0:?} is not a file input")]
    NotFileInput(ElementId),
}

/// Handle to one element. The index is the element's position in document order,
/// so comparing handles compares document positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Input,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub target: ElementId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// The slice of the DOM API the detection and fill logic relies on.
///
/// Everything above this trait only talks to pages through it, so the same
/// heuristics run against a parsed HTML fixture or any other implementation.
pub trait Dom {
    /// URL of the page the document was loaded from.
    fn location(&self) -> &Url;

    /// Elements matching `selector`, in document order. With a scope only the
    /// scope's descendants are considered, never the scope itself.
    fn query_selector_all(
        &self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> Result<Vec<ElementId>, DomError>;

    fn query_selector(
        &self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> Result<Option<ElementId>, DomError> {
        Ok(self.query_selector_all(scope, selector)?.into_iter().next())
    }

    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, element: ElementId, selector: &str) -> Result<Option<ElementId>, DomError>;

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Lowercase tag name, empty for unknown handles.
    fn tag_name(&self, element: ElementId) -> String;

    fn attr(&self, element: ElementId, name: &str) -> Option<String>;

    fn text_content(&self, element: ElementId) -> String;

    /// Rendered text only, whitespace collapsed.
    fn visible_text(&self, element: ElementId) -> String {
        trim_and_clean_text(&self.text_content(element))
    }

    /// Current value of a form control.
    fn value(&self, element: ElementId) -> String;

    fn set_value(&mut self, element: ElementId, value: &str);

    fn dispatch_event(&mut self, element: ElementId, kind: EventKind);

    /// Replaces the file list of an `<input type="file">`.
    fn set_files(&mut self, element: ElementId, files: Vec<AttachedFile>) -> Result<(), DomError>;

    fn has_files(&self, element: ElementId) -> bool;
}

/// Value an `<option>` submits: its `value` attribute, else its trimmed text.
pub fn option_value<D: Dom + ?Sized>(dom: &D, option: ElementId) -> String {
    dom.attr(option, "value")
        .unwrap_or_else(|| dom.text_content(option).trim().to_string())
}

/// Lowercased `type` attribute, defaulting to "text" like browsers do.
pub fn input_type<D: Dom + ?Sized>(dom: &D, input: ElementId) -> String {
    dom.attr(input, "type")
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "text".to_string())
}

/// In-memory document: an immutable html5ever parse tree plus the mutable
/// state a page script would change (control values, file lists, events).
pub struct HtmlDocument {
    html: Html,
    location: Url,
    nodes: Vec<NodeId>,
    positions: HashMap<NodeId, ElementId>,
    values: HashMap<ElementId, String>,
    files: HashMap<ElementId, Vec<AttachedFile>>,
    events: Vec<DomEvent>,
}

impl HtmlDocument {
    pub fn parse(source: &str, location: Url) -> Self {
        let html = Html::parse_document(source);
        let nodes: Vec<NodeId> = html
            .tree
            .root()
            .descendants()
            .filter(|node| node.value().is_element())
            .map(|node| node.id())
            .collect();
        let positions = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (*node, ElementId(index)))
            .collect();

        HtmlDocument {
            html,
            location,
            nodes,
            positions,
            values: HashMap::new(),
            files: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.nodes.len()
    }

    /// Every event dispatched so far, in dispatch order.
    pub fn events(&self) -> &[DomEvent] {
        &self.events
    }

    pub fn events_for(&self, element: ElementId) -> Vec<EventKind> {
        self.events
            .iter()
            .filter(|event| event.target == element)
            .map(|event| event.kind)
            .collect()
    }

    pub fn files(&self, element: ElementId) -> &[AttachedFile] {
        self.files.get(&element).map(Vec::as_slice).unwrap_or(&[])
    }

    /// File inputs that received files, in document order.
    pub fn attached_files(&self) -> Vec<(ElementId, &[AttachedFile])> {
        let mut attached: Vec<(ElementId, &[AttachedFile])> = self
            .files
            .iter()
            .map(|(id, files)| (*id, files.as_slice()))
            .collect();
        attached.sort_by_key(|(id, _)| *id);
        attached
    }

    /// Controls whose value was written after parsing, in document order.
    pub fn written_values(&self) -> Vec<(ElementId, &str)> {
        let mut written: Vec<(ElementId, &str)> = self
            .values
            .iter()
            .map(|(id, value)| (*id, value.as_str()))
            .collect();
        written.sort_by_key(|(id, _)| *id);
        written
    }

    /// Short CSS-like description such as `input#email[name=email]`.
    pub fn describe(&self, element: ElementId) -> String {
        let Some(el) = self.element(element) else {
            return format!("{element:?}");
        };
        let mut description = el.value().name().to_string();
        if let Some(id) = el.value().attr("id").filter(|id| !id.is_empty()) {
            description.push('#');
            description.push_str(id);
        }
        if let Some(name) = el.value().attr("name").filter(|name| !name.is_empty()) {
            description.push_str(&format!("[name={name}]"));
        }
        description
    }

    fn element(&self, element: ElementId) -> Option<ElementRef<'_>> {
        self.nodes
            .get(element.0)
            .and_then(|node| self.html.tree.get(*node))
            .and_then(ElementRef::wrap)
    }

    fn element_id(&self, node: NodeId) -> Option<ElementId> {
        self.positions.get(&node).copied()
    }

    fn parse_selector(selector: &str) -> Result<Selector, DomError> {
        Selector::parse(selector).map_err(|e| DomError::InvalidSelector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })
    }

    fn initial_value(&self, el: ElementRef<'_>) -> String {
        match el.value().name() {
            "textarea" => el.text().collect(),
            "select" => {
                let options: Vec<ElementRef<'_>> = el
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| child.value().name() == "option")
                    .collect();
                options
                    .iter()
                    .find(|option| option.value().attr("selected").is_some())
                    .or_else(|| options.first())
                    .map(|option| match option.value().attr("value") {
                        Some(value) => value.to_string(),
                        None => option.text().collect::<String>().trim().to_string(),
                    })
                    .unwrap_or_default()
            }
            _ => el.value().attr("value").unwrap_or_default().to_string(),
        }
    }

    fn collect_visible_text(node: NodeRef<'_, Node>, out: &mut String) {
        for child in node.children() {
            match child.value() {
                Node::Text(text) => {
                    out.push_str(text);
                    out.push(' ');
                }
                Node::Element(element) if !INVISIBLE_TAGS.contains(&element.name()) => {
                    Self::collect_visible_text(child, out);
                }
                _ => {}
            }
        }
    }
}

impl Dom for HtmlDocument {
    fn location(&self) -> &Url {
        &self.location
    }

    fn query_selector_all(
        &self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> Result<Vec<ElementId>, DomError> {
        let selector = Self::parse_selector(selector)?;
        let matches = match scope {
            Some(scope) => {
                let root = self.element(scope).ok_or(DomError::UnknownElement(scope))?;
                root.select(&selector)
                    .filter(|el| el.id() != root.id())
                    .filter_map(|el| self.element_id(el.id()))
                    .collect()
            }
            None => self
                .html
                .select(&selector)
                .filter_map(|el| self.element_id(el.id()))
                .collect(),
        };
        Ok(matches)
    }

    fn closest(&self, element: ElementId, selector: &str) -> Result<Option<ElementId>, DomError> {
        let selector = Self::parse_selector(selector)?;
        let start = self
            .element(element)
            .ok_or(DomError::UnknownElement(element))?;

        let found = std::iter::once(*start)
            .chain(start.ancestors())
            .filter_map(ElementRef::wrap)
            .find(|candidate| selector.matches(candidate));

        Ok(found.and_then(|el| self.element_id(el.id())))
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.element(element)?
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(|parent| self.element_id(parent.id()))
    }

    fn tag_name(&self, element: ElementId) -> String {
        self.element(element)
            .map(|el| el.value().name().to_ascii_lowercase())
            .unwrap_or_default()
    }

    fn attr(&self, element: ElementId, name: &str) -> Option<String> {
        self.element(element)?
            .value()
            .attr(name)
            .map(str::to_string)
    }

    fn text_content(&self, element: ElementId) -> String {
        self.element(element)
            .map(|el| el.text().collect())
            .unwrap_or_default()
    }

    fn visible_text(&self, element: ElementId) -> String {
        let Some(el) = self.element(element) else {
            return String::new();
        };
        let mut text = String::new();
        Self::collect_visible_text(*el, &mut text);
        trim_and_clean_text(&text)
    }

    fn value(&self, element: ElementId) -> String {
        if let Some(value) = self.values.get(&element) {
            return value.clone();
        }
        self.element(element)
            .map(|el| self.initial_value(el))
            .unwrap_or_default()
    }

    fn set_value(&mut self, element: ElementId, value: &str) {
        self.values.insert(element, value.to_string());
    }

    fn dispatch_event(&mut self, element: ElementId, kind: EventKind) {
        self.events.push(DomEvent {
            target: element,
            kind,
        });
    }

    fn set_files(&mut self, element: ElementId, files: Vec<AttachedFile>) -> Result<(), DomError> {
        let el = self
            .element(element)
            .ok_or(DomError::UnknownElement(element))?;
        let is_file_input = el.value().name() == "input"
            && el
                .value()
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("file"));
        if !is_file_input {
            return Err(DomError::NotFileInput(element));
        }
        self.files.insert(element, files);
        Ok(())
    }

    fn has_files(&self, element: ElementId) -> bool {
        !self.files(element).is_empty()
    }
}
