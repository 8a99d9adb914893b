use std::collections::HashSet;

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Score of a control that must never receive a value.
pub const NEVER_MATCH: i32 = -1;

const SCORE_CANONICAL_NAME: i32 = 100;
const SCORE_EXACT_LABEL: i32 = 80;
const SCORE_NAME_PREFIX: i32 = 20;
const SCORE_TOKENS: i32 = 10;

const CANONICAL_NAME_PREFIX: &str = "form[";
const CONTROL_SELECTOR: &str = "input, textarea, select, button";
const FIELD_WRAPPER_SELECTOR: &str =
    "[data-field], .sqs-field, .form-item, .product-form-field, .field, .form-wrapper";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Human-readable field titles; the first one is the primary label.
    pub labels: Vec<String>,
    /// Fallback tokens that must all appear in the control's metadata.
    pub tokens: Vec<String>,
    /// Roots of modals, lightboxes and quick views searched besides the document.
    pub modal_selectors: Vec<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            labels: vec!["Fabric Print".to_string()],
            tokens: vec!["fabric".to_string(), "print".to_string()],
            modal_selectors: [
                ".sqs-add-to-cart-lightbox",
                ".sqs-modal-lightbox",
                ".ProductItem-quickView",
                "[class*=\"QuickView\"]",
                "div[role=\"dialog\"]",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatcherError {
    #[error("at least one field label is required")]
    MissingLabel,
    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Address of a control inside one document snapshot: the element-child
/// index path from the document root. `id` and `name` must still match when
/// the locator is resolved against a later snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldLocator {
    pub path: Vec<usize>,
    pub id: Option<String>,
    pub name: Option<String>,
}

impl FieldLocator {
    fn of(element: ElementRef<'_>) -> Self {
        Self {
            path: element_path(*element),
            id: element.value().attr("id").map(ToOwned::to_owned),
            name: element.value().attr("name").map(ToOwned::to_owned),
        }
    }

    /// Finds the element this locator points at in `document`, if it still exists.
    pub fn resolve<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        let mut current = document.tree.root();
        for &index in &self.path {
            current = current
                .children()
                .filter(|child| child.value().is_element())
                .nth(index)?;
        }
        ElementRef::wrap(current)
    }

    /// Like [`FieldLocator::resolve`], but only yields a free-text control
    /// whose `id` and `name` are the ones recorded when the locator was taken.
    pub fn resolve_writable<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        let element = self.resolve(document)?;
        let value = element.value();
        let kind = value.attr("type").unwrap_or_default().to_ascii_lowercase();
        let same_control = value.attr("id") == self.id.as_deref()
            && value.attr("name") == self.name.as_deref();
        let writable = is_writable(&value.name().to_ascii_lowercase(), &kind);
        (same_control && writable).then_some(element)
    }
}

/// Metadata gathered for one form control during a matching pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCandidate {
    pub locator: FieldLocator,
    pub tag: String,
    pub kind: String,
    pub label: String,
    pub name: String,
    pub aria_label: String,
    pub placeholder: String,
    pub container_title: String,
    pub score: i32,
}

pub struct FieldMatcher {
    primary_label: String,
    canonical_name: String,
    tokens: Vec<String>,
    controls: Selector,
    labels: Selector,
    wrappers: Selector,
    modals: Vec<Selector>,
}

impl FieldMatcher {
    pub fn new(config: MatcherConfig) -> Result<Self, MatcherError> {
        let primary = config
            .labels
            .first()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .ok_or(MatcherError::MissingLabel)?;
        let modals = config
            .modal_selectors
            .iter()
            .map(|selector| parse_selector(selector))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            primary_label: normalize(primary),
            canonical_name: normalize(&format!("{CANONICAL_NAME_PREFIX}{primary}]")),
            tokens: config
                .tokens
                .iter()
                .map(|token| normalize(token))
                .filter(|token| !token.is_empty())
                .collect(),
            controls: parse_selector(CONTROL_SELECTOR)?,
            labels: parse_selector("label")?,
            wrappers: parse_selector(FIELD_WRAPPER_SELECTOR)?,
            modals,
        })
    }

    /// The document root followed by every modal root currently present.
    pub fn scopes<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let mut scopes = vec![document.root_element()];
        let mut seen = HashSet::new();
        for selector in &self.modals {
            for modal in document.select(selector) {
                if seen.insert(modal.id()) {
                    scopes.push(modal);
                }
            }
        }
        scopes
    }

    /// Every control in `scope`, scored, in document order.
    pub fn candidates(&self, scope: ElementRef<'_>) -> Vec<FieldCandidate> {
        scope
            .select(&self.controls)
            .map(|control| {
                let attr = |name: &str| control.value().attr(name).unwrap_or_default().to_string();
                let mut candidate = FieldCandidate {
                    locator: FieldLocator::of(control),
                    tag: control.value().name().to_ascii_lowercase(),
                    kind: attr("type").to_ascii_lowercase(),
                    label: self.label_for(scope, control),
                    name: attr("name"),
                    aria_label: attr("aria-label"),
                    placeholder: attr("placeholder"),
                    container_title: closest_attr(control, "data-title").unwrap_or_default(),
                    score: NEVER_MATCH,
                };
                candidate.score = self.score(&candidate);
                candidate
            })
            .collect()
    }

    pub fn score(&self, candidate: &FieldCandidate) -> i32 {
        if !is_writable(&candidate.tag, &candidate.kind) {
            return NEVER_MATCH;
        }
        let name = normalize(&candidate.name);
        let label = normalize(&candidate.label);
        let aria = normalize(&candidate.aria_label);
        let title = normalize(&candidate.container_title);

        let mut score = 0;
        if name == self.canonical_name {
            score += SCORE_CANONICAL_NAME;
        }
        if [&label, &title, &aria]
            .iter()
            .any(|text| **text == self.primary_label)
        {
            score += SCORE_EXACT_LABEL;
        }
        if name.starts_with(CANONICAL_NAME_PREFIX) {
            score += SCORE_NAME_PREFIX;
        }
        if !self.tokens.is_empty() {
            let bag = format!("{label} | {name} | {aria} | {title}");
            if self.tokens.iter().all(|token| bag.contains(token.as_str())) {
                score += SCORE_TOKENS;
            }
        }
        score
    }

    /// Highest-scoring control in `scope`; ties go to the earliest in DOM order.
    pub fn best_in_scope(&self, scope: ElementRef<'_>) -> Option<FieldCandidate> {
        let mut scored: Vec<FieldCandidate> = self
            .candidates(scope)
            .into_iter()
            .filter(|candidate| candidate.score > 0)
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.into_iter().next()
    }

    /// Best control of each active scope in `html`, without duplicates.
    pub fn targets(&self, html: &str) -> Vec<FieldCandidate> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        self.scopes(&document)
            .into_iter()
            .filter_map(|scope| self.best_in_scope(scope))
            .filter(|candidate| seen.insert(candidate.locator.path.clone()))
            .collect()
    }

    fn label_for(&self, scope: ElementRef<'_>, control: ElementRef<'_>) -> String {
        if let Some(id) = control.value().attr("id").filter(|id| !id.is_empty()) {
            let by_for = scope
                .select(&self.labels)
                .find(|label| label.value().attr("for") == Some(id));
            if let Some(label) = by_for {
                return element_text(label);
            }
        }
        std::iter::once(control)
            .chain(control.ancestors().filter_map(ElementRef::wrap))
            .find(|element| self.wrappers.matches(element))
            .and_then(|wrapper| wrapper.select(&self.labels).next())
            .map(element_text)
            .unwrap_or_default()
    }
}

/// Only free-text controls may be written; buttons, checkboxes, file inputs
/// and selects never are.
pub(crate) fn is_writable(tag: &str, kind: &str) -> bool {
    match tag {
        "textarea" => true,
        "input" => matches!(kind.trim(), "" | "text" | "search"),
        _ => false,
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn closest_attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find_map(|el| el.value().attr(name))
        .map(ToOwned::to_owned)
}

fn element_path(node: NodeRef<'_, Node>) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = node;
    while let Some(parent) = current.parent() {
        let index = parent
            .children()
            .filter(|child| child.value().is_element())
            .position(|child| child.id() == current.id())
            .unwrap_or_default();
        path.push(index);
        current = parent;
    }
    path.reverse();
    path
}

fn parse_selector(selector: &str) -> Result<Selector, MatcherError> {
    Selector::parse(selector).map_err(|err| MatcherError::InvalidSelector {
        selector: selector.to_string(),
        message: err.to_string(),
    })
}
