//! Locate a document's publication list and replace its entries.
//!
//! Anchor matching is a best-effort heuristic over hand-authored pages:
//! a heading is recognised by substrings of its text (proceedings) or by
//! declarations in its `style` attribute (highlights), and the list is the
//! first `<ol>`/`<ul>` that follows it in document order. When either is
//! missing the document is left alone; a list is never invented.

use std::sync::LazyLock;

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{Html, Node, Selector};
use tracing::{debug, instrument};

use pubsync_shared::{DocumentLayout, DocumentTarget, PubSyncError, Result};

use crate::render::{Markup, entries_html};

/// Substrings a proceedings heading must contain.
pub const PROCEEDINGS_HEADING_TERMS: &[&str] = &["Journals", "Conference"];

/// Style signature of the highlights heading unless overridden per document.
pub const DEFAULT_HIGHLIGHTS_STYLE: &str = "color: rgb(153, 0, 0);";

static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("heading selector is valid"));

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// How the anchor heading is recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorRule {
    /// Trimmed heading text contains every term (case-sensitive).
    TextContains(Vec<String>),
    /// The `style` attribute carries every declaration of the signature.
    StyleSignature(String),
}

impl AnchorRule {
    fn matches(&self, heading: scraper::ElementRef<'_>) -> bool {
        match self {
            Self::TextContains(terms) => {
                let text: String = heading.text().collect();
                let text = text.trim();
                terms.iter().all(|t| text.contains(t.as_str()))
            }
            Self::StyleSignature(signature) => heading
                .value()
                .attr("style")
                .is_some_and(|style| style_contains(style, signature)),
        }
    }
}

/// List element that holds the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Ordered,
    Unordered,
}

impl ContainerKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Ordered => "ol",
            Self::Unordered => "ul",
        }
    }
}

/// Anchor rule and container kind for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRule {
    pub anchor: AnchorRule,
    pub container: ContainerKind,
}

impl ReconcileRule {
    pub fn for_layout(layout: DocumentLayout, anchor_style: Option<&str>) -> Self {
        match layout {
            DocumentLayout::Proceedings => Self {
                anchor: AnchorRule::TextContains(
                    PROCEEDINGS_HEADING_TERMS.iter().map(|t| t.to_string()).collect(),
                ),
                container: ContainerKind::Ordered,
            },
            DocumentLayout::Highlights => Self {
                anchor: AnchorRule::StyleSignature(
                    anchor_style.unwrap_or(DEFAULT_HIGHLIGHTS_STYLE).to_string(),
                ),
                container: ContainerKind::Unordered,
            },
        }
    }

    pub fn for_target(target: &DocumentTarget) -> Self {
        Self::for_layout(target.layout, target.anchor_style.as_deref())
    }
}

/// Split a style attribute into normalized `property:value` declarations.
fn declarations(style: &str) -> Vec<String> {
    style
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim();
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            (!property.is_empty()).then(|| format!("{property}:{value}"))
        })
        .collect()
}

/// Whether `style` carries every declaration in `signature`.
pub fn style_contains(style: &str, signature: &str) -> bool {
    let wanted = declarations(signature);
    if wanted.is_empty() {
        return false;
    }
    let present = declarations(style);
    wanted.iter().all(|d| present.contains(d))
}

// ---------------------------------------------------------------------------
// Anchor search
// ---------------------------------------------------------------------------

/// Heading and list container located in a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentAnchor {
    pub heading: NodeId,
    pub container: NodeId,
}

/// Find the first matching heading and the first list of the expected kind
/// after it.
pub fn locate_anchor(doc: &Html, rule: &ReconcileRule) -> Result<DocumentAnchor> {
    let heading = doc
        .select(&HEADINGS)
        .find(|h| rule.anchor.matches(*h))
        .map(|h| h.id())
        .ok_or_else(|| PubSyncError::anchor_not_found(describe_anchor(&rule.anchor)))?;

    let tag = rule.container.tag();
    let container = doc
        .tree
        .root()
        .descendants()
        .skip_while(|node| node.id() != heading)
        .skip(1)
        .find(|node| matches!(node.value(), Node::Element(el) if el.name() == tag))
        .map(|node| node.id())
        .ok_or_else(|| {
            PubSyncError::anchor_not_found(format!(
                "no <{tag}> follows the {}",
                describe_anchor(&rule.anchor)
            ))
        })?;

    Ok(DocumentAnchor { heading, container })
}

fn describe_anchor(anchor: &AnchorRule) -> String {
    match anchor {
        AnchorRule::TextContains(terms) => format!("heading containing {}", terms.join(" + ")),
        AnchorRule::StyleSignature(sig) => format!("heading styled '{sig}'"),
    }
}

// ---------------------------------------------------------------------------
// Replace
// ---------------------------------------------------------------------------

/// Replace the located list's children with `entries` and return the
/// re-serialized document.
///
/// Fails with [`PubSyncError::AnchorNotFound`] when the heading or its list
/// is missing; the caller must then leave the file untouched.
#[instrument(skip_all, fields(container = rule.container.tag(), entries = entries.len()))]
pub fn reconcile(document: &str, rule: &ReconcileRule, entries: &[Markup]) -> Result<String> {
    let mut doc = Html::parse_document(document);
    let anchor = locate_anchor(&doc, rule)?;

    let removed = clear_children(&mut doc.tree, anchor.container);

    let fragment = Html::parse_fragment(&entries_html(entries));
    for child in fragment.root_element().children() {
        graft(&mut doc.tree, anchor.container, child);
    }

    debug!(removed, "list entries replaced");
    Ok(doc.html())
}

fn clear_children(tree: &mut Tree<Node>, parent: NodeId) -> usize {
    let mut removed = 0;
    while let Some(child) = tree
        .get(parent)
        .and_then(|node| node.first_child())
        .map(|node| node.id())
    {
        if let Some(mut node) = tree.get_mut(child) {
            node.detach();
        }
        removed += 1;
    }
    removed
}

/// Deep-copy `source` from another tree under `parent`.
fn graft(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) {
    let Some(mut parent_node) = tree.get_mut(parent) else {
        return;
    };
    let id = parent_node.append(source.value().clone()).id();
    for child in source.children() {
        graft(tree, id, child);
    }
}
