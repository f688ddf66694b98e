//! Record → list-entry markup.
//!
//! Entries are built as a small owned [`Markup`] tree rather than by string
//! formatting. Text and attribute values are escaped on serialization, so a
//! scraped title such as `<script>` ends up as text, never as a tag.

use std::fmt::Write as _;

use pubsync_shared::{DocumentLayout, PublicationRecord};

/// Style applied to the title span.
pub const TITLE_STYLE: &str = "color: rgb(153, 0, 0);";
/// Style applied to the bracketed link span.
pub const LINK_STYLE: &str = "color: black;";
/// Style applied to the authors span.
pub const AUTHORS_STYLE: &str = "font-family: Times New Roman;";
/// Style applied to the venue and year span.
pub const VENUE_STYLE: &str = "font-family: Times New Roman,Times,serif;";

/// Target of the static link appended to highlight entries.
pub const HIGHLIGHT_LINK_HREF: &str = "publication.html";
/// Label of the static link appended to highlight entries.
pub const HIGHLIGHT_LINK_LABEL: &str = "more";

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

// ---------------------------------------------------------------------------
// Markup tree
// ---------------------------------------------------------------------------

/// A minimal HTML node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Element {
        tag: &'static str,
        attrs: Vec<(&'static str, String)>,
        children: Vec<Markup>,
    },
    Text(String),
}

impl Markup {
    /// Element with no attributes.
    pub fn element(tag: &'static str, children: Vec<Markup>) -> Self {
        Self::Element {
            tag,
            attrs: Vec::new(),
            children,
        }
    }

    /// Add an attribute (builder style). No-op on text nodes.
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.push((name, value.into()));
        }
        self
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn br() -> Self {
        Self::element("br", Vec::new())
    }

    fn styled_span(style: &str, children: Vec<Markup>) -> Self {
        Self::element("span", children).attr("style", style)
    }

    /// Serialize to an HTML string.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(&escape_text(text)),
            Self::Element {
                tag,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
                }
                out.push('>');

                if VOID_ELEMENTS.contains(tag) {
                    return;
                }

                for child in children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Entry templates
// ---------------------------------------------------------------------------

/// Title span, optional ` [pdf]` link, authors line, venue + year line.
fn entry_parts(record: &PublicationRecord) -> Vec<Markup> {
    let mut parts = vec![Markup::styled_span(
        TITLE_STYLE,
        vec![Markup::text(&record.title)],
    )];

    if let Some(url) = &record.url {
        parts.push(Markup::styled_span(
            LINK_STYLE,
            vec![
                Markup::text(" ["),
                Markup::element("a", vec![Markup::text("pdf")])
                    .attr("href", url)
                    .attr("target", "_blank"),
                Markup::text("]"),
            ],
        ));
    }

    let venue_year = if record.venue.is_empty() {
        record.year.clone()
    } else {
        format!("{} {}", record.venue, record.year)
    };

    parts.extend([
        Markup::br(),
        Markup::styled_span(AUTHORS_STYLE, vec![Markup::text(&record.authors)]),
        Markup::br(),
        Markup::styled_span(VENUE_STYLE, vec![Markup::text(venue_year)]),
    ]);

    parts
}

/// Ordered-list entry for the full proceedings list.
pub fn render_proceedings(record: &PublicationRecord) -> Markup {
    Markup::element("li", entry_parts(record))
}

/// Unordered-list entry for the highlights list: the proceedings entry plus
/// a static link to the full list.
pub fn render_highlight(record: &PublicationRecord) -> Markup {
    let mut parts = entry_parts(record);
    parts.push(Markup::br());
    parts.push(Markup::styled_span(
        LINK_STYLE,
        vec![
            Markup::text("["),
            Markup::element("a", vec![Markup::text(HIGHLIGHT_LINK_LABEL)])
                .attr("href", HIGHLIGHT_LINK_HREF),
            Markup::text("]"),
        ],
    ));
    Markup::element("li", parts)
}

/// Render one entry with the layout's template.
pub fn render_entry(layout: DocumentLayout, record: &PublicationRecord) -> Markup {
    match layout {
        DocumentLayout::Proceedings => render_proceedings(record),
        DocumentLayout::Highlights => render_highlight(record),
    }
}

/// Render a list body: one entry per record with a `<br>` between entries.
pub fn render_entries(layout: DocumentLayout, records: &[PublicationRecord]) -> Vec<Markup> {
    let mut nodes = Vec::with_capacity(records.len() * 2);
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            nodes.push(Markup::br());
        }
        nodes.push(render_entry(layout, record));
    }
    nodes
}

/// Serialize a rendered list body.
pub fn entries_html(nodes: &[Markup]) -> String {
    nodes.iter().map(Markup::to_html).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> PublicationRecord {
        PublicationRecord {
            title: title.into(),
            authors: "S. Baidya, M. Levorato".into(),
            venue: "IEEE INFOCOM".into(),
            year: "2020".into(),
            url: Some("https://example.org/a.pdf?x=1&y=2".into()),
            citations: Some(3),
        }
    }

    #[test]
    fn proceedings_entry_layout() {
        let html = render_proceedings(&record("Edge offloading")).to_html();
        assert_eq!(
            html,
            "<li><span style=\"color: rgb(153, 0, 0);\">Edge offloading</span>\
             <span style=\"color: black;\"> [<a href=\"https://example.org/a.pdf?x=1&amp;y=2\" target=\"_blank\">pdf</a>]</span>\
             <br><span style=\"font-family: Times New Roman;\">S. Baidya, M. Levorato</span>\
             <br><span style=\"font-family: Times New Roman,Times,serif;\">IEEE INFOCOM 2020</span></li>"
        );
    }

    #[test]
    fn missing_url_and_venue() {
        let mut rec = record("No link");
        rec.url = None;
        rec.venue = String::new();
        rec.year = "N/A".into();

        let html = render_proceedings(&rec).to_html();
        assert!(!html.contains("pdf"));
        assert!(html.contains(">N/A</span>"));
    }

    #[test]
    fn highlight_adds_placeholder_link() {
        let html = render_highlight(&record("Edge offloading")).to_html();
        assert!(html.starts_with("<li><span style=\"color: rgb(153, 0, 0);\">Edge offloading"));
        assert!(html.ends_with("[<a href=\"publication.html\">more</a>]</span></li>"));
    }

    #[test]
    fn scraped_markup_is_escaped() {
        let mut rec = record("<script>alert(\"x\")</script> & more");
        rec.authors = "<b>A</b>".into();
        rec.url = Some("\"><img src=x>".into());

        let html = render_proceedings(&rec).to_html();
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;script&gt;alert(\"x\")&lt;/script&gt; &amp; more"));
        assert!(html.contains("href=\"&quot;&gt;&lt;img src=x&gt;\""));
    }

    #[test]
    fn separator_between_entries_only() {
        let records = vec![record("a"), record("b"), record("c")];
        let nodes = render_entries(DocumentLayout::Proceedings, &records);

        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[1], Markup::br());
        assert_eq!(nodes[3], Markup::br());
        assert!(matches!(nodes.last(), Some(Markup::Element { tag: "li", .. })));

        let html = entries_html(&nodes);
        assert_eq!(html.matches("</li><br><li>").count(), 2);
        assert!(html.ends_with("</li>"));

        assert!(render_entries(DocumentLayout::Highlights, &[]).is_empty());
    }
}
