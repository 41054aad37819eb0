//! Query-term highlighting over a rendered HTML fragment.
//!
//! The fragment is parsed with `scraper` (html5ever) and written back out
//! node by node. Terms are matched against the decoded text of each text
//! node, so `&#39;` or `&amp;` in the source match `'` and `&` in the query,
//! and a match can never land inside a character reference. Tags, attributes,
//! comments and the bodies of `<script>`/`<style>` are never marked.
//!
//! Output is the re-serialized tree: attributes come back double-quoted and
//! text is re-escaped, so the markup may differ from the input byte for byte
//! while rendering the same.
//!
//! Running the highlighter twice over the same fragment wraps the existing
//! marks again; call it once per freshly rendered fragment.

use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Node};

const MARK_OPEN: &str = r#"<span class="highlight-match">"#;
const MARK_CLOSE: &str = "</span>";

const VOID_ELEMENTS: [&str; 13] = [
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// How the text children of an element are written out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TextMode {
  /// Ordinary flow text: escaped and searched for terms.
  Marked,
  /// Escapable raw text (`title`, `textarea`): escaped, never marked.
  Escaped,
  /// Raw text (`script`, `style`, ...): written verbatim.
  Raw,
}

fn text_mode(element: &str) -> TextMode {
  match element {
    "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext" => TextMode::Raw,
    "title" | "textarea" => TextMode::Escaped,
    _ => TextMode::Marked,
  }
}

#[derive(Clone, Debug)]
pub struct Highlighter {
  pattern: Regex,
}

impl Highlighter {
  /// Build a case-insensitive alternation over the whitespace-separated terms
  /// of `query`. Returns `None` when the query has no terms.
  pub fn new(query: &str) -> Option<Self> {
    let mut terms: Vec<&str> = query.split_whitespace().collect();
    if terms.is_empty() {
      return None;
    }
    // Leftmost-first alternation: longer terms must come first to win overlaps.
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    terms.dedup();
    let alternation = terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    let pattern = RegexBuilder::new(&format!("(?:{alternation})"))
      .case_insensitive(true)
      .build()
      .ok()?;
    Some(Self { pattern })
  }

  /// Parse `html` as a body fragment and write it back with every match in
  /// its text nodes wrapped.
  pub fn apply(&self, html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len() + 64);
    // parse_fragment hangs the nodes under a synthetic <html> root.
    self.write_children(fragment.root_element(), TextMode::Marked, &mut out);
    out
  }

  fn write_children(&self, parent: ElementRef<'_>, mode: TextMode, out: &mut String) {
    for child in parent.children() {
      match child.value() {
        Node::Text(text) => match mode {
          TextMode::Marked => self.push_marked(out, text),
          TextMode::Escaped => push_escaped_text(out, text),
          TextMode::Raw => out.push_str(text),
        },
        Node::Element(_) => {
          if let Some(element) = ElementRef::wrap(child) {
            self.write_element(element, out);
          }
        }
        Node::Comment(comment) => {
          out.push_str("<!--");
          out.push_str(comment);
          out.push_str("-->");
        }
        _ => {}
      }
    }
  }

  fn write_element(&self, element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
      out.push(' ');
      out.push_str(attr);
      out.push_str("=\"");
      push_escaped_attr(out, value);
      out.push('"');
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&name) {
      return;
    }
    self.write_children(element, text_mode(name), out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
  }

  fn push_marked(&self, out: &mut String, text: &str) {
    let mut last = 0;
    for m in self.pattern.find_iter(text) {
      push_escaped_text(out, &text[last..m.start()]);
      out.push_str(MARK_OPEN);
      push_escaped_text(out, m.as_str());
      out.push_str(MARK_CLOSE);
      last = m.end();
    }
    push_escaped_text(out, &text[last..]);
  }
}

fn push_escaped_text(out: &mut String, text: &str) {
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '\u{a0}' => out.push_str("&nbsp;"),
      c => out.push(c),
    }
  }
}

fn push_escaped_attr(out: &mut String, value: &str) {
  for c in value.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '"' => out.push_str("&quot;"),
      '\u{a0}' => out.push_str("&nbsp;"),
      c => out.push(c),
    }
  }
}

/// Highlight `query` terms in `html`; returns the fragment unchanged when the
/// query is blank.
pub fn highlight_words(html: &str, query: &str) -> String {
  match Highlighter::new(query) {
    Some(h) => h.apply(html),
    None => html.to_string(),
  }
}
