//! Tag filter widget: a small set of free-text tags shown as removable chips.

use crate::util::escape_html;

/// What a keypress in the tag box did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagEntry {
  /// Whitespace-only input; nothing to do.
  Empty,
  /// Already present (exact, case-sensitive match); the input is still cleared.
  Duplicate,
  /// New tag with the chip id that was assigned to it.
  Added { chip_id: String },
}

#[derive(Clone, Debug)]
struct Tag {
  chip_id: String,
  value: String,
}

/// Insertion-ordered set of tags. Chip ids are never reused within a session,
/// so a stale remove click cannot hit a newer chip.
#[derive(Clone, Debug, Default)]
pub struct TagSet {
  tags: Vec<Tag>,
  next_id: u64,
}

impl TagSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.tags.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tags.is_empty()
  }

  pub fn contains(&self, value: &str) -> bool {
    self.tags.iter().any(|t| t.value == value)
  }

  pub fn values(&self) -> Vec<String> {
    self.tags.iter().map(|t| t.value.clone()).collect()
  }

  /// Add the trimmed input unless it is empty or already present.
  pub fn enter(&mut self, raw: &str) -> TagEntry {
    let value = raw.trim();
    if value.is_empty() {
      return TagEntry::Empty;
    }
    if self.contains(value) {
      return TagEntry::Duplicate;
    }
    self.next_id += 1;
    let chip_id = format!("tag-chip-{}", self.next_id);
    self.tags.push(Tag { chip_id: chip_id.clone(), value: value.to_string() });
    TagEntry::Added { chip_id }
  }

  /// Remove the tag behind a chip; returns the removed value.
  pub fn remove(&mut self, chip_id: &str) -> Option<String> {
    let pos = self.tags.iter().position(|t| t.chip_id == chip_id)?;
    Some(self.tags.remove(pos).value)
  }

  /// Chip markup for a tag; the remove button carries the chip id back.
  pub fn chip_html(&self, chip_id: &str) -> Option<String> {
    let tag = self.tags.iter().find(|t| t.chip_id == chip_id)?;
    Some(format!(
      r#"<span id="{id}" class="tag-chip">{text}<button type="button" class="tag-chip-remove" data-chip-id="{id}"><img src="/public/ui/x.svg" alt="delete icon" class="w-2 h-2"/></button></span>"#,
      id = tag.chip_id,
      text = escape_html(&tag.value),
    ))
  }
}
