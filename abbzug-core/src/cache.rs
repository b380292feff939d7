use std::collections::BTreeMap;
use std::path::Path;

use crate::config::Section;
use crate::content::Post;
use crate::tags::{TagIndex, TagView};

/// Posts and tag indexes of every section, keyed by section location.
///
/// Filled during preload and read by every render afterwards, so an index
/// page in one section can list posts from any other.
#[derive(Debug, Default)]
pub struct ContentCache {
    posts: BTreeMap<String, Vec<Post>>,
    tags: BTreeMap<String, TagIndex>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a section's posts and discover its tags.
    pub fn insert_section(&mut self, location: &str, posts: Vec<Post>) {
        self.tags.insert(location.to_string(), TagIndex::discover(&posts));
        self.posts.insert(location.to_string(), posts);
    }

    pub fn posts(&self, location: &str) -> &[Post] {
        self.posts.get(location).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn tags(&self, location: &str) -> Option<&TagIndex> {
        self.tags.get(location)
    }

    pub fn all_posts(&self) -> &BTreeMap<String, Vec<Post>> {
        &self.posts
    }

    pub fn post_count(&self) -> usize {
        self.posts.values().map(Vec::len).sum()
    }

    /// Finalize the tag index of `section`, see [`TagIndex::finalize`].
    pub fn finalize_tags(&mut self, section: &Section, base_url: &str, output_root: &Path) {
        if let Some(index) = self.tags.get_mut(&section.location) {
            index.finalize(section, base_url, output_root);
        }
    }

    pub fn tag_views(&self, location: &str) -> BTreeMap<&str, TagView<'_>> {
        self.tags
            .get(location)
            .map(|index| index.views(self.posts(location)))
            .unwrap_or_default()
    }

    pub fn all_tag_views(&self) -> BTreeMap<&str, BTreeMap<&str, TagView<'_>>> {
        self.tags
            .keys()
            .map(|location| (location.as_str(), self.tag_views(location)))
            .collect()
    }
}
