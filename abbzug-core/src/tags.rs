//! Per-section tag index.
//!
//! Tags are discovered while a section's posts are loaded and finalized
//! (slug, URL, output path) only once every section has been preloaded.
//! Two names that slugify to the same slug share one output file; the
//! page rendered last wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Section;
use crate::content::Post;

/// URL-safe, lowercase, `-`-separated form of a tag name.
pub fn slugify(name: &str) -> String {
    let ascii = deunicode::deunicode(name);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch != '\'' && ch != '"' {
            pending_separator = true;
        }
    }

    slug
}

/// Where a finalized tag page lives.
#[derive(Debug, Clone, PartialEq)]
pub struct TagPage {
    pub slug: String,
    pub url: String,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Tag {
    pub name: String,
    /// Indices into the owning section's post list.
    pub members: Vec<usize>,
    pub page: Option<TagPage>,
}

#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    tags: BTreeMap<String, Tag>,
}

impl TagIndex {
    /// Collect tag membership for one section's posts.
    pub fn discover(posts: &[Post]) -> Self {
        let mut index = Self::default();
        for (i, post) in posts.iter().enumerate() {
            for name in &post.tags {
                let tag = index.tags.entry(name.clone()).or_insert_with(|| Tag {
                    name: name.clone(),
                    members: Vec::new(),
                    page: None,
                });
                if !tag.members.contains(&i) {
                    tag.members.push(i);
                }
            }
        }
        index
    }

    /// Assign slug, URL and output path to every tag of a section that has
    /// tag pages enabled. Leaves the index untouched otherwise.
    pub fn finalize(&mut self, section: &Section, base_url: &str, output_root: &Path) {
        let Some((_, subdir)) = section.tag_pages() else {
            return;
        };

        let out_dir = output_root.join(&section.location).join(subdir);
        for tag in self.tags.values_mut() {
            let slug = slugify(&tag.name);
            let path = join_url_path(&[section.location.as_str(), subdir, slug.as_str()]);
            let url = format!("{base_url}{path}/");
            tag.page = Some(TagPage {
                output_path: out_dir.join(&slug).join("index.html"),
                url,
                slug,
            });
        }
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Template-facing view of every tag, resolving members against `posts`.
    pub fn views<'a>(&'a self, posts: &'a [Post]) -> BTreeMap<&'a str, TagView<'a>> {
        self.tags
            .iter()
            .map(|(name, tag)| (name.as_str(), tag.view(posts)))
            .collect()
    }
}

impl Tag {
    pub fn view<'a>(&'a self, posts: &'a [Post]) -> TagView<'a> {
        TagView {
            name: &self.name,
            slug: self.page.as_ref().map(|p| p.slug.as_str()),
            url: self.page.as_ref().map(|p| p.url.as_str()),
            posts: self.members.iter().filter_map(|&i| posts.get(i)).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagView<'a> {
    pub name: &'a str,
    pub slug: Option<&'a str>,
    pub url: Option<&'a str>,
    pub posts: Vec<&'a Post>,
}

/// Join non-empty path segments with single slashes.
fn join_url_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn post(name: &str, tags: &[&str]) -> Post {
        Post {
            metadata: Map::new(),
            content: String::new(),
            input_path: PathBuf::from(format!("{name}.md")),
            output_path: PathBuf::from(format!("{name}.html")),
            url: format!("/{name}.html"),
            reading_time: 0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn section(tag_template: Option<&str>, tag_subdir: Option<&str>) -> Section {
        Section {
            name: "/blog".into(),
            location: "blog".into(),
            raw: toml::Table::new(),
            index_template: "index.html".into(),
            posts: None,
            tag_template: tag_template.map(Into::into),
            tag_subdir: tag_subdir.map(Into::into),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Rust"), "rust");
        assert_eq!(slugify("  Static Site  Generators! "), "static-site-generators");
        assert_eq!(slugify("don't panic"), "dont-panic");
        assert_eq!(slugify("Þórsmörk"), "thorsmork");
        assert_eq!(slugify("c++/c#"), "c-c");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_discover_groups_posts() {
        let posts = vec![post("a", &["go", "infra"]), post("b", &["go"]), post("c", &[])];
        let index = TagIndex::discover(&posts);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("go").unwrap().members, vec![0, 1]);
        assert_eq!(index.get("infra").unwrap().members, vec![0]);
        assert!(index.iter().all(|t| t.page.is_none()));
    }

    #[test]
    fn test_duplicate_tag_on_one_post_counts_once() {
        let posts = vec![post("a", &["go", "go"])];
        let index = TagIndex::discover(&posts);
        assert_eq!(index.get("go").unwrap().members, vec![0]);
    }

    #[test]
    fn test_finalize_computes_pages() {
        let posts = vec![post("a", &["Web Dev"])];
        let mut index = TagIndex::discover(&posts);
        index.finalize(&section(Some("tag.html"), Some("tags/")), "/", Path::new("out"));

        let page = index.get("Web Dev").unwrap().page.clone().unwrap();
        assert_eq!(page.slug, "web-dev");
        assert_eq!(page.url, "/blog/tags/web-dev/");
        assert_eq!(page.output_path, Path::new("out/blog/tags/web-dev/index.html"));
    }

    #[test]
    fn test_finalize_needs_template_and_subdir() {
        let posts = vec![post("a", &["go"])];
        for section in [section(Some("tag.html"), None), section(None, Some("tags/"))] {
            let mut index = TagIndex::discover(&posts);
            index.finalize(&section, "/", Path::new("out"));
            assert!(index.get("go").unwrap().page.is_none());
        }
    }

    #[test]
    fn test_colliding_slugs_share_output_path() {
        let posts = vec![post("a", &["Go"]), post("b", &["go"])];
        let mut index = TagIndex::discover(&posts);
        index.finalize(&section(Some("tag.html"), Some("tags")), "/", Path::new("out"));

        let paths: Vec<_> = index
            .iter()
            .map(|t| t.page.as_ref().unwrap().output_path.clone())
            .collect();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], paths[1]);
    }

    #[test]
    fn test_views_resolve_members() {
        let posts = vec![post("a", &["go"]), post("b", &["go"])];
        let index = TagIndex::discover(&posts);
        let views = index.views(&posts);

        let go = &views["go"];
        assert_eq!(go.posts.len(), 2);
        assert_eq!(go.posts[1].url, "/b.html");
        assert!(go.url.is_none());
    }
}
