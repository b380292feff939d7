use std::fs;
use std::path::{Path, PathBuf};

use abbzug_core::{BuildError, ConfigError, SiteBuilder, build_site};
use tempfile::TempDir;

fn site(config: &str, files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("site.toml"), config).unwrap();
    for (name, body) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }
    dir
}

/// Every file under `dir`, relative and sorted.
fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(dir).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

fn read(dir: &TempDir, path: &str) -> String {
    fs::read_to_string(dir.path().join(path)).unwrap()
}

const BLOG: &str = r#"
[ABBZUG]
sitename = "Blog"

["/blog"]
post_subdir = "posts"
post_template = "post.html"
index_template = "index.html"
"#;

#[test]
fn test_root_only_site_writes_one_file() {
    let dir = site(
        "[ABBZUG]\n\n[\"/\"]\nindex_template = \"index.html\"\n",
        &[("templates/index.html", "<h1>{{ site.sitename | default(value='none') }}</h1>")],
    );

    let report = build_site(dir.path(), false).unwrap();

    assert_eq!(files_under(&dir.path().join("output")), vec![PathBuf::from("index.html")]);
    assert_eq!(read(&dir, "output/index.html"), "<h1>none</h1>");
    assert_eq!(report.indexes, 1);
    assert_eq!(report.posts, 0);
    assert_eq!(report.skipped, 0);
}

#[test]
fn test_posts_and_index_with_literal_urls() {
    let dir = site(
        BLOG,
        &[
            ("templates/post.html", "{{ post.url | safe }}|{{ post.title }}|{{ content | markdown }}"),
            (
                "templates/index.html",
                "{% for p in posts %}{{ p.url | safe }};{% endfor %}",
            ),
            ("content/posts/a.md", "---\ntitle: First\n---\nHello *there*"),
            ("content/posts/b.md", "+++\ntitle = \"Second\"\n+++\nBye"),
        ],
    );

    let report = build_site(dir.path(), false).unwrap();

    assert_eq!(
        files_under(&dir.path().join("output")),
        vec![
            PathBuf::from("blog/a.html"),
            PathBuf::from("blog/b.html"),
            PathBuf::from("blog/index.html"),
        ]
    );
    assert_eq!(read(&dir, "output/blog/a.html").trim(), "/bloga.html|First|<p>Hello <em>there</em></p>");
    assert!(read(&dir, "output/blog/b.html").starts_with("/blogb.html|Second|"));
    assert_eq!(read(&dir, "output/blog/index.html"), "/bloga.html;/blogb.html;");
    assert_eq!(report.posts, 2);
}

#[test]
fn test_tag_pages_list_their_posts() {
    let config = format!("{BLOG}tag_template = \"tag.html\"\ntag_subdir = \"tags/\"\n");
    let dir = site(
        &config,
        &[
            ("templates/post.html", "{% for t in post.tags %}{{ t }} {% endfor %}"),
            ("templates/index.html", "{% for name, t in tags %}<a href=\"{{ t.url | safe }}\">{{ name }}</a>{% endfor %}"),
            (
                "templates/tag.html",
                "{{ tagname }}:{% for p in tag.posts %}{{ p.title }}{% endfor %}",
            ),
            ("content/posts/a.md", "---\ntitle: Ops\ntags: [go, infra]\n---\nbody"),
            ("content/posts/b.md", "---\ntitle: Untagged\n---\nbody"),
        ],
    );

    let report = build_site(dir.path(), false).unwrap();

    assert_eq!(read(&dir, "output/blog/tags/go/index.html"), "go:Ops");
    assert_eq!(read(&dir, "output/blog/tags/infra/index.html"), "infra:Ops");
    assert_eq!(read(&dir, "output/blog/a.html"), "go infra ");
    assert_eq!(
        read(&dir, "output/blog/index.html"),
        "<a href=\"/blog/tags/go/\">go</a><a href=\"/blog/tags/infra/\">infra</a>"
    );
    assert_eq!(report.tag_pages, 2);
}

#[test]
fn test_tag_pages_need_both_keys() {
    let config = format!("{BLOG}tag_template = \"tag.html\"\n");
    let dir = site(
        &config,
        &[
            ("templates/post.html", "post"),
            ("templates/index.html", "index"),
            ("templates/tag.html", "tag"),
            ("content/posts/a.md", "---\ntags: go\n---\nbody"),
        ],
    );

    let report = build_site(dir.path(), false).unwrap();

    assert_eq!(report.tag_pages, 0);
    assert!(!dir.path().join("output/blog/tags").exists());
}

#[test]
fn test_invalid_section_aborts_before_writing() {
    let config = "[ABBZUG]\n\n[\"/\"]\nindex_template = \"index.html\"\n\n[\"/notes\"]\npost_subdir = \"notes\"\npost_template = \"post.html\"\n";
    let dir = site(
        config,
        &[
            ("templates/index.html", "index"),
            ("templates/post.html", "post"),
            ("content/notes/a.md", "hello"),
            ("static/style.css", "body{}"),
        ],
    );

    let err = build_site(dir.path(), false).unwrap_err();

    assert!(matches!(err, BuildError::Config(ConfigError::MissingKey { .. })));
    assert!(err.to_string().contains("/notes"));
    assert!(!dir.path().join("output").exists());
}

#[test]
fn test_missing_post_template_skips_only_that_section() {
    let config = format!("{BLOG}\n[\"/\"]\nindex_template = \"index.html\"\n");
    let dir = site(
        &config,
        &[
            ("templates/index.html", "index"),
            ("content/posts/a.md", "a"),
            ("content/posts/b.md", "b"),
        ],
    );

    let report = build_site(dir.path(), false).unwrap();

    assert_eq!(
        files_under(&dir.path().join("output")),
        vec![PathBuf::from("blog/index.html"), PathBuf::from("index.html")]
    );
    assert_eq!(report.posts, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.indexes, 2);
}

#[test]
fn test_broken_template_is_skipped_not_fatal() {
    let config = format!("{BLOG}\n[\"/\"]\nindex_template = \"home.html\"\n");
    let dir = site(
        &config,
        &[
            ("templates/post.html", "{{ post.nope.deeper }}"),
            ("templates/index.html", "blog"),
            ("templates/home.html", "home"),
            ("content/posts/a.md", "a"),
        ],
    );

    let report = build_site(dir.path(), true).unwrap();

    assert!(!dir.path().join("output/blog/a.html").exists());
    assert_eq!(read(&dir, "output/index.html"), "home");
    assert_eq!(report.skipped, 1);
}

#[test]
fn test_earlier_section_sees_later_sections_posts() {
    let config = format!(
        "[ABBZUG]\n\n[\"/\"]\nindex_template = \"home.html\"\n{}",
        BLOG.trim_start_matches("\n[ABBZUG]\nsitename = \"Blog\"\n")
    );
    let dir = site(
        &config,
        &[
            ("templates/home.html", "{{ site_posts[\"blog\"] | length }} posts"),
            ("templates/index.html", "blog"),
            ("templates/post.html", "{{ section_name }}"),
            ("content/posts/a.md", "a"),
            ("content/posts/b.md", "b"),
            ("content/posts/c.md", "c"),
        ],
    );

    build_site(dir.path(), false).unwrap();

    assert_eq!(read(&dir, "output/index.html"), "3 posts");
    assert_eq!(read(&dir, "output/blog/a.html"), "blog");
}

#[test]
fn test_reading_time_and_metadata_reach_templates() {
    let body = "word ".repeat(540);
    let post = format!("---\ntitle: Long\nauthor: Ann\n---\n{body}");
    let dir = site(
        BLOG,
        &[
            ("templates/post.html", "{{ post.title }} by {{ post.author }}, {{ post.reading_time }} min"),
            ("templates/index.html", "{{ section.post_subdir }}"),
            ("content/posts/long.md", &post),
        ],
    );

    build_site(dir.path(), false).unwrap();

    assert_eq!(read(&dir, "output/blog/long.html"), "Long by Ann, 2 min");
    assert_eq!(read(&dir, "output/blog/index.html"), "posts");
}

#[test]
fn test_static_files_are_mirrored() {
    let dir = site(
        "[ABBZUG]\nstatic_dir = \"assets/\"\n\n[\"/\"]\nindex_template = \"index.html\"\n",
        &[
            ("templates/index.html", "index"),
            ("assets/css/site.css", "body{}"),
            ("assets/robots.txt", "ok"),
        ],
    );

    let report = build_site(dir.path(), false).unwrap();

    assert_eq!(report.assets, 2);
    assert_eq!(read(&dir, "output/assets/css/site.css"), "body{}");
    assert_eq!(read(&dir, "output/assets/robots.txt"), "ok");
}

#[test]
fn test_rebuild_is_byte_identical() {
    let config = format!("{BLOG}tag_template = \"tag.html\"\ntag_subdir = \"tags\"\n");
    let dir = site(
        &config,
        &[
            ("templates/post.html", "{{ content | markdown }}{{ site_tags | json_encode() }}"),
            ("templates/index.html", "{{ posts | json_encode() }}"),
            ("templates/tag.html", "{{ tag | json_encode() }}"),
            ("content/posts/a.md", "---\ntags: [x, y]\n---\n```rust\nfn main() {}\n```\n"),
            ("content/posts/b.md", "---\ntags: [y]\n---\nText[^1]\n\n[^1]: note\n"),
        ],
    );

    build_site(dir.path(), false).unwrap();
    let output = dir.path().join("output");
    let first: Vec<_> = files_under(&output)
        .into_iter()
        .map(|f| (f.clone(), fs::read(output.join(&f)).unwrap()))
        .collect();

    build_site(dir.path(), false).unwrap();
    let second: Vec<_> = files_under(&output)
        .into_iter()
        .map(|f| (f.clone(), fs::read(output.join(&f)).unwrap()))
        .collect();

    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
}

#[test]
fn test_custom_config_file_name() {
    let dir = site("", &[("templates/index.html", "alt")]);
    fs::write(
        dir.path().join("alt.toml"),
        "[ABBZUG]\noutput_dir = \"public/\"\n\n[\"/\"]\nindex_template = \"index.html\"\n",
    )
    .unwrap();

    let report = SiteBuilder::new(dir.path())
        .config_file("alt.toml")
        .load()
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(report.sections, 1);
    assert_eq!(read(&dir, "public/index.html"), "alt");
}

#[test]
fn test_stray_template_files_do_not_stop_the_build() {
    let dir = site(
        "[ABBZUG]\n\n[\"/\"]\nindex_template = \"index.html\"\n\n[\"/old\"]\nindex_template = \"unused.html\"\n",
        &[
            ("templates/index.html", "home"),
            ("templates/unused.html", "{% extends \"gone.html\" %}"),
        ],
    );
    fs::write(dir.path().join("templates/.index.html.swp"), [0xff, 0xfe, 0x00, 0x81]).unwrap();
    fs::write(dir.path().join("templates/logo.png"), [0x89, 0x50, 0x4e, 0x47, 0xff, 0x00]).unwrap();

    let report = build_site(dir.path(), false).unwrap();

    assert_eq!(read(&dir, "output/index.html"), "home");
    assert!(!dir.path().join("output/old/index.html").exists());
    assert_eq!(report.indexes, 1);
    assert_eq!(report.skipped, 1);
}

#[test]
fn test_toml_dates_render_as_written() {
    let dir = site(
        BLOG,
        &[
            ("templates/post.html", "{{ post.date }}|{{ post.date | json_encode() | safe }}"),
            ("templates/index.html", "index"),
            ("content/posts/a.md", "+++\ndate = 2024-01-02\n+++\nBody"),
        ],
    );

    build_site(dir.path(), false).unwrap();

    assert_eq!(read(&dir, "output/blog/a.html"), "2024-01-02|\"2024-01-02\"");
}

#[test]
fn test_per_target_values_do_not_leak_between_renders() {
    let config = format!(
        "{}tag_template = \"tag.html\"\ntag_subdir = \"tags\"\n\n[\"/about\"]\nindex_template = \"about.html\"\n",
        BLOG
    );
    let context_keys = "{% if post %}post {% endif %}{% if posts %}posts {% endif %}{% if tag %}tag {% endif %}";
    let dir = site(
        &config,
        &[
            ("templates/post.html", "{{ post.title }}:{{ section_name }}"),
            ("templates/index.html", &format!("{context_keys}{{{{ posts | length }}}}")),
            ("templates/tag.html", &format!("{context_keys}{{{{ tagname }}}}")),
            ("templates/about.html", &format!("{context_keys}{{{{ section_name }}}}")),
            ("content/posts/a.md", "---\ntitle: A\ntags: [x]\n---\nA"),
            ("content/posts/b.md", "---\ntitle: B\n---\nB"),
        ],
    );

    build_site(dir.path(), false).unwrap();

    assert_eq!(read(&dir, "output/blog/a.html"), "A:blog");
    assert_eq!(read(&dir, "output/blog/b.html"), "B:blog");
    assert_eq!(read(&dir, "output/blog/index.html"), "posts 2");
    assert_eq!(read(&dir, "output/blog/tags/x/index.html"), "posts tag x");
    assert_eq!(read(&dir, "output/about/index.html"), "about");
}
