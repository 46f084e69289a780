use regex::Regex;

use crate::{
    model::Gist,
    settings::{Settings, SortGists},
    Error, Result,
};

/// Prepended to the titles of starred gists in listings
pub const STARRED_MARKER: &str = "★ ";

/// How a gist is shown in a listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayName {
    pub title: String,
    /// Present only when `show_authors` is enabled
    pub author: Option<String>,
}

impl DisplayName {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
        }
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.author {
            Some(author) => write!(f, "{} ({author})", self.title),
            None => f.write_str(&self.title),
        }
    }
}

/// The display name of a single gist.
///
/// That's the description, unless there is none or `prefer_filename` is set,
/// in which case it's the first filename in the order the API sent them.
pub fn title(gist: &Gist, settings: &Settings) -> DisplayName {
    display_name(gist, settings.prefer_filename, settings.show_authors)
}

fn display_name(gist: &Gist, prefer_filename: bool, show_authors: bool) -> DisplayName {
    let title = match gist.description() {
        Some(description) if !prefer_filename => description,
        _ => gist.first_filename().unwrap_or_default(),
    };

    DisplayName {
        title: title.to_string(),
        author: show_authors
            .then(|| gist.author().map(ToString::to_string))
            .flatten(),
    }
}

/// Names `gists`, dropping those that shouldn't be listed.
///
/// See [`Filter::apply`].
pub fn filter(
    gists: Vec<Gist>,
    settings: &Settings,
    name_prefix: &str,
) -> Result<Vec<(Gist, DisplayName)>> {
    Filter::new(settings).map(|filter| filter.apply(gists, name_prefix))
}

/// A reusable [`filter`], with the tag matcher compiled once.
#[derive(Clone, Debug)]
pub struct Filter {
    prefer_filename: bool,
    show_authors: bool,
    prefix: Option<String>,
    tag: Option<Regex>,
    sort: SortGists,
}

impl Filter {
    pub fn new(settings: &Settings) -> Result<Self> {
        let tag = match settings.gist_tag.as_str() {
            "" => None,
            tag => {
                // the tag has to be a whole whitespace delimited word
                let re = format!(r"(^|\s)#{}($|\s)", regex::escape(tag));
                let re = Regex::new(&re)
                    .map_err(|err| Error::Settings(format!("invalid gist_tag: {err}")))?;
                Some(re)
            }
        };

        Ok(Self {
            prefer_filename: settings.prefer_filename,
            show_authors: settings.show_authors,
            prefix: Some(settings.gist_prefix.clone()).filter(|s| !s.is_empty()),
            tag,
            sort: settings.sort_gists,
        })
    }

    /// Pairs every listable gist with its display name.
    ///
    /// Gists without files are dropped. With a `gist_prefix`, only gists
    /// whose title starts with it are kept, and it is removed from the title.
    /// With a `gist_tag`, only gists whose title contains `#tag` as a word are
    /// kept, and the tag is removed. `name_prefix` is then put in front of
    /// every title. Input order is kept unless `sort_gists` is set.
    pub fn apply(&self, gists: Vec<Gist>, name_prefix: &str) -> Vec<(Gist, DisplayName)> {
        let mut out = gists
            .into_iter()
            .filter(|gist| !gist.files.is_empty())
            .filter_map(|gist| {
                let name = display_name(&gist, self.prefer_filename, self.show_authors);
                let name = self.rename(name, name_prefix)?;
                Some((gist, name))
            })
            .collect::<Vec<_>>();

        // both sorts are stable, so ties keep their listing order
        match self.sort {
            SortGists::Off => {}
            SortGists::Description => {
                out.sort_by_cached_key(|(_, name)| name.title.to_lowercase())
            }
            SortGists::Extension => out.sort_by_cached_key(|(gist, _)| extension_key(gist)),
        }
        out
    }

    fn rename(&self, mut name: DisplayName, name_prefix: &str) -> Option<DisplayName> {
        if let Some(prefix) = &self.prefix {
            name.title = name.title.strip_prefix(prefix.as_str())?.to_string();
        }

        if let Some(tag) = &self.tag {
            name.title = strip_tag(tag, &name.title)?;
        }

        name.title.insert_str(0, name_prefix);
        Some(name)
    }
}

/// Orders by the text after the first dot of the first filename,
/// with gists that have none sorted last
fn extension_key(gist: &Gist) -> (bool, String) {
    match gist.first_filename().and_then(|name| name.split('.').nth(1)) {
        Some(ext) => (false, ext.to_lowercase()),
        None => (true, String::new()),
    }
}

fn strip_tag(tag: &Regex, title: &str) -> Option<String> {
    let caps = tag.captures(title)?;
    let (all, before, after) = (caps.get(0)?, caps.get(1)?, caps.get(2)?);

    // a tag between two words leaves one separator behind
    let joint = if before.as_str().is_empty() || after.as_str().is_empty() {
        ""
    } else {
        before.as_str()
    };

    Some(format!(
        "{}{joint}{}",
        &title[..all.start()],
        &title[all.end()..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GistFile, Owner};

    fn gist(description: &str, files: &[&str]) -> Gist {
        Gist {
            description: Some(description.to_string()),
            files: files
                .iter()
                .map(|name| (name.to_string(), GistFile::default()))
                .collect(),
            ..Gist::default()
        }
    }

    fn settings(yaml: &str) -> Settings {
        Settings::from_yaml(yaml).unwrap()
    }

    fn titles(out: &[(Gist, DisplayName)]) -> Vec<&str> {
        out.iter().map(|(_, name)| name.title.as_str()).collect()
    }

    #[test]
    fn title_prefers_description() {
        let g = gist("some description", &["z.rs", "a.rs"]);
        assert_eq!(title(&g, &settings("")).title, "some description");

        // first file in api order, not alphabetical
        let by_file = title(&g, &settings("prefer_filename: true"));
        assert_eq!(by_file.title, "z.rs");

        assert_eq!(title(&gist("", &["only.txt"]), &settings("")).title, "only.txt");
    }

    #[test]
    fn title_with_author() {
        let mut g = gist("desc", &["a"]);
        g.owner = Some(Owner {
            login: "octocat".into(),
        });

        let name = title(&g, &settings("show_authors: true"));
        assert_eq!(name.author.as_deref(), Some("octocat"));
        assert_eq!(name.to_string(), "desc (octocat)");

        assert_eq!(title(&g, &settings("")).author, None);

        g.owner = None;
        assert_eq!(title(&g, &settings("show_authors: true")).to_string(), "desc");
    }

    #[test]
    fn drops_gists_without_files() {
        let gists = vec![gist("empty", &[]), gist("full", &["a"]), gist("", &[])];
        for yaml in ["", "prefer_filename: true", "sort_gists: true"] {
            let out = filter(gists.clone(), &settings(yaml), "").unwrap();
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].0.first_filename(), Some("a"));
        }
    }

    #[test]
    fn prefix_filters_and_strips() {
        let gists = vec![gist("P:a", &["1"]), gist("b", &["2"])];
        let out = filter(gists, &settings("gist_prefix: 'P:'"), "").unwrap();
        assert_eq!(titles(&out), ["a"]);
        assert_eq!(out[0].0.description.as_deref(), Some("P:a"));
    }

    #[test]
    fn tag_filters_and_strips() {
        let gists = vec![
            gist("hello #t world", &["1"]),
            gist("hello #tail", &["2"]),
            gist("#t leading", &["3"]),
            gist("trailing #t", &["4"]),
            gist("no#t", &["5"]),
            gist("#t", &["6"]),
        ];
        let out = filter(gists, &settings("gist_tag: t"), "").unwrap();
        assert_eq!(titles(&out), ["hello world", "leading", "trailing", ""]);
    }

    #[test]
    fn tag_is_matched_literally() {
        let gists = vec![gist("a #c++ b", &["1"]), gist("a #cxx b", &["2"])];
        let out = filter(gists, &settings("gist_tag: c++"), "").unwrap();
        assert_eq!(titles(&out), ["a b"]);
    }

    #[test]
    fn prefix_then_tag_then_marker() {
        let gists = vec![
            gist("some gist 1", &[]),
            gist("some_prefix:some gist 2", &["some_test.sh"]),
            gist("some_prefix:some gist 3 #some_tag", &["some_test2.sh"]),
            gist("some gist 4 #some_tag", &["some_test3.sh"]),
        ];
        let s = settings("gist_prefix: 'some_prefix:'\ngist_tag: some_tag");

        let out = filter(gists, &s, STARRED_MARKER).unwrap();
        assert_eq!(titles(&out), ["★ some gist 3"]);
        assert_eq!(out[0].0.first_filename(), Some("some_test2.sh"));
    }

    #[test]
    fn case_sensitive() {
        let gists = vec![gist("p:lower", &["1"]), gist("x #T", &["2"])];
        let s = settings("gist_prefix: 'P:'");
        assert!(filter(gists.clone(), &s, "").unwrap().is_empty());
        let s = settings("gist_tag: t");
        assert!(filter(gists, &s, "").unwrap().is_empty());
    }

    #[test]
    fn order_is_stable_unless_sorted() {
        let gists = vec![gist("b", &["1"]), gist("a", &["2"]), gist("c", &["3"])];
        let out = filter(gists.clone(), &settings(""), "").unwrap();
        assert_eq!(titles(&out), ["b", "a", "c"]);

        let out = filter(gists, &settings("sort_gists: true"), "").unwrap();
        assert_eq!(titles(&out), ["a", "b", "c"]);
    }

    #[test]
    fn description_sort_ignores_case() {
        let gists = vec![
            gist("beta", &["1"]),
            gist("Alpha", &["2"]),
            gist("alpha2", &["3"]),
            gist("Zed", &["4"]),
        ];
        let out = filter(gists, &settings("sort_gists: description"), "").unwrap();
        assert_eq!(titles(&out), ["Alpha", "alpha2", "beta", "Zed"]);
    }

    #[test]
    fn extension_sort_puts_bare_names_last() {
        let gists = vec![
            gist("makefile", &["Makefile"]),
            gist("python", &["main.PY"]),
            gist("rust", &["lib.rs", "a.c"]),
            gist("notes", &["README"]),
            gist("c", &["x.c"]),
        ];
        let out = filter(gists, &settings("sort_gists: extension"), "").unwrap();
        assert_eq!(titles(&out), ["c", "python", "rust", "makefile", "notes"]);
    }
}
