use indexmap::IndexMap;
use time::OffsetDateTime;

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct GistFile {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub raw_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub truncated: bool,
    /// Only present when a single gist is fetched
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct Gist {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub owner: Option<Owner>,
    /// Keyed by filename, in the order the API returned them
    #[serde(default)]
    pub files: IndexMap<String, GistFile>,
    #[serde(default)]
    pub public: bool,
    #[serde(default, deserialize_with = "crate::serde::optional_utc_date_time")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "crate::serde::optional_utc_date_time")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Gist {
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|s| !s.is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.owner.as_ref().map(|owner| owner.login.as_str())
    }

    pub fn first_filename(&self) -> Option<&str> {
        self.files.keys().next().map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct NewFile<'a> {
    pub content: &'a str,
}

/// The body of a create request
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct NewGist<'a> {
    pub description: &'a str,
    pub public: bool,
    pub files: IndexMap<&'a str, NewFile<'a>>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FileEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub content: String,
}

/// Per-file edits for an update request.
///
/// A `None` edit deletes that file from the gist.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FileChanges(IndexMap<String, Option<FileEdit>>);

impl FileChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces (or adds) `filename` with `content`
    pub fn update(mut self, filename: impl Into<String>, content: impl Into<String>) -> Self {
        let edit = FileEdit {
            filename: None,
            content: content.into(),
        };
        self.0.insert(filename.into(), Some(edit));
        self
    }

    pub fn rename(
        mut self,
        old: impl Into<String>,
        new: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let edit = FileEdit {
            filename: Some(new.into()),
            content: content.into(),
        };
        self.0.insert(old.into(), Some(edit));
        self
    }

    pub fn delete(mut self, filename: impl Into<String>) -> Self {
        self.0.insert(filename.into(), None);
        self
    }

    pub fn get(&self, filename: &str) -> Option<Option<&FileEdit>> {
        self.0.get(filename).map(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The body of an update request
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct GistUpdate<'a> {
    pub files: &'a FileChanges,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}
