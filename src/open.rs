use crate::{client::GistClient, model::Gist, Result};

/// Top level media types that can be shown in a text buffer
const EDITABLE_MEDIA_TYPES: [&str; 2] = ["text", "application"];

/// A gist file ready to be put into an editor buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorFile {
    pub filename: String,
    pub content: String,
    pub language: Option<String>,
}

fn is_editable(media_type: Option<&str>) -> bool {
    // a missing type is treated as plain text
    let Some(media_type) = media_type else {
        return true;
    };
    let top = media_type.split('/').next().unwrap_or_default();
    EDITABLE_MEDIA_TYPES.contains(&top)
}

fn sorted_files(gist: &Gist) -> impl Iterator<Item = (&String, &crate::model::GistFile)> {
    let mut files = gist.files.iter().collect::<Vec<_>>();
    files.sort_by(|(l, _), (r, _)| l.cmp(r));
    files.into_iter()
}

/// The text files of `gist`, sorted by filename
pub fn editor_files(gist: &Gist) -> Vec<EditorFile> {
    sorted_files(gist)
        .filter(|(_, file)| is_editable(file.media_type.as_deref()))
        .map(|(name, file)| EditorFile {
            filename: name.clone(),
            content: file.content.clone().unwrap_or_default(),
            language: file.language.clone(),
        })
        .collect()
}

/// Every file's content, concatenated in filename order
pub fn insertion_text(gist: &Gist) -> String {
    sorted_files(gist)
        .filter_map(|(_, file)| file.content.as_deref())
        .collect()
}

/// A `<script>` embed per file, in filename order
pub fn embed_tags(gist: &Gist) -> Vec<String> {
    sorted_files(gist)
        .filter_map(|(_, file)| file.raw_url.as_deref())
        .map(|url| format!(r#"<script src="{url}"></script>"#))
        .collect()
}

/// Fetches the gist at `url` with its contents, then returns its text files
pub async fn open_gist(client: &GistClient, url: &str) -> Result<(Gist, Vec<EditorFile>)> {
    let gist = client.get_gist(url).await?;
    let files = editor_files(&gist);
    log::debug!(
        "opened {} of {} files from {url}",
        files.len(),
        gist.files.len()
    );
    Ok((gist, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{settings::Settings, testing::MockTransport};
    use serde_json::json;

    fn sample() -> Gist {
        serde_json::from_value(json!({
            "id": "1",
            "url": "https://api.github.com/gists/1",
            "files": {
                "zeta.py": {
                    "type": "application/x-python",
                    "language": "Python",
                    "raw_url": "https://gist.githubusercontent.com/raw/zeta.py",
                    "content": "print('z')\n"
                },
                "logo.png": {
                    "type": "image/png",
                    "raw_url": "https://gist.githubusercontent.com/raw/logo.png",
                    "content": "\u{0089}PNG"
                },
                "alpha.md": {
                    "type": "text/markdown",
                    "language": "Markdown",
                    "raw_url": "https://gist.githubusercontent.com/raw/alpha.md",
                    "content": "# a\n"
                },
                "untyped": { "content": "?" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn editor_files_sorted_and_filtered() {
        let files = editor_files(&sample());
        let names = files.iter().map(|f| f.filename.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["alpha.md", "untyped", "zeta.py"]);
        assert_eq!(files[0].language.as_deref(), Some("Markdown"));
        assert_eq!(files[2].content, "print('z')\n");
    }

    #[test]
    fn insertion_and_embeds() {
        let gist = sample();
        assert_eq!(insertion_text(&gist), "# a\n\u{0089}PNG?print('z')\n");
        assert_eq!(
            embed_tags(&gist),
            [
                r#"<script src="https://gist.githubusercontent.com/raw/alpha.md"></script>"#,
                r#"<script src="https://gist.githubusercontent.com/raw/logo.png"></script>"#,
                r#"<script src="https://gist.githubusercontent.com/raw/zeta.py"></script>"#,
            ]
        );
    }

    #[tokio::test]
    async fn open_fetches_contents() {
        let mock = MockTransport::new();
        mock.push_json(
            200,
            json!({ "files": { "a.txt": { "type": "text/plain", "content": "hi" } } }),
        );

        let settings = Settings::from_yaml("token: abc").unwrap();
        let client = GistClient::with_transport(settings, mock.clone());
        let (gist, files) = open_gist(&client, "https://api.github.com/gists/1")
            .await
            .unwrap();

        assert_eq!(gist.files.len(), 1);
        assert_eq!(
            files,
            [EditorFile {
                filename: "a.txt".into(),
                content: "hi".into(),
                language: None,
            }]
        );
        assert_eq!(mock.requests()[0].url, "https://api.github.com/gists/1");
    }
}
