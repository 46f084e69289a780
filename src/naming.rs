use indexmap::IndexMap;

/// Splits `name` at its extension, keeping the dot with the extension.
///
/// Leading dots don't start an extension, so `.bashrc` has none.
fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(pos) => name.split_at(leading + pos),
        None => (name, ""),
    }
}

/// The base name of a syntax definition path, without its extension.
///
/// `Packages/Python/Python.sublime-syntax` becomes `Python`.
pub fn syntax_label(path: &str) -> &str {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    split_extension(base).0
}

/// Names the files of a gist created from one or more selections.
///
/// A single selection is posted under `filename` as is (the API names an
/// empty one for us). Several selections are numbered from 1, either as
/// `stem (n).ext` or, without a filename, as `syntax n`.
pub fn selection_files(
    filename: &str,
    syntax: &str,
    selections: Vec<String>,
) -> IndexMap<String, String> {
    if let [_] = selections.as_slice() {
        return selections
            .into_iter()
            .map(|text| (filename.to_string(), text))
            .collect();
    }

    let (stem, ext) = split_extension(filename);
    selections
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let n = i + 1;
            let name = if filename.is_empty() {
                format!("{syntax} {n}")
            } else {
                format!("{stem} ({n}){ext}")
            };
            (name, text)
        })
        .collect()
}
