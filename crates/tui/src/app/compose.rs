use std::path::PathBuf;

/// What a non-empty submitted textbox turns into.
#[derive(Debug, PartialEq, Eq)]
pub enum Submission {
    /// `/key <credential>`: store a credential, send nothing.
    SetKey(String),
    Message(String),
}

pub fn parse_submission(text: &str) -> Submission {
    let trimmed = text.trim();
    match trimmed.strip_prefix("/key ") {
        Some(key) if !key.trim().is_empty() => Submission::SetKey(key.trim().to_string()),
        _ => Submission::Message(trimmed.to_string()),
    }
}

/// Resolves a path typed by the user to an absolute path if the file exists.
pub type ImageResolver = fn(&str) -> Option<PathBuf>;

pub fn resolve_on_disk(path: &str) -> Option<PathBuf> {
    std::fs::canonicalize(path).ok().filter(|p| p.is_file())
}

const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Rewrites lines that name an existing image (`image:<path>`, or a bare
/// path ending in an image suffix) into Markdown image links.
pub fn expand_image_lines(text: &str, resolve: ImageResolver) -> String {
    text.split('\n')
        .map(|line| {
            let trimmed = line.trim();
            let tagged = trimmed.strip_prefix("image:");
            let looks_like_image = IMAGE_SUFFIXES
                .iter()
                .any(|s| trimmed.to_ascii_lowercase().ends_with(s));
            if tagged.is_none() && !looks_like_image {
                return line.to_string();
            }
            let path = tagged.unwrap_or(trimmed).trim();
            match resolve(path) {
                Some(abs) => format!("![image](file://{})", abs.display()),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
