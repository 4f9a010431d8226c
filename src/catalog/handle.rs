use crate::error::KaggleEaseError;

const ACCEPTED_FORMS: &str =
    "use a bare name like 'titanic', an 'owner/slug' pair, or a kaggle.com dataset/competition URL";

/// A user-supplied handle, normalized but not yet resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handle {
    raw: String,
    owner: Option<String>,
    slug: String,
}

impl Handle {
    /// Normalized form: `owner/slug` or the bare name.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn is_bare(&self) -> bool {
        self.owner.is_none()
    }

    /// Lowercase search tokens: slug first, then owner.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.slug.to_ascii_lowercase()];
        if let Some(owner) = &self.owner {
            tokens.push(owner.to_ascii_lowercase());
        }
        tokens
    }
}

/// Parse a user-supplied handle (bare name, `owner/slug`, or kaggle.com URL).
pub fn parse_handle(input: &str) -> Result<Handle, KaggleEaseError> {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return parse_handle_from_url(trimmed);
    }

    let segments: Vec<&str> = trimmed.trim_matches('/').split('/').collect();
    handle_from_segments(input, &strip_suffixes(&segments))
}

fn parse_handle_from_url(input: &str) -> Result<Handle, KaggleEaseError> {
    let url = url::Url::parse(input).map_err(|source| {
        KaggleEaseError::not_found(format!("'{input}' is not a valid URL: {source}"))
            .with_fix_suggestion(ACCEPTED_FORMS)
    })?;

    let host = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if host != "kaggle.com" && host != "www.kaggle.com" {
        return Err(KaggleEaseError::not_found(format!(
            "expected a kaggle.com URL, found host '{host}'"
        ))
        .with_fix_suggestion(ACCEPTED_FORMS));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|iter| iter.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match segments.first().copied() {
        Some("datasets") if segments.len() >= 3 => {
            handle_from_segments(input, &[segments[1], segments[2]])
        }
        Some("competitions") | Some("c") if segments.len() >= 2 => {
            handle_from_segments(input, &[segments[1]])
        }
        _ => Err(KaggleEaseError::not_found(format!(
            "'{input}' does not point at a dataset or competition"
        ))
        .with_fix_suggestion(ACCEPTED_FORMS)),
    }
}

/// Drops `/versions/<n>` and `/data` tails that people paste from the website.
fn strip_suffixes<'a>(segments: &[&'a str]) -> Vec<&'a str> {
    let mut kept = segments.to_vec();
    if kept.len() >= 3
        && kept[kept.len() - 2] == "versions"
        && kept[kept.len() - 1].chars().all(|c| c.is_ascii_digit())
    {
        kept.truncate(kept.len() - 2);
    }
    if kept.len() >= 3 && kept[kept.len() - 1] == "data" {
        kept.truncate(kept.len() - 1);
    }
    kept
}

fn handle_from_segments(input: &str, segments: &[&str]) -> Result<Handle, KaggleEaseError> {
    let invalid = || {
        KaggleEaseError::not_found(format!("'{}' is not a valid handle", input.trim()))
            .with_fix_suggestion(ACCEPTED_FORMS)
    };

    let segments: Vec<&str> = segments.iter().map(|s| s.trim()).collect();
    if segments.iter().any(|s| s.is_empty() || s.contains(char::is_whitespace)) {
        return Err(invalid());
    }

    match segments.as_slice() {
        [slug] => Ok(Handle {
            raw: (*slug).to_string(),
            owner: None,
            slug: (*slug).to_string(),
        }),
        [owner, slug] => Ok(Handle {
            raw: format!("{owner}/{slug}"),
            owner: Some((*owner).to_string()),
            slug: (*slug).to_string(),
        }),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name() {
        let handle = parse_handle("  titanic ").expect("parse");
        assert_eq!(handle.as_str(), "titanic");
        assert!(handle.is_bare());
        assert_eq!(handle.tokens(), vec!["titanic"]);
    }

    #[test]
    fn owner_slug_pair() {
        let handle = parse_handle("/heptapod/Titanic/").expect("parse");
        assert_eq!(handle.as_str(), "heptapod/Titanic");
        assert_eq!(handle.owner(), Some("heptapod"));
        assert_eq!(handle.slug(), "Titanic");
        assert_eq!(handle.tokens(), vec!["titanic", "heptapod"]);
    }

    #[test]
    fn pasted_version_suffix_is_dropped() {
        let handle = parse_handle("owner/slug/versions/3").expect("parse");
        assert_eq!(handle.as_str(), "owner/slug");
        let handle = parse_handle("owner/slug/data").expect("parse");
        assert_eq!(handle.as_str(), "owner/slug");
    }

    #[test]
    fn dataset_url() {
        let handle =
            parse_handle("https://www.kaggle.com/datasets/rtatman/iris-dataset-json/data")
                .expect("parse");
        assert_eq!(handle.as_str(), "rtatman/iris-dataset-json");
    }

    #[test]
    fn competition_urls() {
        for url in [
            "https://www.kaggle.com/competitions/titanic",
            "https://kaggle.com/c/titanic/overview",
        ] {
            let handle = parse_handle(url).expect("parse");
            assert_eq!(handle.as_str(), "titanic");
            assert!(handle.is_bare());
        }
    }

    #[test]
    fn rejects_malformed_handles() {
        for input in ["", "a/b/c", "owner//slug", "two words", "https://example.com/x/y"] {
            let err = parse_handle(input).expect_err(input);
            assert_eq!(err.kind(), crate::error::ErrorKind::DatasetNotFound);
            assert!(err.fix_suggestion().is_some());
        }
    }
}
