pub const DEFAULT_MARKER: &str = "Visual Studio Code";
pub const DEFAULT_DELIMITER: &str = " - ";
pub const DEFAULT_SEGMENT: usize = 1;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TitleError {
    /// The title belongs to the tracked application but doesn't name a project. Happens for
    /// example while an editor shows its welcome page.
    #[error("Title {title:?} doesn't contain a project name")]
    UnresolvableTitle { title: String },
}

/// Maps a window title to the project it belongs to.
///
/// Only titles containing `marker` are considered. The project is the `segment`-th piece
/// (0 based) of the title split by `delimiter`, so with the defaults
/// `main.rs - worktally - Visual Studio Code` resolves to `worktally`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleResolver {
    marker: String,
    delimiter: String,
    segment: usize,
}

impl Default for TitleResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, DEFAULT_DELIMITER, DEFAULT_SEGMENT)
    }
}

impl TitleResolver {
    pub fn new(marker: impl Into<String>, delimiter: impl Into<String>, segment: usize) -> Self {
        Self {
            marker: marker.into(),
            delimiter: delimiter.into(),
            segment,
        }
    }

    /// `Ok(None)` for windows of other applications. Callers treat that as having left the
    /// tracked application and close the running session, so time spent elsewhere is never
    /// attributed to a project. Only an `Err` leaves the session as it was.
    pub fn resolve(&self, title: &str) -> Result<Option<String>, TitleError> {
        if !title.contains(&self.marker) {
            return Ok(None);
        }

        title
            .split(self.delimiter.as_str())
            .nth(self.segment)
            .map(str::trim)
            // The application name itself isn't a project, which is what a title with fewer
            // segments than usual would otherwise resolve to.
            .filter(|v| !v.is_empty() && !v.contains(&self.marker))
            .map(|v| Some(v.to_string()))
            .ok_or_else(|| TitleError::UnresolvableTitle {
                title: title.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{TitleError, TitleResolver};

    #[test]
    fn test_resolves_project_segment() {
        let resolver = TitleResolver::default();

        assert_eq!(
            resolver.resolve("main.rs - worktally - Visual Studio Code"),
            Ok(Some("worktally".into()))
        );
        assert_eq!(
            resolver.resolve("● lib.rs - my project  - Visual Studio Code"),
            Ok(Some("my project".into()))
        );
    }

    #[test]
    fn test_other_applications_resolve_to_nothing() {
        let resolver = TitleResolver::default();

        assert_eq!(resolver.resolve("Inbox - Mozilla Thunderbird"), Ok(None));
        assert_eq!(resolver.resolve("visual studio code - notes.txt"), Ok(None));
        assert_eq!(resolver.resolve(""), Ok(None));
    }

    #[test]
    fn test_missing_segment_is_unresolvable() {
        let resolver = TitleResolver::default();

        for title in [
            "Visual Studio Code",
            "Welcome - Visual Studio Code",
            " - Visual Studio Code",
        ] {
            assert_eq!(
                resolver.resolve(title),
                Err(TitleError::UnresolvableTitle {
                    title: title.into()
                })
            );
        }
    }

    #[test]
    fn test_custom_layout() {
        let resolver = TitleResolver::new("nvim", " | ", 0);

        assert_eq!(resolver.resolve("backend | nvim"), Ok(Some("backend".into())));
        assert_eq!(
            resolver.resolve("nvim"),
            Err(TitleError::UnresolvableTitle {
                title: "nvim".into()
            })
        );
    }
}
