//! Display text templates
//!
//! Expands `${currentFileName}`, `${currentDirectoryName}` and
//! `${currentProjectName}` against the active document. Matching is
//! case-insensitive on the whole token including braces; any other `${...}`
//! text passes through as written.

use std::path::Path;

use watermark_types::DisplayContent;

use crate::error::TemplateError;

/// Substring every recognized token starts with, lowercased
const TOKEN_MARKER: &str = "${current";

/// Document context the tokens are resolved against
pub trait TemplateContext {
    /// Path of the active document, `None` while it is not yet known
    fn document_path(&self) -> Option<&Path>;

    /// Name of the project containing `path`
    fn project_name(&self, path: &Path) -> Option<String>;
}

/// A recognized template token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    FileName,
    DirectoryName,
    ProjectName,
}

impl Token {
    pub const ALL: [Token; 3] = [Token::FileName, Token::DirectoryName, Token::ProjectName];

    /// The token as users write it
    pub fn literal(&self) -> &'static str {
        match self {
            Token::FileName => "${currentFileName}",
            Token::DirectoryName => "${currentDirectoryName}",
            Token::ProjectName => "${currentProjectName}",
        }
    }

    fn resolve(&self, path: &Path, ctx: &dyn TemplateContext) -> Result<String, TemplateError> {
        match self {
            Token::FileName => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| TemplateError::NoFileName(path.to_path_buf())),
            Token::DirectoryName => path
                .parent()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| TemplateError::NoParentDirectory(path.to_path_buf())),
            Token::ProjectName => ctx
                .project_name(path)
                .ok_or_else(|| TemplateError::NoProject(path.to_path_buf())),
        }
    }

    /// Token starting at the beginning of `lowered`, if any
    fn match_at(lowered: &str) -> Option<Token> {
        Token::ALL
            .into_iter()
            .find(|token| lowered.starts_with(&token.literal().to_ascii_lowercase()))
    }
}

/// Result of expanding a template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTemplate {
    pub text: String,
    /// Tokens that could not be derived; each was replaced with ""
    pub errors: Vec<TemplateError>,
}

impl ResolvedTemplate {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            errors: Vec::new(),
        }
    }
}

/// Cheap check for whether `text` could hold a token at all
pub fn may_contain_tokens(text: &str) -> bool {
    text.to_ascii_lowercase().contains(TOKEN_MARKER)
}

/// Expand the tokens in `text`.
///
/// `IMG:` directives are returned untouched, as is any text while the
/// document path is unknown. A token whose value cannot be derived becomes
/// the empty string and its error is collected; the rest still resolve.
pub fn resolve_template(text: &str, ctx: &dyn TemplateContext) -> ResolvedTemplate {
    if DisplayContent::parse(text).is_image() || !may_contain_tokens(text) {
        return ResolvedTemplate::unchanged(text);
    }

    let Some(path) = ctx.document_path() else {
        tracing::trace!("document path not yet known, leaving tokens in place");
        return ResolvedTemplate::unchanged(text);
    };

    // ASCII lowercasing keeps byte offsets aligned with `text`
    let lowered = text.to_ascii_lowercase();
    let mut values: [Option<String>; 3] = Default::default();
    let mut errors = Vec::new();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        if let Some(token) = Token::match_at(&lowered[i..]) {
            let slot = &mut values[token as usize];
            let value = slot.get_or_insert_with(|| match token.resolve(path, ctx) {
                Ok(value) => value,
                Err(e) => {
                    errors.push(e);
                    String::new()
                }
            });
            out.push_str(value);
            i += token.literal().len();
            continue;
        }

        let Some(c) = text[i..].chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }

    ResolvedTemplate { text: out, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Ctx {
        path: Option<PathBuf>,
        project: Option<String>,
    }

    impl Ctx {
        fn at(path: &str) -> Self {
            Self {
                path: Some(PathBuf::from(path)),
                project: Some("Proj".to_string()),
            }
        }
    }

    impl TemplateContext for Ctx {
        fn document_path(&self) -> Option<&Path> {
            self.path.as_deref()
        }

        fn project_name(&self, _path: &Path) -> Option<String> {
            self.project.clone()
        }
    }

    #[test]
    fn test_file_name() {
        let resolved = resolve_template("${currentFileName}", &Ctx::at("a/b/foo.txt"));
        assert_eq!(resolved.text, "foo.txt");
        assert!(resolved.errors.is_empty());
    }

    #[test]
    fn test_all_tokens_case_insensitive() {
        let resolved = resolve_template(
            "${CURRENTPROJECTNAME} / ${currentdirectoryname} / ${CurrentFileName}",
            &Ctx::at("/proj/src/main.ts"),
        );
        assert_eq!(resolved.text, "Proj / src / main.ts");
    }

    #[test]
    fn test_repeated_token() {
        let resolved = resolve_template(
            "${currentFileName}-${currentFileName}",
            &Ctx::at("/x/y.rs"),
        );
        assert_eq!(resolved.text, "y.rs-y.rs");
    }

    #[test]
    fn test_no_document_leaves_tokens() {
        let ctx = Ctx {
            path: None,
            project: None,
        };
        let resolved = resolve_template("${currentFileName}", &ctx);
        assert_eq!(resolved.text, "${currentFileName}");
        assert!(resolved.errors.is_empty());
    }

    #[test]
    fn test_image_directive_is_not_substituted() {
        let text = "IMG:/tmp/${currentFileName}.png";
        let resolved = resolve_template(text, &Ctx::at("/a/b.txt"));
        assert_eq!(resolved.text, text);
    }

    #[test]
    fn test_unknown_tokens_pass_through() {
        let resolved = resolve_template(
            "${currentUser} ${current} ${currentFileName}",
            &Ctx::at("/a/b.txt"),
        );
        assert_eq!(resolved.text, "${currentUser} ${current} b.txt");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let resolved = resolve_template("Production – do not edit", &Ctx::at("/a/b.txt"));
        assert_eq!(resolved.text, "Production – do not edit");
        assert!(!may_contain_tokens("plain"));
        assert!(may_contain_tokens("x ${CURRENTthing}"));
    }

    #[test]
    fn test_failed_token_becomes_empty_and_rest_resolve() {
        let ctx = Ctx {
            path: Some(PathBuf::from("/main.ts")),
            project: None,
        };
        let resolved = resolve_template(
            "[${currentDirectoryName}] ${currentFileName} ${currentProjectName}",
            &ctx,
        );
        assert_eq!(resolved.text, "[] main.ts ");
        assert_eq!(
            resolved.errors,
            vec![
                TemplateError::NoParentDirectory(PathBuf::from("/main.ts")),
                TemplateError::NoProject(PathBuf::from("/main.ts")),
            ]
        );
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let resolved = resolve_template(
            "${currentFileName}",
            &Ctx::at("/a/${currentProjectName}"),
        );
        assert_eq!(resolved.text, "${currentProjectName}");
    }

    #[test]
    fn test_non_ascii_text_around_tokens() {
        let resolved = resolve_template("ü ${currentFileName} ✓", &Ctx::at("/a/é.md"));
        assert_eq!(resolved.text, "ü é.md ✓");
    }
}
