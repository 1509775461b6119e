//! Mapping URL paths onto the filesystem.
//!
//! Asset references come straight out of page markup, so the path part of a
//! URL is untrusted input right up until it has been checked here.

use crate::error::{ErrorKind, Result};
use std::path::PathBuf;

/// Turns the `/`-separated path of a URL (relative to the site root) into a
/// relative filesystem path that can be joined onto the document root.
///
/// `.` segments and empty segments are dropped and `..` pops the previous
/// segment. Anything that would climb above the root is rejected, as are
/// null bytes, backslashes and Windows drive prefixes, none of which have a
/// business being in a stylesheet or script URL.
///
/// ```
/// use std::path::Path;
/// use pagespeed_assets::validate_path;
/// assert_eq!(validate_path("skin/frontend/styles.css").unwrap(), Path::new("skin/frontend/styles.css"));
/// assert_eq!(validate_path("js/./lib/../app.js").unwrap(), Path::new("js/app.js"));
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("js\\app.js").is_err());
/// ```
pub fn validate(url_path: &str) -> Result<PathBuf> {
    let invalid = || ErrorKind::InvalidPath(url_path.to_string());
    let mut segments: Vec<&str> = Vec::new();
    for segment in url_path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
            _ if segment.contains(['\0', '\\']) => exn::bail!(invalid()),
            _ if segments.is_empty() && segment.len() == 2 && segment.ends_with(':') => exn::bail!(invalid()),
            _ => segments.push(segment),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(segments.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[rstest]
    #[case("style.css", "style.css")]
    #[case("/skin/frontend/base/default/css/styles.css", "skin/frontend/base/default/css/styles.css")]
    #[case("js//prototype/./prototype.js", "js/prototype/prototype.js")]
    #[case("a/b/../../c.js", "c.js")]
    fn test_valid(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    #[case("..")]
    #[case("a/../../b.css")]
    #[case("a\0b.css")]
    #[case("skin\\..\\..\\secret.css")]
    #[case("C:/Windows/win.ini")]
    fn test_invalid(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidPath(input.to_string()));
    }
}
