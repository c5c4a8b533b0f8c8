//! Small URL helpers for rockspec source fields.

/// Protocols whose URLs point at a directly fetchable file, as opposed to an
/// SCM checkout.
const BASIC_PROTOCOLS: &[&str] = &["http", "https", "ftp", "file"];

/// Split a source URL into `(protocol, pathname)`.
///
/// A URL with no `://` separator is treated as a plain filesystem path with
/// protocol `file`.
pub fn split_url(url: &str) -> (String, String) {
    match url.split_once("://") {
        Some((proto, rest)) => (proto.to_lowercase(), rest.to_string()),
        None => ("file".to_string(), url.to_string()),
    }
}

/// Whether the protocol fetches a plain file rather than an SCM checkout.
pub fn is_basic_protocol(protocol: &str) -> bool {
    BASIC_PROTOCOLS.contains(&protocol)
}

/// Extract the filename from a URL.
pub fn base_name(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("https://example.com/a/b.tar.gz"),
            ("https".to_string(), "example.com/a/b.tar.gz".to_string())
        );
        assert_eq!(
            split_url("git://github.com/x/y"),
            ("git".to_string(), "github.com/x/y".to_string())
        );
    }

    #[test]
    fn test_no_protocol_defaults_to_file() {
        assert_eq!(
            split_url("/srv/mirror/a.src.rock"),
            ("file".to_string(), "/srv/mirror/a.src.rock".to_string())
        );
    }

    #[test]
    fn test_protocol_is_lowercased() {
        assert_eq!(split_url("HTTP://x/y").0, "http");
    }

    #[test]
    fn test_basic_protocols() {
        assert!(is_basic_protocol("https"));
        assert!(is_basic_protocol("file"));
        assert!(!is_basic_protocol("git"));
        assert!(!is_basic_protocol("cvs"));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("https://example.com/path/to/file.tar.gz"), "file.tar.gz");
        assert_eq!(base_name(""), "");
    }
}
