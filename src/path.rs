//! 4.A Path Translator.
//!
//! Pure, infallible composition of the remote root and a mount-relative
//! path. Overlong results are truncated and surfaced as an error only by
//! whichever operation later tries to use them — the translator itself has
//! no failure mode.

/// Platform path length limit used to detect "ridiculously long" results
/// (mirrors `bbfs.c`'s reliance on `PATH_MAX`).
pub const PATH_MAX: usize = libc::PATH_MAX as usize;

/// Composes a remote absolute path from the configured remote root and a
/// mount-relative path (which always begins with `/`).
///
/// Returns `None` if the composed path would not fit in `PATH_MAX` bytes;
/// callers treat that as the error condition of whichever operation invoked
/// them, not a failure of this function.
pub fn full_path(remote_root: &str, mount_relative: &str) -> Option<String> {
    debug_assert!(mount_relative.starts_with('/'));
    let mut joined = String::with_capacity(remote_root.len() + mount_relative.len());
    joined.push_str(remote_root);
    joined.push_str(mount_relative);
    if joined.len() >= PATH_MAX {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_root_and_relative_path() {
        assert_eq!(full_path("/root", "/a.txt"), Some("/root/a.txt".to_string()));
    }

    #[test]
    fn root_directory_relative_path() {
        assert_eq!(full_path("/root", "/"), Some("/root/".to_string()));
    }

    #[test]
    fn empty_root_still_prefixes_the_slash() {
        assert_eq!(full_path("", "/a"), Some("/a".to_string()));
    }

    #[test]
    fn overlong_concatenation_is_rejected() {
        let huge = "/".repeat(PATH_MAX);
        assert_eq!(full_path("/root", &huge), None);
    }
}
