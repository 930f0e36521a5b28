//! Shared shell-quoting for the fixed remote command templates (4.F):
//! single-quote the argument, escaping embedded single quotes with the
//! POSIX "close, escape, reopen" idiom.

pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_plain_text_in_single_quotes() {
        assert_eq!(shell_quote("/a/b"), "'/a/b'");
    }

    #[test]
    fn escapes_embedded_single_quotes() {
        assert_eq!(shell_quote("a'b"), "'a'\\''b'");
    }
}
