//! Helpers shared by every external process the crate drives.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;

/// Check whether an executable responds to `-version`
pub fn tool_available(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Drain a child's stderr on a helper thread so the pipe can never fill up
pub(crate) fn collect_stderr<R: Read + Send + 'static>(mut stderr: R) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut text = String::new();
        let _ = stderr.read_to_string(&mut text);
        text
    })
}

/// Join a stderr collector, yielding an empty string if there was none
pub(crate) fn join_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_collect_stderr() {
        let handle = collect_stderr(Cursor::new(b"broken pipe\n".to_vec()));
        assert_eq!(join_stderr(Some(handle)), "broken pipe\n");
        assert_eq!(join_stderr(None), "");
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        assert!(!tool_available("definitely-not-a-real-tool-3f9a"));
    }
}
