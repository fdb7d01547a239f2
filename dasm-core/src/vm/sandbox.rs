//! Filesystem sandbox: when enabled, any opcode that accepts a path
//! consults an allow-list before calling the `FrameLoader`.

#[derive(Clone, Debug, Default)]
pub struct Sandbox {
    enabled: bool,
    allowed_paths: Vec<String>,
}

impl Sandbox {
    pub fn disabled() -> Sandbox {
        Sandbox::default()
    }

    pub fn enabled(allowed_paths: Vec<String>) -> Sandbox {
        Sandbox { enabled: true, allowed_paths }
    }

    /// A path matches iff it equals an allow-list entry, or has an entry
    /// as a path-prefix followed by `/`.
    pub fn allows(&self, path: &str) -> bool {
        if !self.enabled {
            return true;
        }
        self.allowed_paths.iter().any(|allowed| {
            path == allowed || path.starts_with(&format!("{}/", allowed))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disabled_sandbox_allows_everything() {
        let sandbox = Sandbox::disabled();
        assert!(sandbox.allows("/etc/passwd"));
    }

    #[test]
    fn exact_match_is_allowed() {
        let sandbox = Sandbox::enabled(vec!["/data".into()]);
        assert!(sandbox.allows("/data"));
    }

    #[test]
    fn prefix_match_requires_path_separator() {
        let sandbox = Sandbox::enabled(vec!["/data".into()]);
        assert!(sandbox.allows("/data/sales.csv"));
        assert!(!sandbox.allows("/data-secret/sales.csv"));
    }

    #[test]
    fn unlisted_path_is_denied() {
        let sandbox = Sandbox::enabled(vec!["/data".into()]);
        assert!(!sandbox.allows("/etc/passwd"));
    }
}
