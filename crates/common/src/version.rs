//! Build version reporting for startup logs and the `version` CLI op.

/// Static build information baked in at compile time.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_profile: &'static str,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vaultdrop {} ({})", self.version, self.build_profile)
    }
}

/// Report the crate version and build profile.
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        build_profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_info_renders() {
        let info = build_info();
        assert!(!info.version.is_empty());
        assert!(info.to_string().starts_with("vaultdrop "));
    }
}
