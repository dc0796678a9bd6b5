/// Facts about this binary recorded by `build.rs`
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub built_at: &'static str,
    pub git_revision: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
}

pub const BUILD: BuildInfo = BuildInfo {
    version: env!("CARGO_PKG_VERSION"),
    built_at: env!("SLIDESCOPE_BUILD_DATE"),
    git_revision: env!("SLIDESCOPE_GIT_REV"),
    target: env!("SLIDESCOPE_TARGET"),
    profile: env!("SLIDESCOPE_PROFILE"),
};

impl BuildInfo {
    pub fn version() -> &'static str {
        BUILD.version
    }

    /// One-line description for logs and bug reports
    pub fn describe(&self) -> String {
        format!(
            "{} ({} {}, {} build, {})",
            self.version, self.git_revision, self.target, self.profile, self.built_at
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_starts_with_version() {
        let line = BUILD.describe();
        assert!(line.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(line.contains(BUILD.profile));
    }
}
