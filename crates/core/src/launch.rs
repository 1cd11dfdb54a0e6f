//! Command-line launch options.

/// Options gathered from the command line at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Use the software rasterizer instead of a hardware adapter.
    pub use_software_adapter: bool,
}

impl LaunchOptions {
    /// Scans command-line arguments for supported flags.
    ///
    /// The only recognized flag is `warp` behind a single `-` or `/`
    /// prefix, matched ASCII case-insensitively. Everything else
    /// (including the program name) is ignored.
    pub fn parse<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let use_software_adapter = args.into_iter().any(|arg| is_software_flag(&arg));
        Self {
            use_software_adapter,
        }
    }

    /// Decorates a window title with the software-adapter suffix when
    /// applicable.
    pub fn decorate_title(&self, base: &str) -> String {
        if self.use_software_adapter {
            format!("{base} (WARP)")
        } else {
            base.to_string()
        }
    }
}

fn is_software_flag(arg: &str) -> bool {
    arg.strip_prefix(['-', '/'])
        .is_some_and(|rest| rest.eq_ignore_ascii_case("warp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> LaunchOptions {
        LaunchOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_no_args_selects_hardware() {
        let options = parse(&["first-triangle"]);
        assert!(!options.use_software_adapter);
    }

    #[test]
    fn test_dash_warp() {
        assert!(parse(&["first-triangle", "-warp"]).use_software_adapter);
    }

    #[test]
    fn test_slash_warp() {
        assert!(parse(&["first-triangle", "/warp"]).use_software_adapter);
    }

    #[test]
    fn test_case_insensitive() {
        assert!(parse(&["first-triangle", "-WARP"]).use_software_adapter);
        assert!(parse(&["first-triangle", "/WaRp"]).use_software_adapter);
    }

    #[test]
    fn test_requires_exactly_one_prefix() {
        assert!(!parse(&["first-triangle", "--warp"]).use_software_adapter);
        assert!(!parse(&["first-triangle", "warp"]).use_software_adapter);
    }

    #[test]
    fn test_unknown_args_ignored() {
        let options = parse(&["first-triangle", "-fullscreen", "extra"]);
        assert!(!options.use_software_adapter);
    }

    #[test]
    fn test_title_suffix() {
        let warp = LaunchOptions {
            use_software_adapter: true,
        };
        let hardware = LaunchOptions::default();
        assert_eq!(warp.decorate_title("My First Triangle"), "My First Triangle (WARP)");
        assert_eq!(hardware.decorate_title("My First Triangle"), "My First Triangle");
    }
}
