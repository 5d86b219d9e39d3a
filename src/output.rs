use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `SCHEMATIC_QUIET=1` suppresses status lines; results are still printed
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("SCHEMATIC_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
