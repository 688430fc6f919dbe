pub const PROTSCAN_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version_cli_text() -> String {
    format!(
        "protscan {}\nProtein domain analysis job tracking and result aggregation",
        PROTSCAN_VERSION
    )
}
