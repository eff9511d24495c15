static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install the fmt subscriber once. Filter from `RUST_LOG`, default `info`; output on stderr.
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Lowercase, trimmed, without a leading `r/`.
pub fn normalize_subreddit(s: &str) -> String {
    let s = s.trim().to_lowercase();
    match s.strip_prefix("r/") {
        Some(rest) => rest.to_string(),
        None => s,
    }
}
