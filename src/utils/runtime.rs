use anyhow::Result;

/// The ledger is driven from a single logical thread, so the current-thread flavour is all the
/// application needs.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
