//! Console-backed operator confirmation.

use async_trait::async_trait;

use shelfscan_fetch::ConfirmationSource;

/// Waits for the operator to press Enter after dealing with a challenge in
/// the rendering session.
pub struct ConsoleConfirmation;

#[async_trait]
impl ConfirmationSource for ConsoleConfirmation {
    async fn wait_for_confirmation(&self) {
        eprintln!("A challenge is blocking the run. Complete it in the rendering session, then press Enter to continue.");
        // Stdin reads block, so hop off the async runtime for the wait.
        let _ = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)
        })
        .await;
    }
}
