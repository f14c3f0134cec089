//! Challenge detection and human-in-the-loop resolution.
//!
//! Detection is a pure classification over the rendered session's final URL
//! and page content, with no probing. Resolution suspends only the owning task:
//! it awaits an abstract confirmation source (a console prompt in the CLI, a
//! [`NotifySource`] in tests) under a long configurable timeout, so the core
//! never blocks on an attached terminal.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::FetchError;

/// URL fragments that mark a bot-mitigation / verification wall.
const VERIFICATION_URL_MARKERS: &[&str] = &["/verify/traffic", "/verify/error", "captcha"];

/// URL fragments that mark an authentication wall.
const LOGIN_URL_MARKERS: &[&str] = &["/login", "/signin", "/account/login"];

/// Classification of a blocked rendered response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    LoginRequired,
    VerificationRequired,
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeKind::LoginRequired => write!(f, "login-required"),
            ChallengeKind::VerificationRequired => write!(f, "verification-required"),
        }
    }
}

/// Classifies a rendered response as blocked or clear.
///
/// Pure function over the final URL and page body: verification markers are
/// checked before login markers because mitigation pages sometimes embed a
/// login form as well.
#[must_use]
pub fn classify(final_url: &str, html: &str) -> Option<ChallengeKind> {
    let url = final_url.to_ascii_lowercase();
    if VERIFICATION_URL_MARKERS.iter().any(|m| url.contains(m)) {
        return Some(ChallengeKind::VerificationRequired);
    }
    if LOGIN_URL_MARKERS.iter().any(|m| url.contains(m)) {
        return Some(ChallengeKind::LoginRequired);
    }
    let body = html.to_ascii_lowercase();
    if body.contains("data-challenge=\"captcha\"") || body.contains("traffic verification") {
        return Some(ChallengeKind::VerificationRequired);
    }
    None
}

/// A source of operator confirmation signals.
///
/// `wait_for_confirmation` completes when the operator indicates the
/// challenge has been dealt with in the rendering session.
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
    async fn wait_for_confirmation(&self);
}

/// Confirmation source backed by a [`tokio::sync::Notify`]; used in tests
/// and wherever confirmations arrive programmatically.
#[derive(Default)]
pub struct NotifySource {
    notify: Notify,
}

impl NotifySource {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Signals one pending waiter (or the next one to arrive).
    pub fn confirm(&self) {
        self.notify.notify_one();
    }
}

#[async_trait]
impl ConfirmationSource for NotifySource {
    async fn wait_for_confirmation(&self) {
        self.notify.notified().await;
    }
}

/// Gate between a blocked rendered task and the operator.
///
/// Cloneable handle; all clones share the same confirmation source so a
/// single operator signal serves whichever task is currently suspended.
#[derive(Clone)]
pub struct ChallengeGate {
    confirmations: Arc<dyn ConfirmationSource>,
    resolve_timeout: Duration,
}

impl ChallengeGate {
    #[must_use]
    pub fn new(confirmations: Arc<dyn ConfirmationSource>, resolve_timeout: Duration) -> Self {
        Self {
            confirmations,
            resolve_timeout,
        }
    }

    /// Suspends the calling task until the operator confirms, up to the
    /// configured timeout. Only the calling task waits; concurrent tasks on
    /// other slots are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ChallengeTimeout`] if no confirmation arrives
    /// in time; the caller should degrade the item rather than keep the
    /// worker slot occupied.
    pub async fn resolve(&self, kind: ChallengeKind) -> Result<(), FetchError> {
        tracing::warn!(
            %kind,
            timeout_secs = self.resolve_timeout.as_secs(),
            "challenge encountered, waiting for operator confirmation"
        );
        match tokio::time::timeout(
            self.resolve_timeout,
            self.confirmations.wait_for_confirmation(),
        )
        .await
        {
            Ok(()) => {
                tracing::info!(%kind, "operator confirmed, resuming");
                Ok(())
            }
            Err(_) => Err(FetchError::ChallengeTimeout {
                waited_secs: self.resolve_timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_page_classifies_as_none() {
        assert_eq!(
            classify(
                "https://catalog.example/phone-case-p101.html",
                "<html><body>product</body></html>"
            ),
            None
        );
    }

    #[test]
    fn traffic_verification_url_is_verification_required() {
        assert_eq!(
            classify("https://catalog.example/verify/traffic?from=search", ""),
            Some(ChallengeKind::VerificationRequired)
        );
    }

    #[test]
    fn login_redirect_is_login_required() {
        assert_eq!(
            classify("https://catalog.example/account/login?next=%2Fsearch", ""),
            Some(ChallengeKind::LoginRequired)
        );
    }

    #[test]
    fn verification_wins_over_login_marker() {
        assert_eq!(
            classify("https://catalog.example/verify/error?return=/login", ""),
            Some(ChallengeKind::VerificationRequired)
        );
    }

    #[test]
    fn captcha_body_marker_is_verification_required() {
        assert_eq!(
            classify(
                "https://catalog.example/phone-case-p101.html",
                "<div data-challenge=\"captcha\"></div>"
            ),
            Some(ChallengeKind::VerificationRequired)
        );
    }

    #[tokio::test]
    async fn resolve_completes_when_confirmed() {
        let source = NotifySource::new();
        let gate = ChallengeGate::new(
            Arc::clone(&source) as Arc<dyn ConfirmationSource>,
            Duration::from_secs(5),
        );
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.resolve(ChallengeKind::VerificationRequired).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.confirm();
        let result = waiter.await.expect("task should not panic");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn resolve_times_out_without_confirmation() {
        let source = NotifySource::new();
        let gate = ChallengeGate::new(
            source as Arc<dyn ConfirmationSource>,
            Duration::from_millis(30),
        );
        let result = gate.resolve(ChallengeKind::LoginRequired).await;
        assert!(matches!(result, Err(FetchError::ChallengeTimeout { .. })));
    }
}
