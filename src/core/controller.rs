use crate::adapters::notify::prepare_notification;
use crate::core::header::HeaderReader;
use crate::core::session::{Completion, FormError, FormSession, SubmissionState, SubmitRefusal};
use crate::core::validator::ValidationRules;
use crate::domain::model::{RequestId, SubmissionRequest, SubmissionResult};
use crate::domain::ports::{NotificationRelay, ScoringService};
use crate::utils::error::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Result of one `submit` call as seen by the caller.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Nothing was sent.
    Refused(SubmitRefusal),
    Succeeded {
        result: SubmissionResult,
        notification: Option<NotificationHandle>,
    },
    Failed(FormError),
    /// The session was reset or re-targeted while the request was in flight.
    Discarded,
}

/// A relay call racing independently of the visible success.
#[derive(Debug)]
pub struct NotificationHandle {
    pub id: RequestId,
    handle: JoinHandle<Completion>,
}

impl NotificationHandle {
    /// Waits for the relay; `None` if the task panicked or was aborted.
    pub async fn wait(self) -> Option<Completion> {
        self.handle.await.ok()
    }
}

/// Drives one form session against the scoring service and the relay.
///
/// The session lock is never held across a network call, so `reset` and
/// field edits stay responsive while a request is outstanding.
pub struct FormController<S, N> {
    session: Arc<Mutex<FormSession>>,
    scoring: Arc<S>,
    relay: Arc<N>,
    reader: HeaderReader,
    base_url: String,
}

impl<S, N> Clone for FormController<S, N> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            scoring: Arc::clone(&self.scoring),
            relay: Arc::clone(&self.relay),
            reader: self.reader,
            base_url: self.base_url.clone(),
        }
    }
}

impl<S, N> FormController<S, N>
where
    S: ScoringService + 'static,
    N: NotificationRelay + 'static,
{
    pub fn new(
        scoring: S,
        relay: N,
        reader: HeaderReader,
        rules: ValidationRules,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(FormSession::new(rules))),
            scoring: Arc::new(scoring),
            relay: Arc::new(relay),
            reader,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read-only access to the session.
    pub async fn inspect<T>(&self, f: impl FnOnce(&FormSession) -> T) -> T {
        let session = self.session.lock().await;
        f(&session)
    }

    /// Applies one synchronous transition.
    pub async fn update<T>(&self, f: impl FnOnce(&mut FormSession) -> T) -> T {
        let mut session = self.session.lock().await;
        f(&mut session)
    }

    /// Reads the header of `path` and installs it, clearing weights and impacts.
    pub async fn select_file(&self, path: &Path) -> Result<usize> {
        match self.reader.load(path).await {
            Ok(dataset) => {
                let count = dataset.criterion_count();
                self.update(|s| s.select_dataset(dataset)).await;
                Ok(count)
            }
            Err(e) => {
                tracing::warn!("Could not read header of {}: {}", path.display(), e);
                self.update(FormSession::clear_dataset).await;
                Err(e)
            }
        }
    }

    pub async fn set_weights(&self, raw: &str) {
        self.update(|s| s.set_weights(raw)).await
    }

    pub async fn set_impacts(&self, raw: &str) {
        self.update(|s| s.set_impacts(raw)).await
    }

    pub async fn set_notify(&self, notify: bool, email: Option<&str>) {
        self.update(|s| {
            s.set_notify(notify);
            s.set_email(email);
        })
        .await
    }

    pub async fn can_submit(&self) -> bool {
        self.inspect(FormSession::can_submit).await
    }

    pub async fn dismiss_error(&self) {
        self.update(FormSession::dismiss_error).await
    }

    pub async fn reset(&self) {
        self.update(FormSession::reset).await
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let ticket = match self.update(FormSession::begin_submit).await {
            Ok(ticket) => ticket,
            Err(refusal) => return SubmitOutcome::Refused(refusal),
        };

        let outcome = self.scoring.score(&ticket.request).await;

        let settled = {
            let mut session = self.session.lock().await;
            if session.complete_scoring(ticket.id, outcome) == Completion::Discarded {
                return SubmitOutcome::Discarded;
            }
            match (session.state(), session.result(), session.error()) {
                (SubmissionState::Succeeded, Some(result), _) => Ok(result.clone()),
                (_, _, Some(error)) => Err(error.clone()),
                _ => return SubmitOutcome::Discarded,
            }
        };

        match settled {
            Ok(result) => {
                let notification = ticket
                    .request
                    .notify
                    .then(|| self.dispatch_notification(ticket.id, &ticket.request, &result));
                SubmitOutcome::Succeeded {
                    result,
                    notification,
                }
            }
            Err(error) => SubmitOutcome::Failed(error),
        }
    }

    fn dispatch_notification(
        &self,
        id: RequestId,
        request: &SubmissionRequest,
        result: &SubmissionResult,
    ) -> NotificationHandle {
        let prepared = prepare_notification(request, result, &self.base_url);
        let relay = Arc::clone(&self.relay);
        let session = Arc::clone(&self.session);

        let handle = tokio::spawn(async move {
            let outcome = match prepared {
                Ok(notification) => relay.send(&notification).await,
                Err(e) => Err(e),
            };
            session.lock().await.complete_notification(id, outcome)
        });

        NotificationHandle { id, handle }
    }
}
