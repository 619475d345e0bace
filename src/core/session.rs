use crate::core::validator::{email_issue, first_invalid_impact, Consistency, ValidationIssue, ValidationRules};
use crate::domain::model::{CriteriaSpec, RequestId, SubmissionRequest, SubmissionResult, UploadedDataset};
use crate::utils::error::{NotificationError, ScoringError};
use std::fmt;

pub const SUBMIT_LABEL: &str = "Calculate TOPSIS";
pub const SUBMIT_LABEL_BUSY: &str = "Processing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormErrorKind {
    /// Inputs were refused locally; nothing was sent.
    Validation,
    /// The scoring request failed or was rejected.
    Server,
}

/// The single error banner shown by the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormError {
    pub kind: FormErrorKind,
    pub message: String,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitRefusal {
    /// A request is already outstanding for this session.
    InFlight,
    Invalid(ValidationIssue),
}

impl fmt::Display for SubmitRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitRefusal::InFlight => f.write_str("A submission is already in progress"),
            SubmitRefusal::Invalid(issue) => fmt::Display::fmt(issue, f),
        }
    }
}

/// Handed out when a submission starts; its id must come back with the completion.
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    pub id: RequestId,
    pub request: SubmissionRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The completion belonged to a request this session no longer tracks.
    Discarded,
}

/// All state of one form, mutated only through the transitions below.
#[derive(Debug)]
pub struct FormSession {
    rules: ValidationRules,
    dataset: Option<UploadedDataset>,
    criteria: CriteriaSpec,
    notify: bool,
    email: Option<String>,
    state: SubmissionState,
    result: Option<SubmissionResult>,
    error: Option<FormError>,
    notification_error: Option<String>,
    active: Option<RequestId>,
    next_request: u64,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new(ValidationRules::default())
    }
}

impl FormSession {
    pub fn new(rules: ValidationRules) -> Self {
        Self {
            rules,
            dataset: None,
            criteria: CriteriaSpec::default(),
            notify: false,
            email: None,
            state: SubmissionState::Idle,
            result: None,
            error: None,
            notification_error: None,
            active: None,
            next_request: 0,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn dataset(&self) -> Option<&UploadedDataset> {
        self.dataset.as_ref()
    }

    pub fn criterion_count(&self) -> Option<usize> {
        self.dataset.as_ref().map(UploadedDataset::criterion_count)
    }

    pub fn criteria(&self) -> &CriteriaSpec {
        &self.criteria
    }

    pub fn notify(&self) -> bool {
        self.notify
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn result(&self) -> Option<&SubmissionResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&FormError> {
        self.error.as_ref()
    }

    pub fn notification_error(&self) -> Option<&str> {
        self.notification_error.as_deref()
    }

    pub fn active_request(&self) -> Option<RequestId> {
        self.active
    }

    pub fn consistency(&self) -> Consistency {
        Consistency::evaluate(
            self.criterion_count(),
            &self.criteria.weights_raw,
            &self.criteria.impacts_raw,
        )
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        self.consistency().is_consistent() && self.state != SubmissionState::Submitting
    }

    pub fn submit_label(&self) -> &'static str {
        if self.state == SubmissionState::Submitting {
            SUBMIT_LABEL_BUSY
        } else {
            SUBMIT_LABEL
        }
    }

    pub fn detected_banner(&self) -> Option<String> {
        self.criterion_count()
            .map(|n| format!("Detected {} criteria", n))
    }

    /// A new file replaces everything derived from the previous one.
    pub fn select_dataset(&mut self, dataset: UploadedDataset) {
        tracing::info!(
            "Selected '{}' with {} criteria",
            dataset.name,
            dataset.criterion_count()
        );
        self.discard_outcome();
        self.criteria = CriteriaSpec::default();
        self.dataset = Some(dataset);
    }

    /// The selected file could not be read; the criterion count becomes undetermined.
    pub fn clear_dataset(&mut self) {
        self.discard_outcome();
        self.criteria = CriteriaSpec::default();
        self.dataset = None;
    }

    pub fn set_weights(&mut self, raw: impl Into<String>) {
        self.criteria.weights_raw = raw.into();
    }

    pub fn set_impacts(&mut self, raw: impl Into<String>) {
        self.criteria.impacts_raw = raw.into();
    }

    pub fn set_notify(&mut self, notify: bool) {
        self.notify = notify;
    }

    pub fn set_email(&mut self, email: Option<&str>) {
        self.email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
    }

    /// Validates the form and, when it passes, moves to `Submitting`.
    ///
    /// A refusal caused by invalid inputs settles the session in `Failed` with
    /// a validation error. A refusal because a request is already in flight
    /// leaves the session untouched.
    pub fn begin_submit(&mut self) -> Result<SubmissionTicket, SubmitRefusal> {
        if self.state == SubmissionState::Submitting {
            return Err(SubmitRefusal::InFlight);
        }

        self.result = None;
        self.error = None;
        self.notification_error = None;
        self.state = SubmissionState::Validating;

        if let Some(issue) = self.local_issue() {
            tracing::info!("Submission refused locally: {}", issue);
            self.state = SubmissionState::Failed;
            self.error = Some(FormError {
                kind: FormErrorKind::Validation,
                message: issue.to_string(),
            });
            return Err(SubmitRefusal::Invalid(issue));
        }

        let Some(dataset) = self.dataset.as_ref() else {
            // local_issue already reports a missing dataset
            self.state = SubmissionState::Failed;
            return Err(SubmitRefusal::Invalid(ValidationIssue::NoDataset));
        };

        self.next_request += 1;
        let id = RequestId(self.next_request);
        let request = SubmissionRequest {
            file_name: dataset.name.clone(),
            file_bytes: dataset.bytes.clone(),
            weights_raw: self.criteria.weights_raw.clone(),
            impacts_raw: self.criteria.impacts_raw.clone(),
            notify: self.notify,
            email: if self.notify { self.email.clone() } else { None },
        };

        self.active = Some(id);
        self.state = SubmissionState::Submitting;
        tracing::info!("Submission {} started for '{}'", id, request.file_name);
        Ok(SubmissionTicket { id, request })
    }

    fn local_issue(&self) -> Option<ValidationIssue> {
        if let Some(issue) = self.consistency().issue() {
            return Some(issue);
        }
        if let Some(issue) = email_issue(self.notify, self.email.as_deref(), &self.rules) {
            return Some(issue);
        }
        if self.rules.check_impact_symbols {
            if let Some(token) = first_invalid_impact(&self.criteria.impacts_raw) {
                return Some(ValidationIssue::InvalidImpact(token.to_string()));
            }
        }
        None
    }

    fn is_current(&self, id: RequestId) -> bool {
        self.active == Some(id)
    }

    /// Settles the scoring request `id`, unless the session has moved on.
    pub fn complete_scoring(
        &mut self,
        id: RequestId,
        outcome: Result<SubmissionResult, ScoringError>,
    ) -> Completion {
        if !self.is_current(id) || self.state != SubmissionState::Submitting {
            tracing::debug!("Discarding stale scoring completion {}", id);
            return Completion::Discarded;
        }

        match outcome {
            Ok(result) => {
                tracing::info!("Submission {} succeeded with {} rows", id, result.table.len());
                self.result = Some(result);
                self.error = None;
                self.state = SubmissionState::Succeeded;
            }
            Err(e) => {
                tracing::warn!("Submission {} failed: {}", id, e);
                self.result = None;
                self.error = Some(FormError {
                    kind: FormErrorKind::Server,
                    message: e.user_message(),
                });
                self.state = SubmissionState::Failed;
            }
        }
        Completion::Applied
    }

    /// Records the relay outcome for request `id`; never touches the scoring result.
    pub fn complete_notification(
        &mut self,
        id: RequestId,
        outcome: Result<(), NotificationError>,
    ) -> Completion {
        if !self.is_current(id) || self.state != SubmissionState::Succeeded {
            tracing::debug!("Discarding stale notification completion {}", id);
            return Completion::Discarded;
        }

        match outcome {
            Ok(()) => {
                tracing::info!("Result link for {} delivered", id);
                self.notification_error = None;
            }
            Err(e) => {
                tracing::warn!("Notification for {} failed: {}", id, e);
                self.notification_error = Some(e.user_message());
            }
        }
        Completion::Applied
    }

    /// Hides the error banner. The state stays `Failed` until the next submit or reset.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Back to the initial state; any outstanding completion will be discarded.
    pub fn reset(&mut self) {
        if let Some(id) = self.active {
            tracing::debug!("Reset invalidates request {}", id);
        }
        self.discard_outcome();
        self.dataset = None;
        self.criteria = CriteriaSpec::default();
        self.notify = false;
        self.email = None;
    }

    fn discard_outcome(&mut self) {
        self.active = None;
        self.state = SubmissionState::Idle;
        self.result = None;
        self.error = None;
        self.notification_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dataset(header: &str) -> UploadedDataset {
        UploadedDataset {
            name: "matrix.csv".to_string(),
            bytes: format!("{}\nA1,1,2,3,4\n", header).into_bytes(),
            header: header.split(',').map(str::to_string).collect(),
        }
    }

    fn ready_session() -> FormSession {
        let mut session = FormSession::default();
        session.select_dataset(dataset("Alt,C1,C2,C3,C4"));
        session.set_weights("1,1,1,1");
        session.set_impacts("+,+,-,+");
        session
    }

    fn empty_result() -> SubmissionResult {
        SubmissionResult {
            table: Vec::new(),
            download_ref: None,
            server_mail: None,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_initial_state() {
        let session = FormSession::default();
        assert_eq!(session.state(), SubmissionState::Idle);
        assert_eq!(session.criterion_count(), None);
        assert!(!session.can_submit());
        assert_eq!(session.detected_banner(), None);
        assert_eq!(session.submit_label(), SUBMIT_LABEL);
    }

    #[test]
    fn test_enabled_only_when_consistent() {
        let mut session = ready_session();
        assert_eq!(session.criterion_count(), Some(4));
        assert!(session.can_submit());

        session.set_weights("1,1,1");
        assert!(!session.can_submit());
        session.set_weights("1,1,1,1");
        session.set_impacts("+,+,-,+,+");
        assert!(!session.can_submit());
    }

    #[test]
    fn test_new_file_clears_weights_and_impacts() {
        let mut session = ready_session();
        session.select_dataset(dataset("Alt,C1,C2"));

        assert_eq!(session.criterion_count(), Some(2));
        assert_eq!(session.criteria(), &CriteriaSpec::default());
        assert_eq!(session.detected_banner().as_deref(), Some("Detected 2 criteria"));
    }

    #[test]
    fn test_unreadable_file_leaves_count_undetermined() {
        let mut session = ready_session();
        session.clear_dataset();
        assert_eq!(session.criterion_count(), None);
        assert!(!session.can_submit());
    }

    #[test]
    fn test_mismatch_settles_failed_without_ticket() {
        let mut session = ready_session();
        session.set_weights("1,1,1");

        let refusal = session.begin_submit().unwrap_err();
        assert!(matches!(
            refusal,
            SubmitRefusal::Invalid(ValidationIssue::CountMismatch { expected: 4, .. })
        ));
        assert_eq!(session.state(), SubmissionState::Failed);
        let error = session.error().unwrap();
        assert_eq!(error.kind, FormErrorKind::Validation);
        assert_eq!(error.message, "Exactly 4 weights and impacts are required");
        assert_eq!(session.active_request(), None);
    }

    #[test]
    fn test_notify_without_email_is_refused_locally() {
        let mut session = ready_session();
        session.set_notify(true);
        session.set_email(Some(""));

        let refusal = session.begin_submit().unwrap_err();
        assert_eq!(refusal, SubmitRefusal::Invalid(ValidationIssue::MissingEmail));
        assert_eq!(session.state(), SubmissionState::Failed);
    }

    #[test]
    fn test_impact_symbol_check_is_opt_in() {
        let mut session = ready_session();
        session.set_impacts("+,+,x,+");
        assert!(session.begin_submit().is_ok());

        let mut strict = FormSession::new(ValidationRules {
            check_impact_symbols: true,
            check_email_format: true,
        });
        strict.select_dataset(dataset("Alt,C1,C2,C3,C4"));
        strict.set_weights("1,1,1,1");
        strict.set_impacts("+,+,x,+");
        assert_eq!(
            strict.begin_submit().unwrap_err(),
            SubmitRefusal::Invalid(ValidationIssue::InvalidImpact("x".to_string()))
        );
    }

    #[test]
    fn test_submit_snapshots_request() {
        let mut session = ready_session();
        session.set_email(Some("kept@example.com"));

        let ticket = session.begin_submit().unwrap();
        assert_eq!(session.state(), SubmissionState::Submitting);
        assert_eq!(session.submit_label(), SUBMIT_LABEL_BUSY);
        assert!(!session.can_submit());
        assert_eq!(ticket.request.weights_raw, "1,1,1,1");
        assert_eq!(ticket.request.impacts_raw, "+,+,-,+");
        assert!(!ticket.request.notify);
        // email is only posted alongside a notify request
        assert_eq!(ticket.request.email, None);

        session.set_weights("9,9,9,9");
        assert_eq!(ticket.request.weights_raw, "1,1,1,1");
    }

    #[test]
    fn test_at_most_one_in_flight() {
        let mut session = ready_session();
        let first = session.begin_submit().unwrap();
        assert_eq!(session.begin_submit().unwrap_err(), SubmitRefusal::InFlight);
        assert_eq!(session.active_request(), Some(first.id));
        assert_eq!(session.state(), SubmissionState::Submitting);
    }

    #[test]
    fn test_success_then_failure_clears_result() {
        let mut session = ready_session();
        let ticket = session.begin_submit().unwrap();
        assert_eq!(
            session.complete_scoring(ticket.id, Ok(empty_result())),
            Completion::Applied
        );
        assert_eq!(session.state(), SubmissionState::Succeeded);
        assert!(session.result().is_some());

        let ticket = session.begin_submit().unwrap();
        assert!(session.result().is_none());
        session.complete_scoring(
            ticket.id,
            Err(ScoringError::Rejected {
                status: 400,
                message: Some("Impacts must be + or -".to_string()),
            }),
        );
        assert_eq!(session.state(), SubmissionState::Failed);
        assert!(session.result().is_none());
        assert_eq!(session.error().unwrap().message, "Impacts must be + or -");
        // inputs survive a server failure
        assert_eq!(session.criteria().weights_raw, "1,1,1,1");
    }

    #[test]
    fn test_dismiss_error_only_hides_banner() {
        let mut session = ready_session();
        let ticket = session.begin_submit().unwrap();
        session.complete_scoring(
            ticket.id,
            Err(ScoringError::Rejected {
                status: 500,
                message: None,
            }),
        );
        assert_eq!(session.error().unwrap().kind, FormErrorKind::Server);

        session.dismiss_error();

        assert!(session.error().is_none());
        assert_eq!(session.state(), SubmissionState::Failed);
        assert_eq!(session.criteria().weights_raw, "1,1,1,1");
        assert_eq!(session.criteria().impacts_raw, "+,+,-,+");
        assert_eq!(session.criterion_count(), Some(4));
        assert!(session.can_submit());
        assert!(session.begin_submit().is_ok());
    }

    #[test]
    fn test_reset_discards_in_flight_completion() {
        let mut session = ready_session();
        let ticket = session.begin_submit().unwrap();

        session.reset();
        assert_eq!(
            session.complete_scoring(ticket.id, Ok(empty_result())),
            Completion::Discarded
        );
        assert_eq!(session.state(), SubmissionState::Idle);
        assert!(session.result().is_none());
    }

    #[test]
    fn test_older_request_cannot_overwrite_newer() {
        let mut session = ready_session();
        let old = session.begin_submit().unwrap();
        session.select_dataset(dataset("Alt,C1,C2,C3,C4"));
        session.set_weights("1,1,1,1");
        session.set_impacts("+,+,-,+");
        let new = session.begin_submit().unwrap();

        assert_eq!(
            session.complete_scoring(old.id, Ok(empty_result())),
            Completion::Discarded
        );
        assert_eq!(session.state(), SubmissionState::Submitting);
        assert_eq!(
            session.complete_scoring(new.id, Ok(empty_result())),
            Completion::Applied
        );
    }

    #[test]
    fn test_notification_failure_keeps_result() {
        let mut session = ready_session();
        let ticket = session.begin_submit().unwrap();
        session.complete_scoring(ticket.id, Ok(empty_result()));

        let applied = session.complete_notification(ticket.id, Err(NotificationError::MissingLink));
        assert_eq!(applied, Completion::Applied);
        assert_eq!(session.state(), SubmissionState::Succeeded);
        assert!(session.result().is_some());
        assert!(session.notification_error().is_some());
        assert!(session.error().is_none());
    }

    #[test]
    fn test_notification_after_reset_is_discarded() {
        let mut session = ready_session();
        let ticket = session.begin_submit().unwrap();
        session.complete_scoring(ticket.id, Ok(empty_result()));
        session.reset();

        assert_eq!(
            session.complete_notification(ticket.id, Err(NotificationError::NotConfigured)),
            Completion::Discarded
        );
        assert_eq!(session.notification_error(), None);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut session = ready_session();
        session.set_notify(true);
        session.set_email(Some("a@b.io"));
        let ticket = session.begin_submit().unwrap();
        session.complete_scoring(ticket.id, Ok(empty_result()));

        session.reset();

        assert_eq!(session.state(), SubmissionState::Idle);
        assert!(session.dataset().is_none());
        assert_eq!(session.criterion_count(), None);
        assert_eq!(session.criteria(), &CriteriaSpec::default());
        assert!(!session.notify());
        assert_eq!(session.email(), None);
        assert!(session.result().is_none());
        assert!(session.error().is_none());
        assert!(session.notification_error().is_none());
        assert_eq!(session.active_request(), None);
    }
}
