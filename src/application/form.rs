use std::sync::Arc;

use crate::api::JobsBackend;
use crate::models::{JobDescriptor, ProfileType};
use crate::notify::Notifier;

use super::duplicate::{CheckResult, DuplicateCheck};
use super::profile::{self, Field, FormFields, ValidationErrors};
use super::skills::{self, SkillSet};

pub const ALREADY_APPLIED: &str = "You have already applied to this job.";
pub const SUBMITTED: &str = "Application submitted!";
pub const SUBMIT_FAILED: &str = "Failed to apply";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Editable,
    Submitting,
    /// The duplicate check found an earlier application for this email.
    AlreadyApplied,
    /// Submitted; nothing more can be changed.
    Applied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMessage {
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The submit control was disabled (submitting or already applied).
    Blocked,
    Invalid(ValidationErrors),
    Submitted { already_applied: bool },
    Failed(String),
}

type Callback = Box<dyn FnMut() + Send>;

/// Inline application form for one job link.
pub struct ApplicationForm<B> {
    backend: Arc<B>,
    link_id: String,
    job: Option<JobDescriptor>,
    fields: FormFields,
    errors: ValidationErrors,
    skills: SkillSet,
    skill_input: String,
    phase: Phase,
    message: Option<FormMessage>,
    duplicate: DuplicateCheck,
    on_submitted: Option<Callback>,
}

impl<B> ApplicationForm<B>
where
    B: JobsBackend + Send + Sync + 'static,
{
    pub fn new(backend: Arc<B>, link_id: impl Into<String>, job: Option<JobDescriptor>) -> Self {
        Self {
            backend,
            link_id: link_id.into(),
            job,
            fields: FormFields::default(),
            errors: ValidationErrors::new(),
            skills: SkillSet::new(),
            skill_input: String::new(),
            phase: Phase::Editable,
            message: None,
            duplicate: DuplicateCheck::default(),
            on_submitted: None,
        }
    }

    pub fn on_submitted(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_submitted = Some(Box::new(callback));
        self
    }

    // --- accessors ---

    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    pub fn job(&self) -> Option<&JobDescriptor> {
        self.job.as_ref()
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn skills(&self) -> &SkillSet {
        &self.skills
    }

    pub fn skill_input(&self) -> &str {
        &self.skill_input
    }

    pub fn suggestions(&self) -> Vec<&'static str> {
        skills::suggestions(&self.skill_input)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn message(&self) -> Option<&FormMessage> {
        self.message.as_ref()
    }

    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Editable
    }

    pub fn submit_label(&self) -> &'static str {
        match self.phase {
            Phase::Submitting => "Submitting…",
            Phase::Applied | Phase::AlreadyApplied => "Applied",
            Phase::Editable => "Submit Application",
        }
    }

    // --- job context ---

    /// Fetches the job when none was handed in. Failure only costs the
    /// header and fact cards.
    pub async fn ensure_job(&mut self) {
        if self.job.is_some() || self.link_id.is_empty() {
            return;
        }
        match self.backend.fetch_job(&self.link_id).await {
            Ok(job) => self.job = Some(job),
            Err(e) => tracing::warn!("could not load job {}: {}", self.link_id, e),
        }
    }

    // --- editing ---

    fn editable(&self) -> bool {
        self.phase != Phase::Applied
    }

    /// Sets a text field and clears that field's error. Email edits also
    /// restart the duplicate check.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        if !self.editable() {
            return;
        }
        *self.fields.get_mut(field) = value.into();
        self.errors.remove(&field);
        if field == Field::Email {
            self.email_changed();
        }
    }

    pub fn push_char(&mut self, field: Field, c: char) {
        let mut value = self.fields.get(field).to_string();
        value.push(c);
        self.set_field(field, value);
    }

    pub fn pop_char(&mut self, field: Field) {
        let mut value = self.fields.get(field).to_string();
        value.pop();
        self.set_field(field, value);
    }

    pub fn set_profile_type(&mut self, profile_type: ProfileType) {
        if self.editable() {
            self.fields.profile_type = profile_type;
        }
    }

    pub fn set_fresher(&mut self, is_fresher: bool) {
        if self.editable() {
            self.fields.is_fresher = is_fresher;
        }
    }

    fn email_changed(&mut self) {
        if self.phase == Phase::AlreadyApplied {
            self.phase = Phase::Editable;
        }
        if profile::is_valid_email(&self.fields.email) {
            self.duplicate
                .schedule(self.backend.clone(), &self.link_id, &self.fields.email);
        } else {
            self.duplicate.cancel();
        }
    }

    fn apply_check(&mut self, result: CheckResult, notifier: &dyn Notifier) {
        match result.outcome {
            Ok(true) if self.phase == Phase::Editable => {
                tracing::info!("{} has already applied to {}", result.email, self.link_id);
                self.phase = Phase::AlreadyApplied;
                self.message = Some(FormMessage {
                    text: ALREADY_APPLIED.to_string(),
                    is_error: false,
                });
                notifier.info(ALREADY_APPLIED);
            }
            Ok(true) => {}
            Ok(false) | Err(_) => {
                if let Err(e) = &result.outcome {
                    tracing::debug!("duplicate check failed, ignoring: {}", e);
                }
                if self.phase == Phase::Editable {
                    self.message = None;
                }
            }
        }
    }

    /// Applies a finished duplicate check, if one is waiting.
    pub fn poll_duplicate_check(&mut self, notifier: &dyn Notifier) -> bool {
        match self.duplicate.try_take() {
            Some(result) => {
                self.apply_check(result, notifier);
                true
            }
            None => false,
        }
    }

    /// Waits for the pending duplicate check (if any) and applies it.
    pub async fn settle_duplicate_check(&mut self, notifier: &dyn Notifier) -> bool {
        match self.duplicate.next().await {
            Some(result) => {
                self.apply_check(result, notifier);
                true
            }
            None => false,
        }
    }

    // --- skills ---

    pub fn set_skill_input(&mut self, value: impl Into<String>) {
        self.skill_input = value.into();
    }

    /// Typing into the skill box; `,` acts like Enter.
    pub fn skill_char(&mut self, c: char) {
        if c == ',' {
            self.confirm_skill_input();
        } else {
            self.skill_input.push(c);
        }
    }

    pub fn confirm_skill_input(&mut self) -> bool {
        let input = std::mem::take(&mut self.skill_input);
        if self.add_skill(&input) {
            true
        } else {
            self.skill_input = input;
            false
        }
    }

    pub fn add_skill(&mut self, value: &str) -> bool {
        if !self.editable() || !self.skills.add(value) {
            return false;
        }
        self.skill_input.clear();
        true
    }

    pub fn remove_skill(&mut self, value: &str) -> bool {
        self.editable() && self.skills.remove(value)
    }

    /// Backspace in the skill box: edit the text, or drop the last chip
    /// once the text is empty.
    pub fn skill_backspace(&mut self) {
        if self.skill_input.is_empty() {
            if self.editable() {
                self.skills.pop();
            }
        } else {
            self.skill_input.pop();
        }
    }

    // --- submit ---

    pub async fn submit(&mut self, notifier: &dyn Notifier) -> SubmitOutcome {
        if !self.can_submit() {
            return SubmitOutcome::Blocked;
        }
        self.message = None;

        let valid = match profile::validate(&self.fields) {
            Ok(valid) => valid,
            Err(errors) => {
                tracing::debug!("validation failed on {} field(s)", errors.len());
                self.errors = errors.clone();
                return SubmitOutcome::Invalid(errors);
            }
        };
        self.errors.clear();

        let submission = valid.into_submission(self.skills.to_vec());
        self.phase = Phase::Submitting;

        match self.backend.apply(&self.link_id, &submission).await {
            Ok(response) => {
                let already_applied = response.already_applied.unwrap_or(false);
                let text = if already_applied {
                    ALREADY_APPLIED.to_string()
                } else {
                    response
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| SUBMITTED.to_string())
                };
                tracing::info!(
                    "application for {} accepted (already applied: {})",
                    self.link_id,
                    already_applied
                );

                self.phase = Phase::Applied;
                self.duplicate.cancel();
                if already_applied {
                    notifier.info(&text);
                } else {
                    notifier.success(&text);
                }
                self.message = Some(FormMessage { text, is_error: false });
                if let Some(callback) = self.on_submitted.as_mut() {
                    callback();
                }
                SubmitOutcome::Submitted { already_applied }
            }
            Err(e) => {
                tracing::error!("application for {} failed: {}", self.link_id, e);
                let text = e.backend_message().unwrap_or(SUBMIT_FAILED).to_string();
                self.phase = Phase::Editable;
                notifier.error(&text);
                self.message = Some(FormMessage {
                    text: text.clone(),
                    is_error: true,
                });
                SubmitOutcome::Failed(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::models::{ApplicationSubmission, ApplyResponse};
    use crate::notify::{NoticeLevel, ToastQueue};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeJobs {
        job: Option<JobDescriptor>,
        applied_emails: Vec<String>,
        check_fails: bool,
        response: Option<ApplyResponse>,
        reject_with: Option<Option<String>>,
        checks: Mutex<Vec<String>>,
        submissions: Mutex<Vec<ApplicationSubmission>>,
    }

    impl JobsBackend for FakeJobs {
        async fn fetch_job(&self, _link_id: &str) -> Result<JobDescriptor, ClientError> {
            self.job.clone().ok_or(ClientError::Status {
                status: 404,
                message: None,
            })
        }

        async fn has_applied(&self, _link_id: &str, email: &str) -> Result<bool, ClientError> {
            self.checks.lock().unwrap().push(email.to_string());
            if self.check_fails {
                return Err(ClientError::Status {
                    status: 502,
                    message: None,
                });
            }
            Ok(self.applied_emails.iter().any(|e| e == email))
        }

        async fn apply(
            &self,
            _link_id: &str,
            submission: &ApplicationSubmission,
        ) -> Result<ApplyResponse, ClientError> {
            self.submissions.lock().unwrap().push(submission.clone());
            if let Some(message) = &self.reject_with {
                return Err(ClientError::Status {
                    status: 400,
                    message: message.clone(),
                });
            }
            Ok(self.response.clone().unwrap_or_default())
        }
    }

    fn build(backend: FakeJobs) -> (ApplicationForm<FakeJobs>, Arc<FakeJobs>) {
        let backend = Arc::new(backend);
        (ApplicationForm::new(backend.clone(), "link-1", None), backend)
    }

    fn fill_student(form: &mut ApplicationForm<FakeJobs>) {
        form.set_field(Field::Name, "Asha");
        form.set_field(Field::Email, "asha@mail.io");
        form.set_field(Field::College, "IIT");
    }

    #[tokio::test]
    async fn test_student_without_college_blocks_submit() {
        let (mut form, backend) = build(FakeJobs::default());
        let toasts = ToastQueue::new();
        form.set_field(Field::Name, "Asha");
        form.set_field(Field::Email, "asha@mail.io");

        let outcome = form.submit(&toasts).await;

        match outcome {
            SubmitOutcome::Invalid(errors) => assert!(errors.contains_key(&Field::College)),
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert_eq!(form.error(Field::College), Some("College is required for students"));
        assert!(backend.submissions.lock().unwrap().is_empty());
        assert_eq!(form.phase(), Phase::Editable);
    }

    #[tokio::test]
    async fn test_editing_clears_only_that_error() {
        let (mut form, _) = build(FakeJobs::default());
        let toasts = ToastQueue::new();
        form.submit(&toasts).await;
        assert!(form.error(Field::Name).is_some());
        assert!(form.error(Field::College).is_some());

        form.push_char(Field::Name, 'A');
        assert!(form.error(Field::Name).is_none());
        assert!(form.error(Field::College).is_some());
    }

    #[tokio::test]
    async fn test_fresher_degree_then_success() {
        let (mut form, backend) = build(FakeJobs::default());
        let toasts = ToastQueue::new();
        form.set_field(Field::Name, "Asha");
        form.set_field(Field::Email, "asha@mail.io");
        form.set_profile_type(ProfileType::Postgraduate);
        form.set_fresher(true);

        assert!(matches!(form.submit(&toasts).await, SubmitOutcome::Invalid(_)));
        assert_eq!(form.error(Field::Degree), Some("Select your degree"));

        form.set_field(Field::Degree, "BTech");
        assert!(form.error(Field::Degree).is_none());
        form.set_field(Field::College, "NIT");
        form.set_field(Field::Cgpa, "8.4");

        assert_eq!(
            form.submit(&toasts).await,
            SubmitOutcome::Submitted { already_applied: false }
        );
        let submissions = backend.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].degree.as_deref(), Some("BTech"));
        assert_eq!(submissions[0].cgpa, Some(8.4));
    }

    #[tokio::test]
    async fn test_experienced_payload() {
        let (mut form, backend) = build(FakeJobs::default());
        let toasts = ToastQueue::new();
        form.set_field(Field::Name, "Asha");
        form.set_field(Field::Email, "asha@mail.io");
        form.set_profile_type(ProfileType::Postgraduate);
        form.set_field(Field::Company, "Acme");
        form.set_field(Field::Lpa, "6.5");
        form.set_field(Field::YearsExp, "2");
        form.add_skill("React");

        form.submit(&toasts).await;

        let body = serde_json::to_value(&backend.submissions.lock().unwrap()[0]).unwrap();
        assert_eq!(body["lpa"], json!(6.5));
        assert_eq!(body["yearsExp"], json!(2.0));
        assert_eq!(body["isFresher"], json!(false));
        assert!(body.get("degree").is_none());
        assert!(body.get("college").is_none());
        assert!(body.get("cgpa").is_none());
        assert_eq!(body["skills"], json!(["React"]));
    }

    #[tokio::test]
    async fn test_success_is_terminal_and_fires_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let backend = Arc::new(FakeJobs {
            response: Some(ApplyResponse {
                already_applied: None,
                message: Some("Thanks, we got it".to_string()),
            }),
            ..Default::default()
        });
        let mut form = ApplicationForm::new(backend.clone(), "link-1", None)
            .on_submitted(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let toasts = ToastQueue::new();
        fill_student(&mut form);

        form.submit(&toasts).await;

        assert_eq!(form.phase(), Phase::Applied);
        assert_eq!(form.submit_label(), "Applied");
        assert_eq!(form.message().unwrap().text, "Thanks, we got it");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            toasts.messages(),
            vec![(NoticeLevel::Success, "Thanks, we got it".to_string())]
        );

        assert_eq!(form.submit(&toasts).await, SubmitOutcome::Blocked);
        form.set_field(Field::Name, "Changed");
        assert_eq!(form.fields().name, "Asha");
        assert_eq!(backend.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_already_applied_flag() {
        let (mut form, _) = build(FakeJobs {
            response: Some(ApplyResponse {
                already_applied: Some(true),
                message: Some("ignored".to_string()),
            }),
            ..Default::default()
        });
        let toasts = ToastQueue::new();
        fill_student(&mut form);

        assert_eq!(
            form.submit(&toasts).await,
            SubmitOutcome::Submitted { already_applied: true }
        );
        assert_eq!(form.message().unwrap().text, ALREADY_APPLIED);
        assert_eq!(toasts.messages(), vec![(NoticeLevel::Info, ALREADY_APPLIED.to_string())]);
    }

    #[tokio::test]
    async fn test_failure_surfaces_backend_message_and_allows_retry() {
        let (mut form, backend) = build(FakeJobs {
            reject_with: Some(Some("Applications are closed".to_string())),
            ..Default::default()
        });
        let toasts = ToastQueue::new();
        fill_student(&mut form);

        assert_eq!(
            form.submit(&toasts).await,
            SubmitOutcome::Failed("Applications are closed".to_string())
        );
        assert_eq!(form.phase(), Phase::Editable);
        assert!(form.message().unwrap().is_error);
        assert_eq!(form.fields().college, "IIT");

        form.submit(&toasts).await;
        assert_eq!(backend.submissions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_without_message_uses_fallback() {
        let (mut form, _) = build(FakeJobs {
            reject_with: Some(None),
            ..Default::default()
        });
        let toasts = ToastQueue::new();
        fill_student(&mut form);

        assert_eq!(
            form.submit(&toasts).await,
            SubmitOutcome::Failed(SUBMIT_FAILED.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_check_debounced_to_final_email() {
        let (mut form, backend) = build(FakeJobs {
            applied_emails: vec!["asha@mail.io".to_string()],
            ..Default::default()
        });
        let toasts = ToastQueue::new();

        form.set_field(Field::Email, "asha@mail.i");
        tokio::time::sleep(Duration::from_millis(100)).await;
        form.set_field(Field::Email, "asha@mail.io");

        assert!(form.settle_duplicate_check(&toasts).await);
        assert_eq!(*backend.checks.lock().unwrap(), vec!["asha@mail.io".to_string()]);
        assert_eq!(form.phase(), Phase::AlreadyApplied);
        assert!(!form.can_submit());
        assert_eq!(form.message().unwrap().text, ALREADY_APPLIED);
        assert_eq!(form.submit(&toasts).await, SubmitOutcome::Blocked);

        // a new email unlocks the form again
        form.set_field(Field::Email, "other@mail.io");
        assert_eq!(form.phase(), Phase::Editable);
        assert!(form.settle_duplicate_check(&toasts).await);
        assert!(form.message().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_email_cancels_pending_check() {
        let (mut form, backend) = build(FakeJobs::default());
        let toasts = ToastQueue::new();

        form.set_field(Field::Email, "asha@mail.io");
        form.set_field(Field::Email, "asha@");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!form.poll_duplicate_check(&toasts));
        assert!(backend.checks.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_check_does_not_block() {
        let (mut form, _) = build(FakeJobs {
            check_fails: true,
            ..Default::default()
        });
        let toasts = ToastQueue::new();
        fill_student(&mut form);

        assert!(form.settle_duplicate_check(&toasts).await);
        assert_eq!(form.phase(), Phase::Editable);
        assert!(form.can_submit());
        assert!(toasts.messages().is_empty());
    }

    #[tokio::test]
    async fn test_skills_via_suggestion_and_keys() {
        let (mut form, _) = build(FakeJobs::default());
        form.set_skill_input("rea");
        assert_eq!(form.suggestions(), vec!["React", "React Native"]);

        assert!(form.add_skill("React"));
        assert!(!form.add_skill("React"));
        assert_eq!(form.skills().as_slice(), &["React".to_string()]);
        assert!(form.skill_input().is_empty());

        for c in "Rust,".chars() {
            form.skill_char(c);
        }
        assert_eq!(form.skills().as_slice().len(), 2);

        // duplicate typed text stays in the box
        form.set_skill_input("Rust");
        assert!(!form.confirm_skill_input());
        assert_eq!(form.skill_input(), "Rust");

        form.set_skill_input("");
        form.skill_backspace();
        assert_eq!(form.skills().as_slice(), &["React".to_string()]);
    }

    #[tokio::test]
    async fn test_job_fetched_when_missing() {
        let job: JobDescriptor = serde_json::from_value(json!({"title": "SDE"})).unwrap();
        let (mut form, _) = build(FakeJobs {
            job: Some(job.clone()),
            ..Default::default()
        });
        form.ensure_job().await;
        assert_eq!(form.job(), Some(&job));

        let (mut form, _) = form_without_job();
        form.ensure_job().await;
        assert!(form.job().is_none());
        assert_eq!(form.phase(), Phase::Editable);
    }

    fn form_without_job() -> (ApplicationForm<FakeJobs>, Arc<FakeJobs>) {
        build(FakeJobs::default())
    }
}
