//! Employee create/edit form state.

use crate::api::models::{Employee, EmployeeDraft};
use crate::api::ApiClient;
use crate::error::ApiError;
use crate::feedback::{handle_api_error, Feedback};

/// Whether the form creates a new employee or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i64),
}

/// State of an employee form between submissions.
///
/// A rejected submission leaves the form open with the entered values and
/// the backend's message as inline error text. Only a successful submission
/// closes the form.
#[derive(Debug, Clone)]
pub struct EmployeeForm {
    mode: FormMode,
    draft: EmployeeDraft,
    error: Option<String>,
    open: bool,
}

impl EmployeeForm {
    /// An empty form for a new employee.
    pub fn create() -> Self {
        Self::with_draft(FormMode::Create, EmployeeDraft::default())
    }

    /// A form prefilled from an existing employee.
    pub fn edit(employee: &Employee) -> Self {
        Self::with_draft(FormMode::Edit(employee.id), EmployeeDraft::from(employee))
    }

    fn with_draft(mode: FormMode, draft: EmployeeDraft) -> Self {
        Self {
            mode,
            draft,
            error: None,
            open: true,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &EmployeeDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut EmployeeDraft {
        &mut self.draft
    }

    /// Inline error from the last rejected submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Submit the draft.
    ///
    /// Auth failures are handed to `feedback` (which redirects to login);
    /// every other failure becomes the form's inline error.
    pub async fn submit(
        &mut self,
        client: &ApiClient,
        feedback: &dyn Feedback,
    ) -> Result<Employee, ApiError> {
        let result = match self.mode {
            FormMode::Create => client.create_employee(&self.draft).await,
            FormMode::Edit(id) => client.update_employee(id, &self.draft).await,
        };

        match result {
            Ok(employee) => {
                self.error = None;
                self.open = false;
                Ok(employee)
            }
            Err(err) => {
                match &err {
                    ApiError::Auth(_) => handle_api_error(&err, feedback),
                    other => self.error = Some(other.to_string()),
                }
                Err(err)
            }
        }
    }
}
