//! View state shared by the data screens.
//!
//! Fetch failures are local to the view that issued them: they become inline
//! error text and never affect other views. Auth failures are the exception
//! and go to [`Feedback`] so the caller can send the user to login.

mod employee;

use std::future::Future;

use crate::error::ApiError;
use crate::feedback::{handle_api_error, Feedback};

pub use employee::{EmployeeForm, FormMode};

/// Data held by a view after a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    /// Nothing fetched yet
    Idle,
    /// Fetch succeeded
    Loaded(T),
    /// Fetch failed; the text is rendered inline and the user may retry
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            ViewState::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Await a fetch and fold its outcome into a [`ViewState`].
pub async fn load<T, F>(fetch: F, feedback: &dyn Feedback) -> ViewState<T>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match fetch.await {
        Ok(data) => ViewState::Loaded(data),
        Err(err) => {
            if let ApiError::Auth(_) = err {
                handle_api_error(&err, feedback);
            }
            ViewState::Failed(err.to_string())
        }
    }
}
