//! Fault boundary for interactive rendering.
//!
//! A failure inside the boundary is captured instead of propagated; the
//! caller shows a fallback until the user retries.

use std::fmt::Display;

pub const FAULT_TITLE: &str = "Something went wrong!";
pub const FALLBACK_FAULT_MESSAGE: &str = "An unexpected error occurred.";

#[derive(Debug, Default)]
pub struct FaultBoundary {
    fault: Option<String>,
}

impl FaultBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Passes `Ok` values through; captures an error as the current fault.
    pub fn guard<T, E: Display>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                let message = err.to_string();
                tracing::error!(error = %message, "fault captured");
                self.fault = Some(message);
                None
            }
        }
    }

    pub fn has_fault(&self) -> bool {
        self.fault.is_some()
    }

    pub fn fault_message(&self) -> &str {
        self.fault
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(FALLBACK_FAULT_MESSAGE)
    }

    /// Clears the fault. Nothing else is rolled back.
    pub fn retry(&mut self) {
        self.fault = None;
    }
}
