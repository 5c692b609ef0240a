use crate::error::{AppError, FieldError};

/// Accumulates field violations so a rejected write reports every problem at
/// once instead of the first one hit.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn require_non_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "must not be empty");
        }
    }

    pub fn require_max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    pub fn require_non_negative(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.add(field, "must be a non-negative number");
        }
    }

    pub fn require_range_f64(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.add(field, format!("must be between {min} and {max}"));
        }
    }

    pub fn require_positive_u32(&mut self, field: &str, value: u32) {
        if value == 0 {
            self.add(field, "must be greater than zero");
        }
    }

    pub fn require_email(&mut self, field: &str, value: &str) {
        let trimmed = value.trim();
        let well_formed = trimmed
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            self.add(field, "must be a valid email address");
        }
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(self.errors))
        }
    }
}
