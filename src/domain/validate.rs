use serde::Serialize;

/// A single rejected field. Validation reports every offending field, not
/// just the first one encountered.
#[derive(Debug, Clone, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", render_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn render_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{value:?} is not a valid {kind}")]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

/// Implemented by every insert shape. Consulted by both store backends
/// before anything reaches storage; handlers never do ad hoc shape checks.
pub trait ValidateInsert {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Accumulates violations across all checks of one payload.
#[derive(Default)]
pub struct Violations {
    inner: Vec<FieldViolation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.inner.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    pub fn require(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.push(field, message);
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.inner.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                violations: self.inner,
            })
        }
    }
}
