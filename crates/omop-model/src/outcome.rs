/// Per-row result of a mapping step.
///
/// `Skipped` rows are logged and dropped; `Fatal` aborts the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome<T> {
    Ok(T),
    Skipped(String),
    Fatal(String),
}

impl<T> RowOutcome<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        RowOutcome::Skipped(reason.into())
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        RowOutcome::Fatal(reason.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RowOutcome::Ok(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RowOutcome<U> {
        match self {
            RowOutcome::Ok(value) => RowOutcome::Ok(f(value)),
            RowOutcome::Skipped(reason) => RowOutcome::Skipped(reason),
            RowOutcome::Fatal(reason) => RowOutcome::Fatal(reason),
        }
    }
}
