/// Result of a secondary fetch that must not fail the operation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum BestEffort<T> {
    Fetched(T),
    Degraded { fallback: T, reason: String },
}

impl<T> BestEffort<T> {
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>, fallback: T) -> Self {
        match result {
            Ok(value) => BestEffort::Fetched(value),
            Err(e) => BestEffort::Degraded {
                fallback,
                reason: e.to_string(),
            },
        }
    }

    pub fn value(&self) -> &T {
        match self {
            BestEffort::Fetched(value) => value,
            BestEffort::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            BestEffort::Fetched(value) => value,
            BestEffort::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, BestEffort::Degraded { .. })
    }
}
