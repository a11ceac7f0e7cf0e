use crate::error::SharedError;

/// Every subscriber failure collected during one fire pass.
///
/// Displays the summary message only; the wrapped errors are reached through
/// [`ChainedError::errors`] or by iterating, which walks a one-pass cursor.
///
/// ```rust
/// use herald_event::ChainedError;
/// use std::sync::Arc;
///
/// let mut chained = ChainedError::new("two subscribers failed", Vec::new());
/// chained.add(Arc::new(std::io::Error::other("first")));
/// chained.add(Arc::new(std::io::Error::other("second")));
///
/// assert_eq!(chained.to_string(), "two subscribers failed");
/// assert_eq!(chained.next().map(|e| e.to_string()).as_deref(), Some("first"));
/// assert_eq!(chained.next().map(|e| e.to_string()).as_deref(), Some("second"));
/// assert!(chained.next().is_none());
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ChainedError {
    message: String,
    errors: Vec<SharedError>,
    index: usize,
}

impl ChainedError {
    pub fn new(message: impl Into<String>, errors: Vec<SharedError>) -> Self {
        Self { message: message.into(), errors, index: 0 }
    }

    /// Builds the error raised by a fire pass over `event_type`.
    pub(crate) fn from_fire(event_type: &str, errors: Vec<SharedError>) -> Self {
        let first = errors.first().map(ToString::to_string).unwrap_or_default();
        let message = format!(
            "{} subscriber(s) failed while firing '{event_type}': {first}",
            errors.len()
        );
        Self::new(message, errors)
    }

    pub fn add(&mut self, error: SharedError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// All wrapped errors in dispatch order, independent of the cursor.
    #[must_use]
    pub fn errors(&self) -> &[SharedError] {
        &self.errors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Rewinds the cursor to the first wrapped error.
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

impl Iterator for ChainedError {
    type Item = SharedError;

    fn next(&mut self) -> Option<Self::Item> {
        let error = self.errors.get(self.index).cloned()?;
        self.index += 1;
        Some(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn err(msg: &str) -> SharedError {
        Arc::new(std::io::Error::other(msg.to_owned()))
    }

    #[test]
    fn fire_message_embeds_type_and_first_error() {
        let chained = ChainedError::from_fire("save", vec![err("disk full"), err("quota")]);
        assert_eq!(chained.message(), "2 subscriber(s) failed while firing 'save': disk full");
        assert_eq!(chained.to_string(), chained.message());
        assert!(!chained.to_string().contains("quota"), "only the summary is displayed");
    }

    #[test]
    fn cursor_is_one_pass_until_reset() {
        let mut chained = ChainedError::new("m", vec![err("a")]);
        assert!(chained.next().is_some());
        assert!(chained.next().is_none());
        assert!(chained.next().is_none());
        assert_eq!(chained.errors().len(), 1, "inspection ignores the cursor");

        chained.reset();
        assert_eq!(chained.next().map(|e| e.to_string()).as_deref(), Some("a"));
    }

    #[test]
    fn add_appends_behind_the_cursor() {
        let mut chained = ChainedError::new("m", Vec::new());
        assert!(chained.is_empty());
        assert!(chained.next().is_none());
        chained.add(err("late"));
        assert_eq!(chained.len(), 1);
        assert_eq!(chained.next().map(|e| e.to_string()).as_deref(), Some("late"));
    }
}
