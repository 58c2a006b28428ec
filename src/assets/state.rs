/// Observable state of an asynchronous load.
///
/// Modelled on Elm's RemoteData pattern: instead of a `loading: bool` next
/// to a `data: Option<T>`, every load is in exactly one of four states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState<T, E = String> {
    /// No load has been requested
    NotAsked,

    /// Load in progress
    Loading,

    /// Load finished with a value
    Success(T),

    /// Load failed
    Failure(E),
}

impl<T, E> LoadState<T, E> {
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => LoadState::Success(data),
            Err(e) => LoadState::Failure(e),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LoadState::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, LoadState::Failure(_))
    }

    pub fn is_not_asked(&self) -> bool {
        matches!(self, LoadState::NotAsked)
    }

    /// Convert to an Option, discarding error and loading states
    pub fn ok(self) -> Option<T> {
        match self {
            LoadState::Success(data) => Some(data),
            _ => None,
        }
    }
}

impl<T, E> Default for LoadState<T, E> {
    fn default() -> Self {
        LoadState::NotAsked
    }
}

impl<T, E> From<Result<T, E>> for LoadState<T, E> {
    fn from(result: Result<T, E>) -> Self {
        LoadState::from_result(result)
    }
}
