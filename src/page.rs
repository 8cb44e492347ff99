use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    NotFound,
    Failed,
}

/// Lifecycle of one data-fetching page: `Idle -> Loading -> Success | Error`.
///
/// Every new trigger re-enters `Loading`, whatever the previous outcome was.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState<T> {
    Idle,
    Loading,
    Success(T),
    Error(PageError),
}

impl<T> Default for PageState<T> {
    fn default() -> Self {
        PageState::Idle
    }
}

impl<T> PageState<T> {
    pub fn trigger(&mut self) {
        *self = PageState::Loading;
    }

    /// Records an outcome. Ignored unless a request is in flight.
    pub fn settle(&mut self, outcome: Result<T, PageError>) -> bool {
        if !self.is_loading() {
            return false;
        }
        *self = match outcome {
            Ok(value) => PageState::Success(value),
            Err(err) => PageState::Error(err),
        };
        true
    }

    pub async fn run<F>(&mut self, request: F)
    where
        F: Future<Output = Result<T, PageError>>,
    {
        self.trigger();
        let outcome = request.await;
        self.settle(outcome);
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PageState::Loading)
    }
}
