//! Ordered interceptor chain

use std::sync::Arc;

use tracing::debug;

use super::{Interceptor, Verdict};
use crate::http::{HttpResponse, PreparedRequest};

/// Interceptors in registration order
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    /// Chain running `interceptors` in the given order
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    /// Append an interceptor after the existing ones
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Number of interceptors
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// `true` if no interceptor is registered
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Interceptor names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|interceptor| interceptor.name()).collect()
    }

    /// Run every `prepare` hook in registration order
    pub fn prepare(&self, request: &mut PreparedRequest) {
        for interceptor in &self.interceptors {
            interceptor.prepare(request);
        }
    }

    /// First non-continue verdict wins; later interceptors are not consulted
    pub async fn on_response(&self, request: &PreparedRequest, response: &HttpResponse) -> Verdict {
        for interceptor in &self.interceptors {
            let verdict = interceptor.on_response(request, response).await;
            if !verdict.is_continue() {
                debug!(
                    interceptor = interceptor.name(),
                    status = response.status(),
                    verdict = ?verdict,
                    "interceptor short-circuited response handling"
                );
                return verdict;
            }
        }
        Verdict::Continue
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain").field("interceptors", &self.names()).finish()
    }
}
