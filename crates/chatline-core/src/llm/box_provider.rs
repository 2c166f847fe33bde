//! BoxGenerationProvider -- object-safe dynamic dispatch wrapper for GenerationProvider.
//!
//! 1. Define an object-safe `GenerationProviderDyn` trait with boxed futures
//! 2. Blanket-impl `GenerationProviderDyn` for all `T: GenerationProvider`
//! 3. `BoxGenerationProvider` wraps `Box<dyn GenerationProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use chatline_types::llm::{GenerationError, GenerationRequest};

use super::provider::{GenerationProvider, GenerationStream};

/// Object-safe version of [`GenerationProvider`] with boxed futures.
pub trait GenerationProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn stream_boxed(&self, request: GenerationRequest) -> GenerationStream;

    fn ping_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), GenerationError>> + Send + 'a>>;
}

impl<T: GenerationProvider> GenerationProviderDyn for T {
    fn name(&self) -> &str {
        GenerationProvider::name(self)
    }

    fn stream_boxed(&self, request: GenerationRequest) -> GenerationStream {
        self.stream(request)
    }

    fn ping_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), GenerationError>> + Send + 'a>> {
        Box::pin(self.ping())
    }
}

/// Type-erased generation provider for runtime model selection.
///
/// Since `GenerationProvider` uses RPITIT, it cannot be used as a trait
/// object directly. `BoxGenerationProvider` provides equivalent methods that
/// delegate to the inner `GenerationProviderDyn` trait object.
pub struct BoxGenerationProvider {
    inner: Box<dyn GenerationProviderDyn + Send + Sync>,
}

impl BoxGenerationProvider {
    /// Wrap a concrete `GenerationProvider` in a type-erased box.
    pub fn new<T: GenerationProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Start a streaming generation.
    pub fn stream(&self, request: GenerationRequest) -> GenerationStream {
        self.inner.stream_boxed(request)
    }

    /// Verify credentials and connectivity.
    pub async fn ping(&self) -> Result<(), GenerationError> {
        self.inner.ping_boxed().await
    }
}
