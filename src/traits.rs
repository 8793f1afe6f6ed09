use std::path::Path;

use crate::config::ModelRef;
use crate::errors::Result;

/// A hosted model that turns one image file into a URL of its output image.
///
/// Calls block until the prediction has finished.
pub trait InferenceClient {
    /// Sends `payload` as the `input_key` field of `model` and returns the output URL.
    fn run(&self, model: &ModelRef, input_key: &str, payload: &Path) -> Result<String>;
}

/// A downloaded response. Only status 200 counts as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl Fetched {
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Plain GET of an output URL.
pub trait ImageFetcher {
    /// Transport failures are errors; any HTTP status, including error statuses,
    /// comes back as a [`Fetched`].
    fn fetch(&self, url: &str) -> Result<Fetched>;
}

impl<T: InferenceClient + ?Sized> InferenceClient for &T {
    fn run(&self, model: &ModelRef, input_key: &str, payload: &Path) -> Result<String> {
        (**self).run(model, input_key, payload)
    }
}

impl<T: ImageFetcher + ?Sized> ImageFetcher for &T {
    fn fetch(&self, url: &str) -> Result<Fetched> {
        (**self).fetch(url)
    }
}
