use super::types::{ClassificationVerdict, FetchResult};
use std::sync::Arc;

/// Injected content-safety rule. Implementations must be deterministic.
pub trait UnsafeContentPredicate: Send + Sync {
    fn is_unsafe(&self, body: &[u8], content_type: &str) -> bool;
}

impl<F> UnsafeContentPredicate for F
where
    F: Fn(&[u8], &str) -> bool + Send + Sync,
{
    fn is_unsafe(&self, body: &[u8], content_type: &str) -> bool {
        self(body, content_type)
    }
}

/// Decides whether a fetched document may be parsed at all.
#[derive(Clone)]
pub struct ContentClassifier {
    predicate: Arc<dyn UnsafeContentPredicate>,
}

impl ContentClassifier {
    pub fn new(predicate: Arc<dyn UnsafeContentPredicate>) -> Self {
        Self { predicate }
    }

    pub fn classify(&self, result: &FetchResult) -> ClassificationVerdict {
        if !result.extractable {
            return ClassificationVerdict::UnsafeType;
        }
        if self
            .predicate
            .is_unsafe(&result.body, result.content_type_or_unknown())
        {
            ClassificationVerdict::UnsafeContent
        } else {
            ClassificationVerdict::Safe
        }
    }
}
