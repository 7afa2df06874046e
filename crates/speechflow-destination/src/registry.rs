use crate::writer_trait::OutcomeWriter;
use speechflow_core::DestinationError;
use std::collections::HashMap;

/// Splits `scheme://rest` into its two parts.
pub fn split_scheme(uri: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = uri.split_once("://")?;
    if scheme.is_empty() {
        None
    } else {
        Some((scheme, rest))
    }
}

#[derive(Clone)]
pub struct WriterRegistry {
    factories: HashMap<String, fn() -> Box<dyn OutcomeWriter>>,
}

impl WriterRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("file", || Box::new(crate::file_writer::FileWriter::new()));
        registry
    }

    pub fn register(&mut self, scheme: &str, factory: fn() -> Box<dyn OutcomeWriter>) {
        self.factories.insert(scheme.to_string(), factory);
    }

    pub fn create(&self, scheme: &str) -> Result<Box<dyn OutcomeWriter>, DestinationError> {
        self.factories
            .get(scheme)
            .map(|f| f())
            .ok_or_else(|| DestinationError::NotFound(scheme.to_string()))
    }

    /// Picks the writer for an output URI by its scheme.
    pub fn resolve(&self, uri: &str) -> Result<Box<dyn OutcomeWriter>, DestinationError> {
        let (scheme, _) =
            split_scheme(uri).ok_or_else(|| DestinationError::NotFound(uri.to_string()))?;
        self.create(scheme)
    }

    pub fn list_schemes(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for WriterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
