//! Transform pipeline settings.
//!
//! A transform pair produces a public projection of a view's private
//! data: `data_in` runs on documents entering the public collection,
//! `data_out` on documents leaving it through reads.

use alloc::rc::Rc;
use tarn_core::Document;

/// A document transformer.
pub type Transformer = Rc<dyn Fn(&Document) -> Document>;

/// Settings controlling a collection's transform pipeline.
#[derive(Clone, Default)]
pub struct TransformSettings {
    /// Whether the pipeline is active
    pub enabled: bool,
    /// Ingress transformer
    pub data_in: Option<Transformer>,
    /// Egress transformer
    pub data_out: Option<Transformer>,
}

impl TransformSettings {
    /// Creates disabled settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the pipeline.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the ingress transformer.
    pub fn data_in<F>(mut self, f: F) -> Self
    where
        F: Fn(&Document) -> Document + 'static,
    {
        self.data_in = Some(Rc::new(f));
        self
    }

    /// Sets the egress transformer.
    pub fn data_out<F>(mut self, f: F) -> Self
    where
        F: Fn(&Document) -> Document + 'static,
    {
        self.data_out = Some(Rc::new(f));
        self
    }

    /// Applies the ingress transformer, or passes the document through.
    pub fn apply_in(&self, doc: &Document) -> Document {
        match (&self.data_in, self.enabled) {
            (Some(f), true) => f(doc),
            _ => doc.decouple(),
        }
    }

    /// Applies the egress transformer, or passes the document through.
    pub fn apply_out(&self, doc: &Document) -> Document {
        match (&self.data_out, self.enabled) {
            (Some(f), true) => f(doc),
            _ => doc.decouple(),
        }
    }
}

impl core::fmt::Debug for TransformSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransformSettings")
            .field("enabled", &self.enabled)
            .field("data_in", &self.data_in.is_some())
            .field("data_out", &self.data_out.is_some())
            .finish()
    }
}
