//! Chain packet definitions.
//!
//! A chain packet is a tagged change notification routed through the
//! reactor graph. The payload shape depends on the tag, so the packet is
//! a sum type and handlers pattern-match on it. `options` ride along
//! verbatim wherever present.

use alloc::string::String;
use alloc::vec::Vec;
use tarn_core::Document;

/// A tagged change notification.
#[derive(Clone, Debug, PartialEq)]
pub enum ChainPacket {
    /// Replace the entire data set
    SetData {
        docs: Vec<Document>,
        options: Option<Document>,
    },
    /// One or more new documents
    Insert {
        docs: Vec<Document>,
        options: Option<Document>,
    },
    /// An update to apply to matching documents
    Update {
        query: Document,
        update: Document,
        options: Option<Document>,
    },
    /// Removal of matching documents
    Remove {
        query: Document,
        options: Option<Document>,
    },
    /// Primary key change
    PrimaryKey { field: String },
}

impl ChainPacket {
    /// Creates a setData packet.
    pub fn set_data(docs: Vec<Document>) -> Self {
        ChainPacket::SetData {
            docs,
            options: None,
        }
    }

    /// Creates an insert packet.
    pub fn insert(docs: Vec<Document>) -> Self {
        ChainPacket::Insert {
            docs,
            options: None,
        }
    }

    /// Creates an insert packet for a single document.
    pub fn insert_one(doc: Document) -> Self {
        ChainPacket::Insert {
            docs: Vec::from([doc]),
            options: None,
        }
    }

    /// Creates an update packet.
    pub fn update(query: Document, update: Document) -> Self {
        ChainPacket::Update {
            query,
            update,
            options: None,
        }
    }

    /// Creates a remove packet.
    pub fn remove(query: Document) -> Self {
        ChainPacket::Remove {
            query,
            options: None,
        }
    }

    /// Creates a primary key packet.
    pub fn primary_key(field: impl Into<String>) -> Self {
        ChainPacket::PrimaryKey {
            field: field.into(),
        }
    }

    /// Attaches options to the packet, replacing any present.
    pub fn with_options(mut self, opts: Document) -> Self {
        match &mut self {
            ChainPacket::SetData { options, .. }
            | ChainPacket::Insert { options, .. }
            | ChainPacket::Update { options, .. }
            | ChainPacket::Remove { options, .. } => *options = Some(opts),
            ChainPacket::PrimaryKey { .. } => {}
        }
        self
    }

    /// The packet tag, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ChainPacket::SetData { .. } => "setData",
            ChainPacket::Insert { .. } => "insert",
            ChainPacket::Update { .. } => "update",
            ChainPacket::Remove { .. } => "remove",
            ChainPacket::PrimaryKey { .. } => "primaryKey",
        }
    }

    /// The options riding on the packet, if any.
    pub fn options(&self) -> Option<&Document> {
        match self {
            ChainPacket::SetData { options, .. }
            | ChainPacket::Insert { options, .. }
            | ChainPacket::Update { options, .. }
            | ChainPacket::Remove { options, .. } => options.as_ref(),
            ChainPacket::PrimaryKey { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use tarn_core::Value;

    #[test]
    fn test_packet_kinds() {
        assert_eq!(ChainPacket::set_data(vec![]).kind(), "setData");
        assert_eq!(ChainPacket::insert(vec![]).kind(), "insert");
        assert_eq!(
            ChainPacket::update(Document::new(), Document::new()).kind(),
            "update"
        );
        assert_eq!(ChainPacket::remove(Document::new()).kind(), "remove");
        assert_eq!(ChainPacket::primary_key("_id").kind(), "primaryKey");
    }

    #[test]
    fn test_insert_one() {
        let doc = Document::new().with("_id", Value::from(1));
        match ChainPacket::insert_one(doc.clone()) {
            ChainPacket::Insert { docs, options } => {
                assert_eq!(docs, vec![doc]);
                assert!(options.is_none());
            }
            _ => panic!("wrong packet"),
        }
    }

    #[test]
    fn test_with_options() {
        let opts = Document::new().with("$decouple", Value::from(true));
        let packet = ChainPacket::remove(Document::new()).with_options(opts.clone());
        assert_eq!(packet.options(), Some(&opts));

        // primaryKey carries no options
        let packet = ChainPacket::primary_key("_id").with_options(opts);
        assert_eq!(packet.options(), None);
    }
}
