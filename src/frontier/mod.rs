//! Frontier module: the crawl's durable "seen" ground truth
//!
//! `DocumentIdentityStore` assigns each canonical URL one document id for
//! the lifetime of the store. Ids are decimal strings from a counter that is
//! seeded from the durable row count when the store opens.

mod doc_id_store;

pub use doc_id_store::{DocId, DocumentIdentity, DocumentIdentityStore};
