//! Declarative translation between tenant wire documents and the canonical
//! optimizer document.

pub mod error;
pub mod field;
pub mod path;
pub mod schemas;
pub mod transcode;
pub mod wire;
pub mod xml;

pub use error::{TableError, TranscodeError};
pub use field::{FieldSpec, FieldTable};
pub use path::Path;
pub use schemas::{SchemaRegistry, WireSchema};
pub use transcode::{decode, decode_document, encode};
pub use wire::{Template, WireFormat};
