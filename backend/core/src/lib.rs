pub mod error;
pub mod event;
pub mod message;
pub mod traits;
pub mod types;

pub use error::{AgentError, ValidationError};
pub use event::{AgentEvent, event_types};
pub use message::{Message, MetaData};
pub use traits::{
    AbstractDidStore, AbstractKeyManagementSystem, AbstractKeyStore, AbstractSecretBox,
    DidResolver,
};
pub use types::{
    DidFilter, DidQuery, DidResolutionMetadata, DidResolutionResult, Identifier, KeyType,
    ManagedKey, ManagedKeyInfo, PublicKey, ResolutionOptions, Service,
};
