pub mod client;
pub mod decks;
pub mod transport;
pub mod types;

pub use client::{
    deck_query,
    BridgeClient,
};
pub use decks::{
    flatten_deck_tree,
    organize_deck_tree,
    DeckNode,
};
pub use transport::{
    BridgeTransport,
    HttpTransport,
    API_VERSION,
};
pub use types::{
    ApiResponse,
    Field,
    NoteInfo,
};
