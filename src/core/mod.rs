pub mod errors;

pub use errors::{
    AnkiBridgeError,
    BridgeError,
};
