//! Wallet handlers.

mod get_wallet;

pub use get_wallet::{GetWalletHandler, GetWalletQuery};
