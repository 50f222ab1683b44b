/*
[INPUT]:  Bearer tokens issued by the dashboard login flow
[OUTPUT]: Shared token holder for authenticated requests
[POS]:    Auth layer - credential state for the examdesk API
[UPDATE]: When token handling changes
*/

pub mod token;

pub use token::{TokenData, TokenStore};
