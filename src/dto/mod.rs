pub mod auth;
pub mod checkout;
pub mod emails;
pub mod orders;
pub mod payments;
pub mod products;
pub mod settings;
