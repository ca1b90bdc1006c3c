pub mod contracts;
pub mod provider;
pub mod services;
pub mod signatures;
pub mod transactions;
