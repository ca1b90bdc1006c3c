pub mod adapter;
pub mod powers;
pub mod store;

pub use adapter::GovernanceAdapter;
pub use powers::PowersSnapshot;
pub use store::GovernanceStore;
