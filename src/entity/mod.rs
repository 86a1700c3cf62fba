pub mod audit_logs;
pub mod backup_products;
pub mod catalog_syncs;
pub mod categories;
pub mod friendship_requests;
pub mod friendships;
pub mod products;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use backup_products::Entity as BackupProducts;
pub use catalog_syncs::Entity as CatalogSyncs;
pub use categories::Entity as Categories;
pub use friendship_requests::Entity as FriendshipRequests;
pub use friendships::Entity as Friendships;
pub use products::Entity as Products;
pub use users::Entity as Users;
