pub mod admin_users;
pub mod app_settings;
pub mod audit_logs;
pub mod email_templates;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

pub use admin_users::Entity as AdminUsers;
pub use app_settings::Entity as AppSettings;
pub use audit_logs::Entity as AuditLogs;
pub use email_templates::Entity as EmailTemplates;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use products::Entity as Products;
pub use users::Entity as Users;
