pub mod auth_service;
pub mod checkout_service;
pub mod email_service;
pub mod order_service;
pub mod payment_service;
pub mod product_service;
pub mod settings_service;
