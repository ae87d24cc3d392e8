pub mod check_routes;
pub mod notification_routes;
pub mod settings_routes;
pub mod target_routes;
