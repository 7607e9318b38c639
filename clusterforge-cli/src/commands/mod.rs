pub mod cluster_id;
pub mod create;
pub mod destroy;
pub mod plan;
pub mod profiles;
pub mod version;
