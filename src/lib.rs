pub mod approval;
pub mod memory_db;
pub mod normalize;
pub mod preferences;
pub mod routes;
pub mod url_db;
