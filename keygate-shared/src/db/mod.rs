/// Database utilities
///
/// - `pool`: PostgreSQL connection pool construction with a startup
///   health check
/// - `migrations`: embedded schema migration runner

pub mod migrations;
pub mod pool;
