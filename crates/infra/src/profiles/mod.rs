mod postgres;

pub use postgres::PostgresProfileStore;
