//! mysql_schema: unsigned-aware MySQL DDL generation and schema dumps
//!
//! The encoder turns declarative column, table and constraint specs into MySQL
//! DDL, including `UNSIGNED` integer columns and named foreign key and check
//! constraints. The decoder reads live metadata back into the same specs and
//! the dumper renders them as a canonical, column-aligned schema file.

pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use db::executor::{DdlExecutor, SqlExecutor};
pub use db::migrations::MigrationHelpers;
pub use error::{Error, Result};
pub use schema::catalog::TypeCatalog;
pub use schema::dumper::{render_table, DumpOptions, SchemaDumper};
pub use schema::encoder::SchemaEncoder;
pub use schema::provider::{MetadataProvider, Snapshot};

/// Initialize a client with the specified configuration file
pub async fn init(config_path: &str) -> Result<SchemaClient> {
    let config = config::load_from_file(config_path)?;
    SchemaClient::new(config).await
}

/// The main client tying configuration, connection, encoder and dumper together
pub struct SchemaClient {
    config: Config,
    catalog: TypeCatalog,
    connection: DatabaseConnection,
}

impl SchemaClient {
    /// Create a new client from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let database = config.database.as_ref().ok_or_else(|| {
            Error::ConfigError("A [database] section is required to connect".to_string())
        })?;
        let connection = DatabaseConnection::connect(database).await?;
        let catalog = TypeCatalog::from_config(&config.types)?;

        Ok(Self {
            config,
            catalog,
            connection,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn encoder(&self) -> SchemaEncoder {
        SchemaEncoder::new(self.catalog.clone())
    }

    /// Introspect the configured schema
    pub async fn snapshot(&self) -> Result<Snapshot> {
        db::introspect::load_snapshot(
            self.connection.pool(),
            self.connection.schema(),
            self.config.types.emulate_booleans,
        )
        .await
    }

    /// Dump the live schema
    pub async fn dump(&self) -> Result<String> {
        let snapshot = self.snapshot().await?;
        dump_snapshot(&snapshot, &self.catalog, &self.config)
    }

    /// Migration helpers executing through the connection, honouring `[ddl] dry_run`
    pub fn migrations(&self) -> MigrationHelpers<SqlExecutor<DatabaseConnection>> {
        let executor = SqlExecutor::new(self.connection.clone(), &self.config.ddl);
        MigrationHelpers::new(self.encoder(), executor).with_naming(self.config.naming.clone())
    }
}

/// Dump a snapshot with the `[dump]` settings of `config`
pub fn dump_snapshot(snapshot: &Snapshot, catalog: &TypeCatalog, config: &Config) -> Result<String> {
    let mut options = DumpOptions::from(&config.dump);
    options.version = snapshot.version.clone();
    SchemaDumper::new(snapshot, catalog, options)?.dump_to_string()
}
