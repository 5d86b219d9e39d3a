//! SQL Server connection using tiberius

use crate::identifier::IdentifierDefaults;
use crate::Result;
use tiberius::{Client, Config, Row, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// One TDS session; queries are serialised through a mutex.
pub struct SqlServerConnection {
    client: Mutex<Client<Compat<TcpStream>>>,
    database: Option<String>,
}

impl SqlServerConnection {
    /// Connect using an ADO.NET style connection string
    /// (`server=tcp:host,1433;database=sales;user id=sa;password=...;TrustServerCertificate=true`)
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let config = Config::from_ado_string(connection_string)?;
        Self::connect_with(config).await
    }

    #[tracing::instrument(skip(config))]
    pub async fn connect_with(config: Config) -> Result<Self> {
        let addr = config.get_addr();
        tracing::debug!(%addr, "connecting to SQL Server");

        let tcp = TcpStream::connect(addr.as_str()).await?;
        tcp.set_nodelay(true)?;
        let client = Client::connect(config, tcp.compat_write()).await?;

        let connection = Self {
            client: Mutex::new(client),
            database: None,
        };
        let database = connection.identifier_defaults().await?.database;
        tracing::debug!(database = ?database, "connected to SQL Server");

        Ok(Self { database, ..connection })
    }

    /// Database the session is using
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Run one statement and collect its first result set
    pub async fn query(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>> {
        let mut client = self.client.lock().await;
        let stream = client.query(sql, params).await?;
        let rows = stream.into_first_result().await?;
        tracing::trace!(rows = rows.len(), "catalog query completed");
        Ok(rows)
    }

    /// Server, database and schema the session resolves unqualified names against
    pub async fn identifier_defaults(&self) -> Result<IdentifierDefaults> {
        let rows = self
            .query(
                "SELECT @@SERVERNAME AS server_name, DB_NAME() AS database_name, SCHEMA_NAME() AS schema_name",
                &[],
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(IdentifierDefaults::default());
        };
        let part = |column: &str| -> Result<Option<String>> {
            Ok(row
                .try_get::<&str, _>(column)?
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from))
        };

        Ok(IdentifierDefaults::new(
            part("server_name")?,
            part("database_name")?,
            part("schema_name")?,
        ))
    }
}

impl std::fmt::Debug for SqlServerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerConnection")
            .field("database", &self.database)
            .finish()
    }
}
