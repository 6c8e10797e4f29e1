use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures that can occur while talking to MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// Required environment variable is missing.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    /// Client could not be built from the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    /// Server never answered while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    /// Server stopped answering a health ping.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    /// Insert rejected.
    #[error("failed to insert entry into collection `{collection}`")]
    Insert {
        collection: String,
        #[source]
        source: MongoError,
    },
    /// Query rejected.
    #[error("failed to load entries from collection `{collection}`")]
    Find {
        collection: String,
        #[source]
        source: MongoError,
    },
    /// Deletion rejected.
    #[error("failed to delete entries from collection `{collection}`")]
    Delete {
        collection: String,
        #[source]
        source: MongoError,
    },
    /// Count rejected.
    #[error("failed to count entries in collection `{collection}`")]
    Count {
        collection: String,
        #[source]
        source: MongoError,
    },
}
