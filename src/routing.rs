//! # Connection Routing
//!
//! Maps a logical connection name and a [`ConnectionRole`] to one physical
//! connection string.
//!
//! - Plain entries (`connection_strings`) only serve the primary role.
//! - Master-slave entries (`master_slave`) serve the primary from `primary` and
//!   the replica role from `replicas`, rotating round-robin across them.
//!
//! A replica request is never silently served by the primary. Logical names are
//! matched case-insensitively.

use crate::config::SqlKitConfig;
use crate::constants::system::DEFAULT_CONNECTION_NAME;
use crate::error::{SqlKitError, SqlKitResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Read/write intent of a connection request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRole {
    /// Writable primary
    Primary,
    /// Read-only replica
    Replica,
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRole::Primary => write!(f, "primary"),
            ConnectionRole::Replica => write!(f, "replica"),
        }
    }
}

/// Which connection a session talks to, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    name: String,
    enable_master_slave: bool,
    read_only: bool,
}

impl ConnectionTarget {
    /// Fails with a configuration error when `read_only` is requested without
    /// master-slave routing, since there would be no replica to read from.
    pub fn new(
        name: impl Into<String>,
        enable_master_slave: bool,
        read_only: bool,
    ) -> SqlKitResult<Self> {
        let name = name.into();
        if read_only && !enable_master_slave {
            return Err(SqlKitError::configuration(format!(
                "Connection '{name}' cannot be read-only: master-slave routing is not enabled"
            )));
        }
        if name.trim().is_empty() {
            return Err(SqlKitError::configuration("Connection name must not be blank"));
        }
        Ok(Self {
            name,
            enable_master_slave,
            read_only,
        })
    }

    /// Plain connection, primary role
    pub fn primary(name: impl Into<String>) -> SqlKitResult<Self> {
        Self::new(name, false, false)
    }

    /// Master-slave connection, replica role
    pub fn replica(name: impl Into<String>) -> SqlKitResult<Self> {
        Self::new(name, true, true)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enable_master_slave(&self) -> bool {
        self.enable_master_slave
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn role(&self) -> ConnectionRole {
        if self.read_only {
            ConnectionRole::Replica
        } else {
            ConnectionRole::Primary
        }
    }
}

impl Default for ConnectionTarget {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONNECTION_NAME.to_string(),
            enable_master_slave: false,
            read_only: false,
        }
    }
}

#[derive(Debug)]
struct RouteEntry {
    name: String,
    primary: String,
    replicas: Vec<String>,
    master_slave: bool,
    cursor: AtomicUsize,
}

/// Summary of one route, safe to print (no connection strings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub name: String,
    pub master_slave: bool,
    pub replicas: usize,
}

/// Routing table built from configuration
#[derive(Debug, Default)]
pub struct ConnectionRouter {
    routes: HashMap<String, RouteEntry>,
}

impl ConnectionRouter {
    /// Build the table. A master-slave entry replaces a plain entry of the same name.
    pub fn from_config(config: &SqlKitConfig) -> Self {
        let mut routes = HashMap::new();

        for (name, connection_string) in &config.connection_strings {
            routes.insert(
                name.to_lowercase(),
                RouteEntry {
                    name: name.clone(),
                    primary: connection_string.clone(),
                    replicas: Vec::new(),
                    master_slave: false,
                    cursor: AtomicUsize::new(0),
                },
            );
        }

        for (name, group) in &config.master_slave {
            routes.insert(
                name.to_lowercase(),
                RouteEntry {
                    name: name.clone(),
                    primary: group.primary.clone(),
                    replicas: group.replicas.clone(),
                    master_slave: true,
                    cursor: AtomicUsize::new(0),
                },
            );
        }

        debug!(routes = routes.len(), "Connection routing table built");
        Self { routes }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(&name.to_lowercase())
    }

    /// Whether `name` is configured as a primary/replica group
    pub fn has_master_slave(&self, name: &str) -> bool {
        self.routes
            .get(&name.to_lowercase())
            .is_some_and(|route| route.master_slave)
    }

    /// Resolve a connection string for `name` in `role`.
    pub fn resolve(&self, name: &str, role: ConnectionRole) -> SqlKitResult<String> {
        let route = self.routes.get(&name.to_lowercase()).ok_or_else(|| {
            SqlKitError::configuration(format!("Unknown connection name '{name}'"))
        })?;

        let connection_string = match role {
            ConnectionRole::Primary => &route.primary,
            ConnectionRole::Replica => {
                if route.replicas.is_empty() {
                    return Err(SqlKitError::configuration(format!(
                        "No replica connection configured for '{name}'"
                    )));
                }
                let index = route.cursor.fetch_add(1, Ordering::Relaxed) % route.replicas.len();
                debug!(connection = %route.name, replica = index, "Routing to replica");
                &route.replicas[index]
            }
        };

        if connection_string.trim().is_empty() {
            return Err(SqlKitError::configuration(format!(
                "Connection string for '{name}' ({role}) is blank"
            )));
        }

        debug!(connection = %route.name, role = %role, "Connection resolved");
        Ok(connection_string.clone())
    }

    /// Route summaries sorted by name
    pub fn summaries(&self) -> Vec<RouteSummary> {
        let mut summaries: Vec<RouteSummary> = self
            .routes
            .values()
            .map(|route| RouteSummary {
                name: route.name.clone(),
                master_slave: route.master_slave,
                replicas: route.replicas.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }
}
