//! Command Handler
//!
//! Validates request arguments, calls into the key-value store or the geo
//! engine, and turns the result into a [`Reply`].
//!
//! ## Supported Commands
//!
//! - `PING [message]` - Test connection
//! - `ECHO message` - Echo message
//! - `GET key` - Get a key's value, or null if missing or expired
//! - `SET key value seconds` - Set a key; negative seconds never expire
//! - `GEOADD namespace latitude longitude member` - Add or move a point
//! - `GEODIST namespace member1 member2` - Distance in meters, or `-1`
//! - `GEOPOS namespace member [member ...]` - Stored `[longitude, latitude]`
//! - `GEOHASH namespace member [member ...]` - Stored geohash strings
//! - `DBSIZE` - Number of keys
//! - `INFO` - Server counters
//! - `COMMAND` - List commands
//!
//! Argument errors are answered here and never reach the engines.

use crate::geo::GeoEngine;
use crate::protocol::{Command, Reply};
use crate::storage::{Expiry, KeyValueStore};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Every command name `dispatch` understands.
pub const SUPPORTED_COMMANDS: &[&str] = &[
    "PING", "ECHO", "GET", "SET", "GEOADD", "GEODIST", "GEOPOS", "GEOHASH", "DBSIZE", "INFO",
    "COMMAND",
];

/// Distance reported by GEODIST when the namespace or a member is missing.
const GEODIST_NOT_FOUND: f64 = -1.0;

/// Dispatches commands to the storage engines.
///
/// Cheap to clone; each connection gets its own copy sharing the same
/// engines.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    kv: Arc<KeyValueStore>,
    geo: Arc<GeoEngine>,
    start_time: Instant,
}

impl CommandHandler {
    pub fn new(kv: Arc<KeyValueStore>, geo: Arc<GeoEngine>) -> Self {
        Self {
            kv,
            geo,
            start_time: Instant::now(),
        }
    }

    /// Executes a command and returns the reply.
    pub fn execute(&self, command: Command) -> Reply {
        let name = command.name();
        trace!(command = %name, argc = command.args().len(), "execute");
        self.dispatch(&name, command.args())
    }

    fn dispatch(&self, cmd: &str, args: &[Bytes]) -> Reply {
        match cmd {
            "PING" => self.cmd_ping(args),
            "ECHO" => self.cmd_echo(args),

            "GET" => self.cmd_get(args),
            "SET" => self.cmd_set(args),

            "GEOADD" => self.cmd_geoadd(args),
            "GEODIST" => self.cmd_geodist(args),
            "GEOPOS" => self.cmd_geopos(args),
            "GEOHASH" => self.cmd_geohash(args),

            "DBSIZE" => self.cmd_dbsize(args),
            "INFO" => self.cmd_info(args),
            "COMMAND" => self.cmd_command(args),

            _ => Reply::error(format!("ERR unknown command '{}'", cmd)),
        }
    }

    // ========================================================================
    // Server Commands
    // ========================================================================

    /// PING [message]
    fn cmd_ping(&self, args: &[Bytes]) -> Reply {
        match args {
            [] => Reply::pong(),
            [message] => Reply::bulk(message.clone()),
            _ => wrong_arity("ping"),
        }
    }

    /// ECHO message
    fn cmd_echo(&self, args: &[Bytes]) -> Reply {
        match args {
            [message] => Reply::bulk(message.clone()),
            _ => wrong_arity("echo"),
        }
    }

    /// DBSIZE
    fn cmd_dbsize(&self, _args: &[Bytes]) -> Reply {
        Reply::Integer(self.kv.len() as i64)
    }

    /// INFO
    fn cmd_info(&self, _args: &[Bytes]) -> Reply {
        let kv = self.kv.stats();
        let geo = self.geo.stats();

        let info = format!(
            "# Server\r\n\
             geokv_version:{}\r\n\
             os:{}\r\n\
             uptime_in_seconds:{}\r\n\
             \r\n\
             # Keyspace\r\n\
             keys:{}\r\n\
             get_ops:{}\r\n\
             set_ops:{}\r\n\
             keyspace_hits:{}\r\n\
             keyspace_misses:{}\r\n\
             expired_keys:{}\r\n\
             \r\n\
             # Geo\r\n\
             geo_namespaces:{}\r\n\
             geo_members:{}\r\n\
             geoadd_ops:{}\r\n\
             geodist_ops:{}\r\n",
            crate::VERSION,
            std::env::consts::OS,
            self.start_time.elapsed().as_secs(),
            kv.keys,
            kv.get_ops,
            kv.set_ops,
            kv.hits,
            kv.misses,
            kv.expired,
            geo.namespaces,
            geo.members,
            geo.add_ops,
            geo.dist_ops,
        );

        Reply::bulk(info)
    }

    /// COMMAND
    fn cmd_command(&self, _args: &[Bytes]) -> Reply {
        Reply::Array(
            SUPPORTED_COMMANDS
                .iter()
                .map(|&name| Reply::bulk(name))
                .collect(),
        )
    }

    // ========================================================================
    // Key-Value Commands
    // ========================================================================

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> Reply {
        let [key] = args else {
            return wrong_arity("get");
        };

        match self.kv.get(key) {
            Ok(value) => Reply::bulk(value),
            Err(miss) => {
                trace!(key = ?key, reason = %miss, "get miss");
                Reply::Null
            }
        }
    }

    /// SET key value seconds
    fn cmd_set(&self, args: &[Bytes]) -> Reply {
        let [key, value, seconds] = args else {
            return wrong_arity("set");
        };

        let Some(seconds) = parse_str::<i64>(seconds) else {
            return Reply::error("ERR invalid expiration");
        };

        self.kv
            .set(key.clone(), value.clone(), Expiry::from_seconds(seconds));
        Reply::ok()
    }

    // ========================================================================
    // Geo Commands
    // ========================================================================

    /// GEOADD namespace latitude longitude member
    fn cmd_geoadd(&self, args: &[Bytes]) -> Reply {
        let [namespace, lat, lon, member] = args else {
            return wrong_arity("geoadd");
        };

        let Some(lat) = parse_coordinate(lat, 90.0) else {
            return Reply::error("ERR invalid latitude");
        };
        let Some(lon) = parse_coordinate(lon, 180.0) else {
            return Reply::error("ERR invalid longitude");
        };

        self.geo.add(namespace.clone(), lat, lon, member.clone());
        Reply::ok()
    }

    /// GEODIST namespace member1 member2
    fn cmd_geodist(&self, args: &[Bytes]) -> Reply {
        let [namespace, member1, member2] = args else {
            return wrong_arity("geodist");
        };

        match self.geo.dist(namespace, member1, member2) {
            Ok(meters) => Reply::float(meters),
            Err(e) => {
                debug!(error = %e, "geodist lookup failed");
                Reply::float(GEODIST_NOT_FOUND)
            }
        }
    }

    /// GEOPOS namespace member [member ...]
    fn cmd_geopos(&self, args: &[Bytes]) -> Reply {
        let [namespace, members @ ..] = args else {
            return wrong_arity("geopos");
        };
        if members.is_empty() {
            return wrong_arity("geopos");
        }

        let items = members
            .iter()
            .map(|member| match self.geo.position(namespace, member) {
                Ok(point) => Reply::Array(vec![
                    Reply::float(point.longitude),
                    Reply::float(point.latitude),
                ]),
                Err(_) => Reply::Null,
            })
            .collect();

        Reply::Array(items)
    }

    /// GEOHASH namespace member [member ...]
    fn cmd_geohash(&self, args: &[Bytes]) -> Reply {
        let [namespace, members @ ..] = args else {
            return wrong_arity("geohash");
        };
        if members.is_empty() {
            return wrong_arity("geohash");
        }

        let items = members
            .iter()
            .map(|member| {
                self.geo
                    .hash(namespace, member)
                    .map(Reply::bulk)
                    .unwrap_or(Reply::Null)
            })
            .collect();

        Reply::Array(items)
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Arity is exact: trailing extra arguments are rejected, not ignored.
fn wrong_arity(cmd: &str) -> Reply {
    Reply::error(format!(
        "ERR wrong number of arguments for '{}' command",
        cmd
    ))
}

fn parse_str<T: std::str::FromStr>(arg: &[u8]) -> Option<T> {
    std::str::from_utf8(arg).ok()?.parse().ok()
}

/// Parses a finite coordinate within `[-limit, limit]`.
fn parse_coordinate(arg: &[u8], limit: f64) -> Option<f64> {
    parse_str::<f64>(arg).filter(|v| v.is_finite() && v.abs() <= limit)
}
