//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::{Claims, ProductId, ProductSummary, UserId, UserRole};
use thiserror::Error;

/// Seed data that cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} entry '{entry}': {reason}")]
    InvalidEntry {
        key: &'static str,
        entry: String,
        reason: &'static str,
    },
}

/// Bearer token accepted by the in-memory auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSeed {
    pub token: String,
    pub claims: Claims,
}

/// Catalog entry and opening stock for the in-memory inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSeed {
    pub product: ProductSummary,
    pub stock: i64,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset means the
///   in-memory store
/// - `SAGA_TIMEOUT_MS`: deadline for one request's saga (default: `10000`)
/// - `COMPENSATION_TIMEOUT_MS`: bound on each compensation (default: `30000`)
/// - `AUTH_TOKENS`: comma-separated `token=user_id:role` entries, role one of
///   `customer`, `supplier` or `admin` (default: none)
/// - `PRODUCTS`: comma-separated `product_id:stock:price:name` entries
///   (default: none)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub saga_timeout: Duration,
    pub compensation_timeout: Duration,
    pub auth_tokens: Vec<TokenSeed>,
    pub products: Vec<ProductSeed>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `AUTH_TOKENS` or `PRODUCTS` holds an entry
    /// that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            saga_timeout: millis_from_env("SAGA_TIMEOUT_MS").unwrap_or(defaults.saga_timeout),
            compensation_timeout: millis_from_env("COMPENSATION_TIMEOUT_MS")
                .unwrap_or(defaults.compensation_timeout),
            auth_tokens: parse_tokens(&std::env::var("AUTH_TOKENS").unwrap_or_default())?,
            products: parse_products(&std::env::var("PRODUCTS").unwrap_or_default())?,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            saga_timeout: Duration::from_millis(10_000),
            compensation_timeout: Duration::from_millis(30_000),
            auth_tokens: Vec::new(),
            products: Vec::new(),
        }
    }
}

fn millis_from_env(key: &str) -> Option<Duration> {
    parse_millis(&std::env::var(key).ok()?)
}

fn parse_millis(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn entries(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|entry| !entry.is_empty())
}

fn invalid(key: &'static str, entry: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidEntry {
        key,
        entry: entry.to_string(),
        reason,
    }
}

fn parse_tokens(value: &str) -> Result<Vec<TokenSeed>, ConfigError> {
    const KEY: &str = "AUTH_TOKENS";
    entries(value)
        .map(|entry| {
            let (token, identity) = entry
                .split_once('=')
                .ok_or_else(|| invalid(KEY, entry, "expected token=user_id:role"))?;
            let (user_id, role) = identity
                .split_once(':')
                .ok_or_else(|| invalid(KEY, entry, "expected token=user_id:role"))?;
            if token.trim().is_empty() {
                return Err(invalid(KEY, entry, "empty token"));
            }
            let user_id = user_id
                .trim()
                .parse::<i64>()
                .map_err(|_| invalid(KEY, entry, "user id is not an integer"))?;
            let role = match role.trim().to_ascii_lowercase().as_str() {
                "customer" => UserRole::Customer,
                "supplier" => UserRole::Supplier,
                "admin" => UserRole::Admin,
                _ => return Err(invalid(KEY, entry, "unknown role")),
            };
            Ok(TokenSeed {
                token: token.trim().to_string(),
                claims: Claims::new(UserId::new(user_id), role),
            })
        })
        .collect()
}

fn parse_products(value: &str) -> Result<Vec<ProductSeed>, ConfigError> {
    const KEY: &str = "PRODUCTS";
    entries(value)
        .map(|entry| {
            let mut fields = entry.splitn(4, ':').map(str::trim);
            let (Some(id), Some(stock), Some(price), Some(name)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(invalid(KEY, entry, "expected product_id:stock:price:name"));
            };
            let id = id
                .parse::<i64>()
                .map_err(|_| invalid(KEY, entry, "product id is not an integer"))?;
            let stock = stock
                .parse::<i64>()
                .ok()
                .filter(|stock| *stock >= 0)
                .ok_or_else(|| invalid(KEY, entry, "stock must be a non-negative integer"))?;
            let price = price
                .parse::<i64>()
                .ok()
                .filter(|price| *price >= 0)
                .ok_or_else(|| invalid(KEY, entry, "price must be a non-negative integer"))?;
            if name.is_empty() {
                return Err(invalid(KEY, entry, "empty product name"));
            }
            Ok(ProductSeed {
                product: ProductSummary {
                    product_id: ProductId::new(id),
                    name: name.to_string(),
                    price,
                    thumbnail: String::new(),
                },
                stock,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.saga_timeout, Duration::from_secs(10));
        assert_eq!(config.compensation_timeout, Duration::from_secs(30));
        assert!(config.auth_tokens.is_empty());
        assert!(config.products.is_empty());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_addr_default() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_timeouts_parse_as_milliseconds() {
        assert_eq!(parse_millis("250"), Some(Duration::from_millis(250)));
        assert_eq!(parse_millis(" 40 "), Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_unusable_timeouts_fall_back() {
        assert_eq!(parse_millis("0"), None);
        assert_eq!(parse_millis("-5"), None);
        assert_eq!(parse_millis("soon"), None);
    }

    #[test]
    fn test_tokens_parse() {
        let tokens = parse_tokens(" customer-token=1:customer, supplier-token=50:Supplier ,").unwrap();
        assert_eq!(
            tokens,
            vec![
                TokenSeed {
                    token: "customer-token".to_string(),
                    claims: Claims::new(UserId::new(1), UserRole::Customer),
                },
                TokenSeed {
                    token: "supplier-token".to_string(),
                    claims: Claims::new(UserId::new(50), UserRole::Supplier),
                },
            ]
        );
        assert!(parse_tokens("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        for entry in ["no-identity", "t=abc:customer", "t=1:root", "=1:admin", "t=1"] {
            let err = parse_tokens(entry).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidEntry { key: "AUTH_TOKENS", .. }),
                "{entry}: {err}"
            );
        }
    }

    #[test]
    fn test_products_parse() {
        let products = parse_products("7:5:2500:Desk Lamp, 8:100:300:Bulb: warm white").unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product.product_id, ProductId::new(7));
        assert_eq!(products[0].product.name, "Desk Lamp");
        assert_eq!(products[0].product.price, 2500);
        assert_eq!(products[0].stock, 5);
        assert_eq!(products[1].product.name, "Bulb: warm white");
        assert_eq!(products[1].stock, 100);
    }

    #[test]
    fn test_malformed_products_are_rejected() {
        for entry in ["7:5:2500", "x:5:2500:Lamp", "7:-1:2500:Lamp", "7:5:cheap:Lamp", "7:5:2500: "] {
            let err = parse_products(entry).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidEntry { key: "PRODUCTS", .. }),
                "{entry}: {err}"
            );
        }
    }
}
