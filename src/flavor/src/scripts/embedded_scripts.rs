//! Embedded PKI scripts - compiled into the binary so the plugin is self-contained.
//!
//! Scripts are loaded at compile time via `include_str!` and registered with the
//! [`ScriptLibrary`](super::ScriptLibrary) under their asset names.

/// Asset name of the root CA initialization script.
pub const INIT_SSL_CA: &str = "ssl/init-ssl-ca";

/// Asset name of the key/certificate issuance script.
pub const INIT_SSL: &str = "ssl/init-ssl";

pub const INIT_SSL_CA_SCRIPT: &str = include_str!("assets/ssl/init-ssl-ca.sh.j2");
pub const INIT_SSL_SCRIPT: &str = include_str!("assets/ssl/init-ssl.sh.j2");

/// All embedded scripts as (name, content) pairs for registration with Tera.
pub const ALL_SCRIPTS: &[(&str, &str)] = &[
    (INIT_SSL_CA, INIT_SSL_CA_SCRIPT),
    (INIT_SSL, INIT_SSL_SCRIPT),
];
