// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration for the HTTP API server

use serde::{Deserialize, Serialize};

/// Settings for the web server exposing the cocktail API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The network address the web server binds to.
    pub address: String,
    /// The TCP port the web server listens on.
    pub port: u16,
    /// Server identity reported in response headers.
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
            name: "BarBotServer".to_string(),
        }
    }
}
