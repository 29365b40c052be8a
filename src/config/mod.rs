//! Configuration system.
//!
//! Configuration is merged field by field from these tiers, later wins:
//! 1. **Defaults** - built in (`php.bin = "php"`)
//! 2. **Project** - `$CWD/pickles2-mcp/config.yaml`
//! 3. **User** - `~/.pickles2-mcp/config.yaml`
//! 4. **Environment** - the variables below
//!
//! An explicit config file (`--config` or `PICKLES2_MCP_CONFIG_PATH`)
//! replaces tiers 2 and 3.
//!
//! ## Environment Variables
//! - `PICKLES2_MCP_CONFIG_PATH` - Explicit config file
//! - `PICKLES2_MCP_PROJECT_DIR` - Project config dir (default: `./pickles2-mcp`)
//! - `PICKLES2_MCP_USER_DIR` - User config dir (default: `~/.pickles2-mcp`)
//! - `PICKLES2_MCP_PHP_BIN` - PHP binary
//! - `PICKLES2_MCP_PHP_INI` - php.ini path
//! - `PICKLES2_MCP_PHP_EXTENSION_DIR` - PHP extension directory

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
