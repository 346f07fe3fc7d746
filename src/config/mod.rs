//! Layered compiler configuration.
//!
//! Configuration is merged field-by-field from these tiers, lowest first:
//! 1. **Defaults** - embedded in [`Config::default`]
//! 2. **Project** - `$CWD/mapping-compiler/config.yaml`
//! 3. **User** - `~/.mapping-compiler/config.yaml`
//! 4. **Explicit** - `--config <file>` or `MAPPING_COMPILER_CONFIG_PATH`
//! 5. **Environment** - individual overrides below
//!
//! ## Environment Variables
//! - `MAPPING_COMPILER_PROVIDER` - Provider identifier
//! - `MAPPING_COMPILER_FORMAT_VERSION` - Document format-version marker
//! - `MAPPING_COMPILER_OUTPUT_FORMAT` - `yaml` or `json`
//! - `MAPPING_COMPILER_USER_DIR` - User config dir (default: `~/.mapping-compiler`)
//! - `MAPPING_COMPILER_PROJECT_DIR` - Project config dir (default: `./mapping-compiler`)

mod loader;
mod merge;
mod types;

pub use loader::{CONFIG_FILE_NAME, ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
