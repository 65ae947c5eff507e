//! CLI command implementations.
//!
//! This module provides the command-line interface for kinship. Each
//! submodule implements a specific CLI command.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `import` | Merge a snapshot archive into the record store |
//! | `export` | Serialize the record store into a snapshot archive |
//! | `diff` | Preview an archive against the store without writing |
//! | `status` | Show record store statistics |
//! | `link` | Edit family relations with symmetric-edge maintenance |
//!
//! # Example Usage
//!
//! ```bash
//! # Preview what an archive would change
//! kinship diff family-2019.zip
//!
//! # Import, keeping existing records for conflicting people
//! kinship import family-2019.zip --apply new
//!
//! # Export everything
//! kinship export backups/family-2026.zip
//!
//! # Record a marriage (writes both spouse lists)
//! kinship link spouse 104 107
//! ```

mod diff;
mod export;
mod import;
mod link;
mod status;

pub use diff::cmd_diff;
pub use export::cmd_export;
pub use import::{cmd_import, ApplyMode};
pub use link::{cmd_link, LinkKind};
pub use status::cmd_status;
