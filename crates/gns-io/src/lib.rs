//! # gns-io: Gas Network Persistence
//!
//! File adapters around [`gns_core::Network`]: the GML graph format plus
//! the CSV side-inputs and result exports of a simplification run.
//!
//! ## Design Philosophy
//!
//! **Derived values never persist**: capacity and its normalization are
//! functions of the physical pipe attributes, so [`gml::read_gml`]
//! recomputes them after rebuilding the graph rather than trusting the
//! file.
//!
//! **Optional inputs degrade, required inputs fail**: the importance
//! weights and supply tables fall back to empty defaults with a logged
//! warning when missing or malformed; a network file that cannot be parsed
//! is a hard error.
//!
//! **Error recovery inside a file**: per-row and per-attribute problems
//! are collected as [`gns_core::Diagnostics`] and the import continues.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gns_io::gml::{read_gml, write_gml};
//!
//! fn main() -> anyhow::Result<()> {
//!     let imported = read_gml("network.gml")?;
//!     if imported.diagnostics.has_errors() {
//!         eprintln!("import issues:\n{}", imported.diagnostics);
//!     }
//!     println!("{}", imported.network.stats());
//!     write_gml(&imported.network, "copy.gml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Formats
//!
//! | Format | Direction | Notes |
//! |--------|-----------|-------|
//! | GML subset | read + write | cluster membership flattened to scalars |
//! | importance weights CSV | read + write | `node_type`, `norm_avg_importance_score` |
//! | supply CSV | read | `node`, `supply` (kg/s) |
//! | contingency CSV | write | per-node outage records |
//! | diagnostics JSON | write | timestamped report |

pub mod exporters;
pub mod gml;
pub mod importers;

pub use exporters::{
    write_contingency_records, write_diagnostics, write_role_importance, ContingencyRow,
};
pub use gml::{parse_gml, read_gml, render_gml, write_gml, GmlError, GmlImport};
pub use importers::{apply_supply, read_importance_weights, read_supply};
