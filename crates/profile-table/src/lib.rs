//! Atmospheric profile table format.
//!
//! One file per run: a single `#` header line naming the columns, then one
//! comma-separated row per grid point in enumeration order. The downstream
//! drag simulator reads columns by position, so the column order below is a
//! hard contract.
//!
//! ```text
//! # time_iso, lat_deg, lon_deg, alt_m, he_#/m3, o_#/m3, n2_#/m3, o2_#/m3, ar_#/m3, h_#/m3, n_#/m3, mass_kg_m3, texo_k, talt_k
//! 2025-08-17T00:00:00, 0, 0, 400000, 2500000000000, ...
//! ```

pub mod reader;
pub mod writer;

pub use reader::{ProfileRow, ProfileTable};
pub use writer::{write_rows, write_table};

/// Column names in output order.
pub const COLUMNS: [&str; 14] = [
    "time_iso",
    "lat_deg",
    "lon_deg",
    "alt_m",
    "he_#/m3",
    "o_#/m3",
    "n2_#/m3",
    "o2_#/m3",
    "ar_#/m3",
    "h_#/m3",
    "n_#/m3",
    "mass_kg_m3",
    "texo_k",
    "talt_k",
];

/// Field separator used in the header and every row.
pub const SEPARATOR: &str = ", ";

/// The header line, without trailing newline.
pub fn header_line() -> String {
    format!("# {}", COLUMNS.join(SEPARATOR))
}
