pub mod analyze;
pub mod model;

pub use analyze::{analyze_entries, Report, Walk};
pub use model::{load_config, load_cop_defs, load_listing, load_raw_bin, FunctionDef, Image, ListingFile, Segment};
