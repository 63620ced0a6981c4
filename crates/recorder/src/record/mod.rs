//! Record construction and sanitization.
//!
//! Extractors fill a [`Record`] starting from [`build_base`]; [`sanitize`]
//! turns it into the line that lands in a category buffer.
mod builder;
mod sanitize;
mod value;

pub use builder::{
    area_record, build_base, direction_record, entity_record, item_record, items_value,
    position_record, set_position, synthetic,
};
pub use sanitize::{COORD_PRECISION, SanitizedRecord, format_coord, normalize_key, sanitize};
pub use value::{Record, Value};
