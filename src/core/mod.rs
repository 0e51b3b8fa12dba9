//! Footprint data model.

pub mod attribute;
pub mod coercion;
pub mod description;
pub mod footprint;
pub mod only;
pub mod priority;
pub mod value;

pub use attribute::{Access, AccessMode, AttributeDelta, AttributeSpec};
pub use coercion::{Coercion, TypeArgs, TypeSpec};
pub use description::{description, Context, Description};
pub use footprint::{merge, Footprint, FootprintError, Fragment};
pub use only::{OnlyFilter, OnlyOutcome, OnlyRule};
pub use priority::{PriorityLevel, PrioritySet};
pub use value::{Value, ValueKind};
