pub mod anchor;
pub mod geometry;
pub mod index;
pub mod page;
pub mod payload;

pub use anchor::{AnchorRecord, AnchorRegistry};
pub use geometry::{GeometrySample, Size};
pub use index::{IndexMode, IndexModeError};
pub use page::{
    mm_to_inches, mm_to_points, Margins, Orientation, PageSetup, PageSetupError, PaperSize,
    PAPER_SIZES,
};
pub use payload::{ExtractionPayload, SourcePosition, TargetPosition, TocMarker};
