//! Design rule checks consuming the connectivity core
//!
//! # Submodules
//! - `annulus` - Via annular-ring width check

mod annulus;

pub use annulus::{
    check_annular_rings, AnnulusConstraint, AnnulusViolation, AnnulusViolationKind,
};
