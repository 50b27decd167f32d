//! Application-local prelude: conveniently import types/functions/macros
//! which are generally useful and should be available in every module with
//! `use crate::prelude::*;`

/// Abscissa core prelude
pub(crate) use abscissa_core::prelude::*;

/// Application state
pub(crate) use crate::application::APP;
