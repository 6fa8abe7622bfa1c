pub use drivebot_common::{Error, Result};

drivebot_common::impl_context!();
