mod session_status;
mod unit_status;
mod workload;

pub use session_status::*;
pub use unit_status::*;
pub use workload::*;
