mod environment_build;
mod interactive_session;
mod job;
mod jupyter_build;
mod pipeline_run;

pub use environment_build::*;
pub use interactive_session::*;
pub use job::*;
pub use jupyter_build::*;
pub use pipeline_run::*;
