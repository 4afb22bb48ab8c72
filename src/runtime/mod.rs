mod clock;
mod confinement;
mod executor;
mod worker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use confinement::UiThread;
pub use executor::{Completion, UiExecutor};
pub use worker::{spawn_worker, WorkerFailure};
