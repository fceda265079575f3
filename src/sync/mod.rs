//! Mirror synchronisation: the per-user [`PlaylistReconciler`] and the
//! [`SyncScheduler`] that walks all users on a timer.

mod reconcile;
mod scheduler;

pub use reconcile::PlaylistReconciler;
pub use reconcile::ReconcileError;
pub use reconcile::ReconcileReport;
pub use reconcile::Step;
pub use scheduler::SyncScheduler;
