//! Reconciliation body seam

use keel_common::DomainRef;
use keel_work::Step;

/// Supplies the steps that bring a domain's cluster presence up to date
///
/// The steps run between the STARTING and COMPLETED events of a make-right
/// attempt. Returning a failing step fails the attempt.
#[cfg_attr(test, mockall::automock)]
pub trait DomainReconciler: Send + Sync {
    /// Steps for one attempt on `domain`
    fn steps(&self, domain: &DomainRef) -> Step;
}

/// Reconciler with nothing to do
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReconciler;

impl DomainReconciler for NoopReconciler {
    fn steps(&self, _domain: &DomainRef) -> Step {
        Step::terminal()
    }
}
