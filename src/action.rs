use crate::request::Action;

/// What an `in` invocation does once it knows whether the object exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Fetch,
    /// Destroy found nothing: report a fresh version and write nothing.
    ReportDeletedNoFetch,
    /// Create/update found nothing: the source is misconfigured.
    StateFileMissing,
}

pub fn resolve(action: Action, object_exists: bool) -> Resolution {
    match (action, object_exists) {
        (_, true) => Resolution::Fetch,
        (Action::Destroy, false) => Resolution::ReportDeletedNoFetch,
        (Action::CreateOrUpdate, false) => Resolution::StateFileMissing,
    }
}
