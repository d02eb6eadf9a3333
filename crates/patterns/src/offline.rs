//! Offline answers that let every pattern complete without a backend.

use conductor_providers::OfflineInvoker;

use crate::definitions::{COMPLIANCE_AUDITOR, COMPLIANCE_SHIELD, EXECUTIVE_AUDITOR};

/// An [`OfflineInvoker`] whose auditors approve, so governance patterns
/// reach their verified reports.
pub fn offline_invoker() -> OfflineInvoker {
    OfflineInvoker::new()
        .with_response(COMPLIANCE_SHIELD, "APPROVED")
        .with_response(COMPLIANCE_AUDITOR, "PASSED: no GDPR/ISO findings in offline mode.")
        .with_response(
            EXECUTIVE_AUDITOR,
            "1. Strategic Alignment: 4/5\n2. Technical Feasibility: 4/5\n3. Financial Logic: 3/5",
        )
}
