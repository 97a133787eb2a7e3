use serde_json::{json, Value};

/// Fixed demonstration job listing served when the ATS is unreachable.
///
/// Read paths only: a caller looking at a dashboard should see something
/// rather than an error page. Write paths never touch this dataset — a push
/// against fabricated remote state would corrupt the binding table.
pub fn demo_jobs() -> Vec<Value> {
    vec![
        json!({
            "id": "demo-1001",
            "title": "Senior Backend Engineer",
            "status": "open",
        }),
        json!({
            "id": "demo-1002",
            "title": "Staff Recruiter",
            "status": "open",
        }),
        json!({
            "id": "demo-1003",
            "title": "Account Manager",
            "status": "filled",
        }),
    ]
}
