//! Mapping of inbound trigger submissions into the initial context of a run.

use serde_json::{json, Map, Value};

/// Context key Google Form submissions are stored under
pub const GOOGLE_FORM_KEY: &str = "googleForm";

/// Context key Stripe events are stored under
pub const STRIPE_KEY: &str = "stripe";

fn field(payload: &Value, key: &str) -> Value {
    payload.get(key).cloned().unwrap_or(Value::Null)
}

/// Initial data for a Google Form submission.
///
/// The Apps Script hook posts `formId`, `formTitle`, `responseId`,
/// `timestamp`, `respondentEmail` and a `responses` map of question
/// title to answer. The full payload is kept under `raw`.
pub fn google_form_initial_data(payload: &Value) -> Map<String, Value> {
    let responses = match payload.get("responses") {
        Some(responses @ Value::Object(_)) => responses.clone(),
        _ => Value::Object(Map::new()),
    };

    let mut data = Map::new();
    data.insert(
        GOOGLE_FORM_KEY.to_string(),
        json!({
            "formId": field(payload, "formId"),
            "formTitle": field(payload, "formTitle"),
            "responseId": field(payload, "responseId"),
            "timestamp": field(payload, "timestamp"),
            "respondentEmail": field(payload, "respondentEmail"),
            "responses": responses,
            "raw": payload,
        }),
    );
    data
}

/// Initial data for a Stripe webhook event.
pub fn stripe_initial_data(event: &Value) -> Map<String, Value> {
    let object = event
        .pointer("/data/object")
        .cloned()
        .unwrap_or(Value::Null);

    let mut data = Map::new();
    data.insert(
        STRIPE_KEY.to_string(),
        json!({
            "eventId": field(event, "id"),
            "eventType": field(event, "type"),
            "timestamp": field(event, "created"),
            "livemode": field(event, "livemode"),
            "amount": field(&object, "amount"),
            "currency": field(&object, "currency"),
            "customerId": field(&object, "customer"),
            "raw": object,
        }),
    );
    data
}
