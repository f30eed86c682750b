use serde::Serialize;

/// Response envelope shared by every JSON endpoint. Exactly one of `data`
/// and `error` is non-null.
#[derive(Debug, Serialize)]
pub struct ResponsePayload<D: Serialize> {
    pub success: bool,
    pub data: Option<D>,
    pub error: Option<String>,
}

impl<D: Serialize> ResponsePayload<D> {
    pub fn succeeded(data: D) -> Self {
        ResponsePayload {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ResponsePayload<()> {
    pub fn failed(error: impl Into<String>) -> Self {
        ResponsePayload {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn succeeded_carries_data_and_null_error() {
        let payload = ResponsePayload::succeeded(json!({ "id": 1 }));
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["success"], json!(true));
        assert_eq!(value["data"], json!({ "id": 1 }));
        assert_eq!(value["error"], json!(null));
    }

    #[test]
    fn failed_carries_error_and_null_data() {
        let payload = ResponsePayload::<()>::failed("Coffee #1 not found");
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["success"], json!(false));
        assert_eq!(value["data"], json!(null));
        assert_eq!(value["error"], json!("Coffee #1 not found"));
    }
}
