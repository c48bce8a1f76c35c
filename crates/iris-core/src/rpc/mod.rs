//! JSON-RPC request dispatch.
//!
//! [`Dispatcher::handle`] turns one request line into one response line: it
//! is a pure function of the request text plus the injected classifier, and
//! always produces a complete envelope, no matter how malformed the input.

pub mod envelope;

use base64::Engine as _;
use serde_json::Value;

use crate::classify::Classifier;
use crate::types::ClassifyParams;
use envelope::{RpcRequest, RpcResponse, APPLICATION_ERROR, METHOD_NOT_FOUND, PARSE_ERROR};

/// Routes parsed requests to method handlers.
///
/// Adding a method means adding one arm to the dispatch table in
/// [`Dispatcher::dispatch`].
pub struct Dispatcher {
    classifier: Classifier,
}

impl Dispatcher {
    /// Create a dispatcher around a classification engine.
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Handle one request line, producing the response envelope text.
    pub fn handle(&self, request: &str) -> String {
        let response = self.dispatch(request);
        serde_json::to_string(&response).unwrap_or_else(|_| {
            // Our envelope types serialize infallibly; this path exists so a
            // future regression degrades to an error line instead of a panic.
            format!(
                r#"{{"jsonrpc":"2.0","error":{{"code":{},"message":"Response serialization failed"}},"id":null}}"#,
                APPLICATION_ERROR
            )
        })
    }

    fn dispatch(&self, request: &str) -> RpcResponse {
        let parsed: Value = match serde_json::from_str(request) {
            Ok(value) => value,
            Err(e) => {
                return RpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
            }
        };

        let request = match RpcRequest::from_value(parsed) {
            Ok(request) => request,
            Err(response) => return response,
        };

        match request.method.as_str() {
            "classify" => self.classify(request.params, request.id),
            _ => RpcResponse::failure(request.id, METHOD_NOT_FOUND, "Method not found"),
        }
    }

    /// The `classify` method: decode params, run the engine, wrap the result.
    fn classify(&self, params: Value, id: Value) -> RpcResponse {
        let params: ClassifyParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return RpcResponse::failure(
                    id,
                    APPLICATION_ERROR,
                    format!("Invalid classify params: {e}"),
                )
            }
        };

        let image_bytes = match base64::engine::general_purpose::STANDARD.decode(&params.image) {
            Ok(bytes) => bytes,
            Err(e) => {
                return RpcResponse::failure(
                    id,
                    APPLICATION_ERROR,
                    format!("Invalid base64 image: {e}"),
                )
            }
        };

        match self.classifier.classify(image_bytes, &params.labels) {
            Ok(results) => match serde_json::to_value(&results) {
                Ok(value) => RpcResponse::success(id, value),
                Err(e) => RpcResponse::failure(
                    id,
                    APPLICATION_ERROR,
                    format!("Failed to serialize result: {e}"),
                ),
            },
            Err(e) => {
                tracing::warn!(error = %e, "classification failed");
                RpcResponse::failure(id, APPLICATION_ERROR, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoreError;
    use crate::scorer::LabelScorer;
    use image::DynamicImage;
    use serde_json::json;
    use std::sync::Arc;

    struct UniformScorer;

    impl LabelScorer for UniformScorer {
        fn encode_image(&self, _image: &DynamicImage) -> Result<Vec<f32>, ScoreError> {
            Ok(vec![1.0])
        }

        fn score(
            &self,
            _image_embedding: &[f32],
            labels: &[String],
        ) -> Result<Vec<f32>, ScoreError> {
            Ok(vec![1.0 / labels.len() as f32; labels.len()])
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Classifier::new(Arc::new(UniformScorer), 10_000))
    }

    fn parse(response: &str) -> Value {
        serde_json::from_str(response).unwrap()
    }

    #[test]
    fn test_invalid_json_is_parse_error_with_null_id() {
        let response = parse(&dispatcher().handle("{not json"));
        assert_eq!(response["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(response["id"], Value::Null);
    }

    #[test]
    fn test_non_object_request_is_parse_error() {
        for request in ["[1,2,3]", "\"hello\"", "42", "null"] {
            let response = parse(&dispatcher().handle(request));
            assert_eq!(response["error"]["code"], json!(PARSE_ERROR), "{request}");
        }
    }

    #[test]
    fn test_missing_method_echoes_id() {
        let response = parse(&dispatcher().handle(r#"{"params":{},"id":"req-9"}"#));
        assert_eq!(response["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(response["id"], json!("req-9"));
    }

    #[test]
    fn test_non_string_method_is_parse_error() {
        let response = parse(&dispatcher().handle(r#"{"method":42,"params":{},"id":1}"#));
        assert_eq!(response["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(response["id"], json!(1));
    }

    #[test]
    fn test_missing_params_is_parse_error() {
        let response = parse(&dispatcher().handle(r#"{"method":"classify","id":1}"#));
        assert_eq!(response["error"]["code"], json!(PARSE_ERROR));
    }

    #[test]
    fn test_missing_id_is_parse_error() {
        let response = parse(&dispatcher().handle(r#"{"method":"classify","params":{}}"#));
        assert_eq!(response["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(response["id"], Value::Null);
    }

    #[test]
    fn test_unknown_method_is_method_not_found() {
        let response = parse(&dispatcher().handle(r#"{"method":"embed","params":{},"id":3}"#));
        assert_eq!(response["error"]["code"], json!(METHOD_NOT_FOUND));
        assert_eq!(response["error"]["message"], json!("Method not found"));
        assert_eq!(response["id"], json!(3));
    }

    #[test]
    fn test_bad_base64_is_application_error() {
        let request = json!({
            "method": "classify",
            "params": {"image": "@@not-base64@@", "labels": {"animal": ["cat"]}},
            "id": 4,
        });
        let response = parse(&dispatcher().handle(&request.to_string()));
        assert_eq!(response["error"]["code"], json!(APPLICATION_ERROR));
        assert_eq!(response["id"], json!(4));
    }

    #[test]
    fn test_malformed_labels_shape_is_application_error() {
        let request = r#"{"method":"classify","params":{"image":"aGk=","labels":{"animal":"cat"}},"id":5}"#;
        let response = parse(&dispatcher().handle(request));
        assert_eq!(response["error"]["code"], json!(APPLICATION_ERROR));
    }

    #[test]
    fn test_response_carries_exactly_one_of_result_error() {
        let ok_request = {
            use base64::Engine as _;
            let img = DynamicImage::new_rgb8(4, 4);
            let mut buf = std::io::Cursor::new(Vec::new());
            img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
            let image = base64::engine::general_purpose::STANDARD.encode(buf.into_inner());
            json!({
                "method": "classify",
                "params": {"image": image, "labels": {"animal": ["cat", "dog"]}},
                "id": 6,
            })
            .to_string()
        };

        let success = parse(&dispatcher().handle(&ok_request));
        assert!(success.get("result").is_some());
        assert!(success.get("error").is_none());

        let failure = parse(&dispatcher().handle(r#"{"method":"nope","params":{},"id":6}"#));
        assert!(failure.get("result").is_none());
        assert!(failure.get("error").is_some());
    }
}
