use reqstash_core::{ResponseData, SuccessHandler};

/// Decorates a success handler with a side effect run before it.
///
/// `on_complete` sees the converted data first (this is where the cache
/// write happens), then `original`, if any, receives the same data
/// unchanged.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use reqstash::wrap_success;
/// use reqstash_core::ResponseData;
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let first = Arc::clone(&log);
/// let second = Arc::clone(&log);
///
/// let handler = wrap_success(
///     Some(Box::new(move |_| second.lock().unwrap().push("original"))),
///     move |_| first.lock().unwrap().push("cache"),
/// );
/// handler(ResponseData::Text("body".into()));
///
/// assert_eq!(*log.lock().unwrap(), ["cache", "original"]);
/// ```
pub fn wrap_success<F>(original: Option<SuccessHandler>, on_complete: F) -> SuccessHandler
where
    F: FnOnce(&ResponseData) + Send + 'static,
{
    Box::new(move |data| {
        on_complete(&data);
        if let Some(original) = original {
            original(data);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_original_receives_data_unchanged() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let handler = wrap_success(
            Some(Box::new(move |data| *sink.lock().unwrap() = Some(data))),
            |_| {},
        );
        handler(ResponseData::Json(serde_json::json!({"id": 1})));

        assert_eq!(
            *seen.lock().unwrap(),
            Some(ResponseData::Json(serde_json::json!({"id": 1})))
        );
    }

    #[test]
    fn test_without_original_handler() {
        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let handler = wrap_success(None, move |_| *flag.lock().unwrap() = true);
        handler(ResponseData::Text(String::new()));
        assert!(*called.lock().unwrap());
    }
}
