pub mod client;

pub use client::RatesClient;

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::Result;

/// A single query-string value. The provider accepts both text and numbers.
///
/// Serialized through `Display`, so the logged query string and the one on
/// the wire are the same (`100`, not `100.0`).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Text(text) => f.write_str(text),
            QueryValue::Number(number) => write!(f, "{}", number),
        }
    }
}

impl Serialize for QueryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Number(value)
    }
}

/// Path plus ordered query parameters for one provider request
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderQuery {
    pub path: String,
    pub params: Vec<(&'static str, QueryValue)>,
}

impl ProviderQuery {
    pub fn new(path: impl Into<String>) -> Self {
        ProviderQuery {
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: &'static str, value: impl Into<QueryValue>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// Adds the parameter only when a value is present.
    pub fn optional_param<V: Into<QueryValue>>(self, name: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Renders the parameters as `name=value` pairs joined with `&`, unescaped.
    pub fn query_string(&self) -> String {
        self.params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// The single operation the tools need from the exchange rates provider.
#[async_trait]
pub trait ExchangeRatesApi: Send + Sync {
    /// Issue one GET for `query` and return the parsed JSON body.
    async fn fetch(&self, query: &ProviderQuery) -> Result<Value>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::error::GatewayError;

    /// In-process provider double that replays a canned body and records calls.
    pub struct StubApi {
        body: Value,
        calls: AtomicUsize,
        queries: Mutex<Vec<ProviderQuery>>,
    }

    impl StubApi {
        pub fn new(body: Value) -> Self {
            StubApi {
                body,
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_query(&self) -> Option<ProviderQuery> {
            self.queries.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl ExchangeRatesApi for StubApi {
        async fn fetch(&self, query: &ProviderQuery) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            Ok(self.body.clone())
        }
    }

    /// Provider double whose every call fails at the transport level.
    pub struct FailingApi;

    #[async_trait]
    impl ExchangeRatesApi for FailingApi {
        async fn fetch(&self, _query: &ProviderQuery) -> Result<Value> {
            Err(GatewayError::Transport("connection refused".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_param_omitted_when_absent() {
        let query = ProviderQuery::new("/latest")
            .param("base", "USD")
            .optional_param::<String>("symbols", None);
        assert_eq!(query.params.len(), 1);
        assert_eq!(query.query_string(), "base=USD");
    }

    #[test]
    fn test_query_string_keeps_insertion_order() {
        let query = ProviderQuery::new("/convert")
            .param("from", "USD")
            .param("to", "EUR")
            .param("amount", 100.5);
        assert_eq!(query.query_string(), "from=USD&to=EUR&amount=100.5");
        assert_eq!(query.get("amount"), Some(&QueryValue::Number(100.5)));
    }

    #[test]
    fn test_whole_number_rendered_without_fraction() {
        let query = ProviderQuery::new("/convert").param("amount", 100.0);
        assert_eq!(query.query_string(), "amount=100");
        assert_eq!(
            serde_json::to_value(query.get("amount").unwrap()).unwrap(),
            Value::String("100".to_string())
        );
    }
}
