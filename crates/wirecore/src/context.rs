use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Accumulated results of a run, keyed by each node's variable name.
///
/// Never mutated in place: [`ExecutionContext::with`] returns a new
/// context, so a node only ever sees what earlier nodes produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext(Map<String, Value>);

impl ExecutionContext {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Copy of this context with `key` set to `value`.
    pub fn with(&self, key: impl Into<String>, value: Value) -> Self {
        let mut next = self.0.clone();
        next.insert(key.into(), value);
        Self(next)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for ExecutionContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ExecutionContext {
    type Error = Value;

    /// Objects become contexts, `null` becomes an empty one; anything else
    /// is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(other),
        }
    }
}

/// Free-form configuration payload of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeConfig(Map<String, Value>);

impl NodeConfig {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`. Blank strings count as unset, the way the
    /// editor stores cleared fields.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for NodeConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
