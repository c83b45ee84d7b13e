use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ActionFault;

/// The consumed browser capability: one opaque action in, one opaque
/// observation out. Concrete adapters (CDP driver, WebDriver bridge)
/// are injected by the embedding application.
#[async_trait]
pub trait BrowserCapability: Send + Sync {
    async fn perform(&self, action: &str, params: &Value) -> Result<Value, ActionFault>;
}

#[derive(Clone, Copy, Default, Debug)]
pub struct NoopBrowser;

#[async_trait]
impl BrowserCapability for NoopBrowser {
    async fn perform(&self, _action: &str, _params: &Value) -> Result<Value, ActionFault> {
        Ok(Value::Null)
    }
}
