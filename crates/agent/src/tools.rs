use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Side-effecting operations the deploy/destroy engines perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Deploy,
    Destroy,
    Reconfigure,
}

impl ActionKind {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::Deploy => "executor.deploy",
            Self::Destroy => "executor.destroy",
            Self::Reconfigure => "executor.reconfigure",
        }
    }

    /// Maps a classified intent onto the executor it would reach, using the same
    /// keyword precedence as the risk scorer. Read-only intents map to nothing.
    pub fn from_intent(intent: &str) -> Option<Self> {
        const DESTROY: &[&str] = &["destroy", "delete"];
        const DEPLOY: &[&str] = &["deploy", "apply", "create"];
        const RECONFIGURE: &[&str] = &["rollback", "update", "configure", "scale", "resize"];

        if DESTROY.iter().any(|keyword| intent.contains(keyword)) {
            Some(Self::Destroy)
        } else if DEPLOY.iter().any(|keyword| intent.contains(keyword)) {
            Some(Self::Deploy)
        } else if RECONFIGURE.iter().any(|keyword| intent.contains(keyword)) {
            Some(Self::Reconfigure)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub conversation_id: String,
    pub kind: ActionKind,
    pub intent: String,
    pub resource_id: Option<String>,
    /// Operator explicitly confirmed a destructive action on this turn.
    pub confirmed: bool,
}

#[async_trait]
pub trait ActionExecutor: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, request: &ActionRequest) -> Result<Value>;
}

#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<ActionKind, Box<dyn ActionExecutor>>,
}

impl ExecutorRegistry {
    pub fn register<T>(&mut self, kind: ActionKind, executor: T)
    where
        T: ActionExecutor + 'static,
    {
        self.executors.insert(kind, Box::new(executor));
    }

    pub fn get(&self, kind: ActionKind) -> Option<&dyn ActionExecutor> {
        self.executors.get(&kind).map(|executor| executor.as_ref())
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

/// Records requests instead of touching infrastructure.
#[derive(Clone, Default)]
pub struct DryRunExecutor {
    executed: Arc<Mutex<Vec<ActionRequest>>>,
}

impl DryRunExecutor {
    pub fn executed(&self) -> Vec<ActionRequest> {
        match self.executed.lock() {
            Ok(executed) => executed.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ActionExecutor for DryRunExecutor {
    fn name(&self) -> &'static str {
        "dry_run"
    }

    async fn execute(&self, request: &ActionRequest) -> Result<Value> {
        match self.executed.lock() {
            Ok(mut executed) => executed.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        Ok(json!({
            "dry_run": true,
            "action": request.kind.action_key(),
            "intent": request.intent,
            "resource_id": request.resource_id,
        }))
    }
}
