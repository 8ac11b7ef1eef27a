//! In-memory registry and AI backend used by unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RegistryError;
use crate::registry::{
    AskBackend, AskRequest, AskResponse, Assistant, AssistantRegistry, CreateAssistantRequest,
    FileUpload, VerifyOutcome,
};
use crate::wallet::WalletAddress;

pub(crate) const ADMIN: &str = "0xABCDEF0123456789ABCDEF0123456789ABCDEF01";
pub(crate) const ADMIN_LOWER: &str = "0xabcdef0123456789abcdef0123456789abcdef01";
pub(crate) const STRANGER: &str = "0x0000000000000000000000000000000000000001";

pub(crate) fn assistant(slug: &str, admin: Option<&str>, context_id: Option<&str>) -> Assistant {
    Assistant {
        slug: slug.to_string(),
        name: None,
        intro_phrase: None,
        context_id: context_id.map(str::to_string),
        dao_address: None,
        dao_network: None,
        admin_address: admin.map(str::to_string),
    }
}

pub(crate) fn wallet(raw: &str) -> WalletAddress {
    WalletAddress::parse(raw).expect("test wallet")
}

/// Registry that keeps assistants and files in memory and records calls.
#[derive(Default)]
pub(crate) struct FakeRegistry {
    assistants: Mutex<Vec<Assistant>>,
    files: Mutex<BTreeMap<String, BTreeSet<String>>>,
    calls: Mutex<Vec<String>>,
    fail_status: Mutex<Option<u16>>,
    verify_outcome: Mutex<Option<VerifyOutcome>>,
}

impl FakeRegistry {
    pub(crate) fn with_assistants(assistants: Vec<Assistant>) -> Self {
        Self {
            assistants: Mutex::new(assistants),
            ..Default::default()
        }
    }

    pub(crate) fn seed_file(&self, context_id: &str, filename: &str) {
        self.files
            .lock()
            .unwrap()
            .entry(context_id.to_string())
            .or_default()
            .insert(filename.to_string());
    }

    /// Make every subsequent call fail with this HTTP status.
    pub(crate) fn fail_with_status(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    pub(crate) fn set_verify_outcome(&self, outcome: VerifyOutcome) {
        *self.verify_outcome.lock().unwrap() = Some(outcome);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that mutate registry state.
    pub(crate) fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.starts_with("create_assistant")
                    || c.starts_with("add_context")
                    || c.starts_with("delete_context")
            })
            .collect()
    }

    fn record(&self, call: String) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(call);
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(RegistryError::Status {
                service: "registry",
                status,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AssistantRegistry for FakeRegistry {
    async fn list_assistants(&self) -> Result<Vec<Assistant>, RegistryError> {
        self.record("list_assistants".to_string())?;
        Ok(self.assistants.lock().unwrap().clone())
    }

    async fn create_assistant(&self, request: &CreateAssistantRequest) -> Result<(), RegistryError> {
        self.record(format!("create_assistant:{}", request.slug))?;
        let mut assistants = self.assistants.lock().unwrap();
        if assistants.iter().any(|a| a.slug == request.slug) {
            return Err(RegistryError::Status {
                service: "registry",
                status: 409,
            });
        }
        let mut created = assistant(
            &request.slug,
            Some(request.wallet_address.as_str()),
            Some(&format!("ctx-{}", request.slug)),
        );
        created.name = Some(request.assistant_name.clone()).filter(|n| !n.is_empty());
        assistants.push(created);
        Ok(())
    }

    async fn auth_message(&self, address: &WalletAddress) -> Result<String, RegistryError> {
        self.record(format!("auth_message:{address}"))?;
        Ok(format!("Sign in to Ouf as {address}"))
    }

    async fn auth_verify(
        &self,
        address: &WalletAddress,
        _message: &str,
        _signature: &str,
    ) -> Result<VerifyOutcome, RegistryError> {
        self.record(format!("auth_verify:{address}"))?;
        Ok(self
            .verify_outcome
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(VerifyOutcome {
                verified: true,
                address: Some(address.to_string()),
            }))
    }

    async fn list_files(
        &self,
        context_id: &str,
        caller: &WalletAddress,
    ) -> Result<Vec<String>, RegistryError> {
        self.record(format!("list_files:{context_id}:{caller}"))?;
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(context_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_context(
        &self,
        context_id: &str,
        caller: &WalletAddress,
        file: &FileUpload,
    ) -> Result<(), RegistryError> {
        self.record(format!("add_context:{context_id}:{caller}:{}", file.filename))?;
        self.seed_file(context_id, &file.filename);
        Ok(())
    }

    async fn delete_context(
        &self,
        context_id: &str,
        caller: &WalletAddress,
        filename: &str,
    ) -> Result<(), RegistryError> {
        self.record(format!("delete_context:{context_id}:{caller}:{filename}"))?;
        if let Some(set) = self.files.lock().unwrap().get_mut(context_id) {
            set.remove(filename);
        }
        Ok(())
    }
}

/// AI backend that echoes messages and hands out a fixed conversation id.
pub(crate) struct FakeAskBackend {
    requests: Mutex<Vec<AskRequest>>,
    fail_status: Mutex<Option<u16>>,
    conversation_id: Mutex<Option<String>>,
}

impl Default for FakeAskBackend {
    fn default() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_status: Mutex::new(None),
            conversation_id: Mutex::new(Some("abc123".to_string())),
        }
    }
}

impl FakeAskBackend {
    pub(crate) fn fail_with_status(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    /// Id returned when the request does not carry one. `None` simulates an
    /// upstream answer without a conversation id.
    pub(crate) fn set_conversation_id(&self, id: Option<&str>) {
        *self.conversation_id.lock().unwrap() = id.map(str::to_string);
    }

    pub(crate) fn requests(&self) -> Vec<AskRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AskBackend for FakeAskBackend {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, RegistryError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(status) = *self.fail_status.lock().unwrap() {
            return Err(RegistryError::Status {
                service: "AI service",
                status,
            });
        }
        Ok(AskResponse {
            answer: format!("Echo: {}", request.message),
            conversation_id: request
                .conversation_id
                .clone()
                .or_else(|| self.conversation_id.lock().unwrap().clone()),
            usage: Some(serde_json::json!({ "costs": { "totalCost": 0.0 } })),
        })
    }
}
