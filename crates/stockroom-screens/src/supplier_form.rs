//! # Supplier Form Screen
//!
//! Add/edit form for suppliers. Contact validation (phone/email) runs
//! against a [`ValidationPolicy`], not hard-coded rules; the wiring layer
//! decides how strict a given deployment is.

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use stockroom_core::{CoreError, Supplier, ValidationPolicy, UNSAVED_ID};
use stockroom_db::Database;

use crate::ui_state::{EffectSender, StateCell, UiState};

// =============================================================================
// State / Intents / Effects
// =============================================================================

/// Form state for one supplier add/edit session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierFormState {
    pub screen_title: String,
    pub name: String,
    pub contact_person: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub is_saving: bool,
}

impl Default for SupplierFormState {
    fn default() -> Self {
        SupplierFormState {
            screen_title: "Add supplier".to_string(),
            name: String::new(),
            contact_person: String::new(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            is_saving: false,
        }
    }
}

/// User actions on the supplier form.
#[derive(Debug, Clone)]
pub enum SupplierFormIntent {
    NameChanged(String),
    ContactPersonChanged(String),
    PhoneChanged(String),
    EmailChanged(String),
    AddressChanged(String),
    Save,
}

/// One-shot outcomes delivered to the active observer.
#[derive(Debug, Clone, PartialEq)]
pub enum SupplierFormEffect {
    SupplierSaved,
    ShowError(String),
}

// =============================================================================
// Screen Controller
// =============================================================================

/// Owns one supplier form session.
pub struct SupplierFormScreen {
    db: Database,
    policy: ValidationPolicy,
    state: StateCell<SupplierFormState>,
    state_rx: watch::Receiver<UiState<SupplierFormState>>,
    effects: EffectSender<SupplierFormEffect>,
    effects_rx: Option<mpsc::Receiver<SupplierFormEffect>>,
    /// Set when editing an existing supplier.
    edit_id: Option<i64>,
    tasks: Vec<JoinHandle<()>>,
}

impl SupplierFormScreen {
    /// Creates an empty add-supplier form with the given contact policy.
    pub fn new(db: &Database, policy: ValidationPolicy) -> Self {
        Self::build(db, policy, None)
    }

    /// Creates an edit form pre-filled from the stored supplier.
    pub fn for_supplier(db: &Database, policy: ValidationPolicy, supplier_id: i64) -> Self {
        Self::build(db, policy, Some(supplier_id))
    }

    fn build(db: &Database, policy: ValidationPolicy, edit_id: Option<i64>) -> Self {
        let (state, state_rx) = StateCell::new();
        let (effects, effects_rx) = EffectSender::channel();
        let mut tasks = Vec::new();

        // The form starts usable immediately.
        state.update_or_default(|s: &SupplierFormState| s.clone());

        if let Some(supplier_id) = edit_id {
            tasks.push({
                let db = db.clone();
                let state = state.clone();
                tokio::spawn(async move {
                    match db.suppliers().get_by_id(supplier_id).await {
                        Ok(Some(supplier)) => state.update_or_default(|s| SupplierFormState {
                            screen_title: "Edit supplier".to_string(),
                            name: supplier.name.clone(),
                            contact_person: supplier.contact_person.clone(),
                            phone: supplier.phone.clone(),
                            email: supplier.email.clone(),
                            address: supplier.address.clone(),
                            ..s.clone()
                        }),
                        Ok(None) => {
                            state.set_error(CoreError::SupplierNotFound(supplier_id).to_string())
                        }
                        Err(err) => state.set_error(format!("Failed to load supplier: {err}")),
                    }
                })
            });
        }

        SupplierFormScreen {
            db: db.clone(),
            policy,
            state,
            state_rx,
            effects,
            effects_rx: Some(effects_rx),
            edit_id,
            tasks,
        }
    }

    /// The state channel handed to the rendering layer.
    pub fn state(&self) -> watch::Receiver<UiState<SupplierFormState>> {
        self.state_rx.clone()
    }

    /// Takes the effect receiver; exactly one active observer at a time.
    pub fn take_effects(&mut self) -> Option<mpsc::Receiver<SupplierFormEffect>> {
        self.effects_rx.take()
    }

    /// Handles one user action.
    pub async fn on_intent(&self, intent: SupplierFormIntent) {
        match intent {
            SupplierFormIntent::NameChanged(name) => {
                self.state
                    .update_or_default(|s| SupplierFormState { name, ..s.clone() });
            }
            SupplierFormIntent::ContactPersonChanged(contact_person) => {
                self.state.update_or_default(|s| SupplierFormState {
                    contact_person,
                    ..s.clone()
                });
            }
            SupplierFormIntent::PhoneChanged(phone) => {
                self.state
                    .update_or_default(|s| SupplierFormState { phone, ..s.clone() });
            }
            SupplierFormIntent::EmailChanged(email) => {
                self.state
                    .update_or_default(|s| SupplierFormState { email, ..s.clone() });
            }
            SupplierFormIntent::AddressChanged(address) => {
                self.state.update_or_default(|s| SupplierFormState {
                    address,
                    ..s.clone()
                });
            }
            SupplierFormIntent::Save => self.save().await,
        }
    }

    /// Validates against the policy and persists.
    async fn save(&self) {
        let form = self.state.current_or_default();

        if let Err(message) = validate_form(&form, &self.policy) {
            self.effects
                .emit(SupplierFormEffect::ShowError(message))
                .await;
            return;
        }

        self.state.update_or_default(|s| SupplierFormState {
            is_saving: true,
            ..s.clone()
        });

        let supplier = Supplier {
            id: self.edit_id.unwrap_or(UNSAVED_ID),
            name: form.name.trim().to_string(),
            contact_person: form.contact_person.trim().to_string(),
            phone: form.phone.trim().to_string(),
            email: form.email.trim().to_string(),
            address: form.address.trim().to_string(),
        };

        // Detached: teardown must not cancel a save mid-write.
        let db = self.db.clone();
        let state = self.state.clone();
        let effects = self.effects.clone();
        let is_update = self.edit_id.is_some();

        tokio::spawn(async move {
            let result = if is_update {
                db.suppliers().update(&supplier).await.map(|_| supplier.id)
            } else {
                db.suppliers().insert(&supplier).await
            };

            state.update_or_default(|s| SupplierFormState {
                is_saving: false,
                ..s.clone()
            });

            match result {
                Ok(id) => {
                    info!(supplier_id = id, updated = is_update, "Supplier saved");
                    effects.emit(SupplierFormEffect::SupplierSaved).await;
                }
                Err(err) => {
                    effects
                        .emit(SupplierFormEffect::ShowError(format!(
                            "Failed to save supplier: {err}"
                        )))
                        .await;
                }
            }
        });
    }
}

impl Drop for SupplierFormScreen {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Field checks in display order; the first failure is the message shown.
fn validate_form(form: &SupplierFormState, policy: &ValidationPolicy) -> Result<(), String> {
    if form.name.trim().is_empty() {
        return Err("Supplier name is required.".to_string());
    }
    if policy.validate_phone(&form.phone).is_err() {
        return Err("Valid phone is required.".to_string());
    }
    if form.contact_person.trim().is_empty() {
        return Err("Contact person is required.".to_string());
    }
    if policy.validate_email(&form.email).is_err() {
        return Err("Valid email is required.".to_string());
    }
    if form.address.trim().is_empty() {
        return Err("Address is required.".to_string());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
