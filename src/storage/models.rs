//! Model artifacts: JSON envelopes `{ "role": ..., "model": ... }` under
//! `<models_dir>/<role subdir>/<name>.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{content_id, named_file, resolve_file};
use crate::engine::accountant::AccountantKind;
use crate::predict::PredictorKind;
use crate::strategy::BetterKind;
use crate::types::{EngineError, Result};

/// A persistable model role.
pub trait Model: Serialize + DeserializeOwned {
    const ROLE: &'static str;
    const SUBDIR: &'static str;
}

impl Model for PredictorKind {
    const ROLE: &'static str = "predictor";
    const SUBDIR: &'static str = "predictors";
}

impl Model for BetterKind {
    const ROLE: &'static str = "better";
    const SUBDIR: &'static str = "betters";
}

impl Model for AccountantKind {
    const ROLE: &'static str = "accountant";
    const SUBDIR: &'static str = "accountants";
}

#[derive(Serialize)]
struct EnvelopeRef<'a, M> {
    role: &'static str,
    model: &'a M,
}

#[derive(Deserialize)]
struct Envelope {
    role: String,
    model: serde_json::Value,
}

/// Compact JSON of `model`; stable for equal models.
pub fn canonical<M: Model>(model: &M) -> Result<String> {
    Ok(serde_json::to_string(model)?)
}

/// Content identity of `model`, used as its default artifact name.
pub fn identity<M: Model>(model: &M) -> Result<Uuid> {
    Ok(content_id(canonical(model)?.as_bytes()))
}

/// Save `model` under `models_dir`, named `name` or after its identity.
pub fn save_model<M: Model>(model: &M, models_dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    let identity = identity(model)?;
    let dir = models_dir.join(M::SUBDIR);
    fs::create_dir_all(&dir)?;
    let name = name.map_or_else(|| identity.to_string(), str::to_string);
    let path = named_file(&dir, &name, "json");
    let json = serde_json::to_string_pretty(&EnvelopeRef { role: M::ROLE, model })?;
    fs::write(&path, json)?;
    info!(path = %path.display(), role = M::ROLE, %identity, "Model saved");
    Ok(path)
}

/// Load the named artifact of role `M`, or the newest one.
pub fn load_model<M: Model>(models_dir: &Path, name: Option<&str>) -> Result<M> {
    let path = resolve_file(&models_dir.join(M::SUBDIR), name, "json")?;
    let content = fs::read_to_string(&path)?;
    let envelope: Envelope = serde_json::from_str(&content)
        .map_err(|e| EngineError::Persistence(format!("{} is not a model artifact: {e}", path.display())))?;
    if envelope.role != M::ROLE {
        return Err(EngineError::Persistence(format!(
            "{} holds a {}, expected a {}",
            path.display(),
            envelope.role,
            M::ROLE
        )));
    }
    let model: M = serde_json::from_value(envelope.model)
        .map_err(|e| EngineError::Persistence(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), role = M::ROLE, identity = %identity(&model)?, "Model loaded");
    Ok(model)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
