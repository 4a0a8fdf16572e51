use crate::config::Config;
use crate::wire::LlmRequest;
use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct SavedPaths {
    pub dir: PathBuf,
    pub request: Option<PathBuf>,
    pub response: Option<PathBuf>,
}

/// What the model sent back for one stage.
#[derive(Debug, Serialize)]
pub struct StageResponse<'a> {
    pub ok: bool,
    pub streamed: bool,
    pub text: &'a str,
}

pub fn tx_dir(root: &Path, tx: Uuid) -> PathBuf {
    root.join(".sitesmith").join("tx").join(tx.to_string())
}

/// Write `<stage>.request.json` / `<stage>.response.json` for the session. Stages repeat
/// (one per edit turn), so an ordinal keeps files from overwriting each other.
pub fn save_stage(
    stage: &str,
    ordinal: usize,
    req: &LlmRequest,
    resp: &StageResponse<'_>,
    tx: Uuid,
    cfg: &Config,
) -> anyhow::Result<SavedPaths> {
    let dir = tx_dir(Path::new(&cfg.root), tx);
    fs::create_dir_all(&dir)?;

    let mut request_path = None;
    let mut response_path = None;

    if cfg.save_request {
        let p = dir.join(format!("{ordinal:03}.{stage}.request.json"));
        fs::write(&p, to_string_pretty(req)?)?;
        request_path = Some(p);
    }

    if cfg.save_response {
        let p = dir.join(format!("{ordinal:03}.{stage}.response.json"));
        fs::write(&p, to_string_pretty(resp)?)?;
        response_path = Some(p);
    }

    Ok(SavedPaths { dir, request: request_path, response: response_path })
}
