use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct VoiceHubConfig {
    pub api_port: u16,
    pub paths: VoiceHubPaths,
}

impl VoiceHubConfig {
    pub fn from_env() -> Result<Self> {
        let paths = VoiceHubPaths::discover()?;
        let api_port = env::var("VOICEHUB_API_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        Ok(Self { api_port, paths })
    }

    pub fn new(api_port: u16, paths: VoiceHubPaths) -> Self {
        Self { api_port, paths }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoiceHubPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl VoiceHubPaths {
    pub fn discover() -> Result<Self> {
        if let Some(base) = env::var_os("VOICEHUB_DATA_DIR") {
            return Self::from_base_dir(PathBuf::from(base));
        }
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("voicehub.db");
        Ok(Self {
            base,
            data_dir,
            db_path,
        })
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|err| anyhow!("failed to create data dir: {err}"))?;
        Ok(())
    }
}
