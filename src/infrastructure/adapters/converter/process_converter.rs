//! Process Voice Converter - 通过外部程序执行变声
//!
//! 调用形如 `<command> --input in.wav --output out.wav --model m.pth ...` 的推理脚本

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::application::ports::{ConvertError, VoiceConverterPort};
use crate::domain::ConversionParams;

#[derive(Debug, Clone)]
pub struct ProcessConverterConfig {
    /// 推理程序路径
    pub command: PathBuf,
    /// 放在生成参数之前的固定参数（如脚本路径）
    pub leading_args: Vec<String>,
    pub timeout_secs: u64,
}

impl ProcessConverterConfig {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            leading_args: Vec::new(),
            timeout_secs: 600,
        }
    }
}

pub struct ProcessVoiceConverter {
    config: ProcessConverterConfig,
}

impl ProcessVoiceConverter {
    pub fn new(config: ProcessConverterConfig) -> Self {
        Self { config }
    }

    fn build_args(input: &Path, output: &Path, params: &ConversionParams) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        let mut push = |flag: &str, value: OsString| {
            args.push(flag.into());
            args.push(value);
        };

        push("--input", input.into());
        push("--output", output.into());
        push("--model", params.model_path.clone().into());
        if let Some(index) = &params.index_path {
            push("--index", index.clone().into());
        }
        push("--pitch", params.pitch.to_string().into());
        push("--index-rate", params.index_rate.to_string().into());
        push("--rms-mix-rate", params.rms_mix_rate.to_string().into());
        push("--protect", params.protect.to_string().into());
        push("--f0-method", params.f0_method.clone().into());
        push("--split-audio", params.split_audio.to_string().into());
        push("--autotune", params.autotune.to_string().into());
        push("--autotune-strength", params.autotune_strength.to_string().into());
        push("--clean-audio", params.clean_audio.to_string().into());
        push("--clean-strength", params.clean_strength.to_string().into());
        push("--sid", params.sid.to_string().into());
        args
    }
}

#[async_trait]
impl VoiceConverterPort for ProcessVoiceConverter {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        params: &ConversionParams,
    ) -> Result<(), ConvertError> {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.leading_args)
            .args(Self::build_args(input, output, params))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(command = ?cmd, "Starting voice conversion");

        let child = cmd
            .spawn()
            .map_err(|e| ConvertError::Spawn(format!("{}: {}", self.config.command.display(), e)))?;

        let limit = Duration::from_secs(self.config.timeout_secs);
        let result = match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ConvertError::Io(e.to_string()))?,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.timeout_secs,
                    "Voice conversion timed out"
                );
                return Err(ConvertError::Timeout(self.config.timeout_secs));
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::error!(
                status = %result.status,
                stderr = %stderr.trim(),
                "Voice conversion failed"
            );
            return Err(ConvertError::Failed(format!(
                "{}: {}",
                result.status,
                stderr.trim()
            )));
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => {
                tracing::info!(
                    output = %output.display(),
                    size_bytes = meta.len(),
                    "Voice conversion completed"
                );
                Ok(())
            }
            _ => Err(ConvertError::Failed(format!(
                "converter produced no output at {}",
                output.display()
            ))),
        }
    }
}
