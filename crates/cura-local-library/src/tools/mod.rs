pub mod mediainfo;
pub mod mkvtoolnix;

use std::{
    ffi::{OsStr, OsString},
    io,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

pub use mediainfo::{MediaInfoCli, MediaInfoDocument, MediaInfoTrack};
pub use mkvtoolnix::MkvToolNix;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with code {code:?}: {stderr}")]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    #[error("could not parse {tool} output: {message}")]
    Parse { tool: String, message: String },

    #[error("{0} is not a Matroska file and cannot be rewritten")]
    UnsupportedContainer(PathBuf),

    #[error("track {0} is not present in the container")]
    UnknownTrack(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Rutas de los ejecutables externos y el límite de tiempo por invocación.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    pub mediainfo: PathBuf,
    pub ffprobe: PathBuf,
    pub mkvmerge: PathBuf,
    pub mkvpropedit: PathBuf,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            mediainfo: "mediainfo".into(),
            ffprobe: "ffprobe".into(),
            mkvmerge: "mkvmerge".into(),
            mkvpropedit: "mkvpropedit".into(),
            timeout: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Invocación de una herramienta externa con timeout y códigos de salida aceptados.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
    success_codes: Vec<i32>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        ToolCommand {
            program: program.into(),
            args: Vec::new(),
            timeout,
            success_codes: vec![0],
        }
    }

    pub fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.arg(arg);
        }
        self
    }

    /// mkvtoolnix sale con 1 cuando sólo hubo advertencias.
    pub fn accept_codes(&mut self, codes: &[i32]) -> &mut Self {
        self.success_codes = codes.to_vec();
        self
    }

    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    pub async fn execute(&self) -> Result<ToolOutput, ToolError> {
        let tool = self.tool_name();
        debug!(%tool, args = ?self.args, "ejecutando herramienta");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        // Al vencer el timeout el futuro se descarta y kill_on_drop mata al hijo.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout {
                tool: tool.clone(),
                timeout: self.timeout,
            })??;

        let code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !code.is_some_and(|c| self.success_codes.contains(&c)) {
            return Err(ToolError::Failed { tool, code, stderr });
        }

        if code != Some(0) {
            warn!(%tool, ?code, %stderr, "la herramienta terminó con advertencias");
        }

        Ok(ToolOutput {
            code,
            stdout: output.stdout,
            stderr,
        })
    }
}

pub(crate) fn is_matroska(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mkv"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        let mut cmd = ToolCommand::new("sh", Duration::from_secs(5));
        cmd.args(["-c", script]);
        cmd
    }

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let out = sh("printf hola").execute().await.unwrap();
        assert_eq!(out.code, Some(0));
        assert_eq!(out.stdout, b"hola");
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let err = sh("echo roto >&2; exit 3").execute().await.unwrap_err();
        match err {
            ToolError::Failed { tool, code, stderr } => {
                assert_eq!(tool, "sh");
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "roto");
            }
            other => panic!("Esperaba Failed, llegó {other:?}"),
        }
    }

    #[tokio::test]
    async fn warning_codes_can_be_accepted() {
        let out = sh("exit 1").accept_codes(&[0, 1]).execute().await.unwrap();
        assert_eq!(out.code, Some(1));
    }

    #[tokio::test]
    async fn slow_tools_time_out() {
        let mut cmd = ToolCommand::new("sh", Duration::from_millis(100));
        cmd.args(["-c", "sleep 5"]);

        assert!(matches!(cmd.execute().await, Err(ToolError::Timeout { .. })));
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let cmd = ToolCommand::new("/nonexistent/cura-tool", Duration::from_secs(1));
        assert!(matches!(cmd.execute().await, Err(ToolError::Spawn { .. })));
    }

    #[test]
    fn only_mkv_extension_is_matroska() {
        assert!(is_matroska(Path::new("/a/b.MKV")));
        assert!(!is_matroska(Path::new("/a/b.mp4")));
        assert!(!is_matroska(Path::new("/a/b")));
    }
}
