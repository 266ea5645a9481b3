//! Headless page rendering
//!
//! Some booking systems only expose availability after client-side
//! JavaScript runs. The [`PageRenderer`] capability turns a URL into the
//! settled DOM. [`ChromeRenderer`] drives a headless Chromium-family browser:
//! each render is an isolated page (its own browser process, `--dump-dom`),
//! bounded by a semaphore so at most `max_pages` pages are open at once.
//!
//! A page is closed on every exit path. The process handle lives in a
//! [`PageSession`] guard that kills the browser when dropped, which covers
//! success, error, timeout and cancellation of the awaiting future.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::env_override;
use crate::utils::error::RenderError;

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Browser executable (path or name on `PATH`)
    pub executable: PathBuf,

    /// Budget for navigation plus settle
    pub render_timeout_secs: u64,

    /// Time given to client-side scripts after load
    pub settle_ms: u64,

    /// Maximum simultaneously open pages
    pub max_pages: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("chromium"),
            render_timeout_secs: 30,
            settle_ms: 2000,
            max_pages: 5,
        }
    }
}

impl RendererConfig {
    /// Create config from environment variables
    pub fn apply_env(&mut self) {
        env_override("CHROME_PATH", &mut self.executable);
        env_override("FAIRWAY_RENDER_TIMEOUT", &mut self.render_timeout_secs);
        env_override("FAIRWAY_RENDER_SETTLE_MS", &mut self.settle_ms);
        env_override("FAIRWAY_RENDER_MAX_PAGES", &mut self.max_pages);
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// DOM snapshot of a settled page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

/// Capability: render a URL to its settled DOM
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Open an isolated page, navigate, wait `settle`, snapshot the DOM, close.
    async fn render(&self, url: &str, settle: Duration) -> Result<RenderedPage, RenderError>;

    /// Whether the renderer can still serve pages
    async fn health_check(&self) -> bool;

    /// Release the rendering engine; later renders fail with `Closed`
    async fn close(&self);
}

/// Headless Chromium renderer, one browser process per page
pub struct ChromeRenderer {
    executable: PathBuf,
    render_timeout: Duration,
    pages: Arc<Semaphore>,
    open_pages: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl ChromeRenderer {
    /// Create a renderer; does not launch anything yet
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            render_timeout: config.render_timeout(),
            pages: Arc::new(Semaphore::new(config.max_pages.max(1))),
            open_pages: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        }
    }

    /// Verify the browser can be launched. Called once at startup.
    pub async fn startup_check(&self) -> Result<String, RenderError> {
        let mut command = Command::new(&self.executable);
        command
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(10), command.output())
            .await
            .map_err(|_| RenderError::Timeout(Duration::from_secs(10)))?
            .map_err(|e| RenderError::Launch(format!("{}: {e}", self.executable.display())))?;

        if !output.status.success() {
            return Err(RenderError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::info!(executable = %self.executable.display(), version = %version, "Renderer available");
        Ok(version)
    }

    /// Number of pages currently open
    pub fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }

    fn command_for(&self, url: &str, settle: Duration) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-first-run")
            .arg("--mute-audio")
            .arg(format!("--virtual-time-budget={}", settle.as_millis()))
            .arg("--dump-dom")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn open_page(&self, url: &str, settle: Duration) -> Result<PageSession, RenderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RenderError::Closed);
        }

        let permit = Arc::clone(&self.pages)
            .acquire_owned()
            .await
            .map_err(|_| RenderError::Closed)?;

        let child = self
            .command_for(url, settle)
            .spawn()
            .map_err(|e| RenderError::Launch(format!("{}: {e}", self.executable.display())))?;

        Ok(PageSession::new(child, permit, Arc::clone(&self.open_pages)))
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str, settle: Duration) -> Result<RenderedPage, RenderError> {
        let settle = settle.min(self.render_timeout);

        // The permit wait is not part of the render budget.
        let session = self.open_page(url, settle).await?;

        tracing::debug!(url = %url, open_pages = self.open_pages(), "Rendering page");

        let html = tokio::time::timeout(self.render_timeout, session.snapshot())
            .await
            .map_err(|_| {
                tracing::warn!(url = %url, timeout_secs = self.render_timeout.as_secs(), "Render timed out");
                RenderError::Timeout(self.render_timeout)
            })??;

        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }

    async fn health_check(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.pages.is_closed()
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pages.close();
        tracing::info!(open_pages = self.open_pages(), "Renderer closed");
    }
}

/// One open page. Dropping the session closes the page.
struct PageSession {
    child: Child,
    _permit: OwnedSemaphorePermit,
    open_pages: Arc<AtomicUsize>,
}

impl PageSession {
    fn new(child: Child, permit: OwnedSemaphorePermit, open_pages: Arc<AtomicUsize>) -> Self {
        open_pages.fetch_add(1, Ordering::SeqCst);
        Self {
            child,
            _permit: permit,
            open_pages,
        }
    }

    /// Wait for the browser to print the settled DOM
    async fn snapshot(mut self) -> Result<String, RenderError> {
        use tokio::io::AsyncReadExt;

        let mut stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| RenderError::Launch("stdout not captured".to_string()))?;
        let mut stderr = self
            .child
            .stderr
            .take()
            .ok_or_else(|| RenderError::Launch("stderr not captured".to_string()))?;

        let mut out = Vec::new();
        let mut err = Vec::new();
        let (read_out, read_err) =
            tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err));
        read_out.map_err(|e| RenderError::Launch(e.to_string()))?;
        read_err.map_err(|e| RenderError::Launch(e.to_string()))?;

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        if !status.success() {
            return Err(RenderError::Exit {
                status: status.to_string(),
                stderr: crate::utils::truncate_text(String::from_utf8_lossy(&err).trim(), 200),
            });
        }

        String::from_utf8(out).map_err(|_| RenderError::InvalidOutput)
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        // No-op if the browser already exited.
        let _ = self.child.start_kill();
        self.open_pages.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!("Page closed");
    }
}
