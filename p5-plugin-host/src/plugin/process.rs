// SPDX-License-Identifier: Apache-2.0
//! Subprocess lifecycle: spawn, handshake, and serialized RPC dispatch over
//! a plugin's stdio pipes.

use std::process::Stdio;
use std::time::Duration;

use p5_plugin_protocol::{perform_handshake, read_message, write_message, Request, Response};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// How long [`PluginProcess::close`] waits for the child to exit on its own
/// (after its stdio pipes are dropped) before killing it forcibly.
const GRACEFUL_EXIT_TIMEOUT: Duration = Duration::from_millis(500);

/// Upper bound on concurrent in-flight [`PluginProcess::call`]s. `io`'s
/// mutex already serializes the requests themselves; this only has to be
/// large enough that real callers never contend for a permit, so `close`
/// can use the same semaphore as a drain barrier.
const MAX_INFLIGHT_CALLS: u32 = 1024;

struct ProcessIo {
    /// Taken (and dropped) by `close` to signal the plugin via EOF on its
    /// stdin; absent afterward, which `call` never observes because no
    /// request is issued once `close` has run.
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
}

/// An owned, running plugin subprocess. Requests are serialized through a
/// single mutex around the stdio pipes: one in-flight request/response pair
/// at a time per process, since the framing protocol has no request IDs to
/// demultiplex concurrent calls.
pub struct PluginProcess {
    name: String,
    child: Mutex<Child>,
    io: Mutex<ProcessIo>,
    /// Cancelled by `close`, and checked by `call` before it does anything
    /// else, so a call that arrives after shutdown begins never touches
    /// `io`; every plugin call receives a scoped cancellation token.
    cancel: CancellationToken,
    /// One permit held for the duration of each `call`; `close` acquires
    /// every permit before severing stdio, which blocks until all in-flight
    /// calls have released theirs, waiting for tasks to drain before
    /// closing the instance.
    inflight: Semaphore,
    /// Surfaced only for diagnostics; the host does not interpret it.
    #[allow(dead_code)]
    cookie: String,
}

impl PluginProcess {
    pub async fn spawn(name: &str, command: &str, args: &[String]) -> Result<Self> {
        // Resolve via PATH up front, the way `start_plugin` resolves a
        // plugin entrypoint before spawning it: a clear "not found" error
        // at load time rather than whatever Command::spawn's own lookup
        // produces. A resolvable path (absolute, or containing a
        // separator) is used as-is.
        let resolved = which::which(command).unwrap_or_else(|_| command.into());

        let mut child = Command::new(resolved)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::plugin_load(name, e))?;

        let mut stdin = child.stdin.take().expect("stdin was piped");
        let mut stdout = child.stdout.take().expect("stdout was piped");

        let cookie = perform_handshake(&mut stdin, &mut stdout)
            .await
            .map_err(|e| Error::plugin_load(name, e))?;

        log::debug!("plugin '{name}' handshake complete, cookie={cookie}");

        Ok(PluginProcess {
            name: name.to_owned(),
            child: Mutex::new(child),
            io: Mutex::new(ProcessIo {
                stdin: Some(stdin),
                stdout,
            }),
            cancel: CancellationToken::new(),
            inflight: Semaphore::new(MAX_INFLIGHT_CALLS as usize),
            cookie,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send one request and wait for its matching response. Requests are
    /// implicitly serialized by `io`'s mutex. Returns
    /// [`Error::PluginClosed`], never panics, if a concurrent `close` has
    /// already begun or finishes while this call is queued for `io`.
    pub async fn call(&self, request: Request) -> Result<Response> {
        if self.cancel.is_cancelled() {
            return Err(Error::PluginClosed(self.name.clone()));
        }
        let _permit = self
            .inflight
            .acquire()
            .await
            .map_err(|_| Error::PluginClosed(self.name.clone()))?;
        if self.cancel.is_cancelled() {
            return Err(Error::PluginClosed(self.name.clone()));
        }

        let mut io = self.io.lock().await;
        let stdin = io
            .stdin
            .as_mut()
            .ok_or_else(|| Error::PluginClosed(self.name.clone()))?;
        write_message(stdin, &request).await?;
        let response: Response = read_message(&mut io.stdout).await?;
        Ok(response)
    }

    /// Idempotent: cancels the token first so no new call starts, then
    /// drains every in-flight call before touching stdio, then drops stdin
    /// to give a cooperative plugin a chance to exit on its own; if it
    /// hasn't within [`GRACEFUL_EXIT_TIMEOUT`], it is killed forcibly.
    pub async fn close(&self) {
        self.cancel.cancel();
        // Waits until every outstanding permit is back, i.e. every call
        // that had already passed the cancellation check has returned.
        let _drain = self.inflight.acquire_many(MAX_INFLIGHT_CALLS).await;

        {
            let mut io = self.io.lock().await;
            // Dropping stdin closes the plugin's stdin, the only "please
            // exit" signal this protocol defines. A second `close()` finds
            // `stdin` already `None` and is a no-op here.
            io.stdin.take();
        }

        let mut child = self.child.lock().await;
        match tokio::time::timeout(GRACEFUL_EXIT_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => {
                log::debug!("plugin '{}' exited with {status}", self.name);
            }
            Ok(Err(e)) => {
                log::warn!("plugin '{}' wait() failed: {e}", self.name);
            }
            Err(_) => {
                log::warn!("plugin '{}' did not exit promptly, killing", self.name);
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
    }
}
