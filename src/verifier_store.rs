use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;
use crate::pkce::CodeVerifier;

/// Single-slot, take-once storage for the PKCE verifier of one login attempt.
///
/// The verifier has to outlive the external authorization redirect. Whatever
/// backs the slot, `take_once` must hand the stored value to at most one caller,
/// even when a replayed callback races the first one.
///
/// # Example
///
/// ```rust,ignore
/// let store = MemoryVerifierStore::new();
/// store.put(pair.verifier)?;
/// assert!(store.take_once()?.is_some());
/// assert!(store.take_once()?.is_none());
/// ```
pub trait VerifierStore: Send + Sync + 'static {
    /// Store a verifier, replacing any previous login attempt.
    fn put(&self, verifier: CodeVerifier) -> Result<(), Error>;

    /// Read and clear the slot atomically. `None` once consumed.
    fn take_once(&self) -> Result<Option<CodeVerifier>, Error>;
}

/// In-process slot guarded by a mutex.
#[derive(Debug, Default)]
pub struct MemoryVerifierStore {
    slot: Mutex<Option<CodeVerifier>>,
}

impl MemoryVerifierStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerifierStore for MemoryVerifierStore {
    fn put(&self, verifier: CodeVerifier) -> Result<(), Error> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| Error::Store("verifier slot poisoned".into()))?;
        *slot = Some(verifier);
        Ok(())
    }

    fn take_once(&self) -> Result<Option<CodeVerifier>, Error> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| Error::Store("verifier slot poisoned".into()))?;
        Ok(slot.take())
    }
}

/// File-backed slot that survives a process restart between login start and callback.
///
/// `take_once` claims the file with an atomic rename before reading it, so only
/// the caller whose rename succeeded ever sees the verifier.
#[derive(Debug)]
pub struct FileVerifierStore {
    path: PathBuf,
    claims: AtomicU64,
}

impl FileVerifierStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            claims: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn claim_path(&self) -> PathBuf {
        let n = self.claims.fetch_add(1, Ordering::Relaxed);
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".claim-{}-{n}", std::process::id()));
        self.path.with_file_name(name)
    }
}

impl VerifierStore for FileVerifierStore {
    fn put(&self, verifier: CodeVerifier) -> Result<(), Error> {
        // Write aside and rename so a reader never sees a half-written verifier.
        let staging = self.claim_path();
        if let Err(e) = write_private(&staging, verifier.into_inner().as_bytes()) {
            let _ = std::fs::remove_file(&staging);
            return Err(Error::Store(format!("{}: {e}", staging.display())));
        }
        std::fs::rename(&staging, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            Error::Store(format!("{}: {e}", self.path.display()))
        })
    }

    fn take_once(&self) -> Result<Option<CodeVerifier>, Error> {
        let claimed = self.claim_path();
        match std::fs::rename(&self.path, &claimed) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Store(format!("{}: {e}", self.path.display()))),
        }

        let read = std::fs::read_to_string(&claimed);
        if let Err(e) = std::fs::remove_file(&claimed) {
            tracing::warn!(
                error = %e,
                path = %claimed.display(),
                "Failed to remove claimed verifier file"
            );
        }
        let verifier = read.map_err(|e| Error::Store(format!("{}: {e}", claimed.display())))?;
        Ok(Some(CodeVerifier::from(verifier)))
    }
}

/// Creates `path` readable by the owner only.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
