use crate::encoder::{self, Algorithm, Encoder};
use crate::format::{self, Registry};
use indexmap::map::Entry;
use snafu::{OptionExt, ResultExt, Snafu};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Errors that can occur while managing a credential file.
#[derive(Debug, Snafu)]
pub enum Error {
    /// User was not found in the registry.
    #[snafu(display("User '{username}' not found"))]
    UserNotFound { username: String },

    /// User already exists in the registry.
    #[snafu(display("User '{username}' already exists"))]
    UserAlreadyExists { username: String },

    /// Username is empty or contains `:` or a line break.
    #[snafu(display("Invalid username '{username}'"))]
    InvalidUsername { username: String },

    /// Failed to read the credential file.
    #[snafu(display("Failed to read credential file '{}'", path.display()))]
    FileRead { source: io::Error, path: PathBuf },

    /// Failed to write the credential file.
    #[snafu(display("Failed to save credential file '{}'", path.display()))]
    FileSave { source: io::Error, path: PathBuf },

    /// Failed to create the parent directory.
    #[snafu(display("Failed to create parent directory '{}'", path.display()))]
    CreateDir { source: io::Error, path: PathBuf },

    /// Failed to encode the password.
    #[snafu(display("Failed to encode password"))]
    Encode { source: encoder::Error },
}

/// Per-call settings for mutating operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Scheme used to encode the secret. Ignored by [`Manager::remove`].
    pub algorithm: Algorithm,
    /// Write the file before returning.
    pub export: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            export: true,
        }
    }
}

impl Options {
    /// md5, exported immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only touch memory; the caller flushes with [`Manager::export`].
    pub fn deferred() -> Self {
        Self::default().export(false)
    }

    /// Sets the encoding scheme.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets whether the call writes the file.
    pub fn export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }
}

/// A credential registry bound to one file.
///
/// The registry is loaded when the manager is opened. Mutations change the
/// in-memory copy and, unless deferred through [`Options`], rewrite the whole
/// file before returning. Only one writer per file is supported.
#[derive(Debug)]
pub struct Manager {
    path: PathBuf,
    entries: Registry,
    encoder: Encoder,
}

fn validate_username(username: &str) -> Result<(), Error> {
    snafu::ensure!(
        !username.is_empty() && !username.contains([':', '\n', '\r']),
        InvalidUsernameSnafu { username }
    );
    Ok(())
}

impl Manager {
    /// Binds a manager to `path` and loads it. A missing file yields an empty registry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::with_encoder(path, Encoder::default())
    }

    /// Like [`Manager::open`] with a custom encoder.
    pub fn with_encoder(path: impl AsRef<Path>, encoder: Encoder) -> Result<Self, Error> {
        let mut manager = Self {
            path: path.as_ref().to_path_buf(),
            entries: Registry::new(),
            encoder,
        };
        manager.load()?;
        Ok(manager)
    }

    /// Re-reads the bound file, replacing the registry.
    ///
    /// If the file does not exist the registry is left untouched.
    pub fn load(&mut self) -> Result<(), Error> {
        let path = self.path.as_path();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("Credential file {} does not exist yet", path.display());
                return Ok(());
            }
            Err(e) => return Err(e).context(FileReadSnafu { path }),
        };

        self.entries = format::parse(&contents);
        log::debug!(
            "Loaded {} users from {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// All usernames in registry order.
    pub fn list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Adds a user that must not exist yet.
    pub fn add(&mut self, username: &str, secret: &str, options: Options) -> Result<(), Error> {
        validate_username(username)?;
        match self.entries.entry(username.to_string()) {
            Entry::Occupied(_) => return UserAlreadyExistsSnafu { username }.fail(),
            Entry::Vacant(entry) => {
                let encoded = self
                    .encoder
                    .encode(secret, options.algorithm)
                    .context(EncodeSnafu)?;
                entry.insert(encoded);
            }
        }
        self.apply_export_policy(options)
    }

    /// Replaces the secret of a user that must already exist.
    pub fn update(&mut self, username: &str, secret: &str, options: Options) -> Result<(), Error> {
        let entry = self
            .entries
            .get_mut(username)
            .context(UserNotFoundSnafu { username })?;
        *entry = self
            .encoder
            .encode(secret, options.algorithm)
            .context(EncodeSnafu)?;
        self.apply_export_policy(options)
    }

    /// Stores the user whether or not it exists.
    pub fn upsert(&mut self, username: &str, secret: &str, options: Options) -> Result<(), Error> {
        validate_username(username)?;
        let encoded = self
            .encoder
            .encode(secret, options.algorithm)
            .context(EncodeSnafu)?;
        self.entries.insert(username.to_string(), encoded);
        self.apply_export_policy(options)
    }

    /// Removes a user. Removing an unknown user is not an error.
    pub fn remove(&mut self, username: &str, options: Options) -> Result<(), Error> {
        if self.entries.shift_remove(username).is_none() {
            log::debug!("User '{username}' not present, nothing to remove");
        }
        self.apply_export_policy(options)
    }

    /// Atomically replaces the bound file with the current registry.
    pub fn export(&self) -> Result<(), Error> {
        let path = self.path.as_path();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        if !dir.exists() {
            fs::create_dir_all(dir).context(CreateDirSnafu { path: dir })?;
        }

        // The temporary file is created owner-only; an existing file keeps its mode.
        let mut file = NamedTempFile::new_in(dir).context(FileSaveSnafu { path })?;
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(file.path(), metadata.permissions())
                .context(FileSaveSnafu { path })?;
        }

        file.write_all(self.render().as_bytes())
            .context(FileSaveSnafu { path })?;
        file.as_file().sync_all().context(FileSaveSnafu { path })?;
        file.persist(path)
            .map_err(|e| e.error)
            .context(FileSaveSnafu { path })?;

        log::debug!("Exported {} users to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// The file contents [`Manager::export`] would write.
    pub fn render(&self) -> String {
        format::render(&self.entries)
    }

    /// Whether `username` is registered.
    pub fn contains(&self, username: &str) -> bool {
        self.entries.contains_key(username)
    }

    /// The encoded secret stored for `username`.
    pub fn get(&self, username: &str) -> Option<&str> {
        self.entries.get(username).map(String::as_str)
    }

    /// `(username, encoded secret)` pairs in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(u, s)| (u.as_str(), s.as_str()))
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bound file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn apply_export_policy(&self, options: Options) -> Result<(), Error> {
        if options.export {
            self.export()
        } else {
            Ok(())
        }
    }
}
